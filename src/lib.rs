pub mod clock;
pub mod config;
mod error;
pub mod executor;
mod junit;
pub mod logging;
#[cfg(test)]
mod mock_sim;
pub mod prelude;
pub mod regression;
mod rstb_obj;
pub mod signal;
pub mod sim_if;
pub mod tb;
pub mod trigger;
mod value;
#[cfg(all(feature = "vpi", not(test)))]
pub mod vpi;
#[cfg(all(feature = "vpi", not(test)))]
#[allow(non_upper_case_globals, non_camel_case_types, dead_code)]
mod vpi_user;

use std::cell::RefCell;

pub use error::SimError;
pub use rstb_obj::RstbObjSafe;
pub use value::Val;

pub type SimpleResult<T> = Result<T, SimError>;
pub type RstbResult = Result<Val, Val>;

thread_local! {
    // names the JUnit test suite
    pub(crate) static CRATE_NAME: RefCell<String> = RefCell::new(env!("CARGO_CRATE_NAME").to_string());
}

#[cfg(all(feature = "vpi", not(test)))]
use tb::test_project;
#[cfg(all(feature = "vpi", not(test)))]
crate::run_with_vpi!(test_project);
