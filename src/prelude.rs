pub use crate::clock::{clock_cycles, Clock};
pub use crate::executor::{JoinHandle, Task};
pub use crate::regression::{fail_test, pass_test};
pub use crate::signal::SimObject;
pub use crate::sim_if::{sim_if, TimeUnit};
pub use crate::test::{RstbTests, Test};
pub use crate::trigger::Trigger;
pub use crate::{RstbObjSafe, RstbResult, SimError, SimpleResult, Val};
pub use futures::future::FutureExt;
