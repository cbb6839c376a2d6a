use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use crate::signal::{self, ObjectKind, SimObject};
use crate::{executor, trigger, SimError, SimpleResult};

thread_local! {
    // The simulator calls back on a single thread, so the active interface lives there.
    static SIM_IF: RefCell<Option<Rc<dyn SimIf>>> = RefCell::new(None);
}

/// Installs the simulator interface for this thread and resets all per-simulation state.
pub fn install(sim: Rc<dyn SimIf>) {
    executor::clear_ready_queue();
    trigger::clear_triggers();
    signal::clear_cache();
    SIM_IF.with(|s| s.replace(Some(sim)));
}

/// Returns the active simulator interface.
pub fn sim_if() -> SimpleResult<Rc<dyn SimIf>> {
    SIM_IF.with(|s| s.borrow().clone()).ok_or(SimError::NoInterface)
}

#[derive(Debug, Hash, Clone, Copy, Eq, PartialEq)]
pub enum SimCallback {
    /// Relative delay when registering, absolute time when reacting.
    Time(u64),
    Edge(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Fs,
    Ps,
    Ns,
    Us,
    Ms,
    Sec,
}

impl TimeUnit {
    pub fn exponent(self) -> i8 {
        match self {
            TimeUnit::Fs => -15,
            TimeUnit::Ps => -12,
            TimeUnit::Ns => -9,
            TimeUnit::Us => -6,
            TimeUnit::Ms => -3,
            TimeUnit::Sec => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Fs => "fs",
            TimeUnit::Ps => "ps",
            TimeUnit::Ns => "ns",
            TimeUnit::Us => "us",
            TimeUnit::Ms => "ms",
            TimeUnit::Sec => "sec",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = SimError;

    fn from_str(unit: &str) -> Result<Self, Self::Err> {
        match unit {
            "fs" => Ok(TimeUnit::Fs),
            "ps" => Ok(TimeUnit::Ps),
            "ns" => Ok(TimeUnit::Ns),
            "us" => Ok(TimeUnit::Us),
            "ms" => Ok(TimeUnit::Ms),
            "sec" | "s" => Ok(TimeUnit::Sec),
            _ => Err(SimError::TimeUnit(unit.to_string())),
        }
    }
}

pub trait SimIf {
    fn set_value_i32(&self, obj: &SimObject, value: i32) -> SimpleResult<()>;
    fn get_value_i32(&self, obj: &SimObject) -> SimpleResult<i32>;
    fn get_value_bin(&self, obj: &SimObject) -> SimpleResult<String>;
    fn get_handle_by_name(&self, name: &str) -> SimpleResult<usize>;
    fn get_root_handle(&self) -> SimpleResult<usize>;
    fn get_full_name(&self, handle: usize) -> SimpleResult<String>;
    fn get_kind(&self, handle: usize) -> ObjectKind;
    fn get_sim_time_steps(&self) -> u64;
    fn get_sim_precision(&self) -> i8;
    fn log(&self, msg: &str);
    fn register_callback(&self, cb: SimCallback) -> SimpleResult<usize>;
    fn cancel_callback(&self, cb_hdl: usize) -> SimpleResult<()>;

    fn get_sim_time(&self, unit: TimeUnit) -> f64 {
        // lossy, only meant for reporting
        let t = self.get_sim_time_steps() as f64;
        ldexp10(t, self.get_sim_precision() - unit.exponent())
    }

    fn get_sim_steps(&self, time: u64, unit: TimeUnit) -> SimpleResult<u64> {
        time_to_steps(time, unit, self.get_sim_precision())
    }
}

/// Converts `time` in `unit` to simulator steps of `10^precision` seconds.
pub fn time_to_steps(time: u64, unit: TimeUnit, precision: i8) -> SimpleResult<u64> {
    let exp = unit.exponent() - precision;
    let rounding = || SimError::TimePrecision {
        time,
        unit: unit.as_str().to_string(),
        precision,
    };
    if exp >= 0 {
        10_u64
            .checked_pow(exp as u32)
            .and_then(|m| time.checked_mul(m))
            .ok_or_else(rounding)
    } else {
        let div = 10_u64.checked_pow(-exp as u32).ok_or_else(rounding)?;
        if time % div == 0 {
            Ok(time / div)
        } else {
            Err(rounding())
        }
    }
}

// Like math.ldexp, but base 10
fn ldexp10(frac: f64, exp: i8) -> f64 {
    if exp >= 0 {
        frac * 10_f64.powi(exp as i32)
    } else {
        frac / 10_f64.powi(-exp as i32)
    }
}
