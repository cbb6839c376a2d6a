use log::warn;

use crate::signal::SimObject;
use crate::sim_if::{sim_if, TimeUnit};
use crate::trigger::Trigger;
use crate::{RstbResult, SimpleResult};

/// Periodic driver for a clock signal.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    signal: SimObject,
    high_steps: u64,
    low_steps: u64,
}

impl Clock {
    pub fn new(signal: SimObject, period: u64, unit: &str) -> SimpleResult<Self> {
        let unit: TimeUnit = unit.parse()?;
        let high_t = period / 2;
        let low_t = period - high_t;
        if period % 2 != 0 {
            warn!(
                "Clock period {period}{unit} not dividable by 2. High time will be {high}{unit}; low time will be {low}{unit}.",
                period = period,
                unit = unit.as_str(),
                high = high_t,
                low = low_t
            );
        }
        let sim = sim_if()?;
        Ok(Clock {
            signal,
            high_steps: sim.get_sim_steps(high_t, unit)?,
            low_steps: sim.get_sim_steps(low_t, unit)?,
        })
    }

    /// Toggles the signal forever, driving it high first when `start_high` is set.
    /// Meant to be forked.
    pub async fn start(self, start_high: bool) -> RstbResult {
        let mut high = start_high;
        loop {
            self.signal.set(high as i32)?;
            let steps = if high { self.high_steps } else { self.low_steps };
            Trigger::timer_steps(steps).await?;
            high = !high;
        }
    }
}

/// Waits for `n_cycles` rising edges of `clk`.
pub async fn clock_cycles(clk: SimObject, n_cycles: u32) -> SimpleResult<()> {
    for _ in 0..n_cycles {
        clk.rising_edge().await?;
    }
    Ok(())
}
