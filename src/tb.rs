//! Smoke test for a Tiny Tapeout project: reset, drive fixed inputs, then watch `uio_out`.

use log::info;

use crate::clock::{clock_cycles, Clock};
use crate::executor::Task;
use crate::signal::SimObject;
use crate::value::Val;
use crate::RstbResult;

pub const CLOCK_PERIOD_US: u64 = 10;
pub const RESET_CYCLES: u32 = 10;
pub const UI_IN: i32 = 20;
pub const UIO_IN: i32 = 30;
pub const SAMPLE_INTERVAL: u32 = 256;
pub const SAMPLE_COUNT: u32 = 32;

// Log target, so testbench lines stand apart from framework output.
const TB: &str = "tb";

/// Observes `uio_out` every 256 cycles after reset. Makes no assertion on the values.
pub async fn test_project(dut: SimObject) -> RstbResult {
    info!(target: TB, "Start");
    let clk = dut.get_child("clk")?;
    Task::fork(Clock::new(clk, CLOCK_PERIOD_US, "us")?.start(true));

    info!(target: TB, "Reset");
    let rst_n = dut.get_child("rst_n")?;
    let ui_in = dut.get_child("ui_in")?;
    let uio_in = dut.get_child("uio_in")?;
    dut.get_child("ena")?.set(1)?;
    ui_in.set(0)?;
    uio_in.set(0)?;
    rst_n.set(0)?;
    clock_cycles(clk, RESET_CYCLES).await?;
    rst_n.set(1)?;

    info!(target: TB, "Test project behavior");
    ui_in.set(UI_IN)?;
    uio_in.set(UIO_IN)?;
    clock_cycles(clk, 1).await?;

    let uio_out = dut.get_child("uio_out")?;
    for i in 0..SAMPLE_COUNT {
        clock_cycles(clk, SAMPLE_INTERVAL).await?;
        info!(
            target: TB,
            "Cycle {}: uio_out = {}",
            (i + 1) * SAMPLE_INTERVAL,
            uio_out.bin()?
        );
    }
    Ok(Val::None)
}
