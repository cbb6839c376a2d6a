use log::{LevelFilter, Log, Metadata, Record};

use crate::sim_if::sim_if;

/// Routes `log` records through the simulator's own output.
struct SimLogger;

static LOGGER: SimLogger = SimLogger;

impl Log for SimLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(record);
        match sim_if() {
            Ok(sim) => sim.log(&line),
            Err(_) => eprintln!("{}", line),
        }
    }

    fn flush(&self) {}
}

fn format_record(record: &Record) -> String {
    format!("{:<5} {:<24} {}", record.level(), record.target(), record.args())
}

/// Installs the simulator logger. Later calls only adjust the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
