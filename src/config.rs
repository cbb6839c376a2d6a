use log::{warn, LevelFilter};
use std::path::PathBuf;

pub const RESULTS_FILE_VAR: &str = "RSTB_RESULTS_FILE";
pub const LOG_LEVEL_VAR: &str = "RSTB_LOG_LEVEL";

const DEFAULT_RESULTS_FILE: &str = "results.xml";
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Run settings taken from the environment of the simulator process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub results_file: PathBuf,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            results_file: PathBuf::from(DEFAULT_RESULTS_FILE),
            log_level: DEFAULT_LOG_LEVEL,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        if let Some(path) = lookup(RESULTS_FILE_VAR).filter(|p| !p.is_empty()) {
            config.results_file = PathBuf::from(path);
        }
        if let Some(level) = lookup(LOG_LEVEL_VAR) {
            match level.parse::<LevelFilter>() {
                Ok(level) => config.log_level = level,
                Err(_) => warn!(
                    "Ignoring {}={}, using {}",
                    LOG_LEVEL_VAR, level, DEFAULT_LOG_LEVEL
                ),
            }
        }
        config
    }
}
