use crate::signal::ObjectKind;
use crate::value::Val;

/// Errors raised while talking to the simulator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("no simulator interface installed")]
    NoInterface,
    #[error("could not find object '{0}'")]
    NotFound(String),
    #[error("object '{name}' of kind {kind:?} can't be written as an integer")]
    NotWritable { name: String, kind: ObjectKind },
    #[error("could not read value of '{0}'")]
    Read(String),
    #[error("simulator rejected callback {0}")]
    Callback(String),
    #[error("unknown time unit '{0}'")]
    TimeUnit(String),
    #[error("can't convert {time} {unit} to sim steps without rounding (sim precision: 1e{precision} s)")]
    TimePrecision { time: u64, unit: String, precision: i8 },
}

impl From<SimError> for Val {
    fn from(err: SimError) -> Self {
        Val::String(err.to_string())
    }
}
