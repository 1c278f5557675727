#[cfg(feature = "python")]
use pyo3::exceptions::{PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Data not loaded: {0}")]
    NotLoaded(String),

    #[error("Baseline model not trained; call train() after loading observations")]
    NotTrained,

    #[error("Farm has no open batches: {0}")]
    UnknownFarm(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Baseline model cannot be trained: no observations from closed batches")]
    UntrainableBaseline,

    #[error("Forecast run belongs to training generation {run}, current generation is {current}")]
    StaleRun { run: uuid::Uuid, current: uuid::Uuid },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a batch (or one of its sub-computations) produced no output.
///
/// These are reported alongside results, never raised: a skipped batch
/// does not abort the rest of the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    #[error("only {observed} observed weeks, at least {required} required")]
    InsufficientHistory { observed: usize, required: usize },

    #[error(
        "only {points} observations after peak week {peak_week} + guard, at least {required} required"
    )]
    InsufficientDecline {
        peak_week: u32,
        points: usize,
        required: usize,
    },

    #[error("only {points} population observations, at least {required} required")]
    InsufficientPopulation { points: usize, required: usize },

    #[error("last observed week {last_week} leaves no weeks to forecast up to {horizon_end}")]
    HorizonExhausted { last_week: u32, horizon_end: u32 },
}

impl SkipReason {
    /// Short machine-readable tag, used as the `reason` column in exclusion tables.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientHistory { .. } => "insufficient_history",
            Self::InsufficientDecline { .. } => "insufficient_decline",
            Self::InsufficientPopulation { .. } => "insufficient_population",
            Self::HorizonExhausted { .. } => "horizon_exhausted",
        }
    }
}

#[cfg(feature = "python")]
impl From<ForecastError> for PyErr {
    fn from(err: ForecastError) -> PyErr {
        match err {
            ForecastError::InvalidConfig(_) => PyValueError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}
