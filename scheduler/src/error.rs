//! Error types for telemetry handling and survey scheduling.

/// Result type for scheduling operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors raised while storing or deriving telemetry in [`Conditions`](crate::conditions::Conditions).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionsError {
    #[error("{field} is not available: {missing} has not been set")]
    NotAvailable {
        field: &'static str,
        missing: &'static str,
    },

    #[error("Degenerate sky map: a field needs at least one pixel")]
    DegenerateField,

    #[error("Invalid pixel count {len}: not 12 * nside^2 for any nside")]
    InvalidPixelCount { len: usize },

    #[error("Invalid nside {0}: must be between 1 and {max}", max = crate::sky::grid::MAX_NSIDE)]
    InvalidNside(u32),

    #[error("Mounted filter set is empty")]
    EmptyFilterSet,
}

/// Error type for survey and scheduler operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Conditions error: {0}")]
    Conditions(#[from] ConditionsError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Resolution mismatch: survey uses nside {survey}, conditions use nside {conditions}")]
    ResolutionMismatch { survey: u32, conditions: u32 },
}

impl From<String> for SchedulerError {
    fn from(s: String) -> Self {
        SchedulerError::Configuration(s)
    }
}

impl From<&str> for SchedulerError {
    fn from(s: &str) -> Self {
        SchedulerError::Configuration(s.to_string())
    }
}
