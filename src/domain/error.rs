//! Domain error types.
//!
//! The analytics functions never fail on degenerate data; these errors cover configuration,
//! precondition violations on simulation parameters, price loading and cancellation.

/// Top-level error type for nestcast.
#[derive(Debug, thiserror::Error)]
pub enum NestcastError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("price data error: {reason}")]
    PriceData { reason: String },

    #[error("no price data for {ticker}")]
    NoData { ticker: String },

    #[error("simulation cancelled after {completed} of {total} trials")]
    Cancelled { completed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NestcastError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        NestcastError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl From<&NestcastError> for std::process::ExitCode {
    fn from(err: &NestcastError) -> Self {
        let code: u8 = match err {
            NestcastError::Io(_) => 1,
            NestcastError::ConfigParse { .. }
            | NestcastError::ConfigMissing { .. }
            | NestcastError::ConfigInvalid { .. } => 2,
            NestcastError::PriceData { .. } => 3,
            NestcastError::InvalidParameter { .. } => 4,
            NestcastError::NoData { .. } => 5,
            NestcastError::Cancelled { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
