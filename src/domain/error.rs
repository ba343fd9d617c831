//! Domain error types.
//!
//! Data-integrity and configuration problems are fatal and abort a run
//! before or during the event loop. Vetoed trades and undefined metrics are
//! ordinary outcomes recorded in the result, never errors.

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum TradesimError {
    #[error("data integrity error for {symbol} at bar {bar_index} ({timestamp}): {reason}")]
    DataIntegrity {
        symbol: String,
        bar_index: usize,
        timestamp: String,
        reason: String,
    },

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

    #[error("indicator period must be positive, got {period}")]
    IndicatorPeriod { period: usize },

    #[error("indicator window {period} exceeds series length {len}")]
    IndicatorWindow { period: usize, len: usize },

    #[error("no bars supplied for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradesimError> for std::process::ExitCode {
    fn from(err: &TradesimError) -> Self {
        let code: u8 = match err {
            TradesimError::Io(_) => 1,
            TradesimError::ConfigParse { .. }
            | TradesimError::ConfigMissing { .. }
            | TradesimError::ConfigInvalid { .. } => 2,
            TradesimError::DataIntegrity { .. } => 3,
            TradesimError::IndicatorPeriod { .. } | TradesimError::IndicatorWindow { .. } => 4,
            TradesimError::NoData { .. } | TradesimError::InsufficientData { .. } => 5,
            TradesimError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
