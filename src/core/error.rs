use thiserror::Error;

/// Errors raised by the scoring engines and the service layer around them.
///
/// Invalid locations and sparse case data are not errors; they come back as
/// ordinary [`TrendOutcome`](crate::engines::trend::TrendOutcome) variants.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or out-of-domain input. Fix the input, do not retry.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No weather reading could be obtained for the requested city.
    #[error("weather unavailable: {0}")]
    WeatherUnavailable(String),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }
}
