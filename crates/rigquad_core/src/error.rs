use thiserror::Error;

/// Invalid input to an integration run. Running out of budget is not an
/// error; it is reported through [`crate::Status`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("working precision must be positive")]
    ZeroPrecision,
    #[error("a path needs at least two points, got {0}")]
    TooFewPoints(usize),
    #[error("path point {0} is not finite")]
    NonFiniteEndpoint(usize),
    #[error("tolerance must be finite")]
    NonFiniteTolerance,
}
