use thiserror::Error;

/// Errors raised while resolving a forecast request, always before any I/O happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("Coordinate ({lat}, {lon}) is outside the lattice domain")]
    OutOfDomain { lat: f64, lon: f64 },

    #[error("Invalid forecast horizon: {0}")]
    InvalidHorizon(String),

    #[error("Invalid forecast request: {0}")]
    InvalidRequest(String),

    #[error("Invalid lattice resolution {resolution}: {reason}")]
    InvalidLattice { resolution: f64, reason: String },

    #[error("No model runs available for model '{0}'")]
    NoModelRuns(String),
}
