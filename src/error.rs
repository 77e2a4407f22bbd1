// ------------------------------------------------------------
// Error types shared by the simulation and rendering pipeline.
// ------------------------------------------------------------

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Every variant is terminal for the run in which it occurs.
#[derive(Error, Debug)]
pub enum Error {
    /// Parameters rejected before any simulation or rendering work started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The adaptive integrator could not meet its tolerance above the minimum step size.
    #[error("numerical divergence at t = {t}: step {step:e} fell below minimum {min_step:e}")]
    NumericalDivergence { t: f64, step: f64, min_step: f64 },

    /// The video sink could not be opened, written to, or finalized.
    #[error("video sink failure: {0}")]
    SinkFailure(String),

    /// A diagnostic file (CSV log or plot) could not be written.
    #[error("failed to write {path}: {message}")]
    Export { path: String, message: String },
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    pub(crate) fn sink(msg: impl Into<String>) -> Self {
        Error::SinkFailure(msg.into())
    }

    pub(crate) fn export(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Error::Export {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
