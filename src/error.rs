//! Solver error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by solver construction and the frame loop.
///
/// Per-frame numeric stages never fail; everything here is either an
/// initialization problem or the display surface going away.
#[derive(Debug, Error)]
pub enum FluidError {
    /// The display surface or field storage could not be acquired.
    #[error("rendering device unavailable")]
    DeviceUnavailable,

    /// The display surface became invalid after initialization.
    #[error("rendering context lost")]
    ContextLost,

    /// Nonsensical configuration values.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("failed to present frame: {0}")]
    Present(String),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid RON for [`crate::SimConfig`].
    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}
