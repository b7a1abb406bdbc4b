//! Error type for the headless runner.

use muster_core::error::CoreError;
use thiserror::Error;

/// Errors raised while loading or running a scenario.
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// Scenario or config file not found.
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// Failed to read a file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// Failed to write the JSON report.
    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
    /// The scenario describes something the simulation cannot hold.
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
    /// The simulation rejected its setup.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;
