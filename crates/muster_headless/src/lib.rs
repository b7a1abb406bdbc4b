//! # Muster Headless
//!
//! Runs movement scenarios without any presentation layer: load a RON
//! scenario, replay its move orders on a grid map and emit a JSON report.
//! Used for CI checks, determinism sweeps and tuning experiments.
//!
//! ## Modules
//!
//! - [`scenario`]: Scenario files and their validation
//! - [`runner`]: Single scenario runs and reports
//! - [`batch`]: Parallel runs over many scenario files
//! - [`error`]: Error type

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod batch;
pub mod error;
pub mod runner;
pub mod scenario;

pub use error::{HeadlessError, Result};
