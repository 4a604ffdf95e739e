//! # Utilities Module
//!
//! Internal utility modules for the dispatch-core crate.

pub(crate) mod logger;

pub use logger::{setup_logger, setup_logger_in, RESULT_TARGET};
