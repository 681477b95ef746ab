//! Command-line front end for clinical time-series alignment.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
pub mod types;
