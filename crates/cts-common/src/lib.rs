//! Shared utilities for the clinical time-series crates.
//!
//! This crate provides Polars value helpers and the label-to-column-name
//! normalization used by every projector.

pub mod naming;
pub mod polars;

pub use naming::{ColumnNamer, DEFAULT_MAX_NAME_LEN, clean_column_name};
pub use polars::{any_to_f64, any_to_string, any_to_string_non_empty, format_numeric, parse_f64};
