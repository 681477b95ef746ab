//! Alignment of clinical event tables onto a per-admission time grid.
//!
//! The entry point is [`align_admission`], which resolves the admission
//! window, builds a [`TimeGrid`] and projects each configured source:
//!
//! - continuous sources (infusions, prescriptions) through
//!   [`WindowFilter`] and [`project_intervals`]
//! - discrete sources (vitals, labs) through [`WindowFilter`] and
//!   [`bin_samples`]
//! - categorical sources (transfers, procedures) through [`bin_categories`]
//!
//! The crate performs no I/O; tables are Polars frames in and out.

pub mod bundle;
pub mod categorical;
pub mod error;
pub mod filter;
pub mod grid;
pub mod interval;
pub mod pipeline;
pub mod resolver;
pub mod sample;
pub mod timestamp;

pub use bundle::{AdmissionBundle, AlignedAdmission, AlignedSeries};
pub use categorical::bin_categories;
pub use error::{AlignError, Result};
pub use filter::WindowFilter;
pub use grid::{BIN_INDEX_COL, GRID_COLUMNS, GridPoint, HOURS_COL, TIME_POINT_COL, TimeGrid};
pub use interval::{IntervalProjection, project_intervals};
pub use pipeline::{Diagnostics, align_admission, reported};
pub use resolver::{TimedTable, WindowResolution, resolve_window};
pub use sample::{PRESENT_SUFFIX, bin_samples};
pub use timestamp::{
    Coerced, CoercionIssue, DateAnchor, any_to_timestamp, coerce_labels, coerce_numbers,
    coerce_timestamps, number_column, parse_timestamp, timestamp_column,
};
