//! Error types for grid alignment.

use chrono::NaiveDateTime;
use cts_model::ModelError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Hard failures of the alignment layer.
///
/// Data-quality problems are not errors: they surface as diagnostic strings.
/// These variants cover configuration faults and Polars failures, which the
/// orchestrator downgrades to a diagnostic for the affected source.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("end time {end} is earlier than admit time {admit}")]
    EndBeforeAdmit {
        admit: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("grid would need {points} points, limit is {limit}")]
    TooManyPoints { points: usize, limit: usize },

    #[error("time span from {start} to {end} is too large for a grid")]
    SpanOverflow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl AlignError {
    pub(crate) fn missing_column(column: &str) -> Self {
        Self::MissingColumn {
            column: column.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AlignError>;
