//! Per-admission input and output bundles.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use cts_model::SourceKind;
use polars::prelude::DataFrame;

use crate::grid::{GRID_COLUMNS, TimeGrid};

/// Raw event tables of one admission, keyed by source name.
#[derive(Debug, Clone, Default)]
pub struct AdmissionBundle {
    pub id: String,
    pub admit_time: Option<NaiveDateTime>,
    pub discharge_time: Option<NaiveDateTime>,
    pub tables: BTreeMap<String, DataFrame>,
}

impl AdmissionBundle {
    pub fn new(
        id: impl Into<String>,
        admit_time: Option<NaiveDateTime>,
        discharge_time: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            id: id.into(),
            admit_time,
            discharge_time,
            tables: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_table(mut self, source: impl Into<String>, frame: DataFrame) -> Self {
        self.tables.insert(source.into(), frame);
        self
    }
}

/// One source projected onto the grid.
#[derive(Debug, Clone)]
pub struct AlignedSeries {
    pub kind: SourceKind,
    /// Grid columns followed by the label columns.
    pub frame: DataFrame,
}

impl AlignedSeries {
    /// Names of the columns added on top of the grid.
    pub fn label_columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .filter(|name| !GRID_COLUMNS.contains(&name.as_str()))
            .collect()
    }
}

/// Everything produced for one admission.
#[derive(Debug, Clone, Default)]
pub struct AlignedAdmission {
    pub id: String,
    /// Admit time after resolution against the earliest event.
    pub admit_time: Option<NaiveDateTime>,
    pub discharge_time: Option<NaiveDateTime>,
    pub grid: Option<TimeGrid>,
    pub series: BTreeMap<String, AlignedSeries>,
    /// Original tables of sources that lack a configured time column.
    pub passthrough: BTreeMap<String, DataFrame>,
}

impl AlignedAdmission {
    pub fn grid_len(&self) -> usize {
        self.grid.as_ref().map_or(0, TimeGrid::len)
    }
}
