//! Presence binning for categorical sources.

use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::Result;
use crate::grid::TimeGrid;
use crate::timestamp::{DateAnchor, coerce_labels, coerce_timestamps, has_column, require_column};

/// Mark, per label, the grid bins in which the label occurs.
///
/// Every non-missing label gets a 0/1 column, including labels whose events
/// all fall outside the grid.
pub fn bin_categories(
    events: &DataFrame,
    grid: &TimeGrid,
    time_col: &str,
    label_col: &str,
) -> Result<DataFrame> {
    if events.height() == 0 || !has_column(events, label_col) {
        return Ok(grid.to_frame()?);
    }
    let times = coerce_timestamps(require_column(events, time_col)?, DateAnchor::Midnight)?.values;
    let labels = coerce_labels(require_column(events, label_col)?)?;

    let width = grid.len();
    let mut presence: BTreeMap<&str, Vec<i32>> = BTreeMap::new();
    for (label, time) in labels.iter().zip(&times) {
        let Some(label) = label.as_deref() else {
            continue;
        };
        let flags = presence.entry(label).or_insert_with(|| vec![0; width]);
        if let Some(bin) = time.and_then(|t| grid.bin_of(t)) {
            flags[bin] = 1;
        }
    }

    let mut namer = grid.namer();
    let columns: Vec<Column> = presence
        .into_iter()
        .map(|(label, flags)| Column::new(namer.assign(label).into(), flags))
        .collect();
    Ok(grid.frame_with(&columns)?)
}
