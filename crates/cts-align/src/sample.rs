//! Sample binning for discrete sources.

use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::Result;
use crate::grid::TimeGrid;
use crate::timestamp::{
    DateAnchor, coerce_labels, coerce_numbers, coerce_timestamps, has_column, require_column,
};

/// Suffix of the per-label observation flag column.
pub const PRESENT_SUFFIX: &str = "_present";

#[derive(Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: u32,
}

/// Bin point samples into grid bins.
///
/// Every label with at least one sample inside the grid gets a mean column
/// (null where the bin holds no value) and a `<name>_present` column that is
/// 1 where the bin holds at least one non-missing value. A frame without the
/// label column yields the bare grid.
pub fn bin_samples(
    events: &DataFrame,
    grid: &TimeGrid,
    time_col: &str,
    value_col: &str,
    label_col: &str,
) -> Result<DataFrame> {
    if events.height() == 0 || !has_column(events, label_col) {
        return Ok(grid.to_frame()?);
    }
    let times = coerce_timestamps(require_column(events, time_col)?, DateAnchor::Midnight)?.values;
    let values = coerce_numbers(require_column(events, value_col)?)?.values;
    let labels = coerce_labels(require_column(events, label_col)?)?;

    let width = grid.len();
    let mut bins: BTreeMap<&str, Vec<Accumulator>> = BTreeMap::new();
    for row in 0..events.height() {
        let (Some(label), Some(time)) = (labels[row].as_deref(), times[row]) else {
            continue;
        };
        let Some(bin) = grid.bin_of(time) else {
            continue;
        };
        let accumulators = bins
            .entry(label)
            .or_insert_with(|| vec![Accumulator::default(); width]);
        if let Some(value) = values[row] {
            accumulators[bin].sum += value;
            accumulators[bin].count += 1;
        }
    }

    let mut namer = grid.namer();
    let mut columns = Vec::with_capacity(bins.len() * 2);
    for (label, accumulators) in bins {
        let name = namer.assign_with_suffixes(label, &[PRESENT_SUFFIX]);
        let means: Vec<Option<f64>> = accumulators
            .iter()
            .map(|acc| (acc.count > 0).then(|| acc.sum / f64::from(acc.count)))
            .collect();
        let present: Vec<i32> = accumulators
            .iter()
            .map(|acc| i32::from(acc.count > 0))
            .collect();
        columns.push(Column::new(name.as_str().into(), means));
        columns.push(Column::new(format!("{name}{PRESENT_SUFFIX}").into(), present));
    }
    Ok(grid.frame_with(&columns)?)
}
