//! Interval projection for continuous sources.
//!
//! Each labelled event `[start, end)` marks every grid point inside it. In
//! flag mode the mark is `1`; in value mode it is the event's value, with
//! overlapping events of one label resolved to the maximum.

use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::grid::TimeGrid;
use crate::timestamp::{
    DateAnchor, coerce_labels, coerce_numbers, coerce_timestamps, require_column,
};

/// Column configuration for [`project_intervals`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalProjection<'a> {
    pub start_col: &'a str,
    pub end_col: &'a str,
    pub label_col: &'a str,
    pub value_col: Option<&'a str>,
    /// Flag written where no event is active, flag mode only.
    pub default_flag: i32,
}

impl<'a> IntervalProjection<'a> {
    pub fn new(start_col: &'a str, end_col: &'a str, label_col: &'a str) -> Self {
        Self {
            start_col,
            end_col,
            label_col,
            value_col: None,
            default_flag: 0,
        }
    }

    #[must_use]
    pub fn with_value_col(mut self, value_col: Option<&'a str>) -> Self {
        self.value_col = value_col;
        self
    }

    #[must_use]
    pub fn with_default_flag(mut self, default_flag: i32) -> Self {
        self.default_flag = default_flag;
        self
    }
}

enum Track {
    Flags(Vec<i32>),
    Values { values: Vec<f64>, covered: Vec<bool> },
}

impl Track {
    fn into_column(self, name: &str) -> Column {
        match self {
            Self::Flags(flags) => Column::new(name.into(), flags),
            Self::Values { values, .. } => Column::new(name.into(), values),
        }
    }
}

/// Project interval events onto `grid`, one column per distinct label.
///
/// Events without an end stay active until one step past the last grid
/// point. Events without a start or label are skipped, as are value-mode
/// events without a value.
pub fn project_intervals(
    events: &DataFrame,
    grid: &TimeGrid,
    projection: &IntervalProjection<'_>,
) -> Result<DataFrame> {
    if events.height() == 0 {
        return Ok(grid.to_frame()?);
    }
    let starts = coerce_timestamps(
        require_column(events, projection.start_col)?,
        DateAnchor::Midnight,
    )?
    .values;
    let ends = coerce_timestamps(
        require_column(events, projection.end_col)?,
        DateAnchor::Midnight,
    )?
    .values;
    let labels = coerce_labels(require_column(events, projection.label_col)?)?;
    let values = match projection.value_col {
        Some(value_col) => Some(coerce_numbers(require_column(events, value_col)?)?.values),
        None => None,
    };

    let width = grid.len();
    let mut tracks: BTreeMap<&str, Track> = BTreeMap::new();
    for label in labels.iter().flatten() {
        tracks.entry(label.as_str()).or_insert_with(|| {
            if values.is_some() {
                Track::Values {
                    values: vec![0.0; width],
                    covered: vec![false; width],
                }
            } else {
                Track::Flags(vec![projection.default_flag; width])
            }
        });
    }

    let open_end = grid.last_edge();
    let mut skipped = 0usize;
    for row in 0..events.height() {
        let (Some(label), Some(start)) = (labels[row].as_deref(), starts[row]) else {
            skipped += 1;
            continue;
        };
        let Some(end) = ends[row].or(open_end) else {
            continue;
        };
        let Some(track) = tracks.get_mut(label) else {
            continue;
        };
        let span = grid.points_within(start, end);
        match track {
            Track::Flags(flags) => flags[span].fill(1),
            Track::Values { values: cells, covered } => {
                let Some(value) = values.as_ref().and_then(|v| v[row]) else {
                    skipped += 1;
                    continue;
                };
                for idx in span {
                    cells[idx] = if covered[idx] { cells[idx].max(value) } else { value };
                    covered[idx] = true;
                }
            }
        }
    }
    if skipped > 0 {
        debug!(skipped, "interval events without start, label or value");
    }

    let mut namer = grid.namer();
    let columns: Vec<Column> = tracks
        .into_iter()
        .map(|(label, track)| track.into_column(&namer.assign(label)))
        .collect();
    Ok(grid.frame_with(&columns)?)
}
