//! Admission window resolution.
//!
//! Recorded admit times are sometimes later than the first charted event (the
//! patient was charted in the emergency department before the admission was
//! filed). The resolver validates the recorded window, then moves the admit
//! time back to the earliest event.

use chrono::NaiveDateTime;
use cts_model::AdmissionWindow;
use polars::prelude::*;
use tracing::{debug, warn};

use crate::timestamp::{DateAnchor, coerce_timestamps, has_column};

/// An event table and the columns that carry event times.
#[derive(Debug, Clone)]
pub struct TimedTable<'a> {
    pub frame: &'a DataFrame,
    pub columns: Vec<&'a str>,
    pub anchor: DateAnchor,
}

impl<'a> TimedTable<'a> {
    pub fn new(frame: &'a DataFrame, columns: Vec<&'a str>) -> Self {
        Self {
            frame,
            columns,
            anchor: DateAnchor::Midnight,
        }
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: DateAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Earliest parseable timestamp across the time columns. Absent columns
    /// and unparseable cells are ignored.
    pub fn earliest(&self) -> PolarsResult<Option<NaiveDateTime>> {
        let mut earliest: Option<NaiveDateTime> = None;
        for name in &self.columns {
            if !has_column(self.frame, name) {
                continue;
            }
            let coerced = coerce_timestamps(self.frame.column(name)?, self.anchor)?;
            let column_min = coerced.values.iter().flatten().min().copied();
            earliest = match (earliest, column_min) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        Ok(earliest)
    }
}

/// Outcome of [`resolve_window`].
#[derive(Debug, Clone, PartialEq)]
pub struct WindowResolution {
    pub admit_time: Option<NaiveDateTime>,
    pub discharge_time: Option<NaiveDateTime>,
    /// Present only when both bounds exist and admit precedes discharge.
    pub window: Option<AdmissionWindow>,
    pub message: Option<String>,
}

/// Resolve the effective admission window.
///
/// The recorded pair is validated first: a missing or inverted window is
/// returned unchanged with a QC message and no `window`. Otherwise the admit
/// time becomes the minimum of the recorded admit time and the earliest event
/// time in `tables`.
pub fn resolve_window(
    admit_time: Option<NaiveDateTime>,
    discharge_time: Option<NaiveDateTime>,
    tables: &[TimedTable<'_>],
) -> WindowResolution {
    let recorded = match (admit_time, discharge_time) {
        (Some(admit), Some(discharge)) => AdmissionWindow::new(admit, discharge).ok(),
        _ => None,
    };
    let Some(recorded) = recorded else {
        warn!(
            admit_time = ?admit_time,
            discharge_time = ?discharge_time,
            "admission window failed validation"
        );
        return WindowResolution {
            admit_time,
            discharge_time,
            window: None,
            message: Some("QC failed: invalid admit_time or discharge_time".to_string()),
        };
    };

    let mut earliest_event: Option<NaiveDateTime> = None;
    let mut notes = Vec::new();
    for table in tables {
        match table.earliest() {
            Ok(Some(t)) => earliest_event = Some(earliest_event.map_or(t, |e| e.min(t))),
            Ok(None) => {}
            Err(error) => notes.push(format!("could not scan event times: {error}")),
        }
    }

    let recorded_admit = recorded.admit_time();
    let mut window = recorded;
    if let Some(event) = earliest_event
        && event < recorded_admit
    {
        // event < admit < discharge, so the shifted window stays valid
        if let Ok(shifted) = AdmissionWindow::new(event, recorded.discharge_time()) {
            debug!(
                recorded = %recorded_admit,
                resolved = %event,
                "admit time moved to earliest event"
            );
            notes.push(format!(
                "admit time moved from {recorded_admit} to earliest event at {event}"
            ));
            window = shifted;
        }
    }

    WindowResolution {
        admit_time: Some(window.admit_time()),
        discharge_time,
        window: Some(window),
        message: (!notes.is_empty()).then(|| notes.join("; ")),
    }
}
