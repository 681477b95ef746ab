//! Single-admission alignment pipeline.
//!
//! Runs window resolution, grid construction and the per-source filter and
//! projection steps. Nothing in here fails hard: every step reports into a
//! diagnostics list and the pipeline carries on with whatever it could build.

use std::collections::BTreeMap;
use std::time::Instant;

use cts_model::{AdmissionWindow, AlignmentOptions, SourceColumns, SourceDescriptor, SourceKind};
use polars::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::bundle::{AdmissionBundle, AlignedAdmission, AlignedSeries};
use crate::categorical::bin_categories;
use crate::error::{AlignError, Result};
use crate::filter::WindowFilter;
use crate::grid::TimeGrid;
use crate::interval::{IntervalProjection, project_intervals};
use crate::resolver::{TimedTable, resolve_window};
use crate::sample::bin_samples;
use crate::timestamp::{
    DateAnchor, coerce_numbers, coerce_timestamps, has_column, number_column, timestamp_column,
};

/// One slot per executed step; `None` means the step passed.
pub type Diagnostics = Vec<Option<String>>;

/// The messages of the steps that reported something.
pub fn reported(diagnostics: &[Option<String>]) -> Vec<&str> {
    diagnostics.iter().flatten().map(String::as_str).collect()
}

/// Align every configured source of one admission onto its time grid.
///
/// Slots are pushed in a fixed order: window resolution, grid construction,
/// then one per source that has a non-empty table, in descriptor order.
pub fn align_admission(
    bundle: &AdmissionBundle,
    sources: &[SourceDescriptor],
    options: &AlignmentOptions,
) -> (AlignedAdmission, Diagnostics) {
    let span = info_span!("align_admission", admission_id = %bundle.id);
    let _guard = span.enter();
    let start = Instant::now();

    let prepared: BTreeMap<&str, PreparedTable> = sources
        .iter()
        .filter_map(|source| {
            let frame = bundle.tables.get(&source.name)?;
            (frame.height() > 0).then(|| (source.name.as_str(), prepare_table(frame, source)))
        })
        .collect();

    let mut diagnostics = Diagnostics::new();

    let timed: Vec<TimedTable<'_>> = sources
        .iter()
        .filter_map(|source| {
            let table = prepared.get(source.name.as_str())?;
            Some(TimedTable::new(&table.frame, source.time_columns()))
        })
        .collect();
    let resolution = resolve_window(bundle.admit_time, bundle.discharge_time, &timed);
    diagnostics.push(resolution.message.clone());

    let grid = match resolution.window {
        Some(window) => match TimeGrid::build(
            window.admit_time(),
            window.discharge_time(),
            options.resolution_hours,
            options.observation_window_hours,
        ) {
            Ok(grid) => {
                diagnostics.push(None);
                Some(grid)
            }
            Err(error) => {
                diagnostics.push(Some(format!("time grid not built: {error}")));
                None
            }
        },
        None => {
            diagnostics.push(Some(
                "time grid not built: no valid admission window".to_string(),
            ));
            None
        }
    };

    let mut series = BTreeMap::new();
    let mut passthrough = BTreeMap::new();
    for source in sources {
        let Some(table) = prepared.get(source.name.as_str()) else {
            debug!(source = %source.name, "no events, skipping");
            continue;
        };
        let source_span = info_span!("source", source = %source.name, kind = %source.kind);
        let _source_guard = source_span.enter();

        let mut notes = table.notes.clone();
        let outcome = match (grid.as_ref(), resolution.window) {
            (Some(grid), Some(window)) => {
                align_source(source, &table.frame, grid, window, &mut notes)
            }
            _ => {
                notes.push("not aligned: no time grid".to_string());
                SourceOutcome::Skipped
            }
        };
        match outcome {
            SourceOutcome::Aligned(frame) => {
                debug!(
                    rows = table.frame.height(),
                    columns = frame.width(),
                    "source aligned"
                );
                series.insert(
                    source.name.clone(),
                    AlignedSeries {
                        kind: source.kind.clone(),
                        frame,
                    },
                );
            }
            SourceOutcome::Passthrough => {
                if let Some(original) = bundle.tables.get(&source.name) {
                    passthrough.insert(source.name.clone(), original.clone());
                }
            }
            SourceOutcome::Skipped => {}
        }
        let message = (!notes.is_empty()).then(|| format!("{}: {}", source.name, notes.join("; ")));
        diagnostics.push(message);
    }

    for message in diagnostics.iter().flatten() {
        warn!(admission_id = %bundle.id, "{message}");
    }
    info!(
        admission_id = %bundle.id,
        grid_points = grid.as_ref().map_or(0, TimeGrid::len),
        aligned_sources = series.len(),
        issues = reported(&diagnostics).len(),
        duration_ms = start.elapsed().as_millis(),
        "admission aligned"
    );

    let aligned = AlignedAdmission {
        id: bundle.id.clone(),
        admit_time: resolution.admit_time,
        discharge_time: resolution.discharge_time,
        grid,
        series,
        passthrough,
    };
    (aligned, diagnostics)
}

struct PreparedTable {
    frame: DataFrame,
    notes: Vec<String>,
}

/// Parse the configured time and value columns once, up front.
fn prepare_table(frame: &DataFrame, source: &SourceDescriptor) -> PreparedTable {
    let mut notes = Vec::new();
    let frame = match normalize_columns(frame, source, &mut notes) {
        Ok(normalized) => normalized,
        Err(error) => {
            notes.push(format!("columns not normalized: {error}"));
            frame.clone()
        }
    };
    PreparedTable { frame, notes }
}

fn normalize_columns(
    frame: &DataFrame,
    source: &SourceDescriptor,
    notes: &mut Vec<String>,
) -> PolarsResult<DataFrame> {
    let anchor = DateAnchor::from_midday(source.midday_dates);
    let mut normalized = frame.clone();
    let time_cols = [&source.time_col, &source.start_col, &source.end_col];
    for name in time_cols.into_iter().flatten() {
        if !has_column(frame, name) {
            continue;
        }
        let coerced = coerce_timestamps(frame.column(name)?, anchor)?;
        notes.extend(coerced.summary(name));
        normalized.with_column(timestamp_column(name, &coerced.values))?;
    }
    if let Some(name) = &source.value_col
        && has_column(frame, name)
    {
        let coerced = coerce_numbers(frame.column(name)?)?;
        notes.extend(coerced.summary(name));
        normalized.with_column(number_column(name, &coerced.values))?;
    }
    Ok(normalized)
}

enum SourceOutcome {
    Aligned(DataFrame),
    /// A configured column is absent; the original table is handed back.
    Passthrough,
    Skipped,
}

fn align_source(
    source: &SourceDescriptor,
    frame: &DataFrame,
    grid: &TimeGrid,
    window: AdmissionWindow,
    notes: &mut Vec<String>,
) -> SourceOutcome {
    let columns = match source.columns() {
        Ok(columns) => columns,
        Err(error) => {
            notes.push(error.to_string());
            return SourceOutcome::Skipped;
        }
    };
    if let Some(column) = first_missing_time_column(frame, columns) {
        notes.push(format!("passed through unprojected: missing column '{column}'"));
        return SourceOutcome::Passthrough;
    }
    match project_source(source, columns, frame, grid, window, notes) {
        Ok(frame) => SourceOutcome::Aligned(frame),
        Err(AlignError::MissingColumn { column }) => {
            notes.push(format!("passed through unprojected: missing column '{column}'"));
            SourceOutcome::Passthrough
        }
        Err(error) => {
            notes.push(format!("not projected: {error}"));
            SourceOutcome::Skipped
        }
    }
}

fn first_missing_time_column<'a>(
    frame: &DataFrame,
    columns: SourceColumns<'a>,
) -> Option<&'a str> {
    let names = match columns {
        SourceColumns::Interval { start, end } => vec![start, end],
        SourceColumns::Point { time } => vec![time],
    };
    names.into_iter().find(|name| !has_column(frame, name))
}

fn project_source(
    source: &SourceDescriptor,
    columns: SourceColumns<'_>,
    frame: &DataFrame,
    grid: &TimeGrid,
    window: AdmissionWindow,
    notes: &mut Vec<String>,
) -> Result<DataFrame> {
    let label_col = source.label_col.as_str();
    let (admit, discharge) = (window.admit_time(), window.discharge_time());
    match (&source.kind, columns) {
        (SourceKind::Continuous, SourceColumns::Interval { start, end }) => {
            let (filtered, message) =
                WindowFilter::interval(start, end).apply(frame, admit, discharge)?;
            notes.extend(message);
            let projection = IntervalProjection::new(start, end, label_col)
                .with_value_col(source.value_col.as_deref());
            project_intervals(&filtered, grid, &projection)
        }
        (SourceKind::Discrete, SourceColumns::Point { time }) => {
            let (filtered, message) = WindowFilter::point(time).apply(frame, admit, discharge)?;
            notes.extend(message);
            let value_col = source.value_col.as_deref().unwrap_or_default();
            bin_samples(&filtered, grid, time, value_col, label_col)
        }
        (SourceKind::Categorical, SourceColumns::Point { time }) => {
            bin_categories(frame, grid, time, label_col)
        }
        (kind, _) => Err(cts_model::ModelError::Descriptor {
            name: source.name.clone(),
            reason: format!("columns do not fit datatype {kind}"),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn reports_slots_in_order() {
        let vitals = DataFrame::new(vec![
            Column::new("charttime".into(), vec!["2150-01-01 01:10:00"]),
            Column::new("valuenum".into(), vec![72.0]),
            Column::new("label".into(), vec!["Heart Rate"]),
        ])
        .unwrap();
        let bundle = AdmissionBundle::new(
            "100",
            Some(ts("2150-01-01 00:00:00")),
            Some(ts("2150-01-01 04:00:00")),
        )
        .with_table("vitals", vitals);
        let sources = vec![SourceDescriptor::discrete(
            "vitals",
            "charttime",
            "valuenum",
            "label",
        )];
        let (aligned, diagnostics) =
            align_admission(&bundle, &sources, &AlignmentOptions::default());
        assert_eq!(diagnostics, vec![None, None, None]);
        assert_eq!(aligned.grid_len(), 5);
        assert_eq!(
            aligned.series["vitals"].label_columns(),
            vec!["Heart_Rate", "Heart_Rate_present"]
        );
    }

    #[test]
    fn unknown_kind_is_reported_and_skipped() {
        let waves = DataFrame::new(vec![
            Column::new("charttime".into(), vec!["2150-01-01 01:10:00"]),
            Column::new("label".into(), vec!["II"]),
        ])
        .unwrap();
        let bundle = AdmissionBundle::new(
            "100",
            Some(ts("2150-01-01 00:00:00")),
            Some(ts("2150-01-01 04:00:00")),
        )
        .with_table("waves", waves);
        let mut source = SourceDescriptor::categorical("waves", "charttime", "label");
        source.kind = SourceKind::from("waveform");
        let (aligned, diagnostics) =
            align_admission(&bundle, &[source], &AlignmentOptions::default());
        assert!(aligned.series.is_empty());
        assert_eq!(
            diagnostics[2].as_deref(),
            Some("waves: source 'waves': unknown datatype: waveform")
        );
    }

    #[test]
    fn invalid_window_skips_every_source() {
        let transfers = DataFrame::new(vec![
            Column::new("intime".into(), vec!["2150-01-01 01:10:00"]),
            Column::new("careunit".into(), vec!["SICU"]),
        ])
        .unwrap();
        let bundle = AdmissionBundle::new("100", Some(ts("2150-01-01 00:00:00")), None)
            .with_table("transfers", transfers);
        let sources = vec![SourceDescriptor::categorical(
            "transfers",
            "intime",
            "careunit",
        )];
        let (aligned, diagnostics) =
            align_admission(&bundle, &sources, &AlignmentOptions::default());
        assert!(aligned.grid.is_none());
        assert!(aligned.series.is_empty());
        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics.iter().all(Option::is_some));
    }

    #[test]
    fn missing_time_column_passes_table_through() {
        let meds = DataFrame::new(vec![
            Column::new("endtime".into(), vec!["2150-01-01 03:00:00"]),
            Column::new("label".into(), vec!["Heparin"]),
        ])
        .unwrap();
        let bundle = AdmissionBundle::new(
            "100",
            Some(ts("2150-01-01 00:00:00")),
            Some(ts("2150-01-01 04:00:00")),
        )
        .with_table("meds", meds.clone());
        let sources = vec![SourceDescriptor::continuous(
            "meds",
            "starttime",
            "endtime",
            "label",
        )];
        let (aligned, diagnostics) =
            align_admission(&bundle, &sources, &AlignmentOptions::default());
        assert!(aligned.series.is_empty());
        assert!(aligned.passthrough["meds"].equals(&meds));
        assert_eq!(
            diagnostics[2].as_deref(),
            Some("meds: passed through unprojected: missing column 'starttime'")
        );
    }

    #[test]
    fn missing_label_column_passes_interval_table_through() {
        let meds = DataFrame::new(vec![
            Column::new("starttime".into(), vec!["2150-01-01 01:00:00"]),
            Column::new("endtime".into(), vec!["2150-01-01 03:00:00"]),
        ])
        .unwrap();
        let bundle = AdmissionBundle::new(
            "100",
            Some(ts("2150-01-01 00:00:00")),
            Some(ts("2150-01-01 04:00:00")),
        )
        .with_table("meds", meds.clone());
        let sources = vec![SourceDescriptor::continuous(
            "meds",
            "starttime",
            "endtime",
            "label",
        )];
        let (aligned, diagnostics) =
            align_admission(&bundle, &sources, &AlignmentOptions::default());
        assert!(aligned.series.is_empty());
        assert!(aligned.passthrough["meds"].equals(&meds));
        assert!(diagnostics[2].as_deref().unwrap().contains("missing column 'label'"));
    }
}
