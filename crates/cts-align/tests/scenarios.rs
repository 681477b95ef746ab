//! End-to-end alignment scenarios on small synthetic admissions.

use chrono::NaiveDateTime;
use cts_align::{
    AdmissionBundle, IntervalProjection, TimeGrid, WindowFilter, align_admission, bin_samples,
    project_intervals, reported,
};
use cts_model::{AlignmentOptions, SourceDescriptor};
use polars::prelude::*;

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").unwrap()
}

fn six_hour_grid() -> TimeGrid {
    TimeGrid::build(ts("2024-01-01T00:00"), ts("2024-01-01T06:00"), 1.0, None).unwrap()
}

fn i32_values(frame: &DataFrame, column: &str) -> Vec<Option<i32>> {
    frame.column(column).unwrap().i32().unwrap().into_iter().collect()
}

#[test]
fn six_hour_stay_has_seven_hourly_bins() {
    let grid = six_hour_grid();
    let hours: Vec<f64> = grid.points().iter().map(|p| p.hours_from_admission).collect();
    assert_eq!(hours, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn continuous_event_marks_points_inside_interval() {
    let events = DataFrame::new(vec![
        Column::new("starttime".into(), vec!["2024-01-01 01:30:00"]),
        Column::new("endtime".into(), vec!["2024-01-01 03:30:00"]),
        Column::new("label".into(), vec!["X"]),
    ])
    .unwrap();
    let projected = project_intervals(
        &events,
        &six_hour_grid(),
        &IntervalProjection::new("starttime", "endtime", "label"),
    )
    .unwrap();
    assert_eq!(
        i32_values(&projected, "X"),
        vec![Some(0), Some(0), Some(1), Some(1), Some(0), Some(0), Some(0)]
    );
}

#[test]
fn discrete_samples_average_per_bin() {
    let events = DataFrame::new(vec![
        Column::new(
            "charttime".into(),
            vec!["2024-01-01 01:15:00", "2024-01-01 01:45:00"],
        ),
        Column::new("valuenum".into(), vec![100.0, 120.0]),
        Column::new("label".into(), vec!["Glucose", "Glucose"]),
    ])
    .unwrap();
    let binned = bin_samples(&events, &six_hour_grid(), "charttime", "valuenum", "label").unwrap();

    let means: Vec<Option<f64>> = binned
        .column("Glucose")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        means,
        vec![None, Some(110.0), None, None, None, None, None]
    );
    assert_eq!(
        i32_values(&binned, "Glucose_present"),
        vec![Some(0), Some(1), Some(0), Some(0), Some(0), Some(0), Some(0)]
    );
}

#[test]
fn early_event_moves_admit_time() {
    let labs = DataFrame::new(vec![
        Column::new("charttime".into(), vec!["2024-01-01 06:00:00"]),
        Column::new("valuenum".into(), vec![4.1]),
        Column::new("label".into(), vec!["Potassium"]),
    ])
    .unwrap();
    let bundle = AdmissionBundle::new(
        "20000001",
        Some(ts("2024-01-01T08:00")),
        Some(ts("2024-01-02T08:00")),
    )
    .with_table("labs", labs);
    let sources = vec![SourceDescriptor::discrete(
        "labs",
        "charttime",
        "valuenum",
        "label",
    )];

    let (aligned, diagnostics) = align_admission(&bundle, &sources, &AlignmentOptions::default());

    assert_eq!(aligned.admit_time, Some(ts("2024-01-01T06:00")));
    let grid = aligned.grid.as_ref().unwrap();
    assert_eq!(grid.admit_time(), Some(ts("2024-01-01T06:00")));
    assert_eq!(grid.len(), 27);
    insta::assert_snapshot!(
        reported(&diagnostics).join("\n"),
        @"admit time moved from 2024-01-01 08:00:00 to earliest event at 2024-01-01 06:00:00"
    );

    let frame = &aligned.series["labs"].frame;
    let present = i32_values(frame, "Potassium_present");
    assert_eq!(present[0], Some(1));
    assert_eq!(present.iter().flatten().sum::<i32>(), 1);
}

#[test]
fn missing_start_column_passes_table_through() {
    let events = DataFrame::new(vec![
        Column::new("endtime".into(), vec!["2024-01-01 03:30:00"]),
        Column::new("label".into(), vec!["X"]),
    ])
    .unwrap();
    let (filtered, message) = WindowFilter::interval("starttime", "endtime")
        .apply(&events, ts("2024-01-01T00:00"), ts("2024-01-01T06:00"))
        .unwrap();
    assert!(filtered.equals_missing(&events));
    assert!(message.unwrap().contains("'starttime'"));
}

#[test]
fn inverted_interval_contributes_nothing() {
    let events = DataFrame::new(vec![
        Column::new(
            "starttime".into(),
            vec!["2024-01-01 04:00:00", "2024-01-01 01:00:00"],
        ),
        Column::new(
            "endtime".into(),
            vec!["2024-01-01 02:00:00", "2024-01-01 02:00:00"],
        ),
        Column::new("label".into(), vec!["X", "X"]),
    ])
    .unwrap();
    let (filtered, _) = WindowFilter::interval("starttime", "endtime")
        .apply(&events, ts("2024-01-01T00:00"), ts("2024-01-01T06:00"))
        .unwrap();
    assert_eq!(filtered.height(), 1);

    let projected = project_intervals(
        &filtered,
        &six_hour_grid(),
        &IntervalProjection::new("starttime", "endtime", "label"),
    )
    .unwrap();
    assert_eq!(
        i32_values(&projected, "X"),
        vec![Some(0), Some(1), Some(0), Some(0), Some(0), Some(0), Some(0)]
    );
}

#[test]
fn default_sources_align_a_mixed_admission() {
    let transfers = DataFrame::new(vec![
        Column::new("intime".into(), vec!["2024-01-01 00:20:00"]),
        Column::new("careunit".into(), vec!["Medical Intensive Care Unit (MICU)"]),
    ])
    .unwrap();
    let infusions = DataFrame::new(vec![
        Column::new("starttime".into(), vec!["2024-01-01 01:00:00"]),
        Column::new("endtime".into(), vec![None::<&str>]),
        Column::new("label".into(), vec!["Norepinephrine"]),
    ])
    .unwrap();
    let procedures = DataFrame::new(vec![
        Column::new("chartdate".into(), vec!["2024-01-01"]),
        Column::new("long_title".into(), vec!["Insertion of endotracheal tube"]),
    ])
    .unwrap();
    let bundle = AdmissionBundle::new(
        "20000002",
        Some(ts("2024-01-01T00:00")),
        Some(ts("2024-01-01T18:00")),
    )
    .with_table("transfers", transfers)
    .with_table("infusion_medications", infusions)
    .with_table("procedures", procedures)
    .with_table("vitals", DataFrame::empty());

    let (aligned, diagnostics) = align_admission(
        &bundle,
        &cts_model::default_sources(),
        &AlignmentOptions::new(2.0),
    );

    assert!(reported(&diagnostics).is_empty(), "{diagnostics:?}");
    assert_eq!(diagnostics.len(), 5);
    assert_eq!(aligned.grid_len(), 10);
    assert_eq!(
        aligned.series.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["infusion_medications", "procedures", "transfers"]
    );

    let infusion = &aligned.series["infusion_medications"].frame;
    assert_eq!(
        i32_values(infusion, "Norepinephrine"),
        vec![
            Some(0),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            Some(1),
            Some(1)
        ]
    );

    let procedures = &aligned.series["procedures"].frame;
    let noon_bin = i32_values(procedures, "Insertion_of_endotracheal_tube");
    assert_eq!(noon_bin[6], Some(1));
    assert_eq!(noon_bin.iter().flatten().sum::<i32>(), 1);

    let transfers = &aligned.series["transfers"].frame;
    assert_eq!(
        i32_values(transfers, "Medical_Intensive_Care_Unit_(MICU)")[0],
        Some(1)
    );
}
