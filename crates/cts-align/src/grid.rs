//! The per-admission time grid.

use chrono::{Duration, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

use crate::error::{AlignError, Result};
use crate::timestamp::timestamp_column;
use cts_common::ColumnNamer;
use cts_model::ModelError;

pub const BIN_INDEX_COL: &str = "bin_index";
pub const TIME_POINT_COL: &str = "time_point";
pub const HOURS_COL: &str = "hours_from_admission";

/// Column names every aligned table starts with.
pub const GRID_COLUMNS: [&str; 3] = [BIN_INDEX_COL, TIME_POINT_COL, HOURS_COL];

const NANOS_PER_HOUR: f64 = 3_600_000_000_000.0;

/// Upper bound on grid points for one admission (a year at one-minute steps
/// is about 526k).
pub const MAX_GRID_POINTS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub bin_index: usize,
    pub time_point: NaiveDateTime,
    pub hours_from_admission: f64,
}

/// Regularly spaced time points starting at admission.
///
/// Point `k` sits at `admit + k * step`; bin `k` is the half-open interval
/// `[point k, point k+1)` and the last bin closes one step past the last point.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    resolution_hours: f64,
    step: Duration,
    points: Vec<GridPoint>,
}

impl TimeGrid {
    /// Build the grid for an admission.
    ///
    /// The grid ends at `discharge_time`, or at `admit_time + window_cap_hours`
    /// when that comes first. Points are generated by integer stepping so
    /// hours stay exact multiples of the resolution.
    pub fn build(
        admit_time: NaiveDateTime,
        discharge_time: NaiveDateTime,
        resolution_hours: f64,
        window_cap_hours: Option<f64>,
    ) -> Result<Self> {
        let step = hours_to_duration(resolution_hours)
            .filter(|step| step.num_nanoseconds().is_some_and(|n| n > 0))
            .ok_or(ModelError::InvalidResolution(resolution_hours))?;

        let mut end_time = discharge_time;
        if let Some(cap) = window_cap_hours {
            let cap_duration = hours_to_duration(cap)
                .filter(|_| cap > 0.0)
                .ok_or(ModelError::InvalidObservationWindow(cap))?;
            if let Some(capped) = admit_time.checked_add_signed(cap_duration) {
                end_time = end_time.min(capped);
            }
        }
        if end_time < admit_time {
            return Err(AlignError::EndBeforeAdmit {
                admit: admit_time,
                end: end_time,
            });
        }

        let overflow = || AlignError::SpanOverflow {
            start: admit_time,
            end: end_time,
        };
        let span_ns = (end_time - admit_time).num_nanoseconds().ok_or_else(overflow)?;
        let step_ns = step.num_nanoseconds().ok_or_else(overflow)?;
        let count = usize::try_from(span_ns / step_ns + 1).map_err(|_| overflow())?;
        if count > MAX_GRID_POINTS {
            return Err(AlignError::TooManyPoints {
                points: count,
                limit: MAX_GRID_POINTS,
            });
        }

        let mut points = Vec::with_capacity(count);
        for k in 0..count {
            let offset_ns = step_ns * k as i64;
            points.push(GridPoint {
                bin_index: k,
                time_point: admit_time + Duration::nanoseconds(offset_ns),
                hours_from_admission: offset_ns as f64 / NANOS_PER_HOUR,
            });
        }
        debug!(
            points = points.len(),
            resolution_hours,
            %admit_time,
            %end_time,
            "built time grid"
        );
        Ok(Self {
            resolution_hours,
            step,
            points,
        })
    }

    pub fn resolution_hours(&self) -> f64 {
        self.resolution_hours
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn admit_time(&self) -> Option<NaiveDateTime> {
        self.points.first().map(|p| p.time_point)
    }

    /// Exclusive upper edge of the last bin.
    pub fn last_edge(&self) -> Option<NaiveDateTime> {
        self.points.last().map(|p| p.time_point + self.step)
    }

    /// Bin holding `t`, or `None` outside the grid.
    pub fn bin_of(&self, t: NaiveDateTime) -> Option<usize> {
        let first = self.admit_time()?;
        if t < first || self.last_edge().is_some_and(|edge| t >= edge) {
            return None;
        }
        Some(self.points.partition_point(|p| p.time_point <= t) - 1)
    }

    /// Indices of the points `p` with `start <= p < end`.
    pub fn points_within(&self, start: NaiveDateTime, end: NaiveDateTime) -> std::ops::Range<usize> {
        let lo = self.points.partition_point(|p| p.time_point < start);
        let hi = self.points.partition_point(|p| p.time_point < end);
        lo..hi.max(lo)
    }

    /// The grid as a frame with `bin_index`, `time_point` and `hours_from_admission`.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let bins: Vec<u32> = self
            .points
            .iter()
            .map(|p| u32::try_from(p.bin_index).unwrap_or(u32::MAX))
            .collect();
        let times: Vec<Option<NaiveDateTime>> =
            self.points.iter().map(|p| Some(p.time_point)).collect();
        let hours: Vec<f64> = self.points.iter().map(|p| p.hours_from_admission).collect();
        DataFrame::new(vec![
            Column::new(BIN_INDEX_COL.into(), bins),
            timestamp_column(TIME_POINT_COL, &times),
            Column::new(HOURS_COL.into(), hours),
        ])
    }

    /// Namer with the grid column names already taken.
    pub fn namer(&self) -> ColumnNamer {
        ColumnNamer::new(GRID_COLUMNS)
    }

    /// The grid frame with `columns` appended, one row per point.
    pub fn frame_with(&self, columns: &[Column]) -> PolarsResult<DataFrame> {
        self.to_frame()?.hstack(columns)
    }
}

fn hours_to_duration(hours: f64) -> Option<Duration> {
    if !hours.is_finite() || hours <= 0.0 {
        return None;
    }
    let nanos = (hours * NANOS_PER_HOUR).round();
    if nanos >= i64::MAX as f64 {
        return None;
    }
    Some(Duration::nanoseconds(nanos as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn grid_includes_end_when_aligned() {
        let grid = TimeGrid::build(
            ts("2150-01-01 00:00:00"),
            ts("2150-01-01 03:00:00"),
            1.0,
            None,
        )
        .unwrap();
        assert_eq!(grid.len(), 4);
        let hours: Vec<f64> = grid.points().iter().map(|p| p.hours_from_admission).collect();
        assert_eq!(hours, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(grid.last_edge(), Some(ts("2150-01-01 04:00:00")));
    }

    #[test]
    fn grid_stops_before_unaligned_end() {
        let grid = TimeGrid::build(
            ts("2150-01-01 00:00:00"),
            ts("2150-01-01 02:59:00"),
            1.0,
            None,
        )
        .unwrap();
        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn fractional_resolution_is_exact() {
        let grid = TimeGrid::build(
            ts("2150-01-01 00:00:00"),
            ts("2150-01-01 02:00:00"),
            0.5,
            None,
        )
        .unwrap();
        assert_eq!(grid.len(), 5);
        assert_eq!(grid.points()[3].hours_from_admission, 1.5);
        assert_eq!(grid.points()[3].time_point, ts("2150-01-01 01:30:00"));
    }

    #[test]
    fn window_cap_truncates() {
        let grid = TimeGrid::build(
            ts("2150-01-01 00:00:00"),
            ts("2150-01-10 00:00:00"),
            1.0,
            Some(24.0),
        )
        .unwrap();
        assert_eq!(grid.len(), 25);
    }

    #[test]
    fn rejects_bad_inputs() {
        let admit = ts("2150-01-01 00:00:00");
        let discharge = ts("2150-01-02 00:00:00");
        assert!(matches!(
            TimeGrid::build(admit, discharge, 0.0, None),
            Err(AlignError::Model(ModelError::InvalidResolution(_)))
        ));
        assert!(matches!(
            TimeGrid::build(admit, discharge, f64::NAN, None),
            Err(AlignError::Model(ModelError::InvalidResolution(_)))
        ));
        assert!(matches!(
            TimeGrid::build(discharge, admit, 1.0, None),
            Err(AlignError::EndBeforeAdmit { .. })
        ));
    }

    #[test]
    fn rejects_grids_past_point_limit() {
        let result = TimeGrid::build(
            ts("2150-01-01 00:00:00"),
            ts("2150-01-04 00:00:00"),
            1e-6,
            None,
        );
        assert!(matches!(
            result,
            Err(AlignError::TooManyPoints { limit: MAX_GRID_POINTS, .. })
        ));
    }

    #[test]
    fn bin_lookup_is_half_open() {
        let grid = TimeGrid::build(
            ts("2150-01-01 00:00:00"),
            ts("2150-01-01 02:00:00"),
            1.0,
            None,
        )
        .unwrap();
        assert_eq!(grid.bin_of(ts("2149-12-31 23:59:59")), None);
        assert_eq!(grid.bin_of(ts("2150-01-01 00:00:00")), Some(0));
        assert_eq!(grid.bin_of(ts("2150-01-01 00:59:59")), Some(0));
        assert_eq!(grid.bin_of(ts("2150-01-01 01:00:00")), Some(1));
        assert_eq!(grid.bin_of(ts("2150-01-01 02:30:00")), Some(2));
        assert_eq!(grid.bin_of(ts("2150-01-01 03:00:00")), None);
    }

    #[test]
    fn points_within_is_half_open() {
        let grid = TimeGrid::build(
            ts("2150-01-01 00:00:00"),
            ts("2150-01-01 05:00:00"),
            1.0,
            None,
        )
        .unwrap();
        assert_eq!(
            grid.points_within(ts("2150-01-01 00:30:00"), ts("2150-01-01 03:00:00")),
            1..3
        );
        assert_eq!(
            grid.points_within(ts("2150-01-01 03:00:00"), ts("2150-01-01 01:00:00")),
            3..3
        );
    }

    #[test]
    fn frame_has_grid_columns() {
        let grid = TimeGrid::build(
            ts("2150-01-01 00:00:00"),
            ts("2150-01-01 02:00:00"),
            1.0,
            None,
        )
        .unwrap();
        let frame = grid.to_frame().unwrap();
        let names: Vec<&str> = frame
            .get_column_names()
            .iter()
            .map(|name| name.as_str())
            .collect();
        assert_eq!(names, GRID_COLUMNS);
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.column(HOURS_COL).unwrap().f64().unwrap().get(2), Some(2.0));
    }
}
