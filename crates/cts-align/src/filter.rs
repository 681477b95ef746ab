//! Window consistency filter for event tables.

use chrono::NaiveDateTime;
use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::timestamp::{DateAnchor, coerce_timestamps, has_column, timestamp_column};

/// Which columns to check against the admission window and how to clip them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFilter<'a> {
    pub start_col: &'a str,
    pub end_col: Option<&'a str>,
    pub adjust_start: bool,
    pub adjust_end: bool,
}

impl<'a> WindowFilter<'a> {
    /// Point events: rows stamped before admission are dropped.
    pub fn point(time_col: &'a str) -> Self {
        Self {
            start_col: time_col,
            end_col: None,
            adjust_start: true,
            adjust_end: false,
        }
    }

    /// Interval events: starts and ends are clipped to the window.
    pub fn interval(start_col: &'a str, end_col: &'a str) -> Self {
        Self {
            start_col,
            end_col: Some(end_col),
            adjust_start: true,
            adjust_end: true,
        }
    }

    #[must_use]
    pub fn with_adjust_start(mut self, adjust: bool) -> Self {
        self.adjust_start = adjust;
        self
    }

    #[must_use]
    pub fn with_adjust_end(mut self, adjust: bool) -> Self {
        self.adjust_end = adjust;
        self
    }

    /// Filter and clip `events` against `[window_start, window_end]`.
    ///
    /// The time columns of the returned table are Datetime typed. Rows with a
    /// missing start or end are kept. A missing column is not an error: the
    /// table comes back untouched together with a diagnostic naming it.
    pub fn apply(
        &self,
        events: &DataFrame,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<(DataFrame, Option<String>)> {
        for column in std::iter::once(self.start_col).chain(self.end_col) {
            if !has_column(events, column) {
                return Ok((
                    events.clone(),
                    Some(format!("window filter skipped: missing column '{column}'")),
                ));
            }
        }

        let mut notes = Vec::new();
        let starts = coerce_timestamps(events.column(self.start_col)?, DateAnchor::Midnight)?;
        notes.extend(starts.summary(self.start_col));
        let ends = match self.end_col {
            Some(end_col) => {
                let coerced = coerce_timestamps(events.column(end_col)?, DateAnchor::Midnight)?;
                notes.extend(coerced.summary(end_col));
                Some(coerced)
            }
            None => None,
        };

        let height = events.height();
        let mut keep = Vec::with_capacity(height);
        let mut new_starts = Vec::with_capacity(height);
        let mut new_ends = Vec::with_capacity(height);
        for row in 0..height {
            let mut start = starts.values[row];
            let mut end = ends.as_ref().and_then(|e| e.values[row]);
            let mut keep_row = true;

            if ends.is_none() && start.is_some_and(|s| s < window_start) {
                keep_row = false;
            }
            if self.adjust_start {
                start = start.map(|s| s.max(window_start));
            }
            if self.adjust_end {
                end = end.map(|e| e.min(window_end));
            }
            // Inverted rows, including those clipped to nothing, carry no coverage.
            if let (Some(s), Some(e)) = (start, end)
                && s > e
            {
                keep_row = false;
            }

            keep.push(keep_row);
            new_starts.push(start);
            new_ends.push(end);
        }

        let mut frame = events.clone();
        frame.with_column(timestamp_column(self.start_col, &new_starts))?;
        if let Some(end_col) = self.end_col {
            frame.with_column(timestamp_column(end_col, &new_ends))?;
        }
        let mask = BooleanChunked::new("keep".into(), keep.as_slice());
        let frame = frame.filter(&mask)?;
        debug!(
            rows_in = height,
            rows_out = frame.height(),
            start_col = self.start_col,
            "applied window filter"
        );

        let message = (!notes.is_empty()).then(|| notes.join("; "));
        Ok((frame, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn times(frame: &DataFrame, column: &str) -> Vec<Option<NaiveDateTime>> {
        coerce_timestamps(frame.column(column).unwrap(), DateAnchor::Midnight)
            .unwrap()
            .values
    }

    fn window() -> (NaiveDateTime, NaiveDateTime) {
        (ts("2150-01-01 10:00:00"), ts("2150-01-02 10:00:00"))
    }

    #[test]
    fn point_filter_drops_early_rows_and_keeps_missing() {
        let events = DataFrame::new(vec![
            Column::new(
                "charttime".into(),
                vec![
                    Some("2150-01-01 09:00:00"),
                    Some("2150-01-01 11:00:00"),
                    None,
                    Some("2150-01-03 11:00:00"),
                ],
            ),
            Column::new("valuenum".into(), vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();
        let (start, end) = window();
        let (filtered, message) = WindowFilter::point("charttime")
            .apply(&events, start, end)
            .unwrap();
        assert_eq!(message, None);
        assert_eq!(filtered.height(), 3);
        assert_eq!(
            times(&filtered, "charttime"),
            vec![Some(ts("2150-01-01 11:00:00")), None, Some(ts("2150-01-03 11:00:00"))]
        );
    }

    #[test]
    fn interval_filter_clips_and_drops_inverted() {
        let events = DataFrame::new(vec![
            Column::new(
                "starttime".into(),
                vec![
                    Some("2150-01-01 08:00:00"),
                    Some("2150-01-01 12:00:00"),
                    Some("2150-01-01 15:00:00"),
                    Some("2150-01-01 12:00:00"),
                ],
            ),
            Column::new(
                "endtime".into(),
                vec![
                    Some("2150-01-01 12:00:00"),
                    Some("2150-01-03 00:00:00"),
                    Some("2150-01-01 14:00:00"),
                    None,
                ],
            ),
        ])
        .unwrap();
        let (start, end) = window();
        let (filtered, _) = WindowFilter::interval("starttime", "endtime")
            .apply(&events, start, end)
            .unwrap();
        assert_eq!(filtered.height(), 3);
        assert_eq!(
            times(&filtered, "starttime"),
            vec![
                Some(ts("2150-01-01 10:00:00")),
                Some(ts("2150-01-01 12:00:00")),
                Some(ts("2150-01-01 12:00:00")),
            ]
        );
        assert_eq!(
            times(&filtered, "endtime"),
            vec![Some(ts("2150-01-01 12:00:00")), Some(ts("2150-01-02 10:00:00")), None]
        );
    }

    #[test]
    fn clipping_twice_changes_nothing() {
        let events = DataFrame::new(vec![
            Column::new(
                "starttime".into(),
                vec![Some("2150-01-01 08:00:00"), Some("2150-01-01 09:00:00")],
            ),
            Column::new(
                "endtime".into(),
                vec![Some("2150-01-03 12:00:00"), Some("2150-01-01 09:30:00")],
            ),
        ])
        .unwrap();
        let (start, end) = window();
        let filter = WindowFilter::interval("starttime", "endtime");
        let (once, _) = filter.apply(&events, start, end).unwrap();
        let (twice, _) = filter.apply(&once, start, end).unwrap();
        assert!(once.equals_missing(&twice));
        assert_eq!(once.height(), 1);
    }

    fn one_interval(start: &str, end: &str) -> DataFrame {
        DataFrame::new(vec![
            Column::new("starttime".into(), vec![Some(start)]),
            Column::new("endtime".into(), vec![Some(end)]),
        ])
        .unwrap()
    }

    #[test]
    fn end_left_in_place_without_adjust_end() {
        let events = one_interval("2150-01-01 08:00:00", "2150-01-03 00:00:00");
        let (start, end) = window();
        let (filtered, _) = WindowFilter::interval("starttime", "endtime")
            .with_adjust_end(false)
            .apply(&events, start, end)
            .unwrap();
        assert_eq!(
            times(&filtered, "starttime"),
            vec![Some(ts("2150-01-01 10:00:00"))]
        );
        assert_eq!(times(&filtered, "endtime"), vec![Some(ts("2150-01-03 00:00:00"))]);
    }

    #[test]
    fn start_left_in_place_without_adjust_start() {
        let events = one_interval("2150-01-01 08:00:00", "2150-01-03 00:00:00");
        let (start, end) = window();
        let (filtered, _) = WindowFilter::interval("starttime", "endtime")
            .with_adjust_start(false)
            .apply(&events, start, end)
            .unwrap();
        assert_eq!(
            times(&filtered, "starttime"),
            vec![Some(ts("2150-01-01 08:00:00"))]
        );
        assert_eq!(times(&filtered, "endtime"), vec![Some(ts("2150-01-02 10:00:00"))]);
    }

    #[test]
    fn missing_column_is_soft_failure() {
        let events = DataFrame::new(vec![Column::new("starttime".into(), vec!["2150-01-01"])])
            .unwrap();
        let (start, end) = window();
        let (filtered, message) = WindowFilter::interval("starttime", "endtime")
            .apply(&events, start, end)
            .unwrap();
        assert!(filtered.equals(&events));
        assert_eq!(
            message.as_deref(),
            Some("window filter skipped: missing column 'endtime'")
        );
    }

    #[test]
    fn unparseable_values_are_reported() {
        let events = DataFrame::new(vec![Column::new(
            "charttime".into(),
            vec!["2150-01-01 11:00:00", "soon"],
        )])
        .unwrap();
        let (start, end) = window();
        let (filtered, message) = WindowFilter::point("charttime")
            .apply(&events, start, end)
            .unwrap();
        assert_eq!(filtered.height(), 2);
        assert!(message.unwrap().contains("'charttime'"));
    }
}
