//! Admission observation window.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// A validated `[admit_time, discharge_time)` span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionWindow {
    admit_time: NaiveDateTime,
    discharge_time: NaiveDateTime,
}

impl AdmissionWindow {
    /// # Errors
    ///
    /// Returns [`ModelError::InvertedWindow`] unless `admit_time < discharge_time`.
    pub fn new(admit_time: NaiveDateTime, discharge_time: NaiveDateTime) -> Result<Self> {
        if admit_time >= discharge_time {
            return Err(ModelError::InvertedWindow {
                admit: admit_time,
                discharge: discharge_time,
            });
        }
        Ok(Self {
            admit_time,
            discharge_time,
        })
    }

    pub fn admit_time(&self) -> NaiveDateTime {
        self.admit_time
    }

    pub fn discharge_time(&self) -> NaiveDateTime {
        self.discharge_time
    }

    /// Length of stay in fractional hours.
    pub fn duration_hours(&self) -> f64 {
        let span = self.discharge_time - self.admit_time;
        span.num_milliseconds() as f64 / 3_600_000.0
    }
}
