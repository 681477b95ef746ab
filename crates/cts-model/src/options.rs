//! Configuration options for grid alignment.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Options controlling how an admission is projected onto the time grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentOptions {
    /// Bin width in hours. Fractional values are allowed (0.5 = 30 minutes).
    pub resolution_hours: f64,

    /// Cap on the observation window, measured from the resolved admit time.
    /// `None` extends the grid to discharge.
    #[serde(default)]
    pub observation_window_hours: Option<f64>,
}

impl Default for AlignmentOptions {
    fn default() -> Self {
        Self {
            resolution_hours: 1.0,
            observation_window_hours: None,
        }
    }
}

impl AlignmentOptions {
    pub fn new(resolution_hours: f64) -> Self {
        Self {
            resolution_hours,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_observation_window(mut self, hours: Option<f64>) -> Self {
        self.observation_window_hours = hours;
        self
    }

    /// Check that the resolution and window cap are usable.
    ///
    /// # Errors
    ///
    /// Returns an error when the resolution is not a finite positive number,
    /// or when a window cap is present but not finite and positive.
    pub fn validate(&self) -> Result<()> {
        if !self.resolution_hours.is_finite() || self.resolution_hours <= 0.0 {
            return Err(ModelError::InvalidResolution(self.resolution_hours));
        }
        if let Some(window) = self.observation_window_hours
            && (!window.is_finite() || window <= 0.0)
        {
            return Err(ModelError::InvalidObservationWindow(window));
        }
        Ok(())
    }
}
