use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("resolution must be a positive number of hours, got {0}")]
    InvalidResolution(f64),
    #[error("observation window must be a positive number of hours, got {0}")]
    InvalidObservationWindow(f64),
    #[error("invalid admission window: admit {admit} is not before discharge {discharge}")]
    InvertedWindow {
        admit: NaiveDateTime,
        discharge: NaiveDateTime,
    },
    #[error("source '{name}': {reason}")]
    Descriptor { name: String, reason: String },
}

impl ModelError {
    pub(crate) fn descriptor(name: &str, reason: impl Into<String>) -> Self {
        Self::Descriptor {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
