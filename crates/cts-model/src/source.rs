//! Event source descriptors.
//!
//! A descriptor names one event table of an admission and tells the aligner
//! which columns carry time, label and value. Descriptors are plain data so a
//! deployment can swap the whole list (see [`default_sources`]).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// How a source's events are projected onto the grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceKind {
    /// Interval events with a start and an end (infusions, prescriptions).
    Continuous,
    /// Point-sampled numeric measurements (vitals, labs).
    Discrete,
    /// Point-sampled labelled events (transfers, administrations).
    Categorical,
    /// Anything else found in configuration. Reported and skipped.
    Unknown(String),
}

impl SourceKind {
    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::Continuous => "continuous",
            SourceKind::Discrete => "discrete",
            SourceKind::Categorical => "categorical",
            SourceKind::Unknown(raw) => raw,
        }
    }
}

impl From<String> for SourceKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "continuous" => SourceKind::Continuous,
            "discrete" => SourceKind::Discrete,
            "categorical" => SourceKind::Categorical,
            _ => SourceKind::Unknown(value),
        }
    }
}

impl From<&str> for SourceKind {
    fn from(value: &str) -> Self {
        SourceKind::from(value.to_string())
    }
}

impl From<SourceKind> for String {
    fn from(value: SourceKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-bearing columns of a validated descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceColumns<'a> {
    Interval { start: &'a str, end: &'a str },
    Point { time: &'a str },
}

/// One configured event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Key of the event table in the admission bundle.
    pub name: String,
    #[serde(alias = "datatype")]
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_col: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_col: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_col: Option<String>,
    pub label_col: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_col: Option<String>,
    /// Date-only stamps of this source are placed at 12:00 instead of midnight.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub midday_dates: bool,
}

impl SourceDescriptor {
    fn base(name: &str, kind: SourceKind, label_col: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            time_col: None,
            start_col: None,
            end_col: None,
            label_col: label_col.to_string(),
            value_col: None,
            midday_dates: false,
        }
    }

    pub fn continuous(name: &str, start_col: &str, end_col: &str, label_col: &str) -> Self {
        Self {
            start_col: Some(start_col.to_string()),
            end_col: Some(end_col.to_string()),
            ..Self::base(name, SourceKind::Continuous, label_col)
        }
    }

    pub fn discrete(name: &str, time_col: &str, value_col: &str, label_col: &str) -> Self {
        Self {
            time_col: Some(time_col.to_string()),
            value_col: Some(value_col.to_string()),
            ..Self::base(name, SourceKind::Discrete, label_col)
        }
    }

    pub fn categorical(name: &str, time_col: &str, label_col: &str) -> Self {
        Self {
            time_col: Some(time_col.to_string()),
            ..Self::base(name, SourceKind::Categorical, label_col)
        }
    }

    /// Carry a numeric value column (value mode for continuous sources).
    #[must_use]
    pub fn with_value_col(mut self, value_col: &str) -> Self {
        self.value_col = Some(value_col.to_string());
        self
    }

    #[must_use]
    pub fn with_midday_dates(mut self, enable: bool) -> Self {
        self.midday_dates = enable;
        self
    }

    /// Resolve the time-bearing columns required by this descriptor's kind.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Descriptor`] when the kind is unknown or a column
    /// the kind needs is not configured.
    pub fn columns(&self) -> Result<SourceColumns<'_>> {
        match &self.kind {
            SourceKind::Continuous => {
                let start = self
                    .start_col
                    .as_deref()
                    .ok_or_else(|| ModelError::descriptor(&self.name, "missing start_col"))?;
                let end = self
                    .end_col
                    .as_deref()
                    .ok_or_else(|| ModelError::descriptor(&self.name, "missing end_col"))?;
                Ok(SourceColumns::Interval { start, end })
            }
            SourceKind::Discrete => {
                if self.value_col.is_none() {
                    return Err(ModelError::descriptor(&self.name, "missing value_col"));
                }
                self.point_column()
            }
            SourceKind::Categorical => self.point_column(),
            SourceKind::Unknown(kind) => Err(ModelError::descriptor(
                &self.name,
                format!("unknown datatype: {kind}"),
            )),
        }
    }

    fn point_column(&self) -> Result<SourceColumns<'_>> {
        self.time_col
            .as_deref()
            .map(|time| SourceColumns::Point { time })
            .ok_or_else(|| ModelError::descriptor(&self.name, "missing time_col"))
    }

    /// Every configured column that can hold an event's first timestamp.
    ///
    /// Used to look for events logged before the recorded admission time, so
    /// it ignores the kind and reports whatever is configured.
    pub fn time_columns(&self) -> Vec<&str> {
        [self.time_col.as_deref(), self.start_col.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// The MIMIC-IV event sources used by the single-admission pipeline.
pub fn default_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::categorical("transfers", "intime", "careunit"),
        SourceDescriptor::discrete("vitals", "charttime", "valuenum", "label"),
        SourceDescriptor::discrete("labs", "charttime", "valuenum", "label"),
        SourceDescriptor::continuous("prescription_medications", "starttime", "stoptime", "label"),
        SourceDescriptor::continuous("infusion_medications", "starttime", "endtime", "label"),
        SourceDescriptor::categorical("emar_medications", "charttime", "medication"),
        SourceDescriptor::categorical("procedures", "chartdate", "long_title")
            .with_midday_dates(true),
        SourceDescriptor::continuous("icu_procedures", "starttime", "endtime", "label"),
    ]
}
