//! Writing aligned admissions to disk.
//!
//! Layout under the output directory:
//!
//! ```text
//! <out>/<admission id>/<source>.csv   one per aligned source
//! <out>/<admission id>/dynamic.csv    grid plus every label column
//! <out>/<admission id>/messages.txt   one line per reported diagnostic
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use cts_align::{AlignedAdmission, DateAnchor, GRID_COLUMNS, any_to_timestamp, reported};
use cts_common::any_to_string;
use polars::prelude::*;
use tracing::info;

use crate::error::{IngestError, Result};

pub const DYNAMIC_FILE: &str = "dynamic.csv";
pub const MESSAGES_FILE: &str = "messages.txt";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Files written for one admission.
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Combine every aligned source into one frame keyed by the grid.
///
/// Label columns that clash across sources are prefixed `<source>__`.
/// Returns `None` when no grid was built.
pub fn build_dynamic_frame(aligned: &AlignedAdmission) -> Result<Option<DataFrame>> {
    let Some(grid) = aligned.grid.as_ref() else {
        return Ok(None);
    };
    let mut taken: Vec<String> = GRID_COLUMNS.iter().map(|c| (*c).to_string()).collect();
    let mut columns = Vec::new();
    for (source, series) in &aligned.series {
        for label in series.label_columns() {
            let mut column = series.frame.column(&label)?.clone();
            let name = if taken.contains(&label) {
                format!("{source}__{label}")
            } else {
                label
            };
            column.rename(name.as_str().into());
            taken.push(name);
            columns.push(column);
        }
    }
    Ok(Some(grid.frame_with(&columns)?))
}

/// Write all outputs of one admission below `out_dir`.
pub fn write_admission(
    out_dir: &Path,
    aligned: &AlignedAdmission,
    diagnostics: &[Option<String>],
) -> Result<ExportSummary> {
    check_path_component("admission id", &aligned.id)?;
    for source in aligned.series.keys() {
        check_path_component("source name", source)?;
    }
    let dir = out_dir.join(&aligned.id);
    fs::create_dir_all(&dir).map_err(|e| IngestError::FileWrite {
        path: dir.clone(),
        source: e,
    })?;

    let mut files = Vec::new();
    for (source, series) in &aligned.series {
        let path = dir.join(format!("{source}.csv"));
        write_frame_csv(&series.frame, &path)?;
        files.push(path);
    }
    if let Some(dynamic) = build_dynamic_frame(aligned)? {
        let path = dir.join(DYNAMIC_FILE);
        write_frame_csv(&dynamic, &path)?;
        files.push(path);
    }

    let messages_path = dir.join(MESSAGES_FILE);
    let mut messages = reported(diagnostics).join("\n");
    if !messages.is_empty() {
        messages.push('\n');
    }
    fs::write(&messages_path, messages).map_err(|e| IngestError::FileWrite {
        path: messages_path.clone(),
        source: e,
    })?;
    files.push(messages_path);

    info!(
        admission_id = %aligned.id,
        dir = %dir.display(),
        files = files.len(),
        "admission written"
    );
    Ok(ExportSummary { dir, files })
}

/// Reject names that would escape the output directory when joined onto it.
fn check_path_component(what: &'static str, name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).is_absolute();
    if invalid {
        return Err(IngestError::InvalidPathComponent {
            what,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Write a frame as CSV. Datetime cells use `YYYY-MM-DD HH:MM:SS`, nulls are empty.
pub fn write_frame_csv(frame: &DataFrame, path: &Path) -> Result<()> {
    let csv_error = |source: csv::Error| IngestError::CsvWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    let columns = frame.get_columns();
    writer
        .write_record(columns.iter().map(|c| c.name().as_str()))
        .map_err(csv_error)?;

    let mut record = Vec::with_capacity(columns.len());
    for row in 0..frame.height() {
        record.clear();
        for column in columns {
            record.push(format_cell(column.get(row)?));
        }
        writer.write_record(&record).map_err(csv_error)?;
    }
    writer.flush().map_err(|e| IngestError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn format_cell(value: AnyValue<'_>) -> String {
    if matches!(value, AnyValue::Datetime(..) | AnyValue::Date(_)) {
        return any_to_timestamp(value, DateAnchor::Midnight)
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();
    }
    any_to_string(value)
}
