//! Admission folder loading.
//!
//! An admission folder holds `admission.csv` (one row with `admittime`,
//! `dischtime` and optionally `hadm_id`) plus one `<source>.csv` per event
//! source. Source files that are absent are simply not part of the bundle.

use std::path::{Path, PathBuf};

use cts_align::{AdmissionBundle, DateAnchor, any_to_timestamp};
use cts_common::any_to_string_non_empty;
use cts_model::SourceDescriptor;
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{IngestError, Result};
use crate::reader::read_csv_frame;

pub const ADMISSION_FILE: &str = "admission.csv";
pub const ADMIT_COL: &str = "admittime";
pub const DISCHARGE_COL: &str = "dischtime";
pub const ADMISSION_ID_COL: &str = "hadm_id";

/// Load one admission folder for the given sources.
pub fn load_admission(dir: &Path, sources: &[SourceDescriptor]) -> Result<AdmissionBundle> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let admission_path = dir.join(ADMISSION_FILE);
    let admission = read_csv_frame(&admission_path)?;
    if admission.height() == 0 {
        return Err(IngestError::EmptyAdmission {
            path: admission_path,
        });
    }

    let admit_time = first_timestamp(&admission, ADMIT_COL, &admission_path)?;
    let discharge_time = first_timestamp(&admission, DISCHARGE_COL, &admission_path)?;
    let id = admission
        .column(ADMISSION_ID_COL)
        .ok()
        .and_then(|column| column.get(0).ok())
        .and_then(any_to_string_non_empty)
        .unwrap_or_else(|| folder_name(dir));

    let mut bundle = AdmissionBundle::new(id, admit_time, discharge_time);
    for source in sources {
        let path = dir.join(format!("{}.csv", source.name));
        if !path.is_file() {
            debug!(source = %source.name, path = %path.display(), "no source file");
            continue;
        }
        let frame = read_csv_frame(&path)?;
        bundle.tables.insert(source.name.clone(), frame);
    }
    info!(
        admission_id = %bundle.id,
        tables = bundle.tables.len(),
        "admission loaded"
    );
    Ok(bundle)
}

/// Subdirectories of `root` that contain an admission file, sorted by name.
pub fn discover_admissions(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(root).map_err(|e| IngestError::DirectoryRead {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut dirs = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: root.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() && path.join(ADMISSION_FILE).is_file() {
            dirs.push(path);
        }
    }
    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(dirs)
}

fn first_timestamp(
    frame: &DataFrame,
    column: &str,
    path: &Path,
) -> Result<Option<chrono::NaiveDateTime>> {
    let values = frame
        .column(column)
        .map_err(|_| IngestError::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        })?;
    let value = values.get(0)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(any_to_timestamp(value, DateAnchor::Midnight))
}

fn folder_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "admission".to_string())
}
