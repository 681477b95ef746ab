use std::path::PathBuf;

use chrono::NaiveDateTime;

/// Outcome of an `align` run over one or more admissions.
#[derive(Debug, Default)]
pub struct AlignResult {
    /// Where outputs were (or would have been) written.
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub admissions: Vec<AdmissionSummary>,
    /// Admissions that failed to load or write, as display strings.
    pub errors: Vec<String>,
    pub has_errors: bool,
}

#[derive(Debug)]
pub struct AdmissionSummary {
    pub id: String,
    pub admit_time: Option<NaiveDateTime>,
    pub discharge_time: Option<NaiveDateTime>,
    pub grid_points: usize,
    pub sources: Vec<SourceSummary>,
    /// Reported diagnostics, in slot order.
    pub messages: Vec<String>,
    pub files_written: usize,
}

#[derive(Debug)]
pub struct SourceSummary {
    pub name: String,
    pub kind: String,
    /// Rows in the loaded event table, `None` when no table was found.
    pub rows: Option<usize>,
    /// Label columns in the aligned output, `None` when the source was not aligned.
    pub columns: Option<usize>,
}
