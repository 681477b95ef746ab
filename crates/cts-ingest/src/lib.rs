//! Admission loading, source configuration and export.
//!
//! This crate is the I/O edge around `cts-align`:
//!
//! - **Admissions**: [`load_admission`] reads an admission folder into an
//!   [`AdmissionBundle`](cts_align::AdmissionBundle); [`discover_admissions`]
//!   finds admission folders for batch runs
//! - **Sources**: [`load_sources`] reads `[[source]]` descriptors from TOML
//! - **Export**: [`write_admission`] writes per-source tables, the combined
//!   `dynamic.csv` and the diagnostics file

pub mod admission;
pub mod error;
pub mod export;
pub mod reader;
pub mod sources;

pub use admission::{ADMISSION_FILE, discover_admissions, load_admission};
pub use error::{IngestError, Result};
pub use export::{
    DYNAMIC_FILE, ExportSummary, MESSAGES_FILE, build_dynamic_frame, write_admission,
    write_frame_csv,
};
pub use reader::read_csv_frame;
pub use sources::{load_sources, parse_sources};
