//! Source configuration files.
//!
//! A TOML file with one `[[source]]` table per event source:
//!
//! ```toml
//! [[source]]
//! name = "labs"
//! kind = "discrete"
//! time_col = "charttime"
//! value_col = "valuenum"
//! label_col = "label"
//! ```

use std::path::Path;

use cts_model::{SourceDescriptor, SourceKind};
use serde::Deserialize;
use tracing::warn;

use crate::error::{IngestError, Result};

#[derive(Debug, Deserialize)]
struct SourcesFile {
    #[serde(default, rename = "source")]
    sources: Vec<SourceDescriptor>,
}

/// Parse source descriptors from TOML text.
pub fn parse_sources(text: &str, path: &Path) -> Result<Vec<SourceDescriptor>> {
    let file: SourcesFile = toml::from_str(text).map_err(|e| IngestError::SourcesParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    for source in &file.sources {
        if let SourceKind::Unknown(kind) = &source.kind {
            warn!(source = %source.name, kind = %kind, "unknown source datatype, will be skipped");
        }
    }
    Ok(file.sources)
}

/// Load source descriptors from a TOML file.
pub fn load_sources(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    parse_sources(&text, path)
}
