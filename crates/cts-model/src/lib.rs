pub mod error;
pub mod options;
pub mod source;
pub mod window;

pub use error::{ModelError, Result};
pub use options::AlignmentOptions;
pub use source::{SourceColumns, SourceDescriptor, SourceKind, default_sources};
pub use window::AdmissionWindow;
