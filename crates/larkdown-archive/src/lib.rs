//! # larkdown-archive
//!
//! Package a converted Lark docx document together with its media.
//!
//! Images and attached files referenced by the document are fetched through
//! the capabilities stored on their nodes, a few at a time, and written to a
//! zip next to the Markdown:
//!
//! ```text
//! <title>.zip
//! ├── <title>.md
//! ├── images/<name>
//! └── files/<name>
//! ```
//!
//! Documents without media are exported as a plain `<title>.md`.

mod assemble;
mod naming;
mod options;

pub use assemble::{ArchiveJob, MediaEntry, MediaFailure, MediaKind, Package, Progress};
pub use naming::{sanitize, FileNameRegistry};
pub use options::ArchiveOptions;

/// Error type for archive assembly
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
