//! # larkdown
//!
//! Convert Lark/Feishu docx block trees to Markdown.
//!
//! ## Design
//!
//! The input is the block tree the docx editor keeps in memory. Text blocks
//! carry their styled runs, media blocks carry host capabilities that fetch
//! bytes on demand. Conversion is split in three steps:
//!
//! - **Run compiler**: styled runs become nested phrasing content
//! - **Merger**: adjacent compatible nodes (texts, marks, list items) are
//!   coalesced
//! - **Transformer**: a depth-first walk that builds the Markdown AST and
//!   collects image and file references
//!
//! Fetching and packaging the referenced media is left to `larkdown-archive`.
//!
//! ## Example
//!
//! ```rust
//! use larkdown::{Block, DocxService, Operation};
//!
//! let service = DocxService::new();
//!
//! let page = Block::page(vec![
//!     Block::heading(1, vec![Operation::new("Hello World")]),
//!     Block::bullet(vec![Operation::new("one")]),
//!     Block::bullet(vec![Operation::new("two")]),
//! ]);
//!
//! let markdown = service.to_markdown(&page).unwrap();
//! assert_eq!(markdown, "# Hello World\n\n* one\n* two\n");
//! ```

pub mod block;
mod merge;
mod runs;
mod service;
mod transform;
#[cfg(feature = "whiteboard")]
mod whiteboard;

pub use block::{
    Attributes, Bitmap, BitmapSource, Block, BlockKind, FileBlock, ImageBlock, Operation,
    WhiteboardBlock, ZoneContent, ZoneState,
};
pub use merge::{merge_adjacent, merge_inlines, merge_list_items};
pub use runs::compile_runs;
pub use service::{is_ready, CodeBlockStyle, DocxOptions, DocxService, HeadingStyle};
pub use transform::{TransformResult, Transformer};
#[cfg(feature = "whiteboard")]
pub use whiteboard::{encode_png, WhiteboardSnapshot, WHITEBOARD_FILE_NAME};

/// Error type for conversion
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Not supported: {0} is not a docx page")]
    NotSupported(String),

    #[error("Content is still loading")]
    ContentLoading,
}

pub type Result<T> = std::result::Result<T, ConvertError>;
