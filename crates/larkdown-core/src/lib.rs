//! larkdown-core - Markdown AST and serialization
//!
//! This crate provides the Markdown data structures produced by `larkdown`
//! and the GitHub Flavored Markdown serializer that renders them. It is also
//! the home of the media capability types shared with `larkdown-archive`.
//!
//! # Architecture
//!
//! ```text
//! Docx block tree ──transform──▶ ┌──────────────┐ ──serialize──▶ Markdown String
//!                                │ Markdown AST │
//!                                └──────────────┘ ──media list──▶ Archive
//! ```
//!
//! # Example
//!
//! ```rust
//! use larkdown_core::{serialize, Inline, Node, Options, Root};
//!
//! let ast = Node::Root(Root::new(vec![
//!     Node::Heading {
//!         depth: 1,
//!         content: vec![Inline::text("Hello World")],
//!     },
//!     Node::Paragraph(vec![
//!         Inline::text("This is "),
//!         Inline::Strong(vec![Inline::text("bold")]),
//!         Inline::text(" text."),
//!     ]),
//! ]));
//!
//! let markdown = serialize(&ast, &Options::default());
//! assert_eq!(markdown, "# Hello World\n\nThis is **bold** text.\n");
//! ```

mod ast;
mod media;
mod options;
mod serialize;

pub use ast::{Image, Inline, Link, List, ListItem, Node, Root, Seq, Table, TableCell, TableRow};
pub use media::{AlreadyResolved, Destination, FetchError, Media, MediaData, MediaSource};
pub use options::{CodeBlockStyle, HeadingStyle, Options};
pub use serialize::{serialize, serialize_root};
