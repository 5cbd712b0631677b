//! Markdown Abstract Syntax Tree
//!
//! This module defines the AST nodes produced by the block transformer. The
//! shape follows mdast: flow-level nodes own ordered children, phrasing
//! content lives in [`Inline`], and list items keep their ordering data until
//! they are grouped into a [`List`].

use crate::media::{Destination, MediaData};

/// A flow-level Markdown node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Document root
    Root(Root),

    /// Paragraph containing inline content
    Paragraph(Vec<Inline>),

    /// Heading with depth (1-6) and inline content
    Heading { depth: u8, content: Vec<Inline> },

    /// Block quote containing nested flow content
    Blockquote(Vec<Node>),

    /// List of items
    List(List),

    /// A list item that has not been grouped into a list yet
    ListItem(ListItem),

    /// Fenced code block
    Code { lang: Option<String>, value: String },

    /// Thematic break (horizontal rule)
    ThematicBreak,

    /// Table made of rows
    Table(Table),

    /// A single table row
    TableRow(TableRow),

    /// A single table cell
    TableCell(TableCell),

    /// Phrasing content standing on its own
    Phrasing(Inline),
}

/// The document root
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Root {
    pub children: Vec<Node>,
}

impl Root {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }
}

/// Sequence data carried by an ordered list item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seq {
    /// Explicit number
    Number(u32),
    /// Numbered by position
    Auto,
}

/// A list item containing flow content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListItem {
    /// `Some` for task list items
    pub checked: Option<bool>,
    pub spread: bool,
    /// `Some` for ordered list items
    pub seq: Option<Seq>,
    pub children: Vec<Node>,
}

impl ListItem {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }

    pub fn from_inlines(inlines: Vec<Inline>) -> Self {
        Self::new(vec![Node::Paragraph(inlines)])
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn with_seq(mut self, seq: Seq) -> Self {
        self.seq = Some(seq);
        self
    }
}

/// An ordered or unordered list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    pub ordered: bool,
    /// Starting number, only meaningful for ordered lists
    pub start: Option<u32>,
    pub spread: bool,
    pub children: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub children: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    pub children: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableCell {
    pub children: Vec<Inline>,
}

/// A hyperlink
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub url: Destination,
    pub title: Option<String>,
    pub children: Vec<Inline>,
    /// Present when the target is a file that still has to be packaged
    pub data: Option<MediaData>,
}

impl Link {
    pub fn new(url: impl Into<Destination>, children: Vec<Inline>) -> Self {
        Self {
            url: url.into(),
            title: None,
            children,
            data: None,
        }
    }
}

/// An image
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub url: Destination,
    pub alt: String,
    pub title: Option<String>,
    /// Present when the bytes still have to be fetched and packaged
    pub data: Option<MediaData>,
}

impl Image {
    pub fn new(url: impl Into<Destination>, alt: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt: alt.into(),
            title: None,
            data: None,
        }
    }
}

/// An inline (phrasing) Markdown node
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// Plain text
    Text(String),

    /// Emphasis (italic)
    Emphasis(Vec<Inline>),

    /// Strong emphasis (bold)
    Strong(Vec<Inline>),

    /// GFM strikethrough
    Delete(Vec<Inline>),

    /// Inline code
    InlineCode(String),

    /// Inline math
    InlineMath(String),

    Link(Link),

    Image(Image),
}

impl Inline {
    pub fn text(value: impl Into<String>) -> Self {
        Inline::Text(value.into())
    }
}

impl Node {
    /// Anything but a nested root may appear under the root
    pub fn is_root_content(&self) -> bool {
        !matches!(self, Node::Root(_))
    }

    /// Block content as admitted by block quotes and list items
    pub fn is_block_content(&self) -> bool {
        matches!(
            self,
            Node::Blockquote(_)
                | Node::Code { .. }
                | Node::Heading { .. }
                | Node::List(_)
                | Node::Paragraph(_)
                | Node::Table(_)
                | Node::ThematicBreak
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_content_excludes_list_items() {
        assert!(!Node::ListItem(ListItem::default()).is_block_content());
        assert!(Node::List(List::default()).is_block_content());
        assert!(!Node::Phrasing(Inline::text("a")).is_block_content());
    }

    #[test]
    fn test_root_content() {
        assert!(!Node::Root(Root::default()).is_root_content());
        assert!(Node::ThematicBreak.is_root_content());
        assert!(Node::ListItem(ListItem::default()).is_root_content());
    }
}
