//! Lark docx block structure.
//!
//! This module mirrors the block model exposed by the Lark/Feishu docx page
//! (`PageMain.blockManager.model.rootBlockModel`). Text-bearing blocks carry a
//! [`ZoneState`] with their styled runs; media blocks carry the host
//! capabilities used later to fetch their bytes.
//!
//! See <https://open.feishu.cn/document/client-docs/docs-add-on/06-data-structure/BlockType>

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use larkdown_core::{FetchError, MediaSource};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Run attributes in declaration order
pub type Attributes = IndexMap<String, String>;

/// One styled run of inserted text
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Operation {
    pub insert: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Operation {
    /// Create a run without attributes
    pub fn new(insert: &str) -> Self {
        Self {
            insert: insert.to_string(),
            attributes: Attributes::new(),
        }
    }

    /// Create a run with attributes
    pub fn with_attrs(insert: &str, attrs: Vec<(&str, &str)>) -> Self {
        Self {
            insert: insert.to_string(),
            attributes: attrs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// The synthetic line terminator appended to every text zone
    pub fn fix_enter() -> Self {
        Self::with_attrs("\n", vec![("fixEnter", "true")])
    }

    /// Check if this run is the synthetic line terminator
    pub fn is_fix_enter(&self) -> bool {
        self.attributes
            .get("fixEnter")
            .is_some_and(|value| !value.is_empty())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ZoneContent {
    #[serde(default)]
    pub ops: Vec<Operation>,
}

/// Packaged text content of a block
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    #[serde(default)]
    pub all_text: String,
    #[serde(default)]
    pub content: ZoneContent,
}

impl ZoneState {
    /// Build a zone from runs, deriving the plain text and appending the
    /// synthetic terminator the editor always stores
    pub fn from_ops(mut ops: Vec<Operation>) -> Self {
        let mut all_text: String = ops.iter().map(|op| op.insert.as_str()).collect();
        all_text.push('\n');
        ops.push(Operation::fix_enter());
        Self {
            all_text,
            content: ZoneContent { ops },
        }
    }

    /// Build a zone from plain text
    pub fn from_text(text: &str) -> Self {
        Self::from_ops(vec![Operation::new(text)])
    }

    pub fn ops(&self) -> &[Operation] {
        &self.content.ops
    }
}

/// An RGBA pixel buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Host capability that rasterizes a whiteboard
#[async_trait]
pub trait BitmapSource: Send + Sync {
    /// Returns `None` when the whiteboard has nothing to draw
    async fn bitmap(&self, cancel: CancellationToken) -> Result<Option<Bitmap>, FetchError>;
}

#[derive(Clone)]
pub struct ImageBlock {
    pub token: String,
    pub name: String,
    /// Caption text including the synthetic trailing newline
    pub caption: Option<String>,
    pub source: Arc<dyn MediaSource>,
}

impl ImageBlock {
    pub fn new(token: &str, name: &str, source: Arc<dyn MediaSource>) -> Self {
        Self {
            token: token.to_string(),
            name: name.to_string(),
            caption: None,
            source,
        }
    }

    pub fn with_caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }
}

impl fmt::Debug for ImageBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBlock")
            .field("token", &self.token)
            .field("name", &self.name)
            .field("caption", &self.caption)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct FileBlock {
    pub token: String,
    pub name: String,
    pub source: Arc<dyn MediaSource>,
}

impl FileBlock {
    pub fn new(token: &str, name: &str, source: Arc<dyn MediaSource>) -> Self {
        Self {
            token: token.to_string(),
            name: name.to_string(),
            source,
        }
    }
}

impl fmt::Debug for FileBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBlock")
            .field("token", &self.token)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct WhiteboardBlock {
    pub token: String,
    pub source: Arc<dyn BitmapSource>,
}

impl fmt::Debug for WhiteboardBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhiteboardBlock")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Block kinds with their kind-specific snapshot data
#[derive(Debug, Clone)]
pub enum BlockKind {
    Page,
    Divider,
    /// heading1 .. heading9
    Heading(u8),
    Code {
        language: String,
    },
    QuoteContainer,
    Callout,
    Bullet,
    Ordered {
        /// Numeric string, or anything else (e.g. "auto") for automatic numbering
        seq: String,
    },
    Todo {
        done: bool,
    },
    Text,
    Image(ImageBlock),
    File(FileBlock),
    Whiteboard(WhiteboardBlock),
    Table {
        rows_id: Vec<String>,
        columns_id: Vec<String>,
    },
    TableCell,
    /// Synced block source; a transparent wrapper around its children
    SyncedSource,
    /// Not loaded yet
    Pending,
    /// Any kind without a Markdown counterpart (bitable, iframe, sheet, ...)
    NotSupported(String),
}

impl BlockKind {
    pub fn is_pending(&self) -> bool {
        matches!(self, BlockKind::Pending)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Page => f.write_str("page"),
            BlockKind::Divider => f.write_str("divider"),
            BlockKind::Heading(depth) => write!(f, "heading{depth}"),
            BlockKind::Code { .. } => f.write_str("code"),
            BlockKind::QuoteContainer => f.write_str("quote_container"),
            BlockKind::Callout => f.write_str("callout"),
            BlockKind::Bullet => f.write_str("bullet"),
            BlockKind::Ordered { .. } => f.write_str("ordered"),
            BlockKind::Todo { .. } => f.write_str("todo"),
            BlockKind::Text => f.write_str("text"),
            BlockKind::Image(_) => f.write_str("image"),
            BlockKind::File(_) => f.write_str("file"),
            BlockKind::Whiteboard(_) => f.write_str("whiteboard"),
            BlockKind::Table { .. } => f.write_str("table"),
            BlockKind::TableCell => f.write_str("table_cell"),
            BlockKind::SyncedSource => f.write_str("synced_source"),
            BlockKind::Pending => f.write_str("pending"),
            BlockKind::NotSupported(name) => f.write_str(name),
        }
    }
}

/// A node of the docx block tree
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    pub zone_state: Option<ZoneState>,
    pub children: Vec<Block>,
}

impl Block {
    /// Create a block without text or children
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            zone_state: None,
            children: Vec::new(),
        }
    }

    /// Create a text-bearing block from its runs
    pub fn with_ops(kind: BlockKind, ops: Vec<Operation>) -> Self {
        Self {
            kind,
            zone_state: Some(ZoneState::from_ops(ops)),
            children: Vec::new(),
        }
    }

    pub fn page(children: Vec<Block>) -> Self {
        Self::new(BlockKind::Page).with_children(children)
    }

    pub fn divider() -> Self {
        Self::new(BlockKind::Divider)
    }

    pub fn heading(depth: u8, ops: Vec<Operation>) -> Self {
        Self::with_ops(BlockKind::Heading(depth), ops)
    }

    pub fn text(ops: Vec<Operation>) -> Self {
        Self::with_ops(BlockKind::Text, ops)
    }

    pub fn code(language: &str, text: &str) -> Self {
        Self::with_ops(
            BlockKind::Code {
                language: language.to_string(),
            },
            vec![Operation::new(text)],
        )
    }

    pub fn quote_container(children: Vec<Block>) -> Self {
        Self::new(BlockKind::QuoteContainer).with_children(children)
    }

    pub fn callout(children: Vec<Block>) -> Self {
        Self::new(BlockKind::Callout).with_children(children)
    }

    pub fn bullet(ops: Vec<Operation>) -> Self {
        Self::with_ops(BlockKind::Bullet, ops)
    }

    pub fn ordered(seq: &str, ops: Vec<Operation>) -> Self {
        Self::with_ops(
            BlockKind::Ordered {
                seq: seq.to_string(),
            },
            ops,
        )
    }

    pub fn todo(done: bool, ops: Vec<Operation>) -> Self {
        Self::with_ops(BlockKind::Todo { done }, ops)
    }

    pub fn image(image: ImageBlock) -> Self {
        Self::new(BlockKind::Image(image))
    }

    pub fn file(file: FileBlock) -> Self {
        Self::new(BlockKind::File(file))
    }

    pub fn whiteboard(token: &str, source: Arc<dyn BitmapSource>) -> Self {
        Self::new(BlockKind::Whiteboard(WhiteboardBlock {
            token: token.to_string(),
            source,
        }))
    }

    /// Create a table whose cells are listed row by row
    pub fn table(column_count: usize, cells: Vec<Block>) -> Self {
        let row_count = if column_count == 0 {
            0
        } else {
            cells.len().div_ceil(column_count)
        };
        Self::new(BlockKind::Table {
            rows_id: (0..row_count).map(|i| format!("row{i}")).collect(),
            columns_id: (0..column_count).map(|i| format!("col{i}")).collect(),
        })
        .with_children(cells)
    }

    pub fn table_cell(children: Vec<Block>) -> Self {
        Self::new(BlockKind::TableCell).with_children(children)
    }

    pub fn synced_source(children: Vec<Block>) -> Self {
        Self::new(BlockKind::SyncedSource).with_children(children)
    }

    pub fn pending() -> Self {
        Self::new(BlockKind::Pending)
    }

    pub fn not_supported(name: &str) -> Self {
        Self::new(BlockKind::NotSupported(name.to_string()))
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    /// Add a child block
    pub fn add_child(&mut self, child: Block) {
        self.children.push(child);
    }

    /// The runs of this block, empty for blocks without text
    pub fn ops(&self) -> &[Operation] {
        self.zone_state.as_ref().map(ZoneState::ops).unwrap_or(&[])
    }

    /// The plain text of this block, including the synthetic terminator
    pub fn all_text(&self) -> &str {
        self.zone_state
            .as_ref()
            .map(|zone| zone.all_text.as_str())
            .unwrap_or("")
    }
}
