//! Block tree to Markdown AST transformation
//!
//! The transformer walks the block tree depth first. Parent kinds transform
//! their children with themselves as the current parent, then filter and
//! merge the results according to what the Markdown node may contain. Leaf
//! kinds are converted from block-local data. Image and file nodes are also
//! collected in traversal order so they can be fetched and packaged later.

use std::sync::Arc;

use larkdown_core::{
    Destination, Image, Inline, Link, ListItem, MediaData, Node, Root, Seq, Table, TableCell,
    TableRow,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::block::{Block, BlockKind, FileBlock, ImageBlock, WhiteboardBlock};
use crate::merge::merge_list_items;
use crate::runs::compile_runs;

static NUMERIC_SEQ: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Kind of the Markdown node whose children are being transformed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParentKind {
    Root,
    Blockquote,
    ListItem,
    Table,
    TableCell,
}

/// Output of a single transformation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformResult {
    pub root: Root,
    /// Image nodes in document order; clones share their destination with
    /// the nodes inside `root`
    pub images: Vec<Image>,
    /// File links in document order
    pub files: Vec<Link>,
}

/// Converts a block tree into a Markdown AST.
///
/// A transformer may be reused; all state is reset at the start and end of
/// every [`Transformer::transform`] call.
#[derive(Debug, Default)]
pub struct Transformer {
    parent: Option<ParentKind>,
    images: Vec<Image>,
    files: Vec<Link>,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform a block tree.
    ///
    /// A page yields its root directly. Any other block is transformed on its
    /// own and placed under a fresh root.
    pub fn transform(&mut self, block: &Block) -> TransformResult {
        self.reset();

        let root = match self.transform_block(block) {
            Some(Node::Root(root)) => root,
            Some(node) => Root::new(root_children(vec![node])),
            None => Root::default(),
        };

        let result = TransformResult {
            root,
            images: std::mem::take(&mut self.images),
            files: std::mem::take(&mut self.files),
        };
        self.reset();

        debug!(
            children = result.root.children.len(),
            images = result.images.len(),
            files = result.files.len(),
            "transformed block tree"
        );

        result
    }

    fn reset(&mut self) {
        self.parent = None;
        self.images.clear();
        self.files.clear();
    }

    fn transform_block(&mut self, block: &Block) -> Option<Node> {
        match &block.kind {
            BlockKind::Page => {
                let children = self.transform_children(block, ParentKind::Root);
                Some(Node::Root(Root::new(root_children(children))))
            }

            BlockKind::QuoteContainer | BlockKind::Callout => {
                let children = self.transform_children(block, ParentKind::Blockquote);
                Some(Node::Blockquote(block_children(children)))
            }

            BlockKind::Divider => Some(Node::ThematicBreak),

            BlockKind::Heading(depth @ 1..=6) => Some(Node::Heading {
                depth: *depth,
                content: compile_runs(block.ops()),
            }),

            // Markdown has no heading deeper than 6
            BlockKind::Heading(_) | BlockKind::Text => {
                Some(Node::Paragraph(compile_runs(block.ops())))
            }

            BlockKind::Code { language } => {
                let all_text = block.all_text();
                let value = all_text.strip_suffix('\n').unwrap_or(all_text);
                let lang = language.trim().to_lowercase();
                Some(Node::Code {
                    lang: (!lang.is_empty()).then_some(lang),
                    value: value.to_string(),
                })
            }

            BlockKind::Bullet | BlockKind::Ordered { .. } | BlockKind::Todo { .. } => {
                Some(Node::ListItem(self.transform_list_item(block)))
            }

            BlockKind::Image(image) => {
                let image = self.collect_image(image);
                Some(self.place_inline(Inline::Image(image)))
            }

            BlockKind::File(file) => {
                let link = self.collect_file(file);
                Some(self.place_inline(Inline::Link(link)))
            }

            BlockKind::Whiteboard(whiteboard) => self.transform_whiteboard(whiteboard),

            BlockKind::Table {
                rows_id,
                columns_id,
            } => {
                let cells = self
                    .transform_children(block, ParentKind::Table)
                    .into_iter()
                    .filter_map(|node| match node {
                        Node::TableCell(cell) => Some(cell),
                        _ => None,
                    })
                    .collect();
                let children = chunk_rows(cells, columns_id.len());
                if children.len() != rows_id.len() {
                    debug!(
                        expected = rows_id.len(),
                        actual = children.len(),
                        "table row count differs from its row ids"
                    );
                }
                Some(Node::Table(Table { children }))
            }

            BlockKind::TableCell => {
                let children = self
                    .transform_children(block, ParentKind::TableCell)
                    .into_iter()
                    .flat_map(|node| match node {
                        Node::Paragraph(inlines) => inlines,
                        Node::Phrasing(inline) => vec![inline],
                        _ => Vec::new(),
                    })
                    .collect();
                Some(Node::TableCell(TableCell { children }))
            }

            BlockKind::SyncedSource | BlockKind::Pending | BlockKind::NotSupported(_) => {
                trace!(kind = %block.kind, "dropping block");
                None
            }
        }
    }

    /// Transform the children of `block` with `parent` as the current
    /// parent, splicing synced blocks into the child list
    fn transform_children(&mut self, block: &Block, parent: ParentKind) -> Vec<Node> {
        let previous = self.parent.replace(parent);
        let nodes = flatten_synced(&block.children)
            .into_iter()
            .filter_map(|child| self.transform_block(child))
            .collect();
        self.parent = previous;
        nodes
    }

    fn transform_list_item(&mut self, block: &Block) -> ListItem {
        let mut children = vec![Node::Paragraph(compile_runs(block.ops()))];
        if !block.children.is_empty() {
            let nested = self.transform_children(block, ParentKind::ListItem);
            children.extend(block_children(nested));
        }

        let item = ListItem::new(children);
        match &block.kind {
            BlockKind::Todo { done } => item.with_checked(*done),
            BlockKind::Ordered { seq } => item.with_seq(parse_seq(seq)),
            _ => item,
        }
    }

    fn collect_image(&mut self, block: &ImageBlock) -> Image {
        let caption = block.caption.as_deref().unwrap_or_default();
        let alt = caption.strip_suffix('\n').unwrap_or(caption);

        let mut image = Image::new(Destination::pending(), alt);
        image.data = Some(MediaData::new(
            block.name.as_str(),
            block.token.as_str(),
            Arc::clone(&block.source),
        ));

        self.images.push(image.clone());
        image
    }

    fn collect_file(&mut self, block: &FileBlock) -> Link {
        let mut link = Link::new(Destination::pending(), vec![Inline::text(block.name.as_str())]);
        link.data = Some(MediaData::new(
            block.name.as_str(),
            block.token.as_str(),
            Arc::clone(&block.source),
        ));

        self.files.push(link.clone());
        link
    }

    #[cfg(feature = "whiteboard")]
    fn transform_whiteboard(&mut self, block: &WhiteboardBlock) -> Option<Node> {
        use crate::whiteboard::{WhiteboardSnapshot, WHITEBOARD_FILE_NAME};

        let mut image = Image::new(Destination::pending(), "");
        image.data = Some(MediaData::new(
            WHITEBOARD_FILE_NAME,
            block.token.as_str(),
            Arc::new(WhiteboardSnapshot::new(Arc::clone(&block.source))),
        ));

        self.images.push(image.clone());
        Some(self.place_inline(Inline::Image(image)))
    }

    #[cfg(not(feature = "whiteboard"))]
    fn transform_whiteboard(&mut self, block: &WhiteboardBlock) -> Option<Node> {
        trace!(token = %block.token, "dropping whiteboard");
        None
    }

    /// Media stands alone inside table cells and gets a paragraph elsewhere
    fn place_inline(&self, inline: Inline) -> Node {
        if self.parent == Some(ParentKind::TableCell) {
            Node::Phrasing(inline)
        } else {
            Node::Paragraph(vec![inline])
        }
    }
}

fn flatten_synced(children: &[Block]) -> Vec<&Block> {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        if matches!(child.kind, BlockKind::SyncedSource) {
            flat.extend(flatten_synced(&child.children));
        } else {
            flat.push(child);
        }
    }
    flat
}

fn root_children(nodes: Vec<Node>) -> Vec<Node> {
    merge_list_items(nodes)
        .into_iter()
        .filter(Node::is_root_content)
        .collect()
}

fn block_children(nodes: Vec<Node>) -> Vec<Node> {
    merge_list_items(nodes)
        .into_iter()
        .filter(Node::is_block_content)
        .collect()
}

fn parse_seq(raw: &str) -> Seq {
    let raw = raw.trim();
    if NUMERIC_SEQ.is_match(raw) {
        raw.parse().map(Seq::Number).unwrap_or(Seq::Auto)
    } else {
        Seq::Auto
    }
}

/// Split cells into rows of `columns` cells; the last row may be shorter
fn chunk_rows(cells: Vec<TableCell>, columns: usize) -> Vec<TableRow> {
    if columns == 0 {
        return Vec::new();
    }

    let mut rows = Vec::with_capacity(cells.len().div_ceil(columns));
    let mut cells = cells.into_iter().peekable();
    while cells.peek().is_some() {
        rows.push(TableRow {
            children: cells.by_ref().take(columns).collect(),
        });
    }
    rows
}
