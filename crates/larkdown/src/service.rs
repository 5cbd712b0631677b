//! DocxService - the main entry point for block tree to Markdown conversion.

use larkdown_core::Root;

use crate::block::{Block, BlockKind};
use crate::transform::{TransformResult, Transformer};
use crate::{ConvertError, Result};

// Re-export options from core
pub use larkdown_core::{CodeBlockStyle, HeadingStyle, Options as DocxOptions};

/// Check that every top-level block of a page has finished loading
pub fn is_ready(root: &Block) -> bool {
    root.children.iter().all(|block| !block.kind.is_pending())
}

/// The main service for converting docx block trees to Markdown
#[derive(Debug, Clone, Default)]
pub struct DocxService {
    options: DocxOptions,
}

impl DocxService {
    /// Create a new DocxService with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a DocxService with custom options
    pub fn with_options(options: DocxOptions) -> Self {
        Self { options }
    }

    /// Convert a page block into a Markdown AST plus its media references.
    ///
    /// Fails without transforming anything when the root is not a page or
    /// when some of its blocks are still loading.
    pub fn convert(&self, root: &Block) -> Result<TransformResult> {
        if !matches!(root.kind, BlockKind::Page) {
            return Err(ConvertError::NotSupported(root.kind.to_string()));
        }
        if !is_ready(root) {
            return Err(ConvertError::ContentLoading);
        }

        Ok(Transformer::new().transform(root))
    }

    /// Convert a page block straight to Markdown.
    ///
    /// Media destinations are left unresolved and render as `<>`.
    pub fn to_markdown(&self, root: &Block) -> Result<String> {
        let result = self.convert(root)?;
        Ok(self.render(&result.root))
    }

    /// Serialize an AST with this service's options
    pub fn render(&self, root: &Root) -> String {
        larkdown_core::serialize_root(root, &self.options)
    }

    /// Get the current options
    pub fn options(&self) -> &DocxOptions {
        &self.options
    }

    /// Get mutable access to options
    pub fn options_mut(&mut self) -> &mut DocxOptions {
        &mut self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Operation;

    fn page() -> Block {
        Block::page(vec![
            Block::heading(1, vec![Operation::new("Title")]),
            Block::text(vec![
                Operation::new("Some "),
                Operation::with_attrs("bold", vec![("bold", "true")]),
                Operation::new(" text"),
            ]),
        ])
    }

    #[test]
    fn test_to_markdown() {
        let service = DocxService::new();
        let result = service.to_markdown(&page()).unwrap();
        assert_eq!(result, "# Title\n\nSome **bold** text\n");
    }

    #[test]
    fn test_heading_setext() {
        let options = DocxOptions {
            heading_style: HeadingStyle::Setext,
            ..Default::default()
        };
        let service = DocxService::with_options(options);
        let result = service.to_markdown(&page()).unwrap();
        assert!(result.starts_with("Title\n=====\n"));
    }

    #[test]
    fn test_pending_blocks_are_not_ready() {
        let mut root = page();
        assert!(is_ready(&root));

        root.add_child(Block::pending());
        assert!(!is_ready(&root));

        let err = DocxService::new().convert(&root).unwrap_err();
        assert!(matches!(err, ConvertError::ContentLoading));
    }

    #[test]
    fn test_only_pages_are_supported() {
        let err = DocxService::new()
            .convert(&Block::text(vec![Operation::new("x")]))
            .unwrap_err();
        assert!(matches!(err, ConvertError::NotSupported(kind) if kind == "text"));
    }

    #[test]
    fn test_options_mut() {
        let mut service = DocxService::new();
        service.options_mut().hr = "---".to_string();
        let markdown = service
            .to_markdown(&Block::page(vec![Block::divider()]))
            .unwrap();
        assert_eq!(markdown, "---\n");
    }
}
