//! Configuration options for Markdown serialization

/// Heading style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingStyle {
    /// Use ATX headings (prefixed with #)
    #[default]
    Atx,
    /// Use setext-style headings (underlined with = or -)
    /// Only works for single-line h1 and h2, falls back to ATX otherwise
    Setext,
}

/// Code block style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeBlockStyle {
    /// Use fenced code blocks (```)
    #[default]
    Fenced,
    /// Use indented code blocks (4 spaces) when there is no language
    Indented,
}

/// Options for Markdown serialization
#[derive(Debug, Clone)]
pub struct Options {
    /// Heading style (atx or setext)
    pub heading_style: HeadingStyle,

    /// Horizontal rule string
    pub hr: String,

    /// Bullet list marker, also used for task lists
    ///
    /// The default `*` renders task items as `* [ ] item`. Set it to `-` for
    /// the `- [ ] item` form most GitHub documents use.
    pub bullet_list_marker: char,

    /// Bullet marker used for a list that directly follows another bullet list
    pub bullet_list_marker_other: char,

    /// Ordered list delimiter
    pub ordered_delimiter: char,

    /// Delimiter used for an ordered list that directly follows another one
    pub ordered_delimiter_other: char,

    /// Code block style
    pub code_block_style: CodeBlockStyle,

    /// Minimal fence for fenced code blocks
    pub fence: String,

    /// Emphasis delimiter
    pub em_delimiter: char,

    /// Strong delimiter
    pub strong_delimiter: String,

    /// Emit inline math with a single `$` instead of `$$`
    pub single_dollar_math: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            hr: "***".to_string(),
            bullet_list_marker: '*',
            bullet_list_marker_other: '-',
            ordered_delimiter: '.',
            ordered_delimiter_other: ')',
            code_block_style: CodeBlockStyle::Fenced,
            fence: "```".to_string(),
            em_delimiter: '*',
            strong_delimiter: "**".to_string(),
            single_dollar_math: false,
        }
    }
}
