//! Markdown AST serialization
//!
//! Converts Markdown AST nodes into GitHub Flavored Markdown text: the
//! CommonMark core plus strikethrough, task list items, pipe tables and
//! `$$`-delimited inline math.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::ast::{Inline, List, ListItem, Node, Root, Seq, TableRow};
use crate::media::Destination;
use crate::options::{CodeBlockStyle, HeadingStyle, Options};

/// Line starts that would otherwise open a heading, quote, list or rule
static LINE_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^( {0,3})([#>+\-=]|[0-9]+[.)])").unwrap());

/// Serialize a node (usually a [`Node::Root`]) to a Markdown string
pub fn serialize(node: &Node, options: &Options) -> String {
    let mut output = String::with_capacity(4096);
    serialize_node(node, Marker::Primary, options, &mut output);

    let trimmed = output.trim_end_matches('\n').len();
    output.truncate(trimmed);
    if !output.is_empty() {
        output.push('\n');
    }
    output
}

/// Serialize a document root to a Markdown string
pub fn serialize_root(root: &Root, options: &Options) -> String {
    let mut output = String::with_capacity(4096);
    serialize_flow(&root.children, false, options, &mut output);
    if !output.is_empty() {
        output.push('\n');
    }
    output
}

const MAX_LIST_NUMBER: u64 = 999_999_999;

/// Which list marker a list uses, so adjacent lists do not fuse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Primary,
    Other,
}

/// Serialize sibling flow nodes, separated by a blank line (or a single
/// newline when `tight`)
///
/// A paragraph is always followed by a blank line when the next node would
/// otherwise continue it as a lazy line or turn it into a setext heading.
fn serialize_flow(nodes: &[Node], tight: bool, options: &Options, out: &mut String) {
    let mut previous: Option<&Node> = None;
    let mut previous_list: Option<(bool, Marker)> = None;

    for node in nodes {
        let marker = match (node, previous_list) {
            (Node::List(list), Some((ordered, Marker::Primary))) if ordered == list.ordered => {
                Marker::Other
            }
            _ => Marker::Primary,
        };

        let mut chunk = String::new();
        serialize_node(node, marker, options, &mut chunk);
        if chunk.is_empty() {
            continue;
        }

        if let Some(previous) = previous {
            let blank_line = !tight || needs_blank_line(previous, node, options);
            out.push_str(if blank_line { "\n\n" } else { "\n" });
        }
        out.push_str(&chunk);
        previous = Some(node);

        previous_list = match node {
            Node::List(list) => Some((list.ordered, marker)),
            _ => None,
        };
    }
}

fn needs_blank_line(previous: &Node, next: &Node, options: &Options) -> bool {
    let is_text = |node: &Node| matches!(node, Node::Paragraph(_) | Node::Phrasing(_));
    let is_setext = |node: &Node| match node {
        Node::Heading { depth, .. } => {
            options.heading_style == HeadingStyle::Setext && *depth <= 2
        }
        _ => false,
    };
    is_text(previous) && (is_text(next) || is_setext(next))
}

fn serialize_node(node: &Node, marker: Marker, options: &Options, out: &mut String) {
    match node {
        Node::Root(root) => serialize_flow(&root.children, false, options, out),

        Node::Paragraph(inlines) => {
            let mut text = String::new();
            serialize_inlines(inlines, options, &mut text);
            if !text.trim().is_empty() {
                out.push_str(&escape_line_starts(&text));
            }
        }

        Node::Heading { depth, content } => serialize_heading(*depth, content, options, out),

        Node::Blockquote(children) => {
            let mut content = String::new();
            serialize_flow(children, false, options, &mut content);

            if content.is_empty() {
                out.push('>');
                return;
            }

            for (i, line) in content.lines().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                out.push('>');
                if !line.is_empty() {
                    out.push(' ');
                    out.push_str(line);
                }
            }
        }

        Node::List(list) => serialize_list(list, marker, options, out),

        Node::ListItem(item) => {
            let list = List {
                ordered: item.seq.is_some(),
                start: match item.seq {
                    Some(Seq::Number(n)) => Some(n),
                    _ => None,
                },
                spread: false,
                children: vec![item.clone()],
            };
            serialize_list(&list, marker, options, out);
        }

        Node::Code { lang, value } => serialize_code_block(lang.as_deref(), value, options, out),

        Node::ThematicBreak => out.push_str(&options.hr),

        Node::Table(table) => serialize_table(&table.children, options, out),

        Node::TableRow(row) => serialize_table(std::slice::from_ref(row), options, out),

        Node::TableCell(cell) => {
            let mut text = String::new();
            serialize_inlines(&cell.children, options, &mut text);
            out.push_str(&escape_line_starts(&text));
        }

        Node::Phrasing(inline) => {
            let mut text = String::new();
            serialize_inline(inline, options, &mut text);
            out.push_str(&escape_line_starts(&text));
        }
    }
}

fn serialize_heading(depth: u8, content: &[Inline], options: &Options, out: &mut String) {
    let mut text = String::new();
    serialize_inlines(content, options, &mut text);

    if text.trim().is_empty() {
        return;
    }

    let depth = depth.clamp(1, 6);

    match options.heading_style {
        HeadingStyle::Setext if depth <= 2 && !text.contains('\n') => {
            let text = escape_line_starts(&text);
            let underline = if depth == 1 { '=' } else { '-' };
            out.push_str(&text);
            out.push('\n');
            out.extend(std::iter::repeat(underline).take(text.chars().count()));
        }
        _ => {
            for _ in 0..depth {
                out.push('#');
            }
            out.push(' ');
            out.push_str(text.replace('\n', " ").trim());
        }
    }
}

fn serialize_list(list: &List, marker: Marker, options: &Options, out: &mut String) {
    let bullet = match marker {
        Marker::Primary => options.bullet_list_marker,
        Marker::Other => options.bullet_list_marker_other,
    };
    let delimiter = match marker {
        Marker::Primary => options.ordered_delimiter,
        Marker::Other => options.ordered_delimiter_other,
    };
    let start = list.start.unwrap_or(1);

    for (i, item) in list.children.iter().enumerate() {
        if i > 0 {
            out.push_str(if list.spread { "\n\n" } else { "\n" });
        }

        let prefix = if list.ordered {
            format!("{}{}", list_number(start, i), delimiter)
        } else {
            bullet.to_string()
        };

        serialize_list_item(item, &prefix, options, out);
    }
}

/// Number of the `index`th item, capped at the nine digits an ordered list
/// marker may have
fn list_number(start: u32, index: usize) -> u64 {
    let index = u64::try_from(index).unwrap_or(u64::MAX);
    u64::from(start).saturating_add(index).min(MAX_LIST_NUMBER)
}

fn serialize_list_item(item: &ListItem, prefix: &str, options: &Options, out: &mut String) {
    let mut content = String::new();
    serialize_flow(&item.children, !item.spread, options, &mut content);

    let task = match item.checked {
        Some(true) => "[x] ",
        Some(false) => "[ ] ",
        None => "",
    };

    // Indent continuation lines
    let continuation_indent = " ".repeat(prefix.chars().count() + 1);
    let mut lines = content.lines();

    let first = format!("{} {}{}", prefix, task, lines.next().unwrap_or(""));
    out.push_str(first.trim_end());

    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&continuation_indent);
            out.push_str(line);
        }
    }
}

fn serialize_code_block(language: Option<&str>, code: &str, options: &Options, out: &mut String) {
    let indented = options.code_block_style == CodeBlockStyle::Indented
        && language.is_none()
        && !code.trim().is_empty();

    if indented {
        for (i, line) in code.lines().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            if !line.is_empty() {
                out.push_str("    ");
                out.push_str(line);
            }
        }
        return;
    }

    let fence_char = options.fence.chars().next().unwrap_or('`');
    let fence_len = options
        .fence
        .chars()
        .count()
        .max(longest_run(code, fence_char) + 1)
        .max(3);
    let fence: String = std::iter::repeat(fence_char).take(fence_len).collect();

    out.push_str(&fence);
    out.push_str(language.unwrap_or(""));
    out.push('\n');
    if !code.is_empty() {
        out.push_str(code);
        out.push('\n');
    }
    out.push_str(&fence);
}

fn serialize_table(rows: &[TableRow], options: &Options, out: &mut String) {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            row.children
                .iter()
                .map(|cell| {
                    let mut text = String::new();
                    serialize_inlines(&cell.children, options, &mut text);
                    text.replace('\n', " ").replace('|', "\\|")
                })
                .collect()
        })
        .collect();

    let col_count = cells.iter().map(Vec::len).max().unwrap_or(0);
    if col_count == 0 {
        return;
    }

    // Calculate column widths, minimum width of 3 for separator
    let mut widths = vec![3usize; col_count];
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    for (r, row) in cells.iter().enumerate() {
        if r > 0 {
            out.push('\n');
        }

        out.push('|');
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            out.push(' ');
            out.push_str(cell);
            for _ in cell.chars().count()..*width {
                out.push(' ');
            }
            out.push_str(" |");
        }

        // Separator row after the header
        if r == 0 {
            out.push_str("\n|");
            for width in &widths {
                out.push(' ');
                for _ in 0..*width {
                    out.push('-');
                }
                out.push_str(" |");
            }
        }
    }
}

fn serialize_inlines(inlines: &[Inline], options: &Options, out: &mut String) {
    for (i, inline) in inlines.iter().enumerate() {
        serialize_inline(inline, options, out);

        // `!` directly before a link would open an image
        if matches!(inline, Inline::Text(_))
            && matches!(inlines.get(i + 1), Some(Inline::Link(_)))
            && out.ends_with('!')
        {
            out.pop();
            out.push_str("\\!");
        }
    }
}

fn serialize_inline(inline: &Inline, options: &Options, out: &mut String) {
    match inline {
        Inline::Text(text) => out.push_str(&escape_text(text)),

        Inline::Emphasis(content) => {
            let delimiter = options.em_delimiter.to_string();
            wrap_inlines(content, &delimiter, options, out);
        }

        Inline::Strong(content) => wrap_inlines(content, &options.strong_delimiter, options, out),

        Inline::Delete(content) => wrap_inlines(content, "~~", options, out),

        Inline::InlineCode(code) => {
            let backticks = "`".repeat(longest_run(code, '`') + 1);
            let space = if code.starts_with('`') || code.ends_with('`') {
                " "
            } else {
                ""
            };
            out.push_str(&backticks);
            out.push_str(space);
            out.push_str(code);
            out.push_str(space);
            out.push_str(&backticks);
        }

        Inline::InlineMath(math) => {
            let delimiter = if options.single_dollar_math { "$" } else { "$$" };
            out.push_str(delimiter);
            out.push_str(math);
            out.push_str(delimiter);
        }

        Inline::Link(link) => {
            out.push('[');
            serialize_inlines(&link.children, options, out);
            out.push_str("](");
            push_destination(&link.url, out);
            push_title(link.title.as_deref(), out);
            out.push(')');
        }

        Inline::Image(image) => {
            out.push_str("![");
            out.push_str(&escape_text(&image.alt));
            out.push_str("](");
            push_destination(&image.url, out);
            push_title(image.title.as_deref(), out);
            out.push(')');
        }
    }
}

/// Wrap inline content in a delimiter pair, leaving blank content unwrapped
/// and keeping surrounding whitespace outside the delimiters
fn wrap_inlines(content: &[Inline], delimiter: &str, options: &Options, out: &mut String) {
    let start = out.len();
    serialize_inlines(content, options, out);
    if out[start..].trim().is_empty() {
        return;
    }

    let inner = out.split_off(start);
    let trimmed = inner.trim();
    let leading = &inner[..inner.len() - inner.trim_start().len()];
    let trailing = &inner[inner.trim_end().len()..];

    out.push_str(leading);
    out.push_str(delimiter);
    out.push_str(trimmed);
    out.push_str(delimiter);
    out.push_str(trailing);
}

fn push_destination(destination: &Destination, out: &mut String) {
    let url = destination.get().unwrap_or("");
    let needs_brackets = url.is_empty()
        || url
            .chars()
            .any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '<' || c == '>');

    if needs_brackets {
        out.push('<');
        out.push_str(&url.replace('<', "%3C").replace('>', "%3E"));
        out.push('>');
    } else {
        out.push_str(url);
    }
}

fn push_title(title: Option<&str>, out: &mut String) {
    if let Some(t) = title {
        out.push_str(" \"");
        out.push_str(&t.replace('"', "\\\""));
        out.push('"');
    }
}

/// Length of the longest run of `c` in `s`
fn longest_run(s: &str, c: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in s.chars() {
        if ch == c {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Escape markdown special characters in text
fn escape_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\\' | '*' | '_' | '[' | ']' | '`' | '~' | '<' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }

    result
}

/// Escape characters that would turn a line of text into block syntax
fn escape_line_starts(text: &str) -> String {
    LINE_START
        .replace_all(text, |caps: &Captures| {
            let indent = &caps[1];
            let marker = &caps[2];
            match marker.char_indices().last() {
                Some((at, punct)) if marker.len() > 1 => {
                    format!("{}{}\\{}", indent, &marker[..at], punct)
                }
                _ => format!("{}\\{}", indent, marker),
            }
        })
        .into_owned()
}
