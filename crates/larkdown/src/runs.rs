//! Styled runs to phrasing content
//!
//! A text zone is a flat list of runs, each with its own set of attributes.
//! Markdown needs properly nested emphasis, so every run is wrapped in its
//! marks ordered by how far each mark extends over neighbouring runs: the
//! mark covering the shortest span ends up innermost. Adjacent compatible
//! nodes are then merged, which lets a long-spanning mark absorb the runs it
//! covers.

use std::borrow::Cow;

use larkdown_core::{Inline, Link};
use percent_encoding::percent_decode_str;

use crate::block::Operation;
use crate::merge::merge_inlines;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Emphasis,
    Strong,
    Delete,
    Link,
}

impl Mark {
    fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "italic" => Some(Mark::Emphasis),
            "bold" => Some(Mark::Strong),
            "strikethrough" => Some(Mark::Delete),
            "link" => Some(Mark::Link),
            _ => None,
        }
    }
}

/// Compile the runs of a text zone into phrasing content
pub fn compile_runs(ops: &[Operation]) -> Vec<Inline> {
    let operations: Vec<&Operation> = ops.iter().filter(|op| !op.is_fix_enter()).collect();

    let marks: Vec<Vec<Mark>> = operations
        .iter()
        .map(|op| {
            op.attributes
                .keys()
                .filter_map(|name| Mark::from_attribute(name))
                .collect()
        })
        .collect();

    let lengths: Vec<usize> = operations
        .iter()
        .map(|op| op.insert.chars().count())
        .collect();

    let nodes = operations
        .iter()
        .enumerate()
        .map(|(index, op)| {
            let mut ordered = marks[index].clone();
            // Stable: ties keep attribute declaration order
            ordered.sort_by_key(|mark| span_length(&marks, &lengths, index, *mark));
            ordered
                .into_iter()
                .fold(leaf(op), |node, mark| wrap(node, mark, op))
        })
        .collect();

    merge_inlines(nodes)
}

/// Total text length of the contiguous runs around `index` that carry `mark`
fn span_length(marks: &[Vec<Mark>], lengths: &[usize], index: usize, mark: Mark) -> usize {
    let has = |i: usize| marks[i].contains(&mark);

    let mut start = index;
    while start > 0 && has(start - 1) {
        start -= 1;
    }
    let mut end = index + 1;
    while end < marks.len() && has(end) {
        end += 1;
    }

    lengths[start..end].iter().sum()
}

fn leaf(op: &Operation) -> Inline {
    if op.has_attr("inlineCode") {
        return Inline::InlineCode(op.insert.clone());
    }

    if let Some(equation) = op.attr("equation") {
        let equation = equation.strip_suffix('\n').unwrap_or(equation);
        if !equation.trim().is_empty() {
            return Inline::InlineMath(equation.to_string());
        }
    }

    Inline::Text(op.insert.clone())
}

fn wrap(node: Inline, mark: Mark, op: &Operation) -> Inline {
    match mark {
        Mark::Emphasis => Inline::Emphasis(vec![node]),
        Mark::Strong => Inline::Strong(vec![node]),
        Mark::Delete => Inline::Delete(vec![node]),
        Mark::Link => {
            let url = decode_url(op.attr("link").unwrap_or_default());
            Inline::Link(Link::new(url, vec![node]))
        }
    }
}

/// Links are stored percent-encoded; fall back to the raw value when the
/// decoded bytes are not UTF-8
fn decode_url(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR: (&str, &str) = ("author", "7096007617544896513");

    fn run(insert: &str, attrs: Vec<(&str, &str)>) -> Operation {
        let mut attrs = attrs;
        attrs.push(AUTHOR);
        Operation::with_attrs(insert, attrs)
    }

    fn compile(mut ops: Vec<Operation>) -> Vec<Inline> {
        ops.push(Operation::fix_enter());
        compile_runs(&ops)
    }

    #[test]
    fn test_simple_code_span() {
        let result = compile(vec![run("code", vec![("inlineCode", "true")])]);
        assert_eq!(result, vec![Inline::InlineCode("code".into())]);
    }

    #[test]
    fn test_code_span_in_strong() {
        let result = compile(vec![
            run("a", vec![("bold", "true")]),
            run("b", vec![("bold", "true"), ("inlineCode", "true")]),
            run("c", vec![("bold", "true")]),
        ]);
        assert_eq!(
            result,
            vec![Inline::Strong(vec![
                Inline::text("a"),
                Inline::InlineCode("b".into()),
                Inline::text("c"),
            ])]
        );
    }

    #[test]
    fn test_code_span_intersecting_strong() {
        let result = compile(vec![
            run("a", vec![("bold", "true")]),
            run("b", vec![("inlineCode", "true"), ("bold", "true")]),
            run("c", vec![("inlineCode", "true")]),
        ]);
        assert_eq!(
            result,
            vec![
                Inline::Strong(vec![Inline::text("a"), Inline::InlineCode("b".into())]),
                Inline::InlineCode("c".into()),
            ]
        );
    }

    #[test]
    fn test_emphasis_in_strong() {
        let result = compile(vec![
            run("a", vec![("bold", "true")]),
            run("b", vec![("italic", "true"), ("bold", "true")]),
            run("c", vec![("bold", "true")]),
        ]);
        assert_eq!(
            result,
            vec![Inline::Strong(vec![
                Inline::text("a"),
                Inline::Emphasis(vec![Inline::text("b")]),
                Inline::text("c"),
            ])]
        );
    }

    #[test]
    fn test_equal_spans_keep_declaration_order() {
        let result = compile(vec![run("ab", vec![("italic", "true"), ("bold", "true")])]);
        assert_eq!(
            result,
            vec![Inline::Strong(vec![Inline::Emphasis(vec![Inline::text("ab")])])]
        );
    }

    #[test]
    fn test_longer_span_wraps_outside() {
        // italic covers "ab", strikethrough only "b"
        let result = compile(vec![
            run("a", vec![("italic", "true")]),
            run("b", vec![("strikethrough", "true"), ("italic", "true")]),
        ]);
        assert_eq!(
            result,
            vec![Inline::Emphasis(vec![
                Inline::text("a"),
                Inline::Delete(vec![Inline::text("b")]),
            ])]
        );
    }

    #[test]
    fn test_link_is_decoded_and_merged() {
        let url = "https%3A%2F%2Fexample.com%2Fa%20b";
        let result = compile(vec![
            run("x", vec![("link", url)]),
            run("y", vec![("link", url), ("bold", "true")]),
            run("z", vec![("link", "https%3A%2F%2Fother.com")]),
        ]);
        assert_eq!(
            result,
            vec![
                Inline::Link(Link::new(
                    "https://example.com/a b",
                    vec![Inline::text("x"), Inline::Strong(vec![Inline::text("y")])],
                )),
                Inline::Link(Link::new("https://other.com", vec![Inline::text("z")])),
            ]
        );
    }

    #[test]
    fn test_invalid_utf8_link_falls_back_to_raw() {
        assert_eq!(decode_url("%FF%FE"), "%FF%FE");
        assert_eq!(decode_url("a%20b"), "a b");
    }

    #[test]
    fn test_equation_becomes_inline_math() {
        let result = compile(vec![
            run("E", vec![("equation", "E=mc^2\n")]),
            run(" and ", vec![]),
            run("x", vec![("equation", "\n")]),
        ]);
        assert_eq!(
            result,
            vec![
                Inline::InlineMath("E=mc^2".into()),
                Inline::text(" and x"),
            ]
        );
    }

    #[test]
    fn test_fix_enter_only_is_empty() {
        assert_eq!(compile(vec![]), vec![]);
    }

    #[test]
    fn test_unknown_attributes_are_ignored() {
        let result = compile(vec![
            run("a", vec![("textHighlight", "red")]),
            run("b", vec![]),
        ]);
        assert_eq!(result, vec![Inline::text("ab")]);
    }
}
