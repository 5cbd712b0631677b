//! Merging of adjacent compatible nodes

use larkdown_core::{Inline, List, ListItem, Node, Seq};

/// Collapse runs of adjacent items that belong together.
///
/// Each item is compared with its immediate predecessor. A run of length one
/// is emitted unchanged; longer runs are handed to `combine` as their first
/// item plus the rest. Relative order is preserved.
pub fn merge_adjacent<T, S, C>(items: Vec<T>, mut same_group: S, mut combine: C) -> Vec<T>
where
    S: FnMut(&T, &T) -> bool,
    C: FnMut(T, Vec<T>) -> T,
{
    let mut merged = Vec::with_capacity(items.len());
    let mut run: Option<(T, Vec<T>)> = None;

    for item in items {
        run = match run.take() {
            None => Some((item, Vec::new())),
            Some((first, mut rest)) => {
                let same = same_group(rest.last().unwrap_or(&first), &item);
                if same {
                    rest.push(item);
                    Some((first, rest))
                } else {
                    merged.push(finish_run(first, rest, &mut combine));
                    Some((item, Vec::new()))
                }
            }
        };
    }

    if let Some((first, rest)) = run {
        merged.push(finish_run(first, rest, &mut combine));
    }

    merged
}

fn finish_run<T, C>(first: T, rest: Vec<T>, combine: &mut C) -> T
where
    C: FnMut(T, Vec<T>) -> T,
{
    if rest.is_empty() {
        first
    } else {
        combine(first, rest)
    }
}

/// Merge adjacent phrasing nodes of the same kind.
///
/// Text and inline code concatenate their values. Emphasis, strong, delete
/// and links to the same URL concatenate their children, which are merged
/// again afterwards. Inline math and images are never merged.
pub fn merge_inlines(inlines: Vec<Inline>) -> Vec<Inline> {
    merge_adjacent(inlines, inlines_mergeable, combine_inlines)
}

fn inlines_mergeable(previous: &Inline, next: &Inline) -> bool {
    match (previous, next) {
        (Inline::Link(a), Inline::Link(b)) => a.url == b.url,
        (Inline::Text(_), Inline::Text(_))
        | (Inline::InlineCode(_), Inline::InlineCode(_))
        | (Inline::Emphasis(_), Inline::Emphasis(_))
        | (Inline::Strong(_), Inline::Strong(_))
        | (Inline::Delete(_), Inline::Delete(_)) => true,
        _ => false,
    }
}

fn combine_inlines(first: Inline, rest: Vec<Inline>) -> Inline {
    let combined = rest
        .into_iter()
        .fold(first, |acc, next| match (acc, next) {
            (Inline::Text(mut a), Inline::Text(b)) => {
                a.push_str(&b);
                Inline::Text(a)
            }
            (Inline::InlineCode(mut a), Inline::InlineCode(b)) => {
                a.push_str(&b);
                Inline::InlineCode(a)
            }
            (Inline::Emphasis(mut a), Inline::Emphasis(b)) => {
                a.extend(b);
                Inline::Emphasis(a)
            }
            (Inline::Strong(mut a), Inline::Strong(b)) => {
                a.extend(b);
                Inline::Strong(a)
            }
            (Inline::Delete(mut a), Inline::Delete(b)) => {
                a.extend(b);
                Inline::Delete(a)
            }
            (Inline::Link(mut a), Inline::Link(b)) => {
                a.children.extend(b.children);
                Inline::Link(a)
            }
            (acc, _) => acc,
        });

    match combined {
        Inline::Emphasis(children) => Inline::Emphasis(merge_inlines(children)),
        Inline::Strong(children) => Inline::Strong(merge_inlines(children)),
        Inline::Delete(children) => Inline::Delete(merge_inlines(children)),
        Inline::Link(mut link) => {
            link.children = merge_inlines(std::mem::take(&mut link.children));
            Inline::Link(link)
        }
        leaf => leaf,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Task,
    Ordered,
    Bullet,
}

fn list_kind(item: &ListItem) -> ListKind {
    if item.checked.is_some() {
        ListKind::Task
    } else if item.seq.is_some() {
        ListKind::Ordered
    } else {
        ListKind::Bullet
    }
}

/// Ordered items continue a list when either side is numbered automatically
/// or the number is exactly one more than the previous one
fn sequence_continues(previous: Option<Seq>, next: Option<Seq>) -> bool {
    match (previous, next) {
        (Some(Seq::Number(p)), Some(Seq::Number(n))) => p.checked_add(1) == Some(n),
        _ => true,
    }
}

fn same_list(previous: &ListItem, next: &ListItem) -> bool {
    match (list_kind(previous), list_kind(next)) {
        (ListKind::Ordered, ListKind::Ordered) => sequence_continues(previous.seq, next.seq),
        (a, b) => a == b,
    }
}

fn list_of(items: Vec<ListItem>) -> List {
    let seq = items.first().and_then(|item| item.seq);
    List {
        ordered: seq.is_some(),
        start: match seq {
            Some(Seq::Number(n)) => Some(n),
            _ => None,
        },
        spread: false,
        children: items,
    }
}

/// Group adjacent compatible list items into lists.
///
/// Every list item in the output is wrapped in a list, including items that
/// had no compatible neighbour. Other nodes pass through unchanged.
pub fn merge_list_items(nodes: Vec<Node>) -> Vec<Node> {
    merge_adjacent(
        nodes,
        |previous, next| match (previous, next) {
            (Node::ListItem(a), Node::ListItem(b)) => same_list(a, b),
            _ => false,
        },
        |first, rest| {
            let items = std::iter::once(first)
                .chain(rest)
                .filter_map(|node| match node {
                    Node::ListItem(item) => Some(item),
                    _ => None,
                })
                .collect();
            Node::List(list_of(items))
        },
    )
    .into_iter()
    .map(|node| match node {
        Node::ListItem(item) => Node::List(list_of(vec![item])),
        other => other,
    })
    .collect()
}
