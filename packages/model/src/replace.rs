//! The replace algorithm behind [`Node::replace`](crate::Node::replace).
//!
//! Replacing `from..to` with an open slice rebuilds the tree along both
//! edges of the range. Nodes cut open on the slice's sides are joined with
//! the nodes cut open at `from` and `to`, which requires their types to have
//! compatible content; every rebuilt node is validated against its type.

use crate::error::ReplaceError;
use crate::resolved_pos::ResolvedPos;
use crate::{Fragment, Node, Slice};

type ReplaceResult<T> = Result<T, ReplaceError>;

pub(crate) fn replace(from: &ResolvedPos, to: &ResolvedPos, slice: &Slice) -> ReplaceResult<Node> {
    if slice.open_start() > from.depth() {
        return Err(ReplaceError::new(
            "Inserted content deeper than insertion position",
        ));
    }
    if slice.open_end() > to.depth()
        || from.depth() - slice.open_start() != to.depth() - slice.open_end()
    {
        return Err(ReplaceError::new("Inconsistent open depths"));
    }
    replace_outer(from, to, slice, 0)
}

fn replace_outer(from: &ResolvedPos, to: &ResolvedPos, slice: &Slice, depth: usize) -> ReplaceResult<Node> {
    let index = from.index(depth);
    let node = from.node(depth);
    if index == to.index(depth) && depth < from.depth() - slice.open_start() {
        let inner = replace_outer(from, to, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content().size() == 0 {
        close(node, replace_two_way(from, to, depth)?)
    } else if slice.open_start() == 0
        && slice.open_end() == 0
        && from.depth() == depth
        && to.depth() == depth
    {
        let parent = from.parent();
        let content = parent.content();
        close(
            parent,
            content
                .cut(0, from.parent_offset())
                .append(slice.content())
                .append(&content.cut(to.parent_offset(), content.size())),
        )
    } else {
        let (start, end) = prepare_slice_for_replace(slice, from)?;
        close(node, replace_three_way(from, &start, &end, to, depth)?)
    }
}

fn check_join(main: &Node, sub: &Node) -> ReplaceResult<()> {
    if !sub.node_type().compatible_content(main.node_type()) {
        return Err(ReplaceError::new(format!(
            "Cannot join {} onto {}",
            sub.node_type().name(),
            main.node_type().name()
        )));
    }
    Ok(())
}

fn joinable(before: &ResolvedPos, after: &ResolvedPos, depth: usize) -> ReplaceResult<Node> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node.clone())
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    if let Some(last) = target.last_mut() {
        if child.is_text() && last.is_text() && child.same_markup(last) {
            let text = format!("{}{}", last.text_str(), child.text_str());
            *last = child.with_text(text);
            return;
        }
    }
    target.push(child);
}

fn add_range(start: Option<&ResolvedPos>, end: Option<&ResolvedPos>, depth: usize, target: &mut Vec<Node>) {
    let Some(node) = end.or(start).map(|r| r.node(depth)) else {
        return;
    };
    let mut start_index = 0;
    let end_index = end.map(|e| e.index(depth)).unwrap_or(node.child_count());
    if let Some(start) = start {
        start_index = start.index(depth);
        if start.depth() > depth {
            start_index += 1;
        } else if start.text_offset() > 0 {
            if let Some(after) = start.node_after() {
                add_node(after, target);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        add_node(node.child(i).clone(), target);
    }
    if let Some(end) = end {
        if end.depth() == depth && end.text_offset() > 0 {
            if let Some(before) = end.node_before() {
                add_node(before, target);
            }
        }
    }
}

fn close(node: &Node, content: Fragment) -> ReplaceResult<Node> {
    node.node_type()
        .check_content(&content)
        .map_err(|e| ReplaceError::new(e.to_string()))?;
    Ok(node.copy(content))
}

fn replace_three_way(
    from: &ResolvedPos,
    start: &ResolvedPos,
    end: &ResolvedPos,
    to: &ResolvedPos,
    depth: usize,
) -> ReplaceResult<Fragment> {
    let open_start = if from.depth() > depth {
        Some(joinable(from, start, depth + 1)?)
    } else {
        None
    };
    let open_end = if to.depth() > depth {
        Some(joinable(end, to, depth + 1)?)
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    match (&open_start, &open_end) {
        (Some(os), Some(oe)) if start.index(depth) == end.index(depth) => {
            check_join(os, oe)?;
            let inner = replace_three_way(from, start, end, to, depth + 1)?;
            add_node(close(os, inner)?, &mut content);
        }
        _ => {
            if let Some(os) = &open_start {
                let inner = replace_two_way(from, start, depth + 1)?;
                add_node(close(os, inner)?, &mut content);
            }
            add_range(Some(start), Some(end), depth, &mut content);
            if let Some(oe) = &open_end {
                let inner = replace_two_way(end, to, depth + 1)?;
                add_node(close(oe, inner)?, &mut content);
            }
        }
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_array(content))
}

fn replace_two_way(from: &ResolvedPos, to: &ResolvedPos, depth: usize) -> ReplaceResult<Fragment> {
    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    if from.depth() > depth {
        let ty = joinable(from, to, depth + 1)?;
        let inner = replace_two_way(from, to, depth + 1)?;
        add_node(close(&ty, inner)?, &mut content);
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_array(content))
}

/// Wrap the slice in copies of `along`'s ancestors so its open sides can be
/// resolved at the same depths as the replaced range.
fn prepare_slice_for_replace(slice: &Slice, along: &ResolvedPos) -> ReplaceResult<(ResolvedPos, ResolvedPos)> {
    let extra = along.depth() - slice.open_start();
    let parent = along.node(extra);
    let mut node = parent.copy(slice.content().clone());
    for i in (0..extra).rev() {
        node = along.node(i).copy(Fragment::from(node));
    }
    let to_err = |e: crate::ModelError| ReplaceError::new(e.to_string());
    let start = node.resolve(slice.open_start() + extra).map_err(to_err)?;
    let end = node
        .resolve(node.content().size().saturating_sub(slice.open_end() + extra))
        .map_err(to_err)?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use crate::schema::{NodeSpec, Schema, SchemaSpec};
    use crate::{Fragment, Node, Slice};

    fn schema() -> Schema {
        Schema::new(SchemaSpec {
            nodes: vec![
                NodeSpec::new("doc").content("block+"),
                NodeSpec::new("paragraph").content("text*").group("block"),
                NodeSpec::new("blockquote").content("block+").group("block"),
                NodeSpec::new("hr").group("block"),
                NodeSpec::new("text"),
            ],
            marks: vec![],
            top_node: None,
        })
        .unwrap()
    }

    fn p(s: &Schema, text: &str) -> Node {
        let content = if text.is_empty() {
            Fragment::empty()
        } else {
            Fragment::from(s.text(text, &[]).unwrap())
        };
        s.node("paragraph", None, content, &[]).unwrap()
    }

    fn doc(s: &Schema, content: Vec<Node>) -> Node {
        s.node("doc", None, content, &[]).unwrap()
    }

    #[test]
    fn test_delete_across_paragraphs_joins_them() {
        let s = schema();
        let d = doc(&s, vec![p(&s, "one"), p(&s, "two")]);
        let result = d.replace(3, 7, &Slice::empty()).unwrap();
        assert_eq!(result, doc(&s, vec![p(&s, "onwo")]));
    }

    #[test]
    fn test_insert_open_slice_splits_and_rejoins() {
        let s = schema();
        let d = doc(&s, vec![p(&s, "abcd")]);
        let source = doc(&s, vec![p(&s, "xy"), p(&s, "zw")]);
        let slice = source.slice(2, 7, false).unwrap();
        assert_eq!((slice.open_start(), slice.open_end()), (1, 1));
        let result = d.replace(3, 3, &slice).unwrap();
        assert_eq!(result, doc(&s, vec![p(&s, "aby"), p(&s, "zcd")]));
    }

    #[test]
    fn test_flat_insert() {
        let s = schema();
        let d = doc(&s, vec![p(&s, "ad")]);
        let slice = Slice::new(Fragment::from(s.text("bc", &[]).unwrap()), 0, 0);
        assert_eq!(d.replace(2, 2, &slice).unwrap(), doc(&s, vec![p(&s, "abcd")]));
    }

    #[test]
    fn test_invalid_content_fails() {
        let s = schema();
        let d = doc(&s, vec![p(&s, "ab")]);
        let hr = s.node("hr", None, Fragment::empty(), &[]).unwrap();
        let slice = Slice::new(Fragment::from(hr), 0, 0);
        assert!(d.replace(2, 2, &slice).is_err());
        assert!(d.replace(0, 4, &Slice::empty()).is_err());
    }

    #[test]
    fn test_inconsistent_depths_fail() {
        let s = schema();
        let d = doc(&s, vec![p(&s, "ab")]);
        let slice = Slice::new(Fragment::from(p(&s, "x")), 1, 0);
        assert!(d.replace(0, 0, &slice).is_err());
    }

    #[test]
    fn test_join_incompatible_fails() {
        let s = schema();
        let d = doc(&s, vec![p(&s, "ab")]);
        let quote = s.node("blockquote", None, vec![p(&s, "x")], &[]).unwrap();
        let slice = Slice::new(Fragment::from(quote), 1, 1);
        assert!(d.replace(2, 2, &slice).is_err());
    }

    #[test]
    fn test_slice_insert_at_and_remove_between() {
        let s = schema();
        let slice = Slice::new(Fragment::from(vec![p(&s, "ab"), p(&s, "cd")]), 0, 0);
        let removed = slice.remove_between(0, 4).unwrap();
        assert_eq!(removed.content().child_count(), 1);
        let inserted = removed.insert_at(1, &Fragment::from(s.text("x", &[]).unwrap())).unwrap();
        assert_eq!(inserted.content().child(0).text_content(), "xcd");
        let max = Slice::max_open(Fragment::from(p(&s, "q")), true);
        assert_eq!((max.open_start(), max.open_end()), (1, 1));
    }
}
