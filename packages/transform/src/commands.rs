//! # Editing Commands
//!
//! Commands implement the user-level edits an editor binds to keys. Each
//! takes a document and a position or range and returns the [`Transform`]
//! that performs the edit, or `None` when the command does not apply there.
//!
//! ```rust,ignore
//! if let Some(tr) = join_backward(&doc, cursor) {
//!     doc = tr.doc().clone();
//! }
//! ```

use crate::error::TransformResult;
use crate::map::Mappable;
use crate::marks::MarkSelector;
use crate::replace_step::ReplaceAroundStep;
use crate::step::Step;
use crate::structure::{can_join, can_split, find_wrapping, lift_target, Wrapper};
use crate::transform::Transform;
use folio_model::{Attrs, ContentMatch, Fragment, MarkType, Node, NodeType, ResolvedPos, Slice};
use tracing::debug;

fn run<F>(doc: &Node, command: &str, f: F) -> Option<Transform>
where
    F: FnOnce(&mut Transform) -> TransformResult<()>,
{
    let mut tr = Transform::new(doc.clone());
    match f(&mut tr) {
        Ok(()) => Some(tr),
        Err(e) => {
            debug!(command, error = %e, "command did not apply");
            None
        }
    }
}

/// The cursor, when it sits at the start of a textblock.
fn at_block_start(doc: &Node, pos: usize) -> Option<ResolvedPos> {
    let cursor = doc.resolve(pos).ok()?;
    (cursor.parent().is_textblock() && cursor.parent_offset() == 0).then_some(cursor)
}

/// The cursor, when it sits at the end of a textblock.
fn at_block_end(doc: &Node, pos: usize) -> Option<ResolvedPos> {
    let cursor = doc.resolve(pos).ok()?;
    (cursor.parent().is_textblock() && cursor.parent_offset() == cursor.parent().content().size()).then_some(cursor)
}

fn find_cut_before(pos: &ResolvedPos) -> Option<ResolvedPos> {
    if pos.parent().node_type().spec().isolating {
        return None;
    }
    for i in (0..pos.depth()).rev() {
        if pos.index(i) > 0 {
            return pos.doc().resolve(pos.before(i + 1)).ok();
        }
        if pos.node(i).node_type().spec().isolating {
            break;
        }
    }
    None
}

fn find_cut_after(pos: &ResolvedPos) -> Option<ResolvedPos> {
    if pos.parent().node_type().spec().isolating {
        return None;
    }
    for i in (0..pos.depth()).rev() {
        let parent = pos.node(i);
        if pos.index(i) + 1 < parent.child_count() {
            return pos.doc().resolve(pos.after(i + 1)).ok();
        }
        if parent.node_type().spec().isolating {
            break;
        }
    }
    None
}

/// Whether a textblock is reached by descending along the first (or last)
/// children of `node`. With `only`, every node passed must have one child.
fn textblock_at(node: &Node, start: bool, only: bool) -> bool {
    let mut scan = Some(node.clone());
    while let Some(n) = scan {
        if n.is_textblock() {
            return true;
        }
        if only && n.child_count() != 1 {
            return false;
        }
        scan = if start { n.first_child().cloned() } else { n.last_child().cloned() };
    }
    false
}

/// The start of the first textblock after `cut`.
fn text_start_after(cut: &ResolvedPos) -> Option<ResolvedPos> {
    let mut node = cut.node_after()?;
    let mut pos = cut.pos();
    loop {
        if node.is_textblock() {
            return cut.doc().resolve(pos + 1).ok();
        }
        if node.is_leaf() {
            return None;
        }
        pos += 1;
        node = node.first_child()?.clone();
    }
}

fn join_maybe_clear(doc: &Node, cut: &ResolvedPos) -> Option<Transform> {
    let before = cut.node_before()?;
    let after = cut.node_after()?;
    let index = cut.index(cut.depth());
    let empty = Fragment::empty();
    if !before.node_type().compatible_content(after.node_type()) {
        return None;
    }
    if before.content().size() == 0 && cut.parent().can_replace(index - 1, index, &empty, 0, 0) {
        return run(doc, "join", |tr| {
            tr.delete(cut.pos() - before.node_size(), cut.pos())?;
            Ok(())
        });
    }
    if !cut.parent().can_replace(index, index + 1, &empty, 0, 0) || !(after.is_textblock() || can_join(doc, cut.pos())) {
        return None;
    }
    run(doc, "join", |tr| {
        tr.clear_incompatible(cut.pos(), before.node_type(), before.content_match_at(before.child_count()))?
            .join(cut.pos(), 1)?;
        Ok(())
    })
}

/// Try the ways of removing the boundary at `cut`: joining the blocks,
/// moving the block after into the one before, or lifting it.
fn delete_barrier(doc: &Node, cut: &ResolvedPos, dir: i32) -> Option<Transform> {
    let before = cut.node_before()?;
    let after = cut.node_after()?;
    let isolated = before.node_type().spec().isolating || after.node_type().spec().isolating;
    if !isolated {
        if let Some(tr) = join_maybe_clear(doc, cut) {
            return Some(tr);
        }
    }

    let index = cut.index(cut.depth());
    let can_del_after = !isolated && cut.parent().can_replace(index, index + 1, &Fragment::empty(), 0, 0);
    if can_del_after {
        if let Some(tr) = wrap_into_before(doc, cut, &before, &after) {
            return Some(tr);
        }
    }

    let sel_after = if after.node_type().spec().isolating || (dir > 0 && isolated) {
        None
    } else {
        text_start_after(cut)
    };
    if let Some(sel) = sel_after {
        if let Some(range) = sel.block_range(None, None) {
            if let Some(target) = lift_target(&range).filter(|&t| t >= cut.depth()) {
                return run(doc, "lift", |tr| {
                    tr.lift(&range, target)?;
                    Ok(())
                });
            }
        }
    }

    if can_del_after && textblock_at(&after, true, true) && textblock_at(&before, false, false) {
        let mut wrap = Vec::new();
        let mut at = before.clone();
        loop {
            wrap.push(at.clone());
            if at.is_textblock() {
                break;
            }
            at = at.last_child()?.clone();
        }
        let mut after_text = after.clone();
        let mut after_depth = 1;
        while !after_text.is_textblock() {
            after_text = after_text.first_child()?.clone();
            after_depth += 1;
        }
        let n = at.child_count();
        if at.can_replace(n, n, after_text.content(), 0, after_text.child_count()) {
            let mut end = Fragment::empty();
            for node in wrap.iter().rev() {
                end = Fragment::from(node.copy(end));
            }
            return run(doc, "join into textblock", |tr| {
                tr.step(Step::ReplaceAround(ReplaceAroundStep {
                    from: cut.pos() - wrap.len(),
                    to: cut.pos() + after.node_size(),
                    gap_from: cut.pos() + after_depth,
                    gap_to: cut.pos() + after.node_size() - after_depth,
                    slice: Slice::new(end, wrap.len(), 0),
                    insert: 0,
                    structure: true,
                }))?;
                Ok(())
            });
        }
    }
    None
}

/// Move the block after `cut` into the end of the block before it, adding
/// the wrappers its content expression needs (a paragraph after a list
/// becomes a new list item).
fn wrap_into_before(doc: &Node, cut: &ResolvedPos, before: &Node, after: &Node) -> Option<Transform> {
    let matched = before.content_match_at(before.child_count())?;
    let conn = matched.find_wrapping(after.node_type())?;
    let first = conn.first().unwrap_or(after.node_type());
    if !matched.match_type(first).map(|m| m.valid_end()).unwrap_or(false) {
        return None;
    }
    run(doc, "join into wrapper", |tr| {
        let end = cut.pos() + after.node_size();
        let mut wrap = Fragment::empty();
        for ty in conn.iter().rev() {
            wrap = Fragment::from(ty.create(None, wrap, &[])?);
        }
        wrap = Fragment::from(before.copy(wrap));
        tr.step(Step::ReplaceAround(ReplaceAroundStep {
            from: cut.pos() - 1,
            to: end,
            gap_from: cut.pos(),
            gap_to: end,
            slice: Slice::new(wrap, 1, 0),
            insert: conn.len(),
            structure: true,
        }))?;
        let join_at = end + 2 * conn.len();
        let joinable = tr
            .doc()
            .resolve(join_at)
            .ok()
            .and_then(|r| r.node_after())
            .map(|n| n.node_type() == before.node_type())
            .unwrap_or(false);
        if joinable && can_join(tr.doc(), join_at) {
            tr.join(join_at, 1)?;
        }
        Ok(())
    })
}

/// Join the textblock at the cursor with the content before it, or lift it
/// out of its parent when nothing precedes it. Applies only when `pos` is at
/// the start of a textblock.
pub fn join_backward(doc: &Node, pos: usize) -> Option<Transform> {
    let cursor = at_block_start(doc, pos)?;
    let Some(cut) = find_cut_before(&cursor) else {
        let range = cursor.block_range(None, None)?;
        let target = lift_target(&range)?;
        return run(doc, "join_backward", |tr| {
            tr.lift(&range, target)?;
            Ok(())
        });
    };
    let before = cut.node_before()?;
    if let Some(tr) = delete_barrier(doc, &cut, -1) {
        return Some(tr);
    }
    if cursor.parent().content().size() == 0 && (textblock_at(&before, false, false) || !before.is_text()) {
        for depth in (1..=cursor.depth()).rev() {
            if let Some(tr) = run(doc, "join_backward", |tr| {
                tr.delete(cursor.before(depth), cursor.after(depth))?;
                Ok(())
            }) {
                return Some(tr);
            }
            if depth == 1 || cursor.node(depth - 1).child_count() > 1 {
                break;
            }
        }
    }
    if before.is_atom() && cut.depth() + 1 == cursor.depth() {
        return run(doc, "join_backward", |tr| {
            tr.delete(cut.pos() - before.node_size(), cut.pos())?;
            Ok(())
        });
    }
    None
}

/// Join the textblock at the cursor with the content after it. Applies only
/// when `pos` is at the end of a textblock.
pub fn join_forward(doc: &Node, pos: usize) -> Option<Transform> {
    let cursor = at_block_end(doc, pos)?;
    let cut = find_cut_after(&cursor)?;
    let after = cut.node_after()?;
    if let Some(tr) = delete_barrier(doc, &cut, 1) {
        return Some(tr);
    }
    if cursor.parent().content().size() == 0 && (textblock_at(&after, true, false) || !after.is_text()) {
        let depth = cursor.depth();
        if let Some(tr) = run(doc, "join_forward", |tr| {
            tr.delete(cursor.before(depth), cursor.after(depth))?;
            Ok(())
        }) {
            return Some(tr);
        }
    }
    if after.is_atom() && cut.depth() + 1 == cursor.depth() {
        return run(doc, "join_forward", |tr| {
            tr.delete(cut.pos(), cut.pos() + after.node_size())?;
            Ok(())
        });
    }
    None
}

/// Delete `from..to`. Ranges whose sides cannot be rejoined do not apply.
pub fn delete_range(doc: &Node, from: usize, to: usize) -> Option<Transform> {
    if from >= to {
        return None;
    }
    run(doc, "delete_range", |tr| {
        tr.delete(from, to)?;
        Ok(())
    })
}

/// Replace `from..to` with the schema's `hard_break` node, or with a newline
/// inside code blocks.
pub fn insert_hard_break(doc: &Node, from: usize, to: usize) -> Option<Transform> {
    let rfrom = doc.resolve(from).ok()?;
    let parent = rfrom.parent();
    if !parent.is_textblock() {
        return None;
    }
    if parent.node_type().spec().code {
        return run(doc, "insert_hard_break", |tr| {
            tr.insert_text("\n", from, Some(to))?;
            Ok(())
        });
    }
    let br_type = doc.node_type().schema().node_type("hard_break")?;
    run(doc, "insert_hard_break", |tr| {
        let br = br_type.create(None, Fragment::empty(), &[])?;
        tr.replace_with(from, to, br)?;
        Ok(())
    })
}

fn mark_applies(doc: &Node, from: usize, to: usize, ty: &MarkType) -> bool {
    let mut can = false;
    if let Ok(rfrom) = doc.resolve(from) {
        if rfrom.depth() == 0 {
            can = doc.inline_content() && doc.node_type().allows_mark_type(ty);
        }
    }
    doc.nodes_between(from, to, &mut |node, _, _, _| {
        if can {
            return false;
        }
        can = node.inline_content() && node.node_type().allows_mark_type(ty);
        true
    });
    can
}

/// Remove marks of type `ty` from `from..to` when any text there has one,
/// otherwise add a mark of that type. Empty ranges do not apply.
pub fn toggle_mark(doc: &Node, from: usize, to: usize, ty: &MarkType, attrs: Option<&Attrs>) -> Option<Transform> {
    if from >= to || !mark_applies(doc, from, to, ty) {
        return None;
    }
    if doc.range_has_mark(from, to, ty) {
        run(doc, "toggle_mark", |tr| {
            tr.remove_mark(from, to, &MarkSelector::Type(ty.clone()))?;
            Ok(())
        })
    } else {
        run(doc, "toggle_mark", |tr| {
            let mark = ty.create(attrs)?;
            tr.add_mark(from, to, &mark)?;
            Ok(())
        })
    }
}

fn block_range(doc: &Node, from: usize, to: usize) -> Option<folio_model::NodeRange> {
    let rfrom = doc.resolve(from).ok()?;
    let rto = doc.resolve(to).ok()?;
    rfrom.block_range(Some(&rto), None)
}

/// Lift the blocks around `from..to` out of their parent.
pub fn lift_block(doc: &Node, from: usize, to: usize) -> Option<Transform> {
    let range = block_range(doc, from, to)?;
    let target = lift_target(&range)?;
    run(doc, "lift_block", |tr| {
        tr.lift(&range, target)?;
        Ok(())
    })
}

/// Wrap the blocks around `from..to` in a node of type `ty`.
pub fn wrap_in(doc: &Node, from: usize, to: usize, ty: &NodeType, attrs: Option<Attrs>) -> Option<Transform> {
    let range = block_range(doc, from, to)?;
    let wrappers = find_wrapping(&range, ty, attrs, None)?;
    run(doc, "wrap_in", |tr| {
        tr.wrap(&range, &wrappers)?;
        Ok(())
    })
}

fn default_block_at(matched: &ContentMatch) -> Option<NodeType> {
    (0..matched.edge_count())
        .filter_map(|i| matched.edge(i))
        .map(|(ty, _)| ty)
        .find(|ty| ty.is_textblock() && !ty.has_required_attrs())
}

/// Split the textblock at `from`, deleting `from..to` first. Splitting at
/// the end of a block starts the schema's default block; splitting at the
/// start of a heading leaves a default block behind.
pub fn split_block(doc: &Node, from: usize, to: usize) -> Option<Transform> {
    let rfrom = doc.resolve(from).ok()?;
    let rto = doc.resolve(to).ok()?;
    if rfrom.depth() == 0 || !rfrom.parent().is_block() {
        return None;
    }
    let depth = rfrom.depth();
    let at_end = rto.parent_offset() == rto.parent().content().size();
    let deflt = rfrom
        .node(depth - 1)
        .content_match_at(rfrom.index_after(depth - 1))
        .and_then(|m| default_block_at(&m));
    let deflt_types = deflt.clone().map(|ty| vec![Some(Wrapper::new(ty))]);

    run(doc, "split_block", |tr| {
        if from != to {
            tr.delete(from, to)?;
        }
        let split_pos = tr.mapping().map(from, 1);
        let mut types = if at_end { deflt_types.clone() } else { None };
        let mut can = can_split(tr.doc(), split_pos, 1, types.as_deref());
        if types.is_none() && !can && can_split(tr.doc(), split_pos, 1, deflt_types.as_deref()) {
            types = deflt_types.clone();
            can = true;
        }
        if !can {
            return Err(crate::error::TransformError::InvalidStructure(format!(
                "Cannot split at {}",
                split_pos
            )));
        }
        tr.split(split_pos, 1, types.as_deref())?;
        if let Some(deflt) = &deflt {
            if !at_end && rfrom.parent_offset() == 0 && rfrom.parent().node_type() != deflt {
                let first = tr.mapping().map(rfrom.before(depth), 1);
                let rfirst = tr.doc().resolve(first)?;
                let index = rfirst.index(rfirst.depth());
                if rfirst.parent().can_replace_with(index, index + 1, deflt, None) {
                    tr.set_node_markup(first, Some(deflt), None, None)?;
                }
            }
        }
        Ok(())
    })
}

/// Change the textblocks in `from..to` to type `ty`, when at least one of
/// them can change.
pub fn set_block(doc: &Node, from: usize, to: usize, ty: &NodeType, attrs: Option<&Attrs>) -> Option<Transform> {
    let mut applicable = false;
    doc.nodes_between(from, to, &mut |node, pos, _, _| {
        if applicable {
            return false;
        }
        if !node.is_textblock() || node.has_markup(ty, attrs, node.marks()) {
            return true;
        }
        if node.node_type() == ty {
            applicable = true;
        } else if let Ok(rpos) = doc.resolve(pos) {
            let index = rpos.index(rpos.depth());
            applicable = rpos.parent().can_replace_with(index, index + 1, ty, None);
        }
        true
    });
    if !applicable {
        return None;
    }
    run(doc, "set_block", |tr| {
        tr.set_block_type(from, to, ty, attrs)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_schema_basic::builders::{br, hr};
    use folio_schema_basic::{blockquote, doc, em, h1, li, p, pre, schema, ul};

    #[test]
    fn test_join_backward_into_list() {
        let d = doc![ul![li![p!["hi"]]], p!["<a>there"]];
        let tr = join_backward(&d, d.tag("a")).unwrap();
        let expected = doc![ul![li![p!["hi"]], li![p!["there"]]]];
        assert_eq!(tr.doc(), &expected.doc);
    }

    #[test]
    fn test_join_backward_paragraphs() {
        let d = doc![p!["one"], p!["<a>two"]];
        let tr = join_backward(&d, d.tag("a")).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("onetwo"))"#);
    }

    #[test]
    fn test_join_backward_lifts_first_block() {
        let d = doc![blockquote![p!["<a>one"]]];
        let tr = join_backward(&d, d.tag("a")).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("one"))"#);
    }

    #[test]
    fn test_join_backward_deletes_rule() {
        let d = doc![p!["a"], hr(), p!["<a>b"]];
        let tr = join_backward(&d, d.tag("a")).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("a"), paragraph("b"))"#);
    }

    #[test]
    fn test_join_backward_requires_block_start() {
        let d = doc![p!["one"], p!["t<a>wo"]];
        assert!(join_backward(&d, d.tag("a")).is_none());
        let d = doc![p!["<a>only"]];
        assert!(join_backward(&d, d.tag("a")).is_none());
    }

    #[test]
    fn test_join_forward() {
        let d = doc![p!["one<a>"], p!["two"]];
        let tr = join_forward(&d, d.tag("a")).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("onetwo"))"#);
        let d = doc![p!["last<a>"]];
        assert!(join_forward(&d, d.tag("a")).is_none());
    }

    #[test]
    fn test_delete_range_across_paragraphs() {
        let d = doc![p!["on<a>e"], p!["tw<b>o"]];
        let tr = delete_range(&d, d.tag("a"), d.tag("b")).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("ono"))"#);
        assert!(delete_range(&d, 3, 3).is_none());
    }

    #[test]
    fn test_insert_hard_break() {
        let d = doc![p!["fo<a>o"]];
        let tr = insert_hard_break(&d, d.tag("a"), d.tag("a")).unwrap();
        let expected = doc![p!["fo", br(), "o"]];
        assert_eq!(tr.doc(), &expected.doc);
        let back = tr.inverted()[0].apply(tr.doc()).unwrap();
        assert_eq!(back.doc, d.doc);
    }

    #[test]
    fn test_insert_hard_break_in_code() {
        let d = doc![pre!["a<a>b"]];
        let tr = insert_hard_break(&d, d.tag("a"), d.tag("a")).unwrap();
        assert_eq!(tr.doc().to_string(), "doc(code_block(\"a\\nb\"))");
    }

    #[test]
    fn test_toggle_mark() {
        let em_type = schema().mark_type("em").unwrap();
        let d = doc![p!["<a>one<b> two"]];
        let tr = toggle_mark(&d, d.tag("a"), d.tag("b"), &em_type, None).unwrap();
        let expected = doc![p![em!["one"], " two"]];
        assert_eq!(tr.doc(), &expected.doc);

        let again = toggle_mark(tr.doc(), d.tag("a"), d.tag("b"), &em_type, None).unwrap();
        assert_eq!(again.doc(), &d.doc);

        let code = doc![pre!["<a>x<b>"]];
        assert!(toggle_mark(&code, code.tag("a"), code.tag("b"), &em_type, None).is_none());
    }

    #[test]
    fn test_lift_block_and_wrap_in() {
        let d = doc![p!["<a>one"]];
        let quote = schema().node_type("blockquote").unwrap();
        let wrapped = wrap_in(&d, d.tag("a"), d.tag("a"), &quote, None).unwrap();
        assert_eq!(wrapped.doc().to_string(), r#"doc(blockquote(paragraph("one")))"#);
        let lifted = lift_block(wrapped.doc(), 2, 2).unwrap();
        assert_eq!(lifted.doc(), &d.doc);
        assert!(lift_block(&d, 1, 1).is_none());
    }

    #[test]
    fn test_split_block() {
        let d = doc![p!["fo<a>o"]];
        let tr = split_block(&d, d.tag("a"), d.tag("a")).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("fo"), paragraph("o"))"#);
    }

    #[test]
    fn test_split_heading_at_end_makes_paragraph() {
        let d = doc![h1!["Title<a>"]];
        let tr = split_block(&d, d.tag("a"), d.tag("a")).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(heading("Title"), paragraph)"#);
    }

    #[test]
    fn test_split_heading_at_start_leaves_paragraph() {
        let d = doc![h1!["<a>Title"]];
        let tr = split_block(&d, d.tag("a"), d.tag("a")).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph, heading("Title"))"#);
    }

    #[test]
    fn test_set_block() {
        let d = doc![p!["<a>one"], p!["two<b>"]];
        let heading = schema().node_type("heading").unwrap();
        let tr = set_block(&d, d.tag("a"), d.tag("b"), &heading, None).unwrap();
        let expected = doc![h1!["one"], h1!["two"]];
        assert_eq!(tr.doc(), &expected.doc);
        assert!(set_block(&expected, 1, 1, &heading, None).is_none());
    }
}
