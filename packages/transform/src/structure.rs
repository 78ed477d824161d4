//! Structural helpers: lifting, wrapping, splitting and joining blocks.
//!
//! The `can_*` and `*_target` functions answer whether an operation is
//! possible; the [`Transform`] methods perform it.

use crate::error::{TransformError, TransformResult};
use crate::map::Mappable;
use crate::replace_step::{ReplaceAroundStep, ReplaceStep};
use crate::step::Step;
use crate::transform::Transform;
use folio_model::{Attrs, Fragment, Mark, Node, NodeRange, NodeType, Slice};

/// A node type and attributes to wrap content in.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapper {
    pub ty: NodeType,
    pub attrs: Option<Attrs>,
}

impl Wrapper {
    pub fn new(ty: NodeType) -> Self {
        Wrapper { ty, attrs: None }
    }

    pub fn with_attrs(ty: NodeType, attrs: Option<Attrs>) -> Self {
        Wrapper { ty, attrs }
    }
}

fn can_cut(node: &Node, start: usize, end: usize) -> bool {
    let empty = Fragment::empty();
    (start == 0 || node.can_replace(start, node.child_count(), &empty, 0, 0))
        && (end == node.child_count() || node.can_replace(0, end, &empty, 0, 0))
}

/// The depth the content of `range` can be lifted to, if any.
pub fn lift_target(range: &NodeRange) -> Option<usize> {
    let parent = range.parent();
    let content = parent
        .content()
        .cut_by_index(range.start_index(), range.end_index());
    let mut depth = range.depth;
    loop {
        let node = range.from.node(depth);
        let index = range.from.index(depth);
        let end_index = range.to.index_after(depth);
        if depth < range.depth && node.can_replace(index, end_index, &content, 0, content.child_count()) {
            return Some(depth);
        }
        if depth == 0 || node.node_type().spec().isolating || !can_cut(node, index, end_index) {
            return None;
        }
        depth -= 1;
    }
}

/// The wrappers needed to wrap `range` in a node of type `ty`: any nodes
/// required around it, the node itself, and any nodes required inside it.
pub fn find_wrapping(range: &NodeRange, ty: &NodeType, attrs: Option<Attrs>, inner_range: Option<&NodeRange>) -> Option<Vec<Wrapper>> {
    let around = find_wrapping_outside(range, ty)?;
    let inner = find_wrapping_inside(inner_range.unwrap_or(range), ty)?;
    let mut wrappers: Vec<Wrapper> = around.into_iter().map(Wrapper::new).collect();
    wrappers.push(Wrapper::with_attrs(ty.clone(), attrs));
    wrappers.extend(inner.into_iter().map(Wrapper::new));
    Some(wrappers)
}

fn find_wrapping_outside(range: &NodeRange, ty: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let around = parent
        .content_match_at(range.start_index())?
        .find_wrapping(ty)?;
    let outer = around.first().unwrap_or(ty);
    if parent.can_replace_with(range.start_index(), range.end_index(), outer, None) {
        Some(around)
    } else {
        None
    }
}

fn find_wrapping_inside(range: &NodeRange, ty: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let inner = parent.maybe_child(range.start_index())?;
    let inside = ty.content_match().find_wrapping(inner.node_type())?;
    let last = inside.last().unwrap_or(ty);
    let mut matched = Some(last.content_match());
    for i in range.start_index()..range.end_index() {
        matched = matched.and_then(|m| m.match_type(parent.child(i).node_type()));
    }
    match matched {
        Some(m) if m.valid_end() => Some(inside),
        _ => None,
    }
}

/// Whether the document can be split at `pos`, `depth` levels deep.
/// `types_after` optionally gives the types of the nodes after the split,
/// outermost first.
pub fn can_split(doc: &Node, pos: usize, depth: usize, types_after: Option<&[Option<Wrapper>]>) -> bool {
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    if depth == 0 || depth > rpos.depth() {
        return false;
    }
    let base = rpos.depth() - depth;
    let type_at = |i: usize| types_after.and_then(|t| t.get(i)).and_then(|w| w.as_ref());
    let parent = rpos.parent();
    let inner_type = types_after
        .and_then(|t| t.last())
        .and_then(|w| w.as_ref())
        .map(|w| w.ty.clone())
        .unwrap_or_else(|| parent.node_type().clone());
    let index = rpos.index(rpos.depth());
    let empty = Fragment::empty();
    if parent.node_type().spec().isolating
        || !parent.can_replace(index, parent.child_count(), &empty, 0, 0)
        || !inner_type.valid_content(&parent.content().cut_by_index(index, parent.child_count()))
    {
        return false;
    }
    let mut d = rpos.depth() - 1;
    let mut i = depth as isize - 2;
    while d > base {
        let node = rpos.node(d);
        let index = rpos.index(d);
        if node.node_type().spec().isolating {
            return false;
        }
        let mut rest = node.content().cut_by_index(index, node.child_count());
        if let Some(over) = type_at((i + 1) as usize) {
            match over.ty.create(over.attrs.as_ref(), Fragment::empty(), &[]) {
                Ok(child) if rest.child_count() > 0 => rest = rest.replace_child(0, child),
                Ok(_) => {}
                Err(_) => return false,
            }
        }
        let after = if i >= 0 { type_at(i as usize) } else { None };
        let after_type = after.map(|w| w.ty.clone()).unwrap_or_else(|| node.node_type().clone());
        if !node.can_replace(index + 1, node.child_count(), &empty, 0, 0) || !after_type.valid_content(&rest) {
            return false;
        }
        d -= 1;
        i -= 1;
    }
    let index = rpos.index_after(base);
    let base_type = type_at(0)
        .map(|w| w.ty.clone())
        .unwrap_or_else(|| rpos.node(base + 1).node_type().clone());
    rpos.node(base).can_replace_with(index, index, &base_type, None)
}

/// Whether the nodes on both sides of `pos` can be joined.
pub fn can_join(doc: &Node, pos: usize) -> bool {
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    let index = rpos.index(rpos.depth());
    joinable(rpos.node_before().as_ref(), rpos.node_after().as_ref())
        && rpos.parent().can_replace(index, index + 1, &Fragment::empty(), 0, 0)
}

fn joinable(a: Option<&Node>, b: Option<&Node>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => !a.is_leaf() && a.can_append(b),
        _ => false,
    }
}

/// Find a position at or around `pos` where two blocks can be joined,
/// searching towards the start (`dir < 0`) or end of the document.
pub fn join_point(doc: &Node, pos: usize, dir: i32) -> Option<usize> {
    let rpos = doc.resolve(pos).ok()?;
    let mut pos = pos;
    let mut d = rpos.depth();
    loop {
        let mut index = rpos.index(d);
        let (before, after) = if d == rpos.depth() {
            (rpos.node_before(), rpos.node_after())
        } else if dir > 0 {
            index += 1;
            (Some(rpos.node(d + 1).clone()), rpos.node(d).maybe_child(index).cloned())
        } else {
            (
                index.checked_sub(1).and_then(|i| rpos.node(d).maybe_child(i)).cloned(),
                Some(rpos.node(d + 1).clone()),
            )
        };
        if let Some(b) = &before {
            if !b.is_textblock()
                && joinable(before.as_ref(), after.as_ref())
                && rpos.node(d).can_replace(index, index + 1, &Fragment::empty(), 0, 0)
            {
                return Some(pos);
            }
        }
        if d == 0 {
            return None;
        }
        pos = if dir < 0 { rpos.before(d) } else { rpos.after(d) };
        d -= 1;
    }
}

impl Transform {
    /// Lift the content of `range` out of its parents, up to `target` depth.
    /// Parents that keep other content are split.
    pub fn lift(&mut self, range: &NodeRange, target: usize) -> TransformResult<&mut Self> {
        let from = &range.from;
        let to = &range.to;
        let depth = range.depth;
        let gap_start = from.before(depth + 1);
        let gap_end = to.after(depth + 1);
        let mut start = gap_start;
        let mut end = gap_end;

        let mut before = Fragment::empty();
        let mut open_start = 0;
        let mut splitting = false;
        for d in (target + 1..=depth).rev() {
            if splitting || from.index(d) > 0 {
                splitting = true;
                before = Fragment::from(from.node(d).copy(before));
                open_start += 1;
            } else {
                start -= 1;
            }
        }

        let mut after = Fragment::empty();
        let mut open_end = 0;
        let mut splitting = false;
        for d in (target + 1..=depth).rev() {
            if splitting || to.after(d + 1) < to.end(d) {
                splitting = true;
                after = Fragment::from(to.node(d).copy(after));
                open_end += 1;
            } else {
                end += 1;
            }
        }

        let insert = before.size() - open_start;
        self.step(Step::ReplaceAround(ReplaceAroundStep {
            from: start,
            to: end,
            gap_from: gap_start,
            gap_to: gap_end,
            slice: Slice::new(before.append(&after), open_start, open_end),
            insert,
            structure: true,
        }))
    }

    /// Wrap `range` in the given wrappers, outermost first.
    pub fn wrap(&mut self, range: &NodeRange, wrappers: &[Wrapper]) -> TransformResult<&mut Self> {
        let mut content = Fragment::empty();
        for wrapper in wrappers.iter().rev() {
            if content.size() > 0 {
                let fits = wrapper
                    .ty
                    .content_match()
                    .match_fragment(&content, 0, content.child_count())
                    .map(|m| m.valid_end())
                    .unwrap_or(false);
                if !fits {
                    return Err(TransformError::InvalidStructure(format!(
                        "Wrapper type {} does not form valid content of its parent wrapper",
                        wrapper.ty.name()
                    )));
                }
            }
            content = Fragment::from(wrapper.ty.create(wrapper.attrs.as_ref(), content, &[])?);
        }
        let start = range.start();
        let end = range.end();
        self.step(Step::ReplaceAround(ReplaceAroundStep {
            from: start,
            to: end,
            gap_from: start,
            gap_to: end,
            slice: Slice::new(content, 0, 0),
            insert: wrappers.len(),
            structure: true,
        }))
    }

    /// Change every textblock in `from..to` to type `ty`.
    pub fn set_block_type(&mut self, from: usize, to: usize, ty: &NodeType, attrs: Option<&Attrs>) -> TransformResult<&mut Self> {
        if !ty.is_textblock() {
            return Err(TransformError::InvalidStructure(
                "Type given to set_block_type should be a textblock".to_string(),
            ));
        }
        let map_from = self.steps().len();
        let mut blocks: Vec<(Node, usize)> = Vec::new();
        self.doc().nodes_between(from, to, &mut |node, pos, _, _| {
            if node.is_textblock() {
                if !node.has_markup(ty, attrs, node.marks()) {
                    blocks.push((node.clone(), pos));
                }
                return false;
            }
            true
        });
        for (node, pos) in blocks {
            let mapping = self.mapping().slice_from(map_from);
            let mapped = mapping.map(pos, 1);
            if !can_change_type(self.doc(), mapped, ty) {
                continue;
            }
            self.clear_incompatible(mapped, ty, None)?;
            let mapping = self.mapping().slice_from(map_from);
            let start = mapping.map(pos, 1);
            let end = mapping.map(pos + node.node_size(), 1);
            let replacement = ty.create(attrs, Fragment::empty(), node.marks())?;
            self.step(Step::ReplaceAround(ReplaceAroundStep {
                from: start,
                to: end,
                gap_from: start + 1,
                gap_to: end - 1,
                slice: Slice::new(Fragment::from(replacement), 0, 0),
                insert: 1,
                structure: true,
            }))?;
        }
        Ok(self)
    }

    /// Change the type, attributes or marks of the node at `pos`.
    pub fn set_node_markup(
        &mut self,
        pos: usize,
        ty: Option<&NodeType>,
        attrs: Option<&Attrs>,
        marks: Option<&[Mark]>,
    ) -> TransformResult<&mut Self> {
        let node = self
            .doc()
            .node_at(pos)
            .ok_or(folio_model::ModelError::NoNodeAt(pos))?;
        let ty = ty.unwrap_or(node.node_type()).clone();
        let new_node = ty.create(attrs, Fragment::empty(), marks.unwrap_or(node.marks()))?;
        if node.is_leaf() {
            return self.replace_with(pos, pos + node.node_size(), new_node);
        }
        if !ty.valid_content(node.content()) {
            return Err(TransformError::InvalidStructure(format!(
                "Invalid content for node type {}",
                ty.name()
            )));
        }
        self.step(Step::ReplaceAround(ReplaceAroundStep {
            from: pos,
            to: pos + node.node_size(),
            gap_from: pos + 1,
            gap_to: pos + node.node_size() - 1,
            slice: Slice::new(Fragment::from(new_node), 0, 0),
            insert: 1,
            structure: true,
        }))
    }

    /// Split the node at `pos`, `depth` levels deep. `types_after` optionally
    /// gives the types for the nodes after the split, outermost first.
    pub fn split(&mut self, pos: usize, depth: usize, types_after: Option<&[Option<Wrapper>]>) -> TransformResult<&mut Self> {
        let rpos = self.doc().resolve(pos)?;
        if depth > rpos.depth() {
            return Err(TransformError::InvalidStructure(format!(
                "Cannot split {} levels at depth {}",
                depth,
                rpos.depth()
            )));
        }
        let mut before = Fragment::empty();
        let mut after = Fragment::empty();
        for (i, d) in ((rpos.depth() - depth + 1)..=rpos.depth()).rev().enumerate() {
            before = Fragment::from(rpos.node(d).copy(before));
            let type_after = types_after
                .and_then(|t| t.get(depth - 1 - i))
                .and_then(|w| w.as_ref());
            after = Fragment::from(match type_after {
                Some(w) => w.ty.create(w.attrs.as_ref(), after, &[])?,
                None => rpos.node(d).copy(after),
            });
        }
        self.step(Step::Replace(ReplaceStep::structural(
            pos,
            pos,
            Slice::new(before.append(&after), depth, depth),
        )))
    }

    /// Join the blocks around `pos`, `depth` levels deep.
    pub fn join(&mut self, pos: usize, depth: usize) -> TransformResult<&mut Self> {
        if depth > pos {
            return Err(TransformError::InvalidStructure(format!("Cannot join {} levels at {}", depth, pos)));
        }
        self.step(Step::Replace(ReplaceStep::structural(
            pos - depth,
            pos + depth,
            Slice::empty(),
        )))
    }
}

fn can_change_type(doc: &Node, pos: usize, ty: &NodeType) -> bool {
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    let index = rpos.index(rpos.depth());
    rpos.parent().can_replace_with(index, index + 1, ty, None)
}
