//! Mark steps. They never change the document's size, so their maps are empty.

use crate::error::StepFailure;
use crate::map::Mappable;
use crate::replace_step::ReplaceStep;
use folio_model::{Fragment, Mark, Node, Slice};

/// Add a mark to the inline content of `from..to` whose parent allows it.
#[derive(Debug, Clone, PartialEq)]
pub struct AddMarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

/// Remove a mark from the inline content of `from..to`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveMarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

/// What inverting a mark step produces.
pub(crate) enum MarkInverse {
    Add(AddMarkStep),
    Remove(RemoveMarkStep),
    Restore(ReplaceStep),
}

fn map_fragment(fragment: &Fragment, f: &dyn Fn(&Node, &Node) -> Node, parent: &Node) -> Fragment {
    let mapped = fragment
        .iter()
        .map(|child| {
            let mut child = child.clone();
            if child.content().size() > 0 {
                let inner = map_fragment(child.content(), f, &child);
                child = child.copy(inner);
            }
            if child.is_inline() {
                child = f(&child, parent);
            }
            child
        })
        .collect();
    Fragment::from_array(mapped)
}

fn apply_to_slice(doc: &Node, from: usize, to: usize, parent: &Node, f: &dyn Fn(&Node, &Node) -> Node) -> Result<Node, StepFailure> {
    let old = doc.slice(from, to, false)?;
    let slice = Slice::new(map_fragment(old.content(), f, parent), old.open_start(), old.open_end());
    Ok(doc.replace(from, to, &slice)?)
}

/// Visit the inline nodes in `from..to` that a mark step would touch.
fn for_each_affected<F: FnMut(&Node)>(doc: &Node, from: usize, to: usize, mark: &Mark, adding: bool, mut f: F) {
    doc.nodes_between(from, to, &mut |node, _, parent, _| {
        if node.is_inline() {
            let allowed = parent
                .map(|p| p.node_type().allows_mark_type(mark.mark_type()))
                .unwrap_or(false);
            if allowed || !adding {
                f(node);
            }
        }
        true
    });
}

impl AddMarkStep {
    pub fn new(from: usize, to: usize, mark: Mark) -> Self {
        AddMarkStep { from, to, mark }
    }

    pub(crate) fn apply(&self, doc: &Node) -> Result<Node, StepFailure> {
        let rfrom = doc.resolve(self.from)?;
        let parent = rfrom.node(rfrom.shared_depth(self.to)).clone();
        let mark = &self.mark;
        apply_to_slice(doc, self.from, self.to, &parent, &|node, parent| {
            if !node.is_atom() || !parent.node_type().allows_mark_type(mark.mark_type()) {
                return node.clone();
            }
            node.mark(mark.add_to_set(node.marks()))
        })
    }

    /// The mark is removed again when every affected node gained exactly this
    /// mark and lost nothing. Otherwise the original content is restored.
    pub(crate) fn invert(&self, doc: &Node) -> Result<MarkInverse, StepFailure> {
        let mut exact = true;
        for_each_affected(doc, self.from, self.to, &self.mark, true, |node| {
            if self.mark.add_to_set(node.marks()).len() != node.marks().len() + 1 {
                exact = false;
            }
        });
        if exact {
            Ok(MarkInverse::Remove(RemoveMarkStep::new(self.from, self.to, self.mark.clone())))
        } else {
            Ok(MarkInverse::Restore(ReplaceStep::new(
                self.from,
                self.to,
                doc.slice(self.from, self.to, false)?,
            )))
        }
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<AddMarkStep> {
        let (from, to) = map_mark_range(self.from, self.to, mapping)?;
        Some(AddMarkStep::new(from, to, self.mark.clone()))
    }

    pub(crate) fn merge(&self, other: &AddMarkStep) -> Option<AddMarkStep> {
        if other.mark == self.mark && self.from <= other.to && self.to >= other.from {
            Some(AddMarkStep::new(
                self.from.min(other.from),
                self.to.max(other.to),
                self.mark.clone(),
            ))
        } else {
            None
        }
    }
}

impl RemoveMarkStep {
    pub fn new(from: usize, to: usize, mark: Mark) -> Self {
        RemoveMarkStep { from, to, mark }
    }

    pub(crate) fn apply(&self, doc: &Node) -> Result<Node, StepFailure> {
        let mark = &self.mark;
        apply_to_slice(doc, self.from, self.to, doc, &|node, _| {
            node.mark(mark.remove_from_set(node.marks()))
        })
    }

    /// Exact when every inline node in the range carried the mark.
    pub(crate) fn invert(&self, doc: &Node) -> Result<MarkInverse, StepFailure> {
        let mut exact = true;
        for_each_affected(doc, self.from, self.to, &self.mark, false, |node| {
            if !self.mark.is_in_set(node.marks()) {
                exact = false;
            }
        });
        if exact {
            Ok(MarkInverse::Add(AddMarkStep::new(self.from, self.to, self.mark.clone())))
        } else {
            Ok(MarkInverse::Restore(ReplaceStep::new(
                self.from,
                self.to,
                doc.slice(self.from, self.to, false)?,
            )))
        }
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<RemoveMarkStep> {
        let (from, to) = map_mark_range(self.from, self.to, mapping)?;
        Some(RemoveMarkStep::new(from, to, self.mark.clone()))
    }

    pub(crate) fn merge(&self, other: &RemoveMarkStep) -> Option<RemoveMarkStep> {
        if other.mark == self.mark && self.from <= other.to && self.to >= other.from {
            Some(RemoveMarkStep::new(
                self.from.min(other.from),
                self.to.max(other.to),
                self.mark.clone(),
            ))
        } else {
            None
        }
    }
}

fn map_mark_range(from: usize, to: usize, mapping: &dyn Mappable) -> Option<(usize, usize)> {
    let from = mapping.map_result(from, 1);
    let to = mapping.map_result(to, -1);
    if (from.deleted() && to.deleted()) || from.pos >= to.pos {
        return None;
    }
    Some((from.pos, to.pos))
}
