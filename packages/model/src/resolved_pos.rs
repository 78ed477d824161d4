//! # Resolved positions
//!
//! [`ResolvedPos`] is the context of an integer position: the chain of
//! ancestors down to the innermost node whose content contains it, the child
//! index at every depth and the offset into the parent. Positions inside
//! text resolve to the textblock holding the text, never to the text node.
//!
//! Resolution is cheap and never cached; resolve again after every edit.

use crate::error::{ModelError, ModelResult};
use crate::{Mark, Node};
use std::fmt;

#[derive(Clone)]
struct PathEntry {
    node: Node,
    index: usize,
    /// Absolute position where the child at `index` starts.
    offset: usize,
}

#[derive(Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathEntry>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub(crate) fn resolve(doc: &Node, pos: usize) -> ModelResult<Self> {
        if pos > doc.content().size() {
            return Err(ModelError::OutOfRange {
                pos,
                size: doc.content().size(),
            });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let (index, offset) = node.content().find_index(parent_offset, false)?;
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node: node.clone(),
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }
        Ok(ResolvedPos {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of ancestors between the root and the parent.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Offset into the parent node's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &Node {
        &self.path[0].node
    }

    /// The ancestor at `depth`, clamped to the parent.
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth.min(self.depth())].node
    }

    /// Index into the ancestor at `depth`.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth.min(self.depth())].index
    }

    /// Index pointing after this position in the ancestor at `depth`.
    pub fn index_after(&self, depth: usize) -> usize {
        let depth = depth.min(self.depth());
        let skip = if depth == self.depth() && self.text_offset() == 0 {
            0
        } else {
            1
        };
        self.index(depth) + skip
    }

    /// Absolute position at the start of the ancestor at `depth`'s content.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth.min(self.depth()) - 1].offset + 1
        }
    }

    /// Absolute position at the end of the ancestor at `depth`'s content.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// Position directly before the ancestor at `depth`. There is nothing
    /// before the root, so depth 0 yields 0.
    pub fn before(&self, depth: usize) -> usize {
        if depth == 0 {
            return 0;
        }
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].offset
        }
    }

    /// Position directly after the ancestor at `depth`. Depth 0 yields the
    /// end of the document.
    pub fn after(&self, depth: usize) -> usize {
        if depth == 0 {
            return self.doc().content().size();
        }
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].offset + self.node(depth).node_size()
        }
    }

    /// Offset into the text node at this position, 0 between nodes.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    /// The node after this position, cut when it lands inside text.
    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if index == parent.child_count() {
            return None;
        }
        let child = parent.child(index);
        let offset = self.text_offset();
        Some(if offset > 0 {
            child.cut(offset, child.node_size())
        } else {
            child.clone()
        })
    }

    /// The node before this position, cut when it lands inside text.
    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return Some(self.parent().child(index).cut(0, offset));
        }
        if index == 0 {
            None
        } else {
            Some(self.parent().child(index - 1).clone())
        }
    }

    /// Absolute position of child `index` of the ancestor at `depth`.
    pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
        let node = self.node(depth);
        let mut pos = self.start(depth);
        for i in 0..index.min(node.child_count()) {
            pos += node.child(i).node_size();
        }
        pos
    }

    /// Marks that text inserted here would get. Non-inclusive marks at the
    /// end of a span are dropped.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content().size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).marks().to_vec();
        }
        let before = index.checked_sub(1).and_then(|i| parent.maybe_child(i));
        let after = parent.maybe_child(index);
        let (main, other) = match before {
            Some(before) => (Some(before), after),
            None => (after, None),
        };
        let Some(main) = main else {
            return Vec::new();
        };
        main.marks()
            .iter()
            .filter(|mark| {
                mark.mark_type().is_inclusive()
                    || other.map(|o| mark.is_in_set(o.marks())).unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Deepest depth whose node contains both this position and `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth())
            .rev()
            .find(|&d| self.start(d) <= pos && self.end(d) >= pos)
            .unwrap_or(0)
    }

    /// The range of block-level siblings around this position and `other`
    /// (which defaults to this position), optionally filtered by `pred` on
    /// the parent.
    pub fn block_range(&self, other: Option<&ResolvedPos>, pred: Option<&dyn Fn(&Node) -> bool>) -> Option<NodeRange> {
        let other = other.unwrap_or(self);
        if other.pos < self.pos {
            return other.block_range(Some(self), pred);
        }
        let top = if self.parent().inline_content() || self.pos == other.pos {
            self.depth().checked_sub(1)?
        } else {
            self.depth()
        };
        for d in (0..=top).rev() {
            if other.pos <= self.end(d) && pred.map(|p| p(self.node(d))).unwrap_or(true) {
                return Some(NodeRange::new(self.clone(), other.clone(), d));
            }
        }
        None
    }

    pub fn same_parent(&self, other: &ResolvedPos) -> bool {
        self.pos - self.parent_offset == other.pos - other.parent_offset
    }

    pub fn max<'a>(&'a self, other: &'a ResolvedPos) -> &'a ResolvedPos {
        if other.pos > self.pos {
            other
        } else {
            self
        }
    }

    pub fn min<'a>(&'a self, other: &'a ResolvedPos) -> &'a ResolvedPos {
        if other.pos < self.pos {
            other
        } else {
            self
        }
    }

    /// Child indices leading from the root to the parent node.
    pub fn path(&self) -> Vec<usize> {
        self.path[..self.depth()].iter().map(|e| e.index).collect()
    }
}

impl fmt::Display for ResolvedPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for d in 1..=self.depth() {
            parts.push(format!("{}_{}", self.node(d).node_type().name(), self.index(d - 1)));
        }
        write!(f, "{}:{}", parts.join("/"), self.parent_offset)
    }
}

impl fmt::Debug for ResolvedPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolvedPos({} {})", self.pos, self)
    }
}

/// A flat range of siblings between two resolved positions.
#[derive(Clone, Debug)]
pub struct NodeRange {
    pub from: ResolvedPos,
    pub to: ResolvedPos,
    pub depth: usize,
}

impl NodeRange {
    pub fn new(from: ResolvedPos, to: ResolvedPos, depth: usize) -> Self {
        NodeRange { from, to, depth }
    }

    pub fn start(&self) -> usize {
        self.from.before(self.depth + 1)
    }

    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1)
    }

    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }

    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }
}
