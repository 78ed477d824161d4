//! # Node
//!
//! Immutable, reference-counted document nodes. Editing a document never
//! changes a node; it builds new nodes along the edited path and shares
//! every untouched subtree with the previous version.
//!
//! ## Positions
//!
//! Every node boundary, character and leaf counts as one position. A
//! non-leaf node occupies `content.size() + 2` positions (its opening and
//! closing token plus content), a leaf occupies one and a text node one per
//! Unicode scalar value.

use crate::content::ContentMatch;
use crate::error::{ModelError, ModelResult, ReplaceError};
use crate::replace;
use crate::resolved_pos::ResolvedPos;
use crate::schema::{Attrs, MarkType, NodeType};
use crate::{Fragment, Mark, Slice};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Slice `s` by character (not byte) offsets, clamping to its length.
pub(crate) fn char_slice(s: &str, from: usize, to: usize) -> &str {
    let byte = |n: usize| s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len());
    let (start, end) = (byte(from), byte(to));
    if start >= end {
        ""
    } else {
        &s[start..end]
    }
}

struct NodeInner {
    ty: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<Arc<str>>,
    text_len: usize,
}

/// A node in a document tree. Cloning is a reference-count bump.
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

impl Node {
    pub(crate) fn new(ty: NodeType, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Self {
        Node(Arc::new(NodeInner {
            ty,
            attrs,
            content,
            marks,
            text: None,
            text_len: 0,
        }))
    }

    pub(crate) fn new_text(ty: NodeType, text: String, marks: Vec<Mark>) -> Self {
        let text_len = text.chars().count();
        Node(Arc::new(NodeInner {
            ty,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks,
            text: Some(Arc::from(text)),
            text_len,
        }))
    }

    pub fn node_type(&self) -> &NodeType {
        &self.0.ty
    }

    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.0.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.0.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.0.marks
    }

    /// The text of a text node.
    pub fn text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    pub(crate) fn text_str(&self) -> &str {
        self.0.text.as_deref().unwrap_or("")
    }

    pub fn is_text(&self) -> bool {
        self.0.text.is_some()
    }

    pub fn is_inline(&self) -> bool {
        self.0.ty.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.0.ty.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.0.ty.is_textblock()
    }

    pub fn inline_content(&self) -> bool {
        self.0.ty.inline_content()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.ty.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.0.ty.is_atom()
    }

    pub fn node_size(&self) -> usize {
        if self.is_text() {
            self.0.text_len
        } else if self.is_leaf() {
            1
        } else {
            self.0.content.size() + 2
        }
    }

    pub fn child_count(&self) -> usize {
        self.0.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.0.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.0.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.0.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.0.content.last_child()
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// True when both nodes have the same type, attributes and marks.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(other.node_type(), Some(other.attrs()), other.marks())
    }

    pub fn has_markup(&self, ty: &NodeType, attrs: Option<&Attrs>, marks: &[Mark]) -> bool {
        let attrs_match = match attrs {
            Some(attrs) => *attrs == self.0.attrs,
            None => self
                .0
                .ty
                .compute_attrs(None)
                .map(|defaults| defaults == self.0.attrs)
                .unwrap_or(false),
        };
        self.0.ty == *ty && attrs_match && Mark::same_set(&self.0.marks, marks)
    }

    /// A copy of this node with different content.
    pub fn copy(&self, content: Fragment) -> Node {
        if content == self.0.content {
            return self.clone();
        }
        Node(Arc::new(NodeInner {
            ty: self.0.ty.clone(),
            attrs: self.0.attrs.clone(),
            content,
            marks: self.0.marks.clone(),
            text: self.0.text.clone(),
            text_len: self.0.text_len,
        }))
    }

    /// A copy of this node with a different mark set.
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        if Mark::same_set(&marks, &self.0.marks) {
            return self.clone();
        }
        Node(Arc::new(NodeInner {
            ty: self.0.ty.clone(),
            attrs: self.0.attrs.clone(),
            content: self.0.content.clone(),
            marks,
            text: self.0.text.clone(),
            text_len: self.0.text_len,
        }))
    }

    /// A text node with the same marks and different text.
    pub fn with_text(&self, text: impl Into<String>) -> Node {
        let text = text.into();
        if self.text() == Some(text.as_str()) {
            return self.clone();
        }
        Node::new_text(self.0.ty.clone(), text, self.0.marks.clone())
    }

    /// The node restricted to content between `from` and `to` (character
    /// offsets for text nodes).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        if let Some(text) = self.text() {
            debug_assert!(from < to.min(self.0.text_len), "empty cut of a text node");
            if from == 0 && to >= self.0.text_len {
                return self.clone();
            }
            return self.with_text(char_slice(text, from, to));
        }
        if from == 0 && to >= self.0.content.size() {
            return self.clone();
        }
        self.copy(self.0.content.cut(from, to))
    }

    /// Cut out the content between two positions as a [`Slice`] whose open
    /// depths record how deep each side reaches.
    pub fn slice(&self, from: usize, to: usize, include_parents: bool) -> ModelResult<Slice> {
        if from == to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = if include_parents {
            0
        } else {
            rfrom.shared_depth(to)
        };
        let start = rfrom.start(depth);
        let node = rfrom.node(depth);
        let content = node.content().cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(content, rfrom.depth() - depth, rto.depth() - depth))
    }

    /// Replace the range `from..to` with `slice`.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> ModelResult<Node> {
        if from > to {
            return Err(ReplaceError::new(format!("Range {}..{} is reversed", from, to)).into());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        Ok(replace::replace(&rfrom, &rto, slice)?)
    }

    pub fn resolve(&self, pos: usize) -> ModelResult<ResolvedPos> {
        ResolvedPos::resolve(self, pos)
    }

    /// The node directly after `pos`, descending as deep as possible.
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        let mut node = self.clone();
        let mut pos = pos;
        loop {
            let (index, offset) = node.content().find_index(pos, false).ok()?;
            let child = node.maybe_child(index)?.clone();
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// The direct child starting at or containing `pos`, with its index and
    /// start offset.
    pub fn child_after(&self, pos: usize) -> Option<(Node, usize, usize)> {
        let (index, offset) = self.content().find_index(pos, false).ok()?;
        self.maybe_child(index).map(|c| (c.clone(), index, offset))
    }

    /// The direct child ending at or containing `pos`.
    pub fn child_before(&self, pos: usize) -> Option<(Node, usize, usize)> {
        if pos == 0 {
            return None;
        }
        let (index, offset) = self.content().find_index(pos, false).ok()?;
        if offset < pos {
            return self.maybe_child(index).map(|c| (c.clone(), index, offset));
        }
        let node = self.maybe_child(index.checked_sub(1)?)?.clone();
        let start = offset - node.node_size();
        Some((node, index - 1, start))
    }

    /// Follow a path of child indices from this node.
    pub fn node_at_path(&self, path: &[usize]) -> Option<&Node> {
        let mut node = self;
        for &index in path {
            node = node.maybe_child(index)?;
        }
        Some(node)
    }

    /// Visit every descendant overlapping `from..to` (relative to the
    /// start of this node's content). Returning `false` skips children.
    pub fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.0.content.nodes_between(from, to, f, 0, Some(self))
    }

    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.nodes_between(0, self.0.content.size(), f)
    }

    pub fn text_content(&self) -> String {
        match self.text() {
            Some(text) => text.to_string(),
            None => self.text_between(0, self.0.content.size(), None, None),
        }
    }

    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&str>,
    ) -> String {
        self.0
            .content
            .text_between(from, to, block_separator, leaf_text)
    }

    /// True when any inline node in `from..to` carries a mark of `ty`.
    pub fn range_has_mark(&self, from: usize, to: usize, ty: &MarkType) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, &mut |node: &Node, _, _, _| {
                if ty.is_in_set(node.marks()).is_some() {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// The content automaton state after the first `index` children.
    pub fn content_match_at(&self, index: usize) -> Option<ContentMatch> {
        self.0
            .ty
            .content_match()
            .match_fragment(&self.0.content, 0, index)
    }

    /// Test whether replacing children `from..to` with
    /// `replacement[start..end]` leaves valid content.
    pub fn can_replace(&self, from: usize, to: usize, replacement: &Fragment, start: usize, end: usize) -> bool {
        let valid = self
            .content_match_at(from)
            .and_then(|m| m.match_fragment(replacement, start, end))
            .and_then(|m| m.match_fragment(&self.0.content, to, self.child_count()))
            .map(|m| m.valid_end())
            .unwrap_or(false);
        valid
            && (start..end.min(replacement.child_count()))
                .all(|i| self.0.ty.allows_marks(replacement.child(i).marks()))
    }

    /// Test whether children `from..to` can be replaced by one node of `ty`.
    pub fn can_replace_with(&self, from: usize, to: usize, ty: &NodeType, marks: Option<&[Mark]>) -> bool {
        if let Some(marks) = marks {
            if !self.0.ty.allows_marks(marks) {
                return false;
            }
        }
        self.content_match_at(from)
            .and_then(|m| m.match_type(ty))
            .and_then(|m| m.match_fragment(&self.0.content, to, self.child_count()))
            .map(|m| m.valid_end())
            .unwrap_or(false)
    }

    /// Test whether `other`'s content could be appended to this node.
    pub fn can_append(&self, other: &Node) -> bool {
        if other.content().size() > 0 {
            let n = self.child_count();
            self.can_replace(n, n, other.content(), 0, other.child_count())
        } else {
            self.0.ty.compatible_content(other.node_type())
        }
    }

    /// Check the content and marks of this node and all descendants.
    pub fn check(&self) -> ModelResult<()> {
        self.0.ty.check_content(&self.0.content)?;
        let mut normalized: Vec<Mark> = Vec::new();
        for mark in &self.0.marks {
            normalized = mark.add_to_set(&normalized);
        }
        if !Mark::same_set(&normalized, &self.0.marks) {
            return Err(ModelError::InvalidMark {
                node_type: self.0.ty.name().to_string(),
                mark: self
                    .0
                    .marks
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        for child in self.0.content.iter() {
            child.check()?;
        }
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.0.text == other.0.text
                && self.same_markup(other)
                && self.0.content == other.0.content)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = match self.text() {
            Some(text) => format!("{:?}", text),
            None if self.0.content.size() > 0 => {
                format!("{}({})", self.0.ty.name(), self.0.content.to_string_inner())
            }
            None => self.0.ty.name().to_string(),
        };
        for mark in self.0.marks.iter().rev() {
            out = format!("{}({})", mark.mark_type().name(), out);
        }
        f.write_str(&out)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
