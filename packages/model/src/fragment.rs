//! Fragments: the ordered, immutable child lists of nodes.

use crate::error::{ModelError, ModelResult};
use crate::node::char_slice;
use crate::Node;
use std::fmt;
use std::sync::Arc;

/// An immutable sequence of nodes, with its size precomputed.
///
/// Adjacent text nodes with identical marks are always joined.
#[derive(Clone)]
pub struct Fragment {
    content: Arc<Vec<Node>>,
    size: usize,
}

impl Default for Fragment {
    fn default() -> Self {
        Fragment::empty()
    }
}

impl Fragment {
    pub fn empty() -> Self {
        Fragment {
            content: Arc::new(Vec::new()),
            size: 0,
        }
    }

    fn from_vec_unchecked(content: Vec<Node>, size: usize) -> Self {
        Fragment {
            content: Arc::new(content),
            size,
        }
    }

    /// Build a fragment, joining adjacent text nodes with the same marks.
    pub fn from_array(nodes: Vec<Node>) -> Self {
        let mut joined: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut size = 0;
        for node in nodes {
            size += node.node_size();
            if let Some(last) = joined.last_mut() {
                if node.is_text() && last.is_text() && last.same_markup(&node) {
                    let text = format!("{}{}", last.text_str(), node.text_str());
                    *last = last.with_text(text);
                    continue;
                }
            }
            joined.push(node);
        }
        Fragment::from_vec_unchecked(joined, size)
    }

    /// Total size of the content, in positions.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    /// The child at `index`. Panics when out of range, like slice indexing.
    pub fn child(&self, index: usize) -> &Node {
        &self.content[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.content.iter()
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.content.as_ref().clone()
    }

    pub fn ptr_eq(&self, other: &Fragment) -> bool {
        Arc::ptr_eq(&self.content, &other.content)
    }

    /// Call `f` for every node overlapping `from..to`, descending into a
    /// node's children only when `f` returns `true`. `f` receives the node,
    /// its absolute start (offset by `node_start`), its parent and its index.
    pub fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F, node_start: usize, parent: Option<&Node>)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        let mut pos = 0;
        for (i, child) in self.content.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, i) && child.content().size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    child.content().size().min(to.saturating_sub(start)),
                    f,
                    node_start + start,
                    Some(child),
                );
            }
            pos = end;
        }
    }

    /// Call `f` for every descendant.
    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    {
        self.nodes_between(0, self.size, f, 0, None)
    }

    /// The text between two positions. `block_separator` goes between
    /// textblocks, `leaf_text` stands in for non-text leaves.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&str>,
    ) -> String {
        let mut text = String::new();
        let mut first = true;
        self.nodes_between(
            from,
            to,
            &mut |node: &Node, pos: usize, _parent: Option<&Node>, _index: usize| {
                if let Some(t) = node.text() {
                    let start = from.saturating_sub(pos);
                    let end = to.saturating_sub(pos).min(node.node_size());
                    text.push_str(char_slice(t, start, end));
                    first = block_separator.is_none();
                } else if node.is_leaf() {
                    if let Some(leaf) = leaf_text {
                        text.push_str(leaf);
                    }
                    first = block_separator.is_none();
                } else if !first && node.is_block() {
                    if let Some(sep) = block_separator {
                        text.push_str(sep);
                    }
                    first = true;
                }
                true
            },
            0,
            None,
        );
        text
    }

    /// Concatenate two fragments, joining text at the seam.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.size == 0 {
            return self.clone();
        }
        if self.size == 0 {
            return other.clone();
        }
        let mut content = self.to_vec();
        let mut rest = other.iter();
        if let (Some(last), Some(first)) = (content.last_mut(), other.first_child()) {
            if last.is_text() && last.same_markup(first) {
                let text = format!("{}{}", last.text_str(), first.text_str());
                *last = last.with_text(text);
                rest.next();
            }
        }
        content.extend(rest.cloned());
        Fragment::from_vec_unchecked(content, self.size + other.size)
    }

    /// The part of the fragment between two positions.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        let mut size = 0;
        if to > from {
            let mut pos = 0;
            for child in self.content.iter() {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let child = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to.saturating_sub(pos + 1)).min(child.content().size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    size += child.node_size();
                    result.push(child);
                }
                pos = end;
            }
        }
        Fragment::from_vec_unchecked(result, size)
    }

    pub fn cut_by_index(&self, from: usize, to: usize) -> Fragment {
        if from == to {
            return Fragment::empty();
        }
        if from == 0 && to == self.content.len() {
            return self.clone();
        }
        Fragment::from_array(self.content[from..to].to_vec())
    }

    /// Replace the child at `index`.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let current = &self.content[index];
        if *current == node {
            return self.clone();
        }
        let size = self.size + node.node_size() - current.node_size();
        let mut content = self.to_vec();
        content[index] = node;
        Fragment::from_vec_unchecked(content, size)
    }

    pub fn add_to_start(&self, node: Node) -> Fragment {
        let size = self.size + node.node_size();
        let mut content = Vec::with_capacity(self.content.len() + 1);
        content.push(node);
        content.extend(self.iter().cloned());
        Fragment::from_vec_unchecked(content, size)
    }

    pub fn add_to_end(&self, node: Node) -> Fragment {
        let size = self.size + node.node_size();
        let mut content = self.to_vec();
        content.push(node);
        Fragment::from_vec_unchecked(content, size)
    }

    /// Find the child index and its start offset for a position. With
    /// `round_up`, a position between two children resolves to the later
    /// one's end side.
    pub fn find_index(&self, pos: usize, round_up: bool) -> ModelResult<(usize, usize)> {
        if pos == 0 {
            return Ok((0, 0));
        }
        if pos == self.size {
            return Ok((self.content.len(), pos));
        }
        if pos > self.size {
            return Err(ModelError::OutOfRange {
                pos,
                size: self.size,
            });
        }
        let mut cur = 0;
        for (i, child) in self.content.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos || round_up {
                    return Ok((i + 1, end));
                }
                return Ok((i, cur));
            }
            cur = end;
        }
        Err(ModelError::OutOfRange {
            pos,
            size: self.size,
        })
    }

    /// First position at which this fragment differs from `other`, or
    /// `None` if they are the same.
    pub fn find_diff_start(&self, other: &Fragment, pos: usize) -> Option<usize> {
        let mut pos = pos;
        let mut i = 0;
        loop {
            if i == self.child_count() || i == other.child_count() {
                return if self.child_count() == other.child_count() {
                    None
                } else {
                    Some(pos)
                };
            }
            let (a, b) = (self.child(i), other.child(i));
            i += 1;
            if a == b {
                pos += a.node_size();
                continue;
            }
            if !a.same_markup(b) {
                return Some(pos);
            }
            if let (Some(ta), Some(tb)) = (a.text(), b.text()) {
                if ta != tb {
                    let common = ta.chars().zip(tb.chars()).take_while(|(x, y)| x == y).count();
                    return Some(pos + common);
                }
            }
            if a.content().size() > 0 || b.content().size() > 0 {
                if let Some(inner) = a.content().find_diff_start(b.content(), pos + 1) {
                    return Some(inner);
                }
            }
            pos += a.node_size();
        }
    }

    /// Last positions (in this fragment and in `other`) at which the two
    /// differ, scanning from the end.
    pub fn find_diff_end(&self, other: &Fragment, pos_a: usize, pos_b: usize) -> Option<(usize, usize)> {
        let (mut pos_a, mut pos_b) = (pos_a, pos_b);
        let (mut ia, mut ib) = (self.child_count(), other.child_count());
        loop {
            if ia == 0 || ib == 0 {
                return if ia == ib { None } else { Some((pos_a, pos_b)) };
            }
            ia -= 1;
            ib -= 1;
            let (a, b) = (self.child(ia), other.child(ib));
            let size = a.node_size();
            if a == b {
                pos_a -= size;
                pos_b -= size;
                continue;
            }
            if !a.same_markup(b) {
                return Some((pos_a, pos_b));
            }
            if let (Some(ta), Some(tb)) = (a.text(), b.text()) {
                if ta != tb {
                    let same = ta
                        .chars()
                        .rev()
                        .zip(tb.chars().rev())
                        .take_while(|(x, y)| x == y)
                        .count();
                    return Some((pos_a - same, pos_b - same));
                }
            }
            if a.content().size() > 0 || b.content().size() > 0 {
                if let Some(inner) = a.content().find_diff_end(b.content(), pos_a - 1, pos_b - 1) {
                    return Some(inner);
                }
            }
            pos_a -= size;
            pos_b -= b.node_size();
        }
    }

    pub(crate) fn to_string_inner(&self) -> String {
        self.content
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.size == other.size && self.content == other.content)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.to_string_inner())
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        let size = node.node_size();
        Fragment::from_vec_unchecked(vec![node], size)
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_array(nodes)
    }
}

impl From<Option<Node>> for Fragment {
    fn from(node: Option<Node>) -> Self {
        node.map(Fragment::from).unwrap_or_default()
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
