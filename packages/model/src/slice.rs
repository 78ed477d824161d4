//! Slices: fragments cut out of a document, with open sides.

use crate::error::ReplaceError;
use crate::Fragment;
use std::fmt;

/// A piece of a document. `open_start` and `open_end` give the depth at
/// which each side is cut open, so nodes on those sides can be joined with
/// their surroundings when the slice is inserted.
#[derive(Clone, PartialEq, Default)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Slice {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Self {
        Slice::default()
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Size the slice adds when inserted.
    pub fn size(&self) -> usize {
        self.content
            .size()
            .saturating_sub(self.open_start + self.open_end)
    }

    /// Create a slice open as deep as the fragment allows on both sides.
    /// Isolating nodes stop the descent unless `open_isolating` is set.
    pub fn max_open(fragment: Fragment, open_isolating: bool) -> Slice {
        let can_open = |n: &crate::Node| !n.is_leaf() && (open_isolating || !n.node_type().spec().isolating);
        let mut open_start = 0;
        let mut node = fragment.first_child().cloned();
        while let Some(n) = node.filter(|n| can_open(n)) {
            open_start += 1;
            node = n.first_child().cloned();
        }
        let mut open_end = 0;
        let mut node = fragment.last_child().cloned();
        while let Some(n) = node.filter(|n| can_open(n)) {
            open_end += 1;
            node = n.last_child().cloned();
        }
        Slice::new(fragment, open_start, open_end)
    }

    /// Insert `fragment` at `pos` (relative to the slice's start), or `None`
    /// when the position is not on a node boundary inside the slice.
    pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Option<Slice> {
        insert_into(&self.content, pos + self.open_start, fragment)
            .map(|content| Slice::new(content, self.open_start, self.open_end))
    }

    /// Remove the flat range `from..to` from the slice.
    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, ReplaceError> {
        let content = remove_range(&self.content, from + self.open_start, to + self.open_start)?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, ReplaceError> {
    let non_flat = || ReplaceError::new("Removing non-flat range");
    let (index, offset) = content.find_index(from, false).map_err(|_| non_flat())?;
    let (index_to, offset_to) = content.find_index(to, false).map_err(|_| non_flat())?;
    let child = content.maybe_child(index);
    if offset == from || child.map(|c| c.is_text()).unwrap_or(false) {
        if offset_to != to && !content.maybe_child(index_to).map(|c| c.is_text()).unwrap_or(false) {
            return Err(non_flat());
        }
        return Ok(content.cut(0, from).append(&content.cut(to, content.size())));
    }
    let child = child.ok_or_else(non_flat)?;
    if index != index_to {
        return Err(non_flat());
    }
    let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
    Ok(content.replace_child(index, child.copy(inner)))
}

fn insert_into(content: &Fragment, dist: usize, insert: &Fragment) -> Option<Fragment> {
    let (index, offset) = content.find_index(dist, false).ok()?;
    let child = content.maybe_child(index);
    if offset == dist || child.map(|c| c.is_text()).unwrap_or(false) {
        return Some(
            content
                .cut(0, dist)
                .append(insert)
                .append(&content.cut(dist, content.size())),
        );
    }
    let child = child?;
    let inner = insert_into(child.content(), dist - offset - 1, insert)?;
    Some(content.replace_child(index, child.copy(inner)))
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.content, self.open_start, self.open_end)
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
