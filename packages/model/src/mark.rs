//! Marks: inline annotations such as emphasis or links.
//!
//! A node's marks form a *mark set*: sorted by [`MarkType::rank`], with no
//! two marks that exclude each other.

use crate::schema::{Attrs, MarkType};
use serde_json::Value;
use std::fmt;

#[derive(Clone)]
pub struct Mark {
    ty: MarkType,
    attrs: Attrs,
}

impl Mark {
    pub(crate) fn new(ty: MarkType, attrs: Attrs) -> Self {
        Mark { ty, attrs }
    }

    pub fn mark_type(&self) -> &MarkType {
        &self.ty
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Add this mark to a set, replacing marks it excludes. Returns the set
    /// unchanged if it already holds this mark or a mark that excludes it.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        for other in set {
            if other == self {
                return set.to_vec();
            }
            if !self.ty.excludes(&other.ty) && other.ty.excludes(&self.ty) {
                return set.to_vec();
            }
        }
        let mut out: Vec<Mark> = set
            .iter()
            .filter(|other| !self.ty.excludes(&other.ty))
            .cloned()
            .collect();
        let at = out
            .iter()
            .position(|other| other.ty.rank() > self.ty.rank())
            .unwrap_or(out.len());
        out.insert(at, self.clone());
        out
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|other| *other != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|other| other == self)
    }

    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
    }

    /// Normalize a list of marks into a sorted set.
    pub fn set_from(marks: &[Mark]) -> Vec<Mark> {
        let mut set = marks.to_vec();
        set.sort_by_key(|m| m.ty.rank());
        set.dedup();
        set
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.attrs == other.attrs
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ty.name())
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            write!(f, "{}", self.ty.name())
        } else {
            write!(f, "{}({})", self.ty.name(), Value::from(serde_json::Map::from_iter(self.attrs.clone())))
        }
    }
}
