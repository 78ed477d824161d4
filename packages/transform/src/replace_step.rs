//! Replace steps: plain range replacement and replacement around a gap.

use crate::error::StepFailure;
use crate::map::{MapRange, Mappable, StepMap};
use folio_model::{Node, Slice};

/// Replace `from..to` with a slice.
///
/// A `structure` step only moves node boundaries; it fails rather than
/// overwrite content, which keeps it safe to replay after rebasing.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceStep {
    pub from: usize,
    pub to: usize,
    pub slice: Slice,
    pub structure: bool,
}

impl ReplaceStep {
    pub fn new(from: usize, to: usize, slice: Slice) -> Self {
        ReplaceStep {
            from,
            to,
            slice,
            structure: false,
        }
    }

    pub fn structural(from: usize, to: usize, slice: Slice) -> Self {
        ReplaceStep {
            from,
            to,
            slice,
            structure: true,
        }
    }

    pub(crate) fn apply(&self, doc: &Node) -> Result<Node, StepFailure> {
        check_range(doc, &[self.from, self.to])?;
        if self.structure && content_between(doc, self.from, self.to)? {
            return Err(StepFailure::new("Structure replace would overwrite content"));
        }
        Ok(doc.replace(self.from, self.to, &self.slice)?)
    }

    pub(crate) fn get_map(&self) -> StepMap {
        StepMap::single(self.from, self.to.saturating_sub(self.from), self.slice.size())
    }

    pub(crate) fn invert(&self, doc: &Node) -> Result<ReplaceStep, StepFailure> {
        Ok(ReplaceStep::new(
            self.from,
            self.from + self.slice.size(),
            doc.slice(self.from, self.to, false)?,
        ))
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<ReplaceStep> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        if from.deleted_across() && to.deleted_across() {
            return None;
        }
        Some(ReplaceStep {
            from: from.pos,
            to: from.pos.max(to.pos),
            slice: self.slice.clone(),
            structure: self.structure,
        })
    }

    pub(crate) fn merge(&self, other: &ReplaceStep) -> Option<ReplaceStep> {
        if self.structure || other.structure {
            return None;
        }
        let both_empty = self.slice.size() + other.slice.size() == 0;
        if self.from + self.slice.size() == other.from
            && self.slice.open_end() == 0
            && other.slice.open_start() == 0
        {
            let slice = if both_empty {
                Slice::empty()
            } else {
                Slice::new(
                    self.slice.content().append(other.slice.content()),
                    self.slice.open_start(),
                    other.slice.open_end(),
                )
            };
            Some(ReplaceStep::new(self.from, self.to + (other.to - other.from), slice))
        } else if other.to == self.from && self.slice.open_start() == 0 && other.slice.open_end() == 0 {
            let slice = if both_empty {
                Slice::empty()
            } else {
                Slice::new(
                    other.slice.content().append(self.slice.content()),
                    other.slice.open_start(),
                    self.slice.open_end(),
                )
            };
            Some(ReplaceStep::new(other.from, self.to, slice))
        } else {
            None
        }
    }
}

/// Replace `from..to` with a slice while keeping `gap_from..gap_to`,
/// which is reinserted into the slice at offset `insert`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceAroundStep {
    pub from: usize,
    pub to: usize,
    pub gap_from: usize,
    pub gap_to: usize,
    pub slice: Slice,
    pub insert: usize,
    pub structure: bool,
}

impl ReplaceAroundStep {
    pub(crate) fn apply(&self, doc: &Node) -> Result<Node, StepFailure> {
        check_range(doc, &[self.from, self.gap_from, self.gap_to, self.to])?;
        if self.insert > self.slice.size() {
            return Err(StepFailure::new(format!(
                "Insert offset {} is outside the slice (size {})",
                self.insert,
                self.slice.size()
            )));
        }
        if self.structure
            && (content_between(doc, self.from, self.gap_from)? || content_between(doc, self.gap_to, self.to)?)
        {
            return Err(StepFailure::new("Structure gap-replace would overwrite content"));
        }
        let gap = doc.slice(self.gap_from, self.gap_to, false)?;
        if gap.open_start() > 0 || gap.open_end() > 0 {
            return Err(StepFailure::new("Gap is not a flat range"));
        }
        let inserted = self
            .slice
            .insert_at(self.insert, gap.content())
            .ok_or_else(|| StepFailure::new("Content does not fit in gap"))?;
        Ok(doc.replace(self.from, self.to, &inserted)?)
    }

    pub(crate) fn get_map(&self) -> StepMap {
        StepMap::new(vec![
            MapRange {
                start: self.from,
                old_size: self.gap_from.saturating_sub(self.from),
                new_size: self.insert,
            },
            MapRange {
                start: self.gap_to,
                old_size: self.to.saturating_sub(self.gap_to),
                new_size: self.slice.size().saturating_sub(self.insert),
            },
        ])
    }

    pub(crate) fn invert(&self, doc: &Node) -> Result<ReplaceAroundStep, StepFailure> {
        let gap = self.gap_to - self.gap_from;
        let removed = doc
            .slice(self.from, self.to, false)?
            .remove_between(self.gap_from - self.from, self.gap_to - self.from)?;
        Ok(ReplaceAroundStep {
            from: self.from,
            to: self.from + self.slice.size() + gap,
            gap_from: self.from + self.insert,
            gap_to: self.from + self.insert + gap,
            slice: removed,
            insert: self.gap_from - self.from,
            structure: self.structure,
        })
    }

    pub(crate) fn map(&self, mapping: &dyn Mappable) -> Option<ReplaceAroundStep> {
        let from = mapping.map_result(self.from, 1);
        let to = mapping.map_result(self.to, -1);
        let gap_from = if self.from == self.gap_from {
            from.pos
        } else {
            mapping.map(self.gap_from, -1)
        };
        let gap_to = if self.to == self.gap_to {
            to.pos
        } else {
            mapping.map(self.gap_to, 1)
        };
        if (from.deleted_across() && to.deleted_across()) || gap_from < from.pos || gap_to > to.pos {
            return None;
        }
        Some(ReplaceAroundStep {
            from: from.pos,
            to: to.pos,
            gap_from,
            gap_to,
            slice: self.slice.clone(),
            insert: self.insert,
            structure: self.structure,
        })
    }
}

/// Fail unless `positions` are ascending and inside the document.
fn check_range(doc: &Node, positions: &[usize]) -> Result<(), StepFailure> {
    if positions.windows(2).any(|w| w[0] > w[1]) {
        return Err(StepFailure::new(format!("Positions {:?} are out of order", positions)));
    }
    let size = doc.content().size();
    match positions.last() {
        Some(&end) if end > size => Err(StepFailure::new(format!(
            "Position {} is outside the document (size {})",
            end, size
        ))),
        _ => Ok(()),
    }
}

/// Whether `from..to` covers anything other than node boundaries.
fn content_between(doc: &Node, from: usize, to: usize) -> Result<bool, StepFailure> {
    let rfrom = doc.resolve(from)?;
    let mut dist = to.saturating_sub(from);
    let mut depth = rfrom.depth();
    while dist > 0 && depth > 0 && rfrom.index_after(depth) == rfrom.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rfrom.node(depth).maybe_child(rfrom.index_after(depth)).cloned();
        while dist > 0 {
            match next {
                Some(node) if !node.is_leaf() => {
                    next = node.first_child().cloned();
                    dist -= 1;
                }
                _ => return Ok(true),
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::Fragment;
    use folio_schema_basic::builders::br;
    use folio_schema_basic::{blockquote, doc, p, schema};

    #[test]
    fn test_structure_replace_refuses_content() {
        let d = doc![p!["ab"], p!["cd"]];
        let join = ReplaceStep::structural(3, 5, Slice::empty());
        let joined = join.apply(&d).unwrap();
        assert_eq!(joined.to_string(), r#"doc(paragraph("abcd"))"#);

        let overwrite = ReplaceStep::structural(2, 6, Slice::empty());
        assert!(overwrite.apply(&d).is_err());
    }

    #[test]
    fn test_invert_replace() {
        let d = doc![p!["hello"]];
        let step = ReplaceStep::new(2, 4, Slice::new(Fragment::from(br()), 0, 0));
        let changed = step.apply(&d).unwrap();
        assert_eq!(changed.to_string(), r#"doc(paragraph("h", hard_break, "lo"))"#);
        let back = step.invert(&d).unwrap().apply(&changed).unwrap();
        assert_eq!(back, *d);
    }

    #[test]
    fn test_merge_adjacent_typing() {
        let s = schema();
        let a = ReplaceStep::new(1, 1, Slice::new(Fragment::from(s.text("a", &[]).unwrap()), 0, 0));
        let b = ReplaceStep::new(2, 2, Slice::new(Fragment::from(s.text("b", &[]).unwrap()), 0, 0));
        let merged = a.merge(&b).unwrap();
        assert_eq!((merged.from, merged.to), (1, 1));
        assert_eq!(merged.slice.content().to_string(), r#"<"ab">"#);

        let far = ReplaceStep::new(5, 5, Slice::new(Fragment::from(s.text("c", &[]).unwrap()), 0, 0));
        assert!(a.merge(&far).is_none());
    }

    #[test]
    fn test_merge_backspaces() {
        let first = ReplaceStep::new(4, 5, Slice::empty());
        let second = ReplaceStep::new(3, 4, Slice::empty());
        let merged = first.merge(&second).unwrap();
        assert_eq!((merged.from, merged.to), (3, 5));
    }

    #[test]
    fn test_wrap_and_unwrap_around_gap() {
        let d = doc![p!["one"], p!["two"]];
        let s = schema();
        let quote = s
            .node_type("blockquote")
            .unwrap()
            .create(None, Fragment::empty(), &[])
            .unwrap();
        let wrap = ReplaceAroundStep {
            from: 0,
            to: 10,
            gap_from: 0,
            gap_to: 10,
            slice: Slice::new(Fragment::from(quote), 0, 0),
            insert: 1,
            structure: true,
        };
        let wrapped = wrap.apply(&d).unwrap();
        let expected = doc![blockquote![p!["one"], p!["two"]]];
        assert_eq!(wrapped, *expected);
        assert_eq!(wrap.get_map().map(5, 1), 6);

        let unwrap = wrap.invert(&d).unwrap();
        assert_eq!(unwrap.apply(&wrapped).unwrap(), *d);
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let d = doc![p!["abcdef"]];
        let reversed = ReplaceStep::new(5, 3, Slice::empty());
        assert!(reversed.apply(&d).is_err());
        let past_end = ReplaceStep::new(3, 40, Slice::empty());
        assert!(past_end.apply(&d).is_err());
    }

    #[test]
    fn test_around_step_with_gap_outside_range_is_rejected() {
        let d = doc![p!["one"], p!["two"]];
        let s = schema();
        let quote = s
            .node_type("blockquote")
            .unwrap()
            .create(None, Fragment::empty(), &[])
            .unwrap();
        let step = ReplaceAroundStep {
            from: 5,
            to: 10,
            gap_from: 0,
            gap_to: 10,
            slice: Slice::new(Fragment::from(quote.clone()), 0, 0),
            insert: 1,
            structure: true,
        };
        assert!(step.apply(&d).is_err());

        let bad_insert = ReplaceAroundStep {
            from: 0,
            gap_from: 0,
            insert: 3,
            slice: Slice::new(Fragment::from(quote), 0, 0),
            ..step
        };
        assert!(bad_insert.apply(&d).is_err());
    }

    #[test]
    fn test_map_drops_step_inside_deletion() {
        let step = ReplaceStep::new(3, 4, Slice::empty());
        let deletion = StepMap::single(2, 4, 0);
        assert!(step.map(&deletion).is_none());
        let shift = StepMap::single(0, 0, 2);
        let mapped = step.map(&shift).unwrap();
        assert_eq!((mapped.from, mapped.to), (5, 6));
    }
}
