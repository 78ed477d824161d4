//! Mark helpers on [`Transform`].

use crate::error::TransformResult;
use crate::mark_step::{AddMarkStep, RemoveMarkStep};
use crate::replace_step::ReplaceStep;
use crate::step::Step;
use crate::transform::Transform;
use folio_model::{ContentMatch, Fragment, Mark, MarkType, NodeType, Slice};

/// Which marks [`Transform::remove_mark`] removes.
#[derive(Debug, Clone)]
pub enum MarkSelector {
    /// Every mark.
    All,
    /// Every mark of this type, whatever its attributes.
    Type(MarkType),
    /// This exact mark.
    Mark(Mark),
}

struct Matched {
    mark: Mark,
    from: usize,
    to: usize,
    step: usize,
}

impl Transform {
    /// Add `mark` to the inline content of `from..to`. Marks it excludes
    /// are removed first.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: &Mark) -> TransformResult<&mut Self> {
        let mut removed: Vec<RemoveMarkStep> = Vec::new();
        let mut added: Vec<AddMarkStep> = Vec::new();
        self.doc().nodes_between(from, to, &mut |node, pos, parent, _| {
            if !node.is_inline() {
                return true;
            }
            let allowed = parent
                .map(|p| p.node_type().allows_mark_type(mark.mark_type()))
                .unwrap_or(false);
            if mark.is_in_set(node.marks()) || !allowed {
                return true;
            }
            let start = pos.max(from);
            let end = (pos + node.node_size()).min(to);
            let new_set = mark.add_to_set(node.marks());
            for old in node.marks() {
                if old.is_in_set(&new_set) {
                    continue;
                }
                match removed.last_mut() {
                    Some(last) if last.to == start && last.mark == *old => last.to = end,
                    _ => removed.push(RemoveMarkStep::new(start, end, old.clone())),
                }
            }
            match added.last_mut() {
                Some(last) if last.to == start => last.to = end,
                _ => added.push(AddMarkStep::new(start, end, mark.clone())),
            }
            true
        });
        for step in removed {
            self.step(Step::RemoveMark(step))?;
        }
        for step in added {
            self.step(Step::AddMark(step))?;
        }
        Ok(self)
    }

    /// Remove marks matching `selector` from the inline content of `from..to`.
    pub fn remove_mark(&mut self, from: usize, to: usize, selector: &MarkSelector) -> TransformResult<&mut Self> {
        let mut matched: Vec<Matched> = Vec::new();
        let mut step = 0;
        self.doc().nodes_between(from, to, &mut |node, pos, _, _| {
            if !node.is_inline() {
                return true;
            }
            step += 1;
            let to_remove: Vec<Mark> = match selector {
                MarkSelector::All => node.marks().to_vec(),
                MarkSelector::Type(ty) => node
                    .marks()
                    .iter()
                    .filter(|m| m.mark_type() == ty)
                    .cloned()
                    .collect(),
                MarkSelector::Mark(mark) if mark.is_in_set(node.marks()) => vec![mark.clone()],
                MarkSelector::Mark(_) => Vec::new(),
            };
            let end = (pos + node.node_size()).min(to);
            for mark in to_remove {
                let found = matched
                    .iter_mut()
                    .find(|m| m.step + 1 == step && m.mark == mark);
                match found {
                    Some(m) => {
                        m.to = end;
                        m.step = step;
                    }
                    None => matched.push(Matched {
                        mark,
                        from: pos.max(from),
                        to: end,
                        step,
                    }),
                }
            }
            true
        });
        for m in matched {
            self.step(Step::RemoveMark(RemoveMarkStep::new(m.from, m.to, m.mark)))?;
        }
        Ok(self)
    }

    /// Make the content of the node at `pos` valid for `parent_type`:
    /// children it does not accept are deleted, marks it does not allow are
    /// removed, and missing required content is appended. Newlines in text
    /// become spaces unless the new parent holds code.
    pub fn clear_incompatible(
        &mut self,
        pos: usize,
        parent_type: &NodeType,
        start_match: Option<ContentMatch>,
    ) -> TransformResult<&mut Self> {
        let node = self
            .doc()
            .node_at(pos)
            .ok_or(folio_model::ModelError::NoNodeAt(pos))?;
        let mut matched = start_match.unwrap_or_else(|| parent_type.content_match());
        let mut replacements: Vec<ReplaceStep> = Vec::new();
        let mut cur = pos + 1;
        for child in node.content().iter() {
            let end = cur + child.node_size();
            match matched.match_type(child.node_type()) {
                None => replacements.push(ReplaceStep::new(cur, end, Slice::empty())),
                Some(next) => {
                    matched = next;
                    for mark in child.marks() {
                        if !parent_type.allows_mark_type(mark.mark_type()) {
                            self.step(Step::RemoveMark(RemoveMarkStep::new(cur, end, mark.clone())))?;
                        }
                    }
                    if let Some(text) = child.text() {
                        if !parent_type.spec().code {
                            let space = parent_type
                                .schema()
                                .text(" ", &parent_type.allowed_marks(child.marks()))?;
                            for (offset, _) in text.chars().enumerate().filter(|(_, c)| *c == '\n') {
                                replacements.push(ReplaceStep::new(
                                    cur + offset,
                                    cur + offset + 1,
                                    Slice::new(Fragment::from(space.clone()), 0, 0),
                                ));
                            }
                        }
                    }
                }
            }
            cur = end;
        }
        if !matched.valid_end() {
            if let Some(fill) = matched.fill_before(&Fragment::empty(), true, 0) {
                self.replace(cur, cur, Slice::new(fill, 0, 0))?;
            }
        }
        for step in replacements.into_iter().rev() {
            self.step(Step::Replace(step))?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::Attrs;
    use folio_schema_basic::builders::br;
    use folio_schema_basic::{a, doc, em, p, pre, schema, strong};

    fn mark(name: &str) -> Mark {
        schema().mark(name, None).unwrap()
    }

    #[test]
    fn test_add_mark_across_blocks() {
        let d = doc![p!["he<a>llo"], p!["wo<b>rld"]];
        let mut tr = Transform::new(d.doc.clone());
        tr.add_mark(d.tag("a"), d.tag("b"), &mark("strong")).unwrap();
        assert_eq!(
            tr.doc().to_string(),
            r#"doc(paragraph("he", strong("llo")), paragraph(strong("wo"), "rld"))"#
        );
        assert_eq!(tr.steps().len(), 2);
    }

    #[test]
    fn test_add_mark_skips_existing() {
        let d = doc![p!["<a>a", em!["b"], "c<b>"]];
        let mut tr = Transform::new(d.doc.clone());
        tr.add_mark(d.tag("a"), d.tag("b"), &mark("em")).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph(em("abc")))"#);
        assert_eq!(tr.steps().len(), 2);
    }

    #[test]
    fn test_add_link_replaces_excluded_link() {
        let d = doc![p![a!("x"; "<a>link<b>")]];
        let attrs: Attrs = [("href".to_string(), serde_json::json!("y"))].into_iter().collect();
        let link = schema().mark("link", Some(&attrs)).unwrap();
        let mut tr = Transform::new(d.doc.clone());
        tr.add_mark(d.tag("a"), d.tag("b"), &link).unwrap();
        let text = tr.doc().child(0).child(0).clone();
        assert_eq!(text.marks().len(), 1);
        assert_eq!(text.marks()[0].attr("href"), Some(&serde_json::json!("y")));
        let mut undo = Transform::new(tr.doc().clone());
        for inverse in tr.inverted().iter().rev() {
            undo.step(inverse.clone()).unwrap();
        }
        assert_eq!(undo.doc(), &d.doc);
    }

    #[test]
    fn test_remove_mark_by_type_and_all() {
        let d = doc![p![em!["<a>one ", strong!["two"]], " three<b>"]];
        let mut tr = Transform::new(d.doc.clone());
        tr.remove_mark(d.tag("a"), d.tag("b"), &MarkSelector::Type(schema().mark_type("em").unwrap()))
            .unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("one ", strong("two"), " three"))"#);
        assert_eq!(tr.steps().len(), 1);
        tr.remove_mark(d.tag("a"), d.tag("b"), &MarkSelector::All).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("one two three"))"#);
    }

    #[test]
    fn test_clear_incompatible_for_code() {
        let d = doc![p![em!["a"], br(), "b"]];
        let code = schema().node_type("code_block").unwrap();
        let mut tr = Transform::new(d.doc.clone());
        tr.clear_incompatible(0, &code, None).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("ab"))"#);
    }

    #[test]
    fn test_clear_incompatible_replaces_newlines() {
        let d = doc![pre!["a\nb"]];
        let para = schema().node_type("paragraph").unwrap();
        let mut tr = Transform::new(d.doc.clone());
        tr.clear_incompatible(0, &para, None).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(code_block("a b"))"#);
    }
}
