//! # Transform
//!
//! A [`Transform`] applies a sequence of steps to a document, keeping every
//! intermediate document, the inverse of every step and a [`Mapping`] that
//! carries positions from the starting document to the current one.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut tr = Transform::new(doc);
//! tr.insert_text("hi", 1, None)?.delete(5, 7)?;
//! assert!(tr.doc_changed());
//! let after = tr.doc();
//! ```
//!
//! The helpers here and in the structure and mark modules build the right
//! steps for common edits. A helper either applies all of its steps or
//! fails with the first step that did not fit.

use crate::error::{StepFailure, TransformResult};
use crate::map::{Mapping, StepMap};
use crate::step::Step;
use folio_model::{Fragment, Node, Slice};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Transform {
    doc: Node,
    docs: Vec<Node>,
    steps: Vec<Step>,
    inverted: Vec<Step>,
    mapping: Mapping,
}

impl Transform {
    pub fn new(doc: Node) -> Self {
        Transform {
            doc,
            docs: Vec::new(),
            steps: Vec::new(),
            inverted: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    /// The current document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document the transform started from.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The document before each step.
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    /// The inverse of each step, by index.
    pub fn inverted(&self) -> &[Step] {
        &self.inverted
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply a step, failing if it does not fit the current document.
    pub fn step(&mut self, step: Step) -> TransformResult<&mut Self> {
        self.maybe_step(step)?;
        Ok(self)
    }

    /// Try to apply a step. On failure the transform is left unchanged.
    pub fn maybe_step(&mut self, step: Step) -> Result<(), StepFailure> {
        let output = step.apply(&self.doc)?;
        let inverse = step.invert(&self.doc)?;
        debug!(step = %step, "applied step");
        self.add_step(step, inverse, output.doc, output.map);
        Ok(())
    }

    fn add_step(&mut self, step: Step, inverse: Step, doc: Node, map: StepMap) {
        let before = std::mem::replace(&mut self.doc, doc);
        self.docs.push(before);
        self.steps.push(step);
        self.inverted.push(inverse);
        self.mapping.append_map(map, None);
    }

    /// Replace `from..to` with a slice. A no-op replacement adds no step.
    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> TransformResult<&mut Self> {
        if from == to && slice.size() == 0 {
            return Ok(self);
        }
        self.step(Step::replace(from, to, slice))
    }

    /// Replace `from..to` with closed content.
    pub fn replace_with(&mut self, from: usize, to: usize, content: impl Into<Fragment>) -> TransformResult<&mut Self> {
        self.replace(from, to, Slice::new(content.into(), 0, 0))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> TransformResult<&mut Self> {
        self.replace(from, to, Slice::empty())
    }

    pub fn insert(&mut self, pos: usize, content: impl Into<Fragment>) -> TransformResult<&mut Self> {
        self.replace_with(pos, pos, content)
    }

    /// Insert text at `from`, replacing `from..to` when `to` is given. The
    /// text takes the marks found at `from`. Empty text deletes the range.
    pub fn insert_text(&mut self, text: &str, from: usize, to: Option<usize>) -> TransformResult<&mut Self> {
        let to = to.unwrap_or(from);
        if text.is_empty() {
            return self.delete(from, to);
        }
        let marks = self.doc.resolve(from)?.marks();
        let node = self.doc.node_type().schema().text(text, &marks)?;
        self.replace_with(from, to, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Mappable;
    use folio_schema_basic::builders::br;
    use folio_schema_basic::{doc, em, p};

    #[test]
    fn test_hard_break_insert_and_invert() {
        let d = doc![p!["fo<a>o"]];
        let mut tr = Transform::new(d.doc.clone());
        tr.insert(d.tag("a"), br()).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("fo", hard_break, "o"))"#);
        assert_eq!(tr.before(), &d.doc);

        let undo = tr.inverted()[0].apply(tr.doc()).unwrap();
        assert_eq!(undo.doc, d.doc);
    }

    #[test]
    fn test_insert_text_takes_marks() {
        let d = doc![p![em!["ab<a>"], "cd"]];
        let mut tr = Transform::new(d.doc.clone());
        tr.insert_text("x", d.tag("a"), None).unwrap();
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph(em("abx"), "cd"))"#);
    }

    #[test]
    fn test_mapping_follows_steps() {
        let d = doc![p!["hello"]];
        let mut tr = Transform::new(d.doc.clone());
        tr.insert_text("xx", 1, None).unwrap().delete(4, 6).unwrap();
        assert_eq!(tr.steps().len(), 2);
        assert_eq!(tr.docs().len(), 2);
        assert_eq!(tr.doc().to_string(), r#"doc(paragraph("xxhlo"))"#);
        assert_eq!(tr.mapping().map(6, 1), 6);
        assert_eq!(tr.mapping().map(2, -1), 4);
    }

    #[test]
    fn test_failed_step_leaves_transform_unchanged() {
        let d = doc![p!["hello"]];
        let mut tr = Transform::new(d.doc.clone());
        let result = tr.delete(3, 30);
        assert!(result.is_err());
        assert!(!tr.doc_changed());
        assert_eq!(tr.doc(), &d.doc);
    }

    #[test]
    fn test_empty_replace_is_noop() {
        let d = doc![p!["hello"]];
        let mut tr = Transform::new(d.doc.clone());
        tr.delete(2, 2).unwrap().insert_text("", 3, None).unwrap();
        assert!(!tr.doc_changed());
    }
}
