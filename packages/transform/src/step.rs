//! # Steps
//!
//! A [`Step`] is one atomic, invertible document change. Steps are a closed
//! set, dispatched by `match` like any other document operation:
//!
//! - [`Step::Replace`]: replace a range with a slice
//! - [`Step::ReplaceAround`]: replace a range, keeping a gap inside it
//! - [`Step::AddMark`] / [`Step::RemoveMark`]: change marks on inline content
//!
//! Applying a step either yields the new document and the position map of
//! the change, or a [`StepFailure`]. Failures are ordinary: a rebased or
//! undone step may simply not fit the document any more.
//!
//! Steps serialize to JSON with a `stepType` tag:
//!
//! ```json
//! {"stepType": "replace", "from": 1, "to": 3, "slice": {"content": [{"type": "text", "text": "x"}]}}
//! {"stepType": "addMark", "from": 1, "to": 3, "mark": {"type": "em"}}
//! ```

use crate::error::StepFailure;
use crate::map::{Mappable, StepMap};
use crate::mark_step::{AddMarkStep, MarkInverse, RemoveMarkStep};
use crate::replace_step::{ReplaceAroundStep, ReplaceStep};
use folio_model::{Mark, MarkJson, ModelError, ModelResult, Node, Schema, Slice, SliceJson};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Replace(ReplaceStep),
    ReplaceAround(ReplaceAroundStep),
    AddMark(AddMarkStep),
    RemoveMark(RemoveMarkStep),
}

/// The result of applying a step.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub doc: Node,
    pub map: StepMap,
}

impl Step {
    pub fn replace(from: usize, to: usize, slice: Slice) -> Step {
        Step::Replace(ReplaceStep::new(from, to, slice))
    }

    pub fn add_mark(from: usize, to: usize, mark: Mark) -> Step {
        Step::AddMark(AddMarkStep::new(from, to, mark))
    }

    pub fn remove_mark(from: usize, to: usize, mark: Mark) -> Step {
        Step::RemoveMark(RemoveMarkStep::new(from, to, mark))
    }

    /// Short name for logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Replace(_) => "replace",
            Step::ReplaceAround(_) => "replaceAround",
            Step::AddMark(_) => "addMark",
            Step::RemoveMark(_) => "removeMark",
        }
    }

    pub fn from(&self) -> usize {
        match self {
            Step::Replace(s) => s.from,
            Step::ReplaceAround(s) => s.from,
            Step::AddMark(s) => s.from,
            Step::RemoveMark(s) => s.from,
        }
    }

    pub fn to(&self) -> usize {
        match self {
            Step::Replace(s) => s.to,
            Step::ReplaceAround(s) => s.to,
            Step::AddMark(s) => s.to,
            Step::RemoveMark(s) => s.to,
        }
    }

    pub fn apply(&self, doc: &Node) -> Result<StepOutput, StepFailure> {
        let result = match self {
            Step::Replace(s) => s.apply(doc),
            Step::ReplaceAround(s) => s.apply(doc),
            Step::AddMark(s) => s.apply(doc),
            Step::RemoveMark(s) => s.apply(doc),
        };
        match result {
            Ok(doc) => Ok(StepOutput {
                doc,
                map: self.get_map(),
            }),
            Err(failure) => {
                debug!(step = %self, reason = %failure, "step failed");
                Err(failure)
            }
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(s) => s.get_map(),
            Step::ReplaceAround(s) => s.get_map(),
            Step::AddMark(_) | Step::RemoveMark(_) => StepMap::empty(),
        }
    }

    /// The step that undoes this one. `doc` must be the document this step
    /// was applied to.
    pub fn invert(&self, doc: &Node) -> Result<Step, StepFailure> {
        Ok(match self {
            Step::Replace(s) => Step::Replace(s.invert(doc)?),
            Step::ReplaceAround(s) => Step::ReplaceAround(s.invert(doc)?),
            Step::AddMark(s) => mark_inverse(s.invert(doc)?),
            Step::RemoveMark(s) => mark_inverse(s.invert(doc)?),
        })
    }

    /// Map this step through a mapping. Returns `None` when the content the
    /// step applied to was deleted.
    pub fn map(&self, mapping: &dyn Mappable) -> Option<Step> {
        match self {
            Step::Replace(s) => s.map(mapping).map(Step::Replace),
            Step::ReplaceAround(s) => s.map(mapping).map(Step::ReplaceAround),
            Step::AddMark(s) => s.map(mapping).map(Step::AddMark),
            Step::RemoveMark(s) => s.map(mapping).map(Step::RemoveMark),
        }
    }

    /// Combine this step with one applied directly after it, when the pair
    /// can be expressed as a single step.
    pub fn merge(&self, other: &Step) -> Option<Step> {
        match (self, other) {
            (Step::Replace(a), Step::Replace(b)) => a.merge(b).map(Step::Replace),
            (Step::AddMark(a), Step::AddMark(b)) => a.merge(b).map(Step::AddMark),
            (Step::RemoveMark(a), Step::RemoveMark(b)) => a.merge(b).map(Step::RemoveMark),
            _ => None,
        }
    }

    pub fn to_json(&self) -> StepJson {
        match self {
            Step::Replace(s) => StepJson::Replace {
                from: s.from,
                to: s.to,
                slice: s.slice.to_json(),
                structure: s.structure,
            },
            Step::ReplaceAround(s) => StepJson::ReplaceAround {
                from: s.from,
                to: s.to,
                gap_from: s.gap_from,
                gap_to: s.gap_to,
                insert: s.insert,
                slice: s.slice.to_json(),
                structure: s.structure,
            },
            Step::AddMark(s) => StepJson::AddMark {
                from: s.from,
                to: s.to,
                mark: s.mark.to_json(),
            },
            Step::RemoveMark(s) => StepJson::RemoveMark {
                from: s.from,
                to: s.to,
                mark: s.mark.to_json(),
            },
        }
    }

    pub fn from_json(schema: &Schema, json: &StepJson) -> ModelResult<Step> {
        let invalid = |what: &str| ModelError::InvalidJson(format!("Invalid input for {}", what));
        match json {
            StepJson::Replace {
                from,
                to,
                slice,
                structure,
            } => {
                if from > to {
                    return Err(invalid("ReplaceStep"));
                }
                Ok(Step::Replace(ReplaceStep {
                    from: *from,
                    to: *to,
                    slice: Slice::from_json(schema, slice)?,
                    structure: *structure,
                }))
            }
            StepJson::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                insert,
                slice,
                structure,
            } => {
                if !(from <= gap_from && gap_from <= gap_to && gap_to <= to) {
                    return Err(invalid("ReplaceAroundStep"));
                }
                let slice = Slice::from_json(schema, slice)?;
                if *insert > slice.size() {
                    return Err(invalid("ReplaceAroundStep"));
                }
                Ok(Step::ReplaceAround(ReplaceAroundStep {
                    from: *from,
                    to: *to,
                    gap_from: *gap_from,
                    gap_to: *gap_to,
                    slice,
                    insert: *insert,
                    structure: *structure,
                }))
            }
            StepJson::AddMark { from, to, mark } => {
                if from > to {
                    return Err(invalid("AddMarkStep"));
                }
                Ok(Step::add_mark(*from, *to, Mark::from_json(schema, mark)?))
            }
            StepJson::RemoveMark { from, to, mark } => {
                if from > to {
                    return Err(invalid("RemoveMarkStep"));
                }
                Ok(Step::remove_mark(*from, *to, Mark::from_json(schema, mark)?))
            }
        }
    }

    pub fn from_json_str(schema: &Schema, source: &str) -> ModelResult<Step> {
        let json: StepJson = serde_json::from_str(source)?;
        Step::from_json(schema, &json)
    }
}

fn mark_inverse(inverse: MarkInverse) -> Step {
    match inverse {
        MarkInverse::Add(s) => Step::AddMark(s),
        MarkInverse::Remove(s) => Step::RemoveMark(s),
        MarkInverse::Restore(s) => Step::Replace(s),
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Replace(s) => write!(f, "replace({}..{}, {})", s.from, s.to, s.slice),
            Step::ReplaceAround(s) => write!(
                f,
                "replaceAround({}..{}, gap {}..{}, {} @{})",
                s.from, s.to, s.gap_from, s.gap_to, s.slice, s.insert
            ),
            Step::AddMark(s) => write!(f, "addMark({}..{}, {})", s.from, s.to, s.mark),
            Step::RemoveMark(s) => write!(f, "removeMark({}..{}, {})", s.from, s.to, s.mark),
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn slice_is_empty(slice: &SliceJson) -> bool {
    slice.content.is_empty()
}

/// The JSON form of a [`Step`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
pub enum StepJson {
    Replace {
        from: usize,
        to: usize,
        #[serde(default, skip_serializing_if = "slice_is_empty")]
        slice: SliceJson,
        #[serde(default, skip_serializing_if = "is_false")]
        structure: bool,
    },
    #[serde(rename_all = "camelCase")]
    ReplaceAround {
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        insert: usize,
        #[serde(default, skip_serializing_if = "slice_is_empty")]
        slice: SliceJson,
        #[serde(default, skip_serializing_if = "is_false")]
        structure: bool,
    },
    AddMark {
        from: usize,
        to: usize,
        mark: MarkJson,
    },
    RemoveMark {
        from: usize,
        to: usize,
        mark: MarkJson,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::Fragment;
    use folio_schema_basic::builders::br;
    use folio_schema_basic::{doc, em, p, schema};

    #[test]
    fn test_json_shape() {
        let step = Step::replace(2, 2, Slice::new(Fragment::from(br()), 0, 0));
        let json = serde_json::to_value(step.to_json()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "stepType": "replace",
                "from": 2,
                "to": 2,
                "slice": {"content": [{"type": "hard_break"}]}
            })
        );
        let back = Step::from_json(&schema(), &serde_json::from_value(json).unwrap()).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_json_mark_and_around() {
        let s = schema();
        let source = r#"{"stepType":"replaceAround","from":0,"to":10,"gapFrom":0,"gapTo":10,"insert":1,
            "slice":{"content":[{"type":"blockquote"}]},"structure":true}"#;
        let step = Step::from_json_str(&s, source).unwrap();
        match &step {
            Step::ReplaceAround(s) => assert!(s.structure && s.insert == 1 && s.gap_to == 10),
            other => panic!("unexpected {}", other),
        }
        let mark = Step::from_json_str(&s, r#"{"stepType":"addMark","from":1,"to":3,"mark":{"type":"em"}}"#).unwrap();
        assert_eq!(mark.name(), "addMark");
        assert_eq!(mark.to_string(), "addMark(1..3, em)");
    }

    #[test]
    fn test_json_rejects_bad_ranges() {
        let s = schema();
        assert!(Step::from_json_str(&s, r#"{"stepType":"replace","from":4,"to":2}"#).is_err());
        assert!(Step::from_json_str(&s, r#"{"stepType":"bogus","from":1,"to":2}"#).is_err());
        assert!(Step::from_json_str(&s, r#"{"stepType":"addMark","from":1,"to":3,"mark":{"type":"nope"}}"#).is_err());
    }

    #[test]
    fn test_invert_round_trip_for_each_kind() {
        let d = doc![p!["hello ", em!["world"]], p!["two"]];
        let s = schema();
        let em_mark = s.mark("em", None).unwrap();
        let quote = s.node_type("blockquote").unwrap().create(None, Fragment::empty(), &[]).unwrap();
        let steps = vec![
            Step::replace(3, 8, Slice::empty()),
            Step::replace(4, 15, d.slice(15, 17, false).unwrap()),
            Step::ReplaceAround(ReplaceAroundStep {
                from: 0,
                to: 18,
                gap_from: 0,
                gap_to: 18,
                slice: Slice::new(Fragment::from(quote), 0, 0),
                insert: 1,
                structure: true,
            }),
            Step::add_mark(1, 4, em_mark.clone()),
            Step::add_mark(3, 10, em_mark.clone()),
            Step::remove_mark(5, 13, em_mark.clone()),
        ];
        for step in steps {
            let out = step.apply(&d).unwrap();
            let inverse = step.invert(&d).unwrap();
            let back = inverse.apply(&out.doc).unwrap();
            assert_eq!(back.doc, *d, "inverting {}", step);
        }
    }

    #[test]
    fn test_mark_steps_have_empty_maps() {
        let em_mark = schema().mark("em", None).unwrap();
        assert_eq!(Step::add_mark(1, 4, em_mark).get_map(), StepMap::empty());
    }
}
