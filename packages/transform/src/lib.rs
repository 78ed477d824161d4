//! # Folio Transform
//!
//! Steps, position mapping and transforms over `folio-model` documents.
//!
//! ## Design
//!
//! - **Steps are data**: every edit is a [`Step`] that can be applied,
//!   inverted, mapped through other edits and serialized to JSON
//! - **Maps follow steps**: applying a step yields a [`StepMap`], and a
//!   [`Mapping`] composes them so positions survive a series of edits
//! - **All or nothing**: a step that does not fit the document fails and
//!   leaves the [`Transform`] untouched
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut tr = Transform::new(doc.clone());
//! tr.add_mark(1, 4, &schema.mark("strong", None)?)?;
//! let undo = tr.inverted()[0].apply(tr.doc())?;
//! assert_eq!(undo.doc, doc);
//! ```

pub mod commands;
mod error;
mod map;
mod mark_step;
mod marks;
mod replace_step;
mod step;
mod structure;
mod transform;

pub use error::{StepFailure, TransformError, TransformResult};
pub use map::{MapRange, MapResult, Mappable, Mapping, StepMap};
pub use mark_step::{AddMarkStep, RemoveMarkStep};
pub use marks::MarkSelector;
pub use replace_step::{ReplaceAroundStep, ReplaceStep};
pub use step::{Step, StepJson, StepOutput};
pub use structure::{can_join, can_split, find_wrapping, join_point, lift_target, Wrapper};
pub use transform::Transform;
