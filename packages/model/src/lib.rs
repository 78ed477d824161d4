//! # Folio Model
//!
//! The document model: schemas, immutable node trees, positions and the
//! replace algorithm every edit is built on.
//!
//! ## Design
//!
//! - **Immutable**: nodes are never changed after construction; edits build
//!   new trees that share untouched subtrees with the old one
//! - **Validated**: a schema decides which content and marks each node
//!   type accepts, and checked constructors enforce it
//! - **Flat addressing**: every location is an integer position, resolved
//!   on demand into a [`ResolvedPos`]
//!
//! ## Example
//!
//! ```rust,ignore
//! let schema = Schema::new(spec)?;
//! let para = schema.node("paragraph", None, schema.text("hello", &[])?, &[])?;
//! let doc = schema.node("doc", None, para, &[])?;
//! let pos = doc.resolve(3)?;
//! assert_eq!(pos.parent().node_type().name(), "paragraph");
//! ```

mod content;
mod error;
mod fragment;
mod json;
mod mark;
mod node;
mod replace;
mod resolved_pos;
mod schema;
mod slice;

pub use content::ContentMatch;
pub use error::{ModelError, ModelResult, ReplaceError, SchemaError};
pub use fragment::Fragment;
pub use json::{MarkJson, NodeJson, SliceJson};
pub use mark::Mark;
pub use node::Node;
pub use resolved_pos::{NodeRange, ResolvedPos};
pub use schema::{AttributeSpec, Attrs, MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaSpec};
pub use slice::Slice;
