//! Error types for the document model

use thiserror::Error;

/// Raised while compiling a [`SchemaSpec`](crate::SchemaSpec) into a [`Schema`](crate::Schema).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Schema is missing a text node type")]
    MissingTextType,

    #[error("Duplicate {kind} type name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Text node type should not have attributes")]
    TextWithAttributes,

    #[error("Unknown top node type: {0}")]
    UnknownTopNode(String),

    #[error("Invalid content expression '{expr}': {message}")]
    ContentExpression { expr: String, message: String },

    #[error("Unknown mark type or group '{name}' referenced by {owner}")]
    UnknownMark { name: String, owner: String },
}

/// Raised when [`Node::replace`](crate::Node::replace) cannot fit a slice into a range.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ReplaceError(pub String);

impl ReplaceError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        ReplaceError(message.into())
    }
}

/// Structural errors of the document model.
///
/// These always indicate a caller defect and are never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid content for node {node_type}: {content}")]
    InvalidContent { node_type: String, content: String },

    #[error("Invalid mark {mark} in {node_type}")]
    InvalidMark { node_type: String, mark: String },

    #[error("Position {pos} out of range (document size {size})")]
    OutOfRange { pos: usize, size: usize },

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("No value supplied for attribute {attr} of {type_name}")]
    MissingAttribute { type_name: String, attr: String },

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("No node at position {0}")]
    NoNodeAt(usize),

    #[error("Replace error: {0}")]
    Replace(#[from] ReplaceError),
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::InvalidJson(e.to_string())
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
