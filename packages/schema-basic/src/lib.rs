//! # Folio Basic Schema
//!
//! A reference schema covering common rich text: paragraphs, headings,
//! blockquotes, code blocks, rules, images, hard breaks and lists, with
//! emphasis, strong, code and link marks.
//!
//! The [`builders`] module adds macros that build documents in a compact
//! notation and record tagged positions, for tests:
//!
//! ```rust,ignore
//! use folio_schema_basic::{doc, p, em};
//!
//! let d = doc![p!["fo<a>o ", em!["bar"]]];
//! assert_eq!(d.tag("a"), 3);
//! ```

pub mod builders;

use folio_model::{AttributeSpec, MarkSpec, NodeSpec, Schema, SchemaSpec};
use std::sync::OnceLock;

/// The declarations of the basic schema, in rank order.
pub fn spec() -> SchemaSpec {
    SchemaSpec {
        nodes: vec![
            NodeSpec::new("doc").content("block+"),
            NodeSpec::new("paragraph").content("inline*").group("block"),
            NodeSpec::new("blockquote")
                .content("block+")
                .group("block")
                .defining(),
            NodeSpec::new("horizontal_rule").group("block"),
            NodeSpec::new("heading")
                .attr("level", AttributeSpec::with_default(1))
                .content("inline*")
                .group("block")
                .defining(),
            NodeSpec::new("code_block")
                .content("text*")
                .marks("")
                .group("block")
                .code()
                .defining(),
            NodeSpec::new("text").group("inline"),
            NodeSpec::new("image")
                .inline()
                .attr("src", AttributeSpec::required())
                .attr("alt", AttributeSpec::with_default(serde_json::Value::Null))
                .attr("title", AttributeSpec::with_default(serde_json::Value::Null))
                .group("inline"),
            NodeSpec::new("hard_break").inline().group("inline"),
            NodeSpec::new("ordered_list")
                .attr("order", AttributeSpec::with_default(1))
                .content("list_item+")
                .group("block"),
            NodeSpec::new("bullet_list").content("list_item+").group("block"),
            NodeSpec::new("list_item")
                .content("paragraph block*")
                .defining(),
        ],
        marks: vec![
            MarkSpec::new("link")
                .attr("href", AttributeSpec::required())
                .attr("title", AttributeSpec::with_default(serde_json::Value::Null))
                .inclusive(false),
            MarkSpec::new("em"),
            MarkSpec::new("strong"),
            MarkSpec::new("code"),
        ],
        top_node: Some("doc".to_string()),
    }
}

/// The shared basic schema. Every call returns a handle to the same schema,
/// so documents built separately can be compared and combined.
pub fn schema() -> Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA
        .get_or_init(|| match Schema::new(spec()) {
            Ok(schema) => schema,
            Err(e) => panic!("basic schema is invalid: {}", e),
        })
        .clone()
}
