//! # JSON
//!
//! Structural JSON forms of nodes, marks and slices:
//!
//! ```json
//! {"type": "paragraph", "attrs": {}, "content": [{"type": "text", "text": "hi", "marks": [{"type": "em"}]}]}
//! {"content": [...], "openStart": 1, "openEnd": 1}
//! ```
//!
//! Deserializing needs the schema the document was built with. Content is
//! not validated on the way in, because slices legitimately hold partial
//! nodes; call [`Node::check`] on whole documents.

use crate::error::{ModelError, ModelResult};
use crate::schema::{Attrs, Schema};
use crate::{Fragment, Mark, Node, Slice};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJson {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<MarkJson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkJson {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceJson {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub open_start: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub open_end: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Mark {
    pub fn to_json(&self) -> MarkJson {
        MarkJson {
            mark_type: self.mark_type().name().to_string(),
            attrs: self.attrs().clone(),
        }
    }

    pub fn from_json(schema: &Schema, json: &MarkJson) -> ModelResult<Mark> {
        schema.mark(&json.mark_type, Some(&json.attrs))
    }
}

impl Node {
    pub fn to_json(&self) -> NodeJson {
        NodeJson {
            node_type: self.node_type().name().to_string(),
            attrs: self.attrs().clone(),
            content: self.content().to_json(),
            text: self.text().map(str::to_string),
            marks: self.marks().iter().map(Mark::to_json).collect(),
        }
    }

    pub fn from_json(schema: &Schema, json: &NodeJson) -> ModelResult<Node> {
        let marks = json
            .marks
            .iter()
            .map(|m| Mark::from_json(schema, m))
            .collect::<ModelResult<Vec<_>>>()?;
        if json.node_type == "text" {
            let text = json
                .text
                .as_deref()
                .ok_or_else(|| ModelError::InvalidJson("text node without text".to_string()))?;
            return schema.text(text, &marks);
        }
        let ty = schema
            .node_type(&json.node_type)
            .ok_or_else(|| ModelError::UnknownNodeType(json.node_type.clone()))?;
        let content = Fragment::from_json(schema, &json.content)?;
        ty.create(Some(&json.attrs), content, &marks)
    }

    /// Parse a node from a JSON string.
    pub fn from_json_str(schema: &Schema, source: &str) -> ModelResult<Node> {
        let json: NodeJson = serde_json::from_str(source)?;
        Node::from_json(schema, &json)
    }
}

impl Fragment {
    pub fn to_json(&self) -> Vec<NodeJson> {
        self.iter().map(Node::to_json).collect()
    }

    pub fn from_json(schema: &Schema, json: &[NodeJson]) -> ModelResult<Fragment> {
        let nodes = json
            .iter()
            .map(|n| Node::from_json(schema, n))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Fragment::from_array(nodes))
    }
}

impl Slice {
    pub fn to_json(&self) -> SliceJson {
        SliceJson {
            content: self.content().to_json(),
            open_start: self.open_start(),
            open_end: self.open_end(),
        }
    }

    pub fn from_json(schema: &Schema, json: &SliceJson) -> ModelResult<Slice> {
        Ok(Slice::new(
            Fragment::from_json(schema, &json.content)?,
            json.open_start,
            json.open_end,
        ))
    }
}
