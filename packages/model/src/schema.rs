//! # Schema
//!
//! Declares which node and mark types may appear in a document and how they
//! nest. A [`Schema`] is compiled once from a [`SchemaSpec`] and is immutable
//! afterwards; every node created under it holds a cheap handle back to it.
//!
//! ```rust,ignore
//! let schema = Schema::new(SchemaSpec {
//!     nodes: vec![
//!         NodeSpec::new("doc").content("paragraph+"),
//!         NodeSpec::new("paragraph").content("text*"),
//!         NodeSpec::new("text"),
//!     ],
//!     marks: vec![MarkSpec::new("em")],
//!     top_node: None,
//! })?;
//! ```

use crate::content::{self, ContentMatch, MatchState};
use crate::error::{ModelError, ModelResult, SchemaError};
use crate::{Fragment, Mark, Node};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Attribute values of a node or mark, kept in key order.
pub type Attrs = BTreeMap<String, Value>;

/// Declaration of a single attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    /// Value used when none is given. Attributes without a default are required.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
}

// `"default": null` must mean "defaults to null", not "required".
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl AttributeSpec {
    pub fn required() -> Self {
        Self { default: None }
    }

    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: Some(value.into()),
        }
    }
}

/// Declaration of a node type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub name: String,

    /// Content expression, e.g. `"paragraph block*"`. Absent means leaf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Allowed marks: `"_"` for all, `""` for none, or space-separated names/groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<String>,

    /// Space-separated groups this type belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(default)]
    pub inline: bool,

    #[serde(default)]
    pub atom: bool,

    #[serde(default)]
    pub attrs: BTreeMap<String, AttributeSpec>,

    /// Content is code: commands insert newlines rather than breaks.
    #[serde(default)]
    pub code: bool,

    #[serde(default)]
    pub defining: bool,

    /// Editing operations never cross this node's boundary.
    #[serde(default)]
    pub isolating: bool,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn content(mut self, expr: impl Into<String>) -> Self {
        self.content = Some(expr.into());
        self
    }

    pub fn marks(mut self, marks: impl Into<String>) -> Self {
        self.marks = Some(marks.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }

    pub fn attr(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }
}

/// Declaration of a mark type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSpec {
    pub name: String,

    #[serde(default)]
    pub attrs: BTreeMap<String, AttributeSpec>,

    /// Marks that cannot coexist with this one. Defaults to the mark itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excludes: Option<String>,

    /// Whether the mark extends to text inserted at its end. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusive: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl MarkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn excludes(mut self, excludes: impl Into<String>) -> Self {
        self.excludes = Some(excludes.into());
        self
    }

    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = Some(inclusive);
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }
}

/// Ordered node and mark declarations. Order matters: the first node type is
/// the default top node, and mark order defines mark-set ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSpec {
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub marks: Vec<MarkSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_node: Option<String>,
}

pub(crate) struct NodeTypeData {
    pub(crate) spec: NodeSpec,
    groups: Vec<String>,
    pub(crate) states: Vec<MatchState>,
    inline_content: bool,
    /// `None` allows every mark.
    mark_set: Option<Vec<usize>>,
}

pub(crate) struct MarkTypeData {
    spec: MarkSpec,
    excluded: Vec<usize>,
}

pub(crate) struct SchemaInner {
    pub(crate) nodes: Vec<NodeTypeData>,
    node_ids: HashMap<String, usize>,
    marks: Vec<MarkTypeData>,
    mark_ids: HashMap<String, usize>,
    top: usize,
}

/// A compiled, immutable schema. Cloning is cheap.
#[derive(Clone)]
pub struct Schema {
    pub(crate) inner: Arc<SchemaInner>,
}

fn split_words(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

impl Schema {
    pub fn new(spec: SchemaSpec) -> Result<Self, SchemaError> {
        let mut node_ids = HashMap::new();
        for (id, node) in spec.nodes.iter().enumerate() {
            if node_ids.insert(node.name.clone(), id).is_some() {
                return Err(SchemaError::DuplicateName {
                    kind: "node",
                    name: node.name.clone(),
                });
            }
        }
        let text_id = *node_ids.get("text").ok_or(SchemaError::MissingTextType)?;
        if !spec.nodes[text_id].attrs.is_empty() {
            return Err(SchemaError::TextWithAttributes);
        }
        let top = match &spec.top_node {
            Some(name) => *node_ids
                .get(name)
                .ok_or_else(|| SchemaError::UnknownTopNode(name.clone()))?,
            None => 0,
        };

        let mut mark_ids = HashMap::new();
        for (id, mark) in spec.marks.iter().enumerate() {
            if mark_ids.insert(mark.name.clone(), id).is_some() {
                return Err(SchemaError::DuplicateName {
                    kind: "mark",
                    name: mark.name.clone(),
                });
            }
        }

        let groups: Vec<Vec<String>> = spec
            .nodes
            .iter()
            .map(|n| n.group.as_deref().map(split_words).unwrap_or_default())
            .collect();
        let is_inline = |id: usize| spec.nodes[id].inline || spec.nodes[id].name == "text";
        let resolve_name = |name: &str| -> Vec<usize> {
            if let Some(id) = node_ids.get(name) {
                return vec![*id];
            }
            groups
                .iter()
                .enumerate()
                .filter(|(_, g)| g.iter().any(|g| g == name))
                .map(|(id, _)| id)
                .collect()
        };

        let mut nodes = Vec::with_capacity(spec.nodes.len());
        for (id, node) in spec.nodes.iter().enumerate() {
            let states = match node.content.as_deref() {
                Some(expr) if !expr.trim().is_empty() => {
                    content::compile(expr, &resolve_name, &is_inline)?
                }
                _ => content::empty_states(),
            };
            let inline_content = states[0]
                .next
                .first()
                .map(|(ty, _)| is_inline(*ty))
                .unwrap_or(false);
            nodes.push(NodeTypeData {
                spec: node.clone(),
                groups: groups[id].clone(),
                states,
                inline_content,
                mark_set: None,
            });
        }

        let mark_groups: Vec<Vec<String>> = spec
            .marks
            .iter()
            .map(|m| m.group.as_deref().map(split_words).unwrap_or_default())
            .collect();
        let gather_marks = |expr: &str, owner: &str| -> Result<Vec<usize>, SchemaError> {
            let mut found = Vec::new();
            for name in expr.split_whitespace() {
                if name == "_" {
                    return Ok((0..spec.marks.len()).collect());
                }
                let before = found.len();
                if let Some(id) = mark_ids.get(name) {
                    found.push(*id);
                } else {
                    for (id, g) in mark_groups.iter().enumerate() {
                        if g.iter().any(|g| g == name) {
                            found.push(id);
                        }
                    }
                }
                if found.len() == before {
                    return Err(SchemaError::UnknownMark {
                        name: name.to_string(),
                        owner: owner.to_string(),
                    });
                }
            }
            Ok(found)
        };

        for node in nodes.iter_mut() {
            node.mark_set = match node.spec.marks.as_deref() {
                Some("_") => None,
                Some(expr) => Some(gather_marks(expr, &node.spec.name)?),
                None if node.inline_content => None,
                None => Some(Vec::new()),
            };
        }

        let mut marks = Vec::with_capacity(spec.marks.len());
        for (id, mark) in spec.marks.iter().enumerate() {
            let excluded = match mark.excludes.as_deref() {
                None => vec![id],
                Some(expr) => gather_marks(expr, &mark.name)?,
            };
            marks.push(MarkTypeData {
                spec: mark.clone(),
                excluded,
            });
        }

        tracing::debug!(
            nodes = nodes.len(),
            marks = marks.len(),
            "compiled schema"
        );

        Ok(Schema {
            inner: Arc::new(SchemaInner {
                nodes,
                node_ids,
                marks,
                mark_ids,
                top,
            }),
        })
    }

    pub fn node_type(&self, name: &str) -> Option<NodeType> {
        self.inner.node_ids.get(name).map(|id| NodeType {
            schema: self.clone(),
            id: *id,
        })
    }

    pub fn mark_type(&self, name: &str) -> Option<MarkType> {
        self.inner.mark_ids.get(name).map(|id| MarkType {
            schema: self.clone(),
            id: *id,
        })
    }

    pub(crate) fn node_type_by_id(&self, id: usize) -> NodeType {
        NodeType {
            schema: self.clone(),
            id,
        }
    }

    pub fn top_node_type(&self) -> NodeType {
        self.node_type_by_id(self.inner.top)
    }

    pub fn node_types(&self) -> impl Iterator<Item = NodeType> + '_ {
        (0..self.inner.nodes.len()).map(|id| self.node_type_by_id(id))
    }

    pub fn mark_types(&self) -> impl Iterator<Item = MarkType> + '_ {
        (0..self.inner.marks.len()).map(|id| MarkType {
            schema: self.clone(),
            id,
        })
    }

    /// Create a node, validating its content and marks.
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: &[Mark],
    ) -> ModelResult<Node> {
        let ty = self
            .node_type(name)
            .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))?;
        ty.create_checked(attrs, content, marks)
    }

    /// Create a text node. Empty text nodes are not allowed.
    pub fn text(&self, text: &str, marks: &[Mark]) -> ModelResult<Node> {
        if text.is_empty() {
            return Err(ModelError::InvalidContent {
                node_type: "text".to_string(),
                content: "empty text nodes are not allowed".to_string(),
            });
        }
        let ty = self
            .node_type("text")
            .ok_or_else(|| ModelError::UnknownNodeType("text".to_string()))?;
        Ok(Node::new_text(ty, text.into(), Mark::set_from(marks)))
    }

    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> ModelResult<Mark> {
        let ty = self
            .mark_type(name)
            .ok_or_else(|| ModelError::UnknownMarkType(name.to_string()))?;
        ty.create(attrs)
    }

    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.inner.nodes.iter().map(|n| &n.spec.name).collect::<Vec<_>>())
            .field("marks", &self.inner.marks.iter().map(|m| &m.spec.name).collect::<Vec<_>>())
            .finish()
    }
}

fn compute_attrs(
    type_name: &str,
    specs: &BTreeMap<String, AttributeSpec>,
    given: Option<&Attrs>,
) -> ModelResult<Attrs> {
    let mut built = Attrs::new();
    for (name, spec) in specs {
        let value = match (given.and_then(|g| g.get(name)), &spec.default) {
            (Some(value), _) => value.clone(),
            (None, Some(default)) => default.clone(),
            (None, None) => {
                return Err(ModelError::MissingAttribute {
                    type_name: type_name.to_string(),
                    attr: name.clone(),
                })
            }
        };
        built.insert(name.clone(), value);
    }
    Ok(built)
}

/// Handle to a node type inside a [`Schema`].
#[derive(Clone)]
pub struct NodeType {
    pub(crate) schema: Schema,
    pub(crate) id: usize,
}

impl NodeType {
    fn data(&self) -> &NodeTypeData {
        &self.schema.inner.nodes[self.id]
    }

    pub fn name(&self) -> &str {
        &self.data().spec.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.data().spec
    }

    pub fn is_text(&self) -> bool {
        self.name() == "text"
    }

    pub fn is_inline(&self) -> bool {
        self.data().spec.inline || self.is_text()
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    pub fn inline_content(&self) -> bool {
        self.data().inline_content
    }

    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content()
    }

    /// Leaf types have no content expression.
    pub fn is_leaf(&self) -> bool {
        let states = &self.data().states;
        states.len() == 1 && states[0].next.is_empty()
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.data().spec.atom
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.data().groups.iter().any(|g| g == group)
    }

    pub fn has_required_attrs(&self) -> bool {
        self.data().spec.attrs.values().any(|a| a.default.is_none())
    }

    /// The automaton state at the start of this type's content.
    pub fn content_match(&self) -> ContentMatch {
        ContentMatch::start(self.clone())
    }

    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self == other || self.content_match().compatible(&other.content_match())
    }

    pub fn compute_attrs(&self, attrs: Option<&Attrs>) -> ModelResult<Attrs> {
        compute_attrs(self.name(), &self.data().spec.attrs, attrs)
    }

    /// Create a node without checking its content.
    pub fn create(
        &self,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: &[Mark],
    ) -> ModelResult<Node> {
        if self.is_text() {
            return Err(ModelError::InvalidContent {
                node_type: "text".to_string(),
                content: "text nodes are created with Schema::text".to_string(),
            });
        }
        let attrs = self.compute_attrs(attrs)?;
        Ok(Node::new(self.clone(), attrs, content.into(), Mark::set_from(marks)))
    }

    /// Create a node, failing with [`ModelError::InvalidContent`] or
    /// [`ModelError::InvalidMark`] if the content does not fit this type.
    pub fn create_checked(
        &self,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: &[Mark],
    ) -> ModelResult<Node> {
        let content = content.into();
        self.check_content(&content)?;
        self.create(attrs, content, marks)
    }

    /// Create a node, adding the content required before and after `content`
    /// to make it valid. Returns `None` when no such filler exists.
    pub fn create_and_fill(
        &self,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: &[Mark],
    ) -> ModelResult<Option<Node>> {
        let attrs = self.compute_attrs(attrs)?;
        let mut content = content.into();
        if content.size() > 0 {
            match self.content_match().fill_before(&content, false, 0) {
                Some(before) => content = before.append(&content),
                None => return Ok(None),
            }
        }
        let after = self
            .content_match()
            .match_fragment(&content, 0, content.child_count())
            .and_then(|m| m.fill_before(&Fragment::empty(), true, 0));
        match after {
            Some(after) => Ok(Some(Node::new(
                self.clone(),
                attrs,
                content.append(&after),
                Mark::set_from(marks),
            ))),
            None => Ok(None),
        }
    }

    pub fn valid_content(&self, content: &Fragment) -> bool {
        self.check_content(content).is_ok()
    }

    pub fn check_content(&self, content: &Fragment) -> ModelResult<()> {
        let matched = self
            .content_match()
            .match_fragment(content, 0, content.child_count());
        if !matched.map(|m| m.valid_end()).unwrap_or(false) {
            return Err(ModelError::InvalidContent {
                node_type: self.name().to_string(),
                content: content.to_string(),
            });
        }
        for child in content.iter() {
            if let Some(mark) = child.marks().iter().find(|m| !self.allows_mark_type(m.mark_type())) {
                return Err(ModelError::InvalidMark {
                    node_type: self.name().to_string(),
                    mark: mark.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
        match &self.data().mark_set {
            None => true,
            Some(set) => set.contains(&mark_type.id),
        }
    }

    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|m| self.allows_mark_type(m.mark_type()))
    }

    /// The subset of `marks` this type allows.
    pub fn allowed_marks(&self, marks: &[Mark]) -> Vec<Mark> {
        marks
            .iter()
            .filter(|m| self.allows_mark_type(m.mark_type()))
            .cloned()
            .collect()
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.schema.ptr_eq(&other.schema)
    }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name())
    }
}

/// Handle to a mark type inside a [`Schema`].
#[derive(Clone)]
pub struct MarkType {
    pub(crate) schema: Schema,
    pub(crate) id: usize,
}

impl MarkType {
    fn data(&self) -> &MarkTypeData {
        &self.schema.inner.marks[self.id]
    }

    pub fn name(&self) -> &str {
        &self.data().spec.name
    }

    pub fn spec(&self) -> &MarkSpec {
        &self.data().spec
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Position in the schema's mark order; mark sets are sorted by rank.
    pub fn rank(&self) -> usize {
        self.id
    }

    pub fn is_inclusive(&self) -> bool {
        self.data().spec.inclusive.unwrap_or(true)
    }

    pub fn create(&self, attrs: Option<&Attrs>) -> ModelResult<Mark> {
        let attrs = compute_attrs(self.name(), &self.data().spec.attrs, attrs)?;
        Ok(Mark::new(self.clone(), attrs))
    }

    pub fn excludes(&self, other: &MarkType) -> bool {
        self.data().excluded.contains(&other.id)
    }

    /// Remove every mark of this type from `set`.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| m.mark_type() != self).cloned().collect()
    }

    pub fn is_in_set<'a>(&self, set: &'a [Mark]) -> Option<&'a Mark> {
        set.iter().find(|m| m.mark_type() == self)
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.schema.ptr_eq(&other.schema)
    }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> SchemaSpec {
        SchemaSpec {
            nodes: vec![
                NodeSpec::new("doc").content("block+"),
                NodeSpec::new("paragraph").content("inline*").group("block"),
                NodeSpec::new("heading")
                    .content("text*")
                    .group("block")
                    .attr("level", AttributeSpec::with_default(1)),
                NodeSpec::new("image")
                    .inline()
                    .group("inline")
                    .attr("src", AttributeSpec::required()),
                NodeSpec::new("text").group("inline"),
            ],
            marks: vec![
                MarkSpec::new("em"),
                MarkSpec::new("code").excludes("_"),
            ],
            top_node: None,
        }
    }

    #[test]
    fn test_classification() {
        let schema = Schema::new(spec()).unwrap();
        let paragraph = schema.node_type("paragraph").unwrap();
        assert!(paragraph.is_textblock());
        assert!(paragraph.is_block());
        assert!(!paragraph.is_leaf());

        let image = schema.node_type("image").unwrap();
        assert!(image.is_inline());
        assert!(image.is_leaf());
        assert!(image.has_required_attrs());

        assert_eq!(schema.top_node_type().name(), "doc");
    }

    #[test]
    fn test_missing_text_type() {
        let spec = SchemaSpec {
            nodes: vec![NodeSpec::new("doc")],
            ..Default::default()
        };
        assert_eq!(Schema::new(spec).unwrap_err(), SchemaError::MissingTextType);
    }

    #[test]
    fn test_unknown_name_in_expression() {
        let mut spec = spec();
        spec.nodes[0] = NodeSpec::new("doc").content("section+");
        assert!(matches!(
            Schema::new(spec),
            Err(SchemaError::ContentExpression { .. })
        ));
    }

    #[test]
    fn test_compute_attrs() {
        let schema = Schema::new(spec()).unwrap();
        let heading = schema.node_type("heading").unwrap();
        let attrs = heading.compute_attrs(None).unwrap();
        assert_eq!(attrs.get("level"), Some(&json!(1)));

        let image = schema.node_type("image").unwrap();
        assert!(matches!(
            image.compute_attrs(None),
            Err(ModelError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_mark_allowance() {
        let schema = Schema::new(spec()).unwrap();
        let em = schema.mark_type("em").unwrap();
        assert!(schema.node_type("paragraph").unwrap().allows_mark_type(&em));
        assert!(!schema.node_type("doc").unwrap().allows_mark_type(&em));
    }

    #[test]
    fn test_spec_from_json() {
        let json = r#"{
            "nodes": [
                { "name": "doc", "content": "text*" },
                { "name": "text" }
            ],
            "marks": [
                { "name": "link", "attrs": { "href": {}, "title": { "default": null } }, "inclusive": false }
            ]
        }"#;
        let spec: SchemaSpec = serde_json::from_str(json).unwrap();
        let schema = Schema::new(spec).unwrap();
        let link = schema.mark_type("link").unwrap();
        assert!(!link.is_inclusive());
        let mut attrs = Attrs::new();
        attrs.insert("href".into(), json!("https://example.com"));
        let mark = link.create(Some(&attrs)).unwrap();
        assert_eq!(mark.attrs().get("title"), Some(&Value::Null));
    }
}
