//! Document builders with position tags.
//!
//! Strings may contain tags like `<a>`; the builders strip them and record
//! the position they stood at. Positions in a [`TaggedDoc`] are document
//! positions.
//!
//! The builders are meant for tests and fixtures and panic on content the
//! schema rejects.

use crate::schema;
use folio_model::{Attrs, Fragment, Mark, Node};
use std::collections::BTreeMap;
use std::ops::Deref;

/// A run of nodes with tags relative to the run's start.
#[derive(Debug, Clone, Default)]
pub struct Built {
    pub nodes: Vec<Node>,
    pub tags: BTreeMap<String, usize>,
}

impl Built {
    /// The single node this run was built as.
    ///
    /// # Panics
    ///
    /// Panics if the run is not exactly one node.
    pub fn node(&self) -> Node {
        assert_eq!(self.nodes.len(), 1, "expected a single node");
        self.nodes[0].clone()
    }
}

/// A built document and its tagged positions.
#[derive(Debug, Clone)]
pub struct TaggedDoc {
    pub doc: Node,
    pub tags: BTreeMap<String, usize>,
}

impl TaggedDoc {
    /// Position of tag `name`.
    ///
    /// # Panics
    ///
    /// Panics if the document has no such tag.
    pub fn tag(&self, name: &str) -> usize {
        match self.tags.get(name) {
            Some(pos) => *pos,
            None => panic!("no tag <{}> in {}", name, self.doc),
        }
    }
}

impl Deref for TaggedDoc {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.doc
    }
}

/// One argument of a builder macro.
pub enum Item {
    Text(String),
    Built(Built),
    Node(Node),
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Item::Text(s.to_string())
    }
}

impl From<String> for Item {
    fn from(s: String) -> Self {
        Item::Text(s)
    }
}

impl From<Built> for Item {
    fn from(b: Built) -> Self {
        Item::Built(b)
    }
}

impl From<Node> for Item {
    fn from(n: Node) -> Self {
        Item::Node(n)
    }
}

/// Split `<tag>` markers out of a string.
fn parse_tags(text: &str) -> (String, Vec<(String, usize)>) {
    let mut out = String::new();
    let mut tags = Vec::new();
    let mut rest = text;
    let mut len = 0;
    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let close = after.find('>');
        let name = close.map(|c| &after[..c]);
        match name {
            Some(name) if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') => {
                let before = &rest[..open];
                out.push_str(before);
                len += before.chars().count();
                tags.push((name.to_string(), len));
                rest = &after[name.len() + 1..];
            }
            _ => {
                let before = &rest[..=open];
                out.push_str(before);
                len += before.chars().count();
                rest = after;
            }
        }
    }
    out.push_str(rest);
    (out, tags)
}

fn flatten(items: Vec<Item>, marks: &[Mark]) -> Built {
    let s = schema();
    let mut built = Built::default();
    let mut pos = 0;
    for item in items {
        match item {
            Item::Text(text) => {
                let (text, tags) = parse_tags(&text);
                for (name, at) in tags {
                    built.tags.insert(name, pos + at);
                }
                if !text.is_empty() {
                    let node = match s.text(&text, marks) {
                        Ok(node) => node,
                        Err(e) => panic!("cannot build text {:?}: {}", text, e),
                    };
                    pos += node.node_size();
                    built.nodes.push(node);
                }
            }
            Item::Built(child) => {
                for (name, at) in child.tags {
                    built.tags.insert(name, pos + at);
                }
                for node in child.nodes {
                    let node = add_marks(node, marks);
                    pos += node.node_size();
                    built.nodes.push(node);
                }
            }
            Item::Node(node) => {
                let node = add_marks(node, marks);
                pos += node.node_size();
                built.nodes.push(node);
            }
        }
    }
    built
}

fn add_marks(node: Node, marks: &[Mark]) -> Node {
    if marks.is_empty() || !node.is_inline() {
        return node;
    }
    let mut set = node.marks().to_vec();
    for mark in marks {
        set = mark.add_to_set(&set);
    }
    node.mark(set)
}

/// Build one node of type `name` around `items`.
pub fn node(name: &str, attrs: Option<Attrs>, items: Vec<Item>) -> Built {
    let s = schema();
    let content = flatten(items, &[]);
    let node = match s.node(name, attrs.as_ref(), Fragment::from(content.nodes), &[]) {
        Ok(node) => node,
        Err(e) => panic!("cannot build {}: {}", name, e),
    };
    Built {
        nodes: vec![node],
        tags: content.tags.into_iter().map(|(k, v)| (k, v + 1)).collect(),
    }
}

/// Apply mark `name` to the inline content of `items`.
pub fn mark(name: &str, attrs: Option<Attrs>, items: Vec<Item>) -> Built {
    let s = schema();
    let mark = match s.mark(name, attrs.as_ref()) {
        Ok(mark) => mark,
        Err(e) => panic!("cannot build mark {}: {}", name, e),
    };
    flatten(items, &[mark])
}

/// Build a top-level document.
pub fn doc(items: Vec<Item>) -> TaggedDoc {
    let built = node("doc", None, items);
    TaggedDoc {
        doc: built.node(),
        tags: built.tags.into_iter().map(|(k, v)| (k, v - 1)).collect(),
    }
}

fn attrs<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> Attrs {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

pub fn heading(level: u8, items: Vec<Item>) -> Built {
    node("heading", Some(attrs([("level", level.into())])), items)
}

pub fn link(href: &str, items: Vec<Item>) -> Built {
    mark("link", Some(attrs([("href", href.into())])), items)
}

pub fn img(src: &str) -> Node {
    node("image", Some(attrs([("src", src.into())])), vec![]).node()
}

pub fn br() -> Node {
    node("hard_break", None, vec![]).node()
}

pub fn hr() -> Node {
    node("horizontal_rule", None, vec![]).node()
}

#[macro_export]
macro_rules! doc {
    ($($item:expr),* $(,)?) => {
        $crate::builders::doc(vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! p {
    ($($item:expr),* $(,)?) => {
        $crate::builders::node("paragraph", None, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! blockquote {
    ($($item:expr),* $(,)?) => {
        $crate::builders::node("blockquote", None, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! pre {
    ($($item:expr),* $(,)?) => {
        $crate::builders::node("code_block", None, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! h1 {
    ($($item:expr),* $(,)?) => {
        $crate::builders::heading(1, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! h2 {
    ($($item:expr),* $(,)?) => {
        $crate::builders::heading(2, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! ul {
    ($($item:expr),* $(,)?) => {
        $crate::builders::node("bullet_list", None, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! ol {
    ($($item:expr),* $(,)?) => {
        $crate::builders::node("ordered_list", None, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! li {
    ($($item:expr),* $(,)?) => {
        $crate::builders::node("list_item", None, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! em {
    ($($item:expr),* $(,)?) => {
        $crate::builders::mark("em", None, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! strong {
    ($($item:expr),* $(,)?) => {
        $crate::builders::mark("strong", None, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! code {
    ($($item:expr),* $(,)?) => {
        $crate::builders::mark("code", None, vec![$($crate::builders::Item::from($item)),*])
    };
}

#[macro_export]
macro_rules! a {
    ($href:expr; $($item:expr),* $(,)?) => {
        $crate::builders::link($href, vec![$($crate::builders::Item::from($item)),*])
    };
}
