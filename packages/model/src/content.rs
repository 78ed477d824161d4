//! # Content Expressions
//!
//! Content expressions such as `"paragraph (ordered_list | bullet_list)*"` are
//! parsed into an expression tree, compiled into a non-deterministic automaton
//! and then into a deterministic one. Each node type owns the states of its
//! automaton; [`ContentMatch`] is a cursor into them.
//!
//! Grammar:
//!
//! ```text
//! expr     := seq ("|" seq)*
//! seq      := subscript+
//! subscript:= atom ("*" | "+" | "?" | "{" n ("," m?)? "}")*
//! atom     := name | group | "(" expr ")"
//! ```

use crate::error::SchemaError;
use crate::schema::NodeType;
use crate::Fragment;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// One state of a compiled content automaton.
#[derive(Debug, Clone)]
pub(crate) struct MatchState {
    pub(crate) valid_end: bool,
    /// `(node type id, next state)` pairs.
    pub(crate) next: Vec<(usize, usize)>,
}

/// States for a type without content.
pub(crate) fn empty_states() -> Vec<MatchState> {
    vec![MatchState {
        valid_end: true,
        next: Vec::new(),
    }]
}

#[derive(Debug, Clone)]
enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Plus(Box<Expr>),
    Star(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        min: usize,
        max: Option<usize>,
        expr: Box<Expr>,
    },
    Name(usize),
}

fn tokenize(expr: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_alphanumeric() || c == '_' {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    word.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(word);
        } else {
            tokens.push(c.to_string());
            chars.next();
        }
    }
    tokens
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<String>,
    pos: usize,
    inline: Option<bool>,
    resolve: &'a dyn Fn(&str) -> Vec<usize>,
    is_inline: &'a dyn Fn(usize) -> bool,
}

impl<'a> Parser<'a> {
    fn err(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::ContentExpression {
            expr: self.source.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, SchemaError> {
        let mut exprs = vec![self.parse_seq()?];
        while self.eat("|") {
            exprs.push(self.parse_seq()?);
        }
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Choice(exprs)
        })
    }

    fn parse_seq(&mut self) -> Result<Expr, SchemaError> {
        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_subscript()?);
            match self.peek() {
                None | Some(")") | Some("|") => break,
                _ => {}
            }
        }
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Seq(exprs)
        })
    }

    fn parse_subscript(&mut self) -> Result<Expr, SchemaError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat("+") {
                expr = Expr::Plus(Box::new(expr));
            } else if self.eat("*") {
                expr = Expr::Star(Box::new(expr));
            } else if self.eat("?") {
                expr = Expr::Opt(Box::new(expr));
            } else if self.eat("{") {
                expr = self.parse_range(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_num(&mut self) -> Result<usize, SchemaError> {
        let token = self.peek().unwrap_or("").to_string();
        let n = token
            .parse::<usize>()
            .map_err(|_| self.err(format!("Expected number, got '{}'", token)))?;
        self.pos += 1;
        Ok(n)
    }

    fn parse_range(&mut self, expr: Expr) -> Result<Expr, SchemaError> {
        let min = self.parse_num()?;
        let mut max = Some(min);
        if self.eat(",") {
            max = if self.peek() != Some("}") {
                Some(self.parse_num()?)
            } else {
                None
            };
        }
        if !self.eat("}") {
            return Err(self.err("Unclosed braced range"));
        }
        Ok(Expr::Range {
            min,
            max,
            expr: Box::new(expr),
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, SchemaError> {
        if self.eat("(") {
            let expr = self.parse_expr()?;
            if !self.eat(")") {
                return Err(self.err("Missing closing paren"));
            }
            return Ok(expr);
        }
        let token = match self.peek() {
            Some(t) if t.chars().all(|c| c.is_alphanumeric() || c == '_') => t.to_string(),
            Some(t) => return Err(self.err(format!("Unexpected token '{}'", t))),
            None => return Err(self.err("Unexpected end of expression")),
        };
        let types = (self.resolve)(&token);
        if types.is_empty() {
            return Err(self.err(format!("No node type or group '{}' found", token)));
        }
        let mut exprs = Vec::with_capacity(types.len());
        for ty in types {
            let inline = (self.is_inline)(ty);
            match self.inline {
                None => self.inline = Some(inline),
                Some(prev) if prev != inline => {
                    return Err(self.err("Mixing inline and block content"));
                }
                _ => {}
            }
            exprs.push(Expr::Name(ty));
        }
        self.pos += 1;
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Choice(exprs)
        })
    }
}

#[derive(Debug, Clone)]
struct NfaEdge {
    term: Option<usize>,
    to: Option<usize>,
}

type EdgeRef = (usize, usize);

#[derive(Default)]
struct Nfa {
    states: Vec<Vec<NfaEdge>>,
}

impl Nfa {
    fn build(expr: &Expr) -> Self {
        let mut nfa = Nfa {
            states: vec![Vec::new()],
        };
        let out = nfa.compile(expr, 0);
        let end = nfa.node();
        nfa.connect(&out, end);
        nfa
    }

    fn node(&mut self) -> usize {
        self.states.push(Vec::new());
        self.states.len() - 1
    }

    fn edge(&mut self, from: usize, to: Option<usize>, term: Option<usize>) -> EdgeRef {
        self.states[from].push(NfaEdge { term, to });
        (from, self.states[from].len() - 1)
    }

    fn connect(&mut self, edges: &[EdgeRef], to: usize) {
        for &(state, edge) in edges {
            self.states[state][edge].to = Some(to);
        }
    }

    fn compile(&mut self, expr: &Expr, from: usize) -> Vec<EdgeRef> {
        match expr {
            Expr::Choice(exprs) => exprs
                .iter()
                .flat_map(|e| self.compile(e, from))
                .collect(),
            Expr::Seq(exprs) => {
                let mut from = from;
                let mut out = Vec::new();
                for (i, e) in exprs.iter().enumerate() {
                    out = self.compile(e, from);
                    if i + 1 < exprs.len() {
                        from = self.node();
                        self.connect(&out, from);
                    }
                }
                out
            }
            Expr::Star(inner) => {
                let looped = self.node();
                self.edge(from, Some(looped), None);
                let out = self.compile(inner, looped);
                self.connect(&out, looped);
                vec![self.edge(looped, None, None)]
            }
            Expr::Plus(inner) => {
                let looped = self.node();
                let first = self.compile(inner, from);
                self.connect(&first, looped);
                let again = self.compile(inner, looped);
                self.connect(&again, looped);
                vec![self.edge(looped, None, None)]
            }
            Expr::Opt(inner) => {
                let mut out = vec![self.edge(from, None, None)];
                out.extend(self.compile(inner, from));
                out
            }
            Expr::Range { min, max, expr } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let out = self.compile(expr, cur);
                    self.connect(&out, next);
                    cur = next;
                }
                match max {
                    None => {
                        let out = self.compile(expr, cur);
                        self.connect(&out, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(cur, Some(next), None);
                            let out = self.compile(expr, cur);
                            self.connect(&out, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None, None)]
            }
            Expr::Name(ty) => vec![self.edge(from, None, Some(*ty))],
        }
    }

    /// States reachable from `node` through untyped edges, sorted descending.
    fn null_from(&self, node: usize) -> Vec<usize> {
        let mut result = Vec::new();
        self.scan(node, &mut result);
        result.sort_unstable_by(|a, b| b.cmp(a));
        result
    }

    fn scan(&self, node: usize, result: &mut Vec<usize>) {
        let edges = &self.states[node];
        if edges.len() == 1 && edges[0].term.is_none() {
            if let Some(to) = edges[0].to {
                return self.scan(to, result);
            }
        }
        result.push(node);
        for edge in edges {
            if let (None, Some(to)) = (edge.term, edge.to) {
                if !result.contains(&to) {
                    self.scan(to, result);
                }
            }
        }
    }

    fn to_dfa(&self) -> Vec<MatchState> {
        let mut states = Vec::new();
        let mut labeled = HashMap::new();
        let start = self.null_from(0);
        self.explore(start, &mut states, &mut labeled);
        states
    }

    fn explore(
        &self,
        set: Vec<usize>,
        states: &mut Vec<MatchState>,
        labeled: &mut HashMap<Vec<usize>, usize>,
    ) -> usize {
        let mut out: Vec<(usize, Vec<usize>)> = Vec::new();
        for &node in &set {
            for edge in &self.states[node] {
                let (Some(term), Some(to)) = (edge.term, edge.to) else {
                    continue;
                };
                let idx = match out.iter().position(|(t, _)| *t == term) {
                    Some(idx) => idx,
                    None => {
                        out.push((term, Vec::new()));
                        out.len() - 1
                    }
                };
                for reached in self.null_from(to) {
                    if !out[idx].1.contains(&reached) {
                        out[idx].1.push(reached);
                    }
                }
            }
        }

        let id = states.len();
        states.push(MatchState {
            valid_end: set.contains(&(self.states.len() - 1)),
            next: Vec::new(),
        });
        labeled.insert(set, id);

        for (term, mut targets) in out {
            targets.sort_unstable_by(|a, b| b.cmp(a));
            let next = match labeled.get(&targets) {
                Some(existing) => *existing,
                None => self.explore(targets, states, labeled),
            };
            states[id].next.push((term, next));
        }
        id
    }
}

/// Compile a content expression into automaton states. State 0 is the start.
pub(crate) fn compile(
    source: &str,
    resolve: &dyn Fn(&str) -> Vec<usize>,
    is_inline: &dyn Fn(usize) -> bool,
) -> Result<Vec<MatchState>, SchemaError> {
    let mut parser = Parser {
        source,
        tokens: tokenize(source),
        pos: 0,
        inline: None,
        resolve,
        is_inline,
    };
    let expr = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        return Err(parser.err(format!("Unexpected trailing text '{}'", token)));
    }
    Ok(Nfa::build(&expr).to_dfa())
}

/// A position in a node type's content automaton.
#[derive(Clone)]
pub struct ContentMatch {
    owner: NodeType,
    state: usize,
}

impl ContentMatch {
    pub(crate) fn start(owner: NodeType) -> Self {
        ContentMatch { owner, state: 0 }
    }

    fn data(&self) -> &MatchState {
        &self.owner.schema.inner.nodes[self.owner.id].states[self.state]
    }

    fn at(&self, state: usize) -> ContentMatch {
        ContentMatch {
            owner: self.owner.clone(),
            state,
        }
    }

    /// True when the content matched so far is complete.
    pub fn valid_end(&self) -> bool {
        self.data().valid_end
    }

    pub fn match_type(&self, ty: &NodeType) -> Option<ContentMatch> {
        if !ty.schema.ptr_eq(&self.owner.schema) {
            return None;
        }
        self.data()
            .next
            .iter()
            .find(|(t, _)| *t == ty.id)
            .map(|(_, next)| self.at(*next))
    }

    /// Match the children `start..end` of a fragment.
    pub fn match_fragment(&self, frag: &Fragment, start: usize, end: usize) -> Option<ContentMatch> {
        let mut cur = self.clone();
        for i in start..end.min(frag.child_count()) {
            cur = cur.match_type(frag.child(i).node_type())?;
        }
        Some(cur)
    }

    pub fn inline_content(&self) -> bool {
        self.edges().next().map(|(ty, _)| ty.is_inline()).unwrap_or(false)
    }

    /// First type allowed here that can be created without attributes.
    pub fn default_type(&self) -> Option<NodeType> {
        self.edges()
            .map(|(ty, _)| ty)
            .find(|ty| !(ty.is_text() || ty.has_required_attrs()))
    }

    pub fn compatible(&self, other: &ContentMatch) -> bool {
        self.data()
            .next
            .iter()
            .any(|(a, _)| other.data().next.iter().any(|(b, _)| a == b))
    }

    pub fn edge_count(&self) -> usize {
        self.data().next.len()
    }

    pub fn edge(&self, n: usize) -> Option<(NodeType, ContentMatch)> {
        self.data()
            .next
            .get(n)
            .map(|(ty, next)| (self.owner.schema.node_type_by_id(*ty), self.at(*next)))
    }

    fn edges(&self) -> impl Iterator<Item = (NodeType, ContentMatch)> + '_ {
        (0..self.edge_count()).filter_map(move |i| self.edge(i))
    }

    /// Find the shortest run of generated nodes that, inserted here, lets
    /// `after` (from `start_index`) match. With `to_end`, the result must
    /// also reach a valid end.
    pub fn fill_before(&self, after: &Fragment, to_end: bool, start_index: usize) -> Option<Fragment> {
        let mut seen = vec![self.state];
        let mut types = Vec::new();
        self.search_fill(after, to_end, start_index, &mut seen, &mut types)
    }

    fn search_fill(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
        seen: &mut Vec<usize>,
        types: &mut Vec<NodeType>,
    ) -> Option<Fragment> {
        if let Some(finished) = self.match_fragment(after, start_index, after.child_count()) {
            if !to_end || finished.valid_end() {
                let filled: Option<Vec<_>> = types
                    .iter()
                    .map(|ty| ty.create_and_fill(None, Fragment::empty(), &[]).ok().flatten())
                    .collect();
                if let Some(nodes) = filled {
                    return Some(Fragment::from_array(nodes));
                }
            }
        }
        for (ty, next) in self.edges() {
            if !(ty.is_text() || ty.has_required_attrs()) && !seen.contains(&next.state) {
                seen.push(next.state);
                types.push(ty);
                if let Some(found) = next.search_fill(after, to_end, start_index, seen, types) {
                    return Some(found);
                }
                types.pop();
            }
        }
        None
    }

    /// Find the wrapper types needed to let a node of `target` type appear
    /// here, outermost first. Empty when `target` fits directly.
    pub fn find_wrapping(&self, target: &NodeType) -> Option<Vec<NodeType>> {
        struct Active {
            state: ContentMatch,
            ty: Option<NodeType>,
            via: Option<usize>,
        }

        let mut arena = vec![Active {
            state: self.clone(),
            ty: None,
            via: None,
        }];
        let mut queue = VecDeque::from([0usize]);
        let mut seen = HashSet::new();

        while let Some(idx) = queue.pop_front() {
            let state = arena[idx].state.clone();
            if state.match_type(target).is_some() {
                let mut result = Vec::new();
                let mut cur = Some(idx);
                while let Some(i) = cur {
                    if let Some(ty) = &arena[i].ty {
                        result.push(ty.clone());
                    }
                    cur = arena[i].via;
                }
                result.reverse();
                return Some(result);
            }
            let top_level = arena[idx].ty.is_none();
            for (ty, next) in state.edges() {
                if !ty.is_leaf()
                    && !ty.has_required_attrs()
                    && !seen.contains(&ty.id)
                    && (top_level || next.valid_end())
                {
                    seen.insert(ty.id);
                    arena.push(Active {
                        state: ty.content_match(),
                        ty: Some(ty),
                        via: Some(idx),
                    });
                    queue.push_back(arena.len() - 1);
                }
            }
        }
        None
    }
}

impl PartialEq for ContentMatch {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.state == other.state
    }
}

impl fmt::Debug for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let next: Vec<String> = self
            .edges()
            .map(|(ty, next)| format!("{}->{}", ty.name(), next.state))
            .collect();
        write!(
            f,
            "ContentMatch({}#{}{} [{}])",
            self.owner.name(),
            self.state,
            if self.valid_end() { "*" } else { "" },
            next.join(", ")
        )
    }
}
