//! Parenthesized textual records for nodes, links and goals.
//!
//! ```text
//! (node 3 Concept "cat" (attention 0.5 0 0) (tv 1 0.9))
//! (link 7 Inheritance (3 4) (attention 0 0 0) (tv 1 1))
//! (link 8 (custom "part of") (3 5) (attention 0 0 0) (tv 1 1))
//! (goal 12 "optimize parsing performance" PerformanceOptimization 0.78 0.5 0.8
//!       (caps "debugging" "optimization") (parents) (created 1700000000000))
//! ```
//!
//! Strings escape `\` and `"` with a backslash. Floats use the shortest form that parses
//! back to the same value (`inf`, `-inf` included), so every field round-trips.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::atomspace::{AtomRecord, AttentionValue, Link, LinkId, LinkType, Node, NodeId, NodeType, TruthValue};
use crate::error::{CogitoError, CogitoResult};
use crate::goals::{AutonomousGoal, GoalSource};

/// Types with a textual record form.
pub trait TextRecord: Sized {
    fn to_record(&self) -> String;
    fn parse_record(input: &str) -> CogitoResult<Self>;
}

/// Any parsed record, dispatched on its leading tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Node(Node),
    Link(Link),
    Goal(AutonomousGoal),
}

impl TextRecord for Record {
    fn to_record(&self) -> String {
        match self {
            Record::Node(n) => n.to_record(),
            Record::Link(l) => l.to_record(),
            Record::Goal(g) => g.to_record(),
        }
    }

    fn parse_record(input: &str) -> CogitoResult<Self> {
        let expr = read_one(input)?;
        let (tag, _) = expr.head()?;
        match tag {
            "node" => decode_node(&expr).map(Record::Node),
            "link" => decode_link(&expr).map(Record::Link),
            "goal" => decode_goal(&expr).map(Record::Goal),
            other => Err(expr.error(format!("unknown record tag `{}`", other))),
        }
    }
}

impl TextRecord for Node {
    fn to_record(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "(node {} {} ", self.id.0, self.node_type.as_str());
        push_str_lit(&mut out, &self.name);
        push_attention_tv(&mut out, &self.attention, &self.truth);
        out.push(')');
        out
    }

    fn parse_record(input: &str) -> CogitoResult<Self> {
        decode_node(&read_one(input)?)
    }
}

impl TextRecord for Link {
    fn to_record(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "(link {} ", self.id.0);
        match &self.link_type {
            LinkType::Custom(label) => {
                out.push_str("(custom ");
                push_str_lit(&mut out, label);
                out.push(')');
            }
            builtin => out.push_str(builtin.builtin_name().unwrap_or_default()),
        }
        out.push_str(" (");
        let ids: Vec<String> = self.outgoing.iter().map(|id| id.0.to_string()).collect();
        out.push_str(&ids.join(" "));
        out.push(')');
        push_attention_tv(&mut out, &self.attention, &self.truth);
        out.push(')');
        out
    }

    fn parse_record(input: &str) -> CogitoResult<Self> {
        decode_link(&read_one(input)?)
    }
}

impl TextRecord for AtomRecord {
    fn to_record(&self) -> String {
        match self {
            AtomRecord::Node(n) => n.to_record(),
            AtomRecord::Link(l) => l.to_record(),
        }
    }

    fn parse_record(input: &str) -> CogitoResult<Self> {
        match Record::parse_record(input)? {
            Record::Node(n) => Ok(AtomRecord::Node(n)),
            Record::Link(l) => Ok(AtomRecord::Link(l)),
            Record::Goal(_) => Err(CogitoError::Parse {
                offset: 0,
                message: "expected an atom record, found a goal".to_string(),
            }),
        }
    }
}

impl TextRecord for AutonomousGoal {
    fn to_record(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "(goal {} ", self.id);
        push_str_lit(&mut out, &self.description);
        let _ = write!(
            out,
            " {} {} {} {} (caps",
            self.source.as_str(),
            self.priority,
            self.estimated_difficulty,
            self.potential_impact
        );
        for cap in &self.required_capabilities {
            out.push(' ');
            push_str_lit(&mut out, cap);
        }
        out.push_str(") (parents");
        for parent in &self.parents {
            let _ = write!(out, " {}", parent);
        }
        let _ = write!(out, ") (created {}))", self.created_at_ms);
        out
    }

    fn parse_record(input: &str) -> CogitoResult<Self> {
        decode_goal(&read_one(input)?)
    }
}

fn push_str_lit(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

fn push_attention_tv(out: &mut String, av: &AttentionValue, tv: &TruthValue) {
    let _ = write!(
        out,
        " (attention {} {} {}) (tv {} {})",
        av.sti, av.lti, av.vlti, tv.strength, tv.confidence
    );
}

// ---- reader ----

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    List(Vec<Expr>, usize),
    Symbol(String, usize),
    Str(String, usize),
}

impl Expr {
    fn offset(&self) -> usize {
        match self {
            Expr::List(_, o) | Expr::Symbol(_, o) | Expr::Str(_, o) => *o,
        }
    }

    fn error(&self, message: impl Into<String>) -> CogitoError {
        CogitoError::Parse {
            offset: self.offset(),
            message: message.into(),
        }
    }

    /// Leading symbol and the remaining items of a list.
    fn head(&self) -> CogitoResult<(&str, &[Expr])> {
        match self {
            Expr::List(items, _) => match items.split_first() {
                Some((Expr::Symbol(tag, _), rest)) => Ok((tag.as_str(), rest)),
                _ => Err(self.error("expected a tagged list")),
            },
            _ => Err(self.error("expected a list")),
        }
    }

    /// Items of a list whose head is `tag`.
    fn tagged(&self, tag: &str) -> CogitoResult<&[Expr]> {
        let (found, rest) = self.head()?;
        if found != tag {
            return Err(self.error(format!("expected `({} ...)`, found `({} ...)`", tag, found)));
        }
        Ok(rest)
    }

    fn symbol(&self) -> CogitoResult<&str> {
        match self {
            Expr::Symbol(s, _) => Ok(s),
            _ => Err(self.error("expected a bare token")),
        }
    }

    fn string(&self) -> CogitoResult<&str> {
        match self {
            Expr::Str(s, _) => Ok(s),
            _ => Err(self.error("expected a quoted string")),
        }
    }

    fn u64(&self) -> CogitoResult<u64> {
        let s = self.symbol()?;
        s.parse().map_err(|_| self.error(format!("invalid integer `{}`", s)))
    }

    fn i64(&self) -> CogitoResult<i64> {
        let s = self.symbol()?;
        s.parse().map_err(|_| self.error(format!("invalid integer `{}`", s)))
    }

    fn f64(&self) -> CogitoResult<f64> {
        let s = self.symbol()?;
        s.parse().map_err(|_| self.error(format!("invalid number `{}`", s)))
    }
}

/// Deepest list nesting the reader accepts. Records use three levels.
const MAX_DEPTH: usize = 16;

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn error(&self, message: impl Into<String>) -> CogitoError {
        CogitoError::Parse {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expr(&mut self) -> CogitoResult<Expr> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('(') => {
                if self.depth >= MAX_DEPTH {
                    return Err(self.error("nesting too deep"));
                }
                self.bump();
                self.depth += 1;
                let mut items = Vec::new();
                loop {
                    self.skip_ws();
                    match self.peek() {
                        Some(')') => {
                            self.bump();
                            self.depth -= 1;
                            return Ok(Expr::List(items, start));
                        }
                        None => return Err(self.error("unclosed `(`")),
                        _ => items.push(self.expr()?),
                    }
                }
            }
            Some(')') => Err(self.error("unexpected `)`")),
            Some('"') => {
                self.bump();
                let mut s = String::new();
                loop {
                    match self.bump() {
                        Some('"') => return Ok(Expr::Str(s, start)),
                        Some('\\') => match self.bump() {
                            Some(c @ ('"' | '\\')) => s.push(c),
                            Some(c) => return Err(self.error(format!("invalid escape `\\{}`", c))),
                            None => return Err(self.error("unterminated string")),
                        },
                        Some(c) => s.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            Some(_) => {
                while self
                    .peek()
                    .is_some_and(|c| !c.is_whitespace() && c != '(' && c != ')' && c != '"')
                {
                    self.bump();
                }
                Ok(Expr::Symbol(self.src[start..self.pos].to_string(), start))
            }
        }
    }
}

/// Reads exactly one expression; trailing non-whitespace is an error.
fn read_one(input: &str) -> CogitoResult<Expr> {
    let mut reader = Reader {
        src: input,
        pos: 0,
        depth: 0,
    };
    let expr = reader.expr()?;
    reader.skip_ws();
    if reader.peek().is_some() {
        return Err(reader.error("trailing input after record"));
    }
    Ok(expr)
}

fn arity<'e>(expr: &Expr, items: &'e [Expr], n: usize) -> CogitoResult<&'e [Expr]> {
    if items.len() != n {
        return Err(expr.error(format!("expected {} fields, found {}", n, items.len())));
    }
    Ok(items)
}

fn decode_attention_tv(av: &Expr, tv: &Expr) -> CogitoResult<(AttentionValue, TruthValue)> {
    let a = arity(av, av.tagged("attention")?, 3)?;
    let t = arity(tv, tv.tagged("tv")?, 2)?;
    Ok((
        AttentionValue::new(a[0].f64()?, a[1].f64()?, a[2].f64()?),
        TruthValue {
            strength: t[0].f64()?,
            confidence: t[1].f64()?,
        },
    ))
}

fn decode_node(expr: &Expr) -> CogitoResult<Node> {
    let f = arity(expr, expr.tagged("node")?, 5)?;
    let type_name = f[1].symbol()?;
    let node_type =
        NodeType::from_name(type_name).ok_or_else(|| f[1].error(format!("unknown node type `{}`", type_name)))?;
    let (attention, truth) = decode_attention_tv(&f[3], &f[4])?;
    Ok(Node {
        id: NodeId(f[0].u64()?),
        node_type,
        name: f[2].string()?.to_string(),
        attention,
        truth,
    })
}

fn decode_link(expr: &Expr) -> CogitoResult<Link> {
    let f = arity(expr, expr.tagged("link")?, 5)?;
    let link_type = match &f[1] {
        Expr::Symbol(name, _) => LinkType::from_builtin_name(name)
            .ok_or_else(|| f[1].error(format!("unknown link type `{}`", name)))?,
        list => {
            let label = arity(list, list.tagged("custom")?, 1)?;
            LinkType::Custom(label[0].string()?.to_string())
        }
    };
    let outgoing = match &f[2] {
        Expr::List(ids, _) if !ids.is_empty() => ids
            .iter()
            .map(|e| e.u64().map(NodeId))
            .collect::<CogitoResult<Vec<_>>>()?,
        other => return Err(other.error("expected a non-empty outgoing list")),
    };
    let (attention, truth) = decode_attention_tv(&f[3], &f[4])?;
    Ok(Link {
        id: LinkId(f[0].u64()?),
        link_type,
        outgoing,
        attention,
        truth,
    })
}

fn decode_goal(expr: &Expr) -> CogitoResult<AutonomousGoal> {
    let f = expr.tagged("goal")?;
    // The trailing parents/created fields are optional on input.
    if !(7..=9).contains(&f.len()) {
        return Err(expr.error(format!("expected 7 to 9 fields, found {}", f.len())));
    }
    let source_name = f[2].symbol()?;
    let source = GoalSource::from_name(source_name)
        .ok_or_else(|| f[2].error(format!("unknown goal source `{}`", source_name)))?;
    let required_capabilities = f[6]
        .tagged("caps")?
        .iter()
        .map(|e| e.string().map(str::to_string))
        .collect::<CogitoResult<BTreeSet<_>>>()?;

    let mut parents = BTreeSet::new();
    let mut created_at_ms = 0;
    for extra in &f[7..] {
        match extra.head()? {
            ("parents", ids) => {
                parents = ids.iter().map(Expr::u64).collect::<CogitoResult<_>>()?;
            }
            ("created", ms) => created_at_ms = arity(extra, ms, 1)?[0].i64()?,
            (other, _) => return Err(extra.error(format!("unknown goal field `{}`", other))),
        }
    }

    Ok(AutonomousGoal {
        id: f[0].u64()?,
        description: f[1].string()?.to_string(),
        source,
        priority: f[3].f64()?,
        estimated_difficulty: f[4].f64()?,
        potential_impact: f[5].f64()?,
        required_capabilities,
        created_at_ms,
        parents,
    })
}

/// Parses any record type.
pub fn parse_record(input: &str) -> CogitoResult<Record> {
    Record::parse_record(input)
}
