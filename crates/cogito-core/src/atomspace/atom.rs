//! Atom value types: typed ids, node/link type tags, attention and truth values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CogitoResult;
use crate::shared::BoundsPolicy;

/// Identity of a node. Assigned monotonically, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Identity of a link. Separate id space from [`NodeId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub u64);

/// Reference to any atom in the store. Orders nodes before links, then by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Handle {
    Node(NodeId),
    Link(LinkId),
}

impl From<NodeId> for Handle {
    fn from(id: NodeId) -> Self {
        Handle::Node(id)
    }
}

impl From<LinkId> for Handle {
    fn from(id: LinkId) -> Self {
        Handle::Link(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Node(id) => id.fmt(f),
            Handle::Link(id) => id.fmt(f),
        }
    }
}

/// Closed set of node type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Concept,
    Predicate,
    Variable,
    Number,
    LinkType,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Concept => "Concept",
            NodeType::Predicate => "Predicate",
            NodeType::Variable => "Variable",
            NodeType::Number => "Number",
            NodeType::LinkType => "LinkType",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Concept" => Some(Self::Concept),
            "Predicate" => Some(Self::Predicate),
            "Variable" => Some(Self::Variable),
            "Number" => Some(Self::Number),
            "LinkType" => Some(Self::LinkType),
            _ => None,
        }
    }
}

/// Link type tags. `Custom` carries a free-form label.
///
/// Outgoing order is significant: for `Inheritance`, `outgoing[0]` inherits from `outgoing[1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    Inheritance,
    Similarity,
    Implication,
    Evaluation,
    Execution,
    Custom(String),
}

impl LinkType {
    /// Tag for the built-in variants; `None` for `Custom`.
    pub fn builtin_name(&self) -> Option<&'static str> {
        match self {
            LinkType::Inheritance => Some("Inheritance"),
            LinkType::Similarity => Some("Similarity"),
            LinkType::Implication => Some("Implication"),
            LinkType::Evaluation => Some("Evaluation"),
            LinkType::Execution => Some("Execution"),
            LinkType::Custom(_) => None,
        }
    }

    pub fn from_builtin_name(name: &str) -> Option<Self> {
        match name {
            "Inheritance" => Some(Self::Inheritance),
            "Similarity" => Some(Self::Similarity),
            "Implication" => Some(Self::Implication),
            "Evaluation" => Some(Self::Evaluation),
            "Execution" => Some(Self::Execution),
            _ => None,
        }
    }
}

/// Short-, long- and very-long-term importance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttentionValue {
    pub sti: f64,
    pub lti: f64,
    pub vlti: f64,
}

impl AttentionValue {
    pub fn new(sti: f64, lti: f64, vlti: f64) -> Self {
        Self { sti, lti, vlti }
    }
}

/// Believed degree of truth and the certainty of that belief, both in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthValue {
    pub strength: f64,
    pub confidence: f64,
}

impl Default for TruthValue {
    fn default() -> Self {
        Self {
            strength: 1.0,
            confidence: 1.0,
        }
    }
}

impl TruthValue {
    /// Builds a truth value, applying `policy` to each component.
    pub fn checked(strength: f64, confidence: f64, policy: BoundsPolicy) -> CogitoResult<Self> {
        Ok(Self {
            strength: policy.apply("strength", strength, 0.0, 1.0)?,
            confidence: policy.apply("confidence", confidence, 0.0, 1.0)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    /// Not required to be unique.
    pub name: String,
    pub attention: AttentionValue,
    pub truth: TruthValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub link_type: LinkType,
    /// Ordered, non-empty. Ids only; the link does not own its nodes.
    pub outgoing: Vec<NodeId>,
    pub attention: AttentionValue,
    pub truth: TruthValue,
}

/// Borrowed view of an atom in the live store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AtomRef<'a> {
    Node(&'a Node),
    Link(&'a Link),
}

impl<'a> AtomRef<'a> {
    pub fn handle(&self) -> Handle {
        match self {
            AtomRef::Node(n) => Handle::Node(n.id),
            AtomRef::Link(l) => Handle::Link(l.id),
        }
    }

    pub fn attention(&self) -> AttentionValue {
        match self {
            AtomRef::Node(n) => n.attention,
            AtomRef::Link(l) => l.attention,
        }
    }

    pub fn truth(&self) -> TruthValue {
        match self {
            AtomRef::Node(n) => n.truth,
            AtomRef::Link(l) => l.truth,
        }
    }

    pub fn to_atom_record(&self) -> AtomRecord {
        match self {
            AtomRef::Node(n) => AtomRecord::Node((*n).clone()),
            AtomRef::Link(l) => AtomRecord::Link((*l).clone()),
        }
    }
}

/// Owned copy of an atom, exchanged with collaborators and the record codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AtomRecord {
    Node(Node),
    Link(Link),
}

impl AtomRecord {
    pub fn handle(&self) -> Handle {
        match self {
            AtomRecord::Node(n) => Handle::Node(n.id),
            AtomRecord::Link(l) => Handle::Link(l.id),
        }
    }

    pub fn view(&self) -> AtomRef<'_> {
        match self {
            AtomRecord::Node(n) => AtomRef::Node(n),
            AtomRecord::Link(l) => AtomRef::Link(l),
        }
    }
}
