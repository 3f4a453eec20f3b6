//! Declarative atom filters evaluated lazily against the live store.

use serde::{Deserialize, Serialize};

use super::atom::{AtomRef, LinkType, NodeId, NodeType};

/// Type constraint for a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtomTypeFilter {
    Node(NodeType),
    Link(LinkType),
    AnyNode,
    AnyLink,
}

impl AtomTypeFilter {
    fn accepts(&self, atom: AtomRef<'_>) -> bool {
        match (self, atom) {
            (AtomTypeFilter::AnyNode, AtomRef::Node(_)) => true,
            (AtomTypeFilter::AnyLink, AtomRef::Link(_)) => true,
            (AtomTypeFilter::Node(t), AtomRef::Node(n)) => n.node_type == *t,
            (AtomTypeFilter::Link(t), AtomRef::Link(l)) => l.link_type == *t,
            _ => false,
        }
    }
}

/// Conjunction of optional filters. An empty pattern matches every atom.
///
/// A name filter only matches nodes; an outgoing-shape filter only matches links whose
/// outgoing list has the same length, where `None` positions are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub atom_type: Option<AtomTypeFilter>,
    pub name: Option<String>,
    pub outgoing: Option<Vec<Option<NodeId>>>,
}

impl Pattern {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of_type(mut self, filter: AtomTypeFilter) -> Self {
        self.atom_type = Some(filter);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_outgoing(mut self, shape: Vec<Option<NodeId>>) -> Self {
        self.outgoing = Some(shape);
        self
    }

    pub fn matches(&self, atom: AtomRef<'_>) -> bool {
        if let Some(filter) = &self.atom_type {
            if !filter.accepts(atom) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            match atom {
                AtomRef::Node(n) if &n.name == name => {}
                _ => return false,
            }
        }
        if let Some(shape) = &self.outgoing {
            let AtomRef::Link(link) = atom else {
                return false;
            };
            if link.outgoing.len() != shape.len() {
                return false;
            }
            let fits = shape
                .iter()
                .zip(&link.outgoing)
                .all(|(want, have)| want.map_or(true, |w| w == *have));
            if !fits {
                return false;
            }
        }
        true
    }
}
