//! In-memory typed hypergraph of nodes and links.
//!
//! ## Ownership
//!
//! The store is an arena: nodes and links live in id-indexed slots and every
//! cross-reference (link outgoing lists, the incoming index) is a plain id. Ids start
//! at 0, grow monotonically per kind, and are never reused after removal.
//!
//! | Structure        | Maps                      | Maintained by                  |
//! |------------------|---------------------------|--------------------------------|
//! | `nodes`          | `NodeId -> Node`          | `add_node`, `remove_node`      |
//! | `links`          | `LinkId -> Link`          | `add_link`, `remove_link`      |
//! | `name_index`     | `name -> {NodeId}`        | `add_node`, `remove_node`      |
//! | `incoming`       | `NodeId -> {LinkId}`      | `add_link`, `remove_link`      |
//!
//! Every id in a live link's outgoing list is a live node. Mutations validate first and
//! only then touch any structure, so a rejected call leaves the store unchanged.

mod atom;
mod pattern;

pub use atom::{
    AtomRecord, AtomRef, AttentionValue, Handle, Link, LinkId, LinkType, Node, NodeId, NodeType,
    TruthValue,
};
pub use pattern::{AtomTypeFilter, Pattern};

use std::collections::{BTreeSet, HashMap};

use crate::error::{CogitoError, CogitoResult};
use crate::shared::BoundsPolicy;

/// Hypergraph store. Clone it to take a snapshot.
#[derive(Debug, Clone, Default)]
pub struct AtomSpace {
    nodes: Vec<Option<Node>>,
    links: Vec<Option<Link>>,
    live_nodes: usize,
    live_links: usize,
    name_index: HashMap<String, BTreeSet<NodeId>>,
    incoming: HashMap<NodeId, BTreeSet<LinkId>>,
    bounds: BoundsPolicy,
}

impl AtomSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose truth-value writes follow `bounds`.
    pub fn with_bounds(bounds: BoundsPolicy) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    pub fn bounds(&self) -> BoundsPolicy {
        self.bounds
    }

    /// Adds a node. Duplicate names are allowed and always produce a new id.
    pub fn add_node(&mut self, node_type: NodeType, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        let name = name.into();
        self.name_index.entry(name.clone()).or_default().insert(id);
        tracing::debug!(target: "cogito::atomspace", %id, ?node_type, name = %name, "node added");
        self.nodes.push(Some(Node {
            id,
            node_type,
            name,
            attention: AttentionValue::default(),
            truth: TruthValue::default(),
        }));
        self.live_nodes += 1;
        id
    }

    /// Adds a link over existing nodes. Fails with `UnknownAtom` on the first missing id.
    pub fn add_link(&mut self, link_type: LinkType, outgoing: Vec<NodeId>) -> CogitoResult<LinkId> {
        if outgoing.is_empty() {
            return Err(CogitoError::EmptyOutgoing);
        }
        if let Some(missing) = outgoing.iter().find(|id| self.node(**id).is_none()) {
            return Err(CogitoError::UnknownAtom(Handle::Node(*missing)));
        }

        let id = LinkId(self.links.len() as u64);
        for target in &outgoing {
            self.incoming.entry(*target).or_default().insert(id);
        }
        tracing::debug!(target: "cogito::atomspace", %id, ?link_type, arity = outgoing.len(), "link added");
        self.links.push(Some(Link {
            id,
            link_type,
            outgoing,
            attention: AttentionValue::default(),
            truth: TruthValue::default(),
        }));
        self.live_links += 1;
        Ok(id)
    }

    /// Removes a node. A node still referenced by links is only removed when `cascade`
    /// is set, in which case the referencing links go first.
    pub fn remove_node(&mut self, id: NodeId, cascade: bool) -> CogitoResult<Node> {
        if self.node(id).is_none() {
            return Err(CogitoError::UnknownAtom(Handle::Node(id)));
        }
        let referencing: Vec<LinkId> = self
            .incoming
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        if !referencing.is_empty() && !cascade {
            return Err(CogitoError::AtomInUse {
                node: Handle::Node(id),
                links: referencing.len(),
            });
        }
        for link in referencing {
            self.remove_link(link)?;
        }

        let node = self.nodes[id.0 as usize]
            .take()
            .ok_or(CogitoError::UnknownAtom(Handle::Node(id)))?;
        if let Some(ids) = self.name_index.get_mut(&node.name) {
            ids.remove(&id);
            if ids.is_empty() {
                self.name_index.remove(&node.name);
            }
        }
        self.incoming.remove(&id);
        self.live_nodes -= 1;
        tracing::debug!(target: "cogito::atomspace", %id, cascade, "node removed");
        Ok(node)
    }

    /// Removes a link and its entries in the incoming index.
    pub fn remove_link(&mut self, id: LinkId) -> CogitoResult<Link> {
        let link = self
            .links
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(CogitoError::UnknownAtom(Handle::Link(id)))?;
        for target in &link.outgoing {
            if let Some(set) = self.incoming.get_mut(target) {
                set.remove(&id);
                if set.is_empty() {
                    self.incoming.remove(target);
                }
            }
        }
        self.live_links -= 1;
        tracing::debug!(target: "cogito::atomspace", %id, "link removed");
        Ok(link)
    }

    /// Ids of all live nodes with exactly this name, ascending.
    pub fn find_by_name(&self, name: &str) -> Vec<NodeId> {
        self.name_index
            .get(name)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Links whose outgoing list contains `id`, ascending. Empty for isolated nodes.
    pub fn get_incoming(&self, id: NodeId) -> CogitoResult<Vec<LinkId>> {
        if self.node(id).is_none() {
            return Err(CogitoError::UnknownAtom(Handle::Node(id)));
        }
        Ok(self
            .incoming
            .get(&id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Lazily yields atoms matching `pattern`, nodes first then links, ascending id.
    ///
    /// The scan reads the live store as it advances; call again to restart it. Clone the
    /// store first for a frozen view.
    pub fn pattern_match<'a>(&'a self, pattern: &'a Pattern) -> impl Iterator<Item = AtomRef<'a>> + 'a {
        self.nodes()
            .map(AtomRef::Node)
            .chain(self.links().map(AtomRef::Link))
            .filter(move |atom| pattern.matches(*atom))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get(&self, handle: Handle) -> Option<AtomRef<'_>> {
        match handle {
            Handle::Node(id) => self.node(id).map(AtomRef::Node),
            Handle::Link(id) => self.link(id).map(AtomRef::Link),
        }
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Live nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    /// Live links in ascending id order.
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().filter_map(Option::as_ref)
    }

    /// Every live atom handle, nodes first.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.nodes()
            .map(|n| Handle::Node(n.id))
            .chain(self.links().map(|l| Handle::Link(l.id)))
    }

    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    pub fn link_count(&self) -> usize {
        self.live_links
    }

    /// Atoms one relation away: a node's incoming links, or a link's distinct outgoing nodes.
    pub fn neighbours(&self, handle: Handle) -> CogitoResult<Vec<Handle>> {
        match handle {
            Handle::Node(id) => Ok(self
                .get_incoming(id)?
                .into_iter()
                .map(Handle::Link)
                .collect()),
            Handle::Link(id) => {
                let link = self.link(id).ok_or(CogitoError::UnknownAtom(handle))?;
                let distinct: BTreeSet<NodeId> = link.outgoing.iter().copied().collect();
                Ok(distinct.into_iter().map(Handle::Node).collect())
            }
        }
    }

    pub fn attention(&self, handle: Handle) -> CogitoResult<AttentionValue> {
        self.get(handle)
            .map(|atom| atom.attention())
            .ok_or(CogitoError::UnknownAtom(handle))
    }

    /// Mutable attention slot. Only the attention allocator writes through this.
    pub(crate) fn attention_mut(&mut self, handle: Handle) -> CogitoResult<&mut AttentionValue> {
        let slot = match handle {
            Handle::Node(id) => self
                .nodes
                .get_mut(id.0 as usize)
                .and_then(Option::as_mut)
                .map(|n| &mut n.attention),
            Handle::Link(id) => self
                .links
                .get_mut(id.0 as usize)
                .and_then(Option::as_mut)
                .map(|l| &mut l.attention),
        };
        slot.ok_or(CogitoError::UnknownAtom(handle))
    }

    /// Sets an atom's truth value, applying the store's bounds policy.
    pub fn set_truth_value(&mut self, handle: Handle, strength: f64, confidence: f64) -> CogitoResult<()> {
        if !self.contains(handle) {
            return Err(CogitoError::UnknownAtom(handle));
        }
        let tv = TruthValue::checked(strength, confidence, self.bounds)?;
        match handle {
            Handle::Node(id) => {
                if let Some(node) = self.nodes[id.0 as usize].as_mut() {
                    node.truth = tv;
                }
            }
            Handle::Link(id) => {
                if let Some(link) = self.links[id.0 as usize].as_mut() {
                    link.truth = tv;
                }
            }
        }
        Ok(())
    }

    /// Independent copy for readers that must not observe later writes.
    pub fn snapshot(&self) -> AtomSpace {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animals() -> (AtomSpace, NodeId, NodeId, LinkId) {
        let mut space = AtomSpace::new();
        let cat = space.add_node(NodeType::Concept, "cat");
        let animal = space.add_node(NodeType::Concept, "animal");
        let link = space
            .add_link(LinkType::Inheritance, vec![cat, animal])
            .unwrap();
        (space, cat, animal, link)
    }

    #[test]
    fn duplicate_names_get_distinct_ids() {
        let mut space = AtomSpace::new();
        let a = space.add_node(NodeType::Concept, "dog");
        let b = space.add_node(NodeType::Concept, "dog");
        assert_ne!(a, b);
        assert_eq!(space.find_by_name("dog"), vec![a, b]);
        assert!(space.find_by_name("wolf").is_empty());
    }

    #[test]
    fn new_atoms_have_default_values() {
        let (space, cat, _, link) = animals();
        let node = space.node(cat).unwrap();
        assert_eq!(node.truth, TruthValue { strength: 1.0, confidence: 1.0 });
        assert_eq!(node.attention, AttentionValue::default());
        assert_eq!(space.link(link).unwrap().truth, TruthValue::default());
    }

    #[test]
    fn add_link_with_unknown_id_leaves_store_unchanged() {
        let (mut space, cat, _, _) = animals();
        let before = (space.node_count(), space.link_count());
        let err = space
            .add_link(LinkType::Similarity, vec![cat, NodeId(99)])
            .unwrap_err();
        assert_eq!(err, CogitoError::UnknownAtom(Handle::Node(NodeId(99))));
        assert_eq!((space.node_count(), space.link_count()), before);
        assert_eq!(space.get_incoming(cat).unwrap().len(), 1);
    }

    #[test]
    fn add_link_rejects_empty_outgoing() {
        let mut space = AtomSpace::new();
        assert_eq!(
            space.add_link(LinkType::Execution, vec![]),
            Err(CogitoError::EmptyOutgoing)
        );
    }

    #[test]
    fn outgoing_order_is_preserved() {
        let (space, cat, animal, link) = animals();
        assert_eq!(space.link(link).unwrap().outgoing, vec![cat, animal]);
    }

    #[test]
    fn incoming_index_counts_repeated_targets_once() {
        let mut space = AtomSpace::new();
        let x = space.add_node(NodeType::Concept, "x");
        let link = space.add_link(LinkType::Similarity, vec![x, x]).unwrap();
        assert_eq!(space.get_incoming(x).unwrap(), vec![link]);
        assert_eq!(space.neighbours(Handle::Link(link)).unwrap(), vec![Handle::Node(x)]);
    }

    #[test]
    fn get_incoming_on_unknown_node_fails() {
        let space = AtomSpace::new();
        assert_eq!(
            space.get_incoming(NodeId(3)),
            Err(CogitoError::UnknownAtom(Handle::Node(NodeId(3))))
        );
    }

    #[test]
    fn isolated_node_has_empty_incoming() {
        let mut space = AtomSpace::new();
        let lone = space.add_node(NodeType::Predicate, "lonely");
        assert!(space.get_incoming(lone).unwrap().is_empty());
    }

    #[test]
    fn non_cascading_remove_of_referenced_node_is_rejected() {
        let (mut space, cat, _, _) = animals();
        let err = space.remove_node(cat, false).unwrap_err();
        assert!(matches!(err, CogitoError::AtomInUse { links: 1, .. }));
        assert_eq!(space.node_count(), 2);
        assert_eq!(space.link_count(), 1);
    }

    #[test]
    fn cascading_remove_drops_referencing_links() {
        let (mut space, cat, animal, link) = animals();
        let removed = space.remove_node(cat, true).unwrap();
        assert_eq!(removed.name, "cat");
        assert!(space.link(link).is_none());
        assert_eq!(space.link_count(), 0);
        assert!(space.get_incoming(animal).unwrap().is_empty());
        assert!(space.find_by_name("cat").is_empty());
    }

    #[test]
    fn remove_link_cleans_incoming_index() {
        let (mut space, cat, animal, link) = animals();
        space.remove_link(link).unwrap();
        assert!(space.get_incoming(cat).unwrap().is_empty());
        assert!(space.get_incoming(animal).unwrap().is_empty());
        assert!(space.remove_link(link).is_err());
        space.remove_node(cat, false).unwrap();
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut space = AtomSpace::new();
        let a = space.add_node(NodeType::Concept, "a");
        space.remove_node(a, false).unwrap();
        let b = space.add_node(NodeType::Concept, "a");
        assert!(b > a);
    }

    #[test]
    fn pattern_match_filters_by_type_name_and_shape() {
        let (mut space, cat, animal, link) = animals();
        space.add_node(NodeType::Predicate, "cat");

        let concept_cats: Vec<Handle> = space
            .pattern_match(&Pattern::any().of_type(AtomTypeFilter::Node(NodeType::Concept)).named("cat"))
            .map(|a| a.handle())
            .collect();
        assert_eq!(concept_cats, vec![Handle::Node(cat)]);

        let shape = Pattern::any().with_outgoing(vec![None, Some(animal)]);
        let hits: Vec<Handle> = space.pattern_match(&shape).map(|a| a.handle()).collect();
        assert_eq!(hits, vec![Handle::Link(link)]);

        let wrong_arity = Pattern::any().with_outgoing(vec![None]);
        assert_eq!(space.pattern_match(&wrong_arity).count(), 0);

        assert_eq!(space.pattern_match(&Pattern::any()).count(), 4);
        let links = Pattern::any().of_type(AtomTypeFilter::AnyLink);
        assert_eq!(space.pattern_match(&links).count(), 1);
    }

    #[test]
    fn pattern_match_is_restartable_and_sees_live_store() {
        let (mut space, _, _, _) = animals();
        let concepts = Pattern::any().of_type(AtomTypeFilter::AnyNode);
        assert_eq!(space.pattern_match(&concepts).count(), 2);
        assert_eq!(space.pattern_match(&concepts).count(), 2);
        space.add_node(NodeType::Variable, "$x");
        assert_eq!(space.pattern_match(&concepts).count(), 3);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let (mut space, _, _, _) = animals();
        let frozen = space.snapshot();
        space.add_node(NodeType::Concept, "bird");
        assert_eq!(frozen.node_count(), 2);
        assert_eq!(space.node_count(), 3);
    }

    #[test]
    fn truth_value_writes_follow_bounds_policy() {
        let (mut space, cat, _, _) = animals();
        space.set_truth_value(Handle::Node(cat), 1.4, 0.5).unwrap();
        assert_eq!(space.node(cat).unwrap().truth.strength, 1.0);

        let mut strict = AtomSpace::with_bounds(BoundsPolicy::Reject);
        let n = strict.add_node(NodeType::Concept, "n");
        assert!(strict.set_truth_value(Handle::Node(n), 0.2, -0.1).is_err());
        assert_eq!(strict.node(n).unwrap().truth, TruthValue::default());
        assert!(strict.set_truth_value(Handle::Node(NodeId(9)), 0.2, 0.2).is_err());
    }
}
