//! Economic attention allocation over the AtomSpace.
//!
//! STI moves between atoms and a central bank: stimulation and spreading inject it,
//! rent moves it from atoms in the attentional focus into the bank pool. Rent collection
//! is zero-sum: `total_sti + bank_pool` is unchanged by [`AttentionAllocator::collect_rent`].
//!
//! The allocator is the only writer of attention fields; callers hold it exclusively
//! (the context keeps it behind a mutex) so concurrent stimulation of one atom is serialized.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::atomspace::{AtomSpace, Handle};
use crate::error::{CogitoError, CogitoResult};
use crate::shared::AttentionConfig;

/// Which importance figure to rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportanceMetric {
    Sti,
    Lti,
}

/// Outcome of one spreading-activation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadReport {
    /// Atoms whose STI changed (the source is not counted).
    pub touched: usize,
    /// Deepest hop that delivered any stimulus.
    pub max_hop: usize,
    /// Sum of STI actually added across all touched atoms.
    pub distributed: f64,
}

pub struct AttentionAllocator {
    config: AttentionConfig,
    bank_pool: f64,
}

impl AttentionAllocator {
    pub fn new(config: AttentionConfig) -> Self {
        Self {
            config,
            bank_pool: 0.0,
        }
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }

    /// STI currently held by the bank.
    pub fn bank_pool(&self) -> f64 {
        self.bank_pool
    }

    fn checked_sti(&self, value: f64) -> CogitoResult<f64> {
        self.config
            .bounds
            .apply("sti", value, self.config.sti_min(), self.config.bank_capacity)
    }

    /// Adds `amount` to an atom's STI, bounded by the bank capacity. Returns the new STI.
    pub fn stimulate(&mut self, space: &mut AtomSpace, handle: Handle, amount: f64) -> CogitoResult<f64> {
        let current = space.attention(handle)?.sti;
        let next = self.checked_sti(current + amount)?;
        space.attention_mut(handle)?.sti = next;
        tracing::debug!(target: "cogito::attention", %handle, amount, sti = next, "stimulated");
        Ok(next)
    }

    /// Sets LTI and VLTI for an atom. LTI is bounded to `[0, lti_max]`, VLTI to `[0, 1]`.
    pub fn set_long_term(&mut self, space: &mut AtomSpace, handle: Handle, lti: f64, vlti: f64) -> CogitoResult<()> {
        space.attention(handle)?;
        let lti = self.config.bounds.apply("lti", lti, 0.0, self.config.lti_max)?;
        let vlti = self.config.bounds.apply("vlti", vlti, 0.0, 1.0)?;
        let av = space.attention_mut(handle)?;
        av.lti = lti;
        av.vlti = vlti;
        Ok(())
    }

    /// Spreads `amount` outward from `source` along incoming/outgoing relations.
    ///
    /// Each hop multiplies the carried amount by `decay_factor` and divides it evenly over
    /// the unvisited neighbours. Every atom is stimulated at most once; shares below the
    /// configured epsilon are dropped; nothing travels past `max_hops`. Writes rejected by
    /// the bounds policy stop propagation through that atom.
    pub fn spread_activation(
        &mut self,
        space: &mut AtomSpace,
        source: Handle,
        amount: f64,
        decay_factor: f64,
        max_hops: usize,
    ) -> CogitoResult<SpreadReport> {
        if !space.contains(source) {
            return Err(CogitoError::UnknownAtom(source));
        }
        if !(decay_factor > 0.0 && decay_factor < 1.0) {
            return Err(CogitoError::ValueOutOfRange {
                field: "decay_factor",
                value: decay_factor,
                min: 0.0,
                max: 1.0,
            });
        }

        let mut report = SpreadReport::default();
        let mut visited: BTreeSet<Handle> = BTreeSet::from([source]);
        let mut frontier: Vec<(Handle, f64)> = vec![(source, amount)];

        for hop in 1..=max_hops {
            let mut arriving: BTreeMap<Handle, f64> = BTreeMap::new();
            for (atom, carried) in &frontier {
                let targets: Vec<Handle> = space
                    .neighbours(*atom)?
                    .into_iter()
                    .filter(|n| !visited.contains(n))
                    .collect();
                if targets.is_empty() {
                    continue;
                }
                let share = carried * decay_factor / targets.len() as f64;
                if share.abs() < self.config.epsilon {
                    continue;
                }
                for target in targets {
                    *arriving.entry(target).or_insert(0.0) += share;
                }
            }
            if arriving.is_empty() {
                break;
            }

            frontier.clear();
            for (target, share) in arriving {
                visited.insert(target);
                let before = space.attention(target)?.sti;
                match self.checked_sti(before + share) {
                    Ok(after) => {
                        space.attention_mut(target)?.sti = after;
                        report.touched += 1;
                        report.distributed += after - before;
                        report.max_hop = hop;
                        frontier.push((target, share));
                    }
                    Err(e) => {
                        tracing::debug!(target: "cogito::attention", %target, error = %e, "spread write rejected");
                    }
                }
            }
        }

        tracing::debug!(
            target: "cogito::attention",
            %source,
            touched = report.touched,
            max_hop = report.max_hop,
            "activation spread"
        );
        Ok(report)
    }

    /// Charges `rent_rate · STI` to every atom in the attentional focus and deposits it in
    /// the bank. Returns the total collected.
    pub fn collect_rent(&mut self, space: &mut AtomSpace, rent_rate: f64) -> CogitoResult<f64> {
        if !(0.0..=1.0).contains(&rent_rate) {
            return Err(CogitoError::ValueOutOfRange {
                field: "rent_rate",
                value: rent_rate,
                min: 0.0,
                max: 1.0,
            });
        }
        let mut collected = 0.0;
        for handle in self.attentional_focus(space) {
            let before = space.attention(handle)?.sti;
            let Ok(after) = self.checked_sti(before - rent_rate * before) else {
                continue;
            };
            space.attention_mut(handle)?.sti = after;
            // Deposit what actually left the atom so clamping cannot create or destroy STI.
            collected += before - after;
        }
        self.bank_pool += collected;
        tracing::debug!(target: "cogito::attention", collected, bank_pool = self.bank_pool, "rent collected");
        Ok(collected)
    }

    /// Multiplies every atom's LTI by `1 - rate`.
    pub fn decay_lti(&mut self, space: &mut AtomSpace, rate: f64) -> CogitoResult<()> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(CogitoError::ValueOutOfRange {
                field: "lti_decay_rate",
                value: rate,
                min: 0.0,
                max: 1.0,
            });
        }
        let handles: Vec<Handle> = space.handles().collect();
        for handle in handles {
            space.attention_mut(handle)?.lti *= 1.0 - rate;
        }
        Ok(())
    }

    /// Atoms with STI strictly above the focus threshold, in handle order.
    pub fn attentional_focus(&self, space: &AtomSpace) -> Vec<Handle> {
        space
            .pattern_match(&Default::default())
            .filter(|atom| atom.attention().sti > self.config.focus_threshold)
            .map(|atom| atom.handle())
            .collect()
    }

    /// Sum of STI across every atom in the store.
    pub fn total_sti(&self, space: &AtomSpace) -> f64 {
        space.handles().filter_map(|h| space.attention(h).ok()).map(|av| av.sti).sum()
    }

    /// Top `n` atoms by `metric`, descending; ties go to the lower handle.
    pub fn get_most_important(&self, space: &AtomSpace, n: usize, metric: ImportanceMetric) -> Vec<(Handle, f64)> {
        let mut ranked: Vec<(Handle, f64)> = space
            .handles()
            .filter_map(|h| space.attention(h).ok().map(|av| (h, av)))
            .map(|(h, av)| match metric {
                ImportanceMetric::Sti => (h, av.sti),
                ImportanceMetric::Lti => (h, av.lti),
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomspace::{LinkType, NodeId, NodeType};
    use crate::shared::BoundsPolicy;

    fn allocator() -> AttentionAllocator {
        AttentionAllocator::new(AttentionConfig::default())
    }

    fn chain() -> (AtomSpace, NodeId, NodeId, Handle) {
        let mut space = AtomSpace::new();
        let a = space.add_node(NodeType::Concept, "a");
        let b = space.add_node(NodeType::Concept, "b");
        let link = space.add_link(LinkType::Inheritance, vec![a, b]).unwrap();
        (space, a, b, Handle::Link(link))
    }

    #[test]
    fn stimulate_clamps_to_bank_capacity() {
        let (mut space, a, _, _) = chain();
        let mut alloc = allocator();
        assert_eq!(alloc.stimulate(&mut space, a.into(), 30.0).unwrap(), 30.0);
        assert_eq!(alloc.stimulate(&mut space, a.into(), 500.0).unwrap(), 100.0);
        assert_eq!(space.attention(a.into()).unwrap().sti, 100.0);
    }

    #[test]
    fn stimulate_under_reject_policy_leaves_value_unchanged() {
        let (mut space, a, _, _) = chain();
        let mut alloc = AttentionAllocator::new(AttentionConfig {
            bounds: BoundsPolicy::Reject,
            ..AttentionConfig::default()
        });
        alloc.stimulate(&mut space, a.into(), 90.0).unwrap();
        assert!(matches!(
            alloc.stimulate(&mut space, a.into(), 20.0),
            Err(CogitoError::ValueOutOfRange { field: "sti", .. })
        ));
        assert_eq!(space.attention(a.into()).unwrap().sti, 90.0);
    }

    #[test]
    fn stimulate_unknown_atom_fails() {
        let mut space = AtomSpace::new();
        let err = allocator()
            .stimulate(&mut space, Handle::Node(NodeId(4)), 1.0)
            .unwrap_err();
        assert_eq!(err, CogitoError::UnknownAtom(Handle::Node(NodeId(4))));
    }

    #[test]
    fn spread_decays_per_hop() {
        let (mut space, a, b, link) = chain();
        let report = allocator()
            .spread_activation(&mut space, a.into(), 1.0, 0.5, 5)
            .unwrap();
        assert_eq!(space.attention(link).unwrap().sti, 0.5);
        assert_eq!(space.attention(b.into()).unwrap().sti, 0.25);
        assert_eq!(space.attention(a.into()).unwrap().sti, 0.0);
        assert_eq!(report.touched, 2);
        assert_eq!(report.max_hop, 2);
        assert_eq!(report.distributed, 0.75);
    }

    #[test]
    fn spread_respects_epsilon_and_hop_limit() {
        let (mut space, a, b, link) = chain();
        let mut alloc = AttentionAllocator::new(AttentionConfig {
            epsilon: 0.3,
            ..AttentionConfig::default()
        });
        alloc.spread_activation(&mut space, a.into(), 1.0, 0.5, 5).unwrap();
        assert_eq!(space.attention(link).unwrap().sti, 0.5);
        assert_eq!(space.attention(b.into()).unwrap().sti, 0.0);

        let (mut space, a, b, link) = chain();
        let report = allocator()
            .spread_activation(&mut space, a.into(), 1.0, 0.5, 1)
            .unwrap();
        assert_eq!(report.max_hop, 1);
        assert_eq!(space.attention(link).unwrap().sti, 0.5);
        assert_eq!(space.attention(b.into()).unwrap().sti, 0.0);
    }

    #[test]
    fn spread_terminates_on_two_cycle() {
        for decay in [0.01, 0.5, 0.9, 0.999] {
            let mut space = AtomSpace::new();
            let a = space.add_node(NodeType::Concept, "a");
            let b = space.add_node(NodeType::Concept, "b");
            space.add_link(LinkType::Similarity, vec![a, b]).unwrap();
            space.add_link(LinkType::Similarity, vec![b, a]).unwrap();
            let report = allocator()
                .spread_activation(&mut space, a.into(), 10.0, decay, 6)
                .unwrap();
            assert!(report.max_hop <= 6);
            assert!(report.touched <= 3);
        }
    }

    #[test]
    fn spread_rejects_bad_decay_and_unknown_source() {
        let (mut space, a, _, _) = chain();
        let mut alloc = allocator();
        assert!(alloc.spread_activation(&mut space, a.into(), 1.0, 1.0, 3).is_err());
        assert!(alloc.spread_activation(&mut space, a.into(), 1.0, 0.0, 3).is_err());
        assert!(alloc
            .spread_activation(&mut space, Handle::Node(NodeId(7)), 1.0, 0.5, 3)
            .is_err());
    }

    #[test]
    fn collect_rent_is_zero_sum() {
        let (mut space, a, b, link) = chain();
        let mut alloc = allocator();
        alloc.stimulate(&mut space, a.into(), 10.0).unwrap();
        alloc.stimulate(&mut space, b.into(), 0.2).unwrap();
        alloc.stimulate(&mut space, link, 5.0).unwrap();

        let before = alloc.total_sti(&space) + alloc.bank_pool();
        let collected = alloc.collect_rent(&mut space, 0.1).unwrap();
        let after = alloc.total_sti(&space) + alloc.bank_pool();

        assert!((before - after).abs() < 1e-9);
        assert!((collected - 1.5).abs() < 1e-9);
        // Below the focus threshold: untouched.
        assert_eq!(space.attention(b.into()).unwrap().sti, 0.2);
        assert!((space.attention(a.into()).unwrap().sti - 9.0).abs() < 1e-9);
    }

    #[test]
    fn collect_rent_is_zero_sum_when_floor_clamps() {
        let (mut space, a, _, _) = chain();
        let mut alloc = AttentionAllocator::new(AttentionConfig {
            sti_floor: Some(8.0),
            ..AttentionConfig::default()
        });
        alloc.stimulate(&mut space, a.into(), 10.0).unwrap();
        let before = alloc.total_sti(&space) + alloc.bank_pool();
        let collected = alloc.collect_rent(&mut space, 0.5).unwrap();
        assert_eq!(collected, 2.0);
        assert_eq!(alloc.total_sti(&space) + alloc.bank_pool(), before);
    }

    #[test]
    fn decay_lti_scales_every_atom() {
        let (mut space, a, _, link) = chain();
        let mut alloc = allocator();
        alloc.set_long_term(&mut space, a.into(), 10.0, 1.0).unwrap();
        alloc.set_long_term(&mut space, link, 4.0, 0.0).unwrap();
        alloc.decay_lti(&mut space, 0.25).unwrap();
        assert_eq!(space.attention(a.into()).unwrap().lti, 7.5);
        assert_eq!(space.attention(link).unwrap().lti, 3.0);
        assert!(alloc.decay_lti(&mut space, 1.5).is_err());
    }

    #[test]
    fn most_important_breaks_ties_by_handle() {
        let (mut space, a, b, link) = chain();
        let mut alloc = allocator();
        alloc.stimulate(&mut space, b.into(), 2.0).unwrap();
        alloc.stimulate(&mut space, a.into(), 2.0).unwrap();
        alloc.stimulate(&mut space, link, 3.0).unwrap();
        let top = alloc.get_most_important(&space, 2, ImportanceMetric::Sti);
        assert_eq!(top, vec![(link, 3.0), (Handle::Node(a), 2.0)]);

        let by_lti = alloc.get_most_important(&space, 10, ImportanceMetric::Lti);
        assert_eq!(by_lti.len(), 3);
        assert_eq!(by_lti[0].0, Handle::Node(a));
    }
}
