//! Tree Capture Engine
//!
//! Owns the capture lifecycle: a monotonically increasing generation
//! counter, the bounded signature cache, and the published zone table.
//!
//! Captures run in three steps so the expensive parts can leave the
//! interaction thread:
//!
//! 1. [`TreeCaptureEngine::begin_capture`] — bump the generation and
//!    traverse the host tree into an owned [`PendingCapture`] (cheap).
//! 2. [`TreeCaptureEngine::apply_hash`] — given the signature hash
//!    (computed wherever convenient), either answer with a [`LomRef`] on a
//!    cache hit or hand back a [`MaterializeJob`].
//! 3. [`TreeCaptureEngine::apply_materialized`] — accept the built LOM and
//!    swap in the fresh zone table.
//!
//! Every step validates the capture generation; results that arrive after a
//! newer capture started are dropped silently. Structurally identical
//! frames therefore cost one traversal and one hash, never a
//! materialization.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};
use uuid::Uuid;

use crate::capture::lom::{self, Lom, LomEntry, LomRef};
use crate::capture::signature::{self, PendingCapture};
use crate::capture::view::{NodeIdentity, SharedZoneTable, ViewTree};
use crate::{Error, Result};

/// Bounded LRU map from signature hash to captured LOM id.
///
/// The signature cache persists across captures for the engine's lifetime;
/// the capacity bound keeps long sessions from growing it without limit.
#[derive(Debug)]
pub struct SignatureCache {
    capacity: usize,
    entries: HashMap<u64, Uuid>,
    order: VecDeque<u64>,
}

impl SignatureCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Look up a signature hash, refreshing its recency on a hit.
    pub fn get(&mut self, hash: u64) -> Option<Uuid> {
        let id = *self.entries.get(&hash)?;
        if let Some(pos) = self.order.iter().position(|&h| h == hash) {
            self.order.remove(pos);
            self.order.push_back(hash);
        }
        Some(id)
    }

    /// Insert a mapping, evicting the least recently used entry at capacity.
    pub fn insert(&mut self, hash: u64, id: Uuid) {
        if self.entries.contains_key(&hash) {
            self.entries.insert(hash, id);
            if let Some(pos) = self.order.iter().position(|&h| h == hash) {
                self.order.remove(pos);
            }
            self.order.push_back(hash);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
                trace!(hash = evicted, "signature cache entry evicted");
            }
        }
        self.entries.insert(hash, id);
        self.order.push_back(hash);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A cache-missed capture ready for off-thread materialization.
#[derive(Debug)]
pub struct MaterializeJob {
    pending: PendingCapture,
    hash: u64,
}

impl MaterializeJob {
    /// Build the LOM and zone table. Runs on owned data, safe off-thread.
    pub fn run(self) -> MaterializedCapture {
        let (root, zones) = lom::assemble(&self.pending.nodes);
        MaterializedCapture {
            generation: self.pending.generation,
            hash: self.hash,
            lom: Lom {
                id: Uuid::new_v4(),
                ts: self.pending.captured_at,
                width: self.pending.viewport.0,
                height: self.pending.viewport.1,
                root,
            },
            zones,
        }
    }
}

/// The result of a materialization, awaiting generation-checked application.
#[derive(Debug)]
pub struct MaterializedCapture {
    pub generation: u64,
    pub hash: u64,
    pub lom: Lom,
    pub zones: HashMap<NodeIdentity, u32>,
}

/// Outcome of presenting a signature hash to the engine.
#[derive(Debug)]
pub enum HashOutcome {
    /// A newer capture superseded this one; drop it.
    Stale,
    /// Structure unchanged: record a reference to the cached LOM.
    Ref(LomRef),
    /// Structure changed: materialize.
    Materialize(MaterializeJob),
}

/// Produces deduplicated structural snapshots of the host view tree.
pub struct TreeCaptureEngine {
    generation: u64,
    cache: SignatureCache,
    zone_table: SharedZoneTable,
    excluded_types: HashSet<String>,
}

impl TreeCaptureEngine {
    pub fn new(
        cache_capacity: usize,
        excluded_types: Vec<String>,
        zone_table: SharedZoneTable,
    ) -> Self {
        Self {
            generation: 0,
            cache: SignatureCache::new(cache_capacity),
            zone_table,
            excluded_types: excluded_types.into_iter().collect(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a capture: invalidate any in-flight one and traverse.
    pub fn begin_capture(
        &mut self,
        tree: &dyn ViewTree,
        now_ms: u64,
    ) -> Result<PendingCapture> {
        self.generation += 1;
        signature::traverse(tree, self.generation, now_ms, &self.excluded_types)
    }

    /// Present the hash of a pending capture.
    pub fn apply_hash(&mut self, pending: PendingCapture, hash: u64) -> HashOutcome {
        if pending.generation != self.generation {
            trace!(
                got = pending.generation,
                current = self.generation,
                "stale capture hash dropped"
            );
            return HashOutcome::Stale;
        }
        if let Some(id) = self.cache.get(hash) {
            debug!(%id, "structure unchanged, recording reference");
            return HashOutcome::Ref(LomRef {
                id,
                ts: pending.captured_at,
            });
        }
        HashOutcome::Materialize(MaterializeJob { pending, hash })
    }

    /// Accept a finished materialization, unless superseded.
    pub fn apply_materialized(&mut self, capture: MaterializedCapture) -> Option<Lom> {
        if capture.generation != self.generation {
            trace!(
                got = capture.generation,
                current = self.generation,
                "stale materialization dropped"
            );
            return None;
        }
        self.cache.insert(capture.hash, capture.lom.id);
        self.zone_table.replace(capture.zones);
        debug!(
            id = %capture.lom.id,
            zones = self.zone_table.len(),
            "capture materialized"
        );
        Some(capture.lom)
    }

    /// Run all three capture steps inline. Used by tests and hosts without
    /// a background worker.
    pub fn capture_now(&mut self, tree: &dyn ViewTree, now_ms: u64) -> Result<LomEntry> {
        let pending = self.begin_capture(tree, now_ms)?;
        let hash = signature::signature_hash(&pending.signature);
        match self.apply_hash(pending, hash) {
            HashOutcome::Stale => Err(Error::CaptureFailure("capture superseded".into())),
            HashOutcome::Ref(lom_ref) => Ok(LomEntry::Ref(lom_ref)),
            HashOutcome::Materialize(job) => {
                let lom = self
                    .apply_materialized(job.run())
                    .ok_or_else(|| Error::CaptureFailure("capture superseded".into()))?;
                Ok(LomEntry::Full(lom))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::signature::test_tree::{full, sample_tree, TestTree};
    use crate::geometry::{Point, Rect};
    use crate::capture::view::{HitTest, ZoneLookup, ZoneResolver};
    use std::sync::Arc;

    fn make_engine() -> TreeCaptureEngine {
        TreeCaptureEngine::new(128, Vec::new(), SharedZoneTable::new())
    }

    #[test]
    fn test_first_capture_is_full() {
        let mut engine = make_engine();
        let entry = engine.capture_now(&sample_tree(), 100).unwrap();
        match entry {
            LomEntry::Full(lom) => {
                assert_eq!(lom.ts, 100);
                assert_eq!(lom.width, 390);
                assert_eq!(lom.root.as_ref().unwrap().subtree_len(), 4);
            }
            LomEntry::Ref(_) => panic!("first capture cannot be a reference"),
        }
    }

    #[test]
    fn test_second_identical_capture_is_ref() {
        let mut engine = make_engine();
        let first = engine.capture_now(&sample_tree(), 100).unwrap();
        let second = engine.capture_now(&sample_tree(), 200).unwrap();

        assert!(second.is_ref(), "unchanged structure must yield a LomRef");
        assert_eq!(first.lom_id(), second.lom_id());
        match second {
            LomEntry::Ref(r) => assert_eq!(r.ts, 200, "reference gets a fresh timestamp"),
            LomEntry::Full(_) => unreachable!(),
        }
    }

    #[test]
    fn test_structural_change_materializes_again() {
        let mut engine = make_engine();
        let first = engine.capture_now(&sample_tree(), 100).unwrap();
        let changed = sample_tree().hide(4);
        let second = engine.capture_now(&changed, 200).unwrap();

        assert!(!second.is_ref());
        assert_ne!(first.lom_id(), second.lom_id());
    }

    #[test]
    fn test_zone_ids_sequential_in_traversal_order() {
        let table = SharedZoneTable::new();
        let mut engine = TreeCaptureEngine::new(128, Vec::new(), table.clone());
        engine.capture_now(&sample_tree(), 0).unwrap();

        // TestTree identities are key * 100; traversal order 1,2,3,4.
        assert_eq!(table.get(NodeIdentity(100)), Some(1));
        assert_eq!(table.get(NodeIdentity(200)), Some(2));
        assert_eq!(table.get(NodeIdentity(300)), Some(3));
        assert_eq!(table.get(NodeIdentity(400)), Some(4));
    }

    #[test]
    fn test_stale_hash_dropped() {
        let mut engine = make_engine();
        let tree = sample_tree();
        let stale = engine.begin_capture(&tree, 0).unwrap();
        // A newer capture supersedes the in-flight one.
        let fresh = engine.begin_capture(&tree, 10).unwrap();

        let hash = signature::signature_hash(&stale.signature);
        assert!(matches!(
            engine.apply_hash(stale, hash),
            HashOutcome::Stale
        ));

        // The current-generation capture still applies cleanly.
        let hash = signature::signature_hash(&fresh.signature);
        assert!(matches!(
            engine.apply_hash(fresh, hash),
            HashOutcome::Materialize(_)
        ));
    }

    #[test]
    fn test_stale_materialization_dropped() {
        let table = SharedZoneTable::new();
        let mut engine = TreeCaptureEngine::new(128, Vec::new(), table.clone());
        let tree = sample_tree();

        let pending = engine.begin_capture(&tree, 0).unwrap();
        let hash = signature::signature_hash(&pending.signature);
        let job = match engine.apply_hash(pending, hash) {
            HashOutcome::Materialize(job) => job,
            other => panic!("expected materialize, got {:?}", other),
        };

        // Supersede before the job lands.
        engine.begin_capture(&tree, 10).unwrap();
        assert!(engine.apply_materialized(job.run()).is_none());
        assert!(table.is_empty(), "stale result must not touch the zone table");
        assert!(engine.cache.is_empty());
    }

    #[test]
    fn test_capture_failure_retains_cache() {
        let mut engine = make_engine();
        engine.capture_now(&sample_tree(), 0).unwrap();
        assert_eq!(engine.cache.len(), 1);

        let mut unmounted = sample_tree();
        unmounted.root = None;
        assert!(engine.capture_now(&unmounted, 10).is_err());
        assert_eq!(engine.cache.len(), 1, "failed capture retains prior state");

        // The tree comes back: still a cache hit.
        let entry = engine.capture_now(&sample_tree(), 20).unwrap();
        assert!(entry.is_ref());
    }

    #[test]
    fn test_excluded_types_not_materialized() {
        let table = SharedZoneTable::new();
        let mut engine =
            TreeCaptureEngine::new(128, vec!["ListView".to_string()], table.clone());
        let entry = engine.capture_now(&sample_tree(), 0).unwrap();

        match entry {
            LomEntry::Full(lom) => {
                assert_eq!(lom.root.unwrap().subtree_len(), 3, "wrapper excluded");
            }
            LomEntry::Ref(_) => panic!("first capture cannot be a reference"),
        }
        assert_eq!(table.get(NodeIdentity(300)), None);
        assert_eq!(table.get(NodeIdentity(400)), Some(3), "child re-parented");
    }

    #[test]
    fn test_hit_testing_against_fresh_capture() {
        struct TopTile;
        impl HitTest for TopTile {
            fn identity_at(&self, _point: Point) -> Option<NodeIdentity> {
                Some(NodeIdentity(400))
            }
        }

        let table = SharedZoneTable::new();
        let mut engine = TreeCaptureEngine::new(128, Vec::new(), table.clone());
        let tree = Arc::new(sample_tree());
        engine.capture_now(tree.as_ref(), 0).unwrap();

        let resolver = ZoneResolver::new(Arc::new(TopTile), table, tree);
        assert_eq!(resolver.zone_at(Point::new(10.0, 60.0)), 4);
        assert_eq!(resolver.viewport(), Rect::new(0.0, 0.0, 390.0, 844.0));
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = SignatureCache::new(2);
        cache.insert(1, Uuid::new_v4());
        cache.insert(2, Uuid::new_v4());

        // Touch 1 so 2 becomes the eviction candidate.
        assert!(cache.get(1).is_some());
        cache.insert(3, Uuid::new_v4());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_none(), "least recently used must go");
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn test_lru_reinsert_updates_recency() {
        let mut cache = SignatureCache::new(2);
        let id = Uuid::new_v4();
        cache.insert(1, id);
        cache.insert(2, Uuid::new_v4());
        cache.insert(1, id); // refresh
        cache.insert(3, Uuid::new_v4());

        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_none());
    }

    #[test]
    fn test_cache_capacity_floor() {
        let mut cache = SignatureCache::new(0);
        cache.insert(1, Uuid::new_v4());
        assert_eq!(cache.len(), 1, "capacity clamps to at least one entry");
    }

    #[test]
    fn test_zone_table_swapped_per_capture() {
        let table = SharedZoneTable::new();
        let mut engine = TreeCaptureEngine::new(128, Vec::new(), table.clone());

        engine.capture_now(&sample_tree(), 0).unwrap();
        assert_eq!(table.len(), 4);

        // Smaller tree: the old table is fully replaced, ids restart at 1.
        let small = TestTree::new().node(1, "Scaffold", full(), vec![]);
        engine.capture_now(&small, 10).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(NodeIdentity(100)), Some(1));
        assert_eq!(table.get(NodeIdentity(400)), None);
    }
}
