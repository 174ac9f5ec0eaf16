//! View-Tree Collaborator Interfaces
//!
//! The engine never touches the host UI framework directly. The host adapts
//! its render tree behind [`ViewTree`] and its hit-testing behind
//! [`HitTest`]; both hand out opaque [`NodeIdentity`] values minted once per
//! underlying render object, so no reference-identity or pointer hashing
//! leaks into the capture model.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::geometry::{Point, Rect};

/// Stable opaque identity of one underlying render object.
///
/// Minted by the host, stable for the object's lifetime, never reused while
/// the object is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdentity(pub u64);

/// Handle addressing a node within one traversal of the host tree.
pub type NodeKey = u64;

/// Read access to the host's current view hierarchy.
///
/// All methods answer for the tree as it stands right now; the engine
/// completes each traversal within a single interaction-thread turn, so
/// hosts need no snapshotting.
pub trait ViewTree: Send + Sync {
    /// The traversal root, if the host currently has one mounted.
    fn root(&self) -> Option<NodeKey>;

    /// Child nodes in paint order.
    fn children(&self, node: NodeKey) -> Vec<NodeKey>;

    /// Stable identity of the underlying render object.
    fn identity(&self, node: NodeKey) -> NodeIdentity;

    /// Semantic widget/view type label.
    fn node_type(&self, node: NodeKey) -> String;

    /// Concrete render-object type label.
    fn render_type(&self, node: NodeKey) -> String;

    /// Bounding rectangle in global coordinates.
    fn bounds(&self, node: NodeKey) -> Rect;

    /// Whether this node disables rendering for itself and its subtree
    /// (zero opacity, hidden/offstage flag, or explicit visibility-off).
    fn render_disabled(&self, node: NodeKey) -> bool;

    /// Current viewport size in logical pixels.
    fn viewport(&self) -> (u32, u32);
}

/// Resolves a screen point to the topmost render-object identity.
pub trait HitTest: Send + Sync {
    fn identity_at(&self, point: Point) -> Option<NodeIdentity>;
}

/// Resolves screen points to zone ids of the current capture.
pub trait ZoneLookup: Send + Sync {
    /// Zone id for a point, or 0 when nothing resolves.
    fn zone_at(&self, point: Point) -> u32;

    /// Current viewport rectangle.
    fn viewport(&self) -> Rect;
}

/// The published identity → zone-id table of the most recent capture.
///
/// Rebuilt on every materialization and swapped in atomically; readers on
/// the interaction thread only ever see a complete table.
#[derive(Clone, Default)]
pub struct SharedZoneTable {
    inner: Arc<RwLock<HashMap<NodeIdentity, u32>>>,
}

impl SharedZoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: NodeIdentity) -> Option<u32> {
        self.inner.read().get(&identity).copied()
    }

    /// Swap in the table of a freshly materialized capture.
    pub fn replace(&self, table: HashMap<NodeIdentity, u32>) {
        *self.inner.write() = table;
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// [`ZoneLookup`] implementation combining the host hit-tester with the
/// published zone table.
pub struct ZoneResolver {
    hit_test: Arc<dyn HitTest>,
    table: SharedZoneTable,
    tree: Arc<dyn ViewTree>,
}

impl ZoneResolver {
    pub fn new(hit_test: Arc<dyn HitTest>, table: SharedZoneTable, tree: Arc<dyn ViewTree>) -> Self {
        Self {
            hit_test,
            table,
            tree,
        }
    }
}

impl ZoneLookup for ZoneResolver {
    fn zone_at(&self, point: Point) -> u32 {
        self.hit_test
            .identity_at(point)
            .and_then(|identity| self.table.get(identity))
            .unwrap_or(0)
    }

    fn viewport(&self) -> Rect {
        let (w, h) = self.tree.viewport();
        Rect::new(0.0, 0.0, w as f64, h as f64)
    }
}
