//! Layout Object Model
//!
//! A [`Lom`] is one structural+geometric snapshot of the view tree; a
//! [`LomRef`] stands in for a snapshot whose structure matched a cached one.
//! Zone ids are assigned 1..N in traversal order and are only meaningful
//! within their own capture.
//!
//! The wire shape is deliberately lossy: nodes serialize as
//! `{"id":"z<int>","b":[l,t,w,h],"c":[...]}` with geometry only, no type
//! labels and no identities, keeping payloads compact and privacy-safe.

use std::collections::HashMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use uuid::Uuid;

use crate::capture::signature::FlatNode;
use crate::capture::view::NodeIdentity;
use crate::geometry::Rect;

/// One captured structural node ("zone").
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    /// 1-based sequential id within this capture.
    pub id: u32,
    /// Stable identity of the underlying render object.
    pub identity: NodeIdentity,
    /// Parent zone id; the root references itself.
    pub parent_id: u32,
    pub node_type: String,
    pub render_type: String,
    /// Bounding rectangle in global coordinates.
    pub bounds: Rect,
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    /// Total node count of this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ViewNode::subtree_len)
            .sum::<usize>()
    }
}

impl Serialize for ViewNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bounds = [
            self.bounds.left.round() as i64,
            self.bounds.top.round() as i64,
            self.bounds.width.round() as i64,
            self.bounds.height.round() as i64,
        ];
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("id", &format!("z{}", self.id))?;
        map.serialize_entry("b", &bounds)?;
        map.serialize_entry("c", &self.children)?;
        map.end()
    }
}

/// One full structural capture.
#[derive(Debug, Clone, PartialEq)]
pub struct Lom {
    pub id: Uuid,
    /// Capture timestamp, monotonic ms.
    pub ts: u64,
    pub width: u32,
    pub height: u32,
    /// `None` when the capture produced no tree (serialized as `""`).
    pub root: Option<ViewNode>,
}

impl Serialize for Lom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("ts", &self.ts)?;
        map.serialize_entry("w", &self.width)?;
        map.serialize_entry("h", &self.height)?;
        match &self.root {
            Some(root) => map.serialize_entry("r", root)?,
            None => map.serialize_entry("r", "")?,
        }
        map.end()
    }
}

/// Reference to a previously captured [`Lom`] with a fresh timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LomRef {
    pub id: Uuid,
    pub ts: u64,
}

impl Serialize for LomRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("ref", &self.id)?;
        map.serialize_entry("ts", &self.ts)?;
        map.end()
    }
}

/// A chunk entry: either a full capture or a reference to a cached one.
#[derive(Debug, Clone, PartialEq)]
pub enum LomEntry {
    Full(Lom),
    Ref(LomRef),
}

impl LomEntry {
    pub fn is_ref(&self) -> bool {
        matches!(self, LomEntry::Ref(_))
    }

    /// Identifier of the capture this entry denotes.
    pub fn lom_id(&self) -> Uuid {
        match self {
            LomEntry::Full(lom) => lom.id,
            LomEntry::Ref(r) => r.id,
        }
    }
}

impl Serialize for LomEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LomEntry::Full(lom) => lom.serialize(serializer),
            LomEntry::Ref(r) => r.serialize(serializer),
        }
    }
}

/// Assemble the nested zone tree and the identity → zone-id table from the
/// flat traversal records.
///
/// Zone id = flat index + 1, so ids run 1..N in traversal order. Every
/// non-root record attaches to its resolved parent; a record with no
/// resolvable parent becomes a top-level child of the root.
pub fn assemble(nodes: &[FlatNode]) -> (Option<ViewNode>, HashMap<NodeIdentity, u32>) {
    if nodes.is_empty() {
        return (None, HashMap::new());
    }

    let mut zone_table = HashMap::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        zone_table.insert(node.identity, idx as u32 + 1);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (idx, node) in nodes.iter().enumerate().skip(1) {
        let parent = match node.parent {
            Some(p) if p < idx => p,
            // Unresolvable or self-referential parents re-attach to the root.
            _ => 0,
        };
        children[parent].push(idx);
    }

    (Some(build(nodes, &children, 0, None)), zone_table)
}

fn build(
    nodes: &[FlatNode],
    children: &[Vec<usize>],
    idx: usize,
    parent_zone: Option<u32>,
) -> ViewNode {
    let record = &nodes[idx];
    let zone = idx as u32 + 1;
    ViewNode {
        id: zone,
        identity: record.identity,
        // Only the root references itself.
        parent_id: parent_zone.unwrap_or(zone),
        node_type: record.node_type.clone(),
        render_type: record.render_type.clone(),
        bounds: record.bounds,
        children: children[idx]
            .iter()
            .map(|&child| build(nodes, children, child, Some(zone)))
            .collect(),
    }
}
