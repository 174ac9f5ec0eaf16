//! Structural Signature Traversal
//!
//! One depth-first pre-order pass over the host tree produces everything a
//! capture needs, on owned data:
//!
//! - the **signature string** — every type-included node contributes
//!   `<type-label,visible>`, and render-disabled subtrees are not descended
//!   into — whose hash detects structural change;
//! - the **flat node records** — nodes that additionally pass the size
//!   filter, each linked to its nearest included ancestor — from which a LOM
//!   is materialized on a cache miss.
//!
//! Keeping both in a [`PendingCapture`] decouples traversal (interaction
//! thread) from hashing and materialization (background worker): the worker
//! owns the data outright and its result is validated against the capture
//! generation before being applied.

use std::collections::HashSet;
use std::fmt::Write;

use xxhash_rust::xxh3::xxh3_64;

use crate::capture::view::{NodeIdentity, NodeKey, ViewTree};
use crate::geometry::Rect;
use crate::{Error, Result};

/// One node that survived the inclusion filter, in traversal order.
#[derive(Debug, Clone)]
pub struct FlatNode {
    pub identity: NodeIdentity,
    pub node_type: String,
    pub render_type: String,
    pub bounds: Rect,
    /// Index of the nearest included ancestor, `None` for the capture root.
    pub parent: Option<usize>,
}

/// The owned result of one traversal, awaiting hashing/materialization.
#[derive(Debug)]
pub struct PendingCapture {
    /// Generation this capture belongs to; stale results are discarded.
    pub generation: u64,
    /// Monotonic ms at traversal time.
    pub captured_at: u64,
    /// Viewport size at traversal time.
    pub viewport: (u32, u32),
    pub signature: String,
    pub nodes: Vec<FlatNode>,
}

/// Hash a signature string. xxh3 is stable across runs and platforms, so
/// hashes can be compared against cached captures from earlier frames.
#[inline]
pub fn signature_hash(signature: &str) -> u64 {
    xxh3_64(signature.as_bytes())
}

/// Walk the host tree, producing a [`PendingCapture`].
///
/// Fails with [`Error::CaptureFailure`] when there is nothing to capture:
/// no mounted root, a zero-size root or viewport, or a fully filtered tree.
/// Such failures are non-fatal to the caller, which simply skips the frame.
pub fn traverse(
    tree: &dyn ViewTree,
    generation: u64,
    now_ms: u64,
    excluded_types: &HashSet<String>,
) -> Result<PendingCapture> {
    let root = tree
        .root()
        .ok_or_else(|| Error::CaptureFailure("no root view".into()))?;

    let (width, height) = tree.viewport();
    if width == 0 || height == 0 {
        return Err(Error::CaptureFailure("zero-size viewport".into()));
    }
    if tree.bounds(root).is_degenerate() {
        return Err(Error::CaptureFailure("zero-size root".into()));
    }

    let mut signature = String::with_capacity(256);
    let mut nodes = Vec::new();
    visit(tree, root, None, excluded_types, &mut signature, &mut nodes);

    if nodes.is_empty() {
        return Err(Error::CaptureFailure("no capturable nodes".into()));
    }

    Ok(PendingCapture {
        generation,
        captured_at: now_ms,
        viewport: (width, height),
        signature,
        nodes,
    })
}

fn visit(
    tree: &dyn ViewTree,
    key: NodeKey,
    parent: Option<usize>,
    excluded_types: &HashSet<String>,
    signature: &mut String,
    nodes: &mut Vec<FlatNode>,
) {
    let node_type = tree.node_type(key);
    let hidden = tree.render_disabled(key);
    let type_included = !excluded_types.contains(&node_type);

    if type_included {
        let _ = write!(signature, "<{},{}>", node_type, !hidden);
    }

    // An invisible node hides its entire subtree: excluded from both the
    // signature (beyond its own flipped flag) and materialization.
    if hidden {
        return;
    }

    let mut nearest_included = parent;
    if type_included {
        let bounds = tree.bounds(key);
        if !bounds.is_degenerate() {
            nodes.push(FlatNode {
                identity: tree.identity(key),
                node_type,
                render_type: tree.render_type(key),
                bounds,
                parent,
            });
            nearest_included = Some(nodes.len() - 1);
        }
    }

    for child in tree.children(key) {
        visit(tree, child, nearest_included, excluded_types, signature, nodes);
    }
}

/// Scriptable in-memory [`ViewTree`] used by capture tests across the crate.
#[cfg(test)]
pub(crate) mod test_tree {
    use super::*;
    use std::collections::HashMap;

    pub struct TestTree {
        pub root: Option<NodeKey>,
        pub viewport: (u32, u32),
        pub nodes: HashMap<NodeKey, TestNode>,
    }

    pub struct TestNode {
        pub node_type: &'static str,
        pub bounds: Rect,
        pub hidden: bool,
        pub children: Vec<NodeKey>,
    }

    impl TestTree {
        pub fn new() -> Self {
            Self {
                root: Some(1),
                viewport: (390, 844),
                nodes: HashMap::new(),
            }
        }

        pub fn node(
            mut self,
            key: NodeKey,
            node_type: &'static str,
            bounds: Rect,
            children: Vec<NodeKey>,
        ) -> Self {
            self.nodes.insert(
                key,
                TestNode {
                    node_type,
                    bounds,
                    hidden: false,
                    children,
                },
            );
            self
        }

        pub fn hide(mut self, key: NodeKey) -> Self {
            self.nodes.get_mut(&key).expect("node exists").hidden = true;
            self
        }
    }

    impl ViewTree for TestTree {
        fn root(&self) -> Option<NodeKey> {
            self.root
        }
        fn children(&self, node: NodeKey) -> Vec<NodeKey> {
            self.nodes
                .get(&node)
                .map(|n| n.children.clone())
                .unwrap_or_default()
        }
        fn identity(&self, node: NodeKey) -> NodeIdentity {
            NodeIdentity(node * 100)
        }
        fn node_type(&self, node: NodeKey) -> String {
            self.nodes
                .get(&node)
                .map(|n| n.node_type.to_string())
                .unwrap_or_default()
        }
        fn render_type(&self, node: NodeKey) -> String {
            format!("Render{}", self.node_type(node))
        }
        fn bounds(&self, node: NodeKey) -> Rect {
            self.nodes.get(&node).map(|n| n.bounds).unwrap_or_default()
        }
        fn render_disabled(&self, node: NodeKey) -> bool {
            self.nodes.get(&node).map(|n| n.hidden).unwrap_or(false)
        }
        fn viewport(&self) -> (u32, u32) {
            self.viewport
        }
    }

    pub fn full() -> Rect {
        Rect::new(0.0, 0.0, 390.0, 844.0)
    }

    pub fn sample_tree() -> TestTree {
        TestTree::new()
            .node(1, "Scaffold", full(), vec![2, 3])
            .node(2, "AppBar", Rect::new(0.0, 0.0, 390.0, 56.0), vec![])
            .node(3, "ListView", Rect::new(0.0, 56.0, 390.0, 788.0), vec![4])
            .node(4, "ListTile", Rect::new(0.0, 56.0, 390.0, 48.0), vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::test_tree::{full, sample_tree, TestTree};
    use super::*;

    fn no_exclusions() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_signature_contains_all_nodes_pre_order() {
        let tree = sample_tree();
        let capture = traverse(&tree, 1, 0, &no_exclusions()).unwrap();
        assert_eq!(
            capture.signature,
            "<Scaffold,true><AppBar,true><ListView,true><ListTile,true>"
        );
        assert_eq!(capture.nodes.len(), 4);
    }

    #[test]
    fn test_traversal_order_and_parents() {
        let tree = sample_tree();
        let capture = traverse(&tree, 1, 0, &no_exclusions()).unwrap();

        let types: Vec<&str> = capture
            .nodes
            .iter()
            .map(|n| n.node_type.as_str())
            .collect();
        assert_eq!(types, vec!["Scaffold", "AppBar", "ListView", "ListTile"]);

        assert_eq!(capture.nodes[0].parent, None);
        assert_eq!(capture.nodes[1].parent, Some(0));
        assert_eq!(capture.nodes[2].parent, Some(0));
        assert_eq!(capture.nodes[3].parent, Some(2));
    }

    #[test]
    fn test_signature_idempotent() {
        let tree = sample_tree();
        let a = traverse(&tree, 1, 0, &no_exclusions()).unwrap();
        let b = traverse(&tree, 2, 500, &no_exclusions()).unwrap();
        assert_eq!(
            signature_hash(&a.signature),
            signature_hash(&b.signature),
            "unchanged tree must hash identically"
        );
    }

    #[test]
    fn test_hidden_subtree_excluded() {
        let tree = sample_tree().hide(3);
        let capture = traverse(&tree, 1, 0, &no_exclusions()).unwrap();

        // The hidden node contributes its flipped flag; its subtree is gone.
        assert_eq!(
            capture.signature,
            "<Scaffold,true><AppBar,true><ListView,false>"
        );
        let types: Vec<&str> = capture
            .nodes
            .iter()
            .map(|n| n.node_type.as_str())
            .collect();
        assert_eq!(types, vec!["Scaffold", "AppBar"]);
    }

    #[test]
    fn test_visibility_flip_changes_signature() {
        let visible = traverse(&sample_tree(), 1, 0, &no_exclusions()).unwrap();
        let hidden = traverse(&sample_tree().hide(4), 1, 0, &no_exclusions()).unwrap();
        assert_ne!(
            signature_hash(&visible.signature),
            signature_hash(&hidden.signature)
        );
    }

    #[test]
    fn test_excluded_type_is_transparent() {
        let excluded: HashSet<String> = ["ListView".to_string()].into_iter().collect();
        let tree = sample_tree();
        let capture = traverse(&tree, 1, 0, &excluded).unwrap();

        // The decorated wrapper vanishes; its child re-parents upward.
        assert_eq!(
            capture.signature,
            "<Scaffold,true><AppBar,true><ListTile,true>"
        );
        let tile = capture
            .nodes
            .iter()
            .find(|n| n.node_type == "ListTile")
            .expect("tile captured");
        assert_eq!(tile.parent, Some(0), "re-parented to nearest included");
    }

    #[test]
    fn test_degenerate_node_skipped_but_children_kept() {
        let tree = TestTree::new()
            .node(1, "Scaffold", full(), vec![2])
            .node(2, "SizedBox", Rect::new(0.0, 0.0, 0.0, 0.0), vec![3])
            .node(3, "Button", Rect::new(10.0, 10.0, 80.0, 40.0), vec![]);
        let capture = traverse(&tree, 1, 0, &no_exclusions()).unwrap();

        // Zero-size nodes stay in the signature but are not materialized.
        assert_eq!(
            capture.signature,
            "<Scaffold,true><SizedBox,true><Button,true>"
        );
        let types: Vec<&str> = capture
            .nodes
            .iter()
            .map(|n| n.node_type.as_str())
            .collect();
        assert_eq!(types, vec!["Scaffold", "Button"]);
        assert_eq!(capture.nodes[1].parent, Some(0));
    }

    #[test]
    fn test_no_root_fails() {
        let mut tree = sample_tree();
        tree.root = None;
        let err = traverse(&tree, 1, 0, &no_exclusions()).unwrap_err();
        assert!(matches!(err, Error::CaptureFailure(_)));
    }

    #[test]
    fn test_zero_viewport_fails() {
        let mut tree = sample_tree();
        tree.viewport = (0, 844);
        assert!(traverse(&tree, 1, 0, &no_exclusions()).is_err());
    }

    #[test]
    fn test_zero_size_root_fails() {
        let tree = TestTree::new().node(1, "Scaffold", Rect::new(0.0, 0.0, 0.0, 0.0), vec![]);
        let err = traverse(&tree, 1, 0, &no_exclusions()).unwrap_err();
        assert!(matches!(err, Error::CaptureFailure(_)));
    }

    #[test]
    fn test_generation_and_timestamp_carried() {
        let tree = sample_tree();
        let capture = traverse(&tree, 17, 4_200, &no_exclusions()).unwrap();
        assert_eq!(capture.generation, 17);
        assert_eq!(capture.captured_at, 4_200);
        assert_eq!(capture.viewport, (390, 844));
    }
}
