//! Shared fixtures for integration tests: a scriptable view tree and a
//! bounds-based hit-tester.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use uxtrace::capture::view::{HitTest, NodeIdentity, NodeKey, ViewTree};
use uxtrace::chunk::SessionState;
use uxtrace::config::Config;
use uxtrace::geometry::{Point, Rect};
use uxtrace::recorder::Recorder;
use uxtrace::scheduler::SharedManualScheduler;
use uxtrace::time::{Clock, ManualClock};

/// One scripted node of the fake view tree.
#[derive(Clone)]
pub struct FakeNode {
    pub node_type: &'static str,
    pub bounds: Rect,
    pub hidden: bool,
    pub children: Vec<NodeKey>,
}

/// Scriptable in-memory view tree. Node identity is `key * 100`.
#[derive(Clone, Default)]
pub struct FakeTree {
    pub root: Option<NodeKey>,
    pub viewport: (u32, u32),
    pub nodes: HashMap<NodeKey, FakeNode>,
}

impl FakeTree {
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
            FakeNode {
                node_type,
                bounds,
                hidden: false,
                children,
            },
        );
        self
    }

    /// Pre-order node keys, used by the hit-tester to find the topmost
    /// (deepest painted) node containing a point.
    fn pre_order(&self) -> Vec<NodeKey> {
        let mut order = Vec::new();
        if let Some(root) = self.root {
            let mut stack = vec![root];
            while let Some(key) = stack.pop() {
                order.push(key);
                if let Some(node) = self.nodes.get(&key) {
                    for &child in node.children.iter().rev() {
                        stack.push(child);
                    }
                }
            }
        }
        order
    }
}

impl ViewTree for FakeTree {
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

/// Hit-tester resolving a point to the deepest scripted node containing it.
pub struct BoundsHit {
    tree: Arc<FakeTree>,
}

impl BoundsHit {
    pub fn new(tree: Arc<FakeTree>) -> Self {
        Self { tree }
    }
}

impl HitTest for BoundsHit {
    fn identity_at(&self, point: Point) -> Option<NodeIdentity> {
        self.tree
            .pre_order()
            .into_iter()
            .filter(|key| {
                self.tree
                    .nodes
                    .get(key)
                    .map(|n| !n.hidden && n.bounds.contains(point))
                    .unwrap_or(false)
            })
            .last()
            .map(|key| self.tree.identity(key))
    }
}

/// A typical screen: scaffold, app bar, list with two tiles.
pub fn sample_tree() -> FakeTree {
    FakeTree::new()
        .node(1, "Scaffold", Rect::new(0.0, 0.0, 390.0, 844.0), vec![2, 3])
        .node(2, "AppBar", Rect::new(0.0, 0.0, 390.0, 56.0), vec![])
        .node(3, "ListView", Rect::new(0.0, 56.0, 390.0, 788.0), vec![4, 5])
        .node(4, "ListTile", Rect::new(0.0, 56.0, 390.0, 48.0), vec![])
        .node(5, "ListTile", Rect::new(0.0, 104.0, 390.0, 48.0), vec![])
}

/// A complete synchronous pipeline under manual clock and scheduler.
pub struct Pipeline {
    pub clock: Arc<ManualClock>,
    pub scheduler: SharedManualScheduler,
    pub session: Arc<Mutex<SessionState>>,
    pub recorder: Recorder,
}

impl Pipeline {
    pub fn new(tree: FakeTree) -> Self {
        let clock = Arc::new(ManualClock::new());
        let scheduler = SharedManualScheduler::new(Arc::clone(&clock) as Arc<dyn Clock>);
        let session = Arc::new(Mutex::new(SessionState::new()));
        let tree = Arc::new(tree);
        let hit = Arc::new(BoundsHit::new(Arc::clone(&tree)));

        let mut config = Config::default();
        config.upload.endpoint = "https://ingest.example.com/v1/chunks".to_string();

        let recorder = Recorder::new(
            &config,
            tree,
            hit,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Box::new(scheduler.clone()),
            Box::new(scheduler.clone()),
            Arc::clone(&session),
        );
        Self {
            clock,
            scheduler,
            session,
            recorder,
        }
    }

    /// Advance the clock, then fire every due timer, driving the capture
    /// steps inline the way the runtime drives them across workers.
    pub fn advance(&mut self, delta_ms: u64) {
        self.clock.advance(delta_ms);
        for token in self.scheduler.fire_due(self.clock.now_ms()) {
            if let Some(pending) = self.recorder.timer_fired(token) {
                let hash = uxtrace::capture::signature::signature_hash(&pending.signature);
                if let Some(job) = self.recorder.capture_hashed(pending, hash) {
                    let materialized = job.run();
                    self.recorder.capture_materialized(materialized);
                }
            }
        }
    }

    pub fn drain(&self) -> uxtrace::chunk::Chunk {
        self.session.lock().drain_and_reset().unwrap()
    }
}
