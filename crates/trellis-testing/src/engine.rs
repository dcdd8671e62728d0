//! Deterministic in-process layout engine.
//!
//! [`TestLayoutEngine`] measures roots with a plain function of the size specs,
//! records every tree it builds and lets tests park layouts on a
//! [`LayoutGate`] or make the next layout fail.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use trellis_core::{
    Component, ComponentContext, ComponentTree, ExecutionPolicy, InlineLayoutHandler,
    LayoutEngine, LayoutError, LayoutHandler, MeasureListener, NewLayoutReadyListener, Size,
    SizeSpec, StateSnapshot, TreeConfig, TreeProps, VisibilityRange,
};

use crate::gate::LayoutGate;

/// Size a root takes along an axis with an unspecified or loose spec.
pub const DEFAULT_ITEM_WIDTH: i32 = 320;
pub const DEFAULT_ITEM_HEIGHT: i32 = 48;

/// Computes a root's size from its specs.
pub type MeasureFn = Arc<dyn Fn(&dyn Component, SizeSpec, SizeSpec) -> Size + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn default_measure(_root: &dyn Component, width_spec: SizeSpec, height_spec: SizeSpec) -> Size {
    Size::new(
        width_spec.resolve(DEFAULT_ITEM_WIDTH),
        height_spec.resolve(DEFAULT_ITEM_HEIGHT),
    )
}

/// State shared by the engine and every tree it built.
struct EngineShared {
    measure: MeasureFn,
    gate: Mutex<Option<Arc<LayoutGate>>>,
    pending_failure: Mutex<Option<String>>,
    layouts: AtomicUsize,
}

/// Layout engine for tests.
pub struct TestLayoutEngine {
    shared: Arc<EngineShared>,
    trees: Mutex<Vec<Arc<TestComponentTree>>>,
}

impl TestLayoutEngine {
    pub fn new() -> Arc<Self> {
        Self::with_measure(Arc::new(default_measure))
    }

    pub fn with_measure(measure: MeasureFn) -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(EngineShared {
                measure,
                gate: Mutex::new(None),
                pending_failure: Mutex::new(None),
                layouts: AtomicUsize::new(0),
            }),
            trees: Mutex::new(Vec::new()),
        })
    }

    /// Context whose layout requests go to this engine.
    pub fn context(self: &Arc<Self>) -> ComponentContext {
        let engine: Arc<dyn LayoutEngine> = Arc::clone(self) as Arc<dyn LayoutEngine>;
        ComponentContext::new(engine).with_log_tag("test")
    }

    /// Parks every following layout on `gate` until it is opened.
    pub fn set_gate(&self, gate: Option<Arc<LayoutGate>>) {
        *lock(&self.shared.gate) = gate;
    }

    /// Makes the next synchronous layout fail with `reason`.
    pub fn fail_next_layout(&self, reason: impl Into<String>) {
        *lock(&self.shared.pending_failure) = Some(reason.into());
    }

    /// Every tree built so far, oldest first.
    pub fn trees(&self) -> Vec<Arc<TestComponentTree>> {
        lock(&self.trees).clone()
    }

    pub fn last_tree(&self) -> Option<Arc<TestComponentTree>> {
        lock(&self.trees).last().cloned()
    }

    pub fn tree_count(&self) -> usize {
        lock(&self.trees).len()
    }

    /// Number of layouts that ran to completion.
    pub fn layout_count(&self) -> usize {
        self.shared.layouts.load(Ordering::SeqCst)
    }
}

impl LayoutEngine for TestLayoutEngine {
    fn create_tree(&self, config: TreeConfig) -> Arc<dyn ComponentTree> {
        let tree = TestComponentTree::new(config, Arc::clone(&self.shared));
        lock(&self.trees).push(Arc::clone(&tree));
        tree
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CommittedLayout {
    width_spec: SizeSpec,
    height_spec: SizeSpec,
    size: Size,
}

struct TreeInner {
    root: Arc<dyn Component>,
    state: StateSnapshot,
    has_mounted: bool,
    committed: Option<CommittedLayout>,
    tree_props: Option<Arc<TreeProps>>,
    released: bool,
    layout_listener: Option<Arc<dyn NewLayoutReadyListener>>,
    working_range_calls: Vec<(usize, VisibilityRange)>,
}

/// Tree built by [`TestLayoutEngine`].
pub struct TestComponentTree {
    inner: Mutex<TreeInner>,
    policy: ExecutionPolicy,
    clip_children: bool,
    restored_state: bool,
    initial_has_mounted: bool,
    measure_listener: Option<Arc<dyn MeasureListener>>,
    shared: Arc<EngineShared>,
    weak_self: Weak<TestComponentTree>,
}

impl TestComponentTree {
    fn new(config: TreeConfig, shared: Arc<EngineShared>) -> Arc<Self> {
        let restored_state = config.state_snapshot.is_some();
        Arc::new_cyclic(|weak_self| Self {
            inner: Mutex::new(TreeInner {
                root: config.root,
                state: config.state_snapshot.unwrap_or_default(),
                has_mounted: false,
                committed: None,
                tree_props: None,
                released: false,
                layout_listener: None,
                working_range_calls: Vec::new(),
            }),
            policy: config.policy,
            clip_children: config.clip_children,
            restored_state,
            initial_has_mounted: config.has_mounted,
            measure_listener: config.measure_listener,
            shared,
            weak_self: weak_self.clone(),
        })
    }

    /// Current component state, as the next snapshot would capture it.
    pub fn state(&self) -> StateSnapshot {
        lock(&self.inner).state.clone()
    }

    /// Changes component state, as an event handler in the tree would.
    pub fn update_state<T: std::any::Any + Send + Sync>(&self, key: &str, value: T) {
        lock(&self.inner).state.put(key, value);
    }

    /// Marks the tree as mounted on screen.
    pub fn mount(&self) {
        lock(&self.inner).has_mounted = true;
    }

    pub fn is_released(&self) -> bool {
        lock(&self.inner).released
    }

    pub fn root(&self) -> Arc<dyn Component> {
        Arc::clone(&lock(&self.inner).root)
    }

    pub fn committed_size(&self) -> Option<Size> {
        lock(&self.inner).committed.map(|layout| layout.size)
    }

    pub fn last_tree_props(&self) -> Option<Arc<TreeProps>> {
        lock(&self.inner).tree_props.clone()
    }

    pub fn working_range_calls(&self) -> Vec<(usize, VisibilityRange)> {
        lock(&self.inner).working_range_calls.clone()
    }

    pub fn has_layout_listener(&self) -> bool {
        lock(&self.inner).layout_listener.is_some()
    }

    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    pub fn clip_children(&self) -> bool {
        self.clip_children
    }

    /// Whether the tree was built from a snapshot of an earlier tree.
    pub fn restored_state(&self) -> bool {
        self.restored_state
    }

    /// The has-mounted flag carried over from the item's previous tree.
    pub fn initial_has_mounted(&self) -> bool {
        self.initial_has_mounted
    }

    fn pending_failure(&self) -> Option<String> {
        lock(&self.shared.pending_failure).take()
    }

    fn wait_at_gate(&self) {
        let gate = lock(&self.shared.gate).clone();
        if let Some(gate) = gate {
            gate.pass();
        }
    }
}

impl ComponentTree for TestComponentTree {
    fn set_root_and_size_spec(
        &self,
        root: &Arc<dyn Component>,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        tree_props: Option<&Arc<TreeProps>>,
    ) -> Result<Size, LayoutError> {
        if self.is_released() {
            return Err(LayoutError::Released);
        }
        if let Some(reason) = self.pending_failure() {
            return Err(LayoutError::Measure(reason));
        }
        self.wait_at_gate();

        let size = (self.shared.measure)(root.as_ref(), width_spec, height_spec);
        let listener = {
            let mut inner = lock(&self.inner);
            inner.root = Arc::clone(root);
            inner.tree_props = tree_props.cloned();
            inner.committed = Some(CommittedLayout {
                width_spec,
                height_spec,
                size,
            });
            inner.layout_listener.clone()
        };
        self.shared.layouts.fetch_add(1, Ordering::SeqCst);

        if let Some(measure_listener) = &self.measure_listener {
            measure_listener.on_set_root_and_size_spec(size.width, size.height);
        }
        if let Some(listener) = listener {
            listener.on_new_layout_state_ready(self);
        }
        Ok(size)
    }

    fn set_root_and_size_spec_async(
        &self,
        root: &Arc<dyn Component>,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        tree_props: Option<&Arc<TreeProps>>,
    ) {
        let Some(tree) = self.weak_self.upgrade() else {
            return;
        };
        let root = Arc::clone(root);
        let tree_props = tree_props.cloned();
        let task = Box::new(move || {
            if let Err(err) =
                tree.set_root_and_size_spec(&root, width_spec, height_spec, tree_props.as_ref())
            {
                log::debug!("async layout of {} failed: {err}", root.simple_name());
            }
        });
        match &self.policy.layout_handler {
            Some(handler) => handler.post(task),
            None => InlineLayoutHandler.post(task),
        }
    }

    fn has_compatible_layout(&self, width_spec: SizeSpec, height_spec: SizeSpec) -> bool {
        lock(&self.inner).committed.is_some_and(|layout| {
            layout.width_spec == width_spec && layout.height_spec == height_spec
        })
    }

    fn acquire_state_snapshot(&self) -> Option<StateSnapshot> {
        Some(lock(&self.inner).state.clone())
    }

    fn has_mounted(&self) -> bool {
        lock(&self.inner).has_mounted
    }

    fn release(&self) {
        let mut inner = lock(&self.inner);
        inner.released = true;
        inner.layout_listener = None;
    }

    fn check_working_range_and_dispatch(&self, position: usize, range: VisibilityRange) {
        lock(&self.inner).working_range_calls.push((position, range));
    }

    fn set_new_layout_state_ready_listener(
        &self,
        listener: Option<Arc<dyn NewLayoutReadyListener>>,
    ) {
        lock(&self.inner).layout_listener = listener;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::TestComponent;

    fn config(root: Arc<dyn Component>) -> TreeConfig {
        TreeConfig {
            root,
            policy: ExecutionPolicy::default(),
            state_snapshot: None,
            clip_children: true,
            has_mounted: false,
            measure_listener: None,
        }
    }

    #[test]
    fn test_sync_layout_commits_size() {
        let engine = TestLayoutEngine::new();
        let root = TestComponent::shared("row");
        let tree = engine.create_tree(config(Arc::clone(&root)));

        let size = tree
            .set_root_and_size_spec(&root, SizeSpec::exactly(100), SizeSpec::unspecified(), None)
            .expect("layout");
        assert_eq!(size, Size::new(100, DEFAULT_ITEM_HEIGHT));
        assert!(tree.has_compatible_layout(SizeSpec::exactly(100), SizeSpec::unspecified()));
        assert!(!tree.has_compatible_layout(SizeSpec::exactly(200), SizeSpec::unspecified()));
        assert_eq!(engine.layout_count(), 1);
    }

    #[test]
    fn test_failure_is_reported_once() {
        let engine = TestLayoutEngine::new();
        let root = TestComponent::shared("row");
        let tree = engine.create_tree(config(Arc::clone(&root)));
        engine.fail_next_layout("broken");

        let first = tree.set_root_and_size_spec(
            &root,
            SizeSpec::exactly(10),
            SizeSpec::exactly(10),
            None,
        );
        assert_eq!(first, Err(LayoutError::Measure("broken".into())));
        let second = tree.set_root_and_size_spec(
            &root,
            SizeSpec::exactly(10),
            SizeSpec::exactly(10),
            None,
        );
        assert!(second.is_ok());
    }

    #[test]
    fn test_released_tree_rejects_layout() {
        let engine = TestLayoutEngine::new();
        let root = TestComponent::shared("row");
        let tree = engine.create_tree(config(Arc::clone(&root)));
        tree.release();
        let result =
            tree.set_root_and_size_spec(&root, SizeSpec::exactly(1), SizeSpec::exactly(1), None);
        assert_eq!(result, Err(LayoutError::Released));
    }

    #[test]
    fn test_snapshot_is_restored_into_new_tree() {
        let engine = TestLayoutEngine::new();
        let root = TestComponent::shared("row");
        let mut snapshot = StateSnapshot::new();
        snapshot.put("expanded", true);
        let tree = engine.create_tree(TreeConfig {
            state_snapshot: Some(snapshot),
            ..config(root)
        });
        let built = engine.last_tree().expect("tree recorded");
        assert!(built.restored_state());
        assert_eq!(built.state().get::<bool>("expanded"), Some(&true));
        assert!(tree.acquire_state_snapshot().is_some());
    }
}
