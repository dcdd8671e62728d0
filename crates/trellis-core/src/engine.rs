//! Contract between holders and the layout engine that builds their trees.
//!
//! The engine owns everything about how a component is measured. Holders only
//! create trees, hand them roots and size specs, and query them. Every method
//! takes `&self`: a tree is used from the UI thread and from layout threads at
//! the same time and must synchronize itself.

use std::fmt;
use std::sync::Arc;

use crate::error::LayoutError;
use crate::policy::ExecutionPolicy;
use crate::render_info::{Component, TreeProps};
use crate::spec::{Size, SizeSpec};
use crate::state::StateSnapshot;

/// Indices of the visible window reported by the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct VisibilityRange {
    pub first_visible: usize,
    pub last_visible: usize,
    pub first_fully_visible: usize,
    pub last_fully_visible: usize,
}

impl VisibilityRange {
    pub const fn new(
        first_visible: usize,
        last_visible: usize,
        first_fully_visible: usize,
        last_fully_visible: usize,
    ) -> Self {
        Self {
            first_visible,
            last_visible,
            first_fully_visible,
            last_fully_visible,
        }
    }

    /// Returns true if `position` is at least partially visible.
    pub fn contains(&self, position: usize) -> bool {
        (self.first_visible..=self.last_visible).contains(&position)
    }

    /// Returns true if `position` is entirely visible.
    pub fn fully_contains(&self, position: usize) -> bool {
        (self.first_fully_visible..=self.last_fully_visible).contains(&position)
    }
}

/// Notified with the measured size every time a tree's root and size specs are set.
pub trait MeasureListener: Send + Sync {
    fn on_set_root_and_size_spec(&self, width: i32, height: i32);
}

impl<F> MeasureListener for F
where
    F: Fn(i32, i32) + Send + Sync,
{
    fn on_set_root_and_size_spec(&self, width: i32, height: i32) {
        self(width, height)
    }
}

/// Notified when a tree has a new layout ready to mount.
pub trait NewLayoutReadyListener: Send + Sync {
    fn on_new_layout_state_ready(&self, tree: &dyn ComponentTree);
}

impl<F> NewLayoutReadyListener for F
where
    F: Fn(&dyn ComponentTree) + Send + Sync,
{
    fn on_new_layout_state_ready(&self, tree: &dyn ComponentTree) {
        self(tree)
    }
}

/// Everything an engine needs to build a tree for one list item.
#[derive(Clone)]
pub struct TreeConfig {
    /// Initial root component.
    pub root: Arc<dyn Component>,
    pub policy: ExecutionPolicy,
    /// State captured from the item's previous tree, if any.
    pub state_snapshot: Option<StateSnapshot>,
    pub clip_children: bool,
    /// Whether the item's previous tree had mounted, for animations that only
    /// run on first appearance.
    pub has_mounted: bool,
    pub measure_listener: Option<Arc<dyn MeasureListener>>,
}

impl fmt::Debug for TreeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeConfig")
            .field("root", &self.root.simple_name())
            .field("policy", &self.policy)
            .field("state_snapshot", &self.state_snapshot)
            .field("clip_children", &self.clip_children)
            .field("has_mounted", &self.has_mounted)
            .field("measure_listener", &self.measure_listener.is_some())
            .finish()
    }
}

/// A live layout tree for one list item.
pub trait ComponentTree: Send + Sync {
    /// Sets the root and computes its layout on the calling thread.
    fn set_root_and_size_spec(
        &self,
        root: &Arc<dyn Component>,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        tree_props: Option<&Arc<TreeProps>>,
    ) -> Result<Size, LayoutError>;

    /// Sets the root and schedules its layout; returns without waiting.
    fn set_root_and_size_spec_async(
        &self,
        root: &Arc<dyn Component>,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
        tree_props: Option<&Arc<TreeProps>>,
    );

    /// Returns true if the committed layout was computed for these specs.
    fn has_compatible_layout(&self, width_spec: SizeSpec, height_spec: SizeSpec) -> bool;

    /// Detaches the tree's component state so a later tree can adopt it.
    fn acquire_state_snapshot(&self) -> Option<StateSnapshot>;

    fn has_mounted(&self) -> bool;

    /// Frees the tree. No other method is called afterwards.
    fn release(&self);

    fn check_working_range_and_dispatch(&self, position: usize, range: VisibilityRange);

    fn set_new_layout_state_ready_listener(
        &self,
        listener: Option<Arc<dyn NewLayoutReadyListener>>,
    );
}

/// Builds layout trees.
pub trait LayoutEngine: Send + Sync {
    fn create_tree(&self, config: TreeConfig) -> Arc<dyn ComponentTree>;
}

/// Handle passed to layout requests; gives holders access to the engine.
#[derive(Clone)]
pub struct ComponentContext {
    engine: Arc<dyn LayoutEngine>,
    log_tag: Option<Arc<str>>,
}

impl ComponentContext {
    pub fn new(engine: Arc<dyn LayoutEngine>) -> Self {
        Self {
            engine,
            log_tag: None,
        }
    }

    pub fn with_log_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.log_tag = Some(tag.into());
        self
    }

    pub fn engine(&self) -> &Arc<dyn LayoutEngine> {
        &self.engine
    }

    pub fn log_tag(&self) -> &str {
        self.log_tag.as_deref().unwrap_or("trellis")
    }
}

impl fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentContext")
            .field("log_tag", &self.log_tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn test_visibility_range_contains() {
        let range = VisibilityRange::new(2, 8, 3, 7);
        assert!(range.contains(2));
        assert!(range.contains(8));
        assert!(!range.contains(9));
        assert!(!range.fully_contains(2));
        assert!(range.fully_contains(7));
    }

    #[test]
    fn test_closure_measure_listener() {
        let last_height = Arc::new(AtomicI32::new(-1));
        let sink = Arc::clone(&last_height);
        let listener: Arc<dyn MeasureListener> = Arc::new(move |_width: i32, height: i32| {
            sink.store(height, Ordering::SeqCst);
        });
        listener.on_set_root_and_size_spec(10, 42);
        assert_eq!(last_height.load(Ordering::SeqCst), 42);
    }
}
