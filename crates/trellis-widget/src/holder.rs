//! The data backing one list item.
//!
//! A [`ComponentTreeHolder`] keeps the item's [`RenderInfo`] and either its
//! live [`ComponentTree`] or, while the item is outside the working range, the
//! [`StateSnapshot`] detached from its last tree. Layout may be requested from
//! the UI thread and from layout threads at the same time.
//!
//! # Locking
//!
//! Every field except the render progress marker sits behind one mutex per
//! holder. Layout itself runs with the mutex released:
//!
//! 1. under the lock, record the request, build the tree if needed and capture
//!    the tree and descriptor it is for. The measure-listener factory of a new
//!    tree is the one callback run in between, with the lock released;
//! 2. run the engine without the lock;
//! 3. relock and commit only if the live tree and descriptor are still the
//!    captured instances.
//!
//! A layout superseded by [`ComponentTreeHolder::set_render_info`] or by a tree
//! release runs to completion and its result is dropped at step 3.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use trellis_core::{
    AttributeValue, Component, ComponentContext, ComponentTree, ExecutionPolicy, LayoutError,
    MeasureListener, NewLayoutReadyListener, RenderInfo, Size, SizeSpec, StateSnapshot,
    TreeConfig, TreeProps, VisibilityRange, CLIP_CHILDREN,
};
use web_time::Instant;

use crate::pool::HolderPool;
use crate::render_state::{RenderState, RenderStateCell};

/// Creates the measure listener installed on each tree a holder builds.
///
/// Called without the holder's lock held, so it may read the holder through
/// the handle it receives.
pub trait MeasureListenerFactory: Send + Sync {
    fn create(&self, holder: WeakHolder) -> Arc<dyn MeasureListener>;
}

impl<F> MeasureListenerFactory for F
where
    F: Fn(WeakHolder) -> Arc<dyn MeasureListener> + Send + Sync,
{
    fn create(&self, holder: WeakHolder) -> Arc<dyn MeasureListener> {
        self(holder)
    }
}

/// Weak handle to a holder that stops resolving once the holder is released.
///
/// Listeners created for one item keep working only as long as the holder
/// serves that item; after a release and reuse they see `None`.
#[derive(Clone)]
pub struct WeakHolder {
    holder: Weak<ComponentTreeHolder>,
    generation: u64,
}

impl WeakHolder {
    /// Returns the holder if it still serves the item this handle was made for.
    ///
    /// The holder may be released right after this returns. Writes that must
    /// not leak into the next item go through the handle's own methods, which
    /// check the generation under the holder's lock.
    pub fn upgrade(&self) -> Option<Arc<ComponentTreeHolder>> {
        let holder = self.holder.upgrade()?;
        (holder.generation.load(Ordering::Acquire) == self.generation).then_some(holder)
    }

    /// Records a measured height unless the holder was released since this
    /// handle was made. Returns false if the write was dropped.
    pub fn set_measured_height(&self, height: i32) -> bool {
        let Some(holder) = self.holder.upgrade() else {
            return false;
        };
        let mut state = holder.lock();
        if holder.generation.load(Ordering::Acquire) != self.generation {
            return false;
        }
        state.last_measured_height = Some(height);
        true
    }
}

impl fmt::Debug for WeakHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHolder")
            .field("generation", &self.generation)
            .finish()
    }
}

/// What the holder keeps for its item's layout tree.
#[derive(Default)]
enum TreeSlot {
    #[default]
    Empty,
    Live(Arc<dyn ComponentTree>),
    /// State taken from the last released tree, waiting for the next one.
    Detached(StateSnapshot),
}

struct HolderState {
    render_info: Option<Arc<RenderInfo>>,
    tree: TreeSlot,
    last_measured_height: Option<i32>,
    last_requested_width_spec: Option<SizeSpec>,
    last_requested_height_spec: Option<SizeSpec>,
    is_tree_valid: bool,
    pending_layout_listener: Option<Arc<dyn NewLayoutReadyListener>>,
    is_inserted: bool,
    has_mounted: bool,
    policy: ExecutionPolicy,
    measure_listener_factory: Option<Arc<dyn MeasureListenerFactory>>,
}

impl Default for HolderState {
    fn default() -> Self {
        Self {
            render_info: None,
            tree: TreeSlot::Empty,
            last_measured_height: None,
            last_requested_width_spec: None,
            last_requested_height_spec: None,
            is_tree_valid: false,
            pending_layout_listener: None,
            is_inserted: true,
            has_mounted: false,
            policy: ExecutionPolicy::default(),
            measure_listener_factory: None,
        }
    }
}

impl HolderState {
    fn live_tree(&self) -> Option<&Arc<dyn ComponentTree>> {
        match &self.tree {
            TreeSlot::Live(tree) => Some(tree),
            _ => None,
        }
    }

    /// Releases the live tree without keeping its state.
    fn release_tree(&mut self) {
        if let TreeSlot::Live(tree) = std::mem::take(&mut self.tree) {
            tree.release();
        }
        self.is_tree_valid = false;
    }

    /// Returns true if `request` was made for the current descriptor and tree.
    fn is_current(&self, request: &LayoutRequest) -> bool {
        let same_tree = self
            .live_tree()
            .is_some_and(|tree| Arc::ptr_eq(tree, &request.tree));
        let same_info = self
            .render_info
            .as_ref()
            .is_some_and(|info| Arc::ptr_eq(info, &request.render_info));
        same_tree && same_info
    }
}

/// Everything captured under the lock before a layout runs.
struct LayoutRequest {
    render_info: Arc<RenderInfo>,
    component: Arc<dyn Component>,
    tree: Arc<dyn ComponentTree>,
    tree_props: Option<Arc<TreeProps>>,
}

/// Thread-safe holder of one list item's descriptor and layout tree.
pub struct ComponentTreeHolder {
    state: Mutex<HolderState>,
    // Polled from draw and scroll callbacks, so it stays outside `state` and
    // never waits on layout.
    render_state: RenderStateCell,
    generation: AtomicU64,
    weak_self: Weak<ComponentTreeHolder>,
    pool: Weak<HolderPool>,
}

impl ComponentTreeHolder {
    /// Acquires a holder for `render_info` from the shared pool.
    pub fn acquire(render_info: Arc<RenderInfo>, policy: ExecutionPolicy) -> Arc<Self> {
        HolderPool::shared().acquire(render_info, policy, None)
    }

    /// Like [`ComponentTreeHolder::acquire`], installing a measure listener on
    /// every tree the holder builds.
    pub fn acquire_with_measure_listener(
        render_info: Arc<RenderInfo>,
        policy: ExecutionPolicy,
        factory: Arc<dyn MeasureListenerFactory>,
    ) -> Arc<Self> {
        HolderPool::shared().acquire(render_info, policy, Some(factory))
    }

    pub(crate) fn allocate(pool: Weak<HolderPool>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            state: Mutex::new(HolderState::default()),
            render_state: RenderStateCell::default(),
            generation: AtomicU64::new(0),
            weak_self: weak_self.clone(),
            pool,
        })
    }

    pub(crate) fn configure(
        &self,
        render_info: Arc<RenderInfo>,
        policy: ExecutionPolicy,
        measure_listener_factory: Option<Arc<dyn MeasureListenerFactory>>,
    ) {
        let mut state = self.lock();
        state.render_info = Some(render_info);
        state.policy = policy;
        state.measure_listener_factory = measure_listener_factory;
    }

    fn lock(&self) -> MutexGuard<'_, HolderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Weak handle valid until the next [`ComponentTreeHolder::release`].
    pub fn downgrade(&self) -> WeakHolder {
        WeakHolder {
            holder: self.weak_self.clone(),
            generation: self.generation.load(Ordering::Acquire),
        }
    }

    /// Computes the layout on the calling thread.
    ///
    /// Returns `Ok(None)` for items rendered by a platform view. The computed
    /// size is returned even if the holder moved on to another descriptor or
    /// tree while the layout ran; in that case the holder itself is left
    /// untouched. Engine failures are returned unchanged.
    pub fn compute_layout_sync(
        &self,
        context: &ComponentContext,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Result<Option<Size>, LayoutError> {
        let Some(request) = self.prepare_layout(context, width_spec, height_spec) else {
            return Ok(None);
        };

        let started = Instant::now();
        let size = request.tree.set_root_and_size_spec(
            &request.component,
            width_spec,
            height_spec,
            request.tree_props.as_ref(),
        )?;
        log::trace!(
            "[{}] layout of {} finished in {:?}",
            context.log_tag(),
            request.component.simple_name(),
            started.elapsed()
        );

        let mut state = self.lock();
        if state.is_current(&request) {
            state.is_tree_valid = true;
            state.last_measured_height = Some(size.height);
        } else {
            log::debug!(
                "[{}] discarding superseded layout of {}",
                context.log_tag(),
                request.component.simple_name()
            );
        }
        Ok(Some(size))
    }

    /// Schedules the layout on the tree's layout handler and returns at once.
    ///
    /// The holder is marked valid right away if it still serves the same
    /// descriptor and tree; the measured height is delivered later through the
    /// tree's listeners.
    pub fn compute_layout_async(
        &self,
        context: &ComponentContext,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) {
        let Some(request) = self.prepare_layout(context, width_spec, height_spec) else {
            return;
        };

        request.tree.set_root_and_size_spec_async(
            &request.component,
            width_spec,
            height_spec,
            request.tree_props.as_ref(),
        );

        let mut state = self.lock();
        if state.is_current(&request) {
            state.is_tree_valid = true;
        }
    }

    fn prepare_layout(
        &self,
        context: &ComponentContext,
        width_spec: SizeSpec,
        height_spec: SizeSpec,
    ) -> Option<LayoutRequest> {
        let (render_info, component, factory, handle) = {
            let mut state = self.lock();
            let Some(render_info) = state.render_info.clone() else {
                log::warn!("[{}] layout requested on a released holder", context.log_tag());
                return None;
            };
            // Views have no layout phase.
            let component = Arc::clone(render_info.get_component()?);

            state.last_requested_width_spec = Some(width_spec);
            state.last_requested_height_spec = Some(height_spec);
            if let Some(tree) = state.live_tree() {
                return Some(LayoutRequest {
                    tree: Arc::clone(tree),
                    tree_props: render_info.tree_props().cloned(),
                    render_info,
                    component,
                });
            }
            let handle = WeakHolder {
                holder: self.weak_self.clone(),
                generation: self.generation.load(Ordering::Acquire),
            };
            (
                render_info,
                component,
                state.measure_listener_factory.clone(),
                handle,
            )
        };

        // Factories may call back into this holder, so they run unlocked.
        let measure_listener = factory.map(|factory| factory.create(handle.clone()));

        let mut state = self.lock();
        if self.generation.load(Ordering::Acquire) != handle.generation {
            log::debug!(
                "[{}] holder released while preparing layout of {}",
                context.log_tag(),
                render_info.name()
            );
            return None;
        }
        let tree = self.ensure_component_tree(
            &mut state,
            context,
            &render_info,
            &component,
            measure_listener,
        );

        Some(LayoutRequest {
            tree_props: render_info.tree_props().cloned(),
            render_info,
            component,
            tree,
        })
    }

    /// Returns the live tree, building it first if there is none.
    ///
    /// A tree built by a concurrent layout while the lock was released wins;
    /// `measure_listener` is then dropped.
    fn ensure_component_tree(
        &self,
        state: &mut HolderState,
        context: &ComponentContext,
        render_info: &RenderInfo,
        component: &Arc<dyn Component>,
        measure_listener: Option<Arc<dyn MeasureListener>>,
    ) -> Arc<dyn ComponentTree> {
        if let Some(tree) = state.live_tree() {
            return Arc::clone(tree);
        }

        let state_snapshot = match std::mem::take(&mut state.tree) {
            TreeSlot::Detached(snapshot) => Some(snapshot),
            _ => None,
        };
        let clip_children = render_info
            .custom_attribute(CLIP_CHILDREN)
            .and_then(AttributeValue::as_bool)
            .unwrap_or(true);

        log::trace!(
            "[{}] building tree for {} (restoring state: {})",
            context.log_tag(),
            render_info.name(),
            state_snapshot.is_some()
        );
        let tree = context.engine().create_tree(TreeConfig {
            root: Arc::clone(component),
            policy: state.policy.clone(),
            state_snapshot,
            clip_children,
            has_mounted: state.has_mounted,
            measure_listener,
        });
        if let Some(listener) = &state.pending_layout_listener {
            tree.set_new_layout_state_ready_listener(Some(Arc::clone(listener)));
        }
        state.tree = TreeSlot::Live(Arc::clone(&tree));
        tree
    }

    /// Sets the listener told about new layouts, now and for every tree built
    /// until the holder is released.
    pub fn set_new_layout_ready_listener(
        &self,
        listener: Option<Arc<dyn NewLayoutReadyListener>>,
    ) {
        let mut state = self.lock();
        if let Some(tree) = state.live_tree() {
            tree.set_new_layout_state_ready_listener(listener.clone());
        }
        state.pending_layout_listener = listener;
    }

    pub fn render_info(&self) -> Option<Arc<RenderInfo>> {
        self.lock().render_info.clone()
    }

    /// Replaces the descriptor. Any layout computed so far is no longer valid.
    pub fn set_render_info(&self, render_info: Arc<RenderInfo>) {
        let mut state = self.lock();
        state.is_tree_valid = false;
        state.render_info = Some(render_info);
    }

    pub fn is_tree_valid(&self) -> bool {
        self.lock().is_tree_valid
    }

    pub fn invalidate_tree(&self) {
        self.lock().is_tree_valid = false;
    }

    pub fn component_tree(&self) -> Option<Arc<dyn ComponentTree>> {
        self.lock().live_tree().cloned()
    }

    /// Height from the last committed synchronous layout or from
    /// [`ComponentTreeHolder::set_measured_height`].
    pub fn measured_height(&self) -> Option<i32> {
        self.lock().last_measured_height
    }

    pub fn set_measured_height(&self, height: i32) {
        self.lock().last_measured_height = Some(height);
    }

    /// Specs of the latest layout request, if any was made.
    pub fn last_requested_size_specs(&self) -> Option<(SizeSpec, SizeSpec)> {
        let state = self.lock();
        state
            .last_requested_width_spec
            .zip(state.last_requested_height_spec)
    }

    /// Whether the holder has been inserted into the list yet.
    pub fn is_inserted(&self) -> bool {
        self.lock().is_inserted
    }

    pub fn set_inserted(&self, inserted: bool) {
        self.lock().is_inserted = inserted;
    }

    /// Whether the tree released last had mounted.
    pub fn has_mounted(&self) -> bool {
        self.lock().has_mounted
    }

    pub fn has_state_snapshot(&self) -> bool {
        matches!(self.lock().tree, TreeSlot::Detached(_))
    }

    pub fn clear_state_snapshot(&self) {
        let mut state = self.lock();
        if matches!(state.tree, TreeSlot::Detached(_)) {
            state.tree = TreeSlot::Empty;
        }
    }

    /// Forwards the visible window to the live tree, if there is one.
    pub fn check_working_range_and_dispatch(&self, position: usize, range: VisibilityRange) {
        let state = self.lock();
        if let Some(tree) = state.live_tree() {
            tree.check_working_range_and_dispatch(position, range);
        }
    }

    pub fn render_state(&self) -> RenderState {
        self.render_state.get()
    }

    /// Advances the render progress; moving backwards is ignored.
    pub fn set_render_state(&self, render_state: RenderState) {
        self.render_state.advance(render_state);
    }

    /// Returns true if the tree holds a layout for the latest requested specs.
    ///
    /// Always true for items rendered by a platform view.
    pub fn has_completed_latest_layout(&self) -> bool {
        let state = self.lock();
        let Some(render_info) = &state.render_info else {
            return false;
        };
        if render_info.renders_view() {
            return true;
        }
        match (
            state.live_tree(),
            state.last_requested_width_spec,
            state.last_requested_height_spec,
        ) {
            (Some(tree), Some(width_spec), Some(height_spec)) => {
                tree.has_compatible_layout(width_spec, height_spec)
            }
            _ => false,
        }
    }

    /// Detaches the tree's state and releases the tree, keeping the state for
    /// the next tree. Used when the item leaves the working range.
    pub fn acquire_state_and_release_tree(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        match std::mem::take(&mut state.tree) {
            TreeSlot::Live(tree) => {
                let snapshot = tree.acquire_state_snapshot();
                state.has_mounted = tree.has_mounted();
                tree.release();
                if let Some(snapshot) = snapshot {
                    state.tree = TreeSlot::Detached(snapshot);
                }
            }
            // Already detached or empty; keep whatever state is parked.
            other => state.tree = other,
        }
        state.is_tree_valid = false;
    }

    /// Tears the holder down and offers it back to its pool.
    ///
    /// The tree is released without keeping its state and every field goes
    /// back to its default. Callers must not use their handle afterwards: the
    /// pool may give the same instance to another item.
    pub fn release(self: Arc<Self>) {
        {
            let mut state = self.lock();
            state.release_tree();
            *state = HolderState::default();
            // Bumped under the lock so handle writes see either the old item
            // with its state or the reset holder with a new generation.
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        self.render_state.reset();

        if let Some(pool) = self.pool.upgrade() {
            pool.recycle(self);
        }
    }
}

impl fmt::Debug for ComponentTreeHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        let tree = match &state.tree {
            TreeSlot::Empty => "empty",
            TreeSlot::Live(_) => "live",
            TreeSlot::Detached(_) => "detached",
        };
        f.debug_struct("ComponentTreeHolder")
            .field(
                "render_info",
                &state.render_info.as_ref().map(|info| info.name().to_owned()),
            )
            .field("tree", &tree)
            .field("is_tree_valid", &state.is_tree_valid)
            .field("last_measured_height", &state.last_measured_height)
            .field("is_inserted", &state.is_inserted)
            .field("render_state", &self.render_state.get())
            .finish()
    }
}
