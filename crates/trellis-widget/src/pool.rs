//! Bounded pool of idle holders.
//!
//! Holders are churned constantly while a list scrolls fast. Released holders
//! are kept here, fully reset, and handed to the next acquire instead of
//! allocating a new one. The pool never grows past its capacity; extra
//! holders are simply dropped.

use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use trellis_core::{ExecutionPolicy, RenderInfo};

use crate::holder::{ComponentTreeHolder, MeasureListenerFactory};

/// Matches the default cache size of list adapters.
pub const DEFAULT_POOL_CAPACITY: usize = 8;

static SHARED_POOL: LazyLock<Arc<HolderPool>> =
    LazyLock::new(|| HolderPool::new(PoolPolicy::default()));

/// Policy controlling how many idle holders a pool retains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolPolicy {
    pub capacity: usize,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl PoolPolicy {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

/// Counters for monitoring pool behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Acquires served from the idle list.
    pub hits: u64,
    /// Acquires that allocated a new holder.
    pub misses: u64,
    /// Released holders put back on the idle list.
    pub recycled: u64,
    /// Released holders dropped because the pool was full or the holder was
    /// still referenced elsewhere.
    pub dropped: u64,
}

struct PoolInner {
    idle: Vec<Arc<ComponentTreeHolder>>,
    stats: PoolStats,
}

/// Thread-safe free list of [`ComponentTreeHolder`]s.
pub struct HolderPool {
    inner: Mutex<PoolInner>,
    policy: PoolPolicy,
    weak_self: Weak<HolderPool>,
}

impl HolderPool {
    pub fn new(policy: PoolPolicy) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            inner: Mutex::new(PoolInner {
                idle: Vec::with_capacity(policy.capacity),
                stats: PoolStats::default(),
            }),
            policy,
            weak_self: weak_self.clone(),
        })
    }

    /// Process-wide pool used by [`ComponentTreeHolder::acquire`].
    pub fn shared() -> &'static Arc<HolderPool> {
        &SHARED_POOL
    }

    /// Returns an idle holder configured for `render_info`, or a new one.
    pub fn acquire(
        &self,
        render_info: Arc<RenderInfo>,
        policy: ExecutionPolicy,
        measure_listener_factory: Option<Arc<dyn MeasureListenerFactory>>,
    ) -> Arc<ComponentTreeHolder> {
        let pooled = {
            let mut inner = self.lock();
            let pooled = inner.idle.pop();
            if pooled.is_some() {
                inner.stats.hits += 1;
            } else {
                inner.stats.misses += 1;
            }
            pooled
        };
        let holder = match pooled {
            Some(holder) => {
                log::trace!("reusing pooled holder for {}", render_info.name());
                holder
            }
            None => {
                log::debug!("holder pool empty, allocating for {}", render_info.name());
                ComponentTreeHolder::allocate(self.weak_self.clone())
            }
        };
        holder.configure(render_info, policy, measure_listener_factory);
        holder
    }

    /// Offers a released, already reset holder back to the idle list.
    ///
    /// Returns true if the holder was kept.
    pub(crate) fn recycle(&self, holder: Arc<ComponentTreeHolder>) -> bool {
        // Someone else still holds this instance; handing it out again would
        // share it between two items.
        if Arc::strong_count(&holder) > 1 {
            log::debug!("released holder is still referenced, not pooling it");
            self.lock().stats.dropped += 1;
            return false;
        }
        let mut inner = self.lock();
        if inner.idle.len() >= self.policy.capacity {
            inner.stats.dropped += 1;
            return false;
        }
        inner.idle.push(holder);
        inner.stats.recycled += 1;
        true
    }

    pub fn capacity(&self) -> usize {
        self.policy.capacity
    }

    /// Number of holders waiting to be reused.
    pub fn idle_count(&self) -> usize {
        self.lock().idle.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.lock().stats
    }

    /// Drops every idle holder.
    pub fn clear(&self) {
        self.lock().idle.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for HolderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("HolderPool")
            .field("capacity", &self.policy.capacity)
            .field("idle", &inner.idle.len())
            .field("stats", &inner.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::ViewRenderInfo;

    fn view_info() -> Arc<RenderInfo> {
        RenderInfo::view(ViewRenderInfo { view_type: 0 }).shared()
    }

    #[test]
    fn test_acquire_from_empty_pool_allocates() {
        let pool = HolderPool::new(PoolPolicy::new(2));
        let a = pool.acquire(view_info(), ExecutionPolicy::default(), None);
        let b = pool.acquire(view_info(), ExecutionPolicy::default(), None);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(pool.stats().misses, 2);
        assert_eq!(pool.stats().hits, 0);
    }

    #[test]
    fn test_release_then_acquire_reuses_instance() {
        let pool = HolderPool::new(PoolPolicy::default());
        let holder = pool.acquire(view_info(), ExecutionPolicy::default(), None);
        let address = Arc::as_ptr(&holder);
        holder.release();
        assert_eq!(pool.idle_count(), 1);

        let reused = pool.acquire(view_info(), ExecutionPolicy::default(), None);
        assert_eq!(Arc::as_ptr(&reused), address);
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.stats().hits, 1);
    }

    #[test]
    fn test_pool_never_grows_past_capacity() {
        let pool = HolderPool::new(PoolPolicy::new(3));
        let holders: Vec<_> = (0..10)
            .map(|_| pool.acquire(view_info(), ExecutionPolicy::default(), None))
            .collect();
        for holder in holders {
            holder.release();
        }
        assert_eq!(pool.idle_count(), 3);
        assert_eq!(pool.stats().recycled, 3);
        assert_eq!(pool.stats().dropped, 7);
    }

    #[test]
    fn test_shared_holder_is_not_pooled() {
        let pool = HolderPool::new(PoolPolicy::default());
        let holder = pool.acquire(view_info(), ExecutionPolicy::default(), None);
        let still_used = Arc::clone(&holder);
        holder.release();
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.stats().dropped, 1);

        let fresh = pool.acquire(view_info(), ExecutionPolicy::default(), None);
        assert!(!Arc::ptr_eq(&fresh, &still_used));
    }

    #[test]
    fn test_clear_drops_idle_holders() {
        let pool = HolderPool::new(PoolPolicy::default());
        pool.acquire(view_info(), ExecutionPolicy::default(), None)
            .release();
        assert_eq!(pool.idle_count(), 1);
        pool.clear();
        assert_eq!(pool.idle_count(), 0);
    }
}
