//! Per-item execution policy handed to every tree a holder builds.

use std::fmt;
use std::sync::Arc;

use crate::layout_handler::LayoutHandler;

/// How layout and mount-content work for one list item is executed.
///
/// Copied into a holder when it is acquired and cleared when it is released.
#[derive(Clone, Default)]
pub struct ExecutionPolicy {
    /// Handler that runs asynchronous layout. `None` lets the engine choose.
    pub layout_handler: Option<Arc<dyn LayoutHandler>>,

    /// Whether display lists may be prefetched ahead of drawing.
    pub can_prefetch_display_lists: bool,

    /// Whether drawn display lists may be cached.
    pub can_cache_drawing_display_lists: bool,

    /// Handler that preallocates mount content.
    pub preallocate_mount_content_handler: Option<Arc<dyn LayoutHandler>>,

    /// Whether mount content may be preallocated on the engine's default handler.
    pub can_preallocate_on_default_handler: bool,

    /// Whether preallocation is limited to each mount spec's own pool size.
    pub should_preallocate_per_mount_spec: bool,

    /// Tag used by engines that split layout across threads.
    pub split_layout_tag: Option<Arc<str>>,
}

impl ExecutionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout_handler(mut self, handler: Arc<dyn LayoutHandler>) -> Self {
        self.layout_handler = Some(handler);
        self
    }

    pub fn with_display_lists(mut self, can_prefetch: bool, can_cache_drawing: bool) -> Self {
        self.can_prefetch_display_lists = can_prefetch;
        self.can_cache_drawing_display_lists = can_cache_drawing;
        self
    }

    pub fn with_preallocation(
        mut self,
        handler: Option<Arc<dyn LayoutHandler>>,
        on_default_handler: bool,
        per_mount_spec: bool,
    ) -> Self {
        self.preallocate_mount_content_handler = handler;
        self.can_preallocate_on_default_handler = on_default_handler;
        self.should_preallocate_per_mount_spec = per_mount_spec;
        self
    }

    pub fn with_split_layout_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.split_layout_tag = Some(tag.into());
        self
    }
}

impl fmt::Debug for ExecutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPolicy")
            .field("layout_handler", &self.layout_handler.is_some())
            .field("can_prefetch_display_lists", &self.can_prefetch_display_lists)
            .field(
                "can_cache_drawing_display_lists",
                &self.can_cache_drawing_display_lists,
            )
            .field(
                "preallocate_mount_content_handler",
                &self.preallocate_mount_content_handler.is_some(),
            )
            .field(
                "can_preallocate_on_default_handler",
                &self.can_preallocate_on_default_handler,
            )
            .field(
                "should_preallocate_per_mount_spec",
                &self.should_preallocate_per_mount_spec,
            )
            .field("split_layout_tag", &self.split_layout_tag)
            .finish()
    }
}
