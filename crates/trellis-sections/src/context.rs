use std::sync::Arc;

use trellis_core::TreeProps;

/// What a section sees of its place in the section hierarchy.
#[derive(Clone, Debug, Default)]
pub struct SectionContext {
    tree_props: Option<Arc<TreeProps>>,
    log_tag: Option<Arc<str>>,
}

impl SectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree_props(mut self, tree_props: TreeProps) -> Self {
        self.tree_props = Some(Arc::new(tree_props));
        self
    }

    pub fn with_log_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.log_tag = Some(tag.into());
        self
    }

    pub fn tree_props(&self) -> Option<&Arc<TreeProps>> {
        self.tree_props.as_ref()
    }

    /// Independent copy of the tree props for an item descriptor.
    ///
    /// Later changes to this context's props do not reach items already
    /// emitted.
    pub fn tree_props_copy(&self) -> Option<Arc<TreeProps>> {
        self.tree_props
            .as_deref()
            .map(|props| Arc::new(props.clone()))
    }

    pub fn log_tag(&self) -> &str {
        self.log_tag.as_deref().unwrap_or("trellis")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_props_copy_is_a_new_allocation() {
        let context = SectionContext::new().with_tree_props(TreeProps::new().with(5u8));
        let copy = context.tree_props_copy().expect("props set");
        let original = context.tree_props().expect("props set");
        assert!(!Arc::ptr_eq(original, &copy));
        assert_eq!(copy.get::<u8>(), Some(&5));
    }

    #[test]
    fn test_no_tree_props() {
        let context = SectionContext::new();
        assert!(context.tree_props_copy().is_none());
        assert_eq!(context.log_tag(), "trellis");
    }
}
