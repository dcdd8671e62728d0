//! Section that renders exactly one component as one list item.

use std::sync::Arc;

use trellis_core::{Component, RenderInfo};

use crate::change_set::ChangeSet;
use crate::context::SectionContext;
use crate::diff::Diff;

const DEFAULT_STICKY: bool = false;
const DEFAULT_SPAN_SIZE: u32 = 1;
const DEFAULT_FULL_SPAN: bool = false;

/// Prop diffs of a single-component section between two renders.
#[derive(Clone, Debug, Default)]
pub struct SingleComponentSection {
    pub component: Diff<Arc<dyn Component>>,
    pub sticky: Diff<bool>,
    pub span_size: Diff<u32>,
    pub is_full_span: Diff<bool>,
}

impl SingleComponentSection {
    pub fn new(component: Diff<Arc<dyn Component>>) -> Self {
        Self {
            component,
            ..Self::default()
        }
    }

    pub fn with_sticky(mut self, sticky: Diff<bool>) -> Self {
        self.sticky = sticky;
        self
    }

    pub fn with_span_size(mut self, span_size: Diff<u32>) -> Self {
        self.span_size = span_size;
        self
    }

    pub fn with_full_span(mut self, is_full_span: Diff<bool>) -> Self {
        self.is_full_span = is_full_span;
        self
    }

    /// Computes the change to this section's single item.
    ///
    /// The item is deleted when the next component is missing, inserted when
    /// there was no previous one, and updated when its layout props changed or
    /// the new component is not equivalent to the old one.
    pub fn create_change_set(&self, context: &SectionContext) -> ChangeSet {
        let mut changes = ChangeSet::new();
        let Some(next) = &self.component.next else {
            log::trace!("[{}] single component removed", context.log_tag());
            changes.delete(0);
            return changes;
        };

        let is_sticky = self.sticky.next_or(DEFAULT_STICKY);
        let span_size = self.span_size.next_or(DEFAULT_SPAN_SIZE);
        let is_full_span = self.is_full_span.next_or(DEFAULT_FULL_SPAN);
        let render_info = || {
            RenderInfo::component(Arc::clone(next))
                .sticky(is_sticky)
                .span_size(span_size)
                .full_span(is_full_span)
                .tree_props(context.tree_props_copy())
                .shared()
        };

        let Some(previous) = &self.component.previous else {
            log::trace!("[{}] inserting {}", context.log_tag(), next.simple_name());
            changes.insert(0, render_info());
            return changes;
        };

        let props_changed = self.sticky.previous_or(DEFAULT_STICKY) != is_sticky
            || self.span_size.previous_or(DEFAULT_SPAN_SIZE) != span_size
            || self.is_full_span.previous_or(DEFAULT_FULL_SPAN) != is_full_span;
        if props_changed || !previous.is_equivalent_to(next.as_ref()) {
            log::trace!("[{}] updating {}", context.log_tag(), next.simple_name());
            changes.update(0, render_info());
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_set::Change;
    use trellis_core::TreeProps;
    use trellis_testing::TestComponent;

    fn single(change_set: &ChangeSet) -> &Change {
        assert_eq!(change_set.len(), 1, "expected one change: {change_set:?}");
        &change_set.changes()[0]
    }

    #[test]
    fn test_missing_next_component_deletes() {
        let section = SingleComponentSection::new(Diff::removed(TestComponent::shared("a")));
        let changes = section.create_change_set(&SectionContext::new());
        assert!(matches!(single(&changes), Change::Delete { index: 0 }));
    }

    #[test]
    fn test_new_component_inserts_with_defaults() {
        let section = SingleComponentSection::new(Diff::added(TestComponent::shared("a")));
        let changes = section.create_change_set(&SectionContext::new());

        let Change::Insert { index, render_info } = single(&changes) else {
            panic!("expected insert");
        };
        assert_eq!(*index, 0);
        assert!(!render_info.is_sticky());
        assert_eq!(render_info.span_size(), 1);
        assert!(!render_info.is_full_span());
        assert_eq!(render_info.name(), "a");
    }

    #[test]
    fn test_insert_uses_next_layout_props() {
        let section = SingleComponentSection::new(Diff::added(TestComponent::shared("a")))
            .with_sticky(Diff::added(true))
            .with_span_size(Diff::added(3))
            .with_full_span(Diff::added(true));
        let changes = section.create_change_set(&SectionContext::new());

        let info = single(&changes).render_info().expect("descriptor");
        assert!(info.is_sticky());
        assert_eq!(info.span_size(), 3);
        assert!(info.is_full_span());
    }

    #[test]
    fn test_equivalent_component_without_prop_changes_is_noop() {
        let section = SingleComponentSection::new(Diff::changed(
            TestComponent::shared("a"),
            TestComponent::shared("a"),
        ))
        .with_span_size(Diff::changed(2, 2));
        let changes = section.create_change_set(&SectionContext::new());
        assert!(changes.is_empty());
    }

    #[test]
    fn test_unset_prop_equals_its_default() {
        let section = SingleComponentSection::new(Diff::changed(
            TestComponent::shared("a"),
            TestComponent::shared("a"),
        ))
        .with_sticky(Diff::added(false))
        .with_span_size(Diff::removed(1));
        assert!(section.create_change_set(&SectionContext::new()).is_empty());
    }

    #[test]
    fn test_component_change_updates() {
        let section = SingleComponentSection::new(Diff::changed(
            TestComponent::shared("a"),
            TestComponent::shared("b"),
        ));
        let changes = section.create_change_set(&SectionContext::new());
        let Change::Update { index, render_info } = single(&changes) else {
            panic!("expected update");
        };
        assert_eq!(*index, 0);
        assert_eq!(render_info.name(), "b");
    }

    #[test]
    fn test_layout_prop_change_updates() {
        let component = TestComponent::shared("a");
        for section in [
            SingleComponentSection::new(Diff::changed(Arc::clone(&component), Arc::clone(&component)))
                .with_sticky(Diff::changed(false, true)),
            SingleComponentSection::new(Diff::changed(Arc::clone(&component), Arc::clone(&component)))
                .with_span_size(Diff::added(2)),
            SingleComponentSection::new(Diff::changed(Arc::clone(&component), Arc::clone(&component)))
                .with_full_span(Diff::changed(true, false)),
        ] {
            let changes = section.create_change_set(&SectionContext::new());
            assert!(matches!(single(&changes), Change::Update { index: 0, .. }));
        }
    }

    #[test]
    fn test_descriptors_carry_tree_props_copy() {
        let context = SectionContext::new().with_tree_props(TreeProps::new().with(42u32));
        let section = SingleComponentSection::new(Diff::added(TestComponent::shared("a")));
        let changes = section.create_change_set(&context);

        let info = single(&changes).render_info().expect("descriptor");
        let props = info.tree_props().expect("props copied");
        assert_eq!(props.get::<u32>(), Some(&42));
        assert!(!Arc::ptr_eq(props, context.tree_props().expect("props set")));
    }
}
