//! Operations a section asks the list to apply to its items.

use std::sync::Arc;

use smallvec::SmallVec;
use trellis_core::RenderInfo;

/// One change to the items of a section, indexed relative to the section.
#[derive(Clone, Debug)]
pub enum Change {
    Insert {
        index: usize,
        render_info: Arc<RenderInfo>,
    },
    Update {
        index: usize,
        render_info: Arc<RenderInfo>,
    },
    Delete {
        index: usize,
    },
}

impl Change {
    pub fn index(&self) -> usize {
        match self {
            Change::Insert { index, .. }
            | Change::Update { index, .. }
            | Change::Delete { index } => *index,
        }
    }

    /// Descriptor the item gets, `None` for deletions.
    pub fn render_info(&self) -> Option<&Arc<RenderInfo>> {
        match self {
            Change::Insert { render_info, .. } | Change::Update { render_info, .. } => {
                Some(render_info)
            }
            Change::Delete { .. } => None,
        }
    }
}

/// Ordered changes produced by one diff pass.
///
/// Most sections emit at most one change per pass, so the first one is kept
/// inline.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    changes: SmallVec<[Change; 1]>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize, render_info: Arc<RenderInfo>) {
        self.changes.push(Change::Insert { index, render_info });
    }

    pub fn update(&mut self, index: usize, render_info: Arc<RenderInfo>) {
        self.changes.push(Change::Update { index, render_info });
    }

    pub fn delete(&mut self, index: usize) {
        self.changes.push(Change::Delete { index });
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Net change in item count after applying every change.
    pub fn count_delta(&self) -> isize {
        self.changes
            .iter()
            .map(|change| match change {
                Change::Insert { .. } => 1,
                Change::Update { .. } => 0,
                Change::Delete { .. } => -1,
            })
            .sum()
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = smallvec::IntoIter<[Change; 1]>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::ViewRenderInfo;

    fn info() -> Arc<RenderInfo> {
        RenderInfo::view(ViewRenderInfo { view_type: 7 }).shared()
    }

    #[test]
    fn test_changes_keep_order() {
        let mut changes = ChangeSet::new();
        changes.insert(0, info());
        changes.update(1, info());
        changes.delete(2);

        let indices: Vec<_> = changes.iter().map(Change::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(changes.changes()[2].render_info().is_none());
        assert_eq!(changes.count_delta(), 0);
    }

    #[test]
    fn test_empty_change_set() {
        let changes = ChangeSet::new();
        assert!(changes.is_empty());
        assert_eq!(changes.len(), 0);
        assert_eq!(changes.into_iter().count(), 0);
    }
}
