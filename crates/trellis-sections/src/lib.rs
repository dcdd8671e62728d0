//! Sections that turn prop diffs into list change sets

mod change_set;
mod context;
mod diff;
mod single_component_section;

pub use change_set::*;
pub use context::*;
pub use diff::*;
pub use single_component_section::*;

pub mod prelude {
    pub use crate::change_set::{Change, ChangeSet};
    pub use crate::context::SectionContext;
    pub use crate::diff::Diff;
    pub use crate::single_component_section::SingleComponentSection;
}
