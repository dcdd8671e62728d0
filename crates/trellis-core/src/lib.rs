//! Render descriptors, size specs and the layout engine contract for Trellis

mod collections;
mod engine;
mod error;
mod layout_handler;
mod policy;
mod render_info;
mod spec;
mod state;

pub use engine::*;
pub use error::*;
pub use layout_handler::*;
pub use policy::*;
pub use render_info::*;
pub use spec::*;
pub use state::*;

pub mod prelude {
    pub use crate::engine::{ComponentContext, ComponentTree, LayoutEngine, TreeConfig};
    pub use crate::error::LayoutError;
    pub use crate::policy::ExecutionPolicy;
    pub use crate::render_info::{Component, RenderInfo};
    pub use crate::spec::{Size, SizeSpec, SizeSpecMode};
    pub use crate::state::StateSnapshot;
}
