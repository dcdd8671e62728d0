//! Testing utilities and an in-process layout engine for Trellis

mod component;
mod engine;
mod gate;

pub use component::TestComponent;
pub use engine::*;
pub use gate::LayoutGate;

pub mod prelude {
    pub use crate::component::TestComponent;
    pub use crate::engine::{TestComponentTree, TestLayoutEngine};
    pub use crate::gate::LayoutGate;
}
