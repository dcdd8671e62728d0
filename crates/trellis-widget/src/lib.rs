//! Recycling component tree holders and their pool for Trellis lists

mod holder;
mod pool;
mod render_state;

pub use holder::*;
pub use pool::*;
pub use render_state::RenderState;

pub mod prelude {
    pub use crate::holder::{ComponentTreeHolder, MeasureListenerFactory, WeakHolder};
    pub use crate::pool::{HolderPool, PoolPolicy, PoolStats};
    pub use crate::render_state::RenderState;
    pub use trellis_core::prelude::*;
}
