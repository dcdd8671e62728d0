#[cfg(feature = "std-hash")]
pub(crate) mod map {
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub(crate) mod map {
    pub use rustc_hash::FxHashMap as HashMap;
}
