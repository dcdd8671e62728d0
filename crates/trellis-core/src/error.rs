use std::fmt;

/// Failure reported by a layout engine while computing a layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// The component tree failed to measure its root.
    Measure(String),
    /// The tree was released before the layout ran.
    Released,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Measure(reason) => write!(f, "layout failed: {reason}"),
            LayoutError::Released => f.write_str("layout requested on a released tree"),
        }
    }
}

impl std::error::Error for LayoutError {}
