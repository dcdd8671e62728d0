/// Previous and next value of one section prop.
///
/// An optional prop that was never set has `None` on both sides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diff<T> {
    pub previous: Option<T>,
    pub next: Option<T>,
}

impl<T> Default for Diff<T> {
    fn default() -> Self {
        Self {
            previous: None,
            next: None,
        }
    }
}

impl<T> Diff<T> {
    pub fn new(previous: Option<T>, next: Option<T>) -> Self {
        Self { previous, next }
    }

    /// Diff for a prop that appears for the first time.
    pub fn added(next: T) -> Self {
        Self::new(None, Some(next))
    }

    /// Diff for a prop that goes away.
    pub fn removed(previous: T) -> Self {
        Self::new(Some(previous), None)
    }

    pub fn changed(previous: T, next: T) -> Self {
        Self::new(Some(previous), Some(next))
    }
}

impl<T: Copy> Diff<T> {
    /// Previous value, or `default` when the prop was not set.
    pub fn previous_or(&self, default: T) -> T {
        self.previous.unwrap_or(default)
    }

    /// Next value, or `default` when the prop is not set.
    pub fn next_or(&self, default: T) -> T {
        self.next.unwrap_or(default)
    }
}
