use std::sync::atomic::{AtomicU8, Ordering};

/// How far an item has progressed towards the screen.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RenderState {
    #[default]
    Uninitialized = 0,
    /// The item was handed to the list.
    Added = 1,
    /// The item was drawn at least once.
    Drawn = 2,
}

impl RenderState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RenderState::Added,
            2 => RenderState::Drawn,
            _ => RenderState::Uninitialized,
        }
    }
}

/// Lock-free cell holding a [`RenderState`].
///
/// Only moves forward until [`RenderStateCell::reset`].
#[derive(Debug, Default)]
pub(crate) struct RenderStateCell(AtomicU8);

impl RenderStateCell {
    pub(crate) fn get(&self) -> RenderState {
        RenderState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `state` unless the cell is already further along.
    pub(crate) fn advance(&self, state: RenderState) -> RenderState {
        RenderState::from_u8(self.0.fetch_max(state as u8, Ordering::AcqRel))
    }

    pub(crate) fn reset(&self) {
        self.0.store(RenderState::Uninitialized as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_uninitialized() {
        let cell = RenderStateCell::default();
        assert_eq!(cell.get(), RenderState::Uninitialized);
    }

    #[test]
    fn test_advance_never_goes_back() {
        let cell = RenderStateCell::default();
        cell.advance(RenderState::Drawn);
        let previous = cell.advance(RenderState::Added);
        assert_eq!(previous, RenderState::Drawn);
        assert_eq!(cell.get(), RenderState::Drawn);
    }

    #[test]
    fn test_reset() {
        let cell = RenderStateCell::default();
        cell.advance(RenderState::Added);
        cell.reset();
        assert_eq!(cell.get(), RenderState::Uninitialized);
    }
}
