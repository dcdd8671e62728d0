//! Packed measure specs and integer sizes.
//!
//! A [`SizeSpec`] packs a measuring mode and a pixel size into one `i32`, the
//! same encoding list adapters hand down from their host views. The two high
//! bits hold the mode and the low 30 bits hold the size.

use std::fmt;

const MODE_SHIFT: u32 = 30;
const MODE_MASK: i32 = 0x3 << MODE_SHIFT;
const SIZE_MASK: i32 = !MODE_MASK;

/// Largest size that fits in a packed spec.
pub const MAX_SPEC_SIZE: i32 = SIZE_MASK;

/// How a parent constrains a child along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeSpecMode {
    /// The child may be as large as it wants.
    Unspecified,
    /// The child must be exactly the given size.
    Exactly,
    /// The child may be at most the given size.
    AtMost,
}

impl SizeSpecMode {
    const fn bits(self) -> i32 {
        match self {
            SizeSpecMode::Unspecified => 0,
            SizeSpecMode::Exactly => 1 << MODE_SHIFT,
            SizeSpecMode::AtMost => 2 << MODE_SHIFT,
        }
    }
}

/// A measuring constraint for one axis.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeSpec(i32);

impl SizeSpec {
    /// Raw value used by hosts before any layout was requested.
    pub const UNINITIALIZED: SizeSpec = SizeSpec(-1);

    /// Packs `mode` and `size`. Sizes are clamped to `0..=MAX_SPEC_SIZE`.
    pub const fn new(mode: SizeSpecMode, size: i32) -> Self {
        let size = if size < 0 {
            0
        } else if size > MAX_SPEC_SIZE {
            MAX_SPEC_SIZE
        } else {
            size
        };
        Self(mode.bits() | size)
    }

    pub const fn exactly(size: i32) -> Self {
        Self::new(SizeSpecMode::Exactly, size)
    }

    pub const fn at_most(size: i32) -> Self {
        Self::new(SizeSpecMode::AtMost, size)
    }

    pub const fn unspecified() -> Self {
        Self::new(SizeSpecMode::Unspecified, 0)
    }

    /// Wraps a raw packed value as received from a host.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    pub const fn is_uninitialized(self) -> bool {
        self.0 == Self::UNINITIALIZED.0
    }

    pub const fn mode(self) -> SizeSpecMode {
        match (self.0 & MODE_MASK) >> MODE_SHIFT & 0x3 {
            1 => SizeSpecMode::Exactly,
            2 => SizeSpecMode::AtMost,
            _ => SizeSpecMode::Unspecified,
        }
    }

    pub const fn size(self) -> i32 {
        self.0 & SIZE_MASK
    }

    /// Picks the size a child should take given the size it would like.
    pub fn resolve(self, desired: i32) -> i32 {
        match self.mode() {
            SizeSpecMode::Exactly => self.size(),
            SizeSpecMode::AtMost => desired.min(self.size()),
            SizeSpecMode::Unspecified => desired,
        }
    }
}

impl fmt::Debug for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_uninitialized() {
            return f.write_str("SizeSpec(UNINITIALIZED)");
        }
        write!(f, "SizeSpec({:?} {})", self.mode(), self.size())
    }
}

impl From<SizeSpec> for i32 {
    fn from(spec: SizeSpec) -> Self {
        spec.raw()
    }
}

/// Measured size in integer pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub const ZERO: Size = Size {
        width: 0,
        height: 0,
    };
}
