//! Arena operating modes and per-push flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// How an arena obtains physical backing as it grows.
///
/// The mode is fixed when the arena is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArenaMode {
    /// One reservation of `limit` bytes, grown by committing further
    /// `commit_size` slices in place.
    Contiguous,
    /// A stack of independently reserved blocks. Used on hosts that can
    /// only commit a reservation all at once.
    Chained,
}

impl fmt::Display for ArenaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contiguous => write!(f, "contiguous"),
            Self::Chained => write!(f, "chained"),
        }
    }
}

/// Options for a single push.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PushFlags(u32);

impl PushFlags {
    /// Default behaviour: the returned bytes are zero-filled.
    pub const NONE: Self = Self(0);

    /// Skip zero-filling. The caller promises to overwrite the bytes.
    pub const NO_ZERO: Self = Self(1 << 0);

    /// Whether every flag in `other` is also set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bit pattern.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for PushFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PushFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
