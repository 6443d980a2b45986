//! Path weights.
//!
//! A weight is both the cost of a path and the state of our knowledge about
//! it. Only [`Weight::Unknown`] and [`Weight::Detected`] can be overwritten;
//! the other states are terminal.

use std::fmt;
use std::num::NonZeroU32;

/// Wire value for a blocked path.
pub const WIRE_BLOCKED: i64 = -1;
/// Wire value reserved for an unknown slot (never accepted from the wire).
pub const WIRE_UNKNOWN: i64 = -2;
/// Wire value for a direction with no path.
pub const WIRE_NO_PATH: i64 = -3;
/// Wire value for a path that was seen but not yet driven.
pub const WIRE_DETECTED: i64 = 0;

/// Status and cost of one directional edge slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Weight {
    /// Nothing observed yet.
    #[default]
    Unknown,
    /// Observed: no line leaves the node in this direction.
    NoPath,
    /// Observed: a line leaves the node, destination not yet confirmed.
    Detected,
    /// Confirmed by the mothership as impassable.
    Blocked,
    /// Confirmed by the mothership as passable with a positive cost.
    Free(NonZeroU32),
}

impl Weight {
    /// Free weight with the given cost. A zero cost carries no information
    /// and is recorded as [`Weight::Detected`].
    pub fn free(cost: u32) -> Self {
        NonZeroU32::new(cost).map_or(Weight::Detected, Weight::Free)
    }

    /// Whether a slot holding this weight may still be overwritten.
    #[inline]
    pub fn is_writable(self) -> bool {
        matches!(self, Weight::Unknown | Weight::Detected)
    }

    /// Whether this weight is terminal (Free, Blocked or NoPath).
    #[inline]
    pub fn is_terminal(self) -> bool {
        !self.is_writable()
    }

    /// Whether the slot still belongs on the exploration frontier.
    #[inline]
    pub fn is_unresolved(self) -> bool {
        self.is_writable()
    }

    /// Traversal cost, for Free weights only.
    #[inline]
    pub fn cost(self) -> Option<u32> {
        match self {
            Weight::Free(cost) => Some(cost.get()),
            _ => None,
        }
    }

    /// Decode a wire weight. Returns `None` for values with no meaning,
    /// including the value reserved for Unknown.
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            v if v > 0 => u32::try_from(v).ok().map(Weight::free),
            WIRE_DETECTED => Some(Weight::Detected),
            WIRE_BLOCKED => Some(Weight::Blocked),
            WIRE_NO_PATH => Some(Weight::NoPath),
            _ => None,
        }
    }

    /// Encode as the signed wire value.
    pub fn to_wire(self) -> i64 {
        match self {
            Weight::Unknown => WIRE_UNKNOWN,
            Weight::NoPath => WIRE_NO_PATH,
            Weight::Detected => WIRE_DETECTED,
            Weight::Blocked => WIRE_BLOCKED,
            Weight::Free(cost) => i64::from(cost.get()),
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Unknown => f.write_str("unknown"),
            Weight::NoPath => f.write_str("no-path"),
            Weight::Detected => f.write_str("detected"),
            Weight::Blocked => f.write_str("blocked"),
            Weight::Free(cost) => write!(f, "free({cost})"),
        }
    }
}
