//! Value types shared by the planet graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::weight::Weight;

/// Integer grid coordinate of a junction.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Node {
    pub x: i32,
    pub y: i32,
}

impl Node {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Grid neighbour one cell away in `direction`.
    #[inline]
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<(i32, i32)> for Node {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A node together with a direction: a path endpoint, a route step, or
/// the robot's confirmed pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub node: Node,
    pub direction: Direction,
}

impl Position {
    #[inline]
    pub const fn new(node: Node, direction: Direction) -> Self {
        Self { node, direction }
    }

    /// Shorthand for tests and literals.
    #[inline]
    pub const fn at(x: i32, y: i32, direction: Direction) -> Self {
        Self::new(Node::new(x, y), direction)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(Node::default(), Direction::North)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.node, self.direction)
    }
}

/// One directional slot of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Edge {
    /// Far endpoint, once known.
    pub target: Option<Position>,
    pub weight: Weight,
}

impl Edge {
    pub const UNKNOWN: Edge = Edge {
        target: None,
        weight: Weight::Unknown,
    };
}

/// The four slots of a node, indexed by [`Direction::index`].
pub type Slots = [Edge; 4];

/// A traversable edge as seen by path search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreeEdge {
    pub target: Position,
    pub cost: u32,
}
