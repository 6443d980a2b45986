//! Compass directions on the planet grid.
//!
//! Directions are stored as compass degrees (0 = north, clockwise positive).
//! All arithmetic wraps modulo 360, so a quarter turn clockwise from
//! [`Direction::West`] is [`Direction::North`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four cardinal directions, valued in compass degrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Direction {
    North = 0,
    East = 90,
    South = 180,
    West = 270,
}

impl Direction {
    /// All directions in slot order (N, E, S, W).
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Compass degrees of this direction.
    #[inline]
    pub const fn degrees(self) -> i32 {
        self as i32
    }

    /// Slot index in `[0, 4)`, matching [`Direction::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        (self as i32 / 90) as usize
    }

    /// Direction from a slot index; wraps modulo 4.
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// Direction from compass degrees. Only exact multiples of 90 are
    /// accepted; any integer is first wrapped into `[0, 360)`.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Direction::North),
            90 => Some(Direction::East),
            180 => Some(Direction::South),
            270 => Some(Direction::West),
            _ => None,
        }
    }

    /// Rotate by `quarter_turns` (positive = clockwise).
    #[inline]
    pub fn rotate(self, quarter_turns: i32) -> Self {
        let index = (self.index() as i32 + quarter_turns).rem_euclid(4);
        Self::from_index(index as usize)
    }

    /// Quarter turn clockwise.
    #[inline]
    pub fn clockwise(self) -> Self {
        self.rotate(1)
    }

    /// Quarter turn counter-clockwise.
    #[inline]
    pub fn counter_clockwise(self) -> Self {
        self.rotate(-1)
    }

    /// The direction pointing the other way.
    #[inline]
    pub fn opposite(self) -> Self {
        self.rotate(2)
    }

    /// Shortest signed number of quarter turns from `self` to `other`.
    ///
    /// Result is in `-1..=2`; a half turn is reported as `2`.
    pub fn turns_to(self, other: Direction) -> i32 {
        match (other.index() as i32 - self.index() as i32).rem_euclid(4) {
            3 => -1,
            n => n,
        }
    }

    /// Unit grid offset `(dx, dy)`; north is +y, east is +x.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    /// Heading in radians, compass convention.
    #[inline]
    pub fn radians(self) -> f32 {
        (self.degrees() as f32).to_radians()
    }
}

impl From<Direction> for i32 {
    fn from(direction: Direction) -> Self {
        direction.degrees()
    }
}

impl TryFrom<i32> for Direction {
    type Error = String;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        Direction::from_degrees(degrees)
            .ok_or_else(|| format!("{degrees} is not a cardinal direction"))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "N",
            Direction::East => "E",
            Direction::South => "S",
            Direction::West => "W",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(Direction::West.clockwise(), Direction::North);
        assert_eq!(Direction::North.counter_clockwise(), Direction::West);
        assert_eq!(Direction::East.rotate(6), Direction::West);
        assert_eq!(Direction::South.rotate(-5), Direction::East);
    }

    #[test]
    fn test_opposite() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_ne!(d.opposite(), d);
        }
        assert_eq!(Direction::North.opposite(), Direction::South);
        assert_eq!(Direction::East.opposite(), Direction::West);
    }

    #[test]
    fn test_turns_to() {
        assert_eq!(Direction::North.turns_to(Direction::East), 1);
        assert_eq!(Direction::North.turns_to(Direction::West), -1);
        assert_eq!(Direction::North.turns_to(Direction::South), 2);
        assert_eq!(Direction::West.turns_to(Direction::North), 1);
        for d in Direction::ALL {
            assert_eq!(d.turns_to(d), 0);
            for other in Direction::ALL {
                assert_eq!(d.rotate(d.turns_to(other)), other);
            }
        }
    }

    #[test]
    fn test_degrees_roundtrip_and_wrapping() {
        assert_eq!(Direction::from_degrees(360), Some(Direction::North));
        assert_eq!(Direction::from_degrees(-90), Some(Direction::West));
        assert_eq!(Direction::from_degrees(45), None);
        for d in Direction::ALL {
            assert_eq!(Direction::from_degrees(d.degrees()), Some(d));
            assert_eq!(Direction::from_index(d.index()), d);
        }
    }

    #[test]
    fn test_serde_as_degrees() {
        let json = serde_json::to_string(&Direction::South).unwrap();
        assert_eq!(json, "180");
        let parsed: Direction = serde_json::from_str("270").unwrap();
        assert_eq!(parsed, Direction::West);
        assert!(serde_json::from_str::<Direction>("100").is_err());
    }
}
