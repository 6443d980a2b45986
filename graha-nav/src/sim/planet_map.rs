//! Ground-truth planet for the simulation
//!
//! Described in TOML:
//!
//! ```toml
//! name = "Demo"
//! start = { x = 0, y = 0, orientation = 0 }
//!
//! [target]          # optional
//! x = 1
//! y = 1
//! after_paths = 2   # announced once this many paths are confirmed
//!
//! [[paths]]
//! start = [0, 0, 0]     # x, y, direction in degrees
//! end = [0, 1, 180]
//! weight = 1            # wire weight: > 0 free, -1 blocked
//! unveiled = false      # announce with the first confirmation
//! ```
//!
//! Every path is indexed from both ends. The path behind the start pose is
//! added as a blocked dead end unless the file describes it.

use std::collections::HashMap;
use std::path::Path;

use graha_map::{Direction, Node, Position, Weight};
use serde::Deserialize;

use crate::error::{NavError, Result};

#[derive(Clone, Debug, Deserialize)]
struct PlanetFile {
    name: String,
    start: StartEntry,
    #[serde(default)]
    target: Option<TargetEntry>,
    #[serde(default)]
    paths: Vec<PathEntry>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct StartEntry {
    x: i32,
    y: i32,
    orientation: Direction,
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct TargetEntry {
    x: i32,
    y: i32,
    #[serde(default)]
    after_paths: usize,
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct PathEntry {
    start: (i32, i32, Direction),
    end: (i32, i32, Direction),
    weight: i64,
    #[serde(default)]
    unveiled: bool,
}

/// The far end of a true path, seen from one of its slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TruePath {
    pub end: Position,
    pub weight: Weight,
}

/// A target announcement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Target {
    pub node: Node,
    /// Confirmed paths before the target is announced
    pub after_paths: usize,
}

#[derive(Clone, Debug)]
pub struct PlanetMap {
    name: String,
    start: Position,
    target: Option<Target>,
    paths: HashMap<Position, TruePath>,
    unveiled: Vec<(Position, TruePath)>,
}

impl PlanetMap {
    /// Load a planet description from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: PlanetFile = toml::from_str(content)?;
        Self::from_file(file)
    }

    /// The bundled demo planet.
    pub fn demo() -> Result<Self> {
        Self::from_toml_str(include_str!("../../planets/demo.toml"))
    }

    fn from_file(file: PlanetFile) -> Result<Self> {
        if file.name.is_empty() || file.name.contains(['/', '#', '+']) {
            return Err(NavError::Config(format!(
                "planet name {:?} is not a valid topic segment",
                file.name
            )));
        }

        let start = Position::at(file.start.x, file.start.y, file.start.orientation);
        let mut planet = PlanetMap {
            name: file.name,
            start,
            target: file.target.map(|t| Target {
                node: Node::new(t.x, t.y),
                after_paths: t.after_paths,
            }),
            paths: HashMap::new(),
            unveiled: Vec::new(),
        };

        for path in file.paths {
            let from = Position::at(path.start.0, path.start.1, path.start.2);
            let to = Position::at(path.end.0, path.end.1, path.end.2);
            let weight = match Weight::from_wire(path.weight) {
                Some(w @ (Weight::Free(_) | Weight::Blocked)) => w,
                _ => {
                    return Err(NavError::Config(format!(
                        "path {from} -> {to}: weight {} is neither free nor blocked",
                        path.weight
                    )));
                }
            };
            planet.insert(from, to, weight)?;
            if path.unveiled {
                planet.unveiled.push((from, TruePath { end: to, weight }));
            }
        }

        let spur = Position::new(start.node, start.direction.opposite());
        if !planet.paths.contains_key(&spur) {
            planet.insert(spur, spur, Weight::Blocked)?;
        }

        tracing::debug!(
            "Planet {} loaded: {} path slots, start {}",
            planet.name,
            planet.paths.len(),
            planet.start
        );
        Ok(planet)
    }

    fn insert(&mut self, from: Position, to: Position, weight: Weight) -> Result<()> {
        for (slot, end) in [(from, to), (to, from)] {
            if let Some(existing) = self.paths.get(&slot)
                && existing.end != end
            {
                return Err(NavError::Config(format!(
                    "slot {slot} already leads to {}, cannot also lead to {end}",
                    existing.end
                )));
            }
            self.paths.insert(slot, TruePath { end, weight });
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Robot start pose.
    pub fn start(&self) -> Position {
        self.start
    }

    pub fn target(&self) -> Option<Target> {
        self.target
    }

    /// The true path leaving `slot`, if any.
    pub fn path_at(&self, slot: Position) -> Option<TruePath> {
        self.paths.get(&slot).copied()
    }

    /// Every path slot with its far end (each path appears from both ends).
    pub fn paths(&self) -> impl Iterator<Item = (Position, TruePath)> + '_ {
        self.paths.iter().map(|(&slot, &path)| (slot, path))
    }

    /// Paths announced without being driven.
    pub fn unveiled(&self) -> &[(Position, TruePath)] {
        &self.unveiled
    }

    /// Every node with at least one path.
    pub fn nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.paths.keys().map(|p| p.node).collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }
}
