//! Planet graph model.
//!
//! - [`PlanetGraph`]: node/edge index, weight transitions, start pose, target
//! - [`Frontier`]: worklist of unresolved edge slots
//! - [`ShortestPathTree`]: Dijkstra over the Free edges

mod dijkstra;
mod frontier;
mod graph;
mod types;

pub use dijkstra::{FreeEdges, ShortestPathTree};
pub use frontier::{Frontier, FrontierEntry};
pub use graph::PlanetGraph;
pub use types::{Edge, FreeEdge, Node, Position, Slots};
