//! # Graha-Map: planet graph and odometry for a line-following explorer
//!
//! The robot explores a "planet": a maze of junctions on an integer grid,
//! joined by weighted bidirectional paths. This crate holds the parts that
//! never block or perform I/O:
//!
//! - [`direction`]: compass directions with rotation helpers
//! - [`weight`]: the tagged path weight and its wire encoding
//! - [`planet`]: the planet graph, exploration frontier and Dijkstra search
//! - [`odometry`]: dead reckoning between confirmed junctions
//!
//! ## Quick Start
//!
//! ```rust
//! use graha_map::{Direction, Node, PlanetGraph, Position, Weight};
//!
//! let mut planet = PlanetGraph::new();
//! planet.add_path(
//!     Position::at(0, 0, Direction::North),
//!     Some(Position::at(0, 1, Direction::South)),
//!     Weight::free(1),
//! );
//! let route = planet.shortest_path(Node::new(0, 0), Node::new(0, 1)).unwrap();
//! assert_eq!(route, vec![Position::at(0, 0, Direction::North)]);
//! ```

pub mod direction;
pub mod odometry;
pub mod planet;
pub mod weight;

pub use direction::Direction;
pub use odometry::{Odometry, OdometryConfig, Pose, gamma_to_direction};
pub use planet::{Edge, Frontier, FrontierEntry, FreeEdges, Node, PlanetGraph, Position};
pub use weight::Weight;
