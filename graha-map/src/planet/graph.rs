//! The planet graph: client-side mirror of the mothership's map.
//!
//! Nodes are stored as an index from [`Node`] to a fixed array of four
//! [`Edge`] slots. Edges refer to their far end by value ([`Position`]), so
//! the structure has no ownership cycles.
//!
//! # Weight transitions
//!
//! A slot holding [`Weight::Unknown`] or [`Weight::Detected`] accepts any
//! write. Free, Blocked and NoPath are terminal: later writes are ignored.
//! This makes every write idempotent, which the transport relies on since
//! it may deliver a message twice.

use std::collections::HashMap;

use log::{debug, warn};

use crate::direction::Direction;
use crate::weight::Weight;

use super::dijkstra::{FreeEdges, ShortestPathTree};
use super::frontier::{Frontier, FrontierEntry};
use super::types::{Edge, FreeEdge, Node, Position, Slots};

/// Planet map, exploration frontier, robot start pose and current target.
#[derive(Clone, Debug, Default)]
pub struct PlanetGraph {
    nodes: HashMap<Node, Slots>,
    frontier: Frontier,
    start: Position,
    target: Option<Node>,
}

impl PlanetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `node` exists. A new node gets four Unknown slots, each pushed
    /// onto the frontier. Returns `true` if the node was new.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node) {
            return false;
        }
        self.nodes.insert(node, [Edge::UNKNOWN; 4]);
        for direction in Direction::ALL {
            self.frontier.push(node, direction, Weight::Unknown);
        }
        debug!("discovered node {}", node);
        true
    }

    /// Record a path leaving `start`.
    ///
    /// Missing nodes are created. Free and Blocked weights with a known
    /// `target` are written at both ends or not at all: when the target slot
    /// already holds a different resolved edge the write is refused. Writes
    /// onto terminal slots are ignored. Returns `true` if the start slot
    /// changed.
    pub fn add_path(&mut self, start: Position, target: Option<Position>, weight: Weight) -> bool {
        self.add_node(start.node);
        if let Some(target) = target {
            self.add_node(target.node);
        }

        let mirror = target.filter(|&t| t != start && matches!(weight, Weight::Free(_) | Weight::Blocked));
        if let Some(target) = mirror
            && let Some(far) = self.edge(target.node, target.direction).copied()
            && !far.weight.is_writable()
            && (far.weight != weight || far.target != Some(start))
        {
            warn!(
                "refusing path {} -> {} ({}): far slot already resolved as {}",
                start, target, weight, far.weight
            );
            return false;
        }

        if !self.write_slot(start, target, weight) {
            debug!("ignoring {} at {}: slot already resolved", weight, start);
            return false;
        }
        if let Some(target) = mirror {
            self.write_slot(target, Some(start), weight);
        }
        true
    }

    /// Record the result of scanning `node`: every direction in
    /// `discovered` becomes Detected, the others NoPath.
    pub fn set_attached_paths(&mut self, node: Node, discovered: &[Direction]) {
        for direction in Direction::ALL {
            let weight = if discovered.contains(&direction) {
                Weight::Detected
            } else {
                Weight::NoPath
            };
            self.add_path(Position::new(node, direction), None, weight);
        }
    }

    /// Adjacency view of the Free edges.
    pub fn free_edges(&self) -> FreeEdges {
        let mut view = FreeEdges::new();
        for (&node, slots) in &self.nodes {
            for direction in Direction::ALL {
                let edge = slots[direction.index()];
                if let (Weight::Free(cost), Some(target)) = (edge.weight, edge.target) {
                    view.entry(node)
                        .or_default()
                        .insert(direction, FreeEdge { target, cost: cost.get() });
                }
            }
        }
        view
    }

    /// True when the node exists and none of its slots are Unknown.
    pub fn is_known_node(&self, node: Node) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|slots| slots.iter().all(|e| e.weight != Weight::Unknown))
    }

    /// True when the slot is Free or Blocked.
    pub fn is_known_path(&self, node: Node, direction: Direction) -> bool {
        self.edge(node, direction)
            .is_some_and(|e| matches!(e.weight, Weight::Free(_) | Weight::Blocked))
    }

    pub fn edge(&self, node: Node, direction: Direction) -> Option<&Edge> {
        self.nodes.get(&node).map(|slots| &slots[direction.index()])
    }

    pub fn slots(&self, node: Node) -> Option<&Slots> {
        self.nodes.get(&node)
    }

    pub fn contains(&self, node: Node) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Dijkstra tree rooted at `source` over the Free edges.
    pub fn shortest_path_tree(&self, source: Node) -> ShortestPathTree {
        ShortestPathTree::build(&self.free_edges(), source)
    }

    /// Steps from `start` to `target` along Free edges; empty when they are
    /// the same node, `None` when unreachable.
    pub fn shortest_path(&self, start: Node, target: Node) -> Option<Vec<Position>> {
        if start == target {
            return Some(Vec::new());
        }
        self.shortest_path_tree(start).route_to(target)
    }

    /// Direction to leave the current start node in.
    ///
    /// Heads for the target when one is set and reachable; otherwise for the
    /// cheapest reachable frontier entry (newest first on ties). `None`
    /// means nothing reachable is left to explore.
    pub fn next_direction(&self) -> Option<Direction> {
        let here = self.start.node;
        let tree = self.shortest_path_tree(here);

        if let Some(target) = self.target
            && let Some(route) = tree.route_to(target)
            && let Some(first) = route.first()
        {
            return Some(first.direction);
        }

        let entry = self.frontier.select(|node| tree.cost_to(node))?;
        if entry.node == here {
            return Some(entry.direction);
        }
        tree.route_to(entry.node)?
            .first()
            .map(|step| step.direction)
    }

    /// Frontier entries on nodes no Free route from the start node reaches.
    /// These are left over when [`PlanetGraph::next_direction`] returns
    /// `None` with a non-empty frontier.
    pub fn unreachable_frontier(&self) -> Vec<FrontierEntry> {
        let tree = self.shortest_path_tree(self.start.node);
        self.frontier
            .iter()
            .filter(|entry| tree.cost_to(entry.node).is_none())
            .copied()
            .collect()
    }

    /// Authoritative robot pose, as last confirmed by the mothership.
    pub fn start(&self) -> Position {
        self.start
    }

    pub fn set_start(&mut self, position: Position) {
        self.add_node(position.node);
        self.start = position;
    }

    pub fn target(&self) -> Option<Node> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<Node>) {
        self.target = target;
    }

    /// True when a target is set and the robot stands on it.
    pub fn at_target(&self) -> bool {
        self.target == Some(self.start.node)
    }

    fn write_slot(&mut self, at: Position, target: Option<Position>, weight: Weight) -> bool {
        let Some(slots) = self.nodes.get_mut(&at.node) else {
            return false;
        };
        let slot = &mut slots[at.direction.index()];
        if !slot.weight.is_writable() {
            return false;
        }
        slot.weight = weight;
        if target.is_some() {
            slot.target = target;
        }
        self.frontier.update(at.node, at.direction, weight);
        true
    }
}
