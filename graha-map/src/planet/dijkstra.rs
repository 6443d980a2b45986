//! Single-source shortest paths over the Free-edge view.
//!
//! Costs are path weights summed as `u64`. Ties between equal-cost routes
//! are resolved deterministically: the open set pops the lowest cost first
//! and, among equal costs, the lowest node (x, then y); a node keeps the
//! first predecessor that reached it at its final cost, and outgoing edges
//! are relaxed in N, E, S, W order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use log::trace;

use crate::direction::Direction;

use super::types::{FreeEdge, Node, Position};

/// Adjacency view containing only Free edges.
pub type FreeEdges = HashMap<Node, HashMap<Direction, FreeEdge>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenNode {
    node: Node,
    cost: u64,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of a Dijkstra run from one source node.
#[derive(Clone, Debug)]
pub struct ShortestPathTree {
    source: Node,
    cost: HashMap<Node, u64>,
    /// Step taken to reach each node: the predecessor and the direction
    /// leaving it.
    came_from: HashMap<Node, Position>,
}

impl ShortestPathTree {
    /// Run Dijkstra from `source` over `edges`.
    pub fn build(edges: &FreeEdges, source: Node) -> Self {
        let mut open = BinaryHeap::new();
        let mut closed = HashSet::new();
        let mut cost: HashMap<Node, u64> = HashMap::new();
        let mut came_from: HashMap<Node, Position> = HashMap::new();

        cost.insert(source, 0);
        open.push(OpenNode {
            node: source,
            cost: 0,
        });

        while let Some(current) = open.pop() {
            if !closed.insert(current.node) {
                continue;
            }
            let Some(exits) = edges.get(&current.node) else {
                continue;
            };

            for direction in Direction::ALL {
                let Some(edge) = exits.get(&direction) else {
                    continue;
                };
                let neighbor = edge.target.node;
                if closed.contains(&neighbor) {
                    continue;
                }

                let tentative = current.cost + u64::from(edge.cost);
                let known = cost.get(&neighbor).copied().unwrap_or(u64::MAX);
                if tentative < known {
                    cost.insert(neighbor, tentative);
                    came_from.insert(neighbor, Position::new(current.node, direction));
                    open.push(OpenNode {
                        node: neighbor,
                        cost: tentative,
                    });
                }
            }
        }

        trace!(
            "[Dijkstra] source={} reached {} nodes",
            source,
            closed.len()
        );

        Self {
            source,
            cost,
            came_from,
        }
    }

    pub fn source(&self) -> Node {
        self.source
    }

    /// Total cost to reach `node`, or `None` when unreachable.
    pub fn cost_to(&self, node: Node) -> Option<u64> {
        self.cost.get(&node).copied()
    }

    /// Ordered steps from the source to `node`. Empty when `node` is the
    /// source; `None` when unreachable.
    pub fn route_to(&self, node: Node) -> Option<Vec<Position>> {
        self.cost.get(&node)?;

        let mut steps = Vec::new();
        let mut current = node;
        while current != self.source {
            let step = *self.came_from.get(&current)?;
            steps.push(step);
            current = step.node;
        }
        steps.reverse();
        Some(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(edges: &mut FreeEdges, a: Position, b: Position, cost: u32) {
        edges
            .entry(a.node)
            .or_default()
            .insert(a.direction, FreeEdge { target: b, cost });
        edges
            .entry(b.node)
            .or_default()
            .insert(b.direction, FreeEdge { target: a, cost });
    }

    #[test]
    fn test_source_route_is_empty() {
        let tree = ShortestPathTree::build(&FreeEdges::new(), Node::new(2, 2));
        assert_eq!(tree.route_to(Node::new(2, 2)), Some(vec![]));
        assert_eq!(tree.cost_to(Node::new(2, 2)), Some(0));
        assert_eq!(tree.route_to(Node::new(0, 0)), None);
    }

    #[test]
    fn test_prefers_cheaper_detour() {
        let mut edges = FreeEdges::new();
        // direct but expensive
        link(
            &mut edges,
            Position::at(0, 0, Direction::East),
            Position::at(2, 0, Direction::West),
            10,
        );
        // two cheap hops
        link(
            &mut edges,
            Position::at(0, 0, Direction::North),
            Position::at(1, 1, Direction::West),
            2,
        );
        link(
            &mut edges,
            Position::at(1, 1, Direction::East),
            Position::at(2, 0, Direction::North),
            3,
        );

        let tree = ShortestPathTree::build(&edges, Node::new(0, 0));
        assert_eq!(tree.cost_to(Node::new(2, 0)), Some(5));
        assert_eq!(
            tree.route_to(Node::new(2, 0)),
            Some(vec![
                Position::at(0, 0, Direction::North),
                Position::at(1, 1, Direction::East),
            ])
        );
    }

    #[test]
    fn test_parallel_edges_use_cheapest() {
        let mut edges = FreeEdges::new();
        link(
            &mut edges,
            Position::at(0, 0, Direction::North),
            Position::at(0, 1, Direction::South),
            7,
        );
        link(
            &mut edges,
            Position::at(0, 0, Direction::West),
            Position::at(0, 1, Direction::West),
            2,
        );

        let tree = ShortestPathTree::build(&edges, Node::new(0, 0));
        assert_eq!(
            tree.route_to(Node::new(0, 1)),
            Some(vec![Position::at(0, 0, Direction::West)])
        );
    }
}
