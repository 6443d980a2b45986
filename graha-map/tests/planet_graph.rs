//! Planet graph behaviour: weight transitions, the Free-edge view,
//! shortest paths and frontier-driven exploration.
//!
//! Run with: `cargo test --test planet_graph`

use graha_map::{Direction, Node, PlanetGraph, Position, Weight};

use Direction::{East, North, South, West};

// ============================================================================
// Fixtures
// ============================================================================

/// Test planet with loops, a blocked spur, a dead end and an isolated pair.
///
/// ```text
///        (1,1)====(2,1)      (3,4)
///        /  |                  |
///   (0,1)---+                (3,3)
///    |  \
///   (0,0)-+
/// ```
fn sample_planet() -> PlanetGraph {
    let mut planet = PlanetGraph::new();
    let add = |planet: &mut PlanetGraph, a: Position, b: Position, wire: i64| {
        planet.add_path(a, Some(b), Weight::from_wire(wire).unwrap());
    };

    add(&mut planet, Position::at(0, 0, North), Position::at(0, 1, South), 1);
    add(&mut planet, Position::at(0, 0, East), Position::at(0, 0, East), -1);
    add(&mut planet, Position::at(0, 0, South), Position::at(0, 0, South), -3);
    add(&mut planet, Position::at(0, 1, West), Position::at(0, 0, West), 2);
    add(&mut planet, Position::at(0, 1, North), Position::at(1, 1, South), 3);
    add(&mut planet, Position::at(1, 1, West), Position::at(0, 1, East), 4);
    add(&mut planet, Position::at(1, 1, North), Position::at(2, 1, East), 4);
    add(&mut planet, Position::at(1, 1, East), Position::at(2, 1, West), 4);
    add(&mut planet, Position::at(2, 1, North), Position::at(2, 1, North), -3);
    add(&mut planet, Position::at(2, 1, South), Position::at(2, 1, South), 0);
    add(&mut planet, Position::at(3, 3, East), Position::at(3, 4, West), 3);
    planet
}

fn weight_at(planet: &PlanetGraph, x: i32, y: i32, direction: Direction) -> Weight {
    planet
        .edge(Node::new(x, y), direction)
        .map(|e| e.weight)
        .expect("node should exist")
}

// ============================================================================
// Nodes and weight transitions
// ============================================================================

#[test]
fn test_new_node_starts_unknown_in_all_directions() {
    let mut planet = PlanetGraph::new();
    planet.add_path(
        Position::at(4, 4, North),
        Some(Position::at(4, 5, South)),
        Weight::free(2),
    );

    for direction in [East, South, West] {
        assert_eq!(weight_at(&planet, 4, 4, direction), Weight::Unknown);
    }
    for direction in [North, East, West] {
        assert_eq!(weight_at(&planet, 4, 5, direction), Weight::Unknown);
    }
    assert!(!planet.is_known_node(Node::new(4, 4)));
}

#[test]
fn test_free_path_is_symmetric() {
    let planet = sample_planet();

    let forward = planet.edge(Node::new(0, 1), North).unwrap();
    let backward = planet.edge(Node::new(1, 1), South).unwrap();
    assert_eq!(forward.weight, Weight::free(3));
    assert_eq!(backward.weight, Weight::free(3));
    assert_eq!(forward.target, Some(Position::at(1, 1, South)));
    assert_eq!(backward.target, Some(Position::at(0, 1, North)));
}

#[test]
fn test_terminal_weights_are_never_overwritten() {
    let mut planet = sample_planet();

    for weight in [Weight::Detected, Weight::Unknown, Weight::free(9), Weight::Blocked] {
        assert!(!planet.add_path(Position::at(0, 0, North), None, weight));
        assert!(!planet.add_path(Position::at(0, 0, East), None, weight));
        assert!(!planet.add_path(Position::at(0, 0, South), None, weight));
    }

    assert_eq!(weight_at(&planet, 0, 0, North), Weight::free(1));
    assert_eq!(weight_at(&planet, 0, 0, East), Weight::Blocked);
    assert_eq!(weight_at(&planet, 0, 0, South), Weight::NoPath);
}

#[test]
fn test_detected_can_resolve() {
    let mut planet = PlanetGraph::new();
    planet.set_attached_paths(Node::new(0, 0), &[North]);
    assert_eq!(weight_at(&planet, 0, 0, North), Weight::Detected);

    assert!(planet.add_path(
        Position::at(0, 0, North),
        Some(Position::at(0, 2, South)),
        Weight::free(5),
    ));
    assert_eq!(weight_at(&planet, 0, 0, North), Weight::free(5));
    assert_eq!(weight_at(&planet, 0, 2, South), Weight::free(5));
}

#[test]
fn test_duplicate_confirmation_is_idempotent() {
    let mut planet = sample_planet();
    let before = planet.free_edges();
    let frontier_before = planet.frontier().len();

    planet.add_path(
        Position::at(0, 1, North),
        Some(Position::at(1, 1, South)),
        Weight::free(3),
    );

    assert_eq!(planet.free_edges(), before);
    assert_eq!(planet.frontier().len(), frontier_before);
}

#[test]
fn test_set_attached_paths() {
    let mut planet = PlanetGraph::new();
    planet.set_attached_paths(Node::new(1, 1), &[North, West]);

    assert_eq!(weight_at(&planet, 1, 1, North), Weight::Detected);
    assert_eq!(weight_at(&planet, 1, 1, East), Weight::NoPath);
    assert_eq!(weight_at(&planet, 1, 1, South), Weight::NoPath);
    assert_eq!(weight_at(&planet, 1, 1, West), Weight::Detected);
    assert!(planet.is_known_node(Node::new(1, 1)));
    assert!(!planet.is_known_path(Node::new(1, 1), North));
    // only the two detected slots remain unresolved
    assert_eq!(planet.frontier().len(), 2);
}

#[test]
fn test_known_paths() {
    let planet = sample_planet();
    assert!(planet.is_known_path(Node::new(0, 0), North));
    assert!(planet.is_known_path(Node::new(0, 0), East));
    assert!(!planet.is_known_path(Node::new(0, 0), South));
    assert!(!planet.is_known_path(Node::new(2, 1), South));
    assert!(!planet.is_known_path(Node::new(9, 9), North));
}

// ============================================================================
// Free-edge view
// ============================================================================

#[test]
fn test_empty_planet_has_no_free_edges() {
    assert!(PlanetGraph::new().free_edges().is_empty());
}

#[test]
fn test_free_edge_view_integrity() {
    let planet = sample_planet();
    let edges = planet.free_edges();

    let expected: &[(Node, Direction, Position, u32)] = &[
        (Node::new(0, 0), North, Position::at(0, 1, South), 1),
        (Node::new(0, 0), West, Position::at(0, 1, West), 2),
        (Node::new(0, 1), West, Position::at(0, 0, West), 2),
        (Node::new(0, 1), South, Position::at(0, 0, North), 1),
        (Node::new(0, 1), North, Position::at(1, 1, South), 3),
        (Node::new(0, 1), East, Position::at(1, 1, West), 4),
        (Node::new(1, 1), South, Position::at(0, 1, North), 3),
        (Node::new(1, 1), West, Position::at(0, 1, East), 4),
        (Node::new(1, 1), North, Position::at(2, 1, East), 4),
        (Node::new(1, 1), East, Position::at(2, 1, West), 4),
        (Node::new(2, 1), East, Position::at(1, 1, North), 4),
        (Node::new(2, 1), West, Position::at(1, 1, East), 4),
        (Node::new(3, 3), East, Position::at(3, 4, West), 3),
        (Node::new(3, 4), West, Position::at(3, 3, East), 3),
    ];

    let total: usize = edges.values().map(|exits| exits.len()).sum();
    assert_eq!(total, expected.len());
    for &(node, direction, target, cost) in expected {
        let edge = edges[&node][&direction];
        assert_eq!(edge.target, target, "{node} {direction}");
        assert_eq!(edge.cost, cost, "{node} {direction}");
    }
    // blocked, no-path and detected slots stay out of the view
    assert!(!edges[&Node::new(0, 0)].contains_key(&East));
    assert!(!edges[&Node::new(0, 0)].contains_key(&South));
    assert!(!edges[&Node::new(2, 1)].contains_key(&South));
}

// ============================================================================
// Shortest paths
// ============================================================================

#[test]
fn test_shortest_path_to_self_is_empty() {
    let planet = sample_planet();
    for node in planet.nodes().collect::<Vec<_>>() {
        assert_eq!(planet.shortest_path(node, node), Some(vec![]));
    }
}

#[test]
fn test_loop_between_two_nodes() {
    let mut planet = PlanetGraph::new();
    planet.add_path(
        Position::at(0, 0, North),
        Some(Position::at(0, 1, South)),
        Weight::free(1),
    );
    planet.add_path(
        Position::at(0, 1, West),
        Some(Position::at(0, 0, West)),
        Weight::free(2),
    );

    assert_eq!(
        planet.shortest_path(Node::new(0, 0), Node::new(0, 1)),
        Some(vec![Position::at(0, 0, North)])
    );
    assert_eq!(planet.shortest_path(Node::new(0, 0), Node::new(1, 2)), None);
}

#[test]
fn test_shortest_path_multi_hop() {
    let planet = sample_planet();
    assert_eq!(
        planet.shortest_path(Node::new(0, 0), Node::new(1, 1)),
        Some(vec![Position::at(0, 0, North), Position::at(0, 1, North)])
    );
    assert_eq!(
        planet.shortest_path(Node::new(2, 1), Node::new(0, 0)).map(|r| r.len()),
        Some(3)
    );
}

#[test]
fn test_equal_cost_routes_return_one_of_them() {
    let planet = sample_planet();
    let route = planet
        .shortest_path(Node::new(1, 1), Node::new(2, 1))
        .unwrap();
    assert_eq!(route.len(), 1);
    assert!(
        route[0] == Position::at(1, 1, North) || route[0] == Position::at(1, 1, East),
        "unexpected route {route:?}"
    );
}

#[test]
fn test_disconnected_component_is_unreachable() {
    let planet = sample_planet();
    assert_eq!(planet.shortest_path(Node::new(0, 0), Node::new(3, 4)), None);
    assert_eq!(planet.shortest_path(Node::new(3, 3), Node::new(2, 1)), None);
    assert_eq!(planet.shortest_path(Node::new(0, 0), Node::new(5, 5)), None);
}

#[test]
fn test_blocked_path_is_not_traversed() {
    let mut planet = PlanetGraph::new();
    planet.add_path(
        Position::at(0, 0, East),
        Some(Position::at(1, 0, West)),
        Weight::Blocked,
    );
    assert_eq!(planet.shortest_path(Node::new(0, 0), Node::new(1, 0)), None);
    assert_eq!(weight_at(&planet, 1, 0, West), Weight::Blocked);
}

// ============================================================================
// Exploration
// ============================================================================

#[test]
fn test_next_direction_prefers_newest_local_entry() {
    let mut planet = PlanetGraph::new();
    planet.set_start(Position::at(0, 0, North));
    planet.set_attached_paths(Node::new(0, 0), &[North, East]);

    // both at cost 0: East was pushed after North
    assert_eq!(planet.next_direction(), Some(East));
}

#[test]
fn test_next_direction_walks_to_cheapest_frontier() {
    let mut planet = PlanetGraph::new();
    planet.set_start(Position::at(0, 0, North));
    planet.set_attached_paths(Node::new(0, 0), &[North, East]);
    planet.add_path(
        Position::at(0, 0, East),
        Some(Position::at(1, 0, West)),
        Weight::free(2),
    );

    // local detected slot still costs nothing
    assert_eq!(planet.next_direction(), Some(North));

    planet.add_path(
        Position::at(0, 0, North),
        Some(Position::at(0, 0, North)),
        Weight::Blocked,
    );
    // only (1, 0) is left to explore, reached by heading east
    assert_eq!(planet.next_direction(), Some(East));
}

#[test]
fn test_next_direction_follows_target() {
    let mut planet = sample_planet();
    planet.set_start(Position::at(0, 0, North));
    planet.set_target(Some(Node::new(2, 1)));

    assert_eq!(planet.next_direction(), Some(North));
}

#[test]
fn test_unreachable_target_falls_back_to_frontier() {
    let mut planet = PlanetGraph::new();
    planet.set_start(Position::at(0, 0, North));
    planet.set_attached_paths(Node::new(0, 0), &[West]);
    planet.set_target(Some(Node::new(7, 7)));

    assert_eq!(planet.next_direction(), Some(West));
}

#[test]
fn test_exploration_complete_when_frontier_empty() {
    let mut planet = PlanetGraph::new();
    planet.set_start(Position::at(0, 0, North));
    planet.set_attached_paths(Node::new(0, 0), &[North]);
    planet.add_path(
        Position::at(0, 0, North),
        Some(Position::at(0, 1, South)),
        Weight::free(1),
    );
    planet.set_attached_paths(Node::new(0, 1), &[South]);

    assert!(planet.frontier().is_empty());
    assert_eq!(planet.next_direction(), None);
}

#[test]
fn test_unreachable_frontier_is_not_selected() {
    let mut planet = PlanetGraph::new();
    planet.set_start(Position::at(0, 0, North));
    planet.set_attached_paths(Node::new(0, 0), &[]);
    // revealed out of band, not connected to us
    planet.add_path(
        Position::at(5, 5, North),
        Some(Position::at(5, 6, South)),
        Weight::free(1),
    );

    assert!(!planet.frontier().is_empty());
    assert_eq!(planet.next_direction(), None);

    let stranded = planet.unreachable_frontier();
    assert_eq!(stranded.len(), planet.frontier().len());
    assert!(stranded.iter().all(|e| e.node == Node::new(5, 5) || e.node == Node::new(5, 6)));
}

#[test]
fn test_unreachable_frontier_excludes_reachable_slots() {
    let mut planet = PlanetGraph::new();
    planet.set_start(Position::at(0, 0, North));
    planet.set_attached_paths(Node::new(0, 0), &[North]);
    planet.add_path(
        Position::at(0, 0, North),
        Some(Position::at(0, 1, South)),
        Weight::free(1),
    );
    planet.add_path(
        Position::at(5, 5, North),
        Some(Position::at(5, 6, South)),
        Weight::free(1),
    );

    // (0,1) still has three open slots we can drive to
    assert!(planet.next_direction().is_some());
    let stranded = planet.unreachable_frontier();
    assert_eq!(stranded.len(), 6);
    assert!(stranded.iter().all(|e| e.node.x == 5));
    assert_eq!(planet.unreachable_frontier().len() + 3, planet.frontier().len());
}
