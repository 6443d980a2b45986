//! Exploration frontier.
//!
//! The frontier is the worklist of edge slots whose weight is still
//! [`Weight::Unknown`] or [`Weight::Detected`]. Entries are pushed when a
//! node is discovered and removed once their slot resolves.
//!
//! # Selection policy
//!
//! [`Frontier::select`] picks the entry whose node is cheapest to reach.
//! Among entries of equal cost the most recently pushed one wins, so a
//! freshly discovered node is explored before older ones at the same
//! distance.

use crate::direction::Direction;
use crate::weight::Weight;

use super::types::Node;

/// One unresolved edge slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrontierEntry {
    pub node: Node,
    pub direction: Direction,
    pub weight: Weight,
}

/// Ordered worklist of unresolved slots (push order preserved).
#[derive(Clone, Debug, Default)]
pub struct Frontier {
    entries: Vec<FrontierEntry>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &FrontierEntry> {
        self.entries.iter()
    }

    pub fn contains(&self, node: Node, direction: Direction) -> bool {
        self.position(node, direction).is_some()
    }

    /// Push an entry. A slot already on the frontier is not duplicated.
    pub fn push(&mut self, node: Node, direction: Direction, weight: Weight) {
        if self.contains(node, direction) {
            return;
        }
        self.entries.push(FrontierEntry {
            node,
            direction,
            weight,
        });
    }

    /// Record a new weight for a slot: unresolved weights update the entry in
    /// place, resolved weights remove it.
    pub fn update(&mut self, node: Node, direction: Direction, weight: Weight) {
        let Some(index) = self.position(node, direction) else {
            return;
        };
        if weight.is_unresolved() {
            self.entries[index].weight = weight;
        } else {
            self.entries.remove(index);
        }
    }

    /// Choose the next entry to explore.
    ///
    /// `cost_to` returns the known travel cost to a node, or `None` when the
    /// node cannot be reached. Unreachable entries are never selected.
    pub fn select<F>(&self, mut cost_to: F) -> Option<&FrontierEntry>
    where
        F: FnMut(Node) -> Option<u64>,
    {
        let mut best: Option<(u64, &FrontierEntry)> = None;
        // Newest first: a strict comparison keeps the newest on ties.
        for entry in self.entries.iter().rev() {
            let Some(cost) = cost_to(entry.node) else {
                continue;
            };
            if best.is_none_or(|(best_cost, _)| cost < best_cost) {
                best = Some((cost, entry));
            }
        }
        best.map(|(_, entry)| entry)
    }

    fn position(&self, node: Node, direction: Direction) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.node == node && e.direction == direction)
    }
}
