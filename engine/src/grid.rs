// ═══════════════════════════════════════════════════════════════════════
// Spatial grid — hex storage, adjacency, reachability, supply paths
// ═══════════════════════════════════════════════════════════════════════

use crate::types::{Hex, HexCoord};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

/// Result of asking a cost function about one step `from → to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The step cannot be taken.
    Blocked,
    /// The step costs this many movement points.
    Cost(u32),
    /// The step may be taken, but the search does not expand past `to`.
    CostAndHalt(u32),
}

/// The hexes of one theater, sorted by coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexGrid {
    hexes: Vec<Hex>,
}

impl HexGrid {
    pub fn new(mut hexes: Vec<Hex>) -> Self {
        hexes.sort_by_key(|h| h.coord);
        HexGrid { hexes }
    }

    pub fn len(&self) -> usize {
        self.hexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hexes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hex> {
        self.hexes.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Hex> {
        self.hexes.iter_mut()
    }

    fn index(&self, coord: HexCoord) -> Option<usize> {
        self.hexes.binary_search_by_key(&coord, |h| h.coord).ok()
    }

    pub fn contains(&self, coord: HexCoord) -> bool {
        self.index(coord).is_some()
    }

    pub fn get(&self, coord: HexCoord) -> Option<&Hex> {
        self.index(coord).map(|i| &self.hexes[i])
    }

    pub(crate) fn get_mut(&mut self, coord: HexCoord) -> Option<&mut Hex> {
        self.index(coord).map(move |i| &mut self.hexes[i])
    }

    pub fn by_label(&self, label: &str) -> Option<&Hex> {
        self.hexes.iter().find(|h| h.label == label)
    }

    /// Neighbours present on the map, in ascending coordinate order.
    pub fn neighbors(&self, coord: HexCoord) -> Vec<HexCoord> {
        let mut out: Vec<HexCoord> = coord.adjacent().into_iter().filter(|c| self.contains(*c)).collect();
        out.sort();
        out
    }

    pub fn distance(a: HexCoord, b: HexCoord) -> u32 {
        a.distance(b)
    }

    // ── Uniform-cost search ────────────────────────────────────────────

    fn search<F>(&self, from: HexCoord, budget: u32, mut cost: F) -> (BTreeMap<HexCoord, u32>, BTreeMap<HexCoord, HexCoord>)
    where
        F: FnMut(HexCoord, HexCoord) -> Step,
    {
        let mut best: BTreeMap<HexCoord, u32> = BTreeMap::new();
        let mut came_from: BTreeMap<HexCoord, HexCoord> = BTreeMap::new();
        if !self.contains(from) {
            return (best, came_from);
        }

        let mut halted: BTreeSet<HexCoord> = BTreeSet::new();
        let mut heap = BinaryHeap::new();
        best.insert(from, 0);
        heap.push(Reverse((0u32, from)));

        // Popping (cost, coord) in ascending order settles equal-cost ties
        // on the lowest coordinate first.
        while let Some(Reverse((spent, at))) = heap.pop() {
            if best.get(&at).map_or(false, |&b| spent > b) || halted.contains(&at) {
                continue;
            }
            for next in self.neighbors(at) {
                let (step, halt) = match cost(at, next) {
                    Step::Blocked => continue,
                    Step::Cost(c) => (c, false),
                    Step::CostAndHalt(c) => (c, true),
                };
                let total = spent.saturating_add(step);
                if total > budget {
                    continue;
                }
                if best.get(&next).map_or(true, |&b| total < b) {
                    best.insert(next, total);
                    came_from.insert(next, at);
                    if halt {
                        halted.insert(next);
                    }
                    heap.push(Reverse((total, next)));
                }
            }
        }
        (best, came_from)
    }

    /// Every hex reachable from `from` within `budget`, with its cheapest cost.
    /// The origin is always included at cost 0.
    pub fn reachable<F>(&self, from: HexCoord, budget: u32, cost: F) -> BTreeMap<HexCoord, u32>
    where
        F: FnMut(HexCoord, HexCoord) -> Step,
    {
        self.search(from, budget, cost).0
    }

    /// Cheapest path `from → to` (both ends included) and its cost.
    pub fn shortest_path<F>(&self, from: HexCoord, to: HexCoord, budget: u32, cost: F) -> Option<(Vec<HexCoord>, u32)>
    where
        F: FnMut(HexCoord, HexCoord) -> Step,
    {
        let (best, came_from) = self.search(from, budget, cost);
        let total = *best.get(&to)?;
        let mut path = vec![to];
        let mut at = to;
        while at != from {
            at = came_from[&at];
            path.push(at);
        }
        path.reverse();
        Some((path, total))
    }

    // ── Breadth-first path queries ─────────────────────────────────────

    /// Nearest hex of `targets` reachable from `from` through hexes
    /// accepted by `passable`, within `max_steps`. Returns the target and its
    /// step count. The origin itself never needs to pass `passable`.
    pub fn path_to_any<P>(&self, from: HexCoord, targets: &BTreeSet<HexCoord>, passable: P, max_steps: u32) -> Option<(HexCoord, u32)>
    where
        P: Fn(HexCoord) -> bool,
    {
        if !self.contains(from) {
            return None;
        }
        if targets.contains(&from) {
            return Some((from, 0));
        }

        let mut visited: BTreeSet<HexCoord> = BTreeSet::new();
        let mut queue: VecDeque<(HexCoord, u32)> = VecDeque::new();
        visited.insert(from);
        queue.push_back((from, 0));

        while let Some((at, steps)) = queue.pop_front() {
            if steps >= max_steps {
                continue;
            }
            for next in self.neighbors(at) {
                if visited.contains(&next) || !passable(next) {
                    continue;
                }
                if targets.contains(&next) {
                    return Some((next, steps + 1));
                }
                visited.insert(next);
                queue.push_back((next, steps + 1));
            }
        }
        None
    }

    pub fn path_exists<P>(&self, from: HexCoord, to: HexCoord, passable: P) -> bool
    where
        P: Fn(HexCoord) -> bool,
    {
        let targets = BTreeSet::from([to]);
        self.path_to_any(from, &targets, passable, u32::MAX).is_some()
    }
}
