//! Frontier planning: pick the next safe cell and a route to it.
//!
//! Routes only cross cells the agent has stood on, plus the single target at
//! the end. Search is breadth-first with neighbors in West, East, South, North
//! order, so the route to a given target is always the same.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use crate::grid::{Cell, Direction, GridBounds};
use crate::world::Action;

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

/// Why a plan exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanPurpose {
    /// Reach a safe frontier cell.
    Explore(Cell),
    /// Carry the package back to the entrance.
    Return,
    /// Give up and walk back to the entrance.
    Withdraw,
}

impl fmt::Display for PlanPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanPurpose::Explore(cell) => write!(f, "explore {cell}"),
            PlanPurpose::Return => f.write_str("return"),
            PlanPurpose::Withdraw => f.write_str("withdraw"),
        }
    }
}

/// Queued primitive actions toward one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub purpose: PlanPurpose,
    /// Cells the plan passes through, start first.
    pub path: Vec<Cell>,
    pub actions: VecDeque<Action>,
}

impl Plan {
    /// Plan the actions that walk `path` starting out facing `facing`.
    pub fn along(purpose: PlanPurpose, path: Vec<Cell>, facing: Direction) -> Self {
        let actions = path_actions(facing, &path).into();
        Self {
            purpose,
            path,
            actions,
        }
    }

    pub fn peek(&self) -> Option<Action> {
        self.actions.front().copied()
    }

    pub fn pop(&mut self) -> Option<Action> {
        self.actions.pop_front()
    }

    pub fn is_finished(&self) -> bool {
        self.actions.is_empty()
    }
}

/// A chosen target and the shortest route to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub target: Cell,
    /// Start first, target last.
    pub path: Vec<Cell>,
}

impl Route {
    /// Number of moves.
    pub fn len(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Frontier computation and breadth-first routing over visited terrain.
#[derive(Debug, Clone)]
pub struct FrontierPlanner {
    bounds: GridBounds,
}

impl FrontierPlanner {
    pub fn new(bounds: GridBounds) -> Self {
        Self { bounds }
    }

    /// In-bounds cells adjacent to the visited region but not in it, row-major.
    pub fn frontier(&self, visited: &BTreeSet<Cell>) -> Vec<Cell> {
        let frontier: BTreeSet<Cell> = visited
            .iter()
            .flat_map(|&v| self.bounds.neighbors(v))
            .filter(|n| !visited.contains(n))
            .collect();
        frontier.into_iter().collect()
    }

    /// Shortest path from `from` to `to` through visited cells, entering `to`
    /// last. `None` if `to` cannot be reached that way.
    pub fn shortest_path(&self, from: Cell, to: Cell, visited: &BTreeSet<Cell>) -> Option<Vec<Cell>> {
        if !self.bounds.contains(from) || !self.bounds.contains(to) {
            tracing::warn!(%from, %to, "route endpoint off the grid");
            return None;
        }
        if from == to {
            return Some(vec![from]);
        }

        let allowed = |c: &Cell| *c == to || visited.contains(c);
        let mut parent: HashMap<Cell, Cell> = HashMap::new();
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            for next in self.bounds.neighbors(current) {
                if next == from || !allowed(&next) || parent.contains_key(&next) {
                    continue;
                }
                parent.insert(next, current);
                if next == to {
                    let mut path = vec![to];
                    let mut cursor = to;
                    while let Some(&prev) = parent.get(&cursor) {
                        path.push(prev);
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Pick the candidate with the shortest route, ties broken row-major.
    pub fn select_target(&self, from: Cell, candidates: &[Cell], visited: &BTreeSet<Cell>) -> Option<Route> {
        let mut best: Option<Route> = None;
        for &target in candidates {
            let Some(path) = self.shortest_path(from, target, visited) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some(b) => (path.len(), target) < (b.path.len(), b.target),
            };
            if better {
                best = Some(Route { target, path });
            }
        }
        best
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }
}

/// Turns to face `to` from `from`: the shorter rotation, right on a tie.
pub fn rotation(from: Direction, to: Direction) -> Vec<Action> {
    let (right, left) = from.turns_to(to);
    if right <= left {
        vec![Action::TurnRight; right as usize]
    } else {
        vec![Action::TurnLeft; left as usize]
    }
}

/// Primitive actions that walk `path` starting out facing `facing`.
pub fn path_actions(facing: Direction, path: &[Cell]) -> Vec<Action> {
    let mut heading = facing;
    let mut actions = Vec::new();
    for pair in path.windows(2) {
        let Some(next) = pair[0].direction_to(pair[1]) else {
            tracing::warn!(from = %pair[0], to = %pair[1], "path is not contiguous");
            break;
        };
        actions.extend(rotation(heading, next));
        actions.push(Action::Forward);
        heading = next;
    }
    actions
}
