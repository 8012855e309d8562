//! The environment the agent acts in.
//!
//! The agent only sees the world through [`Environment`]: the grid extent, its
//! starting pose, and one [`Feedback`] per action. [`Warehouse`] is the
//! reference simulator; [`Layout`] describes what it hides.

pub mod layout;
pub mod sim;

use std::fmt;

use serde::Serialize;

use crate::error::WorldResult;
use crate::grid::{GridBounds, Pose};
use crate::hazard::HazardKind;
use crate::percept::Percept;

pub use layout::Layout;
pub use sim::{HistoryEntry, Warehouse};

/// Reward for any ordinary action.
pub const STEP_REWARD: i64 = -1;
/// Total reward for a shutdown action.
pub const SHUTDOWN_REWARD: i64 = -10;
/// Reward for walking into a live hazard. Ends the episode.
pub const DEATH_REWARD: i64 = -1000;
/// Reward for exiting at the entrance with the package.
pub const SUCCESS_REWARD: i64 = 1000;

/// The fixed action vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Forward,
    TurnLeft,
    TurnRight,
    Grab,
    Shutdown,
    Exit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Forward => "FORWARD",
            Action::TurnLeft => "TURN_LEFT",
            Action::TurnRight => "TURN_RIGHT",
            Action::Grab => "GRAB",
            Action::Shutdown => "SHUTDOWN",
            Action::Exit => "EXIT",
        };
        f.pad(name)
    }
}

/// What an action did to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionEffect {
    Moved,
    Bumped,
    Turned,
    /// Whether a package was picked up.
    Grabbed(bool),
    /// Whether the shot disabled the forklift.
    Shutdown(bool),
    Exited { success: bool },
    /// Moved into a live hazard.
    Destroyed(HazardKind),
    /// Exit away from the entrance; nothing happens.
    Ignored,
}

/// The environment's answer to one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    /// Percept at the agent's cell after the action.
    pub percept: Percept,
    pub reward: i64,
    /// The episode has ended.
    pub done: bool,
    pub effect: ActionEffect,
}

/// A world the agent can act in.
pub trait Environment {
    fn bounds(&self) -> GridBounds;

    /// Pose the agent starts in.
    fn start(&self) -> Pose;

    /// Percept at the agent's current cell.
    fn percept(&self) -> Percept;

    /// Apply one action. Fails once the episode has ended.
    fn step(&mut self, action: Action) -> WorldResult<Feedback>;
}
