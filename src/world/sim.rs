//! Reference warehouse simulator.

use std::collections::HashSet;

use serde::Serialize;

use super::{
    Action, ActionEffect, DEATH_REWARD, Environment, Feedback, Layout, SHUTDOWN_REWARD,
    STEP_REWARD, SUCCESS_REWARD,
};
use crate::error::{WorldError, WorldResult};
use crate::grid::{Cell, Direction, GridBounds, Pose};
use crate::hazard::HazardKind;
use crate::percept::Percept;

/// One row of the simulator's step history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub step: u64,
    /// `None` for the initial state.
    pub action: Option<Action>,
    pub cell: Cell,
    pub facing: Direction,
    pub has_package: bool,
    pub alive: bool,
    pub forklift_alive: bool,
    pub percept: Percept,
    pub total_reward: i64,
}

/// A fully observable warehouse that hands out partial observations.
#[derive(Debug, Clone)]
pub struct Warehouse {
    layout: Layout,
    bounds: GridBounds,
    damaged: HashSet<Cell>,
    pose: Pose,
    has_package: bool,
    has_device: bool,
    forklift_alive: bool,
    alive: bool,
    terminated: bool,
    success: bool,
    steps: u64,
    total_reward: i64,
    percept: Percept,
    history: Vec<HistoryEntry>,
}

impl Warehouse {
    /// A fresh episode on `layout`, agent at the entrance facing East.
    pub fn new(layout: Layout) -> WorldResult<Self> {
        let bounds = layout.validate()?;
        let mut world = Self {
            damaged: layout.damaged.iter().copied().collect(),
            forklift_alive: layout.forklift.is_some(),
            layout,
            bounds,
            pose: Pose::new(GridBounds::ENTRANCE, Direction::East),
            has_package: false,
            has_device: true,
            alive: true,
            terminated: false,
            success: false,
            steps: 0,
            total_reward: 0,
            percept: Percept::quiet(),
            history: Vec::new(),
        };
        world.percept = world.sense(false, false);
        world.record(None);
        Ok(world)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn total_reward(&self) -> i64 {
        self.total_reward
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn succeeded(&self) -> bool {
        self.success
    }

    pub fn has_package(&self) -> bool {
        self.has_package
    }

    pub fn forklift_alive(&self) -> bool {
        self.forklift_alive
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    fn hazard_at(&self, cell: Cell) -> Option<HazardKind> {
        if self.damaged.contains(&cell) {
            Some(HazardKind::DamagedFloor)
        } else if self.forklift_alive && self.layout.forklift == Some(cell) {
            Some(HazardKind::Forklift)
        } else {
            None
        }
    }

    fn sense(&self, bump: bool, beep: bool) -> Percept {
        if !self.alive {
            return Percept {
                bump,
                beep,
                ..Percept::quiet()
            };
        }
        let cell = self.pose.cell;
        let around = self.bounds.neighbors(cell);
        Percept {
            creaking: around.iter().any(|c| self.damaged.contains(c)),
            rumbling: self.forklift_alive
                && self.layout.forklift.is_some_and(|f| around.contains(&f)),
            beacon: cell == self.layout.package && !self.has_package,
            bump,
            beep,
        }
    }

    /// Fire the shutdown device along the facing direction.
    fn fire(&mut self) -> bool {
        let Some(forklift) = self.layout.forklift else {
            return false;
        };
        if !self.forklift_alive {
            return false;
        }
        if self.bounds.ray(self.pose).any(|c| c == forklift) {
            self.forklift_alive = false;
            return true;
        }
        false
    }

    fn record(&mut self, action: Option<Action>) {
        self.history.push(HistoryEntry {
            step: self.steps,
            action,
            cell: self.pose.cell,
            facing: self.pose.facing,
            has_package: self.has_package,
            alive: self.alive,
            forklift_alive: self.forklift_alive,
            percept: self.percept,
            total_reward: self.total_reward,
        });
    }

    /// Text grid, north at the top.
    ///
    /// With `reveal`, hidden contents are shown: `D` damaged floor, `F` live
    /// forklift, `f` disabled forklift, `P` package, `.` empty. Without it
    /// every cell but the agent's is `?`. The agent is an arrow, `@` when
    /// carrying the package, `X` when destroyed.
    pub fn render(&self, reveal: bool) -> String {
        let mut lines = Vec::with_capacity(self.bounds.height() as usize + 1);
        let header: Vec<String> = (1..=self.bounds.width()).map(|x| x.to_string()).collect();
        lines.push(format!("  {}", header.join(" ")));

        for y in (1..=self.bounds.height()).rev() {
            let mut row = vec![y.to_string()];
            for x in 1..=self.bounds.width() {
                let cell = Cell::new(x, y);
                let glyph = if cell == self.pose.cell {
                    if !self.alive {
                        'X'
                    } else if self.has_package {
                        '@'
                    } else {
                        self.pose.facing.arrow()
                    }
                } else if !reveal {
                    '?'
                } else if self.damaged.contains(&cell) {
                    'D'
                } else if self.layout.forklift == Some(cell) {
                    if self.forklift_alive { 'F' } else { 'f' }
                } else if cell == self.layout.package && !self.has_package {
                    'P'
                } else {
                    '.'
                };
                row.push(glyph.to_string());
            }
            lines.push(row.join(" "));
        }
        lines.join("\n")
    }
}

impl Environment for Warehouse {
    fn bounds(&self) -> GridBounds {
        self.bounds
    }

    fn start(&self) -> Pose {
        Pose::new(GridBounds::ENTRANCE, Direction::East)
    }

    fn percept(&self) -> Percept {
        self.percept
    }

    fn step(&mut self, action: Action) -> WorldResult<Feedback> {
        if self.terminated {
            return Err(WorldError::EpisodeOver { steps: self.steps });
        }

        let mut reward = STEP_REWARD;
        let mut bump = false;
        let mut beep = false;

        let effect = match action {
            Action::Forward => {
                let ahead = self.pose.ahead();
                if !self.bounds.contains(ahead) {
                    bump = true;
                    ActionEffect::Bumped
                } else {
                    self.pose.cell = ahead;
                    match self.hazard_at(ahead) {
                        Some(hazard) => {
                            self.alive = false;
                            self.terminated = true;
                            reward = DEATH_REWARD;
                            tracing::warn!(cell = %ahead, %hazard, "agent destroyed");
                            ActionEffect::Destroyed(hazard)
                        }
                        None => ActionEffect::Moved,
                    }
                }
            }
            Action::TurnLeft => {
                self.pose.facing = self.pose.facing.turn_left();
                ActionEffect::Turned
            }
            Action::TurnRight => {
                self.pose.facing = self.pose.facing.turn_right();
                ActionEffect::Turned
            }
            Action::Grab => {
                let grabbed = self.pose.cell == self.layout.package && !self.has_package;
                self.has_package |= grabbed;
                ActionEffect::Grabbed(grabbed)
            }
            Action::Shutdown => {
                if self.has_device {
                    self.has_device = false;
                    reward = SHUTDOWN_REWARD;
                    beep = self.fire();
                }
                ActionEffect::Shutdown(beep)
            }
            Action::Exit => {
                if self.pose.cell == GridBounds::ENTRANCE {
                    self.terminated = true;
                    self.success = self.has_package;
                    if self.success {
                        reward = SUCCESS_REWARD;
                    }
                    ActionEffect::Exited {
                        success: self.success,
                    }
                } else {
                    ActionEffect::Ignored
                }
            }
        };

        self.steps += 1;
        self.total_reward += reward;
        self.percept = self.sense(bump, beep);
        self.record(Some(action));

        Ok(Feedback {
            percept: self.percept,
            reward,
            done: self.terminated,
            effect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> Warehouse {
        Warehouse::new(Layout::example()).unwrap()
    }

    #[test]
    fn entrance_is_quiet_on_the_example() {
        let w = world();
        assert_eq!(w.percept(), Percept::quiet());
        assert_eq!(w.start(), Pose::new(Cell::new(1, 1), Direction::East));
        assert_eq!(w.history().len(), 1);
    }

    #[test]
    fn walking_east_creaks_next_to_damaged_floor() {
        let mut w = world();
        let fb = w.step(Action::Forward).unwrap();
        assert_eq!(fb.effect, ActionEffect::Moved);
        assert!(fb.percept.creaking);
        assert!(!fb.percept.rumbling);
        assert_eq!(fb.reward, STEP_REWARD);
        assert!(!fb.done);
    }

    #[test]
    fn walking_into_damaged_floor_is_fatal() {
        let mut w = world();
        w.step(Action::Forward).unwrap();
        let fb = w.step(Action::Forward).unwrap();
        assert_eq!(fb.effect, ActionEffect::Destroyed(HazardKind::DamagedFloor));
        assert_eq!(fb.reward, DEATH_REWARD);
        assert!(fb.done);
        assert!(!w.is_alive());
        assert!(matches!(
            w.step(Action::TurnLeft),
            Err(WorldError::EpisodeOver { steps: 2 })
        ));
    }

    #[test]
    fn bumping_into_the_wall_keeps_the_pose() {
        let mut w = world();
        w.step(Action::TurnRight).unwrap();
        let fb = w.step(Action::Forward).unwrap();
        assert_eq!(fb.effect, ActionEffect::Bumped);
        assert!(fb.percept.bump);
        assert_eq!(w.pose().cell, Cell::new(1, 1));
        assert_eq!(w.pose().facing, Direction::South);
    }

    #[test]
    fn shutdown_along_the_column_disables_the_forklift() {
        let mut w = world();
        w.step(Action::TurnLeft).unwrap();
        let fb = w.step(Action::Shutdown).unwrap();
        assert_eq!(fb.effect, ActionEffect::Shutdown(true));
        assert!(fb.percept.beep);
        assert_eq!(fb.reward, SHUTDOWN_REWARD);
        assert!(!w.forklift_alive());

        // Device is spent: a second use costs a normal step and does nothing.
        let fb = w.step(Action::Shutdown).unwrap();
        assert_eq!(fb.effect, ActionEffect::Shutdown(false));
        assert_eq!(fb.reward, STEP_REWARD);
    }

    #[test]
    fn disabled_forklift_is_harmless() {
        let mut w = world();
        w.step(Action::TurnLeft).unwrap();
        w.step(Action::Shutdown).unwrap();
        assert!(w.render(true).contains('f'));
        w.step(Action::Forward).unwrap();
        let fb = w.step(Action::Forward).unwrap();
        assert_eq!(fb.effect, ActionEffect::Moved);
        assert_eq!(w.pose().cell, Cell::new(1, 3));
        assert!(!fb.percept.rumbling);
    }

    #[test]
    fn exit_without_package_ends_the_episode() {
        let mut w = world();
        let fb = w.step(Action::Exit).unwrap();
        assert_eq!(fb.effect, ActionEffect::Exited { success: false });
        assert_eq!(fb.reward, STEP_REWARD);
        assert!(fb.done);
        assert!(!w.succeeded());
    }

    #[test]
    fn exit_away_from_the_entrance_is_ignored() {
        let mut w = world();
        w.step(Action::TurnLeft).unwrap();
        w.step(Action::Forward).unwrap();
        let fb = w.step(Action::Exit).unwrap();
        assert_eq!(fb.effect, ActionEffect::Ignored);
        assert!(!fb.done);
    }

    #[test]
    fn render_hides_contents_unless_revealed() {
        let w = world();
        let hidden = w.render(false);
        assert!(!hidden.contains('D'));
        assert!(hidden.lines().last().unwrap().starts_with("1 >"));

        let shown = w.render(true);
        assert_eq!(shown.lines().next().unwrap(), "  1 2 3 4");
        assert_eq!(shown.lines().nth(2).unwrap(), "3 F P D .");
        assert_eq!(shown.lines().nth(4).unwrap(), "1 > . D .");
    }
}
