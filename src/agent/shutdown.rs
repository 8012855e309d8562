//! The single-use shutdown device.

use serde::Serialize;

use super::error::{AgentError, AgentResult};
use crate::error::KbResult;
use crate::grid::{Cell, GridBounds, Pose};
use crate::hazard::HazardKind;
use crate::kb::KnowledgeBase;
use crate::oracle::SafetyOracle;
use crate::world::Action;

/// Device lifecycle. `Ready` → `Spent` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    /// Disabled by configuration.
    Absent,
    Ready,
    Spent,
}

#[derive(Debug, Clone)]
pub struct ShutdownDevice {
    state: DeviceState,
}

impl ShutdownDevice {
    pub fn new(enabled: bool) -> Self {
        let state = if enabled {
            DeviceState::Ready
        } else {
            DeviceState::Absent
        };
        Self { state }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == DeviceState::Ready
    }

    pub fn is_spent(&self) -> bool {
        self.state == DeviceState::Spent
    }

    /// The cell to fire at, if any.
    ///
    /// Fires only when the knowledge base is consistent and entails a live
    /// neutralizable hazard at some cell strictly ahead of `pose`, in the
    /// same row or column and within the grid.
    pub fn aim(
        &self,
        kb: &KnowledgeBase,
        oracle: &SafetyOracle,
        bounds: GridBounds,
        pose: Pose,
    ) -> KbResult<Option<Cell>> {
        if !self.is_ready() {
            return Ok(None);
        }
        let kinds: Vec<HazardKind> = oracle
            .live()
            .iter()
            .filter(|k| k.neutralizable())
            .collect();
        if kinds.is_empty() || !oracle.usable(kb)? {
            return Ok(None);
        }

        for cell in bounds.ray(pose) {
            for &kind in &kinds {
                if oracle.hazard_entailed(kb, kind, cell)? {
                    tracing::info!(%kind, target = %cell, from = %pose.cell, facing = %pose.facing, "shutdown target locked");
                    return Ok(Some(cell));
                }
            }
        }
        Ok(None)
    }

    /// Mark the device used. Fails unless it is ready.
    pub fn discharge(&mut self) -> AgentResult<()> {
        match self.state {
            DeviceState::Ready => {
                self.state = DeviceState::Spent;
                Ok(())
            }
            DeviceState::Spent => Err(AgentError::InvalidAction {
                action: Action::Shutdown,
                reason: "the shutdown device has already been used".into(),
            }),
            DeviceState::Absent => Err(AgentError::InvalidAction {
                action: Action::Shutdown,
                reason: "the shutdown device is disabled".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;
    use crate::percept::{Percept, interpret_all};

    fn bounds() -> GridBounds {
        GridBounds::new(4, 4).unwrap()
    }

    /// Percepts from the example layout's walk: (1,1) quiet, (2,1) creaking,
    /// (1,2) rumbling. Together they pin the forklift at (1,3).
    fn example_kb() -> KnowledgeBase {
        let mut kb = KnowledgeBase::new();
        let b = bounds();
        interpret_all(&mut kb, b, Cell::new(1, 1), &Percept::quiet()).unwrap();
        let creaking = Percept {
            creaking: true,
            ..Percept::quiet()
        };
        interpret_all(&mut kb, b, Cell::new(2, 1), &creaking).unwrap();
        let rumbling = Percept {
            rumbling: true,
            ..Percept::quiet()
        };
        interpret_all(&mut kb, b, Cell::new(1, 2), &rumbling).unwrap();
        kb
    }

    #[test]
    fn fires_only_when_aligned_with_an_entailed_forklift() {
        let kb = example_kb();
        let oracle = SafetyOracle::default();
        let device = ShutdownDevice::new(true);

        let facing_north = Pose::new(Cell::new(1, 2), Direction::North);
        assert_eq!(
            device.aim(&kb, &oracle, bounds(), facing_north).unwrap(),
            Some(Cell::new(1, 3))
        );
        let facing_east = Pose::new(Cell::new(1, 2), Direction::East);
        assert_eq!(device.aim(&kb, &oracle, bounds(), facing_east).unwrap(), None);
    }

    #[test]
    fn suspected_locations_do_not_fire() {
        let mut kb = KnowledgeBase::new();
        let rumbling = Percept {
            rumbling: true,
            ..Percept::quiet()
        };
        interpret_all(&mut kb, bounds(), Cell::new(1, 1), &rumbling).unwrap();
        let device = ShutdownDevice::new(true);
        let pose = Pose::new(Cell::new(1, 1), Direction::East);
        assert_eq!(
            device
                .aim(&kb, &SafetyOracle::default(), bounds(), pose)
                .unwrap(),
            None
        );
    }

    #[test]
    fn single_use() {
        let kb = example_kb();
        let oracle = SafetyOracle::default();
        let pose = Pose::new(Cell::new(1, 2), Direction::North);
        let mut device = ShutdownDevice::new(true);
        device.discharge().unwrap();
        assert!(device.is_spent());
        assert_eq!(device.aim(&kb, &oracle, bounds(), pose).unwrap(), None);
        assert!(matches!(
            device.discharge(),
            Err(AgentError::InvalidAction { action: Action::Shutdown, .. })
        ));
    }

    #[test]
    fn neutralized_or_disabled_devices_stay_quiet() {
        let kb = example_kb();
        let pose = Pose::new(Cell::new(1, 2), Direction::North);

        let mut oracle = SafetyOracle::default();
        oracle.neutralize(HazardKind::Forklift);
        let device = ShutdownDevice::new(true);
        assert_eq!(device.aim(&kb, &oracle, bounds(), pose).unwrap(), None);

        let absent = ShutdownDevice::new(false);
        assert_eq!(absent.state(), DeviceState::Absent);
        assert_eq!(
            absent
                .aim(&kb, &SafetyOracle::default(), bounds(), pose)
                .unwrap(),
            None
        );
    }
}
