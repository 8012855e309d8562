//! The knowledge-based agent.
//!
//! The agent owns its knowledge base outright and threads it through the
//! percept interpreter (the only writer), the safety oracle, the frontier
//! planner, and the shutdown device. Each cycle runs to completion before the
//! next begins:
//!
//! ```text
//! percept → knowledge base → oracle → planner → action → environment
//! ```

pub mod cycle;
pub mod error;
pub mod plan;
pub mod shutdown;

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::config::AgentConfig;
use crate::error::KbResult;
use crate::grid::{Cell, Direction, GridBounds, Pose};
use crate::kb::KnowledgeBase;
use crate::logic::solver::{DpllSolver, SatBackend};
use crate::oracle::{Safety, SafetyOracle};
use crate::percept::{Percept, PerceptInterpreter};
use crate::world::{Action, Environment};

pub use error::{AgentError, AgentResult};
pub use plan::{FrontierPlanner, Plan, PlanPurpose, Route};
pub use shutdown::{DeviceState, ShutdownDevice};

// ---------------------------------------------------------------------------
// Phases and records
// ---------------------------------------------------------------------------

/// Controller state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentPhase {
    /// Looking for the package.
    Exploring,
    /// Holding the package, heading for the exit.
    Returning,
    /// No safe frontier left; heading for the exit empty-handed.
    Withdrawing,
    /// Exited with the package.
    Succeeded,
    /// Gave up without the package.
    Stuck,
    /// The episode ended some other way, e.g. the agent was destroyed.
    Halted,
}

impl AgentPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AgentPhase::Succeeded | AgentPhase::Stuck | AgentPhase::Halted
        )
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentPhase::Exploring => "EXPLORING",
            AgentPhase::Returning => "RETURNING",
            AgentPhase::Withdrawing => "WITHDRAWING",
            AgentPhase::Succeeded => "SUCCEEDED",
            AgentPhase::Stuck => "STUCK",
            AgentPhase::Halted => "HALTED",
        };
        f.write_str(name)
    }
}

/// One executed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// 1-based.
    pub step: u64,
    pub action: Action,
    /// Where the action was issued from.
    pub cell: Cell,
    pub facing: Direction,
    pub reward: i64,
    /// Percept received after the action.
    pub percept: Percept,
}

/// Outcome of a run, for reporting layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub steps: u64,
    pub total_reward: i64,
    pub outcome: AgentPhase,
    pub package_retrieved: bool,
    pub shutdown_used: bool,
    pub cells_visited: usize,
    pub trace: Vec<StepRecord>,
}

impl RunSummary {
    pub fn actions(&self) -> Vec<Action> {
        self.trace.iter().map(|r| r.action).collect()
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// The controller and everything it owns.
#[derive(Debug)]
pub struct Agent {
    config: AgentConfig,
    bounds: GridBounds,
    kb: KnowledgeBase,
    interpreter: PerceptInterpreter,
    oracle: SafetyOracle,
    planner: FrontierPlanner,
    device: ShutdownDevice,
    pose: Pose,
    visited: BTreeSet<Cell>,
    has_package: bool,
    phase: AgentPhase,
    plan: Option<Plan>,
    /// Percept delivered with the last feedback, not yet interpreted.
    pending: Option<Percept>,
    steps: u64,
    total_reward: i64,
    trace: Vec<StepRecord>,
}

impl Agent {
    /// An agent at `start` on a grid of `bounds`, using the DPLL backend.
    pub fn new(config: AgentConfig, bounds: GridBounds, start: Pose) -> Self {
        let backend = DpllSolver::new(config.solver_decision_budget);
        Self::with_backend(config, bounds, start, Box::new(backend))
    }

    /// An agent matched to `env`'s grid and starting pose.
    pub fn for_environment(config: AgentConfig, env: &impl Environment) -> Self {
        Self::new(config, env.bounds(), env.start())
    }

    pub fn with_backend(
        config: AgentConfig,
        bounds: GridBounds,
        start: Pose,
        backend: Box<dyn SatBackend>,
    ) -> Self {
        tracing::info!(
            width = bounds.width(),
            height = bounds.height(),
            start = %start.cell,
            facing = %start.facing,
            backend = backend.name(),
            "agent created"
        );
        Self {
            device: ShutdownDevice::new(config.use_shutdown_device),
            config,
            bounds,
            kb: KnowledgeBase::with_backend(backend),
            interpreter: PerceptInterpreter::new(bounds),
            oracle: SafetyOracle::default(),
            planner: FrontierPlanner::new(bounds),
            pose: start,
            visited: BTreeSet::from([start.cell]),
            has_package: false,
            phase: AgentPhase::Exploring,
            plan: None,
            pending: None,
            steps: 0,
            total_reward: 0,
            trace: Vec::new(),
        }
    }

    /// Run cycles until a terminal phase.
    pub fn run(&mut self, env: &mut impl Environment) -> AgentResult<RunSummary> {
        while !self.phase.is_terminal() {
            if self.steps >= self.config.max_steps {
                return Err(AgentError::MaxStepsReached {
                    max_steps: self.config.max_steps,
                });
            }
            cycle::run_cycle(self, env)?;
        }
        let summary = self.summary();
        tracing::info!(
            outcome = %summary.outcome,
            steps = summary.steps,
            reward = summary.total_reward,
            package = summary.package_retrieved,
            "run finished"
        );
        Ok(summary)
    }

    /// Run a single cycle. Returns the executed action, if one was sent.
    pub fn step(&mut self, env: &mut impl Environment) -> AgentResult<Option<Action>> {
        if self.phase.is_terminal() {
            return Ok(None);
        }
        cycle::run_cycle(self, env)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            steps: self.steps,
            total_reward: self.total_reward,
            outcome: self.phase,
            package_retrieved: self.has_package,
            shutdown_used: self.device.is_spent(),
            cells_visited: self.visited.len(),
            trace: self.trace.clone(),
        }
    }

    /// Current classification of every cell, row-major.
    pub fn safety_map(&self) -> KbResult<Vec<(Cell, Safety)>> {
        let cells: Vec<Cell> = self.bounds.cells().collect();
        self.oracle.classify_all(&self.kb, &cells)
    }

    /// Text map of the agent's beliefs, north at the top: `S` safe, `X`
    /// unsafe, `?` unknown, lowercase `s` for visited cells, an arrow for
    /// the agent.
    pub fn render_beliefs(&self) -> KbResult<String> {
        let map = self.safety_map()?;
        let header: Vec<String> = (1..=self.bounds.width()).map(|x| x.to_string()).collect();
        let mut lines = vec![format!("  {}", header.join(" "))];
        for y in (1..=self.bounds.height()).rev() {
            let mut row = vec![y.to_string()];
            for &(cell, safety) in map.iter().filter(|(c, _)| c.y == y) {
                let glyph = if cell == self.pose.cell {
                    self.pose.facing.arrow()
                } else {
                    match safety {
                        Safety::Safe if self.visited.contains(&cell) => 's',
                        Safety::Safe => 'S',
                        Safety::Unsafe => 'X',
                        Safety::Unknown => '?',
                    }
                };
                row.push(glyph.to_string());
            }
            lines.push(row.join(" "));
        }
        Ok(lines.join("\n"))
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn has_package(&self) -> bool {
        self.has_package
    }

    pub fn visited(&self) -> &BTreeSet<Cell> {
        &self.visited
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn oracle(&self) -> &SafetyOracle {
        &self.oracle
    }

    pub fn device(&self) -> &ShutdownDevice {
        &self.device
    }

    pub fn current_plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn total_reward(&self) -> i64 {
        self.total_reward
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn set_phase(&mut self, next: AgentPhase) {
        if self.phase != next {
            tracing::info!(from = %self.phase, to = %next, cell = %self.pose.cell, "phase change");
            self.phase = next;
        }
    }
}
