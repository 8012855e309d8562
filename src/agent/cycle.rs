//! One controller cycle: Observe → Decide → Act.
//!
//! Decision priority within a cycle:
//!
//! 1. fire the shutdown device if a live forklift is entailed straight ahead
//! 2. continue the current plan, re-checking the next cell before a move
//! 3. grab the package on a beacon
//! 4. head for the exit when returning or withdrawing
//! 5. otherwise plan toward the nearest provably safe frontier cell

use super::error::{AgentError, AgentResult};
use super::plan::{Plan, PlanPurpose};
use super::{Agent, AgentPhase, StepRecord};
use crate::grid::{Cell, GridBounds};
use crate::hazard::HazardKind;
use crate::percept::Percept;
use crate::world::{Action, ActionEffect, Environment};

/// Action chosen during the Decide phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    /// Why this action was chosen.
    pub reason: String,
}

impl Decision {
    fn new(action: Action, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
        }
    }
}

/// Run one full cycle. Returns the action sent to the environment, or `None`
/// if the agent stopped without acting.
pub fn run_cycle(agent: &mut Agent, env: &mut impl Environment) -> AgentResult<Option<Action>> {
    // ── Observe ─────────────────────────────────────────────────────────
    let percept = observe(agent, env)?;

    // ── Decide ──────────────────────────────────────────────────────────
    let Some(decision) = decide(agent, &percept)? else {
        return Ok(None);
    };
    tracing::debug!(
        step = agent.steps + 1,
        action = %decision.action,
        reason = %decision.reason,
        cell = %agent.pose.cell,
        "decided"
    );

    // ── Act ─────────────────────────────────────────────────────────────
    act(agent, env, decision.action)?;
    Ok(Some(decision.action))
}

/// Observe: fold the latest percept into the knowledge base.
fn observe(agent: &mut Agent, env: &impl Environment) -> AgentResult<Percept> {
    let percept = agent.pending.take().unwrap_or_else(|| env.percept());

    if percept.beep {
        for kind in HazardKind::ALL.into_iter().filter(|k| k.neutralizable()) {
            agent.oracle.neutralize(kind);
        }
    }

    agent
        .interpreter
        .interpret(&mut agent.kb, agent.pose.cell, &percept, agent.oracle.live())?;
    Ok(percept)
}

/// Decide: pick the next action, or `None` once the agent has stopped.
fn decide(agent: &mut Agent, percept: &Percept) -> AgentResult<Option<Decision>> {
    if let Some(target) = agent
        .device
        .aim(&agent.kb, &agent.oracle, agent.bounds, agent.pose)?
    {
        return Ok(Some(Decision::new(
            Action::Shutdown,
            format!("forklift entailed at {target}"),
        )));
    }

    if let Some(action) = continue_plan(agent)? {
        return Ok(Some(Decision::new(action, "continuing plan")));
    }

    if percept.beacon && !agent.has_package {
        return Ok(Some(Decision::new(Action::Grab, "beacon")));
    }

    match agent.phase {
        AgentPhase::Returning => head_for_exit(agent, PlanPurpose::Return),
        AgentPhase::Withdrawing => head_for_exit(agent, PlanPurpose::Withdraw),
        AgentPhase::Exploring => explore(agent),
        AgentPhase::Succeeded | AgentPhase::Stuck | AgentPhase::Halted => Ok(None),
    }
}

/// Next queued action, unless the plan is exhausted or its next move is no
/// longer onto known-safe ground.
fn continue_plan(agent: &mut Agent) -> AgentResult<Option<Action>> {
    let Some(next) = agent.plan.as_ref().and_then(Plan::peek) else {
        agent.plan = None;
        return Ok(None);
    };

    if next == Action::Forward {
        let ahead = agent.pose.ahead();
        let trusted =
            agent.visited.contains(&ahead) || agent.oracle.classify(&agent.kb, ahead)?.is_safe();
        if !trusted {
            tracing::warn!(cell = %ahead, "planned move no longer provably safe, replanning");
            agent.plan = None;
            return Ok(None);
        }
    }

    let action = agent.plan.as_mut().and_then(Plan::pop);
    if agent.plan.as_ref().is_some_and(Plan::is_finished) {
        agent.plan = None;
    }
    Ok(action)
}

/// Exit at the entrance, or plan the way back over visited cells.
fn head_for_exit(agent: &mut Agent, purpose: PlanPurpose) -> AgentResult<Option<Decision>> {
    let entrance = GridBounds::ENTRANCE;
    if agent.pose.cell == entrance {
        return Ok(Some(Decision::new(Action::Exit, format!("at the entrance ({purpose})"))));
    }
    match agent
        .planner
        .shortest_path(agent.pose.cell, entrance, &agent.visited)
    {
        Some(path) => Ok(start_plan(agent, purpose, path)),
        None => {
            tracing::error!(cell = %agent.pose.cell, "no visited route back to the entrance");
            agent.set_phase(AgentPhase::Halted);
            Ok(None)
        }
    }
}

fn explore(agent: &mut Agent) -> AgentResult<Option<Decision>> {
    let frontier = agent.planner.frontier(&agent.visited);
    let verdicts = agent.oracle.classify_all(&agent.kb, &frontier)?;
    let safe: Vec<Cell> = verdicts
        .iter()
        .filter(|(_, s)| s.is_safe())
        .map(|&(c, _)| c)
        .collect();
    tracing::debug!(frontier = frontier.len(), safe = safe.len(), "frontier classified");

    if let Some(route) = agent
        .planner
        .select_target(agent.pose.cell, &safe, &agent.visited)
    {
        return Ok(start_plan(agent, PlanPurpose::Explore(route.target), route.path));
    }

    tracing::info!(frontier = frontier.len(), "no provably safe frontier cell");
    if agent.config.withdraw_when_stuck {
        agent.set_phase(AgentPhase::Withdrawing);
        head_for_exit(agent, PlanPurpose::Withdraw)
    } else {
        agent.set_phase(AgentPhase::Stuck);
        Ok(None)
    }
}

/// Install a plan along `path` and take its first action.
fn start_plan(agent: &mut Agent, purpose: PlanPurpose, path: Vec<Cell>) -> Option<Decision> {
    let mut plan = Plan::along(purpose, path, agent.pose.facing);
    tracing::info!(
        %purpose,
        moves = plan.path.len().saturating_sub(1),
        actions = plan.actions.len(),
        "plan selected"
    );
    let action = plan.pop()?;
    agent.plan = (!plan.is_finished()).then_some(plan);
    Some(Decision::new(action, format!("starting plan to {purpose}")))
}

/// Reject actions the environment must never see.
fn validate(agent: &Agent, action: Action) -> AgentResult<()> {
    let reason = if agent.phase.is_terminal() {
        Some(format!("the run already ended in {}", agent.phase))
    } else {
        match action {
            Action::Shutdown if !agent.device.is_ready() => {
                Some("the shutdown device is not available".to_string())
            }
            Action::Grab if agent.has_package => Some("already holding the package".to_string()),
            Action::Exit if agent.pose.cell != GridBounds::ENTRANCE => Some(format!(
                "exit is only possible at {}",
                GridBounds::ENTRANCE
            )),
            Action::Forward if !agent.bounds.contains(agent.pose.ahead()) => {
                Some(format!("{} is outside the grid", agent.pose.ahead()))
            }
            _ => None,
        }
    };
    match reason {
        Some(reason) => Err(AgentError::InvalidAction { action, reason }),
        None => Ok(()),
    }
}

/// Act: send the action and fold the feedback into the agent's state.
fn act(agent: &mut Agent, env: &mut impl Environment, action: Action) -> AgentResult<()> {
    validate(agent, action)?;
    if action == Action::Shutdown {
        agent.device.discharge()?;
    }

    let before = agent.pose;
    let feedback = env.step(action)?;
    agent.steps += 1;
    agent.total_reward += feedback.reward;

    match action {
        Action::Forward if !feedback.percept.bump => {
            agent.pose.cell = before.ahead();
            agent.visited.insert(agent.pose.cell);
        }
        Action::TurnLeft => agent.pose.facing = agent.pose.facing.turn_left(),
        Action::TurnRight => agent.pose.facing = agent.pose.facing.turn_right(),
        Action::Grab if feedback.effect == ActionEffect::Grabbed(true) => {
            agent.has_package = true;
            agent.plan = None;
            agent.set_phase(AgentPhase::Returning);
        }
        _ => {}
    }

    agent.trace.push(StepRecord {
        step: agent.steps,
        action,
        cell: before.cell,
        facing: before.facing,
        reward: feedback.reward,
        percept: feedback.percept,
    });
    agent.pending = Some(feedback.percept);

    if feedback.done {
        let next = match feedback.effect {
            ActionEffect::Exited { success: true } => AgentPhase::Succeeded,
            ActionEffect::Exited { success: false } if agent.phase == AgentPhase::Withdrawing => {
                AgentPhase::Stuck
            }
            other => {
                tracing::warn!(effect = ?other, cell = %agent.pose.cell, "episode ended unexpectedly");
                AgentPhase::Halted
            }
        };
        agent.plan = None;
        agent.set_phase(next);
    }
    Ok(())
}
