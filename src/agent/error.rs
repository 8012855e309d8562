//! Agent-specific error types with rich miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use crate::error::{KbError, WorldError};
use crate::world::Action;

/// Errors raised by the controller.
///
/// Running out of safe cells is not among them: that is the `Stuck` outcome.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    #[error("refusing to send {action}: {reason}")]
    #[diagnostic(
        code(wkb::agent::invalid_action),
        help(
            "The controller validates every action before it reaches the environment. \
             This indicates a planning defect."
        )
    )]
    InvalidAction { action: Action, reason: String },

    #[error("max steps reached: {max_steps}")]
    #[diagnostic(
        code(wkb::agent::max_steps),
        help(
            "The agent hit its step limit before the episode ended. \
             Increase `max_steps` in the agent config."
        )
    )]
    MaxStepsReached { max_steps: u64 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Kb(#[from] KbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    World(#[from] WorldError),
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;
