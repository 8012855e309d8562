//! Rich diagnostic error types for the warehouse agent.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

use crate::agent::error::AgentError;
use crate::grid::Cell;

/// Top-level error type for the warehouse agent.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum WarehouseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Kb(#[from] KbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Knowledge base errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error("malformed constraint {formula}: {reason}")]
    #[diagnostic(
        code(wkb::kb::malformed_constraint),
        help(
            "Constraints may only reference propositions issued by this knowledge base \
             through `declare_variable`, and disjunctions must have at least one disjunct. \
             This indicates a defect in the caller, not in the percepts."
        )
    )]
    MalformedConstraint { formula: String, reason: String },

    #[error("proposition space exhausted after {declared} propositions")]
    #[diagnostic(
        code(wkb::kb::proposition_space_exhausted),
        help("A knowledge base can issue at most 2^32 - 1 propositions.")
    )]
    PropositionSpaceExhausted { declared: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Solver(#[from] SolverError),
}

// ---------------------------------------------------------------------------
// Solver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SolverError {
    #[error("{backend} gave up after {decisions} decisions (budget {budget})")]
    #[diagnostic(
        code(wkb::solver::budget_exhausted),
        help(
            "The satisfiability check did not finish within its decision budget. \
             The query is treated as undecided. Raise `solver_decision_budget` \
             in the agent config if this happens on small grids."
        )
    )]
    BudgetExhausted {
        backend: String,
        decisions: u64,
        budget: u64,
    },

    #[error("solver backend {backend} unavailable: {message}")]
    #[diagnostic(
        code(wkb::solver::unavailable),
        help("The entailment backend could not answer. The query is treated as undecided.")
    )]
    Unavailable { backend: String, message: String },
}

// ---------------------------------------------------------------------------
// World errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum WorldError {
    #[error("cell {cell} is outside the {width}x{height} grid")]
    #[diagnostic(
        code(wkb::world::out_of_bounds),
        help("Coordinates are 1-based: x in 1..=width, y in 1..=height.")
    )]
    OutOfBounds { cell: Cell, width: i32, height: i32 },

    #[error("invalid layout: {message}")]
    #[diagnostic(
        code(wkb::world::invalid_layout),
        help(
            "A layout needs a positive grid size, a package cell away from the entrance \
             at (1,1), and hazards that neither overlap each other nor sit on the entrance."
        )
    )]
    InvalidLayout { message: String },

    #[error("episode already ended after {steps} steps")]
    #[diagnostic(
        code(wkb::world::episode_over),
        help("Create a fresh warehouse before issuing further actions.")
    )]
    EpisodeOver { steps: u64 },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(wkb::config::read),
        help("Ensure the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(wkb::config::parse),
        help("Check the TOML syntax. Cells are written as `[x, y]` arrays.")
    )]
    Parse { path: String, message: String },
}

/// Convenience alias for the top-level error.
pub type WarehouseResult<T> = std::result::Result<T, WarehouseError>;

/// Convenience alias for knowledge base operations.
pub type KbResult<T> = std::result::Result<T, KbError>;

/// Convenience alias for solver backends.
pub type SolverResult<T> = std::result::Result<T, SolverError>;

/// Convenience alias for world operations.
pub type WorldResult<T> = std::result::Result<T, WorldError>;

/// Convenience alias for config loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
