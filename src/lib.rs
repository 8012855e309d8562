// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # warehouse-kb
//!
//! A knowledge-based agent for the hazardous warehouse: a partially observable
//! grid with damaged floor tiles and a roaming forklift. The agent never gambles.
//! It only steps onto cells whose safety is logically entailed by what it has
//! sensed so far.
//!
//! ## Architecture
//!
//! - **Logic** (`logic`): formulas, Tseitin CNF encoding, and a DPLL backend
//!   behind the [`logic::solver::SatBackend`] seam
//! - **Knowledge base** (`kb`): lazily declared hazard propositions, monotonic
//!   constraints, entailment by refutation
//! - **Percepts** (`percept`): sensor readings turned into constraints
//! - **Safety oracle** (`oracle`): SAFE / UNSAFE / UNKNOWN per cell
//! - **Agent** (`agent`): frontier planner, shutdown device, and the
//!   percept → decide → act cycle
//! - **World** (`world`): the environment contract and a reference simulator
//!
//! ## Library usage
//!
//! ```no_run
//! use warehouse_kb::agent::Agent;
//! use warehouse_kb::config::AgentConfig;
//! use warehouse_kb::world::{Layout, Warehouse};
//!
//! let mut world = Warehouse::new(Layout::example()).unwrap();
//! let mut agent = Agent::for_environment(AgentConfig::default(), &world);
//! let summary = agent.run(&mut world).unwrap();
//! println!("{} after {} steps", summary.outcome, summary.steps);
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod grid;
pub mod hazard;
pub mod kb;
pub mod logic;
pub mod oracle;
pub mod percept;
pub mod world;
