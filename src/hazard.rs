//! Hazard kinds tracked by the knowledge base.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::percept::Percept;

/// A kind of hidden hazard. Each kind gets one proposition per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HazardKind {
    /// Collapsing floor. Announced by creaking in adjacent cells.
    DamagedFloor,
    /// A live forklift. Announced by rumbling in adjacent cells; can be
    /// disabled by the shutdown device.
    Forklift,
}

impl HazardKind {
    pub const ALL: [HazardKind; 2] = [HazardKind::DamagedFloor, HazardKind::Forklift];

    /// Short prefix used in proposition labels (`D_3_1`, `F_1_3`).
    pub fn prefix(self) -> &'static str {
        match self {
            HazardKind::DamagedFloor => "D",
            HazardKind::Forklift => "F",
        }
    }

    /// Whether this kind's proximity sensor fired in `percept`.
    pub fn sensed_in(self, percept: &Percept) -> bool {
        match self {
            HazardKind::DamagedFloor => percept.creaking,
            HazardKind::Forklift => percept.rumbling,
        }
    }

    /// Whether the shutdown device can disable this hazard.
    pub fn neutralizable(self) -> bool {
        matches!(self, HazardKind::Forklift)
    }
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HazardKind::DamagedFloor => f.write_str("damaged floor"),
            HazardKind::Forklift => f.write_str("forklift"),
        }
    }
}

/// The hazard kinds that are still live, i.e. still able to hurt the agent.
///
/// Starts with every kind; a kind leaves the set once it is neutralized and
/// never returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardSet(BTreeSet<HazardKind>);

impl HazardSet {
    pub fn all() -> Self {
        Self(HazardKind::ALL.into_iter().collect())
    }

    pub fn only(kinds: &[HazardKind]) -> Self {
        Self(kinds.iter().copied().collect())
    }

    pub fn contains(&self, kind: HazardKind) -> bool {
        self.0.contains(&kind)
    }

    /// Remove `kind`. Returns `true` if it was live.
    pub fn neutralize(&mut self, kind: HazardKind) -> bool {
        self.0.remove(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = HazardKind> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Default for HazardSet {
    fn default() -> Self {
        Self::all()
    }
}
