//! Hidden warehouse contents: where the hazards and the package are.

use std::collections::HashSet;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, WarehouseResult, WorldError, WorldResult};
use crate::grid::{Cell, GridBounds};

fn default_size() -> i32 {
    4
}

/// A static warehouse layout. Opaque to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default = "default_size")]
    pub width: i32,
    #[serde(default = "default_size")]
    pub height: i32,
    /// Cells with damaged floor.
    #[serde(default)]
    pub damaged: Vec<Cell>,
    /// The forklift, if the warehouse has one.
    #[serde(default)]
    pub forklift: Option<Cell>,
    pub package: Cell,
}

impl Layout {
    /// The 4x4 textbook layout.
    ///
    /// ```text
    /// 4 . . . .
    /// 3 F P D .
    /// 2 . . . .
    /// 1 > . D .
    ///   1 2 3 4
    /// ```
    pub fn example() -> Self {
        Self {
            width: 4,
            height: 4,
            damaged: vec![Cell::new(3, 1), Cell::new(3, 3)],
            forklift: Some(Cell::new(1, 3)),
            package: Cell::new(2, 3),
        }
    }

    /// A random layout: `damaged` damaged cells, one forklift, one package,
    /// none at the entrance. The same seed always yields the same layout.
    pub fn random(width: i32, height: i32, damaged: usize, seed: u64) -> WorldResult<Self> {
        let bounds = GridBounds::new(width, height)?;
        let mut cells: Vec<Cell> = bounds
            .cells()
            .filter(|&c| c != GridBounds::ENTRANCE)
            .collect();
        if damaged.checked_add(2).is_none_or(|needed| cells.len() < needed) {
            return Err(WorldError::InvalidLayout {
                message: format!(
                    "{width}x{height} grid has no room for {damaged} damaged cells, a forklift and a package"
                ),
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        cells.shuffle(&mut rng);

        let layout = Self {
            width,
            height,
            damaged: cells[..damaged].to_vec(),
            forklift: Some(cells[damaged]),
            package: cells[damaged + 1],
        };
        tracing::debug!(seed, ?layout, "generated random layout");
        Ok(layout)
    }

    /// Check the layout and return its bounds.
    pub fn validate(&self) -> WorldResult<GridBounds> {
        let bounds = GridBounds::new(self.width, self.height)?;
        let entrance = GridBounds::ENTRANCE;

        let mut occupied = HashSet::new();
        let placements = self
            .damaged
            .iter()
            .map(|&c| ("damaged floor", c))
            .chain(self.forklift.map(|c| ("forklift", c)));

        for (what, cell) in placements {
            bounds.check(cell)?;
            if cell == entrance {
                return Err(WorldError::InvalidLayout {
                    message: format!("{what} at the entrance {entrance}"),
                });
            }
            if !occupied.insert(cell) {
                return Err(WorldError::InvalidLayout {
                    message: format!("{what} at {cell} overlaps another hazard"),
                });
            }
        }

        bounds.check(self.package)?;
        if self.package == entrance {
            return Err(WorldError::InvalidLayout {
                message: format!("package at the entrance {entrance}"),
            });
        }
        if occupied.contains(&self.package) {
            return Err(WorldError::InvalidLayout {
                message: format!("package at {} sits on a hazard", self.package),
            });
        }
        Ok(bounds)
    }

    /// Parse and validate a layout from TOML text.
    ///
    /// `origin` names the source in error messages.
    pub fn from_toml_str(content: &str, origin: &str) -> WarehouseResult<Self> {
        let layout: Layout = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        layout.validate()?;
        Ok(layout)
    }

    /// Load and validate a layout file.
    pub fn load(path: &Path) -> WarehouseResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::example()
    }
}
