//! Grid geometry: cells, headings, poses, and bounds.
//!
//! Coordinates are 1-based with the origin at the bottom-left, so the
//! entrance sits at `(1,1)` and North increases `y`. Cells order row-major
//! (by `y`, then `x`); every deterministic tie-break in the crate relies on it.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};

/// A grid coordinate. Pure value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent cell in `heading`. May fall outside the grid.
    pub fn step(self, heading: Direction) -> Self {
        let (dx, dy) = heading.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Heading from `self` to an orthogonally adjacent `other`.
    pub fn direction_to(self, other: Cell) -> Option<Direction> {
        Direction::CLOCKWISE
            .into_iter()
            .find(|&heading| self.step(heading) == other)
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl From<Cell> for (i32, i32) {
    fn from(cell: Cell) -> Self {
        (cell.x, cell.y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Compass heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Headings in clockwise order, starting North.
    pub const CLOCKWISE: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Neighbor enumeration order used by every search: West, East, South, North.
    pub const NEIGHBOR_ORDER: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::South,
        Direction::North,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    fn clockwise_index(self) -> i32 {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    fn from_clockwise_index(index: i32) -> Self {
        Self::CLOCKWISE[index.rem_euclid(4) as usize]
    }

    pub fn turn_left(self) -> Self {
        Self::from_clockwise_index(self.clockwise_index() - 1)
    }

    pub fn turn_right(self) -> Self {
        Self::from_clockwise_index(self.clockwise_index() + 1)
    }

    /// Quarter turns needed to face `target`: `(right_turns, left_turns)`.
    pub fn turns_to(self, target: Direction) -> (u8, u8) {
        let right = (target.clockwise_index() - self.clockwise_index()).rem_euclid(4);
        let left = (self.clockwise_index() - target.clockwise_index()).rem_euclid(4);
        (right as u8, left as u8)
    }

    /// Glyph used when rendering the agent.
    pub fn arrow(self) -> char {
        match self {
            Direction::North => '^',
            Direction::East => '>',
            Direction::South => 'v',
            Direction::West => '<',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        };
        f.pad(name)
    }
}

/// Where the agent stands and which way it faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pose {
    pub cell: Cell,
    pub facing: Direction,
}

impl Pose {
    pub const fn new(cell: Cell, facing: Direction) -> Self {
        Self { cell, facing }
    }

    /// The cell directly ahead.
    pub fn ahead(self) -> Cell {
        self.cell.step(self.facing)
    }
}

/// Grid extent. All cells satisfy `1 <= x <= width` and `1 <= y <= height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridBounds {
    width: i32,
    height: i32,
}

impl GridBounds {
    /// The entrance and exit cell of every warehouse.
    pub const ENTRANCE: Cell = Cell::new(1, 1);

    pub fn new(width: i32, height: i32) -> WorldResult<Self> {
        if width < 1 || height < 1 {
            return Err(WorldError::InvalidLayout {
                message: format!("grid must be at least 1x1, got {width}x{height}"),
            });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (1..=self.width).contains(&cell.x) && (1..=self.height).contains(&cell.y)
    }

    /// Return `cell` if it lies on the grid, `OutOfBounds` otherwise.
    pub fn check(&self, cell: Cell) -> WorldResult<Cell> {
        if self.contains(cell) {
            Ok(cell)
        } else {
            Err(WorldError::OutOfBounds {
                cell,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// In-bounds orthogonal neighbors, in [`Direction::NEIGHBOR_ORDER`].
    pub fn neighbors(&self, cell: Cell) -> Vec<Cell> {
        Direction::NEIGHBOR_ORDER
            .into_iter()
            .map(|heading| cell.step(heading))
            .filter(|&n| self.contains(n))
            .collect()
    }

    /// Every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + use<> {
        let (width, height) = (self.width, self.height);
        (1..=height).flat_map(move |y| (1..=width).map(move |x| Cell::new(x, y)))
    }

    /// Cells strictly ahead of `pose`, nearest first, up to the wall.
    pub fn ray(&self, pose: Pose) -> impl Iterator<Item = Cell> + use<> {
        let bounds = *self;
        std::iter::successors(Some(pose.ahead()), move |c| Some(c.step(pose.facing)))
            .take_while(move |&c| bounds.contains(c))
    }
}
