use core::fmt;
use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: u8 = 17;

pub const HEADQUARTERS: [Cell; 8] = [
    Cell::new(0, 7),
    Cell::new(7, 0),
    Cell::new(0, 9),
    Cell::new(9, 0),
    Cell::new(16, 7),
    Cell::new(7, 16),
    Cell::new(16, 9),
    Cell::new(9, 16),
];

pub const CAMPS: [Cell; 20] = [
    Cell::new(2, 7),
    Cell::new(4, 7),
    Cell::new(14, 7),
    Cell::new(12, 7),
    Cell::new(2, 9),
    Cell::new(4, 9),
    Cell::new(14, 9),
    Cell::new(12, 9),
    Cell::new(3, 8),
    Cell::new(13, 8),
    Cell::new(7, 2),
    Cell::new(7, 4),
    Cell::new(7, 12),
    Cell::new(7, 14),
    Cell::new(9, 2),
    Cell::new(9, 4),
    Cell::new(9, 12),
    Cell::new(9, 14),
    Cell::new(8, 3),
    Cell::new(8, 13),
];

/// Cells around the central crossing that can never hold a piece.
pub const CENTER_BLOCKS: [Cell; 16] = [
    Cell::new(6, 7),
    Cell::new(6, 9),
    Cell::new(7, 6),
    Cell::new(7, 7),
    Cell::new(7, 8),
    Cell::new(7, 9),
    Cell::new(7, 10),
    Cell::new(8, 7),
    Cell::new(8, 9),
    Cell::new(9, 6),
    Cell::new(9, 7),
    Cell::new(9, 8),
    Cell::new(9, 9),
    Cell::new(9, 10),
    Cell::new(10, 7),
    Cell::new(10, 9),
];

/// A board coordinate. `x` is the column and `y` the row, both in `0..17`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Headquarters,
    Camp,
    Open,
}

impl Cell {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Builds a cell from signed coordinates, rejecting anything off the grid.
    pub fn checked(x: i32, y: i32) -> Option<Self> {
        let size = i32::from(BOARD_SIZE);
        if (0..size).contains(&x) && (0..size).contains(&y) {
            Some(Self::new(x as u8, y as u8))
        } else {
            None
        }
    }

    pub const fn in_bounds(self) -> bool {
        self.x < BOARD_SIZE && self.y < BOARD_SIZE
    }

    const fn in_corner(self) -> bool {
        let outer_x = self.x < 6 || self.x > 10;
        let outer_y = self.y < 6 || self.y > 10;
        outer_x && outer_y
    }

    pub fn is_valid(self) -> bool {
        self.in_bounds() && !self.in_corner() && !CENTER_BLOCKS.contains(&self)
    }

    pub fn is_headquarters(self) -> bool {
        HEADQUARTERS.contains(&self)
    }

    pub fn is_camp(self) -> bool {
        CAMPS.contains(&self)
    }

    /// Classifies a valid cell. Invalid cells yield `None`.
    pub fn kind(self) -> Option<CellKind> {
        if !self.is_valid() {
            None
        } else if self.is_headquarters() {
            Some(CellKind::Headquarters)
        } else if self.is_camp() {
            Some(CellKind::Camp)
        } else {
            Some(CellKind::Open)
        }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        Self::checked(i32::from(self.x) + dx, i32::from(self.y) + dy)
    }

    /// Iterates every valid cell in row-major order.
    pub fn all_valid() -> impl Iterator<Item = Cell> {
        (0..BOARD_SIZE)
            .flat_map(|y| (0..BOARD_SIZE).map(move |x| Cell::new(x, y)))
            .filter(|cell| cell.is_valid())
    }

    pub(crate) const fn index(self) -> usize {
        self.y as usize * BOARD_SIZE as usize + self.x as usize
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}
