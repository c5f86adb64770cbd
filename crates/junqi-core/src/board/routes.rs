//! Static road and rail connectivity of the board.
//!
//! The graph is built once on first use and shared for the lifetime of the
//! process. Rail track is laid first; roads then join every orthogonally
//! adjacent pair of valid cells that is not already rail-linked, plus the
//! diagonal roads radiating from each camp.

use crate::model::cell::{BOARD_SIZE, CAMPS, Cell};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Road,
    Rail,
}

/// Length of every bypass rail path.
pub const SPECIAL_PATH_LEN: usize = 10;

const fn c(x: u8, y: u8) -> Cell {
    Cell::new(x, y)
}

/// L-shaped rail shortcuts around the four inner corners.
pub const SPECIAL_PATHS: [[Cell; SPECIAL_PATH_LEN]; 4] = [
    [
        c(1, 6),
        c(2, 6),
        c(3, 6),
        c(4, 6),
        c(5, 6),
        c(6, 5),
        c(6, 4),
        c(6, 3),
        c(6, 2),
        c(6, 1),
    ],
    [
        c(1, 10),
        c(2, 10),
        c(3, 10),
        c(4, 10),
        c(5, 10),
        c(6, 11),
        c(6, 12),
        c(6, 13),
        c(6, 14),
        c(6, 15),
    ],
    [
        c(10, 1),
        c(10, 2),
        c(10, 3),
        c(10, 4),
        c(10, 5),
        c(11, 6),
        c(12, 6),
        c(13, 6),
        c(14, 6),
        c(15, 6),
    ],
    [
        c(10, 15),
        c(10, 14),
        c(10, 13),
        c(10, 12),
        c(10, 11),
        c(11, 10),
        c(12, 10),
        c(13, 10),
        c(14, 10),
        c(15, 10),
    ],
];

/// Bidirectional adjacency list keyed by cell.
#[derive(Debug)]
pub struct RouteMap {
    links: Vec<Vec<(Cell, LinkType)>>,
}

static ROUTES: Lazy<RouteMap> = Lazy::new(RouteMap::build);

/// Shared connectivity graph.
pub fn routes() -> &'static RouteMap {
    &ROUTES
}

pub fn is_connected_by(a: Cell, b: Cell, link: LinkType) -> bool {
    routes().is_connected_by(a, b, link)
}

pub fn neighbors(cell: Cell) -> &'static [(Cell, LinkType)] {
    routes().neighbors(cell)
}

pub fn special_paths() -> &'static [[Cell; SPECIAL_PATH_LEN]; 4] {
    &SPECIAL_PATHS
}

impl RouteMap {
    fn empty() -> Self {
        let cells = BOARD_SIZE as usize * BOARD_SIZE as usize;
        Self {
            links: vec![Vec::new(); cells],
        }
    }

    fn build() -> Self {
        let mut map = Self::empty();
        map.lay_rails();
        map.lay_roads();
        map
    }

    pub fn neighbors(&self, cell: Cell) -> &[(Cell, LinkType)] {
        if !cell.in_bounds() {
            return &[];
        }
        &self.links[cell.index()]
    }

    pub fn is_connected_by(&self, a: Cell, b: Cell, link: LinkType) -> bool {
        self.neighbors(a)
            .iter()
            .any(|&(other, kind)| other == b && kind == link)
    }

    pub fn is_linked(&self, a: Cell, b: Cell) -> bool {
        self.neighbors(a).iter().any(|&(other, _)| other == b)
    }

    fn connect(&mut self, a: Cell, b: Cell, link: LinkType) {
        if a == b || self.is_linked(a, b) {
            return;
        }
        self.links[a.index()].push((b, link));
        self.links[b.index()].push((a, link));
    }

    fn rail_column(&mut self, x: u8, from_y: u8, to_y: u8) {
        for y in from_y..to_y {
            self.connect(c(x, y), c(x, y + 1), LinkType::Rail);
        }
    }

    fn rail_row(&mut self, y: u8, from_x: u8, to_x: u8) {
        for x in from_x..to_x {
            self.connect(c(x, y), c(x + 1, y), LinkType::Rail);
        }
    }

    fn lay_rails(&mut self) {
        self.rail_column(6, 1, 15);
        self.rail_column(10, 1, 15);
        self.rail_row(6, 1, 15);
        self.rail_row(10, 1, 15);

        for x in [1, 5, 11, 15] {
            self.rail_column(x, 6, 10);
        }
        for y in [1, 5, 11, 15] {
            self.rail_row(y, 6, 10);
        }

        self.connect(c(5, 6), c(6, 5), LinkType::Rail);
        self.connect(c(5, 10), c(6, 11), LinkType::Rail);
        self.connect(c(10, 5), c(11, 6), LinkType::Rail);
        self.connect(c(10, 11), c(11, 10), LinkType::Rail);

        self.rail_column(8, 5, 11);
        self.rail_row(8, 5, 11);
    }

    fn lay_roads(&mut self) {
        for cell in Cell::all_valid() {
            for (dx, dy) in [(1, 0), (0, 1)] {
                if let Some(next) = cell.offset(dx, dy)
                    && next.is_valid()
                {
                    self.connect(cell, next, LinkType::Road);
                }
            }
        }

        for camp in CAMPS {
            for (dx, dy) in [(-1, -1), (-1, 1), (1, -1), (1, 1)] {
                if let Some(next) = camp.offset(dx, dy)
                    && next.is_valid()
                {
                    self.connect(camp, next, LinkType::Road);
                }
            }
        }
    }
}
