use super::cell::{BOARD_SIZE, Cell};
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Faction {
    Red = 0,
    Green = 1,
    Blue = 2,
    Yellow = 3,
}

impl Faction {
    pub const ALL: [Faction; 4] = [Faction::Red, Faction::Green, Faction::Blue, Faction::Yellow];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Faction::Red => "red",
            Faction::Green => "green",
            Faction::Blue => "blue",
            Faction::Yellow => "yellow",
        }
    }

    /// Distance of `cell` from this faction's home edge; 0 is the home-most row.
    ///
    /// Green sits on the north edge, Red on the south, Blue on the west and
    /// Yellow on the east.
    pub const fn relative_depth(self, cell: Cell) -> u8 {
        let last = BOARD_SIZE - 1;
        match self {
            Faction::Green => cell.y,
            Faction::Red => last.saturating_sub(cell.y),
            Faction::Blue => cell.x,
            Faction::Yellow => last.saturating_sub(cell.x),
        }
    }

    pub const fn headquarters(self) -> [Cell; 2] {
        match self {
            Faction::Green => [Cell::new(7, 0), Cell::new(9, 0)],
            Faction::Red => [Cell::new(7, 16), Cell::new(9, 16)],
            Faction::Blue => [Cell::new(0, 7), Cell::new(0, 9)],
            Faction::Yellow => [Cell::new(16, 7), Cell::new(16, 9)],
        }
    }

    /// Inclusive `(min, max)` corners of the faction's deployment rectangle.
    pub const fn deployment_zone(self) -> (Cell, Cell) {
        match self {
            Faction::Red => (Cell::new(6, 11), Cell::new(10, 16)),
            Faction::Green => (Cell::new(6, 0), Cell::new(10, 5)),
            Faction::Blue => (Cell::new(0, 6), Cell::new(5, 10)),
            Faction::Yellow => (Cell::new(11, 6), Cell::new(16, 10)),
        }
    }

    pub fn in_deployment_zone(self, cell: Cell) -> bool {
        let (min, max) = self.deployment_zone();
        (min.x..=max.x).contains(&cell.x) && (min.y..=max.y).contains(&cell.y)
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Faction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(Faction::Red),
            "green" => Ok(Faction::Green),
            "blue" => Ok(Faction::Blue),
            "yellow" => Ok(Faction::Yellow),
            other => Err(format!("unknown faction '{other}'")),
        }
    }
}

/// Owner to alliance-id table consulted when a move would attack another piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceMap {
    ids: [u8; 4],
}

impl AllianceMap {
    pub const fn new(ids: [u8; 4]) -> Self {
        Self { ids }
    }

    /// Red with Green against Blue with Yellow.
    pub const fn four_player() -> Self {
        Self::new([1, 1, 2, 2])
    }

    /// Every faction on its own side.
    pub const fn two_player() -> Self {
        Self::new([1, 2, 3, 4])
    }

    pub const fn alliance(&self, faction: Faction) -> u8 {
        self.ids[faction.index()]
    }

    pub fn set(&mut self, faction: Faction, alliance: u8) {
        self.ids[faction.index()] = alliance;
    }

    pub const fn are_allied(&self, a: Faction, b: Faction) -> bool {
        self.alliance(a) == self.alliance(b)
    }
}

impl Default for AllianceMap {
    fn default() -> Self {
        Self::four_player()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_depth_is_zero_on_home_edge() {
        assert_eq!(Faction::Green.relative_depth(Cell::new(8, 0)), 0);
        assert_eq!(Faction::Red.relative_depth(Cell::new(8, 16)), 0);
        assert_eq!(Faction::Red.relative_depth(Cell::new(8, 11)), 5);
        assert_eq!(Faction::Blue.relative_depth(Cell::new(1, 8)), 1);
        assert_eq!(Faction::Yellow.relative_depth(Cell::new(11, 8)), 5);
    }

    #[test]
    fn headquarters_sit_on_home_edge() {
        for faction in Faction::ALL {
            for hq in faction.headquarters() {
                assert!(hq.is_headquarters());
                assert_eq!(faction.relative_depth(hq), 0);
                assert!(faction.in_deployment_zone(hq));
            }
        }
    }

    #[test]
    fn default_alliances_pair_red_with_green() {
        let map = AllianceMap::default();
        assert!(map.are_allied(Faction::Red, Faction::Green));
        assert!(map.are_allied(Faction::Blue, Faction::Yellow));
        assert!(!map.are_allied(Faction::Red, Faction::Blue));
        assert!(!AllianceMap::two_player().are_allied(Faction::Red, Faction::Green));
    }

    #[test]
    fn parses_faction_labels() {
        assert_eq!("Yellow".parse::<Faction>(), Ok(Faction::Yellow));
        assert!("purple".parse::<Faction>().is_err());
    }
}
