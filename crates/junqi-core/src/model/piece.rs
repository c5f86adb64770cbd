use super::faction::Faction;
use core::cmp::Ordering;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PieceKind {
    Flag = 0,
    Mine = 1,
    Bomb = 2,
    Engineer = 3,
    PlatoonLeader = 4,
    CompanyLeader = 5,
    BattalionLeader = 6,
    RegimentLeader = 7,
    Brigadier = 8,
    DivisionCommander = 9,
    CorpsCommander = 10,
    General = 11,
}

impl PieceKind {
    pub const COUNT: usize = 12;

    pub const ALL: [PieceKind; PieceKind::COUNT] = [
        PieceKind::Flag,
        PieceKind::Mine,
        PieceKind::Bomb,
        PieceKind::Engineer,
        PieceKind::PlatoonLeader,
        PieceKind::CompanyLeader,
        PieceKind::BattalionLeader,
        PieceKind::RegimentLeader,
        PieceKind::Brigadier,
        PieceKind::DivisionCommander,
        PieceKind::CorpsCommander,
        PieceKind::General,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Combat rank. Flag (-1) loses to everything, Bomb (1) trades with
    /// everything and Mine (41) only falls to an Engineer.
    pub const fn rank(self) -> i8 {
        match self {
            PieceKind::Flag => -1,
            PieceKind::Bomb => 1,
            PieceKind::Engineer => 32,
            PieceKind::PlatoonLeader => 33,
            PieceKind::CompanyLeader => 34,
            PieceKind::BattalionLeader => 35,
            PieceKind::RegimentLeader => 36,
            PieceKind::Brigadier => 37,
            PieceKind::DivisionCommander => 38,
            PieceKind::CorpsCommander => 39,
            PieceKind::General => 40,
            PieceKind::Mine => 41,
        }
    }

    /// Number of pieces of this kind in one faction's set.
    pub const fn max_count(self) -> u8 {
        match self {
            PieceKind::Flag | PieceKind::CorpsCommander | PieceKind::General => 1,
            PieceKind::Bomb
            | PieceKind::BattalionLeader
            | PieceKind::RegimentLeader
            | PieceKind::Brigadier
            | PieceKind::DivisionCommander => 2,
            PieceKind::Mine
            | PieceKind::Engineer
            | PieceKind::PlatoonLeader
            | PieceKind::CompanyLeader => 3,
        }
    }

    pub const fn is_movable(self) -> bool {
        !matches!(self, PieceKind::Flag | PieceKind::Mine)
    }

    /// True for the ranked officers, Engineer through General.
    pub const fn is_officer(self) -> bool {
        !matches!(self, PieceKind::Flag | PieceKind::Mine | PieceKind::Bomb)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PieceKind::Flag => "flag",
            PieceKind::Mine => "mine",
            PieceKind::Bomb => "bomb",
            PieceKind::Engineer => "engineer",
            PieceKind::PlatoonLeader => "platoon_leader",
            PieceKind::CompanyLeader => "company_leader",
            PieceKind::BattalionLeader => "battalion_leader",
            PieceKind::RegimentLeader => "regiment_leader",
            PieceKind::Brigadier => "brigadier",
            PieceKind::DivisionCommander => "division_commander",
            PieceKind::CorpsCommander => "corps_commander",
            PieceKind::General => "general",
        }
    }

    /// Two-letter board glyph.
    pub const fn glyph(self) -> &'static str {
        match self {
            PieceKind::Flag => "FL",
            PieceKind::Mine => "MI",
            PieceKind::Bomb => "BO",
            PieceKind::Engineer => "EN",
            PieceKind::PlatoonLeader => "PL",
            PieceKind::CompanyLeader => "CO",
            PieceKind::BattalionLeader => "BA",
            PieceKind::RegimentLeader => "RE",
            PieceKind::Brigadier => "BR",
            PieceKind::DivisionCommander => "DI",
            PieceKind::CorpsCommander => "CC",
            PieceKind::General => "GE",
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PieceKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        PieceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown piece kind '{value}'"))
    }
}

/// Per-kind piece counts, indexed by [`PieceKind::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceCounts([u8; PieceKind::COUNT]);

impl PieceCounts {
    pub const fn new(counts: [u8; PieceKind::COUNT]) -> Self {
        Self(counts)
    }

    pub const fn empty() -> Self {
        Self([0; PieceKind::COUNT])
    }

    /// The full 25-piece set of one faction.
    pub const fn standard() -> Self {
        let mut counts = [0; PieceKind::COUNT];
        let mut index = 0;
        while index < PieceKind::COUNT {
            counts[index] = PieceKind::ALL[index].max_count();
            index += 1;
        }
        Self(counts)
    }

    pub const fn get(&self, kind: PieceKind) -> u8 {
        self.0[kind.index()]
    }

    pub fn set(&mut self, kind: PieceKind, count: u8) {
        self.0[kind.index()] = count;
    }

    pub fn with(mut self, kind: PieceKind, count: u8) -> Self {
        self.set(kind, count);
        self
    }

    pub fn total(&self) -> u16 {
        self.0.iter().map(|&count| count as u16).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PieceKind, u8)> + '_ {
        PieceKind::ALL
            .iter()
            .map(move |&kind| (kind, self.0[kind.index()]))
    }
}

impl Default for PieceCounts {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub owner: Faction,
    pub alive: bool,
    pub revealed: bool,
}

impl Piece {
    pub const fn new(kind: PieceKind, owner: Faction) -> Self {
        Self {
            kind,
            owner,
            alive: true,
            revealed: false,
        }
    }

    pub const fn rank(&self) -> i8 {
        self.kind.rank()
    }

    pub const fn is_movable(&self) -> bool {
        self.kind.is_movable()
    }

    pub fn reveal(&mut self) {
        self.revealed = true;
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Applies the liveness outcome of an engagement in which this piece took part.
    pub fn apply(&mut self, survives: bool) {
        if !survives {
            self.kill();
        }
    }
}

/// Who walks away from a single attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Engagement {
    pub attacker_survives: bool,
    pub defender_survives: bool,
}

impl Engagement {
    pub const ATTACKER_WINS: Engagement = Engagement {
        attacker_survives: true,
        defender_survives: false,
    };
    pub const DEFENDER_WINS: Engagement = Engagement {
        attacker_survives: false,
        defender_survives: true,
    };
    pub const MUTUAL: Engagement = Engagement {
        attacker_survives: false,
        defender_survives: false,
    };
}

/// Resolves an attack. Returns `None` if either piece is already dead.
pub fn resolve_combat(attacker: &Piece, defender: &Piece) -> Option<Engagement> {
    if !attacker.alive || !defender.alive {
        return None;
    }

    let engagement = match (attacker.kind, defender.kind) {
        (PieceKind::Bomb, _) | (_, PieceKind::Bomb) => Engagement::MUTUAL,
        (PieceKind::Engineer, PieceKind::Mine) => Engagement::ATTACKER_WINS,
        (_, PieceKind::Mine) => Engagement::DEFENDER_WINS,
        (a, d) => match a.rank().cmp(&d.rank()) {
            Ordering::Greater => Engagement::ATTACKER_WINS,
            Ordering::Less => Engagement::DEFENDER_WINS,
            Ordering::Equal => Engagement::MUTUAL,
        },
    };
    Some(engagement)
}
