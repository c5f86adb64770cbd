use super::routes::{self, LinkType};
use crate::model::cell::{BOARD_SIZE, Cell};
use crate::model::faction::{AllianceMap, Faction};
use crate::model::piece::{Engagement, Piece, PieceKind, resolve_combat};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

const CELL_COUNT: usize = BOARD_SIZE as usize * BOARD_SIZE as usize;

/// The 17x17 grid of optional occupants plus the alliance table used to
/// reject friendly attacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    grid: [Option<Piece>; CELL_COUNT],
    alliances: AllianceMap,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self::with_alliances(AllianceMap::default())
    }

    pub fn with_alliances(alliances: AllianceMap) -> Self {
        Self {
            grid: [None; CELL_COUNT],
            alliances,
        }
    }

    pub fn alliance_map(&self) -> &AllianceMap {
        &self.alliances
    }

    pub fn set_alliance_map(&mut self, alliances: AllianceMap) {
        self.alliances = alliances;
    }

    pub fn is_valid_cell(&self, cell: Cell) -> bool {
        cell.is_valid()
    }

    pub fn get_piece(&self, cell: Cell) -> Option<&Piece> {
        if !cell.is_valid() {
            return None;
        }
        self.grid[cell.index()].as_ref()
    }

    fn get_piece_mut(&mut self, cell: Cell) -> Option<&mut Piece> {
        if !cell.is_valid() {
            return None;
        }
        self.grid[cell.index()].as_mut()
    }

    fn is_empty(&self, cell: Cell) -> bool {
        self.get_piece(cell).is_none()
    }

    /// Puts a piece on an empty valid cell. Returns false if the cell is
    /// invalid or already occupied.
    pub fn place_piece(&mut self, cell: Cell, piece: Piece) -> bool {
        if !cell.is_valid() || !self.is_empty(cell) {
            return false;
        }
        self.grid[cell.index()] = Some(piece);
        true
    }

    pub fn remove_piece(&mut self, cell: Cell) -> Option<Piece> {
        if !cell.is_valid() {
            return None;
        }
        self.grid[cell.index()].take()
    }

    /// Marks the occupant of `cell` as revealed. Returns false for empty cells.
    pub fn reveal(&mut self, cell: Cell) -> bool {
        match self.get_piece_mut(cell) {
            Some(piece) => {
                piece.reveal();
                true
            }
            None => false,
        }
    }

    /// Every occupied cell with its piece, in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Cell, &Piece)> + '_ {
        Cell::all_valid().filter_map(move |cell| self.get_piece(cell).map(|piece| (cell, piece)))
    }

    pub fn find(&self, owner: Faction, kind: PieceKind) -> Option<Cell> {
        self.pieces()
            .find(|(_, piece)| piece.owner == owner && piece.kind == kind)
            .map(|(cell, _)| cell)
    }

    pub fn count(&self, owner: Faction, kind: PieceKind) -> usize {
        self.pieces()
            .filter(|(_, piece)| piece.owner == owner && piece.kind == kind)
            .count()
    }

    /// True while `owner` has fewer than the maximum number of `kind` on the board.
    pub fn can_add_piece(&self, owner: Faction, kind: PieceKind) -> bool {
        self.count(owner, kind) < usize::from(kind.max_count())
    }

    /// Cells holding a piece the observer does not own and has not seen revealed.
    pub fn hidden_positions(&self, observer: Faction) -> Vec<Cell> {
        self.pieces()
            .filter(|(_, piece)| piece.owner != observer && !piece.revealed)
            .map(|(cell, _)| cell)
            .collect()
    }

    pub fn can_move(&self, from: Cell, to: Cell) -> bool {
        let Some(piece) = self.get_piece(from) else {
            return false;
        };
        if !piece.is_movable() || from == to {
            return false;
        }

        if routes::is_connected_by(from, to, LinkType::Road)
            || routes::is_connected_by(from, to, LinkType::Rail)
        {
            return true;
        }

        if piece.kind == PieceKind::Engineer && self.clear_path(from, to, LinkType::Rail) {
            return true;
        }

        self.clear_straight_rail_path(from, to)
    }

    /// Breadth-first search over links of one type. Intermediate cells must be
    /// empty; the destination may be occupied.
    pub fn clear_path(&self, from: Cell, to: Cell, link: LinkType) -> bool {
        let mut visited = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(cell) = queue.pop_front() {
            if cell == to {
                return true;
            }
            for &(next, kind) in routes::neighbors(cell) {
                if kind != link || visited.contains(&next) {
                    continue;
                }
                if next == to {
                    return true;
                }
                if self.is_empty(next) {
                    visited.insert(next);
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// A rail run without turns: either along one row or column, or along a
    /// stretch of one of the bypass paths. Intermediate cells must be empty.
    pub fn clear_straight_rail_path(&self, from: Cell, to: Cell) -> bool {
        if from == to {
            return false;
        }

        for path in routes::special_paths() {
            let start = path.iter().position(|&cell| cell == from);
            let end = path.iter().position(|&cell| cell == to);
            if let (Some(start), Some(end)) = (start, end) {
                let (lo, hi) = if start < end { (start, end) } else { (end, start) };
                if self.rail_run_is_clear(&path[lo..=hi]) {
                    return true;
                }
            }
        }

        if from.x != to.x && from.y != to.y {
            return false;
        }

        let dx = i32::from(to.x).cmp(&i32::from(from.x)) as i32;
        let dy = i32::from(to.y).cmp(&i32::from(from.y)) as i32;
        let mut run = vec![from];
        let mut current = from;
        while current != to {
            let Some(next) = current.offset(dx, dy) else {
                return false;
            };
            run.push(next);
            current = next;
        }
        self.rail_run_is_clear(&run)
    }

    fn rail_run_is_clear(&self, run: &[Cell]) -> bool {
        let linked = run
            .windows(2)
            .all(|pair| routes::is_connected_by(pair[0], pair[1], LinkType::Rail));
        let last = run.len().saturating_sub(1);
        let open = run
            .iter()
            .take(last)
            .skip(1)
            .all(|&cell| self.is_empty(cell));
        linked && open
    }

    /// Validates a move without applying it.
    pub fn check_move(&self, from: Cell, to: Cell) -> Result<(), MoveError> {
        if !from.is_valid() || !to.is_valid() {
            return Err(MoveError::InvalidCell);
        }
        let piece = self.get_piece(from).ok_or(MoveError::NoPiece)?;
        if !piece.is_movable() {
            return Err(MoveError::Immovable);
        }
        if from.is_headquarters() {
            return Err(MoveError::LeavesHeadquarters);
        }
        if !self.can_move(from, to) {
            return Err(MoveError::Unreachable);
        }

        if let Some(target) = self.get_piece(to) {
            if to.is_camp() {
                return Err(MoveError::CampProtected);
            }
            if target.owner == piece.owner {
                return Err(MoveError::OwnPiece);
            }
            if self.alliances.are_allied(piece.owner, target.owner) {
                return Err(MoveError::AlliedPiece);
            }
        }
        Ok(())
    }

    /// Moves or attacks. On error the board is left untouched.
    pub fn move_piece(&mut self, from: Cell, to: Cell) -> Result<MoveOutcome, MoveError> {
        self.check_move(from, to)?;
        let mut mover = self.remove_piece(from).ok_or(MoveError::NoPiece)?;

        let Some(mut defender) = self.grid[to.index()].take() else {
            self.grid[to.index()] = Some(mover);
            return Ok(MoveOutcome {
                from,
                to,
                mover,
                defender: None,
            });
        };

        let engagement = resolve_combat(&mover, &defender).unwrap_or(Engagement::MUTUAL);
        mover.apply(engagement.attacker_survives);
        defender.apply(engagement.defender_survives);

        self.grid[to.index()] = if mover.alive {
            Some(mover)
        } else if defender.alive {
            Some(defender)
        } else {
            None
        };

        Ok(MoveOutcome {
            from,
            to,
            mover,
            defender: Some(defender),
        })
    }

    /// Every move `owner` could make right now, ordered by source then target.
    pub fn legal_moves(&self, owner: Faction) -> Vec<(Cell, Cell)> {
        let sources: Vec<Cell> = self
            .pieces()
            .filter(|(cell, piece)| {
                piece.owner == owner && piece.is_movable() && !cell.is_headquarters()
            })
            .map(|(cell, _)| cell)
            .collect();

        let mut moves = Vec::new();
        for from in sources {
            for to in Cell::all_valid() {
                if self.check_move(from, to).is_ok() {
                    moves.push((from, to));
                }
            }
        }
        moves
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                let cell = Cell::new(x, y);
                match self.get_piece(cell) {
                    Some(piece) => {
                        let owner = piece.owner.as_str().chars().next().unwrap_or('?');
                        write!(f, "{}{} ", piece.kind.glyph(), owner)?;
                    }
                    None if cell.is_valid() => f.write_str(" .  ")?,
                    None => f.write_str("    ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Result of a successful `move_piece`. `mover` and `defender` are copies
/// taken after combat so their liveness reflects the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub from: Cell,
    pub to: Cell,
    pub mover: Piece,
    pub defender: Option<Piece>,
}

impl MoveOutcome {
    pub fn is_attack(&self) -> bool {
        self.defender.is_some()
    }

    pub fn engagement(&self) -> Option<Engagement> {
        self.defender.map(|defender| Engagement {
            attacker_survives: self.mover.alive,
            defender_survives: defender.alive,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    InvalidCell,
    NoPiece,
    Immovable,
    LeavesHeadquarters,
    Unreachable,
    CampProtected,
    OwnPiece,
    AlliedPiece,
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::InvalidCell => write!(f, "cell is outside the playable area"),
            MoveError::NoPiece => write!(f, "no piece at source"),
            MoveError::Immovable => write!(f, "piece is not movable"),
            MoveError::LeavesHeadquarters => write!(f, "pieces cannot leave headquarters"),
            MoveError::Unreachable => write!(f, "target is not reachable from source"),
            MoveError::CampProtected => write!(f, "pieces inside a camp cannot be attacked"),
            MoveError::OwnPiece => write!(f, "cannot attack own piece"),
            MoveError::AlliedPiece => write!(f, "cannot attack allied piece"),
        }
    }
}

impl std::error::Error for MoveError {}
