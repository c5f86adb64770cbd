pub mod cell;
pub mod faction;
pub mod piece;

pub use cell::{BOARD_SIZE, Cell, CellKind};
pub use faction::{AllianceMap, Faction};
pub use piece::{Engagement, Piece, PieceCounts, PieceKind, resolve_combat};
