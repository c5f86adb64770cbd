//! JSON view of a belief engine for debugging and overlays.

use super::BeliefEngine;
use crate::model::cell::Cell;
use crate::model::faction::Faction;
use crate::model::piece::PieceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSnapshot {
    pub cell: Cell,
    pub active: bool,
    /// Only kinds with non-zero weight are listed.
    pub probabilities: BTreeMap<PieceKind, f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeliefSnapshot {
    pub observer: Faction,
    pub budget: BTreeMap<PieceKind, f32>,
    pub rows: Vec<RowSnapshot>,
}

impl BeliefSnapshot {
    pub fn capture(engine: &BeliefEngine) -> Self {
        let budget = engine.budget().iter().collect();
        let rows = engine
            .beliefs()
            .map(|(cell, dist)| RowSnapshot {
                cell,
                active: engine.is_active(cell),
                probabilities: dist.iter().filter(|(_, weight)| *weight > 0.0).collect(),
            })
            .collect();

        Self {
            observer: engine.observer(),
            budget,
            rows,
        }
    }

    pub fn to_json(engine: &BeliefEngine) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Self::capture(engine))
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn row(&self, cell: Cell) -> Option<&RowSnapshot> {
        self.rows.iter().find(|row| row.cell == cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::BeliefConfig;
    use crate::board::Board;
    use crate::model::faction::AllianceMap;
    use crate::model::piece::Piece;

    #[test]
    fn snapshot_serializes_to_json() {
        let mut board = Board::with_alliances(AllianceMap::two_player());
        board.place_piece(Cell::new(9, 0), Piece::new(PieceKind::Flag, Faction::Green));
        let engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());

        let json = BeliefSnapshot::to_json(&engine).expect("serialize snapshot");
        assert!(json.contains("\"observer\": \"red\""));

        let restored = BeliefSnapshot::from_json(&json).expect("deserialize snapshot");
        assert_eq!(restored, BeliefSnapshot::capture(&engine));
        let row = restored.row(Cell::new(9, 0)).expect("hq row");
        assert!(row.active);
        assert_eq!(row.probabilities.get(&PieceKind::Flag), Some(&1.0));
    }
}
