use super::BeliefEngine;
use crate::model::cell::Cell;
use crate::model::piece::PieceKind;

#[derive(Debug, Clone)]
pub struct BeliefMetrics {
    pub active_rows: usize,
    pub entropy_per_cell: Vec<(Cell, f32)>,
    pub mean_entropy: f32,
    /// Column sums over the rows the normalizer constrains.
    pub column_mass: [f32; PieceKind::COUNT],
    pub budget: [f32; PieceKind::COUNT],
}

impl BeliefMetrics {
    pub fn from_engine(engine: &BeliefEngine) -> Self {
        let mut entropy_per_cell = Vec::new();
        let mut column_mass = [0.0; PieceKind::COUNT];

        for (cell, dist) in engine.active_rows() {
            entropy_per_cell.push((cell, dist.entropy()));
            if engine.is_identified(cell) {
                continue;
            }
            for (kind, weight) in dist.iter() {
                column_mass[kind.index()] += weight;
            }
        }

        let mut budget = [0.0; PieceKind::COUNT];
        for (kind, remaining) in engine.budget().iter() {
            budget[kind.index()] = remaining;
        }

        let active_rows = entropy_per_cell.len();
        let mean_entropy = if active_rows == 0 {
            0.0
        } else {
            entropy_per_cell.iter().map(|(_, h)| h).sum::<f32>() / active_rows as f32
        };

        Self {
            active_rows,
            entropy_per_cell,
            mean_entropy,
            column_mass,
            budget,
        }
    }

    /// Largest amount by which a column exceeds its budget; zero when every
    /// column fits.
    pub fn max_column_excess(&self) -> f32 {
        self.column_mass
            .iter()
            .zip(self.budget.iter())
            .map(|(mass, quota)| (mass - quota).max(0.0))
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::BeliefConfig;
    use crate::board::Board;
    use crate::model::faction::{AllianceMap, Faction};
    use crate::model::piece::Piece;

    #[test]
    fn metrics_cover_active_rows() {
        let mut board = Board::with_alliances(AllianceMap::two_player());
        board.place_piece(Cell::new(7, 0), Piece::new(PieceKind::Flag, Faction::Green));
        board.place_piece(Cell::new(8, 3), Piece::new(PieceKind::Brigadier, Faction::Green));
        let engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());

        let metrics = BeliefMetrics::from_engine(&engine);
        assert_eq!(metrics.active_rows, 2);
        let hq = metrics
            .entropy_per_cell
            .iter()
            .find(|(cell, _)| *cell == Cell::new(7, 0))
            .map(|(_, h)| *h);
        assert_eq!(hq, Some(0.0));
        assert!(metrics.mean_entropy > 0.0);
        assert!((metrics.column_mass.iter().sum::<f32>() - 2.0).abs() < 1e-4);
        assert!((metrics.budget.iter().sum::<f32>() - 25.0).abs() < 1e-4);
    }

    #[test]
    fn identified_rows_stay_out_of_column_mass() {
        let mut board = Board::with_alliances(AllianceMap::two_player());
        board.place_piece(Cell::new(6, 4), Piece::new(PieceKind::Engineer, Faction::Green));
        board.place_piece(Cell::new(8, 2), Piece::new(PieceKind::Brigadier, Faction::Green));
        let mut engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());
        let outcome = board.move_piece(Cell::new(6, 4), Cell::new(10, 1)).unwrap();
        engine.update(&board, &outcome);

        let metrics = BeliefMetrics::from_engine(&engine);
        assert_eq!(metrics.active_rows, 2);
        assert!((metrics.column_mass.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert!(metrics.max_column_excess() < 1e-4);
    }
}
