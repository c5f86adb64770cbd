//! Hidden-state sampling on top of a [`BeliefEngine`].

use super::distribution::Distribution;
use super::engine::BeliefEngine;
use crate::board::Board;
use crate::model::cell::Cell;
use crate::model::piece::PieceKind;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::fmt;

/// Draws complete hypotheses for every active hidden cell.
#[derive(Debug, Default)]
pub struct BeliefSampler;

impl BeliefSampler {
    /// Assigns one kind to each active cell, visiting cells in random order.
    /// Identified rows take their pinned kind without touching the quota.
    ///
    /// A working copy of the budget is taken up front; each draw spends one
    /// unit of the drawn kind's quota and kinds whose quota is spent are
    /// removed from later cells. A cell whose remaining mass is zero falls
    /// back to a uniform pick over kinds with quota left.
    pub fn sample_state<R: Rng + ?Sized>(
        engine: &BeliefEngine,
        rng: &mut R,
    ) -> Result<SampledState, SamplingError> {
        let mut quota = [0.0_f32; PieceKind::COUNT];
        for (kind, remaining) in engine.budget().iter() {
            quota[kind.index()] = remaining;
        }

        let mut rows: Vec<(Cell, Distribution)> = engine
            .active_rows()
            .map(|(cell, dist)| (cell, *dist))
            .collect();
        rows.shuffle(rng);

        let mut assignment = BTreeMap::new();
        let mut log_weight = 0.0_f32;
        let mut fallbacks = 0;

        for (cell, mut row) in rows {
            if engine.is_identified(cell)
                && let Some(kind) = row.most_likely()
            {
                assignment.insert(cell, kind);
                continue;
            }
            row.retain(|kind| quota[kind.index()] > 0.0);
            if row.is_degenerate() {
                fallbacks += 1;
                row = Distribution::indicator(
                    engine
                        .support()
                        .iter()
                        .copied()
                        .filter(|kind| quota[kind.index()] > 0.0),
                );
            }

            let (kind, probability) =
                select_weighted_kind(&row, rng).ok_or(SamplingError::QuotaExhausted { cell })?;
            quota[kind.index()] -= 1.0;
            log_weight += probability.ln();
            assignment.insert(cell, kind);
        }

        Ok(SampledState {
            assignment,
            log_weight,
            fallbacks,
        })
    }
}

impl BeliefEngine {
    /// Convenience wrapper around [`BeliefSampler::sample_state`].
    pub fn sample_state<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SampledState, SamplingError> {
        BeliefSampler::sample_state(self, rng)
    }
}

fn select_weighted_kind<R: Rng + ?Sized>(
    row: &Distribution,
    rng: &mut R,
) -> Option<(PieceKind, f32)> {
    let total = row.total();
    if total <= 0.0 {
        return None;
    }

    let mut choice = rng.gen_range(0.0..total);
    let mut last = None;
    for (kind, weight) in row.iter() {
        if weight <= 0.0 {
            continue;
        }
        last = Some((kind, weight / total));
        if choice < weight {
            return last;
        }
        choice -= weight;
    }
    // Rounding can leave a sliver past the final bucket.
    last
}

/// One complete hypothesis: a kind for every sampled cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledState {
    assignment: BTreeMap<Cell, PieceKind>,
    log_weight: f32,
    fallbacks: usize,
}

impl SampledState {
    pub fn get(&self, cell: Cell) -> Option<PieceKind> {
        self.assignment.get(&cell).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, PieceKind)> + '_ {
        self.assignment.iter().map(|(cell, kind)| (*cell, *kind))
    }

    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    /// Sum of the log-probabilities of every draw.
    pub fn log_weight(&self) -> f32 {
        self.log_weight
    }

    /// Number of cells that needed the uniform fallback.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    /// How many draws of `kind` the hypothesis contains.
    pub fn count(&self, kind: PieceKind) -> usize {
        self.assignment.values().filter(|&&k| k == kind).count()
    }

    /// Fraction of sampled cells whose kind matches the real occupant.
    /// `None` when nothing was sampled.
    pub fn accuracy(&self, board: &Board) -> Option<f32> {
        if self.assignment.is_empty() {
            return None;
        }
        let hits = self
            .assignment
            .iter()
            .filter(|(cell, kind)| {
                board
                    .get_piece(**cell)
                    .is_some_and(|piece| piece.kind == **kind)
            })
            .count();
        Some(hits as f32 / self.assignment.len() as f32)
    }
}

/// Errors that can arise while sampling a hidden state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingError {
    QuotaExhausted { cell: Cell },
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingError::QuotaExhausted { cell } => {
                write!(f, "no kind has quota left for cell {cell}")
            }
        }
    }
}

impl std::error::Error for SamplingError {}
