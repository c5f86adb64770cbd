//! Per-cell type distributions, the remaining-count budget and the IPF normalizer.

use crate::model::piece::{PieceCounts, PieceKind};
use serde::{Deserialize, Serialize};

/// Default number of row/column passes performed by [`normalize_and_constrain`].
pub const DEFAULT_IPF_ITERATIONS: usize = 5;

/// Non-negative weights over the twelve piece kinds for one hidden cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Distribution {
    weights: [f32; PieceKind::COUNT],
}

impl Distribution {
    pub const fn zeroed() -> Self {
        Self {
            weights: [0.0; PieceKind::COUNT],
        }
    }

    /// Weight 1 on each kind in `kinds`, 0 elsewhere. Not normalized.
    pub fn indicator(kinds: impl IntoIterator<Item = PieceKind>) -> Self {
        let mut dist = Self::zeroed();
        for kind in kinds {
            dist.weights[kind.index()] = 1.0;
        }
        dist
    }

    /// All mass on a single kind.
    pub fn certain(kind: PieceKind) -> Self {
        Self::indicator([kind])
    }

    pub fn get(&self, kind: PieceKind) -> f32 {
        self.weights[kind.index()]
    }

    pub fn set(&mut self, kind: PieceKind, weight: f32) {
        self.weights[kind.index()] = weight.max(0.0);
    }

    pub fn scale(&mut self, kind: PieceKind, factor: f32) {
        let slot = &mut self.weights[kind.index()];
        *slot = (*slot * factor).max(0.0);
    }

    pub fn total(&self) -> f32 {
        self.weights.iter().sum()
    }

    /// True when every weight is zero.
    pub fn is_degenerate(&self) -> bool {
        self.total() <= 0.0
    }

    /// Rescales to sum to one. An all-zero row is left untouched.
    pub fn normalize(&mut self) {
        let total = self.total();
        if total <= 0.0 {
            return;
        }
        for weight in &mut self.weights {
            *weight /= total;
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    pub fn clear(&mut self) {
        self.weights = [0.0; PieceKind::COUNT];
    }

    /// Zeroes every kind for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(PieceKind) -> bool) {
        for kind in PieceKind::ALL {
            if !keep(kind) {
                self.weights[kind.index()] = 0.0;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PieceKind, f32)> + '_ {
        PieceKind::ALL
            .iter()
            .map(move |&kind| (kind, self.weights[kind.index()]))
    }

    /// Kind with the largest weight, ties broken towards the lower index.
    pub fn most_likely(&self) -> Option<PieceKind> {
        let mut best: Option<(PieceKind, f32)> = None;
        for (kind, weight) in self.iter() {
            if weight <= 0.0 {
                continue;
            }
            if best.is_none_or(|(_, current)| weight > current) {
                best = Some((kind, weight));
            }
        }
        best.map(|(kind, _)| kind)
    }

    /// Shannon entropy in nats of the normalized row.
    pub fn entropy(&self) -> f32 {
        let normalized = self.normalized();
        normalized
            .weights
            .iter()
            .filter(|&&p| p > 0.0)
            .map(|&p| -p * p.ln())
            .sum()
    }
}

/// Real-valued quota of undiscovered pieces per kind, floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    quota: [f32; PieceKind::COUNT],
}

impl Budget {
    pub fn from_counts(counts: &PieceCounts) -> Self {
        let mut quota = [0.0; PieceKind::COUNT];
        for (kind, count) in counts.iter() {
            quota[kind.index()] = f32::from(count);
        }
        Self { quota }
    }

    pub fn get(&self, kind: PieceKind) -> f32 {
        self.quota[kind.index()]
    }

    /// Subtracts an expected count, clamping at zero.
    pub fn soft_decrement(&mut self, kind: PieceKind, amount: f32) {
        let slot = &mut self.quota[kind.index()];
        *slot = (*slot - amount.max(0.0)).max(0.0);
    }

    /// Subtracts the normalized mass of `dist` from every kind.
    pub fn consume(&mut self, dist: &Distribution) {
        let normalized = dist.normalized();
        for (kind, probability) in normalized.iter() {
            if probability > 0.0 {
                self.soft_decrement(kind, probability);
            }
        }
    }

    pub fn total(&self) -> f32 {
        self.quota.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PieceKind, f32)> + '_ {
        PieceKind::ALL
            .iter()
            .map(move |&kind| (kind, self.quota[kind.index()]))
    }
}

/// Iterative proportional fitting over a set of rows.
///
/// Each pass row-normalizes every row, then rescales every supported column
/// so its mass matches the budget (`budget / column_sum`, skipped when the
/// column is empty). A final row pass follows the loop. The result
/// approximates both marginals; it does not guarantee integer feasibility.
pub fn normalize_and_constrain(
    rows: &mut [&mut Distribution],
    budget: &Budget,
    support: &[PieceKind],
    iterations: usize,
) {
    for _ in 0..iterations {
        for row in rows.iter_mut() {
            row.normalize();
        }

        for &kind in support {
            let column: f32 = rows.iter().map(|row| row.get(kind)).sum();
            if column <= 0.0 {
                continue;
            }
            let factor = budget.get(kind) / column;
            for row in rows.iter_mut() {
                row.scale(kind, factor);
            }
        }
    }

    for row in rows.iter_mut() {
        row.normalize();
    }
}
