use super::distribution::{Budget, DEFAULT_IPF_ITERATIONS, Distribution, normalize_and_constrain};
use crate::board::{Board, LinkType, MoveOutcome, routes};
use crate::model::cell::Cell;
use crate::model::faction::Faction;
use crate::model::piece::{PieceCounts, PieceKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use tracing::{Level, event};

/// Which row is cleared when a Flag is first seen revealed on a headquarters cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HqRevealTarget {
    /// Zero the row at the target of the move that triggered the check.
    #[default]
    MoveTarget,
    /// Zero the row of the headquarters cell that holds the revealed Flag.
    Headquarters,
}

/// Tunable behaviour of the belief engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeliefConfig {
    /// Row/column passes performed by the IPF normalizer.
    pub ipf_iterations: usize,
    pub hq_reveal_target: HqRevealTarget,
    /// Apply the expected-count budget decrement when a ranked officer attack
    /// resolves, as the Bomb and Engineer branches always do.
    pub soft_decrement_ranked: bool,
}

impl Default for BeliefConfig {
    fn default() -> Self {
        Self {
            ipf_iterations: DEFAULT_IPF_ITERATIONS,
            hq_reveal_target: HqRevealTarget::MoveTarget,
            soft_decrement_ranked: true,
        }
    }
}

impl BeliefConfig {
    pub fn from_env() -> Self {
        let base = Self::default();
        let iterations = env::var("JUNQI_BELIEF_IPF_ITERS")
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(base.ipf_iterations)
            .clamp(1, 64);
        let hq_reveal_target = match env::var("JUNQI_BELIEF_HQ_REVEAL") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "hq" | "headquarters" => HqRevealTarget::Headquarters,
                _ => HqRevealTarget::MoveTarget,
            },
            Err(_) => base.hq_reveal_target,
        };
        let soft_decrement_ranked =
            parse_env_flag("JUNQI_BELIEF_RANKED_DECREMENT", base.soft_decrement_ranked);

        Self {
            ipf_iterations: iterations,
            hq_reveal_target,
            soft_decrement_ranked,
        }
    }
}

fn parse_env_flag(key: &str, fallback: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Some(true),
            "0" | "false" | "off" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(fallback)
}

/// Rule that fired for a single observed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateBranch {
    HqFlagReveal,
    UntrackedEngineer,
    UntrackedMove,
    BombAttack,
    EngineerAttack,
    RankedAttack,
    Passive,
}

impl UpdateBranch {
    pub const fn as_str(self) -> &'static str {
        match self {
            UpdateBranch::HqFlagReveal => "hq_flag_reveal",
            UpdateBranch::UntrackedEngineer => "untracked_engineer",
            UpdateBranch::UntrackedMove => "untracked_move",
            UpdateBranch::BombAttack => "bomb_attack",
            UpdateBranch::EngineerAttack => "engineer_attack",
            UpdateBranch::RankedAttack => "ranked_attack",
            UpdateBranch::Passive => "passive",
        }
    }

    const fn resolves_target(self) -> bool {
        matches!(
            self,
            UpdateBranch::BombAttack | UpdateBranch::EngineerAttack | UpdateBranch::RankedAttack
        )
    }
}

/// Kinds a freshly deployed piece may be at `cell`, judged by its owner's
/// depth from the home edge.
pub fn zone_allows(owner: Faction, cell: Cell, kind: PieceKind) -> bool {
    if cell.is_headquarters() {
        return kind == PieceKind::Flag;
    }
    match owner.relative_depth(cell) {
        0 | 1 => kind == PieceKind::Mine,
        5 => kind != PieceKind::Bomb,
        _ => true,
    }
}

/// Per-cell identity beliefs for every piece the observer cannot see.
///
/// Rows follow the pieces they describe: when a hidden piece moves its row
/// moves with it. A row whose cell no longer holds a hidden piece is retired.
/// Retired rows stay readable but take no part in normalization or sampling.
#[derive(Debug, Clone)]
pub struct BeliefEngine {
    observer: Faction,
    positions: Vec<Cell>,
    support: Vec<PieceKind>,
    max_counts: PieceCounts,
    budget: Budget,
    beliefs: BTreeMap<Cell, Distribution>,
    retired: BTreeSet<Cell>,
    /// Rows pinned to Engineer whose piece is already charged to the budget.
    identified: BTreeSet<Cell>,
    hq_seen: BTreeMap<Faction, BTreeSet<Cell>>,
    config: BeliefConfig,
}

impl BeliefEngine {
    pub fn new(
        board: &Board,
        positions: impl IntoIterator<Item = Cell>,
        kinds: &[PieceKind],
        max_counts: PieceCounts,
        observer: Faction,
    ) -> Self {
        Self::with_config(
            board,
            positions,
            kinds,
            max_counts,
            observer,
            BeliefConfig::from_env(),
        )
    }

    pub fn with_config(
        board: &Board,
        positions: impl IntoIterator<Item = Cell>,
        kinds: &[PieceKind],
        max_counts: PieceCounts,
        observer: Faction,
        config: BeliefConfig,
    ) -> Self {
        let mut support: Vec<PieceKind> = kinds.to_vec();
        support.sort();
        support.dedup();

        let mut engine = Self {
            observer,
            positions: positions.into_iter().collect(),
            support,
            max_counts,
            budget: Budget::from_counts(&max_counts),
            beliefs: BTreeMap::new(),
            retired: BTreeSet::new(),
            identified: BTreeSet::new(),
            hq_seen: BTreeMap::new(),
            config,
        };
        engine.initialize(board);
        engine
    }

    /// Engine over every hidden cell on `board` with the full piece set.
    pub fn for_observer(board: &Board, observer: Faction, config: BeliefConfig) -> Self {
        Self::with_config(
            board,
            board.hidden_positions(observer),
            &PieceKind::ALL,
            PieceCounts::standard(),
            observer,
            config,
        )
    }

    pub fn observer(&self) -> Faction {
        self.observer
    }

    pub fn config(&self) -> &BeliefConfig {
        &self.config
    }

    pub fn support(&self) -> &[PieceKind] {
        &self.support
    }

    pub fn max_counts(&self) -> &PieceCounts {
        &self.max_counts
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn belief(&self, cell: Cell) -> Option<&Distribution> {
        self.beliefs.get(&cell)
    }

    /// Every row, active or retired, in cell order.
    pub fn beliefs(&self) -> impl Iterator<Item = (Cell, &Distribution)> + '_ {
        self.beliefs.iter().map(|(cell, dist)| (*cell, dist))
    }

    pub fn active_rows(&self) -> impl Iterator<Item = (Cell, &Distribution)> + '_ {
        self.beliefs()
            .filter(move |(cell, _)| !self.retired.contains(cell))
    }

    pub fn active_cells(&self) -> Vec<Cell> {
        self.active_rows().map(|(cell, _)| cell).collect()
    }

    pub fn is_active(&self, cell: Cell) -> bool {
        self.beliefs.contains_key(&cell) && !self.retired.contains(&cell)
    }

    /// True when the row at `cell` was pinned by an engineer-only move. Such
    /// rows sit outside the column constraints of the normalizer.
    pub fn is_identified(&self, cell: Cell) -> bool {
        self.identified.contains(&cell)
    }

    pub fn probability(&self, cell: Cell, kind: PieceKind) -> f32 {
        self.belief(cell).map(|dist| dist.get(kind)).unwrap_or(0.0)
    }

    /// Rebuilds every row from the zone prior and runs the normalizer.
    pub fn initialize(&mut self, board: &Board) {
        self.beliefs.clear();
        self.retired.clear();
        self.identified.clear();

        for &cell in &self.positions {
            let Some(piece) = board.get_piece(cell) else {
                continue;
            };
            if piece.owner == self.observer || piece.revealed {
                continue;
            }
            let legal = self
                .support
                .iter()
                .copied()
                .filter(|&kind| zone_allows(piece.owner, cell, kind));
            self.beliefs.insert(cell, Distribution::indicator(legal));
        }

        self.normalize_and_constrain();
        event!(
            target: "junqi_core::belief",
            Level::DEBUG,
            branch = "initialize",
            observer = %self.observer,
            active_rows = self.beliefs.len(),
        );
    }

    /// Clears the headquarters bookkeeping, restores the budget and
    /// re-initializes from `board`.
    pub fn reset(&mut self, board: &Board) {
        self.hq_seen.clear();
        self.budget = Budget::from_counts(&self.max_counts);
        self.initialize(board);
    }

    /// Runs IPF over the active rows. Identified rows are only row-normalized.
    pub fn normalize_and_constrain(&mut self) {
        let retired = &self.retired;
        let identified = &self.identified;
        let mut rows = Vec::new();
        for (cell, dist) in self.beliefs.iter_mut() {
            if retired.contains(cell) {
                continue;
            }
            if identified.contains(cell) {
                dist.normalize();
            } else {
                rows.push(dist);
            }
        }
        normalize_and_constrain(
            &mut rows,
            &self.budget,
            &self.support,
            self.config.ipf_iterations,
        );
    }

    /// Narrows beliefs after `board` has applied the move described by `outcome`.
    pub fn update(&mut self, board: &Board, outcome: &MoveOutcome) -> UpdateBranch {
        let from = outcome.from;
        let to = outcome.to;

        // The mover's row travels with it; a dead mover's row is settled below.
        let mut fallen = None;
        let carried = self.take_active(from);
        let tracked_mover = carried.is_some();
        if let Some((row, identified)) = carried {
            if outcome.mover.alive {
                if let Some((previous, was_identified)) = self.take_active(to) {
                    self.discharge(&previous, was_identified);
                }
                self.retired.remove(&to);
                self.beliefs.insert(to, row);
                if identified {
                    self.identified.insert(to);
                }
            } else {
                fallen = Some((row, identified));
            }
        }

        let branch = if let Some(hq) = self.first_revealed_flag(board) {
            self.apply_hq_reveal(hq, to);
            UpdateBranch::HqFlagReveal
        } else if tracked_mover {
            if requires_engineer(board, from, to) {
                match fallen.as_mut() {
                    // Charged once, when the fallen row is discharged below.
                    Some((row, _)) => *row = Distribution::certain(PieceKind::Engineer),
                    None => self.identify_engineer(to),
                }
                UpdateBranch::UntrackedEngineer
            } else {
                let row = match fallen.as_mut() {
                    Some((row, _)) => Some(row),
                    None => self.beliefs.get_mut(&to),
                };
                if let Some(row) = row {
                    row.retain(PieceKind::is_movable);
                }
                UpdateBranch::UntrackedMove
            }
        } else if outcome.mover.owner == self.observer && self.is_active(to) {
            match outcome.defender {
                Some(_) => self.apply_observed_attack(outcome),
                None => UpdateBranch::Passive,
            }
        } else {
            UpdateBranch::Passive
        };

        if let Some((row, identified)) = fallen {
            self.discharge(&row, identified);
        }
        let skip = branch.resolves_target().then_some(to);
        let settled = self.settle(board, skip);

        if branch != UpdateBranch::Passive || settled > 0 || tracked_mover {
            self.normalize_and_constrain();
        }

        if tracing::enabled!(target: "junqi_core::belief", Level::DEBUG) {
            event!(
                target: "junqi_core::belief",
                Level::DEBUG,
                branch = branch.as_str(),
                observer = %self.observer,
                from = %from,
                to = %to,
                mover = %outcome.mover.kind,
                settled,
                active_rows = self.active_rows().count(),
                budget_total = f64::from(self.budget.total()),
            );
        }

        branch
    }

    /// Removes an active row, reporting whether it was identified.
    fn take_active(&mut self, cell: Cell) -> Option<(Distribution, bool)> {
        if self.retired.contains(&cell) {
            return None;
        }
        let row = self.beliefs.remove(&cell)?;
        Some((row, self.identified.remove(&cell)))
    }

    /// Charges a departing row to the budget unless it was charged when identified.
    fn discharge(&mut self, row: &Distribution, identified: bool) {
        if !identified {
            self.budget.consume(row);
        }
    }

    fn identify_engineer(&mut self, cell: Cell) {
        if let Some(row) = self.beliefs.get_mut(&cell) {
            *row = Distribution::certain(PieceKind::Engineer);
        }
        if self.identified.insert(cell) {
            self.budget.soft_decrement(PieceKind::Engineer, 1.0);
        }
    }

    fn first_revealed_flag(&mut self, board: &Board) -> Option<Cell> {
        let alliances = *board.alliance_map();
        for faction in Faction::ALL {
            if faction == self.observer || alliances.are_allied(faction, self.observer) {
                continue;
            }
            for hq in faction.headquarters() {
                let Some(piece) = board.get_piece(hq) else {
                    continue;
                };
                if piece.kind != PieceKind::Flag || !piece.revealed {
                    continue;
                }
                if self.hq_seen.entry(faction).or_default().insert(hq) {
                    return Some(hq);
                }
            }
        }
        None
    }

    fn apply_hq_reveal(&mut self, hq: Cell, target: Cell) {
        self.budget.soft_decrement(PieceKind::General, 1.0);
        let cleared = match self.config.hq_reveal_target {
            HqRevealTarget::MoveTarget => target,
            HqRevealTarget::Headquarters => hq,
        };
        if let Some(row) = self.beliefs.get_mut(&cleared) {
            row.clear();
        }
    }

    fn apply_observed_attack(&mut self, outcome: &MoveOutcome) -> UpdateBranch {
        let Some(engagement) = outcome.engagement() else {
            return UpdateBranch::Passive;
        };
        let Some(prior) = self.beliefs.get(&outcome.to).copied() else {
            return UpdateBranch::Passive;
        };
        let attacker = outcome.mover.kind;
        // A surviving defender keeps its row, so nothing leaves the budget yet.
        let charge_prior =
            !engagement.defender_survives && !self.identified.contains(&outcome.to);

        let branch = match attacker {
            PieceKind::Bomb => {
                if charge_prior {
                    self.budget.consume(&prior);
                }
                for cell in [outcome.from, outcome.to] {
                    if let Some(row) = self.beliefs.get_mut(&cell) {
                        row.clear();
                    }
                }
                return UpdateBranch::BombAttack;
            }
            PieceKind::Engineer => {
                if charge_prior {
                    self.budget.consume(&prior);
                }
                UpdateBranch::EngineerAttack
            }
            kind if kind.is_officer() => {
                if self.config.soft_decrement_ranked && charge_prior {
                    self.budget.consume(&prior);
                }
                UpdateBranch::RankedAttack
            }
            _ => return UpdateBranch::Passive,
        };

        let Some(row) = self.beliefs.get_mut(&outcome.to) else {
            return branch;
        };
        let rank = attacker.rank();
        match (
            attacker,
            engagement.attacker_survives,
            engagement.defender_survives,
        ) {
            (PieceKind::Engineer, true, _) => {
                row.retain(|kind| matches!(kind, PieceKind::Mine | PieceKind::Flag));
            }
            (PieceKind::Engineer, false, false) => {
                row.retain(|kind| matches!(kind, PieceKind::Engineer | PieceKind::Bomb));
            }
            (PieceKind::Engineer, false, true) => {
                row.retain(|kind| {
                    !matches!(
                        kind,
                        PieceKind::Mine | PieceKind::Engineer | PieceKind::Bomb | PieceKind::Flag
                    )
                });
            }
            (_, true, _) => row.retain(|kind| kind == PieceKind::Bomb || kind.rank() < rank),
            (_, false, false) => row.retain(|kind| kind == PieceKind::Bomb || kind.rank() == rank),
            (_, false, true) => row.retain(|kind| kind.rank() > rank),
        }
        branch
    }

    /// Retires active rows whose cell no longer holds a hidden piece. Rows are
    /// discharged into the budget unless their cell is `skip`.
    fn settle(&mut self, board: &Board, skip: Option<Cell>) -> usize {
        let stale: Vec<Cell> = self
            .active_rows()
            .filter(|(cell, _)| !self.holds_hidden_piece(board, *cell))
            .map(|(cell, _)| cell)
            .collect();

        for &cell in &stale {
            let identified = self.identified.remove(&cell);
            if Some(cell) != skip
                && let Some(row) = self.beliefs.get(&cell).copied()
            {
                self.discharge(&row, identified);
            }
            self.retired.insert(cell);
        }
        stale.len()
    }

    fn holds_hidden_piece(&self, board: &Board, cell: Cell) -> bool {
        board
            .get_piece(cell)
            .is_some_and(|piece| piece.owner != self.observer && !piece.revealed)
    }
}

/// Returns true when only an Engineer could have made the move: no direct
/// link and no straight rail run joins the two cells.
pub fn requires_engineer(board: &Board, from: Cell, to: Cell) -> bool {
    !routes::is_connected_by(from, to, LinkType::Road)
        && !routes::is_connected_by(from, to, LinkType::Rail)
        && !board.clear_straight_rail_path(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::faction::AllianceMap;
    use crate::model::piece::Piece;

    const EPS: f32 = 1e-4;

    fn cell(x: u8, y: u8) -> Cell {
        Cell::new(x, y)
    }

    fn two_player_board(pieces: &[(Cell, PieceKind, Faction)]) -> Board {
        let mut board = Board::with_alliances(AllianceMap::two_player());
        for &(at, kind, owner) in pieces {
            assert!(board.place_piece(at, Piece::new(kind, owner)));
        }
        board
    }

    fn full_engine(board: &Board) -> BeliefEngine {
        BeliefEngine::for_observer(board, Faction::Red, BeliefConfig::default())
    }

    #[test]
    fn zone_prior_restricts_back_rows_and_front_row() {
        assert!(zone_allows(Faction::Green, cell(7, 0), PieceKind::Flag));
        assert!(!zone_allows(Faction::Green, cell(7, 0), PieceKind::Mine));
        assert!(zone_allows(Faction::Green, cell(8, 1), PieceKind::Mine));
        assert!(!zone_allows(Faction::Green, cell(8, 1), PieceKind::General));
        assert!(!zone_allows(Faction::Green, cell(8, 5), PieceKind::Bomb));
        assert!(zone_allows(Faction::Green, cell(8, 5), PieceKind::General));
        assert!(zone_allows(Faction::Green, cell(8, 3), PieceKind::Bomb));
    }

    #[test]
    fn observer_and_revealed_pieces_get_no_row() {
        let mut board = two_player_board(&[
            (cell(8, 12), PieceKind::General, Faction::Red),
            (cell(8, 4), PieceKind::General, Faction::Green),
            (cell(7, 4), PieceKind::Bomb, Faction::Green),
        ]);
        board.reveal(cell(7, 4));
        let positions = [cell(8, 12), cell(8, 4), cell(7, 4)];
        let engine = BeliefEngine::new(
            &board,
            positions,
            &PieceKind::ALL,
            PieceCounts::standard(),
            Faction::Red,
        );
        assert!(engine.belief(cell(8, 12)).is_none());
        assert!(engine.belief(cell(7, 4)).is_none());
        assert!(engine.is_active(cell(8, 4)));
    }

    #[test]
    fn untracked_move_drops_flag_and_mine() {
        let mut board = two_player_board(&[
            (cell(8, 12), PieceKind::General, Faction::Red),
            (cell(8, 3), PieceKind::Brigadier, Faction::Green),
        ]);
        let mut engine = full_engine(&board);
        let outcome = board.move_piece(cell(8, 3), cell(8, 4)).unwrap();
        let branch = engine.update(&board, &outcome);

        assert_eq!(branch, UpdateBranch::UntrackedMove);
        assert!(engine.belief(cell(8, 3)).is_none());
        let row = engine.belief(cell(8, 4)).unwrap();
        assert_eq!(row.get(PieceKind::Flag), 0.0);
        assert_eq!(row.get(PieceKind::Mine), 0.0);
        assert!((row.total() - 1.0).abs() < EPS);
    }

    #[test]
    fn ranked_attack_without_soft_decrement_keeps_budget() {
        let mut board = two_player_board(&[
            (cell(8, 6), PieceKind::General, Faction::Red),
            (cell(8, 5), PieceKind::Engineer, Faction::Green),
        ]);
        let config = BeliefConfig {
            soft_decrement_ranked: false,
            ..BeliefConfig::default()
        };
        let mut engine = BeliefEngine::for_observer(&board, Faction::Red, config);
        let before = engine.budget().total();
        let outcome = board.move_piece(cell(8, 6), cell(8, 5)).unwrap();
        assert_eq!(engine.update(&board, &outcome), UpdateBranch::RankedAttack);
        assert!((engine.budget().total() - before).abs() < EPS);
        assert!(!engine.is_active(cell(8, 5)));
    }

    #[test]
    fn ranked_attack_with_soft_decrement_consumes_prior() {
        let mut board = two_player_board(&[
            (cell(8, 6), PieceKind::General, Faction::Red),
            (cell(8, 5), PieceKind::Engineer, Faction::Green),
        ]);
        let mut engine = full_engine(&board);
        let before = engine.budget().total();
        let outcome = board.move_piece(cell(8, 6), cell(8, 5)).unwrap();
        engine.update(&board, &outcome);
        assert!((before - engine.budget().total() - 1.0).abs() < EPS);
    }

    #[test]
    fn losing_ranked_attack_excludes_weaker_kinds() {
        let mut board = two_player_board(&[
            (cell(8, 6), PieceKind::Brigadier, Faction::Red),
            (cell(8, 4), PieceKind::General, Faction::Green),
        ]);
        let mut engine = full_engine(&board);
        // The Green piece steps forward first so the Brigadier can reach it.
        let advance = board.move_piece(cell(8, 4), cell(8, 5)).unwrap();
        engine.update(&board, &advance);
        let outcome = board.move_piece(cell(8, 6), cell(8, 5)).unwrap();
        assert_eq!(engine.update(&board, &outcome), UpdateBranch::RankedAttack);

        let row = engine.belief(cell(8, 5)).unwrap();
        for kind in PieceKind::ALL {
            if kind.rank() <= PieceKind::Brigadier.rank() {
                assert_eq!(row.get(kind), 0.0, "{kind} should be excluded");
            }
        }
        assert!(row.get(PieceKind::General) > 0.0);
        assert!(engine.is_active(cell(8, 5)));
    }

    #[test]
    fn engineer_trade_leaves_engineer_or_bomb() {
        let mut board = two_player_board(&[
            (cell(8, 6), PieceKind::Engineer, Faction::Red),
            (cell(8, 3), PieceKind::Engineer, Faction::Green),
        ]);
        let mut engine = full_engine(&board);
        let advance = board.move_piece(cell(8, 3), cell(8, 4)).unwrap();
        engine.update(&board, &advance);
        let advance = board.move_piece(cell(8, 4), cell(8, 5)).unwrap();
        engine.update(&board, &advance);

        let outcome = board.move_piece(cell(8, 6), cell(8, 5)).unwrap();
        assert_eq!(
            engine.update(&board, &outcome),
            UpdateBranch::EngineerAttack
        );
        let row = engine.belief(cell(8, 5)).unwrap();
        for (kind, weight) in row.iter() {
            if !matches!(kind, PieceKind::Engineer | PieceKind::Bomb) {
                assert_eq!(weight, 0.0, "{kind} should be excluded");
            }
        }
        assert!(!engine.is_active(cell(8, 5)));
    }

    #[test]
    fn hidden_mover_killing_hidden_piece_consumes_its_row() {
        let mut board = Board::with_alliances(AllianceMap::two_player());
        board.place_piece(cell(8, 4), Piece::new(PieceKind::General, Faction::Green));
        board.place_piece(cell(8, 5), Piece::new(PieceKind::Engineer, Faction::Blue));
        let mut engine = full_engine(&board);
        let before = engine.budget().total();

        let outcome = board.move_piece(cell(8, 4), cell(8, 5)).unwrap();
        engine.update(&board, &outcome);

        assert!((before - engine.budget().total() - 1.0).abs() < EPS);
        assert!(engine.is_active(cell(8, 5)));
        assert!(engine.belief(cell(8, 4)).is_none());
    }

    #[test]
    fn observer_quiet_move_is_passive() {
        let mut board = two_player_board(&[
            (cell(8, 12), PieceKind::General, Faction::Red),
            (cell(8, 3), PieceKind::Brigadier, Faction::Green),
        ]);
        let mut engine = full_engine(&board);
        let snapshot = engine.belief(cell(8, 3)).copied();
        let outcome = board.move_piece(cell(8, 12), cell(8, 11)).unwrap();
        assert_eq!(engine.update(&board, &outcome), UpdateBranch::Passive);
        assert_eq!(engine.belief(cell(8, 3)).copied(), snapshot);
    }

    #[test]
    fn requires_engineer_detects_turning_rail_moves() {
        let board = two_player_board(&[]);
        assert!(!requires_engineer(&board, cell(6, 15), cell(1, 10)));
        assert!(requires_engineer(&board, cell(6, 12), cell(10, 15)));
        assert!(!requires_engineer(&board, cell(6, 12), cell(6, 13)));
    }

    #[test]
    fn config_defaults_preserve_move_target_reveal() {
        let config = BeliefConfig::default();
        assert_eq!(config.ipf_iterations, DEFAULT_IPF_ITERATIONS);
        assert_eq!(config.hq_reveal_target, HqRevealTarget::MoveTarget);
        assert!(config.soft_decrement_ranked);
    }

    #[test]
    fn config_reads_env_overrides() {
        unsafe {
            env::set_var("JUNQI_BELIEF_IPF_ITERS", "500");
            env::set_var("JUNQI_BELIEF_HQ_REVEAL", " Headquarters ");
            env::set_var("JUNQI_BELIEF_RANKED_DECREMENT", "off");
        }
        let config = BeliefConfig::from_env();
        unsafe {
            env::remove_var("JUNQI_BELIEF_IPF_ITERS");
            env::remove_var("JUNQI_BELIEF_HQ_REVEAL");
            env::remove_var("JUNQI_BELIEF_RANKED_DECREMENT");
        }

        assert_eq!(config.ipf_iterations, 64);
        assert_eq!(config.hq_reveal_target, HqRevealTarget::Headquarters);
        assert!(!config.soft_decrement_ranked);
    }

    #[test]
    fn trading_with_identified_engineer_charges_nothing_more() {
        let mut board = two_player_board(&[
            (cell(10, 2), PieceKind::Engineer, Faction::Red),
            (cell(6, 4), PieceKind::Engineer, Faction::Green),
        ]);
        let mut engine = full_engine(&board);
        let outcome = board.move_piece(cell(6, 4), cell(10, 1)).unwrap();
        assert_eq!(engine.update(&board, &outcome), UpdateBranch::UntrackedEngineer);
        let charged = engine.budget().total();

        // Equal Engineers trade; the identified row was already charged.
        let outcome = board.move_piece(cell(10, 2), cell(10, 1)).unwrap();
        assert_eq!(engine.update(&board, &outcome), UpdateBranch::EngineerAttack);
        assert!((engine.budget().total() - charged).abs() < EPS);
        assert!(!engine.is_active(cell(10, 1)));
        assert!(!engine.is_identified(cell(10, 1)));
    }
}
