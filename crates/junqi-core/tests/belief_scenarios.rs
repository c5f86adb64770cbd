use junqi_core::belief::{
    BeliefConfig, BeliefEngine, HqRevealTarget, UpdateBranch, snapshot::BeliefSnapshot,
};
use junqi_core::board::Board;
use junqi_core::model::{AllianceMap, Cell, Faction, Piece, PieceCounts, PieceKind};
use rand::SeedableRng;
use rand::rngs::SmallRng;

const EPS: f32 = 1e-4;

fn cell(x: u8, y: u8) -> Cell {
    Cell::new(x, y)
}

fn board_with(pieces: &[(Cell, PieceKind, Faction)]) -> Board {
    let mut board = Board::with_alliances(AllianceMap::two_player());
    for &(at, kind, owner) in pieces {
        assert!(board.place_piece(at, Piece::new(kind, owner)), "place {at}");
    }
    board
}

/// Fills Green's zone row by row, skipping camps, with the standard set.
fn deploy_green(board: &mut Board) {
    let mut kinds = Vec::new();
    for (kind, count) in PieceCounts::standard().iter() {
        kinds.extend(std::iter::repeat_n(kind, usize::from(count)));
    }
    let (min, max) = Faction::Green.deployment_zone();
    let cells: Vec<Cell> = (min.y..=max.y)
        .flat_map(|y| (min.x..=max.x).map(move |x| cell(x, y)))
        .filter(|c| c.is_valid() && !c.is_camp())
        .collect();
    assert_eq!(cells.len(), kinds.len());
    for (at, kind) in cells.into_iter().zip(kinds) {
        assert!(board.place_piece(at, Piece::new(kind, Faction::Green)));
    }
}

fn assert_rows_normalized(engine: &BeliefEngine) {
    for (at, row) in engine.active_rows() {
        let total = row.total();
        assert!(
            total == 0.0 || (total - 1.0).abs() < EPS,
            "row at {at} sums to {total}"
        );
    }
}

#[test]
fn two_cell_scenario_pins_flag_and_mine() {
    let board = board_with(&[
        (cell(7, 0), PieceKind::Flag, Faction::Green),
        (cell(8, 0), PieceKind::Mine, Faction::Green),
    ]);
    let counts = PieceCounts::empty()
        .with(PieceKind::Flag, 1)
        .with(PieceKind::Mine, 1);
    let engine = BeliefEngine::new(
        &board,
        [cell(7, 0), cell(8, 0)],
        &[PieceKind::Flag, PieceKind::Mine],
        counts,
        Faction::Red,
    );

    assert!((engine.probability(cell(7, 0), PieceKind::Flag) - 1.0).abs() < EPS);
    assert!((engine.probability(cell(8, 0), PieceKind::Mine) - 1.0).abs() < EPS);
    assert_eq!(engine.probability(cell(7, 0), PieceKind::Mine), 0.0);
    assert_eq!(engine.probability(cell(8, 0), PieceKind::Flag), 0.0);
}

#[test]
fn full_deployment_respects_zone_prior() {
    let mut board = Board::with_alliances(AllianceMap::two_player());
    deploy_green(&mut board);
    let engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());

    assert_eq!(engine.active_cells().len(), 25);
    assert_rows_normalized(&engine);
    for hq in Faction::Green.headquarters() {
        let row = engine.belief(hq).expect("hq row");
        for (kind, weight) in row.iter() {
            if kind != PieceKind::Flag {
                assert_eq!(weight, 0.0, "{kind} at headquarters");
            }
        }
    }
    for (at, row) in engine.beliefs() {
        if Faction::Green.relative_depth(at) == 5 {
            assert_eq!(row.get(PieceKind::Bomb), 0.0);
        }
    }
}

#[test]
fn turning_rail_move_collapses_to_engineer() {
    let mut board = board_with(&[
        (cell(8, 12), PieceKind::General, Faction::Red),
        (cell(6, 4), PieceKind::Engineer, Faction::Green),
        (cell(8, 2), PieceKind::Brigadier, Faction::Green),
    ]);
    let mut engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());

    let outcome = board
        .move_piece(cell(6, 4), cell(10, 1))
        .expect("engineer can turn on rail");
    let branch = engine.update(&board, &outcome);

    assert_eq!(branch, UpdateBranch::UntrackedEngineer);
    assert!(engine.belief(cell(6, 4)).is_none());
    assert!((engine.probability(cell(10, 1), PieceKind::Engineer) - 1.0).abs() < EPS);
    assert!((engine.budget().get(PieceKind::Engineer) - 2.0).abs() < EPS);
    assert_rows_normalized(&engine);
}

#[test]
fn repeated_turning_moves_charge_one_engineer() {
    let mut board = board_with(&[
        (cell(8, 12), PieceKind::General, Faction::Red),
        (cell(6, 4), PieceKind::Engineer, Faction::Green),
        (cell(8, 2), PieceKind::Brigadier, Faction::Green),
    ]);
    let mut engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());

    for (from, to) in [
        (cell(6, 4), cell(10, 1)),
        (cell(10, 1), cell(6, 4)),
        (cell(6, 4), cell(10, 1)),
    ] {
        let outcome = board.move_piece(from, to).expect("engineer can turn on rail");
        assert_eq!(engine.update(&board, &outcome), UpdateBranch::UntrackedEngineer);
        assert!(engine.is_identified(to));
        assert!((engine.budget().get(PieceKind::Engineer) - 2.0).abs() < EPS);
        assert!((engine.probability(to, PieceKind::Engineer) - 1.0).abs() < EPS);
        assert_rows_normalized(&engine);
    }
}

#[test]
fn engineer_dying_on_a_turning_attack_is_charged_once() {
    let mut board = board_with(&[
        (cell(10, 1), PieceKind::General, Faction::Red),
        (cell(6, 4), PieceKind::Engineer, Faction::Green),
        (cell(8, 2), PieceKind::Brigadier, Faction::Green),
    ]);
    let mut engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());

    let outcome = board
        .move_piece(cell(6, 4), cell(10, 1))
        .expect("engineer attacks along the rail");
    assert!(!outcome.mover.alive);
    assert_eq!(engine.update(&board, &outcome), UpdateBranch::UntrackedEngineer);
    assert!((engine.budget().get(PieceKind::Engineer) - 2.0).abs() < EPS);
    assert!(engine.belief(cell(6, 4)).is_none());
    assert_eq!(engine.active_cells(), vec![cell(8, 2)]);
}

#[test]
fn straight_rail_move_only_rules_out_immovables() {
    let mut board = board_with(&[
        (cell(8, 12), PieceKind::General, Faction::Red),
        (cell(6, 4), PieceKind::Brigadier, Faction::Green),
    ]);
    let mut engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());

    let outcome = board.move_piece(cell(6, 4), cell(6, 1)).expect("straight run");
    assert_eq!(engine.update(&board, &outcome), UpdateBranch::UntrackedMove);
    let row = engine.belief(cell(6, 1)).expect("row follows the piece");
    assert_eq!(row.get(PieceKind::Flag), 0.0);
    assert_eq!(row.get(PieceKind::Mine), 0.0);
    assert!(row.get(PieceKind::Engineer) < 1.0);
}

#[test]
fn surviving_general_excludes_stronger_kinds() {
    // Depth 4 allows a Bomb, so the exception is observable.
    let mut board = board_with(&[
        (cell(8, 5), PieceKind::General, Faction::Red),
        (cell(8, 4), PieceKind::Brigadier, Faction::Green),
    ]);
    let mut engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());
    assert!(engine.probability(cell(8, 4), PieceKind::Bomb) > 0.0);

    let outcome = board.move_piece(cell(8, 5), cell(8, 4)).expect("attack");
    assert_eq!(engine.update(&board, &outcome), UpdateBranch::RankedAttack);

    let row = engine.belief(cell(8, 4)).expect("row is kept for inspection");
    assert_eq!(row.get(PieceKind::General), 0.0);
    assert_eq!(row.get(PieceKind::Mine), 0.0);
    assert!(row.get(PieceKind::Bomb) > 0.0);
    assert!(row.get(PieceKind::Brigadier) > 0.0);
    assert!(!engine.is_active(cell(8, 4)));
}

#[test]
fn failed_attacks_charge_the_defender_once() {
    let mut board = board_with(&[
        (cell(8, 4), PieceKind::General, Faction::Green),
        (cell(8, 5), PieceKind::Brigadier, Faction::Red),
        (cell(8, 6), PieceKind::Brigadier, Faction::Red),
    ]);
    let mut engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());
    let full = engine.budget().total();

    let outcome = board.move_piece(cell(8, 5), cell(8, 4)).expect("first attack");
    assert_eq!(engine.update(&board, &outcome), UpdateBranch::RankedAttack);
    assert!((engine.budget().total() - full).abs() < EPS);
    assert!(engine.is_active(cell(8, 4)));

    let outcome = board.move_piece(cell(8, 6), cell(8, 5)).expect("step");
    assert_eq!(engine.update(&board, &outcome), UpdateBranch::Passive);
    let outcome = board.move_piece(cell(8, 5), cell(8, 4)).expect("second attack");
    assert_eq!(engine.update(&board, &outcome), UpdateBranch::RankedAttack);
    assert!((engine.budget().total() - full).abs() < EPS);
    assert!(engine.is_active(cell(8, 4)));
    assert_rows_normalized(&engine);

    // The General finally trades with a Bomb and leaves the budget once.
    assert!(board.place_piece(cell(8, 6), Piece::new(PieceKind::Bomb, Faction::Red)));
    let outcome = board.move_piece(cell(8, 4), cell(8, 5)).expect("advance");
    assert_eq!(engine.update(&board, &outcome), UpdateBranch::UntrackedMove);
    let outcome = board.move_piece(cell(8, 5), cell(8, 6)).expect("attack the bomb");
    engine.update(&board, &outcome);
    assert!((full - engine.budget().total() - 1.0).abs() < EPS);
    assert!(engine.active_cells().is_empty());
}

#[test]
fn bomb_attack_zeroes_rows() {
    let mut board = board_with(&[
        (cell(8, 6), PieceKind::Bomb, Faction::Red),
        (cell(8, 5), PieceKind::CorpsCommander, Faction::Green),
        (cell(8, 2), PieceKind::Engineer, Faction::Green),
    ]);
    let mut engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());
    let before = engine.budget().total();

    let outcome = board.move_piece(cell(8, 6), cell(8, 5)).expect("attack");
    assert_eq!(engine.update(&board, &outcome), UpdateBranch::BombAttack);

    let row = *engine.belief(cell(8, 5)).expect("row");
    assert!(row.is_degenerate());
    let mut renormalized = row;
    renormalized.normalize();
    assert_eq!(renormalized, row);
    assert!((before - engine.budget().total() - 1.0).abs() < EPS);
    assert_rows_normalized(&engine);
}

#[test]
fn reset_reproduces_fresh_engine() {
    let mut board = Board::with_alliances(AllianceMap::two_player());
    deploy_green(&mut board);
    board.place_piece(cell(8, 6), Piece::new(PieceKind::General, Faction::Red));
    let original = board.clone();

    let mut engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());
    let fresh = BeliefSnapshot::capture(&engine);

    let outcome = board.move_piece(cell(8, 6), cell(8, 5)).expect("attack");
    engine.update(&board, &outcome);
    assert_ne!(BeliefSnapshot::capture(&engine), fresh);

    engine.reset(&original);
    assert_eq!(BeliefSnapshot::capture(&engine), fresh);
}

fn hq_reveal_board() -> Board {
    board_with(&[
        (cell(8, 12), PieceKind::General, Faction::Red),
        (cell(7, 0), PieceKind::Flag, Faction::Green),
        (cell(8, 2), PieceKind::Brigadier, Faction::Green),
        (cell(10, 3), PieceKind::Engineer, Faction::Green),
    ])
}

// Zeroing the move target rather than the headquarters is a deliberate
// compatibility default; the second test covers the opt-in alternative.
#[test]
fn hq_reveal_zeroes_move_target_by_default() {
    let mut board = hq_reveal_board();
    let mut engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());
    board.reveal(cell(7, 0));

    let outcome = board.move_piece(cell(8, 2), cell(8, 1)).expect("step");
    assert_eq!(engine.update(&board, &outcome), UpdateBranch::HqFlagReveal);
    assert!(engine.belief(cell(8, 1)).expect("row").is_degenerate());
    assert_eq!(engine.budget().get(PieceKind::General), 0.0);
    assert!(!engine.is_active(cell(7, 0)));

    // The reveal is only counted once.
    let outcome = board.move_piece(cell(10, 3), cell(10, 4)).expect("step");
    assert_ne!(engine.update(&board, &outcome), UpdateBranch::HqFlagReveal);
}

#[test]
fn hq_reveal_can_zero_the_headquarters_instead() {
    let mut board = hq_reveal_board();
    let config = BeliefConfig {
        hq_reveal_target: HqRevealTarget::Headquarters,
        ..BeliefConfig::default()
    };
    let mut engine = BeliefEngine::for_observer(&board, Faction::Red, config);
    board.reveal(cell(7, 0));

    let outcome = board.move_piece(cell(8, 2), cell(8, 1)).expect("step");
    assert_eq!(engine.update(&board, &outcome), UpdateBranch::HqFlagReveal);
    assert!(engine.belief(cell(7, 0)).expect("row").is_degenerate());
    let moved = engine.belief(cell(8, 1)).expect("row");
    assert!((moved.total() - 1.0).abs() < EPS);
    assert_eq!(engine.budget().get(PieceKind::General), 0.0);
}

#[test]
fn samples_never_exceed_integer_quota() {
    let mut board = Board::with_alliances(AllianceMap::two_player());
    deploy_green(&mut board);
    let engine = BeliefEngine::for_observer(&board, Faction::Red, BeliefConfig::default());
    let mut rng = SmallRng::seed_from_u64(2024);

    for _ in 0..64 {
        let state = engine.sample_state(&mut rng).expect("full set is satisfiable");
        assert_eq!(state.len(), 25);
        for kind in PieceKind::ALL {
            let quota = engine.budget().get(kind).ceil() as usize;
            assert!(
                state.count(kind) <= quota,
                "{kind} drawn {} times with quota {quota}",
                state.count(kind)
            );
        }
    }
}
