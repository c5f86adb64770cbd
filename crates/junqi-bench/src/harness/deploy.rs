use junqi_core::board::Board;
use junqi_core::model::{Cell, Faction, Piece, PieceCounts, PieceKind};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Deepest row (from the home edge) where Mines may be deployed.
const MINE_MAX_DEPTH: u8 = 1;
/// Front row of the deployment zone; Bombs may not start there.
const BOMB_FORBIDDEN_DEPTH: u8 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeployError {
    #[error("no legal cell left for {faction}'s {kind}")]
    NoCandidate { faction: Faction, kind: PieceKind },
    #[error("deployment cell {cell} is already occupied")]
    Occupied { cell: Cell },
}

/// Cells a faction fills at setup: its zone minus the camps, in row-major order.
pub fn deployment_cells(faction: Faction) -> Vec<Cell> {
    let (min, max) = faction.deployment_zone();
    (min.y..=max.y)
        .flat_map(|y| (min.x..=max.x).map(move |x| Cell::new(x, y)))
        .filter(|cell| cell.is_valid() && !cell.is_camp())
        .collect()
}

/// Draws a legal random setup of the standard piece set.
///
/// The Flag goes on a headquarters, Mines on the two home rows and Bombs
/// anywhere but the front row; the remaining pieces take the leftover cells.
pub fn random_setup<R: Rng + ?Sized>(
    faction: Faction,
    rng: &mut R,
) -> Result<Vec<(Cell, PieceKind)>, DeployError> {
    let mut free = deployment_cells(faction);
    free.shuffle(rng);

    let counts = PieceCounts::standard();
    let mut placed = Vec::with_capacity(free.len());

    for kind in [PieceKind::Flag, PieceKind::Mine, PieceKind::Bomb] {
        for _ in 0..counts.get(kind) {
            let slot = free
                .iter()
                .position(|&cell| restricted_cell_allows(faction, cell, kind))
                .ok_or(DeployError::NoCandidate { faction, kind })?;
            placed.push((free.swap_remove(slot), kind));
        }
    }

    let mut rest: Vec<PieceKind> = counts
        .iter()
        .filter(|(kind, _)| !matches!(kind, PieceKind::Flag | PieceKind::Mine | PieceKind::Bomb))
        .flat_map(|(kind, count)| std::iter::repeat_n(kind, usize::from(count)))
        .collect();
    rest.shuffle(rng);

    if let Some(&kind) = rest.get(free.len()) {
        return Err(DeployError::NoCandidate { faction, kind });
    }
    placed.extend(free.into_iter().zip(rest));
    Ok(placed)
}

/// Places a random setup for `faction` on `board`, returning the pieces placed.
pub fn deploy<R: Rng + ?Sized>(
    board: &mut Board,
    faction: Faction,
    rng: &mut R,
) -> Result<usize, DeployError> {
    let setup = random_setup(faction, rng)?;
    for &(cell, kind) in &setup {
        if !board.place_piece(cell, Piece::new(kind, faction)) {
            return Err(DeployError::Occupied { cell });
        }
    }
    Ok(setup.len())
}

fn restricted_cell_allows(faction: Faction, cell: Cell, kind: PieceKind) -> bool {
    match kind {
        PieceKind::Flag => cell.is_headquarters(),
        PieceKind::Mine => faction.relative_depth(cell) <= MINE_MAX_DEPTH,
        PieceKind::Bomb => faction.relative_depth(cell) != BOMB_FORBIDDEN_DEPTH,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use junqi_core::model::AllianceMap;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zone_holds_exactly_the_standard_set() {
        for faction in Faction::ALL {
            let cells = deployment_cells(faction);
            assert_eq!(cells.len(), usize::from(PieceCounts::standard().total()));
            assert!(cells.iter().all(|&cell| faction.in_deployment_zone(cell)));
        }
    }

    #[test]
    fn setups_follow_placement_rules() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let setup = random_setup(Faction::Green, &mut rng).unwrap();
            assert_eq!(setup.len(), 25);
            for (cell, kind) in setup {
                assert!(!cell.is_camp());
                match kind {
                    PieceKind::Flag => assert!(cell.is_headquarters()),
                    PieceKind::Mine => assert!(Faction::Green.relative_depth(cell) <= 1),
                    PieceKind::Bomb => assert_ne!(Faction::Green.relative_depth(cell), 5),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn deploy_fills_the_board_once() {
        let mut board = Board::with_alliances(AllianceMap::two_player());
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(deploy(&mut board, Faction::Red, &mut rng), Ok(25));
        assert_eq!(board.count(Faction::Red, PieceKind::Flag), 1);
        assert_eq!(board.count(Faction::Red, PieceKind::Mine), 3);

        let again = deploy(&mut board, Faction::Red, &mut rng);
        assert!(matches!(again, Err(DeployError::Occupied { .. })));
    }
}
