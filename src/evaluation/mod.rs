//! Static evaluation: a signed score derived from a position and its attack
//! maps, where positive favours White.
//!
//! The non-terminal score is the sum of three terms: material balance,
//! attack/defence pressure on occupied squares and centre control. Checkmate
//! short-circuits into a terminal value that dominates any material total.
//! An optional king-position term is exposed separately for search drivers
//! that want it; it is deliberately not folded into [`evaluate`].
//!
//! Scores are plain integers rather than a wrapper type: the analysis core
//! has no mate-distance arithmetic to protect, and the upstream search wants
//! to mix these values freely.

use tracing::debug;

use crate::chess::core::{PieceKind, Player, Square};
use crate::chess::movegen::AttackMap;
use crate::chess::position::Position;

mod weights;
pub use weights::Weights;

/// Signed evaluation weight. Positive favours White.
pub type Weight = i64;

/// Phase of the game, derived from the number of officers (non-pawn,
/// non-king pieces) left on the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GamePhase {
    #[allow(missing_docs)]
    Opening,
    #[allow(missing_docs)]
    Middlegame,
    #[allow(missing_docs)]
    Endgame,
}

/// Which colour has more reach on a square: +1 when White out-attacks
/// Black there, -1 the other way round, 0 on balance.
fn dominator(attacks: &[AttackMap; 2], square: Square) -> Weight {
    Weight::from(
        attacks[Player::White.ix()][square.ix()] - attacks[Player::Black.ix()][square.ix()],
    )
    .signum()
}

/// Derives the game phase from the officer count: four or fewer means the
/// endgame, ten or fewer the middlegame, anything above that the opening.
#[must_use]
pub fn game_phase(position: &Position) -> GamePhase {
    let officers = position
        .pieces()
        .filter(|(_, piece)| !matches!(piece.kind, PieceKind::Pawn | PieceKind::King))
        .count();
    match officers {
        0..=4 => GamePhase::Endgame,
        5..=10 => GamePhase::Middlegame,
        _ => GamePhase::Opening,
    }
}

/// Scores the position. `checkmate` is the caller's terminal verdict (check
/// with no successors); the attack maps must belong to the same position.
///
/// A checkmate counts against the side to move - they are the one with no
/// moves left - and nearer mates count more than distant ones. The term
/// breakdown of non-terminal scores is emitted at debug level.
#[must_use]
pub fn evaluate(
    position: &Position,
    attacks: &[AttackMap; 2],
    checkmate: bool,
    weights: &Weights,
) -> Weight {
    if checkmate {
        let lost = -position.side_to_move().sign();
        return lost * (weights.checkmate + Weight::from(position.move_number()));
    }
    let material = material_term(position, weights);
    let pressure = attack_defence_term(position, attacks, weights);
    let centre = centre_control_term(attacks, weights);
    debug!(material, pressure, centre, "evaluated {position}");
    material + pressure + centre
}

/// Material balance: the sum of piece weights, White minus Black, scaled by
/// the presence multiplier.
#[must_use]
pub fn material_term(position: &Position, weights: &Weights) -> Weight {
    weights.piece_present_mult
        * position
            .pieces()
            .map(|(_, piece)| piece.owner.sign() * weights.piece(piece.kind))
            .sum::<Weight>()
}

/// Attack/defence pressure: every occupied square contributes its piece
/// weight in the direction of the square's dominator, scaled by the defence
/// multiplier when the dominator matches the piece's owner (the piece is
/// covered) and by the attack multiplier otherwise (the piece is a target).
fn attack_defence_term(position: &Position, attacks: &[AttackMap; 2], weights: &Weights) -> Weight {
    position
        .pieces()
        .map(|(square, piece)| {
            let dominator = dominator(attacks, square);
            let multiplier = if dominator == piece.owner.sign() {
                weights.piece_defence_mult
            } else {
                weights.piece_attack_mult
            };
            dominator * weights.piece(piece.kind) * multiplier
        })
        .sum()
}

/// Centre control: each square's dominator weighted by the static centre
/// table.
fn centre_control_term(attacks: &[AttackMap; 2], weights: &Weights) -> Weight {
    use strum::IntoEnumIterator;
    Square::iter()
        .map(|square| dominator(attacks, square) * weights.centre(square) * weights.centre_cell_mult)
        .sum()
}

/// Optional king-position term, switching policy with the game phase.
///
/// In the endgame the king is a fighting piece: the side whose king stands
/// closer to the centre (Manhattan distance) scores higher. Earlier in the
/// game the king wants shelter: the dominators of the eight squares around
/// each king are summed, and an off-board neighbour counts as a natural
/// wall for its owner.
///
/// Search drivers may add this to [`evaluate`]; the move engine never does.
#[must_use]
pub fn king_position_weight(
    position: &Position,
    attacks: &[AttackMap; 2],
    phase: GamePhase,
) -> Weight {
    if phase == GamePhase::Endgame {
        return centre_distance(position.king(Player::Black))
            - centre_distance(position.king(Player::White));
    }
    let mut shelter = 0;
    for (king, wall) in [
        (position.king(Player::White), 1),
        (position.king(Player::Black), -1),
    ] {
        for (dx, dy) in neighbour_offsets() {
            match king.shift_by(dx, dy) {
                Some(neighbour) => shelter += dominator(attacks, neighbour),
                None => shelter += wall,
            }
        }
    }
    shelter
}

/// Doubled Manhattan distance from the board centre (doubling keeps the
/// arithmetic integral: the centre falls between squares).
fn centre_distance(king: Square) -> Weight {
    let file = Weight::from(king.file() as u8);
    let rank = Weight::from(king.rank() as u8);
    (2 * file - 7).abs() + (2 * rank - 7).abs()
}

fn neighbour_offsets() -> impl Iterator<Item = (i8, i8)> {
    itertools::iproduct!(-1i8..=1, -1i8..=1).filter(|&(dx, dy)| (dx, dy) != (0, 0))
}
