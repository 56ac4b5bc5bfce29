//! The move engine: consumes a [`Position`] and produces its legal successor
//! positions, per-square attack maps for both colours and a check flag.
//!
//! Legality follows a two-level model. Movement templates enumerate
//! pseudo-legal transfers; every candidate child is then tested for the
//! moving side's king being attacked in the resulting position and discarded
//! if so. Because successors are full positions (not move descriptors),
//! "making" a move and "testing" it are the same thing.
//!
//! Generation runs in four phases, in order: template-driven common moves,
//! pawn double-steps, en-passant captures and castling. Castling must run
//! last because its safety conditions read the attack maps accumulated in
//! the first phase. The resulting list is ordered deterministically:
//! enumeration order, then a stable ascending sort on the child's material
//! term.
//!
//! The engine is parameterized by the active [`Weights`]: pawns reaching
//! the back rank promote to the configured default piece, and the ordering
//! sort uses the configured material scale.

use std::sync::Arc;

use arrayvec::ArrayVec;
use tracing::trace;

use strum::IntoEnumIterator;

use super::core::{
    CastlingSide, File, Piece, PieceKind, Player, Rank, Square, BOARD_SIZE, BOARD_WIDTH,
};
use super::position::Position;
use super::templates::{Ray, TemplateSet};
use crate::evaluation::{self, Weights};

/// Per-colour attack map: for every square, the number of pieces of that
/// colour that attack or defend it. A signed byte is plenty; sixteen pieces
/// is the practical ceiling.
pub type AttackMap = [i8; BOARD_SIZE as usize];

/// Everything the move engine derives from one position in a single pass.
pub struct Generated {
    /// Legal successor positions, ordered by ascending material balance
    /// (ties keep enumeration order).
    pub successors: Vec<Arc<Position>>,
    /// Attack maps, indexed by [`Player::ix`].
    pub attacks: [AttackMap; 2],
    /// Whether the side to move is in check. Checkmate is `check` with no
    /// successors; stalemate is no successors without check.
    pub check: bool,
}

/// One observed destination square while walking a ray. `Enemy` and
/// `Friendly` are relative to the walking piece, not to the side to move.
enum RayStep {
    Empty(Square),
    Enemy(Square),
    Friendly(Square),
}

/// Walks every ray of a family from `from`, reporting each reachable square
/// until the ray leaves the board or hits a blocker. Occupied squares end
/// the ray after being reported.
fn walk_rays(
    position: &Position,
    from: Square,
    owner: Player,
    rays: &[Ray],
    mut visit: impl FnMut(RayStep),
) {
    for ray in rays {
        let mut square = from;
        loop {
            let Some(next) = square.shift_by(ray.dx, ray.dy) else {
                break;
            };
            match position.at(next) {
                None => {
                    visit(RayStep::Empty(next));
                    if !ray.sliding {
                        break;
                    }
                    square = next;
                }
                Some(piece) if piece.owner == owner => {
                    visit(RayStep::Friendly(next));
                    break;
                }
                Some(_) => {
                    visit(RayStep::Enemy(next));
                    break;
                }
            }
        }
    }
}

/// Whether any piece of `attacker` reaches `target`. This is the
/// attack-generation pass behind the king-safety test: it walks the same
/// templates as move generation but exits on the first hit.
pub(crate) fn square_attacked_by(position: &Position, target: Square, attacker: Player) -> bool {
    for (from, piece) in position.pieces() {
        if piece.owner != attacker {
            continue;
        }
        for ray in TemplateSet::of(piece).take_rays() {
            let mut square = from;
            loop {
                let Some(next) = square.shift_by(ray.dx, ray.dy) else {
                    break;
                };
                if next == target {
                    return true;
                }
                if !ray.sliding || position.at(next).is_some() {
                    break;
                }
                square = next;
            }
        }
    }
    false
}

/// The king-safety test every candidate child must pass: the player who just
/// moved must not have left their king attacked.
fn king_safe(child: &Position) -> bool {
    let mover = !child.side_to_move();
    !square_attacked_by(child, child.king(mover), child.side_to_move())
}

/// Derives the child for a single transfer and keeps it when legal. A pawn
/// transfer onto the back rank promotes to the configured default piece.
fn retain_if_legal(
    parent: &Arc<Position>,
    from: Square,
    to: Square,
    weights: &Weights,
    successors: &mut Vec<Arc<Position>>,
) {
    let child = Position::derive_promoting(parent, from, to, weights.promotion_default);
    if king_safe(&child) {
        successors.push(Arc::new(child));
    }
}

/// Analyses one position: all four generation phases plus the final
/// ordering pass, under the given weight configuration.
#[must_use]
pub fn analyse(position: &Arc<Position>, weights: &Weights) -> Generated {
    let mut generated = Generated {
        successors: Vec::new(),
        attacks: [[0; BOARD_SIZE as usize]; 2],
        check: false,
    };
    generate_common(position, weights, &mut generated);
    generate_double_steps(position, &mut generated.successors);
    generate_en_passant(position, &mut generated);
    generate_castling(position, &mut generated);

    // Stable: equal material keeps generation order, making the successor
    // order fully deterministic.
    generated
        .successors
        .sort_by_key(|child| evaluation::material_term(child, weights));

    trace!(
        successors = generated.successors.len(),
        check = generated.check,
        "analysed {position}",
    );
    generated
}

/// Phase 1: template-driven moves of every piece on the board, attack
/// accounting and check detection. This is the only phase that can promote
/// a pawn, so it is the only one needing the weight configuration.
fn generate_common(position: &Arc<Position>, weights: &Weights, generated: &mut Generated) {
    let side = position.side_to_move();
    let Generated {
        successors,
        attacks,
        check,
    } = generated;

    for (from, piece) in position.pieces() {
        let templates = TemplateSet::of(piece);

        // Quiet pawn pushes: usable only by the side to move and never
        // counted as attacks.
        if let TemplateSet::Split { push, .. } = templates {
            if piece.owner == side {
                walk_rays(position, from, piece.owner, push, |step| {
                    if let RayStep::Empty(to) = step {
                        retain_if_legal(position, from, to, weights, successors);
                    }
                });
            }
        }

        // Take-capable rays: every reachable square counts as attacked or
        // defended, the side to move additionally generates children. For
        // uniform movers an empty square is also a move destination; for
        // pawn capture rays it is a threat only.
        let moves_to_empty = matches!(templates, TemplateSet::Uniform(_));
        let counts = &mut attacks[piece.owner.ix()];
        walk_rays(position, from, piece.owner, templates.take_rays(), |step| match step {
            RayStep::Empty(to) => {
                counts[to.ix()] += 1;
                if moves_to_empty && piece.owner == side {
                    retain_if_legal(position, from, to, weights, successors);
                }
            }
            RayStep::Enemy(to) => {
                counts[to.ix()] += 1;
                if piece.owner == side {
                    retain_if_legal(position, from, to, weights, successors);
                } else if to == position.king(side) {
                    // An opponent piece reaches the moving side's king.
                    *check = true;
                }
            }
            RayStep::Friendly(to) => {
                counts[to.ix()] += 1;
            }
        });
    }
}

/// Phase 2: pawn double-steps off the starting rank. The child position
/// records the crossed square as its en-passant target.
fn generate_double_steps(position: &Arc<Position>, successors: &mut Vec<Arc<Position>>) {
    let side = position.side_to_move();
    let dy: i8 = match side {
        Player::White => 1,
        Player::Black => -1,
    };
    let start = Rank::pawns_starting(side);
    for file in File::iter() {
        let from = Square::new(file, start);
        if position.at(from) != Some(Piece::new(side, PieceKind::Pawn)) {
            continue;
        }
        // Both the crossed square and the destination must be empty. Neither
        // shift can leave the board from the starting rank.
        let Some(crossed) = from.shift_by(0, dy) else {
            continue;
        };
        let Some(to) = crossed.shift_by(0, dy) else {
            continue;
        };
        if position.at(crossed).is_some() || position.at(to).is_some() {
            continue;
        }
        let mut child = Position::derive(position, from, to);
        child.set_en_passant(crossed);
        if king_safe(&child) {
            successors.push(Arc::new(child));
        }
    }
}

/// Phase 3: en-passant captures onto the parent's target square. The
/// captured pawn stands beside the capturing pawn, on the target's file;
/// its square is cleared before the king-safety test so that a discovered
/// attack along the vacated rank is caught.
fn generate_en_passant(position: &Arc<Position>, generated: &mut Generated) {
    let Some(target) = position.en_passant() else {
        return;
    };
    let side = position.side_to_move();
    let dy: i8 = match side {
        Player::White => 1,
        Player::Black => -1,
    };
    let captured = match target.shift_by(0, -dy) {
        Some(square) => square,
        None => panic!("en passant target {target} has no pawn square"),
    };

    let mut candidates = ArrayVec::<Square, 2>::new();
    for dx in [-1, 1] {
        if let Some(from) = target.shift_by(dx, -dy) {
            if position.at(from) == Some(Piece::new(side, PieceKind::Pawn)) {
                candidates.push(from);
            }
        }
    }
    for from in candidates {
        let mut child = Position::derive(position, from, target);
        child.clear_square(captured);
        if king_safe(&child) {
            // The capture threatens the doubled pawn's square even though
            // the capturing pawn lands behind it.
            generated.attacks[side.ix()][captured.ix()] += 1;
            generated.successors.push(Arc::new(child));
        }
    }
}

/// Phase 4: castling. Reads the attack maps accumulated in phase 1, which
/// is why this phase runs last: the king's square and the square it passes
/// over must not be attacked, and every square strictly between rook and
/// king must be empty.
fn generate_castling(position: &Arc<Position>, generated: &mut Generated) {
    let side = position.side_to_move();
    let opponent_attacks = &generated.attacks[(!side).ix()];
    let king = position.king(side);

    for castling_side in [CastlingSide::Queenside, CastlingSide::Kingside] {
        let Some(rook) = position.castling_rook(side, castling_side) else {
            continue;
        };
        debug_assert_eq!(
            position.at(rook),
            Some(Piece::new(side, PieceKind::Rook)),
            "castling right without its rook"
        );
        let towards = castling_side.towards();
        let Some(passed) = king.shift_by(towards, 0) else {
            continue;
        };
        if opponent_attacks[king.ix()] != 0 || opponent_attacks[passed.ix()] != 0 {
            continue;
        }

        let king_file = king.file() as u8;
        let regular = match castling_side {
            CastlingSide::Queenside => king_file >= 2,
            CastlingSide::Kingside => king_file < BOARD_WIDTH - 2,
        };
        if regular {
            if !strictly_between_empty(position, rook, king) {
                continue;
            }
            let Some(destination) = passed.shift_by(towards, 0) else {
                continue;
            };
            if opponent_attacks[destination.ix()] != 0 {
                continue;
            }
            let child = Position::derive_pair(position, king, destination, rook, passed);
            if king_safe(&child) {
                generated.successors.push(Arc::new(child));
            }
        } else {
            // Board-edge variant for irregular geometries: the king steps
            // one square and the rook lands on the king's origin. The
            // attack checks above already cover both squares the king
            // touches, so the king-safety test is not repeated.
            let child = Position::derive_pair(position, king, passed, rook, king);
            generated.successors.push(Arc::new(child));
        }
    }
}

/// Whether every square strictly between `a` and `b` (same rank) is empty.
fn strictly_between_empty(position: &Position, a: Square, b: Square) -> bool {
    debug_assert_eq!(a.rank(), b.rank());
    let (low, high) = if a.file() < b.file() {
        (a.file(), b.file())
    } else {
        (b.file(), a.file())
    };
    File::iter()
        .filter(|file| low < *file && *file < high)
        .all(|file| position.at(Square::new(file, a.rank())).is_none())
}

/// Counts the leaf positions of the successor tree at the given depth.
/// Standard move-generation correctness harness: the counts for well-known
/// positions are published and easy to cross-check. Runs under the default
/// weight configuration (queen promotion).
#[must_use]
pub fn perft(position: &Arc<Position>, depth: u8) -> u64 {
    fn count(position: &Arc<Position>, depth: u8, weights: &Weights) -> u64 {
        if depth == 0 {
            return 1;
        }
        let generated = analyse(position, weights);
        if depth == 1 {
            return generated.successors.len() as u64;
        }
        generated
            .successors
            .iter()
            .map(|child| count(child, depth - 1, weights))
            .sum()
    }
    count(position, depth, &Weights::default())
}
