use std::sync::Arc;

use castellan::chess::core::{CastlingSide, Piece, PieceKind, Player, Square};
use castellan::chess::movegen::{analyse, perft, Generated};
use castellan::chess::position::Position;
use castellan::evaluation::Weights;
use pretty_assertions::assert_eq;

fn setup(input: &str) -> Arc<Position> {
    Position::parse(input).expect("parsing legal position")
}

fn run(position: &Arc<Position>) -> Generated {
    analyse(position, &Weights::default())
}

fn successor_count(input: &str) -> usize {
    run(&setup(input)).successors.len()
}

#[test]
fn starting_successors() {
    assert_eq!(run(&Position::starting()).successors.len(), 20);
}

#[test]
fn open_game_successors() {
    // 1. e4 e5: White now has 29 replies.
    let start = Position::starting();
    let after_e4 = Arc::new(Position::derive(&start, Square::E2, Square::E4));
    let after_e5 = Arc::new(Position::derive(&after_e4, Square::E7, Square::E5));
    assert_eq!(run(&after_e5).successors.len(), 29);
}

#[test]
fn chess_programming_wiki_perft_positions() {
    // Depth-1 counts from https://www.chessprogramming.org/Perft_Results.
    // Position 1 is the starting position, handled above.
    // Position 2, "kiwipete".
    assert_eq!(
        successor_count("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"),
        48
    );
    // Position 3.
    assert_eq!(successor_count("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1"), 14);
    // Position 4.
    assert_eq!(
        successor_count("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1"),
        6
    );
    // Position 4 mirrored.
    assert_eq!(
        successor_count("r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1"),
        6
    );
    // Position 5. The published count is 44; the d7 pawn's capture onto c8
    // promotes only to the default queen here, so the three underpromotion
    // variants are not generated.
    assert_eq!(
        successor_count("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8"),
        41
    );
    // Position 6.
    assert_eq!(
        successor_count(
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10"
        ),
        46
    );
}

#[test]
fn perft_from_the_starting_position() {
    let start = Position::starting();
    assert_eq!(perft(&start, 1), 20);
    assert_eq!(perft(&start, 2), 400);
    assert_eq!(perft(&start, 3), 8_902);
}

#[test]
fn double_step_records_en_passant_target() {
    // White king e1, pawn e2, black king e8: the double step crosses e3
    // and the child remembers it for one ply.
    let generated = run(&setup("4k3/8/8/8/8/8/4P3/4K3 w - -"));
    let double_step = generated
        .successors
        .iter()
        .find(|child| child.at(Square::E4).is_some())
        .expect("e2e4 must be amongst the successors");
    assert_eq!(double_step.en_passant(), Some(Square::E3));
}

#[test]
fn en_passant_capture_empties_the_doubled_pawn() {
    let generated = run(&setup("4k3/8/8/3Pp3/8/8/8/4K3 w - e6"));
    let capture = generated
        .successors
        .iter()
        .find(|child| child.at(Square::E6).is_some())
        .expect("d5xe6 en passant must be amongst the successors");
    assert_eq!(
        capture.at(Square::E6),
        Some(Piece::new(Player::White, PieceKind::Pawn))
    );
    assert_eq!(capture.at(Square::E5), None);
}

#[test]
fn en_passant_expires_after_one_ply() {
    let generated = run(&setup("4k3/8/8/3Pp3/8/8/8/4K3 w - e6"));
    for child in &generated.successors {
        assert_eq!(child.en_passant(), None);
    }
}

#[test]
fn quiet_successors_keep_castling_rights() {
    // From the starting position no successor moves a king or a rook, so
    // all four rights survive in each of them.
    let generated = run(&Position::starting());
    assert_eq!(generated.successors.len(), 20);
    for child in &generated.successors {
        for (player, side, rook) in [
            (Player::White, CastlingSide::Queenside, Square::A1),
            (Player::White, CastlingSide::Kingside, Square::H1),
            (Player::Black, CastlingSide::Queenside, Square::A8),
            (Player::Black, CastlingSide::Kingside, Square::H8),
        ] {
            assert_eq!(child.castling_rook(player, side), Some(rook));
        }
    }
}

#[test]
fn castling_successors_move_both_pieces() {
    let generated = run(&setup("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1"));
    let kingside = generated
        .successors
        .iter()
        .find(|child| child.king(Player::White) == Square::G1)
        .expect("short castling must be amongst the successors");
    assert_eq!(
        kingside.at(Square::F1),
        Some(Piece::new(Player::White, PieceKind::Rook))
    );
    let queenside = generated
        .successors
        .iter()
        .find(|child| child.king(Player::White) == Square::C1)
        .expect("long castling must be amongst the successors");
    assert_eq!(
        queenside.at(Square::D1),
        Some(Piece::new(Player::White, PieceKind::Rook))
    );
}

#[test]
fn promotion_defaults_to_a_queen() {
    let generated = run(&setup("4k3/P7/8/8/8/8/8/4K3 w - -"));
    let promotion = generated
        .successors
        .iter()
        .find(|child| child.at(Square::A8).is_some())
        .expect("a7a8 must be amongst the successors");
    assert_eq!(
        promotion.at(Square::A8),
        Some(Piece::new(Player::White, PieceKind::Queen))
    );
}

#[test]
fn reversible_derivations_restore_material() {
    let start = Position::starting();
    let out = Arc::new(Position::derive(&start, Square::G1, Square::F3));
    let nowhere = Arc::new(Position::derive(&out, Square::G8, Square::F6));
    let back = Arc::new(Position::derive(&nowhere, Square::F3, Square::G1));
    let home = Arc::new(Position::derive(&back, Square::F6, Square::G8));
    assert_eq!(home.material(), start.material());
    assert_eq!(home.pieces().count(), start.pieces().count());
    assert_eq!(home.move_number(), start.move_number() + 4);
}

#[test]
fn successor_chain_bookkeeping() {
    let parent = setup("r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/2N2N2/PPPP1PPP/R1BQK2R w KQkq - 0 1");
    let generated = run(&parent);
    assert!(!generated.successors.is_empty());
    for child in &generated.successors {
        assert!(child
            .parent()
            .is_some_and(|parent_ref| Arc::ptr_eq(parent_ref, &parent)));
        assert_eq!(child.side_to_move(), !parent.side_to_move());
        assert_eq!(child.move_number(), parent.move_number() + 1);
    }
}

#[test]
fn ancestors_outlive_dropped_handles() {
    let root = Position::starting();
    let child = Arc::new(Position::derive(&root, Square::D2, Square::D4));
    let grandchild = Arc::new(Position::derive(&child, Square::D7, Square::D5));
    drop(root);
    drop(child);
    // The back-links keep the whole chain alive.
    let child_ref = grandchild.parent().expect("grandchild keeps its parent");
    let root_ref = child_ref.parent().expect("child keeps the root");
    assert_eq!(root_ref.move_number(), 0);
    assert!(root_ref.parent().is_none());
}
