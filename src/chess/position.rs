//! Fully-specified chess position: piece placement, side to move, castling
//! rights, en-passant target and the ply counter, plus the factory
//! operations that create root positions (standard start, FEN) and derive
//! child positions from a parent.
//!
//! A [`Position`] is immutable once it leaves the factory and is shared
//! behind an [`Arc`]. Children keep a strong reference to their parent, so
//! the predecessor chain of any line stays alive until the last descendant
//! is dropped; derivation is strictly parent-to-child and no cycles can
//! form.

use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use strum::IntoEnumIterator;

use super::core::{
    CastlingSide, File, Piece, PieceKind, Player, Rank, Square, BOARD_SIZE, BOARD_WIDTH,
};
use super::movegen;

/// Number of positions constructed by the factory since process start.
/// Diagnostic only: the search tree can grow very wide and this is the
/// cheapest way to see how much of it has been materialized.
static CONSTRUCTED: AtomicU64 = AtomicU64::new(0);

/// Returns the diagnostic count of positions constructed so far.
#[must_use]
pub fn positions_constructed() -> u64 {
    CONSTRUCTED.load(Ordering::Relaxed)
}

/// Square-centric (mailbox) implementation of the chess position.
///
/// The dense array representation is chosen over bitboards because the
/// analysis layer wants per-square bookkeeping (attack counts, dominators)
/// rather than set algebra, and because it keeps derivation a plain array
/// copy.
pub struct Position {
    board: [Option<Piece>; BOARD_SIZE as usize],
    side_to_move: Player,
    /// Ply counter: increments on every derivation, over the whole derived
    /// chain.
    move_number: u16,
    /// The square a pawn crossed on a double advance, valid for one ply.
    en_passant: Option<Square>,
    /// Per colour and castling side, the square of the rook that may still
    /// castle. `None` means the right is lost.
    castling: [[Option<Square>; 2]; 2],
    /// King location cache, indexed by colour.
    kings: [Square; 2],
    parent: Option<Arc<Self>>,
}

impl Position {
    /// Creates the starting position of standard chess.
    ///
    /// ```
    /// use castellan::chess::position::Position;
    ///
    /// assert_eq!(
    ///     Position::starting().to_string(),
    ///     "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    /// );
    /// ```
    #[must_use]
    pub fn starting() -> Arc<Self> {
        use PieceKind::{Bishop, King, Knight, Pawn, Queen, Rook};
        let mut board = [None; BOARD_SIZE as usize];
        let backrank = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];
        for (file, kind) in File::iter().zip(backrank) {
            board[Square::new(file, Rank::One).ix()] = Some(Piece::new(Player::White, kind));
            board[Square::new(file, Rank::Two).ix()] = Some(Piece::new(Player::White, Pawn));
            board[Square::new(file, Rank::Seven).ix()] = Some(Piece::new(Player::Black, Pawn));
            board[Square::new(file, Rank::Eight).ix()] = Some(Piece::new(Player::Black, kind));
        }
        CONSTRUCTED.fetch_add(1, Ordering::Relaxed);
        Arc::new(Self {
            board,
            side_to_move: Player::White,
            move_number: 0,
            en_passant: None,
            castling: [
                [Some(Square::A1), Some(Square::H1)],
                [Some(Square::A8), Some(Square::H8)],
            ],
            kings: [Square::E1, Square::E8],
            parent: None,
        })
    }

    /// Parses a position from Forsyth-Edwards Notation and checks its
    /// well-formedness.
    ///
    /// FEN ::=
    ///       Piece Placement
    ///   ' ' Side to move
    ///   ' ' Castling ability
    ///   ' ' En passant target square
    ///   ' ' Halfmove clock
    ///   ' ' Fullmove counter
    ///
    /// The last two fields (together) are optional: books and datasets
    /// commonly ship trimmed, EPD-style position strings and they default to
    /// "0 1" here. The halfmove clock is accepted for compatibility but not
    /// tracked: the analysis core has no use for the fifty-move rule.
    ///
    /// Parsing is the only public way of building a non-derived position, so
    /// it doubles as the barrier between untrusted input and the engine:
    /// positions that violate the core invariants (missing or duplicated
    /// kings, pawns on back ranks, castling rights without the rook, an
    /// impossible en-passant target, a capturable king) are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first malformed field or violated
    /// invariant.
    pub fn from_fen(input: &str) -> anyhow::Result<Arc<Self>> {
        let mut parts = input.split(' ');

        let placement = match parts.next() {
            Some(placement) => placement,
            None => bail!("missing piece placement"),
        };
        let mut board = [None; BOARD_SIZE as usize];
        let mut kings = [None, None];
        let mut rank_id = BOARD_WIDTH;
        for rank_fen in placement.split('/') {
            if rank_id == 0 {
                bail!("expected {BOARD_WIDTH} ranks, got {placement}");
            }
            rank_id -= 1;
            let rank = Rank::try_from(rank_id)?;
            let mut file: u8 = 0;
            for symbol in rank_fen.chars() {
                if file >= BOARD_WIDTH {
                    bail!("rank {rank} exceeds {BOARD_WIDTH} files");
                }
                match symbol {
                    '0' => bail!("empty-square run can not be 0"),
                    '1'..='9' => {
                        file += symbol as u8 - b'0';
                        continue;
                    }
                    _ => (),
                }
                let piece = Piece::try_from(symbol)?;
                let square = Square::new(file.try_into()?, rank);
                if piece.kind == PieceKind::King {
                    let king = &mut kings[piece.owner.ix()];
                    if king.is_some() {
                        bail!("more than one {} king", piece.owner);
                    }
                    *king = Some(square);
                }
                board[square.ix()] = Some(piece);
                file += 1;
            }
            if file != BOARD_WIDTH {
                bail!("rank {rank} should have exactly {BOARD_WIDTH} files, got {rank_fen}");
            }
        }
        if rank_id != 0 {
            bail!("expected {BOARD_WIDTH} ranks, got {placement}");
        }
        let (Some(white_king), Some(black_king)) = (kings[0], kings[1]) else {
            bail!("both kings must be present");
        };

        let side_to_move: Player = match parts.next() {
            Some(value) => value.try_into()?,
            None => bail!("missing side to move"),
        };
        let castling = match parts.next() {
            Some(value) => parse_castling(value)?,
            None => bail!("missing castling rights"),
        };
        let en_passant = match parts.next() {
            Some("-") => None,
            Some(value) => Some(Square::try_from(value).context("bad en passant square")?),
            None => bail!("missing en passant square"),
        };
        let halfmove_clock = match parts.next() {
            Some(value) => Some(
                value
                    .parse::<u8>()
                    .with_context(|| format!("halfmove clock can not be parsed: {value}"))?,
            ),
            None => None,
        };
        let fullmove_counter = match parts.next() {
            Some(value) => match value.parse::<u16>() {
                Ok(0) => bail!("fullmove counter can not be 0"),
                Ok(num) => Some(num),
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("fullmove counter can not be parsed: {value}"))
                }
            },
            None => match halfmove_clock {
                Some(_) => bail!("if halfmove clock is present, fullmove counter must be too"),
                // A trimmed, EPD-style position.
                None => None,
            },
        };
        if parts.next().is_some() {
            bail!("trailing symbols after fullmove counter");
        }

        let fullmove_counter = fullmove_counter.unwrap_or(1);
        let result = Self {
            board,
            side_to_move,
            move_number: (fullmove_counter - 1) * 2 + u16::from(side_to_move == Player::Black),
            en_passant,
            castling,
            kings: [white_king, black_king],
            parent: None,
        };
        validate(&result)?;
        CONSTRUCTED.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(result))
    }

    /// Derives the child position in which the piece on `from` has been
    /// transferred to `to`, capturing whatever stood there. A pawn reaching
    /// the opponent's back rank is promoted to a queen; use
    /// [`Position::derive_promoting`] for a different piece.
    ///
    /// The derived position has the opposite side to move, an incremented
    /// move number, a cleared en-passant target, castling rights reduced by
    /// any king or rook movement or rook capture, and a back-link to
    /// `parent`. Wrap the result in an [`Arc`] to hand it out.
    ///
    /// # Panics
    ///
    /// Panics if `from` is empty: derivations are driven by move
    /// enumeration, so an empty origin is a programmer error.
    #[must_use]
    pub fn derive(parent: &Arc<Self>, from: Square, to: Square) -> Self {
        Self::derive_promoting(parent, from, to, PieceKind::Queen)
    }

    /// Same as [`Position::derive`] with an explicit promotion piece.
    ///
    /// # Panics
    ///
    /// Panics if `from` is empty.
    #[must_use]
    pub fn derive_promoting(
        parent: &Arc<Self>,
        from: Square,
        to: Square,
        promotion: PieceKind,
    ) -> Self {
        let mut child = Self::fresh_child(parent);
        child.apply_transfer(from, to, promotion);
        CONSTRUCTED.fetch_add(1, Ordering::Relaxed);
        child
    }

    /// Atomic two-transfer derivation, used for castling so that the king
    /// and the rook move within a single ply. The transfers are applied in
    /// order.
    ///
    /// # Panics
    ///
    /// Panics if either origin square is empty at the time its transfer is
    /// applied.
    #[must_use]
    pub fn derive_pair(
        parent: &Arc<Self>,
        from1: Square,
        to1: Square,
        from2: Square,
        to2: Square,
    ) -> Self {
        let mut child = Self::fresh_child(parent);
        child.apply_transfer(from1, to1, PieceKind::Queen);
        child.apply_transfer(from2, to2, PieceKind::Queen);
        CONSTRUCTED.fetch_add(1, Ordering::Relaxed);
        child
    }

    fn fresh_child(parent: &Arc<Self>) -> Self {
        Self {
            board: parent.board,
            side_to_move: !parent.side_to_move,
            move_number: parent.move_number + 1,
            en_passant: None,
            castling: parent.castling,
            kings: parent.kings,
            parent: Some(Arc::clone(parent)),
        }
    }

    fn apply_transfer(&mut self, from: Square, to: Square, promotion: PieceKind) {
        let piece = match self.board[from.ix()].take() {
            Some(piece) => piece,
            None => panic!("derivation from an empty square: {from}"),
        };
        debug_assert_ne!(
            self.board[to.ix()].map(|captured| captured.kind),
            Some(PieceKind::King),
            "a king can never be captured"
        );

        let placed = if piece.kind == PieceKind::Pawn && to.rank() == Rank::backrank(!piece.owner) {
            Piece::new(piece.owner, promotion)
        } else {
            piece
        };
        self.board[to.ix()] = Some(placed);

        if piece.kind == PieceKind::King {
            self.kings[piece.owner.ix()] = to;
            self.castling[piece.owner.ix()] = [None, None];
        }
        // A rook leaving its home square forfeits the right; anything landing
        // on a rook's home square means that rook was just captured.
        for rights in &mut self.castling {
            for right in rights.iter_mut() {
                if *right == Some(from) || *right == Some(to) {
                    *right = None;
                }
            }
        }
    }

    /// The piece standing on `square`, if any.
    #[must_use]
    pub fn at(&self, square: Square) -> Option<Piece> {
        self.board[square.ix()]
    }

    /// Iterates over all occupied squares in board order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::iter().filter_map(|square| self.at(square).map(|piece| (square, piece)))
    }

    /// The player who moves next.
    #[must_use]
    pub const fn side_to_move(&self) -> Player {
        self.side_to_move
    }

    /// Ply counter, monotonically increasing along the derived chain.
    #[must_use]
    pub const fn move_number(&self) -> u16 {
        self.move_number
    }

    /// The en-passant target square, if a pawn just double-advanced.
    #[must_use]
    pub const fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// The square of the rook that may still castle on the given side, or
    /// `None` once the right is lost.
    #[must_use]
    pub fn castling_rook(&self, player: Player, side: CastlingSide) -> Option<Square> {
        self.castling[player.ix()][side.ix()]
    }

    /// Cached location of the given player's king.
    #[must_use]
    pub fn king(&self, player: Player) -> Square {
        self.kings[player.ix()]
    }

    /// The position this one was derived from; `None` for roots.
    #[must_use]
    pub const fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Sum of signed material weights over the board on the built-in scale
    /// ([`PieceKind::weight`]): positive when White is ahead. The move
    /// engine orders successor lists by the evaluator's material term,
    /// which agrees with this sum under the default weights.
    #[must_use]
    pub fn material(&self) -> i64 {
        self.pieces()
            .map(|(_, piece)| piece.owner.sign() * piece.kind.weight())
            .sum()
    }

    /// Sets the en-passant target on a freshly derived, not yet shared
    /// child. Only the move engine does this, right after a pawn
    /// double-step.
    pub(crate) fn set_en_passant(&mut self, square: Square) {
        self.en_passant = Some(square);
    }

    /// Clears a square on a freshly derived, not yet shared child. Only the
    /// move engine does this, to remove the pawn captured en passant.
    pub(crate) fn clear_square(&mut self, square: Square) {
        self.board[square.ix()] = None;
    }
}

fn parse_castling(fen: &str) -> anyhow::Result<[[Option<Square>; 2]; 2]> {
    let mut castling = [[None; 2]; 2];
    if fen == "-" {
        return Ok(castling);
    }
    if fen.is_empty() || fen.len() > 4 {
        bail!("unknown castling rights: {fen}");
    }
    for symbol in fen.chars() {
        let (player, side, rook) = match symbol {
            'K' => (Player::White, CastlingSide::Kingside, Square::H1),
            'Q' => (Player::White, CastlingSide::Queenside, Square::A1),
            'k' => (Player::Black, CastlingSide::Kingside, Square::H8),
            'q' => (Player::Black, CastlingSide::Queenside, Square::A8),
            _ => bail!("unknown castling rights symbol: '{symbol}'"),
        };
        let right = &mut castling[player.ix()][side.ix()];
        if right.is_some() {
            bail!("duplicated castling rights symbol: '{symbol}'");
        }
        *right = Some(rook);
    }
    Ok(castling)
}

/// Checks the invariants that the rest of the crate assumes: this is the
/// barrier between parsed input and analysis. Derived positions preserve
/// these invariants by construction.
fn validate(position: &Position) -> anyhow::Result<()> {
    for (square, piece) in position.pieces() {
        if piece.kind == PieceKind::Pawn
            && matches!(square.rank(), Rank::One | Rank::Eight)
        {
            bail!("pawns can not stand on back ranks: {square}");
        }
    }
    for player in [Player::White, Player::Black] {
        for side in [CastlingSide::Queenside, CastlingSide::Kingside] {
            let Some(rook) = position.castling_rook(player, side) else {
                continue;
            };
            if position.at(rook) != Some(Piece::new(player, PieceKind::Rook)) {
                bail!("{player} castling right without a rook on {rook}");
            }
            let king_start = Square::new(File::E, Rank::backrank(player));
            if position.king(player) != king_start {
                bail!("{player} castling right although the king left {king_start}");
            }
        }
    }
    if let Some(target) = position.en_passant() {
        let (expected_rank, pawn_rank) = match position.side_to_move() {
            Player::White => (Rank::Six, Rank::Five),
            Player::Black => (Rank::Three, Rank::Four),
        };
        if target.rank() != expected_rank {
            bail!("en passant target {target} is not on rank {expected_rank}");
        }
        let pawn = Square::new(target.file(), pawn_rank);
        if position.at(pawn) != Some(Piece::new(!position.side_to_move(), PieceKind::Pawn)) {
            bail!("en passant target {target} without a pawn on {pawn}");
        }
    }
    // The opponent just moved; leaving their own king capturable would mean
    // the position never arose from legal play, and move generation relies
    // on kings being uncapturable.
    let opponent = !position.side_to_move();
    if movegen::square_attacked_by(position, position.king(opponent), position.side_to_move()) {
        bail!("the {opponent} king can be captured right away");
    }
    Ok(())
}

impl Position {
    /// Cleans up the input (whitespace, `fen `/`epd ` prefixes) and parses
    /// it as [`Position::from_fen`]. Use this entry point for input coming
    /// from an untrusted source that is likely to contain extra symbols.
    ///
    /// # Errors
    ///
    /// See [`Position::from_fen`].
    pub fn parse(input: &str) -> anyhow::Result<Arc<Self>> {
        let input = input.trim();
        for prefix in ["fen ", "epd "] {
            if let Some(stripped) = input.strip_prefix(prefix) {
                return Self::from_fen(stripped);
            }
        }
        Self::from_fen(input)
    }
}

impl fmt::Display for Position {
    /// Prints the position in Forsyth-Edwards Notation. The halfmove clock
    /// is not tracked and always prints as 0.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rank in Rank::iter().rev() {
            let mut empty_squares = 0;
            for file in File::iter() {
                match self.at(Square::new(file, rank)) {
                    Some(piece) => {
                        if empty_squares != 0 {
                            write!(f, "{empty_squares}")?;
                            empty_squares = 0;
                        }
                        write!(f, "{piece}")?;
                    }
                    None => empty_squares += 1,
                }
            }
            if empty_squares != 0 {
                write!(f, "{empty_squares}")?;
            }
            if rank != Rank::One {
                write!(f, "/")?;
            }
        }
        write!(f, " {} ", self.side_to_move)?;
        let mut any_right = false;
        for (player, side) in [
            (Player::White, CastlingSide::Kingside),
            (Player::White, CastlingSide::Queenside),
            (Player::Black, CastlingSide::Kingside),
            (Player::Black, CastlingSide::Queenside),
        ] {
            if self.castling_rook(player, side).is_some() {
                any_right = true;
                let symbol = match side {
                    CastlingSide::Kingside => 'k',
                    CastlingSide::Queenside => 'q',
                };
                match player {
                    Player::White => write!(f, "{}", symbol.to_ascii_uppercase())?,
                    Player::Black => write!(f, "{symbol}")?,
                }
            }
        }
        if !any_right {
            write!(f, "-")?;
        }
        match self.en_passant {
            Some(square) => write!(f, " {square}")?,
            None => write!(f, " -")?,
        }
        write!(f, " 0 {}", self.move_number / 2 + 1)
    }
}

impl fmt::Debug for Position {
    /// Dumps the board in a human-readable format ('.' for an empty square,
    /// the FEN algebraic symbol for a piece) together with the rest of the
    /// state.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board:")?;
        for rank in Rank::iter().rev() {
            for file in File::iter() {
                match self.at(Square::new(file, rank)) {
                    Some(piece) => write!(f, "{piece}")?,
                    None => f.write_char('.')?,
                }
                if file != File::H {
                    f.write_char(' ')?;
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "Player to move: {:?}", self.side_to_move)?;
        writeln!(f, "Move number: {}", self.move_number)?;
        writeln!(f, "En passant: {:?}", self.en_passant)?;
        writeln!(f, "FEN: {self}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starting() {
        let position = Position::starting();
        assert_eq!(
            format!("{position:?}"),
            "Board:\n\
             r n b q k b n r\n\
             p p p p p p p p\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             . . . . . . . .\n\
             P P P P P P P P\n\
             R N B Q K B N R\n\
             Player to move: White\n\
             Move number: 0\n\
             En passant: None\n\
             FEN: rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1\n"
        );
        assert_eq!(position.king(Player::White), Square::E1);
        assert_eq!(position.king(Player::Black), Square::E8);
        assert_eq!(position.material(), 0);
        assert_eq!(position.pieces().count(), 32);
        assert!(position.parent().is_none());
    }

    #[test]
    fn fen_round_trip() {
        for fen in [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "4k3/8/8/3Pp3/8/8/8/4K3 w - e6 0 3",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        ] {
            assert_eq!(Position::from_fen(fen).unwrap().to_string(), fen);
        }
    }

    #[test]
    fn trimmed_fen() {
        let position = Position::parse("  fen 4k3/8/8/8/8/8/4P3/4K3 w - -\n").unwrap();
        assert_eq!(position.to_string(), "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        assert_eq!(position.move_number(), 0);
    }

    #[test]
    fn move_number_seeding() {
        let position =
            Position::from_fen("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2")
                .unwrap();
        assert_eq!(position.move_number(), 2);
        let position =
            Position::from_fen("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2")
                .unwrap();
        assert_eq!(position.move_number(), 3);
    }

    #[test]
    fn malformed_fens() {
        for fen in [
            "",
            "what is this",
            // Only seven ranks.
            "pppppppp/8/8/8/8/8/PPPPPPPP w - - 0 1",
            // Nine files in one rank.
            "rnbqkbnrr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            // No kings.
            "8/pppppppp/8/8/8/8/PPPPPPPP/8 w - - 0 1",
            // Two white kings.
            "4k3/8/8/8/8/8/8/3KK3 w - - 0 1",
            // Pawn on the back rank.
            "4k2p/8/8/8/8/8/8/4K3 w - - 0 1",
            // Castling right without the rook.
            "4k3/8/8/8/8/8/8/4K3 w K - 0 1",
            // Castling right with a displaced king.
            "r3k2r/8/8/8/8/8/8/R2K3R w KQkq - 0 1",
            // En passant target on the wrong rank.
            "4k3/8/8/8/3Pp3/8/8/4K3 w - d4 0 1",
            // En passant target without the pushed pawn.
            "4k3/8/8/4p3/8/8/8/4K3 w - d6 0 1",
            // Zero fullmove counter.
            "4k3/8/8/8/8/8/8/4K3 w - - 0 0",
            // Opponent king already capturable.
            "4k3/4R3/8/8/8/8/8/4K3 w - - 0 1",
            // Trailing garbage.
            "4k3/8/8/8/8/8/8/4K3 w - - 0 1 extra",
        ] {
            assert!(Position::from_fen(fen).is_err(), "expected rejection: {fen}");
        }
    }

    #[test]
    fn derive_updates_state() {
        let parent = Position::starting();
        let child = Arc::new(Position::derive(&parent, Square::E2, Square::E4));
        assert_eq!(child.side_to_move(), Player::Black);
        assert_eq!(child.move_number(), 1);
        assert_eq!(child.at(Square::E2), None);
        assert_eq!(
            child.at(Square::E4),
            Some(Piece::new(Player::White, PieceKind::Pawn))
        );
        assert!(child
            .parent()
            .is_some_and(|parent_ref| Arc::ptr_eq(parent_ref, &parent)));
        // A pawn move touches no castling rights.
        assert_eq!(child.castling_rook(Player::White, CastlingSide::Kingside), Some(Square::H1));
        assert_eq!(child.en_passant(), None);
    }

    #[test]
    fn derive_capture_changes_material() {
        let parent =
            Position::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(parent.material(), 0);
        let child = Arc::new(Position::derive(&parent, Square::E4, Square::D5));
        assert_eq!(child.material(), 100);
    }

    #[test]
    fn derive_promotes_to_queen_by_default() {
        let parent = Position::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let child = Arc::new(Position::derive(&parent, Square::A7, Square::A8));
        assert_eq!(
            child.at(Square::A8),
            Some(Piece::new(Player::White, PieceKind::Queen))
        );
        let child = Arc::new(Position::derive_promoting(
            &parent,
            Square::A7,
            Square::A8,
            PieceKind::Knight,
        ));
        assert_eq!(
            child.at(Square::A8),
            Some(Piece::new(Player::White, PieceKind::Knight))
        );
    }

    #[test]
    fn derive_clears_castling_rights() {
        let parent =
            Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        // King move loses both rights.
        let child = Arc::new(Position::derive(&parent, Square::E1, Square::E2));
        assert_eq!(child.castling_rook(Player::White, CastlingSide::Queenside), None);
        assert_eq!(child.castling_rook(Player::White, CastlingSide::Kingside), None);
        assert_eq!(child.castling_rook(Player::Black, CastlingSide::Kingside), Some(Square::H8));
        // Rook move loses that side only.
        let child = Arc::new(Position::derive(&parent, Square::A1, Square::A5));
        assert_eq!(child.castling_rook(Player::White, CastlingSide::Queenside), None);
        assert_eq!(child.castling_rook(Player::White, CastlingSide::Kingside), Some(Square::H1));
        // Capturing a rook loses the right of the captured side.
        let child = Arc::new(Position::derive(&parent, Square::A1, Square::A8));
        assert_eq!(child.castling_rook(Player::White, CastlingSide::Queenside), None);
        assert_eq!(child.castling_rook(Player::Black, CastlingSide::Queenside), None);
        assert_eq!(child.castling_rook(Player::Black, CastlingSide::Kingside), Some(Square::H8));
    }

    #[test]
    fn derive_pair_castles() {
        let parent =
            Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let child = Arc::new(Position::derive_pair(
            &parent,
            Square::E1,
            Square::G1,
            Square::H1,
            Square::F1,
        ));
        assert_eq!(
            child.at(Square::G1),
            Some(Piece::new(Player::White, PieceKind::King))
        );
        assert_eq!(
            child.at(Square::F1),
            Some(Piece::new(Player::White, PieceKind::Rook))
        );
        assert_eq!(child.at(Square::E1), None);
        assert_eq!(child.at(Square::H1), None);
        assert_eq!(child.king(Player::White), Square::G1);
        assert_eq!(child.castling_rook(Player::White, CastlingSide::Kingside), None);
        assert_eq!(child.castling_rook(Player::White, CastlingSide::Queenside), None);
    }

    #[test]
    #[should_panic(expected = "derivation from an empty square")]
    fn derive_from_empty_square() {
        let parent = Position::starting();
        let _ = Position::derive(&parent, Square::E4, Square::E5);
    }

    #[test]
    fn constructed_counter_grows() {
        let before = positions_constructed();
        let parent = Position::starting();
        let _child = Position::derive(&parent, Square::E2, Square::E3);
        assert!(positions_constructed() >= before + 2);
    }
}
