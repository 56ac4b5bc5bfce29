//! Weight constants of the evaluator and their load-time overrides.
//!
//! The defaults reproduce the engine's tuned values; a caller may replace
//! any subset of them by feeding a TOML fragment to
//! [`Weights::from_toml_str`], e.g. to experiment with a more aggressive
//! attack multiplier without rebuilding.

use anyhow::{bail, Context};
use serde::Deserialize;

use super::Weight;
use crate::chess::core::{PieceKind, Square, BOARD_SIZE};

/// Per-square weights of the centre-control term: higher towards the
/// centre, with a band of useful squares around it. Indexed by
/// [`Square::ix`]; the table is symmetric under vertical mirroring, which
/// the evaluation antisymmetry relies on.
#[rustfmt::skip]
const CENTRE_TABLE: [Weight; BOARD_SIZE as usize] = [
    3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3,
    2, 2, 7, 7, 7, 7, 2, 2,
    1, 4, 6, 8, 8, 6, 4, 1,
    1, 4, 6, 8, 8, 6, 4, 1,
    2, 2, 7, 7, 7, 7, 2, 2,
    3, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3,
];

/// The complete set of evaluator tunables.
#[derive(Clone, Debug)]
pub struct Weights {
    /// Material weight of a pawn.
    pub pawn: Weight,
    /// Material weight of a knight.
    pub knight: Weight,
    /// Material weight of a bishop.
    pub bishop: Weight,
    /// Material weight of a rook.
    pub rook: Weight,
    /// Material weight of a queen.
    pub queen: Weight,
    /// Terminal value of a checkmate; dominates every material total.
    pub checkmate: Weight,
    /// Scales the material term.
    pub piece_present_mult: Weight,
    /// Scales contributions of pieces dominated by the opponent.
    pub piece_attack_mult: Weight,
    /// Scales contributions of pieces dominated by their owner.
    pub piece_defence_mult: Weight,
    /// Scales the centre-control term.
    pub centre_cell_mult: Weight,
    /// Per-square centre-control weights.
    pub centre_table: [Weight; BOARD_SIZE as usize],
    /// The piece a pawn becomes on the back rank in every successor the
    /// move engine generates. Direct factory derivations keep their own
    /// queen default unless told otherwise.
    pub promotion_default: PieceKind,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            pawn: PieceKind::Pawn.weight(),
            knight: PieceKind::Knight.weight(),
            bishop: PieceKind::Bishop.weight(),
            rook: PieceKind::Rook.weight(),
            queen: PieceKind::Queen.weight(),
            checkmate: 1_000_000_000,
            piece_present_mult: 1_000,
            piece_attack_mult: 500,
            piece_defence_mult: 250,
            centre_cell_mult: 300,
            centre_table: CENTRE_TABLE,
            promotion_default: PieceKind::Queen,
        }
    }
}

impl Weights {
    /// Material weight of a piece kind under this configuration. Kings are
    /// terminal, not tradable, and weigh nothing.
    #[must_use]
    pub const fn piece(&self, kind: PieceKind) -> Weight {
        match kind {
            PieceKind::King => 0,
            PieceKind::Queen => self.queen,
            PieceKind::Rook => self.rook,
            PieceKind::Bishop => self.bishop,
            PieceKind::Knight => self.knight,
            PieceKind::Pawn => self.pawn,
        }
    }

    /// Centre-control weight of one square.
    #[must_use]
    pub const fn centre(&self, square: Square) -> Weight {
        self.centre_table[square.ix()]
    }

    /// Applies a TOML fragment of overrides on top of the defaults. Every
    /// field is optional; `centre_table` must list all 64 squares when
    /// present.
    ///
    /// ```
    /// use castellan::evaluation::Weights;
    ///
    /// let weights = Weights::from_toml_str("queen = 1000\npiece_attack_mult = 600\n").unwrap();
    /// assert_eq!(weights.queen, 1000);
    /// assert_eq!(weights.pawn, Weights::default().pawn);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error for syntactically invalid TOML, unknown fields, a
    /// mis-sized centre table or an unknown promotion piece.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let overrides: Overrides =
            toml::from_str(text).context("malformed evaluation weight overrides")?;
        let mut weights = Self::default();
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = overrides.$field {
                    weights.$field = value;
                })*
            };
        }
        apply!(
            pawn,
            knight,
            bishop,
            rook,
            queen,
            checkmate,
            piece_present_mult,
            piece_attack_mult,
            piece_defence_mult,
            centre_cell_mult
        );
        if let Some(table) = overrides.centre_table {
            let cells: &[Weight; BOARD_SIZE as usize] = table
                .as_slice()
                .try_into()
                .map_err(|_| anyhow::anyhow!(
                    "centre_table must have {BOARD_SIZE} cells, got {}",
                    table.len()
                ))?;
            weights.centre_table = *cells;
        }
        if let Some(symbol) = overrides.promotion_default {
            weights.promotion_default = match symbol {
                'q' => PieceKind::Queen,
                'r' => PieceKind::Rook,
                'b' => PieceKind::Bishop,
                'n' => PieceKind::Knight,
                _ => bail!("unknown promotion piece: expected one of \"qrbn\", got '{symbol}'"),
            };
        }
        Ok(weights)
    }
}

/// Raw deserialization target: all fields optional so a fragment can
/// override any subset.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Overrides {
    pawn: Option<Weight>,
    knight: Option<Weight>,
    bishop: Option<Weight>,
    rook: Option<Weight>,
    queen: Option<Weight>,
    checkmate: Option<Weight>,
    piece_present_mult: Option<Weight>,
    piece_attack_mult: Option<Weight>,
    piece_defence_mult: Option<Weight>,
    centre_cell_mult: Option<Weight>,
    centre_table: Option<Vec<Weight>>,
    promotion_default: Option<char>,
}
