//! Static movement templates: per-piece descriptions of how a piece may
//! move, expressed as families of rays.
//!
//! A ray family is a (file-delta, rank-delta) direction plus a flag saying
//! whether the piece slides along it until blocked or takes a single step.
//! Knights, bishops, rooks, queens and kings move the same way whether or not
//! they capture, so a single "uniform" family list covers every move. Pawns
//! are the exception: pushes go straight forward onto empty squares only,
//! captures go diagonally forward, and the two lists must be walked with
//! different rules.
//!
//! The tables are process-wide constants, built at compile time and never
//! mutated.

use super::core::{Piece, PieceKind, Player};

/// One ray family of a movement template.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ray {
    /// File delta of a single step.
    pub dx: i8,
    /// Rank delta of a single step.
    pub dy: i8,
    /// Whether the ray continues until blocked (`true`) or stops after one
    /// step (`false`).
    pub sliding: bool,
}

impl Ray {
    const fn step(dx: i8, dy: i8) -> Self {
        Self {
            dx,
            dy,
            sliding: false,
        }
    }

    const fn slide(dx: i8, dy: i8) -> Self {
        Self {
            dx,
            dy,
            sliding: true,
        }
    }
}

static KNIGHT: [Ray; 8] = [
    Ray::step(1, 2),
    Ray::step(2, 1),
    Ray::step(2, -1),
    Ray::step(1, -2),
    Ray::step(-1, -2),
    Ray::step(-2, -1),
    Ray::step(-2, 1),
    Ray::step(-1, 2),
];

static BISHOP: [Ray; 4] = [
    Ray::slide(1, 1),
    Ray::slide(1, -1),
    Ray::slide(-1, -1),
    Ray::slide(-1, 1),
];

static ROOK: [Ray; 4] = [
    Ray::slide(0, 1),
    Ray::slide(1, 0),
    Ray::slide(0, -1),
    Ray::slide(-1, 0),
];

// The queen's template is the union of the bishop's and the rook's.
static QUEEN: [Ray; 8] = [
    Ray::slide(1, 1),
    Ray::slide(1, -1),
    Ray::slide(-1, -1),
    Ray::slide(-1, 1),
    Ray::slide(0, 1),
    Ray::slide(1, 0),
    Ray::slide(0, -1),
    Ray::slide(-1, 0),
];

static KING: [Ray; 8] = [
    Ray::step(1, 1),
    Ray::step(1, 0),
    Ray::step(1, -1),
    Ray::step(0, -1),
    Ray::step(-1, -1),
    Ray::step(-1, 0),
    Ray::step(-1, 1),
    Ray::step(0, 1),
];

static WHITE_PAWN_PUSH: [Ray; 1] = [Ray::step(0, 1)];
static WHITE_PAWN_TAKE: [Ray; 2] = [Ray::step(-1, 1), Ray::step(1, 1)];
static BLACK_PAWN_PUSH: [Ray; 1] = [Ray::step(0, -1)];
static BLACK_PAWN_TAKE: [Ray; 2] = [Ray::step(-1, -1), Ray::step(1, -1)];

/// The movement template of one piece: either a single family list used for
/// every move, or a split list for pieces whose quiet moves and captures
/// differ (pawns).
#[derive(Copy, Clone, Debug)]
pub enum TemplateSet {
    /// Captures and quiet moves follow the same rays.
    Uniform(&'static [Ray]),
    /// Quiet moves (`push`) and captures/threats (`take`) follow different
    /// rays.
    Split {
        /// Rays used when capturing or threatening a square.
        take: &'static [Ray],
        /// Rays used only towards empty squares.
        push: &'static [Ray],
    },
}

impl TemplateSet {
    /// Looks up the template of a piece. Pawn direction depends on colour.
    #[must_use]
    pub fn of(piece: Piece) -> Self {
        match piece.kind {
            PieceKind::Knight => Self::Uniform(&KNIGHT),
            PieceKind::Bishop => Self::Uniform(&BISHOP),
            PieceKind::Rook => Self::Uniform(&ROOK),
            PieceKind::Queen => Self::Uniform(&QUEEN),
            PieceKind::King => Self::Uniform(&KING),
            PieceKind::Pawn => match piece.owner {
                Player::White => Self::Split {
                    take: &WHITE_PAWN_TAKE,
                    push: &WHITE_PAWN_PUSH,
                },
                Player::Black => Self::Split {
                    take: &BLACK_PAWN_TAKE,
                    push: &BLACK_PAWN_PUSH,
                },
            },
        }
    }

    /// Rays that attack or defend squares: the full list for uniform movers,
    /// the take list for pawns. Used by attack scans, which do not care about
    /// quiet pawn pushes.
    #[must_use]
    pub fn take_rays(self) -> &'static [Ray] {
        match self {
            Self::Uniform(rays) => rays,
            Self::Split { take, .. } => take,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::chess::core::{Piece, PieceKind, Player};

    #[test]
    fn ray_counts() {
        for (kind, count) in [
            (PieceKind::Knight, 8),
            (PieceKind::Bishop, 4),
            (PieceKind::Rook, 4),
            (PieceKind::Queen, 8),
            (PieceKind::King, 8),
        ] {
            match TemplateSet::of(Piece::new(Player::White, kind)) {
                TemplateSet::Uniform(rays) => assert_eq!(rays.len(), count, "{kind:?}"),
                TemplateSet::Split { .. } => panic!("{kind:?} should have a uniform template"),
            }
        }
    }

    #[test]
    fn sliding() {
        let uniform = |kind| match TemplateSet::of(Piece::new(Player::White, kind)) {
            TemplateSet::Uniform(rays) => rays,
            TemplateSet::Split { .. } => unreachable!(),
        };
        assert!(uniform(PieceKind::Bishop).iter().all(|ray| ray.sliding));
        assert!(uniform(PieceKind::Rook).iter().all(|ray| ray.sliding));
        assert!(uniform(PieceKind::Queen).iter().all(|ray| ray.sliding));
        assert!(uniform(PieceKind::Knight).iter().all(|ray| !ray.sliding));
        assert!(uniform(PieceKind::King).iter().all(|ray| !ray.sliding));
    }

    #[test]
    fn pawns_are_mirrored() {
        let (white, black) = (
            TemplateSet::of(Piece::new(Player::White, PieceKind::Pawn)),
            TemplateSet::of(Piece::new(Player::Black, PieceKind::Pawn)),
        );
        let (TemplateSet::Split { take: wt, push: wp }, TemplateSet::Split { take: bt, push: bp }) =
            (white, black)
        else {
            panic!("pawns should have split templates");
        };
        assert_eq!(wp.len(), 1);
        assert_eq!(wt.len(), 2);
        for (w, b) in wp.iter().zip(bp).chain(wt.iter().zip(bt)) {
            assert_eq!(w.dx, b.dx);
            assert_eq!(w.dy, -b.dy);
        }
        // Pushes head straight up the file, takes move diagonally.
        assert!(wp.iter().all(|ray| ray.dx == 0 && ray.dy == 1));
        assert!(wt.iter().all(|ray| ray.dx != 0 && ray.dy == 1));
    }
}
