//! The analysis handle: binds one position to its lazily computed move
//! engine products (successor list, attack maps, check flag) and to the
//! evaluator.
//!
//! A search driver creates one handle per visited position, asks it for
//! successors and scores, descends into the chosen child and then calls
//! [`Analysis::prune_to`] to release every branch it did not take. Handles
//! are confined to one thread each (the lazy cell is deliberately not
//! `Sync`); the positions they share are immutable and travel freely across
//! threads.

use std::cell::OnceCell;
use std::sync::Arc;

use crate::chess::core::Player;
use crate::chess::movegen::{self, AttackMap, Generated};
use crate::chess::position::Position;
use crate::evaluation::{self, GamePhase, Weight, Weights};

/// Lazy analysis of a single position.
pub struct Analysis {
    position: Arc<Position>,
    weights: Weights,
    products: OnceCell<Generated>,
}

impl Analysis {
    /// Creates a handle with the default weights. The move engine is not
    /// invoked until the first query.
    #[must_use]
    pub fn new(position: Arc<Position>) -> Self {
        Self::with_weights(position, Weights::default())
    }

    /// Creates a handle with a custom weight configuration, which governs
    /// both evaluation and move generation (promotion default, successor
    /// ordering scale).
    #[must_use]
    pub fn with_weights(position: Arc<Position>, weights: Weights) -> Self {
        Self {
            position,
            weights,
            products: OnceCell::new(),
        }
    }

    fn products(&self) -> &Generated {
        self.products
            .get_or_init(|| movegen::analyse(&self.position, &self.weights))
    }

    /// The position under analysis.
    #[must_use]
    pub fn position(&self) -> &Arc<Position> {
        &self.position
    }

    /// The legal successors, ordered by ascending material balance.
    /// Computed on first access, cached afterwards.
    #[must_use]
    pub fn successors(&self) -> &[Arc<Position>] {
        &self.products().successors
    }

    /// The attack map of the given colour: per square, how many pieces of
    /// that colour attack or defend it.
    #[must_use]
    pub fn attacks(&self, colour: Player) -> &AttackMap {
        &self.products().attacks[colour.ix()]
    }

    /// Whether the side to move is in check.
    #[must_use]
    pub fn is_check(&self) -> bool {
        self.products().check
    }

    /// Whether the side to move is checkmated: in check with no legal
    /// successor.
    #[must_use]
    pub fn is_checkmate(&self) -> bool {
        let products = self.products();
        products.check && products.successors.is_empty()
    }

    /// Whether the side to move is stalemated: no legal successor without
    /// being in check.
    #[must_use]
    pub fn is_stalemate(&self) -> bool {
        let products = self.products();
        !products.check && products.successors.is_empty()
    }

    /// Scores the position, positive favouring White. Checkmate collapses
    /// into the terminal value; otherwise material, attack/defence pressure
    /// and centre control are summed. The term breakdown is emitted on the
    /// `tracing` debug level.
    #[must_use]
    pub fn evaluate(&self) -> Weight {
        let products = self.products();
        let checkmate = products.check && products.successors.is_empty();
        evaluation::evaluate(&self.position, &products.attacks, checkmate, &self.weights)
    }

    /// The material term alone. This is also the key the successor order
    /// is based on.
    #[must_use]
    pub fn material_weight(&self) -> Weight {
        evaluation::material_term(&self.position, &self.weights)
    }

    /// The phase of the game, derived from the officer count.
    #[must_use]
    pub fn game_phase(&self) -> GamePhase {
        evaluation::game_phase(&self.position)
    }

    /// The optional king-position term for the given phase. Not part of
    /// [`Analysis::evaluate`]; a search driver may add it on top.
    #[must_use]
    pub fn king_position_weight(&self, phase: GamePhase) -> Weight {
        evaluation::king_position_weight(&self.position, &self.products().attacks, phase)
    }

    /// Releases every successor except `chosen`, which becomes the sole
    /// entry of the successor list. Dropping the siblings transitively
    /// frees the branches behind them; this is how a search reclaims the
    /// tree after committing to a move. A handle that never computed its
    /// successors has nothing to release.
    ///
    /// # Panics
    ///
    /// Panics if `chosen` is not one of the computed successors.
    pub fn prune_to(&mut self, chosen: &Arc<Position>) {
        let Some(products) = self.products.get_mut() else {
            return;
        };
        products
            .successors
            .retain(|child| Arc::ptr_eq(child, chosen));
        assert_eq!(
            products.successors.len(),
            1,
            "prune_to requires a successor of this very position"
        );
        products.successors.shrink_to_fit();
    }
}
