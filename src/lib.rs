//! Position-analysis core of a chess engine.
//!
//! The crate does three things, and deliberately nothing else:
//!
//! - enumerates all legal successor positions of a given [`Position`],
//! - derives per-square attack/defence maps for both colours,
//! - computes a scalar heuristic evaluation consumed by an upstream search.
//!
//! Positions are immutable once built and shared through [`std::sync::Arc`]:
//! every child keeps a strong back-link to its parent, so an entire line of
//! play stays alive for as long as any descendant is referenced. The
//! search-facing entry point is [`analysis::Analysis`], which binds one
//! position to its lazily computed successor list, attack maps and
//! evaluation.
//!
//! Search drivers, UCI plumbing and front-ends live elsewhere; the only
//! textual format this crate understands is FEN.
//!
//! [`Position`]: chess::position::Position

pub mod analysis;
pub mod chess;
pub mod evaluation;
