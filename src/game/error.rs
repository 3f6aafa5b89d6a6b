//! Error types for the rules engine and the game session.

use thiserror::Error;

use crate::game::rules::Move;

/// A move that cannot be played in the current position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalMoveError {
    #[error("invalid square {square:?} in move {mv}")]
    InvalidSquare { square: String, mv: Move },

    #[error("invalid promotion piece {piece:?} in move {mv}")]
    InvalidPromotion { piece: String, mv: Move },

    #[error("move {mv} is not legal in this position")]
    NotLegal { mv: Move },
}

/// A canonical position encoding that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPositionError {
    #[error("expected 6 fields in position encoding, found {found}")]
    FieldCount { found: usize },

    #[error("invalid {field} counter {value:?}")]
    Counter { field: &'static str, value: String },

    #[error("rejected board {fen:?}: {reason}")]
    Board { fen: String, reason: String },
}

/// Why the session refused a move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// The sender does not hold the seat of the side to move.
    #[error("not your turn")]
    NotYourTurn,

    #[error(transparent)]
    Illegal(#[from] IllegalMoveError),

    /// The game already reached a terminal status and awaits a reset.
    #[error("game is over")]
    GameOver,
}
