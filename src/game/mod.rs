pub mod error;
pub mod rules;
pub mod session;
pub mod utils;

// Re-export important types
pub use error::{IllegalMoveError, MalformedPositionError, RejectReason};
pub use rules::{Game, GameStatus, Move, Position, STARTING_FEN};
pub use session::{ConnectionId, GameOutcome, GameSession, JoinOutcome, MoveOutcome, Occupancy, Role};
