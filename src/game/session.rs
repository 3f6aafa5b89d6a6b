//! The single authoritative game: board, seat assignment and turn
//! authorization. Transport-agnostic; the gateway actor owns one instance.

use std::collections::HashMap;
use std::fmt;

use chess::Color;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::error::{MalformedPositionError, RejectReason};
use crate::game::rules::{self, Game, GameStatus, Move};

/// Opaque identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        ConnectionId(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        ConnectionId::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
    #[serde(rename = "spectator")]
    Spectator,
}

impl Role {
    fn for_color(color: Color) -> Self {
        match color {
            Color::White => Role::White,
            Color::Black => Role::Black,
        }
    }

    /// Display name handed to whoever takes this seat.
    fn seat_name(self) -> Option<&'static str> {
        match self {
            Role::White => Some("Player 1"),
            Role::Black => Some("Player 2"),
            Role::Spectator => None,
        }
    }
}

/// Which seats are taken. Serialised as the `status` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub player1: bool,
    pub player2: bool,
}

impl Occupancy {
    pub fn is_full(&self) -> bool {
        self.player1 && self.player2
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub role: Role,
    pub name: Option<String>,
    /// This join is the one that filled the second seat.
    pub seats_filled: bool,
}

/// Terminal status of the game after a move, plus the winner's name for
/// checkmate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOutcome {
    pub status: GameStatus,
    pub winner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub applied_move: Move,
    pub position: String,
    pub outcome: GameOutcome,
}

pub struct GameSession {
    game: Game,
    roles: HashMap<ConnectionId, Role>,
    names: HashMap<ConnectionId, String>,
}

impl Default for GameSession {
    fn default() -> Self {
        GameSession::new()
    }
}

impl GameSession {
    pub fn new() -> Self {
        GameSession {
            game: Game::new(),
            roles: HashMap::new(),
            names: HashMap::new(),
        }
    }

    fn holder(&self, role: Role) -> Option<ConnectionId> {
        self.roles
            .iter()
            .find(|(_, r)| **r == role)
            .map(|(id, _)| *id)
    }

    pub fn role_of(&self, id: &ConnectionId) -> Option<Role> {
        self.roles.get(id).copied()
    }

    pub fn name_of(&self, id: &ConnectionId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn occupancy(&self) -> Occupancy {
        Occupancy {
            player1: self.holder(Role::White).is_some(),
            player2: self.holder(Role::Black).is_some(),
        }
    }

    pub fn board_state(&self) -> String {
        self.game.fen()
    }

    pub fn status(&self) -> GameStatus {
        self.game.status()
    }

    /// Seats `id` as white, else black, else spectator. Joining twice keeps
    /// the first assignment.
    pub fn join(&mut self, id: ConnectionId) -> JoinOutcome {
        if let Some(role) = self.role_of(&id) {
            debug!("Connection {} already joined as {:?}", id, role);
            return JoinOutcome {
                role,
                name: self.names.get(&id).cloned(),
                seats_filled: false,
            };
        }

        let was_full = self.occupancy().is_full();
        let role = if self.holder(Role::White).is_none() {
            Role::White
        } else if self.holder(Role::Black).is_none() {
            Role::Black
        } else {
            Role::Spectator
        };

        self.roles.insert(id, role);
        let name = role.seat_name().map(str::to_string);
        if let Some(name) = &name {
            self.names.insert(id, name.clone());
        }
        info!("Connection {} joined as {:?}", id, role);

        JoinOutcome {
            role,
            name,
            seats_filled: !was_full && self.occupancy().is_full(),
        }
    }

    /// Drops `id`. Returns the new occupancy if a seat was vacated; a
    /// spectator leaving changes nothing observable. The board is kept.
    pub fn leave(&mut self, id: &ConnectionId) -> Option<Occupancy> {
        let role = self.roles.remove(id)?;
        self.names.remove(id);
        match role {
            Role::Spectator => {
                debug!("Spectator {} left", id);
                None
            }
            Role::White | Role::Black => {
                info!("Connection {} vacated the {:?} seat", id, role);
                Some(self.occupancy())
            }
        }
    }

    pub fn attempt_move(
        &mut self,
        id: &ConnectionId,
        mv: &Move,
    ) -> Result<MoveOutcome, RejectReason> {
        let mover = Role::for_color(self.game.position().side_to_move());
        if self.holder(mover) != Some(*id) {
            debug!("Connection {} tried {} out of turn", id, mv);
            return Err(RejectReason::NotYourTurn);
        }

        if self.game.status().is_terminal() {
            debug!("Connection {} tried {} after the game ended", id, mv);
            return Err(RejectReason::GameOver);
        }

        let applied_move = self.game.play(mv).map_err(|e| {
            debug!("Rejected move from {}: {}", id, e);
            RejectReason::Illegal(e)
        })?;

        let status = self.game.status();
        // The side that just moved delivered the mate.
        let winner = match status {
            GameStatus::Checkmate => self.names.get(id).cloned(),
            _ => None,
        };
        if status.is_terminal() {
            info!("Game over: {:?}, winner {:?}", status, winner);
        }

        Ok(MoveOutcome {
            applied_move,
            position: self.game.fen(),
            outcome: GameOutcome { status, winner },
        })
    }

    /// Back to the standard start position. Seats and names stay.
    pub fn reset(&mut self) -> String {
        self.game = Game::new();
        info!("Game reset");
        self.game.fen()
    }

    /// Replaces the board with `encoding`. On failure the board is untouched.
    pub fn load_position(&mut self, encoding: &str) -> Result<String, MalformedPositionError> {
        let position = rules::deserialize(encoding).map_err(|e| {
            warn!("Could not load position {:?}: {}", encoding, e);
            e
        })?;
        self.game = Game::from_position(position);
        info!("Loaded position {}", encoding);
        Ok(self.game.fen())
    }

    pub fn legal_moves(&self, square: &str) -> Vec<Move> {
        rules::legal_moves(self.game.position(), square)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::STARTING_FEN;

    fn seated() -> (GameSession, ConnectionId, ConnectionId) {
        let mut session = GameSession::new();
        let white = ConnectionId::new();
        let black = ConnectionId::new();
        session.join(white);
        session.join(black);
        (session, white, black)
    }

    #[test]
    fn seats_fill_in_order() {
        let mut session = GameSession::new();
        let a = session.join(ConnectionId::new());
        assert_eq!(a.role, Role::White);
        assert_eq!(a.name.as_deref(), Some("Player 1"));
        assert!(!a.seats_filled);

        let b = session.join(ConnectionId::new());
        assert_eq!(b.role, Role::Black);
        assert_eq!(b.name.as_deref(), Some("Player 2"));
        assert!(b.seats_filled);

        let c = session.join(ConnectionId::new());
        assert_eq!(c.role, Role::Spectator);
        assert_eq!(c.name, None);
        assert!(!c.seats_filled);
    }

    #[test]
    fn rejoining_keeps_the_role() {
        let (mut session, white, _) = seated();
        let again = session.join(white);
        assert_eq!(again.role, Role::White);
        assert!(!again.seats_filled);
    }

    #[test]
    fn vacated_seat_goes_to_the_next_joiner() {
        let (mut session, white, black) = seated();
        let spectator = ConnectionId::new();
        session.join(spectator);

        assert_eq!(
            session.leave(&white),
            Some(Occupancy {
                player1: false,
                player2: true
            })
        );
        assert_eq!(session.name_of(&white), None);

        let newcomer = session.join(ConnectionId::new());
        assert_eq!(newcomer.role, Role::White);
        assert_eq!(newcomer.name.as_deref(), Some("Player 1"));
        assert!(newcomer.seats_filled);
        assert_eq!(session.role_of(&black), Some(Role::Black));
        assert_eq!(session.role_of(&spectator), Some(Role::Spectator));
    }

    #[test]
    fn spectator_leaving_is_silent() {
        let (mut session, _, _) = seated();
        let spectator = ConnectionId::new();
        session.join(spectator);
        assert_eq!(session.leave(&spectator), None);
        assert_eq!(session.leave(&ConnectionId::new()), None);
        assert!(session.occupancy().is_full());
    }

    #[test]
    fn leaving_does_not_reset_the_board() {
        let (mut session, white, _) = seated();
        session.attempt_move(&white, &Move::new("e2", "e4")).unwrap();
        let before = session.board_state();
        session.leave(&white);
        assert_eq!(session.board_state(), before);
    }

    #[test]
    fn accepted_move_reports_new_position() {
        let (mut session, white, _) = seated();
        let outcome = session.attempt_move(&white, &Move::new("e2", "e4")).unwrap();
        assert_eq!(outcome.applied_move, Move::new("e2", "e4"));
        assert_eq!(
            outcome.position,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
        assert_eq!(outcome.outcome.status, GameStatus::Ongoing);
        assert_eq!(outcome.outcome.winner, None);
    }

    #[test]
    fn out_of_turn_moves_are_rejected() {
        let (mut session, white, black) = seated();
        let spectator = ConnectionId::new();
        session.join(spectator);

        assert_eq!(
            session.attempt_move(&black, &Move::new("e7", "e5")),
            Err(RejectReason::NotYourTurn)
        );
        assert_eq!(
            session.attempt_move(&spectator, &Move::new("e2", "e4")),
            Err(RejectReason::NotYourTurn)
        );
        assert_eq!(session.board_state(), STARTING_FEN);

        session.attempt_move(&white, &Move::new("e2", "e4")).unwrap();
        let after_first = session.board_state();
        assert_eq!(
            session.attempt_move(&white, &Move::new("d2", "d4")),
            Err(RejectReason::NotYourTurn)
        );
        assert_eq!(session.board_state(), after_first);
    }

    #[test]
    fn empty_seat_cannot_be_moved_for() {
        let mut session = GameSession::new();
        let white = ConnectionId::new();
        session.join(white);
        session.attempt_move(&white, &Move::new("e2", "e4")).unwrap();
        assert_eq!(
            session.attempt_move(&white, &Move::new("e7", "e5")),
            Err(RejectReason::NotYourTurn)
        );
    }

    #[test]
    fn illegal_and_malformed_moves_leave_the_board_alone() {
        let (mut session, white, _) = seated();
        for mv in [
            Move::new("e2", "e5"),
            Move::new("", "e4"),
            Move::new("e2", "zz"),
            Move::new("e2", "e4").with_promotion("king"),
        ] {
            assert!(matches!(
                session.attempt_move(&white, &mv),
                Err(RejectReason::Illegal(_))
            ));
            assert_eq!(session.board_state(), STARTING_FEN);
        }
    }

    #[test]
    fn checkmate_credits_the_mover() {
        let (mut session, white, black) = seated();
        session.attempt_move(&white, &Move::new("f2", "f3")).unwrap();
        session.attempt_move(&black, &Move::new("e7", "e5")).unwrap();
        session.attempt_move(&white, &Move::new("g2", "g4")).unwrap();
        let outcome = session.attempt_move(&black, &Move::new("d8", "h4")).unwrap();

        assert_eq!(outcome.outcome.status, GameStatus::Checkmate);
        assert_eq!(outcome.outcome.winner.as_deref(), Some("Player 2"));

        let mated = session.board_state();
        assert_eq!(
            session.attempt_move(&white, &Move::new("a2", "a3")),
            Err(RejectReason::GameOver)
        );
        assert_eq!(session.board_state(), mated);
    }

    #[test]
    fn draws_have_no_winner_and_end_the_game() {
        let (mut session, white, black) = seated();
        session
            .load_position("8/8/4k3/8/3p4/3KB3/8/8 w - - 0 1")
            .unwrap();
        let outcome = session.attempt_move(&white, &Move::new("e3", "d4")).unwrap();
        assert_eq!(outcome.outcome.status, GameStatus::InsufficientMaterial);
        assert_eq!(outcome.outcome.winner, None);
        assert_eq!(
            session.attempt_move(&black, &Move::new("e6", "e7")),
            Err(RejectReason::GameOver)
        );
    }

    #[test]
    fn reset_keeps_seats_and_is_idempotent() {
        let (mut session, white, black) = seated();
        session.attempt_move(&white, &Move::new("e2", "e4")).unwrap();

        let first = session.reset();
        let second = session.reset();
        assert_eq!(first, STARTING_FEN);
        assert_eq!(first, second);
        assert_eq!(session.role_of(&white), Some(Role::White));
        assert_eq!(session.role_of(&black), Some(Role::Black));
        assert_eq!(session.name_of(&black), Some("Player 2"));
    }

    #[test]
    fn reset_clears_a_finished_game() {
        let (mut session, white, black) = seated();
        for (id, from, to) in [
            (white, "f2", "f3"),
            (black, "e7", "e5"),
            (white, "g2", "g4"),
            (black, "d8", "h4"),
        ] {
            session.attempt_move(&id, &Move::new(from, to)).unwrap();
        }
        session.reset();
        assert!(session.attempt_move(&white, &Move::new("e2", "e4")).is_ok());
    }

    #[test]
    fn malformed_load_is_ignored() {
        let (mut session, white, _) = seated();
        session.attempt_move(&white, &Move::new("e2", "e4")).unwrap();
        let before = session.board_state();
        assert!(session.load_position("garbage").is_err());
        assert_eq!(session.board_state(), before);
    }

    #[test]
    fn legal_move_preview() {
        let session = GameSession::new();
        assert_eq!(session.legal_moves("b1").len(), 2);
        assert!(session.legal_moves("b8").is_empty());
    }
}
