use actix::Message;
use serde::{Deserialize, Serialize};

use crate::game::{Move, Occupancy, Role};

/// Event sent from client to server.
///
/// Frames look like `{"event": "move", "data": {"from": "e2", "to": "e4"}}`;
/// `data` is left out for events without a payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Move(Move),
    ResetGame,
    RequestBoardState,
    LegalMoves { square: String },
}

/// Event sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    PlayerRole { role: Role, player: String },
    SpectatorRole,
    Status(Occupancy),
    Move(Move),
    BoardState(String),
    InvalidMove(Move),
    GameOver {
        winner: Option<String>,
        reason: String,
    },
    LegalMoves { square: String, moves: Vec<Move> },
    Error { message: String },
}

impl ServerEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Serialized frame delivered to one WebSocket connection
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct ChessWebSocketMessage(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_events_parse_from_frames() {
        let mv: ClientEvent =
            serde_json::from_str(r#"{"event":"move","data":{"from":"e2","to":"e4"}}"#).unwrap();
        assert_eq!(mv, ClientEvent::Move(Move::new("e2", "e4")));

        let promo: ClientEvent = serde_json::from_str(
            r#"{"event":"move","data":{"from":"a7","to":"a8","promotion":"q"}}"#,
        )
        .unwrap();
        assert_eq!(
            promo,
            ClientEvent::Move(Move::new("a7", "a8").with_promotion("q"))
        );

        let reset: ClientEvent = serde_json::from_str(r#"{"event":"resetGame"}"#).unwrap();
        assert_eq!(reset, ClientEvent::ResetGame);

        let preview: ClientEvent =
            serde_json::from_str(r#"{"event":"legalMoves","data":{"square":"g1"}}"#).unwrap();
        assert_eq!(
            preview,
            ClientEvent::LegalMoves {
                square: "g1".to_string()
            }
        );
    }

    #[test]
    fn unknown_or_broken_frames_fail_to_parse() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"castle"}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"move","data":{"from":"e2"}}"#).is_err());
        assert!(serde_json::from_str::<ClientEvent>("not json").is_err());
    }

    #[test]
    fn server_events_use_the_wire_shapes() {
        let role = ServerEvent::PlayerRole {
            role: Role::Black,
            player: "Player 2".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&role).unwrap(),
            json!({"event": "playerRole", "data": {"role": "b", "player": "Player 2"}})
        );

        let status = ServerEvent::Status(Occupancy {
            player1: true,
            player2: false,
        });
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"event": "status", "data": {"player1": true, "player2": false}})
        );

        let draw = ServerEvent::GameOver {
            winner: None,
            reason: "stalemate".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&draw).unwrap(),
            json!({"event": "gameOver", "data": {"winner": null, "reason": "stalemate"}})
        );

        assert_eq!(
            serde_json::to_value(ServerEvent::SpectatorRole).unwrap(),
            json!({"event": "spectatorRole"})
        );
    }
}
