//! Broadcast gateway: one actor owns the game session, so its mailbox is the
//! only place session state is ever touched. Connections talk to it through
//! `Connect`, `Disconnect` and `ClientMessage`.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use actix::prelude::*;
use log::{debug, error, info, warn};

use crate::game::{ConnectionId, GameSession, Move, RejectReason, Role};
use crate::models::{ChessWebSocketMessage, ClientEvent, ServerEvent};

/// A new connection, with the address its frames are delivered to.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub id: ConnectionId,
    pub addr: Recipient<ChessWebSocketMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: ConnectionId,
}

/// An intent received from a connection.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ClientMessage {
    pub id: ConnectionId,
    pub event: ClientEvent,
}

pub struct GameServer {
    session: GameSession,
    connections: HashMap<ConnectionId, Recipient<ChessWebSocketMessage>>,
}

impl GameServer {
    pub fn new(session: GameSession) -> Self {
        GameServer {
            session,
            connections: HashMap::new(),
        }
    }

    fn send_to(&self, id: &ConnectionId, event: &ServerEvent) {
        let Some(addr) = self.connections.get(id) else {
            debug!("Connection {} is gone, dropping {:?}", id, event);
            return;
        };
        match event.to_json() {
            Ok(frame) => addr.do_send(ChessWebSocketMessage(frame)),
            Err(e) => error!("Failed to serialize {:?}: {}", event, e),
        }
    }

    fn broadcast(&self, event: &ServerEvent) {
        let frame = match event.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize {:?}: {}", event, e);
                return;
            }
        };
        debug!(
            "Broadcasting to {} connections: {}",
            self.connections.len(),
            frame
        );
        for addr in self.connections.values() {
            addr.do_send(ChessWebSocketMessage(frame.clone()));
        }
    }

    fn handle_move(&mut self, id: ConnectionId, mv: Move) {
        let session = &mut self.session;
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| session.attempt_move(&id, &mv)));

        match attempt {
            Ok(Ok(outcome)) => {
                info!("Move {} by {} accepted", outcome.applied_move, id);
                self.broadcast(&ServerEvent::Move(outcome.applied_move));
                self.broadcast(&ServerEvent::BoardState(outcome.position));
                if let Some(reason) = outcome.outcome.status.reason() {
                    self.broadcast(&ServerEvent::GameOver {
                        winner: outcome.outcome.winner,
                        reason: reason.to_string(),
                    });
                }
            }
            Ok(Err(RejectReason::NotYourTurn)) => {
                debug!("Ignoring out-of-turn move {} from {}", mv, id);
            }
            Ok(Err(reason)) => {
                warn!("Invalid move {} from {}: {}", mv, id, reason);
                self.send_to(&id, &ServerEvent::InvalidMove(mv));
            }
            Err(_) => {
                error!("Panic while processing move {} from {}", mv, id);
                self.send_to(&id, &ServerEvent::InvalidMove(mv));
            }
        }
    }
}

impl Default for GameServer {
    fn default() -> Self {
        GameServer::new(GameSession::new())
    }
}

impl Actor for GameServer {
    type Context = Context<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        info!("Game server started");
    }
}

impl Handler<Connect> for GameServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Self::Context) {
        self.connections.insert(msg.id, msg.addr);
        info!("Total active connections: {}", self.connections.len());

        let joined = self.session.join(msg.id);
        let reply = match (joined.role, joined.name) {
            (Role::White | Role::Black, Some(player)) => ServerEvent::PlayerRole {
                role: joined.role,
                player,
            },
            _ => ServerEvent::SpectatorRole,
        };
        self.send_to(&msg.id, &reply);

        if joined.seats_filled {
            self.broadcast(&ServerEvent::Status(self.session.occupancy()));
        }
    }
}

impl Handler<Disconnect> for GameServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Self::Context) {
        self.connections.remove(&msg.id);
        info!(
            "Connection {} closed, {} remaining",
            msg.id,
            self.connections.len()
        );

        if let Some(occupancy) = self.session.leave(&msg.id) {
            self.broadcast(&ServerEvent::Status(occupancy));
        }
    }
}

impl Handler<ClientMessage> for GameServer {
    type Result = ();

    fn handle(&mut self, msg: ClientMessage, _: &mut Self::Context) {
        match msg.event {
            ClientEvent::Move(mv) => self.handle_move(msg.id, mv),
            ClientEvent::ResetGame => {
                info!("Reset requested by {}", msg.id);
                let fen = self.session.reset();
                self.broadcast(&ServerEvent::BoardState(fen));
            }
            ClientEvent::RequestBoardState => {
                self.send_to(&msg.id, &ServerEvent::BoardState(self.session.board_state()));
            }
            ClientEvent::LegalMoves { square } => {
                let moves = self.session.legal_moves(&square);
                self.send_to(&msg.id, &ServerEvent::LegalMoves { square, moves });
            }
        }
    }
}
