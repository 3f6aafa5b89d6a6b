use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, info, warn};

use crate::game::ConnectionId;
use crate::models::{ChessWebSocketMessage, ClientEvent, ServerEvent};
use crate::websocket::server::{ClientMessage, Connect, Disconnect, GameServer};

/// WebSocket handler for one connection. It owns no game state; every
/// intent is forwarded to the [`GameServer`].
pub struct ChessWebSocket {
    pub id: ConnectionId,
    pub server: Addr<GameServer>,
}

impl ChessWebSocket {
    fn send_error(&self, message: String, ctx: &mut ws::WebsocketContext<Self>) {
        match (ServerEvent::Error { message }).to_json() {
            Ok(frame) => ctx.text(frame),
            Err(e) => warn!("Failed to serialize error event: {}", e),
        }
    }

    fn handle_text(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        debug!("Received text message from {}: {}", self.id, text);
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.server.do_send(ClientMessage { id: self.id, event }),
            Err(e) => {
                warn!("Error parsing client message from {}: {}", self.id, e);
                self.send_error(format!("Invalid message format: {}", e), ctx);
            }
        }
    }
}

impl Actor for ChessWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("WebSocket connection started: {}", self.id);
        self.server.do_send(Connect {
            id: self.id,
            addr: ctx.address().recipient(),
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        info!("WebSocket connection closed: {}", self.id);
        self.server.do_send(Disconnect { id: self.id });
        Running::Stop
    }
}

impl Handler<ChessWebSocketMessage> for ChessWebSocket {
    type Result = ();

    fn handle(&mut self, msg: ChessWebSocketMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChessWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => {
                let text: &str = &text;
                self.handle_text(text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
                self.send_error("Binary messages are not supported".to_string(), ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection {} closed: {:?}", self.id, reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                warn!("WebSocket protocol error on {}: {}", self.id, e);
                ctx.stop();
            }
        }
    }
}

/// WebSocket connection handler
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<GameServer>>,
) -> Result<HttpResponse, Error> {
    let id = ConnectionId::new();
    info!("New WebSocket connection: {}", id);

    let ws = ChessWebSocket {
        id,
        server: server.get_ref().clone(),
    };

    ws::start(ws, &req, stream)
}
