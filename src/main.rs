use actix::Actor;
use actix_web::{web, App, HttpServer};
use log::{info, warn};

use chess_session_server::config::ServerConfig;
use chess_session_server::game::GameSession;
use chess_session_server::routes::configure_routes;
use chess_session_server::websocket::GameServer;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let mut session = GameSession::new();
    if let Some(fen) = &config.start_fen {
        // A bad start position is logged by the session and ignored.
        if session.load_position(fen).is_err() {
            warn!("Starting from the standard position instead");
        }
    }

    let server = web::Data::new(GameServer::new(session).start());

    info!(
        "Starting chess server at http://{}:{}",
        config.host, config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(server.clone())
            .configure(configure_routes)
    })
    .bind(config.bind_address())?
    .run()
    .await
}
