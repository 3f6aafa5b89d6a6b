//! Real-time coordinator for a single two-player chess game: seats the first
//! two connections as white and black, validates their moves and keeps every
//! connection in sync over WebSockets.

pub mod config;
pub mod game;
pub mod models;
pub mod routes;
pub mod websocket;
