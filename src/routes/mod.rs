use actix_web::{http::header::ContentType, web, HttpResponse, Responder};

const PAGE_SHELL: &str = "<!DOCTYPE html>\n<html>\n<head><title>Chess Game</title></head>\n<body><div id=\"chessboard\"></div></body>\n</html>\n";

/// HTTP handler for the index page
pub async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(PAGE_SHELL)
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(crate::websocket::ws_index)))
        .service(web::resource("/").route(web::get().to(index)));
}
