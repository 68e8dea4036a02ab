//! Native actix-web front end.
//!
//! Requests are converted to Spin requests, dispatched through the shared
//! router against one [`MemoryStore`], and converted back.

use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use tracing::info;

use crate::core::store::MemoryStore;
use crate::router::route;

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        };

        let uri = req.uri().to_string();

        let mut req_builder = Request::builder();
        let mut with_headers = req_builder.method(method).uri(uri);
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                with_headers = with_headers.header(name.as_str(), val_str);
            }
        }

        with_headers.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(*spin_resp.status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = spin_resp.body().to_vec();

        let mut response = actix_web::HttpResponse::build(status);
        if !body.is_empty() {
            // every handler answers with JSON
            response.content_type("application/json");
        }
        response.body(body)
    }
}

async fn handle_all(req: HttpRequest, body: web::Bytes, store: web::Data<MemoryStore>) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);
    let spin_resp = route(store.get_ref(), &spin_req);

    info!(
        method = %req.method(),
        path = req.path(),
        status = *spin_resp.status(),
        "handled request"
    );

    adapter::spin_to_actix_response(spin_resp)
}

/// Builds the server on an already bound listener; the caller awaits or spawns it.
pub fn run(listener: TcpListener, store: Arc<MemoryStore>) -> std::io::Result<Server> {
    let data = web::Data::from(store);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .default_service(web::route().to(handle_all))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
