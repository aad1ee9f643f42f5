pub mod cors;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{Request, StatusCode},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{config::Config, otel, service::Service};

#[derive(Clone)]
pub struct AppState {
    pub service: Service,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(service: Service, config: Config) -> Self {
        Self {
            service,
            config: Arc::new(config),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_request_bytes();
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/process", post(handlers::process))
        .route("/convert", post(handlers::convert))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(from_fn(cors::cors))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| otel::make_span(req)))
        .with_state(state)
}
