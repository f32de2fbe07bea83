use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .nest("/api/v1", api_routes())
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(
                    middlewares::request_id::request_id_middleware,
                ))
                .layer(middleware::from_fn(
                    middlewares::metrics::metrics_middleware,
                ))
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}

/// Stateless calls take all context from the request; `/session` works on
/// the server-held study session.
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/plans", post(handlers::plans::generate_plan))
        .route("/resources", post(handlers::resources::discover_resources))
        .route("/tutor", post(handlers::tutor::tutor_exchange))
        .route("/quiz", post(handlers::study_aids::generate_quiz))
        .route("/summary", post(handlers::study_aids::generate_summary))
        .route(
            "/practice-questions",
            post(handlers::study_aids::generate_practice_questions),
        )
        .route(
            "/documents",
            post(handlers::documents::upload_document)
                .layer(DefaultBodyLimit::max(models::document::MAX_UPLOAD_BODY_BYTES)),
        )
        .nest("/session", session_routes())
}

/// Calls operating on the server-held study session.
fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::session::get_session).delete(handlers::session::reset_session),
        )
        .route("/plan", post(handlers::session::create_plan))
        .route(
            "/modules/{id}/activate",
            post(handlers::session::activate_module),
        )
        .route(
            "/modules/{id}/status",
            put(handlers::session::update_module_status),
        )
        .route(
            "/modules/{id}/resources",
            post(handlers::session::fetch_module_resources),
        )
        .route(
            "/resources/{id}/select",
            post(handlers::session::select_resource),
        )
        .route(
            "/resources/{id}/complete",
            post(handlers::session::complete_resource),
        )
        .route("/resources/{id}/quiz", post(handlers::session::quiz_resource))
        .route(
            "/chat",
            get(handlers::session::get_chat)
                .post(handlers::session::send_chat)
                .delete(handlers::session::clear_chat),
        )
        .route("/document", put(handlers::session::set_document_mode))
        .route("/progress", get(handlers::session::get_progress))
        .route("/countdown", get(handlers::countdown::get_countdown))
        .route(
            "/countdown/pause",
            post(handlers::countdown::pause_countdown),
        )
        .route(
            "/countdown/resume",
            post(handlers::countdown::resume_countdown),
        )
        .route(
            "/countdown/reset",
            post(handlers::countdown::reset_countdown),
        )
        .route(
            "/countdown/stream",
            get(handlers::countdown::countdown_stream),
        )
}
