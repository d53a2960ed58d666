use crate::api::handlers;
use crate::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Request bodies carry whole documents inline
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/research/enqueue",
            post(handlers::research::enqueue_research),
        )
        .route(
            "/research/status/{id}",
            get(handlers::research::research_status),
        )
        .route("/admin/queue", get(handlers::research::queue_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::middleware::api_key_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", protected_routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
