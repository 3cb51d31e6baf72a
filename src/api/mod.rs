mod admin;
pub mod auth;
mod businesses;
pub mod error;
mod extract;
mod reviews;
mod validation;

#[cfg(test)]
mod tests;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/businesses", get(businesses::list_businesses))
        .route("/businesses/:id", get(businesses::get_business));

    // Any authenticated user
    let user_routes = Router::new()
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me))
        .route("/reviews", post(reviews::create_review))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Admin only: the admin gate runs inside the auth gate
    let admin_routes = Router::new()
        .route("/reviews", get(admin::list_pending_reviews))
        .route("/reviews/:id", patch(admin::update_review_status))
        .route("/businesses", post(businesses::create_business))
        .route_layer(middleware::from_fn(auth::admin_middleware))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api_routes = public_routes
        .merge(user_routes)
        .nest("/admin", admin_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

async fn health_check() -> &'static str {
    "OK"
}
