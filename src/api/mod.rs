pub mod auth;
mod clients;
pub mod error;
mod extract;
pub mod rate_limit;

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Token endpoint is public but throttled per client address
    let auth_routes = Router::new()
        .route(
            "/token",
            post(auth::login).route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit::rate_limit_login,
            )),
        )
        .route("/users", post(auth::create_user));

    // Every client route resolves the caller from the bearer token
    let client_routes = Router::new()
        .route("/clients", get(clients::list_clients).post(clients::create_client))
        .route("/clients/", get(clients::list_clients).post(clients::create_client))
        .route("/clients/search/by-criteria", get(clients::search_by_criteria))
        .route("/clients/search/by-services", get(clients::search_by_services))
        .route("/clients/search/success-rate", get(clients::search_by_success_rate))
        .route("/clients/case-worker/:user_id", get(clients::list_by_case_worker))
        .route(
            "/clients/:client_id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/clients/:client_id/services",
            get(clients::get_client_services).put(clients::update_own_case),
        )
        .route(
            "/clients/:client_id/services/:user_id",
            put(clients::update_case),
        )
        .route(
            "/clients/:client_id/case-assignment",
            post(clients::create_case_assignment),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .merge(client_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors))
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database_ok = crate::db::ping(&state.db).await;
    Json(HealthResponse {
        status: if database_ok { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: if database_ok { "ok" } else { "unreachable" },
    })
}
