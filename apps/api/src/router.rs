use std::sync::Arc;

use axum::{routing::get, Router};

use admin_cell::router::admin_routes;
use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use doctor_cell::router::doctor_routes;
use shared_database::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "MediBook API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/admin", admin_routes(state))
}
