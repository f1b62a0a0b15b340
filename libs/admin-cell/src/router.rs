// libs/admin-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn admin_routes(state: Arc<AppState>) -> Router {
    // Authentication happens here; the admin capability check happens
    // in every handler.
    let protected_routes = Router::new()
        .route("/doctors/pending", get(handlers::pending_doctors))
        .route("/doctors/{doctor_id}/approve", post(handlers::approve_doctor))
        .route("/doctors/{doctor_id}/reject", post(handlers::reject_doctor))
        .route("/users", get(handlers::list_users))
        .route("/users/{user_id}", get(handlers::get_user))
        .route("/users/{user_id}", patch(handlers::update_user))
        .route("/users/{user_id}", delete(handlers::delete_user))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
