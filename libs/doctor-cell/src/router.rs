// libs/doctor-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    // Catalogue reads are public; the queries behind them only ever
    // surface approved doctors.
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{doctor_id}", get(handlers::get_doctor));

    let protected_routes = Router::new()
        .route("/{doctor_id}/availability", post(handlers::create_availability))
        .route("/{doctor_id}/availability", get(handlers::list_availability))
        .route(
            "/{doctor_id}/availability/{slot_id}",
            delete(handlers::delete_availability),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
