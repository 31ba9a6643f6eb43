// libs/recurring-appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn recurring_appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_recurring_appointments))
        .route("/preview", post(handlers::preview_recurring_appointments))
        .route("/with-resolution", post(handlers::create_with_resolution))
        .with_state(state)
}

pub fn waitlist_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::add_to_waitlist))
        .with_state(state)
}

pub fn directory_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{kind}", get(handlers::search_directory))
        .with_state(state)
}
