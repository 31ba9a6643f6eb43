use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use recurring_appointment_cell::router::{
    directory_routes, recurring_appointment_routes, waitlist_routes,
};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Recurring scheduler API is running!" }))
        .nest("/recurring-appointments", recurring_appointment_routes(state.clone()))
        .nest("/waitlist", waitlist_routes(state.clone()))
        .nest("/directory", directory_routes(state))
}
