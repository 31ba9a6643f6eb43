// libs/recurring-appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Utc};
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::error::AppError;
use shared_models::pagination::PageRequest;

use crate::models::{
    CreateWithResolutionRequest, DirectoryKind, RecurrenceRequest, WaitlistRequest,
};
use crate::services::creation::BatchCreationService;
use crate::services::directory::DirectoryService;
use crate::services::preview::PreviewEngine;
use crate::services::store::SupabaseAppointmentStore;
use crate::services::waitlist::WaitlistService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySearchQuery {
    pub term: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

fn bearer_token(auth: BearerHeader) -> Option<String> {
    auth.map(|TypedHeader(auth)| auth.token().to_string())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

struct Services {
    supabase: Arc<SupabaseClient>,
    token: Option<String>,
    default_duration_minutes: i64,
}

impl Services {
    fn new(state: &AppConfig, auth: BearerHeader) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(state)),
            token: bearer_token(auth),
            default_duration_minutes: state.default_duration_minutes,
        }
    }

    fn store(&self) -> Arc<SupabaseAppointmentStore> {
        Arc::new(SupabaseAppointmentStore::new(self.supabase.clone(), self.token.clone()))
    }

    fn directory(&self) -> Arc<DirectoryService> {
        Arc::new(DirectoryService::new(self.supabase.clone(), self.token.clone()))
    }

    fn preview_engine(&self) -> PreviewEngine {
        PreviewEngine::new(self.store(), self.directory(), self.default_duration_minutes)
    }

    fn creation_service(&self) -> BatchCreationService {
        BatchCreationService::new(self.store(), self.directory(), self.default_duration_minutes)
    }
}

// ==============================================================================
// RECURRING APPOINTMENT HANDLERS
// ==============================================================================

/// Expand a recurrence and flag conflicts. Nothing is stored.
#[axum::debug_handler]
pub async fn preview_recurring_appointments(
    State(state): State<Arc<AppConfig>>,
    auth: BearerHeader,
    Json(request): Json<RecurrenceRequest>,
) -> Result<Json<Value>, AppError> {
    let engine = Services::new(&state, auth).preview_engine();
    let preview = engine.preview(&request, today()).await?;

    let message = if preview.conflict_count == 0 {
        format!("All {} appointments are available", preview.total_count)
    } else {
        format!(
            "{} of {} appointments have conflicts",
            preview.conflict_count, preview.total_count
        )
    };

    Ok(Json(json!({
        "success": true,
        "data": preview,
        "message": message
    })))
}

/// Create a series with per-instance overrides, all or nothing.
#[axum::debug_handler]
pub async fn create_with_resolution(
    State(state): State<Arc<AppConfig>>,
    auth: BearerHeader,
    Json(request): Json<CreateWithResolutionRequest>,
) -> Result<Json<Value>, AppError> {
    let service = Services::new(&state, auth).creation_service();
    let summary = service.create_with_resolution(&request, today()).await?;

    Ok(Json(json!({
        "success": true,
        "data": summary,
        "message": format!(
            "Created {} appointments, skipped {}",
            summary.appointments_created, summary.skipped_count
        )
    })))
}

#[axum::debug_handler]
pub async fn create_recurring_appointments(
    State(state): State<Arc<AppConfig>>,
    auth: BearerHeader,
    Json(request): Json<RecurrenceRequest>,
) -> Result<Json<Value>, AppError> {
    let service = Services::new(&state, auth).creation_service();
    let summary = service.create(&request, today()).await?;

    Ok(Json(json!({
        "success": true,
        "data": summary,
        "message": format!("Created {} appointments", summary.appointments_created)
    })))
}

// ==============================================================================
// WAITLIST & DIRECTORY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn add_to_waitlist(
    State(state): State<Arc<AppConfig>>,
    auth: BearerHeader,
    Json(request): Json<WaitlistRequest>,
) -> Result<Json<Value>, AppError> {
    let services = Services::new(&state, auth);
    let service = WaitlistService::new(services.supabase.clone(), services.token.clone());
    let entry = service.add(&request, today()).await?;

    Ok(Json(json!({
        "success": true,
        "data": entry,
        "message": "Added to waitlist"
    })))
}

#[axum::debug_handler]
pub async fn search_directory(
    State(state): State<Arc<AppConfig>>,
    auth: BearerHeader,
    Path(kind): Path<DirectoryKind>,
    Query(query): Query<DirectorySearchQuery>,
) -> Result<Json<Value>, AppError> {
    let directory = Services::new(&state, auth).directory();
    let page = PageRequest {
        page: query.page,
        page_size: query.page_size,
    };
    let results = directory.search(kind, query.term.as_deref(), page).await?;

    Ok(Json(json!({
        "success": true,
        "data": results
    })))
}
