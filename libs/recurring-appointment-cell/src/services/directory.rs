// libs/recurring-appointment-cell/src/services/directory.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_models::pagination::{Page, PageRequest};

use crate::error::{RecurringAppointmentError, Result};
use crate::models::{AppointmentTypeProfile, DirectoryEntry, DirectoryKind};

/// Lookup of appointment types, which carry the duration and buffers used
/// for every slot of a series.
#[async_trait]
pub trait AppointmentTypeSource: Send + Sync {
    async fn appointment_type(&self, id: Uuid) -> Result<AppointmentTypeProfile>;
}

/// Read-only access to patients, providers and appointment types.
pub struct DirectoryService {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
}

impl DirectoryService {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: Option<String>) -> Self {
        Self { supabase, auth_token }
    }

    /// Case-insensitive search on the display name, one page at a time.
    pub async fn search(
        &self,
        kind: DirectoryKind,
        term: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<DirectoryEntry>> {
        let page_size = page.page_size();
        debug!("Searching {} for {:?} (page {})", kind.table(), term, page.page());

        let column = kind.name_column();
        let select = if column == "display_name" {
            "select=id,display_name".to_string()
        } else {
            format!("select=id,display_name:{}", column)
        };

        let mut query_parts = vec![select];
        if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
            query_parts.push(format!(
                "{}=ilike.*{}*",
                column,
                urlencoding::encode(term)
            ));
        }
        query_parts.push(format!("order={}.asc", column));
        // One extra row tells us whether another page exists.
        query_parts.push(format!("limit={}", page_size + 1));
        query_parts.push(format!("offset={}", page.offset()));

        let path = format!("/rest/v1/{}?{}", kind.table(), query_parts.join("&"));

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            self.auth_token.as_deref(),
            None,
        ).await.map_err(|e| RecurringAppointmentError::Database(e.to_string()))?;

        let mut items = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<DirectoryEntry>, _>>()
            .map_err(|e| RecurringAppointmentError::Database(format!("Failed to parse {}: {}", kind.table(), e)))?;

        let has_more = items.len() > page_size as usize;
        items.truncate(page_size as usize);

        Ok(Page {
            items,
            page: page.page(),
            page_size,
            has_more,
        })
    }
}

#[async_trait]
impl AppointmentTypeSource for DirectoryService {
    async fn appointment_type(&self, id: Uuid) -> Result<AppointmentTypeProfile> {
        let path = format!(
            "/rest/v1/appointment_types?id=eq.{}&select=id,name,duration_minutes,buffer_before_minutes,buffer_after_minutes",
            id
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            self.auth_token.as_deref(),
            None,
        ).await.map_err(|e| RecurringAppointmentError::Database(e.to_string()))?;

        let row = result.into_iter().next()
            .ok_or_else(|| RecurringAppointmentError::NotFound(format!("Appointment type {}", id)))?;

        serde_json::from_value(row)
            .map_err(|e| RecurringAppointmentError::Database(format!("Failed to parse appointment type: {}", e)))
    }
}
