// libs/recurring-appointment-cell/src/services/client.rs
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::error::{RecurringAppointmentError, Result};
use crate::models::{
    CreateWithResolutionRequest, CreationSummary, PreviewResult, RecurrenceRequest,
    WaitlistEntry, WaitlistRequest,
};
use crate::services::gateway::{SchedulingGateway, WaitlistGateway};

const GENERIC_FAILURE: &str = "The scheduling service could not complete the request";

/// HTTP client for the Scheduling Service endpoints.
///
/// Every failure is mapped to either [`RecurringAppointmentError::Service`]
/// (the server answered with an error) or
/// [`RecurringAppointmentError::Network`] (no answer). Nothing is retried.
#[derive(Debug, Clone)]
pub struct SchedulingClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl SchedulingClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.scheduling_service_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.auth_token {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Auth token contains invalid header characters, omitting"),
            }
        }
        headers
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.client
            .post(&url)
            .headers(self.headers())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Request to {} failed: {}", url, e);
                RecurringAppointmentError::Network(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RecurringAppointmentError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&text).unwrap_or_else(|| GENERIC_FAILURE.to_string());
            error!("Scheduling service error ({}): {}", status, message);
            return Err(RecurringAppointmentError::Service {
                status: status.as_u16(),
                message,
            });
        }

        decode_payload(status, &text)
    }
}

/// Pull the human message out of an error body: `{"error": "..."}`,
/// `{"message": "..."}` or `{"error": {"message": "..."}}`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let candidate = match value.get("error") {
        Some(Value::String(msg)) => Some(msg.clone()),
        Some(Value::Object(obj)) => obj.get("message").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };
    candidate
        .or_else(|| value.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|msg| !msg.trim().is_empty())
}

/// Successful responses are wrapped as `{"success", "data", "message"}`;
/// a bare payload is accepted too.
fn decode_payload<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    let invalid = |e: serde_json::Error| RecurringAppointmentError::Service {
        status: status.as_u16(),
        message: format!("Unexpected response from scheduling service: {}", e),
    };

    let value: Value = serde_json::from_str(body).map_err(invalid)?;
    let payload = match value {
        Value::Object(mut obj) if obj.contains_key("data") => obj.remove("data").unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(payload).map_err(invalid)
}

#[async_trait]
impl SchedulingGateway for SchedulingClient {
    async fn preview(&self, request: &RecurrenceRequest) -> Result<PreviewResult> {
        self.post("/recurring-appointments/preview", request).await
    }

    async fn create_with_resolution(&self, request: &CreateWithResolutionRequest) -> Result<CreationSummary> {
        self.post("/recurring-appointments/with-resolution", request).await
    }

    async fn create(&self, request: &RecurrenceRequest) -> Result<CreationSummary> {
        self.post("/recurring-appointments", request).await
    }
}

#[async_trait]
impl WaitlistGateway for SchedulingClient {
    async fn add_to_waitlist(&self, request: &WaitlistRequest) -> Result<WaitlistEntry> {
        self.post("/waitlist", request).await
    }
}
