//! Detection history and watch list, stored behind a PostgREST (Supabase) API.

use crate::error::ClientError;
use platewatch_core::records::normalize_plate;
use platewatch_core::{
    DetectionRecord, NewDetection, NewWatchListEntry, WatchList, WatchListEntry, WatchStatus,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const DETECTIONS: &str = "detections";
const WATCH_LIST: &str = "watch_list";

/// Connection settings for the hosted database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public (anon) API key
    pub api_key: String,
    /// Access token of the signed-in user; the API key is used when absent
    pub access_token: Option<String>,
    pub user_id: Option<String>,
    pub history_limit: usize,
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            access_token: None,
            user_id: None,
            history_limit: 10,
            timeout_secs: 10,
        }
    }
}

pub struct SupabaseStore {
    http_client: Client,
    rest_url: String,
    user_id: String,
    history_limit: usize,
}

impl SupabaseStore {
    /// # Errors
    /// * If url, api key or user id are missing.
    /// * If the HTTP client can't be built.
    pub fn new(settings: &StoreSettings) -> Result<Self, ClientError> {
        if settings.url.is_empty() {
            return Err(ClientError::NotConfigured("store.url"));
        }
        if settings.api_key.is_empty() {
            return Err(ClientError::NotConfigured("store.api_key"));
        }
        let user_id = settings
            .user_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(ClientError::NotConfigured("store.user_id"))?;

        let token = settings.access_token.as_deref().unwrap_or(&settings.api_key);
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&settings.api_key)?);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            header_value(&format!("Bearer {token}"))?,
        );

        let http_client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            rest_url: format!("{}/rest/v1", settings.url.trim_end_matches('/')),
            user_id,
            history_limit: settings.history_limit,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn table(&self, name: &str) -> String {
        format!("{}/{}", self.rest_url, name)
    }

    /// Most recent detections of the user, newest first.
    pub async fn recent_detections(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<DetectionRecord>, ClientError> {
        let limit = limit.unwrap_or(self.history_limit);
        let request = self
            .http_client
            .get(self.table(DETECTIONS))
            .query(&history_query(&self.user_id, limit));
        fetch_json(request).await
    }

    /// Total number of detections stored for the user.
    pub async fn detection_count(&self) -> Result<u64, ClientError> {
        let response = self
            .http_client
            .head(self.table(DETECTIONS))
            .query(&[("select", "*".to_string()), ("user_id", eq(&self.user_id))])
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = check_status(response).await?;

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ClientError::InvalidResponse("missing Content-Range".into()))?;
        parse_content_range_total(range)
            .ok_or_else(|| ClientError::InvalidResponse(format!("bad Content-Range '{range}'")))
    }

    /// Store one detection and return the created row.
    pub async fn save_detection(
        &self,
        detection: &NewDetection,
    ) -> Result<DetectionRecord, ClientError> {
        let request = self
            .http_client
            .post(self.table(DETECTIONS))
            .header("Prefer", "return=representation")
            .json(detection);
        let rows: Vec<DetectionRecord> = fetch_json(request).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::InvalidResponse("insert returned no rows".into()))?;
        info!(
            id = row.id,
            plate = %row.plate_number,
            status = row.status.as_str(),
            "detection saved"
        );
        Ok(row)
    }

    /// Watch list rows of the user, newest first.
    pub async fn watch_list(&self) -> Result<Vec<WatchListEntry>, ClientError> {
        let request = self
            .http_client
            .get(self.table(WATCH_LIST))
            .query(&watch_list_query(&self.user_id));
        fetch_json(request).await
    }

    /// Watch list as a lookup set
    pub async fn load_watch_list(&self) -> Result<WatchList, ClientError> {
        let entries = self.watch_list().await?;
        debug!(count = entries.len(), "watch list loaded");
        Ok(entries.iter().collect())
    }

    pub async fn add_to_watch_list(&self, plate: &str) -> Result<(), ClientError> {
        let entry = NewWatchListEntry {
            plate_number: normalize_plate(plate),
            status: WatchStatus::NotDetected,
            user_id: self.user_id.clone(),
        };
        let response = self
            .http_client
            .post(self.table(WATCH_LIST))
            .json(&entry)
            .send()
            .await?;
        check_status(response).await?;
        info!(plate = %entry.plate_number, "added to watch list");
        Ok(())
    }

    pub async fn remove_from_watch_list(&self, plate: &str) -> Result<(), ClientError> {
        let plate = normalize_plate(plate);
        let response = self
            .http_client
            .delete(self.table(WATCH_LIST))
            .query(&[("plate_number", eq(&plate)), ("user_id", eq(&self.user_id))])
            .send()
            .await?;
        check_status(response).await?;
        info!(%plate, "removed from watch list");
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value)
        .map_err(|_| ClientError::InvalidResponse("credential is not a valid header value".into()))
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

fn history_query(user_id: &str, limit: usize) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        ("user_id", eq(user_id)),
        ("order", "created_at.desc".to_string()),
        ("limit", limit.to_string()),
    ]
}

fn watch_list_query(user_id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        ("user_id", eq(user_id)),
        ("order", "created_at.desc".to_string()),
    ]
}

/// Total from a PostgREST `Content-Range` header (`0-9/42`, `*/0`).
fn parse_content_range_total(range: &str) -> Option<u64> {
    range.rsplit_once('/')?.1.trim().parse().ok()
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let text = response.text().await.unwrap_or_default();
        Err(ClientError::UnexpectedStatus { status, text })
    }
}

async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = check_status(request.send().await?).await?;
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
