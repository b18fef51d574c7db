//! Supabase (PostgREST) memo store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::MemoStore;
use crate::error::{Error, Result};
use crate::models::{Collection, Memo, MemoId};
use crate::config::has_http_scheme;

/// Remote store talking to the `temporary_memos` / `permanent_memos` tables.
#[derive(Clone)]
pub struct SupabaseMemoStore {
    rest_url: String,
    anon_key: String,
    client: Client,
}

impl std::fmt::Debug for SupabaseMemoStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SupabaseMemoStore")
            .field("rest_url", &self.rest_url)
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseMemoStore {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(Error::Config(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.rest_url, collection.table_name())
    }

    fn row_url(&self, collection: Collection, id: &MemoId) -> String {
        format!(
            "{}?id=eq.{}",
            self.table_url(collection),
            urlencoding::encode(&id.as_str())
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(parse_api_error(status, &body)));
        }
        Ok(response)
    }

    async fn send_for_rows(&self, collection: Collection, request: RequestBuilder) -> Result<Vec<Memo>> {
        let rows = self.send(request).await?.json::<Vec<MemoRow>>().await?;
        rows.into_iter()
            .map(|row| row.into_memo(collection))
            .collect()
    }
}

#[async_trait]
impl MemoStore for SupabaseMemoStore {
    async fn create(&self, collection: Collection, content: &str) -> Result<Memo> {
        let request = self
            .client
            .post(self.table_url(collection))
            .header("Prefer", "return=representation")
            .json(&content_body(content));
        self.send_for_rows(collection, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Store("insert returned no row".to_string()))
    }

    async fn get(&self, collection: Collection, id: &MemoId) -> Result<Memo> {
        let request = self
            .client
            .get(format!("{}&select=*", self.row_url(collection, id)));
        self.send_for_rows(collection, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn update(&self, collection: Collection, id: &MemoId, content: &str) -> Result<()> {
        let request = self
            .client
            .patch(self.row_url(collection, id))
            .header("Prefer", "return=representation")
            .json(&content_body(content));
        let rows = self.send_for_rows(collection, request).await?;
        if rows.is_empty() {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &MemoId) -> Result<()> {
        let request = self.client.delete(self.row_url(collection, id));
        self.send(request).await?;
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Memo>> {
        let request = self.client.get(format!(
            "{}?select=*&order=updated_at.desc,id.asc",
            self.table_url(collection)
        ));
        self.send_for_rows(collection, request).await
    }
}

/// Row shape shared by both memo tables.
#[derive(Debug, Deserialize)]
struct MemoRow {
    id: String,
    content: Option<String>,
    created_at: String,
    updated_at: String,
}

impl MemoRow {
    fn into_memo(self, collection: Collection) -> Result<Memo> {
        let id = self
            .id
            .parse::<MemoId>()
            .map_err(|error| Error::Store(format!("invalid memo id '{}': {error}", self.id)))?;
        Ok(Memo {
            id,
            collection,
            content: self.content.unwrap_or_default(),
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc).timestamp_millis())
        .map_err(|error| Error::Store(format!("invalid timestamp '{value}': {error}")))
}

pub fn normalize_rest_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::Config("Supabase URL must not be empty".to_string()));
    }
    if !has_http_scheme(trimmed) {
        return Err(Error::Config(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

/// Longest slice of a non-JSON error body kept in messages.
const ERROR_BODY_CHARS: usize = 180;

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message.or(payload.details).or(payload.hint) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let excerpt = body.trim().chars().take(ERROR_BODY_CHARS).collect::<String>();
    if excerpt.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", excerpt, status.as_u16())
    }
}

/// Insert and update payload. The database stamps `updated_at` (column
/// default and update trigger), never the client.
fn content_body(content: &str) -> serde_json::Value {
    serde_json::json!({ "content": content })
}
