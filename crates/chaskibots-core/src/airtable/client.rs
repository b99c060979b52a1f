//! API client for the Airtable REST API.
//!
//! This module provides the `AirtableClient` struct, the single typed
//! table client used by every resource accessor.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::record::{DeleteResponse, ListPage, WriteRecord, WriteRequest, WriteResponse};
use super::{ApiError, ListQuery, Record, TableStore};
use crate::config::AirtableConfig;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on pages followed for a single list call. A listing that
/// needs more is reported as an error rather than returned truncated.
const MAX_PAGES: usize = 1000;

/// Airtable client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct AirtableClient {
    client: Client,
    api_url: String,
    base_id: String,
    api_key: String,
}

impl AirtableClient {
    /// Create a new client for the configured base
    pub fn new(config: &AirtableConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            base_id: config.base_id.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_url,
            self.base_id,
            urlencoding::encode(table)
        )
    }

    fn record_url(&self, table: &str, record_id: &str) -> String {
        format!("{}/{}", self.table_url(table), urlencoding::encode(record_id))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Rate limits are reported, never retried.
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                warn!("Airtable rate limit hit");
            }
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn fetch_page<F: DeserializeOwned>(
        &self,
        table: &str,
        query: &ListQuery,
        offset: Option<&str>,
    ) -> Result<ListPage<F>> {
        let url = self.table_url(table);
        let params = query.to_params(offset)?;

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .query(&params)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to list records from {}", table))?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse records from {}", table))
    }

    async fn write<F>(
        &self,
        method: reqwest::Method,
        table: &str,
        record_id: Option<&str>,
        fields: &F,
    ) -> Result<Record<F>>
    where
        F: Serialize + DeserializeOwned,
    {
        let url = self.table_url(table);
        let body = WriteRequest {
            records: vec![WriteRecord { id: record_id, fields }],
        };

        let response = self
            .client
            .request(method.clone(), &url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send {} to {}", method, table))?;

        let response = Self::check_response(response).await?;

        let parsed: WriteResponse<F> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response from {}", method, table))?;

        parsed.records.into_iter().next().ok_or_else(|| {
            ApiError::InvalidResponse(format!("{} on {} returned no records", method, table)).into()
        })
    }
}

#[async_trait]
impl TableStore for AirtableClient {
    async fn list<F>(&self, table: &str, query: &ListQuery) -> Result<Vec<Record<F>>>
    where
        F: DeserializeOwned + Send + 'static,
    {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        for page_number in 1..=MAX_PAGES {
            let page: ListPage<F> = self.fetch_page(table, query, offset.as_deref()).await?;
            records.extend(page.records);

            match page.offset {
                Some(next) if offset.as_deref() == Some(next.as_str()) => {
                    warn!(table = table, offset = %next, "Airtable repeated a page offset");
                    return Err(ApiError::InvalidResponse(format!(
                        "Airtable repeated page offset {} while listing {}",
                        next, table
                    ))
                    .into());
                }
                Some(next) => offset = Some(next),
                None => {
                    debug!(
                        table = table,
                        pages = page_number,
                        records = records.len(),
                        "Listed records"
                    );
                    return Ok(records);
                }
            }
        }

        Err(ApiError::InvalidResponse(format!(
            "Listing {} did not finish within {} pages",
            table, MAX_PAGES
        ))
        .into())
    }

    async fn get<F>(&self, table: &str, record_id: &str) -> Result<Record<F>>
    where
        F: DeserializeOwned + Send + 'static,
    {
        let url = self.record_url(table, record_id);

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to fetch {} from {}", record_id, table))?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} from {}", record_id, table))
    }

    async fn create<F>(&self, table: &str, fields: &F) -> Result<Record<F>>
    where
        F: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let record = self.write(reqwest::Method::POST, table, None, fields).await?;
        debug!(table = table, record_id = %record.id, "Created record");
        Ok(record)
    }

    async fn update<F>(&self, table: &str, record_id: &str, fields: &F) -> Result<Record<F>>
    where
        F: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let record = self
            .write(reqwest::Method::PATCH, table, Some(record_id), fields)
            .await?;
        debug!(table = table, record_id = record_id, "Updated record");
        Ok(record)
    }

    async fn delete(&self, table: &str, record_id: &str) -> Result<()> {
        let url = self.record_url(table, record_id);

        let response = self
            .client
            .delete(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to delete {} from {}", record_id, table))?;

        let response = Self::check_response(response).await?;

        let parsed: DeleteResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse delete response from {}", table))?;

        if !parsed.deleted {
            return Err(ApiError::InvalidResponse(format!(
                "Airtable did not delete {} from {}",
                record_id, table
            ))
            .into());
        }

        debug!(table = table, record_id = record_id, "Deleted record");
        Ok(())
    }
}
