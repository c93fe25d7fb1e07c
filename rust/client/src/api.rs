// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Design API REST client: element listing, design metadata and the
//! non-mutating viewability probe.
//!
//! The client is strictly read-only. There is deliberately no
//! translate/submit operation anywhere in this crate, so no code path
//! reachable from the viewability resolver can start a billable
//! conversion job.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ClientError, RetrieveError};
use crate::retrieve::ElementFilter;

/// One raw page from a listing endpoint, before normalization.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub items: Vec<Value>,
    pub total: Option<u64>,
    pub has_more: Option<bool>,
}

/// Reported processing status of a design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Ready,
    Processing,
    Failed,
    Unknown,
}

impl ProcessingStatus {
    fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "ready" | "done" | "complete" | "success" => ProcessingStatus::Ready,
            "processing" | "inprogress" | "pending" | "queued" => ProcessingStatus::Processing,
            "failed" | "error" | "timeout" => ProcessingStatus::Failed,
            _ => ProcessingStatus::Unknown,
        }
    }
}

/// Design metadata relevant to viewability.
#[derive(Debug, Clone)]
pub struct DesignInfo {
    pub status: ProcessingStatus,
    pub file_name: Option<String>,
}

/// Outcome of the manifest existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A displayable derivative already exists.
    Exists,
    /// A derivative is being produced by a job someone else started.
    Pending,
    /// No derivative exists.
    Absent,
    /// Anything else; treated as a fall-through, never retried here.
    Inconclusive,
}

/// Design API client.
pub struct DesignApiClient {
    base_url: String,
    access_token: String,
    http: reqwest::Client,
}

impl DesignApiClient {
    /// Create a client from configuration. The per-request timeout is
    /// what drives the fallback ladder on slow tiers.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::Config(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            http,
        })
    }

    /// Build authorization headers.
    fn auth_headers(&self) -> Result<HeaderMap, RetrieveError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token))
                .map_err(|e| RetrieveError::Malformed(format!("invalid token header: {e}")))?,
        );
        Ok(headers)
    }

    /// Rich structured query tier: POST with filter, limit and offset.
    pub async fn query_elements(
        &self,
        design_id: &str,
        filter: &ElementFilter,
        offset: usize,
        limit: usize,
    ) -> Result<RawPage, RetrieveError> {
        let mut query = serde_json::Map::new();
        if let Some(category) = &filter.category {
            query.insert("category".into(), Value::String(category.clone()));
        }
        if let Some(family) = &filter.family {
            query.insert("family".into(), Value::String(family.clone()));
        }

        let resp = self
            .http
            .post(format!(
                "{}/api/v1/designs/{design_id}/elements:query",
                self.base_url
            ))
            .headers(self.auth_headers()?)
            .json(&serde_json::json!({
                "query": query,
                "limit": limit,
                "offset": offset,
            }))
            .send()
            .await
            .map_err(|e| RetrieveError::Transient(format!("structured query failed: {e}")))?;

        let body = check_status(resp, design_id, offset, limit).await?;
        parse_page(&body)
    }

    /// Simplified listing tier: plain GET pagination.
    pub async fn list_elements(
        &self,
        design_id: &str,
        filter: &ElementFilter,
        offset: usize,
        limit: usize,
    ) -> Result<RawPage, RetrieveError> {
        let mut request = self
            .http
            .get(format!(
                "{}/api/v1/designs/{design_id}/elements",
                self.base_url
            ))
            .headers(self.auth_headers()?)
            .query(&[("offset", offset.to_string()), ("limit", limit.to_string())]);
        if let Some(category) = &filter.category {
            request = request.query(&[("category", category.as_str())]);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| RetrieveError::Transient(format!("element listing failed: {e}")))?;

        let body = check_status(resp, design_id, offset, limit).await?;
        parse_page(&body)
    }

    /// Fetch design metadata (processing status, source file name).
    pub async fn get_design(
        &self,
        project_id: &str,
        design_id: &str,
    ) -> Result<DesignInfo, RetrieveError> {
        let resp = self
            .http
            .get(format!(
                "{}/api/v1/projects/{project_id}/designs/{design_id}",
                self.base_url
            ))
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| RetrieveError::Transient(format!("design metadata failed: {e}")))?;

        let body = check_status(resp, design_id, 0, 0).await?;

        let status = body
            .get("status")
            .or_else(|| body.get("processingState"))
            .and_then(Value::as_str)
            .map(ProcessingStatus::parse)
            .unwrap_or(ProcessingStatus::Unknown);
        let file_name = body
            .get("fileName")
            .or_else(|| body.get("displayName"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(DesignInfo { status, file_name })
    }

    /// Non-mutating existence probe against the model-derivative
    /// service. 200 means a derivative exists (or is pending when the
    /// manifest says so), 404 means absent; anything else is
    /// inconclusive and never retried here.
    pub async fn probe_manifest(&self, viewer_urn: &str) -> ProbeOutcome {
        let headers = match self.auth_headers() {
            Ok(h) => h,
            Err(err) => {
                tracing::warn!(%err, "Manifest probe skipped");
                return ProbeOutcome::Inconclusive;
            }
        };

        let resp = self
            .http
            .get(format!(
                "{}/api/v1/derivatives/{viewer_urn}/manifest",
                self.base_url
            ))
            .headers(headers)
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => ProbeOutcome::Absent,
            Ok(resp) if resp.status().is_success() => {
                let manifest: Value = resp.json().await.unwrap_or(Value::Null);
                let status = manifest
                    .get("status")
                    .and_then(Value::as_str)
                    .map(ProcessingStatus::parse)
                    .unwrap_or(ProcessingStatus::Ready);
                match status {
                    ProcessingStatus::Processing => ProbeOutcome::Pending,
                    ProcessingStatus::Failed => ProbeOutcome::Absent,
                    _ => ProbeOutcome::Exists,
                }
            }
            Ok(resp) => {
                tracing::debug!(status = %resp.status(), viewer_urn, "Inconclusive manifest probe");
                ProbeOutcome::Inconclusive
            }
            Err(err) => {
                tracing::warn!(%err, viewer_urn, "Manifest probe request failed");
                ProbeOutcome::Inconclusive
            }
        }
    }
}

/// Map an HTTP response to a body or the retrieval error taxonomy.
async fn check_status(
    resp: reqwest::Response,
    design_id: &str,
    offset: usize,
    limit: usize,
) -> Result<Value, RetrieveError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json()
            .await
            .map_err(|e| RetrieveError::Malformed(format!("response parse failed: {e}")));
    }

    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(design_id, offset, limit, status = %status, "Design API request rejected");

    Err(match status {
        StatusCode::NOT_FOUND => RetrieveError::DesignNotFound(design_id.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RetrieveError::Unauthorized,
        StatusCode::PAYLOAD_TOO_LARGE => RetrieveError::BatchTooLarge { offset, limit },
        _ => RetrieveError::Transient(format!("status {status}: {body}")),
    })
}

/// Normalize the heterogeneous page shapes the listing endpoints return
/// across versions: the element array may sit under `results`, `data`
/// or `elements`, or be the body itself.
fn parse_page(body: &Value) -> Result<RawPage, RetrieveError> {
    let items = body
        .get("results")
        .or_else(|| body.get("data"))
        .or_else(|| body.get("elements"))
        .unwrap_or(body)
        .as_array()
        .cloned()
        .ok_or_else(|| RetrieveError::Malformed("no element array in response".into()))?;

    let pagination = body.get("pagination");
    let total = body
        .get("totalResults")
        .or_else(|| body.get("total"))
        .or_else(|| pagination.and_then(|p| p.get("totalResults")))
        .and_then(Value::as_u64);
    let has_more = body
        .get("moreData")
        .or_else(|| body.get("hasMore"))
        .or_else(|| pagination.and_then(|p| p.get("hasMore")))
        .and_then(Value::as_bool);

    Ok(RawPage {
        items,
        total,
        has_more,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wrapped_and_bare_page_shapes() {
        let wrapped = json!({
            "results": [{"id": "a"}, {"id": "b"}],
            "pagination": { "totalResults": 2, "hasMore": false },
        });
        let page = parse_page(&wrapped).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, Some(2));
        assert_eq!(page.has_more, Some(false));

        let bare = json!([{"id": "a"}]);
        let page = parse_page(&bare).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, None);
        assert_eq!(page.has_more, None);

        assert!(parse_page(&json!({"unexpected": true})).is_err());
    }

    #[test]
    fn processing_status_parsing() {
        assert_eq!(ProcessingStatus::parse("READY"), ProcessingStatus::Ready);
        assert_eq!(ProcessingStatus::parse("inprogress"), ProcessingStatus::Processing);
        assert_eq!(ProcessingStatus::parse("failed"), ProcessingStatus::Failed);
        assert_eq!(ProcessingStatus::parse("whatever"), ProcessingStatus::Unknown);
    }
}
