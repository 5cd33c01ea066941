//! HTTP management API client
//!
//! One client type serves both platform generations: the REST surface for
//! listing and fetching configuration objects has the same shape, only
//! the base URL and organization identifier differ. All calls are GETs
//! except the dry-run import, which never commits (`action=validate`).

use super::{Exporter, TargetClient, TransportError, ValidationOutcome};
use crate::models::{ResourceRecord, ResourceType, Scope};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Client for one management API endpoint
pub struct ManagementClient {
    http: reqwest::Client,
    base_url: Url,
    org: String,
    token: String,
}

impl ManagementClient {
    /// Create a client for the given management endpoint
    pub fn new(base_url: &str, org: &str, token: String, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid management API URL: {}", base_url))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url,
            org: org.to_string(),
            token,
        })
    }

    /// Path segment the management API uses for a resource type
    fn path_segment(resource_type: ResourceType) -> &'static str {
        match resource_type {
            ResourceType::TargetServer => "targetservers",
            ResourceType::KeyValueMap | ResourceType::OrgKeyValueMap => "keyvaluemaps",
            ResourceType::Reference => "references",
            ResourceType::ResourceFile => "resourcefiles",
            ResourceType::Keystore => "keystores",
            ResourceType::FlowHook => "flowhooks",
            ResourceType::Developer => "developers",
            ResourceType::ApiProduct => "apiproducts",
            ResourceType::ApiProxy => "apis",
            ResourceType::App => "apps",
            ResourceType::SharedFlow => "sharedflows",
        }
    }

    /// Collection URL for a type within a scope
    fn collection_url(&self, resource_type: ResourceType, scope: &Scope) -> Result<Url, TransportError> {
        let segment = Self::path_segment(resource_type);
        let path = match scope {
            Scope::Organization => {
                format!("v1/organizations/{}/{}", self.org, segment)
            }
            Scope::Environment(env) => format!(
                "v1/organizations/{}/environments/{}/{}",
                self.org, env, segment
            ),
        };
        self.base_url
            .join(&path)
            .map_err(|e| TransportError::Network(e.to_string()))
    }

    async fn get_json(&self, url: Url) -> Result<Value, TransportError> {
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), detail));
        }
        resp.json().await.map_err(map_reqwest_error)
    }

    /// Fetch one object's detail and shape it into a record
    async fn fetch_record(
        &self,
        resource_type: ResourceType,
        scope: &Scope,
        name: &str,
    ) -> Result<ResourceRecord, TransportError> {
        let mut url = self.collection_url(resource_type, scope)?;
        url.path_segments_mut()
            .map_err(|_| TransportError::Network("URL cannot be a base".into()))?
            .push(name);
        let raw = self.get_json(url).await?;

        let mut record = ResourceRecord::new(resource_type, scope.clone(), name, raw);
        // Proxies and shared flows carry their revision list in the detail
        // response.
        if record.resource_type.supports_target_validation() {
            record.revisions = record
                .raw
                .get("revision")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
        }
        Ok(record)
    }
}

/// Pull the object names out of a collection listing
///
/// The API is inconsistent across types: some return a bare array of
/// names, some an array of objects, some wrap the array in a single-key
/// envelope (e.g. `{"resourceFile": [{"name": ..}]}`).
fn parse_name_list(listing: &Value) -> Vec<String> {
    fn from_array(items: &[Value]) -> Vec<String> {
        items
            .iter()
            .filter_map(|v| {
                v.as_str()
                    .or_else(|| v.get("name").and_then(Value::as_str))
                    .map(str::to_string)
            })
            .collect()
    }

    match listing {
        Value::Array(items) => from_array(items),
        Value::Object(map) => map
            .values()
            .find_map(|v| v.as_array())
            .map(|items| from_array(items))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

fn map_status(code: u16, detail: String) -> TransportError {
    match code {
        401 | 403 => TransportError::Auth(detail),
        429 => TransportError::RateLimited,
        _ => TransportError::Status { code, detail },
    }
}

#[async_trait]
impl Exporter for ManagementClient {
    async fn export(
        &self,
        resource_type: ResourceType,
        scope: &Scope,
    ) -> Result<Vec<ResourceRecord>, TransportError> {
        let url = self.collection_url(resource_type, scope)?;
        tracing::debug!("Exporting {} from {}", resource_type, url);

        let listing = self.get_json(url).await?;
        let names = parse_name_list(&listing);

        let mut records = Vec::with_capacity(names.len());
        for name in &names {
            records.push(self.fetch_record(resource_type, scope, name).await?);
        }
        tracing::info!(
            "Exported {} {} record(s) from {}",
            records.len(),
            resource_type,
            scope
        );
        Ok(records)
    }
}

#[async_trait]
impl TargetClient for ManagementClient {
    async fn validate_import(
        &self,
        record: &ResourceRecord,
    ) -> Result<ValidationOutcome, TransportError> {
        let segment = Self::path_segment(record.resource_type);
        let mut url = self
            .base_url
            .join(&format!("v1/organizations/{}/{}", self.org, segment))
            .map_err(|e| TransportError::Network(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("name", &record.name)
            .append_pair("action", "validate")
            .append_pair("validate", "true");

        tracing::debug!("Dry-run import of {} against target", record.identity());
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&record.raw)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(ValidationOutcome::Accepted);
        }

        let detail = resp.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(TransportError::Auth(detail)),
            429 => Err(TransportError::RateLimited),
            code if code >= 500 => Err(TransportError::Status { code, detail }),
            // A 4xx here is the target rejecting the bundle: a completed
            // call with a negative outcome, not a transport failure.
            _ => Ok(ValidationOutcome::Rejected(extract_rejection_detail(
                &detail,
            ))),
        }
    }
}

/// Pull the human-readable violation text out of a rejection body
fn extract_rejection_detail(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        if let Some(error) = parsed.get("error") {
            if let Some(details) = error.get("details") {
                return details.to_string();
            }
            if let Some(message) = error.get("message").and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    if body.is_empty() {
        "Rejected by target with no detail".to_string()
    } else {
        body.to_string()
    }
}
