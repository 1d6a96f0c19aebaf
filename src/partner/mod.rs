//! Repairline partner API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::PartnerConfig;

const USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Error)]
pub enum PartnerError {
    #[error("Repairline API credentials are not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("invalid base URL {0}")]
    BaseUrl(String),
}

impl PartnerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PartnerError::Status { status: 404, .. })
    }
}

/// Read access to the partner's case data.
#[async_trait]
pub trait PartnerApi: Send + Sync {
    /// Ids of every case the partner currently lists.
    async fn list_cases(&self) -> Result<Vec<i64>, PartnerError>;

    /// Full detail payload for one case id.
    async fn fetch_case(&self, case_id: i64) -> Result<Value, PartnerError>;

    /// Lookup by human-facing case number; `None` when the partner answers 404.
    async fn fetch_case_by_number(&self, case_number: &str) -> Result<Option<Value>, PartnerError>;
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

pub struct RepairlineClient {
    http: reqwest::Client,
    base_url: Url,
    export_base_url: Url,
    credentials: Option<Credentials>,
    request_timeout: Duration,
    list_timeout: Duration,
}

impl RepairlineClient {
    pub fn new(config: &PartnerConfig) -> Result<Self, PartnerError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| PartnerError::Request(e.to_string()))?;

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            http,
            base_url: parse_base(&config.base_url)?,
            export_base_url: parse_base(&config.export_base_url)?,
            credentials,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            list_timeout: Duration::from_secs(config.list_timeout_secs),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn get_json(&self, url: Url, timeout: Duration) -> Result<Value, PartnerError> {
        let credentials = self.credentials.as_ref().ok_or(PartnerError::NotConfigured)?;

        let resp = self
            .http
            .get(url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| PartnerError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PartnerError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| PartnerError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PartnerApi for RepairlineClient {
    async fn list_cases(&self) -> Result<Vec<i64>, PartnerError> {
        let url = endpoint(&self.base_url, &["cases"])?;
        let body = self.get_json(url, self.list_timeout).await?;
        case_ids_from_list(&body)
    }

    async fn fetch_case(&self, case_id: i64) -> Result<Value, PartnerError> {
        let url = endpoint(&self.base_url, &["cases", &case_id.to_string()])?;
        self.get_json(url, self.request_timeout).await
    }

    async fn fetch_case_by_number(&self, case_number: &str) -> Result<Option<Value>, PartnerError> {
        let url = endpoint(&self.export_base_url, &["Cases", case_number.trim()])?;
        match self.get_json(url, self.request_timeout).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Pull the `CaseId` of every entry out of the list response.
pub fn case_ids_from_list(body: &Value) -> Result<Vec<i64>, PartnerError> {
    let entries = body
        .as_array()
        .ok_or_else(|| PartnerError::Decode("case list is not an array".to_string()))?;

    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.get("CaseId").and_then(case_id_value) {
            Some(id) => ids.push(id),
            None => tracing::warn!("Skipping case list entry without a usable CaseId: {}", entry),
        }
    }
    Ok(ids)
}

fn case_id_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_base(raw: &str) -> Result<Url, PartnerError> {
    let url = Url::parse(raw).map_err(|e| PartnerError::BaseUrl(format!("{}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(PartnerError::BaseUrl(raw.to_string()));
    }
    Ok(url)
}

/// Append path segments to `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, PartnerError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| PartnerError::BaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_case_ids() {
        let body = json!([{"CaseId": 17}, {"CaseId": "18"}, {"CaseNumber": "X"}]);
        assert_eq!(case_ids_from_list(&body).unwrap(), vec![17, 18]);
        assert!(case_ids_from_list(&json!({"CaseId": 1})).is_err());
    }

    #[test]
    fn client_without_credentials_is_not_configured() {
        let client = RepairlineClient::new(&PartnerConfig::default()).unwrap();
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn requests_without_credentials_fail_before_sending() {
        let client = RepairlineClient::new(&PartnerConfig::default()).unwrap();
        assert!(matches!(client.fetch_case(1).await, Err(PartnerError::NotConfigured)));
        assert!(matches!(client.fetch_case_by_number("A-1").await, Err(PartnerError::NotConfigured)));
    }

    #[test]
    fn endpoints_join_with_or_without_trailing_slash() {
        let with = parse_base("http://x/v2/").unwrap();
        let without = parse_base("http://x/v2").unwrap();
        assert_eq!(endpoint(&with, &["cases", "7"]).unwrap().as_str(), "http://x/v2/cases/7");
        assert_eq!(endpoint(&without, &["cases"]).unwrap().as_str(), "http://x/v2/cases");
    }

    #[test]
    fn case_numbers_are_percent_encoded() {
        let base = parse_base("http://x/").unwrap();
        assert_eq!(endpoint(&base, &["Cases", "A 1/2"]).unwrap().as_str(), "http://x/Cases/A%201%2F2");
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(parse_base("not a url"), Err(PartnerError::BaseUrl(_))));
        assert!(matches!(parse_base("mailto:ops@example.de"), Err(PartnerError::BaseUrl(_))));
    }

    #[test]
    fn not_found_is_detected() {
        let err = PartnerError::Status { status: 404, body: String::new() };
        assert!(err.is_not_found());
        assert!(!PartnerError::Request("timeout".into()).is_not_found());
    }
}
