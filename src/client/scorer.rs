//! Naming-service client.
//!
//! - The service answers a GET with a JSONP body, treated as opaque text
//! - The score is the value following a fixed marker, up to the next quote
//! - Every request is paced by a [`Throttle`]; failures are never retried

use crate::client::Throttle;
use crate::models::{Config, ConfigError, FetchError, NamerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

/// Text immediately preceding the score in a service response.
pub const SCORE_MARKER: &str = r#""key":"score","value":""#;

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"{}([^"]*)""#, regex::escape(SCORE_MARKER)))
        .expect("score pattern is valid")
});

/// Anything that can score a given-name fragment.
#[async_trait]
pub trait ScoreSource: Send + Sync {
    /// Score `fragment` (one or more given-name characters).
    async fn score(&self, fragment: &str) -> std::result::Result<i64, FetchError>;
}

/// HTTP client for the naming service.
pub struct ScoreClient {
    client: reqwest::Client,
    endpoint: Url,
    last_name: String,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    gender: i32,
    throttle: Throttle,
}

impl ScoreClient {
    /// Create a client for the surname and birth time in `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            ConfigError::Invalid(format!("endpoint '{}': {e}", config.endpoint))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NamerError::Fetch(FetchError::Network(e)))?;

        Ok(Self {
            client,
            endpoint,
            last_name: config.last_name.clone(),
            year: config.year,
            month: config.month,
            day: config.day,
            hour: config.hour,
            minute: config.minute,
            gender: config.gender,
            throttle: Throttle::from_millis(config.request_delay_ms),
        })
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Build the query URL for `first_name`; `nonce_ms` only busts remote caches.
    pub fn request_url(&self, first_name: &str, nonce_ms: i64) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("year", &self.year.to_string())
            .append_pair("month", &format!("{:02}", self.month))
            .append_pair("day", &format!("{:02}", self.day))
            .append_pair("hour", &format!("{:02}", self.hour))
            .append_pair("min", &format!("{:02}", self.minute))
            .append_pair("timeType", "0")
            .append_pair("gender", &self.gender.to_string())
            .append_pair("flag", "1")
            .append_pair("cb", "jsonp1")
            .append_pair("fName", &self.last_name)
            .append_pair("lName", first_name)
            .append_pair("_", &nonce_ms.to_string());
        url
    }
}

#[async_trait]
impl ScoreSource for ScoreClient {
    async fn score(&self, fragment: &str) -> std::result::Result<i64, FetchError> {
        let url = self.request_url(fragment, Utc::now().timestamp_millis());

        self.throttle.pace().await;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(name = fragment, status = status.as_u16(), bytes = body.len(), "Score response");

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let score = extract_score(&body).ok_or_else(|| FetchError::UnparsableResponse {
            fragment: fragment.to_string(),
            body,
        })?;

        info!(name = fragment, score = score, "Name scored");
        Ok(score)
    }
}

/// Pull the integer following [`SCORE_MARKER`] out of a response body.
pub fn extract_score(body: &str) -> Option<i64> {
    SCORE_RE.captures(body)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        serde_json::from_value(serde_json::json!({
            "last_name": "王",
            "year": 2019, "month": 3, "day": 7, "hour": 8, "minute": 5,
            "gender": 1,
            "first_name_key_words": "明,华",
            "endpoint": "http://localhost:9/namedetail"
        }))
        .unwrap()
    }

    #[test]
    fn test_extract_score() {
        let body = r#"jsonp1({"data":[{"key":"name","value":"王明"},{"key":"score","value":"87"}]})"#;
        assert_eq!(extract_score(body), Some(87));
    }

    #[test]
    fn test_extract_score_zero_and_negative() {
        assert_eq!(extract_score(r#"{"key":"score","value":"0"}"#), Some(0));
        assert_eq!(extract_score(r#"{"key":"score","value":"-3"}"#), Some(-3));
    }

    #[test]
    fn test_extract_score_failures() {
        assert_eq!(extract_score("jsonp1({})"), None);
        assert_eq!(extract_score(r#"{"key":"score","value":""}"#), None);
        assert_eq!(extract_score(r#"{"key":"score","value":"high"}"#), None);
        assert_eq!(extract_score(r#"{"key":"score","value":"87"#), None);
    }

    #[test]
    fn test_request_url() {
        let client = ScoreClient::new(&config()).unwrap();
        let url = client.request_url("明华", 1_700_000_000_000);

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(url.path(), "/namedetail");
        assert_eq!(get("year"), "2019");
        assert_eq!(get("month"), "03");
        assert_eq!(get("day"), "07");
        assert_eq!(get("hour"), "08");
        assert_eq!(get("min"), "05");
        assert_eq!(get("gender"), "1");
        assert_eq!(get("fName"), "王");
        assert_eq!(get("lName"), "明华");
        assert_eq!(get("_"), "1700000000000");
        assert!(!url.as_str().contains("明"), "names must be escaped");
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = config();
        config.endpoint = "not a url".to_string();
        assert!(matches!(
            ScoreClient::new(&config),
            Err(NamerError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_throttle_follows_config() {
        let client = ScoreClient::new(&config()).unwrap();
        assert_eq!(client.throttle().interval(), Duration::from_millis(300));
    }
}
