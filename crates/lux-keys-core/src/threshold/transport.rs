//! Transport seam for the threshold service: JSON POST with a per-request
//! deadline. The HTTP implementation is the production path; tests swap in
//! a recording fake.

use std::time::Duration;

use serde_json::Value;

use crate::error::{KeyError, Result};

pub trait Transport: Send + Sync {
    fn post(&self, path: &str, body: &Value, timeout: Duration) -> Result<Value>;
}

/// Plain-HTTP JSON transport over a blocking client. TLS termination is a
/// deployment concern; the current service contract is localhost HTTP.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| KeyError::ServiceUnreachable(e.to_string()))?;
        Ok(HttpTransport {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn post(&self, path: &str, body: &Value, timeout: Duration) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .map_err(|e| KeyError::ServiceUnreachable(redact_url(&e.to_string())))?;
        response
            .json()
            .map_err(|e| KeyError::ServiceUnreachable(redact_url(&e.to_string())))
    }
}

// reqwest error strings embed the full URL; keep messages to host-level
// detail.
fn redact_url(msg: &str) -> String {
    msg.split(" for url ").next().unwrap_or(msg).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let t = HttpTransport::new("http://localhost:9630/").unwrap();
        assert_eq!(t.base_url(), "http://localhost:9630");
    }

    #[test]
    fn unreachable_service_maps_to_service_unreachable() {
        // Reserved port with nothing listening; the failure must be typed,
        // not an IO panic.
        let t = HttpTransport::new("http://127.0.0.1:1").unwrap();
        let err = t.post(
            "/v1/health",
            &serde_json::json!({}),
            Duration::from_millis(200),
        );
        assert!(matches!(err, Err(KeyError::ServiceUnreachable(_))));
    }
}
