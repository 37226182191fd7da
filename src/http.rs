//! HTTP client adapter for contract runs.
//!
//! Non-2xx statuses are data here, not errors: the agent reports them
//! normally so negative-path steps can assert on 404s and 400s. Only
//! transport-level failures (DNS, refused connections, timeouts) error.
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::suite::Method;

/// Fully resolved request, ready to send.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Snapshot of one HTTP exchange, parsed as far as the body allows.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    /// Response headers, lowercase names.
    pub headers: BTreeMap<String, String>,
    pub raw_body: String,
    /// Parsed body when the server returned JSON; body assertions fail
    /// descriptively when this is `None`.
    pub json: Option<Value>,
}

impl HttpResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

/// Blocking HTTP client with contract-verification semantics baked in.
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    /// Build an agent that treats every status as data, with one global
    /// per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.new_agent(),
        }
    }

    /// Send one request; fails only on transport-level errors.
    pub fn send(&self, request: &ResolvedRequest) -> Result<HttpResponse> {
        tracing::debug!(
            method = request.method.as_str(),
            url = request.url.as_str(),
            "dispatch request"
        );
        let response = self
            .dispatch(request)
            .with_context(|| format!("{} {}", request.method.as_str(), request.url))?;
        read_response(response)
    }

    fn dispatch(
        &self,
        request: &ResolvedRequest,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        match request.method {
            Method::Get | Method::Delete => {
                let mut builder = match request.method {
                    Method::Get => self.agent.get(&request.url),
                    _ => self.agent.delete(&request.url),
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                for (name, value) in &request.query {
                    builder = builder.query(name.as_str(), value.as_str());
                }
                builder.call()
            }
            Method::Post | Method::Patch => {
                let mut builder = match request.method {
                    Method::Post => self.agent.post(&request.url),
                    _ => self.agent.patch(&request.url),
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                for (name, value) in &request.query {
                    builder = builder.query(name.as_str(), value.as_str());
                }
                match request.body.as_ref() {
                    Some(body) => builder.send_json(body),
                    None => builder.send_empty(),
                }
            }
        }
    }
}

/// Join a suite base URL with a leading-slash target.
pub fn join_url(base_url: &str, target: &str) -> String {
    format!("{}{target}", base_url.trim_end_matches('/'))
}

fn read_response(mut response: ureq::http::Response<ureq::Body>) -> Result<HttpResponse> {
    let status = response.status().as_u16();
    let mut headers = BTreeMap::new();
    for (name, value) in response.headers() {
        if let Ok(text) = value.to_str() {
            headers.insert(name.as_str().to_string(), text.to_string());
        }
    }
    let raw_body = response
        .body_mut()
        .read_to_string()
        .context("read response body")?;
    tracing::debug!(status, body_bytes = raw_body.len(), "response received");
    let json = parse_body(&raw_body);
    Ok(HttpResponse {
        status,
        headers,
        raw_body,
        json,
    })
}

fn parse_body(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    serde_json::from_str(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::{join_url, parse_body};
    use serde_json::json;

    #[test]
    fn join_url_tolerates_trailing_slash() {
        assert_eq!(
            join_url("http://localhost:3000", "/extintor"),
            "http://localhost:3000/extintor"
        );
        assert_eq!(
            join_url("http://localhost:3000/", "/extintor"),
            "http://localhost:3000/extintor"
        );
    }

    #[test]
    fn body_parsing_is_best_effort() {
        assert_eq!(parse_body(""), None);
        assert_eq!(parse_body("   \n"), None);
        assert_eq!(parse_body("<html>not json</html>"), None);
        assert_eq!(parse_body(r#"{"id":1}"#), Some(json!({"id": 1})));
    }
}
