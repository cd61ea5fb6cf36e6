//! HTTP delivery of analytics and diagnostic payloads.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, DATE};
use uuid::Uuid;

use eventflow_core::{SendResult, Sender};
use eventflow_model::EpochMillis;

use crate::error::{classify_status, classify_transport_error, Classification};

const EVENT_SCHEMA_HEADER: &str = "X-LaunchDarkly-Event-Schema";
const PAYLOAD_ID_HEADER: &str = "X-LaunchDarkly-Payload-ID";
const EVENT_SCHEMA_VERSION: &str = "4";

/// Delivers formatted payloads to the collection service over HTTP, with
/// a single retry for recoverable failures and server-date extraction
/// for clock-skew compensation.
pub struct HttpSender {
    client: reqwest::Client,
    base_uri: String,
    retry_delay: Duration,
    default_headers: HeaderMap,
}

impl HttpSender {
    /// Construct a sender. `base_uri` may or may not have a trailing
    /// slash; any path prefix on it is preserved, with `/bulk` or
    /// `/diagnostic` appended.
    pub fn new(client: reqwest::Client, base_uri: impl Into<String>, retry_delay: Duration) -> Self {
        Self {
            client,
            base_uri: base_uri.into(),
            retry_delay,
            default_headers: HeaderMap::new(),
        }
    }

    /// Builder-style: add a header sent with every request (e.g.
    /// authorization).
    #[must_use]
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_uri.trim_end_matches('/'), path)
    }

    async fn post_with_retry(&self, url: &str, bytes: Vec<u8>, analytics_headers: bool) -> SendResult {
        let payload_id = analytics_headers.then(|| Uuid::new_v4().to_string());

        let first = self.attempt(url, bytes.clone(), payload_id.as_deref()).await;
        match first {
            Ok(outcome) => return outcome,
            Err(Classification::Unrecoverable) => {
                return SendResult::unrecoverable_failure();
            }
            Err(Classification::Recoverable) => {
                tracing::warn!(url = %url, "recoverable delivery failure, retrying once");
            }
            Err(Classification::Success) => unreachable!("Err variant is never Success"),
        }

        tokio::time::sleep(self.retry_delay).await;

        match self.attempt(url, bytes, payload_id.as_deref()).await {
            Ok(outcome) => outcome,
            Err(Classification::Unrecoverable) => {
                tracing::error!(url = %url, "retry attempt failed with an unrecoverable error");
                SendResult::unrecoverable_failure()
            }
            Err(Classification::Recoverable) => {
                tracing::warn!(url = %url, "retry also failed, giving up");
                SendResult::recoverable_failure()
            }
            Err(Classification::Success) => unreachable!("Err variant is never Success"),
        }
    }

    /// One HTTP attempt. `Ok` carries the reduced [`SendResult`] for a
    /// successful response; `Err` carries the classification so the
    /// caller can decide whether to retry.
    async fn attempt(
        &self,
        url: &str,
        bytes: Vec<u8>,
        payload_id: Option<&str>,
    ) -> Result<SendResult, Classification> {
        let mut request = self
            .client
            .post(url)
            .headers(self.default_headers.clone())
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(bytes);

        if let Some(payload_id) = payload_id {
            request = request
                .header(EVENT_SCHEMA_HEADER, EVENT_SCHEMA_VERSION)
                .header(PAYLOAD_ID_HEADER, payload_id);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "network error sending event payload");
                return Err(classify_transport_error(&err));
            }
        };

        let status = response.status();
        match classify_status(status.as_u16()) {
            Classification::Success => {
                let server_time = parse_server_date(response.headers());
                Ok(SendResult {
                    success: true,
                    must_shut_down: false,
                    server_time,
                })
            }
            classification @ (Classification::Recoverable | Classification::Unrecoverable) => {
                if classification == Classification::Unrecoverable {
                    tracing::error!(status = %status, "unrecoverable delivery error");
                } else {
                    tracing::warn!(status = %status, "recoverable delivery error");
                }
                Err(classification)
            }
        }
    }
}

#[async_trait::async_trait]
impl Sender for HttpSender {
    async fn send_analytics_events(&self, bytes: Vec<u8>, count: usize) -> SendResult {
        if bytes.is_empty() {
            return SendResult::ok();
        }
        tracing::debug!(count, "sending analytics event payload");
        let url = self.endpoint("bulk");
        self.post_with_retry(&url, bytes, true).await
    }

    async fn send_diagnostic_event(&self, bytes: Vec<u8>) -> SendResult {
        if bytes.is_empty() {
            return SendResult::ok();
        }
        tracing::debug!("sending diagnostic event");
        let url = self.endpoint("diagnostic");
        self.post_with_retry(&url, bytes, false).await
    }
}

/// Best-effort RFC-1123 `Date` header parse. Parse failure is logged at
/// warn and treated as absent, never propagated as an error.
fn parse_server_date(headers: &HeaderMap) -> Option<EpochMillis> {
    let raw = headers.get(DATE)?.to_str().ok()?;
    match httpdate::parse_http_date(raw) {
        Ok(time) => {
            let millis = time
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            Some(EpochMillis::from_millis(millis))
        }
        Err(err) => {
            tracing::warn!(raw_date = %raw, error = %err, "failed to parse server Date header");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_handles_trailing_slash() {
        let sender = HttpSender::new(reqwest::Client::new(), "https://events.example.com/", Duration::from_millis(1));
        assert_eq!(sender.endpoint("bulk"), "https://events.example.com/bulk");
    }

    #[test]
    fn endpoint_without_trailing_slash() {
        let sender = HttpSender::new(reqwest::Client::new(), "https://events.example.com", Duration::from_millis(1));
        assert_eq!(sender.endpoint("bulk"), "https://events.example.com/bulk");
    }

    #[test]
    fn endpoint_preserves_path_prefix() {
        let sender = HttpSender::new(
            reqwest::Client::new(),
            "https://proxy.example.com/ld-proxy",
            Duration::from_millis(1),
        );
        assert_eq!(sender.endpoint("bulk"), "https://proxy.example.com/ld-proxy/bulk");
        assert_eq!(sender.endpoint("diagnostic"), "https://proxy.example.com/ld-proxy/diagnostic");
    }

    #[tokio::test]
    async fn empty_payload_short_circuits_without_http_call() {
        let sender = HttpSender::new(reqwest::Client::new(), "http://127.0.0.1:1", Duration::from_millis(1));
        let result = sender.send_analytics_events(Vec::new(), 0).await;
        assert!(result.success);
        assert!(!result.must_shut_down);
    }

    #[tokio::test]
    async fn empty_diagnostic_payload_short_circuits() {
        let sender = HttpSender::new(reqwest::Client::new(), "http://127.0.0.1:1", Duration::from_millis(1));
        let result = sender.send_diagnostic_event(Vec::new()).await;
        assert!(result.success);
    }

    #[test]
    fn parse_server_date_rejects_malformed_header() {
        let mut headers = HeaderMap::new();
        headers.insert(DATE, HeaderValue::from_static("not a date"));
        assert_eq!(parse_server_date(&headers), None);
    }

    #[test]
    fn parse_server_date_accepts_rfc1123() {
        let mut headers = HeaderMap::new();
        headers.insert(DATE, HeaderValue::from_static("Tue, 15 Nov 1994 08:12:31 GMT"));
        let parsed = parse_server_date(&headers).expect("should parse");
        assert_eq!(parsed.as_millis(), 784887151000);
    }
}
