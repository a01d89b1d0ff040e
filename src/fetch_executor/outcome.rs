//! Fetch request/outcome types and the failure taxonomy

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

use super::block_detection::SecurityBlockSignal;
use crate::config::FetchDefaults;
use crate::renderer::DocumentOptions;

/// Failure classification carried by every unsuccessful outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Timeout,
    NetworkError,
    Blocked,
    NotFound,
    QueueFull,
}

impl ErrorKind {
    /// Only transient kinds are retried; block, not-found and queue-full are
    /// terminal.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::NetworkError)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "Timeout",
            Self::NetworkError => "NetworkError",
            Self::Blocked => "Blocked",
            Self::NotFound => "NotFound",
            Self::QueueFull => "QueueFull",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical fetch. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub timeout: Duration,
    pub settle_delay: Duration,
    /// Export the rendered page as a paginated document alongside the content
    pub export: Option<DocumentOptions>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, defaults: &FetchDefaults) -> Self {
        Self {
            url: url.into(),
            timeout: defaults.navigation_timeout(),
            settle_delay: defaults.settle_delay(),
            export: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn with_export(mut self, options: DocumentOptions) -> Self {
        self.export = Some(options);
        self
    }
}

/// The single result of a logical fetch, whatever the retry count
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchOutcome {
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_content: Option<String>,
    /// Exported document, base64 in JSON
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_base64"
    )]
    pub document: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_signal: Option<SecurityBlockSignal>,
    pub elapsed_ms: u64,
    pub attempts: u32,
}

impl FetchOutcome {
    /// Failure outcome with no page content
    pub fn failure(url: impl Into<String>, kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.into(),
            error_kind: Some(kind),
            error: Some(error.into()),
            blocked: kind == ErrorKind::Blocked,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

fn serialize_base64<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_kinds_retry() {
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::NetworkError.is_retryable());
        assert!(!ErrorKind::Blocked.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(!ErrorKind::QueueFull.is_retryable());
    }

    #[test]
    fn test_outcome_json_shape() {
        let mut outcome = FetchOutcome::failure("https://a.test/", ErrorKind::Blocked, "challenge");
        outcome.document = Some(b"%PDF".to_vec());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error_kind"], "Blocked");
        assert_eq!(json["blocked"], true);
        assert_eq!(json["success"], false);
        assert_eq!(json["document"], "JVBERg==");
        assert!(json.get("sanitized_content").is_none());
    }
}
