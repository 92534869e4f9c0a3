//! External classifier client
//!
//! Thin reqwest wrapper around the classifier's `POST /analyze` endpoint.
//! Every call is bounded by the configured timeout; a timeout or non-success
//! status is "no verdict", never "content is safe". The heavy worker pool is
//! the only caller.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{RefugeError, Result};

/// One label reported by the classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Classifier verdict for one piece of content
#[derive(Debug, Clone, Deserialize)]
pub struct Analysis {
    pub is_abusive: bool,
    pub confidence_score: f64,
    #[serde(default)]
    pub flags: Vec<LabelScore>,
}

impl Analysis {
    /// Label of the top-reported flag, if any
    pub fn top_label(&self) -> Option<&str> {
        self.flags.first().map(|f| f.label.as_str())
    }
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    content: &'a str,
}

/// HTTP client for the external content classifier.
pub struct ClassifierClient {
    base_url: String,
    client: reqwest::Client,
}

impl ClassifierClient {
    /// Create a client with a bounded per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Analyze one piece of plaintext content.
    pub async fn analyze(&self, content: &str) -> Result<Analysis> {
        let url = format!("{}/analyze", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&AnalyzeRequest { content })
            .send()
            .await
            .map_err(|e| RefugeError::Upstream(format!("classifier request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RefugeError::Upstream(format!(
                "classifier returned status {}",
                response.status()
            )));
        }

        response
            .json::<Analysis>()
            .await
            .map_err(|e| RefugeError::Upstream(format!("invalid classifier response: {}", e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_decoding() {
        let json = r#"{
            "is_abusive": true,
            "confidence_score": 0.93,
            "flags": [
                {"label": "threat", "score": 0.93},
                {"label": "toxic", "score": 0.71}
            ]
        }"#;

        let analysis: Analysis = serde_json::from_str(json).unwrap();
        assert!(analysis.is_abusive);
        assert_eq!(analysis.confidence_score, 0.93);
        assert_eq!(analysis.top_label(), Some("threat"));
    }

    #[test]
    fn test_analysis_decoding_without_flags() {
        let json = r#"{"is_abusive": false, "confidence_score": 0.1}"#;

        let analysis: Analysis = serde_json::from_str(json).unwrap();
        assert!(!analysis.is_abusive);
        assert!(analysis.top_label().is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ClassifierClient::new("http://localhost:5001/", Duration::from_secs(5));
        assert_eq!(client.base_url, "http://localhost:5001");
    }
}
