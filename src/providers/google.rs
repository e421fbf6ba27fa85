use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::errors::ProviderError;
use super::{map_reqwest_error, map_status_error, Provider};

/// Client for the public Google web translation endpoint
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    /// HTTP client for API requests
    client: Client,
    /// Base URL, e.g. `https://translate.googleapis.com`
    endpoint: String,
    /// Request timeout in seconds
    timeout_secs: u64,
}

/// Translation request for a single piece of text
#[derive(Debug, Clone)]
pub struct GoogleRequest {
    /// Text to translate
    pub text: String,
    /// Source language code, `auto` to let the service detect it
    pub source_language: String,
    /// Target language code
    pub target_language: String,
}

impl GoogleRequest {
    /// Create a request with automatic source detection
    pub fn new(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_language: "auto".to_string(),
            target_language: target_language.into(),
        }
    }

    /// Set the source language
    pub fn source_language(mut self, source_language: impl Into<String>) -> Self {
        self.source_language = source_language.into();
        self
    }
}

/// Translated text returned by the endpoint
#[derive(Debug, Clone)]
pub struct GoogleResponse {
    /// Translated text, sentence chunks joined back together
    pub text: String,
    /// Source language reported by the service, if any
    pub detected_language: Option<String>,
}

impl GoogleTranslate {
    /// Create a new client
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout_secs,
        }
    }

    /// Parse the nested-array body the endpoint answers with
    ///
    /// The first element is a list of `[translated, original, ...]` chunks,
    /// one per sentence; the third element is the detected source language.
    pub fn parse_body(body: &Value) -> Result<GoogleResponse, ProviderError> {
        let chunks = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("missing translation chunks".to_string()))?;

        let text: String = chunks
            .iter()
            .filter_map(|chunk| chunk.get(0).and_then(Value::as_str))
            .collect();

        let detected_language = body.get(2).and_then(Value::as_str).map(str::to_string);

        Ok(GoogleResponse {
            text,
            detected_language,
        })
    }
}

#[async_trait]
impl Provider for GoogleTranslate {
    type Request = GoogleRequest;
    type Response = GoogleResponse;

    async fn complete(&self, request: GoogleRequest) -> Result<GoogleResponse, ProviderError> {
        let url = format!("{}/translate_a/single", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", request.source_language.as_str()),
                ("tl", request.target_language.as_str()),
                ("dt", "t"),
                ("q", request.text.as_str()),
            ])
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let parsed = Self::parse_body(&body)?;
        debug!(
            "Google translated {} chars ({} -> {})",
            request.text.chars().count(),
            parsed.detected_language.as_deref().unwrap_or(&request.source_language),
            request.target_language
        );
        Ok(parsed)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.complete(GoogleRequest::new("Hello", "fr")).await.map(|_| ())
    }

    fn extract_text(response: &GoogleResponse) -> String {
        response.text.clone()
    }
}
