//! Gemini API HTTP client
//!
//! Handles request construction, authentication and bounded retry on
//! rate limiting (HTTP 429).

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::error::{Error, Result};

use super::types::*;

/// Base URL for the Gemini generative language API
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1";

/// Gemini API client
///
/// Rate-limited requests (HTTP 429) are retried after a fixed delay, up to
/// `max_retries` additional attempts. Any other upstream failure propagates
/// immediately.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(Error::Http)?;

        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => GEMINI_API_URL.to_string(),
        };

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url,
            max_retries: 2,
            retry_delay: Duration::from_secs(10),
        })
    }

    /// Override the base URL (for testing or custom endpoints)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Override the rate-limit retry delay (for testing)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one prompt and return the model's reply text.
    pub async fn generate_content(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest::from_prompt(prompt);

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "Gemini rate limit hit, retrying after delay");
                tokio::time::sleep(self.retry_delay).await;
            }

            debug!("Sending request to Gemini API: {}", url);

            let response = self
                .client
                .post(&url)
                .query(&[("key", &self.api_key)])
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await
                .map_err(Error::Http)?;

            let status = response.status();
            let body = response.text().await.map_err(Error::Http)?;

            if status.as_u16() == 429 && attempt < self.max_retries {
                last_error = Some(Error::GeminiApi(format!("{}: {}", status, body)));
                continue;
            }

            if !status.is_success() {
                warn!("Gemini API error: {} - {}", status, body);
                return Err(Error::GeminiApi(format!("{}: {}", status, body)));
            }

            let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
                Error::GeminiApi(format!("Failed to parse response: {} - {}", e, body))
            })?;

            return parsed
                .text()
                .ok_or_else(|| Error::GeminiApi(format!("Response contained no text: {}", body)));
        }

        Err(last_error
            .unwrap_or_else(|| Error::GeminiApi("request failed after retries".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> GeminiClient {
        GeminiClient::new(&GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: None,
        })
        .unwrap()
        .with_base_url(base_url.to_string())
        .with_retry_delay(Duration::from_millis(10))
    }

    fn success_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": text}], "role": "model"},
                "finishReason": "STOP"
            }]
        })
    }

    #[tokio::test]
    async fn test_generate_content_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("hello")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let text = client.generate_content("hi").await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_retries_on_429_then_succeeds() {
        let server = MockServer::start().await;

        // First two requests are rate limited, third succeeds.
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .up_to_n_times(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("after retry")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let text = client.generate_content("hi").await.unwrap();
        assert_eq!(text, "after retry");
    }

    #[tokio::test]
    async fn test_exhausts_retry_budget_on_429() {
        let server = MockServer::start().await;

        // Initial attempt plus two retries, all rate limited.
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client.generate_content("hi").await;
        assert!(matches!(result, Err(Error::GeminiApi(_))));
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates_immediately() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client.generate_content("hi").await;
        assert!(matches!(result, Err(Error::GeminiApi(_))));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client.generate_content("hi").await;
        assert!(matches!(result, Err(Error::GeminiApi(_))));
    }
}
