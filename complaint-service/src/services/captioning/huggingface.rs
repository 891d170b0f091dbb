//! Hugging Face hosted inference provider.

use super::{parse_caption_response, CaptionProvider};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use service_core::error::{AppError, ExternalServiceError};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub timeout: Duration,
}

pub struct HuggingFaceCaptioner {
    config: HuggingFaceConfig,
    client: Client,
}

impl HuggingFaceCaptioner {
    pub fn new(config: HuggingFaceConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl CaptionProvider for HuggingFaceCaptioner {
    async fn caption(&self, image: &[u8]) -> Result<String, ExternalServiceError> {
        tracing::debug!(
            url = %self.config.api_url,
            image_len = image.len(),
            "Sending image to caption model"
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| ExternalServiceError::Inference(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ExternalServiceError::Inference(e.to_string()))?;

        if !status.is_success() {
            return Err(ExternalServiceError::Inference(format!(
                "Hugging Face API error {}: {}",
                status,
                String::from_utf8_lossy(&body)
            )));
        }

        tracing::debug!(
            response = %String::from_utf8_lossy(&body),
            "Caption model response"
        );

        parse_caption_response(&body)
    }
}
