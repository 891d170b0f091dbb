//! Image caption inference.
//!
//! The hosted model answers with a JSON array of results, each carrying a
//! `generated_text`. Only the first result is used.

pub mod huggingface;
pub mod mock;

pub use huggingface::{HuggingFaceCaptioner, HuggingFaceConfig};
pub use mock::MockCaptioner;

use async_trait::async_trait;
use serde::Deserialize;
use service_core::error::ExternalServiceError;

#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Generate a caption for raw image bytes.
    async fn caption(&self, image: &[u8]) -> Result<String, ExternalServiceError>;
}

#[derive(Debug, Deserialize)]
struct CaptionResult {
    generated_text: Option<String>,
}

/// Validate an inference response body and pull out the first caption.
pub fn parse_caption_response(body: &[u8]) -> Result<String, ExternalServiceError> {
    let results: Vec<CaptionResult> = serde_json::from_slice(body).map_err(|e| {
        ExternalServiceError::InferenceFormat(format!("expected a result array: {}", e))
    })?;

    let first = results
        .into_iter()
        .next()
        .ok_or_else(|| ExternalServiceError::InferenceFormat("no results returned".to_string()))?;

    first
        .generated_text
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            ExternalServiceError::InferenceFormat("first result has no generated_text".to_string())
        })
}
