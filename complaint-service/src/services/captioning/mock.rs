//! Mock caption provider for local development and tests.

use super::CaptionProvider;
use async_trait::async_trait;
use service_core::error::ExternalServiceError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a fixed caption, or fails when constructed with [`MockCaptioner::failing`].
pub struct MockCaptioner {
    caption: Option<String>,
    calls: AtomicUsize,
}

impl MockCaptioner {
    pub fn new(caption: impl Into<String>) -> Self {
        Self {
            caption: Some(caption.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider whose responses never contain a caption.
    pub fn failing() -> Self {
        Self {
            caption: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCaptioner {
    fn default() -> Self {
        Self::new("a photo attached to a complaint")
    }
}

#[async_trait]
impl CaptionProvider for MockCaptioner {
    async fn caption(&self, image: &[u8]) -> Result<String, ExternalServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.caption {
            Some(caption) => Ok(caption.clone()),
            None => Err(ExternalServiceError::InferenceFormat(format!(
                "mock provider returned no results for {} bytes",
                image.len()
            ))),
        }
    }
}
