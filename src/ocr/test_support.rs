use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use axum::async_trait;

use crate::ocr::recognizer::{RecognizeError, TextRecognizer, UploadedImage};

/// Canned recognizer for tests. Counts calls so tests can assert that
/// rejected uploads never reach the provider.
pub(crate) struct StubRecognizer {
    reply: Result<String, String>,
    calls: AtomicUsize,
}

impl StubRecognizer {
    pub(crate) fn with_text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing(detail: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(detail.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for StubRecognizer {
    async fn recognize(&self, _image: &UploadedImage) -> Result<String, RecognizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(detail) => Err(RecognizeError::Provider(anyhow!("{detail}"))),
        }
    }
}

pub(crate) fn jpeg_upload(bytes: &[u8]) -> UploadedImage {
    upload_with_type(bytes, "image/jpeg")
}

pub(crate) fn upload_with_type(bytes: &[u8], content_type: &str) -> UploadedImage {
    UploadedImage {
        bytes: bytes.to_vec().into_boxed_slice(),
        content_type: content_type.to_string(),
        file_name: Some("upload.jpg".to_string()),
    }
}
