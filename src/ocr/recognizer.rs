use std::collections::BTreeMap;

use axum::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Shown to users when the provider fails; the real cause only goes to the log.
pub const PROVIDER_FAILURE_MESSAGE: &str =
    "Text recognition failed, please try again in a moment.";

// As per https://cloud.google.com/vision/docs/supported-files
pub static VALID_IMAGE_MIME_TYPES: [&str; 8] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/x-icon",
    "image/vnd.microsoft.icon",
    "image/tiff",
];

/// An image exactly as the client sent it: raw bytes plus the content type
/// declared for them. Lives for one request and is never written anywhere.
#[derive(Debug)]
pub struct UploadedImage {
    pub bytes: Box<[u8]>,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl UploadedImage {
    /// Reject uploads the provider would refuse, before any bytes leave the
    /// process.
    pub fn validate(&self, max_bytes: usize) -> Result<(), RecognizeError> {
        if self.bytes.is_empty() {
            return Err(RecognizeError::InvalidInput(
                "Uploaded file is empty".to_string(),
            ));
        }
        if !VALID_IMAGE_MIME_TYPES.contains(&self.content_type.as_str()) {
            return Err(RecognizeError::InvalidInput(format!(
                "Unsupported content type {}",
                self.content_type
            )));
        }
        if self.bytes.len() > max_bytes {
            return Err(RecognizeError::InvalidInput(format!(
                "Image is {} bytes, the limit is {} bytes",
                self.bytes.len(),
                max_bytes
            )));
        }
        Ok(())
    }

    /// Name for log lines; browsers are not required to send one.
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("unnamed upload")
    }
}

/// The text read out of one image. `text` is empty when the provider found
/// none; `fields` holds one entry per configured extraction pattern.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub text: String,
    pub fields: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Error)]
pub enum RecognizeError {
    /// Caller-side defect, raised before any network call is made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Collaborator-side defect: the provider call failed or its response
    /// could not be used.
    #[error("provider request failed")]
    Provider(#[source] anyhow::Error),
}

impl RecognizeError {
    /// The message a user may see. Provider internals never pass through
    /// here, only the log gets those.
    pub fn user_message(&self) -> String {
        match self {
            RecognizeError::InvalidInput(reason) => reason.clone(),
            RecognizeError::Provider(_) => PROVIDER_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// The one seam to the outside world: an image goes in, the recognized text
/// comes back, empty when the provider saw none.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &UploadedImage) -> Result<String, RecognizeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::test_support::{jpeg_upload, upload_with_type};

    #[test]
    fn accepts_a_plain_jpeg() {
        let image = jpeg_upload(b"fake jpeg bytes");
        assert!(image.validate(1024).is_ok());
    }

    #[test]
    fn rejects_an_empty_file() {
        let image = jpeg_upload(b"");
        let err = image.validate(1024).unwrap_err();
        assert!(matches!(err, RecognizeError::InvalidInput(_)));
        assert!(err.user_message().contains("empty"));
    }

    #[test]
    fn rejects_an_undeclared_content_type() {
        let image = upload_with_type(b"just text", "application/octet-stream");
        let err = image.validate(1024).unwrap_err();
        assert!(err.user_message().contains("Unsupported content type"));
    }

    #[test]
    fn rejects_text_masquerading_as_an_image() {
        let image = upload_with_type(b"hello", "text/plain");
        assert!(image.validate(1024).is_err());
    }

    #[test]
    fn rejects_an_oversized_image() {
        let image = jpeg_upload(&[0u8; 32]);
        let err = image.validate(16).unwrap_err();
        assert!(err.user_message().contains("limit"));
    }

    #[test]
    fn size_check_is_inclusive_of_the_limit() {
        let image = jpeg_upload(&[0u8; 16]);
        assert!(image.validate(16).is_ok());
    }

    #[test]
    fn the_display_name_falls_back_for_anonymous_uploads() {
        assert_eq!(jpeg_upload(b"x").display_name(), "upload.jpg");
        let anonymous = UploadedImage {
            bytes: vec![b'x'].into_boxed_slice(),
            content_type: "image/jpeg".to_string(),
            file_name: None,
        };
        assert_eq!(anonymous.display_name(), "unnamed upload");
    }

    #[test]
    fn provider_errors_surface_a_generic_message() {
        let err = RecognizeError::Provider(anyhow::anyhow!(
            "PERMISSION_DENIED: key expired for project ocr-12345"
        ));
        let message = err.user_message();
        assert_eq!(message, PROVIDER_FAILURE_MESSAGE);
        assert!(!message.contains("ocr-12345"));
    }
}
