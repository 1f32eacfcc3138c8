use std::sync::Arc;

use tracing::debug;

use crate::ocr::fields::FieldExtractor;
use crate::ocr::recognizer::{
    RecognitionResult, RecognizeError, TextRecognizer, UploadedImage,
};

/// Ties upload validation, the provider call and field extraction together.
/// Holds no per-request state, so one instance serves every request.
pub struct Relay {
    recognizer: Arc<dyn TextRecognizer>,
    max_image_bytes: usize,
    extractor: FieldExtractor,
}

impl Relay {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        max_image_bytes: usize,
        extractor: FieldExtractor,
    ) -> Self {
        Self {
            recognizer,
            max_image_bytes,
            extractor,
        }
    }

    /// Runs one upload through the full pipeline. Validation failures
    /// return before the provider is touched.
    #[tracing::instrument(level = "info", skip(self, image))]
    pub async fn recognize_text(
        &self,
        image: UploadedImage,
    ) -> Result<RecognitionResult, RecognizeError> {
        image.validate(self.max_image_bytes)?;
        debug!(
            "forwarding {} bytes of {} ({}) to the provider",
            image.bytes.len(),
            image.content_type,
            image.display_name()
        );
        let text = self.recognizer.recognize(&image).await?;
        let fields = self.extractor.extract(&text);
        Ok(RecognitionResult { text, fields })
    }
}
