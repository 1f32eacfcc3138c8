use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::async_trait;
use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ocr::recognizer::{RecognizeError, TextRecognizer, UploadedImage};

const TEXT_DETECTION: &str = "TEXT_DETECTION";

/// Client for the Cloud Vision `images:annotate` endpoint. One call per
/// request, no retries; a failed call is the caller's problem to report.
pub struct VisionOcr {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl VisionOcr {
    pub fn new(endpoint: Url, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building the provider HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl TextRecognizer for VisionOcr {
    #[tracing::instrument(level = "info", skip(self, image))]
    async fn recognize(&self, image: &UploadedImage) -> Result<String, RecognizeError> {
        let request = AnnotateRequest {
            requests: vec![AnnotateItem {
                image: ImageContent {
                    content: Base64::encode_string(&image.bytes),
                },
                features: vec![Feature {
                    r#type: TEXT_DETECTION,
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                RecognizeError::Provider(anyhow!(err).context("sending annotate request"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognizeError::Provider(anyhow!(
                "provider returned {status}: {body}"
            )));
        }

        let annotate: AnnotateResponse = response.json().await.map_err(|err| {
            RecognizeError::Provider(anyhow!(err).context("decoding annotate response"))
        })?;

        extract_primary_text(annotate)
    }
}

/// The first annotation is the provider's concatenation of everything it
/// read; the entries after it are per-word boxes this service has no use
/// for.
fn extract_primary_text(annotate: AnnotateResponse) -> Result<String, RecognizeError> {
    let response = match annotate.responses.into_iter().next() {
        Some(response) => response,
        None => {
            return Err(RecognizeError::Provider(anyhow!(
                "annotate response carried no entries"
            )))
        }
    };
    if let Some(status) = response.error {
        return Err(RecognizeError::Provider(anyhow!(
            "provider error {}: {}",
            status.code,
            status.message
        )));
    }
    Ok(response
        .text_annotations
        .into_iter()
        .next()
        .map(|annotation| annotation.description)
        .unwrap_or_default())
}

#[derive(Serialize, Debug)]
struct AnnotateRequest {
    requests: Vec<AnnotateItem>,
}

#[derive(Serialize, Debug)]
struct AnnotateItem {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Serialize, Debug)]
struct ImageContent {
    /// Base64-encoded image bytes, forwarded exactly as uploaded.
    content: String,
}

#[derive(Serialize, Debug)]
struct Feature {
    r#type: &'static str,
}

#[derive(Deserialize, Debug)]
struct AnnotateResponse {
    responses: Vec<ImageResponse>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct ImageResponse {
    text_annotations: Vec<TextAnnotation>,
    error: Option<ProviderStatus>,
}

#[derive(Deserialize, Debug)]
struct TextAnnotation {
    description: String,
}

#[derive(Deserialize, Debug)]
struct ProviderStatus {
    code: i32,
    message: String,
}
