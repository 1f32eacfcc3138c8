use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use clap_serde_derive::ClapSerde;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use url::Url;

use crate::config::Config;
use crate::error::RelayResult;
use crate::ocr::fields::FieldExtractor;
use crate::ocr::recognizer::{
    RecognitionResult, RecognizeError, UploadedImage, PROVIDER_FAILURE_MESSAGE,
};
use crate::ocr::relay::Relay;
use crate::ocr::vision::VisionOcr;

mod config;
mod error;
mod ocr;
mod telemetry;
mod web;

#[cfg(unix)]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Room for multipart framing on top of the configured image cap. The
/// relay enforces the real limit on the decoded image bytes.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env, default_value = "OcrRelay.toml")]
    config_file: String,

    /// Configuration options
    #[command(flatten)]
    pub opt_config: <Config as ClapSerde>::Opt,
}

#[derive(Clone)]
struct AppState {
    relay: Arc<Relay>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let config = match Config::from_toml(&args.config_file) {
        Ok(conf) => conf.merge(args.opt_config),
        Err(err) => {
            if args.config_file == "OcrRelay.toml" {
                Config::default().merge(args.opt_config)
            } else {
                // The subscriber is not up yet, so this cannot go through tracing.
                eprintln!(
                    "Failed to read configuration file {} with error: {}",
                    args.config_file, err
                );
                std::process::exit(1);
            }
        }
    };
    telemetry::init_telemetry(config.otlp_endpoint.as_deref(), config.log_console);

    let endpoint = match Url::parse(&config.vision_endpoint) {
        Ok(url) => url,
        Err(err) => exit_err!(
            1,
            "Invalid provider endpoint {}: {}",
            config.vision_endpoint,
            err
        ),
    };
    if config.vision_api_key.is_empty() {
        exit_err!(
            1,
            "No provider API key configured, set VISION_API_KEY or vision_api_key in {}",
            args.config_file
        );
    }
    let extractor = match FieldExtractor::parse(&config.patterns) {
        Ok(extractor) => extractor,
        Err(err) => exit_err!(1, "Invalid field pattern: {:#}", err),
    };
    let recognizer = match VisionOcr::new(
        endpoint.clone(),
        config.vision_api_key.clone(),
        Duration::from_secs(config.provider_timeout_secs),
    ) {
        Ok(recognizer) => recognizer,
        Err(err) => exit_err!(1, "Failed to build the provider client: {:#}", err),
    };
    let state = AppState {
        relay: Arc::new(Relay::new(
            Arc::new(recognizer),
            config.max_image_bytes,
            extractor,
        )),
    };

    let listener = TcpListener::bind(format!("{}:{}", config.address, config.port)).await?;
    info!("Listening on {}", listener.local_addr().unwrap());
    info!("Relaying recognition requests to {}", endpoint);

    axum::serve(listener, router(state, body_limit(config.max_image_bytes)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes.saturating_add(MULTIPART_OVERHEAD)
}

fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handle_index).post(handle_upload))
        .route("/api/recognize", post(handle_recognize))
        .route("/static/*file", get(web::serve_asset))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// TODO set timeout for shutdown signal
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

#[axum_macros::debug_handler]
async fn handle_index() -> RelayResult<Html<String>> {
    web::render_index()
}

/// Form surface. A failed provider call is a handled outcome here: the
/// page reports it and the request itself succeeds.
#[axum_macros::debug_handler]
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> RelayResult<(StatusCode, Html<String>)> {
    match recognize_upload(&state, multipart).await {
        Ok(result) => Ok((StatusCode::OK, web::render_result(&result)?)),
        Err(RecognizeError::InvalidInput(reason)) => {
            Ok((StatusCode::BAD_REQUEST, web::render_error(&reason)?))
        }
        Err(RecognizeError::Provider(source)) => {
            error!("provider call failed: {source:#}");
            Ok((StatusCode::OK, web::render_error(PROVIDER_FAILURE_MESSAGE)?))
        }
    }
}

#[axum_macros::debug_handler]
async fn handle_recognize(
    State(state): State<AppState>,
    multipart: Multipart,
) -> RelayResult<(StatusCode, Json<RecognitionResult>)> {
    let result = recognize_upload(&state, multipart).await?;
    Ok((StatusCode::OK, Json(result)))
}

#[axum_macros::debug_handler]
async fn handle_health() -> StatusCode {
    StatusCode::OK
}

async fn recognize_upload(
    state: &AppState,
    multipart: Multipart,
) -> Result<RecognitionResult, RecognizeError> {
    let image = read_image_field(multipart).await?;
    state.relay.recognize_text(image).await
}

async fn read_image_field(mut multipart: Multipart) -> Result<UploadedImage, RecognizeError> {
    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        match field.name() {
            Some("file") => {
                // A part without a content-type header never passes image
                // validation.
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                image = Some(UploadedImage {
                    bytes: bytes.to_vec().into_boxed_slice(),
                    content_type,
                    file_name,
                });
            }
            Some(name) => {
                return Err(RecognizeError::InvalidInput(format!(
                    "Unknown field {} in multipart form",
                    name
                )))
            }
            None => {
                return Err(RecognizeError::InvalidInput(
                    "Unnamed field in multipart form".to_string(),
                ))
            }
        }
    }
    image.ok_or_else(|| {
        RecognizeError::InvalidInput("Missing field file in multipart form".to_string())
    })
}

fn invalid_multipart(err: MultipartError) -> RecognizeError {
    RecognizeError::InvalidInput(format!("Malformed multipart request: {}", err))
}

#[macro_export]
macro_rules! exit_err {
    ($code:expr, $fmt:expr $(, $arg:expr)*) => {
        {
            error!($fmt $(, $arg)*);
            std::process::exit($code);
        }
    };
}
