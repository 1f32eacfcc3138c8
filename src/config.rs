use anyhow::Result;
use clap_serde_derive::ClapSerde;
use serde::Deserialize;

#[derive(ClapSerde, Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    /// The address the listener binds to
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub(crate) address: String,

    /// The port the listener binds to
    #[arg(short, long, env, default_value = "8000")]
    pub(crate) port: u16,

    /// The annotate endpoint of the OCR provider
    #[arg(
        long,
        env,
        default_value = "https://vision.googleapis.com/v1/images:annotate"
    )]
    pub(crate) vision_endpoint: String,

    /// API key sent to the OCR provider with every request
    #[arg(long, env)]
    pub(crate) vision_api_key: String,

    /// Seconds to wait for the provider before giving up on a request
    #[arg(long, env, default_value = "30")]
    pub(crate) provider_timeout_secs: u64,

    /// Largest upload the relay accepts, in bytes
    #[arg(long, env, default_value = "10000000")]
    pub(crate) max_image_bytes: usize,

    /// Fields to pull out of the recognized text, as NAME=REGEX pairs
    #[arg(long = "pattern", env = "PATTERNS", value_delimiter = ';')]
    pub(crate) patterns: Vec<String>,

    /// OTLP collector endpoint, telemetry export is off when unset
    #[arg(long, env)]
    pub(crate) otlp_endpoint: Option<String>,

    /// Log to the console even when an OTLP endpoint is set
    #[arg(long, env)]
    pub(crate) log_console: bool,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)?;
        let config = toml::from_str(&str)?;
        Ok(config)
    }
}
