use crate::session::{ContainerFormat, RecordingOptions};
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub recording: RecordingConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    /// Application-private directory for finished recordings
    pub output_dir: String,
    #[serde(default = "default_backend")]
    pub backend: String,
    pub sample_rate_hz: u32,
    pub channel_count: u16,
    pub bit_rate_bps: u32,
    pub container_format: ContainerFormat,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsConfig {
    /// Optional NATS server URL; state events stay in-process when unset
    pub nats_url: Option<String>,
}

fn default_backend() -> String {
    "microphone".to_string()
}

impl RecordingConfig {
    /// Recording options used when a start request carries none
    pub fn default_options(&self) -> RecordingOptions {
        RecordingOptions {
            sample_rate_hz: self.sample_rate_hz,
            channel_count: self.channel_count,
            bit_rate_bps: self.bit_rate_bps,
            container_format: self.container_format,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
