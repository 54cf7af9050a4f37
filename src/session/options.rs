use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Container format for the finished recording file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerFormat {
    #[serde(rename = "aac")]
    Aac,
    #[default]
    #[serde(rename = "m4a")]
    M4a,
    #[serde(rename = "3gp")]
    ThreeGp,
}

impl ContainerFormat {
    /// File extension for this container (no leading dot)
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Aac => "aac",
            ContainerFormat::M4a => "m4a",
            ContainerFormat::ThreeGp => "3gp",
        }
    }
}

/// Options for a single recording, immutable once the recording starts
///
/// Wire names are camelCase to match the control API. All numeric fields are
/// fixed-width integers; the default bit rate is 128000 bps for every
/// container, including 3GP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordingOptions {
    /// Sample rate in Hz
    pub sample_rate_hz: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channel_count: u16,

    /// Encoder bit rate in bits per second
    pub bit_rate_bps: u32,

    /// Container format, decides the output file extension
    pub container_format: ContainerFormat,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            channel_count: 2,
            bit_rate_bps: 128000,
            container_format: ContainerFormat::M4a,
        }
    }
}

impl RecordingOptions {
    pub fn validate(&self) -> Result<()> {
        if self.channel_count != 1 && self.channel_count != 2 {
            bail!(
                "Unsupported channel count {} (expected 1 or 2)",
                self.channel_count
            );
        }
        if self.sample_rate_hz == 0 {
            bail!("Sample rate must be non-zero");
        }
        if self.bit_rate_bps == 0 {
            bail!("Bit rate must be non-zero");
        }
        Ok(())
    }
}
