use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};

/// Summary of a finished recording file
#[derive(Debug, Clone)]
pub struct RecordedFile {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: u64,
}

impl RecordedFile {
    /// Read the header of a finished WAV recording
    ///
    /// Only the header is inspected; samples are not loaded.
    pub fn probe(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open recording {}", path.display()))?;

        let spec = reader.spec();
        let sample_count = reader.len() as u64;
        let duration_seconds =
            sample_count as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        Ok(Self {
            path: path.to_path_buf(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            sample_count,
        })
    }
}
