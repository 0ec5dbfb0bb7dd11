use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use uuid::Uuid;

use crate::StudyError;

/// A resolved video source: local audio artifact plus probe metadata.
///
/// Produced once per invocation and consumed once by the transcription
/// engine; never mutated after creation.
#[derive(Debug, Clone)]
pub struct VideoSource {
    /// Original URL that was resolved
    pub url: String,

    /// Path to the extracted audio file (16 kHz mono WAV)
    pub audio_path: PathBuf,

    /// Video title, if the probe reported one
    pub title: Option<String>,

    /// Best-available thumbnail URL, if the probe reported one
    pub thumbnail: Option<String>,

    /// Duration in seconds, if the probe reported one
    pub duration_secs: Option<f64>,
}

/// Capability that turns a URL into a [`VideoSource`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Resolve the URL and extract its audio into `workdir`.
    async fn fetch(&self, url: &str, workdir: &Path) -> Result<VideoSource, StudyError>;
}

/// Media fetcher shelling out to yt-dlp.
pub struct YtDlpFetcher {
    yt_dlp_path: String,
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Probe video metadata without downloading.
    async fn probe(&self, url: &str) -> Result<Value, StudyError> {
        tracing::debug!("Probing video info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| StudyError::Fetch(format!("failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(StudyError::Fetch(format!(
                "yt-dlp could not resolve {}: {}",
                url,
                error.trim()
            )));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&json_str)
            .map_err(|e| StudyError::Fetch(format!("unparseable yt-dlp metadata: {}", e)))
    }

    /// Download the best-available audio stream as 16 kHz mono WAV,
    /// ready for Whisper without further conversion.
    async fn download_audio(&self, url: &str, dest: &Path) -> Result<(), StudyError> {
        tracing::debug!("Downloading audio for: {}", url);

        let template = format!("{}.%(ext)s", dest.with_extension("").to_string_lossy());

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--output",
                &template,
                "--format",
                "bestaudio/best",
                "--extract-audio",
                "--audio-format",
                "wav",
                "--postprocessor-args",
                "ffmpeg:-ar 16000 -ac 1",
                "--no-playlist",
                "--newline",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| StudyError::Fetch(format!("failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(StudyError::Fetch(format!(
                "audio download failed: {}",
                error.trim()
            )));
        }

        if !dest.exists() {
            return Err(StudyError::Fetch(format!(
                "yt-dlp reported success but {} is missing",
                dest.display()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, workdir: &Path) -> Result<VideoSource, StudyError> {
        if !self.check_availability().await {
            return Err(StudyError::Fetch(
                "yt-dlp is not available. Please install it: https://github.com/yt-dlp/yt-dlp"
                    .to_string(),
            ));
        }

        let info = self.probe(url).await?;

        let title = info["title"].as_str().map(|s| s.to_string());
        let thumbnail = info["thumbnail"].as_str().map(|s| s.to_string());
        let duration_secs = info["duration"].as_f64();

        if let Some(d) = duration_secs {
            tracing::info!(
                "Resolved \"{}\" ({})",
                title.as_deref().unwrap_or("untitled"),
                crate::utils::format_duration(d)
            );
        }

        let filename = format!("audio_{}.wav", &Uuid::new_v4().to_string()[..8]);
        let audio_path = workdir.join(filename);

        self.download_audio(url, &audio_path).await?;

        Ok(VideoSource {
            url: url.to_string(),
            audio_path,
            title,
            thumbnail,
            duration_secs,
        })
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}
