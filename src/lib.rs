//! Studytube - turn a video URL into study material
//!
//! This library chains media acquisition (yt-dlp), speech-to-text (Whisper)
//! and an LLM chat-completions backend to produce a summary, an introduction,
//! an answer to a question, or a short quiz from a single video transcript.

pub mod cli;
pub mod config;
pub mod fetch;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use fetch::{MediaFetcher, VideoSource};
pub use generate::TextGenerator;
pub use pipeline::{OutputBundle, StudyPipeline};
pub use prompt::ActionKind;
pub use transcribe::SpeechToText;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Stage-level errors in the study pipeline.
///
/// Every variant is terminal for the invocation it occurs in; the pipeline
/// renders them to human-readable text at its boundary instead of letting
/// them escape as faults.
#[derive(thiserror::Error, Debug)]
pub enum StudyError {
    #[error("could not fetch video: {0}")]
    Fetch(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("generation request failed: {0}")]
    BackendHttp(String),

    #[error("generation backend returned an error: {0}")]
    BackendApplication(String),

    #[error("unexpected response from generation backend: {0}")]
    BackendFormat(String),

    #[error("generation backend timed out after {0}s")]
    BackendTimeout(u64),
}
