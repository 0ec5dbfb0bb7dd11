use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::config::Config;
use crate::fetch::{MediaFetcher, VideoSource, YtDlpFetcher};
use crate::generate::{OpenRouterClient, TextGenerator};
use crate::prompt::{self, ActionKind, SYSTEM_INSTRUCTION};
use crate::transcribe::{SpeechToText, WhisperEngine};
use crate::StudyError;

/// Marker prepended to error text rendered into output fields, so callers
/// can detect failure by string inspection.
const ERROR_PREFIX: &str = "Error:";

/// The five-field result of one pipeline invocation.
///
/// Exactly one of the four artifact fields is non-empty per invocation; the
/// others are empty strings. Failures are rendered as text into the fields a
/// caller would read, never propagated as faults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputBundle {
    /// Title and thumbnail of the resolved video, or fetch-failure text
    pub video_details: String,
    pub summary: String,
    pub introduction: String,
    pub answer: String,
    pub quiz: String,
}

impl OutputBundle {
    /// The one artifact field selected by `action`, with its heading label.
    pub fn artifact(&self, action: &ActionKind) -> &str {
        match action {
            ActionKind::Summarize => &self.summary,
            ActionKind::Introduce => &self.introduction,
            ActionKind::Answer(_) => &self.answer,
            ActionKind::Quiz => &self.quiz,
        }
    }

    fn with_artifact(details: String, action: &ActionKind, text: String) -> Self {
        let mut bundle = OutputBundle {
            video_details: details,
            ..Default::default()
        };
        match action {
            ActionKind::Summarize => bundle.summary = text,
            ActionKind::Introduce => bundle.introduction = text,
            ActionKind::Answer(_) => bundle.answer = text,
            ActionKind::Quiz => bundle.quiz = text,
        }
        bundle
    }
}

/// The orchestrator: fetch, transcribe, compose, generate, assemble.
///
/// One strictly sequential run per invocation, no retries, no caching:
/// re-invoking with the same URL re-fetches and re-transcribes.
pub struct StudyPipeline {
    fetcher: Arc<dyn MediaFetcher>,
    engine: Arc<dyn SpeechToText>,
    generator: Arc<dyn TextGenerator>,
    keep_audio: bool,
}

impl StudyPipeline {
    /// Create a pipeline wired to the real collaborators.
    pub fn new(config: &Config) -> crate::Result<Self> {
        Ok(Self {
            fetcher: Arc::new(YtDlpFetcher::new()),
            engine: Arc::new(WhisperEngine::new(config.whisper.clone())),
            generator: Arc::new(OpenRouterClient::new(&config.backend)?),
            keep_audio: config.app.keep_audio,
        })
    }

    /// Create a pipeline from explicit collaborators.
    pub fn with_collaborators(
        fetcher: Arc<dyn MediaFetcher>,
        engine: Arc<dyn SpeechToText>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            fetcher,
            engine,
            generator,
            keep_audio: false,
        }
    }

    /// Run one invocation: URL and action in, bundle out.
    ///
    /// Stage failures never escape as `Err`; they are rendered into the
    /// bundle fields a caller would read.
    pub async fn run(&self, url: &str, action: &ActionKind) -> crate::Result<OutputBundle> {
        // Fresh work directory per invocation; the audio artifact is cleaned
        // up on drop and concurrent runs cannot collide.
        let workdir = TempDir::new()?;

        let spinner = stage_spinner("Fetching video...");
        let source = match self.fetcher.fetch(url, workdir.path()).await {
            Ok(source) => source,
            Err(e) => {
                spinner.finish_and_clear();
                tracing::warn!("Fetch failed for {}: {}", url, e);
                return Ok(OutputBundle {
                    video_details: render_error(&e),
                    ..Default::default()
                });
            }
        };

        // A probe that yields no thumbnail is treated as an unresolvable
        // source.
        if source.thumbnail.is_none() {
            spinner.finish_and_clear();
            let e = StudyError::Fetch(format!("no thumbnail resolved for {}", url));
            tracing::warn!("{}", e);
            return Ok(OutputBundle {
                video_details: render_error(&e),
                ..Default::default()
            });
        }

        spinner.set_message("Transcribing audio...");
        let details = render_details(&source);

        let transcript = match self.engine.transcribe(&source.audio_path).await {
            Ok(text) => text,
            Err(e) => {
                spinner.finish_and_clear();
                tracing::warn!("Transcription failed for {}: {}", url, e);
                // The error is placed uniformly so a caller reading any
                // artifact field sees the failure.
                let message = render_error(&e);
                return Ok(OutputBundle {
                    video_details: details,
                    summary: message.clone(),
                    introduction: message.clone(),
                    answer: message.clone(),
                    quiz: message,
                });
            }
        };

        spinner.set_message(format!("Generating {}...", action.label()));

        let user_prompt = prompt::compose(&transcript, action);
        let generated = self.generator.generate(SYSTEM_INSTRUCTION, &user_prompt).await;

        spinner.finish_and_clear();

        if self.keep_audio {
            preserve_audio(&source);
        }

        let text = match generated {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Generation failed for {}: {}", url, e);
                render_error(&e)
            }
        };

        Ok(OutputBundle::with_artifact(details, action, text))
    }
}

fn render_details(source: &VideoSource) -> String {
    let mut details = format!(
        "Title: {}",
        source.title.as_deref().unwrap_or("(untitled)")
    );
    if let Some(thumbnail) = &source.thumbnail {
        details.push_str(&format!("\nThumbnail: {}", thumbnail));
    }
    if let Some(duration) = source.duration_secs {
        details.push_str(&format!(
            "\nDuration: {}",
            crate::utils::format_duration(duration)
        ));
    }
    details
}

fn render_error(error: &StudyError) -> String {
    format!("{} {}", ERROR_PREFIX, error)
}

/// Copy the transient audio artifact into the current directory before the
/// work directory is dropped.
fn preserve_audio(source: &VideoSource) {
    let name = source
        .title
        .as_deref()
        .map(crate::utils::sanitize_filename)
        .unwrap_or_else(|| "audio".to_string());
    let dest = std::path::PathBuf::from(format!("{}.wav", name));
    match fs_err::copy(&source.audio_path, &dest) {
        Ok(_) => tracing::info!("Audio saved to {}", dest.display()),
        Err(e) => tracing::warn!("Could not keep audio file: {}", e),
    }
}

fn stage_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(message.to_string());
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockMediaFetcher;
    use crate::generate::MockTextGenerator;
    use crate::transcribe::MockSpeechToText;
    use std::path::PathBuf;

    fn source() -> VideoSource {
        VideoSource {
            url: "https://youtu.be/abc".to_string(),
            audio_path: PathBuf::from("/tmp/audio.wav"),
            title: Some("Rust in 10 Minutes".to_string()),
            thumbnail: Some("https://img.example/abc.jpg".to_string()),
            duration_secs: Some(612.0),
        }
    }

    fn pipeline(
        fetcher: MockMediaFetcher,
        engine: MockSpeechToText,
        generator: MockTextGenerator,
    ) -> StudyPipeline {
        StudyPipeline::with_collaborators(
            Arc::new(fetcher),
            Arc::new(engine),
            Arc::new(generator),
        )
    }

    fn happy_fetcher(times: usize) -> MockMediaFetcher {
        let mut fetcher = MockMediaFetcher::new();
        fetcher
            .expect_fetch()
            .times(times)
            .returning(|_, _| Ok(source()));
        fetcher
    }

    fn happy_engine(times: usize, transcript: &'static str) -> MockSpeechToText {
        let mut engine = MockSpeechToText::new();
        engine
            .expect_transcribe()
            .times(times)
            .returning(move |_| Ok(transcript.to_string()));
        engine
    }

    fn assert_exactly_one_populated(bundle: &OutputBundle, action: &ActionKind) {
        let fields = [
            ("summary", &bundle.summary),
            ("introduction", &bundle.introduction),
            ("answer", &bundle.answer),
            ("quiz", &bundle.quiz),
        ];
        for (name, value) in fields {
            if name == action.label() {
                assert!(!value.is_empty(), "{} should be populated", name);
            } else {
                assert!(value.is_empty(), "{} should be empty", name);
            }
        }
    }

    #[tokio::test]
    async fn test_exactly_one_field_populated_for_every_action() {
        for action in [
            ActionKind::Summarize,
            ActionKind::Introduce,
            ActionKind::Answer("why?".to_string()),
            ActionKind::Quiz,
        ] {
            let mut generator = MockTextGenerator::new();
            generator
                .expect_generate()
                .returning(|_, _| Ok("generated text".to_string()));

            let pipeline = pipeline(happy_fetcher(1), happy_engine(1, "a transcript"), generator);
            let bundle = pipeline.run("https://youtu.be/abc", &action).await.unwrap();

            assert_exactly_one_populated(&bundle, &action);
            assert_eq!(bundle.artifact(&action), "generated text");
            assert!(bundle.video_details.contains("Rust in 10 Minutes"));
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_lands_in_video_details_only() {
        let mut fetcher = MockMediaFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_, _| Err(StudyError::Fetch("unresolvable".to_string())));

        let mut engine = MockSpeechToText::new();
        engine.expect_transcribe().times(0);
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().times(0);

        let pipeline = pipeline(fetcher, engine, generator);
        let bundle = pipeline
            .run("https://bad.example", &ActionKind::Summarize)
            .await
            .unwrap();

        assert!(bundle.video_details.starts_with("Error:"));
        assert!(bundle.video_details.contains("unresolvable"));
        assert!(bundle.summary.is_empty());
        assert!(bundle.introduction.is_empty());
        assert!(bundle.answer.is_empty());
        assert!(bundle.quiz.is_empty());
    }

    #[tokio::test]
    async fn test_missing_thumbnail_is_treated_as_fetch_failure() {
        let mut fetcher = MockMediaFetcher::new();
        fetcher.expect_fetch().returning(|_, _| {
            let mut s = source();
            s.thumbnail = None;
            Ok(s)
        });

        let mut engine = MockSpeechToText::new();
        engine.expect_transcribe().times(0);
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().times(0);

        let pipeline = pipeline(fetcher, engine, generator);
        let bundle = pipeline
            .run("https://youtu.be/abc", &ActionKind::Quiz)
            .await
            .unwrap();

        assert!(bundle.video_details.starts_with("Error:"));
        assert!(bundle.quiz.is_empty());
    }

    #[tokio::test]
    async fn test_transcription_failure_fills_every_artifact_field() {
        let mut engine = MockSpeechToText::new();
        engine
            .expect_transcribe()
            .returning(|_| Err(StudyError::Transcription("no speech".to_string())));
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().times(0);

        let pipeline = pipeline(happy_fetcher(1), engine, generator);
        let bundle = pipeline
            .run("https://youtu.be/abc", &ActionKind::Introduce)
            .await
            .unwrap();

        for field in [
            &bundle.summary,
            &bundle.introduction,
            &bundle.answer,
            &bundle.quiz,
        ] {
            assert!(field.starts_with("Error:"));
            assert!(field.contains("no speech"));
        }
        // Details still come from the successfully probed source
        assert!(bundle.video_details.contains("Rust in 10 Minutes"));
    }

    #[tokio::test]
    async fn test_quiz_prompt_carries_instruction_and_transcript() {
        let transcript = "hello world this is a test";

        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(move |system, prompt| {
                !system.is_empty()
                    && prompt.contains("three quiz questions")
                    && prompt.contains("hello world this is a test")
            })
            .returning(|_, _| Ok("1. Q\n2. Q\n3. Q".to_string()));

        let pipeline = pipeline(happy_fetcher(1), happy_engine(1, transcript), generator);
        let bundle = pipeline
            .run("https://youtu.be/abc", &ActionKind::Quiz)
            .await
            .unwrap();

        assert_eq!(bundle.quiz, "1. Q\n2. Q\n3. Q");
        assert!(bundle.summary.is_empty());
        assert!(bundle.introduction.is_empty());
        assert!(bundle.answer.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_renders_into_the_selected_field() {
        let action = ActionKind::Answer("What is discussed?".to_string());

        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|_, prompt| {
                prompt.contains("What is discussed?") && prompt.contains("a transcript")
            })
            .returning(|_, _| Err(StudyError::BackendHttp("HTTP 500".to_string())));

        let pipeline = pipeline(happy_fetcher(1), happy_engine(1, "a transcript"), generator);
        let bundle = pipeline.run("https://youtu.be/abc", &action).await.unwrap();

        assert!(bundle.answer.starts_with("Error:"));
        assert!(bundle.answer.contains("HTTP 500"));
        assert!(bundle.summary.is_empty());
        assert!(bundle.quiz.is_empty());
    }

    #[tokio::test]
    async fn test_reinvocation_refetches_and_retranscribes() {
        // No caching: two runs mean two fetches and two transcriptions
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(2)
            .returning(|_, _| Ok("text".to_string()));

        let pipeline = pipeline(happy_fetcher(2), happy_engine(2, "a transcript"), generator);

        let first = pipeline
            .run("https://youtu.be/abc", &ActionKind::Summarize)
            .await
            .unwrap();
        let second = pipeline
            .run("https://youtu.be/abc", &ActionKind::Quiz)
            .await
            .unwrap();

        assert!(!first.summary.is_empty());
        assert!(!second.quiz.is_empty());
    }
}
