use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use tokio::sync::OnceCell;
use whisper_rs::{
    install_logging_hooks, FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters,
};

use crate::config::WhisperConfig;
use crate::StudyError;

/// Sample rate Whisper expects.
const SAMPLE_RATE: u32 = 16_000;

static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// The loaded model is a process-wide resource: initialized once, on first
/// use, and reused by every subsequent invocation. Transcribe calls are
/// serialized through the inner mutex since whisper.cpp inference on a single
/// context is not reentrant-safe.
static MODEL: OnceCell<Arc<LoadedModel>> = OnceCell::const_new();

struct LoadedModel {
    context: Mutex<WhisperContext>,
    name: String,
}

/// Capability that turns an audio artifact into plain text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, StudyError>;
}

/// Whisper-based transcription engine built on whisper-rs.
pub struct WhisperEngine {
    config: WhisperConfig,
}

impl WhisperEngine {
    pub fn new(config: WhisperConfig) -> Self {
        Self { config }
    }

    /// Load (or reuse) the process-wide model.
    async fn model(&self) -> Result<Arc<LoadedModel>, StudyError> {
        let config = self.config.clone();
        MODEL
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || load_model(&config))
                    .await
                    .map_err(|e| {
                        StudyError::Transcription(format!("model load task panicked: {}", e))
                    })?
            })
            .await
            .cloned()
    }
}

fn load_model(config: &WhisperConfig) -> Result<Arc<LoadedModel>, StudyError> {
    LOGGING_HOOKS_INSTALLED.call_once(|| {
        install_logging_hooks();
    });

    if !config.model_path.exists() {
        return Err(StudyError::Transcription(format!(
            "Whisper model not found at {}",
            config.model_path.display()
        )));
    }

    let name = config
        .model_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    tracing::info!("Loading Whisper model \"{}\" (one-time setup)", name);

    let path = config.model_path.to_str().ok_or_else(|| {
        StudyError::Transcription("invalid UTF-8 in model path".to_string())
    })?;

    let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
        .map_err(|e| StudyError::Transcription(format!("failed to load Whisper model: {}", e)))?;

    Ok(Arc::new(LoadedModel {
        context: Mutex::new(context),
        name,
    }))
}

#[async_trait]
impl SpeechToText for WhisperEngine {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, StudyError> {
        let model = self.model().await?;

        let path = audio_path.to_path_buf();
        let samples = tokio::task::spawn_blocking(move || load_wav_samples(&path))
            .await
            .map_err(|e| StudyError::Transcription(format!("decode task panicked: {}", e)))??;

        tracing::info!(
            "Transcribing {:.1}s of audio with model \"{}\"",
            samples.len() as f64 / SAMPLE_RATE as f64,
            model.name
        );

        let language = self.config.language.clone();
        let threads = self.config.threads;

        let text = tokio::task::spawn_blocking(move || {
            run_inference(&model, &samples, &language, threads)
        })
        .await
        .map_err(|e| StudyError::Transcription(format!("inference task panicked: {}", e)))??;

        if text.trim().is_empty() {
            return Err(StudyError::Transcription(
                "no speech recognized in the audio".to_string(),
            ));
        }

        Ok(text)
    }
}

fn run_inference(
    model: &LoadedModel,
    samples: &[f32],
    language: &str,
    threads: Option<usize>,
) -> Result<String, StudyError> {
    let context = model
        .context
        .lock()
        .map_err(|e| StudyError::Transcription(format!("failed to acquire model lock: {}", e)))?;

    let mut state = context
        .create_state()
        .map_err(|e| StudyError::Transcription(format!("failed to create Whisper state: {}", e)))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

    if language == "auto" {
        params.set_language(None);
    } else {
        params.set_language(Some(language));
    }

    if let Some(threads) = threads {
        params.set_n_threads(threads as i32);
    }

    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    state
        .full(params, samples)
        .map_err(|e| StudyError::Transcription(format!("Whisper inference failed: {}", e)))?;

    let mut text = String::new();
    for segment in state.as_iter() {
        text.push_str(&segment.to_string());
    }

    Ok(text.trim().to_string())
}

/// Read a WAV file into 16 kHz mono f32 samples in [-1.0, 1.0].
///
/// The fetcher already post-processes to 16 kHz mono, but arbitrary rates and
/// channel counts are handled anyway so locally supplied files work too.
fn load_wav_samples(path: &PathBuf) -> Result<Vec<f32>, StudyError> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| StudyError::Transcription(format!("failed to open WAV file: {}", e)))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let raw: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| StudyError::Transcription(format!("failed to read WAV samples: {}", e)))?;

    let mono = downmix(&raw, channels);
    let resampled = if spec.sample_rate == SAMPLE_RATE {
        mono
    } else {
        resample(&mono, spec.sample_rate, SAMPLE_RATE)
    };

    Ok(resampled.iter().map(|&s| s as f32 / 32768.0).collect())
}

/// Average interleaved channels down to mono.
fn downmix(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Linear-interpolation resampler.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).floor() as usize;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = pos - idx as f64;

            let a = samples[idx] as f64;
            let b = samples.get(idx + 1).copied().unwrap_or(samples[idx]) as f64;

            (a + (b - a) * frac) as i16
        })
        .collect()
}
