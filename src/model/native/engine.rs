// whisper-rs engine for the native backend

use std::collections::HashMap;
use std::os::raw::c_int;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperError,
};

use super::{distribution_from_probabilities, downmix, resample, WHISPER_SAMPLE_RATE};
use crate::config::WhisperConfig;
use crate::model::{
    Decoding, LanguageDetection, ModelError, Segment, SpeechModel, TranscribeOptions,
    TranscriptionResult,
};

/// Beam size used for full quality decoding
const FULL_BEAM_SIZE: c_int = 5;

/// Speech model running whisper.cpp in-process
pub struct WhisperRsModel {
    config: WhisperConfig,
    context: Arc<WhisperContext>,
}

impl WhisperRsModel {
    /// Load the configured ggml weights into memory
    pub fn load(config: WhisperConfig) -> Result<Self, ModelError> {
        let model_path = config.model_path();
        info!("Loading Whisper model: {}", config.model_size);

        if !model_path.is_file() {
            return Err(ModelError::ModelNotFound(model_path.display().to_string()));
        }
        let path = model_path
            .to_str()
            .ok_or_else(|| ModelError::ModelNotFound(model_path.display().to_string()))?;

        let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| {
                ModelError::Engine(format!("failed to load {}: {}", model_path.display(), e))
            })?;

        info!(
            "Whisper model loaded successfully from {} (engine: whisper-rs, threads: {})",
            model_path.display(),
            config.threads
        );
        Ok(Self {
            config,
            context: Arc::new(context),
        })
    }

    /// Run `job` on the decoded samples of `audio` off the async workers
    async fn with_samples<T, F>(&self, audio: &Path, job: F) -> Result<T, ModelError>
    where
        T: Send + 'static,
        F: FnOnce(&WhisperContext, &[f32], c_int) -> Result<T, ModelError> + Send + 'static,
    {
        let context = Arc::clone(&self.context);
        let audio = audio.to_path_buf();
        let threads = c_int::try_from(self.config.threads).unwrap_or(c_int::MAX);

        tokio::task::spawn_blocking(move || {
            let samples = read_samples(&audio)?;
            job(&context, &samples, threads)
        })
        .await
        .map_err(|e| ModelError::Engine(format!("inference task failed: {}", e)))?
    }
}

#[async_trait]
impl SpeechModel for WhisperRsModel {
    fn model_name(&self) -> String {
        self.config.model_size.to_string()
    }

    async fn transcribe(
        &self,
        audio: &Path,
        options: TranscribeOptions,
    ) -> Result<TranscriptionResult, ModelError> {
        self.with_samples(audio, move |context, samples, threads| {
            transcribe_samples(context, samples, &options, threads)
        })
        .await
    }

    async fn detect_language(&self, audio: &Path) -> Result<HashMap<String, f32>, ModelError> {
        self.with_samples(audio, detect_samples).await
    }
}

fn engine_error(err: WhisperError) -> ModelError {
    ModelError::Engine(err.to_string())
}

/// Decode a WAV file to 16 kHz mono samples in [-1, 1]
fn read_samples(audio: &Path) -> Result<Vec<f32>, ModelError> {
    let decode_error = |e: hound::Error| ModelError::Decode(format!("{}: {}", audio.display(), e));

    let mut reader = hound::WavReader::open(audio).map_err(decode_error)?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<f32>, _>>(),
        hound::SampleFormat::Int => {
            let scale = (1_i64 << spec.bits_per_sample.saturating_sub(1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|sample| sample as f32 / scale))
                .collect::<Result<Vec<f32>, _>>()
        }
    }
    .map_err(decode_error)?;

    debug!(
        "Decoded {} samples ({} Hz, {} channel(s)) from {}",
        samples.len(),
        spec.sample_rate,
        spec.channels,
        audio.display()
    );
    let mono = downmix(&samples, usize::from(spec.channels));
    Ok(resample(&mono, spec.sample_rate, WHISPER_SAMPLE_RATE))
}

fn detect_samples(
    context: &WhisperContext,
    samples: &[f32],
    threads: c_int,
) -> Result<HashMap<String, f32>, ModelError> {
    let threads = usize::try_from(threads).unwrap_or(1);
    let mut state = context.create_state().map_err(engine_error)?;
    state.pcm_to_mel(samples, threads).map_err(engine_error)?;
    let (_, probabilities) = state.lang_detect(0, threads).map_err(engine_error)?;

    Ok(distribution_from_probabilities(
        &probabilities,
        whisper_rs::get_lang_str,
    ))
}

fn transcribe_samples(
    context: &WhisperContext,
    samples: &[f32],
    options: &TranscribeOptions,
    threads: c_int,
) -> Result<TranscriptionResult, ModelError> {
    // whisper decodes in one language, so auto-detect resolves it first
    let language = match options.language.as_deref().filter(|code| !code.is_empty()) {
        Some(code) => code.to_string(),
        None => {
            let distribution = detect_samples(context, samples, threads)?;
            LanguageDetection::from_distribution(&distribution)?.language
        }
    };

    let strategy = match options.decoding {
        Decoding::Full => SamplingStrategy::BeamSearch {
            beam_size: FULL_BEAM_SIZE,
            patience: -1.0,
        },
        Decoding::Fast => SamplingStrategy::Greedy { best_of: 1 },
    };
    let mut params = FullParams::new(strategy);
    params.set_language(Some(language.as_str()));
    params.set_n_threads(threads);
    params.set_translate(false);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    let mut state = context.create_state().map_err(engine_error)?;
    state.full(params, samples).map_err(engine_error)?;

    let mut segments = Vec::new();
    for index in 0..state.full_n_segments() {
        let Some(segment) = state.get_segment(index) else {
            continue;
        };
        // Timestamps are in centiseconds
        let start = segment.start_timestamp() as f64 / 100.0;
        let end = segment.end_timestamp() as f64 / 100.0;
        segments.push(Segment {
            start,
            end: end.max(start),
            text: segment.to_str_lossy().map_err(engine_error)?.into_owned(),
        });
    }
    let text = segments.iter().map(|s| s.text.as_str()).collect::<String>();

    Ok(TranscriptionResult {
        text,
        segments,
        language: Some(language),
    })
}
