// In-process whisper.cpp backend
//
// whisper-rs runs inference on decoded PCM samples inside the gateway process.
// Language detection reads whisper's probability vector for every language it
// knows, so detection responses carry the full distribution.
//
// The engine itself is behind the `native` cargo feature. The sample and
// distribution helpers below are always built.

use std::collections::HashMap;

#[cfg(feature = "native")]
mod engine;

#[cfg(feature = "native")]
pub use engine::WhisperRsModel;

/// Sample rate whisper models are trained on
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Turn whisper's probability vector, indexed by language id, into a
/// code-to-probability map.
///
/// `code_for` resolves a language id to its code (`whisper_rs::get_lang_str` in
/// the engine). Ids it does not know and non-finite probabilities are dropped.
pub fn distribution_from_probabilities<'a, F>(
    probabilities: &[f32],
    code_for: F,
) -> HashMap<String, f32>
where
    F: Fn(i32) -> Option<&'a str>,
{
    probabilities
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_finite())
        .filter_map(|(id, p)| {
            let code = code_for(i32::try_from(id).ok()?)?;
            Some((code.to_string(), *p))
        })
        .collect()
}

/// Average interleaved channels into one
pub fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear interpolation resampler
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let step = f64::from(from_rate) / f64::from(to_rate);
    let len = (samples.len() as f64 / step) as usize;
    let last = samples.len() - 1;

    (0..len)
        .map(|i| {
            let position = i as f64 * step;
            let index = (position as usize).min(last);
            let next = (index + 1).min(last);
            let fraction = (position - index as f64) as f32;
            samples[index] + (samples[next] - samples[index]) * fraction
        })
        .collect()
}
