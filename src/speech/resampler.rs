use crate::{ChatlineError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Sample rate Whisper expects
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Mono resampler from the capture device rate to [`WHISPER_SAMPLE_RATE`]
pub struct AudioResampler {
    resampler: SincFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
}

impl AudioResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(ChatlineError::ConfigError(
                "Sample rates must be greater than 0".into(),
            ));
        }

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let resampler = SincFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            2.0,
            params,
            1024,
            1,
        )
        .map_err(|e| ChatlineError::SpeechError(format!("Failed to create resampler: {e}")))?;

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
        })
    }

    /// Resample a complete mono utterance
    pub fn resample(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = self.resampler.input_frames_max();
        let ratio = self.output_rate as f64 / self.input_rate as f64;
        let mut output = Vec::with_capacity((input.len() as f64 * ratio * 1.1) as usize);

        for chunk in input.chunks(chunk_size) {
            // SincFixedIn needs full chunks; the tail is zero padded and trimmed after
            let mut planar = vec![vec![0.0f32; chunk_size]; 1];
            planar[0][..chunk.len()].copy_from_slice(chunk);

            let processed = self
                .resampler
                .process(&planar, None)
                .map_err(|e| ChatlineError::SpeechError(format!("Resampling failed: {e}")))?;

            let produced = &processed[0];
            let keep = if chunk.len() < chunk_size {
                ((chunk.len() as f64) * ratio).ceil() as usize
            } else {
                produced.len()
            };
            output.extend_from_slice(&produced[..keep.min(produced.len())]);
        }

        debug!("Resampled {} -> {} samples", input.len(), output.len());
        Ok(output)
    }
}

/// Convert captured samples to the rate Whisper expects
pub fn to_whisper_rate(samples: Vec<f32>, sample_rate: u32) -> Result<Vec<f32>> {
    if sample_rate == WHISPER_SAMPLE_RATE {
        return Ok(samples);
    }
    AudioResampler::new(sample_rate, WHISPER_SAMPLE_RATE)?.resample(&samples)
}
