//! Intensity extrema over the valid pixels of a sampled frame

use crate::exposure::sampler::SampledFrame;

/// Intensity range observed among valid samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservedExtrema {
    /// Darkest valid intensity
    pub min: u8,
    /// Brightest valid intensity
    pub max: u8,
    /// Number of valid samples that contributed
    pub valid_samples: usize,
    /// Number of distinct intensity levels present
    pub distinct_levels: u16,
}

impl ObservedExtrema {
    /// True when both ends of the intensity scale are hit
    pub fn is_saturated(&self) -> bool {
        self.min == u8::MIN && self.max == u8::MAX
    }

    /// Fraction of the 256 levels actually in use
    pub fn utilization(&self) -> f64 {
        f64::from(self.distinct_levels) / 256.0
    }
}

/// Computes observed extrema for sampled frames
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramAnalyzer;

impl HistogramAnalyzer {
    /// Analyse `frame`, returning `None` when no sample is valid
    ///
    /// An empty result means there is nothing to expose yet; callers skip the
    /// rest of the step and wait for the next frame.
    pub fn analyze(frame: &SampledFrame) -> Option<ObservedExtrema> {
        let mut counts = [0u32; 256];
        let mut min = u8::MAX;
        let mut max = u8::MIN;
        let mut valid_samples = 0usize;

        for sample in frame.samples.iter().filter(|s| s.is_valid) {
            counts[usize::from(sample.intensity)] += 1;
            min = min.min(sample.intensity);
            max = max.max(sample.intensity);
            valid_samples += 1;
        }

        if valid_samples == 0 {
            return None;
        }

        let distinct_levels =
            u16::try_from(counts.iter().filter(|&&c| c > 0).count()).unwrap_or(256);

        Some(ObservedExtrema {
            min,
            max,
            valid_samples,
            distinct_levels,
        })
    }
}
