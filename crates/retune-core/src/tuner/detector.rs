//! Monophonic pitch detection via normalized autocorrelation
//!
//! Keeps a ring of recent input and estimates the fundamental over a fixed
//! window on demand. All buffers are allocated at construction; `push` and
//! `detect` are safe to call from the audio thread.

/// Analysis window in samples
const WINDOW: usize = 2048;

/// Highest detectable fundamental in Hz (sets the minimum lag)
const MAX_FREQ: f32 = 1000.0;

/// Lowest detectable fundamental in Hz (sets the maximum lag)
const MIN_FREQ: f32 = 70.0;

/// Minimum normalized correlation for a voiced decision
const CLARITY_THRESHOLD: f32 = 0.5;

/// Mean-square power gate below which the input counts as silence
const POWER_GATE: f32 = 1e-6;

pub struct PitchDetector {
    sample_rate: f32,
    /// Ring of the most recent WINDOW samples
    ring: Vec<f32>,
    write: usize,
    filled: usize,
    /// Linearized window, oldest sample first
    window: Vec<f32>,
    /// Normalized correlation per lag
    nsdf: Vec<f32>,
    min_lag: usize,
    max_lag: usize,
}

impl PitchDetector {
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f32;
        let min_lag = (sample_rate / MAX_FREQ) as usize;
        let max_lag = ((sample_rate / MIN_FREQ) as usize).min(WINDOW / 2);
        Self {
            sample_rate,
            ring: vec![0.0; WINDOW],
            write: 0,
            filled: 0,
            window: vec![0.0; WINDOW],
            nsdf: vec![0.0; WINDOW / 2 + 1],
            min_lag,
            max_lag,
        }
    }

    /// Append one block of input to the ring
    pub fn push(&mut self, samples: &[f32]) {
        for &s in samples {
            self.ring[self.write] = s;
            self.write = (self.write + 1) % WINDOW;
        }
        self.filled = (self.filled + samples.len()).min(WINDOW);
    }

    /// Forget all buffered input
    pub fn reset(&mut self) {
        self.ring.fill(0.0);
        self.write = 0;
        self.filled = 0;
    }

    /// Estimate the fundamental frequency of the buffered window
    ///
    /// Returns `None` until a full window has been buffered, when the input
    /// is below the power gate, or when no lag correlates clearly enough
    /// (unvoiced input).
    pub fn detect(&mut self) -> Option<f32> {
        if self.filled < WINDOW {
            return None;
        }

        // Linearize the ring, oldest first
        for i in 0..WINDOW {
            self.window[i] = self.ring[(self.write + i) % WINDOW];
        }

        let power: f32 = self.window.iter().map(|x| x * x).sum::<f32>() / WINDOW as f32;
        if power < POWER_GATE {
            return None;
        }

        // Normalized square-difference style correlation:
        //   nsdf(lag) = 2 * sum(x[i] x[i+lag]) / sum(x[i]^2 + x[i+lag]^2)
        // which is 1.0 at a perfect period and bounded to [-1, 1].
        let mut best = f32::MIN;
        for lag in self.min_lag..=self.max_lag {
            let mut r = 0.0f32;
            let mut m = 0.0f32;
            for i in 0..WINDOW - lag {
                let a = self.window[i];
                let b = self.window[i + lag];
                r += a * b;
                m += a * a + b * b;
            }
            let v = if m > 0.0 { 2.0 * r / m } else { 0.0 };
            self.nsdf[lag] = v;
            if v > best {
                best = v;
            }
        }

        if best < CLARITY_THRESHOLD {
            return None;
        }

        // First local maximum close to the global best wins; this picks the
        // true period over its multiples, which correlate about as well.
        let key = best * 0.9;
        let mut chosen = None;
        for lag in (self.min_lag + 1)..self.max_lag {
            let v = self.nsdf[lag];
            if v >= key && v >= self.nsdf[lag - 1] && v >= self.nsdf[lag + 1] {
                chosen = Some(lag);
                break;
            }
        }
        let lag = chosen?;

        // Parabolic refinement around the peak for sub-sample lag precision
        let (a, b, c) = (self.nsdf[lag - 1], self.nsdf[lag], self.nsdf[lag + 1]);
        let denom = a - 2.0 * b + c;
        let delta = if denom.abs() > f32::EPSILON {
            (0.5 * (a - c) / denom).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        Some(self.sample_rate / (lag as f32 + delta))
    }
}
