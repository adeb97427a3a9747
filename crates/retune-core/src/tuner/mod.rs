//! Pitch-correction engine
//!
//! Wraps pitch detection and signalsmith-stretch transposition behind the
//! narrow contract the audio engine needs: five parameter setters, a note
//! mask, an in-place-equivalent `process` call, and telemetry queries.
//!
//! The correction loop per block: detect the fundamental, snap it to the
//! nearest allowed note under the active mask (with a bias toward holding
//! the current note), smooth the resulting shift through a one-pole filter,
//! and transpose the block by the smoothed amount. All state is allocated
//! at construction.

mod detector;

pub use detector::PitchDetector;

use signalsmith_stretch::Stretch;

use crate::types::{NoteMask, NUM_PITCH_CLASSES};

/// Mono processing
const CHANNELS: u32 = 1;

// Parameter defaults and control-surface ranges
pub const DEFAULT_REF_PITCH: f32 = 440.0;
pub const DEFAULT_NOTE_BIAS: f32 = 0.5;
pub const DEFAULT_CORR_FILTER: f32 = 0.1;
pub const DEFAULT_CORR_GAIN: f32 = 1.0;
pub const DEFAULT_CORR_OFFSET: f32 = 0.0;

pub const REF_PITCH_MIN: f32 = 400.0;
pub const REF_PITCH_MAX: f32 = 480.0;
pub const NOTE_BIAS_MIN: f32 = 0.0;
pub const NOTE_BIAS_MAX: f32 = 1.0;
pub const CORR_FILTER_MIN: f32 = 0.02;
pub const CORR_FILTER_MAX: f32 = 0.5;
pub const CORR_GAIN_MIN: f32 = 0.0;
pub const CORR_GAIN_MAX: f32 = 1.0;
pub const CORR_OFFSET_MIN: f32 = -2.0;
pub const CORR_OFFSET_MAX: f32 = 2.0;

/// The pitch-correction engine
///
/// Sample rate is fixed at construction. Parameter setters take effect on
/// the next `process` call; none of them validate ranges (the control
/// surface clamps before writing).
pub struct Retuner {
    stretch: Stretch,
    detector: PitchDetector,
    ref_pitch: f32,
    note_bias: f32,
    corr_filter: f32,
    corr_gain: f32,
    corr_offset: f32,
    mask: NoteMask,
    /// Smoothed transposition currently applied, in semitones
    correction: f32,
    /// Last correction target in fractional MIDI note units
    target_note: Option<f32>,
    error: f32,
    note_set: NoteMask,
}

impl Retuner {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            stretch: Stretch::preset_default(CHANNELS, sample_rate),
            detector: PitchDetector::new(sample_rate),
            ref_pitch: DEFAULT_REF_PITCH,
            note_bias: DEFAULT_NOTE_BIAS,
            corr_filter: DEFAULT_CORR_FILTER,
            corr_gain: DEFAULT_CORR_GAIN,
            corr_offset: DEFAULT_CORR_OFFSET,
            mask: NoteMask::ALL,
            correction: 0.0,
            target_note: None,
            error: 0.0,
            note_set: NoteMask::EMPTY,
        }
    }

    pub fn set_ref_pitch(&mut self, hz: f32) {
        self.ref_pitch = hz;
    }

    pub fn set_note_bias(&mut self, bias: f32) {
        self.note_bias = bias;
    }

    pub fn set_corr_filter(&mut self, coeff: f32) {
        self.corr_filter = coeff;
    }

    pub fn set_corr_gain(&mut self, gain: f32) {
        self.corr_gain = gain;
    }

    pub fn set_corr_offset(&mut self, semitones: f32) {
        self.corr_offset = semitones;
    }

    /// Set the allowed pitch classes for this block
    pub fn set_note_mask(&mut self, mask: NoteMask) {
        self.mask = mask;
    }

    /// Current tuning error in semitones (detected minus target)
    pub fn tuning_error(&self) -> f32 {
        self.error
    }

    /// Pitch class currently being corrected toward, as a one-bit mask
    /// (empty while unvoiced or when no note is allowed)
    pub fn note_set(&self) -> NoteMask {
        self.note_set
    }

    /// Processing latency in samples, for the host to report
    pub fn latency(&self) -> usize {
        self.stretch.input_latency() + self.stretch.output_latency()
    }

    /// Drop all internal state (detector window, stretch history, smoothing)
    pub fn reset(&mut self) {
        self.stretch.reset();
        self.detector.reset();
        self.correction = 0.0;
        self.target_note = None;
        self.error = 0.0;
        self.note_set = NoteMask::EMPTY;
    }

    /// Correct one block; `input` and `output` must be the same length.
    /// The output is fully written for every frame.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        self.detector.push(input);

        let desired = match self.detector.detect() {
            Some(freq) => {
                let note = self.note_of(freq);
                match self.select_target(note) {
                    Some(target) => {
                        self.target_note = Some(target);
                        self.error = note - target;
                        let class = (target.round() as i32).rem_euclid(12) as usize;
                        self.note_set = NoteMask::single(class);
                        (target - note) * self.corr_gain + self.corr_offset
                    }
                    None => {
                        // No allowed notes: nothing to snap to
                        self.target_note = None;
                        self.error = 0.0;
                        self.note_set = NoteMask::EMPTY;
                        self.corr_offset
                    }
                }
            }
            None => {
                self.note_set = NoteMask::EMPTY;
                self.error = 0.0;
                self.corr_offset
            }
        };

        // One-pole smoothing so the shift glides instead of stepping
        self.correction += self.corr_filter * (desired - self.correction);

        self.stretch
            .set_transpose_factor_semitones(self.correction, None);
        output.fill(0.0);
        self.stretch.process(input, output);
    }

    /// Fractional MIDI note of a frequency, relative to the reference pitch
    /// (A above middle C = 69 at `ref_pitch` Hz)
    fn note_of(&self, freq: f32) -> f32 {
        69.0 + 12.0 * (freq / self.ref_pitch).log2()
    }

    /// Choose the correction target for a detected note: the allowed note
    /// at minimum distance, with the note bias shrinking the distance to
    /// the note already held so small wobbles don't retrigger a jump
    fn select_target(&self, note: f32) -> Option<f32> {
        if self.mask.is_empty() {
            return None;
        }

        let mut best_note = 0.0;
        let mut best_dist = f32::INFINITY;
        for class in 0..NUM_PITCH_CLASSES {
            if !self.mask.contains(class) {
                continue;
            }
            // Octave of this class nearest the detected note
            let candidate = class as f32 + 12.0 * ((note - class as f32) / 12.0).round();
            let mut dist = (note - candidate).abs();
            if let Some(held) = self.target_note {
                if (candidate - held).abs() < 0.5 {
                    dist -= 0.5 * self.note_bias;
                }
            }
            if dist < best_dist {
                best_dist = dist;
                best_note = candidate;
            }
        }
        Some(best_note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_creation() {
        let retuner = Retuner::new(48000);
        assert_eq!(retuner.tuning_error(), 0.0);
        assert!(retuner.note_set().is_empty());
        assert!(retuner.latency() > 0);
    }

    #[test]
    fn test_note_of_reference_pitch() {
        let mut retuner = Retuner::new(48000);
        assert!((retuner.note_of(440.0) - 69.0).abs() < 1e-4);
        assert!((retuner.note_of(220.0) - 57.0).abs() < 1e-4);

        // Raising the reference lowers the note number of a fixed frequency
        retuner.set_ref_pitch(466.16);
        assert!((retuner.note_of(440.0) - 68.0).abs() < 0.01);
    }

    #[test]
    fn test_target_snaps_to_nearest_allowed_note() {
        let mut retuner = Retuner::new(48000);
        retuner.set_note_bias(0.0);

        // Only A allowed: a flat A4 snaps to 69
        retuner.set_note_mask(NoteMask::single(9));
        assert_eq!(retuner.select_target(68.6), Some(69.0));

        // And to the right octave
        assert_eq!(retuner.select_target(56.7), Some(57.0));

        // Chromatic: nearest integer note wins
        retuner.set_note_mask(NoteMask::ALL);
        assert_eq!(retuner.select_target(69.6), Some(70.0));
    }

    #[test]
    fn test_empty_mask_has_no_target() {
        let mut retuner = Retuner::new(48000);
        retuner.set_note_mask(NoteMask::EMPTY);
        assert_eq!(retuner.select_target(69.0), None);
    }

    #[test]
    fn test_bias_holds_current_note() {
        let mut retuner = Retuner::new(48000);
        retuner.set_note_mask(NoteMask::ALL);
        retuner.target_note = Some(69.0);

        // Without bias, 69.6 is closer to 70
        retuner.set_note_bias(0.0);
        assert_eq!(retuner.select_target(69.6), Some(70.0));

        // With bias, the held note keeps winning
        retuner.set_note_bias(0.5);
        assert_eq!(retuner.select_target(69.6), Some(69.0));
    }

    #[test]
    fn test_process_writes_full_output() {
        let mut retuner = Retuner::new(48000);
        let input = sine(220.0, 48000.0, 256);
        let mut output = vec![f32::NAN; 256];

        retuner.process(&input, &mut output);

        assert!(output.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_voiced_input_reports_note_set() {
        let mut retuner = Retuner::new(48000);
        retuner.set_note_mask(NoteMask::ALL);

        // One phase-continuous tone fed block by block; repeating a single
        // phase-zero chunk would instead be periodic at the block length
        let input = sine(220.0, 48000.0, 32 * 256);
        let mut output = vec![0.0; 256];
        for block in input.chunks(256) {
            retuner.process(block, &mut output);
        }

        // 220 Hz is A3: class 9
        assert_eq!(retuner.note_set(), NoteMask::single(9));
        assert!(retuner.tuning_error().abs() < 0.25);
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let mut retuner = Retuner::new(48000);
        let input = vec![0.0; 256];
        let mut output = vec![0.0; 256];
        for _ in 0..32 {
            retuner.process(&input, &mut output);
        }
        assert!(retuner.note_set().is_empty());
        assert_eq!(retuner.tuning_error(), 0.0);
    }
}
