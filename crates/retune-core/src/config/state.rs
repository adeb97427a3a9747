//! Persisted session state
//!
//! The fields the engine needs to rehydrate itself at startup: the five
//! correction parameters and the manual note mask. Saved on demand by the
//! control thread; the format is YAML via the generic helpers in `io`.

use serde::{Deserialize, Serialize};

use crate::engine::TunerAtomics;
use crate::tuner::{
    CORR_FILTER_MAX, CORR_FILTER_MIN, CORR_GAIN_MAX, CORR_GAIN_MIN, CORR_OFFSET_MAX,
    CORR_OFFSET_MIN, DEFAULT_CORR_FILTER, DEFAULT_CORR_GAIN, DEFAULT_CORR_OFFSET,
    DEFAULT_NOTE_BIAS, DEFAULT_REF_PITCH, NOTE_BIAS_MAX, NOTE_BIAS_MIN, REF_PITCH_MAX,
    REF_PITCH_MIN,
};
use crate::types::NoteMask;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Reference pitch of A in Hz
    pub ref_pitch: f32,
    /// Preference for staying on the current note (0-1)
    pub note_bias: f32,
    /// Correction smoothing filter coefficient
    pub corr_filter: f32,
    /// Amount of correction applied (0-1)
    pub corr_gain: f32,
    /// Static pitch offset in semitones
    pub corr_offset: f32,
    /// User-selected allowed pitch classes
    pub manual_mask: NoteMask,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            ref_pitch: DEFAULT_REF_PITCH,
            note_bias: DEFAULT_NOTE_BIAS,
            corr_filter: DEFAULT_CORR_FILTER,
            corr_gain: DEFAULT_CORR_GAIN,
            corr_offset: DEFAULT_CORR_OFFSET,
            manual_mask: NoteMask::ALL,
        }
    }
}

impl SessionState {
    /// Clamp every field to its control-surface range
    ///
    /// The audio side never validates parameters, so values from a stale or
    /// hand-edited state file are clamped here before they reach a slot.
    pub fn clamped(mut self) -> Self {
        self.ref_pitch = self.ref_pitch.clamp(REF_PITCH_MIN, REF_PITCH_MAX);
        self.note_bias = self.note_bias.clamp(NOTE_BIAS_MIN, NOTE_BIAS_MAX);
        self.corr_filter = self.corr_filter.clamp(CORR_FILTER_MIN, CORR_FILTER_MAX);
        self.corr_gain = self.corr_gain.clamp(CORR_GAIN_MIN, CORR_GAIN_MAX);
        self.corr_offset = self.corr_offset.clamp(CORR_OFFSET_MIN, CORR_OFFSET_MAX);
        // Re-mask in case a hand-edited file set bits above the 12th
        self.manual_mask = NoteMask::from_bits(self.manual_mask.bits());
        self
    }

    /// Write every field into the shared control slots
    pub fn apply(&self, shared: &TunerAtomics) {
        shared.set_ref_pitch(self.ref_pitch);
        shared.set_note_bias(self.note_bias);
        shared.set_corr_filter(self.corr_filter);
        shared.set_corr_gain(self.corr_gain);
        shared.set_corr_offset(self.corr_offset);
        shared.set_manual_mask(self.manual_mask);
    }

    /// Snapshot the current control slots for saving
    pub fn capture(shared: &TunerAtomics) -> Self {
        Self {
            ref_pitch: shared.ref_pitch(),
            note_bias: shared.note_bias(),
            corr_filter: shared.corr_filter(),
            corr_gain: shared.corr_gain(),
            corr_offset: shared.corr_offset(),
            manual_mask: shared.manual_mask(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let state = SessionState::default();
        let shared = TunerAtomics::new();
        assert_eq!(state, SessionState::capture(&shared));
    }

    #[test]
    fn test_clamping() {
        let state = SessionState {
            ref_pitch: 1000.0,
            note_bias: -1.0,
            corr_filter: 0.0,
            corr_gain: 2.0,
            corr_offset: -10.0,
            manual_mask: NoteMask::ALL,
        }
        .clamped();

        assert_eq!(state.ref_pitch, REF_PITCH_MAX);
        assert_eq!(state.note_bias, NOTE_BIAS_MIN);
        assert_eq!(state.corr_filter, CORR_FILTER_MIN);
        assert_eq!(state.corr_gain, CORR_GAIN_MAX);
        assert_eq!(state.corr_offset, CORR_OFFSET_MIN);
    }

    #[test]
    fn test_apply_capture_roundtrip() {
        let state = SessionState {
            ref_pitch: 432.0,
            note_bias: 0.7,
            corr_filter: 0.05,
            corr_gain: 0.9,
            corr_offset: 1.5,
            manual_mask: NoteMask::from_bits(0b1010_1011_0101),
        };

        let shared = TunerAtomics::new();
        state.apply(&shared);
        assert_eq!(SessionState::capture(&shared), state);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.yaml");

        let state = SessionState {
            manual_mask: NoteMask::ALL.with_class(3, false),
            ..SessionState::default()
        };
        super::super::save_config(&state, &path).unwrap();

        let loaded: SessionState = super::super::load_config(&path);
        assert_eq!(loaded, state);
    }
}
