//! Lock-free shared state between the control thread and the audio thread
//!
//! Every control→audio value is its own single-word atomic slot: writing one
//! parameter never blocks, allocates, or touches another slot, and the audio
//! thread reads each slot exactly once per block. There is deliberately no
//! cross-parameter atomicity - each parameter's effect on the correction
//! engine is independently idempotent, so observing two "simultaneous"
//! writes across a block boundary in either order is fine.
//!
//! All operations use `Ordering::Relaxed`: only visibility is needed, and a
//! one-block input lag on a manual control is acceptable.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::tuner::{
    DEFAULT_CORR_FILTER, DEFAULT_CORR_GAIN, DEFAULT_CORR_OFFSET, DEFAULT_NOTE_BIAS,
    DEFAULT_REF_PITCH,
};
use crate::types::NoteMask;

/// Shared control and telemetry slots for the tuner engine
///
/// The control surface holds this behind an `Arc` and may call any setter at
/// any time. The audio thread reads the control slots at the start of each
/// block and publishes telemetry at the end of each block; the control
/// thread polls telemetry on its own schedule (eventually consistent within
/// one poll interval).
///
/// f32 parameters are stored as their bit patterns in `AtomicU32`.
pub struct TunerAtomics {
    // Control thread writes, audio thread reads
    manual_mask: AtomicU32,
    ref_pitch: AtomicU32,
    note_bias: AtomicU32,
    corr_filter: AtomicU32,
    corr_gain: AtomicU32,
    corr_offset: AtomicU32,
    /// Deferred "release all MIDI holds" request, drained by the audio thread
    midi_clear: AtomicBool,

    // Audio thread writes, control thread reads
    live_midi_mask: AtomicU32,
    note_set: AtomicU32,
    tuning_error: AtomicU32,
}

impl TunerAtomics {
    /// Create the shared slots with startup defaults (chromatic manual mask)
    pub fn new() -> Self {
        Self {
            manual_mask: AtomicU32::new(NoteMask::ALL.bits() as u32),
            ref_pitch: AtomicU32::new(DEFAULT_REF_PITCH.to_bits()),
            note_bias: AtomicU32::new(DEFAULT_NOTE_BIAS.to_bits()),
            corr_filter: AtomicU32::new(DEFAULT_CORR_FILTER.to_bits()),
            corr_gain: AtomicU32::new(DEFAULT_CORR_GAIN.to_bits()),
            corr_offset: AtomicU32::new(DEFAULT_CORR_OFFSET.to_bits()),
            midi_clear: AtomicBool::new(false),
            live_midi_mask: AtomicU32::new(NoteMask::EMPTY.bits() as u32),
            note_set: AtomicU32::new(NoteMask::EMPTY.bits() as u32),
            tuning_error: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    // ── Control surface API (control thread) ──────────────────────────

    /// Replace the user-selected scale mask; visible to the audio thread
    /// on its next block read
    pub fn set_manual_mask(&self, mask: NoteMask) {
        self.manual_mask.store(mask.bits() as u32, Ordering::Relaxed);
    }

    /// Request that all MIDI note holds be released
    ///
    /// The audio thread drains this flag synchronously on its own turn and
    /// resets its counters; the control thread never writes them directly,
    /// which is what makes this safe while a block is in flight.
    pub fn request_midi_clear(&self) {
        self.midi_clear.store(true, Ordering::Relaxed);
    }

    /// Reference pitch of A in Hz
    pub fn set_ref_pitch(&self, hz: f32) {
        self.ref_pitch.store(hz.to_bits(), Ordering::Relaxed);
    }

    /// Preference weight for staying on the current note (0-1)
    pub fn set_note_bias(&self, bias: f32) {
        self.note_bias.store(bias.to_bits(), Ordering::Relaxed);
    }

    /// Correction smoothing filter coefficient
    pub fn set_corr_filter(&self, coeff: f32) {
        self.corr_filter.store(coeff.to_bits(), Ordering::Relaxed);
    }

    /// Amount of correction applied (0 = off, 1 = full)
    pub fn set_corr_gain(&self, gain: f32) {
        self.corr_gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    /// Static pitch offset in semitones
    pub fn set_corr_offset(&self, semitones: f32) {
        self.corr_offset.store(semitones.to_bits(), Ordering::Relaxed);
    }

    // ── Audio thread reads ────────────────────────────────────────────

    #[inline]
    pub fn manual_mask(&self) -> NoteMask {
        NoteMask::from_bits(self.manual_mask.load(Ordering::Relaxed) as u16)
    }

    /// Take a pending MIDI-clear request, resetting the flag
    #[inline]
    pub fn take_midi_clear(&self) -> bool {
        self.midi_clear.swap(false, Ordering::Relaxed)
    }

    #[inline]
    pub fn ref_pitch(&self) -> f32 {
        f32::from_bits(self.ref_pitch.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn note_bias(&self) -> f32 {
        f32::from_bits(self.note_bias.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn corr_filter(&self) -> f32 {
        f32::from_bits(self.corr_filter.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn corr_gain(&self) -> f32 {
        f32::from_bits(self.corr_gain.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn corr_offset(&self) -> f32 {
        f32::from_bits(self.corr_offset.load(Ordering::Relaxed))
    }

    // ── Telemetry (audio thread publishes, control thread polls) ──────

    pub(crate) fn publish_live_midi_mask(&self, mask: NoteMask) {
        self.live_midi_mask.store(mask.bits() as u32, Ordering::Relaxed);
    }

    pub(crate) fn publish_note_set(&self, mask: NoteMask) {
        self.note_set.store(mask.bits() as u32, Ordering::Relaxed);
    }

    pub(crate) fn publish_tuning_error(&self, semitones: f32) {
        self.tuning_error.store(semitones.to_bits(), Ordering::Relaxed);
    }

    /// Pitch classes currently held on the MIDI input (lock-free read)
    pub fn live_midi_mask(&self) -> NoteMask {
        NoteMask::from_bits(self.live_midi_mask.load(Ordering::Relaxed) as u16)
    }

    /// Pitch classes the engine is currently correcting toward (lock-free read)
    pub fn note_set(&self) -> NoteMask {
        NoteMask::from_bits(self.note_set.load(Ordering::Relaxed) as u16)
    }

    /// Current tuning error in semitones (lock-free read)
    pub fn tuning_error(&self) -> f32 {
        f32::from_bits(self.tuning_error.load(Ordering::Relaxed))
    }
}

impl Default for TunerAtomics {
    fn default() -> Self {
        Self::new()
    }
}
