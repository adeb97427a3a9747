//! Realtime engine - note masking, lock-free control, per-block processing
//!
//! This module contains the audio-thread core of retune:
//! - NoteMaskTracker: per-pitch-class MIDI hold counts and the live mask
//! - TunerAtomics: lock-free parameter and telemetry slots
//! - TunerEngine: the per-block driver invoked by the audio backend

mod engine;
mod mask;
mod shared;

pub use engine::*;
pub use mask::*;
pub use shared::*;
