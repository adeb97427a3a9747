//! Audio backend for retune
//!
//! JACK is the only backend: the tuner is a client of the JACK audio/MIDI
//! server by design (PipeWire's JACK layer works too). The backend follows
//! a lock-free design for real-time safety:
//!
//! - **Control thread**: writes parameter slots via relaxed atomics
//! - **Audio thread**: owns the TunerEngine exclusively
//! - **Notification thread**: delivers shutdown over a crossbeam channel

mod error;
mod jack_backend;

pub use error::{AudioError, AudioResult};
pub use jack_backend::{
    start_audio_system, AudioConfig, AudioSystemResult, JackAudioHandle,
};
