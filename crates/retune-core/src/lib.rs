//! retune-core - realtime pitch correction for JACK
//!
//! A JACK client that corrects the pitch of a monophonic audio input toward
//! a set of allowed notes. The set comes from a user-selected scale mask,
//! momentarily overridden by whatever notes are held on the MIDI input.
//! Control and audio threads share state exclusively through single-word
//! lock-free slots, so the realtime callback never blocks or allocates.

pub mod audio;
pub mod config;
pub mod engine;
pub mod tuner;
pub mod types;

pub use types::*;
