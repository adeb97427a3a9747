//! retune - realtime autotuner client for JACK
//!
//! Startup order: logging, saved session state, audio system (fail fast if
//! the server or ports are unavailable), then the control loop. The loop
//! polls engine telemetry on a timer and waits for the shutdown event; on
//! exit it saves the session state back to disk.

use std::time::Duration;

use anyhow::Context;
use crossbeam::channel::RecvTimeoutError;

use retune_core::audio::{start_audio_system, AudioConfig};
use retune_core::config::{default_state_path, load_config, save_config, SessionState};
use retune_core::engine::EngineEvent;

/// Telemetry polling cadence of the control loop
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG=debug for per-poll telemetry output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("retune starting up");

    let state_path = default_state_path();
    let state: SessionState = load_config(&state_path);
    let state = state.clamped();

    // No degraded mode: if the ports can't be established, exit non-zero
    let audio =
        start_audio_system(&AudioConfig::default()).context("failed to start the audio system")?;
    log::info!(
        "audio running as '{}': {} Hz, {} frames/block ({:.1} ms)",
        audio.client_name,
        audio.handle.sample_rate(),
        audio.handle.buffer_size(),
        audio.handle.latency_ms()
    );

    // Rehydrate the engine; visible to the audio thread on its next block
    state.apply(&audio.shared);
    log::info!(
        "session restored: ref {:.1} Hz, scale [{}]",
        state.ref_pitch,
        state.manual_mask
    );

    loop {
        match audio.events.recv_timeout(POLL_INTERVAL) {
            Ok(EngineEvent::Shutdown) => {
                log::info!("JACK server shut down, exiting");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                log::debug!(
                    "midi [{}]  note [{}]  error {:+.2} st",
                    audio.shared.live_midi_mask(),
                    audio.shared.note_set(),
                    audio.shared.tuning_error()
                );
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("engine event channel closed");
                break;
            }
        }
    }

    let final_state = SessionState::capture(&audio.shared);
    if let Err(e) = save_config(&final_state, &state_path) {
        log::warn!("could not save session state: {:#}", e);
    }

    Ok(())
}
