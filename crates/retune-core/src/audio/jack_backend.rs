//! JACK audio/MIDI backend
//!
//! Connects the tuner engine to a JACK server: one audio input, one audio
//! output, and one MIDI input port ("pitch") carrying note selection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                    ┌─────────────────────┐
//! │  Control thread  │── Relaxed atomics ─►   TunerAtomics      │
//! │  (poll loop)     │◄─ telemetry ───────│  (lock-free slots)  │
//! └──────────────────┘                    └──────────┬──────────┘
//!         ▲                                          │ once per block
//!         │ EngineEvent (crossbeam)                  ▼
//! ┌──────────────────┐                    ┌─────────────────────┐
//! │  Notification    │                    │  JACK RT thread     │
//! │  thread          │── state cell ─────►│  (owns TunerEngine) │
//! └──────────────────┘                    └─────────────────────┘
//! ```
//!
//! The process handler owns the engine exclusively; the notification
//! handler only touches the shared state cell and the event channel, never
//! control-thread state.

use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use jack::{AudioIn, AudioOut, Client, ClientOptions, Control, MidiIn, Port, ProcessScope};

use crate::engine::{
    event_channel, EngineEvent, EngineState, EngineStateCell, TunerAtomics, TunerEngine,
};
use crate::tuner::Retuner;
use crate::types::MidiEvent;

use super::error::{AudioError, AudioResult};

/// JACK port names
const AUDIO_IN: &str = "in";
const AUDIO_OUT: &str = "out";
const MIDI_IN: &str = "pitch";

/// Audio system configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Client name to request (JACK may rename on collision)
    pub client_name: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            client_name: "retune".to_string(),
        }
    }
}

/// Handle that keeps the JACK client active; drop it to disconnect
pub struct JackAudioHandle {
    _async_client: jack::AsyncClient<Notifications, Processor>,
    sample_rate: u32,
    buffer_size: u32,
}

impl JackAudioHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// One-way latency of a block in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// Everything the control thread needs after startup
pub struct AudioSystemResult {
    /// Keeps audio alive; drop to stop
    pub handle: JackAudioHandle,
    /// Lock-free control and telemetry slots
    pub shared: Arc<TunerAtomics>,
    /// Engine events (shutdown) for the control loop
    pub events: Receiver<EngineEvent>,
    /// Actual client name after any collision renaming
    pub client_name: String,
}

/// JACK process handler; owns the TunerEngine exclusively
struct Processor {
    in_port: Port<AudioIn>,
    out_port: Port<AudioOut>,
    midi_port: Port<MidiIn>,
    engine: TunerEngine,
}

impl jack::ProcessHandler for Processor {
    fn process(&mut self, _client: &Client, ps: &ProcessScope) -> Control {
        let midi = &self.midi_port;
        let events = midi.iter(ps).filter_map(|raw| MidiEvent::from_raw(raw.bytes));
        let input = self.in_port.as_slice(ps);
        let output = self.out_port.as_mut_slice(ps);

        self.engine.process_block(events, input, output);

        Control::Continue
    }
}

/// JACK notification handler
///
/// The shutdown notification may arrive on a thread that is neither the
/// audio callback nor the control loop, so it only flips the state cell and
/// pushes an event; it never calls into control-thread resources.
struct Notifications {
    state: Arc<EngineStateCell>,
    event_tx: Sender<EngineEvent>,
}

impl jack::NotificationHandler for Notifications {
    fn shutdown(&mut self, _status: jack::ClientStatus, _reason: &str) {
        self.state.store(EngineState::ShuttingDown);
        let _ = self.event_tx.try_send(EngineEvent::Shutdown);
    }

    fn sample_rate(&mut self, _client: &Client, srate: jack::Frames) -> Control {
        log::info!("JACK sample rate changed to: {}", srate);
        Control::Continue
    }

    fn xrun(&mut self, _client: &Client) -> Control {
        log::warn!("JACK xrun detected");
        Control::Continue
    }
}

/// Start the audio system
///
/// Opens the JACK client, registers the audio and MIDI ports, builds the
/// retuner at the server's sample rate, and activates processing. Any
/// failure here is fatal to the caller; there is no degraded mode.
pub fn start_audio_system(config: &AudioConfig) -> AudioResult<AudioSystemResult> {
    let (client, _status) = Client::new(&config.client_name, ClientOptions::NO_START_SERVER)
        .map_err(AudioError::ClientOpen)?;
    let client_name = client.name().to_string();

    let sample_rate = client.sample_rate() as u32;
    let buffer_size = client.buffer_size();

    log::info!(
        "JACK client '{}' created (sample rate: {}Hz, buffer: {} frames, latency: {:.1}ms)",
        client_name,
        sample_rate,
        buffer_size,
        (buffer_size as f32 / sample_rate as f32) * 1000.0
    );

    let in_port = client
        .register_port(AUDIO_IN, AudioIn::default())
        .map_err(|e| AudioError::PortRegister {
            name: AUDIO_IN,
            source: e,
        })?;
    let out_port = client
        .register_port(AUDIO_OUT, AudioOut::default())
        .map_err(|e| AudioError::PortRegister {
            name: AUDIO_OUT,
            source: e,
        })?;
    let midi_port = client
        .register_port(MIDI_IN, MidiIn::default())
        .map_err(|e| AudioError::PortRegister {
            name: MIDI_IN,
            source: e,
        })?;

    let retuner = Retuner::new(sample_rate);
    log::debug!("retuner latency: {} samples", retuner.latency());

    let shared = Arc::new(TunerAtomics::new());
    let state = Arc::new(EngineStateCell::new());
    let (event_tx, event_rx) = event_channel();

    let processor = Processor {
        in_port,
        out_port,
        midi_port,
        engine: TunerEngine::new(retuner, Arc::clone(&shared), Arc::clone(&state)),
    };
    let notifications = Notifications {
        state: Arc::clone(&state),
        event_tx,
    };

    // Setup is complete; the first callback may fire as soon as we activate
    state.store(EngineState::Active);

    let async_client = client
        .activate_async(notifications, processor)
        .map_err(AudioError::Activate)?;

    log::info!("JACK client activated");

    Ok(AudioSystemResult {
        handle: JackAudioHandle {
            _async_client: async_client,
            sample_rate,
            buffer_size,
        },
        shared,
        events: event_rx,
        client_name,
    })
}
