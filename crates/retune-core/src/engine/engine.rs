//! Per-block tuner engine, owned by the audio thread
//!
//! The engine is driven once per audio block by the I/O backend. It pulls
//! the block's MIDI events through the note tracker, resolves the active
//! mask, reads every control slot once, runs the retuner over the buffer,
//! and publishes telemetry. Nothing in the block path blocks, allocates,
//! or waits on the control thread.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};

use crate::tuner::Retuner;
use crate::types::MidiEvent;

use super::mask::NoteMaskTracker;
use super::shared::TunerAtomics;

/// Lifecycle of the audio engine
///
/// `Inactive` before setup completes, `Active` during normal per-block
/// processing, `ShuttingDown` once the I/O server announced it is going
/// away. `ShuttingDown` is terminal; the callback produces silence if it is
/// invoked at all after the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Inactive = 0,
    Active = 1,
    ShuttingDown = 2,
}

/// Shared lifecycle cell
///
/// Written by setup code and by the I/O layer's shutdown notification
/// (which may arrive on an arbitrary thread), read by the audio callback at
/// the top of every block.
pub struct EngineStateCell(AtomicU8);

impl EngineStateCell {
    pub fn new() -> Self {
        EngineStateCell(AtomicU8::new(EngineState::Inactive as u8))
    }

    #[inline]
    pub fn load(&self) -> EngineState {
        match self.0.load(Ordering::Relaxed) {
            1 => EngineState::Active,
            2 => EngineState::ShuttingDown,
            _ => EngineState::Inactive,
        }
    }

    #[inline]
    pub fn store(&self, state: EngineState) {
        self.0.store(state as u8, Ordering::Relaxed);
    }
}

impl Default for EngineStateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Events delivered from the audio/notification threads to the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The I/O server is going away; the control thread should terminate
    Shutdown,
}

/// Capacity of the engine event channel; shutdown is the only traffic, so a
/// handful of slots is plenty
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// Create the engine event channel (notification side → control loop)
pub fn event_channel() -> (Sender<EngineEvent>, Receiver<EngineEvent>) {
    crossbeam::channel::bounded(EVENT_QUEUE_CAPACITY)
}

/// The realtime engine: note tracking, mask resolution, parameter sync, and
/// retuner invocation for one block at a time
pub struct TunerEngine {
    state: Arc<EngineStateCell>,
    tracker: NoteMaskTracker,
    retuner: Retuner,
    shared: Arc<TunerAtomics>,
}

impl TunerEngine {
    pub fn new(retuner: Retuner, shared: Arc<TunerAtomics>, state: Arc<EngineStateCell>) -> Self {
        Self {
            state,
            tracker: NoteMaskTracker::new(),
            retuner,
            shared,
        }
    }

    /// Process one audio block
    ///
    /// `events` are this block's MIDI events in delivery order; no event
    /// queue spans blocks. The output is fully written on every path,
    /// including the not-active one.
    pub fn process_block<I>(&mut self, events: I, input: &[f32], output: &mut [f32])
    where
        I: IntoIterator<Item = MidiEvent>,
    {
        if self.state.load() != EngineState::Active {
            output.fill(0.0);
            return;
        }

        // Drain a pending "release all MIDI holds" request on our own turn,
        // so the counters are only ever touched from this thread
        if self.shared.take_midi_clear() {
            self.tracker.clear();
        }

        self.tracker.ingest(events);
        let mask = self.tracker.effective(self.shared.manual_mask());

        self.retuner.set_ref_pitch(self.shared.ref_pitch());
        self.retuner.set_note_bias(self.shared.note_bias());
        self.retuner.set_corr_filter(self.shared.corr_filter());
        self.retuner.set_corr_gain(self.shared.corr_gain());
        self.retuner.set_corr_offset(self.shared.corr_offset());
        self.retuner.set_note_mask(mask);

        let n = input.len().min(output.len());
        self.retuner.process(&input[..n], &mut output[..n]);
        output[n..].fill(0.0);

        self.shared.publish_live_midi_mask(self.tracker.live_mask());
        self.shared.publish_note_set(self.retuner.note_set());
        self.shared.publish_tuning_error(self.retuner.tuning_error());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NoteMask;

    const BLOCK: usize = 256;

    fn make_engine() -> (TunerEngine, Arc<TunerAtomics>, Arc<EngineStateCell>) {
        let shared = Arc::new(TunerAtomics::new());
        let state = Arc::new(EngineStateCell::new());
        let engine = TunerEngine::new(Retuner::new(48000), Arc::clone(&shared), Arc::clone(&state));
        (engine, shared, state)
    }

    fn on(note: u8) -> MidiEvent {
        MidiEvent {
            status: 0x90,
            note,
            velocity: 100,
        }
    }

    fn off(note: u8) -> MidiEvent {
        MidiEvent {
            status: 0x80,
            note,
            velocity: 0,
        }
    }

    #[test]
    fn test_inactive_engine_outputs_silence() {
        let (mut engine, _shared, _state) = make_engine();
        let input = vec![0.25; BLOCK];
        let mut output = vec![1.0; BLOCK];

        engine.process_block([], &input, &mut output);

        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_shutdown_state_stops_processing() {
        let (mut engine, _shared, state) = make_engine();
        state.store(EngineState::Active);
        state.store(EngineState::ShuttingDown);

        let input = vec![0.25; BLOCK];
        let mut output = vec![1.0; BLOCK];
        engine.process_block([], &input, &mut output);

        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_midi_hold_publishes_live_mask() {
        let (mut engine, shared, state) = make_engine();
        state.store(EngineState::Active);

        let input = vec![0.0; BLOCK];
        let mut output = vec![0.0; BLOCK];

        // C and E held: bits 0 and 4
        engine.process_block([on(60), on(64)], &input, &mut output);
        assert_eq!(shared.live_midi_mask().bits(), 0b0000_0001_0001);

        engine.process_block([off(64)], &input, &mut output);
        assert_eq!(shared.live_midi_mask(), NoteMask::single(0));

        engine.process_block([off(60)], &input, &mut output);
        assert!(shared.live_midi_mask().is_empty());
    }

    #[test]
    fn test_clear_request_drained_within_one_block() {
        let (mut engine, shared, state) = make_engine();
        state.store(EngineState::Active);

        let input = vec![0.0; BLOCK];
        let mut output = vec![0.0; BLOCK];

        engine.process_block([on(60), on(64)], &input, &mut output);
        assert!(!shared.live_midi_mask().is_empty());

        shared.request_midi_clear();
        engine.process_block([], &input, &mut output);
        assert!(shared.live_midi_mask().is_empty());

        // The request is one-shot: a later hold is unaffected
        engine.process_block([on(62)], &input, &mut output);
        assert_eq!(shared.live_midi_mask(), NoteMask::single(2));
    }

    /// Flood every parameter slot from a control thread while blocks are
    /// being processed; the callback side must keep completing and the
    /// output must stay fully written and finite.
    #[test]
    fn test_parameter_flood_during_processing() {
        let (mut engine, shared, state) = make_engine();
        state.store(EngineState::Active);

        let writer_shared = Arc::clone(&shared);
        let writer = std::thread::spawn(move || {
            for i in 0..50_000u32 {
                writer_shared.set_ref_pitch(400.0 + (i % 80) as f32);
                writer_shared.set_note_bias((i % 100) as f32 / 100.0);
                writer_shared.set_corr_filter(0.02 + (i % 48) as f32 / 100.0);
                writer_shared.set_corr_gain((i % 100) as f32 / 100.0);
                writer_shared.set_corr_offset((i % 5) as f32 - 2.0);
                writer_shared.set_manual_mask(NoteMask::from_bits((i % 0xFFF) as u16));
            }
        });

        let input = vec![0.1; BLOCK];
        let mut output = vec![0.0; BLOCK];
        for _ in 0..200 {
            engine.process_block([], &input, &mut output);
            assert!(output.iter().all(|s| s.is_finite()));
        }

        writer.join().unwrap();
    }

    #[test]
    fn test_event_channel_is_nonblocking() {
        let (tx, rx) = event_channel();
        tx.try_send(EngineEvent::Shutdown).unwrap();
        assert_eq!(rx.recv().unwrap(), EngineEvent::Shutdown);
        assert!(rx.try_recv().is_err());
    }
}
