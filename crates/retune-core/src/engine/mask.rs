//! MIDI note masking - per-pitch-class reference counts and mask resolution

use crate::types::{MidiEvent, NoteMask, NUM_PITCH_CLASSES};

/// Tracks which pitch classes are currently held on the MIDI input
///
/// Owned exclusively by the audio thread. Each held note increments the
/// counter for its pitch class; releases decrement it. The live mask has a
/// bit set for every class with a nonzero count.
///
/// Counters are intentionally not clamped at zero: an orphan note-off (no
/// matching prior note-on) drives a counter negative, and that class then
/// reads as "active" until enough note-ons bring the count back to zero.
/// This mirrors the observable behavior of the wire protocol's framing and
/// self-corrects once the stream is consistent again.
pub struct NoteMaskTracker {
    counters: [i32; NUM_PITCH_CLASSES],
    live: NoteMask,
}

impl NoteMaskTracker {
    pub fn new() -> Self {
        Self {
            counters: [0; NUM_PITCH_CLASSES],
            live: NoteMask::EMPTY,
        }
    }

    /// Consume one block's MIDI events in delivery order, then recompute
    /// the live mask from the counters
    ///
    /// Only Note-On/Note-Off status nibbles are interpreted; everything
    /// else (control change, pitch bend, ...) is ignored.
    pub fn ingest<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = MidiEvent>,
    {
        for ev in events {
            if !ev.is_note_message() {
                continue;
            }
            if ev.is_note_on() {
                self.counters[ev.pitch_class()] += 1;
            } else {
                self.counters[ev.pitch_class()] -= 1;
            }
        }

        let mut live = NoteMask::EMPTY;
        for (class, &count) in self.counters.iter().enumerate() {
            if count != 0 {
                live = live.with_class(class, true);
            }
        }
        self.live = live;
    }

    /// Reset all counters and the live mask
    ///
    /// Called by the audio thread itself when it drains a pending clear
    /// request; never invoked directly from the control thread.
    pub fn clear(&mut self) {
        self.counters = [0; NUM_PITCH_CLASSES];
        self.live = NoteMask::EMPTY;
    }

    /// Mask of pitch classes currently sounding
    #[inline]
    pub fn live_mask(&self) -> NoteMask {
        self.live
    }

    /// Resolve the mask for this block: held MIDI notes entirely replace
    /// the manual selection for as long as any note is down
    #[inline]
    pub fn effective(&self, manual: NoteMask) -> NoteMask {
        if self.live.is_empty() {
            manual
        } else {
            self.live
        }
    }
}

impl Default for NoteMaskTracker {
    fn default() -> Self {
        Self::new()
    }
}
