//! Common types for retune
//!
//! Pitch-class masks and raw MIDI events shared between the audio engine,
//! the control surface API, and session persistence.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of pitch classes in an octave
pub const NUM_PITCH_CLASSES: usize = 12;

/// Pitch-class names, index 0 = C
pub const PITCH_CLASS_NAMES: [&str; NUM_PITCH_CLASSES] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A set of allowed pitch classes, one bit per class (bit 0 = C .. bit 11 = B)
///
/// This is the unit the correction engine works in: the detected pitch is
/// snapped to the nearest note whose class is in the mask. Stored as the low
/// 12 bits of a `u16`; construction masks out anything above bit 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteMask(u16);

impl NoteMask {
    /// All 12 pitch classes allowed (chromatic correction)
    pub const ALL: NoteMask = NoteMask(0xFFF);

    /// No pitch classes allowed
    pub const EMPTY: NoteMask = NoteMask(0);

    /// Build a mask from raw bits; bits above the 12th are discarded
    #[inline]
    pub fn from_bits(bits: u16) -> Self {
        NoteMask(bits & 0xFFF)
    }

    /// Mask with a single pitch class set
    #[inline]
    pub fn single(class: usize) -> Self {
        NoteMask(1 << (class % NUM_PITCH_CLASSES))
    }

    /// Raw 12-bit representation
    #[inline]
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Whether the given pitch class (0 = C .. 11 = B) is in the set
    #[inline]
    pub fn contains(self, class: usize) -> bool {
        self.0 & (1 << (class % NUM_PITCH_CLASSES)) != 0
    }

    /// Return a copy with one pitch class added or removed
    #[inline]
    pub fn with_class(self, class: usize, enabled: bool) -> Self {
        let bit = 1 << (class % NUM_PITCH_CLASSES);
        if enabled {
            NoteMask(self.0 | bit)
        } else {
            NoteMask(self.0 & !bit)
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for NoteMask {
    fn default() -> Self {
        NoteMask::ALL
    }
}

impl fmt::Display for NoteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (class, name) in PITCH_CLASS_NAMES.iter().enumerate() {
            if self.contains(class) {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        if first {
            write!(f, "-")?;
        }
        Ok(())
    }
}

/// A raw MIDI channel-voice event as delivered by the I/O layer
///
/// Only the first three bytes matter to the engine; anything shorter
/// (realtime messages, truncated events) is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    pub status: u8,
    pub note: u8,
    pub velocity: u8,
}

impl MidiEvent {
    /// Parse an event from a raw MIDI buffer; `None` if too short
    #[inline]
    pub fn from_raw(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }
        Some(MidiEvent {
            status: bytes[0],
            note: bytes[1],
            velocity: bytes[2],
        })
    }

    /// Whether the status nibble is Note-On (0x90) or Note-Off (0x80)
    #[inline]
    pub fn is_note_message(self) -> bool {
        matches!(self.status & 0xF0, 0x80 | 0x90)
    }

    /// Note-on discrimination as the wire protocol frames it
    ///
    /// An event counts as "note on" only when velocity is nonzero AND bit
    /// 0x10 of the status byte is set. The 0x10 bit is an extra on/off
    /// discriminator layered over the standard opcodes (0x90 has it set,
    /// 0x80 does not), so velocity-0 note-ons and true note-offs both land
    /// on the release path.
    #[inline]
    pub fn is_note_on(self) -> bool {
        self.velocity != 0 && self.status & 0x10 != 0
    }

    /// Pitch class of this event's note number
    #[inline]
    pub fn pitch_class(self) -> usize {
        (self.note % 12) as usize
    }
}
