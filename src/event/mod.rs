//! Timed score events — the interchange format between the interpreter and
//! the two back ends.
//!
//! Times are in seconds; the MIDI emitter converts back to beats using the
//! tempo in effect at each event's start time.

/// General MIDI channel assignments, fixed per instrument.
pub const CH_PIANO: u8 = 0;
pub const CH_GUITAR: u8 = 1;
pub const CH_BASS: u8 = 2;
/// Channel 10 (0-based 9) is the GM percussion channel.
pub const CH_DRUM: u8 = 9;

/// A single note: onset and duration in seconds, MIDI pitch, velocity,
/// channel. Pitch is `i32` so arithmetic on variables can go out of range
/// without wrapping; the back ends range-check.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub start_time: f64,
    pub duration: f64,
    pub pitch: i32,
    pub velocity: u8,
    pub channel: u8,
}

/// A tempo change at an absolute time.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoEvent {
    pub time: f64,
    pub bpm: u32,
}

/// A time-signature change at an absolute time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSignatureEvent {
    pub time: f64,
    pub numerator: u32,
    pub denominator: u32,
}

/// The interpreter's output: every note across all tracks plus the tempo and
/// time-signature timelines, each in chronological order of emission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    pub notes: Vec<NoteEvent>,
    pub tempos: Vec<TempoEvent>,
    pub time_signatures: Vec<TimeSignatureEvent>,
}

impl Score {
    /// End of the last note, in seconds. Zero for an empty score.
    pub fn length_seconds(&self) -> f64 {
        self.notes
            .iter()
            .map(|n| n.start_time + n.duration)
            .fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
