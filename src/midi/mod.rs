//! Standard MIDI File emitter.
//!
//! Produces a format-1 file with one track per instrument (piano, guitar,
//! bass, percussion). Event times arrive in wall-clock seconds and are
//! converted to beats using the tempo in effect at each event's start, so a
//! mid-score tempo change does not shift earlier notes.

use crate::dsl::error::Diagnostic;
use crate::event::{Score, TempoEvent, CH_BASS, CH_DRUM, CH_GUITAR, CH_PIANO};

pub const DEFAULT_TICKS_PER_QUARTER: u16 = 480;

/// Minimum note length written to the file, in beats. Zero-length notes are
/// rejected by some players.
const MIN_NOTE_BEATS: f64 = 0.25;

const DEFAULT_BPM: u32 = 120;

/// General MIDI program numbers: acoustic grand, nylon guitar, fingered
/// electric bass. Percussion needs no program change.
const PROGRAM_PIANO: u8 = 0;
const PROGRAM_GUITAR: u8 = 24;
const PROGRAM_BASS: u8 = 33;

/// Piecewise-constant tempo timeline, seconds → beats.
struct TempoMap {
    /// (start time in seconds, bpm), first segment always at 0.0.
    segments: Vec<(f64, u32)>,
}

impl TempoMap {
    fn new(tempos: &[TempoEvent]) -> Self {
        let mut changes: Vec<(f64, u32)> = tempos
            .iter()
            .filter(|t| t.bpm > 0)
            .map(|t| (t.time.max(0.0), t.bpm))
            .collect();
        changes.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut segments: Vec<(f64, u32)> = vec![(0.0, DEFAULT_BPM)];
        for (time, bpm) in changes {
            match segments.last_mut() {
                Some(last) if time <= last.0 => last.1 = bpm,
                _ => segments.push((time, bpm)),
            }
        }
        Self { segments }
    }

    fn bpm_at(&self, time: f64) -> u32 {
        self.segments
            .iter()
            .take_while(|(start, _)| *start <= time)
            .last()
            .map(|(_, bpm)| *bpm)
            .unwrap_or(DEFAULT_BPM)
    }

    /// Beats elapsed from time zero to `time`, accumulated per segment.
    fn beats_at(&self, time: f64) -> f64 {
        let mut beats = 0.0;
        for (i, (start, bpm)) in self.segments.iter().enumerate() {
            if time <= *start {
                break;
            }
            let end = self
                .segments
                .get(i + 1)
                .map(|(s, _)| *s)
                .unwrap_or(f64::INFINITY);
            beats += (time.min(end) - start) * f64::from(*bpm) / 60.0;
        }
        beats
    }
}

/// An event within one MIDI track, before delta encoding. `order` breaks
/// same-tick ties: metas, then program changes, then note-offs, then
/// note-ons, so re-struck notes are not cut short.
struct TrackEvent {
    tick: u32,
    order: u8,
    data: Vec<u8>,
}

const ORDER_META: u8 = 0;
const ORDER_PROGRAM: u8 = 1;
const ORDER_NOTE_OFF: u8 = 2;
const ORDER_NOTE_ON: u8 = 3;

/// Emit the score as Standard MIDI File bytes. Total: individual bad notes
/// are reported and skipped, the file is always finalized.
pub fn emit(score: &Score, ticks_per_quarter: u16) -> (Vec<u8>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let tempo_map = TempoMap::new(&score.tempos);
    let tpq = f64::from(ticks_per_quarter);

    let to_tick = |beats: f64| -> u32 { (beats * tpq).round().max(0.0).min(f64::from(u32::MAX)) as u32 };

    // track index 0..=3: piano, guitar, bass, percussion
    let mut tracks: [Vec<TrackEvent>; 4] = Default::default();

    // Conductor data lives on the first track.
    if score.tempos.is_empty() {
        tracks[0].push(tempo_meta(0, DEFAULT_BPM));
    } else {
        for t in &score.tempos {
            if t.bpm == 0 {
                continue;
            }
            tracks[0].push(tempo_meta(to_tick(tempo_map.beats_at(t.time)), t.bpm));
        }
    }
    for ts in &score.time_signatures {
        tracks[0].push(time_signature_meta(
            to_tick(tempo_map.beats_at(ts.time)),
            ts.numerator,
            ts.denominator,
        ));
    }

    for (track, channel, program) in [
        (0usize, CH_PIANO, Some(PROGRAM_PIANO)),
        (1, CH_GUITAR, Some(PROGRAM_GUITAR)),
        (2, CH_BASS, Some(PROGRAM_BASS)),
        (3, CH_DRUM, None),
    ] {
        if let Some(program) = program {
            tracks[track].push(TrackEvent {
                tick: 0,
                order: ORDER_PROGRAM,
                data: vec![0xC0 | channel, program],
            });
        }

        for note in score.notes.iter().filter(|n| n.channel == channel) {
            let pitch = match u8::try_from(note.pitch) {
                Ok(p) if p <= 127 => p,
                _ => {
                    diagnostics.push(Diagnostic::midi(format!(
                        "pitch {} out of range, note skipped",
                        note.pitch
                    )));
                    continue;
                }
            };

            let bpm = tempo_map.bpm_at(note.start_time);
            let start_beats = tempo_map.beats_at(note.start_time);
            let mut duration_beats = note.duration * f64::from(bpm) / 60.0;
            if duration_beats <= 0.0 {
                duration_beats = MIN_NOTE_BEATS;
            }

            let on_tick = to_tick(start_beats);
            if on_tick == u32::MAX {
                diagnostics.push(Diagnostic::midi(format!(
                    "note at {:.1}s is beyond the representable tick range",
                    note.start_time
                )));
            }
            let off_tick = to_tick(start_beats + duration_beats).max(on_tick.saturating_add(1));
            let velocity = note.velocity.clamp(1, 127);

            tracks[track].push(TrackEvent {
                tick: on_tick,
                order: ORDER_NOTE_ON,
                data: vec![0x90 | channel, pitch, velocity],
            });
            tracks[track].push(TrackEvent {
                tick: off_tick,
                order: ORDER_NOTE_OFF,
                data: vec![0x80 | channel, pitch, 0],
            });
        }
    }

    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes()); // format 1
    bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    bytes.extend_from_slice(&ticks_per_quarter.to_be_bytes());

    for track in tracks {
        bytes.extend_from_slice(&finalize_track(track));
    }

    (bytes, diagnostics)
}

fn tempo_meta(tick: u32, bpm: u32) -> TrackEvent {
    let micros_per_quarter = 60_000_000 / bpm;
    let b = micros_per_quarter.to_be_bytes();
    TrackEvent {
        tick,
        order: ORDER_META,
        data: vec![0xFF, 0x51, 0x03, b[1], b[2], b[3]],
    }
}

fn time_signature_meta(tick: u32, numerator: u32, denominator: u32) -> TrackEvent {
    // dd is a power of two: denominator 4 → 2, 8 → 3.
    let dd = denominator.max(1).ilog2() as u8;
    TrackEvent {
        tick,
        order: ORDER_META,
        data: vec![
            0xFF,
            0x58,
            0x04,
            numerator.clamp(1, 255) as u8,
            dd,
            24, // MIDI clocks per metronome click
            8,  // 32nd notes per quarter
        ],
    }
}

/// Delta-encode a track's events and wrap them in an `MTrk` chunk.
fn finalize_track(mut events: Vec<TrackEvent>) -> Vec<u8> {
    events.sort_by(|a, b| a.tick.cmp(&b.tick).then(a.order.cmp(&b.order)));

    let mut data = Vec::new();
    let mut last_tick = 0u32;
    for event in events {
        push_vlq(&mut data, event.tick - last_tick);
        last_tick = event.tick;
        data.extend_from_slice(&event.data);
    }

    // end of track
    push_vlq(&mut data, 0);
    data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    let mut chunk = Vec::with_capacity(data.len() + 8);
    chunk.extend_from_slice(b"MTrk");
    chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
    chunk.extend_from_slice(&data);
    chunk
}

/// MIDI variable-length quantity: 7 bits per byte, high bit marks
/// continuation, most significant group first.
fn push_vlq(out: &mut Vec<u8>, mut value: u32) {
    let mut bytes = [0u8; 5];
    let mut i = 4;
    bytes[4] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        i -= 1;
        bytes[i] = ((value & 0x7F) as u8) | 0x80;
        value >>= 7;
    }
    out.extend_from_slice(&bytes[i..]);
}
