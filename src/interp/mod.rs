//! Tree-walking interpreter: tracks → timed [`Score`] events.
//!
//! Execution is total. Every failure (undefined variable, unknown volume,
//! out-of-range pitch source, bad duration) is reported as a [`Diagnostic`]
//! and replaced with a documented default so the rest of the score still
//! renders.

pub mod env;

use std::collections::HashMap;

use crate::dsl::ast::*;
use crate::dsl::error::Diagnostic;
use crate::dsl::note::parse_spn;
use crate::event::{
    NoteEvent, Score, TempoEvent, TimeSignatureEvent, CH_BASS, CH_DRUM, CH_GUITAR, CH_PIANO,
};
use env::{Environment, Value};

/// Upper bound on loop bodies executed per `for` command.
const MAX_LOOP_ITERATIONS: usize = 1000;

/// Default velocity when no volume has been set or the name is unknown.
const DEFAULT_VELOCITY: u8 = 80;

/// Open-string MIDI pitches, string 1 first (low to high).
const GUITAR_STRINGS: [i32; 6] = [40, 45, 50, 55, 59, 64];
const BASS_STRINGS: [i32; 4] = [28, 33, 38, 43];

pub struct Interpreter {
    score: Score,
    diagnostics: Vec<Diagnostic>,
    env: Environment,
    current_time: f64,
    /// Beats per minute; persists across tracks.
    tempo: u32,
    /// Per-instrument velocity; persists across tracks.
    volumes: HashMap<Instrument, u8>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the interpreter over parsed tracks.
pub fn interpret(tracks: &[Track]) -> (Score, Vec<Diagnostic>) {
    Interpreter::new().run(tracks)
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            score: Score::default(),
            diagnostics: Vec::new(),
            env: Environment::new(),
            current_time: 0.0,
            tempo: 120,
            volumes: HashMap::new(),
        }
    }

    /// Execute all tracks in order. Each track starts at time zero with a
    /// fresh variable scope; tempo and volumes carry over.
    pub fn run(mut self, tracks: &[Track]) -> (Score, Vec<Diagnostic>) {
        for track in tracks {
            self.env = Environment::new();
            self.current_time = 0.0;
            self.exec_commands(&track.commands, track.kind);
        }
        (self.score, self.diagnostics)
    }

    fn exec_commands(&mut self, commands: &[Command], track: Instrument) {
        for command in commands {
            self.exec_command(command, track);
        }
    }

    fn exec_command(&mut self, command: &Command, track: Instrument) {
        match command {
            Command::TimeSignature {
                numerator,
                denominator,
            } => {
                if *numerator == 0 || *denominator == 0 {
                    self.diagnostics.push(Diagnostic::interpret(format!(
                        "invalid time signature {numerator}/{denominator}, ignored"
                    )));
                    return;
                }
                self.score.time_signatures.push(TimeSignatureEvent {
                    time: self.current_time,
                    numerator: *numerator,
                    denominator: *denominator,
                });
            }
            Command::Tempo(bpm) => {
                if *bpm == 0 {
                    self.diagnostics
                        .push(Diagnostic::interpret("tempo 0 ignored".to_string()));
                    return;
                }
                self.tempo = *bpm;
                self.score.tempos.push(TempoEvent {
                    time: self.current_time,
                    bpm: *bpm,
                });
            }
            Command::Volume(name) => self.set_volume(name, track),
            Command::PianoNote { note, duration, .. } => {
                let pitch = self.resolve_note_arg(note);
                let beats = self.resolve_duration(duration);
                self.emit_note(pitch, beats, CH_PIANO, Instrument::Piano);
            }
            Command::GuitarNote {
                string,
                fret,
                duration,
            } => {
                let pitch = self.string_pitch(*string, fret, &GUITAR_STRINGS, "guitar");
                let beats = self.resolve_duration(duration);
                self.emit_note(pitch, beats, CH_GUITAR, Instrument::Guitar);
            }
            Command::BassNote {
                string,
                fret,
                duration,
            } => {
                let pitch = self.string_pitch(*string, fret, &BASS_STRINGS, "bass");
                let beats = self.resolve_duration(duration);
                self.emit_note(pitch, beats, CH_BASS, Instrument::Bass);
            }
            Command::DrumNote { drum, duration } => {
                let pitch = drum_key(drum).unwrap_or_else(|| {
                    self.diagnostics.push(Diagnostic::interpret(format!(
                        "unknown drum type '{drum}', using KICK"
                    )));
                    36
                });
                let beats = self.resolve_duration(duration);
                self.emit_note(pitch, beats, CH_DRUM, Instrument::Drum);
            }
            Command::Pause { duration } => {
                let beats = self.resolve_duration(duration);
                self.current_time += self.beats_to_seconds(beats);
            }
            Command::Sync(members) => {
                let start = self.current_time;
                let mut max_elapsed = 0.0_f64;
                for member in members {
                    self.current_time = start;
                    self.exec_command(member, track);
                    max_elapsed = max_elapsed.max(self.current_time - start);
                }
                self.current_time = start + max_elapsed;
            }
            Command::For(f) => self.exec_for(f, track),
            Command::Assign { name, op, value } => {
                let value = self.operand_value(value);
                self.apply_assign(name, *op, value);
            }
        }
    }

    fn exec_for(&mut self, f: &ForLoop, track: Instrument) {
        let init = self.operand_value(&f.init);
        self.env.set(f.var.clone(), init);

        let mut iterations = 0;
        while self.eval_expr(&f.condition) != 0.0 {
            if iterations >= MAX_LOOP_ITERATIONS {
                self.diagnostics.push(Diagnostic::interpret(format!(
                    "loop exceeded {MAX_LOOP_ITERATIONS} iterations, stopping"
                )));
                break;
            }
            self.exec_commands(&f.body, track);
            let step = self.operand_value(&f.incr_value);
            self.apply_assign(&f.incr_var, f.incr_op, step);
            iterations += 1;
        }
    }

    fn set_volume(&mut self, name: &str, track: Instrument) {
        // A gradual fade is not modeled; the current level stands.
        if name == "diminuendo" {
            return;
        }
        match volume_level(name) {
            Some(level) => {
                self.volumes.insert(track, level);
            }
            None => {
                self.diagnostics.push(Diagnostic::interpret(format!(
                    "unknown volume '{name}', using {DEFAULT_VELOCITY}"
                )));
                self.volumes.insert(track, DEFAULT_VELOCITY);
            }
        }
    }

    fn emit_note(&mut self, pitch: i32, beats: f64, channel: u8, instrument: Instrument) {
        let velocity = *self
            .volumes
            .get(&instrument)
            .unwrap_or(&DEFAULT_VELOCITY);
        let duration = self.beats_to_seconds(beats);
        self.score.notes.push(NoteEvent {
            start_time: self.current_time,
            duration,
            pitch,
            velocity,
            channel,
        });
        self.current_time += duration;
    }

    fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * 60.0 / self.tempo as f64
    }

    /// Literal SPN or a variable holding a note/number. Failures default to
    /// middle C for literals and 0 for variables.
    fn resolve_note_arg(&mut self, note: &NoteArg) -> i32 {
        match note {
            NoteArg::Spn(name) => match parse_spn(name) {
                Some(p) => i32::from(p),
                None => {
                    self.diagnostics.push(Diagnostic::interpret(format!(
                        "note '{name}' out of range, using C4"
                    )));
                    60
                }
            },
            NoteArg::Var(name) => self.number_of(name).round() as i32,
        }
    }

    fn string_pitch(
        &mut self,
        string: u8,
        fret: &FretArg,
        open_strings: &[i32],
        instrument: &str,
    ) -> i32 {
        if string == 0 {
            self.diagnostics.push(Diagnostic::interpret(format!(
                "{instrument} string 0 out of range, using 1"
            )));
        }
        let index = usize::from(string).saturating_sub(1);
        if index >= open_strings.len() {
            self.diagnostics.push(Diagnostic::interpret(format!(
                "{instrument} string {string} out of range, using {}",
                open_strings.len()
            )));
        }
        let open = open_strings[index.min(open_strings.len() - 1)];

        // Fret offsets stay in i64 so an absurd literal clamps instead of
        // wrapping; the back ends range-check the resulting pitch.
        let fret = match fret {
            FretArg::Literal(n) => *n,
            FretArg::Var(name) => self.number_of(name).round() as i64,
        };
        (i64::from(open) + fret)
            .clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    /// Duration in beats. Missing or non-numeric variables and invalid values
    /// default to one beat.
    fn resolve_duration(&mut self, duration: &DurationExpr) -> f64 {
        let beats = match duration {
            DurationExpr::Beats(b) => *b,
            DurationExpr::Var(name) => match self.env.get(name).cloned() {
                Some(value) => match value.as_number() {
                    Some(v) => v,
                    None => {
                        self.diagnostics.push(Diagnostic::interpret(format!(
                            "duration variable '{name}' is not numeric, using 1"
                        )));
                        1.0
                    }
                },
                None => {
                    self.diagnostics.push(Diagnostic::interpret(format!(
                        "undefined duration variable '{name}', using 1"
                    )));
                    1.0
                }
            },
        };

        if !beats.is_finite() || beats < 0.0 {
            self.diagnostics.push(Diagnostic::interpret(format!(
                "invalid duration {beats}, using 1"
            )));
            return 1.0;
        }
        beats
    }

    /// Numeric value of a variable; undefined or non-numeric reads as 0.
    fn number_of(&mut self, name: &str) -> f64 {
        match self.env.get(name).cloned() {
            Some(value) => match value.as_number() {
                Some(v) => v,
                None => {
                    self.diagnostics.push(Diagnostic::interpret(format!(
                        "variable '{name}' is not numeric, using 0"
                    )));
                    0.0
                }
            },
            None => {
                self.diagnostics.push(Diagnostic::interpret(format!(
                    "undefined variable '{name}', using 0"
                )));
                0.0
            }
        }
    }

    fn operand_value(&mut self, operand: &Operand) -> Value {
        match operand {
            Operand::Number(n) => Value::Number(*n),
            Operand::Note(name) => Value::Note(name.clone()),
            Operand::Text(s) => Value::Text(s.clone()),
            // A bare name copies the variable if defined, otherwise it is
            // kept as plain text.
            Operand::Name(name) => match self.env.get(name).cloned() {
                Some(value) => value,
                None => Value::Text(name.clone()),
            },
            Operand::Expr(expr) => Value::Number(self.eval_expr(expr)),
        }
    }

    fn apply_assign(&mut self, name: &str, op: AssignOp, value: Value) {
        if op == AssignOp::Set {
            self.env.set(name.to_string(), value);
            return;
        }

        let current = self.number_of(name);
        let rhs = match value.as_number() {
            Some(v) => v,
            None => {
                self.diagnostics.push(Diagnostic::interpret(format!(
                    "non-numeric value in compound assignment to '{name}', skipped"
                )));
                return;
            }
        };

        let result = match op {
            AssignOp::Add => current + rhs,
            AssignOp::Sub => current - rhs,
            AssignOp::Mul => current * rhs,
            AssignOp::Div => {
                if rhs == 0.0 {
                    self.diagnostics.push(Diagnostic::interpret(format!(
                        "division by zero in assignment to '{name}', skipped"
                    )));
                    return;
                }
                current / rhs
            }
            AssignOp::Set => unreachable!(),
        };
        self.env.set(name.to_string(), Value::Number(result));
    }

    fn eval_expr(&mut self, expr: &Expr) -> f64 {
        match expr {
            Expr::Number(n) => *n,
            Expr::Note(name) => match parse_spn(name) {
                Some(p) => f64::from(p),
                None => {
                    self.diagnostics.push(Diagnostic::interpret(format!(
                        "note '{name}' out of range, using 0"
                    )));
                    0.0
                }
            },
            Expr::Variable(name) => self.number_of(name),
            Expr::Grouping(inner) => self.eval_expr(inner),
            Expr::Binary { left, op, right } => {
                let l = self.eval_expr(left);
                let r = self.eval_expr(right);
                match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => {
                        if r == 0.0 {
                            self.diagnostics.push(Diagnostic::interpret(
                                "division by zero, using 0".to_string(),
                            ));
                            0.0
                        } else {
                            l / r
                        }
                    }
                    BinaryOp::Lt => bool_num(l < r),
                    BinaryOp::Le => bool_num(l <= r),
                    BinaryOp::Gt => bool_num(l > r),
                    BinaryOp::Ge => bool_num(l >= r),
                    BinaryOp::Eq => bool_num(l == r),
                    BinaryOp::Ne => bool_num(l != r),
                }
            }
        }
    }
}

fn bool_num(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// General MIDI percussion keys for the drum constants.
fn drum_key(name: &str) -> Option<i32> {
    let key = match name {
        "KICK" => 36,
        "SNARE" => 38,
        "HIHAT_CLOSED" => 42,
        "HIHAT_PEDAL" => 44,
        "HIHAT_OPEN" => 46,
        "CRASH" => 49,
        "RIDE" => 51,
        _ => return None,
    };
    Some(key)
}

/// Dynamic markings to MIDI velocity.
fn volume_level(name: &str) -> Option<u8> {
    let level = match name {
        "ppp" => 16,
        "pp" => 32,
        "p" => 48,
        "mp" => 64,
        "mf" => 80,
        "f" => 96,
        "ff" => 112,
        "fff" => 127,
        _ => return None,
    };
    Some(level)
}
