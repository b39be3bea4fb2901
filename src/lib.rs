//! partita — a compiler for a small multi-instrument score language.
//!
//! Source text flows through four stages: lexer → recursive-descent parser
//! with panic-mode recovery → tree-walking interpreter → two independent
//! back ends, a Standard MIDI File emitter and an additive-synthesis WAV
//! renderer. Every stage is total: malformed input produces diagnostics and
//! a best-effort artifact, never an aborted run.

pub mod config;
pub mod dsl;
pub mod event;
pub mod interp;
pub mod midi;
pub mod synth;

pub use config::RenderConfig;
pub use dsl::error::{Diagnostic, Stage};
pub use event::Score;

/// Front-end plus interpreter output: the timed score, all diagnostics in
/// pipeline order, and whether the parse itself had errors.
#[derive(Debug)]
pub struct CompileOutput {
    pub score: Score,
    pub diagnostics: Vec<Diagnostic>,
    pub had_parse_error: bool,
}

/// Compile source text to a timed score. Never fails; inspect
/// [`CompileOutput::diagnostics`] for problems.
pub fn compile(source: &str) -> CompileOutput {
    let parsed = dsl::Compiler::parse(source);
    let (score, mut interp_diagnostics) = interp::interpret(&parsed.tracks);

    let mut diagnostics = parsed.diagnostics;
    diagnostics.append(&mut interp_diagnostics);

    CompileOutput {
        score,
        diagnostics,
        had_parse_error: parsed.had_error,
    }
}
