//! Diagnostics for the score compiler.
//!
//! Every stage is total: problems are collected as [`Diagnostic`]s and the
//! stage keeps going with a documented default. The parser additionally uses
//! [`ParseError`] internally to drive panic-mode recovery; those errors never
//! escape `Parser::parse`.

use std::fmt;

/// The pipeline stage a diagnostic originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lex,
    Parse,
    Interpret,
    Midi,
    Synth,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::Interpret => "interpret",
            Stage::Midi => "midi",
            Stage::Synth => "synth",
        };
        f.write_str(name)
    }
}

/// A non-fatal warning or error with a source line number.
///
/// Line 0 means the diagnostic is not tied to a source location (e.g. a
/// codegen problem discovered after interpretation).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
    pub line: usize,
}

impl Diagnostic {
    pub fn lex(message: impl Into<String>, line: usize) -> Self {
        Self {
            stage: Stage::Lex,
            message: message.into(),
            line,
        }
    }

    pub fn parse(message: impl Into<String>, line: usize) -> Self {
        Self {
            stage: Stage::Parse,
            message: message.into(),
            line,
        }
    }

    pub fn interpret(message: impl Into<String>) -> Self {
        Self {
            stage: Stage::Interpret,
            message: message.into(),
            line: 0,
        }
    }

    pub fn midi(message: impl Into<String>) -> Self {
        Self {
            stage: Stage::Midi,
            message: message.into(),
            line: 0,
        }
    }

    pub fn synth(message: impl Into<String>) -> Self {
        Self {
            stage: Stage::Synth,
            message: message.into(),
            line: 0,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "[{}] line {}: {}", self.stage, self.line, self.message)
        } else {
            write!(f, "[{}] {}", self.stage, self.message)
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Internal parser error carrying the line the parser gave up on.
///
/// Converted into a [`Diagnostic`] at the recovery point.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::parse(self.message, self.line)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}
