//! Score language front end — source text → token stream → AST.
//!
//! Every stage is total: lexer and parser collect [`Diagnostic`]s and keep
//! going, so callers always get a best-effort AST plus everything that went
//! wrong, in source order.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod note;
pub mod parser;
pub mod token;

pub use ast::*;
pub use error::{Diagnostic, Stage};
pub use parser::ParseOutput;

use lexer::Lexer;
use parser::Parser;

/// The score compiler front end.
///
/// Runs lexer → parser and merges their diagnostics (lex first).
pub struct Compiler;

impl Compiler {
    /// Parse source into tracks. Never fails; malformed input yields fewer
    /// tracks/commands and a non-empty diagnostics list.
    pub fn parse(source: &str) -> ParseOutput {
        let (tokens, lex_diagnostics) = Lexer::new(source).tokenize();
        let mut output = Parser::new(tokens).parse();

        if !lex_diagnostics.is_empty() {
            output.had_error = true;
            let parse_diagnostics = std::mem::take(&mut output.diagnostics);
            output.diagnostics = lex_diagnostics;
            output.diagnostics.extend(parse_diagnostics);
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_merges_lexer_diagnostics_first() {
        let out = Compiler::parse("PianoTrack { @ Piano(R, C4, 1); }");
        assert!(out.had_error);
        assert_eq!(out.diagnostics[0].stage, Stage::Lex);
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].commands.len(), 1);
    }

    #[test]
    fn parse_clean_source() {
        let out = Compiler::parse("DrumTrack { Tempo=100; Drum(KICK, 1); }");
        assert!(!out.had_error);
        assert_eq!(out.tracks.len(), 1);
    }
}
