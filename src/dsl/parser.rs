//! Recursive-descent parser with panic-mode recovery.
//!
//! One malformed statement never voids the rest of the file: track-level
//! errors resynchronize to the next track boundary, command-level errors to
//! the next command start, and malformed note calls substitute a placeholder
//! note so time bookkeeping stays intact.

use super::ast::*;
use super::error::{Diagnostic, ParseError};
use super::token::{Token, TokenKind};

type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Vec<Diagnostic>,
}

/// Result of a parse run: best-effort tracks plus everything that went wrong.
#[derive(Debug)]
pub struct ParseOutput {
    pub tracks: Vec<Track>,
    pub diagnostics: Vec<Diagnostic>,
    pub had_error: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Parse the token stream into tracks. Total: errors are collected and
    /// recovered from, never propagated to the caller.
    pub fn parse(mut self) -> ParseOutput {
        let mut tracks = Vec::new();

        while !self.is_at_end() {
            if self.peek().kind.is_track_keyword() {
                match self.track() {
                    Ok(track) => tracks.push(track),
                    Err(e) => {
                        self.diagnostics.push(e.into_diagnostic());
                        self.synchronize();
                    }
                }
            } else {
                let t = self.peek().clone();
                self.diagnostics.push(Diagnostic::parse(
                    format!("unexpected token '{}' outside a track", t.lexeme),
                    t.line,
                ));
                self.advance();
            }
        }

        let had_error = !self.diagnostics.is_empty();
        ParseOutput {
            tracks,
            diagnostics: self.diagnostics,
            had_error,
        }
    }

    fn track(&mut self) -> PResult<Track> {
        let kind = match self.advance().kind {
            TokenKind::PianoTrack => Instrument::Piano,
            TokenKind::GuitarTrack => Instrument::Guitar,
            TokenKind::BassTrack => Instrument::Bass,
            TokenKind::DrumTrack => Instrument::Drum,
            _ => unreachable!("caller checked for a track keyword"),
        };

        self.consume(TokenKind::LBrace, "expected '{' after track name")?;
        let commands = self.command_list();
        self.consume(TokenKind::RBrace, "expected '}' after track body")?;

        Ok(Track { kind, commands })
    }

    /// Parse commands until `}` or end of input, recovering per command.
    fn command_list(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            match self.command() {
                Ok(Some(cmd)) => commands.push(cmd),
                Ok(None) => {}
                Err(e) => {
                    self.diagnostics.push(e.into_diagnostic());
                    self.synchronize_command();
                }
            }
        }
        commands
    }

    /// `Ok(None)` means the command was malformed but ended at a `;` we could
    /// consume, so only that command is discarded.
    fn command(&mut self) -> PResult<Option<Command>> {
        match self.command_inner() {
            Ok(cmd) => Ok(Some(cmd)),
            Err(e) => {
                if self.match_kind(&TokenKind::Semicolon) {
                    self.diagnostics.push(e.into_diagnostic());
                    Ok(None)
                } else {
                    Err(e)
                }
            }
        }
    }

    fn command_inner(&mut self) -> PResult<Command> {
        if self.match_kind(&TokenKind::TimeSignature) {
            self.time_signature_command()
        } else if self.match_kind(&TokenKind::Tempo) {
            self.tempo_command()
        } else if self.match_kind(&TokenKind::Volume) {
            self.volume_command()
        } else if self.match_kind(&TokenKind::Piano) {
            Ok(self.note_command(Instrument::Piano))
        } else if self.match_kind(&TokenKind::Guitar) {
            Ok(self.note_command(Instrument::Guitar))
        } else if self.match_kind(&TokenKind::Bass) {
            Ok(self.note_command(Instrument::Bass))
        } else if self.match_kind(&TokenKind::Drum) {
            Ok(self.note_command(Instrument::Drum))
        } else if self.match_kind(&TokenKind::Pause) {
            self.pause_command()
        } else if self.match_kind(&TokenKind::Sync) {
            self.sync_block()
        } else if self.match_kind(&TokenKind::For) {
            self.for_loop()
        } else if let Some(name) = self.match_ident() {
            self.assignment(name)
        } else {
            let t = self.peek();
            Err(ParseError::new(
                format!("expected command, got '{}'", t.lexeme),
                t.line,
            ))
        }
    }

    fn time_signature_command(&mut self) -> PResult<Command> {
        self.consume(TokenKind::Equals, "expected '=' after TimeSignature")?;
        let numerator = self.consume_int("expected numerator value")?;
        self.consume(TokenKind::Slash, "expected '/' in time signature")?;
        let denominator = self.consume_int("expected denominator value")?;
        self.consume(TokenKind::Semicolon, "expected ';' after time signature")?;

        Ok(Command::TimeSignature {
            numerator: numerator.max(0) as u32,
            denominator: denominator.max(0) as u32,
        })
    }

    fn tempo_command(&mut self) -> PResult<Command> {
        self.consume(TokenKind::Equals, "expected '=' after Tempo")?;
        let value = self.consume_int("expected tempo value")?;
        self.consume(TokenKind::Semicolon, "expected ';' after tempo")?;

        Ok(Command::Tempo(value.max(0) as u32))
    }

    fn volume_command(&mut self) -> PResult<Command> {
        self.consume(TokenKind::Equals, "expected '=' after Volume")?;

        let value = if let Some(s) = self.match_str() {
            s
        } else if let Some(name) = self.match_ident() {
            name
        } else {
            let t = self.peek();
            return Err(ParseError::new("expected volume value", t.line));
        };

        self.consume(TokenKind::Semicolon, "expected ';' after volume")?;
        Ok(Command::Volume(value))
    }

    /// Note calls never fail outward: on a malformed call we resynchronize to
    /// the next `;` and substitute a placeholder note, keeping the track's
    /// time bookkeeping intact.
    fn note_command(&mut self, instrument: Instrument) -> Command {
        match self.note_call(instrument) {
            Ok(cmd) => cmd,
            Err(e) => {
                self.diagnostics.push(e.into_diagnostic());
                while !self.check(&TokenKind::Semicolon) && !self.is_at_end() {
                    self.advance();
                }
                self.match_kind(&TokenKind::Semicolon);
                placeholder_note(instrument)
            }
        }
    }

    fn note_call(&mut self, instrument: Instrument) -> PResult<Command> {
        self.consume(
            TokenKind::LParen,
            format!("expected '(' after {}", instrument.name()),
        )?;

        match instrument {
            Instrument::Piano => {
                let hand_name = self.consume_ident("expected hand position (L/R)")?;
                let hand = if hand_name == "L" { Hand::Left } else { Hand::Right };
                self.consume(TokenKind::Comma, "expected ',' after hand position")?;

                let note = if let Some(spn) = self.match_spn() {
                    NoteArg::Spn(spn)
                } else if let Some(name) = self.match_ident() {
                    NoteArg::Var(name)
                } else {
                    return Err(ParseError::new(
                        "expected note or variable",
                        self.peek().line,
                    ));
                };

                self.consume(TokenKind::Comma, "expected ',' after note")?;
                let duration = self.parse_duration()?;
                self.consume(TokenKind::RParen, "expected ')' after piano note")?;
                self.consume(TokenKind::Semicolon, "expected ';' after piano note command")?;

                Ok(Command::PianoNote {
                    hand,
                    note,
                    duration,
                })
            }
            Instrument::Guitar | Instrument::Bass => {
                let string = self.consume_int(format!(
                    "expected string number for {}",
                    instrument.name()
                ))?;
                self.consume(TokenKind::Comma, "expected ',' after string number")?;

                let fret = if let Some(n) = self.match_int() {
                    FretArg::Literal(n)
                } else if let Some(name) = self.match_ident() {
                    FretArg::Var(name)
                } else {
                    return Err(ParseError::new(
                        "expected fret number or variable",
                        self.peek().line,
                    ));
                };

                self.consume(TokenKind::Comma, "expected ',' after fret number")?;
                let duration = self.parse_duration()?;
                self.consume(
                    TokenKind::RParen,
                    format!("expected ')' after {} note", instrument.name()),
                )?;
                self.consume(
                    TokenKind::Semicolon,
                    format!("expected ';' after {} note command", instrument.name()),
                )?;

                let string = string.clamp(0, u8::MAX as i64) as u8;
                if instrument == Instrument::Guitar {
                    Ok(Command::GuitarNote {
                        string,
                        fret,
                        duration,
                    })
                } else {
                    Ok(Command::BassNote {
                        string,
                        fret,
                        duration,
                    })
                }
            }
            Instrument::Drum => {
                let drum = self
                    .match_drum_type()
                    .ok_or_else(|| ParseError::new("expected drum type", self.peek().line))?;
                self.consume(TokenKind::Comma, "expected ',' after drum type")?;
                let duration = self.parse_duration()?;
                self.consume(TokenKind::RParen, "expected ')' after drum note")?;
                self.consume(TokenKind::Semicolon, "expected ';' after drum note command")?;

                Ok(Command::DrumNote { drum, duration })
            }
        }
    }

    /// Duration: `n/d` fraction (evaluated eagerly), int, float, or an
    /// identifier resolved at interpretation time.
    fn parse_duration(&mut self) -> PResult<DurationExpr> {
        if matches!(self.peek().kind, TokenKind::Int(_))
            && matches!(self.peek_next().map(|t| &t.kind), Some(TokenKind::Slash))
        {
            let numerator = match self.advance().kind {
                TokenKind::Int(n) => n,
                _ => unreachable!(),
            };
            self.consume(TokenKind::Slash, "expected '/'")?;
            let denominator = self.consume_int("expected denominator")?;
            if denominator == 0 {
                return Err(ParseError::new(
                    "zero denominator in duration fraction",
                    self.previous().line,
                ));
            }
            return Ok(DurationExpr::Beats(numerator as f64 / denominator as f64));
        }

        if let Some(n) = self.match_int() {
            Ok(DurationExpr::Beats(n as f64))
        } else if let Some(f) = self.match_float() {
            Ok(DurationExpr::Beats(f))
        } else if let Some(name) = self.match_ident() {
            Ok(DurationExpr::Var(name))
        } else {
            Err(ParseError::new("expected duration", self.peek().line))
        }
    }

    fn pause_command(&mut self) -> PResult<Command> {
        self.consume(TokenKind::LParen, "expected '(' after Pause")?;
        let duration = self.parse_duration()?;
        self.consume(TokenKind::RParen, "expected ')' after pause duration")?;
        self.consume(TokenKind::Semicolon, "expected ';' after pause command")?;

        Ok(Command::Pause { duration })
    }

    fn sync_block(&mut self) -> PResult<Command> {
        self.consume(TokenKind::LBrace, "expected '{' after sync")?;
        let commands = self.command_list();
        self.consume(TokenKind::RBrace, "expected '}' after sync block")?;

        Ok(Command::Sync(commands))
    }

    fn for_loop(&mut self) -> PResult<Command> {
        self.consume(TokenKind::LParen, "expected '(' after 'for'")?;

        let var = self.consume_ident("expected variable name in for loop initialization")?;
        self.consume(TokenKind::Equals, "expected '=' after variable name")?;
        let init = self
            .single_operand()
            .ok_or_else(|| ParseError::new("expected expression after '='", self.peek().line))?;
        self.consume(TokenKind::Semicolon, "expected ';' after loop initialization")?;

        let condition = self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after loop condition")?;

        let incr_var = self.consume_ident("expected variable name in for loop increment")?;
        let (incr_op, incr_value) = self.increment_clause(&incr_var)?;

        self.consume(TokenKind::RParen, "expected ')' after for clauses")?;
        self.consume(TokenKind::LBrace, "expected '{' after for header")?;
        let body = self.command_list();
        self.consume(TokenKind::RBrace, "expected '}' after for body")?;

        Ok(Command::For(Box::new(ForLoop {
            var,
            init,
            condition,
            incr_var,
            incr_op,
            incr_value,
            body,
        })))
    }

    /// Increment clause after the loop variable. `++`/`--` normalize to
    /// `+= 1`/`-= 1`; `i = i + n` normalizes to `i += n`.
    fn increment_clause(&mut self, incr_var: &str) -> PResult<(AssignOp, Operand)> {
        if self.match_kind(&TokenKind::PlusPlus) {
            return Ok((AssignOp::Add, Operand::Number(1.0)));
        }
        if self.match_kind(&TokenKind::MinusMinus) {
            return Ok((AssignOp::Sub, Operand::Number(1.0)));
        }

        for (kind, op) in [
            (TokenKind::PlusEqual, AssignOp::Add),
            (TokenKind::MinusEqual, AssignOp::Sub),
            (TokenKind::StarEqual, AssignOp::Mul),
            (TokenKind::SlashEqual, AssignOp::Div),
        ] {
            if self.match_kind(&kind) {
                let value = self.number_or_name_operand().ok_or_else(|| {
                    ParseError::new("expected expression after operator", self.peek().line)
                })?;
                return Ok((op, value));
            }
        }

        if self.match_kind(&TokenKind::Equals) {
            if let Some(name) = self.match_ident() {
                if name == incr_var {
                    // i = i + n, rewritten to the compound form
                    let op = if self.match_kind(&TokenKind::Plus) {
                        AssignOp::Add
                    } else if self.match_kind(&TokenKind::Minus) {
                        AssignOp::Sub
                    } else if self.match_kind(&TokenKind::Star) {
                        AssignOp::Mul
                    } else if self.match_kind(&TokenKind::Slash) {
                        AssignOp::Div
                    } else {
                        return Err(ParseError::new(
                            "expected operator after variable",
                            self.peek().line,
                        ));
                    };
                    let value = self.number_operand().ok_or_else(|| {
                        ParseError::new("expected literal after operator", self.peek().line)
                    })?;
                    return Ok((op, value));
                }
                return Ok((AssignOp::Set, Operand::Name(name)));
            }
            let value = self.number_operand().ok_or_else(|| {
                ParseError::new("expected expression after '='", self.peek().line)
            })?;
            return Ok((AssignOp::Set, value));
        }

        Err(ParseError::new(
            "expected increment operator",
            self.peek().line,
        ))
    }

    fn assignment(&mut self, name: String) -> PResult<Command> {
        let op = if self.match_kind(&TokenKind::Equals) {
            AssignOp::Set
        } else if self.match_kind(&TokenKind::PlusEqual) {
            AssignOp::Add
        } else if self.match_kind(&TokenKind::MinusEqual) {
            AssignOp::Sub
        } else if self.match_kind(&TokenKind::StarEqual) {
            AssignOp::Mul
        } else if self.match_kind(&TokenKind::SlashEqual) {
            AssignOp::Div
        } else {
            return Err(ParseError::new(
                "expected assignment operator",
                self.peek().line,
            ));
        };

        // Single-token values keep their kind (a bare identifier may be a
        // plain word, not a variable); anything longer is an expression.
        let checkpoint = self.current;
        let value = match self.single_operand() {
            Some(v) if self.check(&TokenKind::Semicolon) => v,
            _ => {
                self.current = checkpoint;
                Operand::Expr(self.expression()?)
            }
        };

        self.consume(TokenKind::Semicolon, "expected ';' after assignment")?;
        Ok(Command::Assign { name, op, value })
    }

    // Expression grammar: comparison/additive loosest, multiplicative
    // tighter, then literals/variables/groups.

    fn expression(&mut self) -> PResult<Expr> {
        let mut left = self.term()?;

        loop {
            let op = if self.match_kind(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.match_kind(&TokenKind::Minus) {
                BinaryOp::Sub
            } else if self.match_kind(&TokenKind::Less) {
                BinaryOp::Lt
            } else if self.match_kind(&TokenKind::LessEqual) {
                BinaryOp::Le
            } else if self.match_kind(&TokenKind::Greater) {
                BinaryOp::Gt
            } else if self.match_kind(&TokenKind::GreaterEqual) {
                BinaryOp::Ge
            } else if self.match_kind(&TokenKind::EqualEqual) {
                BinaryOp::Eq
            } else if self.match_kind(&TokenKind::NotEqual) {
                BinaryOp::Ne
            } else {
                break;
            };
            let right = self.term()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut left = self.factor()?;

        loop {
            let op = if self.match_kind(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.match_kind(&TokenKind::Slash) {
                BinaryOp::Div
            } else {
                break;
            };
            let right = self.factor()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn factor(&mut self) -> PResult<Expr> {
        if let Some(n) = self.match_int() {
            Ok(Expr::Number(n as f64))
        } else if let Some(f) = self.match_float() {
            Ok(Expr::Number(f))
        } else if let Some(spn) = self.match_spn() {
            Ok(Expr::Note(spn))
        } else if let Some(name) = self.match_ident() {
            Ok(Expr::Variable(name))
        } else if self.match_kind(&TokenKind::LParen) {
            let expr = self.expression()?;
            self.consume(TokenKind::RParen, "expected ')' after expression")?;
            Ok(Expr::Grouping(Box::new(expr)))
        } else {
            Err(ParseError::new("expected expression", self.peek().line))
        }
    }

    // Operand helpers.

    fn single_operand(&mut self) -> Option<Operand> {
        if let Some(n) = self.match_int() {
            Some(Operand::Number(n as f64))
        } else if let Some(f) = self.match_float() {
            Some(Operand::Number(f))
        } else if let Some(spn) = self.match_spn() {
            Some(Operand::Note(spn))
        } else if let Some(s) = self.match_str() {
            Some(Operand::Text(s))
        } else {
            self.match_ident().map(Operand::Name)
        }
    }

    fn number_operand(&mut self) -> Option<Operand> {
        if let Some(n) = self.match_int() {
            Some(Operand::Number(n as f64))
        } else {
            self.match_float().map(Operand::Number)
        }
    }

    fn number_or_name_operand(&mut self) -> Option<Operand> {
        self.number_operand()
            .or_else(|| self.match_ident().map(Operand::Name))
    }

    // Recovery.

    /// Track-level recovery: skip to the next `;`, track keyword, or `}`.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            if self.peek().kind.is_track_keyword() || self.peek().kind == TokenKind::RBrace {
                return;
            }
            self.advance();
        }
    }

    /// Command-level recovery: skip to the next `;`, command start, or `}`.
    fn synchronize_command(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            if self.peek().kind.starts_command() || self.peek().kind == TokenKind::RBrace {
                return;
            }
            self.advance();
        }
    }

    // Token-stream primitives.

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_int(&mut self) -> Option<i64> {
        match self.peek().kind {
            TokenKind::Int(n) => {
                self.advance();
                Some(n)
            }
            _ => None,
        }
    }

    fn match_float(&mut self) -> Option<f64> {
        match self.peek().kind {
            TokenKind::Float(f) => {
                self.advance();
                Some(f)
            }
            _ => None,
        }
    }

    fn match_ident(&mut self) -> Option<String> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    fn match_spn(&mut self) -> Option<String> {
        match &self.peek().kind {
            TokenKind::SpnNote(s) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => None,
        }
    }

    fn match_str(&mut self) -> Option<String> {
        match &self.peek().kind {
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => None,
        }
    }

    fn match_drum_type(&mut self) -> Option<String> {
        match &self.peek().kind {
            TokenKind::DrumType(s) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => None,
        }
    }

    fn consume(&mut self, kind: TokenKind, message: impl Into<String>) -> PResult<&Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(message, self.peek().line))
        }
    }

    fn consume_int(&mut self, message: impl Into<String>) -> PResult<i64> {
        let line = self.peek().line;
        self.match_int().ok_or_else(|| ParseError::new(message, line))
    }

    fn consume_ident(&mut self, message: impl Into<String>) -> PResult<String> {
        let line = self.peek().line;
        self.match_ident()
            .ok_or_else(|| ParseError::new(message, line))
    }

    fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && &self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1)
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
}

/// Fixed default note substituted for a malformed call: middle C / open
/// string / kick, one beat.
fn placeholder_note(instrument: Instrument) -> Command {
    match instrument {
        Instrument::Piano => Command::PianoNote {
            hand: Hand::Right,
            note: NoteArg::Spn("C4".to_string()),
            duration: DurationExpr::Beats(1.0),
        },
        Instrument::Guitar => Command::GuitarNote {
            string: 1,
            fret: FretArg::Literal(0),
            duration: DurationExpr::Beats(1.0),
        },
        Instrument::Bass => Command::BassNote {
            string: 1,
            fret: FretArg::Literal(0),
            duration: DurationExpr::Beats(1.0),
        },
        Instrument::Drum => Command::DrumNote {
            drum: "KICK".to_string(),
            duration: DurationExpr::Beats(1.0),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::Lexer;
    use super::*;

    fn parse(src: &str) -> ParseOutput {
        let (tokens, lex_diags) = Lexer::new(src).tokenize();
        assert!(lex_diags.is_empty(), "lex diagnostics: {lex_diags:?}");
        Parser::new(tokens).parse()
    }

    fn parse_clean(src: &str) -> Vec<Track> {
        let out = parse(src);
        assert!(!out.had_error, "diagnostics: {:?}", out.diagnostics);
        out.tracks
    }

    #[test]
    fn empty_source() {
        let tracks = parse_clean("");
        assert!(tracks.is_empty());
    }

    #[test]
    fn piano_track_with_settings_and_note() {
        let tracks = parse_clean(
            "PianoTrack {\n  TimeSignature=4/4;\n  Tempo=120;\n  Volume=mf;\n  Piano(R, C4, 1/4);\n}",
        );
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].kind, Instrument::Piano);
        assert_eq!(tracks[0].commands.len(), 4);

        assert_eq!(
            tracks[0].commands[0],
            Command::TimeSignature {
                numerator: 4,
                denominator: 4
            }
        );
        assert_eq!(tracks[0].commands[1], Command::Tempo(120));
        assert_eq!(tracks[0].commands[2], Command::Volume("mf".to_string()));
        assert_eq!(
            tracks[0].commands[3],
            Command::PianoNote {
                hand: Hand::Right,
                note: NoteArg::Spn("C4".to_string()),
                duration: DurationExpr::Beats(0.25),
            }
        );
    }

    #[test]
    fn volume_accepts_string_literal() {
        let tracks = parse_clean("PianoTrack { Volume=\"ff\"; }");
        assert_eq!(tracks[0].commands[0], Command::Volume("ff".to_string()));
    }

    #[test]
    fn guitar_and_bass_calls() {
        let tracks = parse_clean(
            "GuitarTrack { Guitar(1, 0, 1); }\nBassTrack { Bass(2, fretvar, 0.5); }",
        );
        assert_eq!(
            tracks[0].commands[0],
            Command::GuitarNote {
                string: 1,
                fret: FretArg::Literal(0),
                duration: DurationExpr::Beats(1.0),
            }
        );
        assert_eq!(
            tracks[1].commands[0],
            Command::BassNote {
                string: 2,
                fret: FretArg::Var("fretvar".to_string()),
                duration: DurationExpr::Beats(0.5),
            }
        );
    }

    #[test]
    fn drum_call_and_pause() {
        let tracks = parse_clean("DrumTrack { Drum(SNARE, 1/2); Pause(1/4); }");
        assert_eq!(
            tracks[0].commands[0],
            Command::DrumNote {
                drum: "SNARE".to_string(),
                duration: DurationExpr::Beats(0.5),
            }
        );
        assert_eq!(
            tracks[0].commands[1],
            Command::Pause {
                duration: DurationExpr::Beats(0.25)
            }
        );
    }

    #[test]
    fn duration_forms() {
        let tracks = parse_clean(
            "PianoTrack { Piano(R, C4, 2); Piano(R, C4, 0.5); Piano(R, C4, len); Piano(R, C4, 3/8); }",
        );
        let durations: Vec<_> = tracks[0]
            .commands
            .iter()
            .map(|c| match c {
                Command::PianoNote { duration, .. } => duration.clone(),
                other => panic!("expected piano note, got {other:?}"),
            })
            .collect();
        assert_eq!(durations[0], DurationExpr::Beats(2.0));
        assert_eq!(durations[1], DurationExpr::Beats(0.5));
        assert_eq!(durations[2], DurationExpr::Var("len".to_string()));
        assert_eq!(durations[3], DurationExpr::Beats(0.375));
    }

    #[test]
    fn sync_block_collects_members() {
        let tracks =
            parse_clean("PianoTrack { sync { Piano(R, C4, 1); Piano(R, E4, 1); } }");
        match &tracks[0].commands[0] {
            Command::Sync(members) => assert_eq!(members.len(), 2),
            other => panic!("expected sync block, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_plus_plus() {
        let tracks = parse_clean(
            "PianoTrack { for(i = 0; i < 4; i++) { Piano(R, C4, 1); } }",
        );
        match &tracks[0].commands[0] {
            Command::For(f) => {
                assert_eq!(f.var, "i");
                assert_eq!(f.init, Operand::Number(0.0));
                assert_eq!(f.incr_op, AssignOp::Add);
                assert_eq!(f.incr_value, Operand::Number(1.0));
                assert_eq!(f.body.len(), 1);
            }
            other => panic!("expected for loop, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_i_equals_i_plus_n_normalized() {
        let tracks = parse_clean(
            "PianoTrack { for(i = 0; i < 8; i = i + 2) { Pause(1); } }",
        );
        match &tracks[0].commands[0] {
            Command::For(f) => {
                assert_eq!(f.incr_op, AssignOp::Add);
                assert_eq!(f.incr_value, Operand::Number(2.0));
            }
            other => panic!("expected for loop, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_note_bounds() {
        let tracks = parse_clean(
            "PianoTrack { for(note = C4; note < G4; note += 1) { Piano(R, note, 1/4); } }",
        );
        match &tracks[0].commands[0] {
            Command::For(f) => {
                assert_eq!(f.init, Operand::Note("C4".to_string()));
                assert_eq!(
                    f.condition,
                    Expr::Binary {
                        left: Box::new(Expr::Variable("note".to_string())),
                        op: BinaryOp::Lt,
                        right: Box::new(Expr::Note("G4".to_string())),
                    }
                );
            }
            other => panic!("expected for loop, got {other:?}"),
        }
    }

    #[test]
    fn assignment_forms() {
        let tracks = parse_clean(
            "PianoTrack { x = 3; y = C4; z = x; w += 2; v = x + 1; }",
        );
        let cmds = &tracks[0].commands;
        assert_eq!(
            cmds[0],
            Command::Assign {
                name: "x".to_string(),
                op: AssignOp::Set,
                value: Operand::Number(3.0)
            }
        );
        assert_eq!(
            cmds[1],
            Command::Assign {
                name: "y".to_string(),
                op: AssignOp::Set,
                value: Operand::Note("C4".to_string())
            }
        );
        assert_eq!(
            cmds[2],
            Command::Assign {
                name: "z".to_string(),
                op: AssignOp::Set,
                value: Operand::Name("x".to_string())
            }
        );
        assert_eq!(
            cmds[3],
            Command::Assign {
                name: "w".to_string(),
                op: AssignOp::Add,
                value: Operand::Number(2.0)
            }
        );
        match &cmds[4] {
            Command::Assign {
                value: Operand::Expr(Expr::Binary { op, .. }),
                ..
            } => assert_eq!(*op, BinaryOp::Add),
            other => panic!("expected expression assignment, got {other:?}"),
        }
    }

    #[test]
    fn expression_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let tracks = parse_clean("PianoTrack { x = 1 + 2 * 3; }");
        match &tracks[0].commands[0] {
            Command::Assign {
                value: Operand::Expr(Expr::Binary { left, op, right }),
                ..
            } => {
                assert_eq!(*op, BinaryOp::Add);
                assert_eq!(**left, Expr::Number(1.0));
                assert!(matches!(
                    **right,
                    Expr::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    #[test]
    fn grouping_expression() {
        let tracks = parse_clean("PianoTrack { x = (1 + 2) * 3; }");
        match &tracks[0].commands[0] {
            Command::Assign {
                value: Operand::Expr(Expr::Binary { left, op, .. }),
                ..
            } => {
                assert_eq!(*op, BinaryOp::Mul);
                assert!(matches!(**left, Expr::Grouping(_)));
            }
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    #[test]
    fn malformed_note_call_substitutes_placeholder() {
        // Piano(R) is missing arguments; the placeholder keeps the slot and
        // the following statement still parses.
        let out = parse("PianoTrack { Piano(R); Piano(L, E4, 1/4); }");
        assert!(out.had_error);
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].commands.len(), 2);
        assert_eq!(
            out.tracks[0].commands[0],
            Command::PianoNote {
                hand: Hand::Right,
                note: NoteArg::Spn("C4".to_string()),
                duration: DurationExpr::Beats(1.0),
            }
        );
        assert_eq!(
            out.tracks[0].commands[1],
            Command::PianoNote {
                hand: Hand::Left,
                note: NoteArg::Spn("E4".to_string()),
                duration: DurationExpr::Beats(0.25),
            }
        );
    }

    #[test]
    fn malformed_drum_call_placeholder_is_kick() {
        let out = parse("DrumTrack { Drum(BONGO, 1); Drum(KICK, 1); }");
        assert!(out.had_error);
        assert_eq!(out.tracks[0].commands.len(), 2);
        assert_eq!(
            out.tracks[0].commands[0],
            Command::DrumNote {
                drum: "KICK".to_string(),
                duration: DurationExpr::Beats(1.0),
            }
        );
    }

    #[test]
    fn bad_setting_recovers_to_next_command() {
        let out = parse("PianoTrack { Tempo=; Piano(R, C4, 1); }");
        assert!(out.had_error);
        assert_eq!(out.tracks.len(), 1);
        // Tempo command dropped, note survives
        assert_eq!(out.tracks[0].commands.len(), 1);
        assert!(matches!(
            out.tracks[0].commands[0],
            Command::PianoNote { .. }
        ));
    }

    #[test]
    fn stray_tokens_outside_tracks_are_skipped() {
        let out = parse("42 PianoTrack { Tempo=90; }");
        assert!(out.had_error);
        assert_eq!(out.tracks.len(), 1);
        assert_eq!(out.tracks[0].commands[0], Command::Tempo(90));
    }

    #[test]
    fn second_track_survives_first_track_error() {
        let out = parse("GuitarTrack { Guitar(; }\nBassTrack { Bass(1, 0, 1); }");
        assert!(out.had_error);
        let bass: Vec<_> = out
            .tracks
            .iter()
            .filter(|t| t.kind == Instrument::Bass)
            .collect();
        assert_eq!(bass.len(), 1);
        assert_eq!(bass[0].commands.len(), 1);
    }

    #[test]
    fn had_error_clear_on_valid_input() {
        let out = parse("DrumTrack { Drum(KICK, 1); }");
        assert!(!out.had_error);
        assert!(out.diagnostics.is_empty());
    }
}
