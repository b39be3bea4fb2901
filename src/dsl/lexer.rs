//! Lexer for the score language.
//!
//! Converts source text into a flat [`Token`] stream. Tokenization is total:
//! unrecognized characters and unterminated strings become [`Diagnostic`]s
//! and scanning continues, so the stream always ends with `Eof`.

use super::error::Diagnostic;
use super::note::spn_length;
use super::token::{Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    start: usize,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            start: 0,
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Scan the whole source. Never fails; problems land in the diagnostics.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while !self.is_at_end() {
            self.start = self.pos;
            self.scan_token();
        }
        self.tokens.push(Token::new(TokenKind::Eof, "", self.line));
        (self.tokens, self.diagnostics)
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add(TokenKind::LParen),
            ')' => self.add(TokenKind::RParen),
            '{' => self.add(TokenKind::LBrace),
            '}' => self.add(TokenKind::RBrace),
            ',' => self.add(TokenKind::Comma),
            ';' => self.add(TokenKind::Semicolon),
            '+' => {
                if self.match_next('+') {
                    self.add(TokenKind::PlusPlus);
                } else if self.match_next('=') {
                    self.add(TokenKind::PlusEqual);
                } else {
                    self.add(TokenKind::Plus);
                }
            }
            '-' => {
                if self.match_next('-') {
                    self.add(TokenKind::MinusMinus);
                } else if self.match_next('=') {
                    self.add(TokenKind::MinusEqual);
                } else {
                    self.add(TokenKind::Minus);
                }
            }
            '*' => {
                if self.match_next('=') {
                    self.add(TokenKind::StarEqual);
                } else {
                    self.add(TokenKind::Star);
                }
            }
            '/' => {
                if self.match_next('=') {
                    self.add(TokenKind::SlashEqual);
                } else if self.match_next('/') {
                    // Line comment, discarded.
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add(TokenKind::Slash);
                }
            }
            '=' => {
                if self.match_next('=') {
                    self.add(TokenKind::EqualEqual);
                } else {
                    self.add(TokenKind::Equals);
                }
            }
            '<' => {
                if self.match_next('=') {
                    self.add(TokenKind::LessEqual);
                } else {
                    self.add(TokenKind::Less);
                }
            }
            '>' => {
                if self.match_next('=') {
                    self.add(TokenKind::GreaterEqual);
                } else {
                    self.add(TokenKind::Greater);
                }
            }
            '!' => {
                if self.match_next('=') {
                    self.add(TokenKind::NotEqual);
                } else {
                    self.diagnostics
                        .push(Diagnostic::lex("unexpected character: '!'", self.line));
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.string(),
            '0'..='9' => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            other => {
                self.diagnostics.push(Diagnostic::lex(
                    format!("unexpected character: '{other}'"),
                    self.line,
                ));
            }
        }
    }

    fn string(&mut self) {
        let open_line = self.line;
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.diagnostics
                .push(Diagnostic::lex("unterminated string", open_line));
            return;
        }

        self.advance(); // closing quote

        let value: String = self.chars[self.start + 1..self.pos - 1].iter().collect();
        self.add(TokenKind::Str(value));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Only consume '.' as a fraction point when a digit follows, so that
        // `4/4` style fractions stay three separate tokens for the parser.
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
            let text = self.lexeme();
            match text.parse::<f64>() {
                Ok(v) => self.add(TokenKind::Float(v)),
                Err(_) => self
                    .diagnostics
                    .push(Diagnostic::lex(format!("invalid number: {text}"), self.line)),
            }
        } else {
            let text = self.lexeme();
            match text.parse::<i64>() {
                Ok(v) => self.add(TokenKind::Int(v)),
                Err(_) => self
                    .diagnostics
                    .push(Diagnostic::lex(format!("invalid number: {text}"), self.line)),
            }
        }
    }

    fn identifier(&mut self) {
        // Scientific-pitch-note first: `A4` must not be swallowed by the
        // maximal-identifier rule. The match only wins when it is not the
        // prefix of a longer identifier (`C4x` stays an identifier).
        if let Some(len) = spn_length(&self.chars, self.start) {
            let follows = self.chars.get(self.start + len);
            let is_prefix = matches!(follows, Some(c) if c.is_ascii_alphanumeric() || *c == '_');
            if !is_prefix {
                self.pos = self.start + len;
                let text = self.lexeme();
                self.add(TokenKind::SpnNote(text));
                return;
            }
        }

        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = self.lexeme();
        let kind = keyword_kind(&text).unwrap_or(TokenKind::Ident(text));
        self.add(kind);
    }

    fn lexeme(&self) -> String {
        self.chars[self.start..self.pos].iter().collect()
    }

    fn add(&mut self, kind: TokenKind) {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(kind, lexeme, self.line));
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.pos];
        self.pos += 1;
        c
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.pos] != expected {
            return false;
        }
        self.pos += 1;
        true
    }

    fn peek(&self) -> char {
        self.chars.get(self.pos).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.pos + 1).copied().unwrap_or('\0')
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

/// Fixed keyword table. Hand positions `L`/`R` fall through to identifiers.
fn keyword_kind(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "PianoTrack" => TokenKind::PianoTrack,
        "GuitarTrack" => TokenKind::GuitarTrack,
        "BassTrack" => TokenKind::BassTrack,
        "DrumTrack" => TokenKind::DrumTrack,
        "TimeSignature" => TokenKind::TimeSignature,
        "Tempo" => TokenKind::Tempo,
        "Volume" => TokenKind::Volume,
        "Piano" => TokenKind::Piano,
        "Guitar" => TokenKind::Guitar,
        "Bass" => TokenKind::Bass,
        "Drum" => TokenKind::Drum,
        "Pause" => TokenKind::Pause,
        "sync" => TokenKind::Sync,
        "for" => TokenKind::For,
        "KICK" | "SNARE" | "HIHAT_CLOSED" | "HIHAT_OPEN" | "HIHAT_PEDAL" | "RIDE" | "CRASH" => {
            TokenKind::DrumType(text.to_string())
        }
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = Lexer::new(src).tokenize();
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input_yields_eof() {
        let kinds = lex("");
        assert_eq!(kinds, vec![TokenKind::Eof]);
    }

    #[test]
    fn track_keywords() {
        let kinds = lex("PianoTrack GuitarTrack BassTrack DrumTrack");
        assert_eq!(kinds[0], TokenKind::PianoTrack);
        assert_eq!(kinds[1], TokenKind::GuitarTrack);
        assert_eq!(kinds[2], TokenKind::BassTrack);
        assert_eq!(kinds[3], TokenKind::DrumTrack);
    }

    #[test]
    fn setting_and_control_keywords() {
        let kinds = lex("TimeSignature Tempo Volume Pause sync for");
        assert_eq!(
            kinds[..6],
            [
                TokenKind::TimeSignature,
                TokenKind::Tempo,
                TokenKind::Volume,
                TokenKind::Pause,
                TokenKind::Sync,
                TokenKind::For
            ]
        );
    }

    #[test]
    fn spn_note_beats_identifier() {
        let kinds = lex("C4 A4 Bb3 F#5");
        assert_eq!(kinds[0], TokenKind::SpnNote("C4".into()));
        assert_eq!(kinds[1], TokenKind::SpnNote("A4".into()));
        assert_eq!(kinds[2], TokenKind::SpnNote("Bb3".into()));
        assert_eq!(kinds[3], TokenKind::SpnNote("F#5".into()));
    }

    #[test]
    fn spn_prefix_of_longer_identifier_stays_identifier() {
        let kinds = lex("C4x Ab2_tail");
        assert_eq!(kinds[0], TokenKind::Ident("C4x".into()));
        assert_eq!(kinds[1], TokenKind::Ident("Ab2_tail".into()));
    }

    #[test]
    fn drum_type_constants() {
        let kinds = lex("KICK SNARE HIHAT_CLOSED RIDE");
        assert_eq!(kinds[0], TokenKind::DrumType("KICK".into()));
        assert_eq!(kinds[1], TokenKind::DrumType("SNARE".into()));
        assert_eq!(kinds[2], TokenKind::DrumType("HIHAT_CLOSED".into()));
        assert_eq!(kinds[3], TokenKind::DrumType("RIDE".into()));
    }

    #[test]
    fn hand_positions_are_identifiers() {
        let kinds = lex("L R");
        assert_eq!(kinds[0], TokenKind::Ident("L".into()));
        assert_eq!(kinds[1], TokenKind::Ident("R".into()));
    }

    #[test]
    fn compound_operators() {
        let kinds = lex("+ ++ += - -- -= * *= / /= = == < <= > >= !=");
        assert_eq!(
            kinds[..17],
            [
                TokenKind::Plus,
                TokenKind::PlusPlus,
                TokenKind::PlusEqual,
                TokenKind::Minus,
                TokenKind::MinusMinus,
                TokenKind::MinusEqual,
                TokenKind::Star,
                TokenKind::StarEqual,
                TokenKind::Slash,
                TokenKind::SlashEqual,
                TokenKind::Equals,
                TokenKind::EqualEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::NotEqual
            ]
        );
    }

    #[test]
    fn fraction_stays_three_tokens() {
        let kinds = lex("1/4");
        assert_eq!(
            kinds[..3],
            [TokenKind::Int(1), TokenKind::Slash, TokenKind::Int(4)]
        );
    }

    #[test]
    fn float_requires_digit_after_dot() {
        let kinds = lex("2.5");
        assert_eq!(kinds[0], TokenKind::Float(2.5));
    }

    #[test]
    fn int_literal() {
        let kinds = lex("120");
        assert_eq!(kinds[0], TokenKind::Int(120));
    }

    #[test]
    fn comment_discarded_to_end_of_line() {
        let kinds = lex("Tempo // set the pace\n120");
        assert_eq!(kinds[0], TokenKind::Tempo);
        assert_eq!(kinds[1], TokenKind::Int(120));
    }

    #[test]
    fn line_tracking() {
        let (tokens, _) = Lexer::new("Tempo\nVolume\n\nPause").tokenize();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 4);
    }

    #[test]
    fn string_literal() {
        let kinds = lex("\"mf\"");
        assert_eq!(kinds[0], TokenKind::Str("mf".into()));
    }

    #[test]
    fn string_with_embedded_newline_tracks_line() {
        let (tokens, diagnostics) = Lexer::new("\"a\nb\" Tempo").tokenize();
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::Str("a\nb".into()));
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string_reported_not_fatal() {
        let (tokens, diagnostics) = Lexer::new("\"oops").tokenize();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("unterminated"));
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn unexpected_character_skipped() {
        let (tokens, diagnostics) = Lexer::new("Tempo @ 120").tokenize();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains('@'));
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(kinds[0], TokenKind::Tempo);
        assert_eq!(kinds[1], TokenKind::Int(120));
    }

    #[test]
    fn bare_bang_reported() {
        let (_, diagnostics) = Lexer::new("!").tokenize();
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn realistic_note_call() {
        let kinds = lex("Piano(R, C4, 1/4);");
        assert_eq!(
            kinds[..9],
            [
                TokenKind::Piano,
                TokenKind::LParen,
                TokenKind::Ident("R".into()),
                TokenKind::Comma,
                TokenKind::SpnNote("C4".into()),
                TokenKind::Comma,
                TokenKind::Int(1),
                TokenKind::Slash,
                TokenKind::Int(4)
            ]
        );
        assert_eq!(kinds[9], TokenKind::RParen);
        assert_eq!(kinds[10], TokenKind::Semicolon);
    }
}
