//! Token types for the score language lexer.

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
        }
    }
}

/// The kind of token. Literal payloads live directly on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Track keywords
    PianoTrack,
    GuitarTrack,
    BassTrack,
    DrumTrack,

    // Setting keywords
    TimeSignature,
    Tempo,
    Volume,

    // Instrument / control keywords
    Piano,
    Guitar,
    Bass,
    Drum,
    Pause,
    Sync,
    For,

    // Literals
    SpnNote(String),
    DrumType(String),
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Operators
    Equals,
    Plus,
    Minus,
    Star,
    Slash,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    NotEqual,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PlusPlus,
    MinusMinus,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,

    // End of input
    Eof,
}

impl TokenKind {
    /// Whether this kind starts a track definition.
    pub fn is_track_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::PianoTrack
                | TokenKind::GuitarTrack
                | TokenKind::BassTrack
                | TokenKind::DrumTrack
        )
    }

    /// Whether this kind can start a command inside a track body.
    pub fn starts_command(&self) -> bool {
        matches!(
            self,
            TokenKind::TimeSignature
                | TokenKind::Tempo
                | TokenKind::Volume
                | TokenKind::Piano
                | TokenKind::Guitar
                | TokenKind::Bass
                | TokenKind::Drum
                | TokenKind::Pause
                | TokenKind::Sync
                | TokenKind::For
                | TokenKind::Ident(_)
        )
    }
}
