//! Abstract syntax tree for the score language.
//!
//! Two node families: [`Expr`] (loop conditions, compound right-hand sides)
//! and [`Command`] (everything a track body can contain). Both are closed
//! sum types so every stage matches exhaustively.

/// The four instrument lanes. Doubles as the track kind and the note-command
/// instrument, which share volume and channel assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    Piano,
    Guitar,
    Bass,
    Drum,
}

impl Instrument {
    pub fn name(self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::Guitar => "guitar",
            Instrument::Bass => "bass",
            Instrument::Drum => "drum",
        }
    }
}

/// A track: one instrument lane with an ordered command sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub kind: Instrument,
    pub commands: Vec<Command>,
}

/// Piano hand position. Carried through for notation rendering; pitch does
/// not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Left,
    Right,
}

/// A note argument: literal scientific pitch notation or a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteArg {
    Spn(String),
    Var(String),
}

/// A fret argument: literal fret number or a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum FretArg {
    Literal(i64),
    Var(String),
}

/// A duration argument. Literal ints/floats and `n/d` fractions are resolved
/// to beats at parse time; identifiers are resolved at interpretation time.
#[derive(Debug, Clone, PartialEq)]
pub enum DurationExpr {
    Beats(f64),
    Var(String),
}

/// Assignment / increment operators after normalization (`++` becomes
/// `+= 1`, `i = i + n` becomes `+= n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

/// A single-value right-hand side: literal, note name, quoted string, a name
/// resolved at run time, or a full expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Number(f64),
    Note(String),
    Text(String),
    Name(String),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Note(String),
    Variable(String),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Grouping(Box<Expr>),
}

/// A bounded `for` loop: init, condition, increment, body.
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub var: String,
    pub init: Operand,
    pub condition: Expr,
    pub incr_var: String,
    pub incr_op: AssignOp,
    pub incr_value: Operand,
    pub body: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TimeSignature {
        numerator: u32,
        denominator: u32,
    },
    Tempo(u32),
    Volume(String),
    PianoNote {
        hand: Hand,
        note: NoteArg,
        duration: DurationExpr,
    },
    GuitarNote {
        string: u8,
        fret: FretArg,
        duration: DurationExpr,
    },
    BassNote {
        string: u8,
        fret: FretArg,
        duration: DurationExpr,
    },
    DrumNote {
        drum: String,
        duration: DurationExpr,
    },
    Pause {
        duration: DurationExpr,
    },
    /// Members execute time-parallel: all start at the block's entry time.
    Sync(Vec<Command>),
    For(Box<ForLoop>),
    Assign {
        name: String,
        op: AssignOp,
        value: Operand,
    },
}
