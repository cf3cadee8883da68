//! Program loading and bracket validation.
//!
//! Source text is filtered down to the eight instruction symbols
//! `><+-.,[]`; everything else is a comment. The resulting [`Program`] is
//! then scanned once to build a [`JumpTable`] pairing every `[` with its `]`.

use std::fmt;

/// One of the eight instructions of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `>`
    MoveRight,
    /// `<`
    MoveLeft,
    /// `+`
    Increment,
    /// `-`
    Decrement,
    /// `.`
    Output,
    /// `,`
    Input,
    /// `[`: jump past the matching `]` if the current cell is zero.
    JumpForward,
    /// `]`: jump back to the matching `[` if the current cell is non-zero.
    JumpBackward,
}

impl Instruction {
    /// Map a source character to its instruction, or `None` for comment text.
    pub fn from_char(ch: char) -> Option<Self> {
        Some(match ch {
            '>' => Instruction::MoveRight,
            '<' => Instruction::MoveLeft,
            '+' => Instruction::Increment,
            '-' => Instruction::Decrement,
            '.' => Instruction::Output,
            ',' => Instruction::Input,
            '[' => Instruction::JumpForward,
            ']' => Instruction::JumpBackward,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            Instruction::MoveRight => '>',
            Instruction::MoveLeft => '<',
            Instruction::Increment => '+',
            Instruction::Decrement => '-',
            Instruction::Output => '.',
            Instruction::Input => ',',
            Instruction::JumpForward => '[',
            Instruction::JumpBackward => ']',
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// An immutable, 0-indexed sequence of instructions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Parse `source`, keeping only the eight instruction symbols in order.
    ///
    /// Never fails: whitespace, newlines and any other text are dropped.
    pub fn parse(source: &str) -> Self {
        Self {
            instructions: source.chars().filter_map(Instruction::from_char).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, ip: usize) -> Option<Instruction> {
        self.instructions.get(ip).copied()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn iter(&self) -> impl Iterator<Item = Instruction> + '_ {
        self.instructions.iter().copied()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instructions {
            write!(f, "{instr}")?;
        }
        Ok(())
    }
}

/// Which side of a loop was left without a partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    Open,
    Close,
}

impl fmt::Display for BracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketKind::Open => write!(f, "'['"),
            BracketKind::Close => write!(f, "']'"),
        }
    }
}

/// Errors raised while validating a program's brackets.
///
/// `ip` is an instruction index, not a character offset into the source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    /// A `]` with no preceding unmatched `[`.
    #[error("Unmatched bracket ']' at instruction {ip}")]
    UnmatchedJumpBackward { ip: usize },

    /// A `[` that is never closed. Reports the innermost one still open.
    #[error("Unmatched bracket '[' at instruction {ip}")]
    UnmatchedJumpForward { ip: usize },
}

impl ProgramError {
    pub fn ip(&self) -> usize {
        match self {
            ProgramError::UnmatchedJumpBackward { ip } | ProgramError::UnmatchedJumpForward { ip } => *ip,
        }
    }

    pub fn kind(&self) -> BracketKind {
        match self {
            ProgramError::UnmatchedJumpBackward { .. } => BracketKind::Close,
            ProgramError::UnmatchedJumpForward { .. } => BracketKind::Open,
        }
    }
}

/// Dense bracket-matching table indexed by instruction position.
///
/// For a `[` at `p`, `target(p)` is its `]`, and the other way round.
/// Slots for non-bracket instructions are never consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpTable {
    targets: Vec<usize>,
}

impl JumpTable {
    /// Pair up brackets with a single left-to-right scan.
    pub fn build(program: &Program) -> Result<Self, ProgramError> {
        let mut targets = vec![0; program.len()];
        let mut stack: Vec<usize> = Vec::new();

        for (ip, instr) in program.iter().enumerate() {
            match instr {
                Instruction::JumpForward => stack.push(ip),
                Instruction::JumpBackward => {
                    let Some(open) = stack.pop() else {
                        return Err(ProgramError::UnmatchedJumpBackward { ip });
                    };
                    targets[open] = ip;
                    targets[ip] = open;
                }
                _ => {}
            }
        }

        if let Some(open) = stack.last().copied() {
            return Err(ProgramError::UnmatchedJumpForward { ip: open });
        }

        Ok(Self { targets })
    }

    /// Matching bracket position for the bracket at `ip`.
    #[inline]
    pub fn target(&self, ip: usize) -> usize {
        self.targets[ip]
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
