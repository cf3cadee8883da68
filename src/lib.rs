//! A small Brainfuck virtual machine.
//!
//! Source text is parsed into a [`Program`] of eight instructions (every
//! other character is a comment), validated into a [`JumpTable`], and
//! executed by a [`Machine`] one [`Machine::step`] at a time.
//!
//! Features and behaviors:
//! - The default tape starts as one zero cell and grows in either direction.
//! - A fixed tape (4096 cells by default) is available as an opt-in; leaving
//!   it panics.
//! - Cells are bytes; `+` and `-` wrap.
//! - `,` reads a single byte; at end of input the cell is set to 0 unless
//!   [`EofPolicy::Unchanged`] is selected.
//! - `.` writes the byte at the current cell (no newline).
//! - Unbalanced brackets are rejected when the machine is built.
//!
//! Quick start:
//!
//! ```no_run
//! use bfvm::Machine;
//!
//! // Classic "Hello World!"
//! let code = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
//! let mut vm = Machine::new(code).expect("brackets balance");
//! vm.run().expect("program should run");
//! ```

pub mod cli_util;
pub mod config;
pub mod machine;
pub mod program;
pub mod repl;
pub mod runner;
pub mod tape;
pub mod theme;

pub use machine::{EofPolicy, Machine, RuntimeError, StepControl};
pub use program::{BracketKind, Instruction, JumpTable, Program, ProgramError};
pub use tape::{FixedTape, GrowableTape, Tape};
