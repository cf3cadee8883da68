//! The execution engine.
//!
//! A [`Machine`] owns a validated program, its jump table, a program cursor
//! and a memory [`Tape`]. Execution is a sequence of [`Machine::step`] calls;
//! [`Machine::run`] is nothing more than stepping until the machine halts.
//!
//! Behaviors:
//! - Cells are bytes and wrap on `+`/`-`.
//! - `.` writes the current cell as a raw byte (to stdout unless a sink is set).
//! - `,` reads one byte (from stdin unless a provider is set). At end of input
//!   the [`EofPolicy`] decides the cell value; by default it is set to 0.
//! - `[` and `]` use the precomputed jump table. After every instruction,
//!   jumps included, the program cursor advances by one.
//! - Stepping a halted machine is a contract violation and panics.
//!
//! ```no_run
//! use bfvm::Machine;
//!
//! let mut vm = Machine::new("++++++++[>++++++++<-]>+.").expect("brackets balance");
//! vm.run().expect("program should run");
//! ```

use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::program::{Instruction, JumpTable, Program, ProgramError};
use crate::tape::{FixedTape, GrowableTape, Tape};

/// Errors that can interrupt a run of an already validated program.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Reading input, writing output, or writing the trace failed.
    #[error("I/O error at instruction {ip}: {source}")]
    Io { ip: usize, #[source] source: io::Error },

    /// Execution aborted due to step limit.
    #[error("Execution aborted: step limit exceeded ({limit})")]
    StepLimitExceeded { limit: usize },

    /// Execution aborted due to cooperative cancellation (e.g., timeout)
    #[error("Execution aborted: cancelled")]
    Canceled,
}

/// What `,` stores when the input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EofPolicy {
    /// Set the cell to 0.
    #[default]
    Zero,
    /// Leave the cell as it was.
    Unchanged,
}

impl FromStr for EofPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Ok(EofPolicy::Zero),
            "unchanged" | "keep" => Ok(EofPolicy::Unchanged),
            other => Err(format!("invalid EOF policy '{other}', must be 'zero' or 'unchanged'")),
        }
    }
}

impl fmt::Display for EofPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EofPolicy::Zero => write!(f, "zero"),
            EofPolicy::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Controls for cooperative cancellation and step limiting.
#[derive(Clone)]
pub struct StepControl {
    pub max_steps: Option<usize>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new(max_steps: Option<usize>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self { max_steps, cancel_flag }
    }
}

pub type OutputSink = Arc<dyn Fn(&[u8]) + Send + Sync>;
/// Supplies the byte for `,`. `Ok(None)` is end of input; an error aborts the run.
pub type InputProvider = Arc<dyn Fn() -> io::Result<Option<u8>> + Send + Sync>;

#[derive(Debug)]
struct Code {
    program: Program,
    jumps: JumpTable,
}

/// A virtual machine for one program.
///
/// The program and jump table are immutable and shared between clones; the
/// tape is owned. Both cursors are plain offsets, so a clone resumes at the
/// same instruction and the same cell of its own tape.
#[derive(Clone)]
pub struct Machine<T: Tape = GrowableTape> {
    code: Arc<Code>,
    pc: usize,
    tape: T,
    steps: usize,
    eof: EofPolicy,
    output_sink: Option<OutputSink>,
    input_provider: Option<InputProvider>,
}

impl<T: Tape + fmt::Debug> fmt::Debug for Machine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("program", &self.code.program.to_string())
            .field("pc", &self.pc)
            .field("tape", &self.tape)
            .field("steps", &self.steps)
            .field("eof", &self.eof)
            .finish_non_exhaustive()
    }
}

impl Machine<GrowableTape> {
    /// Build a machine with the default growable tape.
    pub fn new(source: &str) -> Result<Self, ProgramError> {
        Self::with_tape(source, GrowableTape::new())
    }
}

impl Machine<FixedTape> {
    /// Build a machine on a fixed tape of `capacity` cells.
    ///
    /// Moving the data pointer off either end of the tape panics.
    pub fn fixed(source: &str, capacity: usize) -> Result<Self, ProgramError> {
        Self::with_tape(source, FixedTape::new(capacity))
    }
}

impl<T: Tape> Machine<T> {
    /// Parse `source` and validate its brackets.
    pub fn with_tape(source: &str, tape: T) -> Result<Self, ProgramError> {
        Self::from_program(Program::parse(source), tape)
    }

    pub fn from_program(program: Program, tape: T) -> Result<Self, ProgramError> {
        let jumps = JumpTable::build(&program)?;
        Ok(Self {
            code: Arc::new(Code { program, jumps }),
            pc: 0,
            tape,
            steps: 0,
            eof: EofPolicy::default(),
            output_sink: None,
            input_provider: None,
        })
    }

    /// Provide an output sink. When set, '.' sends bytes to this sink instead of stdout.
    /// The sink receives a single-byte slice per '.'.
    pub fn set_output_sink<F>(&mut self, sink: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.output_sink = Some(Arc::new(sink));
    }

    /// Provide an input provider. When set, ',' reads from this provider instead of stdin.
    /// Returning None indicates end of input.
    pub fn set_input_provider<F>(&mut self, provider: F)
    where
        F: Fn() -> io::Result<Option<u8>> + Send + Sync + 'static,
    {
        self.input_provider = Some(Arc::new(provider));
    }

    pub fn set_eof_policy(&mut self, eof: EofPolicy) {
        self.eof = eof;
    }

    pub fn eof_policy(&self) -> EofPolicy {
        self.eof
    }

    pub fn program(&self) -> &Program {
        &self.code.program
    }

    pub fn jump_table(&self) -> &JumpTable {
        &self.code.jumps
    }

    /// Index of the next instruction to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn tape(&self) -> &T {
        &self.tape
    }

    pub fn current_cell(&self) -> u8 {
        self.tape.get()
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// True once the program cursor has reached the end of the program.
    pub fn is_halted(&self) -> bool {
        self.pc >= self.code.program.len()
    }

    /// Execute exactly one instruction.
    ///
    /// # Panics
    /// If the machine is already halted, or if a fixed tape is overrun.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        self.execute_one(false).map(|_| ())
    }

    /// Execute the program until completion.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        self.execute(None, None)
    }

    /// Execute with cooperative cancellation and optional step limit.
    pub fn run_with_control(&mut self, step_control: StepControl) -> Result<(), RuntimeError> {
        self.execute(None, Some(&step_control))
    }

    /// Debug-run the program, printing a step-by-step table of operations
    /// to stdout instead of producing I/O side effects. The machine state
    /// advances exactly as it would during a real run, but:
    /// - '.' does not emit the byte; the action is logged instead
    /// - ',' does not read input; end of input is simulated per the EOF policy
    pub fn run_debug(&mut self) -> Result<(), RuntimeError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.execute(Some(&mut out), None)
    }

    /// Debug-run with cooperative cancellation and optional step limit.
    pub fn run_debug_with_control(&mut self, step_control: StepControl) -> Result<(), RuntimeError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.execute(Some(&mut out), Some(&step_control))
    }

    /// Debug-run, writing the trace table to `out`.
    pub fn run_debug_to<W: Write>(&mut self, out: &mut W) -> Result<(), RuntimeError> {
        self.execute(Some(out), None)
    }

    /// Shared loop behind every run variant. The loop condition is the same
    /// predicate `step` asserts on.
    fn execute(
        &mut self,
        mut trace: Option<&mut dyn Write>,
        step_control: Option<&StepControl>,
    ) -> Result<(), RuntimeError> {
        if let Some(out) = trace.as_mut() {
            write_trace_header(&mut **out).map_err(|source| RuntimeError::Io { ip: self.pc, source })?;
        }

        let mut executed: usize = 0;
        while !self.is_halted() {
            if let Some(ctrl) = step_control {
                // Cooperative cancellation check
                if ctrl.cancel_flag.load(Ordering::Relaxed) {
                    return Err(RuntimeError::Canceled);
                }
                if let Some(max) = ctrl.max_steps {
                    if executed >= max {
                        return Err(RuntimeError::StepLimitExceeded { limit: max });
                    }
                }
            }

            let ip = self.pc;
            let instr = self.code.program.instructions()[ip];
            let (ptr_before, cell_before) = (self.tape.position(), self.tape.get());

            let action = self.execute_one(trace.is_some())?;

            if let Some(out) = trace.as_mut() {
                writeln!(
                    out,
                    "{:<4} | {:<3} | {:<3} | {:<4} |  {}    | {}",
                    self.steps - 1,
                    ip,
                    ptr_before,
                    cell_before,
                    instr,
                    action.unwrap_or_default()
                )
                .map_err(|source| RuntimeError::Io { ip, source })?;
            }
            executed += 1;
        }

        if self.output_sink.is_none() && trace.is_none() {
            io::stdout().flush().map_err(|source| RuntimeError::Io { ip: self.pc, source })?;
        }
        Ok(())
    }

    /// Dispatch the instruction under the program cursor, then advance it.
    /// With `debug` set, I/O is simulated and a description of the action
    /// is returned for the trace.
    fn execute_one(&mut self, debug: bool) -> Result<Option<String>, RuntimeError> {
        assert!(
            !self.is_halted(),
            "step called on a halted machine (pc={}, program length={})",
            self.pc,
            self.code.program.len()
        );

        let ip = self.pc;
        let instr = self.code.program.instructions()[ip];
        let cell_before = self.tape.get();
        let mut action: Option<String> = if debug { Some(String::new()) } else { None };

        match instr {
            Instruction::MoveRight => {
                let len = self.tape.len();
                self.tape.move_right();
                if let Some(a) = action.as_mut() {
                    *a = if self.tape.len() > len {
                        format!("Grew tape right; moved pointer head to index {}", self.tape.position())
                    } else {
                        format!("Moved pointer head to index {}", self.tape.position())
                    };
                }
            }
            Instruction::MoveLeft => {
                let len = self.tape.len();
                self.tape.move_left();
                if let Some(a) = action.as_mut() {
                    *a = if self.tape.len() > len {
                        format!("Grew tape left; moved pointer head to index {}", self.tape.position())
                    } else {
                        format!("Moved pointer head to index {}", self.tape.position())
                    };
                }
            }
            Instruction::Increment => {
                self.tape.increment();
                if let Some(a) = action.as_mut() {
                    *a = format!("Increment cell[{}] from {} to {}", self.tape.position(), cell_before, self.tape.get());
                }
            }
            Instruction::Decrement => {
                self.tape.decrement();
                if let Some(a) = action.as_mut() {
                    *a = format!("Decrement cell[{}] from {} to {}", self.tape.position(), cell_before, self.tape.get());
                }
            }
            Instruction::Output => {
                if let Some(a) = action.as_mut() {
                    *a = format!("Output byte {} (suppressed in debug)", cell_before);
                } else {
                    self.write_output(ip, cell_before)?;
                }
            }
            Instruction::Input => {
                if let Some(a) = action.as_mut() {
                    self.apply_eof();
                    *a = format!("Read byte -> simulated end of input (eof={}, cell={})", self.eof, self.tape.get());
                } else {
                    match self.read_input(ip)? {
                        Some(b) => self.tape.set(b),
                        None => self.apply_eof(),
                    }
                }
            }
            Instruction::JumpForward => {
                if cell_before == 0 {
                    let j = self.code.jumps.target(ip);
                    if let Some(a) = action.as_mut() {
                        *a = format!("Cell is 0; jump forward to matching ']' at IP {}", j);
                    }
                    self.pc = j;
                } else if let Some(a) = action.as_mut() {
                    *a = "Enter loop (cell != 0)".to_string();
                }
            }
            Instruction::JumpBackward => {
                if cell_before != 0 {
                    let j = self.code.jumps.target(ip);
                    if let Some(a) = action.as_mut() {
                        *a = format!("Cell != 0; jump back to matching '[' at IP {}", j);
                    }
                    self.pc = j;
                } else if let Some(a) = action.as_mut() {
                    *a = "Exit loop (cell is 0)".to_string();
                }
            }
        }

        // Jump targets sit one before the resume point in both directions.
        self.pc += 1;
        self.steps += 1;
        Ok(action)
    }

    fn write_output(&self, ip: usize, byte: u8) -> Result<(), RuntimeError> {
        if let Some(sink) = self.output_sink.as_ref() {
            (sink)(&[byte]);
            Ok(())
        } else {
            io::stdout()
                .write_all(&[byte])
                .map_err(|source| RuntimeError::Io { ip, source })
        }
    }

    fn read_input(&self, ip: usize) -> Result<Option<u8>, RuntimeError> {
        let read = match self.input_provider.as_ref() {
            Some(provider) => (provider)(),
            None => read_stdin_byte(),
        };
        read.map_err(|source| RuntimeError::Io { ip, source })
    }

    fn apply_eof(&mut self) {
        match self.eof {
            EofPolicy::Zero => self.tape.set(0),
            EofPolicy::Unchanged => {}
        }
    }
}

/// Flush stdout, then read one byte from stdin. `Ok(None)` at end of input.
fn read_stdin_byte() -> io::Result<Option<u8>> {
    read_byte_after_flush(&mut io::stdout(), &mut io::stdin())
}

// Anything printed so far should be visible before we block.
pub(crate) fn read_byte_after_flush(out: &mut dyn Write, input: &mut dyn Read) -> io::Result<Option<u8>> {
    out.flush()?;
    let mut buf = [0u8; 1];
    loop {
        match input.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn write_trace_header(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "STEP | IP  | PTR | CELL | INSTR | ACTION")?;
    writeln!(out, "-----+-----+-----+------+-------+------------------------------------------------")
}
