//! Build a machine from [`Settings`] and run it once.
//!
//! This is what the CLI and the REPL share: pick the tape, apply the EOF
//! policy, and run plain, traced, or under a [`StepControl`].

use std::io::{self, Read};
use std::panic;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{Settings, TapePolicy};
use crate::machine::{read_byte_after_flush, InputProvider, Machine, RuntimeError, StepControl};
use crate::program::ProgramError;
use crate::tape::{FixedTape, GrowableTape, Tape};

/// Either half of what can go wrong with a program.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("Execution aborted: wall-clock timeout exceeded ({timeout_ms} ms)")]
    TimedOut { timeout_ms: u64 },
}

/// How to drive the machine.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Print the step table instead of doing I/O.
    pub debug: bool,
    pub control: Option<StepControl>,
    /// Where `,` reads from; stdin when unset.
    pub input: Option<InputProvider>,
}

pub fn execute(code: &str, settings: &Settings, options: RunOptions) -> Result<(), ExecError> {
    match settings.tape {
        TapePolicy::Growable => execute_on(code, GrowableTape::new(), settings, options),
        TapePolicy::Fixed => execute_on(code, FixedTape::new(settings.fixed_capacity), settings, options),
    }
}

fn execute_on<T: Tape>(code: &str, tape: T, settings: &Settings, options: RunOptions) -> Result<(), ExecError> {
    let mut vm = Machine::with_tape(code, tape)?;
    vm.set_eof_policy(settings.eof);
    if let Some(provider) = options.input {
        vm.set_input_provider(move || provider());
    }

    match (options.debug, options.control) {
        (false, None) => vm.run()?,
        (false, Some(ctrl)) => vm.run_with_control(ctrl)?,
        (true, None) => vm.run_debug()?,
        (true, Some(ctrl)) => vm.run_debug_with_control(ctrl)?,
    }
    Ok(())
}

/// Run on a worker thread under the limits in `settings`.
///
/// The step budget is checked by the machine itself; the wall-clock timeout
/// is enforced here by raising `cancel` once it elapses. Callers may raise
/// `cancel` themselves (e.g. from a Ctrl+C handler). A panic on the worker,
/// such as a fixed tape overrun, is resumed on the calling thread.
///
/// Bytes for `,` are read from stdin on the calling thread, so a timed-out
/// worker never keeps a read pending after this returns.
pub fn execute_with_limits(
    code: &str,
    settings: &Settings,
    debug: bool,
    cancel: Arc<AtomicBool>,
) -> Result<(), ExecError> {
    execute_with_input(code, settings, debug, cancel, &mut io::stdin())
}

enum WorkerMsg {
    NeedInput,
    Done(Result<(), ExecError>),
}

/// [`execute_with_limits`] reading `,` bytes from `input`.
///
/// Time spent waiting on `input` counts toward the timeout, but a read in
/// progress is not interrupted.
pub fn execute_with_input<R: Read>(
    code: &str,
    settings: &Settings,
    debug: bool,
    cancel: Arc<AtomicBool>,
    input: &mut R,
) -> Result<(), ExecError> {
    let (tx, rx) = mpsc::channel::<WorkerMsg>();
    let (reply_tx, reply_rx) = mpsc::channel::<io::Result<Option<u8>>>();
    let code_owned = code.to_string();
    let settings_owned = settings.clone();
    let ctrl = StepControl::new(settings.max_steps, cancel.clone());

    // Once the caller has gone, requests fail and the worker sees end of input.
    let request_tx = tx.clone();
    let reply_rx = Mutex::new(reply_rx);
    let provider: InputProvider = Arc::new(move || {
        if request_tx.send(WorkerMsg::NeedInput).is_err() {
            return Ok(None);
        }
        match reply_rx.lock() {
            Ok(rx) => rx.recv().unwrap_or(Ok(None)),
            Err(_) => Ok(None),
        }
    });

    let handle = thread::spawn(move || {
        let options = RunOptions { debug, control: Some(ctrl), input: Some(provider) };
        let _ = tx.send(WorkerMsg::Done(execute(&code_owned, &settings_owned, options)));
    });

    let deadline = settings.timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
    loop {
        let received = match deadline {
            Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(WorkerMsg::NeedInput) => {
                let byte = read_byte_after_flush(&mut io::stdout(), input);
                let _ = reply_tx.send(byte);
            }
            Ok(WorkerMsg::Done(result)) => {
                let _ = handle.join();
                return result;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // The worker stops at its next step; it no longer reads input.
                cancel.store(true, Ordering::Relaxed);
                return Err(ExecError::TimedOut { timeout_ms: settings.timeout_ms.unwrap_or_default() });
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return match handle.join() {
                    Err(payload) => panic::resume_unwind(payload),
                    Ok(()) => Err(ExecError::Runtime(RuntimeError::Canceled)),
                };
            }
        }
    }
}
