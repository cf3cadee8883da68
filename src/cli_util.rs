use std::io::{self, IsTerminal, Write};

use nu_ansi_term::Style;

use crate::machine::RuntimeError;
use crate::program::{Instruction, ProgramError};
use crate::runner::ExecError;
use crate::theme::catppuccin::Mocha;

/// Pretty-print a bracket validation error with caret positioning.
/// If `program` is `Some("bfvm")`, prefix messages with "bfvm: ..." for CLI mode.
pub fn print_program_error(program: Option<&str>, code: &str, err: &ProgramError) {
    let msg = prefix_program(program, &format!("Parse error: unmatched bracket {}", err.kind()));
    print_error_with_context(&msg, code, err.ip());
}

/// Print a runtime failure. Aborts carry no position; I/O errors point at
/// the instruction that was executing.
pub fn print_runtime_error(program: Option<&str>, code: &str, err: &RuntimeError) {
    match err {
        RuntimeError::Io { ip, source } => {
            let msg = prefix_program(program, &format!("I/O error: {source}"));
            print_error_with_context(&msg, code, *ip);
        }
        RuntimeError::StepLimitExceeded { .. } | RuntimeError::Canceled => {
            eprintln!("{err}");
            let _ = io::stderr().flush();
        }
    }
}

/// Dispatch to the printer for whichever stage failed.
pub fn print_exec_error(program: Option<&str>, code: &str, err: &ExecError) {
    match err {
        ExecError::Program(e) => print_program_error(program, code, e),
        ExecError::Runtime(e) => print_runtime_error(program, code, e),
        ExecError::TimedOut { .. } => {
            eprintln!("{err}");
            let _ = io::stderr().flush();
        }
    }
}

fn prefix_program(program: Option<&str>, msg: &str) -> String {
    if let Some(p) = program {
        format!("{p}: {msg}")
    } else {
        msg.to_string()
    }
}

/// Print a concise error with instruction index and a caret context window.
///
/// `ip` is an instruction index; the window is cut from the original source
/// (comments included) around the character that instruction came from.
pub fn print_error_with_context(prefix: &str, code: &str, ip: usize) {
    let header = format!("{prefix} at instruction {ip}");
    if io::stderr().is_terminal() {
        eprintln!("{}", Style::new().fg(Mocha::RED).bold().paint(header));
    } else {
        eprintln!("{header}");
    }

    let pos = instruction_char_index(code, ip).unwrap_or_else(|| code.chars().count());
    let (window, caret) = context_window(code, pos);
    eprintln!("  {}", window);
    eprintln!("  {}", caret);
    let _ = io::stderr().flush();
}

/// Show a short window around `pos` (a char index) and a caret line under it.
/// Line breaks inside the window are flattened to spaces so the caret lines up.
pub fn context_window(code: &str, pos: usize) -> (String, String) {
    const WINDOW_CHARS: usize = 32;

    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    let window: String = code
        .chars()
        .skip(start_char)
        .take(end_char.saturating_sub(start_char))
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();

    // Caret under the exact position
    let mut underline = " ".repeat(pos.saturating_sub(start_char));
    underline.push('^');
    (window, underline)
}

/// Char index of the `ip`-th instruction symbol in `code`.
pub fn instruction_char_index(code: &str, ip: usize) -> Option<usize> {
    code.chars()
        .enumerate()
        .filter(|(_, c)| Instruction::from_char(*c).is_some())
        .nth(ip)
        .map(|(i, _)| i)
}
