use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::{atomic::AtomicBool, Arc};

use nu_ansi_term::Style;
use reedline::{DefaultPrompt, DefaultPromptSegment, Highlighter, HistoryItem, Signal, StyledText};

use crate::cli_util;
use crate::config::Settings;
use crate::program::{Instruction, Program};
use crate::runner;
use crate::theme::instruction_style;

pub fn repl_loop(settings: &Settings) -> io::Result<()> {
    // Initialize interactive line editor
    let mut editor = init_line_editor()?;

    loop {
        // Prompt and read a multi-line submission via editor
        let Some(submission) = read_submission_interactive(&mut editor)? else {
            // EOF or editor closed. End the session cleanly to avoid hanging when stdin is closed
            println!();
            io::stdout().flush()?;
            return Ok(());
        };

        let program = Program::parse(&submission);
        if program.is_empty() {
            continue; // Nothing to execute
        }

        // Execute the submission as typed so error carets can point into it
        execute_buffer(&submission, settings);

        // Test hook: if BF_REPL_ONCE=1, exit after one execution
        if env::var("BF_REPL_ONCE").ok().as_deref() == Some("1") {
            return Ok(());
        }
    }
}

fn init_line_editor() -> io::Result<reedline::Reedline> {
    use reedline::{
        default_emacs_keybindings, EditCommand, Emacs, KeyCode, KeyModifiers, Reedline, ReedlineEvent,
    };

    // Start from default emacs-like bindings and adjust:
    // - Enter -> InsertNewLine (do not submit)
    // - Ctrl+D -> AcceptLine (submit)
    // - Ctrl+Z -> AcceptLine (submit, for Windows)
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Edit(vec![EditCommand::InsertNewline]));
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('z'), ReedlineEvent::Submit);

    // Alt+Up/Alt+Down browse previous submissions.
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Down, ReedlineEvent::NextHistory);

    let history = reedline::FileBackedHistory::new(1_000)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let editor = Reedline::create()
        .with_highlighter(Box::new(InstructionHighlighter))
        .with_history(Box::new(history))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    Ok(editor)
}

/// Collect all lines until EOF. `None` if nothing was read.
pub fn read_submission<R: io::BufRead>(stdin: &mut R) -> Option<String> {
    let mut buffer = String::new();

    loop {
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => buffer.push_str(&line),
            Err(_) => return None,
        }
    }

    if buffer.is_empty() {
        None
    } else {
        Some(buffer)
    }
}

fn read_submission_interactive(editor: &mut reedline::Reedline) -> io::Result<Option<String>> {
    let prompt = DefaultPrompt::new(DefaultPromptSegment::Basic("bfvm".to_string()), DefaultPromptSegment::Empty);

    // Enter inserts a newline; Ctrl+D or Ctrl+Z submits the whole buffer
    match editor.read_line(&prompt) {
        Ok(Signal::Success(buffer)) => {
            // One history item per submitted program
            if !buffer.trim().is_empty() {
                let _ = editor.history_mut().save(HistoryItem::from_command_line(buffer.clone()));
            }
            Ok(Some(buffer))
        }
        Ok(Signal::CtrlC) => Ok(None),
        Ok(Signal::CtrlD) => Ok(None),
        Err(e) => {
            eprintln!("repl: editor error: {e}");
            let _ = io::stderr().flush();
            Ok(None)
        }
    }
}

/// Executes one submission on a fresh machine.
/// - Program output goes to stdout.
/// - Errors are printed concisely to stderr.
/// - A newline is always written to stdout after execution (success or error)
///   so that the prompt begins at column 0 on the next iteration.
fn execute_buffer(buffer: &str, settings: &Settings) {
    let cancel = Arc::new(AtomicBool::new(false));
    if let Err(err) = runner::execute_with_limits(buffer, settings, false, cancel) {
        cli_util::print_exec_error(None, buffer, &err);
    }
    println!();
    let _ = io::stdout().flush();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplMode {
    Bare,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlagOverride {
    None,
    Bare,
    Editor,
}

/// Flags, then `BF_REPL_MODE`, then whether stdin is a TTY.
pub fn select_mode(flag: ModeFlagOverride) -> Result<ReplMode, String> {
    resolve_mode(flag, env::var("BF_REPL_MODE").ok(), io::stdin().is_terminal())
}

fn resolve_mode(flag: ModeFlagOverride, env_mode: Option<String>, stdin_tty: bool) -> Result<ReplMode, String> {
    match flag {
        ModeFlagOverride::Bare => return Ok(ReplMode::Bare),
        ModeFlagOverride::Editor => {
            if !stdin_tty {
                return Err("cannot start editor: stdin is not a TTY (use --bare or BF_REPL_MODE=bare)".to_string());
            }
            return Ok(ReplMode::Editor);
        }
        ModeFlagOverride::None => {}
    }

    if let Some(val) = env_mode {
        return match val.trim().to_ascii_lowercase().as_str() {
            "bare" => Ok(ReplMode::Bare),
            "editor" => {
                if !stdin_tty {
                    return Err("cannot start editor: stdin is not a TTY (use BF_REPL_MODE=bare)".to_string());
                }
                Ok(ReplMode::Editor)
            }
            _ => Err(format!("invalid BF_REPL_MODE value: {val}, must be 'bare' or 'editor'")),
        };
    }

    if stdin_tty { Ok(ReplMode::Editor) } else { Ok(ReplMode::Bare) }
}

/// Bare mode: read stdin until EOF and run it once.
///
/// The program text consumes stdin, so `,` always sees end of input here.
pub fn execute_bare_once(settings: &Settings) -> io::Result<()> {
    // Release the stdin lock before running; the worker reads stdin for `,`.
    let submission = {
        let mut locked = io::BufReader::new(io::stdin().lock());
        read_submission(&mut locked)
    };
    if let Some(s) = submission {
        if !Program::parse(&s).is_empty() {
            execute_buffer(&s, settings);
        }
    }
    Ok(())
}

/// Colors instruction symbols; everything else is dimmed as comment text.
struct InstructionHighlighter;

impl Highlighter for InstructionHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut out: StyledText = StyledText::new();
        let mut current_style: Option<Style> = None;
        let mut buffer = String::new();

        for ch in line.chars() {
            let style = instruction_style(Instruction::from_char(ch));

            match current_style {
                Some(s) if s != style => {
                    out.push((s, std::mem::take(&mut buffer)));
                    current_style = Some(style);
                }
                Some(_) => {}
                None => current_style = Some(style),
            }
            buffer.push(ch);
        }

        if let Some(s) = current_style {
            if !buffer.is_empty() {
                out.push((s, buffer));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_submission_reads_until_eof_multiple_lines() {
        let input = b"+++\n>+.\n";
        let mut cursor = Cursor::new(&input[..]);
        let got = read_submission(&mut cursor);
        assert_eq!(got.as_deref(), Some("+++\n>+.\n"));
    }

    #[test]
    fn read_submission_empty_returns_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_submission(&mut cursor).is_none());
    }

    #[test]
    fn flags_override_environment() {
        let mode = resolve_mode(ModeFlagOverride::Bare, Some("editor".to_string()), true);
        assert_eq!(mode, Ok(ReplMode::Bare));
    }

    #[test]
    fn editor_requires_a_tty() {
        assert!(resolve_mode(ModeFlagOverride::Editor, None, false).is_err());
        assert!(resolve_mode(ModeFlagOverride::None, Some("editor".to_string()), false).is_err());
    }

    #[test]
    fn environment_then_auto_detect() {
        assert_eq!(resolve_mode(ModeFlagOverride::None, Some(" BARE ".to_string()), true), Ok(ReplMode::Bare));
        assert!(resolve_mode(ModeFlagOverride::None, Some("fancy".to_string()), true).is_err());
        assert_eq!(resolve_mode(ModeFlagOverride::None, None, true), Ok(ReplMode::Editor));
        assert_eq!(resolve_mode(ModeFlagOverride::None, None, false), Ok(ReplMode::Bare));
    }

    #[test]
    fn highlighter_groups_runs_of_equal_style() {
        let styled = InstructionHighlighter.highlight("++>x", 0);
        let parts: Vec<&str> = styled.buffer.iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(parts, vec!["++", ">", "x"]);
    }
}
