use std::io::{self, IsTerminal, Write};

use bfvm::config::Settings;
use bfvm::repl::{execute_bare_once, repl_loop, select_mode, ModeFlagOverride, ReplMode};
use clap::Args;

use super::{EXIT_ABORTED, EXIT_NO_PROGRAM, EXIT_OK};

#[derive(Args, Debug, Default)]
#[command(disable_help_flag = true)]
pub struct ReplArgs {
    /// Force non-interactive bare mode
    #[arg(long = "bare", conflicts_with = "editor")]
    pub bare: bool,

    /// Force interactive mode (errors if stdin is not a TTY)
    #[arg(long = "editor", conflicts_with = "bare")]
    pub editor: bool,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

// Public entry point for the REPL from main.rs
pub fn run(program: &str, args: ReplArgs) -> i32 {
    if args.help {
        usage_and_exit(program, EXIT_OK);
    }

    let mode_flag = match (args.bare, args.editor) {
        (true, _) => ModeFlagOverride::Bare,
        (_, true) => ModeFlagOverride::Editor,
        _ => ModeFlagOverride::None,
    };

    // Determine mode: flags -> env -> auto-detect via is_terminal()
    let mode = match select_mode(mode_flag) {
        Ok(m) => m,
        Err(msg) => {
            eprintln!("{program}: {msg}");
            let _ = io::stderr().flush();
            return EXIT_NO_PROGRAM;
        }
    };

    let settings = Settings::load();

    match mode {
        ReplMode::Editor => {
            // Install SIGINT (ctrl+c) handler to flush and exit(0) immediately
            if let Err(e) = ctrlc::set_handler(|| {
                let _ = io::stdout().flush();
                let _ = io::stderr().flush();
                std::process::exit(EXIT_OK);
            }) {
                eprintln!("{program}: failed to set ctrl+c handler: {e}");
                let _ = io::stderr().flush();
                return EXIT_ABORTED;
            }

            // Print banners/prompts only if stderr is a TTY
            if io::stderr().is_terminal() {
                eprintln!("bfvm REPL (interactive editor mode)");
                eprintln!("Ctrl+d/Ctrl+z Enter (Windows) executes the current buffer. Press ctrl+c to exit");
                let _ = io::stderr().flush();
            }

            if let Err(e) = repl_loop(&settings) {
                eprintln!("{program}: REPL error: {e}");
                let _ = io::stderr().flush();
                return EXIT_ABORTED;
            }

            EXIT_OK
        }
        ReplMode::Bare => {
            // Bare mode: read stdin until EOF, execute once, exit 0
            match execute_bare_once(&settings) {
                Ok(()) => EXIT_OK,
                Err(e) => {
                    eprintln!("{program}: REPL error: {e}");
                    let _ = io::stderr().flush();
                    EXIT_ABORTED
                }
            }
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} repl [--bare|--editor]   # Start a REPL (read-eval-print loop)

Options:
  --help,   -h        Show this help
  --bare              Force non-interactive bare mode
  --editor            Force interactive editor mode (errors if stdin is not a TTY)

Notes:
    - Non-instruction characters are comments and are ignored.
    - Ctrl+D executes the current buffer on *nix/macOS.
    - Ctrl+Z and Enter will execute the current buffer on Windows.
    - Ctrl+C exits the REPL immediately.
    - The REPL will print a newline after each execution for readability.
    - Each execution starts with a fresh tape and pointer.
    - The REPL will exit after a single execution if the environment variable `BF_REPL_ONCE` is set to `1`.
    - Mode selection:
        * Flags: --bare|--editor override environment and auto-detection.
        * Env: BF_REPL_MODE=bare|editor overrides auto-detection.
        * Auto-detect: if stdin is a TTY, starts in interactive editor mode; otherwise, bare mode.
        * Prompts/banners suppressed if stderr is not a TTY.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
