use std::fs;
use std::io::{self, Write};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use bfvm::cli_util::print_exec_error;
use bfvm::config::{Settings, TapePolicy};
use bfvm::machine::EofPolicy;
use bfvm::runner::{self, ExecError};
use clap::Args;

use super::{EXIT_ABORTED, EXIT_INVALID_PROGRAM, EXIT_NO_PROGRAM, EXIT_OK, EXIT_UNREADABLE};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Path of the program to run
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Run CODE given inline instead of loading PATH
    #[arg(short = 'e', long = "code", value_name = "CODE")]
    pub code: Option<String>,

    /// Print a step-by-step table of operations instead of executing
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Wall-clock timeout in milliseconds (fallback BF_TIMEOUT_MS; default none)
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum interpreter steps before abort (fallback BF_MAX_STEPS; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<usize>,

    /// Tape policy: growable (default) or fixed
    #[arg(long = "tape", value_name = "POLICY")]
    pub tape: Option<TapePolicy>,

    /// Cell count of a fixed tape (default 4096)
    #[arg(long = "tape-size", value_name = "CELLS", value_parser = parse_tape_size)]
    pub tape_size: Option<usize>,

    /// What ',' stores at end of input: zero (default) or unchanged
    #[arg(long = "eof", value_name = "POLICY")]
    pub eof: Option<EofPolicy>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, EXIT_OK);
    }

    let RunArgs {
        path,
        code,
        debug,
        timeout_ms,
        max_steps,
        tape,
        tape_size,
        eof,
        ..
    } = args;

    let code_str = match (path, code) {
        (None, None) => {
            eprintln!("{program}: need a program to execute");
            usage_and_exit(program, EXIT_NO_PROGRAM);
        }
        (Some(_), Some(_)) => {
            eprintln!("{program}: cannot use PATH together with --code");
            usage_and_exit(program, EXIT_NO_PROGRAM);
        }
        (None, Some(code)) => code,
        (Some(path), None) => match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{program}: could not open program '{path}': {e}");
                let _ = io::stderr().flush();
                return EXIT_UNREADABLE;
            }
        },
    };

    // Resolve settings: flags -> env -> config file -> defaults
    let mut settings = Settings::load();
    if let Some(v) = timeout_ms { settings.timeout_ms = Some(v); }
    if let Some(v) = max_steps { settings.max_steps = Some(v); }
    if let Some(v) = tape { settings.tape = v; }
    if let Some(v) = tape_size { settings.fixed_capacity = v; }
    if let Some(v) = eof { settings.eof = v; }

    // First Ctrl+C asks the machine to stop between steps; a second one exits.
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if cancel_handler.swap(true, Ordering::Relaxed) {
            let _ = io::stdout().flush();
            std::process::exit(EXIT_ABORTED);
        }
    }) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
        return EXIT_ABORTED;
    }

    let exit_code = match runner::execute_with_limits(&code_str, &settings, debug, cancel) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            print_exec_error(Some(program), &code_str, &err);
            match err {
                ExecError::Program(_) => EXIT_INVALID_PROGRAM,
                ExecError::Runtime(_) | ExecError::TimedOut { .. } => EXIT_ABORTED,
            }
        }
    };

    let _ = io::stdout().flush();
    exit_code
}

fn parse_tape_size(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("a fixed tape needs at least one cell".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [OPTIONS] <PATH>
  {0} run [OPTIONS] --code "<code>"

Options:
  --code,  -e <CODE>     Run CODE instead of loading PATH
  --debug, -d            Print a step-by-step table of operations instead of executing
  --timeout <MS>         Abort after MS milliseconds (env BF_TIMEOUT_MS)
  --max-steps <N>        Abort after N instructions (env BF_MAX_STEPS)
  --tape <POLICY>        growable (default) or fixed (env BF_TAPE)
  --tape-size <CELLS>    Cells of a fixed tape, default 4096 (env BF_TAPE_SIZE)
  --eof <POLICY>         ',' at end of input: zero (default) or unchanged (env BF_EOF)
  --help,  -h            Show this help

Notes:
- Only ><+-.,[] are instructions; every other character is a comment.
- A fixed tape aborts the process if the pointer leaves it.
- Defaults can be set in the [machine] section of $XDG_CONFIG_HOME/bfvm.toml.

Exit codes:
  0  success
  1  no program given
  2  program file could not be read
  3  unbalanced brackets
  4  execution aborted (timeout, step limit, ctrl+c, I/O error)
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
