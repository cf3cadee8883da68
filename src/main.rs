use clap::{Parser, Subcommand};
use std::env;
use std::io::{self, Write};

mod commands;

use commands::repl::ReplArgs;
use commands::run::RunArgs;

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run <PATH>                 # Run a program loaded from PATH
  {0} run --code "<code>"        # Run inline code
  {0} run --debug <PATH>         # Print a step-by-step trace instead of doing I/O
  {0} repl [--bare|--editor]     # Start a REPL (default when no subcommand is given)

Run "{0} <subcommand> --help" for more info.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "bfvm", disable_help_flag = true, disable_help_subcommand = true)]
struct Cli {
    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    Repl(ReplArgs),
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("bfvm"));

    let cli = Cli::parse();

    if cli.help {
        print_top_usage_and_exit(&program, commands::EXIT_OK);
    }

    let code = match cli.command {
        Some(Command::Run(args)) => commands::run::run(&program, args),
        Some(Command::Repl(args)) => commands::repl::run(&program, args),
        None => commands::repl::run(&program, ReplArgs::default()),
    };

    std::process::exit(code);
}
