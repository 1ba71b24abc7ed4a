use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use vesper::diagnostics::Reporter;
use vesper::interpreter::Interpreter;

use clap::Parser as ClapParser;

const USAGE: &str = "Usage: vesper [script]";

// Compile-time errors and runtime errors map to distinct exit codes so
// scripts can be driven from test harnesses; 64 flags a bad invocation.
const EXIT_USAGE: i32 = 64;
const EXIT_COMPILE_ERROR: i32 = 65;
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to run; starts an interactive session when omitted
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            e.print()?;
            return Ok(());
        }

        // Extra positionals, unknown flags: conventional exit code 64
        // instead of clap's default.
        Err(_) => {
            eprintln!("{}", USAGE);
            process::exit(EXIT_USAGE);
        }
    };

    match args.script {
        Some(path) => run_file(path),

        None => run_repl(),
    }
}

fn run_file(path: PathBuf) -> anyhow::Result<()> {
    let source: String = fs::read_to_string(&path)?;

    let mut interpreter: Interpreter<io::Stdout> = Interpreter::new(io::stdout());
    let mut reporter = Reporter::new(path.display().to_string(), &source);

    vesper::run(&source, &mut interpreter, &mut reporter);

    if reporter.had_error() {
        process::exit(EXIT_COMPILE_ERROR);
    }

    if reporter.had_runtime_error() {
        process::exit(EXIT_RUNTIME_ERROR);
    }

    Ok(())
}

/// Interactive loop: one program per line against a persistent interpreter,
/// a fresh diagnostic sink per line so error flags reset, and `exit` (or
/// end of input) to leave.
fn run_repl() -> anyhow::Result<()> {
    let mut interpreter: Interpreter<io::Stdout> = Interpreter::new(io::stdout());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let line: String = match lines.next() {
            Some(line) => line?,

            None => break,
        };

        if line.trim() == "exit" {
            break;
        }

        let mut reporter = Reporter::new("<stdin>", &line);
        vesper::run(&line, &mut interpreter, &mut reporter);
    }

    Ok(())
}
