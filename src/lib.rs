pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

use std::io::Write;

use log::info;

use crate::diagnostics::Reporter;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;
use crate::token::Token;

/// Run one program through the full pipeline against an existing
/// interpreter, reporting every diagnostic to `reporter`.
///
/// Each phase stops the pipeline when the sink records an error: scanning
/// recovers per character but a flagged source never parses, a flagged
/// parse never resolves, and a flagged resolution never runs. The outcome
/// is read off the reporter's `had_error`/`had_runtime_error` flags.
pub fn run<W: Write>(source: &str, interpreter: &mut Interpreter<W>, reporter: &mut Reporter) {
    info!("Running {} byte(s) of source", source.len());

    let mut tokens: Vec<Token> = Vec::new();

    for item in Scanner::new(source.as_bytes().to_vec()) {
        match item {
            Ok(token) => tokens.push(token),

            Err(e) => reporter.report(&e),
        }
    }

    if reporter.had_error() {
        return;
    }

    let statements: Vec<Stmt> = Parser::new(tokens, reporter).parse();

    if reporter.had_error() || statements.is_empty() {
        return;
    }

    Resolver::new(interpreter, reporter).resolve(&statements);

    if reporter.had_error() {
        return;
    }

    if let Err(e) = interpreter.interpret(&statements) {
        reporter.report(&e);
    }
}
