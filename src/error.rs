//! Centralised error hierarchy for the **Vesper interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here. This enables
//! a uniform `Result<T>` alias throughout the crate and ergonomic
//! inter-operation with `anyhow`, while still preserving rich diagnostic
//! detail.
//!
//! The module **does not** print diagnostics itself; rendering (location
//! line, source excerpt, caret) belongs to [`crate::diagnostics::Reporter`].
//! The `Display` form of an error is only the diagnostic header, e.g.
//! `Error at ')': Expect expression.` or `RuntimeError: Undefined variable 'x'.`

use std::io;

use log::info;
use thiserror::Error;

use crate::token::Token;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VesperError {
    /// Lexical (scanner) error. Never attached to a token: the offending
    /// character produced none.
    #[error("Error: {message}")]
    Lex {
        message: String,
        line: usize,
        column: usize,
    },

    /// Syntactic (parser) error at a concrete token, or at end of input.
    #[error("Error{}: {message}", at_token(.at_end, .lexeme))]
    Parse {
        message: String,
        line: usize,
        column: usize,
        lexeme: String,
        at_end: bool,
    },

    /// Static-analysis failure from the resolution pre-pass.
    #[error("Error{}: {message}", at_token(.at_end, .lexeme))]
    Resolve {
        message: String,
        line: usize,
        column: usize,
        lexeme: String,
        at_end: bool,
    },

    /// Runtime evaluation error, positioned at the operator or name token
    /// that triggered it.
    #[error("RuntimeError: {message}")]
    Runtime {
        message: String,
        line: usize,
        column: usize,
    },

    /// Wrapper around `std::io::Error` (transparent). Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn at_token(at_end: &bool, lexeme: &str) -> String {
    if *at_end {
        " at end".to_string()
    } else if lexeme.is_empty() {
        String::new()
    } else {
        format!(" at '{}'", lexeme)
    }
}

impl VesperError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, column: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        VesperError::Lex {
            message,
            line,
            column,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        VesperError::Parse {
            message,
            line: token.line,
            column: token.column,
            lexeme: token.lexeme.clone(),
            at_end: token.token_type == crate::token::TokenType::EOF,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Resolve error: line={}, msg={}",
            token.line, message
        );

        VesperError::Resolve {
            message,
            line: token.line,
            column: token.column,
            lexeme: token.lexeme.clone(),
            at_end: false,
        }
    }

    /// Helper constructor for the **evaluator**.
    pub fn runtime<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: line={}, msg={}",
            token.line, message
        );

        VesperError::Runtime {
            message,
            line: token.line,
            column: token.column,
        }
    }

    /// Source position of the error, when it carries one.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            VesperError::Lex { line, column, .. }
            | VesperError::Parse { line, column, .. }
            | VesperError::Resolve { line, column, .. }
            | VesperError::Runtime { line, column, .. } => Some((*line, *column)),

            VesperError::Io(_) => None,
        }
    }

    /// True for the compile-time kinds that set `had_error` on the sink.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            VesperError::Lex { .. } | VesperError::Parse { .. } | VesperError::Resolve { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, VesperError>;
