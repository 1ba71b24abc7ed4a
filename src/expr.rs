use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

static NEXT_NODE_ID: AtomicUsize = AtomicUsize::new(0);

/// Fresh identity for a variable-bearing expression node.
///
/// The resolver keys its hop-count side table by these ids, so they must be
/// unique for the lifetime of the process: a REPL session parses many
/// programs against one interpreter, and reusing an id would let a stale
/// resolution leak into a later line.
pub fn next_node_id() -> usize {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug)]
pub enum Expr {
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Grouping(Box<Expr>),

    /// Literal value, carried on the token itself (NUMBER/STRING payloads,
    /// or the TRUE/FALSE/NIL keyword kinds).
    Literal(Token),

    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    Variable {
        id: usize,
        name: Token,
    },

    /// `name = value`, or a compound form such as `name += value` when
    /// `operator` carries the underlying arithmetic token.
    Assign {
        id: usize,
        name: Token,
        operator: Option<Token>,
        value: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },

    Get {
        object: Box<Expr>,
        name: Token,
    },

    /// `object.name = value`, with the same compound-operator tagging as
    /// `Assign`.
    Set {
        object: Box<Expr>,
        name: Token,
        operator: Option<Token>,
        value: Box<Expr>,
    },

    This {
        id: usize,
        keyword: Token,
    },

    Super {
        id: usize,
        keyword: Token,
        method: Token,
    },
}
