//! Static resolution pass.
//!
//! One AST walk between parsing and evaluation that:
//!
//! 1. **Builds lexical scopes**: a stack of `HashMap<String, bool>` tracking
//!    declared (`false`) and fully defined (`true`) names per block,
//!    function body, and class body. The stack starts with one outermost
//!    scope mirroring the global environment.
//! 2. **Enforces static rules**: redeclaration in the same scope, reading a
//!    variable in its own initializer, `return` outside a function or with a
//!    value inside an initializer, and `this`/`super` placement.
//! 3. **Records binding distances**: every variable-bearing node is either
//!    noted in the interpreter's side table with its hop count (innermost
//!    scope = 0) or, if no scope binds the name, left to the dynamic global
//!    lookup at runtime.
//!
//! Errors go to the shared sink and the walk continues, so one bad
//! declaration does not hide the diagnostics after it.

use std::collections::HashMap;
use std::io::Write;

use log::{debug, info};

use crate::diagnostics::Reporter;
use crate::error::VesperError;
use crate::expr::Expr;
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;

/// What kind of function body we are inside. Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    /// Not inside any class.
    None,

    /// Inside a class declaration _without_ a superclass.
    Class,

    /// Inside a class declaration _with_ a superclass.
    Subclass,
}

pub struct Resolver<'i, 'r, W: Write> {
    interpreter: &'i mut Interpreter<W>,
    reporter: &'r mut Reporter,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'i, 'r, W: Write> Resolver<'i, 'r, W> {
    pub fn new(interpreter: &'i mut Interpreter<W>, reporter: &'r mut Reporter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            reporter,
            // The outermost scope aligns with the global environment.
            scopes: vec![HashMap::new()],
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top-level statements, reporting every error found.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        let err = VesperError::resolve(token, message);
        self.reporter.report(&err);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.declare(name);
                self.define(name);

                let enclosing_class: ClassType = self.current_class;
                self.current_class = if superclass.is_some() {
                    ClassType::Subclass
                } else {
                    ClassType::Class
                };

                if let Some(superclass_expr) = superclass {
                    if let Expr::Variable {
                        name: superclass_name,
                        ..
                    } = superclass_expr
                    {
                        if superclass_name.lexeme == name.lexeme {
                            self.error(superclass_name, "A class cannot inherit from itself.");
                        }
                    }

                    self.resolve_expr(superclass_expr);

                    // Scope for `super`, mirroring the intermediate
                    // environment the evaluator builds for subclasses.
                    self.begin_scope();
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert("super".to_string(), true);
                    }
                }

                // Implicit `this` scope shared by all methods.
                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this".to_string(), true);
                }

                for method in methods {
                    let kind: FunctionType = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };

                    self.resolve_function(kind, method);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }

            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s);
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                self.declare(name);

                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }

                self.define(name);
            }

            Stmt::Function(decl) => {
                // Declared and defined before the body so the function can
                // call itself.
                self.declare(&decl.name);
                self.define(&decl.name);

                self.resolve_function(FunctionType::Function, decl);
            }

            Stmt::Expression(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Cannot return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Cannot return a value from an initializer.");
                    }

                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                let declared_not_defined: bool = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.lexeme))
                    == Some(&false);

                if declared_not_defined {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign {
                id, name, value, ..
            } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get { object, .. } => {
                self.resolve_expr(object);
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Cannot use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Cannot use 'super' outside of a class.");
                        return;
                    }

                    ClassType::Class => {
                        self.error(keyword, "Cannot use 'super' in a class with no superclass.");
                        return;
                    }

                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_function(&mut self, kind: FunctionType, decl: &FunctionDecl) {
        let enclosing: FunctionType = self.current_function;
        self.current_function = kind;

        // One scope holds both parameters and body, matching the single
        // call environment the evaluator creates.
        self.begin_scope();

        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }

        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }

        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let already_declared: bool = self
            .scopes
            .last()
            .is_some_and(|scope| scope.contains_key(&name.lexeme));

        if already_declared {
            self.error(
                name,
                "Variable with this name already declared in this scope.",
            );
            return;
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at its hop count, or leave it for
    /// the dynamic global path when no scope binds the name.
    fn resolve_local(&mut self, id: usize, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve_source(source: &str) -> (Vec<Stmt>, Interpreter<Vec<u8>>, bool) {
        let mut reporter = Reporter::new("<test>", source);
        let tokens: Vec<Token> = Scanner::new(source.as_bytes().to_vec())
            .filter_map(Result::ok)
            .collect();
        let statements = Parser::new(tokens, &mut reporter).parse();

        let mut interpreter = Interpreter::new(Vec::new());
        Resolver::new(&mut interpreter, &mut reporter).resolve(&statements);

        let had_error = reporter.had_error();
        (statements, interpreter, had_error)
    }

    /// The id of the variable read inside the innermost function body of
    /// scenario-style fixtures below.
    fn variable_id(expr: &Expr) -> usize {
        match expr {
            Expr::Variable { id, .. } => *id,
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn closure_read_resolves_through_block_and_function_scopes() {
        let (statements, interpreter, had_error) =
            resolve_source("var a = 1;\n{\n  fun show() {\n    a;\n  }\n}\n");

        assert!(!had_error);

        let Stmt::Block(block) = &statements[1] else {
            panic!("expected block");
        };
        let Stmt::Function(decl) = &block[0] else {
            panic!("expected function");
        };
        let Stmt::Expression(read) = &decl.body[0] else {
            panic!("expected expression statement");
        };

        // Function scope → block scope → outermost scope: two hops.
        assert_eq!(interpreter.locals().get(&variable_id(read)), Some(&2));
    }

    #[test]
    fn this_resolves_one_hop_from_the_method_body() {
        let (statements, interpreter, had_error) =
            resolve_source("class A { m() { return this; } }");

        assert!(!had_error);

        let Stmt::Class { methods, .. } = &statements[0] else {
            panic!("expected class");
        };
        let Stmt::Return {
            value: Some(Expr::This { id, .. }),
            ..
        } = &methods[0].body[0]
        else {
            panic!("expected return this");
        };

        assert_eq!(interpreter.locals().get(id), Some(&1));
    }

    #[test]
    fn super_resolves_one_hop_past_this() {
        let (statements, interpreter, had_error) = resolve_source(
            "class A { m() { return 1; } } class B < A { m() { return super.m; } }",
        );

        assert!(!had_error);

        let Stmt::Class { methods, .. } = &statements[1] else {
            panic!("expected class");
        };
        let Stmt::Return {
            value: Some(Expr::Super { id, .. }),
            ..
        } = &methods[0].body[0]
        else {
            panic!("expected return super.m");
        };

        assert_eq!(interpreter.locals().get(id), Some(&2));
    }

    #[test]
    fn unknown_names_stay_off_the_side_table() {
        let (statements, interpreter, had_error) = resolve_source("undefined_global;");

        assert!(!had_error);

        let Stmt::Expression(read) = &statements[0] else {
            panic!("expected expression statement");
        };

        assert!(interpreter.locals().get(&variable_id(read)).is_none());
    }

    #[test]
    fn resolution_is_idempotent() {
        let source = "var a = 1; { var b = a; fun f() { return a + b; } }";

        let mut reporter = Reporter::new("<test>", source);
        let tokens: Vec<Token> = Scanner::new(source.as_bytes().to_vec())
            .filter_map(Result::ok)
            .collect();
        let statements = Parser::new(tokens, &mut reporter).parse();

        let mut interpreter = Interpreter::new(Vec::new());
        Resolver::new(&mut interpreter, &mut reporter).resolve(&statements);
        let first = interpreter.locals().clone();

        Resolver::new(&mut interpreter, &mut reporter).resolve(&statements);

        assert_eq!(&first, interpreter.locals());
        assert!(!reporter.had_error());
    }

    #[test]
    fn reading_a_variable_in_its_own_initializer_is_an_error() {
        let (_, _, had_error) = resolve_source("{ var a = a; }");
        assert!(had_error);
    }

    #[test]
    fn duplicate_declaration_in_one_scope_is_an_error() {
        let (_, _, had_error) = resolve_source("{ var a = 1; var a = 2; }");
        assert!(had_error);
    }

    #[test]
    fn return_at_top_level_is_an_error() {
        let (_, _, had_error) = resolve_source("return 1;");
        assert!(had_error);
    }

    #[test]
    fn returning_a_value_from_init_is_an_error() {
        let (_, _, had_error) = resolve_source("class A { init() { return 1; } }");
        assert!(had_error);

        let (_, _, bare_return) = resolve_source("class A { init() { return; } }");
        assert!(!bare_return);
    }

    #[test]
    fn this_outside_a_class_is_an_error() {
        let (_, _, had_error) = resolve_source("fun f() { return this; }");
        assert!(had_error);
    }

    #[test]
    fn super_placement_errors() {
        let (_, _, outside) = resolve_source("fun f() { return super.m; }");
        assert!(outside);

        let (_, _, no_superclass) = resolve_source("class A { m() { return super.m; } }");
        assert!(no_superclass);
    }

    #[test]
    fn class_inheriting_from_itself_is_an_error() {
        let (_, _, had_error) = resolve_source("class A < A {}");
        assert!(had_error);
    }

    #[test]
    fn errors_do_not_stop_the_walk() {
        // Both the top-level return and the later self-initializer read
        // must be reported; neither hides the other.
        let source = "return 1; { var a = a; }";

        let mut reporter = Reporter::new("<test>", source);
        let tokens: Vec<Token> = Scanner::new(source.as_bytes().to_vec())
            .filter_map(Result::ok)
            .collect();
        let statements = Parser::new(tokens, &mut reporter).parse();

        let mut interpreter = Interpreter::new(Vec::new());
        Resolver::new(&mut interpreter, &mut reporter).resolve(&statements);

        assert!(reporter.had_error());
        assert!(statements.len() >= 2);
    }
}
