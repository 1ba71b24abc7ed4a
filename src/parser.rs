//! Recursive-descent parser.
//!
//! Grammar as documented in `grammar.md`: one parsing method per precedence
//! level, tightest binding at the bottom. Errors are reported to the shared
//! sink at the point of detection; a failed declaration triggers panic-mode
//! synchronization to the next likely statement boundary and is replaced by
//! an inert `Expression(Literal(nil))` so the statement list keeps its shape.
//! Compound assignments (`+=` and friends) and `for` loops are desugared
//! here rather than carried as dedicated AST nodes.

use std::rc::Rc;

use crate::diagnostics::Reporter;
use crate::error::VesperError;
use crate::expr::{next_node_id, Expr};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

type PResult<T> = Result<T, VesperError>;

pub struct Parser<'r> {
    tokens: Vec<Token>,
    current: usize,
    reporter: &'r mut Reporter,
}

impl<'r> Parser<'r> {
    pub fn new(tokens: Vec<Token>, reporter: &'r mut Reporter) -> Self {
        Parser {
            tokens,
            current: 0,
            reporter,
        }
    }

    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements: Vec<Stmt> = Vec::new();

        if self.tokens.is_empty() {
            return statements;
        }

        while !self.is_at_end() {
            statements.push(self.declaration());
        }

        statements
    }

    // ─────────────────────────────────────────────────────────────────────
    // Declarations
    // ─────────────────────────────────────────────────────────────────────

    fn declaration(&mut self) -> Stmt {
        let result: PResult<Stmt> = if self.match_token(&TokenType::VAR) {
            self.var_declaration()
        } else if self.match_token(&TokenType::FUN) {
            self.function("function").map(Stmt::Function)
        } else if self.match_token(&TokenType::CLASS) {
            self.class_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => stmt,

            // Already reported; discard tokens to the next boundary and
            // substitute a statement that evaluates to nothing.
            Err(_) => {
                self.synchronize();
                self.inert_statement()
            }
        }
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect variable name.")?;

        let initializer: Option<Expr> = if self.match_token(&TokenType::EQ) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "Expect class name.")?;

        let superclass: Option<Expr> = if self.match_token(&TokenType::LT) {
            let superclass_name: Token =
                self.consume(TokenType::IDENTIFIER, "Expect superclass name.")?;

            Some(Expr::Variable {
                id: next_node_id(),
                name: superclass_name,
            })
        } else {
            None
        };

        self.consume(TokenType::LBRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(&TokenType::RBRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RBRACE, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: &str) -> PResult<Rc<FunctionDecl>> {
        let name: Token =
            self.consume(TokenType::IDENTIFIER, &format!("Expect {} name.", kind))?;

        self.consume(
            TokenType::LPAREN,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(&TokenType::RPAREN) {
            loop {
                if params.len() == 254 {
                    let token: Token = self.peek().clone();
                    self.error(&token, "Cannot have more than 255 parameters.");
                }

                params.push(self.consume(TokenType::IDENTIFIER, "Expect parameter name.")?);

                if !self.match_token(&TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RPAREN, "Expect ')' after parameters.")?;

        self.consume(
            TokenType::LBRACE,
            &format!("Expect '{{' before {} body.", kind),
        )?;

        let body: Vec<Stmt> = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn statement(&mut self) -> PResult<Stmt> {
        if self.match_token(&TokenType::FOR) {
            return self.for_statement();
        }

        if self.match_token(&TokenType::IF) {
            return self.if_statement();
        }

        if self.match_token(&TokenType::RETURN) {
            return self.return_statement();
        }

        if self.match_token(&TokenType::WHILE) {
            return self.while_statement();
        }

        if self.match_token(&TokenType::LBRACE) {
            return Ok(Stmt::Block(self.block()?));
        }

        self.expression_statement()
    }

    /// `for (init; cond; inc) body` lowers to
    /// `{ init; while (cond) { body; inc; } }` with an omitted condition
    /// replaced by a literal `true`.
    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LPAREN, "Expect '(' after 'for'.")?;

        let initializer: Option<Stmt> = if self.match_token(&TokenType::SEMICOLON) {
            None
        } else if self.match_token(&TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition: Option<Expr> = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment: Option<Expr> = if !self.check(&TokenType::RPAREN) {
            Some(self.expression()?)
        } else {
            None
        };

        let paren: Token = self.consume(TokenType::RPAREN, "Expect ')' after for clauses.")?;

        let body: Stmt = self.statement()?;

        let mut loop_body: Vec<Stmt> = vec![body];
        if let Some(inc) = increment {
            loop_body.push(Stmt::Expression(inc));
        }

        let condition: Expr = condition.unwrap_or_else(|| {
            Expr::Literal(Token::new(
                TokenType::TRUE,
                "true".to_string(),
                paren.line,
                paren.column,
            ))
        });

        let loop_stmt = Stmt::While {
            condition,
            body: Box::new(Stmt::Block(loop_body)),
        };

        let mut desugared: Vec<Stmt> = Vec::new();
        if let Some(init) = initializer {
            desugared.push(init);
        }
        desugared.push(loop_stmt);

        Ok(Stmt::Block(desugared))
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LPAREN, "Expect '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RPAREN, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);

        let else_branch: Option<Box<Stmt>> = if self.match_token(&TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword: Token = self.previous().clone();

        let value: Option<Expr> = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenType::LPAREN, "Expect '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RPAREN, "Expect ')' after condition.")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(&TokenType::RBRACE) && !self.is_at_end() {
            statements.push(self.declaration());
        }

        self.consume(TokenType::RBRACE, "Expect '}' after block.")?;

        Ok(statements)
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions, loosest binding first
    // ─────────────────────────────────────────────────────────────────────

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr: Expr = self.or_expr()?;

        if self.match_tokens(&[
            TokenType::EQ,
            TokenType::PLUS_EQ,
            TokenType::MINUS_EQ,
            TokenType::STAR_EQ,
            TokenType::SLASH_EQ,
            TokenType::PERCENT_EQ,
        ]) {
            let op_token: Token = self.previous().clone();
            let value: Expr = self.assignment()?;
            let operator: Option<Token> = Self::compound_operator(&op_token);

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    id: next_node_id(),
                    name,
                    operator,
                    value: Box::new(value),
                }),

                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    operator,
                    value: Box::new(value),
                }),

                // Report without raising: the rest of the expression parsed
                // fine and synchronization here would swallow valid input.
                other => {
                    self.error(&op_token, "Invalid assignment target.");
                    Ok(other)
                }
            };
        }

        Ok(expr)
    }

    /// The arithmetic token a compound assignment desugars through, or
    /// `None` for plain `=`.
    fn compound_operator(op_token: &Token) -> Option<Token> {
        let mapped: Option<(TokenType, &str)> = match op_token.token_type {
            TokenType::PLUS_EQ => Some((TokenType::PLUS, "+")),
            TokenType::MINUS_EQ => Some((TokenType::MINUS, "-")),
            TokenType::STAR_EQ => Some((TokenType::STAR, "*")),
            TokenType::SLASH_EQ => Some((TokenType::SLASH, "/")),
            TokenType::PERCENT_EQ => Some((TokenType::PERCENT, "%")),
            _ => None,
        };

        mapped.map(|(token_type, lexeme)| {
            Token::new(
                token_type,
                lexeme.to_string(),
                op_token.line,
                op_token.column,
            )
        })
    }

    fn or_expr(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.and_expr()?;

        while self.match_token(&TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.and_expr()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and_expr(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.match_token(&TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.match_tokens(&[TokenType::BANG_EQ, TokenType::EQ_EQ]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.term()?;

        while self.match_tokens(&[
            TokenType::GT,
            TokenType::GT_EQ,
            TokenType::LT,
            TokenType::LT_EQ,
        ]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.factor()?;

        while self.match_tokens(&[TokenType::MINUS, TokenType::PLUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.match_tokens(&[TokenType::SLASH, TokenType::STAR, TokenType::PERCENT]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.match_tokens(&[TokenType::BANG, TokenType::MINUS]) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.match_token(&TokenType::LPAREN) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(&TokenType::DOT) {
                let name: Token =
                    self.consume(TokenType::IDENTIFIER, "Expect property name after '.'.")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(&TokenType::RPAREN) {
            loop {
                if arguments.len() == 254 {
                    let token: Token = self.peek().clone();
                    self.error(&token, "Cannot have more than 255 arguments.");
                }

                arguments.push(self.expression()?);

                if !self.match_token(&TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RPAREN, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.match_tokens(&[
            TokenType::NUMBER(0.0),
            TokenType::STRING(String::new()),
            TokenType::TRUE,
            TokenType::FALSE,
            TokenType::NIL,
        ]) {
            return Ok(Expr::Literal(self.previous().clone()));
        }

        if self.match_token(&TokenType::SUPER) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::DOT, "Expect '.' after 'super'.")?;
            let method: Token =
                self.consume(TokenType::IDENTIFIER, "Expect superclass method name.")?;

            return Ok(Expr::Super {
                id: next_node_id(),
                keyword,
                method,
            });
        }

        if self.match_token(&TokenType::THIS) {
            return Ok(Expr::This {
                id: next_node_id(),
                keyword: self.previous().clone(),
            });
        }

        if self.match_token(&TokenType::IDENTIFIER) {
            return Ok(Expr::Variable {
                id: next_node_id(),
                name: self.previous().clone(),
            });
        }

        if self.match_token(&TokenType::LPAREN) {
            let expr: Expr = self.expression()?;
            self.consume(TokenType::RPAREN, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        let token: Token = self.peek().clone();
        Err(self.error(&token, "Expect expression."))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Recovery
    // ─────────────────────────────────────────────────────────────────────

    /// Discard tokens until just past a semicolon or just before a keyword
    /// that plausibly starts a declaration.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::RETURN => return,

                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Placeholder for a declaration lost to panic-mode recovery. Evaluates
    /// to nothing; the program never runs anyway because the error above it
    /// set the sink's flag.
    fn inert_statement(&self) -> Stmt {
        let anchor: &Token = self.previous();

        Stmt::Expression(Expr::Literal(Token::new(
            TokenType::NIL,
            "nil".to_string(),
            anchor.line,
            anchor.column,
        )))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Token-stream helpers
    // ─────────────────────────────────────────────────────────────────────

    fn match_token(&mut self, token_type: &TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_tokens(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.match_token(token_type) {
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: &TokenType) -> bool {
        &self.peek().token_type == token_type
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> PResult<Token> {
        if self.check(&token_type) {
            return Ok(self.advance().clone());
        }

        let token: Token = self.peek().clone();
        Err(self.error(&token, message))
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    /// Report a parse error to the sink and hand it back for the caller to
    /// raise (or drop, for non-fatal diagnostics like the argument limit).
    fn error(&mut self, token: &Token, message: &str) -> VesperError {
        let err = VesperError::parse(token, message);
        self.reporter.report(&err);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn parse_source(source: &str) -> (Vec<Stmt>, bool) {
        let mut reporter = Reporter::new("<test>", source);
        let tokens: Vec<Token> = Scanner::new(source.as_bytes().to_vec())
            .filter_map(Result::ok)
            .collect();

        let statements = Parser::new(tokens, &mut reporter).parse();
        let had_error = reporter.had_error();

        (statements, had_error)
    }

    #[test]
    fn compound_assignment_desugars_to_tagged_assign() {
        let (statements, had_error) = parse_source("a += 1;");

        assert!(!had_error);
        assert_eq!(statements.len(), 1);

        match &statements[0] {
            Stmt::Expression(Expr::Assign { name, operator, .. }) => {
                assert_eq!(name.lexeme, "a");
                let op = operator.as_ref().expect("compound tag");
                assert_eq!(op.token_type, TokenType::PLUS);
                assert_eq!(op.lexeme, "+");
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn plain_assignment_carries_no_operator() {
        let (statements, _) = parse_source("a = 1;");

        match &statements[0] {
            Stmt::Expression(Expr::Assign { operator, .. }) => assert!(operator.is_none()),
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn compound_property_assignment_desugars_to_tagged_set() {
        let (statements, had_error) = parse_source("o.f *= 2;");

        assert!(!had_error);

        match &statements[0] {
            Stmt::Expression(Expr::Set { name, operator, .. }) => {
                assert_eq!(name.lexeme, "f");
                assert_eq!(
                    operator.as_ref().expect("compound tag").token_type,
                    TokenType::STAR
                );
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn for_loop_desugars_to_block_with_while() {
        let (statements, had_error) = parse_source("for (var i = 0; i < 3; i = i + 1) i;");

        assert!(!had_error);
        assert_eq!(statements.len(), 1);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected outer block, got {:?}", statements[0]);
        };
        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[0], Stmt::Var { .. }));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while, got {:?}", outer[1]);
        };
        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected inner block");
        };
        assert_eq!(inner.len(), 2);
        assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn for_loop_without_condition_uses_literal_true() {
        let (statements, had_error) = parse_source("for (;;) i;");

        assert!(!had_error);

        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected block");
        };
        let Stmt::While { condition, .. } = &outer[0] else {
            panic!("expected while");
        };
        match condition {
            Expr::Literal(token) => assert_eq!(token.token_type, TokenType::TRUE),
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn invalid_assignment_target_reports_but_keeps_parsing() {
        let (statements, had_error) = parse_source("1 = 2; var ok = 3;");

        assert!(had_error);
        assert_eq!(statements.len(), 2);
        assert!(matches!(statements[1], Stmt::Var { .. }));
    }

    #[test]
    fn broken_declaration_does_not_mask_later_errors() {
        // Two independently broken declarations, one valid one in between.
        let (statements, had_error) = parse_source("var = 1; var ok = 2; fun (x) {}");

        assert!(had_error);
        // One inert placeholder per broken declaration, plus the valid var.
        assert_eq!(statements.len(), 3);
        assert!(matches!(statements[1], Stmt::Var { .. }));
    }

    #[test]
    fn missing_semicolon_reports_at_end() {
        let (_, had_error) = parse_source("var x = 1");
        assert!(had_error);
    }
}
