use std::iter::FusedIterator;

use log::{debug, info};
use phf::phf_map;

use crate::error::VesperError;
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and" => TokenType::AND,
    b"class" => TokenType::CLASS,
    b"else" => TokenType::ELSE,
    b"false" => TokenType::FALSE,
    b"fun" => TokenType::FUN,
    b"for" => TokenType::FOR,
    b"if" => TokenType::IF,
    b"nil" => TokenType::NIL,
    b"or" => TokenType::OR,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"var" => TokenType::VAR,
    b"while" => TokenType::WHILE,
};

const TAB_WIDTH: usize = 4;

/// Single-pass, character-driven scanner over the raw source bytes.
///
/// Produced as an iterator of `Result<Token, VesperError>`: bad characters
/// and unterminated strings surface as `Err` items and scanning continues
/// with the next byte, so one malformed lexeme never hides the rest of the
/// stream. The final item is always the `EOF` sentinel.
#[derive(Debug, Clone)]
pub struct Scanner {
    source: Vec<u8>,
    start: usize,
    curr_ptr: usize,
    line: usize,
    column: usize,
    pending_token: Option<TokenType>,
}

impl Scanner {
    pub fn new(buf: Vec<u8>) -> Self {
        info!("Initializing Scanner with buffer of {} bytes", buf.len());
        Self {
            source: buf,
            start: 0,
            curr_ptr: 0,
            line: 1,
            column: 0,
            pending_token: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    fn scan_token(&mut self) -> Result<(), VesperError> {
        let byte: u8 = self.advance();
        debug!(
            "Scanning byte '{}' at line {}, column {}",
            byte as char, self.line, self.column
        );

        match byte {
            b'(' => self.add_token(TokenType::LPAREN),

            b')' => self.add_token(TokenType::RPAREN),

            b'{' => self.add_token(TokenType::LBRACE),

            b'}' => self.add_token(TokenType::RBRACE),

            b',' => self.add_token(TokenType::COMMA),

            b'.' => self.add_token(TokenType::DOT),

            b';' => self.add_token(TokenType::SEMICOLON),

            b'+' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::PLUS_EQ
                } else {
                    TokenType::PLUS
                };
                self.add_token(token_type);
            }

            b'-' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::MINUS_EQ
                } else {
                    TokenType::MINUS
                };
                self.add_token(token_type);
            }

            b'*' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::STAR_EQ
                } else {
                    TokenType::STAR
                };
                self.add_token(token_type);
            }

            b'%' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::PERCENT_EQ
                } else {
                    TokenType::PERCENT
                };
                self.add_token(token_type);
            }

            b'!' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::BANG_EQ
                } else {
                    TokenType::BANG
                };
                self.add_token(token_type);
            }

            b'=' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::EQ_EQ
                } else {
                    TokenType::EQ
                };
                self.add_token(token_type);
            }

            b'<' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::LT_EQ
                } else {
                    TokenType::LT
                };
                self.add_token(token_type);
            }

            b'>' => {
                let token_type: TokenType = if self.match_byte(b'=') {
                    TokenType::GT_EQ
                } else {
                    TokenType::GT
                };
                self.add_token(token_type);
            }

            b'/' => {
                if self.match_byte(b'/') {
                    debug!("Found comment, skipping until newline");
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_byte(b'=') {
                    self.add_token(TokenType::SLASH_EQ);
                } else {
                    self.add_token(TokenType::SLASH);
                }
            }

            // Whitespace: column/line accounting already happened in advance().
            b' ' | b'\r' | b'\t' | b'\n' => {}

            b'"' => {
                self.parse_string()?;
            }

            b'0'..=b'9' => {
                self.parse_number();
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            _ => {
                debug!(
                    "Unexpected character '{}' at line {}",
                    byte as char, self.line
                );

                return Err(VesperError::lex(
                    self.line,
                    self.column.saturating_sub(1),
                    format!("Unexpected character: {}", byte as char),
                ));
            }
        }

        Ok(())
    }

    fn parse_string(&mut self) -> Result<(), VesperError> {
        debug!("Parsing string literal at line {}", self.line);

        // Strings may span lines; advance() keeps the line counter honest.
        while !self.is_at_end() && self.peek() != b'"' {
            self.advance();
        }

        if self.is_at_end() {
            debug!("Unterminated string at line {}", self.line);

            return Err(VesperError::lex(
                self.line,
                self.column,
                "Unterminated string.",
            ));
        }

        self.advance();

        let parsed_string: String = String::from_utf8_lossy(
            &self.source[self.start + 1..self.curr_ptr - 1],
        )
        .into_owned();

        info!("Parsed string literal: {}", parsed_string);

        self.add_token(TokenType::STRING(parsed_string));

        Ok(())
    }

    fn parse_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A trailing '.' belongs to the next token unless digits follow.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let parsed_number: String =
            String::from_utf8_lossy(&self.source[self.start..self.curr_ptr]).into_owned();

        let number: f64 = parsed_number.parse().unwrap_or(0.0);

        info!("Parsed number: {}", number);

        self.add_token(TokenType::NUMBER(number));
    }

    fn parse_identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        let text: &[u8] = &self.source[self.start..self.curr_ptr];

        match KEYWORDS.get(text) {
            Some(token_type) => {
                debug!("Parsed keyword: {}", String::from_utf8_lossy(text));

                self.add_token(token_type.clone());
            }

            None => {
                debug!("Parsed identifier: {}", String::from_utf8_lossy(text));

                self.add_token(TokenType::IDENTIFIER);
            }
        }
    }

    #[inline]
    fn add_token(&mut self, token_type: TokenType) {
        self.pending_token = Some(token_type);
    }

    #[inline]
    fn advance(&mut self) -> u8 {
        let byte = self.source[self.curr_ptr];

        self.curr_ptr += 1;

        match byte {
            b'\n' => {
                self.line += 1;
                self.column = 0;
            }

            // Tabs occupy four columns so carets line up under expanded output.
            b'\t' => self.column += TAB_WIDTH,

            _ => self.column += 1,
        }

        byte
    }

    #[inline]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.curr_ptr] != expected {
            false
        } else {
            self.advance();

            true
        }
    }

    #[inline]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.curr_ptr]
        }
    }

    #[inline]
    fn peek_next(&self) -> u8 {
        if self.curr_ptr + 1 >= self.len() {
            0
        } else {
            self.source[self.curr_ptr + 1]
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.curr_ptr >= self.len()
    }
}

impl Iterator for Scanner {
    type Item = Result<Token, VesperError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_at_end() {
            if self.curr_ptr == self.len() {
                self.curr_ptr += 1;

                info!("Reached EOF at line {}", self.line);

                return Some(Ok(Token::new(
                    TokenType::EOF,
                    String::new(),
                    self.line,
                    self.column,
                )));
            }

            return None;
        }

        self.pending_token = None;

        self.start = self.curr_ptr;

        let result: Result<(), VesperError> = self.scan_token();

        if let Err(e) = result {
            return Some(Err(e));
        }

        if let Some(token_type) = self.pending_token.take() {
            let lexeme: String =
                String::from_utf8_lossy(&self.source[self.start..self.curr_ptr]).into_owned();

            // Column of the lexeme start, per the tab-aware column counter.
            let column: usize = self.column.saturating_sub(lexeme.len());

            debug!(
                "Emitting token: type={:?}, lexeme={}, line={}, column={}",
                token_type, lexeme, self.line, column
            );

            Some(Ok(Token::new(token_type, lexeme, self.line, column)))
        } else {
            self.next()
        }
    }
}

impl FusedIterator for Scanner {}
