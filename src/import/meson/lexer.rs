//! Tokenizer for `meson.build` files.

use std::fmt;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Number(i64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Question,
    Assign,
    PlusAssign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Newline,
    Eof,
}

/// A token with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Error produced by the lexer or the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Converts source text into tokens.
///
/// Newlines are significant except inside brackets, braces and parentheses.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    nesting: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            nesting: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
            }
            self.position += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.input.get(self.position + i) == Some(&c))
    }

    /// Skip whitespace other than newlines, and comments.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == '#' {
                while let Some(c) = self.current_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else if ch == '\\' && self.peek_char() == Some('\n') {
                self.advance();
                self.advance();
            } else if ch.is_whitespace() && ch != '\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_number(&mut self) -> Result<i64, SyntaxError> {
        let line = self.line;
        let mut digits = String::new();
        let radix = if self.current_char() == Some('0')
            && matches!(self.peek_char(), Some('x') | Some('X'))
        {
            self.advance();
            self.advance();
            16
        } else {
            10
        };
        while let Some(ch) = self.current_char() {
            if ch.is_digit(radix) {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        i64::from_str_radix(&digits, radix).map_err(|_| SyntaxError {
            line,
            message: format!("invalid number `{}`", digits),
        })
    }

    fn read_string(&mut self, quote: char) -> Result<String, SyntaxError> {
        let line = self.line;
        let triple: String = std::iter::repeat(quote).take(3).collect();

        if self.starts_with(&triple) {
            for _ in 0..3 {
                self.advance();
            }
            let mut result = String::new();
            loop {
                if self.starts_with(&triple) {
                    for _ in 0..3 {
                        self.advance();
                    }
                    return Ok(result);
                }
                match self.current_char() {
                    Some(c) => {
                        result.push(c);
                        self.advance();
                    }
                    None => {
                        return Err(SyntaxError {
                            line,
                            message: "unterminated multi-line string".to_string(),
                        })
                    }
                }
            }
        }

        self.advance();
        let mut result = String::new();
        loop {
            match self.current_char() {
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(c) => result.push(c),
                        None => break,
                    }
                    self.advance();
                }
                Some('\n') | None => break,
                Some(c) => {
                    result.push(c);
                    self.advance();
                }
            }
        }
        Err(SyntaxError {
            line,
            message: "unterminated string".to_string(),
        })
    }

    fn next_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        self.skip_whitespace();
        let line = self.line;
        let Some(ch) = self.current_char() else {
            return Ok(Some(Token {
                kind: TokenKind::Eof,
                line,
            }));
        };

        let kind = match ch {
            '\n' => {
                self.advance();
                if self.nesting > 0 {
                    return Ok(None);
                }
                TokenKind::Newline
            }
            '\'' | '"' => TokenKind::Str(self.read_string(ch)?),
            'f' if matches!(self.peek_char(), Some('\'') | Some('"')) => {
                self.advance();
                let quote = self.current_char().unwrap_or('\'');
                TokenKind::Str(self.read_string(quote)?)
            }
            c if c.is_alphabetic() || c == '_' => TokenKind::Ident(self.read_identifier()),
            c if c.is_ascii_digit() => TokenKind::Number(self.read_number()?),
            _ => {
                let two = |a: char, b: char| ch == a && self.peek_char() == Some(b);
                let (kind, width) = if two('+', '=') {
                    (TokenKind::PlusAssign, 2)
                } else if two('=', '=') {
                    (TokenKind::Eq, 2)
                } else if two('!', '=') {
                    (TokenKind::Ne, 2)
                } else if two('<', '=') {
                    (TokenKind::Le, 2)
                } else if two('>', '=') {
                    (TokenKind::Ge, 2)
                } else {
                    let kind = match ch {
                        '(' => TokenKind::LParen,
                        ')' => TokenKind::RParen,
                        '[' => TokenKind::LBracket,
                        ']' => TokenKind::RBracket,
                        '{' => TokenKind::LBrace,
                        '}' => TokenKind::RBrace,
                        ',' => TokenKind::Comma,
                        ':' => TokenKind::Colon,
                        '.' => TokenKind::Dot,
                        '?' => TokenKind::Question,
                        '=' => TokenKind::Assign,
                        '+' => TokenKind::Plus,
                        '-' => TokenKind::Minus,
                        '*' => TokenKind::Star,
                        '/' => TokenKind::Slash,
                        '%' => TokenKind::Percent,
                        '<' => TokenKind::Lt,
                        '>' => TokenKind::Gt,
                        other => {
                            return Err(SyntaxError {
                                line,
                                message: format!("unexpected character `{}`", other),
                            })
                        }
                    };
                    (kind, 1)
                };
                for _ in 0..width {
                    self.advance();
                }
                match kind {
                    TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                        self.nesting += 1
                    }
                    TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                        self.nesting = self.nesting.saturating_sub(1)
                    }
                    _ => {}
                }
                kind
            }
        };

        Ok(Some(Token { kind, line }))
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let Some(token) = self.next_token()? else {
                continue;
            };
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}
