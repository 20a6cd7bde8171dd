//! Recursive descent parser for the Meson language.

use super::lexer::{Lexer, SyntaxError, Token, TokenKind};

/// Binary operators, loosest first within each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Arguments of a function or method call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub positional: Vec<Expr>,
    pub keyword: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Number(i64),
    Bool(bool),
    Array(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Ident(String),
    Call {
        name: String,
        args: Args,
    },
    Method {
        object: Box<Expr>,
        name: String,
        args: Args,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign {
        name: String,
        append: bool,
        value: Expr,
        line: usize,
    },
    Expr {
        expr: Expr,
        line: usize,
    },
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Vec<Stmt>,
        line: usize,
    },
    Foreach {
        vars: Vec<String>,
        iterable: Expr,
        body: Vec<Stmt>,
        line: usize,
    },
    Break,
    Continue,
}

/// Parse a whole `meson.build` file.
pub fn parse(source: &str) -> Result<Vec<Stmt>, SyntaxError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let (body, end) = parser.block(&[])?;
    match end {
        None => Ok(body),
        Some(word) => Err(parser.error(format!("unexpected `{}`", word))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line(),
            message: message.into(),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), SyntaxError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(w) if w == word)
    }

    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }

    fn end_statement(&mut self) -> Result<(), SyntaxError> {
        match self.peek() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            other => Err(self.error(format!("unexpected {:?} after statement", other))),
        }
    }

    /// Parse statements until one of `terminators` (or EOF) is reached.
    ///
    /// Returns the terminator keyword, consumed, or `None` at EOF.
    fn block(&mut self, terminators: &[&str]) -> Result<(Vec<Stmt>, Option<String>), SyntaxError> {
        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                TokenKind::Eof => {
                    if terminators.is_empty() {
                        return Ok((body, None));
                    }
                    return Err(self.error(format!("expected `{}`", terminators.join("` or `"))));
                }
                TokenKind::Ident(word)
                    if matches!(word.as_str(), "elif" | "else" | "endif" | "endforeach") =>
                {
                    let word = word.to_string();
                    if !terminators.contains(&word.as_str()) {
                        return Err(self.error(format!("unexpected `{}`", word)));
                    }
                    self.advance();
                    return Ok((body, Some(word)));
                }
                _ => body.push(self.statement()?),
            }
        }
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        if self.is_keyword("if") {
            self.advance();
            return self.if_statement(line);
        }
        if self.is_keyword("foreach") {
            self.advance();
            return self.foreach_statement(line);
        }
        if self.is_keyword("break") {
            self.advance();
            self.end_statement()?;
            return Ok(Stmt::Break);
        }
        if self.is_keyword("continue") {
            self.advance();
            self.end_statement()?;
            return Ok(Stmt::Continue);
        }

        let expr = self.expression()?;
        let append = match self.peek() {
            TokenKind::Assign => false,
            TokenKind::PlusAssign => true,
            _ => {
                self.end_statement()?;
                return Ok(Stmt::Expr { expr, line });
            }
        };
        let Expr::Ident(name) = expr else {
            return Err(self.error("assignment target must be a variable"));
        };
        self.advance();
        let value = self.expression()?;
        self.end_statement()?;
        Ok(Stmt::Assign {
            name,
            append,
            value,
            line,
        })
    }

    fn if_statement(&mut self, line: usize) -> Result<Stmt, SyntaxError> {
        let mut branches = Vec::new();
        let mut otherwise = Vec::new();
        let mut cond = self.expression()?;
        loop {
            let (body, end) = self.block(&["elif", "else", "endif"])?;
            branches.push((cond, body));
            match end.as_deref() {
                Some("elif") => cond = self.expression()?,
                Some("else") => {
                    let (body, _) = self.block(&["endif"])?;
                    otherwise = body;
                    break;
                }
                _ => break,
            }
        }
        self.end_statement()?;
        Ok(Stmt::If {
            branches,
            otherwise,
            line,
        })
    }

    fn foreach_statement(&mut self, line: usize) -> Result<Stmt, SyntaxError> {
        let mut vars = Vec::new();
        loop {
            match self.advance() {
                TokenKind::Ident(name) => vars.push(name),
                _ => return Err(self.error("expected loop variable")),
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Colon, "`:` in foreach")?;
        let iterable = self.expression()?;
        let (body, _) = self.block(&["endforeach"])?;
        self.end_statement()?;
        Ok(Stmt::Foreach {
            vars,
            iterable,
            body,
            line,
        })
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        let cond = self.or_expr()?;
        if self.eat(&TokenKind::Question) {
            let then = self.expression()?;
            self.expect(TokenKind::Colon, "`:` in ternary")?;
            let otherwise = self.expression()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(cond)
    }

    fn or_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.and_expr()?;
        while self.is_keyword("or") {
            self.advance();
            let rhs = self.and_expr()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.not_expr()?;
        while self.is_keyword("and") {
            self.advance();
            let rhs = self.not_expr()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, SyntaxError> {
        if self.is_keyword("not") {
            self.advance();
            let expr = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.additive()?;
        let (op, width) = match self.peek() {
            TokenKind::Eq => (BinOp::Eq, 1),
            TokenKind::Ne => (BinOp::Ne, 1),
            TokenKind::Lt => (BinOp::Lt, 1),
            TokenKind::Le => (BinOp::Le, 1),
            TokenKind::Gt => (BinOp::Gt, 1),
            TokenKind::Ge => (BinOp::Ge, 1),
            TokenKind::Ident(w) if w == "in" => (BinOp::In, 1),
            TokenKind::Ident(w)
                if w == "not" && matches!(self.peek_at(1), TokenKind::Ident(n) if n == "in") =>
            {
                (BinOp::NotIn, 2)
            }
            _ => return Ok(lhs),
        };
        for _ in 0..width {
            self.advance();
        }
        let rhs = self.additive()?;
        Ok(binary(op, lhs, rhs))
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat(&TokenKind::Minus) {
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let TokenKind::Ident(name) = self.advance() else {
                        return Err(self.error("expected method name after `.`"));
                    };
                    self.expect(TokenKind::LParen, "`(` after method name")?;
                    let args = self.arguments()?;
                    expr = Expr::Method {
                        object: Box::new(expr),
                        name,
                        args,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket, "`]`")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.advance() {
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Ident(word) => match word.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                _ if self.peek() == &TokenKind::LParen => {
                    self.advance();
                    let args = self.arguments()?;
                    Ok(Expr::Call { name: word, args })
                }
                _ => Ok(Expr::Ident(word)),
            },
            TokenKind::LParen => {
                let expr = self.expression()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                while !self.eat(&TokenKind::RBracket) {
                    items.push(self.expression()?);
                    if !self.eat(&TokenKind::Comma) {
                        self.expect(TokenKind::RBracket, "`]`")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            TokenKind::LBrace => {
                let mut entries = Vec::new();
                while !self.eat(&TokenKind::RBrace) {
                    let key = self.expression()?;
                    self.expect(TokenKind::Colon, "`:` in dictionary")?;
                    let value = self.expression()?;
                    entries.push((key, value));
                    if !self.eat(&TokenKind::Comma) {
                        self.expect(TokenKind::RBrace, "`}`")?;
                        break;
                    }
                }
                Ok(Expr::Dict(entries))
            }
            TokenKind::Eof => Err(self.error("unexpected end of file")),
            other => Err(self.error(format!("unexpected {:?}", other))),
        }
    }

    /// Parse call arguments after the opening `(`, consuming the `)`.
    fn arguments(&mut self) -> Result<Args, SyntaxError> {
        let mut args = Args::default();
        while !self.eat(&TokenKind::RParen) {
            let expr = self.expression()?;
            if self.eat(&TokenKind::Colon) {
                let Expr::Ident(key) = expr else {
                    return Err(self.error("keyword argument name must be an identifier"));
                };
                let value = self.expression()?;
                args.keyword.push((key, value));
            } else {
                args.positional.push(expr);
            }
            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RParen, "`)` to close the call")?;
                break;
            }
        }
        Ok(args)
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_with_keyword_arguments() {
        let stmts = parse("executable('app', 'main.cpp', install: true)\n").unwrap();
        let [Stmt::Expr {
            expr: Expr::Call { name, args },
            line: 1,
        }] = stmts.as_slice()
        else {
            panic!("unexpected parse: {:?}", stmts);
        };
        assert_eq!(name, "executable");
        assert_eq!(args.positional.len(), 2);
        assert_eq!(args.keyword[0].0, "install");
        assert_eq!(args.keyword[0].1, Expr::Bool(true));
    }

    #[test]
    fn test_assignment_and_append() {
        let stmts = parse("src = ['a.c']\nsrc += 'b.c'\n").unwrap();
        assert!(matches!(&stmts[0], Stmt::Assign { name, append: false, .. } if name == "src"));
        assert!(matches!(&stmts[1], Stmt::Assign { append: true, line: 2, .. }));
    }

    #[test]
    fn test_if_elif_else() {
        let src = "if a\n x = 1\nelif b\n x = 2\nelse\n x = 3\nendif\n";
        let stmts = parse(src).unwrap();
        let Stmt::If {
            branches,
            otherwise,
            ..
        } = &stmts[0]
        else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(otherwise.len(), 1);
    }

    #[test]
    fn test_foreach_with_break() {
        let src = "foreach k, v : d\n  if k == 'x'\n    break\n  endif\nendforeach\n";
        let stmts = parse(src).unwrap();
        let Stmt::Foreach { vars, body, .. } = &stmts[0] else {
            panic!("expected foreach");
        };
        assert_eq!(vars, &["k", "v"]);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_method_index_ternary() {
        let stmts = parse("x = cc.get_id() == 'gcc' ? a[0] : not b\n").unwrap();
        let Stmt::Assign { value, .. } = &stmts[0] else {
            panic!("expected assignment");
        };
        let Expr::Ternary { cond, then, .. } = value else {
            panic!("expected ternary");
        };
        assert!(matches!(**cond, Expr::Binary { op: BinOp::Eq, .. }));
        assert!(matches!(**then, Expr::Index { .. }));
    }

    #[test]
    fn test_precedence() {
        let stmts = parse("x = 1 + 2 * 3\n").unwrap();
        let Stmt::Assign { value, .. } = &stmts[0] else {
            panic!("expected assignment");
        };
        let Expr::Binary { op, rhs, .. } = value else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_not_in() {
        let stmts = parse("y = 'a' not in list\n").unwrap();
        assert!(matches!(
            &stmts[0],
            Stmt::Assign { value: Expr::Binary { op: BinOp::NotIn, .. }, .. }
        ));
    }

    #[test]
    fn test_dict_and_multiline_array() {
        let stmts = parse("d = {'a': 1,\n 'b': [\n 2,\n 3,\n ]}\n").unwrap();
        let Stmt::Assign { value: Expr::Dict(entries), .. } = &stmts[0] else {
            panic!("expected dict");
        };
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_unclosed_if_is_error() {
        let err = parse("if true\n x = 1\n").unwrap_err();
        assert!(err.message.contains("endif"));
    }

    #[test]
    fn test_stray_endif_is_error() {
        let err = parse("x = 1\nendif\n").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
