// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::*;
use crate::value::*;

type Result<T> = core::result::Result<T, ParseError>;

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Operands one flat operator or postfix chain may hold. Chains build
/// left-nested trees, so they are bounded separately from nesting depth.
pub const MAX_CHAIN_LENGTH: usize = 1024;

// Words that belong to the host language but have no meaning in conditions.
const RESERVED: [&str; 28] = [
    "async",
    "await",
    "catch",
    "class",
    "const",
    "debugger",
    "delete",
    "do",
    "else",
    "export",
    "for",
    "function",
    "if",
    "import",
    "instanceof",
    "let",
    "new",
    "return",
    "this",
    "throw",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
    "in",
];

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    end: u32,
    depth: usize,
    max_depth: usize,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            end: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String => "",
        }
    }

    fn is_symbol(&self, text: &str) -> bool {
        self.tok.0 == TokenKind::Symbol && self.tok.1.text() == text
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.end = self.tok.1.end;
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn peek_token(&self) -> Result<Token> {
        self.lexer.clone().next_token()
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.tok.0 != TokenKind::String && self.token_text() == text {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.source.error(self.tok.1.line, self.tok.1.col, &msg))
        }
    }

    // Brackets, call arguments, ternary branches and unary operators nest.
    // Chained binary operators do not.
    fn deepen(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.source.error(
                self.tok.1.line,
                self.tok.1.col,
                &format!("expression nesting exceeds maximum depth {}", self.max_depth),
            ));
        }
        Ok(())
    }

    fn extend_chain(&self, len: &mut usize) -> Result<()> {
        *len += 1;
        if *len >= MAX_CHAIN_LENGTH {
            return Err(self.tok.1.error(&format!(
                "operator chain exceeds maximum length {MAX_CHAIN_LENGTH}"
            )));
        }
        Ok(())
    }

    fn span_from(&self, start: &Span) -> Span {
        let mut span = start.clone();
        span.end = self.end;
        span
    }

    fn parse_array(&mut self) -> Result<Expr> {
        let start = self.tok.1.clone();
        self.next_token()?;
        let mut items = vec![];
        while !self.is_symbol("]") {
            items.push(Ref::new(self.parse_expr()?));
            if !self.is_symbol(",") {
                break;
            }
            self.next_token()?;
        }
        self.expect("]", "while parsing array")?;
        Ok(Expr::Array {
            span: self.span_from(&start),
            items,
        })
    }

    fn parse_parens_expr(&mut self) -> Result<Expr> {
        self.next_token()?;
        let expr = self.parse_expr()?;
        self.expect(")", "while parsing parenthesized expression")?;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let span = self.tok.1.clone();
        match self.tok.0 {
            TokenKind::Number => {
                let value = match span.text().parse::<f64>() {
                    Ok(n) => Value::Number(n),
                    Err(_) => return Err(span.error("invalid number")),
                };
                self.next_token()?;
                Ok(Expr::Literal { span, value })
            }
            TokenKind::String => {
                let value = Value::from(unescape(&span)?);
                self.next_token()?;
                Ok(Expr::Literal { span, value })
            }
            TokenKind::Ident => {
                let value = match span.text() {
                    "true" => Some(Value::Bool(true)),
                    "false" => Some(Value::Bool(false)),
                    "null" => Some(Value::Null),
                    "undefined" => Some(Value::Undefined),
                    w if RESERVED.contains(&w) => {
                        return Err(span.error(&format!("`{w}` is not supported")))
                    }
                    _ => None,
                };
                if let Some(value) = value {
                    self.next_token()?;
                    return Ok(Expr::Literal { span, value });
                }
                if self.peek_token()?.1.text() == "=>" {
                    return Err(span.error("arrow functions are only allowed as call arguments"));
                }
                self.next_token()?;
                Ok(Expr::Ident {
                    name: span.text().into(),
                    span,
                })
            }
            TokenKind::Symbol => match span.text() {
                "(" => self.parse_parens_expr(),
                "[" => self.parse_array(),
                "{" => Err(span.error("object literals are not supported")),
                _ => Err(span.error("expecting expression")),
            },
            TokenKind::Eof => Err(span.error("unexpected end of expression")),
        }
    }

    fn parse_call_arg(&mut self) -> Result<Expr> {
        if self.tok.0 == TokenKind::Ident && self.peek_token()?.1.text() == "=>" {
            let start = self.tok.1.clone();
            let param = self.tok.1.clone();
            if RESERVED.contains(&param.text()) {
                return Err(param.error("invalid parameter name"));
            }
            self.next_token()?;
            self.next_token()?;
            let body = self.parse_expr()?;
            return Ok(Expr::Lambda {
                span: self.span_from(&start),
                param,
                body: Ref::new(body),
            });
        }
        self.parse_expr()
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.clone();
        let mut term = self.parse_primary()?;
        let mut operands = 0;

        loop {
            if self.tok.0 != TokenKind::Symbol {
                break;
            }
            match self.tok.1.text() {
                "." => {
                    self.extend_chain(&mut operands)?;
                    self.next_token()?;
                    if self.tok.0 != TokenKind::Ident {
                        return Err(self.tok.1.error("expecting property name after `.`"));
                    }
                    let property = self.tok.1.clone();
                    self.next_token()?;
                    term = Expr::Member {
                        span: self.span_from(&start),
                        object: Ref::new(term),
                        property,
                    };
                }
                "[" => {
                    self.extend_chain(&mut operands)?;
                    self.next_token()?;
                    let index = self.parse_expr()?;
                    self.expect("]", "while parsing index expression")?;
                    term = Expr::Index {
                        span: self.span_from(&start),
                        object: Ref::new(term),
                        index: Ref::new(index),
                    };
                }
                "(" => {
                    self.extend_chain(&mut operands)?;
                    self.next_token()?;
                    let mut params = vec![];
                    while !self.is_symbol(")") {
                        params.push(Ref::new(self.parse_call_arg()?));
                        if !self.is_symbol(",") {
                            break;
                        }
                        self.next_token()?;
                    }
                    self.expect(")", "while parsing call expression")?;
                    term = Expr::Call {
                        span: self.span_from(&start),
                        fcn: Ref::new(term),
                        params,
                    };
                }
                _ => break,
            }
        }

        Ok(term)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        let op = match self.tok.0 {
            TokenKind::Symbol if self.tok.1.text() == "!" => UnaryOp::Not,
            TokenKind::Symbol if self.tok.1.text() == "-" => UnaryOp::Neg,
            TokenKind::Symbol if self.tok.1.text() == "+" => {
                return Err(self.tok.1.error("unary `+` is not supported"))
            }
            _ => return self.parse_postfix_expr(),
        };
        let start = self.tok.1.clone();
        self.deepen()?;
        self.next_token()?;
        let expr = self.parse_unary_expr()?;
        self.depth -= 1;
        Ok(Expr::UnaryExpr {
            span: self.span_from(&start),
            op,
            expr: Ref::new(expr),
        })
    }

    fn parse_mul_div_mod_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.clone();
        let mut operands = 0;
        let mut expr = self.parse_unary_expr()?;

        loop {
            let op = match self.tok.0 {
                TokenKind::Symbol => match self.tok.1.text() {
                    "*" => ArithOp::Mul,
                    "/" => ArithOp::Div,
                    "%" => ArithOp::Mod,
                    _ => break,
                },
                _ => break,
            };
            self.extend_chain(&mut operands)?;
            self.next_token()?;
            let right = self.parse_unary_expr()?;
            expr = Expr::ArithExpr {
                span: self.span_from(&start),
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_arith_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.clone();
        let mut operands = 0;
        let mut expr = self.parse_mul_div_mod_expr()?;

        loop {
            let op = match self.tok.0 {
                TokenKind::Symbol => match self.tok.1.text() {
                    "+" => ArithOp::Add,
                    "-" => ArithOp::Sub,
                    _ => break,
                },
                _ => break,
            };
            self.extend_chain(&mut operands)?;
            self.next_token()?;
            let right = self.parse_mul_div_mod_expr()?;
            expr = Expr::ArithExpr {
                span: self.span_from(&start),
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.clone();
        let mut operands = 0;
        let mut expr = self.parse_arith_expr()?;

        loop {
            let op = match (&self.tok.0, self.tok.1.text()) {
                (TokenKind::Symbol, "<") => BoolOp::Lt,
                (TokenKind::Symbol, "<=") => BoolOp::Le,
                (TokenKind::Symbol, ">") => BoolOp::Gt,
                (TokenKind::Symbol, ">=") => BoolOp::Ge,
                (TokenKind::Ident, "in") => BoolOp::In,
                _ => break,
            };
            self.extend_chain(&mut operands)?;
            self.next_token()?;
            let right = self.parse_arith_expr()?;
            expr = Expr::BoolExpr {
                span: self.span_from(&start),
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.clone();
        let mut operands = 0;
        let mut expr = self.parse_relational_expr()?;

        loop {
            let op = match self.tok.0 {
                TokenKind::Symbol => match self.tok.1.text() {
                    "===" => BoolOp::StrictEq,
                    "!==" => BoolOp::StrictNe,
                    "==" => BoolOp::LooseEq,
                    "!=" => BoolOp::LooseNe,
                    "=" => return Err(self.tok.1.error("assignment is not supported")),
                    _ => break,
                },
                _ => break,
            };
            self.extend_chain(&mut operands)?;
            self.next_token()?;
            let right = self.parse_relational_expr()?;
            expr = Expr::BoolExpr {
                span: self.span_from(&start),
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_logical_expr(&mut self, op: LogicalOp) -> Result<Expr> {
        let start = self.tok.1.clone();
        let mut operands = 0;
        let (symbol, mut expr) = match op {
            LogicalOp::And => ("&&", self.parse_equality_expr()?),
            LogicalOp::Or => ("||", self.parse_logical_expr(LogicalOp::And)?),
        };

        while self.is_symbol(symbol) {
            self.extend_chain(&mut operands)?;
            self.next_token()?;
            let right = match op {
                LogicalOp::And => self.parse_equality_expr()?,
                LogicalOp::Or => self.parse_logical_expr(LogicalOp::And)?,
            };
            expr = Expr::LogicalExpr {
                span: self.span_from(&start),
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_conditional_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.clone();
        let test = self.parse_logical_expr(LogicalOp::Or)?;
        if !self.is_symbol("?") {
            return Ok(test);
        }
        self.next_token()?;
        let consequent = self.parse_expr()?;
        self.expect(":", "while parsing conditional expression")?;
        let alternate = self.parse_expr()?;
        Ok(Expr::Conditional {
            span: self.span_from(&start),
            test: Ref::new(test),
            consequent: Ref::new(consequent),
            alternate: Ref::new(alternate),
        })
    }

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.deepen()?;
        let expr = self.parse_conditional_expr()?;
        self.depth -= 1;
        Ok(expr)
    }

    /// Parse a complete expression. Trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Ref<Expr>> {
        if self.tok.0 == TokenKind::Eof {
            return Err(self.tok.1.error("empty expression"));
        }
        let expr = self.parse_expr()?;
        if self.tok.0 != TokenKind::Eof {
            let msg = match self.tok.1.text() {
                "=>" => "arrow functions are only allowed as call arguments".to_string(),
                "=" => "assignment is not supported".to_string(),
                t => format!("unexpected `{t}` after expression"),
            };
            return Err(self.tok.1.error(&msg));
        }
        Ok(Ref::new(expr))
    }
}

/// Parse `text` into an expression tree, reporting errors against `file`.
pub fn parse_expression(file: &str, text: &str, max_depth: usize) -> Result<Ref<Expr>> {
    let source = Source::from_contents(file, text)?;
    let mut parser = Parser::new(&source)?;
    parser.set_max_depth(max_depth);
    parser.parse()
}
