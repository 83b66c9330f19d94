// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;
use std::sync::Arc;

use crate::error::{EvalError, ParseError};

type Result<T> = core::result::Result<T, ParseError>;

struct SourceInternal {
    pub file: String,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

/// Text of one expression plus the name it is reported under.
#[derive(Clone)]
pub struct Source {
    src: Arc<SourceInternal>,
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn from_contents(file: impl Into<String>, contents: impl Into<String>) -> Result<Source> {
        let (file, contents) = (file.into(), contents.into());
        let max_size = u32::MAX as usize - 2;
        if contents.len() > max_size {
            return Err(ParseError::new(format!(
                "{file} exceeds maximum allowed expression size {max_size}"
            )));
        }
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }

        if (start as usize) < contents.len() || contents.is_empty() {
            lines.push((start, contents.len() as u32));
        } else {
            let s = (contents.len() - 1) as u32;
            lines.push((s, s));
        }
        Ok(Self {
            src: Arc::new(SourceInternal {
                file,
                contents,
                lines,
            }),
        })
    }

    pub fn file(&self) -> &String {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line == 0 || line as usize > self.src.lines.len() {
            return format!("{}: invalid line {} specified", self.src.file, line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = (col as usize).saturating_sub(1);

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^\n\
		{}: {}",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }

    pub fn error(&self, line: u32, col: u32, msg: &str) -> ParseError {
        ParseError::new(self.message(line, col, "error", msg))
    }
}

#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.line, self.col, kind, msg)
    }

    pub fn error(&self, msg: &str) -> ParseError {
        self.source.error(self.line, self.col, msg)
    }

    pub fn eval_error(&self, msg: &str) -> EvalError {
        EvalError::new(self.message("error", msg))
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = if t.chars().count() > max {
            (t.chars().take(max).collect::<String>(), "...")
        } else {
            (t, "")
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    Symbol,
    String,
    Number,
    Ident,
    Eof,
}

/// A token. For strings the span covers the text between the quotes,
/// escapes included.
#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn at_end(&self, offset: usize) -> bool {
        offset >= self.source.contents().len()
    }

    fn span(&self, line: u32, col: u32, start: usize, end: usize) -> Span {
        Span {
            source: self.source.clone(),
            line,
            col,
            start: start as u32,
            end: end as u32,
        }
    }

    fn read_ident(&mut self) -> Result<Token> {
        let start = self.peek().0;
        let col = self.col;
        loop {
            let ch = self.peek().1;
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                self.iter.next();
            } else {
                break;
            }
        }
        let end = self.peek().0;
        self.col += (end - start) as u32;
        Ok(Token(TokenKind::Ident, self.span(self.line, col, start, end)))
    }

    fn read_digits(&mut self) {
        while self.peek().1.is_ascii_digit() {
            self.iter.next();
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let (start, chr) = self.peek();
        let col = self.col;

        if chr != '.' {
            self.read_digits();
        }

        // . must be followed by at least 1 digit.
        if self.peek().1 == '.' && self.peekahead(1).1.is_ascii_digit() {
            self.iter.next();
            self.read_digits();
        }

        let ch = self.peek().1;
        if ch == 'e' || ch == 'E' {
            self.iter.next();
            if matches!(self.peek().1, '+' | '-') {
                self.iter.next();
            }
            if !self.peek().1.is_ascii_digit() {
                return Err(self.source.error(self.line, col, "invalid number exponent"));
            }
            self.read_digits();
        }

        let end = self.peek().0;
        self.col += (end - start) as u32;

        // A number cannot run straight into an identifier.
        let ch = self.peek().1;
        if ch == '_' || ch.is_ascii_alphanumeric() {
            return Err(self.source.error(self.line, self.col, "invalid number"));
        }

        match self.source.contents()[start..end].parse::<f64>() {
            Ok(n) if n.is_finite() => (),
            _ => return Err(self.source.error(self.line, col, "number out of range")),
        }

        Ok(Token(TokenKind::Number, self.span(self.line, col, start, end)))
    }

    fn read_string(&mut self, quote: char) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.iter.next();
        self.col += 1;
        let (start, _) = self.peek();
        loop {
            let (offset, ch) = self.peek();
            let col = self.col + (offset - start) as u32;
            match ch {
                '\x00' if self.at_end(offset) => {
                    return Err(self
                        .source
                        .error(line, col, &format!("unmatched {quote}")))
                }
                '\n' => return Err(self.source.error(line, col, "newline in string literal")),
                c if c == quote => break,
                '\\' => {
                    self.iter.next();
                    let (_, ch) = self.peek();
                    self.iter.next();
                    match ch {
                        '"' | '\'' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '0' => (),
                        'u' => {
                            for _i in 0..4 {
                                let (offset, ch) = self.peek();
                                let col = self.col + (offset - start) as u32;
                                if !ch.is_ascii_hexdigit() {
                                    return Err(self.source.error(
                                        line,
                                        col,
                                        "invalid hex escape sequence",
                                    ));
                                }
                                self.iter.next();
                            }
                        }
                        _ => return Err(self.source.error(line, col, "invalid escape sequence")),
                    }
                }
                _ => {
                    self.iter.next();
                }
            }
        }

        let end = self.peek().0;
        self.iter.next();
        self.col += self.source.contents()[start..end].chars().count() as u32 + 1;

        Ok(Token(TokenKind::String, self.span(line, col + 1, start, end)))
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek().1 {
                ' ' | '\r' => self.col += 1,
                '\t' => self.col += 4,
                '\n' => {
                    self.col = 1;
                    self.line += 1;
                }
                _ => break,
            }
            self.iter.next();
        }
    }

    fn symbol(&mut self, start: usize, len: usize) -> Result<Token> {
        let col = self.col;
        for _ in 0..len {
            self.iter.next();
        }
        self.col += len as u32;
        Ok(Token(
            TokenKind::Symbol,
            self.span(self.line, col, start, start + len),
        ))
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws();

        let (start, chr) = self.peek();
        let col = self.col;
        let (c1, c2) = (self.peekahead(1).1, self.peekahead(2).1);

        match chr {
            '.' if c1.is_ascii_digit() => self.read_number(),
            // === !==
            '=' | '!' if c1 == '=' && c2 == '=' => self.symbol(start, 3),
            // == != <= >= =>
            '=' | '!' | '<' | '>' if c1 == '=' => self.symbol(start, 2),
            '=' if c1 == '>' => self.symbol(start, 2),
            '&' if c1 == '&' => self.symbol(start, 2),
            '|' if c1 == '|' => self.symbol(start, 2),
            '&' | '|' => Err(self
                .source
                .error(self.line, col, "bitwise operators are not supported")),
            '{' | '}' | '[' | ']' | '(' | ')' | '+' | '-' | '*' | '/' | '%' | ',' | '.' | '?'
            | ':' | '!' | '<' | '>' | '=' => self.symbol(start, 1),
            '"' | '\'' => self.read_string(chr),
            // A NUL inside the text is not end of input.
            '\x00' if self.at_end(start) => {
                Ok(Token(TokenKind::Eof, self.span(self.line, col, start, start)))
            }
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_ascii_alphabetic() || chr == '_' || chr == '$' => self.read_ident(),
            _ => Err(self.source.error(self.line, self.col, "invalid character")),
        }
    }
}

/// Decode the escapes of a string token validated by the lexer.
pub fn unescape(span: &Span) -> Result<String> {
    let raw = span.text();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let decoded = match chars.next() {
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('b') => '\u{0008}',
            Some('f') => '\u{000C}',
            Some('v') => '\u{000B}',
            Some('0') => '\0',
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| span.error("invalid unicode escape"))?
            }
            Some(c) => c,
            None => return Err(span.error("dangling escape")),
        };
        out.push(decoded);
    }
    Ok(out)
}
