//! Tokenizer with Python's indentation rules.

use crate::error::{Fault, FaultKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    Assign,
    EqEq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    DoubleSlashEq,
    PercentEq,
    DoubleStarEq,
}

// Longest spellings first so that `**=` wins over `**` and `*`.
const OPERATORS: &[(&str, Op)] = &[
    ("**=", Op::DoubleStarEq),
    ("//=", Op::DoubleSlashEq),
    ("**", Op::DoubleStar),
    ("//", Op::DoubleSlash),
    ("==", Op::EqEq),
    ("!=", Op::NotEq),
    ("<=", Op::LtE),
    (">=", Op::GtE),
    ("+=", Op::PlusEq),
    ("-=", Op::MinusEq),
    ("*=", Op::StarEq),
    ("/=", Op::SlashEq),
    ("%=", Op::PercentEq),
    ("->", Op::Arrow),
    ("(", Op::LParen),
    (")", Op::RParen),
    ("[", Op::LBracket),
    ("]", Op::RBracket),
    ("{", Op::LBrace),
    ("}", Op::RBrace),
    (",", Op::Comma),
    (":", Op::Colon),
    (";", Op::Semicolon),
    (".", Op::Dot),
    ("+", Op::Plus),
    ("-", Op::Minus),
    ("*", Op::Star),
    ("/", Op::Slash),
    ("%", Op::Percent),
    ("=", Op::Assign),
    ("<", Op::Lt),
    (">", Op::Gt),
];

impl Op {
    #[must_use]
    pub fn spelling(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map_or("?", |(spelling, _)| spelling)
    }
}

const UNSUPPORTED_OPERATORS: &[&str] = &[
    ":=", "<<=", ">>=", "|=", "&=", "^=", "@=", "<<", ">>", "|", "&", "^", "~", "@",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    /// Body of an f-string with escapes left in place.
    FStr { body: String, raw: bool },
    Op(Op),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
}

/// Splits source text into tokens, emitting `Indent`/`Dedent` around blocks.
///
/// # Errors
///
/// Returns a `SyntaxError` or `IndentationError` fault for malformed input.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Fault> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    depth: usize,
    at_line_start: bool,
    indents: Vec<usize>,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            depth: 0,
            at_line_start: true,
            indents: vec![0],
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, tok: Tok) {
        self.tokens.push(Token {
            tok,
            line: self.line,
        });
    }

    fn run(mut self) -> Result<Vec<Token>, Fault> {
        while self.pos < self.chars.len() {
            if self.at_line_start && self.depth == 0 {
                if !self.indentation()? {
                    continue;
                }
            }
            let Some(ch) = self.peek(0) else { break };
            match ch {
                ' ' | '\t' | '\r' | '\x0c' => self.pos += 1,
                '\n' => {
                    self.pos += 1;
                    if self.depth == 0 {
                        self.push(Tok::Newline);
                        self.at_line_start = true;
                    }
                    self.line += 1;
                }
                '#' => self.skip_comment(),
                '\\' => self.continuation()?,
                '"' | '\'' => self.string(false, false)?,
                c if c.is_ascii_digit() => self.number()?,
                '.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.number()?,
                c if c == '_' || c.is_alphabetic() => self.name()?,
                _ => self.operator()?,
            }
        }

        if self.depth > 0 {
            return Err(Fault::syntax("unexpected end of input: a bracket was never closed", self.line));
        }
        if self
            .tokens
            .last()
            .is_some_and(|token| !matches!(token.tok, Tok::Newline | Tok::Dedent))
        {
            self.push(Tok::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(Tok::Dedent);
        }
        self.push(Tok::Eof);
        Ok(self.tokens)
    }

    /// Measures the indentation of a new logical line.
    ///
    /// Returns `false` when the line was blank or a comment and has been consumed.
    fn indentation(&mut self) -> Result<bool, Fault> {
        let mut col = 0usize;
        while let Some(ch) = self.peek(0) {
            match ch {
                ' ' => col += 1,
                '\t' => col = (col / 8 + 1) * 8,
                '\x0c' | '\r' => {}
                _ => break,
            }
            self.pos += 1;
        }

        match self.peek(0) {
            None => return Ok(false),
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                return Ok(false);
            }
            Some('#') => {
                self.skip_comment();
                return Ok(false);
            }
            Some(_) => {}
        }

        self.at_line_start = false;
        let current = self.indents.last().copied().unwrap_or(0);
        if col > current {
            self.indents.push(col);
            self.push(Tok::Indent);
        } else if col < current {
            while self.indents.last().is_some_and(|&top| top > col) {
                self.indents.pop();
                self.push(Tok::Dedent);
            }
            if self.indents.last().copied().unwrap_or(0) != col {
                return Err(Fault::new(
                    FaultKind::IndentationError,
                    "unindent does not match any outer indentation level",
                )
                .at_line(self.line));
            }
        }
        Ok(true)
    }

    fn skip_comment(&mut self) {
        while self.peek(0).is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
    }

    fn continuation(&mut self) -> Result<(), Fault> {
        let mut offset = 1;
        if self.peek(offset) == Some('\r') {
            offset += 1;
        }
        if self.peek(offset) == Some('\n') {
            self.pos += offset + 1;
            self.line += 1;
            Ok(())
        } else {
            Err(Fault::syntax(
                "unexpected character after line continuation character",
                self.line,
            ))
        }
    }

    fn name(&mut self) -> Result<(), Fault> {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|c| c == '_' || c.is_alphanumeric())
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        if matches!(self.peek(0), Some('"' | '\'')) {
            let prefix = word.to_ascii_lowercase();
            match prefix.as_str() {
                "f" => return self.string(true, false),
                "r" => return self.string(false, true),
                "rf" | "fr" => return self.string(true, true),
                "u" => return self.string(false, false),
                "b" | "br" | "rb" => {
                    return Err(Fault::syntax("bytes literals are not supported", self.line));
                }
                _ => {}
            }
        }
        self.push(Tok::Name(word));
        Ok(())
    }

    fn number(&mut self) -> Result<(), Fault> {
        let line = self.line;
        if self.peek(0) == Some('0') {
            let radix = match self.peek(1) {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits = self.take_digits(|c| c.is_digit(radix));
                let value = i64::from_str_radix(&digits, radix)
                    .map_err(|_| integer_literal_fault(line))?;
                self.push(Tok::Int(value));
                return Ok(());
            }
        }

        let mut text = self.take_digits(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.peek(0) == Some('.') {
            is_float = true;
            self.pos += 1;
            text.push('.');
            text.push_str(&self.take_digits(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(0), Some('e' | 'E')) {
            let sign = self.peek(1);
            let digit_at = if matches!(sign, Some('+' | '-')) { 2 } else { 1 };
            if self.peek(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                if digit_at == 2 {
                    text.extend(sign);
                }
                self.pos += digit_at;
                text.push_str(&self.take_digits(|c| c.is_ascii_digit()));
            }
        }
        if matches!(self.peek(0), Some('j' | 'J')) {
            return Err(Fault::syntax("complex numbers are not supported", line));
        }
        if self.peek(0).is_some_and(|c| c == '_' || c.is_alphabetic()) {
            return Err(Fault::syntax("invalid decimal literal", line));
        }

        if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| Fault::syntax("invalid decimal literal", line))?;
            self.push(Tok::Float(value));
        } else {
            let value = text.parse::<i64>().map_err(|_| integer_literal_fault(line))?;
            self.push(Tok::Int(value));
        }
        Ok(())
    }

    fn take_digits(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek(0) {
            if accept(c) {
                out.push(c);
            } else if c != '_' {
                break;
            }
            self.pos += 1;
        }
        out
    }

    fn string(&mut self, is_f: bool, is_raw: bool) -> Result<(), Fault> {
        let start_line = self.line;
        let Some(quote) = self.peek(0) else {
            return Err(Fault::syntax("unterminated string literal", start_line));
        };
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut body = String::new();
        loop {
            let Some(ch) = self.peek(0) else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(Fault::syntax(message, start_line));
            };
            if ch == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
            }
            if ch == '\n' && !triple {
                return Err(Fault::syntax("unterminated string literal", start_line));
            }
            if ch == '\\' {
                body.push(ch);
                self.pos += 1;
                if let Some(next) = self.peek(0) {
                    body.push(next);
                    self.pos += 1;
                    if next == '\n' {
                        self.line += 1;
                    }
                }
                continue;
            }
            if ch == '\n' {
                self.line += 1;
            }
            body.push(ch);
            self.pos += 1;
        }

        let tok = if is_f {
            Tok::FStr { body, raw: is_raw }
        } else if is_raw {
            Tok::Str(body)
        } else {
            Tok::Str(unescape(&body).map_err(|msg| Fault::syntax(msg, start_line))?)
        };
        self.tokens.push(Token {
            tok,
            line: start_line,
        });
        Ok(())
    }

    fn operator(&mut self) -> Result<(), Fault> {
        let rest: String = self.chars[self.pos..].iter().take(3).collect();
        for spelling in UNSUPPORTED_OPERATORS {
            if rest.starts_with(spelling) {
                return Err(Fault::syntax(
                    format!("the '{spelling}' operator is not supported"),
                    self.line,
                ));
            }
        }
        for (spelling, op) in OPERATORS {
            if rest.starts_with(spelling) {
                self.pos += spelling.chars().count();
                match op {
                    Op::LParen | Op::LBracket | Op::LBrace => self.depth += 1,
                    Op::RParen | Op::RBracket | Op::RBrace => {
                        self.depth = self.depth.saturating_sub(1);
                    }
                    _ => {}
                }
                self.push(Tok::Op(*op));
                return Ok(());
            }
        }
        let ch = self.chars[self.pos];
        Err(Fault::syntax(format!("invalid character '{ch}'"), self.line))
    }
}

fn integer_literal_fault(line: usize) -> Fault {
    Fault::new(FaultKind::OverflowError, "integer literal is too large").at_line(line)
}

/// Resolves backslash escapes in a string literal body.
///
/// Unknown escapes keep their backslash, as Python does.
pub(crate) fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            'U' => out.push(hex_escape(&mut chars, 8)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, width: usize) -> Result<char, String> {
    let digits: String = chars.by_ref().take(width).collect();
    if digits.len() != width {
        return Err("truncated escape sequence in string literal".to_string());
    }
    u32::from_str_radix(&digits, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid escape sequence '\\{digits}'"))
}
