//! This lexer tokenizes 4VIN assembly.
//!
//! Rules are tried in priority order at the current position:
//! comments and whitespace are skipped, runs of newlines collapse into a
//! single `Newline` token, identifiers naming a mnemonic become opcodes,
//! `%` introduces a register, and numbers are classified as float, hex
//! or decimal.
use std::collections::VecDeque;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::{Location, Register};
use super::error::CompileError;
use super::registry;

#[derive(Clone, PartialEq, Debug)]
pub enum TokenKind {
    Register(Register),
    IntConst(u32),
    HexConst(u32),
    FloatConst(f64),
    Opcode(String),
    Ident(String),
    Comma,
    Semicolon,
    Colon,
    Dollar,
    Newline,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    /// The matched source text.
    pub text: String,
    pub loc: Location,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::Newline => write!(f, "\\n"),
            _ => write!(f, "{}", self.text),
        }
    }
}

struct Rules {
    comment: Regex,
    whitespace: Regex,
    newline: Regex,
    ident: Regex,
    register: Regex,
    float: Regex,
    hex: Regex,
    int: Regex,
}

static RULES: Lazy<Rules> = Lazy::new(|| {
    let re = |pattern: &str| Regex::new(pattern).unwrap();
    Rules {
        comment:    re(r"^//[^\n]*"),
        whitespace: re(r"^[ \t\r]+"),
        newline:    re(r"^\n+"),
        ident:      re(r"^[a-zA-Z][a-zA-Z0-9_]*"),
        register:   re(r"^%[a-zA-Z]{1,3}"),
        float:      re(r"^(\d+\.\d*|\.\d+)"),
        hex:        re(r"^0x[a-fA-F0-9]+"),
        int:        re(r"^\d+"),
    }
});

/// A restartable scanner over one source text. Yields tokens until the
/// end of input, or a single error after which it stops.
pub struct Lexer<'a> {
    file: String,
    src: &'a str,
    pos: usize,
    line: usize,
    /// Byte offset where the current line starts.
    line_start: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &str, src: &'a str) -> Self {
        Lexer { file: file.to_owned(), src, pos: 0, line: 1, line_start: 0, failed: false }
    }

    fn loc(&self) -> Location {
        Location::new(&self.file, self.line, self.pos - self.line_start + 1)
    }

    fn token(&self, kind: TokenKind, text: &str) -> Token {
        Token { kind, text: text.to_owned(), loc: self.loc() }
    }

    /// Scans the next token, skipping anything that produces none.
    fn scan(&mut self) -> Result<Option<Token>, CompileError> {
        let rules = &*RULES;
        let src = self.src;
        loop {
            let rest = &src[self.pos..];
            if rest.is_empty() {
                return Ok(None);
            }

            if let Some(m) = rules.comment.find(rest).or_else(|| rules.whitespace.find(rest)) {
                self.pos += m.end();
                continue;
            }

            if let Some(m) = rules.newline.find(rest) {
                let tok = self.token(TokenKind::Newline, m.as_str());
                self.pos += m.end();
                self.line += m.end();
                self.line_start = self.pos;
                return Ok(Some(tok));
            }

            let (kind, len) = self.classify(rest)?;
            let tok = self.token(kind, &rest[..len]);
            self.pos += len;
            return Ok(Some(tok));
        }
    }

    fn classify(&self, rest: &str) -> Result<(TokenKind, usize), CompileError> {
        let rules = &*RULES;

        if let Some(m) = rules.ident.find(rest) {
            let word = m.as_str().to_owned();
            let kind = if registry::is_mnemonic(&word) {
                TokenKind::Opcode(word)
            } else {
                TokenKind::Ident(word)
            };
            return Ok((kind, m.end()));
        }

        if let Some(m) = rules.register.find(rest) {
            let name = &m.as_str()[1..];
            return match Register::from_name(name) {
                Some(reg) => Ok((TokenKind::Register(reg), m.end())),
                _ => Err(CompileError::UnknownRegister {
                    name: m.as_str().to_owned(),
                    loc: self.loc(),
                }),
            };
        }

        if let Some(m) = rules.float.find(rest) {
            // The pattern only admits digits and a single point.
            let value = m.as_str().parse::<f64>().map_err(|_| CompileError::UnexpectedCharacter {
                found: '.',
                loc: self.loc(),
            })?;
            if (value as f32).is_infinite() {
                return Err(CompileError::FloatOverflow { text: m.as_str().to_owned(), loc: self.loc() });
            }
            return Ok((TokenKind::FloatConst(value), m.end()));
        }

        if let Some(m) = rules.hex.find(rest) {
            let value = u32::from_str_radix(&m.as_str()[2..], 16).map_err(|_| self.overflow(m.as_str()))?;
            return Ok((TokenKind::HexConst(value), m.end()));
        }

        if let Some(m) = rules.int.find(rest) {
            let value = m.as_str().parse::<u32>().map_err(|_| self.overflow(m.as_str()))?;
            return Ok((TokenKind::IntConst(value), m.end()));
        }

        // `scan` never classifies empty input.
        let c = rest.chars().next().unwrap_or('\0');
        let kind = match c {
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '$' => TokenKind::Dollar,
            _ => return Err(CompileError::UnexpectedCharacter { found: c, loc: self.loc() }),
        };
        Ok((kind, c.len_utf8()))
    }

    fn overflow(&self, text: &str) -> CompileError {
        CompileError::IntegerOverflow { text: text.to_owned(), loc: self.loc() }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.scan() {
            Ok(Some(tok)) => Some(Ok(tok)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Tokenizes a whole source text, stopping at the first error.
pub fn tokenize(file: &str, src: &str) -> Result<VecDeque<Token>, CompileError> {
    let tokens = Lexer::new(file, src).collect::<Result<VecDeque<Token>, CompileError>>()?;
    trace!("{}: {} token(s)", file, tokens.len());
    Ok(tokens)
}
