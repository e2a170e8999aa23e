//! Tokenizer for PadScript source
//!
//! Produces a flat token list with 1-based line/column positions. Template
//! literals keep their `${...}` segments as raw source; the parser feeds
//! those back through a nested parser.

use crate::error::ScriptError;

/// Multi-character punctuators, longest first so greedy matching works.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "**=", "...", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "++", "--", "+=",
    "-=", "*=", "/=", "%=", "**", "+", "-", "*", "/", "%", "=", "<", ">", "!", "?", ":", ".", ",",
    ";", "(", ")", "[", "]", "{", "}",
];

/// One piece of a template literal
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Literal text with escapes already resolved
    Text(String),
    /// Raw source of a `${...}` substitution and where it starts
    Substitution {
        source: String,
        line: usize,
        column: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Template(Vec<TemplatePart>),
    Identifier(String),
    Punct(&'static str),
    Eof,
}

/// A token with source position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in characters)
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Token { kind, line, column }
    }

    /// Whether this token is the given punctuator
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(&self.kind, TokenKind::Punct(q) if *q == p)
    }

    /// Whether this token is the given identifier or keyword
    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Identifier(n) if n == name)
    }

    /// Short description used in "Unexpected ..." messages
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Number(_) => "Unexpected number".to_string(),
            TokenKind::String(_) | TokenKind::Template(_) => "Unexpected string".to_string(),
            TokenKind::Identifier(name) if crate::parser::is_reserved(name) => {
                format!("Unexpected token '{}'", name)
            }
            TokenKind::Identifier(name) => format!("Unexpected identifier '{}'", name),
            TokenKind::Punct(p) => format!("Unexpected token '{}'", p),
            TokenKind::Eof => "Unexpected end of input".to_string(),
        }
    }
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    _source: &'a str,
}

/// Tokenize PadScript source code.
///
/// The returned list always ends with an [`TokenKind::Eof`] token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    tokenize_at(source, 1, 1)
}

/// Tokenize source that starts at a given position (template substitutions).
pub(crate) fn tokenize_at(
    source: &str,
    line: usize,
    column: usize,
) -> Result<Vec<Token>, ScriptError> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line,
        column,
        _source: source,
    };
    lexer.run()
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::syntax(message, self.line, self.column)
    }

    fn run(&mut self) -> Result<Vec<Token>, ScriptError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia()?;
            let (line, column) = (self.line, self.column);
            let Some(ch) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, line, column));
                return Ok(tokens);
            };

            let kind = if ch.is_ascii_digit()
                || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
            {
                self.number()?
            } else if ch == '"' || ch == '\'' {
                self.string(ch)?
            } else if ch == '`' {
                self.template()?
            } else if is_ident_start(ch) {
                self.identifier()
            } else {
                self.punctuator()?
            };

            tokens.push(Token::new(kind, line, column));
        }
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> Result<(), ScriptError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(ScriptError::syntax(
                                    "Invalid or unexpected token",
                                    line,
                                    column,
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn number(&mut self) -> Result<TokenKind, ScriptError> {
        let start = self.pos;

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits: String = self.chars[digits_start..self.pos].iter().collect();
            return u64::from_str_radix(&digits, 16)
                .map(|n| TokenKind::Number(n as f64))
                .map_err(|_| self.error("Invalid or unexpected token"));
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_at(1).is_none_or(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        } else if self.peek() == Some('.') && !self.peek_at(1).is_some_and(is_ident_start) {
            // "1." is a complete number
            self.bump();
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = matches!(self.peek_at(1), Some('+') | Some('-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                if sign {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }

        if self.peek().is_some_and(is_ident_start) {
            return Err(self.error("Invalid or unexpected token"));
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error("Invalid or unexpected token"))
    }

    fn escape(&mut self) -> Result<char, ScriptError> {
        let Some(ch) = self.bump() else {
            return Err(self.error("Invalid or unexpected token"));
        };
        let resolved = match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' => '\0',
            'x' => self.hex_escape(2)?,
            'u' => {
                if self.peek() == Some('{') {
                    self.bump();
                    let mut digits = String::new();
                    while let Some(c) = self.bump() {
                        if c == '}' {
                            break;
                        }
                        digits.push(c);
                    }
                    u32::from_str_radix(&digits, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error("Invalid Unicode escape sequence"))?
                } else {
                    self.hex_escape(4)?
                }
            }
            other => other,
        };
        Ok(resolved)
    }

    fn hex_escape(&mut self, len: usize) -> Result<char, ScriptError> {
        let mut digits = String::with_capacity(len);
        for _ in 0..len {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => digits.push(c),
                _ => return Err(self.error("Invalid hexadecimal escape sequence")),
            }
        }
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("Invalid hexadecimal escape sequence"))
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, ScriptError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(TokenKind::String(text)),
                Some('\\') => {
                    // Line continuation
                    if self.peek() == Some('\n') {
                        self.bump();
                        continue;
                    }
                    text.push(self.escape()?);
                }
                Some('\n') | None => {
                    return Err(ScriptError::syntax(
                        "Invalid or unexpected token",
                        line,
                        column,
                    ));
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn template(&mut self) -> Result<TokenKind, ScriptError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut parts = Vec::new();
        let mut text = String::new();

        loop {
            match self.bump() {
                Some('`') => break,
                Some('\\') => text.push(self.escape()?),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                    }
                    let (sub_line, sub_column) = (self.line, self.column);
                    let source = self.substitution(line, column)?;
                    parts.push(TemplatePart::Substitution {
                        source,
                        line: sub_line,
                        column: sub_column,
                    });
                }
                Some(c) => text.push(c),
                None => return Err(ScriptError::syntax("Unterminated template literal", line, column)),
            }
        }

        if !text.is_empty() || parts.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(TokenKind::Template(parts))
    }

    /// Collect the raw source of a `${...}` substitution up to its closing brace
    fn substitution(&mut self, line: usize, column: usize) -> Result<String, ScriptError> {
        let mut depth = 0usize;
        let mut source = String::new();
        let mut quote: Option<char> = None;

        loop {
            let Some(c) = self.bump() else {
                return Err(ScriptError::syntax("Unterminated template literal", line, column));
            };
            if let Some(q) = quote {
                source.push(c);
                if c == '\\' {
                    if let Some(next) = self.bump() {
                        source.push(next);
                    }
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    source.push(c);
                }
                '{' => {
                    depth += 1;
                    source.push(c);
                }
                '}' if depth == 0 => return Ok(source),
                '}' => {
                    depth -= 1;
                    source.push(c);
                }
                _ => source.push(c),
            }
        }
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        TokenKind::Identifier(self.chars[start..self.pos].iter().collect())
    }

    fn punctuator(&mut self) -> Result<TokenKind, ScriptError> {
        for p in PUNCTUATORS {
            let len = p.chars().count();
            let matches = p
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek_at(i) == Some(c));
            if matches {
                for _ in 0..len {
                    self.bump();
                }
                return Ok(TokenKind::Punct(p));
            }
        }
        Err(self.error("Invalid or unexpected token"))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
