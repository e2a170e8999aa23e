//! Syntax Highlighting for PadScript
//!
//! A forgiving tokenizer used only for colouring the editor. It works on
//! one line at a time and never fails: anything it does not recognise
//! becomes an `Unknown` token. Spans are character offsets.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// let, const, function, if, return, ...
    Keyword,
    /// Global objects and functions: console, Math, JSON, ...
    Builtin,
    Number,
    /// true, false, null, undefined
    Literal,
    /// Quoted and template strings
    String,
    /// `// ...` and `/* ... */`
    Comment,
    Operator,
    /// Brackets, commas, semicolons
    Punctuation,
    Identifier,
    Whitespace,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, chars: &[char], start: usize, end: usize) -> Self {
        Self {
            kind,
            span: start..end,
            text: chars[start..end].iter().collect(),
        }
    }
}

const KEYWORDS: &[&str] = &[
    "let", "const", "var", "function", "return", "if", "else", "while", "do", "for", "of",
    "break", "continue", "throw", "try", "catch", "finally", "new", "typeof",
];

const LITERALS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity"];

const BUILTINS: &[&str] = &[
    "console",
    "Math",
    "JSON",
    "Array",
    "String",
    "Number",
    "Boolean",
    "parseInt",
    "parseFloat",
    "isNaN",
    "Error",
    "TypeError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
];

const OPERATOR_CHARS: &str = "+-*/%=!<>&|?:~^";

const PUNCTUATION_CHARS: &str = "()[]{},;.";

/// Tokenize one line of PadScript for highlighting
pub fn tokenize(line: &str) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let start = pos;
        let ch = chars[pos];

        if ch.is_whitespace() {
            while pos < chars.len() && chars[pos].is_whitespace() {
                pos += 1;
            }
            tokens.push(Token::new(TokenKind::Whitespace, &chars, start, pos));
            continue;
        }

        // Line comment: rest of the line
        if ch == '/' && chars.get(pos + 1) == Some(&'/') {
            tokens.push(Token::new(TokenKind::Comment, &chars, start, chars.len()));
            break;
        }

        // Block comment; an unterminated one runs to the end of the line
        if ch == '/' && chars.get(pos + 1) == Some(&'*') {
            pos += 2;
            while pos < chars.len() && !(chars[pos] == '*' && chars.get(pos + 1) == Some(&'/')) {
                pos += 1;
            }
            pos = (pos + 2).min(chars.len());
            tokens.push(Token::new(TokenKind::Comment, &chars, start, pos));
            continue;
        }

        if ch == '"' || ch == '\'' || ch == '`' {
            pos += 1;
            while pos < chars.len() && chars[pos] != ch {
                if chars[pos] == '\\' {
                    pos += 1;
                }
                pos += 1;
            }
            pos = (pos + 1).min(chars.len());
            tokens.push(Token::new(TokenKind::String, &chars, start, pos));
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && chars.get(pos + 1).is_some_and(char::is_ascii_digit))
        {
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '.') {
                // Exponent sign: 1e-5
                if matches!(chars[pos], 'e' | 'E')
                    && matches!(chars.get(pos + 1), Some('+') | Some('-'))
                {
                    pos += 1;
                }
                pos += 1;
            }
            tokens.push(Token::new(TokenKind::Number, &chars, start, pos));
            continue;
        }

        if ch.is_alphabetic() || ch == '_' || ch == '$' {
            while pos < chars.len()
                && (chars[pos].is_alphanumeric() || chars[pos] == '_' || chars[pos] == '$')
            {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            let kind = if KEYWORDS.contains(&word.as_str()) {
                TokenKind::Keyword
            } else if LITERALS.contains(&word.as_str()) {
                TokenKind::Literal
            } else if BUILTINS.contains(&word.as_str()) {
                TokenKind::Builtin
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token::new(kind, &chars, start, pos));
            continue;
        }

        if OPERATOR_CHARS.contains(ch) {
            while pos < chars.len() && OPERATOR_CHARS.contains(chars[pos]) {
                // Don't swallow the start of a comment
                if chars[pos] == '/' && matches!(chars.get(pos + 1), Some('/') | Some('*')) {
                    break;
                }
                pos += 1;
            }
            if pos == start {
                pos += 1;
            }
            tokens.push(Token::new(TokenKind::Operator, &chars, start, pos));
            continue;
        }

        pos += 1;
        let kind = if PUNCTUATION_CHARS.contains(ch) {
            TokenKind::Punctuation
        } else {
            TokenKind::Unknown
        };
        tokens.push(Token::new(kind, &chars, start, pos));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<(TokenKind, String)> {
        tokenize(line)
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_declaration() {
        assert_eq!(
            kinds("const x = 1.5e-3;"),
            vec![
                (TokenKind::Keyword, "const".to_string()),
                (TokenKind::Identifier, "x".to_string()),
                (TokenKind::Operator, "=".to_string()),
                (TokenKind::Number, "1.5e-3".to_string()),
                (TokenKind::Punctuation, ";".to_string()),
            ]
        );
    }

    #[test]
    fn test_builtins_and_strings() {
        let tokens = kinds("console.log('it\\'s', `t ${x}`)");
        assert_eq!(tokens[0], (TokenKind::Builtin, "console".to_string()));
        assert_eq!(tokens[4], (TokenKind::String, "'it\\'s'".to_string()));
        assert_eq!(tokens[6], (TokenKind::String, "`t ${x}`".to_string()));
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("x /* a */ y // rest"),
            vec![
                (TokenKind::Identifier, "x".to_string()),
                (TokenKind::Comment, "/* a */".to_string()),
                (TokenKind::Identifier, "y".to_string()),
                (TokenKind::Comment, "// rest".to_string()),
            ]
        );
        assert_eq!(kinds("a=//c")[1], (TokenKind::Operator, "=".to_string()));
    }

    #[test]
    fn test_unterminated_input_is_tolerated() {
        assert_eq!(kinds("'open")[0].0, TokenKind::String);
        assert_eq!(kinds("/* open")[0].0, TokenKind::Comment);
        assert_eq!(kinds("#")[0].0, TokenKind::Unknown);
    }

    #[test]
    fn test_spans_cover_line() {
        let line = "let s = 'é' + null";
        let tokens = tokenize(line);
        let rebuilt: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(rebuilt, line);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Literal));
    }
}
