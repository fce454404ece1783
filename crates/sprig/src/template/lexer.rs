//! Template lexer.
//!
//! Splits template source into a flat stream of [`Token`]s: literal text,
//! variable output (`{{ ... }}`), block tags (`{% ... %}`) and comments
//! (`{# ... #}`). Each token remembers the line it started on so that
//! compile errors can point at the offending tag.

use crate::error::{Error, Result, SourceLocation};

/// The kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Variable,
    Block,
    Comment,
}

/// A single lexed token. `contents` is trimmed for everything but text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub contents: String,
    pub line: usize,
}

impl Token {
    fn new(kind: TokenKind, contents: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            contents: contents.into(),
            line,
        }
    }

    /// Splits a block token into its bits, keeping quoted runs together.
    ///
    /// `hello class="a b" required` yields `["hello", "class=\"a b\"", "required"]`.
    pub fn split_contents(&self) -> Vec<String> {
        split_contents(&self.contents)
    }

    /// The first bit of a block token: the tag name.
    pub fn tag_name(&self) -> &str {
        self.contents.split_whitespace().next().unwrap_or("")
    }
}

/// Splits on whitespace outside of single or double quotes.
pub fn split_contents(input: &str) -> Vec<String> {
    let mut bits = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if ch == q {
                    quote = None;
                }
            }
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    bits.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }

    if !current.is_empty() {
        bits.push(current);
    }
    bits
}

/// Tokenizes template source.
///
/// `template` is only used to label errors.
pub fn tokenize(source: &str, template: Option<&str>) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut line = 1;

    while !rest.is_empty() {
        let Some(start) = find_tag_start(rest) else {
            tokens.push(Token::new(TokenKind::Text, rest, line));
            break;
        };

        if start > 0 {
            let text = &rest[..start];
            tokens.push(Token::new(TokenKind::Text, text, line));
            line += count_lines(text);
            rest = &rest[start..];
        }

        let (kind, close) = match &rest[..2] {
            "{{" => (TokenKind::Variable, "}}"),
            "{%" => (TokenKind::Block, "%}"),
            _ => (TokenKind::Comment, "#}"),
        };

        let Some(end) = rest[2..].find(close) else {
            return Err(Error::syntax(
                format!("unclosed tag, expected '{}'", close),
                SourceLocation::new(template, line),
            ));
        };

        let inner = &rest[2..2 + end];
        tokens.push(Token::new(kind, inner.trim(), line));
        line += count_lines(inner);
        rest = &rest[2 + end + 2..];
    }

    Ok(tokens)
}

fn find_tag_start(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    (0..bytes.len().saturating_sub(1)).find(|&i| {
        bytes[i] == b'{' && matches!(bytes[i + 1], b'{' | b'%' | b'#')
    })
}

fn count_lines(text: &str) -> usize {
    text.matches('\n').count()
}
