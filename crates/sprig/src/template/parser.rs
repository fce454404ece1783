//! Token stream parser.
//!
//! [`Parser::parse`] turns tokens into nodes, dispatching block tags to the
//! handlers in the engine's [`TagLibrary`](super::library::TagLibrary).
//! Handlers for block tags call [`Parser::parse_until`] to consume their body,
//! which is how nesting balances: each handler owns everything up to its own
//! end tag.

use tracing::trace;

use super::expr::Expression;
use super::lexer::{Token, TokenKind};
use super::nodes::{NodeList, TextNode, VariableNode};
use crate::engine::Engine;
use crate::error::{Error, Result, SourceLocation};

pub struct Parser<'e> {
    engine: &'e Engine,
    tokens: Vec<Token>,
    pos: usize,
    name: Option<String>,
}

impl<'e> Parser<'e> {
    pub fn new(engine: &'e Engine, tokens: Vec<Token>, name: Option<&str>) -> Self {
        Self {
            engine,
            tokens,
            pos: 0,
            name: name.map(str::to_string),
        }
    }

    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    /// Name of the template being compiled, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn location(&self, token: &Token) -> SourceLocation {
        SourceLocation::new(self.name(), token.line)
    }

    /// A syntax error pointing at `token`.
    pub fn error(&self, token: &Token, message: impl Into<String>) -> Error {
        Error::syntax(message, self.location(token))
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Parses until a block tag named in `until`, returning the nodes and
    /// that end token. Returns `None` for the token when input runs out.
    pub fn parse(&mut self, until: &[&str]) -> Result<(NodeList, Option<Token>)> {
        let mut nodes = NodeList::new();

        while let Some(token) = self.next_token() {
            match token.kind {
                TokenKind::Text => nodes.push(Box::new(TextNode(token.contents))),
                TokenKind::Comment => {}
                TokenKind::Variable => {
                    let expr = self.compile_filter(&token.contents, &token)?;
                    nodes.push(Box::new(VariableNode(expr)));
                }
                TokenKind::Block => {
                    let name = token.tag_name();
                    if name.is_empty() {
                        return Err(self.error(&token, "empty block tag"));
                    }
                    if until.contains(&name) {
                        return Ok((nodes, Some(token)));
                    }
                    let Some(handler) = self.engine.library().get(name) else {
                        let message = if until.is_empty() {
                            format!("unknown tag '{}'", name)
                        } else {
                            format!(
                                "unknown tag '{}', expected one of: {}",
                                name,
                                until.join(", ")
                            )
                        };
                        return Err(self.error(&token, message));
                    };
                    trace!(tag = name, line = token.line, "parsing block tag");
                    nodes.push(handler.parse(self, &token)?);
                }
            }
        }

        Ok((nodes, None))
    }

    /// Like [`parse`](Self::parse) but running out of input is an error
    /// reported at `start`, the tag that opened the block.
    pub fn parse_until(&mut self, start: &Token, until: &[&str]) -> Result<(NodeList, Token)> {
        match self.parse(until)? {
            (nodes, Some(end)) => Ok((nodes, end)),
            (_, None) => Err(self.error(
                start,
                format!(
                    "unclosed tag '{}', expected {}",
                    start.tag_name(),
                    until
                        .iter()
                        .map(|t| format!("'{}'", t))
                        .collect::<Vec<_>>()
                        .join(" or ")
                ),
            )),
        }
    }

    /// Compiles one expression, attaching `token`'s location to errors.
    pub fn compile_filter(&self, text: &str, token: &Token) -> Result<Expression> {
        Expression::compile(text, self.engine.env()).map_err(|message| self.error(token, message))
    }
}
