//! Invocation argument parsing shared by component and slot tags.
//!
//! ```text
//! {% card title="Hi" class=classes|join(" ") required :let="row" %}
//!         ^^^^^^^^^^ ^^^^^^^^^^^^^^^^^^^^^^^ ^^^^^^^^ ^^^^^^^^^^
//!         keyword    keyword with filter     flag     binding
//! ```
//!
//! Keyword values are compiled to expressions and evaluated per render.
//! A bare key becomes boolean `true`. `:let` names the variable a scoped
//! slot body receives; it is not an attribute.

use minijinja::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::attributes::{is_valid_key, split_keyword};
use crate::error::Result;
use crate::template::{Context, Expression, Parser, Token};

/// The key that declares a scoped slot binding.
pub const LET_KEY: &str = ":let";

static BIND_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*$").expect("valid bind name pattern"));

/// A compiled attribute value.
#[derive(Debug, Clone)]
pub enum AttrArg {
    Expr(Expression),
    /// Valueless presence attribute.
    Flag,
}

impl AttrArg {
    pub fn resolve(&self, ctx: &Context<'_>) -> Result<Value> {
        match self {
            AttrArg::Expr(expr) => expr.resolve(ctx),
            AttrArg::Flag => Ok(Value::from(true)),
        }
    }
}

/// Compiled invocation arguments.
pub type Invocation = (Vec<(String, AttrArg)>, Option<String>);

/// Parses the bits after a tag name into attributes and an optional
/// `:let` binding. Malformed bits are syntax errors at `token`.
pub fn parse_invocation_args(
    parser: &Parser<'_>,
    token: &Token,
    bits: &[String],
) -> Result<Invocation> {
    let mut attributes = Vec::with_capacity(bits.len());
    let mut bind = None;

    for bit in bits {
        if let Some((key, value)) = split_keyword(bit) {
            if key == LET_KEY {
                bind = Some(parse_bind_name(parser, token, value)?);
            } else {
                let expr = parser.compile_filter(value, token)?;
                attributes.push((key.to_string(), AttrArg::Expr(expr)));
            }
        } else if bit == LET_KEY {
            return Err(parser.error(token, "':let' needs a variable name, e.g. :let=\"item\""));
        } else if is_valid_key(bit) {
            attributes.push((bit.clone(), AttrArg::Flag));
        } else {
            return Err(parser.error(
                token,
                format!("malformed attribute '{}' in '{}'", bit, token.contents),
            ));
        }
    }

    Ok((attributes, bind))
}

fn parse_bind_name(parser: &Parser<'_>, token: &Token, raw: &str) -> Result<String> {
    let name = unquote(raw);
    if !BIND_NAME.is_match(name) {
        return Err(parser.error(
            token,
            format!("':let' expects a variable name, got '{}'", raw),
        ));
    }
    Ok(name.to_string())
}

/// Strips one pair of matching quotes.
pub(crate) fn unquote(raw: &str) -> &str {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}
