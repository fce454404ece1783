//! Compiled expressions, evaluated by the engine's minijinja environment.
//!
//! ```text
//! "Hello"                 string literal (safe)
//! 42, 1.5, True, None     constants
//! user.name, rows.0       attribute and index lookup
//! name|upper              filter
//! title|default("x")      filter with arguments
//! ```
//!
//! The source is checked when the template is compiled and evaluated again on
//! every render, so one compiled template renders correctly against different
//! contexts. Expressions that reference no variables are folded to their value
//! at compile time.

use std::sync::Arc;

use minijinja::value::Value;
use minijinja::Environment;

use super::context::Context;
use crate::error::Result;

#[derive(Debug, Clone)]
enum Compiled {
    Constant(Value),
    Dynamic,
}

/// A compiled, lazily-evaluable expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: Arc<str>,
    compiled: Compiled,
}

impl Expression {
    /// Compiles `text` against `env`.
    ///
    /// The error is a bare message; callers attach the source location.
    pub fn compile(text: &str, env: &Environment<'static>) -> std::result::Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("empty expression".to_string());
        }
        let expr = env
            .compile_expression_owned(text.to_string())
            .map_err(|err| format!("invalid expression '{}': {}", text, err))?;

        let compiled = if expr.undeclared_variables(false).is_empty() {
            let value = expr
                .eval(())
                .map_err(|err| format!("invalid expression '{}': {}", text, err))?;
            Compiled::Constant(mark_literal_safe(text, value))
        } else {
            Compiled::Dynamic
        };

        Ok(Self {
            source: Arc::from(text),
            compiled,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression. Missing variables resolve to undefined.
    pub fn resolve(&self, ctx: &Context<'_>) -> Result<Value> {
        match &self.compiled {
            Compiled::Constant(value) => Ok(value.clone()),
            Compiled::Dynamic => {
                let env = ctx.engine().env();
                let expr = env.compile_expression_owned(self.source.to_string())?;
                Ok(expr.eval(ctx.to_value())?)
            }
        }
    }
}

/// A bare quoted string is template text, so it is not escaped on output.
fn mark_literal_safe(text: &str, value: Value) -> Value {
    let quoted = ['"', '\'']
        .into_iter()
        .any(|q| text.len() >= 2 && text.starts_with(q) && text.ends_with(q));
    match value.as_str() {
        Some(s) if quoted => Value::from_safe_string(s.to_string()),
        _ => value,
    }
}
