//! The host template engine components are compiled into.
//!
//! A small Django-flavoured tag language whose `{{ }}` and tag-argument
//! expressions are evaluated by minijinja:
//!
//! ```text
//! {{ user.name|default("anonymous") }}
//! {% for item in items %}{{ forloop.counter }}. {{ item }}{% empty %}none{% endfor %}
//! {% if not hidden %}…{% elif kind == "a" %}…{% else %}…{% endif %}
//! {% with title="Fruits" %}{{ title }}{% endwith %}
//! {# comment #}
//! ```
//!
//! Compilation goes lexer → [`Parser`] → a tree of [`Node`]s. Block tags are
//! dispatched through the [`TagLibrary`], which is also where the component
//! tag compiler installs its tags. Compiled [`Template`]s are immutable and
//! shareable; each render gets its own [`Context`].
//!
//! ## Key Types
//!
//! - [`Template`]: a compiled template
//! - [`Context`]: layered variable scopes for one render
//! - [`TagLibrary`] / [`TagHandler`]: tag name → parse handler table
//! - [`TemplateLoader`]: name → source, see [`MemoryLoader`] and [`DirectoryLoader`]
//! - [`Expression`]: a compiled minijinja expression

pub mod context;
pub mod expr;
pub mod filters;
pub mod lexer;
pub mod library;
pub mod loader;
pub mod nodes;
pub mod parser;

pub use context::{Context, Scope, MAX_DEPTH};
pub use expr::Expression;
pub use filters::register_filters;
pub use lexer::{split_contents, tokenize, Token, TokenKind};
pub use library::{TagHandler, TagLibrary, TagOwner};
pub use loader::{DirectoryLoader, MemoryLoader, TemplateLoader, TEMPLATE_EXTENSIONS};
pub use nodes::{render_nodes, render_to_string, Node, NodeList, TextNode, VariableNode};
pub use parser::Parser;

use crate::error::Result;

/// A compiled template.
#[derive(Debug)]
pub struct Template {
    name: Option<String>,
    nodes: NodeList,
}

impl Template {
    pub(crate) fn new(name: Option<&str>, nodes: NodeList) -> Self {
        Self {
            name: name.map(str::to_string),
            nodes,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Renders against `ctx`. Bindings made during the render do not
    /// outlive it.
    pub fn render(&self, ctx: &mut Context<'_>) -> Result<String> {
        ctx.with_scope(Scope::new(), |ctx| render_to_string(&self.nodes, ctx))
    }
}
