//! Tag library: the table of block tag names and their parse handlers.
//!
//! Every entry records who installed it, so a component whose formatted tag
//! names clash with a built-in or another component's tags can be rejected
//! with a useful message instead of silently shadowing it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::lexer::Token;
use super::nodes::Node;
use super::parser::Parser;
use crate::error::Result;

/// Parses one block tag into a node.
///
/// The handler receives the parser positioned just after the tag, so block
/// tags consume their own bodies with [`Parser::parse_until`].
pub trait TagHandler: Send + Sync {
    fn parse(&self, parser: &mut Parser<'_>, token: &Token) -> Result<Box<dyn Node>>;
}

impl<F> TagHandler for F
where
    F: Fn(&mut Parser<'_>, &Token) -> Result<Box<dyn Node>> + Send + Sync,
{
    fn parse(&self, parser: &mut Parser<'_>, token: &Token) -> Result<Box<dyn Node>> {
        self(parser, token)
    }
}

/// Who installed a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOwner {
    Builtin,
    Component(String),
}

impl fmt::Display for TagOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagOwner::Builtin => f.write_str("a built-in tag"),
            TagOwner::Component(name) => write!(f, "component \"{}\"", name),
        }
    }
}

#[derive(Clone)]
struct TagEntry {
    owner: TagOwner,
    handler: Arc<dyn TagHandler>,
}

#[derive(Clone, Default)]
pub struct TagLibrary {
    tags: HashMap<String, TagEntry>,
}

impl TagLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a handler, replacing whatever was installed under `name`.
    pub fn insert(&mut self, name: impl Into<String>, owner: TagOwner, handler: Arc<dyn TagHandler>) {
        self.tags.insert(name.into(), TagEntry { owner, handler });
    }

    pub fn insert_builtin(&mut self, name: impl Into<String>, handler: impl TagHandler + 'static) {
        self.insert(name, TagOwner::Builtin, Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TagHandler>> {
        self.tags.get(name).map(|entry| Arc::clone(&entry.handler))
    }

    pub fn owner(&self, name: &str) -> Option<&TagOwner> {
        self.tags.get(name).map(|entry| &entry.owner)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    /// Removes every tag installed by `component`, returning how many.
    pub fn remove_owned_by(&mut self, component: &str) -> usize {
        let before = self.tags.len();
        self.tags
            .retain(|_, entry| !matches!(&entry.owner, TagOwner::Component(name) if name == component));
        before - self.tags.len()
    }

    /// Removes every component-owned tag.
    pub fn remove_components(&mut self) {
        self.tags
            .retain(|_, entry| entry.owner == TagOwner::Builtin);
    }

    /// Tag names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for TagLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagLibrary")
            .field("names", &self.names())
            .finish()
    }
}
