//! Layered render context.
//!
//! A [`Context`] is a stack of scopes. Lookups walk from the innermost scope
//! outward, writes go to the innermost scope, and every pushed scope is popped
//! when the construct that pushed it (a `for` loop, a `with` block, a
//! component, a slot body) finishes. Nothing bound inside leaks to siblings.
//!
//! Each render owns its context; compiled templates are shared.

use std::collections::HashMap;

use minijinja::value::{Value, ValueKind};
use serde::Serialize;

use crate::attributes::AttributeBag;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::slots::Slots;
use crate::util::value_to_str;

/// One layer of variables.
pub type Scope = HashMap<String, Value>;

/// Maximum number of nested component and slot renders.
pub const MAX_DEPTH: usize = 64;

/// Variable environment for a single render.
#[derive(Debug)]
pub struct Context<'env> {
    engine: &'env Engine,
    scopes: Vec<Scope>,
    depth: usize,
}

impl<'env> Context<'env> {
    /// Creates an empty context.
    pub fn new(engine: &'env Engine) -> Self {
        Self {
            engine,
            scopes: vec![Scope::new()],
            depth: 0,
        }
    }

    /// Creates a context whose root scope holds the top-level keys of `data`.
    pub fn from_serialize<S: Serialize + ?Sized>(engine: &'env Engine, data: &S) -> Result<Self> {
        Self::from_value(engine, Value::from_serialize(data))
    }

    /// Creates a context from a mapping value. Undefined and `None` give an
    /// empty context.
    pub fn from_value(engine: &'env Engine, data: Value) -> Result<Self> {
        let mut ctx = Self::new(engine);
        match data.kind() {
            ValueKind::Undefined | ValueKind::None => {}
            ValueKind::Map => {
                let keys = data.try_iter().map_err(|e| Error::Render(e.to_string()))?;
                for key in keys {
                    let value = data.get_item(&key).unwrap_or(Value::UNDEFINED);
                    ctx.set(value_to_str(&key), value);
                }
            }
            kind => {
                return Err(Error::Render(format!(
                    "context data must be a mapping, got {}",
                    kind
                )))
            }
        }
        Ok(ctx)
    }

    pub fn engine(&self) -> &'env Engine {
        self.engine
    }

    /// Looks a name up, innermost scope first. Missing names are undefined.
    pub fn get(&self, name: &str) -> Value {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
            .unwrap_or(Value::UNDEFINED)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    /// Binds a name in the innermost scope.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value.into());
        }
    }

    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    /// Pops the innermost scope. The root scope is never popped.
    pub fn pop(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Runs `f` with `scope` pushed, popping it afterwards even when `f` fails.
    pub fn with_scope<R>(&mut self, scope: Scope, f: impl FnOnce(&mut Self) -> R) -> R {
        let height = self.scopes.len();
        self.push(scope);
        let result = f(self);
        self.scopes.truncate(height);
        result
    }

    /// Number of scopes, root included.
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Collapses all scopes into one map, inner bindings winning.
    pub fn flatten(&self) -> Scope {
        let mut flat = Scope::new();
        for scope in &self.scopes {
            for (key, value) in scope {
                flat.insert(key.clone(), value.clone());
            }
        }
        flat
    }

    /// The visible variables as one map value, for expression evaluation.
    pub fn to_value(&self) -> Value {
        Value::from_iter(self.flatten())
    }

    /// The `attributes` bag visible at this point, or an empty bag.
    pub fn attributes(&self) -> Result<AttributeBag> {
        AttributeBag::from_value(&self.get("attributes"))
    }

    /// Replaces `attributes` in the innermost scope.
    pub fn set_attributes(&mut self, attributes: AttributeBag) {
        self.set("attributes", attributes.into_value());
    }

    /// Removes `key` from the visible `attributes` and returns its value.
    ///
    /// Lets a component turn an attribute into ordinary data so it is not
    /// rendered by `{{ attributes }}`.
    pub fn take_attribute(&mut self, key: &str) -> Result<Option<Value>> {
        let mut attributes = self.attributes()?;
        let taken = attributes.remove(key);
        if taken.is_some() {
            self.set_attributes(attributes);
        }
        Ok(taken)
    }

    /// The `slots` visible at this point, if any.
    pub fn slots(&self) -> Option<Slots> {
        self.get("slots").downcast_object_ref::<Slots>().cloned()
    }

    /// Runs `f` one level deeper, failing with
    /// [`Error::RecursionLimit`] past [`MAX_DEPTH`]. Component and slot
    /// renders both count.
    pub(crate) fn nested<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::RecursionLimit(MAX_DEPTH));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Compiles and renders `source` against this context.
    pub fn render_str(&mut self, source: &str) -> Result<String> {
        let engine = self.engine;
        engine.compile(source)?.render(self)
    }

    /// Renders `source`, memoizing the compiled template under `key`.
    ///
    /// Without a key the source is compiled every time.
    pub fn render_cached(&mut self, key: Option<&str>, source: &str) -> Result<String> {
        let engine = self.engine;
        engine.cached_template(key, source)?.render(self)
    }

    /// Loads the named template through the engine and renders it.
    pub fn render_template(&mut self, name: &str) -> Result<String> {
        let engine = self.engine;
        engine.get_template(name)?.render(self)
    }
}
