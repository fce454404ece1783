//! Component registry.
//!
//! [`ComponentRegistry`] maps component names to [`Renderer`]s. A renderer is
//! either a plain function or a [`Component`] object; both are dispatched by
//! [`render_component`](crate::component::render_component).
//!
//! # Naming
//!
//! When no name is given, the name is derived from the renderer's Rust type:
//! the last path segment with generics removed, so `fn card(...)` registers
//! as `card` and `struct Calendar` as `Calendar`. Closures have no usable name
//! and must be registered with an explicit one.
//!
//! # Overwriting
//!
//! Registering an existing name replaces the previous renderer. Templates
//! compiled earlier pick up the new renderer on their next render, since
//! lookup happens at render time.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::component::Component;
use crate::error::{Error, Result};
use crate::template::Context;

/// Signature of a function component.
pub type ComponentFn = dyn Fn(&mut Context<'_>) -> Result<String> + Send + Sync;

/// A render-capable unit.
#[derive(Clone)]
pub enum Renderer {
    Function {
        func: Arc<ComponentFn>,
        type_name: &'static str,
    },
    Component {
        component: Arc<dyn Component>,
        type_name: &'static str,
    },
}

impl Renderer {
    /// Wraps a function component.
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> Result<String> + Send + Sync + 'static,
    {
        Renderer::Function {
            func: Arc::new(func),
            type_name: std::any::type_name::<F>(),
        }
    }

    /// Wraps a component object.
    pub fn component<C: Component + 'static>(component: C) -> Self {
        Renderer::Component {
            component: Arc::new(component),
            type_name: std::any::type_name::<C>(),
        }
    }

    /// The full Rust type name of the wrapped function or component.
    pub fn type_name(&self) -> &'static str {
        match self {
            Renderer::Function { type_name, .. } | Renderer::Component { type_name, .. } => {
                *type_name
            }
        }
    }

    /// The name used when registering without an explicit one.
    pub fn derived_name(&self) -> Result<String> {
        derive_name(self.type_name())
    }

    /// Whether both renderers wrap the same allocation.
    pub fn ptr_eq(&self, other: &Renderer) -> bool {
        match (self, other) {
            (Renderer::Function { func: a, .. }, Renderer::Function { func: b, .. }) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (Renderer::Component { component: a, .. }, Renderer::Component { component: b, .. }) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Renderer::Function { .. } => "Function",
            Renderer::Component { .. } => "Component",
        };
        f.debug_struct("Renderer")
            .field("kind", &kind)
            .field("type_name", &self.type_name())
            .finish()
    }
}

fn derive_name(type_name: &str) -> Result<String> {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    let name = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);
    if name.is_empty() || name.contains(['{', '}', ' ']) {
        return Err(Error::ImproperlyConfigured(format!(
            "cannot derive a component name from '{}', register it with an explicit name",
            type_name
        )));
    }
    Ok(name.to_string())
}

/// Name → renderer mapping, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: IndexMap<String, Renderer>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `renderer` under `name`, or under its derived name.
    ///
    /// Returns the name used. An existing entry is overwritten.
    pub fn register(&mut self, name: Option<&str>, renderer: Renderer) -> Result<String> {
        let name = match name {
            Some(name) => name.to_string(),
            None => renderer.derived_name()?,
        };
        if let Some(previous) = self.components.insert(name.clone(), renderer) {
            warn!(component = %name, previous = previous.type_name(), "overwriting registered component");
        } else {
            debug!(component = %name, "registered component");
        }
        Ok(name)
    }

    pub fn unregister(&mut self, name: &str) -> Result<Renderer> {
        self.components
            .shift_remove(name)
            .ok_or_else(|| Error::ComponentNotRegistered(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<&Renderer> {
        self.components
            .get(name)
            .ok_or_else(|| Error::ComponentNotRegistered(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Every registration, in registration order.
    pub fn all(&self) -> &IndexMap<String, Renderer> {
        &self.components
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello(_ctx: &mut Context<'_>) -> Result<String> {
        Ok("hello".into())
    }

    struct Calendar;
    impl Component for Calendar {}

    #[test]
    fn test_register_and_get() {
        let mut registry = ComponentRegistry::new();
        registry
            .register(Some("card"), Renderer::function(hello))
            .unwrap();
        assert!(registry.contains("card"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("card").is_ok());
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = ComponentRegistry::new();
        let a = Renderer::function(|_: &mut Context<'_>| Ok("A".to_string()));
        let b = Renderer::function(|_: &mut Context<'_>| Ok("B".to_string()));
        registry.register(Some("card"), a.clone()).unwrap();
        registry.register(Some("card"), b.clone()).unwrap();

        let current = registry.get("card").unwrap();
        assert!(current.ptr_eq(&b));
        assert!(!current.ptr_eq(&a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_name_is_not_registered() {
        let registry = ComponentRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(Error::ComponentNotRegistered(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_unregister() {
        let mut registry = ComponentRegistry::new();
        registry.register(Some("card"), Renderer::function(hello)).unwrap();
        assert!(registry.unregister("card").is_ok());
        assert!(registry.is_empty());
        assert!(matches!(
            registry.unregister("card"),
            Err(Error::ComponentNotRegistered(_))
        ));
    }

    #[test]
    fn test_derived_names() {
        let mut registry = ComponentRegistry::new();
        let name = registry.register(None, Renderer::function(hello)).unwrap();
        assert_eq!(name, "hello");
        let name = registry
            .register(None, Renderer::component(Calendar))
            .unwrap();
        assert_eq!(name, "Calendar");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["hello", "Calendar"]);
    }

    #[test]
    fn test_closures_need_explicit_names() {
        let mut registry = ComponentRegistry::new();
        let closure = Renderer::function(|_: &mut Context<'_>| Ok(String::new()));
        assert!(matches!(
            registry.register(None, closure),
            Err(Error::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn test_derive_name_strips_generics() {
        assert_eq!(derive_name("app::widgets::Table<u8>").unwrap(), "Table");
    }

    #[test]
    fn test_clear() {
        let mut registry = ComponentRegistry::new();
        registry.register(Some("a"), Renderer::function(hello)).unwrap();
        registry.register(Some("b"), Renderer::function(hello)).unwrap();
        registry.clear();
        assert!(registry.all().is_empty());
    }
}
