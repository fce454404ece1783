//! The component render contract and dispatch.
//!
//! Two kinds of renderer can be registered:
//!
//! - a function `Fn(&mut Context) -> Result<String>`, which sees
//!   `attributes` and `slots` in the context and returns markup
//! - a [`Component`] object, which can reshape the context in
//!   [`get_context_data`](Component::get_context_data) before its template
//!   is rendered
//!
//! ```rust
//! use sprig::{AttributeBag, Component, ContextData, Engine, Result, Slots, Value};
//!
//! struct Greeting;
//!
//! impl Component for Greeting {
//!     fn template(&self) -> Option<&str> {
//!         Some("<p {{ attributes }}>Hello, {{ who }}!</p>")
//!     }
//!
//!     fn get_context_data(&self, attributes: &mut AttributeBag, _slots: &Slots) -> Result<ContextData> {
//!         let who = attributes.remove("who").unwrap_or_else(|| Value::from("world"));
//!         Ok(ContextData::from([("who".to_string(), who)]))
//!     }
//! }
//!
//! let mut engine = Engine::new();
//! engine.register_component("greeting", Greeting)?;
//! let html = engine.render_str(r#"{% #greeting who="Ann" class="hi" %}"#, &())?;
//! assert_eq!(html, r#"<p class="hi">Hello, Ann!</p>"#);
//! # Ok::<(), sprig::Error>(())
//! ```

use indexmap::IndexMap;
use minijinja::value::Value;
use tracing::debug;

use crate::attributes::AttributeBag;
use crate::error::{Error, Result};
use crate::registry::Renderer;
use crate::slots::Slots;
use crate::template::{Context, Scope};

/// Extra context produced by [`Component::get_context_data`].
pub type ContextData = IndexMap<String, Value>;

/// A component backed by a template.
///
/// Every method has a default, so a unit struct with just a
/// [`template_name`](Self::template_name) is a complete component.
pub trait Component: Send + Sync {
    /// Name of the template to load through the engine's loader.
    fn template_name(&self) -> Option<&str> {
        None
    }

    /// Inline template source, used when there is no
    /// [`template_name`](Self::template_name). Compiled once per registered
    /// name and cached until the name is registered again.
    fn template(&self) -> Option<&str> {
        None
    }

    /// Builds extra context for the template.
    ///
    /// May mutate `attributes` (e.g. to move a key out of the rendered
    /// attributes); the mutated bag is what the template sees.
    fn get_context_data(
        &self,
        _attributes: &mut AttributeBag,
        _slots: &Slots,
    ) -> Result<ContextData> {
        Ok(ContextData::new())
    }

    /// Renders the component registered as `name` against a context
    /// already holding `attributes`, `slots` and the context data.
    fn render(&self, name: &str, ctx: &mut Context<'_>) -> Result<String> {
        if let Some(template_name) = self.template_name() {
            return ctx.render_template(template_name);
        }
        if let Some(source) = self.template() {
            return ctx.render_cached(Some(&inline_template_key(name)), source);
        }
        Err(Error::ImproperlyConfigured(format!(
            "component {} has neither a template name nor an inline template",
            std::any::type_name::<Self>()
        )))
    }
}

/// Cache key for the inline template of the component registered as `name`.
pub(crate) fn inline_template_key(name: &str) -> String {
    format!("component:{}", name)
}

/// Renders the component registered as `name`.
///
/// Looks the component up, pushes a scope holding `attributes` and `slots`
/// over `ctx`, and dispatches to the renderer. Outer variables stay visible;
/// nothing bound here outlives the call.
pub fn render_component(
    name: &str,
    attributes: AttributeBag,
    slots: Slots,
    ctx: &mut Context<'_>,
) -> Result<String> {
    let engine = ctx.engine();
    let renderer = engine.registry().get(name)?;
    debug!(component = name, renderer = renderer.type_name(), "rendering component");

    ctx.nested(|ctx| dispatch(name, renderer, attributes, slots, ctx))
}

fn dispatch(
    name: &str,
    renderer: &Renderer,
    mut attributes: AttributeBag,
    slots: Slots,
    ctx: &mut Context<'_>,
) -> Result<String> {
    let mut scope = Scope::new();
    match renderer {
        Renderer::Function { func, .. } => {
            scope.insert("attributes".into(), attributes.into_value());
            scope.insert("slots".into(), slots.into_value());
            ctx.with_scope(scope, |ctx| func(ctx))
        }
        Renderer::Component { component, .. } => {
            let data = component.get_context_data(&mut attributes, &slots)?;
            scope.insert("attributes".into(), attributes.into_value());
            scope.insert("slots".into(), slots.into_value());
            scope.extend(data);
            ctx.with_scope(scope, |ctx| component.render(name, ctx))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;

    struct Inline(&'static str);

    impl Component for Inline {
        fn template(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    #[test]
    fn test_inline_templates_are_cached_per_registered_name() {
        let mut engine = Engine::new();
        engine.register_component("a", Inline("<a>")).unwrap();
        engine.register_component("b", Inline("<b>")).unwrap();
        assert_eq!(engine.render_str("{% #a %}{% #b %}", &()).unwrap(), "<a><b>");
    }

    #[test]
    fn test_reregistering_drops_cached_inline_template() {
        let mut engine = Engine::new();
        engine.register_component("a", Inline("v1")).unwrap();
        assert_eq!(engine.render_str("{% #a %}", &()).unwrap(), "v1");
        engine.register_component("a", Inline("v2")).unwrap();
        assert_eq!(engine.render_str("{% #a %}", &()).unwrap(), "v2");
    }

    #[test]
    fn test_component_without_template_is_misconfigured() {
        struct Empty;
        impl Component for Empty {}
        let mut engine = Engine::new();
        engine.register_component("empty", Empty).unwrap();
        assert!(matches!(
            engine.render_str("{% #empty %}", &()),
            Err(Error::ImproperlyConfigured(_))
        ));
    }
}
