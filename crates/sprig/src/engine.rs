//! The engine: settings, tags, components, expressions and templates in one place.
//!
//! ```rust
//! use sprig::{Context, Engine};
//! use minijinja::context;
//!
//! let mut engine = Engine::new();
//! engine.add_template("card", r#"<div {{ attributes }}>{% render_slot slots.inner_block %}</div>"#);
//! engine.register_fn("card", |ctx: &mut Context<'_>| ctx.render_template("card"))?;
//!
//! let html = engine.render_str(
//!     r#"{% card class="box" %}Hi {{ name }}{% endcard %}"#,
//!     &context! { name => "Ann" },
//! )?;
//! assert_eq!(html, r#"<div class="box">Hi Ann</div>"#);
//! # Ok::<(), sprig::Error>(())
//! ```
//!
//! # Templates
//!
//! Named templates resolve inline-first: templates added with
//! [`Engine::add_template`] win over the configured [`TemplateLoader`].
//! Compiled named templates are cached until [`Engine::clear_cache`].
//!
//! # Registration
//!
//! [`Engine::register`] adds the component to the registry and installs its
//! three tags. Registration fails, leaving the engine unchanged, when a tag
//! name is already owned by a built-in tag or another component.
//!
//! # Expressions
//!
//! `{{ }}` and tag arguments are evaluated by a minijinja [`Environment`]
//! owned by the engine, with chainable undefined lookups. Its filters are
//! minijinja's built-ins plus those from
//! [`register_filters`](crate::template::register_filters); add more with
//! [`Engine::add_filter`] or [`EngineBuilder::filter`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult};
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use tracing::debug;

use crate::component::{inline_template_key, Component};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::registry::{ComponentRegistry, Renderer};
use crate::tag_formatter::{TagFormatter, TagNames};
use crate::tags::{self, ComponentTag};
use crate::template::nodes::{install_builtins, unexpected_tag};
use crate::template::{
    register_filters, tokenize, Context, MemoryLoader, Parser, TagLibrary, TagOwner, Template,
    TemplateLoader,
};

type TemplateCache = Mutex<HashMap<String, Arc<Template>>>;

pub struct Engine {
    settings: Settings,
    formatter: Arc<dyn TagFormatter>,
    library: TagLibrary,
    registry: ComponentRegistry,
    env: Environment<'static>,
    inline: MemoryLoader,
    loader: Option<Box<dyn TemplateLoader>>,
    named: TemplateCache,
    keyed: TemplateCache,
}

impl Engine {
    /// An engine with default settings and the built-in filters.
    pub fn new() -> Self {
        let settings = Settings::default();
        let formatter = settings.formatter();
        Self::with_parts(settings, formatter, base_environment(), None)
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn with_parts(
        settings: Settings,
        formatter: Arc<dyn TagFormatter>,
        env: Environment<'static>,
        loader: Option<Box<dyn TemplateLoader>>,
    ) -> Self {
        let mut library = TagLibrary::new();
        install_builtins(&mut library);
        tags::install(&mut library);
        Self {
            settings,
            formatter,
            library,
            registry: ComponentRegistry::new(),
            env,
            inline: MemoryLoader::new(),
            loader,
            named: Mutex::new(HashMap::new()),
            keyed: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn formatter(&self) -> &dyn TagFormatter {
        self.formatter.as_ref()
    }

    pub fn library(&self) -> &TagLibrary {
        &self.library
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The environment expressions are compiled and evaluated in.
    pub fn env(&self) -> &Environment<'static> {
        &self.env
    }

    /// Registers a component and installs its tags.
    ///
    /// Without `name` the name is derived from the renderer's type. Returns
    /// the name used. Registering an existing name replaces it.
    pub fn register(&mut self, name: Option<&str>, renderer: Renderer) -> Result<String> {
        let name = match name {
            Some(name) => name.to_string(),
            None => renderer.derived_name()?,
        };
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::ImproperlyConfigured(format!(
                "invalid component name '{}'",
                name
            )));
        }

        let tags = self.formatter.tag_names(&name);
        tags.validate()?;
        self.check_collisions(&name, &tags)?;

        self.library.remove_owned_by(&name);
        let owner = TagOwner::Component(name.clone());
        self.library.insert(
            tags.block_start.clone(),
            owner.clone(),
            Arc::new(ComponentTag::block(&name, &tags.block_end)),
        );
        self.library.insert(
            tags.inline.clone(),
            owner.clone(),
            Arc::new(ComponentTag::inline(&name)),
        );
        self.library
            .insert(tags.block_end.clone(), owner, Arc::new(unexpected_tag));
        lock(&self.keyed).remove(&inline_template_key(&name));
        debug!(
            component = %name,
            block = %tags.block_start,
            inline = %tags.inline,
            "installed component tags"
        );

        self.registry.register(Some(&name), renderer)
    }

    fn check_collisions(&self, name: &str, tags: &TagNames) -> Result<()> {
        for tag in tags.iter() {
            match self.library.owner(tag) {
                Some(TagOwner::Component(owner)) if owner == name => {}
                Some(existing) => {
                    return Err(Error::TagNameCollision {
                        tag: tag.to_string(),
                        existing: existing.to_string(),
                    })
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Registers a function component under `name`.
    pub fn register_fn<F>(&mut self, name: &str, func: F) -> Result<String>
    where
        F: Fn(&mut Context<'_>) -> Result<String> + Send + Sync + 'static,
    {
        self.register(Some(name), Renderer::function(func))
    }

    /// Registers a [`Component`] under `name`.
    pub fn register_component<C: Component + 'static>(
        &mut self,
        name: &str,
        component: C,
    ) -> Result<String> {
        self.register(Some(name), Renderer::component(component))
    }

    /// Removes a component and its tags.
    pub fn unregister(&mut self, name: &str) -> Result<Renderer> {
        let renderer = self.registry.unregister(name)?;
        self.library.remove_owned_by(name);
        lock(&self.keyed).remove(&inline_template_key(name));
        debug!(component = name, "unregistered component");
        Ok(renderer)
    }

    /// Removes every component and its tags.
    pub fn clear_components(&mut self) {
        for name in self.registry.names() {
            lock(&self.keyed).remove(&inline_template_key(name));
        }
        self.registry.clear();
        self.library.remove_components();
    }

    /// Registers an extra filter, replacing any filter of the same name.
    ///
    /// Filters are minijinja functions, so typed arguments work:
    /// `engine.add_filter("shout", |s: String| format!("{}!", s))`.
    pub fn add_filter<N, F, Rv, Args>(&mut self, name: N, filter: F)
    where
        N: Into<Cow<'static, str>>,
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.env.add_filter(name, filter);
    }

    /// Adds an inline template. It takes priority over the loader.
    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) {
        let name = name.into();
        lock(&self.named).remove(&name);
        self.inline.add(name, source);
    }

    /// Compiles an unnamed template.
    pub fn compile(&self, source: &str) -> Result<Template> {
        self.compile_inner(None, source)
    }

    /// Compiles a template, labelling errors with `name`.
    pub fn compile_named(&self, name: &str, source: &str) -> Result<Template> {
        self.compile_inner(Some(name), source)
    }

    fn compile_inner(&self, name: Option<&str>, source: &str) -> Result<Template> {
        let tokens = tokenize(source, name)?;
        let mut parser = Parser::new(self, tokens, name);
        let (nodes, _) = parser.parse(&[])?;
        debug!(template = name.unwrap_or("<string>"), nodes = nodes.len(), "compiled template");
        Ok(Template::new(name, nodes))
    }

    /// Loads and compiles a named template, caching the result.
    pub fn get_template(&self, name: &str) -> Result<Arc<Template>> {
        if let Some(template) = lock(&self.named).get(name) {
            return Ok(Arc::clone(template));
        }

        let source = match self.inline.load(name) {
            Ok(source) => source,
            Err(Error::TemplateNotFound(_)) => match &self.loader {
                Some(loader) => loader.load(name)?,
                None => return Err(Error::TemplateNotFound(name.to_string())),
            },
            Err(err) => return Err(err),
        };

        let template = Arc::new(self.compile_named(name, &source)?);
        lock(&self.named).insert(name.to_string(), Arc::clone(&template));
        Ok(template)
    }

    /// Compiles `source`, memoized under `key`. Without a key nothing is
    /// cached.
    pub fn cached_template(&self, key: Option<&str>, source: &str) -> Result<Arc<Template>> {
        let Some(key) = key else {
            return self.compile(source).map(Arc::new);
        };
        if let Some(template) = lock(&self.keyed).get(key) {
            return Ok(Arc::clone(template));
        }
        let template = Arc::new(self.compile_named(key, source)?);
        lock(&self.keyed).insert(key.to_string(), Arc::clone(&template));
        Ok(template)
    }

    /// Drops every cached compiled template.
    pub fn clear_cache(&self) {
        lock(&self.named).clear();
        lock(&self.keyed).clear();
    }

    /// A fresh render context.
    pub fn new_context(&self) -> Context<'_> {
        Context::new(self)
    }

    /// Compiles and renders `source` with `data` as the root scope.
    pub fn render_str<S: Serialize + ?Sized>(&self, source: &str, data: &S) -> Result<String> {
        let mut ctx = Context::from_serialize(self, data)?;
        self.compile(source)?.render(&mut ctx)
    }

    /// Renders the named template with `data` as the root scope.
    pub fn render_template<S: Serialize + ?Sized>(&self, name: &str, data: &S) -> Result<String> {
        let mut ctx = Context::from_serialize(self, data)?;
        self.get_template(name)?.render(&mut ctx)
    }

    /// Renders `source` through the keyed cache.
    pub fn render_cached<S: Serialize + ?Sized>(
        &self,
        key: Option<&str>,
        source: &str,
        data: &S,
    ) -> Result<String> {
        let mut ctx = Context::from_serialize(self, data)?;
        self.cached_template(key, source)?.render(&mut ctx)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("formatter", &self.formatter)
            .field("components", &self.registry.names().collect::<Vec<_>>())
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn base_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    register_filters(&mut env);
    env
}

/// Builds an [`Engine`] with non-default settings, formatter, loader or
/// filters.
///
/// ```rust
/// use sprig::{Engine, MemoryLoader, PrefixedTagFormatter};
///
/// let engine = Engine::builder()
///     .formatter(PrefixedTagFormatter::new("x-"))
///     .loader(MemoryLoader::from_iter([("page", "hi")]))
///     .build()
///     .unwrap();
/// assert_eq!(engine.render_template("page", &()).unwrap(), "hi");
/// ```
pub struct EngineBuilder {
    settings: Option<Settings>,
    formatter: Option<Arc<dyn TagFormatter>>,
    loader: Option<Box<dyn TemplateLoader>>,
    env: Environment<'static>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            settings: None,
            formatter: None,
            loader: None,
            env: base_environment(),
        }
    }
}

impl EngineBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Uses `formatter` instead of the one named in the settings.
    pub fn formatter(mut self, formatter: impl TagFormatter + 'static) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn loader(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Adds a filter, see [`Engine::add_filter`].
    pub fn filter<N, F, Rv, Args>(mut self, name: N, filter: F) -> Self
    where
        N: Into<Cow<'static, str>>,
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.env.add_filter(name, filter);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let settings = self.settings.unwrap_or_default();
        let formatter = self.formatter.unwrap_or_else(|| settings.formatter());

        // Formatter output is checked up front so a broken formatter fails at
        // build time rather than on the first registration.
        formatter.tag_names("component").validate()?;

        debug!(slot = %settings.default_slot_name, formatter = ?formatter, "building engine");
        Ok(Engine::with_parts(settings, formatter, self.env, self.loader))
    }
}
