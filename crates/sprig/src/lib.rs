//! # Sprig - Reusable Template Components
//!
//! `sprig` lets template authors define reusable components (named template
//! fragments with attributes and content slots) and invoke them with tags:
//!
//! ```text
//! {% card title="Fruits" class="mb-4" %}
//!   {% slot "header" %}<h2>Fruits</h2>{% endslot %}
//!   Everything else goes to the default slot.
//! {% endcard %}
//!
//! {% #icon name="check" %}
//! ```
//!
//! ## Core Concepts
//!
//! - [`AttributeBag`]: ordered keyword arguments of one invocation, rendered as
//!   HTML attributes by `{{ attributes }}`
//! - [`Slots`]: the content regions an invoker passes, by name, each holding
//!   every instance in document order
//! - [`Component`] / function components: the render contract, registered in
//!   a [`ComponentRegistry`]
//! - [`TagFormatter`]: maps a component name to its block, end and inline tags
//! - [`Engine`]: owns all of the above plus the template loader and cache
//!
//! ## Quick Start
//!
//! ```rust
//! use sprig::{Context, Engine};
//! use minijinja::context;
//!
//! let mut engine = Engine::new();
//! engine.add_template(
//!     "list",
//!     "<ul {{ attributes }}>{% for item in slots.item %}<li>{% render_slot item %}</li>{% endfor %}</ul>",
//! );
//! engine.register_fn("list", |ctx: &mut Context<'_>| ctx.render_template("list"))?;
//!
//! let html = engine.render_str(
//!     r#"{% list class="fruits" %}{% slot item %}{{ a }}{% endslot %}{% slot item %}{{ b }}{% endslot %}{% endlist %}"#,
//!     &context! { a => "Apple", b => "Banana" },
//! )?;
//! assert_eq!(html, r#"<ul class="fruits"><li>Apple</li><li>Banana</li></ul>"#);
//! # Ok::<(), sprig::Error>(())
//! ```
//!
//! ## Scoped Slots
//!
//! A slot can declare `:let="name"`; the component passes a value to it with
//! `{% render_slot slot value %}` and the slot body sees it as `name`:
//!
//! ```rust
//! use sprig::{Context, Engine};
//! use minijinja::context;
//!
//! let mut engine = Engine::new();
//! engine.register_fn("table", |ctx: &mut Context<'_>| {
//!     ctx.render_str(
//!         "{% for row in rows %}<tr>{% for col in slots.column %}<td>{% render_slot col row %}</td>{% endfor %}</tr>{% endfor %}",
//!     )
//! })?;
//!
//! let html = engine.render_str(
//!     r#"{% table %}{% slot column :let="r" %}{{ r.name }}{% endslot %}{% slot column :let="r" %}{{ r.qty }}{% endslot %}{% endtable %}"#,
//!     &context! { rows => vec![context! { name => "Apple", qty => 3 }] },
//! )?;
//! assert_eq!(html, "<tr><td>Apple</td><td>3</td></tr>");
//! # Ok::<(), sprig::Error>(())
//! ```
//!
//! ## Attribute Merging
//!
//! `{% merge_attrs attributes class="btn" type="button" %}` renders the bag
//! over defaults: `class` values are concatenated, other keys from the bag
//! override the defaults, and `key+=value` appends. See [`attributes`].
//!
//! ## Configuration
//!
//! [`Settings`] (YAML or JSON) choose the default slot name and the tag
//! formatter; pass them to [`Engine::builder`].
//!
//! ## Logging
//!
//! The crate emits `tracing` events (registration and compilation at
//! `debug`, overwrites at `warn`, slot rendering at `trace`) and never
//! installs a subscriber.

pub mod attributes;
pub mod component;
pub mod config;
mod engine;
mod error;
pub mod registry;
pub mod slots;
pub mod tag_formatter;
pub mod tags;
pub mod template;
mod util;

// Error type
pub use error::{Error, Result, SourceLocation};

// Attribute model exports
pub use attributes::{
    append, append_attributes, attributes_to_string, merge, merge_attributes, normalize_class,
    split_attributes, AttributeBag,
};

// Component contract and registry
pub use component::{render_component, Component, ContextData};
pub use registry::{ComponentFn, ComponentRegistry, Renderer};

// Slot tree
pub use slots::{Slot, SlotList, SlotTemplate, Slots};

// Tag formatters
pub use tag_formatter::{ComponentTagFormatter, PrefixedTagFormatter, TagFormatter, TagNames};

// Configuration
pub use config::{FormatterSetting, Settings, DEFAULT_SLOT_NAME};

// Engine and host template exports
pub use engine::{Engine, EngineBuilder};
pub use template::{
    Context, DirectoryLoader, Expression, MemoryLoader, Scope, Template, TemplateLoader,
    TEMPLATE_EXTENSIONS,
};

// Values flowing through templates
pub use minijinja::Value;
