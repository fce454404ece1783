//! Slot tree: the content an invoker passes to a component.
//!
//! At compile time a block invocation produces one [`SlotTemplate`] per
//! `{% slot %}` tag, plus one for the default slot. At render time each is
//! resolved into a [`Slot`]: its attribute expressions are evaluated, but its
//! body is kept compiled and only rendered when `{% render_slot %}` reaches
//! it. A component can therefore skip a slot or render it several times.
//!
//! A body belongs to the template that wrote it: `slots` inside it is the
//! collection visible where the slot was defined, not the receiving
//! component's, and `attributes` is the slot instance's own bag. Other
//! variables come from the `render_slot` site, so a component's loop
//! variables are visible. This is what lets a component forward its own slot
//! into a child:
//!
//! ```text
//! {% inner %}{% render_slot slots.inner_block %}{% endinner %}
//! ```
//!
//! Inside a component's template, `slots` is a [`Slots`] map from slot name
//! to [`SlotList`], every instance of that name in document order:
//!
//! ```text
//! {% for item in slots.item %}<li>{% render_slot item %}</li>{% endfor %}
//! {% render_slot slots.inner_block %}
//! {{ slots.header.attributes }}
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use minijinja::value::{Enumerator, Object, ObjectRepr, Value};
use tracing::trace;

use crate::attributes::AttributeBag;
use crate::error::{Error, Result};
use crate::tags::kwargs::AttrArg;
use crate::template::{render_to_string, Context, NodeList, Scope};

/// A compiled slot: attribute expressions, optional `:let` name, body.
#[derive(Debug, Clone)]
pub struct SlotTemplate {
    name: String,
    attributes: Vec<(String, AttrArg)>,
    bind: Option<String>,
    body: Arc<NodeList>,
}

impl SlotTemplate {
    pub(crate) fn new(
        name: impl Into<String>,
        attributes: Vec<(String, AttrArg)>,
        bind: Option<String>,
        body: NodeList,
    ) -> Self {
        Self {
            name: name.into(),
            attributes,
            bind,
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the attribute expressions against `ctx`, the context of
    /// the invocation, and captures its `slots`.
    pub fn resolve(&self, ctx: &Context<'_>) -> Result<Slot> {
        let mut attributes = AttributeBag::new();
        for (key, arg) in &self.attributes {
            attributes.insert(key.clone(), arg.resolve(ctx)?);
        }
        Ok(Slot {
            name: self.name.clone(),
            attributes,
            bind: self.bind.clone(),
            body: Arc::clone(&self.body),
            slots: ctx.get("slots"),
        })
    }
}

/// One slot instance, ready to render.
#[derive(Debug, Clone)]
pub struct Slot {
    name: String,
    attributes: AttributeBag,
    bind: Option<String>,
    body: Arc<NodeList>,
    slots: Value,
}

impl Slot {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    /// The `:let` name the body expects, if any.
    pub fn bind(&self) -> Option<&str> {
        self.bind.as_deref()
    }

    /// Renders the body.
    ///
    /// The body sees the enclosing context with `slots` restored from where
    /// the slot was defined, `attributes` set to this instance's bag and the
    /// `:let` name bound to `value`. Undefined and `None` count as no value. These bindings are
    /// dropped once the body has rendered.
    pub fn render(&self, ctx: &mut Context<'_>, value: Option<&Value>) -> Result<String> {
        let value = value.filter(|v| !v.is_undefined() && !v.is_none());
        let mut scope = Scope::new();
        scope.insert("slots".into(), self.slots.clone());
        scope.insert("attributes".into(), self.attributes.clone().into_value());
        match (&self.bind, value) {
            (Some(bind), Some(value)) => {
                scope.insert(bind.clone(), value.clone());
            }
            (Some(bind), None) => {
                return Err(Error::Render(format!(
                    "slot '{}' expects a value for ':let={}' but render_slot passed none",
                    self.name, bind
                )));
            }
            (None, _) => {}
        }
        trace!(slot = %self.name, "rendering slot");
        ctx.nested(|ctx| ctx.with_scope(scope, |ctx| render_to_string(&self.body, ctx)))
    }

    pub fn into_value(self) -> Value {
        Value::from_object(self)
    }
}

impl Object for Slot {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "name" => Some(Value::from(self.name.as_str())),
            "attributes" => Some(self.attributes.clone().into_value()),
            _ => None,
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(&["name", "attributes"])
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<slot {}>", self.name)
    }
}

/// Every instance of one slot name, in document order.
#[derive(Debug, Clone, Default)]
pub struct SlotList {
    items: Vec<Slot>,
}

impl SlotList {
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&Slot> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The attributes of the sole instance, or an empty bag when there are
    /// zero or several.
    pub fn attributes(&self) -> AttributeBag {
        match self.items.as_slice() {
            [only] => only.attributes.clone(),
            _ => AttributeBag::new(),
        }
    }

    /// Renders every instance in order and concatenates the output.
    pub fn render(&self, ctx: &mut Context<'_>, value: Option<&Value>) -> Result<String> {
        let mut out = String::new();
        for slot in &self.items {
            out.push_str(&slot.render(ctx, value)?);
        }
        Ok(out)
    }

    pub fn into_value(self) -> Value {
        Value::from_object(self)
    }
}

impl Object for SlotList {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Seq
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        if key.as_str() == Some("attributes") {
            return Some(self.attributes().into_value());
        }
        let index = usize::try_from(key.clone()).ok()?;
        self.items.get(index).cloned().map(Slot::into_value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Seq(self.items.len())
    }

    fn is_true(self: &Arc<Self>) -> bool {
        !self.items.is_empty()
    }
}

/// All slots passed to one component invocation.
#[derive(Debug, Clone, Default)]
pub struct Slots {
    slots: IndexMap<String, SlotList>,
}

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves compiled slots against `ctx`, grouping instances by name.
    ///
    /// Names keep the order of their first appearance; instances keep
    /// document order within a name.
    pub fn resolve(templates: &[SlotTemplate], ctx: &Context<'_>) -> Result<Self> {
        let mut slots = Slots::new();
        for template in templates {
            slots.push(template.resolve(ctx)?);
        }
        Ok(slots)
    }

    pub fn push(&mut self, slot: Slot) {
        self.slots
            .entry(slot.name.clone())
            .or_default()
            .items
            .push(slot);
    }

    pub fn get(&self, name: &str) -> Option<&SlotList> {
        self.slots.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Every instance across all names, grouped by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SlotList)> {
        self.slots.iter().map(|(name, list)| (name.as_str(), list))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::from_object(self)
    }
}

impl Object for Slots {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        self.slots.get(key.as_str()?).cloned().map(SlotList::into_value)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(self.slots.keys().map(|k| Value::from(k.as_str())).collect())
    }

    fn is_true(self: &Arc<Self>) -> bool {
        !self.slots.is_empty()
    }
}
