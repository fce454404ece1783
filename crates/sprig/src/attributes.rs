//! Attribute bags: the ordered keyword arguments of a component invocation.
//!
//! An [`AttributeBag`] maps attribute keys to values. Keys may contain the
//! characters `@ : _ - .` besides alphanumerics, so Alpine/Vue style
//! attributes (`@click`, `x-on:click`, `foo:bar.baz`) work unchanged.
//! Values are [`minijinja::Value`]s: strings, boolean `true` for flag-only
//! attributes, or whatever the expression evaluator produced.
//!
//! Rendering a bag with [`attributes_to_string`] (or `{{ attributes }}` in a
//! template) produces HTML attribute syntax:
//!
//! | Value | Output |
//! |-------|--------|
//! | `"bar"` | `foo="bar"` |
//! | `true` | `foo` |
//! | `false`, `None`, undefined | omitted |
//! | `class` normalizing to `""` (including a bare `class` flag) | omitted |
//!
//! Entries are separated by one space, with no leading or trailing space.
//!
//! # Combining bags
//!
//! - [`merge`]: later bags win, except `class` which is concatenated.
//! - [`append`]: like [`merge`], but the named keys are joined with a space.
//! - [`merge_attributes`]: what `{% merge_attrs %}` does, defaults first,
//!   then the bound attributes, then `+=` appends.
//!
//! ```rust
//! use sprig::attributes::{attributes_to_string, merge, AttributeBag};
//!
//! let defaults = AttributeBag::from_iter([("class", "btn"), ("type", "button")]);
//! let overrides = AttributeBag::from_iter([("class", "mb-4"), ("type", "submit")]);
//!
//! let merged = merge(&[&defaults], &overrides);
//! assert_eq!(attributes_to_string(&merged), r#"class="btn mb-4" type="submit""#);
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use minijinja::value::{Enumerator, Object, ObjectRepr, Value, ValueKind};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result, SourceLocation};
use crate::tags::kwargs::unquote;
use crate::template::lexer::split_contents;
use crate::util::{escape, is_false_flag, is_true_flag, join_values, unescape, value_to_str};

/// Keys that are pulled out of a bag by [`split_attributes`].
pub const SPECIAL_ATTRIBUTES: &[&str] = &[":let"];

/// The key whose values are always concatenated when bags are merged.
pub const CLASS: &str = "class";

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\-:@.]+$").expect("valid attribute key pattern"));

static KEYWORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w\-:@.]+)=(.+)$").expect("valid keyword pattern"));

/// Whether `key` is a valid attribute key.
pub fn is_valid_key(key: &str) -> bool {
    KEY_PATTERN.is_match(key)
}

/// Splits a `key=value` bit into its parts, if it is one.
pub(crate) fn split_keyword(bit: &str) -> Option<(&str, &str)> {
    let caps = KEYWORD_PATTERN.captures(bit)?;
    let key = caps.get(1)?.as_str();
    let value = caps.get(2)?.as_str();
    Some((key, value))
}

/// Ordered attribute key/value bag.
///
/// Keys are unique; inserting an existing key replaces its value in place,
/// so the key keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
    attrs: IndexMap<String, Value>,
}

impl AttributeBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses HTML attribute syntax back into a bag.
    ///
    /// Accepts the output of [`attributes_to_string`]: `key="value"`,
    /// `key='value'`, unquoted `key=value`, and bare `key` flags (which
    /// become `true`). A repeated key keeps its last value.
    ///
    /// Only the entities [`attributes_to_string`] produces are unescaped
    /// (`&amp;`, `&lt;`, `&gt;`, `&quot;`, `&#x27;`, `&#x2f;`). Other
    /// references, such as `&#39;` or `&nbsp;`, are kept verbatim.
    pub fn parse(source: &str) -> Result<Self> {
        let mut bag = AttributeBag::new();
        for bit in split_contents(source) {
            if let Some((key, raw)) = split_keyword(&bit) {
                bag.insert(key, Value::from(unescape(unquote(raw))));
            } else if is_valid_key(&bit) {
                bag.insert(bit, Value::from(true));
            } else {
                return Err(Error::syntax(
                    format!("malformed attribute '{}'", bit),
                    SourceLocation::new(None, 1),
                ));
            }
        }
        Ok(bag)
    }

    /// Builds a bag from a mapping value (e.g. a serialized map).
    ///
    /// Undefined and `None` give an empty bag; an attribute bag object is
    /// cloned; any other non-map value is an error.
    pub fn from_value(value: &Value) -> Result<Self> {
        if let Some(bag) = value.downcast_object_ref::<AttributeBag>() {
            return Ok(bag.clone());
        }
        match value.kind() {
            ValueKind::Undefined | ValueKind::None => Ok(AttributeBag::new()),
            ValueKind::Map => {
                let mut bag = AttributeBag::new();
                for key in value.try_iter().map_err(|e| Error::Render(e.to_string()))? {
                    let item = value.get_item(&key).unwrap_or(Value::UNDEFINED);
                    bag.insert(value_to_str(&key), item);
                }
                Ok(bag)
            }
            kind => Err(Error::Render(format!(
                "expected an attribute mapping, got {}",
                kind
            ))),
        }
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Removes a key, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attrs.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Renders the bag as HTML attributes. See [`attributes_to_string`].
    pub fn to_html(&self) -> String {
        attributes_to_string(self)
    }

    /// Wraps the bag into a template value.
    pub fn into_value(self) -> Value {
        Value::from_object(self)
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeBag
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = AttributeBag::new();
        for (key, value) in iter {
            bag.insert(key, value);
        }
        bag
    }
}

impl fmt::Display for AttributeBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

impl Object for AttributeBag {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        self.attrs.get(key.as_str()?).cloned()
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Values(self.attrs.keys().map(|k| Value::from(k.as_str())).collect())
    }

    fn is_true(self: &Arc<Self>) -> bool {
        !self.attrs.is_empty()
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

/// Normalizes a `class` value into a space separated token string.
///
/// - strings are trimmed and kept as-is
/// - sequences contribute each of their items, recursively
/// - mappings contribute the keys whose value is truthy
///
/// Tokens keep input order and are not deduplicated.
///
/// ```rust
/// use sprig::attributes::normalize_class;
/// use sprig::Value;
/// use std::collections::BTreeMap;
///
/// let gates = BTreeMap::from([("active", true), ("disabled", false)]);
/// let value = Value::from(vec![Value::from("btn"), Value::from(gates)]);
/// assert_eq!(normalize_class(&value), "btn active");
/// ```
pub fn normalize_class(value: &Value) -> String {
    let mut tokens = Vec::new();
    collect_class_tokens(value, &mut tokens);
    tokens.join(" ")
}

fn collect_class_tokens(value: &Value, tokens: &mut Vec<String>) {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => {}
        ValueKind::Bool => {}
        ValueKind::String => {
            let token = value.as_str().unwrap_or("").trim();
            if !token.is_empty() {
                tokens.push(token.to_string());
            }
        }
        ValueKind::Seq | ValueKind::Iterable => {
            if let Ok(items) = value.try_iter() {
                for item in items {
                    collect_class_tokens(&item, tokens);
                }
            }
        }
        ValueKind::Map => {
            if let Ok(keys) = value.try_iter() {
                for key in keys {
                    let gate = value.get_item(&key).unwrap_or(Value::UNDEFINED);
                    if gate.is_true() {
                        collect_class_tokens(&key, tokens);
                    }
                }
            }
        }
        _ => {
            let token = value_to_str(value);
            if !token.is_empty() {
                tokens.push(token);
            }
        }
    }
}

/// Converts a bag into an HTML attribute string.
///
/// See the [module docs](self) for the per-value rules. Values are escaped
/// unless they are safe strings; keys are always escaped.
pub fn attributes_to_string(bag: &AttributeBag) -> String {
    let mut parts = Vec::with_capacity(bag.len());

    for (key, value) in bag.iter() {
        if value.is_undefined() || value.is_none() || is_false_flag(value) {
            continue;
        }
        if is_true_flag(value) && key != CLASS {
            parts.push(escape(key));
            continue;
        }
        let rendered = if key == CLASS {
            let class = normalize_class(value);
            if class.is_empty() {
                continue;
            }
            if value.is_safe() {
                class
            } else {
                escape(&class)
            }
        } else if value.is_safe() {
            value_to_str(value)
        } else {
            escape(&value_to_str(value))
        };
        parts.push(format!("{}=\"{}\"", escape(key), rendered));
    }

    parts.join(" ")
}

fn class_value(value: &Value) -> Value {
    let normalized = normalize_class(value);
    if value.is_safe() {
        Value::from_safe_string(normalized)
    } else {
        Value::from(normalized)
    }
}

/// Merges bags left to right onto `overrides`.
///
/// For every key, the last bag holding it wins, with `overrides` applied
/// last. The `class` key is never overwritten: the normalized class values
/// of all bags are concatenated, earliest first.
pub fn merge(bags: &[&AttributeBag], overrides: &AttributeBag) -> AttributeBag {
    append(bags, overrides, &[])
}

/// Like [`merge`], but values for `append_keys` are joined with a space.
///
/// When only one side holds a non-empty value, that side is used.
pub fn append(
    bags: &[&AttributeBag],
    overrides: &AttributeBag,
    append_keys: &[&str],
) -> AttributeBag {
    let mut result = AttributeBag::new();

    for bag in bags.iter().copied().chain(std::iter::once(overrides)) {
        for (key, value) in bag.iter() {
            let incoming = if key == CLASS {
                class_value(value)
            } else {
                value.clone()
            };
            let joined = match result.get(key) {
                Some(existing) if key == CLASS || append_keys.contains(&key) => {
                    join_values(existing, &incoming)
                }
                _ => incoming,
            };
            result.insert(key, joined);
        }
    }

    result
}

/// Appends every bag onto the first one.
///
/// Keys already present get the new value joined with a space; new keys are
/// added at the end.
pub fn append_attributes(bags: &[&AttributeBag]) -> AttributeBag {
    let mut result = AttributeBag::new();
    for bag in bags {
        for (key, value) in bag.iter() {
            let joined = match result.get(key) {
                Some(existing) => join_values(existing, value),
                None => value.clone(),
            };
            result.insert(key, joined);
        }
    }
    result
}

/// The composition performed by `{% merge_attrs %}`.
///
/// Starts from `defaults`, lets `attributes` override them (concatenating
/// `class`), then joins each `appends` value onto whatever is there.
pub fn merge_attributes(
    attributes: &AttributeBag,
    defaults: &AttributeBag,
    appends: &AttributeBag,
) -> AttributeBag {
    let merged = merge(&[defaults], attributes);
    let keys: Vec<&str> = appends.keys().collect();
    append(&[&merged], appends, &keys)
}

/// Splits special attributes (`:let`) from ordinary ones.
///
/// Returns `(special, ordinary)`.
pub fn split_attributes(bag: &AttributeBag) -> (AttributeBag, AttributeBag) {
    let mut special = AttributeBag::new();
    let mut ordinary = AttributeBag::new();
    for (key, value) in bag.iter() {
        if SPECIAL_ATTRIBUTES.contains(&key) {
            special.insert(key, value.clone());
        } else {
            ordinary.insert(key, value.clone());
        }
    }
    (special, ordinary)
}
