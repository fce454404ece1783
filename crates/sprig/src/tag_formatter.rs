//! Tag name formatters.
//!
//! A [`TagFormatter`] turns a component name into the three tag names the
//! component is invoked with:
//!
//! | Formatter | Block start | Block end | Inline |
//! |-----------|-------------|-----------|--------|
//! | [`ComponentTagFormatter`] | `card` | `endcard` | `#card` |
//! | [`PrefixedTagFormatter`] (`prefix = "x-"`) | `x-card` | `x-endcard` | `x-card/` |
//!
//! ```text
//! {% card title="Hi" %}body{% endcard %}
//! {% #card title="Hi" %}
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// The three tag names for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNames {
    pub block_start: String,
    pub block_end: String,
    pub inline: String,
}

impl TagNames {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.block_start.as_str(),
            self.block_end.as_str(),
            self.inline.as_str(),
        ]
        .into_iter()
    }

    /// Checks the names are usable as tags and distinct from each other.
    pub fn validate(&self) -> Result<()> {
        for name in self.iter() {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(Error::ImproperlyConfigured(format!(
                    "tag formatter produced an invalid tag name '{}'",
                    name
                )));
            }
        }
        if self.block_start == self.block_end
            || self.block_start == self.inline
            || self.block_end == self.inline
        {
            return Err(Error::ImproperlyConfigured(format!(
                "tag formatter produced overlapping tag names: {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// Maps a component name to its tag names.
pub trait TagFormatter: Send + Sync + fmt::Debug {
    fn format_block_start_tag(&self, name: &str) -> String;
    fn format_block_end_tag(&self, name: &str) -> String;
    fn format_inline_tag(&self, name: &str) -> String;

    fn tag_names(&self, name: &str) -> TagNames {
        TagNames {
            block_start: self.format_block_start_tag(name),
            block_end: self.format_block_end_tag(name),
            inline: self.format_inline_tag(name),
        }
    }
}

/// `name` / `endname` / `#name`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentTagFormatter;

impl TagFormatter for ComponentTagFormatter {
    fn format_block_start_tag(&self, name: &str) -> String {
        name.to_string()
    }

    fn format_block_end_tag(&self, name: &str) -> String {
        format!("end{}", name)
    }

    fn format_inline_tag(&self, name: &str) -> String {
        format!("#{}", name)
    }
}

/// `<prefix>name` / `<prefix>endname` / `<prefix>name/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedTagFormatter {
    prefix: String,
}

impl PrefixedTagFormatter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl TagFormatter for PrefixedTagFormatter {
    fn format_block_start_tag(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    fn format_block_end_tag(&self, name: &str) -> String {
        format!("{}end{}", self.prefix, name)
    }

    fn format_inline_tag(&self, name: &str) -> String {
        format!("{}{}/", self.prefix, name)
    }
}
