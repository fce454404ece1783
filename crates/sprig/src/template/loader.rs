//! Template source loaders.
//!
//! A [`TemplateLoader`] maps a template name to its source. Two loaders are
//! provided:
//!
//! - [`MemoryLoader`]: inline templates held in a map
//! - [`DirectoryLoader`]: files under one or more root directories
//!
//! # Name Resolution
//!
//! [`DirectoryLoader`] searches roots in registration order; the first root
//! holding a match wins. A name with an extension is looked up as-is. A name
//! without one is tried with each of [`TEMPLATE_EXTENSIONS`] in order, so
//! both `"card"` and `"card.html"` resolve to `card.html`.
//!
//! | Priority | Extension |
//! |----------|-----------|
//! | 1 (highest) | `.html` |
//! | 2 | `.jinja` |
//! | 3 (lowest) | `.txt` |
//!
//! Names containing `..` segments or absolute paths are rejected.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Recognized template file extensions in priority order.
pub const TEMPLATE_EXTENSIONS: &[&str] = &[".html", ".jinja", ".txt"];

/// Resolves template names to source text.
pub trait TemplateLoader: Send + Sync + fmt::Debug {
    /// Returns the source for `name`, or [`Error::TemplateNotFound`].
    fn load(&self, name: &str) -> Result<String>;
}

/// Inline templates keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a template.
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryLoader {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut loader = MemoryLoader::new();
        for (name, source) in iter {
            loader.add(name, source);
        }
        loader
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, name: &str) -> Result<String> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))
    }
}

/// Loads templates from directories on disk.
///
/// Files are read on every [`load`](TemplateLoader::load); the engine caches
/// the compiled result.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoader {
    roots: Vec<PathBuf>,
}

impl DirectoryLoader {
    /// Creates a loader searching `root`.
    ///
    /// Fails if `root` is not an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self::default();
        loader.add_root(root)?;
        Ok(loader)
    }

    /// Adds another root, searched after the existing ones.
    pub fn add_root(&mut self, root: impl AsRef<Path>) -> Result<()> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::ImproperlyConfigured(format!(
                "template directory does not exist: {}",
                root.display()
            )));
        }
        self.roots.push(root.to_path_buf());
        Ok(())
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Finds the file `name` resolves to, without reading it.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        if !is_safe_relative(relative) {
            return None;
        }
        let has_extension = TEMPLATE_EXTENSIONS.iter().any(|ext| name.ends_with(ext));

        self.roots.iter().find_map(|root| {
            let exact = root.join(relative);
            if has_extension {
                return exact.is_file().then_some(exact);
            }
            TEMPLATE_EXTENSIONS
                .iter()
                .map(|ext| root.join(format!("{}{}", name, ext)))
                .find(|candidate| candidate.is_file())
                .or_else(|| exact.is_file().then_some(exact))
        })
    }
}

impl TemplateLoader for DirectoryLoader {
    fn load(&self, name: &str) -> Result<String> {
        let path = self
            .resolve(name)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;
        debug!(template = name, path = %path.display(), "loading template file");
        Ok(fs::read_to_string(path)?)
    }
}

fn is_safe_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
