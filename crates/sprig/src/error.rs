//! Error types for compiling and rendering component templates.
//!
//! This module provides [`Error`], the single error type for every fallible
//! operation in the crate. Compile-time failures (malformed tags, unbalanced
//! blocks, tag name collisions) carry a [`SourceLocation`] so template authors
//! can find the offending tag.

use std::fmt;

use thiserror::Error;

/// Where in a template an error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Name of the template, if it was compiled under a name.
    pub template: Option<String>,
    /// 1-based line of the offending token.
    pub line: usize,
}

impl SourceLocation {
    pub fn new(template: Option<&str>, line: usize) -> Self {
        Self {
            template: template.map(str::to_string),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.template {
            Some(name) => write!(f, "{}:{}", name, self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// Error type for component compilation and rendering.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed tag arguments, unknown or unbalanced block tags.
    #[error("template syntax error at {location}: {message}")]
    TagSyntax {
        message: String,
        location: SourceLocation,
    },

    /// A formatter produced a tag name already owned by something else.
    #[error("tag '{tag}' is already registered by {existing}")]
    TagNameCollision { tag: String, existing: String },

    /// A component was invoked but nothing is registered under its name.
    #[error("the component \"{0}\" is not registered")]
    ComponentNotRegistered(String),

    /// A loader could not find the named template.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Invalid configuration (missing template name, bad formatter output...).
    #[error("improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// Failure while rendering an already compiled template.
    #[error("render error: {0}")]
    Render(String),

    /// An expression failed to evaluate (unknown filter, bad operand...).
    #[error("expression error: {0}")]
    Expression(#[from] minijinja::Error),

    /// Components or slots nested deeper than the engine allows.
    #[error("recursion limit of {0} nested component and slot renders exceeded")]
    RecursionLimit(usize),

    /// I/O error (e.g., reading a template from disk).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings could not be deserialized.
    #[error("settings error: {0}")]
    Settings(String),
}

impl Error {
    /// Builds a [`Error::TagSyntax`] for the given location.
    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        Error::TagSyntax {
            message: message.into(),
            location,
        }
    }

    /// Returns the source location for compile-time errors.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Error::TagSyntax { location, .. } => Some(location),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Settings(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Settings(err.to_string())
    }
}

/// Result type for component operations.
pub type Result<T> = std::result::Result<T, Error>;
