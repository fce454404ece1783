//! Engine settings.
//!
//! Settings are read once when the engine is built. Every field has a
//! default, so an empty document is valid:
//!
//! ```yaml
//! default_slot_name: inner_block   # name of the implicit default slot
//! tag_formatter: default           # or: { prefix: "x-" }
//! ```
//!
//! ```rust
//! use sprig::config::{FormatterSetting, Settings};
//!
//! let settings = Settings::from_yaml("tag_formatter:\n  prefix: x-\n").unwrap();
//! assert_eq!(settings.default_slot_name, "inner_block");
//! assert_eq!(settings.tag_formatter, FormatterSetting::Prefixed("x-".into()));
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tag_formatter::{ComponentTagFormatter, PrefixedTagFormatter, TagFormatter};

/// Default name of the slot collecting content outside `{% slot %}` tags.
pub const DEFAULT_SLOT_NAME: &str = "inner_block";

/// Which tag formatter to build.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "FormatterRaw", into = "FormatterRaw")]
pub enum FormatterSetting {
    /// `name` / `endname` / `#name`
    #[default]
    Default,
    /// `<prefix>name` / `<prefix>endname` / `<prefix>name/`
    Prefixed(String),
}

impl FormatterSetting {
    pub fn build(&self) -> Arc<dyn TagFormatter> {
        match self {
            FormatterSetting::Default => Arc::new(ComponentTagFormatter),
            FormatterSetting::Prefixed(prefix) => Arc::new(PrefixedTagFormatter::new(prefix.clone())),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FormatterRaw {
    Named(String),
    Prefixed { prefix: String },
}

impl From<FormatterSetting> for FormatterRaw {
    fn from(setting: FormatterSetting) -> Self {
        match setting {
            FormatterSetting::Default => FormatterRaw::Named("default".to_string()),
            FormatterSetting::Prefixed(prefix) => FormatterRaw::Prefixed { prefix },
        }
    }
}

impl TryFrom<FormatterRaw> for FormatterSetting {
    type Error = String;

    fn try_from(raw: FormatterRaw) -> std::result::Result<Self, Self::Error> {
        match raw {
            FormatterRaw::Named(name) if name == "default" => Ok(FormatterSetting::Default),
            FormatterRaw::Named(name) => Err(format!(
                "Unknown tag formatter: '{}'. Expected 'default' or {{ prefix: \"...\" }}.",
                name
            )),
            FormatterRaw::Prefixed { prefix } if prefix.trim().is_empty() => {
                Err("Tag formatter prefix must not be empty.".to_string())
            }
            FormatterRaw::Prefixed { prefix } => Ok(FormatterSetting::Prefixed(prefix)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub default_slot_name: String,
    pub tag_formatter: FormatterSetting,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_slot_name: DEFAULT_SLOT_NAME.to_string(),
            tag_formatter: FormatterSetting::Default,
        }
    }
}

impl Settings {
    pub fn from_yaml(source: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(source)?;
        settings.validate()
    }

    pub fn from_json(source: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(source)?;
        settings.validate()
    }

    /// Loads settings from a `.yaml`, `.yml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(Error::Settings(format!(
                "unsupported settings file '{}', expected .yaml, .yml or .json",
                path.display()
            ))),
        }
    }

    /// Builds the configured tag formatter.
    pub fn formatter(&self) -> Arc<dyn TagFormatter> {
        self.tag_formatter.build()
    }

    fn validate(self) -> Result<Self> {
        let name = self.default_slot_name.trim();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::Settings(format!(
                "invalid default_slot_name '{}'",
                self.default_slot_name
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_yaml("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.formatter().format_inline_tag("card"), "#card");
    }

    #[test]
    fn test_yaml_prefixed_formatter() {
        let settings = Settings::from_yaml("default_slot_name: content\ntag_formatter:\n  prefix: x-\n").unwrap();
        assert_eq!(settings.default_slot_name, "content");
        assert_eq!(settings.formatter().format_block_end_tag("card"), "x-endcard");
    }

    #[test]
    fn test_json_named_formatter() {
        let settings = Settings::from_json(r#"{"tag_formatter": "default"}"#).unwrap();
        assert_eq!(settings.tag_formatter, FormatterSetting::Default);
    }

    #[test]
    fn test_unknown_formatter_is_error() {
        let err = Settings::from_yaml("tag_formatter: fancy").unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }

    #[test]
    fn test_unknown_field_is_error() {
        assert!(Settings::from_json(r#"{"slot": "x"}"#).is_err());
    }

    #[test]
    fn test_blank_slot_name_is_error() {
        assert!(Settings::from_yaml("default_slot_name: ' '").is_err());
    }

    #[test]
    fn test_from_file_by_extension() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, r#"{{"default_slot_name": "body"}}"#).unwrap();
        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.default_slot_name, "body");

        let other = NamedTempFile::with_suffix(".toml").unwrap();
        assert!(matches!(Settings::from_file(other.path()), Err(Error::Settings(_))));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let settings = Settings {
            default_slot_name: "body".into(),
            tag_formatter: FormatterSetting::Prefixed("c-".into()),
        };
        let yaml = serde_yaml::to_string(&settings).unwrap();
        assert_eq!(Settings::from_yaml(&yaml).unwrap(), settings);
    }
}
