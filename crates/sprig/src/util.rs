//! Value helpers shared by the host engine and the attribute model.

use minijinja::value::{Value, ValueKind};
use minijinja::HtmlEscape;

use crate::attributes::AttributeBag;

/// Coerces a value to a plain string.
///
/// Undefined and `None` become the empty string; everything else uses the
/// value's display form.
pub fn value_to_str(value: &Value) -> String {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => String::new(),
        _ => match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        },
    }
}

/// HTML-escapes a string.
pub fn escape(s: &str) -> String {
    HtmlEscape(s).to_string()
}

/// Reverses [`escape`] for the entities it produces.
pub fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#x2f;", "/")
        .replace("&amp;", "&")
}

/// Renders a value for `{{ ... }}` output.
///
/// Safe strings pass through, attribute bags render their own escaped
/// markup, everything else is escaped.
pub fn render_output(value: &Value) -> String {
    if value.is_undefined() || value.is_none() {
        return String::new();
    }
    if value.is_safe() {
        return value_to_str(value);
    }
    if let Some(bag) = value.downcast_object_ref::<AttributeBag>() {
        return bag.to_html();
    }
    escape(&value_to_str(value))
}

/// Whether the value is exactly boolean `true`.
pub fn is_true_flag(value: &Value) -> bool {
    value.kind() == ValueKind::Bool && value.is_true()
}

/// Whether the value is exactly boolean `false`.
pub fn is_false_flag(value: &Value) -> bool {
    value.kind() == ValueKind::Bool && !value.is_true()
}

/// Joins two string-ish values with a single space, skipping empty sides.
///
/// The result is a safe string only when both inputs were safe.
pub fn join_values(first: &Value, second: &Value) -> Value {
    let a = value_to_str(first);
    let b = value_to_str(second);
    let first_safe = first.is_safe() || a.is_empty();
    let second_safe = second.is_safe() || b.is_empty();
    let joined = match (a.is_empty(), b.is_empty()) {
        (false, false) => format!("{} {}", a, b),
        (true, _) => b,
        (false, true) => a,
    };
    if first_safe && second_safe && !joined.is_empty() {
        Value::from_safe_string(joined)
    } else {
        Value::from(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_str() {
        assert_eq!(value_to_str(&Value::from("a")), "a");
        assert_eq!(value_to_str(&Value::from(42)), "42");
        assert_eq!(value_to_str(&Value::UNDEFINED), "");
        assert_eq!(value_to_str(&Value::from(())), "");
    }

    #[test]
    fn test_escape_roundtrip() {
        let raw = "<a href=\"x\">'&'</a>";
        assert_eq!(unescape(&escape(raw)), raw);
    }

    #[test]
    fn test_render_output_escapes_unsafe() {
        assert_eq!(render_output(&Value::from("<b>")), "&lt;b&gt;");
        assert_eq!(
            render_output(&Value::from_safe_string("<b>".into())),
            "<b>"
        );
        assert_eq!(render_output(&Value::UNDEFINED), "");
    }

    #[test]
    fn test_join_values() {
        let joined = join_values(&Value::from("foo"), &Value::from("bar"));
        assert_eq!(joined.as_str(), Some("foo bar"));
        let joined = join_values(&Value::from(""), &Value::from("bar"));
        assert_eq!(joined.as_str(), Some("bar"));
        let joined = join_values(&Value::from("foo"), &Value::UNDEFINED);
        assert_eq!(joined.as_str(), Some("foo"));
    }

    #[test]
    fn test_join_values_safety() {
        let safe = |s: &str| Value::from_safe_string(s.to_string());
        assert!(join_values(&safe("a"), &safe("b")).is_safe());
        assert!(join_values(&safe("a"), &Value::UNDEFINED).is_safe());
        assert!(!join_values(&safe("a"), &Value::from("b")).is_safe());
        assert!(!join_values(&Value::from(""), &Value::from("")).is_safe());
    }

    #[test]
    fn test_flags() {
        assert!(is_true_flag(&Value::from(true)));
        assert!(!is_true_flag(&Value::from("true")));
        assert!(is_false_flag(&Value::from(false)));
        assert!(!is_false_flag(&Value::from(())));
    }
}
