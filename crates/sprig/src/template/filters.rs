//! MiniJinja filter registration.
//!
//! Expressions are evaluated by minijinja, so its built-in filters (`upper`,
//! `lower`, `default`, `safe`, `escape`, `length`, `join`, ...) are always
//! available. This module adds the ones minijinja does not ship.

use minijinja::{Environment, Error, ErrorKind, Value};

/// Registers the extra filters on an environment.
pub fn register_filters(env: &mut Environment<'static>) {
    // `{{ published|yesno("live,draft") }}`; a third choice is used for none.
    env.add_filter(
        "yesno",
        |value: Value, choices: Option<String>| -> Result<String, Error> {
            let choices = choices.unwrap_or_else(|| "yes,no,maybe".to_string());
            let parts: Vec<&str> = choices.split(',').collect();
            if parts.len() < 2 {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!("yesno expects at least two choices, got '{}'", choices),
                ));
            }
            let picked = if value.is_none() || value.is_undefined() {
                parts.get(2).unwrap_or(&parts[1])
            } else if value.is_true() {
                &parts[0]
            } else {
                &parts[1]
            };
            Ok(picked.to_string())
        },
    );
}
