//! Aggregate validation
//!
//! Federation values report every violated rule at once instead of the
//! first one, so an administrator can fix a remote payload from a single
//! report. Types implement [`Validate`] and callers turn the collected
//! messages into a [`NotValid`] error with [`is_valid`].

use std::fmt::Display;

/// A value that can list every rule it violates.
pub trait Validate {
    /// Name used as prefix in [`NotValid`] messages.
    const TYPE_NAME: &'static str;

    /// Returns all violations, empty when the value is valid.
    fn validate(&self) -> Vec<String>;
}

/// Validation failure carrying every violated rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Validation Error: {type_name}: {}", violations.join("\n"))]
pub struct NotValid {
    pub type_name: &'static str,
    pub violations: Vec<String>,
}

impl NotValid {
    pub fn new(type_name: &'static str, violations: Vec<String>) -> Self {
        Self {
            type_name,
            violations,
        }
    }
}

/// Run [`Validate::validate`] and convert violations into an error.
pub fn is_valid<T: Validate>(value: &T) -> Result<(), NotValid> {
    let violations = value.validate();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(NotValid::new(T::TYPE_NAME, violations))
    }
}

pub fn validate_not_empty(value: &str, name: &str) -> Vec<String> {
    if value.is_empty() {
        vec![format!("{name} should not be empty")]
    } else {
        Vec::new()
    }
}

pub fn validate_max_len(value: &str, max_len: usize, name: &str) -> Vec<String> {
    if value.chars().count() > max_len {
        vec![format!("Value {name} was longer than {max_len}")]
    } else {
        Vec::new()
    }
}

/// Empty when `value` renders like one of `allowed`.
pub fn validate_one_of<V, A>(value: V, allowed: &[A]) -> Vec<String>
where
    V: Display,
    A: Display,
{
    let value = value.to_string();
    if allowed.iter().any(|candidate| candidate.to_string() == value) {
        return Vec::new();
    }

    let allowed = allowed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    vec![format!(
        "Value {value} is not contained in allowed values [{allowed}]"
    )]
}
