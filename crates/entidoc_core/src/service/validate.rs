//! Validation result sinks.

use std::collections::BTreeMap;
use std::fmt;

/// Collects the outcome of validating one entity.
///
/// Action errors concern the operation as a whole; field errors are keyed
/// by property name.
pub trait Validate {
    /// Records an error about the operation.
    fn add_action_error(&mut self, message: String);

    /// Records an error about one property.
    fn add_field_error(&mut self, field: &str, message: String);

    /// Whether any action error was recorded.
    fn has_action_errors(&self) -> bool;

    /// Whether any field error was recorded.
    fn has_field_errors(&self) -> bool;

    /// Whether any error was recorded.
    fn has_errors(&self) -> bool {
        self.has_action_errors() || self.has_field_errors()
    }
}

/// The default [`Validate`] sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateErrors {
    action_errors: Vec<String>,
    field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidateErrors {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Action errors in the order they were recorded.
    pub fn action_errors(&self) -> &[String] {
        &self.action_errors
    }

    /// Field errors by property name.
    pub fn field_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.field_errors
    }

    /// Errors recorded for one property.
    pub fn field_error(&self, field: &str) -> &[String] {
        self.field_errors.get(field).map_or(&[], Vec::as_slice)
    }

    /// Appends everything recorded in `other`.
    pub fn merge(&mut self, other: ValidateErrors) {
        self.action_errors.extend(other.action_errors);
        for (field, messages) in other.field_errors {
            self.field_errors.entry(field).or_default().extend(messages);
        }
    }
}

impl Validate for ValidateErrors {
    fn add_action_error(&mut self, message: String) {
        self.action_errors.push(message);
    }

    fn add_field_error(&mut self, field: &str, message: String) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message);
    }

    fn has_action_errors(&self) -> bool {
        !self.action_errors.is_empty()
    }

    fn has_field_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }
}

impl fmt::Display for ValidateErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for message in &self.action_errors {
            if !first {
                f.write_str("; ")?;
            }
            f.write_str(message)?;
            first = false;
        }
        for (field, messages) in &self.field_errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}
