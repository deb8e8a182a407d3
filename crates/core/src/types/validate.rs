//! Field-level validation primitives.
//!
//! Data shapes are plain structs; each crate defines an explicit validation
//! function per input shape that collects [`FieldViolation`]s instead of
//! annotating fields. Callers surface the whole list at once.

use serde::Serialize;

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize)]
pub struct FieldViolation {
    /// Name of the offending field.
    pub field: &'static str,
    /// Human-readable description of the violation.
    pub message: String,
}

impl FieldViolation {
    /// Create a new violation.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A non-empty collection of field violations for one input shape.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// The individual violations.
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Wrap a list of violations.
    #[must_use]
    pub const fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
