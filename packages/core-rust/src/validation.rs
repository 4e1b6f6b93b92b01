//! Declarative field validation for request DTOs.
//!
//! DTOs implement [`Validate`] by listing per-field [`Constraint`]s through a
//! [`FieldRules`] collector. Each field reports at most one failure: the
//! first constraint it violates.

use std::fmt;

/// A single declarative rule attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// The field must be present. For plain strings this means non-empty;
    /// for optional fields it means `Some`.
    Required,
    /// The value must contain at least this many characters.
    MinLen(usize),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("required"),
            Self::MinLen(n) => write!(f, "min_len={n}"),
        }
    }
}

/// One failing field together with the constraint it violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field '{field}' failed on '{constraint}'")]
pub struct FieldError {
    pub field: &'static str,
    pub constraint: Constraint,
}

/// Structured validation failure listing every failing field in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_errors(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Returns the individual field failures.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns the names of the failing fields.
    #[must_use]
    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(|e| e.field).collect()
    }
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Types whose shape carries declarative field constraints.
pub trait Validate {
    /// Checks every constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing each field that violates one of
    /// its constraints.
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Collector used by [`Validate`] implementations.
#[derive(Debug, Default)]
pub struct FieldRules {
    errors: Vec<FieldError>,
}

impl FieldRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a plain string field.
    pub fn check(&mut self, field: &'static str, value: &str, constraints: &[Constraint]) {
        let failed = constraints.iter().copied().find(|c| match c {
            Constraint::Required => value.is_empty(),
            Constraint::MinLen(n) => value.chars().count() < *n,
        });
        self.record(field, failed);
    }

    /// Checks an optional field. An absent value fails only `Required`; the
    /// remaining constraints apply once a value is present.
    pub fn check_optional(
        &mut self,
        field: &'static str,
        value: Option<&str>,
        constraints: &[Constraint],
    ) {
        let failed = match value {
            None => constraints
                .iter()
                .copied()
                .find(|c| *c == Constraint::Required),
            Some(value) => constraints.iter().copied().find(|c| match c {
                Constraint::Required => false,
                Constraint::MinLen(n) => value.chars().count() < *n,
            }),
        };
        self.record(field, failed);
    }

    /// Finishes collection.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] if any checked field failed.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }

    fn record(&mut self, field: &'static str, failed: Option<Constraint>) {
        if let Some(constraint) = failed {
            self.errors.push(FieldError { field, constraint });
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn required_rejects_empty_string() {
        let mut rules = FieldRules::new();
        rules.check("title", "", &[Constraint::Required]);
        let err = rules.finish().unwrap_err();
        assert_eq!(
            err.errors(),
            &[FieldError {
                field: "title",
                constraint: Constraint::Required,
            }]
        );
        assert_eq!(err.to_string(), "field 'title' failed on 'required'");
    }

    #[test]
    fn only_first_failing_constraint_is_reported() {
        let mut rules = FieldRules::new();
        rules.check("title", "", &[Constraint::Required, Constraint::MinLen(3)]);
        let err = rules.finish().unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors()[0].constraint, Constraint::Required);
    }

    #[test]
    fn min_len_counts_characters_not_bytes() {
        let mut rules = FieldRules::new();
        rules.check("title", "éé", &[Constraint::MinLen(2)]);
        assert!(rules.finish().is_ok());
    }

    #[test]
    fn optional_absent_passes_without_required() {
        let mut rules = FieldRules::new();
        rules.check_optional("content", None, &[Constraint::MinLen(1)]);
        assert!(rules.finish().is_ok());
    }

    #[test]
    fn optional_present_empty_fails_min_len() {
        let mut rules = FieldRules::new();
        rules.check_optional(
            "title",
            Some(""),
            &[Constraint::Required, Constraint::MinLen(1)],
        );
        let err = rules.finish().unwrap_err();
        assert_eq!(err.errors()[0].constraint, Constraint::MinLen(1));
    }

    #[test]
    fn display_joins_all_failures() {
        let mut rules = FieldRules::new();
        rules.check("title", "", &[Constraint::Required]);
        rules.check("content", "", &[Constraint::MinLen(1)]);
        let err = rules.finish().unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'title' failed on 'required'; field 'content' failed on 'min_len=1'"
        );
    }

    #[test]
    fn validation_errors_box_as_std_error() {
        let mut rules = FieldRules::new();
        rules.check("content", "", &[Constraint::MinLen(1)]);
        let boxed: Box<dyn std::error::Error> = Box::new(rules.finish().unwrap_err());
        assert!(boxed.source().is_none());
        assert!(boxed.is::<ValidationErrors>());
        assert_eq!(boxed.to_string(), "field 'content' failed on 'min_len=1'");
    }

    proptest! {
        #[test]
        fn min_len_accepts_exactly_long_enough(s in "\\PC{0,16}", n in 0usize..20) {
            let mut rules = FieldRules::new();
            rules.check("f", &s, &[Constraint::MinLen(n)]);
            prop_assert_eq!(rules.finish().is_ok(), s.chars().count() >= n);
        }
    }
}
