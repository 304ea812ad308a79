//! Data-binding and validation failures

use validator::{ValidationErrors, ValidationErrorsKind};

/// Key `validator` files schema-level (whole object) errors under.
const GLOBAL_ERRORS_KEY: &str = "__all__";

/// Error concerning the bound object as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectError {
    message: Option<String>,
}

impl ObjectError {
    #[must_use]
    pub fn new(message: Option<String>) -> Self {
        Self { message }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Error concerning a single field of the bound object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    field: String,
    message: Option<String>,
}

impl FieldError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: Option<String>) -> Self {
        Self {
            field: field.into(),
            message,
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Errors collected while binding request data to an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingResult {
    object: String,
    global_errors: Vec<ObjectError>,
    field_errors: Vec<FieldError>,
}

impl BindingResult {
    #[must_use]
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn reject(mut self, message: impl Into<String>) -> Self {
        self.global_errors.push(ObjectError::new(Some(message.into())));
        self
    }

    #[must_use]
    pub fn reject_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.field_errors
            .push(FieldError::new(field, Some(message.into())));
        self
    }

    /// Converts `validator` errors.
    ///
    /// Fields are visited in name order; nested structs and lists yield dotted paths such as
    /// `address.city` or `items[2].price`.
    #[must_use]
    pub fn from_validation(object: impl Into<String>, errors: &ValidationErrors) -> Self {
        let mut result = Self::new(object);
        result.collect(None, errors);
        result
    }

    fn collect(&mut self, prefix: Option<&str>, errors: &ValidationErrors) {
        let mut entries: Vec<(&str, &ValidationErrorsKind)> =
            errors.errors().iter().map(|(name, kind)| (&**name, kind)).collect();
        entries.sort_by_key(|(name, _)| *name);

        for (name, kind) in entries {
            let path = match (prefix, name) {
                (None, name) => name.to_owned(),
                (Some(prefix), GLOBAL_ERRORS_KEY) => prefix.to_owned(),
                (Some(prefix), name) => format!("{prefix}.{name}"),
            };
            match kind {
                ValidationErrorsKind::Field(list) => {
                    for error in list {
                        let message = Some(
                            error
                                .message
                                .as_ref()
                                .map_or_else(|| error.code.to_string(), ToString::to_string),
                        );
                        if prefix.is_none() && name == GLOBAL_ERRORS_KEY {
                            self.global_errors.push(ObjectError::new(message));
                        } else {
                            self.field_errors.push(FieldError::new(path.clone(), message));
                        }
                    }
                }
                ValidationErrorsKind::Struct(inner) => self.collect(Some(&path), inner),
                ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        self.collect(Some(&format!("{path}[{index}]")), inner);
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn object(&self) -> &str {
        &self.object
    }

    #[must_use]
    pub fn global_errors(&self) -> &[ObjectError] {
        &self.global_errors
    }

    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.global_errors.len() + self.field_errors.len()
    }
}

/// Where the binding happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Query string or form data bound to an object.
    Bind,
    /// A deserialized handler argument failed validation.
    MethodArgument,
}

impl BindingKind {
    const fn noun(self) -> &'static str {
        match self {
            Self::Bind => "binding",
            Self::MethodArgument => "validation",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{} {} error(s) on '{}'",
    .result.error_count(),
    .kind.noun(),
    .result.object
)]
pub struct BindingFailure {
    kind: BindingKind,
    result: BindingResult,
}

impl BindingFailure {
    #[must_use]
    pub fn new(kind: BindingKind, result: BindingResult) -> Self {
        Self { kind, result }
    }

    #[must_use]
    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    #[must_use]
    pub fn result(&self) -> &BindingResult {
        &self.result
    }
}
