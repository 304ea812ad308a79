//! Error classes: the type hierarchy rules match against
//!
//! Every raised error reports a static [`ErrorClass`]. Classes form a single-parent tree,
//! so a rule declared for a class also matches errors of any class extending it.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use problems::FailureKind;

use crate::config::ConfigError;

/// Static descriptor of an error class.
///
/// Identity is the class name; declare each class once as a `static`.
///
/// ```
/// use problems_web::{ErrorClass, classes};
///
/// static QUOTA_EXCEEDED: ErrorClass = ErrorClass::extends("QuotaExceeded", &classes::ERROR);
///
/// assert!(classes::ERROR.is_assignable_from(&QUOTA_EXCEEDED));
/// ```
pub struct ErrorClass {
    name: &'static str,
    parent: Option<&'static ErrorClass>,
}

impl ErrorClass {
    #[must_use]
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    #[must_use]
    pub const fn extends(name: &'static str, parent: &'static ErrorClass) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn parent(&self) -> Option<&'static ErrorClass> {
        self.parent
    }

    /// This class followed by its parents, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &ErrorClass> {
        std::iter::successors(Some(self), |class| class.parent)
    }

    /// `true` if errors of class `other` are instances of this class.
    #[must_use]
    pub fn is_assignable_from(&self, other: &ErrorClass) -> bool {
        other.ancestors().any(|class| class == self)
    }
}

impl PartialEq for ErrorClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ErrorClass {}

impl Hash for ErrorClass {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorClass")
            .field("name", &self.name)
            .field("parent", &self.parent.map(ErrorClass::name))
            .finish()
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Built-in classes.
pub mod classes {
    use super::ErrorClass;

    /// Root of every class.
    pub static ERROR: ErrorClass = ErrorClass::root("Error");

    pub static MESSAGE_NOT_READABLE: ErrorClass =
        ErrorClass::extends("MessageNotReadable", &ERROR);
    pub static BIND_ERROR: ErrorClass = ErrorClass::extends("BindError", &ERROR);
    pub static METHOD_ARGUMENT_NOT_VALID: ErrorClass =
        ErrorClass::extends("MethodArgumentNotValid", &BIND_ERROR);
    pub static RESPONSE_STATUS: ErrorClass = ErrorClass::extends("ResponseStatus", &ERROR);
    pub static ACCESS_DENIED: ErrorClass = ErrorClass::extends("AccessDenied", &ERROR);
    /// Errors carrying no class of their own, e.g. converted `anyhow::Error`s.
    pub static UNCLASSIFIED: ErrorClass = ErrorClass::extends("Unclassified", &ERROR);

    pub static FAILURE: ErrorClass = ErrorClass::extends("Failure", &ERROR);
    pub static BAD_REQUEST: ErrorClass = ErrorClass::extends("BadRequest", &FAILURE);
    pub static FORBIDDEN: ErrorClass = ErrorClass::extends("Forbidden", &FAILURE);
    pub static RESOURCE_NOT_FOUND: ErrorClass =
        ErrorClass::extends("ResourceNotFound", &FAILURE);
    pub static REMOTE_FAILURE: ErrorClass = ErrorClass::extends("RemoteFailure", &FAILURE);
    pub static CANNOT_CONNECT: ErrorClass = ErrorClass::extends("CannotConnect", &FAILURE);

    /// Parent of errors the web framework itself raises.
    pub static FRAMEWORK: ErrorClass = ErrorClass::extends("FrameworkError", &ERROR);
    pub static METHOD_NOT_SUPPORTED: ErrorClass =
        ErrorClass::extends("MethodNotSupported", &FRAMEWORK);
    pub static MEDIA_TYPE_NOT_SUPPORTED: ErrorClass =
        ErrorClass::extends("MediaTypeNotSupported", &FRAMEWORK);
    pub static MEDIA_TYPE_NOT_ACCEPTABLE: ErrorClass =
        ErrorClass::extends("MediaTypeNotAcceptable", &FRAMEWORK);
    pub static MISSING_PATH_VARIABLE: ErrorClass =
        ErrorClass::extends("MissingPathVariable", &FRAMEWORK);
    pub static MISSING_REQUEST_PARAMETER: ErrorClass =
        ErrorClass::extends("MissingRequestParameter", &FRAMEWORK);
    pub static REQUEST_BINDING: ErrorClass = ErrorClass::extends("RequestBinding", &FRAMEWORK);
    pub static TYPE_MISMATCH: ErrorClass = ErrorClass::extends("TypeMismatch", &FRAMEWORK);
    pub static CONVERSION_NOT_SUPPORTED: ErrorClass =
        ErrorClass::extends("ConversionNotSupported", &FRAMEWORK);
    pub static MESSAGE_NOT_WRITABLE: ErrorClass =
        ErrorClass::extends("MessageNotWritable", &FRAMEWORK);
    pub static MISSING_REQUEST_PART: ErrorClass =
        ErrorClass::extends("MissingRequestPart", &FRAMEWORK);
    pub static NO_HANDLER_FOUND: ErrorClass = ErrorClass::extends("NoHandlerFound", &FRAMEWORK);
    pub static ASYNC_REQUEST_TIMEOUT: ErrorClass =
        ErrorClass::extends("AsyncRequestTimeout", &FRAMEWORK);
    pub static HANDLER_PANICKED: ErrorClass = ErrorClass::extends("HandlerPanicked", &FRAMEWORK);

    pub(crate) static BUILTIN: [&ErrorClass; 27] = [
        &ERROR,
        &MESSAGE_NOT_READABLE,
        &BIND_ERROR,
        &METHOD_ARGUMENT_NOT_VALID,
        &RESPONSE_STATUS,
        &ACCESS_DENIED,
        &UNCLASSIFIED,
        &FAILURE,
        &BAD_REQUEST,
        &FORBIDDEN,
        &RESOURCE_NOT_FOUND,
        &REMOTE_FAILURE,
        &CANNOT_CONNECT,
        &FRAMEWORK,
        &METHOD_NOT_SUPPORTED,
        &MEDIA_TYPE_NOT_SUPPORTED,
        &MEDIA_TYPE_NOT_ACCEPTABLE,
        &MISSING_PATH_VARIABLE,
        &MISSING_REQUEST_PARAMETER,
        &REQUEST_BINDING,
        &TYPE_MISMATCH,
        &CONVERSION_NOT_SUPPORTED,
        &MESSAGE_NOT_WRITABLE,
        &MISSING_REQUEST_PART,
        &NO_HANDLER_FOUND,
        &ASYNC_REQUEST_TIMEOUT,
        &HANDLER_PANICKED,
    ];
}

/// Class of a failure kind.
#[must_use]
pub fn failure_class(kind: FailureKind) -> &'static ErrorClass {
    match kind {
        FailureKind::Generic => &classes::FAILURE,
        FailureKind::BadRequest => &classes::BAD_REQUEST,
        FailureKind::Forbidden => &classes::FORBIDDEN,
        FailureKind::ResourceNotFound => &classes::RESOURCE_NOT_FOUND,
        FailureKind::RemoteFailure => &classes::REMOTE_FAILURE,
        FailureKind::CannotConnect => &classes::CANNOT_CONNECT,
    }
}

/// Name → class lookup used when rules come from configuration.
#[derive(Debug, Clone)]
pub struct ErrorClassRegistry {
    classes: HashMap<&'static str, &'static ErrorClass>,
}

impl Default for ErrorClassRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ErrorClassRegistry {
    /// Registry holding every built-in class.
    #[must_use]
    pub fn with_builtins() -> Self {
        let classes = classes::BUILTIN
            .iter()
            .map(|&class| (class.name(), class))
            .collect();
        Self { classes }
    }

    /// Registers an application class. Registering the same static twice is a no-op.
    ///
    /// # Errors
    /// Returns `ConfigError::DuplicateClass` if a different class already uses the name.
    pub fn register(&mut self, class: &'static ErrorClass) -> Result<(), ConfigError> {
        match self.classes.get(class.name()) {
            Some(existing) if !std::ptr::eq(*existing, class) => {
                Err(ConfigError::DuplicateClass {
                    name: class.name().to_owned(),
                })
            }
            Some(_) => Ok(()),
            None => {
                self.classes.insert(class.name(), class);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static ErrorClass> {
        self.classes.get(name).copied()
    }

    /// Resolves a class name.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownClass` if no class is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<&'static ErrorClass, ConfigError> {
        self.get(name).ok_or_else(|| ConfigError::UnknownClass {
            name: name.to_owned(),
        })
    }
}
