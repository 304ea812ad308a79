//! Unreadable request bodies and the parse errors behind them

use std::fmt;

use serde_json::error::Category;

/// How deep [`UnreadableBody::nearest_known_cause`] looks into the cause chain.
pub const MAX_CAUSE_DEPTH: usize = 8;

/// One step of the path to the offending value in a request document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Joins a path with dots, e.g. `items.0.price`.
#[must_use]
pub fn dotted_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CauseKind {
    /// The document names a property the target type does not have.
    UnrecognizedProperty {
        property: String,
        known: Vec<String>,
        referring_type: String,
    },
    /// A value has the wrong type or an unacceptable format.
    InvalidFormat { path: Vec<PathSegment> },
    /// Any other structural mismatch between document and target type.
    Mapping { path: Vec<PathSegment> },
    /// Malformed document (bad syntax, premature end).
    Syntax,
    /// The body could not be read.
    Io,
    /// Wrapper around a deeper cause.
    Other,
}

impl CauseKind {
    fn is_mapping(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedProperty { .. } | Self::InvalidFormat { .. } | Self::Mapping { .. }
        )
    }
}

/// A link in the cause chain of an unreadable body.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BodyCause {
    kind: CauseKind,
    message: String,
    #[source]
    cause: Option<Box<BodyCause>>,
}

impl BodyCause {
    #[must_use]
    pub fn new(kind: CauseKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    #[must_use]
    pub fn caused_by(mut self, cause: BodyCause) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    #[must_use]
    pub fn kind(&self) -> &CauseKind {
        &self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn cause(&self) -> Option<&BodyCause> {
        self.cause.as_deref()
    }

    /// Classifies a JSON deserialization error for target type `T`.
    #[must_use]
    pub fn from_json_error<T>(error: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = to_segments(error.path());
        let inner = error.into_inner();
        let message = inner.to_string();
        let kind = match inner.classify() {
            Category::Io => CauseKind::Io,
            Category::Syntax | Category::Eof => CauseKind::Syntax,
            Category::Data => data_error_kind(&message, path, short_type_name::<T>()),
        };
        Self::new(kind, message)
    }
}

/// The request body could not be turned into the handler's input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UnreadableBody {
    message: String,
    #[source]
    cause: Option<BodyCause>,
}

impl UnreadableBody {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: BodyCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// JSON body that failed to deserialize into `T`.
    #[must_use]
    pub fn from_json_error<T>(error: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let cause = BodyCause::from_json_error::<T>(error);
        Self::new(format!("JSON parse error: {}", cause.message())).with_cause(cause)
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Immediate cause.
    #[must_use]
    pub fn cause(&self) -> Option<&BodyCause> {
        self.cause.as_ref()
    }

    /// Nearest cause describing a mapping problem.
    ///
    /// Descends through [`CauseKind::Other`] wrappers up to [`MAX_CAUSE_DEPTH`] links and
    /// gives up at syntax or I/O causes.
    #[must_use]
    pub fn nearest_known_cause(&self) -> Option<&BodyCause> {
        let mut current = self.cause.as_ref();
        for _ in 0..MAX_CAUSE_DEPTH {
            let cause = current?;
            if cause.kind.is_mapping() {
                return Some(cause);
            }
            if cause.kind != CauseKind::Other {
                return None;
            }
            current = cause.cause();
        }
        None
    }
}

pub(crate) fn to_segments(path: &serde_path_to_error::Path) -> Vec<PathSegment> {
    use serde_path_to_error::Segment;

    path.iter()
        .filter_map(|segment| match segment {
            Segment::Seq { index } => Some(PathSegment::Index(*index)),
            Segment::Map { key } => Some(PathSegment::Field(key.clone())),
            Segment::Enum { variant } => Some(PathSegment::Field(variant.clone())),
            Segment::Unknown => None,
        })
        .collect()
}

// serde reports data errors as text only, e.g.
// "unknown field `foo`, expected one of `a`, `b` at line 1 column 7".
fn data_error_kind(message: &str, path: Vec<PathSegment>, referring_type: &str) -> CauseKind {
    if message.starts_with("unknown field") {
        let mut names = backticked(message).into_iter().map(ToOwned::to_owned);
        if let Some(property) = names.next() {
            return CauseKind::UnrecognizedProperty {
                property,
                known: names.collect(),
                referring_type: referring_type.to_owned(),
            };
        }
    }
    let invalid_format = ["invalid type", "invalid value", "invalid length", "unknown variant"]
        .iter()
        .any(|prefix| message.starts_with(prefix));
    if invalid_format {
        CauseKind::InvalidFormat { path }
    } else {
        CauseKind::Mapping { path }
    }
}

fn backticked(message: &str) -> Vec<&str> {
    message.split('`').skip(1).step_by(2).collect()
}

/// Last path segment of a type name, without generics: `app::users::NewUser` → `NewUser`.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    #[allow(dead_code)]
    struct Order {
        id: u32,
        items: Vec<Item>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Item {
        price: u32,
    }

    fn parse_error(json: &str) -> UnreadableBody {
        let de = &mut serde_json::Deserializer::from_str(json);
        let err = serde_path_to_error::deserialize::<_, Order>(de).unwrap_err();
        UnreadableBody::from_json_error::<Order>(err)
    }

    #[test]
    fn unknown_field_becomes_unrecognized_property() {
        let body = parse_error(r#"{"id": 1, "items": [], "foo": true}"#);
        let cause = body.nearest_known_cause().unwrap();
        assert_eq!(
            cause.kind(),
            &CauseKind::UnrecognizedProperty {
                property: "foo".to_owned(),
                known: vec!["id".to_owned(), "items".to_owned()],
                referring_type: "Order".to_owned(),
            }
        );
    }

    #[test]
    fn wrong_type_becomes_invalid_format_with_path() {
        let body = parse_error(r#"{"id": 1, "items": [{"price": 3}, {"price": "x"}]}"#);
        let cause = body.nearest_known_cause().unwrap();
        let CauseKind::InvalidFormat { path } = cause.kind() else {
            panic!("unexpected cause: {cause}");
        };
        assert_eq!(dotted_path(path), "items.1.price");
        assert!(cause.message().starts_with("invalid type"));
    }

    #[test]
    fn missing_field_becomes_mapping_error() {
        let body = parse_error(r#"{"items": []}"#);
        let cause = body.nearest_known_cause().unwrap();
        assert!(matches!(cause.kind(), CauseKind::Mapping { .. }));
        assert!(cause.message().contains("missing field `id`"));
    }

    #[test]
    fn syntax_error_has_no_known_cause() {
        let body = parse_error(r#"{"id": 1,"#);
        assert!(body.nearest_known_cause().is_none());
        assert_eq!(body.cause().map(BodyCause::kind), Some(&CauseKind::Syntax));
    }

    #[test]
    fn nearest_known_cause_descends_through_wrappers() {
        let body = UnreadableBody::new("outer").with_cause(
            BodyCause::new(CauseKind::Other, "wrapper").caused_by(BodyCause::new(
                CauseKind::Mapping {
                    path: vec![PathSegment::Field("a".to_owned())],
                },
                "inner",
            )),
        );
        assert_eq!(body.nearest_known_cause().map(BodyCause::message), Some("inner"));
    }

    #[test]
    fn nearest_known_cause_is_bounded() {
        let mut cause = BodyCause::new(CauseKind::Mapping { path: Vec::new() }, "deep");
        for _ in 0..MAX_CAUSE_DEPTH {
            cause = BodyCause::new(CauseKind::Other, "wrapper").caused_by(cause);
        }
        let body = UnreadableBody::new("outer").with_cause(cause);
        assert!(body.nearest_known_cause().is_none());
    }

    #[test]
    fn short_type_name_strips_module_path_and_generics() {
        assert_eq!(short_type_name::<Order>(), "Order");
        assert_eq!(short_type_name::<Vec<Order>>(), "Vec");
    }
}
