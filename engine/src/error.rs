//! Error types for the transformation engine.
//!
//! - [`MoldError`] - everything a transform call can fail with
//! - [`InvalidTransformValue`] - bad argument handed to an entry point
//! - [`ParseValueError`] - a tag parameter did not parse as the field's type
//! - [`JsonError`] - typed JSON decode failures
//! - [`SchemaError`] - schema document failures
//! - [`ConfigError`] - bad engine configuration
//!
//! User errors returned from transformation functions travel through
//! [`MoldError::Custom`] untouched, so callers can still downcast them.

use crate::value::Type;
use std::fmt;
use thiserror::Error;

/// Boxed error type accepted from user functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Engine Errors
// =============================================================================

/// Errors returned by the transformer.
#[derive(Debug, Error)]
pub enum MoldError {
    /// The argument is nil, not a pointer, or a nil pointer.
    #[error(transparent)]
    InvalidValue(#[from] InvalidTransformValue),

    /// `transform_struct` was handed something other than a struct.
    #[error("mold: (nil {ty})")]
    InvalidTransformation { ty: Type },

    /// Empty step in a tag string.
    #[error("invalid tag '{tag}' found on field {field}")]
    InvalidTag { tag: String, field: String },

    /// Step names neither a registered function nor an alias.
    #[error("{}", undefined_message(.tag, .field))]
    UndefinedTag { tag: String, field: String },

    #[error("'keys' tag must be immediately preceded by the 'dive' tag")]
    KeysWithoutDive,

    #[error("'endkeys' tag encountered without a corresponding 'keys' tag")]
    EndKeysWithoutKeys,

    /// Alias expansion nested deeper than the engine allows.
    #[error("alias '{alias}' expands into itself")]
    AliasCycle { alias: String },

    /// `dive` applied to something that is not a slice, array or map.
    #[error("Invalid dive tag configuration")]
    InvalidDive,

    /// Interceptors kept redirecting without reaching a fixed point.
    #[error("interceptor for type {ty} redirected more than {limit} times")]
    InterceptorCycle { ty: Type, limit: usize },

    #[error(transparent)]
    ParseValue(#[from] ParseValueError),

    /// Error raised by a registered function, passed through verbatim.
    #[error(transparent)]
    Custom(BoxError),
}

impl MoldError {
    /// Wrap a user error.
    pub fn custom<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MoldError::Custom(Box::new(err))
    }

    /// User error from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        MoldError::Custom(message.to_string().into())
    }

    /// Borrow the user error as `E`, if that is what this is.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            MoldError::Custom(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

fn undefined_message(tag: &str, field: &str) -> String {
    format!("unregistered/undefined transformation '{}' found on field {}", tag, field)
        .trim()
        .to_string()
}

/// Result alias for engine operations.
pub type MoldResult<T> = Result<T, MoldError>;

/// Invalid argument handed to `transform_struct` or `transform_field`.
///
/// `ty` is `None` for a nil argument, the slot type for a non-pointer and the
/// pointer type for a nil pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransformValue {
    pub entry: &'static str,
    pub ty: Option<Type>,
}

impl fmt::Display for InvalidTransformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ty {
            None => write!(f, "mold: {}(nil)", self.entry),
            Some(ty @ Type::Pointer(_)) => write!(f, "mold: {}(nil {})", self.entry, ty),
            Some(ty) => write!(f, "mold: {}(non-pointer {})", self.entry, ty),
        }
    }
}

impl std::error::Error for InvalidTransformValue {}

// =============================================================================
// Value Errors
// =============================================================================

/// Failure turning a tag parameter into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseValueError {
    #[error("mold: failed to parse value for type {ty}: {cause}")]
    Invalid { ty: Type, cause: String },

    #[error("mold: unsupported field type: {ty}")]
    Unsupported { ty: Type },
}

/// Typed JSON decode failure. `path` is a `$`-rooted JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonError {
    #[error("{path}: expected {expected}, found {found}")]
    Mismatch {
        path: String,
        expected: Type,
        found: &'static str,
    },

    #[error("{path}: {message}")]
    Invalid { path: String, message: String },
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors loading or resolving a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown type '{name}' referenced by {owner}")]
    UnknownType { name: String, owner: String },

    #[error("Type '{0}' contains itself")]
    RecursiveType(String),

    #[error("Malformed type expression '{0}'")]
    MalformedType(String),

    #[error("Duplicate field '{field}' in type {owner}")]
    DuplicateField { owner: String, field: String },
}

/// Result alias for schema loading.
pub type SchemaResult<T> = Result<T, SchemaError>;

// =============================================================================
// Config Errors
// =============================================================================

/// Errors building an engine configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Unknown preset '{0}' (expected one of: modifiers, scrubbers, none)")]
    UnknownPreset(String),

    #[error("Tag name cannot be empty")]
    EmptyTagName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::StructType;

    #[derive(Debug, Error, PartialEq)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_invalid_value_messages() {
        let nil = InvalidTransformValue { entry: "Struct", ty: None };
        assert_eq!(nil.to_string(), "mold: Struct(nil)");

        let user = Type::Struct(StructType::new("User", vec![]));
        let non_ptr = InvalidTransformValue {
            entry: "Field",
            ty: Some(user.clone()),
        };
        assert_eq!(non_ptr.to_string(), "mold: Field(non-pointer User)");

        let nil_ptr = InvalidTransformValue {
            entry: "Struct",
            ty: Some(Type::pointer_to(user)),
        };
        assert_eq!(nil_ptr.to_string(), "mold: Struct(nil *User)");
    }

    #[test]
    fn test_undefined_tag_trims_missing_field() {
        let err = MoldError::UndefinedTag {
            tag: "nonexistent".into(),
            field: String::new(),
        };
        assert_eq!(err.to_string(), "unregistered/undefined transformation 'nonexistent' found on field");
    }

    #[test]
    fn test_custom_is_transparent_and_downcastable() {
        let err = MoldError::custom(Boom);
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.downcast_ref::<Boom>(), Some(&Boom));
        assert!(MoldError::InvalidDive.downcast_ref::<Boom>().is_none());
    }
}
