//! Error types for resource path/query encoding and decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes.
///
/// These codes form a **stable API contract** — once published, variant names
/// and their serialized `snake_case` strings must never change across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// JSON (de)serialization error while bridging typed values or schema tables.
    JsonParseError,
    /// A resource root has no path template.
    MissingPathTemplate,
    /// A descriptor has more than one nested field that is itself a resource.
    MultipleParentResources,
    /// A path template could not be parsed.
    InvalidTemplate,
    /// A placeholder names no parameter of the descriptor.
    UnknownPlaceholder,
    /// The same placeholder name appears twice in a resolved template.
    DuplicatePlaceholder,
    /// A variadic placeholder is backed by a single-valued parameter.
    VariadicNotList,
    /// A list field declares an element kind that cannot be flattened.
    UnsupportedListElement,
    /// A schema table references a type it does not declare.
    UnknownType,
    /// A schema table nests a type inside itself.
    CyclicType,
    /// A required value has no backing parameter.
    MissingRequiredParameter,
    /// More values were supplied than the slot accepts.
    AmbiguousParameter,
    /// A wire string matches no declared enum variant.
    UnknownEnumValue,
    /// A wire string cannot be parsed into the target scalar type.
    MalformedScalar,
    /// A structured value does not have the shape its descriptor declares.
    InvalidValue,
    /// A concrete path does not match the resolved template.
    PathMismatch,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON (de)serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Resource {descriptor} has no path template")]
    MissingPathTemplate { descriptor: String },

    #[error("Resource {descriptor} has more than one parent resource field: {fields:?}")]
    MultipleParentResources {
        descriptor: String,
        fields: Vec<String>,
    },

    #[error("Invalid path template {template:?}: {message}")]
    InvalidTemplate { template: String, message: String },

    #[error("Placeholder {{{name}}} in {descriptor} is not backed by any field")]
    UnknownPlaceholder { descriptor: String, name: String },

    #[error("Placeholder {{{name}}} appears more than once in the path of {descriptor}")]
    DuplicatePlaceholder { descriptor: String, name: String },

    #[error("Variadic placeholder {{{name}...}} in {descriptor} must be backed by a list field")]
    VariadicNotList { descriptor: String, name: String },

    #[error("List field {field} of {descriptor} cannot hold nested structures")]
    UnsupportedListElement { descriptor: String, field: String },

    #[error("Unknown type {name} referenced from {referenced_by}")]
    UnknownType { name: String, referenced_by: String },

    #[error("Type {name} nests itself")]
    CyclicType { name: String },

    #[error("Missing required parameter {name} for {descriptor}")]
    MissingRequiredParameter { descriptor: String, name: String },

    #[error("Parameter {name} of {descriptor} accepts at most one value (found {count})")]
    AmbiguousParameter {
        descriptor: String,
        name: String,
        count: usize,
    },

    #[error("Unknown value {value:?} for enum field {field} of {descriptor}")]
    UnknownEnumValue {
        descriptor: String,
        field: String,
        value: String,
    },

    #[error("Cannot parse {value:?} as {expected} for field {field} of {descriptor}")]
    MalformedScalar {
        descriptor: String,
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("Field {field} of {descriptor} expects {expected}")]
    InvalidValue {
        descriptor: String,
        field: String,
        expected: &'static str,
    },

    #[error("Value for {descriptor} must be a JSON object")]
    NotAnObject { descriptor: String },

    #[error("Path {path:?} does not match template {template:?}")]
    PathMismatch { path: String, template: String },
}

impl CodecError {
    /// Returns the stable error code for this error variant.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CodecError::Json(_) => ErrorCode::JsonParseError,
            CodecError::MissingPathTemplate { .. } => ErrorCode::MissingPathTemplate,
            CodecError::MultipleParentResources { .. } => ErrorCode::MultipleParentResources,
            CodecError::InvalidTemplate { .. } => ErrorCode::InvalidTemplate,
            CodecError::UnknownPlaceholder { .. } => ErrorCode::UnknownPlaceholder,
            CodecError::DuplicatePlaceholder { .. } => ErrorCode::DuplicatePlaceholder,
            CodecError::VariadicNotList { .. } => ErrorCode::VariadicNotList,
            CodecError::UnsupportedListElement { .. } => ErrorCode::UnsupportedListElement,
            CodecError::UnknownType { .. } => ErrorCode::UnknownType,
            CodecError::CyclicType { .. } => ErrorCode::CyclicType,
            CodecError::MissingRequiredParameter { .. } => ErrorCode::MissingRequiredParameter,
            CodecError::AmbiguousParameter { .. } => ErrorCode::AmbiguousParameter,
            CodecError::UnknownEnumValue { .. } => ErrorCode::UnknownEnumValue,
            CodecError::MalformedScalar { .. } => ErrorCode::MalformedScalar,
            CodecError::InvalidValue { .. } | CodecError::NotAnObject { .. } => {
                ErrorCode::InvalidValue
            }
            CodecError::PathMismatch { .. } => ErrorCode::PathMismatch,
        }
    }

    /// True for schema-definition defects: fix the schema, not the request.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CodecError::MissingPathTemplate { .. }
                | CodecError::MultipleParentResources { .. }
                | CodecError::InvalidTemplate { .. }
                | CodecError::UnknownPlaceholder { .. }
                | CodecError::DuplicatePlaceholder { .. }
                | CodecError::VariadicNotList { .. }
                | CodecError::UnsupportedListElement { .. }
                | CodecError::UnknownType { .. }
                | CodecError::CyclicType { .. }
        )
    }

    /// Produces a structured JSON error.
    ///
    /// Format: `{"code": "...", "message": "...", "configuration": bool}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "configuration": self.is_configuration(),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
