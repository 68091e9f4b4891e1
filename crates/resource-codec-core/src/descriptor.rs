//! Schema descriptors — static, introspectable descriptions of locator types.
//!
//! A [`Descriptor`] lists the fields of a structured type in declaration order
//! and, for resource types, the path template that addresses it. Descriptors
//! are built once (see [`Descriptor::builder`] or [`crate::config::Registry`]),
//! shared as `Arc<Descriptor>`, and never mutated afterwards apart from their
//! internal once-initialized caches.

use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::flatten::Parameter;
use crate::template::PathTemplate;

/// How many values a field carries on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    /// Exactly one value.
    Required,
    /// Zero or one value.
    Optional,
    /// Zero or more values, repeated under the same wire name.
    List,
}

/// Scalar types a field may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalarType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ScalarType {
    /// Human-readable name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Integer => "integer",
            ScalarType::Number => "number",
            ScalarType::Boolean => "boolean",
        }
    }
}

/// What a field holds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar(ScalarType),
    /// A closed set of wire strings.
    Enum(Vec<String>),
    /// A nested structure sharing the parent's wire namespace.
    Nested(Arc<Descriptor>),
}

/// One declared field of a [`Descriptor`].
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    wire_name: String,
    cardinality: Cardinality,
    kind: FieldKind,
}

impl FieldDescriptor {
    /// A scalar field whose wire name equals its name.
    pub fn scalar(name: impl Into<String>, ty: ScalarType, cardinality: Cardinality) -> Self {
        Self::new(name.into(), cardinality, FieldKind::Scalar(ty))
    }

    /// An enum field accepting exactly the given wire strings.
    pub fn enumeration<I, S>(name: impl Into<String>, variants: I, cardinality: Cardinality) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variants = variants.into_iter().map(Into::into).collect();
        Self::new(name.into(), cardinality, FieldKind::Enum(variants))
    }

    /// A nested structure. When `descriptor` carries a path template the
    /// field is the parent resource of the enclosing descriptor.
    pub fn nested(
        name: impl Into<String>,
        descriptor: Arc<Descriptor>,
        cardinality: Cardinality,
    ) -> Self {
        Self::new(name.into(), cardinality, FieldKind::Nested(descriptor))
    }

    fn new(name: String, cardinality: Cardinality, kind: FieldKind) -> Self {
        Self {
            wire_name: name.clone(),
            name,
            cardinality,
            kind,
        }
    }

    /// Override the name used in the path and query string.
    pub fn with_wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    /// Key of this field in the structured value.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.cardinality != Cardinality::Required
    }

    /// The nested descriptor, if this field holds a structure.
    pub fn nested_descriptor(&self) -> Option<&Arc<Descriptor>> {
        match &self.kind {
            FieldKind::Nested(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    /// True when this field holds another resource (a path prefix).
    pub fn is_parent_resource(&self) -> bool {
        self.nested_descriptor()
            .is_some_and(|descriptor| descriptor.is_resource())
    }
}

/// Static description of a structured locator type.
#[derive(Debug)]
pub struct Descriptor {
    name: String,
    path_template: Option<String>,
    fields: Vec<FieldDescriptor>,
    resolved_template: OnceLock<PathTemplate>,
    parameters: OnceLock<Vec<Parameter>>,
}

impl Descriptor {
    pub fn builder(name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            name: name.into(),
            path_template: None,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// This descriptor's own template segment, without any parent prefix.
    pub fn path_template(&self) -> Option<&str> {
        self.path_template.as_deref()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by its structured-value name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// A resource is a descriptor that declares a path template.
    pub fn is_resource(&self) -> bool {
        self.path_template.is_some()
    }

    /// The single field holding this resource's parent, if any.
    pub fn parent_field(&self) -> Result<Option<&FieldDescriptor>, CodecError> {
        let mut parents = self.fields.iter().filter(|f| f.is_parent_resource());
        let first = parents.next();
        if parents.next().is_some() {
            return Err(CodecError::MultipleParentResources {
                descriptor: self.name.clone(),
                fields: self
                    .fields
                    .iter()
                    .filter(|f| f.is_parent_resource())
                    .map(|f| f.name.clone())
                    .collect(),
            });
        }
        Ok(first)
    }

    pub(crate) fn template_cache(&self) -> &OnceLock<PathTemplate> {
        &self.resolved_template
    }

    pub(crate) fn parameter_cache(&self) -> &OnceLock<Vec<Parameter>> {
        &self.parameters
    }
}

/// Builder for [`Descriptor`].
///
/// Building never fails; schema defects (two parent resources, placeholders
/// without a backing field) surface on first use of the descriptor.
#[derive(Debug)]
pub struct DescriptorBuilder {
    name: String,
    path_template: Option<String>,
    fields: Vec<FieldDescriptor>,
}

impl DescriptorBuilder {
    /// Declare this type a resource addressed by `template`, e.g. `"rooms/{roomId}"`.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.path_template = Some(template.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Descriptor {
        Descriptor {
            name: self.name,
            path_template: self.path_template,
            fields: self.fields,
            resolved_template: OnceLock::new(),
            parameters: OnceLock::new(),
        }
    }
}

/// A typed request locator with a statically registered descriptor.
///
/// Values cross into the codec through serde, so field names in the
/// descriptor must match the serialized field names of the type.
///
/// ```
/// use std::sync::{Arc, OnceLock};
/// use resource_codec_core::{Cardinality, Descriptor, FieldDescriptor, Locator, ScalarType};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Profile {
///     user_id: String,
/// }
///
/// impl Locator for Profile {
///     fn descriptor() -> Arc<Descriptor> {
///         static DESCRIPTOR: OnceLock<Arc<Descriptor>> = OnceLock::new();
///         DESCRIPTOR
///             .get_or_init(|| {
///                 Arc::new(
///                     Descriptor::builder("Profile")
///                         .template("profile/{userId}")
///                         .field(
///                             FieldDescriptor::scalar("user_id", ScalarType::String, Cardinality::Required)
///                                 .with_wire_name("userId"),
///                         )
///                         .build(),
///                 )
///             })
///             .clone()
///     }
/// }
///
/// let href = resource_codec_core::href_for(&Profile { user_id: "@a:b.c".into() }).unwrap();
/// assert_eq!(href.path(), "profile/%40a%3Ab.c");
/// ```
pub trait Locator: Serialize + DeserializeOwned {
    fn descriptor() -> Arc<Descriptor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Arc<Descriptor> {
        Arc::new(
            Descriptor::builder("Room")
                .template("rooms/{roomId}")
                .field(
                    FieldDescriptor::scalar("room_id", ScalarType::String, Cardinality::Required)
                        .with_wire_name("roomId"),
                )
                .build(),
        )
    }

    #[test]
    fn test_wire_name_defaults_to_name() {
        let field = FieldDescriptor::scalar("limit", ScalarType::Integer, Cardinality::Optional);
        assert_eq!(field.wire_name(), "limit");
        assert!(field.is_optional());
    }

    #[test]
    fn test_parent_field_detected() {
        let event = Descriptor::builder("Event")
            .template("event/{eventId}")
            .field(FieldDescriptor::nested("room", room(), Cardinality::Required))
            .field(FieldDescriptor::scalar(
                "eventId",
                ScalarType::String,
                Cardinality::Required,
            ))
            .build();

        let parent = event.parent_field().unwrap().unwrap();
        assert_eq!(parent.name(), "room");
    }

    #[test]
    fn test_non_resource_nested_is_not_parent() {
        let paging = Arc::new(
            Descriptor::builder("Paging")
                .field(FieldDescriptor::scalar(
                    "from",
                    ScalarType::String,
                    Cardinality::Optional,
                ))
                .build(),
        );
        let messages = Descriptor::builder("Messages")
            .template("messages")
            .field(FieldDescriptor::nested("paging", paging, Cardinality::Required))
            .build();

        assert!(messages.parent_field().unwrap().is_none());
    }

    #[test]
    fn test_two_parents_rejected() {
        let broken = Descriptor::builder("Broken")
            .template("x")
            .field(FieldDescriptor::nested("a", room(), Cardinality::Required))
            .field(FieldDescriptor::nested("b", room(), Cardinality::Required))
            .build();

        match broken.parent_field() {
            Err(CodecError::MultipleParentResources { descriptor, fields }) => {
                assert_eq!(descriptor, "Broken");
                assert_eq!(fields, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected MultipleParentResources, got {other:?}"),
        }
    }
}
