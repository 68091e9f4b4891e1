//! Declarative schema tables.
//!
//! Descriptors can be declared in JSON instead of code. A table names every
//! type once; nested and parent-resource fields refer to other types by name.
//!
//! ## Serialization Format
//!
//! Keys are serialized in `kebab-case` (e.g. `wire-name`). A field carries
//! exactly one of `scalar`, `enum` or `nested`:
//!
//! ```json
//! {
//!   "types": {
//!     "Room": {
//!       "template": "rooms/{roomId}",
//!       "fields": [
//!         { "name": "room_id", "wire-name": "roomId", "scalar": "string" }
//!       ]
//!     },
//!     "RoomState": {
//!       "template": "state",
//!       "fields": [
//!         { "name": "room", "nested": "Room" },
//!         { "name": "format", "enum": ["client", "event"], "cardinality": "optional" }
//!       ]
//!     }
//!   }
//! }
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::descriptor::{Cardinality, Descriptor, FieldDescriptor, ScalarType};
use crate::error::CodecError;

/// A whole schema table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SchemaFile {
    /// Type definitions keyed by type name.
    pub types: IndexMap<String, TypeDef>,
}

/// One structured type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TypeDef {
    /// Present only on resource types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// One field of a [`TypeDef`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldDef {
    pub name: String,
    /// Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire_name: Option<String>,
    #[serde(default = "default_cardinality")]
    pub cardinality: Cardinality,
    #[serde(flatten)]
    pub kind: FieldKindDef,
}

fn default_cardinality() -> Cardinality {
    Cardinality::Required
}

/// Kind of a [`FieldDef`]; nested types are referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKindDef {
    Scalar(ScalarType),
    Enum(Vec<String>),
    Nested(String),
}

/// Descriptors built from a [`SchemaFile`], keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    descriptors: IndexMap<String, Arc<Descriptor>>,
}

impl Registry {
    /// Build every type of `file`. Unknown and self-nesting type references
    /// are rejected here; template defects surface on first use.
    pub fn from_schema_file(file: &SchemaFile) -> Result<Self, CodecError> {
        let mut builder = RegistryBuilder {
            file,
            built: IndexMap::new(),
            visiting: Vec::new(),
        };
        for name in file.types.keys() {
            builder.build(name, name)?;
        }
        tracing::debug!(types = builder.built.len(), "built descriptor registry");
        Ok(Self {
            descriptors: builder.built,
        })
    }

    /// Parse a JSON schema table and build it.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        let file: SchemaFile = serde_json::from_str(json)?;
        Self::from_schema_file(&file)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Descriptor>> {
        self.descriptors.get(name).cloned()
    }

    /// Type names, dependencies before the types that nest them.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }
}

struct RegistryBuilder<'a> {
    file: &'a SchemaFile,
    built: IndexMap<String, Arc<Descriptor>>,
    visiting: Vec<String>,
}

impl RegistryBuilder<'_> {
    fn build(&mut self, name: &str, referenced_by: &str) -> Result<Arc<Descriptor>, CodecError> {
        if let Some(done) = self.built.get(name) {
            return Ok(Arc::clone(done));
        }
        if self.visiting.iter().any(|v| v == name) {
            return Err(CodecError::CyclicType {
                name: name.to_string(),
            });
        }
        let file = self.file;
        let def = file
            .types
            .get(name)
            .ok_or_else(|| CodecError::UnknownType {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })?;

        self.visiting.push(name.to_string());
        let mut builder = Descriptor::builder(name);
        if let Some(template) = &def.template {
            builder = builder.template(template.clone());
        }
        for field in &def.fields {
            let descriptor = match &field.kind {
                FieldKindDef::Scalar(ty) => {
                    FieldDescriptor::scalar(field.name.clone(), *ty, field.cardinality)
                }
                FieldKindDef::Enum(variants) => FieldDescriptor::enumeration(
                    field.name.clone(),
                    variants.iter().cloned(),
                    field.cardinality,
                ),
                FieldKindDef::Nested(type_name) => {
                    let nested = self.build(type_name, name)?;
                    FieldDescriptor::nested(field.name.clone(), nested, field.cardinality)
                }
            };
            builder = builder.field(match &field.wire_name {
                Some(wire_name) => descriptor.with_wire_name(wire_name.clone()),
                None => descriptor,
            });
        }
        self.visiting.pop();

        let descriptor = Arc::new(builder.build());
        self.built.insert(name.to_string(), Arc::clone(&descriptor));
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldKind;
    use serde_json::json;

    #[test]
    fn test_schema_file_serde_round_trip() {
        let file = SchemaFile {
            types: IndexMap::from([(
                "Room".to_string(),
                TypeDef {
                    template: Some("rooms/{roomId}".to_string()),
                    fields: vec![FieldDef {
                        name: "room_id".to_string(),
                        wire_name: Some("roomId".to_string()),
                        cardinality: Cardinality::Required,
                        kind: FieldKindDef::Scalar(ScalarType::String),
                    }],
                },
            )]),
        };

        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(
            json,
            json!({
                "types": {
                    "Room": {
                        "template": "rooms/{roomId}",
                        "fields": [
                            { "name": "room_id", "wire-name": "roomId", "cardinality": "required", "scalar": "string" }
                        ]
                    }
                }
            })
        );

        let back: SchemaFile = serde_json::from_value(json).unwrap();
        assert_eq!(back.types["Room"].fields[0].kind, FieldKindDef::Scalar(ScalarType::String));
    }

    #[test]
    fn test_registry_resolves_references_in_any_order() {
        let registry = Registry::from_json(
            r#"{
                "types": {
                    "Event": {
                        "template": "event/{eventId}",
                        "fields": [
                            { "name": "room", "nested": "Room" },
                            { "name": "eventId", "scalar": "string" }
                        ]
                    },
                    "Room": {
                        "template": "rooms/{roomId}",
                        "fields": [{ "name": "roomId", "scalar": "string" }]
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Room", "Event"]);
        let event = registry.get("Event").unwrap();
        let room = registry.get("Room").unwrap();
        match event.fields()[0].kind() {
            FieldKind::Nested(nested) => assert!(Arc::ptr_eq(nested, &room)),
            other => panic!("expected nested field, got {other:?}"),
        }
        assert!(event.fields()[0].is_parent_resource());
    }

    #[test]
    fn test_unknown_type_reference() {
        let err = Registry::from_json(
            r#"{ "types": { "A": { "fields": [{ "name": "b", "nested": "B" }] } } }"#,
        )
        .unwrap_err();
        match err {
            CodecError::UnknownType {
                name,
                referenced_by,
            } => {
                assert_eq!(name, "B");
                assert_eq!(referenced_by, "A");
            }
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn test_cyclic_type_reference() {
        let err = Registry::from_json(
            r#"{ "types": {
                "A": { "fields": [{ "name": "b", "nested": "B" }] },
                "B": { "fields": [{ "name": "a", "nested": "A", "cardinality": "optional" }] }
            } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::CyclicType { .. }));
    }

    #[test]
    fn test_malformed_table_is_json_error() {
        let err = Registry::from_json(r#"{ "types": { "A": { "fields": [{ "name": "x" }] } } }"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }
}
