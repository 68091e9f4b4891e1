//! Value encoder — structured value → flat parameter multimap.

use serde_json::{Map, Value};

use crate::descriptor::{Cardinality, Descriptor, FieldDescriptor, FieldKind, ScalarType};
use crate::error::CodecError;
use crate::flatten::collect_parameter_names;
use crate::params::ParameterMultiMap;

/// Encode `value` into wire parameters, following field declaration order.
///
/// `value` is an object keyed by field name; `null` members are treated as
/// absent. Nested structures merge their entries into the parent's map
/// under their own wire names, and lists expand into repeated entries. An
/// empty list produces no entry at all.
pub fn encode_to_parameters(
    descriptor: &Descriptor,
    value: &Value,
) -> Result<ParameterMultiMap, CodecError> {
    // Rejects lists of nested structures before any value is inspected.
    collect_parameter_names(descriptor)?;
    let object = match value {
        Value::Object(object) => Some(object),
        Value::Null => None,
        _ => {
            return Err(CodecError::NotAnObject {
                descriptor: descriptor.name().to_string(),
            })
        }
    };
    encode_structure(descriptor, object)
}

/// `None` stands for a structure with every member absent.
fn encode_structure(
    descriptor: &Descriptor,
    object: Option<&Map<String, Value>>,
) -> Result<ParameterMultiMap, CodecError> {
    let mut out = ParameterMultiMap::new();

    for field in descriptor.fields() {
        let slot = object
            .and_then(|o| o.get(field.name()))
            .filter(|v| !v.is_null());

        match field.kind() {
            FieldKind::Nested(nested) => {
                let child = match slot {
                    None if field.is_optional() => continue,
                    None => None,
                    Some(Value::Object(child)) => Some(child),
                    Some(_) => return Err(invalid(descriptor, field, "an object")),
                };
                out.merge(encode_structure(nested, child)?);
            }
            _ if field.cardinality() == Cardinality::List => match slot {
                None => {}
                Some(Value::Array(items)) => {
                    let encoded = items
                        .iter()
                        .map(|item| stringify(descriptor, field, item))
                        .collect::<Result<Vec<_>, _>>()?;
                    out.extend_values(field.wire_name(), encoded);
                }
                Some(_) => return Err(invalid(descriptor, field, "an array")),
            },
            _ => match slot {
                Some(item) => out.insert(field.wire_name(), stringify(descriptor, field, item)?),
                None if field.is_optional() => {}
                None => {
                    return Err(CodecError::MissingRequiredParameter {
                        descriptor: descriptor.name().to_string(),
                        name: field.wire_name().to_string(),
                    })
                }
            },
        }
    }

    Ok(out)
}

/// Render one scalar or enum value as its wire string.
fn stringify(
    descriptor: &Descriptor,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<String, CodecError> {
    match (field.kind(), value) {
        (FieldKind::Scalar(ScalarType::String), Value::String(s)) => Ok(s.clone()),
        (FieldKind::Scalar(ScalarType::Integer), Value::Number(n)) if !n.is_f64() => {
            Ok(n.to_string())
        }
        (FieldKind::Scalar(ScalarType::Number), Value::Number(n)) => Ok(n.to_string()),
        (FieldKind::Scalar(ScalarType::Boolean), Value::Bool(b)) => Ok(b.to_string()),
        (FieldKind::Scalar(ty), _) => Err(invalid(descriptor, field, ty.as_str())),
        (FieldKind::Enum(variants), Value::String(s)) => {
            if variants.iter().any(|v| v == s) {
                Ok(s.clone())
            } else {
                Err(CodecError::UnknownEnumValue {
                    descriptor: descriptor.name().to_string(),
                    field: field.name().to_string(),
                    value: s.clone(),
                })
            }
        }
        (FieldKind::Enum(_), _) => Err(invalid(descriptor, field, "an enum string")),
        (FieldKind::Nested(_), _) => Err(invalid(descriptor, field, "a scalar")),
    }
}

fn invalid(descriptor: &Descriptor, field: &FieldDescriptor, expected: &'static str) -> CodecError {
    CodecError::InvalidValue {
        descriptor: descriptor.name().to_string(),
        field: field.name().to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn search() -> Descriptor {
        let paging = Arc::new(
            Descriptor::builder("Paging")
                .field(FieldDescriptor::scalar(
                    "from",
                    ScalarType::String,
                    Cardinality::Optional,
                ))
                .field(FieldDescriptor::scalar(
                    "limit",
                    ScalarType::Integer,
                    Cardinality::Optional,
                ))
                .build(),
        );
        Descriptor::builder("Search")
            .template("search")
            .field(FieldDescriptor::scalar(
                "term",
                ScalarType::String,
                Cardinality::Required,
            ))
            .field(FieldDescriptor::nested("paging", paging, Cardinality::Optional))
            .field(
                FieldDescriptor::enumeration("order", ["rank", "recent"], Cardinality::Optional)
                    .with_wire_name("order_by"),
            )
            .field(FieldDescriptor::scalar(
                "rooms",
                ScalarType::String,
                Cardinality::List,
            ))
            .field(FieldDescriptor::scalar(
                "full",
                ScalarType::Boolean,
                Cardinality::Optional,
            ))
            .build()
    }

    #[test]
    fn test_encodes_in_declaration_order() {
        let value = json!({
            "rooms": ["!a:x", "!b:x"],
            "term": "hello",
            "order": "recent",
            "paging": { "limit": 10, "from": "t1" },
            "full": true
        });
        let params = encode_to_parameters(&search(), &value).unwrap();

        assert_eq!(
            params.iter().collect::<Vec<_>>(),
            vec![
                ("term", "hello"),
                ("from", "t1"),
                ("limit", "10"),
                ("order_by", "recent"),
                ("rooms", "!a:x"),
                ("rooms", "!b:x"),
                ("full", "true"),
            ]
        );
    }

    #[test]
    fn test_absent_optional_and_empty_list_produce_no_entry() {
        let value = json!({ "term": "hi", "order": null, "rooms": [] });
        let params = encode_to_parameters(&search(), &value).unwrap();

        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["term"]);
    }

    #[test]
    fn test_missing_required_scalar() {
        let err = encode_to_parameters(&search(), &json!({})).unwrap_err();
        match err {
            CodecError::MissingRequiredParameter { name, .. } => assert_eq!(name, "term"),
            other => panic!("expected MissingRequiredParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_enum_value() {
        let err = encode_to_parameters(&search(), &json!({ "term": "x", "order": "oldest" }))
            .unwrap_err();
        assert!(matches!(err, CodecError::UnknownEnumValue { ref value, .. } if value == "oldest"));
    }

    #[test]
    fn test_type_mismatch() {
        let err = encode_to_parameters(&search(), &json!({ "term": 5 })).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidValue {
                expected: "string",
                ..
            }
        ));

        let err = encode_to_parameters(&search(), &json!({ "term": "x", "rooms": "!a:x" }))
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue { .. }));
    }

    #[test]
    fn test_float_rejected_for_integer() {
        let value = json!({ "term": "x", "paging": { "limit": 1.5 } });
        assert!(encode_to_parameters(&search(), &value).is_err());
    }

    #[test]
    fn test_nested_shape_mismatch_names_field() {
        let err = encode_to_parameters(&search(), &json!({ "term": "x", "paging": "t1" }))
            .unwrap_err();
        match err {
            CodecError::InvalidValue {
                descriptor,
                field,
                expected,
            } => {
                assert_eq!(descriptor, "Search");
                assert_eq!(field, "paging");
                assert_eq!(expected, "an object");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_root_must_be_object() {
        let err = encode_to_parameters(&search(), &json!(["x"])).unwrap_err();
        assert!(matches!(
            err,
            CodecError::NotAnObject { ref descriptor } if descriptor == "Search"
        ));
        assert_eq!(err.to_string(), "Value for Search must be a JSON object");
    }
}
