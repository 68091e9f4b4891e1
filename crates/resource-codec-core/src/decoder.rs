//! Value decoder — flat parameter multimap → structured value.
//!
//! The inverse of [`crate::encoder`]. Decoding visits every declared field
//! once, in order; parameters no field asks for are ignored so that newer
//! wire producers can add fields without breaking older readers.

use serde_json::{Map, Number, Value};

use crate::descriptor::{Cardinality, Descriptor, FieldDescriptor, FieldKind, ScalarType};
use crate::error::CodecError;
use crate::flatten::collect_parameter_names;
use crate::href::parse_href;
use crate::params::ParameterMultiMap;

/// Decode `parameters` into a structured value shaped by `descriptor`.
///
/// Absent optional fields are left out of the result; list fields always
/// decode to an array, empty when their key is absent.
pub fn decode(descriptor: &Descriptor, parameters: &ParameterMultiMap) -> Result<Value, CodecError> {
    collect_parameter_names(descriptor)?;
    let value = StructDecoder::new(descriptor, parameters).decode()?;
    tracing::debug!(descriptor = %descriptor.name(), "decoded parameters");
    Ok(value)
}

/// Parse a relative URL (`path?query`) against the descriptor's template and
/// decode the merged parameters.
pub fn decode_href(descriptor: &Descriptor, url: &str) -> Result<Value, CodecError> {
    let parameters = parse_href(descriptor, url)?;
    decode(descriptor, &parameters)
}

/// Decodes one structure. Nested structures get their own decoder over the
/// same parameters, since nesting does not change the wire namespace.
struct StructDecoder<'a> {
    descriptor: &'a Descriptor,
    parameters: &'a ParameterMultiMap,
}

impl<'a> StructDecoder<'a> {
    fn new(descriptor: &'a Descriptor, parameters: &'a ParameterMultiMap) -> Self {
        Self {
            descriptor,
            parameters,
        }
    }

    fn decode(self) -> Result<Value, CodecError> {
        let mut object = Map::new();

        for field in self.descriptor.fields() {
            if let Some(value) = self.decode_field(field)? {
                object.insert(field.name().to_string(), value);
            }
        }

        Ok(Value::Object(object))
    }

    fn decode_field(&self, field: &FieldDescriptor) -> Result<Option<Value>, CodecError> {
        if let FieldKind::Nested(nested) = field.kind() {
            if field.is_optional() && !self.any_present(nested)? {
                return Ok(None);
            }
            return StructDecoder::new(nested, self.parameters).decode().map(Some);
        }

        if field.cardinality() == Cardinality::List {
            let values = self.parameters.get_all(field.wire_name()).unwrap_or(&[]);
            let items = ListDecoder::new(self.descriptor, field, values)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Some(Value::Array(items)));
        }

        match self
            .parameters
            .get_single(field.wire_name(), self.descriptor.name())?
        {
            Some(raw) => parse_element(self.descriptor, field, raw).map(Some),
            None if field.is_optional() => Ok(None),
            None => Err(CodecError::MissingRequiredParameter {
                descriptor: self.descriptor.name().to_string(),
                name: field.wire_name().to_string(),
            }),
        }
    }

    /// True when any parameter of `nested` appears on the wire.
    fn any_present(&self, nested: &Descriptor) -> Result<bool, CodecError> {
        Ok(collect_parameter_names(nested)?
            .iter()
            .any(|p| self.parameters.contains(&p.name)))
    }
}

/// Decodes the elements of a list field by position; the element count is
/// the number of values present for the key.
struct ListDecoder<'a> {
    descriptor: &'a Descriptor,
    field: &'a FieldDescriptor,
    values: &'a [String],
    index: usize,
}

impl<'a> ListDecoder<'a> {
    fn new(descriptor: &'a Descriptor, field: &'a FieldDescriptor, values: &'a [String]) -> Self {
        Self {
            descriptor,
            field,
            values,
            index: 0,
        }
    }
}

impl Iterator for ListDecoder<'_> {
    type Item = Result<Value, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.values.get(self.index)?;
        self.index += 1;
        Some(parse_element(self.descriptor, self.field, raw))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.values.len() - self.index;
        (remaining, Some(remaining))
    }
}

/// Parse one wire string into the field's scalar or enum type.
fn parse_element(
    descriptor: &Descriptor,
    field: &FieldDescriptor,
    raw: &str,
) -> Result<Value, CodecError> {
    let malformed = |expected: &'static str| CodecError::MalformedScalar {
        descriptor: descriptor.name().to_string(),
        field: field.name().to_string(),
        value: raw.to_string(),
        expected,
    };

    match field.kind() {
        FieldKind::Scalar(ScalarType::String) => Ok(Value::String(raw.to_string())),
        FieldKind::Scalar(ScalarType::Integer) => {
            parse_integer(raw).ok_or_else(|| malformed("integer"))
        }
        FieldKind::Scalar(ScalarType::Number) => parse_integer(raw)
            .or_else(|| {
                raw.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            })
            .ok_or_else(|| malformed("number")),
        FieldKind::Scalar(ScalarType::Boolean) => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(malformed("boolean")),
        },
        FieldKind::Enum(variants) => {
            if variants.iter().any(|v| v == raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                Err(CodecError::UnknownEnumValue {
                    descriptor: descriptor.name().to_string(),
                    field: field.name().to_string(),
                    value: raw.to_string(),
                })
            }
        }
        FieldKind::Nested(_) => Err(CodecError::UnsupportedListElement {
            descriptor: descriptor.name().to_string(),
            field: field.name().to_string(),
        }),
    }
}

fn parse_integer(raw: &str) -> Option<Value> {
    raw.parse::<i64>()
        .map(Value::from)
        .or_else(|_| raw.parse::<u64>().map(Value::from))
        .ok()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sync() -> Descriptor {
        let filter = Arc::new(
            Descriptor::builder("Filter")
                .field(FieldDescriptor::scalar(
                    "filter",
                    ScalarType::String,
                    Cardinality::Required,
                ))
                .field(FieldDescriptor::scalar(
                    "full_state",
                    ScalarType::Boolean,
                    Cardinality::Optional,
                ))
                .build(),
        );
        Descriptor::builder("Sync")
            .template("sync")
            .field(FieldDescriptor::nested("filter", filter, Cardinality::Optional))
            .field(
                FieldDescriptor::enumeration(
                    "presence",
                    ["offline", "online", "unavailable"],
                    Cardinality::Optional,
                )
                .with_wire_name("set_presence"),
            )
            .field(FieldDescriptor::scalar(
                "timeout",
                ScalarType::Integer,
                Cardinality::Required,
            ))
            .field(FieldDescriptor::scalar(
                "ratio",
                ScalarType::Number,
                Cardinality::Optional,
            ))
            .field(FieldDescriptor::scalar(
                "ids",
                ScalarType::Integer,
                Cardinality::List,
            ))
            .build()
    }

    fn params(pairs: &[(&str, &str)]) -> ParameterMultiMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_decodes_scalars_enums_lists_and_nested() {
        let decoded = decode(
            &sync(),
            &params(&[
                ("timeout", "30000"),
                ("filter", "f1"),
                ("full_state", "true"),
                ("set_presence", "online"),
                ("ratio", "0.5"),
                ("ids", "3"),
                ("ids", "1"),
            ]),
        )
        .unwrap();

        assert_eq!(
            decoded,
            json!({
                "filter": { "filter": "f1", "full_state": true },
                "presence": "online",
                "timeout": 30000,
                "ratio": 0.5,
                "ids": [3, 1]
            })
        );
    }

    #[test]
    fn test_absent_optionals_are_skipped_and_lists_empty() {
        let decoded = decode(&sync(), &params(&[("timeout", "0")])).unwrap();
        assert_eq!(decoded, json!({ "timeout": 0, "ids": [] }));
    }

    #[test]
    fn test_unknown_parameters_ignored() {
        let decoded = decode(&sync(), &params(&[("timeout", "1"), ("since", "s72")])).unwrap();
        assert_eq!(decoded, json!({ "timeout": 1, "ids": [] }));
    }

    #[test]
    fn test_optional_nested_present_enforces_its_required_fields() {
        let err = decode(&sync(), &params(&[("timeout", "1"), ("full_state", "false")]))
            .unwrap_err();
        match err {
            CodecError::MissingRequiredParameter { descriptor, name } => {
                assert_eq!(descriptor, "Filter");
                assert_eq!(name, "filter");
            }
            other => panic!("expected MissingRequiredParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_required() {
        let err = decode(&sync(), &ParameterMultiMap::new()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MissingRequiredParameter { ref name, .. } if name == "timeout"
        ));
    }

    #[test]
    fn test_repeated_single_value_is_ambiguous() {
        let err = decode(&sync(), &params(&[("timeout", "1"), ("timeout", "2")])).unwrap_err();
        assert!(matches!(err, CodecError::AmbiguousParameter { count: 2, .. }));
    }

    #[test]
    fn test_enum_rejection_names_token_and_field() {
        let err = decode(
            &sync(),
            &params(&[("timeout", "1"), ("set_presence", "bogus")]),
        )
        .unwrap_err();
        match err {
            CodecError::UnknownEnumValue {
                descriptor,
                field,
                value,
            } => {
                assert_eq!(descriptor, "Sync");
                assert_eq!(field, "presence");
                assert_eq!(value, "bogus");
            }
            other => panic!("expected UnknownEnumValue, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_scalars() {
        for (name, raw) in [("timeout", "soon"), ("ratio", "NaN"), ("ids", "x")] {
            let mut map = params(&[("timeout", "1")]);
            map.remove(name);
            map.insert(name, raw);
            let err = decode(&sync(), &map).unwrap_err();
            assert!(
                matches!(err, CodecError::MalformedScalar { .. }),
                "{name}={raw} gave {err:?}"
            );
        }

        let err = decode(&sync(), &params(&[("timeout", "1"), ("full_state", "yes"), ("filter", "f")]))
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedScalar {
                expected: "boolean",
                ..
            }
        ));
    }

    #[test]
    fn test_list_decoder_counts_values() {
        let descriptor = sync();
        let field = descriptor.field("ids").unwrap();
        let values = vec!["7".to_string(), "8".to_string()];
        let decoder = ListDecoder::new(&descriptor, field, &values);
        assert_eq!(decoder.size_hint(), (2, Some(2)));
        assert_eq!(
            decoder.collect::<Result<Vec<_>, _>>().unwrap(),
            vec![json!(7), json!(8)]
        );
    }
}
