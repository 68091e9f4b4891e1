//! Parameter flattening.
//!
//! Nested structures share their parent's wire namespace: a nested field
//! contributes the parameters of its descendants under their own wire names,
//! never itself. Two nesting levels declaring the same wire name therefore
//! collide; collisions are reported with a warning and are not disambiguated.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::descriptor::{Cardinality, Descriptor, FieldKind};
use crate::error::CodecError;
use crate::template::resolve_path_template;

/// A flattened wire parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Wire name.
    pub name: String,
    /// The parameter may be absent from a valid request.
    pub optional: bool,
    /// The parameter may carry more than one value.
    pub repeated: bool,
}

/// Every wire parameter reachable from `descriptor`, in declaration order.
///
/// Computed once per descriptor and cached.
pub fn collect_parameter_names(descriptor: &Descriptor) -> Result<&[Parameter], CodecError> {
    if let Some(parameters) = descriptor.parameter_cache().get() {
        return Ok(parameters.as_slice());
    }

    let mut collected = IndexMap::new();
    let mut collisions = HashSet::new();
    walk(descriptor, false, &mut collected, &mut collisions)?;

    for name in &collisions {
        tracing::warn!(
            descriptor = %descriptor.name(),
            wire_name = %name,
            "wire name declared more than once across nested structures"
        );
    }

    let parameters = collected.into_values().collect();
    Ok(descriptor
        .parameter_cache()
        .get_or_init(|| parameters)
        .as_slice())
}

/// Parameters that travel in the query string: everything not named by a
/// placeholder of the resolved path template.
pub fn collect_query_parameters(descriptor: &Descriptor) -> Result<Vec<Parameter>, CodecError> {
    let template = resolve_path_template(descriptor)?;
    let in_path: HashSet<&str> = template.placeholder_names().collect();

    Ok(collect_parameter_names(descriptor)?
        .iter()
        .filter(|p| !in_path.contains(p.name.as_str()))
        .cloned()
        .collect())
}

fn walk(
    descriptor: &Descriptor,
    inherited_optional: bool,
    out: &mut IndexMap<String, Parameter>,
    collisions: &mut HashSet<String>,
) -> Result<(), CodecError> {
    for field in descriptor.fields() {
        let optional = inherited_optional || field.is_optional();

        if let FieldKind::Nested(nested) = field.kind() {
            if field.cardinality() == Cardinality::List {
                return Err(CodecError::UnsupportedListElement {
                    descriptor: descriptor.name().to_string(),
                    field: field.name().to_string(),
                });
            }
            walk(nested, optional, out, collisions)?;
            continue;
        }

        let name = field.wire_name();
        if out.contains_key(name) {
            collisions.insert(name.to_string());
            continue;
        }
        out.insert(
            name.to_string(),
            Parameter {
                name: name.to_string(),
                optional,
                repeated: field.cardinality() == Cardinality::List,
            },
        );
    }
    Ok(())
}
