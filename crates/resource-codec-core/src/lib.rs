//! # resource-codec-core
//!
//! Turns typed request locators into HTTP resource URLs and back.
//!
//! A locator type is described by a [`Descriptor`]: its fields (name, wire
//! name, cardinality, kind) and, for resource types, a path template such as
//! `rooms/{roomId}/state`. Resources may nest a parent resource whose template
//! is prefixed to their own.
//!
//! - [`build_href`] — value → percent-encoded path + query parameters
//! - [`decode`] — flat wire parameters → value
//! - [`decode_href`] — relative URL → value
//!
//! Values are `serde_json::Value` objects keyed by field name. Types that
//! implement [`Locator`] go through [`href_for`], [`decode_as`] and
//! [`parse_as`] instead.

pub mod config;
pub mod decoder;
pub mod descriptor;
pub mod encoder;
pub mod error;
pub mod flatten;
pub mod href;
pub mod params;
pub mod template;

pub use config::{Registry, SchemaFile};
pub use decoder::{decode, decode_href};
pub use descriptor::{Cardinality, Descriptor, FieldDescriptor, FieldKind, Locator, ScalarType};
pub use encoder::encode_to_parameters;
pub use error::{CodecError, ErrorCode};
pub use flatten::{collect_parameter_names, collect_query_parameters, Parameter};
pub use href::{build_href, match_path, parse_href, Href};
pub use params::ParameterMultiMap;
pub use template::{resolve_path_template, PathTemplate, Segment};

/// Build the href of a typed locator.
pub fn href_for<T: Locator>(value: &T) -> Result<Href, CodecError> {
    let descriptor = T::descriptor();
    let value = serde_json::to_value(value)?;
    build_href(&descriptor, &value)
}

/// Encode a typed locator into its flat wire parameters.
pub fn parameters_for<T: Locator>(value: &T) -> Result<ParameterMultiMap, CodecError> {
    let descriptor = T::descriptor();
    let value = serde_json::to_value(value)?;
    encode_to_parameters(&descriptor, &value)
}

/// Decode wire parameters into a typed locator.
pub fn decode_as<T: Locator>(parameters: &ParameterMultiMap) -> Result<T, CodecError> {
    let descriptor = T::descriptor();
    let value = decode(&descriptor, parameters)?;
    Ok(serde_json::from_value(value)?)
}

/// Parse a relative URL (`path?query`) into a typed locator.
pub fn parse_as<T: Locator>(url: &str) -> Result<T, CodecError> {
    let descriptor = T::descriptor();
    let value = decode_href(&descriptor, url)?;
    Ok(serde_json::from_value(value)?)
}
