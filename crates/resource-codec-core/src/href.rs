//! URL builder and the inverse path matcher.
//!
//! [`build_href`] fills the resolved path template with encoded parameters
//! and leaves everything else in the query. [`match_path`] splits a concrete
//! path back into placeholder values, so that path variables and query
//! parameters can be merged into one multimap for decoding.

use std::fmt;
use std::ops::Range;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::descriptor::Descriptor;
use crate::encoder::encode_to_parameters;
use crate::error::CodecError;
use crate::params::ParameterMultiMap;
use crate::template::{resolve_path_template, PathTemplate, Segment};

/// Everything except RFC 3986 unreserved characters is escaped in path segments.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A built request location: a percent-encoded path plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Href {
    path: String,
    query: ParameterMultiMap,
}

impl Href {
    /// The percent-encoded path, `/`-joined.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parameters not consumed by the path, in encoding order.
    pub fn query(&self) -> &ParameterMultiMap {
        &self.query
    }

    /// The form-urlencoded query string, without the leading `?`.
    pub fn query_string(&self) -> String {
        self.query.to_query_string()
    }

    pub fn into_parts(self) -> (String, ParameterMultiMap) {
        (self.path, self.query)
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query.to_query_string())?;
        }
        Ok(())
    }
}

/// Build the path and query for `value`.
///
/// Any disagreement between the template's placeholders and the encoded
/// parameters is an error. `{name}` and `{name?}` reject an empty value, since
/// it would leave no segment behind. Empty elements of a `{name...}` list are
/// skipped, so they do not survive a round trip through the URL.
pub fn build_href(descriptor: &Descriptor, value: &Value) -> Result<Href, CodecError> {
    let template = resolve_path_template(descriptor)?;
    let mut parameters = encode_to_parameters(descriptor, value)?;
    let mut segments: Vec<String> = Vec::with_capacity(template.segments().len());

    for segment in template.segments() {
        match segment {
            Segment::Literal(text) => segments.push(text.clone()),
            Segment::Required(name) => {
                let values = parameters.remove(name).unwrap_or_default();
                match values.as_slice() {
                    [] => {
                        return Err(CodecError::MissingRequiredParameter {
                            descriptor: descriptor.name().to_string(),
                            name: name.clone(),
                        })
                    }
                    [value] if value.is_empty() => return Err(empty_segment(descriptor, name)),
                    [value] => segments.push(encode_segment(value)),
                    _ => return Err(ambiguous(descriptor, name, values.len())),
                }
            }
            Segment::Optional(name) => {
                let values = parameters.remove(name).unwrap_or_default();
                match values.as_slice() {
                    [] => {}
                    [value] if value.is_empty() => return Err(empty_segment(descriptor, name)),
                    [value] => segments.push(encode_segment(value)),
                    _ => return Err(ambiguous(descriptor, name, values.len())),
                }
            }
            Segment::Variadic(name) => {
                let values = parameters.remove(name).unwrap_or_default();
                segments.extend(values.iter().map(|v| encode_segment(v)));
            }
        }
    }

    let mut path = segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if template.is_absolute() {
        path.insert(0, '/');
    }

    tracing::debug!(
        descriptor = %descriptor.name(),
        path = %path,
        query_parameters = parameters.len(),
        "built href"
    );

    Ok(Href {
        path,
        query: parameters,
    })
}

fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

fn empty_segment(descriptor: &Descriptor, name: &str) -> CodecError {
    CodecError::InvalidValue {
        descriptor: descriptor.name().to_string(),
        field: name.to_string(),
        expected: "a non-empty path segment",
    }
}

fn ambiguous(descriptor: &Descriptor, name: &str, count: usize) -> CodecError {
    CodecError::AmbiguousParameter {
        descriptor: descriptor.name().to_string(),
        name: name.to_string(),
        count,
    }
}

/// Split a concrete, percent-encoded path into placeholder values.
///
/// Optional placeholders prefer consuming a segment; variadic placeholders
/// consume as many segments as still lets the rest of the template match.
/// A template such as `a/{b?}/c/{d...}` is therefore ambiguous for `a/c/c`:
/// it binds `b = "c"` and leaves `d` empty.
pub fn match_path(template: &PathTemplate, path: &str) -> Result<ParameterMultiMap, CodecError> {
    let mismatch = || CodecError::PathMismatch {
        path: path.to_string(),
        template: template.as_str().to_string(),
    };

    let decoded = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            percent_decode_str(s)
                .decode_utf8()
                .map(|d| d.into_owned())
                .map_err(|_| mismatch())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut bindings = Vec::new();
    if !match_segments(template.segments(), &decoded, 0, &mut bindings) {
        return Err(mismatch());
    }

    Ok(bindings
        .into_iter()
        .flat_map(|(name, span)| decoded[span].iter().map(move |v| (name, v.clone())))
        .collect())
}

/// A placeholder bound to `path[span]`.
type Binding<'t> = (&'t str, Range<usize>);

fn match_segments<'t>(
    template: &'t [Segment],
    path: &[String],
    at: usize,
    bindings: &mut Vec<Binding<'t>>,
) -> bool {
    let Some((first, rest)) = template.split_first() else {
        return at == path.len();
    };

    match first {
        Segment::Literal(text) => {
            path.get(at).is_some_and(|s| s == text) && match_segments(rest, path, at + 1, bindings)
        }
        Segment::Required(name) => {
            at < path.len() && try_bind(name, at..at + 1, rest, path, bindings)
        }
        Segment::Optional(name) => {
            (at < path.len() && try_bind(name, at..at + 1, rest, path, bindings))
                || match_segments(rest, path, at, bindings)
        }
        Segment::Variadic(name) => (at..=path.len())
            .rev()
            .any(|end| try_bind(name, at..end, rest, path, bindings)),
    }
}

/// Bind `span` to `name` and match the remainder, undoing the binding on failure.
fn try_bind<'t>(
    name: &'t str,
    span: Range<usize>,
    rest: &'t [Segment],
    path: &[String],
    bindings: &mut Vec<Binding<'t>>,
) -> bool {
    let next = span.end;
    bindings.push((name, span));
    if match_segments(rest, path, next, bindings) {
        return true;
    }
    bindings.pop();
    false
}

/// Parse a relative URL (`path[?query][#fragment]`) into one multimap:
/// path variables first, then query parameters.
pub fn parse_href(descriptor: &Descriptor, url: &str) -> Result<ParameterMultiMap, CodecError> {
    let template = resolve_path_template(descriptor)?;
    let url = url.split_once('#').map_or(url, |(before, _)| before);
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    let mut parameters = match_path(template, path)?;
    parameters.merge(ParameterMultiMap::from_query(query));
    Ok(parameters)
}
