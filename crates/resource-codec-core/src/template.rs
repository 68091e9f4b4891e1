//! Path template resolution.
//!
//! A resource's full template is its own template prefixed by the templates of
//! its parent resource chain, outermost parent first. Templates are split on
//! `/` into literal segments and placeholders:
//!
//! - `{name}` — exactly one path segment
//! - `{name?}` — zero or one path segment
//! - `{name...}` — zero or more path segments, backed by a list field

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::descriptor::{Descriptor, FieldDescriptor};
use crate::error::CodecError;
use crate::flatten::collect_parameter_names;

/// One `/`-separated piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Required(String),
    Optional(String),
    Variadic(String),
}

impl Segment {
    /// The parameter name for placeholders, `None` for literals.
    pub fn placeholder(&self) -> Option<&str> {
        match self {
            Segment::Literal(_) => None,
            Segment::Required(name) | Segment::Optional(name) | Segment::Variadic(name) => {
                Some(name.as_str())
            }
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(text) => f.write_str(text),
            Segment::Required(name) => write!(f, "{{{name}}}"),
            Segment::Optional(name) => write!(f, "{{{name}?}}"),
            Segment::Variadic(name) => write!(f, "{{{name}...}}"),
        }
    }
}

/// A parsed, fully resolved path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    absolute: bool,
    segments: Vec<Segment>,
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\{([A-Za-z0-9_\-]+)(\?|\.\.\.)?\}$").expect("placeholder pattern is valid")
    })
}

impl PathTemplate {
    /// Parse a template string. Empty segments (`a//b`, trailing `/`) are dropped.
    pub fn parse(raw: &str) -> Result<Self, CodecError> {
        let pattern = placeholder_pattern();
        let mut segments = Vec::new();

        for piece in raw.split('/').filter(|s| !s.is_empty()) {
            if !piece.contains(['{', '}']) {
                segments.push(Segment::Literal(piece.to_string()));
                continue;
            }
            let captures = pattern
                .captures(piece)
                .ok_or_else(|| CodecError::InvalidTemplate {
                    template: raw.to_string(),
                    message: format!("segment {piece:?} is neither a literal nor a placeholder"),
                })?;
            let name = captures[1].to_string();
            let segment = match captures.get(2).map(|m| m.as_str()) {
                None => Segment::Required(name),
                Some("?") => Segment::Optional(name),
                Some(_) => Segment::Variadic(name),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            absolute: raw.starts_with('/'),
            segments,
        })
    }

    /// The template text as resolved (parents first).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the template starts with `/`.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn placeholder_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::placeholder)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Resolve the full path template of a resource descriptor.
///
/// The result is computed once per descriptor and cached; errors are not
/// cached and resurface on every call.
pub fn resolve_path_template(descriptor: &Descriptor) -> Result<&PathTemplate, CodecError> {
    if let Some(resolved) = descriptor.template_cache().get() {
        return Ok(resolved);
    }
    let resolved = resolve_uncached(descriptor)?;
    Ok(descriptor.template_cache().get_or_init(|| resolved))
}

fn resolve_uncached(descriptor: &Descriptor) -> Result<PathTemplate, CodecError> {
    let mut accumulator = String::new();
    let mut current = descriptor;

    loop {
        let own = current
            .path_template()
            .ok_or_else(|| CodecError::MissingPathTemplate {
                descriptor: current.name().to_string(),
            })?;
        accumulator = join_templates(own, &accumulator);

        match current
            .parent_field()?
            .and_then(FieldDescriptor::nested_descriptor)
        {
            Some(parent) => current = parent,
            None => break,
        }
    }

    let template = PathTemplate::parse(&accumulator)?;
    validate_placeholders(descriptor, &template)?;

    tracing::debug!(
        descriptor = %descriptor.name(),
        template = %template,
        "resolved path template"
    );
    Ok(template)
}

/// Join two template pieces, adding a `/` unless either side already has one.
fn join_templates(prefix: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return prefix.to_string();
    }
    if prefix.is_empty() || prefix.ends_with('/') || suffix.starts_with('/') {
        return format!("{prefix}{suffix}");
    }
    format!("{prefix}/{suffix}")
}

/// Every placeholder must be backed by a flattened parameter; variadic
/// placeholders must be backed by a list.
fn validate_placeholders(
    descriptor: &Descriptor,
    template: &PathTemplate,
) -> Result<(), CodecError> {
    let parameters = collect_parameter_names(descriptor)?;
    let mut seen = HashSet::new();

    for segment in template.segments() {
        let Some(name) = segment.placeholder() else {
            continue;
        };
        if !seen.insert(name) {
            return Err(CodecError::DuplicatePlaceholder {
                descriptor: descriptor.name().to_string(),
                name: name.to_string(),
            });
        }
        let parameter = parameters.iter().find(|p| p.name == name).ok_or_else(|| {
            CodecError::UnknownPlaceholder {
                descriptor: descriptor.name().to_string(),
                name: name.to_string(),
            }
        })?;
        if matches!(segment, Segment::Variadic(_)) && !parameter.repeated {
            return Err(CodecError::VariadicNotList {
                descriptor: descriptor.name().to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
