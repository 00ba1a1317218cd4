//! Conventional route templates.
//!
//! # Responsibilities
//! - Parse templates like `{controller=Products}/{action=Index}/{id?}`
//! - Match a request path segment by segment
//! - Percent-decode captured segments; a segment that is not UTF-8 once decoded never matches
//! - Fill defaults for trailing segments the path leaves out
//!
//! # Design Decisions
//! - Literal segments match case-insensitively
//! - Once a segment may be omitted, every later segment may be too
//! - Parsed once at startup; matching allocates only the captured values

use std::collections::HashSet;

use percent_encoding::percent_decode_str;

use crate::routing::values::RouteValues;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Parameter {
        name: String,
        default: Option<String>,
        optional: bool,
    },
}

impl Segment {
    fn may_be_omitted(&self) -> bool {
        match self {
            Segment::Literal(_) => false,
            Segment::Parameter { default, optional, .. } => *optional || default.is_some(),
        }
    }
}

/// Errors in a route template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutePatternError {
    #[error("empty segment in template '{0}'")]
    EmptySegment(String),

    #[error("malformed parameter '{0}'")]
    MalformedParameter(String),

    #[error("parameter '{0}' appears more than once")]
    DuplicateParameter(String),

    #[error("parameter '{0}' cannot be both optional and have a default")]
    OptionalWithDefault(String),

    #[error("required segment '{0}' follows an optional one")]
    RequiredAfterOptional(String),
}

/// A parsed route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    template: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(template: &str) -> Result<Self, RoutePatternError> {
        let trimmed = template.trim_matches('/');
        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let mut omissible = false;

        if !trimmed.is_empty() {
            for raw in trimmed.split('/') {
                if raw.is_empty() {
                    return Err(RoutePatternError::EmptySegment(template.to_string()));
                }
                let segment = parse_segment(raw)?;
                if let Segment::Parameter { name, .. } = &segment {
                    if !seen.insert(name.to_ascii_lowercase()) {
                        return Err(RoutePatternError::DuplicateParameter(name.clone()));
                    }
                }
                if segment.may_be_omitted() {
                    omissible = true;
                } else if omissible {
                    return Err(RoutePatternError::RequiredAfterOptional(raw.to_string()));
                }
                segments.push(segment);
            }
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Match a request path. Returns the captured and defaulted values, decoded.
    pub fn matches(&self, path: &str) -> Option<RouteValues> {
        let parts = path
            .trim_matches('/')
            .split('/')
            .filter(|p| !p.is_empty())
            .map(|p| percent_decode_str(p).decode_utf8().ok())
            .collect::<Option<Vec<_>>>()?;
        if parts.len() > self.segments.len() {
            return None;
        }

        let mut values = RouteValues::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match (segment, parts.get(i)) {
                (Segment::Literal(literal), Some(part)) => {
                    if !literal.eq_ignore_ascii_case(part) {
                        return None;
                    }
                }
                (Segment::Literal(_), None) => return None,
                (Segment::Parameter { name, .. }, Some(part)) => {
                    values.insert(name.clone(), part.to_string());
                }
                (Segment::Parameter { name, default, optional }, None) => match default {
                    Some(default) => values.insert(name.clone(), default.clone()),
                    None if *optional => {}
                    None => return None,
                },
            }
        }
        Some(values)
    }
}

fn parse_segment(raw: &str) -> Result<Segment, RoutePatternError> {
    let Some(inner) = raw.strip_prefix('{') else {
        if raw.contains('{') || raw.contains('}') {
            return Err(RoutePatternError::MalformedParameter(raw.to_string()));
        }
        return Ok(Segment::Literal(raw.to_string()));
    };
    let inner = inner
        .strip_suffix('}')
        .ok_or_else(|| RoutePatternError::MalformedParameter(raw.to_string()))?;
    if inner.contains('{') || inner.contains('}') {
        return Err(RoutePatternError::MalformedParameter(raw.to_string()));
    }

    let (head, default) = match inner.split_once('=') {
        Some((head, default)) => (head, Some(default.to_string())),
        None => (inner, None),
    };
    let (name, optional) = match head.strip_suffix('?') {
        Some(name) => (name, true),
        None => (head, false),
    };

    let valid_name = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_name {
        return Err(RoutePatternError::MalformedParameter(raw.to_string()));
    }
    if optional && default.is_some() {
        return Err(RoutePatternError::OptionalWithDefault(name.to_string()));
    }

    Ok(Segment::Parameter {
        name: name.to_string(),
        default,
        optional,
    })
}
