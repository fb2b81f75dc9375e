//! Path template parsing and matching
//!
//! A [`PathTemplate`] is the parsed form of a declared route path. Parsing
//! happens once at registration; matching walks the immutable segment list
//! against a split inbound path.

use std::collections::HashMap;

use crate::routing::error::{RouteError, RouteResult};

/// One segment of a path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Fixed path segment that must match exactly
    Literal(String),
    /// Named variable segment binding the path value
    Variable { name: String, required: bool },
}

/// A parsed path template
#[derive(Debug, Clone)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
    /// Segment count up to and excluding the first optional variable
    min_segments: usize,
    variable_count: usize,
}

/// Outcome of matching a template against a split path
#[derive(Debug)]
pub(crate) enum MatchOutcome {
    Match(PathVariables),
    /// Literal prefix matched but a required variable had no segment
    MissingRequired(String),
    NoMatch,
}

impl PathTemplate {
    /// Parse a template string like `/rooms/{id}/{detail?}`
    ///
    /// Variables are `{name}` (required) or `{name?}` (optional). Optional
    /// variables may only appear in trailing positions: once a segment is
    /// optional, every later segment must be an optional variable too.
    pub fn parse(template: &str) -> RouteResult<Self> {
        let invalid = |reason: &str| RouteError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = template.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(invalid("template has no segments"));
        }

        let mut segments = Vec::new();
        let mut seen_optional = false;
        let mut variable_count = 0;
        let mut names: Vec<String> = Vec::new();

        for raw in trimmed.split('/') {
            if raw.is_empty() {
                return Err(invalid("empty path segment"));
            }

            if let Some(inner) = raw.strip_prefix('{') {
                let inner = inner
                    .strip_suffix('}')
                    .ok_or_else(|| invalid("unterminated variable segment"))?;

                let (name, required) = match inner.strip_suffix('?') {
                    Some(name) => (name, false),
                    None => (inner, true),
                };

                if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    return Err(invalid("variable names must be alphanumeric"));
                }
                if names.iter().any(|n| n == name) {
                    return Err(invalid("duplicate variable name"));
                }
                if required && seen_optional {
                    return Err(invalid(
                        "required segments may not follow an optional variable",
                    ));
                }

                seen_optional = seen_optional || !required;
                variable_count += 1;
                names.push(name.to_string());
                segments.push(Segment::Variable {
                    name: name.to_string(),
                    required,
                });
            } else {
                if raw.contains('{') || raw.contains('}') {
                    return Err(invalid("braces are only valid around a whole segment"));
                }
                if seen_optional {
                    return Err(invalid(
                        "required segments may not follow an optional variable",
                    ));
                }
                segments.push(Segment::Literal(raw.to_string()));
            }
        }

        let min_segments = segments
            .iter()
            .position(|s| matches!(s, Segment::Variable { required: false, .. }))
            .unwrap_or(segments.len());

        Ok(Self {
            source: template.to_string(),
            segments,
            min_segments,
            variable_count,
        })
    }

    /// The original template string
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of variable segments (specificity: fewer wins)
    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    /// Match against a split path, binding variables on success
    pub(crate) fn match_segments(&self, path: &[&str]) -> MatchOutcome {
        if path.len() > self.segments.len() {
            return MatchOutcome::NoMatch;
        }

        let mut variables = HashMap::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match (segment, path.get(i)) {
                (Segment::Literal(lit), Some(value)) => {
                    if lit != value {
                        return MatchOutcome::NoMatch;
                    }
                }
                (Segment::Variable { name, .. }, Some(value)) => {
                    variables.insert(name.clone(), PathValue::Value((*value).to_string()));
                }
                (Segment::Literal(_), None) => return MatchOutcome::NoMatch,
                (Segment::Variable { name, required }, None) => {
                    if *required {
                        return MatchOutcome::MissingRequired(name.clone());
                    }
                    variables.insert(name.clone(), PathValue::Absent);
                }
            }
        }

        MatchOutcome::Match(PathVariables(variables))
    }

    /// Whether this template is structurally ambiguous with another
    ///
    /// Two templates collide when any of the segment shapes they can match
    /// (including shapes reached by truncating trailing optional variables)
    /// either carry the identical literal/variable pattern, or overlap on
    /// some concrete path while having equal variable counts. The latter
    /// pairs (`/a/{x}/c` vs `/a/b/{y}`) are exactly the ones that would tie
    /// on specificity at resolution time.
    pub(crate) fn collides_with(&self, other: &PathTemplate) -> bool {
        for len_a in self.min_segments..=self.segments.len() {
            for len_b in other.min_segments..=other.segments.len() {
                if len_a != len_b {
                    continue;
                }
                let a = &self.segments[..len_a];
                let b = &other.segments[..len_b];
                if shapes_equal(a, b) {
                    return true;
                }
                if self.variable_count == other.variable_count && shapes_overlap(a, b) {
                    return true;
                }
            }
        }
        false
    }
}

fn shapes_equal(a: &[Segment], b: &[Segment]) -> bool {
    a.iter().zip(b).all(|(sa, sb)| match (sa, sb) {
        (Segment::Literal(la), Segment::Literal(lb)) => la == lb,
        (Segment::Variable { .. }, Segment::Variable { .. }) => true,
        _ => false,
    })
}

/// Whether some concrete path can match both shapes: literal positions must
/// agree wherever both shapes are literal
fn shapes_overlap(a: &[Segment], b: &[Segment]) -> bool {
    a.iter().zip(b).all(|(sa, sb)| match (sa, sb) {
        (Segment::Literal(la), Segment::Literal(lb)) => la == lb,
        _ => true,
    })
}

/// Value bound to a path variable after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathValue {
    /// Variable was supplied in the path
    Value(String),
    /// Optional variable was not supplied (never an empty string)
    Absent,
}

impl PathValue {
    /// The supplied value, or `None` when absent
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PathValue::Value(s) => Some(s),
            PathValue::Absent => None,
        }
    }
}

/// Variables extracted from a resolved path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVariables(HashMap<String, PathValue>);

impl PathVariables {
    /// Binding for a variable name, if the template declares it
    pub fn get(&self, name: &str) -> Option<&PathValue> {
        self.0.get(name)
    }

    /// Supplied value for a variable, `None` when absent or undeclared
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PathValue::as_str)
    }

    /// Number of declared bindings, absent ones included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no variables were bound
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
