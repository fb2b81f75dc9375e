//! Route table and resolution
//!
//! [`PathRouter`] owns the immutable set of registered routes. Registration
//! rejects structurally ambiguous templates; resolution scans the table,
//! binds path variables, and breaks overlaps by literal specificity.

use crate::routing::error::{RouteError, RouteResult};
use crate::routing::template::{MatchOutcome, PathTemplate, PathVariables};

/// A resolved route: the registered handler plus extracted variables
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    /// Handler registered for the matched template
    pub handler: &'a H,
    /// Source text of the matched template
    pub template: &'a str,
    /// Variables bound from the path
    pub variables: PathVariables,
}

struct RouteEntry<H> {
    template: PathTemplate,
    handler: H,
}

/// Immutable path-template router
///
/// Built once at startup; `resolve` is purely functional and shares the
/// table read-only across all sessions.
pub struct PathRouter<H> {
    routes: Vec<RouteEntry<H>>,
}

impl<H> Default for PathRouter<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> PathRouter<H> {
    /// Create an empty router
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a route template with its handler
    ///
    /// Fails with [`RouteError::AmbiguousRoute`] when the template is
    /// structurally ambiguous with an already registered one, including
    /// overlaps that would otherwise tie at resolution time.
    pub fn register(&mut self, template: &str, handler: H) -> RouteResult<()> {
        let parsed = PathTemplate::parse(template)?;

        for entry in &self.routes {
            if parsed.collides_with(&entry.template) {
                return Err(RouteError::AmbiguousRoute {
                    template: template.to_string(),
                    existing: entry.template.source().to_string(),
                });
            }
        }

        self.routes.push(RouteEntry {
            template: parsed,
            handler,
        });
        Ok(())
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve an inbound path to a handler and its variable bindings
    ///
    /// Returns `Ok(None)` when no template matches. When the only
    /// literal-compatible template fails because a required variable has no
    /// segment, resolution fails with [`RouteError::MissingPathVariable`].
    /// Among several full matches the template with the fewest variable
    /// segments wins; ties were already rejected at registration.
    pub fn resolve(&self, path: &str) -> RouteResult<Option<RouteMatch<'_, H>>> {
        let segments: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let mut best: Option<(&RouteEntry<H>, PathVariables)> = None;
        let mut missing: Option<(String, &PathTemplate)> = None;

        for entry in &self.routes {
            match entry.template.match_segments(&segments) {
                MatchOutcome::Match(variables) => {
                    let better = match &best {
                        Some((current, _)) => {
                            entry.template.variable_count() < current.template.variable_count()
                        }
                        None => true,
                    };
                    if better {
                        best = Some((entry, variables));
                    }
                }
                MatchOutcome::MissingRequired(name) => {
                    if missing.is_none() {
                        missing = Some((name, &entry.template));
                    }
                }
                MatchOutcome::NoMatch => {}
            }
        }

        if let Some((entry, variables)) = best {
            return Ok(Some(RouteMatch {
                handler: &entry.handler,
                template: entry.template.source(),
                variables,
            }));
        }

        if let Some((variable, template)) = missing {
            return Err(RouteError::MissingPathVariable {
                variable,
                template: template.source().to_string(),
            });
        }

        Ok(None)
    }
}
