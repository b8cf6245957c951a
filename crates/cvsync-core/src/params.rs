//! Build-time expansion of `${param}` and `$VAR` tokens.

use crate::location::{LocationKind, ResolvedLocation, RevisionSelector};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::trace;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("static token regex")
});

/// Build parameters and agent environment visible at resolution time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterContext {
    /// Build parameters; these shadow environment variables.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// Agent environment variables.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl ParameterContext {
    /// Empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a build parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    /// Capture the current process environment.
    #[must_use]
    pub fn from_process_env() -> Self {
        Self {
            parameters: BTreeMap::new(),
            environment: std::env::vars().collect(),
        }
    }

    /// Look a name up, parameters first.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .or_else(|| self.environment.get(name))
            .map(String::as_str)
    }
}

/// Expands deferred expressions against a [`ParameterContext`].
///
/// Unbound tokens expand to the empty string. A tag selector whose name is
/// only an unbound token therefore resolves to a tag with an empty name,
/// which checks out like HEAD but is reported as a tag.
#[derive(Debug, Clone, Copy)]
pub struct ParameterResolver<'a> {
    context: &'a ParameterContext,
}

impl<'a> ParameterResolver<'a> {
    /// Create a resolver over `context`.
    #[must_use]
    pub const fn new(context: &'a ParameterContext) -> Self {
        Self { context }
    }

    /// Expand every token in `input`.
    #[must_use]
    pub fn expand(&self, input: &str) -> String {
        if !input.contains('$') {
            return input.to_string();
        }
        TOKEN
            .replace_all(input, |caps: &Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map_or("", |m| m.as_str());
                match self.context.lookup(name) {
                    Some(value) => value.to_string(),
                    None => {
                        trace!(token = name, "unbound token expands to empty string");
                        String::new()
                    }
                }
            })
            .into_owned()
    }

    /// Resolve a selector. HEAD resolves to HEAD with an empty name.
    #[must_use]
    pub fn resolve(&self, selector: &RevisionSelector) -> ResolvedLocation {
        match selector {
            RevisionSelector::Head => ResolvedLocation::head(),
            RevisionSelector::Tag {
                name,
                use_head_if_not_found,
            } => ResolvedLocation {
                kind: LocationKind::Tag,
                name: self.expand(name),
                use_head_if_not_found: *use_head_if_not_found,
            },
            RevisionSelector::Branch {
                name,
                use_head_if_not_found,
            } => ResolvedLocation {
                kind: LocationKind::Branch,
                name: self.expand(name),
                use_head_if_not_found: *use_head_if_not_found,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn context() -> ParameterContext {
        ParameterContext::new()
            .with_parameter("cvsTag", "fooTag")
            .with_parameter("empty", "")
            .with_env("CVS_ENV_TEST", "fooBranch")
            .with_env("cvsTag", "shadowed")
    }

    #[rstest]
    #[case("fooTag", "fooTag")]
    #[case("${cvsTag}", "fooTag")]
    #[case("$CVS_ENV_TEST", "fooBranch")]
    #[case("${CVS_ENV_TEST}", "fooBranch")]
    #[case("pre-${cvsTag}-post", "pre-fooTag-post")]
    #[case("${missing}", "")]
    #[case("$MISSING", "")]
    #[case("${empty}", "")]
    #[case("no tokens", "no tokens")]
    fn expand(#[case] input: &str, #[case] expected: &str) {
        let ctx = context();
        assert_eq!(ParameterResolver::new(&ctx).expand(input), expected);
    }

    #[test]
    fn parameters_shadow_environment() {
        let ctx = context();
        assert_eq!(ctx.lookup("cvsTag"), Some("fooTag"));
    }

    #[test]
    fn parameterized_tag_matches_literal() {
        let ctx = context();
        let resolver = ParameterResolver::new(&ctx);
        assert_eq!(
            resolver.resolve(&RevisionSelector::tag("${cvsTag}", false)),
            resolver.resolve(&RevisionSelector::tag("fooTag", false)),
        );
    }

    #[test]
    fn empty_parameter_keeps_tag_kind() {
        let ctx = context();
        let loc = ParameterResolver::new(&ctx).resolve(&RevisionSelector::tag("${empty}", true));
        assert_eq!(loc.kind, LocationKind::Tag);
        assert_eq!(loc.name, "");
        assert!(loc.use_head_if_not_found);
    }

    #[test]
    fn head_resolves_to_head() {
        let ctx = ParameterContext::new();
        assert_eq!(
            ParameterResolver::new(&ctx).resolve(&RevisionSelector::Head),
            ResolvedLocation::head()
        );
    }
}
