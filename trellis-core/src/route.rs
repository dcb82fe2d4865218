//! Route pattern compilation and matching
//!
//! A route template is literal path text plus `{name}` placeholders:
//!
//! ```
//! use trellis_core::{Route, Target};
//!
//! let mut route = Route::new("users/{id}/posts/{slug}", Target::action("PostController#show"));
//! route.with_constraint("id", "[0-9]+");
//!
//! assert!(route.matches("/users/42/posts/hello-world").unwrap());
//! assert_eq!(route.captures(), ["42", "hello-world"]);
//! assert_eq!(route.param("slug"), Some("hello-world"));
//!
//! assert!(!route.matches("/users/abc/posts/x").unwrap());
//! ```
//!
//! Templates compile to an anchored, case-insensitive regex. Placeholders
//! without a constraint match one or more non-`/` characters; constraints are
//! regex fragments whose groups are made non-capturing, so every placeholder
//! contributes exactly one capture.

use crate::logging::{trace, warn};
use crate::target::Target;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid"));

/// Default class for an unconstrained placeholder.
const DEFAULT_SEGMENT: &str = "([^/]+)";

/// A registered path template with its dispatch target.
#[derive(Clone, Debug)]
pub struct Route {
    path: String,
    pattern: String,
    target: Target,
    placeholder_names: Vec<String>,
    constraints: HashMap<String, String>,
    matcher: Option<Regex>,
    captures: Vec<String>,
    params: HashMap<String, String>,
}

impl Route {
    pub fn new(path: &str, target: Target) -> Self {
        let pattern = path.trim_matches('/').to_string();
        let placeholder_names = PLACEHOLDER
            .captures_iter(&pattern)
            .map(|caps| caps[1].to_string())
            .collect();

        Self {
            path: path.to_string(),
            pattern,
            target,
            placeholder_names,
            constraints: HashMap::new(),
            matcher: None,
            captures: Vec::new(),
            params: HashMap::new(),
        }
    }

    /// Restrict what placeholder `name` may capture.
    ///
    /// Capturing groups in `sub_pattern` are rewritten as non-capturing.
    /// An invalid fragment is reported by the next [`matches`](Self::matches).
    /// A constraint for a name the template does not contain has no effect
    /// on matching and is logged as a warning.
    pub fn with_constraint(&mut self, name: &str, sub_pattern: &str) -> &mut Self {
        if !self.placeholder_names.iter().any(|p| p == name) {
            warn!(
                pattern = %self.pattern,
                placeholder = name,
                "Constraint for unknown placeholder ignored"
            );
        }
        self.constraints
            .insert(name.to_string(), disable_captures(sub_pattern));
        self.matcher = None;
        self
    }

    /// Path as registered, before trimming.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Template with leading and trailing `/` removed.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Placeholder names in template order.
    pub fn placeholder_names(&self) -> &[String] {
        &self.placeholder_names
    }

    pub fn constraint(&self, name: &str) -> Option<&str> {
        self.constraints.get(name).map(String::as_str)
    }

    /// Captures of the last successful match, in template order.
    pub fn captures(&self) -> &[String] {
        &self.captures
    }

    /// Placeholder name to captured value, from the last successful match.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Test `path` against the template.
    ///
    /// On success the captures and params are replaced. On failure they are
    /// left as they were after the previous successful match, so callers
    /// must check the returned flag.
    pub fn matches(&mut self, path: &str) -> Result<bool> {
        if self.matcher.is_none() {
            self.matcher = Some(self.compile()?);
        }
        let Some(matcher) = self.matcher.as_ref() else {
            return Ok(false);
        };

        let candidate = path.trim_matches('/');
        let Some(caps) = matcher.captures(candidate) else {
            trace!(pattern = %self.pattern, path = candidate, "Route did not match");
            return Ok(false);
        };

        let captures: Vec<String> = caps
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();

        self.params = self
            .placeholder_names
            .iter()
            .cloned()
            .zip(captures.iter().cloned())
            .collect();
        self.captures = captures;

        trace!(pattern = %self.pattern, path = candidate, "Route matched");
        Ok(true)
    }

    /// Build the anchored matcher for the current constraints.
    pub fn compile(&self) -> Result<Regex> {
        let mut expression = String::from("(?i)^");
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(&self.pattern) {
            let Some(token) = caps.get(0) else {
                continue;
            };
            expression.push_str(&regex::escape(&self.pattern[last..token.start()]));

            match self.constraints.get(&caps[1]) {
                Some(constraint) => {
                    expression.push_str("((?:");
                    expression.push_str(constraint);
                    expression.push_str("))");
                }
                None => expression.push_str(DEFAULT_SEGMENT),
            }
            last = token.end();
        }

        expression.push_str(&regex::escape(&self.pattern[last..]));
        expression.push('$');

        Regex::new(&expression).map_err(|source| Error::InvalidPattern {
            pattern: self.pattern.clone(),
            source,
        })
    }
}

/// Rewrite capturing groups (plain and named) in a regex fragment as
/// non-capturing. Escapes and bracketed classes are left untouched.
fn disable_captures(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len() + 8);
    let mut class_depth = 0usize;
    let mut chars = fragment.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' => {
                class_depth += 1;
                out.push(c);
                // `]` first in a class (after an optional `^`) is a literal.
                if let Some((_, '^')) = chars.clone().next() {
                    chars.next();
                    out.push('^');
                }
                if let Some((_, ']')) = chars.clone().next() {
                    chars.next();
                    out.push(']');
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(c);
            }
            '(' if class_depth == 0 => {
                let rest = &fragment[index + 1..];
                if let Some(skip) = named_group_prefix(rest) {
                    out.push_str("(?:");
                    for _ in 0..skip {
                        chars.next();
                    }
                } else if rest.starts_with('?') {
                    out.push('(');
                } else {
                    out.push_str("(?:");
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Length of a `?P<name>` / `?<name>` group prefix at the start of `rest`.
fn named_group_prefix(rest: &str) -> Option<usize> {
    let after = rest
        .strip_prefix("?P<")
        .or_else(|| rest.strip_prefix("?<"))?;
    let close = after.find('>')?;
    let name = &after[..close];

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some(rest.len() - after.len() + close + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str) -> Route {
        Route::new(path, Target::action("Test#run"))
    }

    #[test]
    fn test_trims_separators() {
        let route = route("/users/{id}/");
        assert_eq!(route.pattern(), "users/{id}");
        assert_eq!(route.path(), "/users/{id}/");
    }

    #[test]
    fn test_placeholder_names_in_order() {
        let route = route("a/{first}/b/{second_2}");
        assert_eq!(route.placeholder_names(), ["first", "second_2"]);
    }

    #[test]
    fn test_static_route() {
        let mut route = route("about");
        assert!(route.matches("/about/").unwrap());
        assert!(route.captures().is_empty());
        assert!(!route.matches("about/team").unwrap());
    }

    #[test]
    fn test_root_route() {
        let mut route = route("/");
        assert!(route.matches("/").unwrap());
        assert!(route.matches("").unwrap());
        assert!(!route.matches("/home").unwrap());
    }

    #[test]
    fn test_case_insensitive() {
        let mut route = route("users/{id}");
        assert!(route.matches("USERS/Ab").unwrap());
        assert_eq!(route.param("id"), Some("Ab"));
    }

    #[test]
    fn test_literals_are_escaped() {
        let mut route = route("files/{name}.json");
        assert!(route.matches("files/report.json").unwrap());
        assert_eq!(route.param("name"), Some("report"));
        assert!(!route.matches("files/reportxjson").unwrap());
    }

    #[test]
    fn test_default_segment_stops_at_slash() {
        let mut route = route("users/{id}");
        assert!(!route.matches("users/1/2").unwrap());
    }

    #[test]
    fn test_constraint_restricts_capture() {
        let mut route = route("users/{id}");
        route.with_constraint("id", "[0-9]+");

        assert!(route.matches("users/123").unwrap());
        assert_eq!(route.param("id"), Some("123"));
        assert!(!route.matches("users/abc").unwrap());
    }

    #[test]
    fn test_constraint_groups_do_not_shift_captures() {
        let mut route = route("{lang}/{slug}");
        route.with_constraint("lang", "(en|fr)(-[a-z]{2})?");

        assert!(route.matches("fr-ca/bonjour").unwrap());
        assert_eq!(route.captures(), ["fr-ca", "bonjour"]);
        assert_eq!(route.param("slug"), Some("bonjour"));
    }

    #[test]
    fn test_constraint_may_span_segments() {
        let mut route = route("docs/{path}");
        route.with_constraint("path", ".+");

        assert!(route.matches("docs/guide/intro").unwrap());
        assert_eq!(route.param("path"), Some("guide/intro"));
    }

    #[test]
    fn test_failed_match_keeps_previous_state() {
        let mut route = route("users/{id}");
        assert!(route.matches("users/7").unwrap());
        assert!(!route.matches("posts/9").unwrap());

        assert_eq!(route.captures(), ["7"]);
        assert_eq!(route.param("id"), Some("7"));
    }

    #[test]
    fn test_invalid_constraint_reported() {
        let mut route = route("users/{id}");
        route.with_constraint("id", "[0-9");

        assert!(matches!(
            route.matches("users/1"),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_disable_captures() {
        assert_eq!(disable_captures("(a|b)"), "(?:a|b)");
        assert_eq!(disable_captures("(?:a)"), "(?:a)");
        assert_eq!(disable_captures("(?P<year>\\d{4})"), "(?:\\d{4})");
        assert_eq!(disable_captures("(?<x>y)"), "(?:y)");
        assert_eq!(disable_captures("\\(literal\\)"), "\\(literal\\)");
        assert_eq!(disable_captures("[(]x"), "[(]x");
        assert_eq!(disable_captures("(?i)abc"), "(?i)abc");
        assert_eq!(disable_captures("[](]+"), "[](]+");
        assert_eq!(disable_captures("[^](]+(x)"), "[^](]+(?:x)");
    }

    #[test]
    fn test_leading_bracket_in_class_is_literal() {
        let mut route = route("x/{v}");
        route.with_constraint("v", "[](]+");

        assert!(route.matches("x/](").unwrap());
        assert!(!route.matches("x/?:").unwrap());
    }

    #[test]
    fn test_constraint_for_unknown_placeholder_has_no_effect() {
        let mut route = route("users/{id}");
        route.with_constraint("ID", "[0-9]+");

        assert_eq!(route.constraint("ID"), Some("[0-9]+"));
        assert!(route.matches("users/abc").unwrap());
        assert_eq!(route.captures(), ["abc"]);
    }
}
