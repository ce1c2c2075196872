//! Compiles route templates such as `/parent/{parentId:[0-9]+}/child/{childName}`
//! into anchored regular expressions, and formats them back into URIs.
//!
//! `{` and `}` delimit a placeholder. Inside a placeholder, `:` separates the
//! parameter name from an optional custom pattern, which defaults to
//! [`DEFAULT_PATTERN`]. Braces nested inside a pattern belong to the pattern
//! (`{id:[0-9]{4}}`). Literal text is escaped before being embedded, and the
//! compiled expression always accepts, but never requires, a trailing slash.

use crate::{
    error::{TemplateError, UriError},
    matching::{PathMatcher, RouteMatch},
    params::ParamSource,
};
use regex::Regex;
use std::{fmt, rc::Rc};

/// The pattern used for a placeholder without an explicit one: one or more
/// non-slash characters.
pub const DEFAULT_PATTERN: &str = "[^/]+";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Param(usize),
}

#[derive(Debug, Clone)]
struct ParamPattern {
    source: String,
    anchored: Regex,
    /// Index of the capture group wrapping this parameter in the full pattern.
    group: usize,
}

/// An immutable, compiled route template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    template: String,
    regex: Regex,
    param_names: Rc<[String]>,
    param_patterns: Vec<ParamPattern>,
    reverse: Vec<Piece>,
    end_slash: bool,
    match_prefix: bool,
}

impl PathTemplate {
    /// Compiles a template that must match the whole path.
    pub fn new(template: &str) -> Result<Self, TemplateError> {
        Self::compile(template, false)
    }

    /// Compiles a template that only needs to match a prefix of the path.
    pub fn new_prefix(template: &str) -> Result<Self, TemplateError> {
        Self::compile(template, true)
    }

    pub fn compile(template: &str, match_prefix: bool) -> Result<Self, TemplateError> {
        if !template.starts_with('/') {
            return Err(TemplateError::MissingLeadingSlash(template.to_owned()));
        }
        let spans = brace_spans(template)?;

        // '/foo/' and '/foo' both match; the slash only survives in the
        // reverse format.
        let (body, end_slash) = match template.strip_suffix('/') {
            Some(body) => (body, true),
            None => (template, false),
        };

        let mut pattern = String::from("^");
        let mut reverse = Vec::with_capacity(spans.len() * 2 + 1);
        let mut param_names: Vec<String> = Vec::with_capacity(spans.len());
        let mut param_patterns = Vec::with_capacity(spans.len());
        let mut group = 1;
        let mut end = 0;

        for (start, close) in spans {
            let raw = &body[end..start];
            end = close + 1;
            let inner = &body[start + 1..close];
            let (name, patt) = match inner.split_once(':') {
                Some((name, patt)) => (name, patt),
                None => (inner, DEFAULT_PATTERN),
            };
            if name.is_empty() || patt.is_empty() {
                return Err(TemplateError::MalformedPlaceholder(inner.to_owned()));
            }
            if param_names.iter().any(|n| n == name) {
                return Err(TemplateError::DuplicateParam {
                    name: name.to_owned(),
                    template: template.to_owned(),
                });
            }

            let anchored = Regex::new(&format!("^(?:{patt})$")).map_err(|e| {
                TemplateError::InvalidPattern {
                    name: name.to_owned(),
                    message: e.to_string(),
                }
            })?;
            // user patterns may carry their own groups, which shift ours
            let inner_groups = anchored.captures_len() - 1;

            pattern.push_str(&regex::escape(raw));
            pattern.push('(');
            pattern.push_str(patt);
            pattern.push(')');
            if !raw.is_empty() {
                reverse.push(Piece::Literal(raw.to_owned()));
            }
            reverse.push(Piece::Param(param_names.len()));
            param_names.push(name.to_owned());
            param_patterns.push(ParamPattern {
                source: patt.to_owned(),
                anchored,
                group,
            });
            group += 1 + inner_groups;
        }

        let raw = &body[end..];
        pattern.push_str(&regex::escape(raw));
        pattern.push_str("[/]?");
        if !match_prefix {
            pattern.push('$');
        }
        if !raw.is_empty() {
            reverse.push(Piece::Literal(raw.to_owned()));
        }

        let regex = Regex::new(&pattern).map_err(|e| TemplateError::InvalidPattern {
            name: param_names.last().cloned().unwrap_or_default(),
            message: e.to_string(),
        })?;

        Ok(Self {
            template: template.to_owned(),
            regex,
            param_names: param_names.into(),
            param_patterns,
            reverse,
            end_slash,
            match_prefix,
        })
    }

    /// The template text this was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub(crate) fn shared_param_names(&self) -> Rc<[String]> {
        Rc::clone(&self.param_names)
    }

    /// The anchored single-variable pattern for each parameter, in order.
    pub fn param_patterns(&self) -> impl Iterator<Item = &str> {
        self.param_patterns.iter().map(|p| p.anchored.as_str())
    }

    /// The full compiled expression.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// The reverse format, with a `%s` for every parameter.
    pub fn reverse_format(&self) -> String {
        let mut out = String::new();
        for piece in &self.reverse {
            match piece {
                Piece::Literal(raw) => out.push_str(raw),
                Piece::Param(_) => out.push_str("%s"),
            }
        }
        if self.end_slash {
            out.push('/');
        }
        out
    }

    pub fn is_prefix(&self) -> bool {
        self.match_prefix
    }

    /// Tests the path against the compiled pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Extracts the parameters of a matching path into `m`, leaving any
    /// value already present untouched.
    pub fn set_match(&self, path: &str, m: &mut RouteMatch) {
        let Some(caps) = self.regex.captures(path) else {
            return;
        };
        for (name, patt) in self.param_names.iter().zip(&self.param_patterns) {
            if let Some(value) = caps.get(patt.group) {
                m.params.insert_if_absent(name.clone(), value.as_str());
            }
        }
    }

    /// Builds a concrete URI by substituting the named values from `source`.
    ///
    /// A template without parameters is returned unchanged.
    pub fn uri(&self, source: &dyn ParamSource) -> Result<String, UriError> {
        if self.param_names.is_empty() {
            return Ok(self.template.clone());
        }

        let values = self
            .param_names
            .iter()
            .map(|name| {
                source
                    .param(name)
                    .ok_or_else(|| UriError::MissingParam(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut uri = String::with_capacity(self.template.len());
        for piece in &self.reverse {
            match piece {
                Piece::Literal(raw) => uri.push_str(raw),
                Piece::Param(idx) => uri.push_str(&values[*idx]),
            }
        }
        if self.end_slash {
            uri.push('/');
        }

        if self.regex.is_match(&uri) {
            return Ok(uri);
        }
        // The full expression is checked first since it is cheaper; the
        // individual patterns are only consulted to say what went wrong.
        for ((name, patt), value) in self
            .param_names
            .iter()
            .zip(&self.param_patterns)
            .zip(values)
        {
            if !patt.anchored.is_match(&value) {
                return Err(UriError::PatternMismatch {
                    name: name.clone(),
                    value,
                    pattern: format!("^{}$", patt.source),
                });
            }
        }
        Err(UriError::Unmatched(uri))
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl PathMatcher for PathTemplate {
    fn matches(&self, path: &str) -> bool {
        self.is_match(path)
    }

    fn set_match(&self, path: &str, m: &mut RouteMatch) {
        PathTemplate::set_match(self, path, m)
    }
}

/// Returns the `(open, close)` byte offsets of every top-level brace pair.
fn brace_spans(template: &str) -> Result<Vec<(usize, usize)>, TemplateError> {
    let mut level = 0usize;
    let mut open = 0;
    let mut spans = Vec::new();

    for (i, c) in template.char_indices() {
        match c {
            '{' => {
                level += 1;
                if level == 1 {
                    open = i;
                }
            }
            '}' => {
                level = level
                    .checked_sub(1)
                    .ok_or_else(|| TemplateError::UnbalancedBraces(template.to_owned()))?;
                if level == 0 {
                    spans.push((open, i));
                }
            }
            _ => {}
        }
    }

    if level != 0 {
        return Err(TemplateError::UnbalancedBraces(template.to_owned()));
    }
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_spans_only_track_top_level() {
        assert_eq!(brace_spans("/a/{id:[0-9]{4}}/b").unwrap(), vec![(3, 15)]);
        assert_eq!(brace_spans("/{a}/{b}").unwrap(), vec![(1, 3), (5, 7)]);
    }

    #[test]
    fn rejects_unbalanced_braces() {
        assert_eq!(
            PathTemplate::new("/a/{id").unwrap_err(),
            TemplateError::UnbalancedBraces("/a/{id".into())
        );
        assert_eq!(
            PathTemplate::new("/a/id}").unwrap_err(),
            TemplateError::UnbalancedBraces("/a/id}".into())
        );
    }

    #[test]
    fn rejects_malformed_placeholders() {
        assert!(matches!(
            PathTemplate::new("/a/{}"),
            Err(TemplateError::MalformedPlaceholder(_))
        ));
        assert!(matches!(
            PathTemplate::new("/a/{:[0-9]+}"),
            Err(TemplateError::MalformedPlaceholder(_))
        ));
        assert!(matches!(
            PathTemplate::new("/a/{id:}"),
            Err(TemplateError::MalformedPlaceholder(_))
        ));
        assert!(matches!(
            PathTemplate::new("/a/{id}/{id}"),
            Err(TemplateError::DuplicateParam { .. })
        ));
        assert!(matches!(
            PathTemplate::new("/a/{id:[0-9}"),
            Err(TemplateError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn requires_leading_slash() {
        assert_eq!(
            PathTemplate::new("foo").unwrap_err(),
            TemplateError::MissingLeadingSlash("foo".into())
        );
        assert!(PathTemplate::new("").is_err());
    }

    #[test]
    fn compiled_pattern_shape() {
        let tpl = PathTemplate::new("/a.b/{id:[0-9]+}/").unwrap();
        assert_eq!(tpl.pattern(), r"^/a\.b/([0-9]+)[/]?$");
        assert_eq!(tpl.reverse_format(), "/a.b/%s/");
        assert_eq!(tpl.param_patterns().collect::<Vec<_>>(), vec!["^(?:[0-9]+)$"]);

        let prefix = PathTemplate::new_prefix("/111/").unwrap();
        assert_eq!(prefix.pattern(), "^/111[/]?");
    }

    #[test]
    fn inner_groups_do_not_shift_params() {
        let tpl = PathTemplate::new("/{kind:(post|page)}/{slug}").unwrap();
        let mut m = RouteMatch::new();
        tpl.set_match("/post/hello", &mut m);
        assert_eq!(m.params.get_str("kind"), Some("post"));
        assert_eq!(m.params.get_str("slug"), Some("hello"));
    }

    #[test]
    fn root_template() {
        let tpl = PathTemplate::new("/").unwrap();
        assert!(tpl.is_match("/"));
        assert!(tpl.is_match(""));
        assert!(!tpl.is_match("/a"));
        assert_eq!(tpl.uri(&()).unwrap(), "/");
    }
}
