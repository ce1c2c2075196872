use thiserror::Error;

/// Errors raised while compiling a route template.
///
/// These are definition-time errors: the route table is wrong and must
/// be fixed by the application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("path must start with a slash, got {0:?}")]
    MissingLeadingSlash(String),
    #[error("unbalanced braces in {0:?}")]
    UnbalancedBraces(String),
    #[error("missing name or pattern in {{{0}}}")]
    MalformedPlaceholder(String),
    #[error("parameter {name:?} appears more than once in {template:?}")]
    DuplicateParam { name: String, template: String },
    #[error("invalid pattern for parameter {name:?}: {message}")]
    InvalidPattern { name: String, message: String },
}

/// Errors raised while building a concrete URI from a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("missing route variable {0:?}")]
    MissingParam(String),
    #[error("variable {value:?} for {name:?} does not match, expected /{pattern}/")]
    PatternMismatch {
        name: String,
        value: String,
        /// The anchored single-variable pattern, e.g. `^[0-9]+$`.
        pattern: String,
    },
    #[error("generated uri {0:?} does not match its own template")]
    Unmatched(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Uri(#[from] UriError),
    #[error("route already has name {existing:?}, can't set {requested:?}")]
    AlreadyNamed { existing: String, requested: String },
    #[error("a route named {0:?} is already registered")]
    DuplicateName(String),
    #[error("could not find route: {0}")]
    UnknownRoute(String),
    #[error("route has no path to build a uri from")]
    NoTemplate,
}
