//! The browser touchpoints of the navigation controller.
//!
//! Everything the controller needs from a browser window is behind the
//! [`Window`] trait: reading and assigning the location, writing history
//! entries, listening for `popstate` and `click`, and deferring work to a
//! later tick. [`MemoryWindow`] implements it in memory; with the `browser`
//! feature, `BrowserWindow` implements it over `web-sys`.

use serde::{Deserialize, Serialize};
use std::cell::Cell;

#[cfg(feature = "browser")]
mod browser;
mod memory;
#[cfg(feature = "browser")]
pub use browser::*;
pub use memory::*;

/// The [`state`](https://developer.mozilla.org/en-US/docs/Web/API/History/state)
/// stored with a history entry, carried as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State(Option<serde_json::Value>);

impl State {
    pub fn new(state: Option<serde_json::Value>) -> Self {
        Self(state)
    }

    pub fn value(&self) -> Option<&serde_json::Value> {
        self.0.as_ref()
    }
}

impl From<serde_json::Value> for State {
    fn from(value: serde_json::Value) -> Self {
        State(Some(value))
    }
}

/// The parts of a URL the router cares about.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Url {
    href: String,
    origin: String,
    path: String,
    search: String,
    hash: String,
}

impl Url {
    /// Parses an absolute URL.
    pub fn parse(url: &str) -> Result<Self, url::ParseError> {
        url::Url::parse(url).map(Self::from)
    }

    /// Parses `url` relative to `base`, the way a browser resolves an
    /// anchor's `href` against the current document.
    pub fn parse_with_base(url: &str, base: &str) -> Result<Self, url::ParseError> {
        let base = url::Url::parse(base)?;
        url::Url::options()
            .base_url(Some(&base))
            .parse(url)
            .map(Self::from)
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query string, without the leading `?`.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// The fragment, including the leading `#` when present.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn same_origin(&self, other: &Url) -> bool {
        self.origin == other.origin
    }
}

impl From<url::Url> for Url {
    fn from(url: url::Url) -> Self {
        Url {
            origin: url.origin().unicode_serialization(),
            path: url.path().to_string(),
            search: url.query().unwrap_or_default().to_string(),
            hash: url.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
            href: url.into(),
        }
    }
}

/// A `popstate` event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopStateEvent {
    pub state: Option<State>,
}

/// A `click` event that bubbled up to the window.
#[derive(Debug, Default)]
pub struct ClickEvent {
    /// The resolved `href` of the nearest enclosing anchor, if the click
    /// happened inside one.
    pub href: Option<String>,
    pub button: i16,
    /// Any of meta, alt, ctrl or shift was held.
    pub modifier: bool,
    /// The anchor's `target` attribute, if non-empty.
    pub target: Option<String>,
    /// The anchor carries a `download` attribute.
    pub download: bool,
    /// The anchor's `rel` contains `external`.
    pub external: bool,
    pub default_prevented: Cell<bool>,
}

impl ClickEvent {
    /// A plain primary-button click on an anchor.
    pub fn on_anchor(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Default::default()
        }
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Whether the browser would do something other than a plain
    /// same-tab navigation for this click.
    pub fn is_special(&self) -> bool {
        self.button != 0 || self.modifier || self.target.is_some() || self.download || self.external
    }
}

/// A browser window, as far as the navigation controller is concerned.
pub trait Window: 'static {
    /// Whether `history.pushState` and `history.replaceState` are usable.
    fn supports_history(&self) -> bool;

    /// The current `location.href`.
    fn href(&self) -> String;

    /// Assigns `location`, starting a full navigation.
    fn set_location(&self, url: &str);

    fn push_state(&self, state: Option<&State>, url: &str);

    fn replace_state(&self, state: Option<&State>, url: &str);

    fn on_pop_state(&self, listener: Box<dyn Fn(&PopStateEvent)>);

    fn on_click(&self, listener: Box<dyn Fn(&ClickEvent)>);

    /// Runs `task` on a later tick, outside the current event dispatch.
    fn defer(&self, task: Box<dyn FnOnce()>);
}
