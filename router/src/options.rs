use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Options that control how a [`Navigator`](crate::Navigator) reacts to the
/// browser.
///
/// ```
/// use pathway_router::RouterOptions;
///
/// let options = RouterOptions::builder().defer_handlers(false).build();
/// assert!(!options.defer_handlers);
/// assert!(!options.passthrough_modified_clicks);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouterOptions {
    /// Run route handlers on a later tick, through [`Window::defer`],
    /// instead of inside the event that triggered the navigation.
    ///
    /// [`Window::defer`]: crate::location::Window::defer
    #[builder(default = true)]
    pub defer_handlers: bool,
    /// Leave clicks with a modifier key, a non-primary button, a `target`,
    /// `download` or `rel="external"` to the browser.
    #[builder(default)]
    pub passthrough_modified_clicks: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RouterOptions {
    /// Reads options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_in_defaults() {
        let options = RouterOptions::from_json(r#"{ "passthroughModifiedClicks": true }"#).unwrap();
        assert_eq!(
            options,
            RouterOptions {
                defer_handlers: true,
                passthrough_modified_clicks: true,
            }
        );
        assert_eq!(RouterOptions::from_json("{}").unwrap(), RouterOptions::default());
        assert!(RouterOptions::from_json("[]").is_err());
    }
}
