use crate::{navigation::Handler, params::ParamsMap, routes::RouteId};
use std::{fmt, rc::Rc};

/// Something that can test a path against its own criteria and contribute
/// parameters to a match.
///
/// Path templates are the primary kind; custom implementations can be added
/// to a route with [`RouteMut::matcher`](crate::RouteMut::matcher) and are
/// combined with its other matchers using AND semantics.
pub trait PathMatcher {
    fn matches(&self, path: &str) -> bool;

    /// Called once every matcher of the route has matched.
    fn set_match(&self, _path: &str, _m: &mut RouteMatch) {}
}

impl<F> PathMatcher for F
where
    F: Fn(&str) -> bool,
{
    fn matches(&self, path: &str) -> bool {
        self(path)
    }
}

/// The result of a single match attempt.
///
/// Threaded through the route tree while matching: the innermost route that
/// matches claims `route` and `handler`, and every level contributes
/// parameters without overwriting the ones set below it.
#[derive(Clone, Default)]
pub struct RouteMatch {
    pub route: Option<RouteId>,
    pub handler: Option<Handler>,
    pub params: ParamsMap,
    pub(crate) param_names: Option<Rc<[String]>>,
}

impl RouteMatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the parameters known to the matched route's template chain.
    pub fn param_names(&self) -> &[String] {
        self.param_names.as_deref().unwrap_or_default()
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("route", &self.route)
            .field("handler", &self.handler.as_ref().map(|_| ".."))
            .field("params", &self.params)
            .finish()
    }
}

/// Two matches are equal when they claim the same route and agree on every
/// parameter that route's template declares. Extra parameters (defaults,
/// query values) and their order do not matter.
impl PartialEq for RouteMatch {
    fn eq(&self, other: &Self) -> bool {
        if self.route.is_none() || self.route != other.route {
            return false;
        }
        if self.params.is_empty() && other.params.is_empty() {
            return true;
        }
        self.param_names()
            .iter()
            .all(|name| self.params.get_str(name) == other.params.get_str(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params_map;
    use slotmap::KeyData;

    fn route(n: u64) -> RouteId {
        RouteId::from(KeyData::from_ffi(n))
    }

    fn matched(id: RouteId, params: ParamsMap) -> RouteMatch {
        RouteMatch {
            route: Some(id),
            handler: None,
            params,
            param_names: Some(Rc::from(vec!["x".to_string()])),
        }
    }

    #[test]
    fn equal_when_declared_params_agree() {
        let r = route(1);
        let a = matched(r, params_map! { "x" => "1", "extra" => "a" });
        let b = matched(r, params_map! { "extra" => "b", "x" => "1" });
        assert_eq!(a, b);
        assert_ne!(a, matched(r, params_map! { "x" => "2" }));
    }

    #[test]
    fn unequal_across_routes() {
        let a = matched(route(1), params_map! { "x" => "1" });
        let b = matched(route(2), params_map! { "x" => "1" });
        assert_ne!(a, b);
        assert_ne!(RouteMatch::new(), RouteMatch::new());
    }
}
