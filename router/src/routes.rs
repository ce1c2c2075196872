//! The route tree.
//!
//! Routers and routes live in arenas owned by a single [`RouteTree`]. A
//! route belongs to exactly one router; a route may own a sub-router, which
//! becomes one more matcher on that route. Cross references are plain
//! handles ([`RouteId`], [`RouterId`]), and the named-route registry is
//! owned by the tree, so every router in it shares the same names.

use crate::{
    error::{RouteError, TemplateError},
    location::State,
    matching::{PathMatcher, RouteMatch},
    navigation::{Handler, Outcome},
    params::{ParamSource, ParamsMap},
    pubsub::{Listener, RouteMatched, SubscriptionId, Topic},
    template::PathTemplate,
};
use slotmap::{new_key_type, SlotMap};
use std::{borrow::Cow, cell::LazyCell, collections::HashMap, fmt, rc::Rc};

new_key_type! {
    /// Handle to a [`Route`] in a [`RouteTree`].
    pub struct RouteId;
    /// Handle to a router (an ordered list of sibling routes) in a [`RouteTree`].
    pub struct RouterId;
}

enum Matcher {
    Template(PathTemplate),
    Subrouter(RouterId),
    Custom(Rc<dyn PathMatcher>),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Template(t) => f.debug_tuple("Template").field(&t.template()).finish(),
            Matcher::Subrouter(r) => f.debug_tuple("Subrouter").field(r).finish(),
            Matcher::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A node in the route tree.
pub struct Route {
    router: RouterId,
    name: Option<String>,
    matchers: Vec<Matcher>,
    /// Index into `matchers` of the most recently added template.
    template: Option<usize>,
    defaults: ParamsMap,
    build_only: bool,
    match_only: bool,
    strict_slash: bool,
    handler: Option<Handler>,
    matched: Topic<RouteMatched>,
}

impl Route {
    fn new(router: RouterId) -> Self {
        Self {
            router,
            name: None,
            matchers: Vec::new(),
            template: None,
            defaults: ParamsMap::new(),
            build_only: false,
            match_only: false,
            strict_slash: false,
            handler: None,
            matched: Topic::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The router this route was registered on.
    pub fn router(&self) -> RouterId {
        self.router
    }

    /// The route's own template, if it has one.
    pub fn own_template(&self) -> Option<&PathTemplate> {
        match self.template.map(|idx| &self.matchers[idx]) {
            Some(Matcher::Template(t)) => Some(t),
            _ => None,
        }
    }

    pub fn defaults(&self) -> &ParamsMap {
        &self.defaults
    }

    pub fn is_build_only(&self) -> bool {
        self.build_only
    }

    pub fn is_match_only(&self) -> bool {
        self.match_only
    }

    pub fn is_strict_slash(&self) -> bool {
        self.strict_slash
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    /// The sub-router created on this route, if any.
    pub fn subrouter(&self) -> Option<RouterId> {
        self.matchers.iter().find_map(|m| match m {
            Matcher::Subrouter(r) => Some(*r),
            _ => None,
        })
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("matchers", &self.matchers)
            .field("defaults", &self.defaults)
            .field("build_only", &self.build_only)
            .field("match_only", &self.match_only)
            .field("strict_slash", &self.strict_slash)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct RouterNode {
    parent: Option<RouteId>,
    routes: Vec<RouteId>,
}

/// A route referenced by name or by handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteRef<'a> {
    Name(Cow<'a, str>),
    Id(RouteId),
}

impl<'a> From<&'a str> for RouteRef<'a> {
    fn from(name: &'a str) -> Self {
        RouteRef::Name(Cow::Borrowed(name))
    }
}

impl<'a> From<&'a String> for RouteRef<'a> {
    fn from(name: &'a String) -> Self {
        RouteRef::Name(Cow::Borrowed(name))
    }
}

impl From<String> for RouteRef<'_> {
    fn from(name: String) -> Self {
        RouteRef::Name(Cow::Owned(name))
    }
}

impl From<RouteId> for RouteRef<'_> {
    fn from(id: RouteId) -> Self {
        RouteRef::Id(id)
    }
}

impl fmt::Display for RouteRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteRef::Name(name) => f.write_str(name),
            RouteRef::Id(id) => write!(f, "{id:?}"),
        }
    }
}

/// Owns every router and route of one application, plus the named-route
/// registry they share.
#[derive(Debug)]
pub struct RouteTree {
    routers: SlotMap<RouterId, RouterNode>,
    routes: SlotMap<RouteId, Route>,
    named: HashMap<String, RouteId>,
    root: RouterId,
}

impl Default for RouteTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTree {
    pub fn new() -> Self {
        let mut routers = SlotMap::with_key();
        let root = routers.insert(RouterNode::default());
        Self {
            routers,
            routes: SlotMap::with_key(),
            named: HashMap::new(),
            root,
        }
    }

    /// The top-level router.
    pub fn root(&self) -> RouterId {
        self.root
    }

    /// Registers a new, empty route at the end of `router`.
    ///
    /// # Panics
    /// Panics if `router` does not belong to this tree.
    pub fn new_route(&mut self, router: RouterId) -> RouteMut<'_> {
        let id = self.routes.insert(Route::new(router));
        self.routers[router].routes.push(id);
        RouteMut { tree: self, id }
    }

    pub fn route(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(id)
    }

    pub fn route_mut(&mut self, id: RouteId) -> Option<RouteMut<'_>> {
        self.routes
            .contains_key(id)
            .then_some(RouteMut { tree: self, id })
    }

    /// The routes registered on `router`, in registration order.
    pub fn routes(&self, router: RouterId) -> &[RouteId] {
        self.routers
            .get(router)
            .map(|node| node.routes.as_slice())
            .unwrap_or_default()
    }

    /// The route owning `router`, or `None` for the root.
    pub fn parent(&self, router: RouterId) -> Option<RouteId> {
        self.routers.get(router).and_then(|node| node.parent)
    }

    pub fn named_routes(&self) -> impl Iterator<Item = (&str, RouteId)> {
        self.named.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Resolves a route by name, or passes a handle through.
    ///
    /// An unknown name is logged and yields `None`.
    pub fn get<'a>(&self, route: impl Into<RouteRef<'a>>) -> Option<RouteId> {
        self.resolve(route.into())
            .inspect_err(|e| tracing::error!("{e}"))
            .ok()
    }

    fn resolve(&self, route: RouteRef<'_>) -> Result<RouteId, RouteError> {
        match route {
            RouteRef::Id(id) if self.routes.contains_key(id) => Ok(id),
            RouteRef::Name(ref name) => self
                .named
                .get(name.as_ref())
                .copied()
                .ok_or_else(|| RouteError::UnknownRoute(route.to_string())),
            other => Err(RouteError::UnknownRoute(other.to_string())),
        }
    }

    /// The route's own template, or the nearest ancestor's.
    pub fn template(&self, route: RouteId) -> Option<&PathTemplate> {
        self.lineage(route).find_map(|(_, r)| r.own_template())
    }

    /// The route's own handler, or the nearest ancestor's.
    pub fn effective_handler(&self, route: RouteId) -> Option<&Handler> {
        self.lineage(route).find_map(|(_, r)| r.handler.as_ref())
    }

    /// The route followed by the routes owning each enclosing router,
    /// innermost first.
    pub fn lineage(&self, route: RouteId) -> impl Iterator<Item = (RouteId, &Route)> + '_ {
        std::iter::successors(self.routes.get(route).map(|r| (route, r)), |(_, r)| {
            let parent = self.parent(r.router)?;
            self.routes.get(parent).map(|p| (parent, p))
        })
    }

    /// Builds the URI of a route from parameter values.
    pub fn uri<'a>(
        &self,
        route: impl Into<RouteRef<'a>>,
        params: &dyn ParamSource,
    ) -> Result<String, RouteError> {
        let id = self.resolve(route.into())?;
        let template = self.template(id).ok_or(RouteError::NoTemplate)?;
        template.uri(params).map_err(|e| {
            tracing::error!("{e}");
            e.into()
        })
    }

    /// Matches a path against the root router.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let mut m = RouteMatch::new();
        self.match_router(self.root, path, &mut m).then_some(m)
    }

    /// Tries each route of `router` in registration order; the first that
    /// matches wins. A failed attempt leaves `m` as it was.
    pub fn match_router(&self, router: RouterId, path: &str, m: &mut RouteMatch) -> bool {
        let Some(node) = self.routers.get(router) else {
            return false;
        };
        for &id in &node.routes {
            let checkpoint = m.clone();
            if self.match_route(id, path, m) {
                return true;
            }
            *m = checkpoint;
        }
        false
    }

    /// Matches a single route: every matcher must match. The innermost
    /// matching route claims `m.route`; parameters are then collected from
    /// each matcher and from the route's defaults, never overwriting values
    /// already present.
    pub fn match_route(&self, id: RouteId, path: &str, m: &mut RouteMatch) -> bool {
        let Some(route) = self.routes.get(id) else {
            return false;
        };
        if route.build_only {
            return false;
        }

        for matcher in &route.matchers {
            let matched = match matcher {
                Matcher::Template(template) => template.is_match(path),
                Matcher::Subrouter(router) => self.match_router(*router, path, m),
                Matcher::Custom(custom) => custom.matches(path),
            };
            if !matched {
                return false;
            }
        }

        if m.route.is_none() {
            m.route = Some(id);
            m.param_names = self.template(id).map(PathTemplate::shared_param_names);
        }
        if m.handler.is_none() {
            m.handler = route.handler.clone();
        }

        for matcher in &route.matchers {
            match matcher {
                Matcher::Template(template) => template.set_match(path, m),
                Matcher::Custom(custom) => custom.set_match(path, m),
                Matcher::Subrouter(_) => {}
            }
        }
        m.params.merge_absent(&route.defaults);
        true
    }

    /// Subscribes to a route's match notifications.
    pub fn subscribe<'a>(
        &mut self,
        route: impl Into<RouteRef<'a>>,
        listener: impl Fn(&RouteMatched) + 'static,
    ) -> Option<SubscriptionId> {
        let id = self.get(route)?;
        Some(self.routes[id].matched.subscribe(listener))
    }

    pub fn unsubscribe(&mut self, route: RouteId, subscription: SubscriptionId) -> bool {
        self.routes
            .get_mut(route)
            .is_some_and(|r| r.matched.unsubscribe(subscription))
    }

    pub(crate) fn match_listeners(&self, route: RouteId) -> Vec<Listener<RouteMatched>> {
        self.routes
            .get(route)
            .map(|r| r.matched.snapshot())
            .unwrap_or_default()
    }
}

/// Configures one route. Obtained from [`RouteTree::new_route`] or
/// [`RouteTree::route_mut`]; the methods chain.
pub struct RouteMut<'a> {
    tree: &'a mut RouteTree,
    id: RouteId,
}

impl RouteMut<'_> {
    pub fn id(&self) -> RouteId {
        self.id
    }

    fn route(&mut self) -> &mut Route {
        &mut self.tree.routes[self.id]
    }

    /// Adds a template matcher that must match the whole path.
    ///
    /// The template is relative to the nearest existing template on this
    /// route or its ancestors: `/222` under `/111/` becomes `/111/222`.
    pub fn path(self, template: &str) -> Result<Self, RouteError> {
        self.add_template(template, false)
    }

    /// Like [`path`](Self::path), but only a prefix of the path has to match.
    /// Used for routes owning a sub-router.
    pub fn path_prefix(self, template: &str) -> Result<Self, RouteError> {
        self.add_template(template, true)
    }

    fn add_template(mut self, template: &str, prefix: bool) -> Result<Self, RouteError> {
        if !template.starts_with('/') {
            tracing::error!("path must start with a slash, got {template:?}");
            return Err(TemplateError::MissingLeadingSlash(template.to_owned()).into());
        }
        let full = match self.tree.template(self.id) {
            Some(base) => {
                let base = base.template();
                format!("{}{template}", base.strip_suffix('/').unwrap_or(base))
            }
            None => template.to_owned(),
        };
        let compiled = PathTemplate::compile(&full, prefix).inspect_err(|e| {
            tracing::error!("{e}");
        })?;

        let route = self.route();
        route.matchers.push(Matcher::Template(compiled));
        route.template = Some(route.matchers.len() - 1);
        Ok(self)
    }

    /// Names the route and registers it with the tree. A route can only be
    /// named once, and names are unique across the tree.
    pub fn name(mut self, name: impl Into<String>) -> Result<Self, RouteError> {
        let name = name.into();
        if let Some(existing) = self.route().name.clone() {
            if existing == name {
                return Ok(self);
            }
            let err = RouteError::AlreadyNamed {
                existing,
                requested: name,
            };
            tracing::error!("{err}");
            return Err(err);
        }
        if self.tree.named.contains_key(&name) {
            let err = RouteError::DuplicateName(name);
            tracing::error!("{err}");
            return Err(err);
        }

        self.tree.named.insert(name.clone(), self.id);
        self.route().name = Some(name);
        Ok(self)
    }

    /// Sets the default parameters: added to a match for every key it did
    /// not parse from the path.
    pub fn params<K, V>(mut self, defaults: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Cow<'static, str>>,
        V: ToString,
    {
        self.route().defaults = defaults
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        self
    }

    /// A build-only route is only used to generate URIs and never matches.
    pub fn build_only(mut self, build_only: bool) -> Self {
        self.route().build_only = build_only;
        self
    }

    /// A match-only route matches (and notifies) but is not a navigation
    /// target: navigating to it loads its URI instead.
    pub fn match_only(mut self, match_only: bool) -> Self {
        self.route().match_only = match_only;
        self
    }

    /// When set, a location that differs from the route's canonical URI
    /// only by its trailing slash is rewritten to the canonical form.
    pub fn strict_slash(mut self, strict_slash: bool) -> Self {
        self.route().strict_slash = strict_slash;
        self
    }

    pub fn handler<F, O>(mut self, handler: F) -> Self
    where
        F: Fn(&ParamsMap, Option<&State>) -> O + 'static,
        O: Into<Outcome>,
    {
        self.route().handler = Some(Rc::new(
            move |params: &ParamsMap, state: Option<&State>| -> Outcome {
                handler(params, state).into()
            },
        ));
        self
    }

    /// Dispatches to a method on a controller that is built by `provider`
    /// the first time this route runs.
    pub fn controller<C, P, F, O>(self, provider: P, method: F) -> Self
    where
        C: 'static,
        P: FnOnce() -> C + 'static,
        F: Fn(&C, &ParamsMap, Option<&State>) -> O + 'static,
        O: Into<Outcome>,
    {
        let instance: LazyCell<C, Box<dyn FnOnce() -> C>> = LazyCell::new(Box::new(provider));
        self.handler(move |params, state| method(&*instance, params, state))
    }

    /// Adds a custom matcher.
    pub fn matcher(mut self, matcher: impl PathMatcher + 'static) -> Self {
        self.route().matchers.push(Matcher::Custom(Rc::new(matcher)));
        self
    }

    /// Subscribes to this route's match notifications.
    pub fn on_match(mut self, listener: impl Fn(&RouteMatched) + 'static) -> Self {
        self.route().matched.subscribe(listener);
        self
    }

    /// Creates a sub-router on this route. Its routes are only tried once
    /// this route's own matchers have matched.
    pub fn subrouter(self) -> RouterId {
        let router = self.tree.routers.insert(RouterNode {
            parent: Some(self.id),
            routes: Vec::new(),
        });
        self.tree.routes[self.id]
            .matchers
            .push(Matcher::Subrouter(router));
        router
    }
}
