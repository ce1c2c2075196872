//! The navigation controller.
//!
//! A [`Navigator`] owns a [`RouteTree`] and a [`Window`]. Once
//! [installed](Navigator::install) it routes anchor clicks and history
//! traversal through the tree, keeps browser history in step with the
//! active route, and runs route handlers.

use crate::{
    error::RouteError,
    location::{ClickEvent, PopStateEvent, State, Url, Window},
    matching::RouteMatch,
    navigation::{NavigateOptions, Navigation, Outcome},
    options::RouterOptions,
    params::{ParamSource, ParamsMap},
    pubsub::{RouteChanged, RouteMatched, SubscriptionId, Topic},
    routes::{RouteId, RouteRef, RouteTree},
};
use futures::channel::oneshot;
use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::{Rc, Weak},
};
use tracing::instrument;

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Uninstalled,
    /// Installed on a window without usable history support. History is
    /// never written and URI navigation becomes a full page load.
    Disabled,
    Enabled,
}

#[derive(Debug, Default)]
struct NavState {
    status: Status,
    current: Option<RouteMatch>,
    /// The location at install time, while the install epoch is open.
    install_epoch: Option<String>,
}

struct Inner<W> {
    tree: RefCell<RouteTree>,
    window: W,
    options: RouterOptions,
    nav: RefCell<NavState>,
    changed: RefCell<Topic<RouteChanged>>,
}

/// Drives navigation for one route tree in one window.
///
/// Cloning is cheap; clones share the same state.
pub struct Navigator<W: Window> {
    inner: Rc<Inner<W>>,
}

impl<W: Window> Clone for Navigator<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<W: Window> fmt::Debug for Navigator<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("options", &self.inner.options)
            .field("nav", &self.inner.nav)
            .finish_non_exhaustive()
    }
}

/// Path, query and fragment of `url`, as written to history.
fn location_of(url: &Url) -> String {
    let mut location = url.path().to_string();
    if !url.search().is_empty() {
        location.push('?');
        location.push_str(url.search());
    }
    location.push_str(url.hash());
    location
}

impl<W: Window> Navigator<W> {
    pub fn new(tree: RouteTree, window: W, options: RouterOptions) -> Self {
        Self {
            inner: Rc::new(Inner {
                tree: RefCell::new(tree),
                window,
                options,
                nav: RefCell::new(NavState::default()),
                changed: RefCell::new(Topic::new()),
            }),
        }
    }

    fn from_weak(weak: &Weak<Inner<W>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// The route tree.
    ///
    /// # Panics
    /// Panics if the tree is mutably borrowed, e.g. from within
    /// [`tree_mut`](Self::tree_mut).
    pub fn tree(&self) -> Ref<'_, RouteTree> {
        self.inner.tree.borrow()
    }

    /// The route tree, for adding routes after construction.
    ///
    /// # Panics
    /// Panics if the tree is already borrowed.
    pub fn tree_mut(&self) -> RefMut<'_, RouteTree> {
        self.inner.tree.borrow_mut()
    }

    pub fn window(&self) -> &W {
        &self.inner.window
    }

    pub fn options(&self) -> &RouterOptions {
        &self.inner.options
    }

    pub fn status(&self) -> Status {
        self.inner.nav.borrow().status
    }

    pub fn is_enabled(&self) -> bool {
        self.status() == Status::Enabled
    }

    /// The match of the route the controller last navigated to.
    pub fn current_match(&self) -> Option<RouteMatch> {
        self.inner.nav.borrow().current.clone()
    }

    /// Subscribes to changes of the active route.
    pub fn on_route_change(&self, listener: impl Fn(&RouteChanged) + 'static) -> SubscriptionId {
        self.inner.changed.borrow_mut().subscribe(listener)
    }

    pub fn off_route_change(&self, subscription: SubscriptionId) -> bool {
        self.inner.changed.borrow_mut().unsubscribe(subscription)
    }

    /// Subscribes to one route's match notifications.
    pub fn subscribe<'a>(
        &self,
        route: impl Into<RouteRef<'a>>,
        listener: impl Fn(&RouteMatched) + 'static,
    ) -> Option<SubscriptionId> {
        self.tree_mut().subscribe(route, listener)
    }

    /// Installs the controller on its window.
    ///
    /// Runs the route matching the current location, without adding a
    /// history entry for it. With history support it also starts listening
    /// for `popstate` and `click`; without, the controller stays disabled:
    /// it never writes history and `go_to_uri` falls back to page loads.
    pub fn install(&self) -> Navigation {
        let window = &self.inner.window;
        {
            let mut nav = self.inner.nav.borrow_mut();
            if nav.status != Status::Uninstalled {
                tracing::warn!("router is already installed");
                return Navigation::Cancelled;
            }
            nav.status = if window.supports_history() {
                Status::Enabled
            } else {
                Status::Disabled
            };
        }
        if !self.is_enabled() {
            tracing::info!("history API unavailable, router disabled");
            return self.initial_navigation();
        }

        let weak = Rc::downgrade(&self.inner);
        window.on_pop_state(Box::new(move |ev| {
            if let Some(nav) = Self::from_weak(&weak) {
                _ = nav.on_pop_state(ev);
            }
        }));
        let weak = Rc::downgrade(&self.inner);
        window.on_click(Box::new(move |ev| {
            if let Some(nav) = Self::from_weak(&weak) {
                nav.on_click(ev);
            }
        }));

        let result = self.initial_navigation();
        self.inner.nav.borrow_mut().install_epoch = Some(window.href());
        result
    }

    fn initial_navigation(&self) -> Navigation {
        let href = self.inner.window.href();
        let url = match Url::parse(&href) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("couldn't parse location {href:?}: {e}");
                return Navigation::Cancelled;
            }
        };
        let Some(m) = self.tree().match_path(url.path()) else {
            tracing::info!("no route matches initial location {href:?}");
            return Navigation::Cancelled;
        };
        let Some(route) = m.route else {
            return Navigation::Cancelled;
        };

        let match_only = self
            .tree()
            .route(route)
            .is_some_and(|r| r.is_match_only());
        if match_only {
            tracing::debug!("initial route is match-only, notifying only");
            self.notify(route, &m.params);
            return Navigation::Cancelled;
        }

        match self.canonical_location(route, &m.params, &url) {
            Some(canonical) => self.execute(
                m,
                NavigateOptions {
                    replace: true,
                    ..Default::default()
                },
                Some(canonical),
            ),
            None => self.execute(
                m,
                NavigateOptions {
                    suppress_history: true,
                    ..Default::default()
                },
                None,
            ),
        }
    }

    /// The canonical location for `url` if `route` is strict about
    /// trailing slashes and `url` differs from its URI only by one.
    fn canonical_location(&self, route: RouteId, params: &ParamsMap, url: &Url) -> Option<String> {
        let tree = self.tree();
        if !tree.route(route)?.is_strict_slash() {
            return None;
        }
        let canonical = tree.uri(route, params).ok()?;
        let path = url.path();
        if canonical == path || canonical.trim_end_matches('/') != path.trim_end_matches('/') {
            return None;
        }
        let mut location = Url::parse_with_base(&canonical, url.href())
            .map(|u| u.path().to_string())
            .unwrap_or(canonical);
        if !url.search().is_empty() {
            location.push('?');
            location.push_str(url.search());
        }
        location.push_str(url.hash());
        Some(location)
    }

    /// Navigates to `uri`, resolved against the current location.
    pub fn go_to_uri(&self, uri: &str) -> Navigation {
        self.go_to_uri_with(uri, NavigateOptions::default())
    }

    /// Navigates to `uri` on the client if the router is enabled, the target
    /// is on this origin and a route matches it. Otherwise the window is
    /// sent to `uri`, unless it is already there.
    #[instrument(level = "trace", skip_all, fields(uri = %uri))]
    pub fn go_to_uri_with(&self, uri: &str, options: NavigateOptions) -> Navigation {
        let href = self.inner.window.href();
        let (current, target) = match (Url::parse(&href), Url::parse_with_base(uri, &href)) {
            (Ok(current), Ok(target)) => (current, target),
            (_, Err(e)) | (Err(e), _) => {
                tracing::error!("couldn't resolve {uri:?} against {href:?}: {e}");
                return self.on_route_not_found(uri);
            }
        };

        if self.is_enabled() && target.same_origin(&current) {
            let matched = self.tree().match_path(target.path());
            if let Some(m) = matched {
                return self.execute(m, options, Some(location_of(&target)));
            }
        }
        if target.href() == current.href() {
            tracing::debug!("already at {uri:?}");
            return Navigation::Cancelled;
        }
        self.on_route_not_found(target.href())
    }

    /// Navigates to a route, reading the values of its parameters from
    /// `params`.
    pub fn go_to_route<'a>(
        &self,
        route: impl Into<RouteRef<'a>>,
        params: &dyn ParamSource,
        state: Option<State>,
    ) -> Navigation {
        self.go_to_route_with(
            route,
            params,
            NavigateOptions {
                state,
                ..Default::default()
            },
        )
    }

    pub fn go_to_route_with<'a>(
        &self,
        route: impl Into<RouteRef<'a>>,
        params: &dyn ParamSource,
        options: NavigateOptions,
    ) -> Navigation {
        let m = {
            let tree = self.tree();
            let Some(id) = tree.get(route) else {
                return Navigation::Cancelled;
            };
            let template = tree.template(id);
            let names = template.map(|t| t.param_names()).unwrap_or_default();

            let mut m = RouteMatch::new();
            m.params = names
                .iter()
                .filter_map(|name| Some((name.clone(), params.param(name)?)))
                .collect();
            for (_, route) in tree.lineage(id) {
                m.params.merge_absent(route.defaults());
            }
            m.route = Some(id);
            m.handler = tree.effective_handler(id).cloned();
            m.param_names = template.map(|t| t.shared_param_names());
            m
        };
        self.execute(m, options, None)
    }

    /// Runs a match: records it as current, notifies subscribers, writes
    /// history and calls the route's handler.
    pub fn exec_match(&self, m: RouteMatch, options: NavigateOptions) -> Navigation {
        self.execute(m, options, None)
    }

    #[instrument(level = "trace", skip_all)]
    fn execute(
        &self,
        m: RouteMatch,
        options: NavigateOptions,
        location: Option<String>,
    ) -> Navigation {
        let Some(route) = m.route else {
            return Navigation::Cancelled;
        };
        let (build_only, match_only) = match self.tree().route(route) {
            Some(r) => (r.is_build_only(), r.is_match_only()),
            None => return Navigation::Cancelled,
        };

        if build_only {
            let uri = location.or_else(|| self.tree().uri(route, &m.params).ok());
            return match uri {
                Some(uri) => self.on_route_not_found(&uri),
                None => Navigation::Cancelled,
            };
        }
        if self.inner.nav.borrow().current.as_ref() == Some(&m) {
            tracing::info!("already on {route:?}");
            return Navigation::Cancelled;
        }
        if match_only {
            let uri = self.tree().uri(route, &m.params);
            return match uri {
                Ok(uri) => {
                    tracing::info!("{route:?} is match-only, loading {uri:?}");
                    self.inner.window.set_location(&uri);
                    Navigation::Cancelled
                }
                Err(_) => Navigation::Cancelled,
            };
        }

        let write_history = !options.suppress_history && self.is_enabled();
        let location = if write_history {
            match location.map(Ok).unwrap_or_else(|| self.tree().uri(route, &m.params)) {
                Ok(location) => Some(location),
                Err(RouteError::NoTemplate) => {
                    tracing::debug!("{route:?} has no template, leaving history untouched");
                    None
                }
                Err(_) => return Navigation::Cancelled,
            }
        } else {
            None
        };

        tracing::info!("routing to {route:?}");
        {
            let mut nav = self.inner.nav.borrow_mut();
            nav.current = Some(m.clone());
            if write_history {
                nav.install_epoch = None;
            }
        }
        self.notify(route, &m.params);

        let state = options.state;
        if let Some(location) = location {
            if options.replace {
                tracing::debug!("replacing history entry with {location:?}");
                self.inner.window.replace_state(state.as_ref(), &location);
            } else {
                tracing::debug!("pushing history entry {location:?}");
                self.inner.window.push_state(state.as_ref(), &location);
            }
        }

        let Some(handler) = m.handler else {
            return Navigation::Resolved;
        };
        let params = m.params;
        if self.inner.options.defer_handlers {
            let (tx, rx) = oneshot::channel::<Outcome>();
            self.inner.window.defer(Box::new(move || {
                _ = tx.send(handler(&params, state.as_ref()));
            }));
            Navigation::deferred(rx)
        } else {
            Navigation::from_outcome(handler(&params, state.as_ref()))
        }
    }

    fn notify(&self, route: RouteId, params: &ParamsMap) {
        let (root, listeners) = {
            let tree = self.tree();
            (tree.root(), tree.match_listeners(route))
        };
        let matched = RouteMatched {
            route,
            params: params.clone(),
        };
        for listener in listeners {
            listener(&matched);
        }

        let listeners = self.inner.changed.borrow().snapshot();
        let changed = RouteChanged {
            router: root,
            route,
            params: params.clone(),
        };
        for listener in listeners {
            listener(&changed);
        }
    }

    /// Reacts to history traversal: runs the route for the new location
    /// without writing history, unless it is already the current route.
    #[instrument(level = "trace", skip_all)]
    pub fn on_pop_state(&self, event: &PopStateEvent) -> Navigation {
        if !self.is_enabled() {
            return Navigation::Cancelled;
        }
        let href = self.inner.window.href();
        let spurious = self
            .inner
            .nav
            .borrow_mut()
            .install_epoch
            .take()
            .is_some_and(|install| install == href);
        if spurious {
            tracing::info!("ignoring initial popstate");
            return Navigation::Cancelled;
        }

        let url = match Url::parse(&href) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("couldn't parse location {href:?}: {e}");
                return Navigation::Cancelled;
            }
        };
        let matched = self.tree().match_path(url.path());
        let Some(m) = matched else {
            return self.on_route_not_found(&href);
        };
        if self.inner.nav.borrow().current.as_ref() == Some(&m) {
            return Navigation::Cancelled;
        }

        let state = event.state.clone();
        let canonical = m
            .route
            .and_then(|route| self.canonical_location(route, &m.params, &url));
        match canonical {
            Some(canonical) => self.execute(
                m,
                NavigateOptions {
                    replace: true,
                    state,
                    ..Default::default()
                },
                Some(canonical),
            ),
            None => self.execute(
                m,
                NavigateOptions {
                    suppress_history: true,
                    state,
                    ..Default::default()
                },
                None,
            ),
        }
    }

    /// Intercepts a click on an anchor and routes its `href`.
    pub fn on_click(&self, event: &ClickEvent) {
        let Some(href) = event.href.as_deref() else {
            return;
        };
        if self.inner.options.passthrough_modified_clicks && event.is_special() {
            return;
        }
        event.prevent_default();
        _ = self.go_to_uri(href);
    }

    /// Sends the window to `uri` with a full page load.
    pub fn on_route_not_found(&self, uri: &str) -> Navigation {
        tracing::info!("no client-side route for {uri:?}, loading it");
        self.inner.window.set_location(uri);
        Navigation::Cancelled
    }
}
