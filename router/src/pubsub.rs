//! Minimal synchronous publish/subscribe channels.
//!
//! Each route owns a [`Topic`] of [`RouteMatched`] events and the navigation
//! controller owns a [`Topic`] of [`RouteChanged`] events. Subscribers are
//! notified in subscription order.

use crate::{params::ParamsMap, routes::RouteId};
use std::rc::Rc;

/// Identifies one subscription within a [`Topic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub(crate) type Listener<E> = Rc<dyn Fn(&E)>;

pub struct Topic<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> Default for Topic<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<E> std::fmt::Debug for Topic<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> Topic<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Rc::new(listener)));
        id
    }

    /// Returns `false` if the subscription was not found.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn publish(&self, event: &E) {
        for (_, listener) in &self.listeners {
            listener(event);
        }
    }

    /// Clones the current listeners, so they can be called after whatever
    /// owns the topic has been released.
    pub(crate) fn snapshot(&self) -> Vec<Listener<E>> {
        self.listeners.iter().map(|(_, l)| Rc::clone(l)).collect()
    }
}

/// Published on a route's own topic when it becomes the active route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatched {
    pub route: RouteId,
    pub params: ParamsMap,
}

/// Published on the controller's topic whenever the active route changes.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteChanged {
    pub router: crate::routes::RouterId,
    pub route: RouteId,
    pub params: ParamsMap,
}
