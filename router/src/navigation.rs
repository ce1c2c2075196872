use crate::{location::State, params::ParamsMap};
use futures::{
    channel::oneshot,
    future::{self, LocalBoxFuture},
    FutureExt,
};
use std::{future::Future, future::IntoFuture, rc::Rc};
use thiserror::Error;

/// A route handler: receives the merged parameters and any history state.
pub type Handler = Rc<dyn Fn(&ParamsMap, Option<&State>) -> Outcome>;

/// What a route handler produced.
pub enum Outcome {
    /// The handler finished its work synchronously.
    Done,
    /// The handler's work continues in the given future.
    Pending(LocalBoxFuture<'static, ()>),
}

impl Outcome {
    pub fn pending(fut: impl Future<Output = ()> + 'static) -> Self {
        Outcome::Pending(fut.boxed_local())
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::Done
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Done => f.write_str("Done"),
            Outcome::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// The navigation did not run a route handler: it was a no-op, it was
/// redirected to a full page load, or its deferred handler was dropped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("navigation was cancelled")]
pub struct NavigationCancelled;

/// The result of every navigation entry point.
///
/// Awaiting it yields `Ok(())` once the route handler's work is complete,
/// or `Err(NavigationCancelled)` if no handler ran.
#[must_use = "navigation results can be awaited to chain work after the route handler"]
pub enum Navigation {
    /// The handler ran and completed synchronously.
    Resolved,
    /// The handler is scheduled or still running.
    Pending(LocalBoxFuture<'static, Result<(), NavigationCancelled>>),
    /// No handler ran.
    Cancelled,
}

impl Navigation {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Navigation::Cancelled)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Navigation::Resolved)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Navigation::Pending(_))
    }

    pub(crate) fn from_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Done => Navigation::Resolved,
            Outcome::Pending(fut) => Navigation::Pending(fut.map(Ok).boxed_local()),
        }
    }

    /// A navigation whose handler's outcome arrives through `rx`.
    pub(crate) fn deferred(rx: oneshot::Receiver<Outcome>) -> Self {
        Navigation::Pending(
            async move {
                match rx.await {
                    Ok(Outcome::Done) => Ok(()),
                    Ok(Outcome::Pending(fut)) => {
                        fut.await;
                        Ok(())
                    }
                    // the scheduled task was dropped without running
                    Err(_) => Err(NavigationCancelled),
                }
            }
            .boxed_local(),
        )
    }
}

impl std::fmt::Debug for Navigation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Navigation::Resolved => f.write_str("Resolved"),
            Navigation::Pending(_) => f.write_str("Pending(..)"),
            Navigation::Cancelled => f.write_str("Cancelled"),
        }
    }
}

impl IntoFuture for Navigation {
    type Output = Result<(), NavigationCancelled>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Navigation::Resolved => future::ready(Ok(())).boxed_local(),
            Navigation::Pending(fut) => fut,
            Navigation::Cancelled => future::ready(Err(NavigationCancelled)).boxed_local(),
        }
    }
}

/// Options to consider when navigating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
    /// Leave browser history untouched, e.g. because the browser already
    /// moved to the target entry.
    pub suppress_history: bool,
    /// The state stored with the history entry and passed to the handler.
    pub state: Option<State>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn deferred_navigation_resolves_after_handler_future() {
        let (tx, rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let nav = Navigation::deferred(rx);
        tx.send(Outcome::pending(async move {
            _ = done_rx.await;
        }))
        .unwrap();
        done_tx.send(()).unwrap();
        assert_eq!(block_on(nav.into_future()), Ok(()));
    }

    #[test]
    fn dropped_deferral_cancels() {
        let (tx, rx) = oneshot::channel::<Outcome>();
        drop(tx);
        assert_eq!(block_on(Navigation::deferred(rx).into_future()), Err(NavigationCancelled));
        assert_eq!(block_on(Navigation::Cancelled.into_future()), Err(NavigationCancelled));
        assert_eq!(block_on(Navigation::Resolved.into_future()), Ok(()));
    }
}
