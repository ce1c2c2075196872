use super::{ClickEvent, PopStateEvent, State, Url, Window};
use std::{cell::RefCell, collections::VecDeque, fmt, rc::Rc};

/// One entry of a [`MemoryWindow`]'s history stack.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: String,
    pub state: Option<State>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<HistoryEntry>,
    index: usize,
    supports_history: bool,
    assigned: Vec<String>,
    deferred: VecDeque<Box<dyn FnOnce()>>,
    pop_listeners: Vec<Rc<dyn Fn(&PopStateEvent)>>,
    click_listeners: Vec<Rc<dyn Fn(&ClickEvent)>>,
}

/// A [`Window`] kept entirely in memory.
///
/// It keeps a history stack that [`back`](Self::back) and
/// [`forward`](Self::forward) walk (firing `popstate` like a browser does),
/// records every location assignment, and queues deferred tasks until
/// [`run_deferred`](Self::run_deferred) is called. Clones share state.
#[derive(Clone)]
pub struct MemoryWindow {
    inner: Rc<RefCell<Inner>>,
}

impl fmt::Debug for MemoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("MemoryWindow")
            .field("entries", &inner.entries)
            .field("index", &inner.index)
            .field("assigned", &inner.assigned)
            .field("deferred", &inner.deferred.len())
            .finish_non_exhaustive()
    }
}

impl MemoryWindow {
    /// Creates a window whose location is `url`, which must be absolute.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_history_support(url, true)
    }

    /// Creates a window without `pushState` support.
    pub fn without_history(url: impl Into<String>) -> Self {
        Self::with_history_support(url, false)
    }

    fn with_history_support(url: impl Into<String>, supports_history: bool) -> Self {
        let inner = Inner {
            entries: vec![HistoryEntry {
                url: url.into(),
                state: None,
            }],
            supports_history,
            ..Default::default()
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// The history stack, oldest first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.inner.borrow().entries.clone()
    }

    /// The position of the current entry in [`entries`](Self::entries).
    pub fn index(&self) -> usize {
        self.inner.borrow().index
    }

    /// Every URL that was assigned to the location, in order.
    pub fn assigned_locations(&self) -> Vec<String> {
        self.inner.borrow().assigned.clone()
    }

    pub fn pending_deferred(&self) -> usize {
        self.inner.borrow().deferred.len()
    }

    /// Runs deferred tasks until the queue is empty, including any tasks
    /// they defer in turn. Returns the number of tasks run.
    pub fn run_deferred(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.inner.borrow_mut().deferred.pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Moves one entry back, firing `popstate`. Returns `false` at the start
    /// of the history.
    pub fn back(&self) -> bool {
        self.go(-1)
    }

    /// Moves one entry forward, firing `popstate`. Returns `false` at the
    /// end of the history.
    pub fn forward(&self) -> bool {
        self.go(1)
    }

    pub fn go(&self, delta: isize) -> bool {
        let state = {
            let mut inner = self.inner.borrow_mut();
            let Some(index) = inner
                .index
                .checked_add_signed(delta)
                .filter(|i| *i < inner.entries.len())
            else {
                return false;
            };
            inner.index = index;
            inner.entries[index].state.clone()
        };
        self.fire_pop_state(PopStateEvent { state });
        true
    }

    /// Fires a `popstate` event without moving through history, as some
    /// browsers do right after a page load.
    pub fn fire_pop_state(&self, event: PopStateEvent) {
        let listeners = self.inner.borrow().pop_listeners.clone();
        for listener in listeners {
            listener(&event);
        }
    }

    /// Dispatches a click on an anchor with the given `href`, resolved
    /// against the current location. Returns the event after dispatch.
    pub fn click(&self, href: &str) -> ClickEvent {
        let href = self.resolve(href);
        self.dispatch_click(ClickEvent::on_anchor(href))
    }

    pub fn dispatch_click(&self, event: ClickEvent) -> ClickEvent {
        let listeners = self.inner.borrow().click_listeners.clone();
        for listener in listeners {
            listener(&event);
        }
        event
    }

    fn resolve(&self, url: &str) -> String {
        let current = self.href();
        Url::parse_with_base(url, &current)
            .map(|url| url.href().to_string())
            .unwrap_or_else(|_| url.to_string())
    }

    fn push_entry(&self, entry: HistoryEntry) {
        let mut inner = self.inner.borrow_mut();
        let next = inner.index + 1;
        inner.entries.truncate(next);
        inner.entries.push(entry);
        inner.index = next;
    }
}

impl Window for MemoryWindow {
    fn supports_history(&self) -> bool {
        self.inner.borrow().supports_history
    }

    fn href(&self) -> String {
        let inner = self.inner.borrow();
        inner.entries[inner.index].url.clone()
    }

    /// Records the assignment and moves to a fresh entry, the way a full
    /// page load would.
    fn set_location(&self, url: &str) {
        let url = self.resolve(url);
        self.inner.borrow_mut().assigned.push(url.clone());
        self.push_entry(HistoryEntry { url, state: None });
    }

    fn push_state(&self, state: Option<&State>, url: &str) {
        let url = self.resolve(url);
        self.push_entry(HistoryEntry {
            url,
            state: state.cloned(),
        });
    }

    fn replace_state(&self, state: Option<&State>, url: &str) {
        let url = self.resolve(url);
        let mut inner = self.inner.borrow_mut();
        let index = inner.index;
        inner.entries[index] = HistoryEntry {
            url,
            state: state.cloned(),
        };
    }

    fn on_pop_state(&self, listener: Box<dyn Fn(&PopStateEvent)>) {
        self.inner.borrow_mut().pop_listeners.push(Rc::from(listener));
    }

    fn on_click(&self, listener: Box<dyn Fn(&ClickEvent)>) {
        self.inner.borrow_mut().click_listeners.push(Rc::from(listener));
    }

    fn defer(&self, task: Box<dyn FnOnce()>) {
        self.inner.borrow_mut().deferred.push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn walks_history_and_fires_pop() {
        let window = MemoryWindow::new("https://example.com/");
        let pops = Rc::new(Cell::new(0));
        {
            let pops = Rc::clone(&pops);
            window.on_pop_state(Box::new(move |_| pops.set(pops.get() + 1)));
        }
        window.push_state(None, "/a");
        window.push_state(Some(&State::from(serde_json::json!(1))), "/b");
        assert_eq!(window.href(), "https://example.com/b");

        assert!(window.back());
        assert_eq!(window.href(), "https://example.com/a");
        assert!(window.back());
        assert!(!window.back());
        assert!(window.forward());
        assert_eq!(pops.get(), 3);

        // pushing from the middle drops the forward entries
        window.push_state(None, "/c");
        assert_eq!(window.entries().len(), 3);
        assert!(!window.forward());
    }

    #[test]
    fn deferred_tasks_wait_for_flush() {
        let window = MemoryWindow::new("https://example.com/");
        let ran = Rc::new(Cell::new(false));
        {
            let ran = Rc::clone(&ran);
            window.defer(Box::new(move || ran.set(true)));
        }
        assert!(!ran.get());
        assert_eq!(window.run_deferred(), 1);
        assert!(ran.get());
    }

    #[test]
    fn replace_keeps_history_length() {
        let window = MemoryWindow::new("https://example.com/foo");
        window.replace_state(None, "/foo/");
        assert_eq!(window.entries().len(), 1);
        assert_eq!(window.href(), "https://example.com/foo/");
    }
}
