use super::{ClickEvent, PopStateEvent, State, Window};
use js_sys::{Reflect, JSON};
use regex::Regex;
use std::sync::LazyLock;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Event, HtmlAnchorElement, MouseEvent};

/// Browsers that report `pushState` support but whose implementation is
/// unusable: iOS before 5 and home-screen web apps.
static BROKEN_HISTORY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"((iPod|iPhone|iPad).+\bOS\s+[1-4]|WebApps/.+CFNetwork)")
        .inspect_err(|e| tracing::error!("{e}"))
        .ok()
});

/// The real browser window, via `web-sys`.
#[derive(Debug, Clone)]
pub struct BrowserWindow {
    window: web_sys::Window,
}

impl BrowserWindow {
    /// Returns `None` outside a browser main thread.
    pub fn new() -> Option<Self> {
        web_sys::window().map(|window| Self { window })
    }

    fn history(&self) -> Option<web_sys::History> {
        self.window
            .history()
            .inspect_err(|e| tracing::error!("no history object: {e:?}"))
            .ok()
    }

    fn listen(&self, event: &str, listener: Box<dyn FnMut(Event)>) {
        let closure = Closure::wrap(listener).into_js_value();
        if let Err(e) = self
            .window
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        {
            tracing::error!("couldn't add `{event}` listener to `window`: {e:?}");
        }
    }
}

fn state_to_js(state: Option<&State>) -> JsValue {
    let Some(value) = state.and_then(State::value) else {
        return JsValue::NULL;
    };
    serde_json::to_string(value)
        .ok()
        .and_then(|json| JSON::parse(&json).ok())
        .unwrap_or(JsValue::NULL)
}

fn state_from_js(value: JsValue) -> Option<State> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    let json = String::from(JSON::stringify(&value).ok()?);
    serde_json::from_str(&json)
        .inspect_err(|e| tracing::debug!("ignoring non-JSON history state: {e}"))
        .ok()
        .map(State::from)
}

fn click_event(ev: &MouseEvent) -> ClickEvent {
    let path = ev.composed_path();
    let anchor = (0..path.length()).find_map(|i| path.get(i).dyn_into::<HtmlAnchorElement>().ok());
    let mut click = ClickEvent {
        button: ev.button(),
        modifier: ev.meta_key() || ev.alt_key() || ev.ctrl_key() || ev.shift_key(),
        ..Default::default()
    };
    if let Some(a) = anchor {
        let href = a.href();
        let target = a.target();
        click.href = (!href.is_empty()).then_some(href);
        click.target = (!target.is_empty()).then_some(target);
        click.download = a.has_attribute("download");
        click.external = a
            .get_attribute("rel")
            .unwrap_or_default()
            .split([' ', '\t'])
            .any(|p| p == "external");
    }
    click
}

impl Window for BrowserWindow {
    fn supports_history(&self) -> bool {
        let Some(history) = self.history() else {
            return false;
        };
        let has = |name: &str| {
            Reflect::has(&history, &JsValue::from_str(name)).unwrap_or(false)
        };
        if !has("pushState") || !has("replaceState") {
            return false;
        }
        let agent = self.window.navigator().user_agent().unwrap_or_default();
        !BROKEN_HISTORY
            .as_ref()
            .is_some_and(|re| re.is_match(&agent))
    }

    fn href(&self) -> String {
        self.window
            .location()
            .href()
            .inspect_err(|e| tracing::error!("couldn't read location: {e:?}"))
            .unwrap_or_default()
    }

    fn set_location(&self, url: &str) {
        if let Err(e) = self.window.location().set_href(url) {
            tracing::error!("couldn't navigate to {url:?}: {e:?}");
        }
    }

    fn push_state(&self, state: Option<&State>, url: &str) {
        if let Some(history) = self.history() {
            if let Err(e) = history.push_state_with_url(&state_to_js(state), "", Some(url)) {
                tracing::error!("pushState failed: {e:?}");
            }
        }
    }

    fn replace_state(&self, state: Option<&State>, url: &str) {
        if let Some(history) = self.history() {
            if let Err(e) = history.replace_state_with_url(&state_to_js(state), "", Some(url)) {
                tracing::error!("replaceState failed: {e:?}");
            }
        }
    }

    fn on_pop_state(&self, listener: Box<dyn Fn(&PopStateEvent)>) {
        self.listen(
            "popstate",
            Box::new(move |ev: Event| {
                let state = ev
                    .dyn_ref::<web_sys::PopStateEvent>()
                    .and_then(|ev| state_from_js(ev.state()));
                listener(&PopStateEvent { state });
            }),
        );
    }

    fn on_click(&self, listener: Box<dyn Fn(&ClickEvent)>) {
        self.listen(
            "click",
            Box::new(move |ev: Event| {
                let Some(mouse) = ev.dyn_ref::<MouseEvent>() else {
                    return;
                };
                if mouse.default_prevented() {
                    return;
                }
                let click = click_event(mouse);
                if click.href.is_none() {
                    return;
                }
                listener(&click);
                if click.default_prevented() {
                    ev.prevent_default();
                }
            }),
        );
    }

    fn defer(&self, task: Box<dyn FnOnce()>) {
        let callback = Closure::once_into_js(move || task());
        if let Err(e) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0)
        {
            tracing::error!("couldn't schedule task: {e:?}");
        }
    }
}
