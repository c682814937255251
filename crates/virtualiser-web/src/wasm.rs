#![forbid(unsafe_code)]

//! `wasm-bindgen` exports for the virtualiser.
//!
//! This module wraps [`super::runner_core::RunnerCore`] with JS-friendly types
//! and implements the host-page traits over `web-sys`. Only compiled on
//! `wasm32` targets.
//!
//! The browser owns the event loop. Three callbacks drive the runner:
//! a `MutationObserver` on `document.body` that notices location changes, an
//! `IntersectionObserver` on the placeholder, and a delegated click listener
//! for the placeholder. Content waits are `setTimeout` chains scheduled from
//! [`PollStatus::Waiting`]; enablement lookups run on `spawn_local`.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use js_sys::{Array, Function, Object, Promise, Reflect};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise, spawn_local};
use web_sys::{
    Document, Element, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit, MutationObserver, MutationObserverInit, ScrollBehavior,
    ScrollIntoViewOptions, ScrollLogicalPosition, Window,
};
use web_time::Instant;

use super::runner_core::RunnerCore;
use virtualiser_core::placeholder::PLACEHOLDER_SELECTOR;
use virtualiser_core::{
    ApplyOutcome, DisablePlan, EnablementStore, HostPage, NavigationEvent, PollStatus,
    ProximitySensor, RevealOutcome, Selector, StorageBackend, StorageError, VirtualiserConfig,
};

/// Delay before retrying a poll that found the runner borrowed.
const BUSY_RETRY_MS: i32 = 50;

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = match info.location() {
                Some(loc) => format!(
                    "[virtualiser] panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                ),
                None => format!("[virtualiser] panic: {info}"),
            };
            console_error(&msg);
        }));
    });
}

fn set_js(obj: &Object, key: &str, value: JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value);
}

fn count_to_js(n: usize) -> JsValue {
    JsValue::from_f64(n as f64)
}

fn apply_outcome_to_js(outcome: ApplyOutcome) -> JsValue {
    let obj = Object::new();
    match outcome {
        ApplyOutcome::WithinBudget { total } => {
            set_js(&obj, "kind", JsValue::from_str("within_budget"));
            set_js(&obj, "total", count_to_js(total));
        }
        ApplyOutcome::Hidden { hidden, kept } => {
            set_js(&obj, "kind", JsValue::from_str("hidden"));
            set_js(&obj, "hidden", count_to_js(hidden));
            set_js(&obj, "kept", count_to_js(kept));
        }
        ApplyOutcome::Reset { revealed } => {
            set_js(&obj, "kind", JsValue::from_str("reset"));
            set_js(&obj, "revealed", count_to_js(revealed));
        }
    }
    obj.into()
}

fn reveal_outcome_to_js(outcome: Option<RevealOutcome>) -> JsValue {
    let Some(outcome) = outcome else {
        return JsValue::NULL;
    };
    let obj = Object::new();
    match outcome {
        RevealOutcome::Busy => set_js(&obj, "kind", JsValue::from_str("busy")),
        RevealOutcome::Exhausted => set_js(&obj, "kind", JsValue::from_str("exhausted")),
        RevealOutcome::Revealed {
            revealed,
            remaining,
        } => {
            set_js(&obj, "kind", JsValue::from_str("revealed"));
            set_js(&obj, "revealed", count_to_js(revealed));
            set_js(&obj, "remaining", count_to_js(remaining));
        }
    }
    obj.into()
}

fn error_to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// ---------------------------------------------------------------------------
// Host page over web-sys
// ---------------------------------------------------------------------------

type IntersectionCallback = Closure<dyn FnMut(Array, IntersectionObserver)>;

/// [`HostPage`] + [`ProximitySensor`] over the live browser document.
pub struct WebPage {
    window: Window,
    document: Document,
    observer: Option<IntersectionObserver>,
    on_intersect: Option<IntersectionCallback>,
}

impl WebPage {
    pub fn new(window: Window, document: Document) -> Self {
        Self {
            window,
            document,
            observer: None,
            on_intersect: None,
        }
    }

    /// Callback handed to every intersection subscription.
    pub fn set_intersection_handler(&mut self, callback: IntersectionCallback) {
        self.on_intersect = Some(callback);
    }

    fn style_display_none(element: &Element) -> bool {
        element
            .dyn_ref::<HtmlElement>()
            .and_then(|html| html.style().get_property_value("display").ok())
            .is_some_and(|display| display == "none")
    }
}

impl HostPage for WebPage {
    type Element = Element;

    fn query_all(&self, selector: Selector) -> Vec<Element> {
        let Ok(list) = self.document.query_selector_all(&selector.to_css()) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn attribute(&self, element: &Element, name: &str) -> Option<String> {
        element.get_attribute(name)
    }

    fn set_attribute(&mut self, element: &Element, name: &str, value: &str) {
        let _ = element.set_attribute(name, value);
    }

    fn remove_attribute(&mut self, element: &Element, name: &str) {
        let _ = element.remove_attribute(name);
    }

    fn set_display_none(&mut self, element: &Element, hidden: bool) {
        let Some(html) = element.dyn_ref::<HtmlElement>() else {
            return;
        };
        let style = html.style();
        if hidden {
            let _ = style.set_property("display", "none");
        } else {
            let _ = style.remove_property("display");
        }
    }

    fn is_connected(&self, element: &Element) -> bool {
        element.is_connected()
    }

    fn measure_height(&mut self, element: &Element) -> Option<f64> {
        if !element.is_connected() {
            return None;
        }
        // Show, read and re-hide within one task: no frame renders between.
        let hidden = Self::style_display_none(element);
        if hidden {
            self.set_display_none(element, false);
        }
        let height = element.get_bounding_client_rect().height();
        if hidden {
            self.set_display_none(element, true);
        }
        Some(height)
    }

    fn viewport_height(&self) -> f64 {
        self.window
            .inner_height()
            .ok()
            .and_then(|h| h.as_f64())
            .unwrap_or(0.0)
    }

    fn scroll_offset(&self) -> f64 {
        self.window.scroll_y().unwrap_or(0.0)
    }

    fn scroll_to(&mut self, offset: f64) {
        self.window.scroll_to_with_x_and_y(0.0, offset);
    }

    fn scroll_bottom_into_view(&mut self, element: &Element) {
        let options = ScrollIntoViewOptions::new();
        options.set_block(ScrollLogicalPosition::End);
        options.set_behavior(ScrollBehavior::Instant);
        element.scroll_into_view_with_scroll_into_view_options(&options);
    }

    fn create_marker(&mut self, class: &str) -> Option<Element> {
        let marker = self.document.create_element("div").ok()?;
        marker.set_class_name(class);
        Some(marker)
    }

    fn set_text(&mut self, element: &Element, text: &str) {
        element.set_text_content(Some(text));
    }

    fn insert_before(&mut self, element: &Element, reference: &Element) -> bool {
        let Some(parent) = reference.parent_node() else {
            return false;
        };
        parent.insert_before(element, Some(reference)).is_ok()
    }

    fn remove(&mut self, element: &Element) {
        element.remove();
    }
}

impl ProximitySensor for WebPage {
    fn watch(&mut self, target: &Element, top_margin_px: f64) {
        self.unwatch();
        let Some(callback) = self.on_intersect.as_ref() else {
            return;
        };
        let init = IntersectionObserverInit::new();
        init.set_root_margin(&format!("{top_margin_px}px 0px 0px 0px"));
        init.set_threshold(&JsValue::from_f64(0.0));
        match IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init) {
            Ok(observer) => {
                observer.observe(target);
                self.observer = Some(observer);
            }
            Err(err) => warn!(
                target: "virtualiser::web",
                error = ?err,
                "failed to create intersection observer"
            ),
        }
    }

    fn unwatch(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
    }
}

// ---------------------------------------------------------------------------
// Durable storage
// ---------------------------------------------------------------------------

/// Storage backend: `chrome.storage.local` inside an extension, otherwise
/// `window.localStorage` with JSON-encoded values.
pub enum WebStorage {
    Extension(Object),
    Local(web_sys::Storage),
    Unavailable,
}

fn js_storage_error(err: JsValue) -> StorageError {
    StorageError::Unavailable(format!("{err:?}"))
}

fn extension_storage() -> Option<Object> {
    let chrome = Reflect::get(&js_sys::global(), &"chrome".into()).ok()?;
    let storage = Reflect::get(&chrome, &"storage".into()).ok()?;
    Reflect::get(&storage, &"local".into())
        .ok()?
        .dyn_into::<Object>()
        .ok()
}

impl WebStorage {
    pub fn detect(window: &Window) -> Self {
        if let Some(local) = extension_storage() {
            return Self::Extension(local);
        }
        match window.local_storage() {
            Ok(Some(storage)) => Self::Local(storage),
            _ => Self::Unavailable,
        }
    }

    fn method(local: &Object, name: &str) -> Result<Function, StorageError> {
        Reflect::get(local, &JsValue::from_str(name))
            .and_then(|value| value.dyn_into::<Function>())
            .map_err(js_storage_error)
    }

    async fn call(local: &Object, name: &str, arg: &JsValue) -> Result<JsValue, StorageError> {
        let promise: Promise = Self::method(local, name)?
            .call1(local, arg)
            .and_then(|value| value.dyn_into::<Promise>())
            .map_err(js_storage_error)?;
        JsFuture::from(promise).await.map_err(js_storage_error)
    }
}

impl StorageBackend for WebStorage {
    async fn load(&self, key: &str) -> Result<Option<Vec<String>>, StorageError> {
        match self {
            Self::Extension(local) => {
                let result = Self::call(local, "get", &JsValue::from_str(key)).await?;
                let value = Reflect::get(&result, &JsValue::from_str(key)).map_err(js_storage_error)?;
                if value.is_undefined() || value.is_null() {
                    return Ok(None);
                }
                if !Array::is_array(&value) {
                    return Err(StorageError::Malformed(format!("{key} is not an array")));
                }
                Array::from(&value)
                    .iter()
                    .map(|v| {
                        v.as_string()
                            .ok_or_else(|| StorageError::Malformed(format!("{key} holds a non-string")))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Some)
            }
            Self::Local(storage) => storage
                .get_item(key)
                .map_err(js_storage_error)?
                .map(|json| {
                    serde_json::from_str::<Vec<String>>(&json)
                        .map_err(|e| StorageError::Malformed(e.to_string()))
                })
                .transpose(),
            Self::Unavailable => Err(StorageError::Unavailable("no storage backend".into())),
        }
    }

    async fn store(&self, key: &str, values: &[String]) -> Result<(), StorageError> {
        match self {
            Self::Extension(local) => {
                let items = Object::new();
                let array: Array = values.iter().map(|v| JsValue::from_str(v)).collect();
                set_js(&items, key, array.into());
                Self::call(local, "set", &items).await.map(|_| ())
            }
            Self::Local(storage) => {
                let json = serde_json::to_string(values)
                    .map_err(|e| StorageError::Malformed(e.to_string()))?;
                storage.set_item(key, &json).map_err(js_storage_error)
            }
            Self::Unavailable => Err(StorageError::Unavailable("no storage backend".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop glue
// ---------------------------------------------------------------------------

struct Shared {
    window: Window,
    runner: RefCell<RunnerCore<WebPage>>,
    store: EnablementStore<WebStorage>,
}

fn check_location(shared: &Rc<Shared>) {
    let location = shared.window.location();
    let (Ok(href), Ok(path)) = (location.href(), location.pathname()) else {
        return;
    };
    let event = {
        let Ok(mut runner) = shared.runner.try_borrow_mut() else {
            return;
        };
        runner.navigate(&href, &path, Instant::now())
    };
    if let NavigationEvent::Started { generation, .. } = event {
        poll_content(shared, generation);
    }
}

fn schedule_poll(shared: &Rc<Shared>, generation: u64, delay_ms: i32) {
    let weak = Rc::downgrade(shared);
    let callback = Closure::once_into_js(move || {
        if let Some(shared) = weak.upgrade() {
            poll_content(&shared, generation);
        }
    });
    if let Err(err) = shared
        .window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay_ms)
    {
        warn!(target: "virtualiser::web", error = ?err, "failed to schedule content poll");
    }
}

fn poll_content(shared: &Rc<Shared>, generation: u64) {
    let status = {
        let Ok(mut runner) = shared.runner.try_borrow_mut() else {
            schedule_poll(shared, generation, BUSY_RETRY_MS);
            return;
        };
        // A newer navigation runs its own poll chain.
        if runner.coordinator().generation() != generation {
            return;
        }
        runner.poll(Instant::now())
    };
    match status {
        PollStatus::Waiting { retry_after } => {
            let delay = i32::try_from(retry_after.as_millis()).unwrap_or(i32::MAX);
            schedule_poll(shared, generation, delay);
        }
        PollStatus::Ready { generation, .. } => {
            spawn_local(resolve_enablement(Rc::clone(shared), generation));
        }
        PollStatus::TimedOut { .. } | PollStatus::Idle => {}
    }
}

// The runner stays loading until `activate` runs, so a busy runner retries
// on the next task instead of dropping the activation.
async fn resolve_enablement(shared: Rc<Shared>, generation: u64) {
    let conversation = match shared.runner.try_borrow() {
        Ok(runner) if runner.generation() != generation => return,
        Ok(runner) => runner
            .coordinator()
            .current_conversation()
            .map(str::to_owned),
        Err(_) => return retry_enablement(&shared, generation),
    };
    let enabled = shared.store.is_enabled(conversation.as_deref()).await;
    let Ok(mut runner) = shared.runner.try_borrow_mut() else {
        return retry_enablement(&shared, generation);
    };
    runner.activate(generation, enabled);
}

fn retry_enablement(shared: &Rc<Shared>, generation: u64) {
    debug!(target: "virtualiser::web", generation, "runner busy; retrying activation");
    let weak = Rc::downgrade(shared);
    let callback = Closure::once_into_js(move || {
        if let Some(shared) = weak.upgrade() {
            spawn_local(resolve_enablement(shared, generation));
        }
    });
    if let Err(err) = shared
        .window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            BUSY_RETRY_MS,
        )
    {
        warn!(target: "virtualiser::web", error = ?err, "failed to schedule activation retry");
    }
}

/// Generation and conversation an enable/disable action starts from.
fn begin_action(shared: &Shared) -> Result<(u64, String), JsValue> {
    let runner = shared
        .runner
        .try_borrow()
        .map_err(|_| JsValue::from_str("virtualiser busy"))?;
    let conversation = runner.conversation().map_err(error_to_js)?;
    Ok((runner.generation(), conversation))
}

// ---------------------------------------------------------------------------
// JS API
// ---------------------------------------------------------------------------

/// Conversation virtualiser bound to the current browser document.
///
/// Host-driven: construct, then call `install()` once. Everything after that
/// is driven by DOM callbacks; the remaining methods are the surface used by
/// UI chrome (toggle button, menu, diagnostics).
#[wasm_bindgen]
pub struct Virtualiser {
    shared: Rc<Shared>,
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

impl Virtualiser {
    fn runner(&self) -> Result<Ref<'_, RunnerCore<WebPage>>, JsValue> {
        self.shared
            .runner
            .try_borrow()
            .map_err(|_| JsValue::from_str("virtualiser busy"))
    }

    fn runner_mut(&self) -> Result<RefMut<'_, RunnerCore<WebPage>>, JsValue> {
        self.shared
            .runner
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("virtualiser busy"))
    }
}

#[wasm_bindgen]
impl Virtualiser {
    /// Create a virtualiser. `config_json` is an optional JSON
    /// `VirtualiserConfig`; omitted fields keep their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<Virtualiser, JsValue> {
        install_panic_hook();
        let config = match config_json.as_deref() {
            Some(json) => VirtualiserConfig::from_json_str(json).map_err(error_to_js)?,
            None => VirtualiserConfig::default(),
        };
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let store = EnablementStore::new(WebStorage::detect(&window));
        let page = WebPage::new(window.clone(), document);
        let shared = Rc::new(Shared {
            window,
            runner: RefCell::new(RunnerCore::new(page, config)),
            store,
        });

        let weak = Rc::downgrade(&shared);
        let on_intersect = IntersectionCallback::new(move |entries: Array, _: IntersectionObserver| {
            let intersecting = entries
                .iter()
                .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                .any(|entry| entry.is_intersecting());
            let Some(shared) = weak.upgrade() else {
                return;
            };
            // Borrowed means a batch is in flight: drop the trigger.
            let Ok(mut runner) = shared.runner.try_borrow_mut() else {
                return;
            };
            runner.on_proximity(intersecting);
        });
        shared
            .runner
            .borrow_mut()
            .page_mut()
            .set_intersection_handler(on_intersect);

        Ok(Self { shared })
    }

    /// Start watching the location and the placeholder, and run the first
    /// content wait for the current page.
    pub fn install(&self) -> Result<(), JsValue> {
        let document = self.shared.window.document().ok_or("no document")?;
        let body = document.body().ok_or("no body")?;

        let weak = Rc::downgrade(&self.shared);
        let on_mutation =
            Closure::<dyn FnMut(Array, MutationObserver)>::new(move |_: Array, _: MutationObserver| {
                if let Some(shared) = weak.upgrade() {
                    check_location(&shared);
                }
            });
        let observer = MutationObserver::new(on_mutation.as_ref().unchecked_ref())?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer.observe_with_options(&body, &init)?;
        on_mutation.forget();

        let weak = Rc::downgrade(&self.shared);
        let marker_css = PLACEHOLDER_SELECTOR.to_css();
        let on_click = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                return;
            };
            if !matches!(target.closest(&marker_css), Ok(Some(_))) {
                return;
            }
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if let Ok(mut runner) = shared.runner.try_borrow_mut() {
                runner.on_placeholder_click();
            }
        });
        document.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        on_click.forget();

        debug!(target: "virtualiser::web", "installed");
        check_location(&self.shared);
        Ok(())
    }

    /// Every turn element, oldest first.
    #[wasm_bindgen(js_name = getMessages)]
    pub fn get_messages(&self) -> Result<Array, JsValue> {
        let runner = self.runner()?;
        Ok(runner
            .messages()
            .into_iter()
            .map(|turn| JsValue::from(turn.element))
            .collect())
    }

    /// Hidden turn elements, oldest first.
    #[wasm_bindgen(js_name = getHiddenMessages)]
    pub fn get_hidden_messages(&self) -> Result<Array, JsValue> {
        let runner = self.runner()?;
        Ok(runner
            .hidden_messages()
            .into_iter()
            .map(|turn| JsValue::from(turn.element))
            .collect())
    }

    pub fn apply(&self) -> Result<JsValue, JsValue> {
        Ok(apply_outcome_to_js(self.runner_mut()?.apply()))
    }

    /// Reveal one batch. `null` when virtualisation is inactive.
    #[wasm_bindgen(js_name = revealBatch)]
    pub fn reveal_batch(&self) -> Result<JsValue, JsValue> {
        Ok(reveal_outcome_to_js(self.runner_mut()?.reveal_batch()))
    }

    /// Reveal every hidden turn. Returns how many were revealed.
    #[wasm_bindgen(js_name = revealAll)]
    pub fn reveal_all(&self) -> Result<u32, JsValue> {
        let revealed = self.runner_mut()?.reveal_all();
        Ok(u32::try_from(revealed).unwrap_or(u32::MAX))
    }

    #[wasm_bindgen(js_name = startObserver)]
    pub fn start_observer(&self) -> Result<(), JsValue> {
        self.runner_mut()?.start_observer();
        Ok(())
    }

    #[wasm_bindgen(js_name = stopObserver)]
    pub fn stop_observer(&self) -> Result<(), JsValue> {
        self.runner_mut()?.stop_observer();
        Ok(())
    }

    /// Whether a content wait is in progress (UI chrome disables its toggle).
    #[wasm_bindgen(js_name = isLoading)]
    pub fn is_loading(&self) -> bool {
        self.runner().is_ok_and(|runner| runner.is_loading())
    }

    /// Resolves to whether the current conversation is enabled.
    #[wasm_bindgen(js_name = isEnabled)]
    pub fn is_enabled(&self) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let conversation = shared
                .runner
                .try_borrow()
                .ok()
                .and_then(|runner| runner.conversation().ok());
            let enabled = shared.store.is_enabled(conversation.as_deref()).await;
            Ok(JsValue::from_bool(enabled))
        })
    }

    /// Persist enablement, then apply and observe. Resolves to the apply
    /// outcome; rejects when there is no conversation or storage fails.
    pub fn enable(&self) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let (generation, conversation) = begin_action(&shared)?;
            shared
                .store
                .enable(&conversation)
                .await
                .map_err(error_to_js)?;
            let outcome = shared
                .runner
                .try_borrow_mut()
                .map_err(|_| JsValue::from_str("virtualiser busy"))?
                .complete_enable(generation)
                .map_err(error_to_js)?;
            Ok(apply_outcome_to_js(outcome))
        })
    }

    /// Number of turns disabling would reveal. Zero means no confirmation
    /// is needed.
    #[wasm_bindgen(js_name = disablePlan)]
    pub fn disable_plan(&self) -> Result<u32, JsValue> {
        Ok(match self.runner()?.plan_disable() {
            DisablePlan::Immediate => 0,
            DisablePlan::NeedsConfirmation { hidden } => u32::try_from(hidden).unwrap_or(u32::MAX),
        })
    }

    /// Persist disablement, then reveal everything and stop observing.
    /// Resolves to the number of turns revealed.
    pub fn disable(&self) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let (generation, conversation) = begin_action(&shared)?;
            shared
                .store
                .disable(&conversation)
                .await
                .map_err(error_to_js)?;
            let revealed = shared
                .runner
                .try_borrow_mut()
                .map_err(|_| JsValue::from_str("virtualiser busy"))?
                .complete_disable(generation)
                .map_err(error_to_js)?;
            Ok(count_to_js(revealed))
        })
    }

    /// Runner state as JSON.
    #[wasm_bindgen(js_name = statusJson)]
    pub fn status_json(&self) -> Result<String, JsValue> {
        Ok(self.runner()?.status_json())
    }
}
