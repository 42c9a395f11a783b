//! In-memory collaborators for unit tests.

use crate::dom::{Document, DomEvent, ElementHandle, ElementKind};
use crate::geometry::Rect;
use crate::surface::{HostWindow, Screen, Surface};
use crate::{Error, Result};
use async_trait::async_trait;
use fanout_input::{Clipboard, InputBackend, KeySequence, Point};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) struct FakeElement {
    pub id: u64,
    pub kind: ElementKind,
    pub rect: Option<Rect>,
    matches: Vec<String>,
    hidden_for: usize,
    value: String,
    text: String,
    setter_stores: Option<String>,
    insert_works: bool,
    disabled_checks: usize,
    has_bridge: bool,
}

impl FakeElement {
    fn new(id: u64, kind: ElementKind) -> Self {
        Self {
            id,
            kind,
            rect: Some(Rect::new(10.0, 500.0, 600.0, 40.0)),
            matches: Vec::new(),
            hidden_for: 0,
            value: String::new(),
            text: String::new(),
            setter_stores: None,
            insert_works: true,
            disabled_checks: 0,
            has_bridge: true,
        }
    }

    pub fn plain(id: u64) -> Self {
        Self::new(id, ElementKind::PlainField)
    }

    pub fn rich(id: u64) -> Self {
        Self::new(id, ElementKind::RichEditable)
    }

    pub fn button(id: u64) -> Self {
        Self::new(id, ElementKind::Other)
    }

    pub fn matching(mut self, selectors: &[&str]) -> Self {
        self.matches = selectors.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn at(mut self, rect: Option<Rect>) -> Self {
        self.rect = rect;
        self
    }

    /// Miss the first `n` queries, as if the page had not rendered it yet.
    pub fn hidden_for(mut self, n: usize) -> Self {
        self.hidden_for = n;
        self
    }

    /// The native setter stores this instead of what it was given.
    pub fn setter_stores(mut self, v: &str) -> Self {
        self.setter_stores = Some(v.to_string());
        self
    }

    /// The insert-text command reports success but changes nothing.
    pub fn broken_insert_command(mut self) -> Self {
        self.insert_works = false;
        self
    }

    /// Report disabled for the first `n` checks.
    pub fn disabled_for(mut self, n: usize) -> Self {
        self.disabled_checks = n;
        self
    }

    pub fn without_bridge(mut self) -> Self {
        self.has_bridge = false;
        self
    }

    fn handle(&self) -> ElementHandle {
        ElementHandle {
            id: self.id,
            kind: self.kind,
            rect: self.rect,
        }
    }
}

/// Operations recorded by [`FakeDocument`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    Focus(u64),
    Escape,
    Clear(u64),
    SetNative(u64, String),
    Events(u64, Vec<DomEvent>),
    Bridge(u64, String),
    ResetRich(u64),
    Insert(u64, String),
    Replace(u64, String),
    Activate(u64),
}

#[derive(Default)]
struct DocState {
    elements: Vec<FakeElement>,
    failing: Vec<String>,
    queries: Vec<String>,
    ops: Vec<Op>,
}

#[derive(Default)]
pub(crate) struct FakeDocument {
    state: Mutex<DocState>,
}

impl FakeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, el: FakeElement) -> Self {
        self.state.lock().unwrap().elements.push(el);
        self
    }

    /// Queries for this selector fail as if it were malformed.
    pub fn failing_selector(self, selector: &str) -> Self {
        self.state.lock().unwrap().failing.push(selector.to_string());
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn value_of(&self, id: u64) -> String {
        self.with_element(id, |e| e.value.clone())
    }

    pub fn text_of(&self, id: u64) -> String {
        self.with_element(id, |e| e.text.clone())
    }

    pub fn activations(&self, id: u64) -> usize {
        self.ops()
            .iter()
            .filter(|op| **op == Op::Activate(id))
            .count()
    }

    fn with_element<T>(&self, id: u64, f: impl FnOnce(&mut FakeElement) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        let el = state
            .elements
            .iter_mut()
            .find(|e| e.id == id)
            .expect("unknown fake element");
        f(el)
    }

    fn record(&self, op: Op) {
        self.state.lock().unwrap().ops.push(op);
    }
}

#[async_trait]
impl Document for FakeDocument {
    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(selector.to_string());
        if state.failing.iter().any(|s| s == selector) {
            return Err(Error::Script(format!("bad selector {}", selector)));
        }
        let Some(el) = state
            .elements
            .iter_mut()
            .find(|e| e.matches.iter().any(|m| m == selector))
        else {
            return Ok(None);
        };
        if el.hidden_for > 0 {
            el.hidden_for -= 1;
            return Ok(None);
        }
        Ok(Some(el.handle()))
    }

    async fn focus(&self, el: &ElementHandle) -> Result<()> {
        self.record(Op::Focus(el.id));
        Ok(())
    }

    async fn send_escape(&self) -> Result<()> {
        self.record(Op::Escape);
        Ok(())
    }

    async fn clear_value(&self, el: &ElementHandle) -> Result<()> {
        self.record(Op::Clear(el.id));
        self.with_element(el.id, |e| e.value.clear());
        Ok(())
    }

    async fn set_value_native(&self, el: &ElementHandle, value: &str) -> Result<String> {
        self.record(Op::SetNative(el.id, value.to_string()));
        Ok(self.with_element(el.id, |e| {
            e.value = e.setter_stores.clone().unwrap_or_else(|| value.to_string());
            e.value.clone()
        }))
    }

    async fn value(&self, el: &ElementHandle) -> Result<String> {
        Ok(self.value_of(el.id))
    }

    async fn dispatch_events(&self, el: &ElementHandle, events: &[DomEvent]) -> Result<()> {
        self.record(Op::Events(el.id, events.to_vec()));
        Ok(())
    }

    async fn bridge_framework_change(&self, el: &ElementHandle, value: &str) -> Result<bool> {
        self.record(Op::Bridge(el.id, value.to_string()));
        Ok(self.with_element(el.id, |e| {
            if e.has_bridge {
                e.value = value.to_string();
            }
            e.has_bridge
        }))
    }

    async fn reset_rich_content(&self, el: &ElementHandle) -> Result<()> {
        self.record(Op::ResetRich(el.id));
        self.with_element(el.id, |e| e.text.clear());
        Ok(())
    }

    async fn insert_text_command(&self, el: &ElementHandle, text: &str) -> Result<bool> {
        self.record(Op::Insert(el.id, text.to_string()));
        self.with_element(el.id, |e| {
            if e.insert_works {
                e.text.push_str(text);
            }
        });
        Ok(true)
    }

    async fn replace_markup(&self, el: &ElementHandle, text: &str) -> Result<()> {
        self.record(Op::Replace(el.id, text.to_string()));
        self.with_element(el.id, |e| e.text = text.to_string());
        Ok(())
    }

    async fn text_content(&self, el: &ElementHandle) -> Result<String> {
        Ok(self.text_of(el.id))
    }

    async fn is_disabled(&self, el: &ElementHandle) -> Result<bool> {
        Ok(self.with_element(el.id, |e| {
            if e.disabled_checks > 0 {
                e.disabled_checks -= 1;
                true
            } else {
                false
            }
        }))
    }

    async fn activate(&self, el: &ElementHandle) -> Result<()> {
        self.record(Op::Activate(el.id));
        Ok(())
    }
}

/// Surface with fixed bounds over a shared [`FakeDocument`].
pub(crate) struct FakeSurface {
    pub bounds: Option<Rect>,
    pub doc: Arc<FakeDocument>,
}

impl FakeSurface {
    pub fn new(doc: Arc<FakeDocument>) -> Self {
        Self {
            bounds: Some(Rect::new(0.0, 0.0, 640.0, 800.0)),
            doc,
        }
    }

    pub fn at(mut self, bounds: Option<Rect>) -> Self {
        self.bounds = bounds;
        self
    }
}

#[async_trait]
impl Surface for FakeSurface {
    async fn bounds(&self) -> Result<Rect> {
        self.bounds
            .ok_or_else(|| Error::Script("surface has no bounds".into()))
    }

    fn document(&self) -> &dyn Document {
        self.doc.as_ref()
    }
}

/// Something the recording backend observed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Input {
    Move(Point),
    Click,
    Type(String),
    Keys(String),
    Clipboard(String),
}

/// Input backend and clipboard that record everything and detect overlap.
#[derive(Default)]
pub(crate) struct RecordingInput {
    log: Mutex<Vec<Input>>,
    position: Mutex<Point>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    fail_clicks: AtomicBool,
}

impl RecordingInput {
    pub fn at(position: Point) -> Self {
        let input = Self::default();
        *input.position.lock().unwrap() = position;
        input
    }

    pub fn log(&self) -> Vec<Input> {
        self.log.lock().unwrap().clone()
    }

    pub fn keys_sent(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|i| match i {
                Input::Keys(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self) -> Point {
        *self.position.lock().unwrap()
    }

    /// Highest number of primitives that were ever in flight at once.
    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn fail_clicks(&self) {
        self.fail_clicks.store(true, Ordering::SeqCst);
    }

    async fn primitive(&self, entry: Input) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.log.lock().unwrap().push(entry);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl InputBackend for RecordingInput {
    async fn move_pointer(&self, to: Point) -> fanout_input::Result<()> {
        self.primitive(Input::Move(to)).await;
        *self.position.lock().unwrap() = to;
        Ok(())
    }

    async fn click(&self) -> fanout_input::Result<()> {
        if self.fail_clicks.load(Ordering::SeqCst) {
            return Err(fanout_input::Error::Input("click rejected".into()));
        }
        self.primitive(Input::Click).await;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> fanout_input::Result<()> {
        self.primitive(Input::Type(text.to_string())).await;
        Ok(())
    }

    async fn send_keys(&self, keys: &KeySequence) -> fanout_input::Result<()> {
        self.primitive(Input::Keys(keys.to_string())).await;
        Ok(())
    }

    async fn pointer_position(&self) -> fanout_input::Result<Point> {
        Ok(self.position())
    }
}

#[async_trait]
impl Clipboard for RecordingInput {
    async fn write_text(&self, text: &str) -> fanout_input::Result<()> {
        self.primitive(Input::Clipboard(text.to_string())).await;
        Ok(())
    }
}

/// Display with constant scale and chrome height.
pub(crate) struct FixedScreen {
    pub scale: f64,
    pub chrome: f64,
}

#[async_trait]
impl Screen for FixedScreen {
    async fn scale_factor_nearest(&self, _x: f64, _y: f64) -> Result<f64> {
        Ok(self.scale)
    }

    async fn chrome_height(&self) -> Result<f64> {
        Ok(self.chrome)
    }
}

/// Display whose queries always fail.
pub(crate) struct BrokenScreen;

#[async_trait]
impl Screen for BrokenScreen {
    async fn scale_factor_nearest(&self, _x: f64, _y: f64) -> Result<f64> {
        Err(Error::Script("no display".into()))
    }

    async fn chrome_height(&self) -> Result<f64> {
        Err(Error::Script("no display".into()))
    }
}

#[derive(Default)]
pub(crate) struct FakeHost {
    pub minimized: AtomicBool,
    pub restores: AtomicUsize,
    pub focuses: AtomicUsize,
}

#[async_trait]
impl HostWindow for FakeHost {
    async fn is_minimized(&self) -> Result<bool> {
        Ok(self.minimized.load(Ordering::SeqCst))
    }

    async fn restore(&self) -> Result<()> {
        self.minimized.store(false, Ordering::SeqCst);
        self.restores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn focus(&self) -> Result<()> {
        self.focuses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
