use super::{Document, DomEvent, ElementHandle, ElementKind};
use crate::geometry::Rect;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Something that evaluates JavaScript inside a page.
#[async_trait]
pub trait ScriptContext: Send + Sync {
    /// Evaluate an expression that yields a string and return it.
    async fn eval_string(&self, script: &str) -> Result<String>;
}

/// [`Document`] whose every operation is a script round trip.
///
/// Discovered elements are kept in a page-side table (`window.__fanout`) so
/// later calls address the same node by id. A handle whose node has left the
/// document fails with a "stale element" error.
pub struct ScriptDocument<C> {
    ctx: C,
}

/// Page-side table of discovered elements.
const PRELUDE: &str = r#"const R = (window.__fanout = window.__fanout || { next: 1, els: new Map() });"#;

/// Reply envelope: `{ "ok": <value> }` or `{ "err": "<message>" }`.
#[derive(Deserialize)]
struct Reply {
    ok: Option<Value>,
    err: Option<String>,
}

#[derive(Deserialize)]
struct RawElement {
    id: u64,
    kind: ElementKind,
    rect: Option<Rect>,
}

fn js(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".into())
}

/// Wrap a body that must `return` a JSON-serializable value.
fn wrap(body: &str) -> String {
    format!(
        r#"(() => {{
    {PRELUDE}
    try {{
        const out = (() => {{ {body} }})();
        return JSON.stringify({{ ok: out === undefined ? null : out }});
    }} catch (e) {{
        return JSON.stringify({{ err: String(e && e.message || e) }});
    }}
}})()"#
    )
}

/// Wrap a body that operates on the registered element `el`.
fn wrap_element(id: u64, body: &str) -> String {
    wrap(&format!(
        r#"const el = R.els.get({id});
        if (!el || !el.isConnected) throw new Error('stale element {id}');
        {body}"#
    ))
}

const QUERY_BODY: &str = r#"
        const el = document.querySelector(SELECTOR);
        if (!el) return null;
        if (R.els.size > 64) R.els.clear();
        const id = R.next++;
        R.els.set(id, el);
        const tag = el.tagName;
        const kind = (tag === 'TEXTAREA' || tag === 'INPUT') ? 'plain_field'
            : (el.isContentEditable ? 'rich_editable' : 'other');
        const r = el.getBoundingClientRect();
        const rect = (r.width || r.height)
            ? { left: r.left, top: r.top, width: r.width, height: r.height }
            : null;
        return { id, kind, rect };"#;

const NATIVE_SETTER_BODY: &str = r#"
        const proto = el.tagName === 'TEXTAREA'
            ? HTMLTextAreaElement.prototype
            : HTMLInputElement.prototype;
        Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, VALUE);
        return el.value;"#;

const BRIDGE_BODY: &str = r#"
        const key = Object.keys(el).find(k =>
            k.startsWith('__reactProps') ||
            k.startsWith('__reactFiber') ||
            k.startsWith('__reactInternalInstance'));
        if (!key) return false;
        const inst = el[key];
        const props = key.startsWith('__reactProps') ? inst : (inst && inst.memoizedProps);
        if (!props || typeof props.onChange !== 'function') return false;
        props.onChange({ target: { value: VALUE }, currentTarget: el });
        return true;"#;

const EVENTS_BODY: &str = r#"
        for (const t of EVENTS) {
            const ev = (t === 'keyup' || t === 'keydown')
                ? new KeyboardEvent(t, { bubbles: true, key: 'a' })
                : new Event(t, { bubbles: true });
            el.dispatchEvent(ev);
        }
        return null;"#;

const RESET_RICH_BODY: &str = r#"
        el.innerHTML = '<p><br></p>';
        const p = el.querySelector('p');
        if (p) {
            const range = document.createRange();
            range.setStart(p, 0);
            range.collapse(true);
            const sel = window.getSelection();
            sel.removeAllRanges();
            sel.addRange(range);
        }
        return null;"#;

const ESCAPE_JS: &str = r#"
        document.dispatchEvent(new KeyboardEvent('keydown', {
            key: 'Escape', code: 'Escape', keyCode: 27, bubbles: true
        }));
        return null;"#;

impl<C: ScriptContext> ScriptDocument<C> {
    pub fn new(ctx: C) -> Self {
        Self { ctx }
    }

    /// The underlying script context.
    pub fn context(&self) -> &C {
        &self.ctx
    }

    async fn call<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let raw = self.ctx.eval_string(script).await?;
        let reply: Reply = serde_json::from_str(&raw)?;
        if let Some(err) = reply.err {
            return Err(Error::Script(err));
        }
        Ok(serde_json::from_value(reply.ok.unwrap_or(Value::Null))?)
    }

    async fn on<T: DeserializeOwned>(&self, el: &ElementHandle, body: &str) -> Result<T> {
        self.call(&wrap_element(el.id, body)).await
    }
}

#[async_trait]
impl<C: ScriptContext> Document for ScriptDocument<C> {
    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>> {
        let body = QUERY_BODY.replace("SELECTOR", &js(selector));
        let raw: Option<RawElement> = self.call(&wrap(&body)).await?;
        Ok(raw.map(|r| ElementHandle {
            id: r.id,
            kind: r.kind,
            rect: r.rect,
        }))
    }

    async fn focus(&self, el: &ElementHandle) -> Result<()> {
        self.on(el, "el.focus(); return null;").await
    }

    async fn send_escape(&self) -> Result<()> {
        self.call(&wrap(ESCAPE_JS)).await
    }

    async fn clear_value(&self, el: &ElementHandle) -> Result<()> {
        self.on(el, "el.value = ''; return null;").await
    }

    async fn set_value_native(&self, el: &ElementHandle, value: &str) -> Result<String> {
        self.on(el, &NATIVE_SETTER_BODY.replace("VALUE", &js(value)))
            .await
    }

    async fn value(&self, el: &ElementHandle) -> Result<String> {
        self.on(el, "return el.value == null ? '' : String(el.value);")
            .await
    }

    async fn dispatch_events(&self, el: &ElementHandle, events: &[DomEvent]) -> Result<()> {
        let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
        let list = serde_json::to_string(&names)?;
        self.on(el, &EVENTS_BODY.replace("EVENTS", &list)).await
    }

    async fn bridge_framework_change(&self, el: &ElementHandle, value: &str) -> Result<bool> {
        self.on(el, &BRIDGE_BODY.replace("VALUE", &js(value))).await
    }

    async fn reset_rich_content(&self, el: &ElementHandle) -> Result<()> {
        self.on(el, RESET_RICH_BODY).await
    }

    async fn insert_text_command(&self, el: &ElementHandle, text: &str) -> Result<bool> {
        let body = format!(
            "el.focus(); return !!document.execCommand('insertText', false, {});",
            js(text)
        );
        self.on(el, &body).await
    }

    async fn replace_markup(&self, el: &ElementHandle, text: &str) -> Result<()> {
        let body = format!(
            "const p = document.createElement('p'); p.textContent = {}; el.replaceChildren(p); return null;",
            js(text)
        );
        self.on(el, &body).await
    }

    async fn text_content(&self, el: &ElementHandle) -> Result<String> {
        self.on(el, "return el.textContent || '';").await
    }

    async fn is_disabled(&self, el: &ElementHandle) -> Result<bool> {
        self.on(
            el,
            "return !!el.disabled || el.getAttribute('aria-disabled') === 'true';",
        )
        .await
    }

    async fn activate(&self, el: &ElementHandle) -> Result<()> {
        self.on(el, "el.click(); return null;").await
    }
}
