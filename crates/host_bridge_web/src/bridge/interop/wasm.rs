use host_bridge::InboundMessage;
use js_sys::{Function, Object, Reflect};
use serde_json::Value;
use tracing::debug;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{MessageEvent, Window};

use super::*;

const NATIVE_PROXY: &str = "TelegramWebviewProxy";
const STYLE_ELEMENT_ID: &str = "__tg-iframe-style__";
const ENTRY_POINTS: [&[&str]; 3] = [
    &["TelegramGameProxy_receiveEvent"],
    &["TelegramGameProxy", "receiveEvent"],
    &["Telegram", "WebView", "receiveEvent"],
];

fn window() -> Result<Window, String> {
    web_sys::window().ok_or_else(|| "window unavailable".to_string())
}

fn js_error_to_string(err: JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    if let Ok(message) = Reflect::get(&err, &JsValue::from_str("message")) {
        if let Some(text) = message.as_string() {
            return text;
        }
    }
    format!("{err:?}")
}

fn property(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

/// `target[owner][name]` when it is callable, with `target[owner]` as its receiver.
fn method(target: &JsValue, owner: &str, name: &str) -> Option<(JsValue, Function)> {
    let owner = property(target, owner)?;
    let function = property(&owner, name)?.dyn_into::<Function>().ok()?;
    Some((owner, function))
}

fn parent_window(window: &Window) -> Option<Window> {
    let parent = window.parent().ok().flatten()?;
    (!Object::is(parent.as_ref(), window.as_ref())).then_some(parent)
}

pub fn probe_channels() -> TransportChannels {
    let Some(window) = web_sys::window() else {
        return TransportChannels::default();
    };
    TransportChannels {
        framed: parent_window(&window).is_some(),
        native_proxy: method(window.as_ref(), NATIVE_PROXY, "postEvent").is_some(),
        external_notify: method(window.as_ref(), "external", "notify").is_some(),
    }
}

pub fn post_to_parent(envelope: &str, target_origin: &str) -> Result<(), String> {
    let window = window()?;
    let parent = parent_window(&window).ok_or_else(|| "parent frame unavailable".to_string())?;
    parent
        .post_message(&JsValue::from_str(envelope), target_origin)
        .map_err(js_error_to_string)
}

pub fn post_to_native_proxy(name: &str, data: &str) -> Result<(), String> {
    let window = window()?;
    let (proxy, post_event) = method(window.as_ref(), NATIVE_PROXY, "postEvent")
        .ok_or_else(|| "native proxy unavailable".to_string())?;
    post_event
        .call2(&proxy, &JsValue::from_str(name), &JsValue::from_str(data))
        .map(|_| ())
        .map_err(js_error_to_string)
}

pub fn notify_external(envelope: &str) -> Result<(), String> {
    let window = window()?;
    let (external, notify) = method(window.as_ref(), "external", "notify")
        .ok_or_else(|| "external notify unavailable".to_string())?;
    notify
        .call1(&external, &JsValue::from_str(envelope))
        .map(|_| ())
        .map_err(js_error_to_string)
}

pub fn inner_height() -> f64 {
    web_sys::window()
        .and_then(|window| window.inner_height().ok())
        .and_then(|height| height.as_f64())
        .unwrap_or(0.0)
}

pub fn location_href() -> String {
    web_sys::window()
        .and_then(|window| window.location().href().ok())
        .unwrap_or_default()
}

pub fn session_get(key: &str) -> Option<String> {
    let storage = web_sys::window()?.session_storage().ok().flatten()?;
    storage.get_item(key).ok().flatten()
}

pub fn session_set(key: &str, value: &str) -> Result<(), String> {
    let storage = window()?
        .session_storage()
        .ok()
        .flatten()
        .ok_or_else(|| "sessionStorage unavailable".to_string())?;
    storage
        .set_item(key, value)
        .map_err(|e| format!("sessionStorage set_item failed: {}", js_error_to_string(e)))
}

pub fn listen_parent_messages(receiver: InboundReceiver) -> Result<(), String> {
    let window = window()?;
    let on_message = Closure::<dyn FnMut(MessageEvent)>::wrap(Box::new(move |event: MessageEvent| {
        let from_parent = match (
            event.source(),
            web_sys::window().as_ref().and_then(parent_window),
        ) {
            (Some(source), Some(parent)) => Object::is(source.as_ref(), parent.as_ref()),
            _ => false,
        };
        if !from_parent {
            return;
        }
        if let Some(data) = event.data().as_string() {
            receiver(InboundMessage::Frame(data));
        }
    }));
    window
        .add_event_listener_with_callback("message", on_message.as_ref().unchecked_ref())
        .map_err(js_error_to_string)?;
    on_message.forget();
    Ok(())
}

/// Assigns `value` at `path` below `root`, creating missing intermediate objects.
fn assign_path(root: &JsValue, path: &[&str], value: &JsValue) -> Result<(), String> {
    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };
    let mut current = root.clone();
    for segment in parents {
        current = match property(&current, segment) {
            Some(existing) => existing,
            None => {
                let created: JsValue = Object::new().into();
                Reflect::set(&current, &JsValue::from_str(segment), &created)
                    .map_err(js_error_to_string)?;
                created
            }
        };
    }
    Reflect::set(&current, &JsValue::from_str(last), value)
        .map(|_| ())
        .map_err(js_error_to_string)
}

pub fn expose_entry_points(receiver: InboundReceiver) -> Result<(), String> {
    let window = window()?;
    let entry = Closure::<dyn FnMut(JsValue, JsValue)>::wrap(Box::new(
        move |name: JsValue, data: JsValue| {
            let Some(name) = name.as_string() else {
                debug!("entry point called without an event name");
                return;
            };
            let payload = if data.is_undefined() || data.is_null() {
                Value::Null
            } else {
                match serde_wasm_bindgen::from_value::<Value>(data) {
                    Ok(payload) => payload,
                    Err(err) => {
                        debug!("dropping `{name}` with unreadable payload: {err}");
                        return;
                    }
                }
            };
            receiver(InboundMessage::Call { name, payload });
        },
    ));
    for path in ENTRY_POINTS {
        assign_path(window.as_ref(), path, entry.as_ref())?;
    }
    entry.forget();
    Ok(())
}

pub fn set_custom_style(css: &str) -> Result<(), String> {
    let document = window()?
        .document()
        .ok_or_else(|| "document unavailable".to_string())?;
    let element = match document.get_element_by_id(STYLE_ELEMENT_ID) {
        Some(element) => element,
        None => {
            let element = document
                .create_element("style")
                .map_err(js_error_to_string)?;
            element.set_id(STYLE_ELEMENT_ID);
            document
                .head()
                .ok_or_else(|| "document head unavailable".to_string())?
                .append_child(&element)
                .map_err(js_error_to_string)?;
            element
        }
    };
    element.set_inner_html(css);
    Ok(())
}

pub fn listen_resize(listener: ResizeListener) -> Result<(), String> {
    let window = window()?;
    let on_resize = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(move |_| {
        listener(inner_height());
    }));
    window
        .add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())
        .map_err(js_error_to_string)?;
    on_resize.forget();
    Ok(())
}

pub fn open_window(url: &str) -> Result<(), String> {
    match window()?
        .open_with_url_and_target(url, "_blank")
        .map_err(js_error_to_string)?
    {
        Some(_) => Ok(()),
        None => Err("window.open was blocked".to_string()),
    }
}

pub fn assign_location(url: &str) -> Result<(), String> {
    window()?
        .location()
        .set_href(url)
        .map_err(js_error_to_string)
}
