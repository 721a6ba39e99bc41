//! Browser interop used by the web host environment.
//!
//! Calls are routed to target-specific implementations behind one uniform API so the
//! environment compiles and tests on native targets.

use host_bridge::{InboundReceiver, ResizeListener, TransportChannels};

#[cfg(not(target_arch = "wasm32"))]
mod non_wasm;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(not(target_arch = "wasm32"))]
use non_wasm as imp;
#[cfg(target_arch = "wasm32")]
use wasm as imp;

pub fn probe_channels() -> TransportChannels {
    imp::probe_channels()
}

pub fn post_to_parent(envelope: &str, target_origin: &str) -> Result<(), String> {
    imp::post_to_parent(envelope, target_origin)
}

pub fn post_to_native_proxy(name: &str, data: &str) -> Result<(), String> {
    imp::post_to_native_proxy(name, data)
}

pub fn notify_external(envelope: &str) -> Result<(), String> {
    imp::notify_external(envelope)
}

pub fn inner_height() -> f64 {
    imp::inner_height()
}

pub fn location_href() -> String {
    imp::location_href()
}

pub fn session_get(key: &str) -> Option<String> {
    imp::session_get(key)
}

pub fn session_set(key: &str, value: &str) -> Result<(), String> {
    imp::session_set(key, value)
}

pub fn listen_parent_messages(receiver: InboundReceiver) -> Result<(), String> {
    imp::listen_parent_messages(receiver)
}

pub fn expose_entry_points(receiver: InboundReceiver) -> Result<(), String> {
    imp::expose_entry_points(receiver)
}

pub fn set_custom_style(css: &str) -> Result<(), String> {
    imp::set_custom_style(css)
}

pub fn listen_resize(listener: ResizeListener) -> Result<(), String> {
    imp::listen_resize(listener)
}

pub fn open_window(url: &str) -> Result<(), String> {
    imp::open_window(url)
}

pub fn assign_location(url: &str) -> Result<(), String> {
    imp::assign_location(url)
}
