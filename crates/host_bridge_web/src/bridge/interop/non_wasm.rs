use super::*;

fn unsupported() -> String {
    "Browser host APIs are only available when compiled for wasm32".to_string()
}

pub fn probe_channels() -> TransportChannels {
    TransportChannels::default()
}

pub fn post_to_parent(_envelope: &str, _target_origin: &str) -> Result<(), String> {
    Err(unsupported())
}

pub fn post_to_native_proxy(_name: &str, _data: &str) -> Result<(), String> {
    Err(unsupported())
}

pub fn notify_external(_envelope: &str) -> Result<(), String> {
    Err(unsupported())
}

pub fn inner_height() -> f64 {
    0.0
}

pub fn location_href() -> String {
    String::new()
}

pub fn session_get(_key: &str) -> Option<String> {
    None
}

pub fn session_set(_key: &str, _value: &str) -> Result<(), String> {
    Ok(())
}

pub fn listen_parent_messages(_receiver: InboundReceiver) -> Result<(), String> {
    Ok(())
}

pub fn expose_entry_points(_receiver: InboundReceiver) -> Result<(), String> {
    Ok(())
}

pub fn set_custom_style(_css: &str) -> Result<(), String> {
    Ok(())
}

pub fn listen_resize(_listener: ResizeListener) -> Result<(), String> {
    Ok(())
}

pub fn open_window(_url: &str) -> Result<(), String> {
    Err(unsupported())
}

pub fn assign_location(_url: &str) -> Result<(), String> {
    Err(unsupported())
}
