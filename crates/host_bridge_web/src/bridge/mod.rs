//! Browser capability bridge for [`WebHostEnvironment`](crate::WebHostEnvironment).
//!
//! Delivery strategy selection happens in the core crate; this layer maps each selected channel
//! and inbound route onto the matching browser call.

mod interop;

use host_bridge::{
    Delivery, InboundReceiver, InboundRoute, NavigationTarget, ResizeListener, TransportChannel,
    TransportChannels,
};

pub fn probe_channels() -> TransportChannels {
    interop::probe_channels()
}

pub fn deliver(delivery: &Delivery) -> Result<(), String> {
    let frame = &delivery.frame;
    match delivery.channel {
        TransportChannel::ParentFrame => {
            interop::post_to_parent(&frame.envelope(), &delivery.target_origin)
        }
        TransportChannel::NativeProxy => {
            interop::post_to_native_proxy(&frame.name, &frame.serialized_payload())
        }
        TransportChannel::ExternalNotify => interop::notify_external(&frame.envelope()),
    }
}

pub fn install_inbound(route: InboundRoute, receiver: InboundReceiver) -> Result<(), String> {
    match route {
        InboundRoute::FrameMessages => interop::listen_parent_messages(receiver),
        InboundRoute::GlobalEntryPoints => interop::expose_entry_points(receiver),
    }
}

pub fn navigate(url: &str, target: NavigationTarget) -> Result<(), String> {
    match target {
        NavigationTarget::NewWindow => interop::open_window(url),
        NavigationTarget::SameWindow => interop::assign_location(url),
    }
}

pub fn inner_height() -> f64 {
    interop::inner_height()
}

pub fn location_href() -> String {
    interop::location_href()
}

pub fn session_get(key: &str) -> Option<String> {
    interop::session_get(key)
}

pub fn session_set(key: &str, value: &str) -> Result<(), String> {
    interop::session_set(key, value)
}

pub fn set_custom_style(css: &str) -> Result<(), String> {
    interop::set_custom_style(css)
}

pub fn listen_resize(listener: ResizeListener) -> Result<(), String> {
    interop::listen_resize(listener)
}
