//! Host environment contract consumed by the bridge, plus baseline adapters.
//!
//! The environment owns everything target-specific: which outbound channels exist, how a frame
//! reaches the host, where inbound messages come from, and the few browser facilities the
//! components touch (viewport height, launch parameters, style injection, navigation).
//! Browser code lives in `host_bridge_web`; [`MemoryHostEnvironment`] backs native tests.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use serde_json::Value;

use crate::outbound::OutboundFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Outbound channels the environment can reach at the moment of a post.
pub struct TransportChannels {
    /// Running inside a parent frame that accepts posted envelopes.
    pub framed: bool,
    /// A native `postEvent(name, data)` proxy object is present.
    pub native_proxy: bool,
    /// An external `notify(envelope)` hook is present.
    pub external_notify: bool,
}

impl TransportChannels {
    /// Picks the highest-priority available channel.
    pub fn select(self) -> Option<TransportChannel> {
        if self.framed {
            Some(TransportChannel::ParentFrame)
        } else if self.native_proxy {
            Some(TransportChannel::NativeProxy)
        } else if self.external_notify {
            Some(TransportChannel::ExternalNotify)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Delivery strategy for one outbound frame.
pub enum TransportChannel {
    /// `parent.postMessage(envelope, origin)`.
    ParentFrame,
    /// `proxy.postEvent(name, serialized payload)`.
    NativeProxy,
    /// `external.notify(envelope)`.
    ExternalNotify,
}

impl TransportChannel {
    /// Stable label used in diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ParentFrame => "parent_frame",
            Self::NativeProxy => "native_proxy",
            Self::ExternalNotify => "external_notify",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One outbound frame bound to the channel selected for it.
pub struct Delivery {
    /// Selected channel.
    pub channel: TransportChannel,
    /// Frame to deliver.
    pub frame: OutboundFrame,
    /// Target origin for [`TransportChannel::ParentFrame`] deliveries.
    pub target_origin: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where inbound host events arrive.
pub enum InboundRoute {
    /// `message` events from the parent frame carrying envelope strings.
    FrameMessages,
    /// Legacy global callbacks invoked by the native host with `(name, data)`.
    GlobalEntryPoints,
}

#[derive(Debug, Clone, PartialEq)]
/// Raw inbound message handed to the bridge by the environment.
pub enum InboundMessage {
    /// Envelope string posted by the parent frame.
    Frame(String),
    /// Direct entry-point call.
    Call {
        /// Event name.
        name: String,
        /// Event payload as received.
        payload: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Window a legacy navigation opens the URL in.
pub enum NavigationTarget {
    /// New browser window or tab.
    NewWindow,
    /// Replaces the current document.
    SameWindow,
}

/// Callback receiving raw inbound messages.
pub type InboundReceiver = Rc<dyn Fn(InboundMessage)>;

/// Callback receiving the new inner window height after a resize.
pub type ResizeListener = Rc<dyn Fn(f64)>;

/// Target-specific host facilities used by the bridge and its components.
pub trait HostEnvironment {
    /// Probes the outbound channels available right now.
    fn channels(&self) -> TransportChannels;

    /// Delivers one frame over the channel already selected for it.
    fn deliver(&self, delivery: &Delivery) -> Result<(), String>;

    /// Current inner viewport height in CSS pixels.
    fn viewport_height(&self) -> f64;

    /// URL-encoded launch parameters, including any persisted from earlier loads.
    fn launch_params(&self) -> String;

    /// Starts routing inbound host messages to `receiver`.
    fn install_inbound(&self, route: InboundRoute, receiver: InboundReceiver)
        -> Result<(), String>;

    /// Replaces the host-provided custom stylesheet.
    fn apply_custom_style(&self, css: &str);

    /// Registers a window resize listener.
    fn on_resize(&self, listener: ResizeListener);

    /// Opens `url` without going through the host.
    fn navigate(&self, url: &str, target: NavigationTarget) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, Default)]
/// Environment with no host attached; every post fails with no channel.
pub struct NoopHostEnvironment;

impl HostEnvironment for NoopHostEnvironment {
    fn channels(&self) -> TransportChannels {
        TransportChannels::default()
    }

    fn deliver(&self, _delivery: &Delivery) -> Result<(), String> {
        Err("no host attached".to_string())
    }

    fn viewport_height(&self) -> f64 {
        0.0
    }

    fn launch_params(&self) -> String {
        String::new()
    }

    fn install_inbound(
        &self,
        _route: InboundRoute,
        _receiver: InboundReceiver,
    ) -> Result<(), String> {
        Ok(())
    }

    fn apply_custom_style(&self, _css: &str) {}

    fn on_resize(&self, _listener: ResizeListener) {}

    fn navigate(&self, _url: &str, _target: NavigationTarget) -> Result<(), String> {
        Err("navigation is unavailable".to_string())
    }
}

#[derive(Default)]
struct MemoryHostState {
    deliveries: RefCell<Vec<Delivery>>,
    delivery_failure: RefCell<Option<String>>,
    viewport_height: Cell<f64>,
    launch_params: RefCell<String>,
    inbound: RefCell<Option<(InboundRoute, InboundReceiver)>>,
    custom_styles: RefCell<Vec<String>>,
    resize_listeners: RefCell<Vec<ResizeListener>>,
    navigations: RefCell<Vec<(String, NavigationTarget)>>,
}

#[derive(Clone, Default)]
/// In-memory environment that records every delivery and lets tests play the host.
pub struct MemoryHostEnvironment {
    channels: Rc<Cell<TransportChannels>>,
    inner: Rc<MemoryHostState>,
}

impl std::fmt::Debug for MemoryHostEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHostEnvironment")
            .field("channels", &self.channels.get())
            .field("deliveries", &self.inner.deliveries.borrow().len())
            .finish()
    }
}

impl MemoryHostEnvironment {
    /// Environment reachable through the native proxy only.
    pub fn native() -> Self {
        Self::with_channels(TransportChannels {
            native_proxy: true,
            ..TransportChannels::default()
        })
    }

    /// Environment running inside a parent frame.
    pub fn framed() -> Self {
        Self::with_channels(TransportChannels {
            framed: true,
            ..TransportChannels::default()
        })
    }

    /// Environment exposing exactly `channels`.
    pub fn with_channels(channels: TransportChannels) -> Self {
        let env = Self::default();
        env.channels.set(channels);
        env
    }

    /// Replaces the channel set reported by later probes.
    pub fn set_channels(&self, channels: TransportChannels) {
        self.channels.set(channels);
    }

    /// Makes every later delivery fail with `reason`, or succeed again with `None`.
    pub fn set_delivery_failure(&self, reason: Option<&str>) {
        *self.inner.delivery_failure.borrow_mut() = reason.map(str::to_string);
    }

    /// Sets the height reported by [`HostEnvironment::viewport_height`].
    pub fn set_viewport_height(&self, height: f64) {
        self.inner.viewport_height.set(height);
    }

    /// Sets the query string reported by [`HostEnvironment::launch_params`].
    pub fn set_launch_params(&self, raw: impl Into<String>) {
        *self.inner.launch_params.borrow_mut() = raw.into();
    }

    /// Every successful delivery so far.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.inner.deliveries.borrow().clone()
    }

    /// Names of every delivered frame, in order.
    pub fn posted_names(&self) -> Vec<String> {
        self.inner
            .deliveries
            .borrow()
            .iter()
            .map(|delivery| delivery.frame.name.clone())
            .collect()
    }

    /// Drains recorded deliveries.
    pub fn take_deliveries(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.inner.deliveries.borrow_mut())
    }

    /// Route chosen by the bridge, if inbound routing was installed.
    pub fn inbound_route(&self) -> Option<InboundRoute> {
        self.inner.inbound.borrow().as_ref().map(|(route, _)| *route)
    }

    /// Feeds a raw message to the installed inbound receiver. Returns `false` when none is installed.
    pub fn inject(&self, message: InboundMessage) -> bool {
        let receiver = self
            .inner
            .inbound
            .borrow()
            .as_ref()
            .map(|(_, receiver)| Rc::clone(receiver));
        match receiver {
            Some(receiver) => {
                receiver(message);
                true
            }
            None => false,
        }
    }

    /// Plays the host calling an entry point with `name` and `payload`.
    pub fn inject_call(&self, name: &str, payload: Value) -> bool {
        self.inject(InboundMessage::Call {
            name: name.to_string(),
            payload,
        })
    }

    /// Simulates a window resize to `height`.
    pub fn resize(&self, height: f64) {
        self.inner.viewport_height.set(height);
        let listeners = self.inner.resize_listeners.borrow().clone();
        for listener in listeners {
            listener(height);
        }
    }

    /// Stylesheets applied so far.
    pub fn custom_styles(&self) -> Vec<String> {
        self.inner.custom_styles.borrow().clone()
    }

    /// Legacy navigations performed so far.
    pub fn navigations(&self) -> Vec<(String, NavigationTarget)> {
        self.inner.navigations.borrow().clone()
    }
}

impl HostEnvironment for MemoryHostEnvironment {
    fn channels(&self) -> TransportChannels {
        self.channels.get()
    }

    fn deliver(&self, delivery: &Delivery) -> Result<(), String> {
        if let Some(reason) = self.inner.delivery_failure.borrow().clone() {
            return Err(reason);
        }
        self.inner.deliveries.borrow_mut().push(delivery.clone());
        Ok(())
    }

    fn viewport_height(&self) -> f64 {
        self.inner.viewport_height.get()
    }

    fn launch_params(&self) -> String {
        self.inner.launch_params.borrow().clone()
    }

    fn install_inbound(
        &self,
        route: InboundRoute,
        receiver: InboundReceiver,
    ) -> Result<(), String> {
        *self.inner.inbound.borrow_mut() = Some((route, receiver));
        Ok(())
    }

    fn apply_custom_style(&self, css: &str) {
        self.inner.custom_styles.borrow_mut().push(css.to_string());
    }

    fn on_resize(&self, listener: ResizeListener) {
        self.inner.resize_listeners.borrow_mut().push(listener);
    }

    fn navigate(&self, url: &str, target: NavigationTarget) -> Result<(), String> {
        self.inner
            .navigations
            .borrow_mut()
            .push((url.to_string(), target));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_selection_follows_fixed_priority() {
        let all = TransportChannels {
            framed: true,
            native_proxy: true,
            external_notify: true,
        };
        assert_eq!(all.select(), Some(TransportChannel::ParentFrame));

        let no_frame = TransportChannels {
            framed: false,
            ..all
        };
        assert_eq!(no_frame.select(), Some(TransportChannel::NativeProxy));

        let notify_only = TransportChannels {
            external_notify: true,
            ..TransportChannels::default()
        };
        assert_eq!(notify_only.select(), Some(TransportChannel::ExternalNotify));
        assert_eq!(TransportChannels::default().select(), None);
    }

    #[test]
    fn memory_environment_records_and_fails_on_demand() {
        let env = MemoryHostEnvironment::native();
        let delivery = Delivery {
            channel: TransportChannel::NativeProxy,
            frame: OutboundFrame::new("web_app_ready", None),
            target_origin: "*".to_string(),
        };

        env.deliver(&delivery).expect("deliver");
        env.set_delivery_failure(Some("proxy gone"));
        assert_eq!(env.deliver(&delivery), Err("proxy gone".to_string()));

        assert_eq!(env.posted_names(), vec!["web_app_ready"]);
        assert_eq!(env.take_deliveries().len(), 1);
        assert!(env.deliveries().is_empty());
    }

    #[test]
    fn noop_environment_has_no_channels() {
        let env = NoopHostEnvironment;
        assert_eq!(env.channels().select(), None);
        assert!(env.navigate("https://example.com", NavigationTarget::NewWindow).is_err());
    }
}
