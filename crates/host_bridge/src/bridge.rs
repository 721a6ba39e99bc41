//! Bridge core: outbound dispatch, inbound routing, host metadata and awaitable requests.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use serde_json::Value;
use tracing::debug;

use crate::{
    bus::{EventBus, ListenerId},
    config::BridgeConfig,
    correlator::{AwaitableRequest, Correlator, PendingReply},
    error::{BridgeError, DecodeError},
    inbound::{decode, parse_frame_message, HostEvent},
    outbound::{OutboundEvent, OutboundFrame},
    transport::{Delivery, HostEnvironment, InboundMessage, InboundRoute},
    version::HostVersion,
};

/// Platform identifier reported by desktop hosts, which never answer awaitable requests.
pub const DESKTOP_PLATFORM: &str = "tdesktop";

/// Version assumed until the host reports one.
pub const DEFAULT_HOST_VERSION: &str = "6.0";

/// Platform assumed until the host reports one.
pub const DEFAULT_HOST_PLATFORM: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
struct HostMeta {
    platform: String,
    version: String,
}

/// Single bridge instance shared by every component of a session.
pub struct HostBridge {
    env: Rc<dyn HostEnvironment>,
    config: BridgeConfig,
    meta: RefCell<HostMeta>,
    bus: EventBus<HostEvent>,
    correlator: Rc<Correlator>,
}

impl std::fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBridge")
            .field("config", &self.config)
            .field("meta", &*self.meta.borrow())
            .field("bus", &self.bus)
            .field("correlator", &self.correlator)
            .finish_non_exhaustive()
    }
}

impl HostBridge {
    /// Creates a bridge over `env`. Inbound routing starts with [`HostBridge::install_inbound`].
    pub fn new(env: Rc<dyn HostEnvironment>, config: BridgeConfig) -> Rc<Self> {
        Rc::new(Self {
            env,
            config,
            meta: RefCell::new(HostMeta {
                platform: DEFAULT_HOST_PLATFORM.to_string(),
                version: DEFAULT_HOST_VERSION.to_string(),
            }),
            bus: EventBus::new(),
            correlator: Rc::default(),
        })
    }

    /// Session configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Environment the bridge talks through.
    pub fn env(&self) -> &Rc<dyn HostEnvironment> {
        &self.env
    }

    /// Whether the app runs inside a parent frame.
    pub fn is_framed(&self) -> bool {
        self.env.channels().framed
    }

    /// Routes inbound host messages into this bridge.
    ///
    /// Framed sessions listen for parent frame messages and announce themselves with
    /// `iframe_ready`; all others expose the legacy global entry points.
    pub fn install_inbound(self: &Rc<Self>) -> Result<InboundRoute, BridgeError> {
        let route = if self.is_framed() {
            InboundRoute::FrameMessages
        } else {
            InboundRoute::GlobalEntryPoints
        };
        let bridge: Weak<Self> = Rc::downgrade(self);
        self.env
            .install_inbound(
                route,
                Rc::new(move |message: InboundMessage| {
                    if let Some(bridge) = bridge.upgrade() {
                        bridge.receive(message);
                    }
                }),
            )
            .map_err(BridgeError::transport)?;
        if route == InboundRoute::FrameMessages {
            self.post_event(&OutboundEvent::IframeReady)?;
        }
        Ok(route)
    }

    /// Sends a catalog command to the host.
    pub fn post_event(&self, event: &OutboundEvent) -> Result<(), BridgeError> {
        let frame = event
            .to_frame()
            .map_err(|reason| BridgeError::validation("payload", reason))?;
        self.post_frame(frame)
    }

    /// Sends an arbitrary event name and payload, for commands the catalog does not cover.
    pub fn post_event_raw(&self, name: &str, payload: Option<Value>) -> Result<(), BridgeError> {
        if name.trim().is_empty() {
            return Err(BridgeError::validation("event name", "must not be empty"));
        }
        self.post_frame(OutboundFrame::new(name, payload))
    }

    fn post_frame(&self, frame: OutboundFrame) -> Result<(), BridgeError> {
        let channel = self
            .env
            .channels()
            .select()
            .ok_or_else(|| BridgeError::transport("no host channel detected"))?;
        let delivery = Delivery {
            channel,
            frame,
            target_origin: self.config.trusted_parent_origin.clone(),
        };
        self.env
            .deliver(&delivery)
            .map_err(BridgeError::transport)?;
        if self.config.debug {
            debug!(
                channel = channel.as_str(),
                payload = %delivery.frame.serialized_payload(),
                "posted `{}`",
                delivery.frame.name
            );
        }
        Ok(())
    }

    /// Handles one raw inbound message from the environment.
    pub fn receive(&self, message: InboundMessage) {
        let parsed = match message {
            InboundMessage::Frame(raw) => parse_frame_message(&raw),
            InboundMessage::Call { name, payload } => Ok((name, payload)),
        };
        match parsed {
            Ok((name, payload)) => self.receive_event(&name, payload),
            Err(err) => self.drop_malformed(None, &err),
        }
    }

    /// Decodes an inbound event and delivers it to listeners; malformed payloads are dropped.
    pub fn receive_event(&self, name: &str, payload: Value) {
        let event = match decode(name, payload) {
            Ok(event) => event,
            Err(err) => return self.drop_malformed(Some(name), &err),
        };
        if let HostEvent::CustomStyle(css) = &event {
            if self.is_framed() {
                self.env.apply_custom_style(css);
            }
        }
        match &event {
            HostEvent::Custom { name, .. } => self.bus.emit_unsafe(name, &event),
            _ => self.bus.emit(&event),
        }
    }

    fn drop_malformed(&self, name: Option<&str>, err: &DecodeError) {
        if self.config.debug {
            debug!(event = name.unwrap_or("<frame>"), "dropped inbound message: {err}");
        }
    }

    /// Subscribes to an inbound event by name.
    pub fn on(&self, name: impl AsRef<str>, listener: impl Fn(&HostEvent) + 'static) -> ListenerId {
        self.bus.on(name, listener)
    }

    /// Subscribes to the next delivery of an inbound event.
    pub fn once(
        &self,
        name: impl AsRef<str>,
        listener: impl Fn(&HostEvent) + 'static,
    ) -> ListenerId {
        self.bus.once(name, listener)
    }

    /// Removes an inbound listener.
    pub fn off(&self, name: impl AsRef<str>, id: ListenerId) -> bool {
        self.bus.off(name, id)
    }

    /// Observes every inbound event.
    pub fn subscribe(&self, observer: impl Fn(&str, &HostEvent) + 'static) -> ListenerId {
        self.bus.subscribe(observer)
    }

    /// Removes an observer.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Number of listeners registered for `name`.
    pub fn listener_count(&self, name: impl AsRef<str>) -> usize {
        self.bus.listener_count(name)
    }

    /// Sends an awaitable request and returns its pending reply.
    ///
    /// Desktop hosts resolve immediately with `local_fallback()`. Otherwise a caller that finds
    /// a request of the same kind in flight joins it instead of posting again.
    pub fn request<R: AwaitableRequest + 'static>(
        &self,
        local_fallback: impl FnOnce() -> R::Reply,
    ) -> Result<PendingReply<R::Reply>, BridgeError> {
        if self.is_desktop() {
            return Ok(PendingReply::ready(local_fallback()));
        }

        let (reply, opened) = self.correlator.join::<R>();
        if !opened {
            return Ok(reply);
        }

        let correlator = Rc::clone(&self.correlator);
        let listener = self.bus.once(R::reply_event(), move |event| {
            correlator.resolve(R::KIND, event);
        });
        if let Err(err) = self.post_event(&R::command()) {
            self.bus.off(R::reply_event(), listener);
            self.correlator.abandon(R::KIND);
            return Err(err);
        }
        Ok(reply)
    }

    /// Number of callers waiting on requests of kind `R`.
    pub fn waiting<R: AwaitableRequest>(&self) -> usize {
        self.correlator.waiting(R::KIND)
    }

    /// Platform reported by the host.
    pub fn platform(&self) -> String {
        self.meta.borrow().platform.clone()
    }

    /// Protocol version reported by the host.
    pub fn version(&self) -> String {
        self.meta.borrow().version.clone()
    }

    /// Whether the host is the desktop client.
    pub fn is_desktop(&self) -> bool {
        self.meta.borrow().platform == DESKTOP_PLATFORM
    }

    pub(crate) fn set_host_meta(&self, platform: Option<&str>, version: Option<&str>) {
        let mut meta = self.meta.borrow_mut();
        if let Some(platform) = platform {
            meta.platform = platform.to_string();
        }
        if let Some(version) = version {
            meta.version = version.to_string();
        }
    }

    /// Whether the running version is at least `required`.
    ///
    /// An empty or unparsable running version satisfies everything; an unparsable `required`
    /// satisfies nothing.
    pub fn is_version_at_least(&self, required: &str) -> bool {
        let Some(required) = HostVersion::parse(required) else {
            return false;
        };
        let running = self.version();
        match HostVersion::parse(&running) {
            Some(running) => running >= required,
            None => {
                debug!("running host version `{running}` is unparsable; assuming support");
                true
            }
        }
    }

    /// Fails with [`BridgeError::Precondition`] when the running version is below `required`.
    pub fn require_version(&self, required: &str) -> Result<(), BridgeError> {
        if HostVersion::parse(required).is_none() {
            return Err(BridgeError::validation(
                "required version",
                format!("`{required}` is not a dotted numeric version"),
            ));
        }
        if self.is_version_at_least(required) {
            Ok(())
        } else {
            Err(BridgeError::Precondition {
                required: required.to_string(),
                running: self.version(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::rc::Rc;

    use super::HostBridge;
    use crate::{config::BridgeConfig, transport::MemoryHostEnvironment};

    /// Bridge over a native-proxy memory environment at `version`.
    pub(crate) fn bridge_at(version: &str) -> (Rc<HostBridge>, MemoryHostEnvironment) {
        let env = MemoryHostEnvironment::native();
        let bridge = HostBridge::new(Rc::new(env.clone()), BridgeConfig::default());
        bridge.set_host_meta(Some("android"), Some(version));
        (bridge, env)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{test_support::bridge_at, *};
    use crate::{
        correlator::{RequestTheme, RequestViewport},
        inbound::ViewportInfo,
        transport::{MemoryHostEnvironment, TransportChannel, TransportChannels},
    };

    fn viewport_payload(height: f64) -> Value {
        json!({"height": height, "is_expanded": false, "is_state_stable": true})
    }

    #[test]
    fn posts_pick_the_highest_priority_channel_at_call_time() {
        let env = MemoryHostEnvironment::with_channels(TransportChannels {
            framed: true,
            native_proxy: true,
            external_notify: false,
        });
        let bridge = HostBridge::new(Rc::new(env.clone()), BridgeConfig::default());

        bridge.post_event(&OutboundEvent::Expand).expect("framed post");
        env.set_channels(TransportChannels {
            native_proxy: true,
            ..TransportChannels::default()
        });
        bridge.post_event(&OutboundEvent::Expand).expect("proxy post");

        let channels: Vec<_> = env.deliveries().iter().map(|d| d.channel).collect();
        assert_eq!(
            channels,
            vec![TransportChannel::ParentFrame, TransportChannel::NativeProxy]
        );
        assert_eq!(env.deliveries()[0].target_origin, "*");
    }

    #[test]
    fn missing_or_failing_transport_is_reported() {
        let env = MemoryHostEnvironment::with_channels(TransportChannels::default());
        let bridge = HostBridge::new(Rc::new(env.clone()), BridgeConfig::default());
        assert!(matches!(
            bridge.post_event(&OutboundEvent::Ready),
            Err(BridgeError::TransportUnavailable { .. })
        ));

        env.set_channels(TransportChannels {
            external_notify: true,
            ..TransportChannels::default()
        });
        env.set_delivery_failure(Some("notify threw"));
        assert_eq!(
            bridge.post_event(&OutboundEvent::Ready),
            Err(BridgeError::TransportUnavailable {
                reason: "notify threw".to_string()
            })
        );
    }

    #[test]
    fn raw_posts_pass_name_and_payload_through() {
        let (bridge, env) = bridge_at("6.1");
        bridge
            .post_event_raw("web_app_custom", Some(json!({"a": 1})))
            .expect("raw post");
        assert!(bridge.post_event_raw("  ", None).is_err());

        let deliveries = env.deliveries();
        let delivery = &deliveries[0];
        assert_eq!(delivery.frame.name, "web_app_custom");
        assert_eq!(delivery.frame.serialized_payload(), r#"{"a":1}"#);
    }

    #[test]
    fn inbound_frames_reach_listeners_and_malformed_ones_are_dropped() {
        let env = MemoryHostEnvironment::framed();
        let bridge = HostBridge::new(Rc::new(env.clone()), BridgeConfig::default());
        assert_eq!(
            bridge.install_inbound().expect("install"),
            InboundRoute::FrameMessages
        );
        assert_eq!(env.posted_names(), vec!["iframe_ready"]);

        let heights = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&heights);
        bridge.on("viewport_changed", move |event| {
            if let HostEvent::ViewportChanged(info) = event {
                sink.borrow_mut().push(info.height);
            }
        });
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        bridge.subscribe(move |_, _| counter.set(counter.get() + 1));

        let good = json!({
            "eventType": "viewport_changed",
            "eventData": viewport_payload(300.0).to_string(),
        });
        env.inject(InboundMessage::Frame(good.to_string()));
        env.inject(InboundMessage::Frame("{broken".to_string()));
        env.inject(InboundMessage::Frame(
            json!({"eventType": "viewport_changed", "eventData": json!({"height": "x"}).to_string()})
                .to_string(),
        ));

        assert_eq!(*heights.borrow(), vec![300.0]);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn unknown_events_reach_raw_name_listeners() {
        let (bridge, env) = bridge_at("6.1");
        bridge.install_inbound().expect("install");
        assert_eq!(env.inbound_route(), Some(InboundRoute::GlobalEntryPoints));

        let payloads = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&payloads);
        bridge.on("qr_text_received", move |event| {
            if let HostEvent::Custom { payload, .. } = event {
                sink.borrow_mut().push(payload.clone());
            }
        });

        env.inject_call("qr_text_received", json!({"data": "hello"}));
        assert_eq!(*payloads.borrow(), vec![json!({"data": "hello"})]);
    }

    #[test]
    fn custom_styles_are_applied_only_when_framed() {
        let env = MemoryHostEnvironment::framed();
        let bridge = HostBridge::new(Rc::new(env.clone()), BridgeConfig::default());
        bridge.receive_event("set_custom_style", json!("body { color: red; }"));
        assert_eq!(env.custom_styles(), vec!["body { color: red; }"]);

        let (native, native_env) = bridge_at("6.1");
        native.receive_event("set_custom_style", json!("body {}"));
        assert!(native_env.custom_styles().is_empty());
    }

    #[test]
    fn same_kind_requests_are_coalesced() {
        let (bridge, env) = bridge_at("6.1");
        let first = bridge
            .request::<RequestViewport>(|| unreachable!("not desktop"))
            .expect("first request");
        let second = bridge
            .request::<RequestViewport>(|| unreachable!("not desktop"))
            .expect("second request");

        assert_eq!(env.posted_names(), vec!["web_app_request_viewport"]);
        assert_eq!(bridge.listener_count("viewport_changed"), 1);
        assert_eq!(bridge.waiting::<RequestViewport>(), 2);

        bridge.receive_event("viewport_changed", viewport_payload(420.0));

        let expected = ViewportInfo {
            height: 420.0,
            is_expanded: false,
            is_stable: true,
        };
        assert_eq!(block_on(first), Ok(expected));
        assert_eq!(block_on(second), Ok(expected));
        assert_eq!(bridge.listener_count("viewport_changed"), 0);
    }

    #[test]
    fn desktop_requests_resolve_locally_without_posting() {
        let (bridge, env) = bridge_at("6.1");
        bridge.set_host_meta(Some(DESKTOP_PLATFORM), None);

        let reply = bridge
            .request::<RequestViewport>(|| ViewportInfo {
                height: 900.0,
                is_expanded: true,
                is_stable: true,
            })
            .expect("desktop request");

        assert_eq!(block_on(reply).expect("reply").height, 900.0);
        assert!(env.deliveries().is_empty());
    }

    #[test]
    fn failed_request_posts_clean_up_their_waiters() {
        let (bridge, env) = bridge_at("6.1");
        env.set_delivery_failure(Some("gone"));

        let result = bridge.request::<RequestTheme>(Default::default);

        assert!(matches!(result, Err(BridgeError::TransportUnavailable { .. })));
        assert_eq!(bridge.listener_count("theme_changed"), 0);
        assert_eq!(bridge.waiting::<RequestTheme>(), 0);
    }

    #[test]
    fn version_checks_compare_dotted_components() {
        for running in ["6.1", "6.1.0", "6.2"] {
            let (bridge, _) = bridge_at(running);
            assert!(bridge.is_version_at_least("6.1"), "{running}");
            assert_eq!(bridge.require_version("6.1"), Ok(()));
        }

        let (bridge, _) = bridge_at("6.0");
        assert!(!bridge.is_version_at_least("6.1"));
        assert_eq!(
            bridge.require_version("6.1"),
            Err(BridgeError::Precondition {
                required: "6.1".to_string(),
                running: "6.0".to_string(),
            })
        );
        assert!(matches!(
            bridge.require_version("six"),
            Err(BridgeError::Validation { .. })
        ));
    }

    #[test]
    fn unparsable_running_versions_are_permissive() {
        let (bridge, _) = bridge_at("");
        assert!(bridge.is_version_at_least("9.9"));
        assert_eq!(bridge.require_version("9.9"), Ok(()));
    }
}
