//! Host application metadata and app-level commands.

use std::{cell::RefCell, rc::Rc};

use url::Url;

use crate::{
    bridge::HostBridge,
    bus::{BusEvent, EventBus, ListenerId},
    color::RgbColor,
    error::BridgeError,
    outbound::{BackgroundColor, OutboundEvent, ThemeColorKey},
    transport::NavigationTarget,
};

use super::{commit, theme::Theme};

/// Lowest version for header and background colors and host-side link opening.
pub const COLORS_MIN_VERSION: &str = "6.1";

/// Lowest version with a closing confirmation dialog.
pub const CLOSING_CONFIRMATION_MIN_VERSION: &str = "6.2";

/// Largest payload accepted by [`HostApp::send_data`], in bytes.
pub const SEND_DATA_MAX_BYTES: usize = 4096;

const TELEGRAM_LINK_HOST: &str = "t.me";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Host application events.
pub enum HostAppEvent {
    /// Background color changed.
    BackgroundColorChange(BackgroundColor),
    /// Header color changed.
    HeaderColorChange(ThemeColorKey),
    /// Closing confirmation toggled.
    ClosingConfirmationChange(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Subscription keys for [`HostAppEvent`].
pub enum HostAppEventKind {
    /// [`HostAppEvent::BackgroundColorChange`].
    BackgroundColorChange,
    /// [`HostAppEvent::HeaderColorChange`].
    HeaderColorChange,
    /// [`HostAppEvent::ClosingConfirmationChange`].
    ClosingConfirmationChange,
}

impl HostAppEventKind {
    /// Name the event is delivered under.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BackgroundColorChange => "backgroundColorChange",
            Self::HeaderColorChange => "headerColorChange",
            Self::ClosingConfirmationChange => "closingConfirmationChange",
        }
    }
}

impl AsRef<str> for HostAppEventKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl BusEvent for HostAppEvent {
    fn event_name(&self) -> &str {
        match self {
            Self::BackgroundColorChange(_) => HostAppEventKind::BackgroundColorChange.as_str(),
            Self::HeaderColorChange(_) => HostAppEventKind::HeaderColorChange.as_str(),
            Self::ClosingConfirmationChange(_) => {
                HostAppEventKind::ClosingConfirmationChange.as_str()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HostAppState {
    header_color: ThemeColorKey,
    background_color: BackgroundColor,
    is_closing_confirmation_enabled: bool,
}

#[derive(Debug)]
/// App-level host service: metadata, colors, closing behavior, data and links.
pub struct HostApp {
    bridge: Rc<HostBridge>,
    theme: Rc<Theme>,
    state: RefCell<HostAppState>,
    events: EventBus<HostAppEvent>,
}

impl HostApp {
    /// Creates the service; both colors follow the theme background.
    pub fn new(bridge: Rc<HostBridge>, theme: Rc<Theme>) -> Self {
        Self {
            bridge,
            theme,
            state: RefCell::new(HostAppState {
                header_color: ThemeColorKey::BgColor,
                background_color: BackgroundColor::Key(ThemeColorKey::BgColor),
                is_closing_confirmation_enabled: false,
            }),
            events: EventBus::new(),
        }
    }

    /// Records the platform and version the host launched with.
    pub(crate) fn apply_launch_meta(&self, platform: Option<&str>, version: Option<&str>) {
        self.bridge.set_host_meta(platform, version);
    }

    /// Host platform identifier.
    pub fn platform(&self) -> String {
        self.bridge.platform()
    }

    /// Host protocol version.
    pub fn version(&self) -> String {
        self.bridge.version()
    }

    /// Whether the host is the desktop client.
    pub fn is_desktop(&self) -> bool {
        self.bridge.is_desktop()
    }

    /// Whether the running version is at least `required`.
    pub fn is_version_at_least(&self, required: &str) -> bool {
        self.bridge.is_version_at_least(required)
    }

    /// Fails when the running version is below `required`.
    pub fn require_version(&self, required: &str) -> Result<(), BridgeError> {
        self.bridge.require_version(required)
    }

    /// Header color key.
    pub fn header_color(&self) -> ThemeColorKey {
        self.state.borrow().header_color
    }

    /// Background color as set: a theme key or an explicit color.
    pub fn background_color(&self) -> BackgroundColor {
        self.state.borrow().background_color.clone()
    }

    /// Background color with theme keys resolved through the current theme.
    pub fn resolved_background_color(&self) -> Option<RgbColor> {
        match self.background_color() {
            BackgroundColor::Rgb(color) => Some(color),
            BackgroundColor::Key(ThemeColorKey::BgColor) => self.theme.bg_color(),
            BackgroundColor::Key(ThemeColorKey::SecondaryBgColor) => {
                self.theme.secondary_bg_color()
            }
        }
    }

    /// Whether closing the app asks for confirmation.
    pub fn is_closing_confirmation_enabled(&self) -> bool {
        self.state.borrow().is_closing_confirmation_enabled
    }

    /// Sets the background to a theme key or an explicit color.
    pub fn set_background_color(&self, color: &str) -> Result<(), BridgeError> {
        let color = BackgroundColor::parse(color)
            .map_err(|reason| BridgeError::validation("background color", reason))?;
        let changed = commit(
            &self.state,
            |s| &mut s.background_color,
            color.clone(),
            || self.bridge.require_version(COLORS_MIN_VERSION),
            |s| {
                self.bridge.post_event(&OutboundEvent::SetBackgroundColor {
                    color: s.background_color.clone(),
                })
            },
        )?;
        if changed {
            self.events.emit(&HostAppEvent::BackgroundColorChange(color));
        }
        Ok(())
    }

    /// Sets the header to follow a theme key.
    pub fn set_header_color(&self, key: ThemeColorKey) -> Result<(), BridgeError> {
        let changed = commit(
            &self.state,
            |s| &mut s.header_color,
            key,
            || self.bridge.require_version(COLORS_MIN_VERSION),
            |s| {
                self.bridge.post_event(&OutboundEvent::SetHeaderColor {
                    color_key: s.header_color,
                })
            },
        )?;
        if changed {
            self.events.emit(&HostAppEvent::HeaderColorChange(key));
        }
        Ok(())
    }

    /// Asks for confirmation before the app closes.
    pub fn enable_closing_confirmation(&self) -> Result<(), BridgeError> {
        self.set_closing_confirmation(true)
    }

    /// Closes the app without confirmation.
    pub fn disable_closing_confirmation(&self) -> Result<(), BridgeError> {
        self.set_closing_confirmation(false)
    }

    fn set_closing_confirmation(&self, enabled: bool) -> Result<(), BridgeError> {
        let changed = commit(
            &self.state,
            |s| &mut s.is_closing_confirmation_enabled,
            enabled,
            || self.bridge.require_version(CLOSING_CONFIRMATION_MIN_VERSION),
            |s| {
                self.bridge.post_event(&OutboundEvent::SetupClosingBehavior {
                    need_confirmation: s.is_closing_confirmation_enabled,
                })
            },
        )?;
        if changed {
            self.events
                .emit(&HostAppEvent::ClosingConfirmationChange(enabled));
        }
        Ok(())
    }

    /// Sends `data` to the bot; the host closes the app afterwards.
    pub fn send_data(&self, data: &str) -> Result<(), BridgeError> {
        let size = data.len();
        if !(1..=SEND_DATA_MAX_BYTES).contains(&size) {
            return Err(BridgeError::validation(
                "data",
                format!("size must be 1..={SEND_DATA_MAX_BYTES} bytes, got {size}"),
            ));
        }
        self.bridge.post_event(&OutboundEvent::DataSend {
            data: data.to_string(),
        })
    }

    /// Tells the host the app is ready to be shown.
    pub fn ready(&self) -> Result<(), BridgeError> {
        self.bridge.post_event(&OutboundEvent::Ready)
    }

    /// Closes the app.
    pub fn close(&self) -> Result<(), BridgeError> {
        self.bridge.post_event(&OutboundEvent::Close)
    }

    /// Opens `url` in an external browser without closing the app.
    pub fn open_link(&self, url: &str) -> Result<(), BridgeError> {
        let url = parse_url(url)?;
        if self.is_version_at_least(COLORS_MIN_VERSION) {
            return self.bridge.post_event(&OutboundEvent::OpenLink {
                url: url.to_string(),
            });
        }
        self.bridge
            .env()
            .navigate(url.as_str(), NavigationTarget::NewWindow)
            .map_err(BridgeError::transport)
    }

    /// Opens a `t.me` link inside the host; the app is closed.
    pub fn open_telegram_link(&self, url: &str) -> Result<(), BridgeError> {
        let url = parse_url(url)?;
        if url.host_str() != Some(TELEGRAM_LINK_HOST) {
            return Err(BridgeError::validation(
                "url",
                format!(
                    "host `{}` is not allowed, only `{TELEGRAM_LINK_HOST}`",
                    url.host_str().unwrap_or_default()
                ),
            ));
        }
        if self.bridge.is_framed() || self.is_version_at_least(COLORS_MIN_VERSION) {
            let path = match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_string(),
            };
            return self
                .bridge
                .post_event(&OutboundEvent::OpenTelegramLink { url: path });
        }
        self.bridge
            .env()
            .navigate(url.as_str(), NavigationTarget::SameWindow)
            .map_err(BridgeError::transport)
    }

    /// Subscribes to a host application event.
    pub fn on(&self, kind: HostAppEventKind, listener: impl Fn(&HostAppEvent) + 'static) -> ListenerId {
        self.events.on(kind, listener)
    }

    /// Removes a listener added with [`HostApp::on`].
    pub fn off(&self, kind: HostAppEventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }
}

/// Parses an absolute URL, assuming `https` when the scheme is missing.
fn parse_url(raw: &str) -> Result<Url, BridgeError> {
    let raw = raw.trim();
    Url::parse(raw)
        .or_else(|_| Url::parse(&format!("https://{raw}")))
        .map_err(|err| BridgeError::validation("url", format!("`{raw}`: {err}")))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{
        bridge::test_support::bridge_at,
        config::BridgeConfig,
        transport::{MemoryHostEnvironment, TransportChannels},
    };

    fn host_app(version: &str) -> (HostApp, MemoryHostEnvironment) {
        let (bridge, env) = bridge_at(version);
        let theme = Theme::new(Rc::clone(&bridge));
        (HostApp::new(bridge, theme), env)
    }

    #[test]
    fn defaults_follow_the_theme_background() {
        let (app, _) = host_app("6.0");
        assert_eq!(app.header_color(), ThemeColorKey::BgColor);
        assert_eq!(
            app.background_color(),
            BackgroundColor::Key(ThemeColorKey::BgColor)
        );
        assert!(!app.is_closing_confirmation_enabled());
        assert_eq!(app.version(), "6.0");
    }

    #[test]
    fn background_color_resolves_through_the_theme() {
        let (bridge, _env) = bridge_at("6.1");
        let theme = Theme::new(Rc::clone(&bridge));
        theme.apply_theme_info(
            crate::inbound::ThemeInfo::parse(r##"{"bg_color":"#101010","secondary_bg_color":"#202020"}"##)
                .expect("theme"),
        );
        let app = HostApp::new(bridge, Rc::clone(&theme));

        assert_eq!(app.resolved_background_color(), RgbColor::parse("#101010").ok());
        app.set_background_color("secondary_bg_color").expect("key");
        assert_eq!(app.resolved_background_color(), RgbColor::parse("#202020").ok());
        app.set_background_color("#ABC").expect("color");
        assert_eq!(app.resolved_background_color(), RgbColor::parse("#aabbcc").ok());
    }

    #[test]
    fn color_setters_are_version_gated_and_diffed() {
        let (old, old_env) = host_app("6.0");
        assert!(old.set_background_color("bg_color").is_ok());
        assert!(matches!(
            old.set_header_color(ThemeColorKey::SecondaryBgColor),
            Err(BridgeError::Precondition { .. })
        ));
        assert!(old_env.deliveries().is_empty());

        let (app, env) = host_app("6.1");
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        app.on(HostAppEventKind::HeaderColorChange, move |event| {
            sink.borrow_mut().push(event.clone())
        });

        app.set_header_color(ThemeColorKey::SecondaryBgColor).expect("header");
        app.set_header_color(ThemeColorKey::SecondaryBgColor).expect("same header");

        let deliveries = env.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(
            deliveries[0].frame.payload,
            Some(json!({"color_key": "secondary_bg_color"}))
        );
        assert_eq!(
            *log.borrow(),
            vec![HostAppEvent::HeaderColorChange(ThemeColorKey::SecondaryBgColor)]
        );
        assert!(matches!(
            app.set_background_color("not a color"),
            Err(BridgeError::Validation { .. })
        ));
    }

    #[test]
    fn closing_confirmation_needs_6_2() {
        let (app, _) = host_app("6.1");
        assert!(app.enable_closing_confirmation().is_err());
        assert!(!app.is_closing_confirmation_enabled());

        let (app, env) = host_app("6.2");
        app.enable_closing_confirmation().expect("enable");
        assert!(app.is_closing_confirmation_enabled());
        assert_eq!(
            env.deliveries()[0].frame.payload,
            Some(json!({"need_confirmation": true}))
        );
    }

    #[test]
    fn send_data_checks_byte_length() {
        let (app, env) = host_app("6.0");
        assert!(app.send_data("").is_err());
        assert!(app.send_data(&"ж".repeat(2049)).is_err());
        app.send_data(&"ж".repeat(2048)).expect("4096 bytes");
        assert_eq!(env.posted_names(), vec!["web_app_data_send"]);
    }

    #[test]
    fn open_link_uses_the_host_from_6_1() {
        let (app, env) = host_app("6.1");
        app.open_link("https://example.com/a?b=c").expect("open");
        assert_eq!(
            env.deliveries()[0].frame.payload,
            Some(json!({"url": "https://example.com/a?b=c"}))
        );

        let (legacy, legacy_env) = host_app("6.0");
        legacy.open_link("example.com").expect("legacy open");
        assert!(legacy_env.deliveries().is_empty());
        assert_eq!(
            legacy_env.navigations(),
            vec![("https://example.com/".to_string(), NavigationTarget::NewWindow)]
        );
    }

    #[test]
    fn telegram_links_are_restricted_to_t_me() {
        let (app, env) = host_app("6.1");
        assert!(matches!(
            app.open_telegram_link("https://example.com/x"),
            Err(BridgeError::Validation { .. })
        ));

        app.open_telegram_link("https://t.me/some_bot?start=1").expect("open");
        assert_eq!(
            env.deliveries()[0].frame.payload,
            Some(json!({"url": "/some_bot?start=1"}))
        );
    }

    #[test]
    fn telegram_links_navigate_on_old_unframed_hosts() {
        let (legacy, legacy_env) = host_app("6.0");
        legacy.open_telegram_link("https://t.me/chan").expect("legacy");
        assert_eq!(
            legacy_env.navigations(),
            vec![("https://t.me/chan".to_string(), NavigationTarget::SameWindow)]
        );

        let env = MemoryHostEnvironment::with_channels(TransportChannels {
            framed: true,
            ..TransportChannels::default()
        });
        let bridge = HostBridge::new(Rc::new(env.clone()), BridgeConfig::default());
        let app = HostApp::new(Rc::clone(&bridge), Theme::new(bridge));
        app.open_telegram_link("https://t.me/chan").expect("framed");
        assert_eq!(env.posted_names(), vec!["web_app_open_tg_link"]);
    }
}
