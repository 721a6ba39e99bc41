//! Host theme snapshot and derived color scheme.

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    bridge::HostBridge,
    bus::{BusEvent, EventBus, ListenerId},
    color::RgbColor,
    correlator::{PendingReply, RequestTheme},
    error::BridgeError,
    inbound::{names, HostEvent, ThemeInfo, ThemeParams},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Light or dark appearance derived from the background color.
pub enum ColorScheme {
    /// Bright background.
    Light,
    /// Dark or unknown background.
    Dark,
}

#[derive(Debug, Clone, PartialEq)]
/// Theme events.
pub enum ThemeEvent {
    /// A new snapshot was applied.
    Change(ThemeInfo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Subscription keys for [`ThemeEvent`].
pub enum ThemeEventKind {
    /// [`ThemeEvent::Change`].
    Change,
}

impl AsRef<str> for ThemeEventKind {
    fn as_ref(&self) -> &str {
        "change"
    }
}

impl BusEvent for ThemeEvent {
    fn event_name(&self) -> &str {
        "change"
    }
}

#[derive(Debug)]
/// Theme service holding the last snapshot received from the host.
pub struct Theme {
    bridge: Rc<HostBridge>,
    state: RefCell<ThemeInfo>,
    events: EventBus<ThemeEvent>,
}

impl Theme {
    /// Creates the service with an empty theme.
    pub fn new(bridge: Rc<HostBridge>) -> Rc<Self> {
        Rc::new(Self {
            bridge,
            state: RefCell::new(ThemeInfo::default()),
            events: EventBus::new(),
        })
    }

    /// Background color.
    pub fn bg_color(&self) -> Option<RgbColor> {
        self.state.borrow().params.bg_color.clone()
    }

    /// Button color.
    pub fn button_color(&self) -> Option<RgbColor> {
        self.state.borrow().params.button_color.clone()
    }

    /// Button label color.
    pub fn button_text_color(&self) -> Option<RgbColor> {
        self.state.borrow().params.button_text_color.clone()
    }

    /// Hint text color.
    pub fn hint_color(&self) -> Option<RgbColor> {
        self.state.borrow().params.hint_color.clone()
    }

    /// Link color.
    pub fn link_color(&self) -> Option<RgbColor> {
        self.state.borrow().params.link_color.clone()
    }

    /// Secondary background color.
    pub fn secondary_bg_color(&self) -> Option<RgbColor> {
        self.state.borrow().params.secondary_bg_color.clone()
    }

    /// Text color.
    pub fn text_color(&self) -> Option<RgbColor> {
        self.state.borrow().params.text_color.clone()
    }

    /// JSON text of the current snapshot.
    pub fn raw(&self) -> String {
        self.state.borrow().raw.clone()
    }

    /// Every key of the current snapshot, untyped.
    pub fn unsafe_params(&self) -> Map<String, Value> {
        self.state.borrow().unsafe_params.clone()
    }

    /// Typed colors of the current snapshot.
    pub fn params(&self) -> ThemeParams {
        self.state.borrow().params.clone()
    }

    /// Whole current snapshot.
    pub fn info(&self) -> ThemeInfo {
        self.state.borrow().clone()
    }

    /// Dark when the background is missing or perceptually dark.
    pub fn color_scheme(&self) -> ColorScheme {
        match self.bg_color() {
            Some(color) if !color.is_dark() => ColorScheme::Light,
            _ => ColorScheme::Dark,
        }
    }

    /// Replaces the snapshot and always emits [`ThemeEvent::Change`].
    pub fn apply_theme_info(&self, info: ThemeInfo) {
        *self.state.borrow_mut() = info.clone();
        self.events.emit(&ThemeEvent::Change(info));
    }

    /// Applies every `theme_changed` event the host sends.
    pub fn listen(self: &Rc<Self>) -> ListenerId {
        let theme: Weak<Self> = Rc::downgrade(self);
        self.bridge.on(names::THEME_CHANGED, move |event| {
            if let (Some(theme), HostEvent::ThemeChanged(info)) = (theme.upgrade(), event) {
                theme.apply_theme_info(info.clone());
            }
        })
    }

    /// Asks the host for a fresh theme; desktop hosts answer with the cached snapshot.
    pub fn request(&self) -> Result<PendingReply<ThemeInfo>, BridgeError> {
        self.bridge.request::<RequestTheme>(|| self.info())
    }

    /// Requests a fresh theme and applies it unless it equals the cached snapshot.
    pub async fn sync(&self) -> Result<(), BridgeError> {
        let info = self.request()?.await?;
        if *self.state.borrow() != info {
            self.apply_theme_info(info);
        }
        Ok(())
    }

    /// Subscribes to theme changes.
    pub fn on(&self, kind: ThemeEventKind, listener: impl Fn(&ThemeEvent) + 'static) -> ListenerId {
        self.events.on(kind, listener)
    }

    /// Removes a listener added with [`Theme::on`].
    pub fn off(&self, kind: ThemeEventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }
}
