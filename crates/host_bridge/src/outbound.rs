//! Outbound command catalog and the envelope every command is serialized into.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::color::RgbColor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Theme color keys the host accepts in place of explicit colors.
pub enum ThemeColorKey {
    /// Theme background color.
    BgColor,
    /// Theme secondary background color.
    SecondaryBgColor,
}

impl ThemeColorKey {
    /// Wire spelling of the key.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BgColor => "bg_color",
            Self::SecondaryBgColor => "secondary_bg_color",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
/// Application background: a theme key or an explicit RGB color.
pub enum BackgroundColor {
    /// Follows a theme color.
    Key(ThemeColorKey),
    /// Fixed `#rrggbb` color.
    Rgb(RgbColor),
}

impl BackgroundColor {
    /// Parses a theme key or any color format [`RgbColor::parse`] accepts.
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "bg_color" => Ok(Self::Key(ThemeColorKey::BgColor)),
            "secondary_bg_color" => Ok(Self::Key(ThemeColorKey::SecondaryBgColor)),
            other => RgbColor::parse(other).map(Self::Rgb),
        }
    }
}

impl From<ThemeColorKey> for BackgroundColor {
    fn from(key: ThemeColorKey) -> Self {
        Self::Key(key)
    }
}

impl From<RgbColor> for BackgroundColor {
    fn from(color: RgbColor) -> Self {
        Self::Rgb(color)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Complete main button state; the host has no partial update for it.
pub struct MainButtonParams {
    /// Whether the button is shown.
    pub is_visible: bool,
    /// Whether the button reacts to presses.
    pub is_active: bool,
    /// Whether the loading indicator is shown.
    pub is_progress_visible: bool,
    /// Button label.
    pub text: String,
    /// Background color.
    pub color: RgbColor,
    /// Label color.
    pub text_color: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Intensity of an impact haptic.
pub enum ImpactStyle {
    /// Light collision.
    Light,
    /// Medium collision.
    Medium,
    /// Heavy collision.
    Heavy,
    /// Hard collision.
    Rigid,
    /// Soft collision.
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Outcome signalled by a notification haptic.
pub enum NotificationType {
    /// A task failed.
    Error,
    /// A task completed.
    Success,
    /// A task produced a warning.
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Haptic feedback request.
pub enum HapticFeedback {
    /// Collision between interface elements.
    Impact {
        /// Collision intensity.
        impact_style: ImpactStyle,
    },
    /// Task outcome.
    Notification {
        /// Outcome kind.
        notification_type: NotificationType,
    },
    /// Selection changed.
    SelectionChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Popup button style and label.
pub enum PopupButtonKind {
    /// Regular button with a custom label.
    Default {
        /// Label, at most 64 characters.
        text: String,
    },
    /// Button signalling a destructive action.
    Destructive {
        /// Label, at most 64 characters.
        text: String,
    },
    /// Localized "OK" button.
    Ok,
    /// Localized "Close" button.
    Close,
    /// Localized "Cancel" button.
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Popup button as sent to the host.
pub struct PopupButton {
    /// Identifier reported back through `popup_closed`; empty when unset.
    #[serde(default)]
    pub id: String,
    /// Style and label.
    #[serde(flatten)]
    pub kind: PopupButtonKind,
}

impl PopupButton {
    /// Creates a button with an identifier.
    pub fn new(id: impl Into<String>, kind: PopupButtonKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Popup content.
pub struct PopupParams {
    /// Optional heading, at most 64 characters after trimming.
    #[serde(default)]
    pub title: String,
    /// Body text, 1 to 256 characters after trimming.
    pub message: String,
    /// Up to three buttons; a close button is added when empty.
    #[serde(default)]
    pub buttons: Vec<PopupButton>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Every command the bridge can send to the host.
pub enum OutboundEvent {
    /// Frame handshake announcing the bridge is listening.
    IframeReady,
    /// The app finished loading and can be shown.
    Ready,
    /// Expand the viewport to its maximum height.
    Expand,
    /// Close the app.
    Close,
    /// Back button visibility.
    SetupBackButton {
        /// Whether the back button is shown.
        is_visible: bool,
    },
    /// Full main button state.
    SetupMainButton(MainButtonParams),
    /// Closing confirmation dialog toggle.
    SetupClosingBehavior {
        /// Whether closing asks for confirmation.
        need_confirmation: bool,
    },
    /// Application background color.
    SetBackgroundColor {
        /// Theme key or explicit color.
        color: BackgroundColor,
    },
    /// Application header color.
    SetHeaderColor {
        /// Theme key to follow.
        color_key: ThemeColorKey,
    },
    /// Haptic feedback.
    TriggerHapticFeedback(HapticFeedback),
    /// Native popup.
    OpenPopup(PopupParams),
    /// Ask the host to answer with `theme_changed`.
    RequestTheme,
    /// Ask the host to answer with `viewport_changed`.
    RequestViewport,
    /// Send data to the bot and close.
    DataSend {
        /// Payload, 1 to 4096 bytes.
        data: String,
    },
    /// Open a link in an external browser.
    OpenLink {
        /// Absolute URL.
        url: String,
    },
    /// Open a `t.me` link inside the host.
    OpenTelegramLink {
        /// Path and query of the link.
        url: String,
    },
}

impl OutboundEvent {
    /// Host protocol name of the command.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IframeReady => "iframe_ready",
            Self::Ready => "web_app_ready",
            Self::Expand => "web_app_expand",
            Self::Close => "web_app_close",
            Self::SetupBackButton { .. } => "web_app_setup_back_button",
            Self::SetupMainButton(_) => "web_app_setup_main_button",
            Self::SetupClosingBehavior { .. } => "web_app_setup_closing_behavior",
            Self::SetBackgroundColor { .. } => "web_app_set_background_color",
            Self::SetHeaderColor { .. } => "web_app_set_header_color",
            Self::TriggerHapticFeedback(_) => "web_app_trigger_haptic_feedback",
            Self::OpenPopup(_) => "web_app_open_popup",
            Self::RequestTheme => "web_app_request_theme",
            Self::RequestViewport => "web_app_request_viewport",
            Self::DataSend { .. } => "web_app_data_send",
            Self::OpenLink { .. } => "web_app_open_link",
            Self::OpenTelegramLink { .. } => "web_app_open_tg_link",
        }
    }

    /// Command payload, or `None` for commands that carry nothing.
    pub fn payload(&self) -> Result<Option<Value>, String> {
        let value = match self {
            Self::IframeReady
            | Self::Ready
            | Self::Expand
            | Self::Close
            | Self::RequestTheme
            | Self::RequestViewport => return Ok(None),
            Self::SetupBackButton { is_visible } => json!({ "is_visible": is_visible }),
            Self::SetupMainButton(params) => to_value(params)?,
            Self::SetupClosingBehavior { need_confirmation } => {
                json!({ "need_confirmation": need_confirmation })
            }
            Self::SetBackgroundColor { color } => json!({ "color": to_value(color)? }),
            Self::SetHeaderColor { color_key } => json!({ "color_key": color_key.as_str() }),
            Self::TriggerHapticFeedback(feedback) => to_value(feedback)?,
            Self::OpenPopup(params) => to_value(params)?,
            Self::DataSend { data } => json!({ "data": data }),
            Self::OpenLink { url } | Self::OpenTelegramLink { url } => json!({ "url": url }),
        };
        Ok(Some(value))
    }

    /// Builds the wire frame for this command.
    pub fn to_frame(&self) -> Result<OutboundFrame, String> {
        Ok(OutboundFrame::new(self.name(), self.payload()?))
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, PartialEq)]
/// Outbound message ready for delivery: a protocol name and a JSON payload.
pub struct OutboundFrame {
    /// Host protocol event name.
    pub name: String,
    /// Payload; `None` is sent as an empty string.
    pub payload: Option<Value>,
}

impl OutboundFrame {
    /// Creates a frame.
    pub fn new(name: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Payload as delivered in `eventData`: the JSON value, or `""` when absent.
    pub fn event_data(&self) -> Value {
        self.payload
            .clone()
            .unwrap_or_else(|| Value::String(String::new()))
    }

    /// Payload serialized for the native proxy's second argument.
    pub fn serialized_payload(&self) -> String {
        match &self.payload {
            Some(value) => value.to_string(),
            None => String::new(),
        }
    }

    /// `{"eventType": name, "eventData": payload}` string used by the frame and external channels.
    pub fn envelope(&self) -> String {
        json!({ "eventType": self.name, "eventData": self.event_data() }).to_string()
    }
}
