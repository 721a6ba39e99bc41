//! Inbound frame acceptance and the tagged decoder for host events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{bus::BusEvent, color::RgbColor, error::DecodeError};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Theme colors recognized by the bridge; unparsable or missing colors are `None`.
pub struct ThemeParams {
    /// `bg_color`.
    pub bg_color: Option<RgbColor>,
    /// `button_color`.
    pub button_color: Option<RgbColor>,
    /// `button_text_color`.
    pub button_text_color: Option<RgbColor>,
    /// `hint_color`.
    pub hint_color: Option<RgbColor>,
    /// `link_color`.
    pub link_color: Option<RgbColor>,
    /// `secondary_bg_color`.
    pub secondary_bg_color: Option<RgbColor>,
    /// `text_color`.
    pub text_color: Option<RgbColor>,
}

impl ThemeParams {
    /// Extracts the known colors from a theme object.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let color = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .and_then(|raw| RgbColor::parse(raw).ok())
        };
        Self {
            bg_color: color("bg_color"),
            button_color: color("button_color"),
            button_text_color: color("button_text_color"),
            hint_color: color("hint_color"),
            link_color: color("link_color"),
            secondary_bg_color: color("secondary_bg_color"),
            text_color: color("text_color"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
/// Theme snapshot as delivered by the host.
pub struct ThemeInfo {
    /// JSON text the snapshot was built from.
    pub raw: String,
    /// Typed colors.
    pub params: ThemeParams,
    /// Every key the host sent, untyped.
    pub unsafe_params: Map<String, Value>,
}

impl ThemeInfo {
    /// Builds a snapshot from an already decoded theme object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            raw: Value::Object(map.clone()).to_string(),
            params: ThemeParams::from_map(&map),
            unsafe_params: map,
        }
    }

    /// Parses theme JSON text, keeping `raw` verbatim.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Self {
                raw: raw.to_string(),
                params: ThemeParams::from_map(&map),
                unsafe_params: map,
            }),
            Ok(other) => Err(DecodeError::Payload {
                event: "theme_changed".to_string(),
                reason: format!("theme params must be an object, got {other}"),
            }),
            Err(err) => Err(DecodeError::Json(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Viewport snapshot as delivered by the host.
pub struct ViewportInfo {
    /// Visible height in CSS pixels.
    pub height: f64,
    /// Whether the viewport is expanded to its maximum height.
    pub is_expanded: bool,
    /// Whether the height stopped changing.
    #[serde(rename = "is_state_stable")]
    pub is_stable: bool,
}

#[derive(Debug, Clone, PartialEq)]
/// Decoded host event.
pub enum HostEvent {
    /// `back_button_pressed`.
    BackButtonPressed,
    /// `main_button_pressed`.
    MainButtonPressed,
    /// `settings_button_pressed`.
    SettingsButtonPressed,
    /// `popup_closed`; `None` when dismissed without a button.
    PopupClosed {
        /// Identifier of the pressed button.
        button_id: Option<String>,
    },
    /// `theme_changed`.
    ThemeChanged(ThemeInfo),
    /// `viewport_changed`.
    ViewportChanged(ViewportInfo),
    /// `set_custom_style` with the stylesheet text.
    CustomStyle(String),
    /// `invoice_closed`.
    InvoiceClosed {
        /// Invoice slug.
        slug: String,
        /// Final invoice status.
        status: String,
    },
    /// Any event name the bridge has no typed variant for.
    Custom {
        /// Event name as received.
        name: String,
        /// Payload as received.
        payload: Value,
    },
}

/// Wire names of the typed host events.
pub mod names {
    /// Back button press.
    pub const BACK_BUTTON_PRESSED: &str = "back_button_pressed";
    /// Main button press.
    pub const MAIN_BUTTON_PRESSED: &str = "main_button_pressed";
    /// Settings menu item press.
    pub const SETTINGS_BUTTON_PRESSED: &str = "settings_button_pressed";
    /// Popup dismissal.
    pub const POPUP_CLOSED: &str = "popup_closed";
    /// Theme update or reply to a theme request.
    pub const THEME_CHANGED: &str = "theme_changed";
    /// Viewport update or reply to a viewport request.
    pub const VIEWPORT_CHANGED: &str = "viewport_changed";
    /// Custom stylesheet push.
    pub const SET_CUSTOM_STYLE: &str = "set_custom_style";
    /// Invoice dismissal.
    pub const INVOICE_CLOSED: &str = "invoice_closed";
}

impl BusEvent for HostEvent {
    fn event_name(&self) -> &str {
        match self {
            Self::BackButtonPressed => names::BACK_BUTTON_PRESSED,
            Self::MainButtonPressed => names::MAIN_BUTTON_PRESSED,
            Self::SettingsButtonPressed => names::SETTINGS_BUTTON_PRESSED,
            Self::PopupClosed { .. } => names::POPUP_CLOSED,
            Self::ThemeChanged(_) => names::THEME_CHANGED,
            Self::ViewportChanged(_) => names::VIEWPORT_CHANGED,
            Self::CustomStyle(_) => names::SET_CUSTOM_STYLE,
            Self::InvoiceClosed { .. } => names::INVOICE_CLOSED,
            Self::Custom { name, .. } => name,
        }
    }
}

/// Decodes a payload according to the schema registered for `name`.
///
/// Unknown names decode to [`HostEvent::Custom`] and never fail.
pub fn decode(name: &str, payload: Value) -> Result<HostEvent, DecodeError> {
    match name {
        names::BACK_BUTTON_PRESSED => Ok(HostEvent::BackButtonPressed),
        names::MAIN_BUTTON_PRESSED => Ok(HostEvent::MainButtonPressed),
        names::SETTINGS_BUTTON_PRESSED => Ok(HostEvent::SettingsButtonPressed),
        names::POPUP_CLOSED => decode_popup_closed(payload),
        names::THEME_CHANGED => {
            let mut object = object_payload(name, payload)?;
            match object.remove("theme_params") {
                Some(Value::Object(theme)) => Ok(HostEvent::ThemeChanged(ThemeInfo::from_map(theme))),
                _ => Err(payload_error(name, "`theme_params` must be an object")),
            }
        }
        names::VIEWPORT_CHANGED => {
            let object = object_payload(name, payload)?;
            let info: ViewportInfo = serde_json::from_value(Value::Object(object))
                .map_err(|err| payload_error(name, err.to_string()))?;
            if !info.height.is_finite() || info.height < 0.0 {
                return Err(payload_error(
                    name,
                    format!("`height` must be a non-negative number, got {}", info.height),
                ));
            }
            Ok(HostEvent::ViewportChanged(info))
        }
        names::SET_CUSTOM_STYLE => match payload {
            Value::String(css) => Ok(HostEvent::CustomStyle(css)),
            other => Err(payload_error(name, format!("expected a string, got {other}"))),
        },
        names::INVOICE_CLOSED => {
            let object = object_payload(name, payload)?;
            let field = |key: &str| {
                object
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| payload_error(name, format!("`{key}` must be a string")))
            };
            Ok(HostEvent::InvoiceClosed {
                slug: field("slug")?,
                status: field("status")?,
            })
        }
        _ => Ok(HostEvent::Custom {
            name: name.to_string(),
            payload,
        }),
    }
}

fn decode_popup_closed(payload: Value) -> Result<HostEvent, DecodeError> {
    if payload.is_null() {
        return Ok(HostEvent::PopupClosed { button_id: None });
    }
    let object = object_payload(names::POPUP_CLOSED, payload)?;
    let button_id = match object.get("button_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id.clone()),
        Some(other) => {
            return Err(payload_error(
                names::POPUP_CLOSED,
                format!("`button_id` must be a string, got {other}"),
            ))
        }
    };
    Ok(HostEvent::PopupClosed { button_id })
}

/// Accepts an object, or a string holding a JSON object.
fn object_payload(name: &str, payload: Value) -> Result<Map<String, Value>, DecodeError> {
    match payload {
        Value::Object(object) => Ok(object),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(object)) => Ok(object),
            _ => Err(payload_error(name, "string payload does not hold a JSON object")),
        },
        other => Err(payload_error(name, format!("expected an object, got {other}"))),
    }
}

fn payload_error(name: &str, reason: impl Into<String>) -> DecodeError {
    DecodeError::Payload {
        event: name.to_string(),
        reason: reason.into(),
    }
}

/// Accepts a posted frame message and splits it into an event name and payload.
///
/// The message must be a JSON object with a string `eventType` and a string `eventData`. An empty
/// `eventData` carries no payload and becomes `null`.
pub fn parse_frame_message(raw: &str) -> Result<(String, Value), DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(|err| DecodeError::Json(err.to_string()))?;
    let Value::Object(mut envelope) = value else {
        return Err(DecodeError::Envelope("frame is not an object".to_string()));
    };
    let name = match envelope.remove("eventType") {
        Some(Value::String(name)) => name,
        _ => return Err(DecodeError::Envelope("`eventType` must be a string".to_string())),
    };
    let payload = match envelope.remove("eventData") {
        Some(Value::String(data)) if data.is_empty() => Value::Null,
        Some(data @ Value::String(_)) => data,
        Some(other) => {
            return Err(DecodeError::Envelope(format!(
                "`eventData` must be a string, got {other}"
            )))
        }
        None => return Err(DecodeError::Envelope("`eventData` is missing".to_string())),
    };
    Ok((name, payload))
}
