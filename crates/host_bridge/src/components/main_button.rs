//! Host main button.
//!
//! The host has no partial update for this button, so every committed field change republishes
//! the complete state.

use std::{cell::RefCell, rc::Rc};

use crate::{
    bridge::HostBridge,
    bus::{BusEvent, EventBus, ListenerId},
    color::RgbColor,
    error::BridgeError,
    inbound::{names, ThemeParams},
    outbound::{MainButtonParams, OutboundEvent},
};

use super::commit;

/// Maximum label length in characters.
pub const MAIN_BUTTON_TEXT_MAX_CHARS: usize = 64;

const DEFAULT_TEXT: &str = "CONTINUE";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Main button events.
pub enum MainButtonEvent {
    /// Active flag changed.
    ActiveChange(bool),
    /// Background color changed.
    ColorChange(RgbColor),
    /// Loading indicator visibility changed.
    ProgressVisibleChange(bool),
    /// Label changed.
    TextChange(String),
    /// Label color changed.
    TextColorChange(RgbColor),
    /// Visibility changed.
    VisibleChange(bool),
    /// The user pressed the button.
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Subscription keys for [`MainButtonEvent`].
pub enum MainButtonEventKind {
    /// [`MainButtonEvent::ActiveChange`].
    ActiveChange,
    /// [`MainButtonEvent::ColorChange`].
    ColorChange,
    /// [`MainButtonEvent::ProgressVisibleChange`].
    ProgressVisibleChange,
    /// [`MainButtonEvent::TextChange`].
    TextChange,
    /// [`MainButtonEvent::TextColorChange`].
    TextColorChange,
    /// [`MainButtonEvent::VisibleChange`].
    VisibleChange,
    /// [`MainButtonEvent::Click`].
    Click,
}

impl MainButtonEventKind {
    /// Name the event is delivered under.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ActiveChange => "activeChange",
            Self::ColorChange => "colorChange",
            Self::ProgressVisibleChange => "progressVisibleChange",
            Self::TextChange => "textChange",
            Self::TextColorChange => "textColorChange",
            Self::VisibleChange => "visibleChange",
            Self::Click => "click",
        }
    }
}

impl AsRef<str> for MainButtonEventKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl MainButtonEvent {
    /// Subscription key of this event.
    pub fn kind(&self) -> MainButtonEventKind {
        match self {
            Self::ActiveChange(_) => MainButtonEventKind::ActiveChange,
            Self::ColorChange(_) => MainButtonEventKind::ColorChange,
            Self::ProgressVisibleChange(_) => MainButtonEventKind::ProgressVisibleChange,
            Self::TextChange(_) => MainButtonEventKind::TextChange,
            Self::TextColorChange(_) => MainButtonEventKind::TextColorChange,
            Self::VisibleChange(_) => MainButtonEventKind::VisibleChange,
            Self::Click => MainButtonEventKind::Click,
        }
    }
}

impl BusEvent for MainButtonEvent {
    fn event_name(&self) -> &str {
        self.kind().as_str()
    }
}

fn default_params() -> MainButtonParams {
    MainButtonParams {
        is_visible: false,
        is_active: true,
        is_progress_visible: false,
        text: DEFAULT_TEXT.to_string(),
        color: RgbColor::from_rgb(0x24, 0x81, 0xcc),
        text_color: RgbColor::from_rgb(0xff, 0xff, 0xff),
    }
}

#[derive(Debug)]
/// Main button pinned to the bottom of the host viewport.
pub struct MainButton {
    bridge: Rc<HostBridge>,
    state: RefCell<MainButtonParams>,
    events: EventBus<MainButtonEvent>,
}

impl MainButton {
    /// Creates a hidden, active button labelled `CONTINUE`.
    pub fn new(bridge: Rc<HostBridge>) -> Self {
        Self {
            bridge,
            state: RefCell::new(default_params()),
            events: EventBus::new(),
        }
    }

    /// Full cached state.
    pub fn params(&self) -> MainButtonParams {
        self.state.borrow().clone()
    }

    /// Background color.
    pub fn color(&self) -> RgbColor {
        self.state.borrow().color.clone()
    }

    /// Label color.
    pub fn text_color(&self) -> RgbColor {
        self.state.borrow().text_color.clone()
    }

    /// Label.
    pub fn text(&self) -> String {
        self.state.borrow().text.clone()
    }

    /// Whether the button reacts to presses.
    pub fn is_active(&self) -> bool {
        self.state.borrow().is_active
    }

    /// Whether the button is shown.
    pub fn is_visible(&self) -> bool {
        self.state.borrow().is_visible
    }

    /// Whether the loading indicator is shown.
    pub fn is_progress_visible(&self) -> bool {
        self.state.borrow().is_progress_visible
    }

    /// Sets the background color from any supported color format.
    pub fn set_color(&self, color: &str) -> Result<(), BridgeError> {
        let color =
            RgbColor::parse(color).map_err(|reason| BridgeError::validation("color", reason))?;
        self.update(|s| &mut s.color, color, MainButtonEvent::ColorChange)
    }

    /// Sets the label color from any supported color format.
    pub fn set_text_color(&self, color: &str) -> Result<(), BridgeError> {
        let color =
            RgbColor::parse(color).map_err(|reason| BridgeError::validation("text color", reason))?;
        self.update(|s| &mut s.text_color, color, MainButtonEvent::TextColorChange)
    }

    /// Sets the label; it is trimmed and must hold 1 to 64 characters.
    pub fn set_text(&self, text: &str) -> Result<(), BridgeError> {
        let text = text.trim();
        let length = text.chars().count();
        if !(1..=MAIN_BUTTON_TEXT_MAX_CHARS).contains(&length) {
            return Err(BridgeError::validation(
                "text",
                format!("length must be 1..={MAIN_BUTTON_TEXT_MAX_CHARS}, got {length}"),
            ));
        }
        self.update(|s| &mut s.text, text.to_string(), MainButtonEvent::TextChange)
    }

    /// Shows the button.
    pub fn show(&self) -> Result<(), BridgeError> {
        self.update(|s| &mut s.is_visible, true, MainButtonEvent::VisibleChange)
    }

    /// Hides the button.
    pub fn hide(&self) -> Result<(), BridgeError> {
        self.update(|s| &mut s.is_visible, false, MainButtonEvent::VisibleChange)
    }

    /// Makes the button react to presses.
    pub fn enable(&self) -> Result<(), BridgeError> {
        self.update(|s| &mut s.is_active, true, MainButtonEvent::ActiveChange)
    }

    /// Makes the button ignore presses.
    pub fn disable(&self) -> Result<(), BridgeError> {
        self.update(|s| &mut s.is_active, false, MainButtonEvent::ActiveChange)
    }

    /// Shows the loading indicator.
    pub fn show_progress(&self) -> Result<(), BridgeError> {
        self.update(
            |s| &mut s.is_progress_visible,
            true,
            MainButtonEvent::ProgressVisibleChange,
        )
    }

    /// Hides the loading indicator.
    pub fn hide_progress(&self) -> Result<(), BridgeError> {
        self.update(
            |s| &mut s.is_progress_visible,
            false,
            MainButtonEvent::ProgressVisibleChange,
        )
    }

    /// Copies button colors from a theme without posting or emitting anything.
    pub fn apply_theme_info(&self, theme: &ThemeParams) {
        let mut state = self.state.borrow_mut();
        if let Some(color) = &theme.button_color {
            state.color = color.clone();
        }
        if let Some(color) = &theme.button_text_color {
            state.text_color = color.clone();
        }
    }

    fn update<T: PartialEq + Clone>(
        &self,
        field: impl Fn(&mut MainButtonParams) -> &mut T,
        value: T,
        event: impl FnOnce(T) -> MainButtonEvent,
    ) -> Result<(), BridgeError> {
        let changed = commit(
            &self.state,
            field,
            value.clone(),
            || Ok(()),
            |params| {
                self.bridge
                    .post_event(&OutboundEvent::SetupMainButton(params.clone()))
            },
        )?;
        if changed {
            self.events.emit(&event(value));
        }
        Ok(())
    }

    /// Subscribes to a main button event.
    pub fn on(
        &self,
        kind: MainButtonEventKind,
        listener: impl Fn(&MainButtonEvent) + 'static,
    ) -> ListenerId {
        match kind {
            MainButtonEventKind::Click => self
                .bridge
                .on(names::MAIN_BUTTON_PRESSED, move |_| listener(&MainButtonEvent::Click)),
            _ => self.events.on(kind, listener),
        }
    }

    /// Removes a listener added with [`MainButton::on`].
    pub fn off(&self, kind: MainButtonEventKind, id: ListenerId) -> bool {
        match kind {
            MainButtonEventKind::Click => self.bridge.off(names::MAIN_BUTTON_PRESSED, id),
            _ => self.events.off(kind, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::{bridge::test_support::bridge_at, transport::MemoryHostEnvironment};

    type Fixture = (
        MainButton,
        MemoryHostEnvironment,
        Rc<RefCell<Vec<MainButtonEvent>>>,
    );

    fn button() -> Fixture {
        let (bridge, env) = bridge_at("6.0");
        let button = MainButton::new(bridge);
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            MainButtonEventKind::ActiveChange,
            MainButtonEventKind::ColorChange,
            MainButtonEventKind::ProgressVisibleChange,
            MainButtonEventKind::TextChange,
            MainButtonEventKind::TextColorChange,
            MainButtonEventKind::VisibleChange,
            MainButtonEventKind::Click,
        ] {
            let sink = Rc::clone(&log);
            button.on(kind, move |event| sink.borrow_mut().push(event.clone()));
        }
        (button, env, log)
    }

    #[test]
    fn defaults_match_the_host_defaults() {
        let (button, _, _) = button();
        assert_eq!(button.color().as_str(), "#2481cc");
        assert_eq!(button.text_color().as_str(), "#ffffff");
        assert_eq!(button.text(), "CONTINUE");
        assert!(button.is_active());
        assert!(!button.is_visible());
        assert!(!button.is_progress_visible());
    }

    #[test]
    fn every_commit_republishes_the_full_state() {
        let (button, env, log) = button();

        button.show().expect("show");
        button.set_text("Pay $5").expect("text");

        let payloads: Vec<_> = env
            .deliveries()
            .into_iter()
            .map(|d| d.frame.payload.unwrap_or(Value::Null))
            .collect();
        assert_eq!(
            payloads,
            vec![
                json!({
                    "is_visible": true, "is_active": true, "is_progress_visible": false,
                    "text": "CONTINUE", "color": "#2481cc", "text_color": "#ffffff",
                }),
                json!({
                    "is_visible": true, "is_active": true, "is_progress_visible": false,
                    "text": "Pay $5", "color": "#2481cc", "text_color": "#ffffff",
                }),
            ]
        );
        assert_eq!(
            *log.borrow(),
            vec![
                MainButtonEvent::VisibleChange(true),
                MainButtonEvent::TextChange("Pay $5".to_string()),
            ]
        );
    }

    #[test]
    fn unchanged_values_are_no_ops() {
        let (button, env, log) = button();

        button.hide().expect("hide");
        button.enable().expect("enable");
        button.hide_progress().expect("hide progress");
        button.set_text("  CONTINUE ").expect("same text");
        button.set_color("#2481CC").expect("same color");
        button.set_text_color("rgb(255,255,255)").expect("same text color");

        assert!(env.deliveries().is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn text_length_is_checked_after_trimming() {
        let (button, env, _) = button();

        assert!(matches!(button.set_text("   "), Err(BridgeError::Validation { .. })));
        assert!(matches!(
            button.set_text(&"x".repeat(65)),
            Err(BridgeError::Validation { .. })
        ));
        assert!(env.deliveries().is_empty());

        button.set_text(&"é".repeat(64)).expect("64 chars");
        button.set_text(" a ").expect("1 char");
        assert_eq!(button.text(), "a");
    }

    #[test]
    fn colors_are_validated_and_normalized() {
        let (button, _, log) = button();

        assert!(matches!(button.set_color("teal"), Err(BridgeError::Validation { .. })));
        button.set_color("#000").expect("color");

        assert_eq!(button.color().as_str(), "#000000");
        assert_eq!(
            *log.borrow(),
            vec![MainButtonEvent::ColorChange(RgbColor::parse("#000000").expect("color"))]
        );
    }

    #[test]
    fn theme_colors_apply_silently() {
        let (button, env, log) = button();
        let theme = ThemeParams {
            button_color: RgbColor::parse("#ff0000").ok(),
            button_text_color: None,
            ..ThemeParams::default()
        };

        button.apply_theme_info(&theme);

        assert_eq!(button.color().as_str(), "#ff0000");
        assert_eq!(button.text_color().as_str(), "#ffffff");
        assert!(env.deliveries().is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn failed_commits_roll_back() {
        let (button, env, log) = button();
        env.set_delivery_failure(Some("gone"));

        assert!(button.show_progress().is_err());
        assert!(!button.is_progress_visible());
        assert!(log.borrow().is_empty());
    }
}
