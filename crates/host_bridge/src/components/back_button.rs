//! Host back button.

use std::{cell::RefCell, rc::Rc};

use crate::{
    bridge::HostBridge,
    bus::{BusEvent, EventBus, ListenerId},
    error::BridgeError,
    inbound::names,
    outbound::OutboundEvent,
};

use super::commit;

/// Lowest host version with a back button.
pub const BACK_BUTTON_MIN_VERSION: &str = "6.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Back button events.
pub enum BackButtonEvent {
    /// Visibility changed.
    VisibleChange(bool),
    /// The user pressed the button.
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Subscription keys for [`BackButtonEvent`].
pub enum BackButtonEventKind {
    /// [`BackButtonEvent::VisibleChange`].
    VisibleChange,
    /// [`BackButtonEvent::Click`].
    Click,
}

impl BackButtonEventKind {
    /// Name the event is delivered under.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VisibleChange => "visibleChange",
            Self::Click => "click",
        }
    }
}

impl AsRef<str> for BackButtonEventKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl BusEvent for BackButtonEvent {
    fn event_name(&self) -> &str {
        match self {
            Self::VisibleChange(_) => BackButtonEventKind::VisibleChange.as_str(),
            Self::Click => BackButtonEventKind::Click.as_str(),
        }
    }
}

#[derive(Debug)]
/// Back button shown in the host header.
pub struct BackButton {
    bridge: Rc<HostBridge>,
    is_visible: RefCell<bool>,
    events: EventBus<BackButtonEvent>,
}

impl BackButton {
    /// Creates a hidden back button.
    pub fn new(bridge: Rc<HostBridge>) -> Self {
        Self {
            bridge,
            is_visible: RefCell::new(false),
            events: EventBus::new(),
        }
    }

    /// Whether the button is shown.
    pub fn is_visible(&self) -> bool {
        *self.is_visible.borrow()
    }

    /// Shows the button.
    pub fn show(&self) -> Result<(), BridgeError> {
        self.set_visible(true)
    }

    /// Hides the button.
    pub fn hide(&self) -> Result<(), BridgeError> {
        self.set_visible(false)
    }

    /// Commits a visibility change to the host.
    pub fn set_visible(&self, visible: bool) -> Result<(), BridgeError> {
        let changed = commit(
            &self.is_visible,
            |state| state,
            visible,
            || self.bridge.require_version(BACK_BUTTON_MIN_VERSION),
            |is_visible| {
                self.bridge.post_event(&OutboundEvent::SetupBackButton {
                    is_visible: *is_visible,
                })
            },
        )?;
        if changed {
            self.events.emit(&BackButtonEvent::VisibleChange(visible));
        }
        Ok(())
    }

    /// Subscribes to a back button event.
    pub fn on(
        &self,
        kind: BackButtonEventKind,
        listener: impl Fn(&BackButtonEvent) + 'static,
    ) -> ListenerId {
        match kind {
            BackButtonEventKind::Click => self
                .bridge
                .on(names::BACK_BUTTON_PRESSED, move |_| listener(&BackButtonEvent::Click)),
            BackButtonEventKind::VisibleChange => self.events.on(kind, listener),
        }
    }

    /// Removes a listener added with [`BackButton::on`].
    pub fn off(&self, kind: BackButtonEventKind, id: ListenerId) -> bool {
        match kind {
            BackButtonEventKind::Click => self.bridge.off(names::BACK_BUTTON_PRESSED, id),
            BackButtonEventKind::VisibleChange => self.events.off(kind, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::bridge::test_support::bridge_at;

    fn recorded(button: &BackButton) -> Rc<RefCell<Vec<BackButtonEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [BackButtonEventKind::VisibleChange, BackButtonEventKind::Click] {
            let sink = Rc::clone(&log);
            button.on(kind, move |event| sink.borrow_mut().push(*event));
        }
        log
    }

    #[test]
    fn show_posts_once_and_emits_once() {
        let (bridge, env) = bridge_at("6.1");
        let button = BackButton::new(bridge);
        let log = recorded(&button);

        button.show().expect("show");
        button.show().expect("repeat show");

        assert!(button.is_visible());
        assert_eq!(*log.borrow(), vec![BackButtonEvent::VisibleChange(true)]);
        let deliveries = env.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].frame.payload, Some(json!({"is_visible": true})));
    }

    #[test]
    fn hiding_a_hidden_button_is_a_no_op_even_on_old_hosts() {
        let (bridge, env) = bridge_at("6.0");
        let button = BackButton::new(bridge);

        button.hide().expect("no-op hide");
        assert!(env.deliveries().is_empty());
        assert!(matches!(
            button.show(),
            Err(BridgeError::Precondition { .. })
        ));
        assert!(!button.is_visible());
    }

    #[test]
    fn transport_failure_leaves_state_untouched() {
        let (bridge, env) = bridge_at("6.1");
        let button = BackButton::new(bridge);
        let log = recorded(&button);
        env.set_delivery_failure(Some("gone"));

        assert!(button.show().is_err());
        assert!(!button.is_visible());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn clicks_come_from_the_host_press_event() {
        let (bridge, _env) = bridge_at("6.1");
        let button = BackButton::new(Rc::clone(&bridge));
        let log = recorded(&button);

        bridge.receive_event("back_button_pressed", Value::Null);
        assert_eq!(*log.borrow(), vec![BackButtonEvent::Click]);

        let id = button.on(BackButtonEventKind::Click, |_| {});
        assert!(button.off(BackButtonEventKind::Click, id));
        assert!(!button.off(BackButtonEventKind::VisibleChange, id));
    }

    #[test]
    fn listeners_may_commit_re_entrantly() {
        let (bridge, env) = bridge_at("6.1");
        let button = Rc::new(BackButton::new(bridge));

        let inner = Rc::clone(&button);
        button.on(BackButtonEventKind::VisibleChange, move |event| {
            if *event == BackButtonEvent::VisibleChange(true) {
                inner.hide().expect("nested hide");
            }
        });

        button.show().expect("show");
        assert!(!button.is_visible());
        assert_eq!(env.deliveries().len(), 2);
    }
}
