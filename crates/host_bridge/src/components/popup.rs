//! Native popups with up to three buttons.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use futures::future::{FutureExt, LocalBoxFuture};

use crate::{
    bridge::HostBridge,
    bus::{BusEvent, EventBus, ListenerId},
    correlator::PendingReply,
    error::BridgeError,
    inbound::{names, HostEvent},
    outbound::{OutboundEvent, PopupButton, PopupButtonKind, PopupParams},
};

/// Lowest host version with popups.
pub const POPUP_MIN_VERSION: &str = "6.2";

const TITLE_MAX_CHARS: usize = 64;
const MESSAGE_MAX_CHARS: usize = 256;
const MAX_BUTTONS: usize = 3;
const BUTTON_ID_MAX_CHARS: usize = 64;
const BUTTON_TEXT_MAX_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Popup events.
pub enum PopupEvent {
    /// A popup was opened with the prepared parameters.
    Open(PopupParams),
    /// The open flag changed.
    OpenChange(bool),
    /// The popup closed; carries the pressed button id, if any.
    Close(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Subscription keys for [`PopupEvent`].
pub enum PopupEventKind {
    /// [`PopupEvent::Open`].
    Open,
    /// [`PopupEvent::OpenChange`].
    OpenChange,
    /// [`PopupEvent::Close`].
    Close,
}

impl PopupEventKind {
    /// Name the event is delivered under.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::OpenChange => "openChange",
            Self::Close => "close",
        }
    }
}

impl AsRef<str> for PopupEventKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl BusEvent for PopupEvent {
    fn event_name(&self) -> &str {
        match self {
            Self::Open(_) => PopupEventKind::Open.as_str(),
            Self::OpenChange(_) => PopupEventKind::OpenChange.as_str(),
            Self::Close(_) => PopupEventKind::Close.as_str(),
        }
    }
}

fn check_length(
    field: &'static str,
    value: &str,
    range: std::ops::RangeInclusive<usize>,
) -> Result<(), BridgeError> {
    let length = value.chars().count();
    if range.contains(&length) {
        Ok(())
    } else {
        Err(BridgeError::validation(
            field,
            format!(
                "length must be {}..={}, got {length}",
                range.start(),
                range.end()
            ),
        ))
    }
}

/// Validates popup content and fills in the defaults the host expects.
///
/// Title and message are trimmed. An empty button list becomes a single close button.
pub fn prepare_popup_params(params: PopupParams) -> Result<PopupParams, BridgeError> {
    let title = params.title.trim().to_string();
    let message = params.message.trim().to_string();
    check_length("title", &title, 0..=TITLE_MAX_CHARS)?;
    check_length("message", &message, 1..=MESSAGE_MAX_CHARS)?;
    if params.buttons.len() > MAX_BUTTONS {
        return Err(BridgeError::validation(
            "buttons",
            format!("at most {MAX_BUTTONS} buttons, got {}", params.buttons.len()),
        ));
    }

    let buttons = if params.buttons.is_empty() {
        vec![PopupButton::new("", PopupButtonKind::Close)]
    } else {
        for button in &params.buttons {
            check_length("button id", &button.id, 0..=BUTTON_ID_MAX_CHARS)?;
            if let PopupButtonKind::Default { text } | PopupButtonKind::Destructive { text } =
                &button.kind
            {
                check_length("button text", text, 0..=BUTTON_TEXT_MAX_CHARS)?;
            }
        }
        params.buttons
    };

    Ok(PopupParams {
        title,
        message,
        buttons,
    })
}

#[derive(Debug)]
/// Popup service; at most one popup is open at a time.
pub struct Popup {
    bridge: Rc<HostBridge>,
    is_opened: Rc<Cell<bool>>,
    events: EventBus<PopupEvent>,
}

impl Popup {
    /// Creates the service with no popup open.
    pub fn new(bridge: Rc<HostBridge>) -> Self {
        Self {
            bridge,
            is_opened: Rc::new(Cell::new(false)),
            events: EventBus::new(),
        }
    }

    /// Whether a popup is currently shown.
    pub fn is_opened(&self) -> bool {
        self.is_opened.get()
    }

    /// Opens a popup and returns the id of the button that closed it.
    ///
    /// The reply is `None` when the popup was dismissed without pressing a button.
    pub fn show(&self, params: PopupParams) -> Result<PendingReply<Option<String>>, BridgeError> {
        self.bridge.require_version(POPUP_MIN_VERSION)?;
        if self.is_opened.get() {
            return Err(BridgeError::DuplicateOperation { operation: "popup" });
        }
        let prepared = prepare_popup_params(params)?;

        let (sender, reply) = PendingReply::channel();
        let sender = RefCell::new(Some(sender));
        let is_opened = Rc::clone(&self.is_opened);
        let events = self.events.clone();
        let listener = self.bridge.once(names::POPUP_CLOSED, move |event| {
            let button_id = match event {
                HostEvent::PopupClosed { button_id } => button_id.clone(),
                _ => None,
            };
            if is_opened.replace(false) {
                events.emit(&PopupEvent::OpenChange(false));
            }
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(button_id.clone());
            }
            events.emit(&PopupEvent::Close(button_id));
        });

        if let Err(err) = self
            .bridge
            .post_event(&OutboundEvent::OpenPopup(prepared.clone()))
        {
            self.bridge.off(names::POPUP_CLOSED, listener);
            return Err(err);
        }

        self.is_opened.set(true);
        self.events.emit(&PopupEvent::OpenChange(true));
        self.events.emit(&PopupEvent::Open(prepared));
        Ok(reply)
    }

    /// Shows `message` with a single close button; resolves once closed.
    pub fn show_alert(
        &self,
        message: &str,
    ) -> Result<LocalBoxFuture<'static, Result<(), BridgeError>>, BridgeError> {
        let reply = self.show(PopupParams {
            message: message.to_string(),
            buttons: vec![PopupButton::new("", PopupButtonKind::Close)],
            ..PopupParams::default()
        })?;
        Ok(reply.map(|result| result.map(|_| ())).boxed_local())
    }

    /// Shows `message` with OK and Cancel; resolves to whether OK was pressed.
    pub fn show_confirm(
        &self,
        message: &str,
    ) -> Result<LocalBoxFuture<'static, Result<bool, BridgeError>>, BridgeError> {
        let reply = self.show(PopupParams {
            message: message.to_string(),
            buttons: vec![
                PopupButton::new("ok", PopupButtonKind::Ok),
                PopupButton::new("cancel", PopupButtonKind::Cancel),
            ],
            ..PopupParams::default()
        })?;
        Ok(reply
            .map(|result| result.map(|id| id.as_deref() == Some("ok")))
            .boxed_local())
    }

    /// Subscribes to a popup event.
    pub fn on(&self, kind: PopupEventKind, listener: impl Fn(&PopupEvent) + 'static) -> ListenerId {
        self.events.on(kind, listener)
    }

    /// Removes a listener added with [`Popup::on`].
    pub fn off(&self, kind: PopupEventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }
}
