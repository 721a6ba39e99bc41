//! Visible viewport geometry reported by the host.

use std::{
    cell::Cell,
    rc::{Rc, Weak},
};

use crate::{
    bridge::HostBridge,
    bus::{BusEvent, EventBus, ListenerId},
    correlator::{PendingReply, RequestViewport},
    error::BridgeError,
    inbound::{names, HostEvent, ViewportInfo},
    outbound::OutboundEvent,
};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Viewport events.
pub enum ViewportEvent {
    /// Visible height changed.
    HeightChange(f64),
    /// Last stable height changed.
    StableHeightChange(f64),
    /// Expansion flag changed.
    ExpansionChange(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Subscription keys for [`ViewportEvent`].
pub enum ViewportEventKind {
    /// [`ViewportEvent::HeightChange`].
    HeightChange,
    /// [`ViewportEvent::StableHeightChange`].
    StableHeightChange,
    /// [`ViewportEvent::ExpansionChange`].
    ExpansionChange,
}

impl ViewportEventKind {
    /// Name the event is delivered under.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeightChange => "heightChange",
            Self::StableHeightChange => "stableHeightChange",
            Self::ExpansionChange => "expansionChange",
        }
    }
}

impl AsRef<str> for ViewportEventKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl BusEvent for ViewportEvent {
    fn event_name(&self) -> &str {
        match self {
            Self::HeightChange(_) => ViewportEventKind::HeightChange.as_str(),
            Self::StableHeightChange(_) => ViewportEventKind::StableHeightChange.as_str(),
            Self::ExpansionChange(_) => ViewportEventKind::ExpansionChange.as_str(),
        }
    }
}

#[derive(Debug)]
/// Viewport service. Values change only through host reports, never through setters.
pub struct Viewport {
    bridge: Rc<HostBridge>,
    height: Cell<f64>,
    stable_height: Cell<f64>,
    is_expanded: Cell<bool>,
    events: EventBus<ViewportEvent>,
}

impl Viewport {
    /// Creates a collapsed zero-height viewport.
    pub fn new(bridge: Rc<HostBridge>) -> Rc<Self> {
        Rc::new(Self {
            bridge,
            height: Cell::new(0.0),
            stable_height: Cell::new(0.0),
            is_expanded: Cell::new(false),
            events: EventBus::new(),
        })
    }

    /// Current visible height.
    pub fn height(&self) -> f64 {
        self.height.get()
    }

    /// Height at the last stable state.
    pub fn stable_height(&self) -> f64 {
        self.stable_height.get()
    }

    /// Whether the viewport is expanded to its maximum height.
    pub fn is_expanded(&self) -> bool {
        self.is_expanded.get()
    }

    /// Whether the current height equals the stable height.
    pub fn is_stable(&self) -> bool {
        self.height.get() == self.stable_height.get()
    }

    /// Applies a host report; only changed fields emit, and the stable height follows only
    /// stable reports.
    pub fn apply_viewport_info(&self, info: ViewportInfo) {
        if self.height.replace(info.height) != info.height {
            self.events.emit(&ViewportEvent::HeightChange(info.height));
        }
        if self.is_expanded.replace(info.is_expanded) != info.is_expanded {
            self.events
                .emit(&ViewportEvent::ExpansionChange(info.is_expanded));
        }
        if info.is_stable && self.stable_height.replace(info.height) != info.height {
            self.events
                .emit(&ViewportEvent::StableHeightChange(info.height));
        }
    }

    /// Asks the host to expand the viewport. Fire-and-forget; the host reports the result.
    pub fn expand(&self) -> Result<(), BridgeError> {
        self.bridge.post_event(&OutboundEvent::Expand)
    }

    /// Applies every `viewport_changed` event the host sends.
    pub fn listen(self: &Rc<Self>) -> ListenerId {
        let viewport: Weak<Self> = Rc::downgrade(self);
        self.bridge.on(names::VIEWPORT_CHANGED, move |event| {
            if let (Some(viewport), HostEvent::ViewportChanged(info)) = (viewport.upgrade(), event)
            {
                viewport.apply_viewport_info(*info);
            }
        })
    }

    /// Treats window resizes as stable, expanded reports of the new inner height.
    pub fn listen_resize(self: &Rc<Self>) {
        let viewport: Weak<Self> = Rc::downgrade(self);
        self.bridge.env().on_resize(Rc::new(move |height: f64| {
            if let Some(viewport) = viewport.upgrade() {
                viewport.apply_viewport_info(ViewportInfo {
                    height,
                    is_expanded: true,
                    is_stable: true,
                });
            }
        }));
    }

    /// Asks the host for fresh geometry; desktop hosts answer with the window height.
    pub fn request(&self) -> Result<PendingReply<ViewportInfo>, BridgeError> {
        let env = Rc::clone(self.bridge.env());
        self.bridge.request::<RequestViewport>(move || ViewportInfo {
            height: env.viewport_height(),
            is_expanded: true,
            is_stable: true,
        })
    }

    /// Requests fresh geometry and applies it.
    pub async fn sync(&self) -> Result<(), BridgeError> {
        let info = self.request()?.await?;
        self.apply_viewport_info(info);
        Ok(())
    }

    /// Subscribes to a viewport event.
    pub fn on(
        &self,
        kind: ViewportEventKind,
        listener: impl Fn(&ViewportEvent) + 'static,
    ) -> ListenerId {
        self.events.on(kind, listener)
    }

    /// Removes a listener added with [`Viewport::on`].
    pub fn off(&self, kind: ViewportEventKind, id: ListenerId) -> bool {
        self.events.off(kind, id)
    }
}
