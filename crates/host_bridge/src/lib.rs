//! Typed host-bridge layer for sandboxed WebView mini-apps.
//!
//! This crate holds everything that does not touch the browser: the event bus, outbound command
//! catalog and dispatcher, inbound decoder, awaitable request correlation, the synchronized state
//! components, launch data parsing, and the bootstrap sequence. Browser delivery lives in
//! `host_bridge_web`, which implements [`HostEnvironment`] on top of `web-sys`.
//!
//! All state is single-threaded (`Rc`/`RefCell`) and no borrow is held while listeners run or
//! frames are delivered, so listeners may call back into any service.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod bootstrap;
pub mod bridge;
pub mod bus;
pub mod color;
pub mod components;
pub mod config;
pub mod correlator;
pub mod error;
pub mod inbound;
pub mod launch_data;
pub mod outbound;
pub mod transport;
pub mod version;

pub use bootstrap::{bootstrap, HostSession};
pub use bridge::{HostBridge, DEFAULT_HOST_PLATFORM, DEFAULT_HOST_VERSION, DESKTOP_PLATFORM};
pub use bus::{BusEvent, EventBus, ListenerId};
pub use color::RgbColor;
pub use components::{
    back_button::{BackButton, BackButtonEvent, BackButtonEventKind},
    haptic::HapticFeedback,
    host_app::{HostApp, HostAppEvent, HostAppEventKind},
    main_button::{MainButton, MainButtonEvent, MainButtonEventKind},
    popup::{prepare_popup_params, Popup, PopupEvent, PopupEventKind},
    theme::{ColorScheme, Theme, ThemeEvent, ThemeEventKind},
    viewport::{Viewport, ViewportEvent, ViewportEventKind},
};
pub use config::{BridgeConfig, LaunchParamKeys, DEFAULT_SESSION_STORAGE_KEY};
pub use correlator::{AwaitableRequest, PendingReply, RequestTheme, RequestViewport};
pub use error::{BridgeError, DecodeError, LaunchDataError};
pub use inbound::{HostEvent, ThemeInfo, ThemeParams, ViewportInfo};
pub use launch_data::{Chat, ChatType, LaunchData, LaunchDataStore, User};
pub use outbound::{
    BackgroundColor, ImpactStyle, MainButtonParams, NotificationType, OutboundEvent,
    OutboundFrame, PopupButton, PopupButtonKind, PopupParams, ThemeColorKey,
};
pub use transport::{
    Delivery, HostEnvironment, InboundMessage, InboundReceiver, InboundRoute,
    MemoryHostEnvironment, NavigationTarget, NoopHostEnvironment, ResizeListener,
    TransportChannel, TransportChannels,
};
pub use version::{compare_versions, HostVersion};
