//! Request/response correlation for the awaitable host commands.
//!
//! The host answers a theme or viewport request with the same event it uses for unsolicited
//! updates, without echoing any token. Requests of one kind are therefore coalesced: while one
//! is outstanding, later callers join it and the next reply resolves all of them.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::channel::oneshot;

use crate::{
    error::BridgeError,
    inbound::{names, HostEvent, ThemeInfo, ViewportInfo},
    outbound::OutboundEvent,
};

/// Outbound command whose answer arrives as an inbound event.
pub trait AwaitableRequest {
    /// Value the reply event resolves to.
    type Reply: Clone + 'static;

    /// Stable label used as the coalescing key.
    const KIND: &'static str;

    /// Command posted to the host.
    fn command() -> OutboundEvent;

    /// Inbound event name carrying the answer.
    fn reply_event() -> &'static str;

    /// Extracts the answer from a reply event.
    fn extract(event: &HostEvent) -> Option<Self::Reply>;
}

#[derive(Debug, Clone, Copy)]
/// `web_app_request_theme`, answered by `theme_changed`.
pub struct RequestTheme;

impl AwaitableRequest for RequestTheme {
    type Reply = ThemeInfo;

    const KIND: &'static str = "theme";

    fn command() -> OutboundEvent {
        OutboundEvent::RequestTheme
    }

    fn reply_event() -> &'static str {
        names::THEME_CHANGED
    }

    fn extract(event: &HostEvent) -> Option<Self::Reply> {
        match event {
            HostEvent::ThemeChanged(info) => Some(info.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
/// `web_app_request_viewport`, answered by `viewport_changed`.
pub struct RequestViewport;

impl AwaitableRequest for RequestViewport {
    type Reply = ViewportInfo;

    const KIND: &'static str = "viewport";

    fn command() -> OutboundEvent {
        OutboundEvent::RequestViewport
    }

    fn reply_event() -> &'static str {
        names::VIEWPORT_CHANGED
    }

    fn extract(event: &HostEvent) -> Option<Self::Reply> {
        match event {
            HostEvent::ViewportChanged(info) => Some(*info),
            _ => None,
        }
    }
}

/// Future resolving to a host reply, or [`BridgeError::ReplyAbandoned`] when the slot is dropped.
#[must_use = "a pending reply does nothing unless awaited"]
pub struct PendingReply<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> PendingReply<T> {
    /// Creates a connected sender/reply pair.
    pub(crate) fn channel() -> (oneshot::Sender<T>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    /// Reply that is already resolved with `value`.
    pub fn ready(value: T) -> Self {
        let (sender, reply) = Self::channel();
        let _ = sender.send(value);
        reply
    }
}

impl<T> fmt::Debug for PendingReply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingReply").finish_non_exhaustive()
    }
}

impl<T> Future for PendingReply<T> {
    type Output = Result<T, BridgeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| BridgeError::ReplyAbandoned))
    }
}

type Waiter = Box<dyn FnOnce(&HostEvent)>;

#[derive(Default)]
/// Waiter slots keyed by request kind.
pub(crate) struct Correlator {
    pending: RefCell<HashMap<&'static str, Vec<Waiter>>>,
}

impl fmt::Debug for Correlator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.pending.borrow();
        let mut kinds: Vec<_> = pending.iter().map(|(kind, w)| (*kind, w.len())).collect();
        kinds.sort();
        f.debug_struct("Correlator").field("pending", &kinds).finish()
    }
}

impl Correlator {
    /// Registers a waiter for `R`. Returns the reply and whether this caller opened the request.
    pub(crate) fn join<R: AwaitableRequest>(&self) -> (PendingReply<R::Reply>, bool) {
        let (sender, reply) = PendingReply::channel();
        let waiter: Waiter = Box::new(move |event| {
            if let Some(value) = R::extract(event) {
                let _ = sender.send(value);
            }
        });
        let mut pending = self.pending.borrow_mut();
        let waiters = pending.entry(R::KIND).or_default();
        let opened = waiters.is_empty();
        waiters.push(waiter);
        (reply, opened)
    }

    /// Resolves every waiter of `kind` with `event`.
    pub(crate) fn resolve(&self, kind: &'static str, event: &HostEvent) {
        let waiters = self.pending.borrow_mut().remove(kind).unwrap_or_default();
        for waiter in waiters {
            waiter(event);
        }
    }

    /// Drops every waiter of `kind`; their replies fail with [`BridgeError::ReplyAbandoned`].
    pub(crate) fn abandon(&self, kind: &'static str) {
        self.pending.borrow_mut().remove(kind);
    }

    /// Number of callers waiting on `kind`.
    pub(crate) fn waiting(&self, kind: &'static str) -> usize {
        self.pending.borrow().get(kind).map_or(0, Vec::len)
    }
}
