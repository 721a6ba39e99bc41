//! Name-keyed publish/subscribe primitive owned privately by the bridge and every component.
//!
//! Delivery is synchronous and follows subscription order. Each emission snapshots the listener
//! list before invoking anything and holds no borrow while listeners run, so listeners may
//! subscribe, unsubscribe, emit, or call committing setters re-entrantly.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

/// Event payload carried by an [`EventBus`].
pub trait BusEvent: 'static {
    /// Name the event is delivered under by [`EventBus::emit`].
    fn event_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Handle returned by subscriptions; pass it back to remove the listener.
pub struct ListenerId(u64);

type Listener<E> = Rc<dyn Fn(&E)>;
type Observer<E> = Rc<dyn Fn(&str, &E)>;

struct ListenerEntry<E> {
    id: ListenerId,
    once: bool,
    listener: Listener<E>,
}

struct BusState<E> {
    listeners: HashMap<String, Vec<ListenerEntry<E>>>,
    observers: Vec<(ListenerId, Observer<E>)>,
    next_id: u64,
}

impl<E> BusState<E> {
    fn allocate_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    fn remove(&mut self, name: &str, id: ListenerId) -> bool {
        let Some(entries) = self.listeners.get_mut(name) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.listeners.remove(name);
        }
        removed
    }
}

/// Single-threaded event bus keyed by event name.
///
/// Cloning yields another handle to the same listener registry.
pub struct EventBus<E> {
    state: Rc<RefCell<BusState<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState {
                listeners: HashMap::new(),
                observers: Vec::new(),
                next_id: 0,
            })),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        let mut names: Vec<_> = state.listeners.keys().cloned().collect();
        names.sort();
        f.debug_struct("EventBus")
            .field("events", &names)
            .field("observers", &state.observers.len())
            .finish()
    }
}

impl<E: BusEvent> EventBus<E> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener` to the delivery list of `name`.
    pub fn on(&self, name: impl AsRef<str>, listener: impl Fn(&E) + 'static) -> ListenerId {
        self.insert(name.as_ref(), false, Rc::new(listener))
    }

    /// Appends a listener that is unregistered right before its first delivery.
    ///
    /// A `once` listener fires at most one time even when emissions nest.
    pub fn once(&self, name: impl AsRef<str>, listener: impl Fn(&E) + 'static) -> ListenerId {
        self.insert(name.as_ref(), true, Rc::new(listener))
    }

    /// Removes a listener registered under `name`. Returns whether anything was removed.
    pub fn off(&self, name: impl AsRef<str>, id: ListenerId) -> bool {
        self.state.borrow_mut().remove(name.as_ref(), id)
    }

    /// Registers an observer fed every emission together with the name it was delivered under.
    pub fn subscribe(&self, observer: impl Fn(&str, &E) + 'static) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state.observers.push((id, Rc::new(observer)));
        id
    }

    /// Removes an observer added with [`EventBus::subscribe`].
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.observers.len();
        state.observers.retain(|(observer_id, _)| *observer_id != id);
        state.observers.len() != before
    }

    /// Delivers `event` under its own [`BusEvent::event_name`].
    pub fn emit(&self, event: &E) {
        self.dispatch(event.event_name(), event);
    }

    /// Delivers `event` under an arbitrary `name`, bypassing the event's static name.
    ///
    /// Used for host events the bridge has no typed variant for.
    pub fn emit_unsafe(&self, name: &str, event: &E) {
        self.dispatch(name, event);
    }

    /// Number of listeners currently registered under `name`.
    pub fn listener_count(&self, name: impl AsRef<str>) -> usize {
        self.state
            .borrow()
            .listeners
            .get(name.as_ref())
            .map_or(0, Vec::len)
    }

    fn insert(&self, name: &str, once: bool, listener: Listener<E>) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = state.allocate_id();
        state
            .listeners
            .entry(name.to_string())
            .or_default()
            .push(ListenerEntry { id, once, listener });
        id
    }

    fn dispatch(&self, name: &str, event: &E) {
        let (listeners, observers) = {
            let state = self.state.borrow();
            let listeners: Vec<_> = state
                .listeners
                .get(name)
                .map(|entries| {
                    entries
                        .iter()
                        .map(|entry| (entry.id, entry.once, Rc::clone(&entry.listener)))
                        .collect()
                })
                .unwrap_or_default();
            let observers: Vec<_> = state
                .observers
                .iter()
                .map(|(_, observer)| Rc::clone(observer))
                .collect();
            (listeners, observers)
        };

        for observer in observers {
            observer(name, event);
        }
        for (id, once, listener) in listeners {
            // Consumed by a nested emission already.
            if once && !self.state.borrow_mut().remove(name, id) {
                continue;
            }
            listener(event);
        }
    }
}
