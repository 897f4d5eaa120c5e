//! Lifecycle listeners.
//!
//! # Design
//! Each client owns one `ListenerRegistry`; nothing is process-global. The
//! registry is the only mutable state a client shares between calls, so it
//! sits behind a mutex. Dispatch takes a snapshot of the relevant handlers
//! under the lock and runs them after releasing it, which lets a handler add
//! or remove listeners without deadlocking.
//!
//! Handlers are a closed set of signatures, one per event. Registration hands
//! back a `ListenerId` from a per-registry counter; ids are never reused.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, ListenerError, Result};
use crate::http::RequestDescriptor;
use crate::response::Response;

pub type BeforeHandler = dyn Fn(&mut RequestDescriptor) -> Result<(), ListenerError> + Send + Sync;
pub type AfterHandler = dyn Fn(&RequestDescriptor, &Response) -> Result<(), ListenerError> + Send + Sync;
pub type ErrorHandler = dyn Fn(i32, &str, &RequestDescriptor) -> Result<(), ListenerError> + Send + Sync;

/// Points in the dispatch lifecycle where listeners run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Event {
    /// Before the transport is called; handlers may edit the request.
    Before,
    /// After every dispatch, successful or not.
    After,
    /// When the transport fails, before `After`.
    Error,
}

impl Event {
    pub const ALL: [Event; 3] = [Event::Before, Event::After, Event::Error];

    pub fn as_str(self) -> &'static str {
        match self {
            Event::Before => "before",
            Event::After => "after",
            Event::Error => "error",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Event {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Event::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| Error::UnknownEvent(s.to_string()))
    }
}

/// Opaque handle returned by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// A registered callback, tagged with the event it handles.
#[derive(Clone)]
pub enum Listener {
    Before(Arc<BeforeHandler>),
    After(Arc<AfterHandler>),
    Error(Arc<ErrorHandler>),
}

impl Listener {
    pub fn before<F>(handler: F) -> Self
    where
        F: Fn(&mut RequestDescriptor) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Listener::Before(Arc::new(handler))
    }

    pub fn after<F>(handler: F) -> Self
    where
        F: Fn(&RequestDescriptor, &Response) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Listener::After(Arc::new(handler))
    }

    pub fn error<F>(handler: F) -> Self
    where
        F: Fn(i32, &str, &RequestDescriptor) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Listener::Error(Arc::new(handler))
    }

    pub fn event(&self) -> Event {
        match self {
            Listener::Before(_) => Event::Before,
            Listener::After(_) => Event::After,
            Listener::Error(_) => Event::Error,
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener::{:?}(..)", self.event())
    }
}

#[derive(Default)]
struct Entries {
    last_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

/// Mutex-guarded listener table, in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Mutex<Entries>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Listener) -> ListenerId {
        let mut entries = self.entries.lock();
        entries.last_id += 1;
        let id = ListenerId(entries.last_id);
        entries.listeners.push((id, listener));
        id
    }

    /// Remove one listener. Returns `false` if `id` is not registered for `event`.
    pub fn remove(&self, event: Event, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.listeners.len();
        entries
            .listeners
            .retain(|(existing, listener)| !(*existing == id && listener.event() == event));
        entries.listeners.len() != before
    }

    /// Remove every listener for `event`, or all listeners when `None`.
    pub fn clear(&self, event: Option<Event>) {
        let mut entries = self.entries.lock();
        match event {
            Some(event) => entries.listeners.retain(|(_, l)| l.event() != event),
            None => entries.listeners.clear(),
        }
    }

    pub fn get(&self, event: Event, id: ListenerId) -> Option<Listener> {
        self.entries
            .lock()
            .listeners
            .iter()
            .find(|(existing, l)| *existing == id && l.event() == event)
            .map(|(_, l)| l.clone())
    }

    /// Registered ids, optionally filtered by event, in registration order.
    pub fn ids(&self, event: Option<Event>) -> Vec<(Event, ListenerId)> {
        self.entries
            .lock()
            .listeners
            .iter()
            .filter(|(_, l)| event.is_none_or(|e| l.event() == e))
            .map(|(id, l)| (l.event(), *id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn before_handlers(&self) -> Vec<Arc<BeforeHandler>> {
        self.snapshot(|l| match l {
            Listener::Before(h) => Some(Arc::clone(h)),
            _ => None,
        })
    }

    pub(crate) fn after_handlers(&self) -> Vec<Arc<AfterHandler>> {
        self.snapshot(|l| match l {
            Listener::After(h) => Some(Arc::clone(h)),
            _ => None,
        })
    }

    pub(crate) fn error_handlers(&self) -> Vec<Arc<ErrorHandler>> {
        self.snapshot(|l| match l {
            Listener::Error(h) => Some(Arc::clone(h)),
            _ => None,
        })
    }

    fn snapshot<T>(&self, pick: impl Fn(&Listener) -> Option<T>) -> Vec<T> {
        self.entries.lock().listeners.iter().filter_map(|(_, l)| pick(l)).collect()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.ids(None))
            .finish()
    }
}
