//! Named notification channels with ordered, stoppable handlers.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{HostError, Result};

/// What a handler wants done with the rest of the handler list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventResult {
    /// Stop calling further handlers
    Done,
    /// Keep going
    #[default]
    Continue,
}

/// Identifies one connection on a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Object that can be connected to a signal.
pub trait SignalListener<A>: Send + Sync {
    fn on_signal(&self, arg: &A) -> EventResult;
}

type Handler<A> = Box<dyn Fn(&A) -> EventResult + Send + Sync>;

/// A channel carrying values of type `A` to its handlers.
pub struct Signal<A> {
    handlers: Vec<(ConnectionId, Handler<A>)>,
    next_id: u64,
}

impl<A: 'static> Signal<A> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Connect a handler. Handlers run in connection order.
    pub fn connect<H>(&mut self, handler: H) -> ConnectionId
    where
        H: Fn(&A) -> EventResult + Send + Sync + 'static,
    {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Connect a shared listener object.
    pub fn connect_listener<L>(&mut self, listener: Arc<L>) -> ConnectionId
    where
        L: SignalListener<A> + ?Sized + 'static,
    {
        self.connect(move |arg| listener.on_signal(arg))
    }

    /// Remove a handler. Returns `false` if it was not connected.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Call the handlers in order until one returns [`EventResult::Done`].
    ///
    /// Returns `Done` if a handler stopped processing, `Continue` otherwise.
    pub fn emit(&self, arg: &A) -> EventResult {
        for (_, handler) in &self.handlers {
            if handler(arg) == EventResult::Done {
                return EventResult::Done;
            }
        }
        EventResult::Continue
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Signals looked up by name.
#[derive(Default)]
pub struct SignalRepository {
    signals: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl SignalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `signal` under `name`.
    pub fn add_signal<A: 'static>(&mut self, name: impl Into<String>, signal: Signal<A>) -> Result<()> {
        let name = name.into();
        if self.signals.contains_key(&name) {
            return Err(HostError::SignalAlreadyRegistered(name));
        }

        tracing::debug!("Registered signal {}", name);
        self.signals.insert(name, Box::new(signal));
        Ok(())
    }

    pub fn remove_signal(&mut self, name: &str) -> bool {
        self.signals.remove(name).is_some()
    }

    pub fn has_signal(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    pub fn signal<A: 'static>(&self, name: &str) -> Result<&Signal<A>> {
        self.signals
            .get(name)
            .ok_or_else(|| HostError::UnknownSignal(name.to_string()))?
            .downcast_ref::<Signal<A>>()
            .ok_or_else(|| HostError::SignalTypeMismatch(name.to_string()))
    }

    pub fn signal_mut<A: 'static>(&mut self, name: &str) -> Result<&mut Signal<A>> {
        self.signals
            .get_mut(name)
            .ok_or_else(|| HostError::UnknownSignal(name.to_string()))?
            .downcast_mut::<Signal<A>>()
            .ok_or_else(|| HostError::SignalTypeMismatch(name.to_string()))
    }
}

impl std::fmt::Debug for SignalRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalRepository")
            .field("signals", &self.signals.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_emit_in_order_until_done() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut signal = Signal::<u32>::new();

        for tag in ["a", "b", "c"] {
            let seen = seen.clone();
            signal.connect(move |value: &u32| {
                seen.lock().unwrap().push(tag);
                if tag == "b" && *value > 10 {
                    EventResult::Done
                } else {
                    EventResult::Continue
                }
            });
        }

        assert_eq!(signal.emit(&1), EventResult::Continue);
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);

        seen.lock().unwrap().clear();
        assert_eq!(signal.emit(&42), EventResult::Done);
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_disconnect() {
        let mut signal = Signal::<()>::new();
        let id = signal.connect(|_: &()| EventResult::Done);
        assert_eq!(signal.emit(&()), EventResult::Done);

        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        assert!(signal.is_empty());
        assert_eq!(signal.emit(&()), EventResult::Continue);
    }

    struct Counter(Mutex<u32>);

    impl SignalListener<String> for Counter {
        fn on_signal(&self, _arg: &String) -> EventResult {
            *self.0.lock().unwrap() += 1;
            EventResult::Continue
        }
    }

    #[test]
    fn test_listener() {
        let counter = Arc::new(Counter(Mutex::new(0)));
        let mut signal = Signal::<String>::new();
        signal.connect_listener(counter.clone());
        signal.emit(&"x".to_string());
        signal.emit(&"y".to_string());
        assert_eq!(*counter.0.lock().unwrap(), 2);
    }

    #[test]
    fn test_repository_errors() {
        let mut repo = SignalRepository::new();
        repo.add_signal("frame", Signal::<u32>::new()).unwrap();

        assert!(matches!(
            repo.add_signal("frame", Signal::<u32>::new()),
            Err(HostError::SignalAlreadyRegistered(_))
        ));
        assert!(matches!(
            repo.signal_mut::<u32>("missing"),
            Err(HostError::UnknownSignal(_))
        ));
        assert!(matches!(
            repo.signal_mut::<String>("frame"),
            Err(HostError::SignalTypeMismatch(_))
        ));

        repo.signal_mut::<u32>("frame")
            .unwrap()
            .connect(|_: &u32| EventResult::Done);
        assert_eq!(repo.signal::<u32>("frame").unwrap().emit(&0), EventResult::Done);

        assert!(repo.remove_signal("frame"));
        assert!(!repo.has_signal("frame"));
    }
}
