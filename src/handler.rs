//! Handler trait and the ordered handler registry.
//!
//! A `Handler` sees every decoded record in stream order, accumulates
//! per-game state, and may ask the pipeline to fire a named trigger.
//! Handlers match on [`EventRecord`] themselves; there is no per-kind
//! method table.
//!
//! The [`HandlerRegistry`] keeps handlers in registration order together
//! with their error state. A handler that returned a non-fatal condition
//! stays parked (skipped by dispatch) until a collaborator calls
//! [`HandlerRegistry::resolve`].

use std::any::Any;

use crate::error::HandlerError;
use crate::record::EventRecord;

/// Result of dispatching one record: optionally, the name of a trigger to fire.
pub type Dispatch = Result<Option<String>, HandlerError>;

/// A stateful, per-game resettable analysis component.
pub trait Handler: Any {
    /// Consume one record.
    fn handle(&mut self, record: &EventRecord) -> Dispatch;

    /// Called once when the input ends (or on a graceful stop).
    ///
    /// The end of input is also the end of the last game, so handlers that
    /// close out a game on the next `id` record do the same here.
    fn finish(&mut self) -> Dispatch {
        Ok(None)
    }

    /// Drop all per-game state, returning to the freshly constructed state.
    fn reset(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct Entry {
    pub(crate) name: String,
    pub(crate) handler: Box<dyn Handler>,
    pub(crate) fault: Option<HandlerError>,
}

/// Named handlers in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<Entry>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Re-registering a name replaces the handler in
    /// place, keeping its position and clearing its error state.
    pub fn register<H: Handler>(&mut self, name: &str, handler: H) {
        let handler: Box<dyn Handler> = Box::new(handler);
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                entry.handler = handler;
                entry.fault = None;
            }
            None => self.entries.push(Entry {
                name: name.to_string(),
                handler,
                fault: None,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Typed read access to a handler's accumulated state.
    pub fn get<T: Handler>(&self, name: &str) -> Option<&T> {
        self.entry(name)?.handler.as_any().downcast_ref()
    }

    pub fn get_mut<T: Handler>(&mut self, name: &str) -> Option<&mut T> {
        self.entry_mut(name)?.handler.as_any_mut().downcast_mut()
    }

    /// The condition that parked this handler, if any.
    pub fn fault(&self, name: &str) -> Option<&HandlerError> {
        self.entry(name)?.fault.as_ref()
    }

    /// Registered and not parked.
    pub fn is_healthy(&self, name: &str) -> bool {
        self.entry(name).is_some_and(|e| e.fault.is_none())
    }

    /// Parked handlers with their conditions, in registration order.
    pub fn faults(&self) -> impl Iterator<Item = (&str, &HandlerError)> {
        self.entries
            .iter()
            .filter_map(|e| e.fault.as_ref().map(|f| (e.name.as_str(), f)))
    }

    /// Clear a handler's error state. It takes part again from the next
    /// dispatched record. Returns the cleared condition.
    pub fn resolve(&mut self, name: &str) -> Option<HandlerError> {
        self.entry_mut(name)?.fault.take()
    }

    pub fn resolve_all(&mut self) {
        for entry in &mut self.entries {
            entry.fault = None;
        }
    }

    /// Call `reset` on every handler, parked or not.
    pub fn reset_all(&mut self) {
        for entry in &mut self.entries {
            entry.handler.reset();
        }
    }

    /// Reset and clear every parked handler so it starts the next game
    /// clean. Healthy handlers keep their state. Returns how many were
    /// revived.
    pub fn reset_faulted(&mut self) -> usize {
        let mut revived = 0;
        for entry in &mut self.entries {
            if entry.fault.take().is_some() {
                entry.handler.reset();
                revived += 1;
            }
        }
        revived
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Counts records; fails fatally on the `n`th one if `fail_on` is set.
    #[derive(Default)]
    pub(crate) struct Counter {
        pub(crate) seen: usize,
        pub(crate) fail_on: Option<usize>,
    }

    impl Handler for Counter {
        fn handle(&mut self, _record: &EventRecord) -> Dispatch {
            self.seen += 1;
            if self.fail_on == Some(self.seen) {
                return Err(HandlerError::Fatal("boom".to_string()));
            }
            Ok(None)
        }

        fn reset(&mut self) {
            self.seen = 0;
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_register_keeps_order_and_replaces_in_place() {
        let mut registry = HandlerRegistry::new();
        registry.register("a", Counter::default());
        registry.register("b", Counter::default());
        registry.register(
            "a",
            Counter {
                seen: 5,
                fail_on: None,
            },
        );
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(registry.get::<Counter>("a").unwrap().seen, 5);
    }

    #[test]
    fn test_typed_access() {
        let mut registry = HandlerRegistry::new();
        registry.register("count", Counter::default());
        registry.get_mut::<Counter>("count").unwrap().seen = 3;
        assert_eq!(registry.get::<Counter>("count").unwrap().seen, 3);
        assert!(registry.get::<Counter>("missing").is_none());
    }

    #[test]
    fn test_fault_and_resolve() {
        let mut registry = HandlerRegistry::new();
        registry.register("count", Counter::default());
        assert!(registry.is_healthy("count"));
        registry.entries_mut()[0].fault = Some(HandlerError::Fatal("x".into()));
        assert!(!registry.is_healthy("count"));
        assert_eq!(registry.faults().count(), 1);
        assert!(registry.resolve("count").is_some());
        assert!(registry.is_healthy("count"));
        assert!(!registry.is_healthy("missing"));
    }

    #[test]
    fn test_reset_all() {
        let mut registry = HandlerRegistry::new();
        registry.register(
            "count",
            Counter {
                seen: 7,
                fail_on: None,
            },
        );
        registry.reset_all();
        assert_eq!(registry.get::<Counter>("count").unwrap().seen, 0);
    }

    #[test]
    fn test_reset_faulted_leaves_healthy_handlers() {
        let mut registry = HandlerRegistry::new();
        registry.register(
            "ok",
            Counter {
                seen: 4,
                fail_on: None,
            },
        );
        registry.register(
            "parked",
            Counter {
                seen: 2,
                fail_on: None,
            },
        );
        registry.entries_mut()[1].fault = Some(HandlerError::Fatal("x".into()));

        assert_eq!(registry.reset_faulted(), 1);
        assert_eq!(registry.get::<Counter>("ok").unwrap().seen, 4);
        assert_eq!(registry.get::<Counter>("parked").unwrap().seen, 0);
        assert!(registry.is_healthy("parked"));
        assert_eq!(registry.reset_faulted(), 0);
    }
}
