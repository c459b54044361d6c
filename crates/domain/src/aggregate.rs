//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: std::fmt::Debug + Clone + Send + Sync {
    /// Returns the event type name.
    ///
    /// Two events with the same type name are the same kind of fact; the
    /// pending queue keeps at most one of each kind.
    fn event_type(&self) -> &'static str;

    /// When the fact occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Trait for aggregate roots that queue domain events until they are durable.
///
/// Events recorded by successful mutations stay pending until the command
/// handler has saved the aggregate, then they are drained exactly once with
/// [`AggregateRoot::take_events`] and published.
pub trait AggregateRoot: Send + Sync {
    /// The type of events this aggregate records.
    type Event: DomainEvent;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Events recorded since the last drain.
    fn pending_events(&self) -> &[Self::Event];

    /// Removes and returns every pending event.
    fn take_events(&mut self) -> Vec<Self::Event>;
}

/// Queue of not-yet-published events with replace-by-kind semantics.
///
/// Recording an event whose kind is already pending replaces the pending one
/// in place instead of appending, so a batch never holds two events of the
/// same kind.
#[derive(Debug, Clone)]
pub struct PendingEvents<E> {
    events: Vec<E>,
}

impl<E> Default for PendingEvents<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E: DomainEvent> PendingEvents<E> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event, replacing a pending event of the same kind.
    pub fn record(&mut self, event: E) {
        let kind = event.event_type();
        match self.events.iter().rposition(|e| e.event_type() == kind) {
            Some(idx) => self.events[idx] = event,
            None => self.events.push(event),
        }
    }

    /// Pending events in recording order.
    pub fn as_slice(&self) -> &[E] {
        &self.events
    }

    /// Drains the queue.
    pub fn take(&mut self) -> Vec<E> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Created { at: DateTime<Utc> },
        Updated { value: i32, at: DateTime<Utc> },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Created { .. } => "TestCreated",
                TestEvent::Updated { .. } => "TestUpdated",
            }
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            match self {
                TestEvent::Created { at } | TestEvent::Updated { at, .. } => *at,
            }
        }
    }

    #[test]
    fn test_domain_event_type() {
        let event = TestEvent::Created { at: Utc::now() };
        assert_eq!(event.event_type(), "TestCreated");

        let event = TestEvent::Updated {
            value: 42,
            at: Utc::now(),
        };
        assert_eq!(event.event_type(), "TestUpdated");
    }

    #[test]
    fn test_distinct_kinds_are_appended() {
        let mut queue = PendingEvents::new();
        queue.record(TestEvent::Created { at: Utc::now() });
        queue.record(TestEvent::Updated {
            value: 1,
            at: Utc::now(),
        });

        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_same_kind_replaces_in_place() {
        let now = Utc::now();
        let mut queue = PendingEvents::new();
        queue.record(TestEvent::Updated { value: 1, at: now });
        queue.record(TestEvent::Created { at: now });
        queue.record(TestEvent::Updated { value: 2, at: now });

        assert_eq!(
            queue.as_slice(),
            &[
                TestEvent::Updated { value: 2, at: now },
                TestEvent::Created { at: now },
            ]
        );
    }

    #[test]
    fn test_take_drains_once() {
        let mut queue = PendingEvents::new();
        queue.record(TestEvent::Created { at: Utc::now() });

        assert_eq!(queue.take().len(), 1);
        assert!(queue.is_empty());
        assert!(queue.take().is_empty());
    }
}
