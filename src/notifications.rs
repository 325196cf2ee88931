use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;
use uuid::Uuid;

/// Something the presentation layer may want to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    Added(Uuid),
    Restored(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Restored,
}

impl ActivityEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ActivityEvent::Added(_) => EventKind::Added,
            ActivityEvent::Restored(_) => EventKind::Restored,
        }
    }

    pub fn activity_id(&self) -> Uuid {
        match self {
            ActivityEvent::Added(id) | ActivityEvent::Restored(id) => *id,
        }
    }
}

pub type HandlerError = Box<dyn std::error::Error>;

type Handler = Box<dyn FnMut(&ActivityEvent) -> Result<(), HandlerError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    #[cfg_attr(not(test), allow(dead_code))]
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

/// Synchronous publish/subscribe for activity events.
///
/// Delivery is best effort: a handler that fails or panics is logged and
/// skipped, the remaining handlers still run and the emitter never sees it.
#[derive(Default)]
pub struct Notifier {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&ActivityEvent) -> Result<(), HandlerError> + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            kind,
            handler: Box::new(handler),
        });
        id
    }

    /// Returns false when the subscription was already gone
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn emit(&mut self, event: &ActivityEvent) {
        let kind = event.kind();
        for subscription in self.subscriptions.iter_mut().filter(|s| s.kind == kind) {
            match catch_unwind(AssertUnwindSafe(|| (subscription.handler)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    warn!(?event, %error, "activity event handler failed");
                }
                Err(_) => {
                    warn!(?event, "activity event handler panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn test_handlers_receive_matching_events_in_order() {
        let mut notifier = Notifier::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for label in ["first", "second"] {
            let seen = Rc::clone(&seen);
            notifier.subscribe(EventKind::Added, move |event| {
                seen.borrow_mut().push((label, *event));
                Ok(())
            });
        }
        let restored_seen = Rc::clone(&seen);
        notifier.subscribe(EventKind::Restored, move |event| {
            restored_seen.borrow_mut().push(("restored", *event));
            Ok(())
        });

        let id = Uuid::new_v4();
        notifier.emit(&ActivityEvent::Added(id));

        assert_eq!(
            *seen.borrow(),
            vec![
                ("first", ActivityEvent::Added(id)),
                ("second", ActivityEvent::Added(id))
            ]
        );
    }

    #[test]
    fn test_failing_handler_does_not_stop_others() {
        let mut notifier = Notifier::new();
        let calls = Rc::new(RefCell::new(0));

        notifier.subscribe(EventKind::Restored, |_| Err("render failed".into()));
        notifier.subscribe(EventKind::Restored, |_| panic!("handler blew up"));
        let counter = Rc::clone(&calls);
        notifier.subscribe(EventKind::Restored, move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        notifier.emit(&ActivityEvent::Restored(Uuid::new_v4()));

        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut notifier = Notifier::new();
        let calls = Rc::new(RefCell::new(0));

        let counter = Rc::clone(&calls);
        let id = notifier.subscribe(EventKind::Added, move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));

        notifier.emit(&ActivityEvent::Added(Uuid::new_v4()));
        assert_eq!(*calls.borrow(), 0);
    }
}
