//! Synchronous one-to-many change notification
//!
//! A [`PubSub`] is embedded in every observable model (status mirror, lists,
//! browser, placements, messages). Subscribers are held weakly, so a container
//! subscribing to its own children never forms an ownership cycle.
//!
//! Re-entrancy: `notify` iterates over the subscriber list as it was when the
//! notification started. A subscriber added while a notification is running
//! does not see that event; one removed while it is running still does.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Receiver side of a [`PubSub`]
pub trait Subscriber<E> {
    fn on_event(&self, event: &E);
}

pub struct PubSub<E> {
    subscribers: RefCell<Vec<Weak<dyn Subscriber<E>>>>,
}

impl<E: 'static> PubSub<E> {
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Register `subscriber`. Registering the same subscriber twice is a no-op.
    pub fn subscribe<S: Subscriber<E> + 'static>(&self, subscriber: &Rc<S>) {
        let subscriber: Rc<dyn Subscriber<E>> = subscriber.clone();
        let weak = Rc::downgrade(&subscriber);
        let mut subscribers = self.subscribers.borrow_mut();
        if !subscribers.iter().any(|s| Weak::ptr_eq(s, &weak)) {
            subscribers.push(weak);
        }
    }

    pub fn unsubscribe<S: Subscriber<E> + 'static>(&self, subscriber: &Rc<S>) {
        let subscriber: Rc<dyn Subscriber<E>> = subscriber.clone();
        let weak = Rc::downgrade(&subscriber);
        self.subscribers
            .borrow_mut()
            .retain(|s| !Weak::ptr_eq(s, &weak));
    }

    /// Deliver `event` to every live subscriber in registration order.
    pub fn notify(&self, event: &E) {
        let snapshot = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|s| s.strong_count() > 0);
            subscribers.clone()
        };

        for subscriber in snapshot {
            if let Some(subscriber) = subscriber.upgrade() {
                subscriber.on_event(event);
            }
        }
    }

    /// Live subscribers
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for PubSub<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Subscriber<u32> for Recorder {
        fn on_event(&self, event: &u32) {
            self.log.borrow_mut().push(format!("{}:{}", self.name, event));
        }
    }

    fn recorder(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Rc<Recorder> {
        Rc::new(Recorder {
            name,
            log: log.clone(),
        })
    }

    #[test]
    fn notifies_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        let pubsub: PubSub<u32> = PubSub::new();
        pubsub.subscribe(&b);
        pubsub.subscribe(&a);

        pubsub.notify(&7);

        assert_eq!(*log.borrow(), vec!["b:7", "a:7"]);
    }

    #[test]
    fn subscribe_is_idempotent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder("a", &log);
        let pubsub: PubSub<u32> = PubSub::new();
        pubsub.subscribe(&a);
        pubsub.subscribe(&a);

        pubsub.notify(&1);

        assert_eq!(pubsub.len(), 1);
        assert_eq!(*log.borrow(), vec!["a:1"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_subscriber() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        let pubsub: PubSub<u32> = PubSub::new();
        pubsub.subscribe(&a);
        pubsub.subscribe(&b);
        pubsub.unsubscribe(&a);
        pubsub.unsubscribe(&a);

        pubsub.notify(&2);

        assert_eq!(*log.borrow(), vec!["b:2"]);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pubsub: PubSub<u32> = PubSub::new();
        {
            let a = recorder("a", &log);
            pubsub.subscribe(&a);
            assert_eq!(pubsub.len(), 1);
        }

        pubsub.notify(&3);

        assert!(pubsub.is_empty());
        assert!(log.borrow().is_empty());
    }

    /// Subscribes `late` and unsubscribes `victim` from inside a notification.
    struct Meddler {
        pubsub: Rc<PubSub<u32>>,
        late: Rc<Recorder>,
        victim: Rc<Recorder>,
        calls: Cell<usize>,
    }

    impl Subscriber<u32> for Meddler {
        fn on_event(&self, _event: &u32) {
            self.calls.set(self.calls.get() + 1);
            self.pubsub.subscribe(&self.late);
            self.pubsub.unsubscribe(&self.victim);
        }
    }

    #[test]
    fn reentrant_changes_apply_from_the_next_notification() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pubsub: Rc<PubSub<u32>> = Rc::new(PubSub::new());
        let victim = recorder("victim", &log);
        let late = recorder("late", &log);
        let meddler = Rc::new(Meddler {
            pubsub: pubsub.clone(),
            late: late.clone(),
            victim: victim.clone(),
            calls: Cell::new(0),
        });
        pubsub.subscribe(&meddler);
        pubsub.subscribe(&victim);

        pubsub.notify(&1);
        assert_eq!(*log.borrow(), vec!["victim:1"]);

        log.borrow_mut().clear();
        pubsub.notify(&2);
        assert_eq!(*log.borrow(), vec!["late:2"]);
        assert_eq!(meddler.calls.get(), 2);
    }
}
