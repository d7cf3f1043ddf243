//! One-shot signals
//!
//! Observers register interest explicitly and are delivered at most once:
//! emitting a signal drains its subscriber list, so a callback can never
//! outlive the event it was waiting for. An observer that wants the next
//! occurrence as well re-subscribes from inside its callback.
//!
//! Subscribers are invoked after the subscriber list has been taken out of
//! the signal, which makes it safe for a callback to subscribe, unsubscribe
//! or emit on the very same signal.

use std::cell::{Cell, RefCell};
use std::fmt;

/// Token returned by [`Signal::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Box<dyn FnOnce(&T)>;

/// Single-threaded signal with one-shot delivery per subscription
pub struct Signal<T> {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T> Signal<T> {
    /// Create a signal with no subscribers
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Register a callback for the next emission only
    pub fn subscribe(&self, callback: impl FnOnce(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get().wrapping_add(1));
        self.subscribers.borrow_mut().push((id, Box::new(callback)));
        id
    }

    /// Remove a pending subscription
    ///
    /// Returns `false` when the subscription was already delivered or removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Deliver `value` to every pending subscriber, in subscription order
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit(&self, value: &T) -> usize {
        let pending = std::mem::take(&mut *self.subscribers.borrow_mut());
        let delivered = pending.len();
        for (_, callback) in pending {
            callback(value);
        }
        delivered
    }

    /// Number of subscriptions waiting for the next emission
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Drop every pending subscription without invoking it
    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_delivers_once_then_forgets() {
        let signal = Signal::<u32>::new();
        let hits = Rc::new(Cell::new(0));

        let counter = Rc::clone(&hits);
        signal.subscribe(move |value| counter.set(counter.get() + *value));

        assert_eq!(signal.emit(&5), 1);
        assert_eq!(signal.emit(&5), 0);
        assert_eq!(hits.get(), 5);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_prevents_delivery() {
        let signal = Signal::<()>::new();
        let hit = Rc::new(Cell::new(false));

        let flag = Rc::clone(&hit);
        let id = signal.subscribe(move |()| flag.set(true));

        assert!(signal.unsubscribe(id));
        assert!(!signal.unsubscribe(id));
        signal.emit(&());
        assert!(!hit.get());
    }

    #[test]
    fn test_delivery_order_follows_subscription_order() {
        let signal = Signal::<()>::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let order = Rc::clone(&order);
            signal.subscribe(move |()| order.borrow_mut().push(n));
        }
        signal.emit(&());

        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_resubscribe_from_callback_waits_for_next_emit() {
        let signal = Rc::new(Signal::<()>::new());
        let hits = Rc::new(Cell::new(0));

        let inner_signal = Rc::clone(&signal);
        let inner_hits = Rc::clone(&hits);
        signal.subscribe(move |()| {
            inner_hits.set(inner_hits.get() + 1);
            let again = Rc::clone(&inner_hits);
            inner_signal.subscribe(move |()| again.set(again.get() + 1));
        });

        signal.emit(&());
        assert_eq!(hits.get(), 1);
        assert_eq!(signal.subscriber_count(), 1);

        signal.emit(&());
        assert_eq!(hits.get(), 2);
    }
}
