//! Scoped ownership of per-session event sources.
//!
//! Anything a session subscribes to at creation (transport listeners, timers,
//! observers) is wrapped in a [`Subscription`] and pushed onto that session's
//! [`Disposables`]. Closing the session releases the whole list at once, so a
//! new kind of subscription cannot be forgotten by the close path.

use std::fmt;

/// Handle to a registered event source. Releasing it (explicitly or by drop)
/// runs the unsubscribe action exactly once.
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn release(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pending", &self.release.is_some())
            .finish()
    }
}

/// Per-session list of subscriptions, released together.
#[derive(Debug, Default)]
pub struct Disposables {
    items: Vec<Subscription>,
}

impl Disposables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.items.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Release everything in reverse acquisition order. Returns how many
    /// subscriptions were released.
    pub fn release_all(&mut self) -> usize {
        let count = self.items.len();
        while let Some(subscription) = self.items.pop() {
            subscription.release();
        }
        count
    }
}

impl Drop for Disposables {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_release_runs_once() {
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let sub = Subscription::new(move || *c.borrow_mut() += 1);

        sub.release();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_drop_releases() {
        let count = Rc::new(RefCell::new(0));
        {
            let c = Rc::clone(&count);
            let _sub = Subscription::new(move || *c.borrow_mut() += 1);
        }
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_release_all_in_reverse_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bag = Disposables::new();
        for i in 0..3 {
            let o = Rc::clone(&order);
            bag.push(Subscription::new(move || o.borrow_mut().push(i)));
        }

        assert_eq!(bag.len(), 3);
        assert_eq!(bag.release_all(), 3);
        assert!(bag.is_empty());
        assert_eq!(*order.borrow(), vec![2, 1, 0]);

        // Second release is a no-op.
        assert_eq!(bag.release_all(), 0);
        assert_eq!(order.borrow().len(), 3);
    }
}
