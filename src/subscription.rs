use std::rc::{Rc, Weak};

#[cfg(test)]
mod tests;

/// Handle that undoes a registration when dropped.
///
/// Returned by [`ObservableList::subscribe`](crate::ObservableList::subscribe) and friends.
/// Use [`Subscription::detach`] to keep the registration for the lifetime of the source.
#[derive(Default)]
#[must_use]
pub struct Subscription(Option<Box<dyn FnOnce()>>);

impl Subscription {
    pub fn empty() -> Self {
        Subscription(None)
    }
    pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
        Subscription(Some(Box::new(f)))
    }

    /// Calls `unsubscribe` on drop only if `this` is still alive.
    pub fn from_weak_fn<T: 'static>(
        this: Weak<T>,
        unsubscribe: impl FnOnce(Rc<T>) + 'static,
    ) -> Self {
        Self::from_fn(move || {
            if let Some(this) = this.upgrade() {
                unsubscribe(this)
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Drops the handle without undoing the registration.
    pub fn detach(mut self) {
        self.0 = None;
    }
}
impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f()
        }
    }
}
