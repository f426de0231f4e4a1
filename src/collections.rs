use std::rc::{Rc, Weak};

use crate::{ListChangeListener, ListenerKey, Subscription};

pub mod array;
pub mod filtered;
pub mod sorted;
pub mod transform;
pub mod unmodifiable;
pub mod vec;


use transform::SourceIndexed;
use unmodifiable::UnmodifiableVec;
use vec::StateVec;

/// A sequence that reports every finished transaction to its listeners.
///
/// Implemented by [`StateVec`] and by every derived view, so views can be chained.
pub trait ObservableList<T: Clone + 'static> {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn get(&self, index: usize) -> Option<T>;
    fn to_vec(&self) -> Vec<T>;

    fn add_listener(&self, listener: Rc<dyn ListChangeListener<T>>) -> ListenerKey;

    /// Registers a listener without keeping it alive.
    ///
    /// Once the referent is dropped, the registration is removed on the next dispatch.
    fn add_weak_listener(&self, listener: Weak<dyn ListChangeListener<T>>) -> ListenerKey;

    /// Registers a listener that is called once per transaction, without details.
    fn add_invalidation_listener(&self, listener: Rc<dyn Fn()>) -> ListenerKey;

    /// Returns `false` if `key` is not registered.
    fn remove_listener(&self, key: ListenerKey) -> bool;

    /// Registers `listener` until the returned [`Subscription`] is dropped.
    fn subscribe(&self, listener: Rc<dyn ListChangeListener<T>>) -> Subscription;

    /// The mapping back to the source, if this list is a derived view.
    fn as_source_indexed(&self) -> Option<&dyn SourceIndexed<T>> {
        None
    }
}

/// Replaces every element of `list` with `value`.
pub fn fill<T: Clone + 'static>(list: &StateVec<T>, value: T) {
    let mut items = list.borrow_mut();
    for index in 0..items.len() {
        items.set(index, value.clone());
    }
}

/// Replaces every occurrence of `old` with `new`. Returns `true` if anything matched.
pub fn replace_all<T: Clone + PartialEq + 'static>(list: &StateVec<T>, old: &T, new: T) -> bool {
    let mut items = list.borrow_mut();
    let mut found = false;
    for index in 0..items.len() {
        if items[index] == *old {
            items.set(index, new.clone());
            found = true;
        }
    }
    found
}

/// Overwrites the start of `dest` with `src`.
///
/// # Panics
///
/// Panics if `src` is longer than `dest`.
pub fn copy<T: Clone + 'static>(dest: &StateVec<T>, src: &[T]) {
    let mut items = dest.borrow_mut();
    assert!(src.len() <= items.len(), "source does not fit in destination");
    for (index, value) in src.iter().enumerate() {
        items.set(index, value.clone());
    }
}

/// A new list holding the contents of `lists` one after another.
///
/// The result does not track later changes of `lists`.
pub fn concat<T: Clone + 'static>(lists: &[&dyn ObservableList<T>]) -> StateVec<T> {
    lists.iter().flat_map(|list| list.to_vec()).collect()
}

pub fn unmodifiable<T: Clone + 'static>(
    list: impl ObservableList<T> + 'static,
) -> UnmodifiableVec<T> {
    UnmodifiableVec::new(list)
}

pub(crate) fn weak_listener<T, L>(this: &Rc<L>) -> Weak<dyn ListChangeListener<T>>
where
    L: ListChangeListener<T> + 'static,
{
    let weak: Weak<L> = Rc::downgrade(this);
    weak
}
