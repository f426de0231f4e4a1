use std::{
    cell::RefCell,
    cmp::{max, min},
    fmt::{self, Debug},
    marker::PhantomData,
    ops::Range,
    rc::Rc,
};

use derive_ex::Ex;
use serde::{Deserialize, Serialize};

use crate::{ListenerKey, ListenerSet, Subscription};


/// Receives the range touched by one mutation of a [`StateArray`].
pub trait ArrayChangeListener {
    /// `size_changed` is `true` when the length of the array changed.
    fn on_changed(&self, size_changed: bool, from: usize, to: usize);
}
impl<F: Fn(bool, usize, usize)> ArrayChangeListener for F {
    fn on_changed(&self, size_changed: bool, from: usize, to: usize) {
        self(size_changed, from, to)
    }
}

#[derive(Clone)]
enum ArrayListener {
    Invalidation(Rc<dyn Fn()>),
    Change(Rc<dyn ArrayChangeListener>),
}

/// Growable buffer of plain values with observable writes.
///
/// Capacity and length are distinct: reserving or releasing capacity never notifies,
/// while every change of length or content does.
#[derive(Ex)]
#[derive_ex(Clone(bound()), Default)]
#[default(Self::new())]
pub struct StateArray<T: 'static>(Rc<RawStateArray<T>>);

struct RawStateArray<T> {
    items: RefCell<Vec<T>>,
    listeners: Rc<RefCell<ListenerSet<ArrayListener>>>,
}

impl<T: 'static> StateArray<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }
    fn from_vec(items: Vec<T>) -> Self {
        Self(Rc::new(RawStateArray {
            items: RefCell::new(items),
            listeners: Rc::new(RefCell::new(ListenerSet::new())),
        }))
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn capacity(&self) -> usize {
        self.0.items.borrow().capacity()
    }

    /// Grows the backing storage to hold at least `capacity` elements. Does not notify.
    pub fn ensure_capacity(&self, capacity: usize) {
        let mut items = self.0.items.borrow_mut();
        let additional = capacity.saturating_sub(items.len());
        items.reserve(additional);
    }

    /// Releases unused capacity. Does not notify.
    pub fn trim_to_size(&self) {
        self.0.items.borrow_mut().shrink_to_fit();
    }

    pub fn add_listener(&self, listener: Rc<dyn ArrayChangeListener>) -> ListenerKey {
        self.0
            .listeners
            .borrow_mut()
            .insert(ArrayListener::Change(listener))
    }
    pub fn add_invalidation_listener(&self, listener: Rc<dyn Fn()>) -> ListenerKey {
        self.0
            .listeners
            .borrow_mut()
            .insert(ArrayListener::Invalidation(listener))
    }
    pub fn remove_listener(&self, key: ListenerKey) -> bool {
        self.0.listeners.borrow_mut().remove(key)
    }

    /// Registers `listener` until the returned [`Subscription`] is dropped.
    pub fn subscribe(&self, listener: impl Fn(bool, usize, usize) + 'static) -> Subscription {
        let key = self.add_listener(Rc::new(listener));
        Subscription::from_weak_fn(Rc::downgrade(&self.0.listeners), move |listeners| {
            listeners.borrow_mut().remove(key);
        })
    }

    fn notify(&self, size_changed: bool, from: usize, to: usize) {
        let listeners = self.0.listeners.borrow().snapshot();
        for (_, listener) in listeners {
            match listener {
                ArrayListener::Invalidation(f) => f(),
                ArrayListener::Change(l) => l.on_changed(size_changed, from, to),
            }
        }
    }
}

impl<T: Copy + Default + 'static> StateArray<T> {
    pub fn from_slice(values: &[T]) -> Self {
        Self::from_vec(values.to_vec())
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn get(&self, index: usize) -> T {
        self.0.items.borrow()[index]
    }
    pub fn to_vec(&self) -> Vec<T> {
        self.0.items.borrow().clone()
    }

    /// Copies `len` elements starting at `index` into the start of `dest`.
    pub fn copy_to(&self, index: usize, dest: &mut [T], len: usize) {
        dest[..len].copy_from_slice(&self.0.items.borrow()[index..index + len]);
    }

    /// Changes the length, filling new slots with `T::default()`.
    ///
    /// Reports the range between the old and the new length.
    pub fn resize(&self, len: usize) {
        let old = {
            let mut items = self.0.items.borrow_mut();
            let old = items.len();
            items.resize(len, T::default());
            old
        };
        if old != len {
            self.notify(true, min(old, len), max(old, len));
        }
    }

    /// Reports `(true, 0, old_len)`. An empty array stays silent.
    pub fn clear(&self) {
        let old = {
            let mut items = self.0.items.borrow_mut();
            let old = items.len();
            items.clear();
            old
        };
        if old != 0 {
            self.notify(true, 0, old);
        }
    }

    pub fn set(&self, index: usize, value: T) {
        self.0.items.borrow_mut()[index] = value;
        self.notify(false, index, index + 1);
    }

    /// Overwrites the elements starting at `index` with `values`.
    pub fn set_range(&self, index: usize, values: &[T]) {
        let end = index + values.len();
        self.0.items.borrow_mut()[index..end].copy_from_slice(values);
        self.notify(false, index, end);
    }

    /// Replaces the whole content. Always notifies, reporting `(size_changed, 0, new_len)`.
    pub fn set_all(&self, values: &[T]) {
        let size_changed = {
            let mut items = self.0.items.borrow_mut();
            let size_changed = items.len() != values.len();
            items.clear();
            items.extend_from_slice(values);
            size_changed
        };
        self.notify(size_changed, 0, values.len());
    }

    /// Replaces the whole content with another array's elements in `range`.
    ///
    /// The source may be this array itself.
    pub fn set_all_range(&self, src: &StateArray<T>, range: Range<usize>) {
        let values = src.0.items.borrow()[range].to_vec();
        self.set_all(&values);
    }

    /// Appends `values`. Always notifies, reporting `(size_changed, old_len, new_len)`.
    pub fn add_all(&self, values: &[T]) {
        let (old, new) = {
            let mut items = self.0.items.borrow_mut();
            let old = items.len();
            items.extend_from_slice(values);
            (old, items.len())
        };
        self.notify(old != new, old, new);
    }

    /// Appends another array's elements in `range`. The source may be this array itself.
    pub fn add_all_range(&self, src: &StateArray<T>, range: Range<usize>) {
        let values = src.0.items.borrow()[range].to_vec();
        self.add_all(&values);
    }
}

impl<T: Copy + Default + 'static> From<Vec<T>> for StateArray<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T: Debug + 'static> Debug for StateArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.items.borrow().iter()).finish()
    }
}

impl<T: Serialize> Serialize for StateArray<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.0.items.borrow().iter())
    }
}

impl<'de, T: Deserialize<'de> + 'static> Deserialize<'de> for StateArray<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct StateArrayVisitor<T>(PhantomData<fn(T)>);
        impl<'de, T: Deserialize<'de> + 'static> serde::de::Visitor<'de> for StateArrayVisitor<T> {
            type Value = StateArray<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence")
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(value) = seq.next_element()? {
                    items.push(value);
                }
                Ok(StateArray::from_vec(items))
            }
        }
        deserializer.deserialize_seq(StateArrayVisitor(PhantomData))
    }
}
