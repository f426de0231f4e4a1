use std::{
    cell::{Cell, Ref, RefCell, RefMut},
    cmp::Ordering,
    fmt::{self, Debug},
    marker::PhantomData,
    mem::{replace, take},
    ops::{Index, RangeBounds},
    rc::{Rc, Weak},
    thread,
};

use derive_ex::Ex;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{
    listener::{ListListener, ListListeners},
    utils::{apply_old_to_new, invert, is_sorted, to_range, try_sort_by},
    ChangeBuilder, Edit, Error, ListChangeListener, ListenerKey, ObservableList, Result,
    Subscription, VecChanges,
};


/// Observable sequence that coalesces each transaction into one notification.
///
/// Every mutator is its own transaction unless it runs inside [`StateVec::borrow_mut`] or
/// between [`StateVec::begin_change`] and [`StateVec::end_change`].
#[derive(Ex)]
#[derive_ex(Clone(bound()), Default)]
#[default(Self::new())]
pub struct StateVec<T: 'static>(Rc<RawStateVec<T>>);

impl<T: 'static> StateVec<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }
    pub fn from_vec(items: Vec<T>) -> Self {
        Self(Rc::new(RawStateVec {
            data: RefCell::new(VecData {
                items,
                builder: ChangeBuilder::new(),
            }),
            mod_count: Cell::new(0),
            listeners: Rc::new(ListListeners::new()),
        }))
    }

    pub fn len(&self) -> usize {
        self.0.data.borrow().items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn borrow(&self) -> Ref<'_, [T]> {
        Ref::map(self.0.data.borrow(), |data| data.items.as_slice())
    }

    /// Number of mutations applied so far.
    pub fn mod_count(&self) -> u64 {
        self.0.mod_count.get()
    }
}

impl<T: Clone + 'static> StateVec<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.0.data.borrow().items.get(index).cloned()
    }
    pub fn to_vec(&self) -> Vec<T> {
        self.0.data.borrow().items.clone()
    }

    /// Fail-fast iterator: yields [`Error::ConcurrentModification`] once the list changes.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            source: self.clone(),
            index: 0,
            mod_count: self.mod_count(),
            failed: false,
        }
    }

    /// Starts a transaction that lasts until the returned guard is dropped.
    ///
    /// Inside a transaction opened by [`begin_change`](Self::begin_change), the guard
    /// joins it instead.
    ///
    /// # Panics
    ///
    /// Panics if another guard for this list is alive.
    pub fn borrow_mut(&self) -> ItemsMut<'_, T> {
        let mut data = self.0.data.borrow_mut();
        let owns_change = !data.builder.is_open();
        if owns_change {
            data.builder.open();
        }
        ItemsMut {
            data,
            dispatch: Dispatch {
                owner: &self.0,
                owns_change,
                changes: None,
            },
        }
    }

    /// Opens a transaction spanning any number of mutator calls.
    pub fn begin_change(&self) -> Result<()> {
        self.0.try_data()?.builder.begin_change()
    }

    /// Closes the transaction opened by [`begin_change`](Self::begin_change) and notifies.
    pub fn end_change(&self) -> Result<()> {
        let changes = {
            let mut data = self.0.try_data()?;
            let data = &mut *data;
            data.builder.end_change(&data.items)?
        };
        if let Some(mut changes) = changes {
            self.0.notify(&mut changes);
        }
        Ok(())
    }

    pub fn push(&self, value: T) {
        self.borrow_mut().push(value)
    }
    pub fn insert(&self, index: usize, value: T) {
        self.borrow_mut().insert(index, value)
    }
    pub fn insert_all(&self, index: usize, values: impl IntoIterator<Item = T>) {
        self.borrow_mut().insert_all(index, values)
    }
    pub fn extend(&self, values: impl IntoIterator<Item = T>) {
        self.borrow_mut().extend(values)
    }
    pub fn remove(&self, index: usize) -> T {
        self.borrow_mut().remove(index)
    }
    pub fn remove_range(&self, range: impl RangeBounds<usize>) -> Vec<T> {
        self.borrow_mut().remove_range(range)
    }
    pub fn retain(&self, f: impl FnMut(&T) -> bool) {
        self.borrow_mut().retain(f)
    }
    pub fn clear(&self) {
        self.borrow_mut().clear()
    }
    pub fn set(&self, index: usize, value: T) -> T {
        self.borrow_mut().set(index, value)
    }
    pub fn replace_range(
        &self,
        range: impl RangeBounds<usize>,
        values: impl IntoIterator<Item = T>,
    ) -> Vec<T> {
        self.borrow_mut().replace_range(range, values)
    }
    pub fn set_all(&self, values: impl IntoIterator<Item = T>) {
        self.borrow_mut().set_all(values)
    }
    pub fn swap(&self, a: usize, b: usize) {
        self.borrow_mut().swap(a, b)
    }
    pub fn sort(&self) -> Result<()>
    where
        T: PartialOrd,
    {
        self.borrow_mut().sort()
    }
    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> Ordering) {
        self.borrow_mut().sort_by(compare)
    }
    pub fn sort_by_key<K: Ord>(&self, key: impl FnMut(&T) -> K) {
        self.borrow_mut().sort_by_key(key)
    }
    pub fn reverse(&self) {
        self.borrow_mut().reverse()
    }
    pub fn rotate(&self, distance: isize) {
        self.borrow_mut().rotate(distance)
    }
    pub fn shuffle(&self, rng: &mut impl Rng) {
        self.borrow_mut().shuffle(rng)
    }
    pub fn update(&self, index: usize) {
        self.borrow_mut().update(index)
    }
    pub fn update_with(&self, index: usize, f: impl FnOnce(&mut T)) {
        self.borrow_mut().update_with(index, f)
    }
}

impl<T: Clone + 'static> ObservableList<T> for StateVec<T> {
    fn len(&self) -> usize {
        StateVec::len(self)
    }
    fn get(&self, index: usize) -> Option<T> {
        StateVec::get(self, index)
    }
    fn to_vec(&self) -> Vec<T> {
        StateVec::to_vec(self)
    }
    fn add_listener(&self, listener: Rc<dyn ListChangeListener<T>>) -> ListenerKey {
        self.0.listeners.add(ListListener::Change(listener))
    }
    fn add_weak_listener(&self, listener: Weak<dyn ListChangeListener<T>>) -> ListenerKey {
        self.0.listeners.add(ListListener::Weak(listener))
    }
    fn add_invalidation_listener(&self, listener: Rc<dyn Fn()>) -> ListenerKey {
        self.0.listeners.add(ListListener::Invalidation(listener))
    }
    fn remove_listener(&self, key: ListenerKey) -> bool {
        self.0.listeners.remove(key)
    }
    fn subscribe(&self, listener: Rc<dyn ListChangeListener<T>>) -> Subscription {
        let key = self.add_listener(listener);
        Subscription::from_weak_fn(Rc::downgrade(&self.0.listeners), move |listeners| {
            listeners.remove(key);
        })
    }
}

impl<T> From<Vec<T>> for StateVec<T> {
    fn from(value: Vec<T>) -> Self {
        Self::from_vec(value)
    }
}
impl<A> FromIterator<A> for StateVec<A> {
    fn from_iter<T: IntoIterator<Item = A>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}
impl<T: Debug> Debug for StateVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.borrow().iter()).finish()
    }
}

impl<T: Serialize> Serialize for StateVec<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.borrow().iter())
    }
}
impl<'de, T: Deserialize<'de> + 'static> Deserialize<'de> for StateVec<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct StateVecVisitor<T>(PhantomData<fn(T)>);
        impl<'de, T: Deserialize<'de> + 'static> serde::de::Visitor<'de> for StateVecVisitor<T> {
            type Value = StateVec<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("sequence")
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(value) = seq.next_element()? {
                    items.push(value);
                }
                Ok(StateVec::from_vec(items))
            }
        }
        deserializer.deserialize_seq(StateVecVisitor(PhantomData))
    }
}

struct RawStateVec<T: 'static> {
    data: RefCell<VecData<T>>,
    mod_count: Cell<u64>,
    listeners: Rc<ListListeners<T>>,
}
impl<T: 'static> RawStateVec<T> {
    fn try_data(&self) -> Result<RefMut<'_, VecData<T>>> {
        self.data
            .try_borrow_mut()
            .map_err(|_| Error::IllegalState("list is being modified through a guard"))
    }
    fn notify(&self, changes: &mut VecChanges<T>) {
        self.listeners.notify(changes);
    }
}

struct VecData<T> {
    items: Vec<T>,
    builder: ChangeBuilder<T>,
}

/// Mutable access to a [`StateVec`] that notifies listeners once, when dropped.
pub struct ItemsMut<'a, T: Clone + 'static> {
    data: RefMut<'a, VecData<T>>,
    dispatch: Dispatch<'a, T>,
}

// Dropped after `data`, so listeners run with the list unborrowed.
struct Dispatch<'a, T: 'static> {
    owner: &'a RawStateVec<T>,
    owns_change: bool,
    changes: Option<VecChanges<T>>,
}

impl<T: Clone + 'static> ItemsMut<'_, T> {
    pub fn len(&self) -> usize {
        self.data.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.items.get(index)
    }
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.items.iter()
    }
    pub fn as_slice(&self) -> &[T] {
        &self.data.items
    }

    fn record(&mut self, edit: Edit<T>) {
        let data = &mut *self.data;
        data.builder.push(edit, &data.items);
        let mod_count = &self.dispatch.owner.mod_count;
        mod_count.set(mod_count.get() + 1);
    }

    pub fn push(&mut self, value: T) {
        let len = self.len();
        self.insert(len, value);
    }
    pub fn insert(&mut self, index: usize, value: T) {
        self.data.items.insert(index, value);
        self.record(Edit::Add {
            from: index,
            to: index + 1,
        });
    }
    pub fn insert_all(&mut self, index: usize, values: impl IntoIterator<Item = T>) {
        assert!(index <= self.len(), "index out of bounds");
        let len = self.len();
        self.data.items.splice(index..index, values);
        let to = index + self.len() - len;
        if to > index {
            self.record(Edit::Add { from: index, to });
        }
    }
    pub fn remove(&mut self, index: usize) -> T {
        let value = self.data.items.remove(index);
        self.record(Edit::Remove {
            index,
            removed: vec![value.clone()],
        });
        value
    }
    pub fn remove_range(&mut self, range: impl RangeBounds<usize>) -> Vec<T> {
        let range = to_range(range, self.len());
        let removed: Vec<T> = self.data.items.drain(range.clone()).collect();
        if !removed.is_empty() {
            self.record(Edit::Remove {
                index: range.start,
                removed: removed.clone(),
            });
        }
        removed
    }
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        let old = take(&mut self.data.items);
        self.data.items.reserve(old.len());
        for value in old {
            if f(&value) {
                self.data.items.push(value);
            } else {
                let index = self.len();
                self.record(Edit::Remove {
                    index,
                    removed: vec![value],
                });
            }
        }
    }
    pub fn clear(&mut self) {
        self.remove_range(..);
    }
    pub fn set(&mut self, index: usize, value: T) -> T {
        let old = replace(&mut self.data.items[index], value);
        self.record(Edit::Replace {
            from: index,
            to: index + 1,
            removed: vec![old.clone()],
        });
        old
    }
    pub fn replace_range(
        &mut self,
        range: impl RangeBounds<usize>,
        values: impl IntoIterator<Item = T>,
    ) -> Vec<T> {
        let range = to_range(range, self.len());
        let len = self.len();
        let removed: Vec<T> = self.data.items.splice(range.clone(), values).collect();
        let added = self.len() + removed.len() - len;
        if added > 0 || !removed.is_empty() {
            self.record(Edit::Replace {
                from: range.start,
                to: range.start + added,
                removed: removed.clone(),
            });
        }
        removed
    }
    pub fn set_all(&mut self, values: impl IntoIterator<Item = T>) {
        self.replace_range(.., values);
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.data.items.swap(a, b);
        let (lo, hi) = (a.min(b), a.max(b));
        let mut permutation: Vec<usize> = (lo..=hi).collect();
        permutation.swap(0, hi - lo);
        self.record(Edit::Permutation {
            from: lo,
            to: hi + 1,
            permutation,
        });
    }

    /// Reorders the whole list so that position `i` holds the element formerly at `new_to_old[i]`.
    fn reorder(&mut self, new_to_old: &[usize]) {
        if is_sorted(new_to_old) {
            return;
        }
        let old_to_new = invert(new_to_old);
        apply_old_to_new(&mut self.data.items, &old_to_new);
        self.record(Edit::Permutation {
            from: 0,
            to: old_to_new.len(),
            permutation: old_to_new,
        });
    }

    /// Stable sort by natural order. Fails without changes if two elements are incomparable.
    pub fn sort(&mut self) -> Result<()>
    where
        T: PartialOrd,
    {
        let items = &self.data.items;
        let mut order: Vec<usize> = (0..items.len()).collect();
        try_sort_by(&mut order, |&a, &b| {
            items[a].partial_cmp(&items[b]).ok_or(Error::Incomparable)
        })?;
        self.reorder(&order);
        Ok(())
    }
    pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) {
        let items = &self.data.items;
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by(|&a, &b| compare(&items[a], &items[b]));
        self.reorder(&order);
    }
    pub fn sort_by_key<K: Ord>(&mut self, mut key: impl FnMut(&T) -> K) {
        self.sort_by(|a, b| key(a).cmp(&key(b)))
    }
    pub fn reverse(&mut self) {
        let order: Vec<usize> = (0..self.len()).rev().collect();
        self.reorder(&order);
    }

    /// Moves the element at `i` to `(i + distance) mod len`.
    pub fn rotate(&mut self, distance: isize) {
        let len = self.len();
        if len == 0 {
            return;
        }
        let k = distance.rem_euclid(len as isize) as usize;
        let order: Vec<usize> = (0..len).map(|i| (i + len - k) % len).collect();
        self.reorder(&order);
    }
    pub fn shuffle(&mut self, rng: &mut impl Rng) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        self.reorder(&order);
    }

    /// Reports that the element at `index` changed in place.
    pub fn update(&mut self, index: usize) {
        assert!(index < self.len(), "index out of bounds");
        self.record(Edit::Update { index });
    }
    pub fn update_with(&mut self, index: usize, f: impl FnOnce(&mut T)) {
        f(&mut self.data.items[index]);
        self.record(Edit::Update { index });
    }
}

impl<T: Clone + 'static> Drop for ItemsMut<'_, T> {
    fn drop(&mut self) {
        if !self.dispatch.owns_change {
            return;
        }
        let data = &mut *self.data;
        if thread::panicking() {
            data.builder.discard();
        } else {
            self.dispatch.changes = data.builder.finish(&data.items);
        }
    }
}
impl<T: 'static> Drop for Dispatch<'_, T> {
    fn drop(&mut self) {
        if let Some(mut changes) = self.changes.take() {
            self.owner.notify(&mut changes);
        }
    }
}

impl<T: Clone + 'static> Index<usize> for ItemsMut<'_, T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data.items[index]
    }
}
impl<T: Clone + 'static> Extend<T> for ItemsMut<'_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let len = self.len();
        self.insert_all(len, iter);
    }
}
impl<T: Clone + Debug + 'static> Debug for ItemsMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator returned by [`StateVec::iter`].
pub struct Iter<T: 'static> {
    source: StateVec<T>,
    index: usize,
    mod_count: u64,
    failed: bool,
}

impl<T: Clone + 'static> Iterator for Iter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.source.mod_count() != self.mod_count {
            self.failed = true;
            return Some(Err(Error::ConcurrentModification));
        }
        let value = self.source.get(self.index)?;
        self.index += 1;
        Some(Ok(value))
    }
}
