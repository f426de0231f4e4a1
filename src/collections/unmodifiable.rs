use std::{
    cmp::Ordering,
    fmt::{self, Debug},
    ops::RangeBounds,
    rc::{Rc, Weak},
};

use derive_ex::Ex;
use rand::Rng;

use crate::{
    Error, ListChangeListener, ListenerKey, ObservableList, Result, SourceIndexed, Subscription,
};


/// Read-only handle to another observable list.
///
/// Reads and listener registration pass through. Every [`StateVec`](crate::StateVec) mutator
/// has a counterpart here that fails with [`Error::UnsupportedOperation`].
#[derive(Ex)]
#[derive_ex(Clone(bound()))]
pub struct UnmodifiableVec<T: 'static>(Rc<dyn ObservableList<T>>);

impl<T: Clone + 'static> UnmodifiableVec<T> {
    pub fn new(list: impl ObservableList<T> + 'static) -> Self {
        Self(Rc::new(list))
    }

    pub fn push(&self, _value: T) -> Result<()> {
        Err(Error::UnsupportedOperation("push"))
    }
    pub fn insert(&self, _index: usize, _value: T) -> Result<()> {
        Err(Error::UnsupportedOperation("insert"))
    }
    pub fn insert_all(&self, _index: usize, _values: impl IntoIterator<Item = T>) -> Result<()> {
        Err(Error::UnsupportedOperation("insert_all"))
    }
    pub fn extend(&self, _values: impl IntoIterator<Item = T>) -> Result<()> {
        Err(Error::UnsupportedOperation("extend"))
    }
    pub fn remove(&self, _index: usize) -> Result<T> {
        Err(Error::UnsupportedOperation("remove"))
    }
    pub fn remove_range(&self, _range: impl RangeBounds<usize>) -> Result<Vec<T>> {
        Err(Error::UnsupportedOperation("remove_range"))
    }
    pub fn retain(&self, _f: impl FnMut(&T) -> bool) -> Result<()> {
        Err(Error::UnsupportedOperation("retain"))
    }
    pub fn clear(&self) -> Result<()> {
        Err(Error::UnsupportedOperation("clear"))
    }
    pub fn set(&self, _index: usize, _value: T) -> Result<T> {
        Err(Error::UnsupportedOperation("set"))
    }
    pub fn replace_range(
        &self,
        _range: impl RangeBounds<usize>,
        _values: impl IntoIterator<Item = T>,
    ) -> Result<Vec<T>> {
        Err(Error::UnsupportedOperation("replace_range"))
    }
    pub fn set_all(&self, _values: impl IntoIterator<Item = T>) -> Result<()> {
        Err(Error::UnsupportedOperation("set_all"))
    }
    pub fn swap(&self, _a: usize, _b: usize) -> Result<()> {
        Err(Error::UnsupportedOperation("swap"))
    }
    pub fn sort(&self) -> Result<()> {
        Err(Error::UnsupportedOperation("sort"))
    }
    pub fn sort_by(&self, _compare: impl FnMut(&T, &T) -> Ordering) -> Result<()> {
        Err(Error::UnsupportedOperation("sort_by"))
    }
    pub fn sort_by_key<K: Ord>(&self, _key: impl FnMut(&T) -> K) -> Result<()> {
        Err(Error::UnsupportedOperation("sort_by_key"))
    }
    pub fn reverse(&self) -> Result<()> {
        Err(Error::UnsupportedOperation("reverse"))
    }
    pub fn rotate(&self, _distance: isize) -> Result<()> {
        Err(Error::UnsupportedOperation("rotate"))
    }
    pub fn shuffle(&self, _rng: &mut impl Rng) -> Result<()> {
        Err(Error::UnsupportedOperation("shuffle"))
    }
    pub fn update(&self, _index: usize) -> Result<()> {
        Err(Error::UnsupportedOperation("update"))
    }
    pub fn update_with(&self, _index: usize, _f: impl FnOnce(&mut T)) -> Result<()> {
        Err(Error::UnsupportedOperation("update_with"))
    }
}

impl<T: Clone + 'static> ObservableList<T> for UnmodifiableVec<T> {
    fn len(&self) -> usize {
        self.0.len()
    }
    fn get(&self, index: usize) -> Option<T> {
        self.0.get(index)
    }
    fn to_vec(&self) -> Vec<T> {
        self.0.to_vec()
    }
    fn add_listener(&self, listener: Rc<dyn ListChangeListener<T>>) -> ListenerKey {
        self.0.add_listener(listener)
    }
    fn add_weak_listener(&self, listener: Weak<dyn ListChangeListener<T>>) -> ListenerKey {
        self.0.add_weak_listener(listener)
    }
    fn add_invalidation_listener(&self, listener: Rc<dyn Fn()>) -> ListenerKey {
        self.0.add_invalidation_listener(listener)
    }
    fn remove_listener(&self, key: ListenerKey) -> bool {
        self.0.remove_listener(key)
    }
    fn subscribe(&self, listener: Rc<dyn ListChangeListener<T>>) -> Subscription {
        self.0.subscribe(listener)
    }
    fn as_source_indexed(&self) -> Option<&dyn SourceIndexed<T>> {
        self.0.as_source_indexed()
    }
}

impl<T: Clone + Debug + 'static> Debug for UnmodifiableVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.to_vec()).finish()
    }
}
