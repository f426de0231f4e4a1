use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    fmt::{self, Debug},
    mem::replace,
    rc::{Rc, Weak},
};

use derive_ex::Ex;

use crate::{
    collections::weak_listener,
    listener::{ListListener, ListListeners},
    utils::{apply_old_to_new, invert, is_sorted, try_sort_by},
    ChangeBuilder, Comparator, Edit, Error, ListChangeListener, ListenerKey, Mode,
    ObservableList, Result, SourceIndexed, Subscription, VecChange, VecChanges,
};


/// View of a source list ordered by a [`Comparator`].
///
/// Equal elements keep their relative source order. In [`Mode::Batch`] source insertions
/// are appended unsorted until [`sort`](Self::sort) is called.
#[derive(Ex)]
#[derive_ex(Clone(bound()))]
pub struct SortedVec<T: 'static>(Rc<RawSortedVec<T>>);

impl<T: Clone + 'static> SortedVec<T> {
    pub fn new(
        source: impl ObservableList<T> + 'static,
        comparator: Comparator<T>,
    ) -> Result<Self> {
        Self::with_mode(source, comparator, Mode::Live)
    }

    /// Sorted by [`PartialOrd`].
    pub fn natural(source: impl ObservableList<T> + 'static) -> Result<Self>
    where
        T: PartialOrd,
    {
        Self::new(source, Comparator::natural())
    }

    /// In [`Mode::Batch`] the view starts out in source order.
    pub fn with_mode(
        source: impl ObservableList<T> + 'static,
        comparator: Comparator<T>,
        mode: Mode,
    ) -> Result<Self> {
        let source: Rc<dyn ObservableList<T>> = Rc::new(source);
        let items = source.to_vec();
        let mut data = SortData {
            comparator,
            mode,
            index: (0..items.len()).collect(),
            items,
            builder: ChangeBuilder::new(),
        };
        if mode == Mode::Live {
            let order = data.sorted_order()?;
            data.index = order.iter().map(|&i| data.index[i]).collect();
            data.items = order.iter().map(|&i| data.items[i].clone()).collect();
        }
        let raw = Rc::new(RawSortedVec {
            source,
            data: RefCell::new(data),
            listeners: Rc::new(ListListeners::new()),
            dispatching: Cell::new(0),
        });
        raw.source.add_weak_listener(weak_listener(&raw));
        Ok(Self(raw))
    }

    pub fn mode(&self) -> Mode {
        self.0.data.borrow().mode
    }

    /// Fails with [`Error::IllegalState`] while this view is notifying its listeners.
    ///
    /// Switching from [`Mode::Batch`] to [`Mode::Live`] runs [`sort`](Self::sort).
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        if self.0.dispatching.get() > 0 {
            return Err(Error::IllegalState(
                "mode cannot change while the view is notifying",
            ));
        }
        let old = replace(&mut self.0.data.borrow_mut().mode, mode);
        tracing::debug!(%old, %mode, "sorted view mode changed");
        if old == Mode::Batch && mode == Mode::Live {
            self.sort()?;
        }
        Ok(())
    }

    pub fn comparator(&self) -> Comparator<T> {
        self.0.data.borrow().comparator.clone()
    }

    /// Re-sorts immediately in either mode and reports a permutation.
    ///
    /// If the new comparator fails, the previous one is kept and nothing changes.
    pub fn set_comparator(&self, comparator: Comparator<T>) -> Result<()> {
        let old = replace(&mut self.0.data.borrow_mut().comparator, comparator);
        let r = self.sort();
        if r.is_err() {
            self.0.data.borrow_mut().comparator = old;
        }
        r
    }

    /// Restores sorted order, reporting it as one permutation.
    pub fn sort(&self) -> Result<()> {
        tracing::debug!("re-sorting view");
        self.0.transaction(|data| data.resort())
    }

    pub fn len(&self) -> usize {
        self.0.data.borrow().items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn get(&self, index: usize) -> Option<T> {
        self.0.data.borrow().items.get(index).cloned()
    }
    pub fn to_vec(&self) -> Vec<T> {
        self.0.data.borrow().items.clone()
    }
}

impl<T: Clone + 'static> ObservableList<T> for SortedVec<T> {
    fn len(&self) -> usize {
        SortedVec::len(self)
    }
    fn get(&self, index: usize) -> Option<T> {
        SortedVec::get(self, index)
    }
    fn to_vec(&self) -> Vec<T> {
        SortedVec::to_vec(self)
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
    fn as_source_indexed(&self) -> Option<&dyn SourceIndexed<T>> {
        Some(self)
    }
}

impl<T: Clone + 'static> SourceIndexed<T> for SortedVec<T> {
    fn direct_source(&self) -> Rc<dyn ObservableList<T>> {
        self.0.source.clone()
    }
    fn source_index(&self, index: usize) -> usize {
        self.0.data.borrow().index[index]
    }
}

impl<T: Clone + Debug + 'static> Debug for SortedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.data.borrow().items.iter()).finish()
    }
}

struct RawSortedVec<T: 'static> {
    source: Rc<dyn ObservableList<T>>,
    data: RefCell<SortData<T>>,
    listeners: Rc<ListListeners<T>>,
    dispatching: Cell<usize>,
}

impl<T: Clone + 'static> RawSortedVec<T> {
    /// Runs `f` as one transaction of this view. An error discards everything `f` recorded.
    fn transaction(&self, f: impl FnOnce(&mut SortData<T>) -> Result<()>) -> Result<()> {
        let changes = {
            let mut data = self.data.borrow_mut();
            data.builder.open();
            if let Err(e) = f(&mut data) {
                data.builder.discard();
                return Err(e);
            }
            let data = &mut *data;
            data.builder.finish(&data.items)
        };
        if let Some(mut changes) = changes {
            self.dispatching.set(self.dispatching.get() + 1);
            self.listeners.notify(&mut changes);
            self.dispatching.set(self.dispatching.get() - 1);
        }
        Ok(())
    }
}

impl<T: Clone + 'static> ListChangeListener<T> for RawSortedVec<T> {
    fn on_changed(&self, changes: &mut VecChanges<T>) {
        let r = self.transaction(|data| {
            for c in changes.segments() {
                data.apply(c)?;
            }
            Ok(())
        });
        if let Err(e) = r {
            panic!("sorted view cannot order a source change: {e}");
        }
    }
}

struct SortData<T> {
    comparator: Comparator<T>,
    mode: Mode,
    index: Vec<usize>,
    items: Vec<T>,
    builder: ChangeBuilder<T>,
}

impl<T: Clone + 'static> SortData<T> {
    fn live(&self) -> bool {
        self.mode == Mode::Live
    }

    /// Order by comparator, then by source index.
    fn compare(&self, a: usize, b: usize) -> Result<Ordering> {
        let ord = self.comparator.compare(&self.items[a], &self.items[b])?;
        Ok(ord.then(self.index[a].cmp(&self.index[b])))
    }
    fn sorted_order(&self) -> Result<Vec<usize>> {
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        try_sort_by(&mut order, |&a, &b| self.compare(a, b))?;
        Ok(order)
    }
    fn resort(&mut self) -> Result<()> {
        let new_to_old = self.sorted_order()?;
        if is_sorted(&new_to_old) {
            return Ok(());
        }
        let old_to_new = invert(&new_to_old);
        apply_old_to_new(&mut self.index, &old_to_new);
        apply_old_to_new(&mut self.items, &old_to_new);
        self.builder.push(
            Edit::Permutation {
                from: 0,
                to: old_to_new.len(),
                permutation: old_to_new,
            },
            &self.items,
        );
        Ok(())
    }

    /// Position at which `value` from `source_index` belongs. The view must be sorted.
    fn insertion_point(&self, value: &T, source_index: usize) -> Result<usize> {
        let (mut lo, mut hi) = (0, self.items.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            let ord = self.comparator.compare(&self.items[mid], value)?;
            if ord.then(self.index[mid].cmp(&source_index)) == Ordering::Less {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    fn apply(&mut self, c: &VecChange<T>) -> Result<()> {
        if let Some(permutation) = c.permutation_table() {
            self.permute_source(c.from(), permutation)
        } else if c.was_updated() {
            for (k, value) in c.added().iter().enumerate() {
                self.update_source(c.from() + k, value)?;
            }
            Ok(())
        } else {
            self.replace_source(c.from(), c.removed().len(), c.added())
        }
    }

    // A source reordering only changes how ties are broken, so the view is re-derived
    // from scratch instead of patched.
    fn permute_source(&mut self, from: usize, permutation: &[usize]) -> Result<()> {
        let range = from..from + permutation.len();
        for s in &mut self.index {
            if range.contains(s) {
                *s = permutation[*s - from];
            }
        }
        if self.live() {
            self.resort()?;
        }
        Ok(())
    }

    fn update_source(&mut self, source_index: usize, value: &T) -> Result<()> {
        let Some(p) = self.index.iter().position(|&s| s == source_index) else {
            return Ok(());
        };
        if !self.live() {
            self.items[p] = value.clone();
            self.builder.push(Edit::Update { index: p }, &self.items);
            return Ok(());
        }
        self.index.remove(p);
        let old = self.items.remove(p);
        let q = self.insertion_point(value, source_index)?;
        self.index.insert(q, source_index);
        self.items.insert(q, value.clone());
        if p == q {
            self.builder.push(Edit::Update { index: p }, &self.items);
        } else {
            self.builder.push(
                Edit::Remove {
                    index: p,
                    removed: vec![old],
                },
                &self.items,
            );
            self.builder.push(Edit::Add { from: q, to: q + 1 }, &self.items);
        }
        Ok(())
    }

    fn replace_source(&mut self, from: usize, removed: usize, added: &[T]) -> Result<()> {
        let end = from + removed;
        let mut p = 0;
        while p < self.index.len() {
            if (from..end).contains(&self.index[p]) {
                self.index.remove(p);
                let old = self.items.remove(p);
                self.builder.push(
                    Edit::Remove {
                        index: p,
                        removed: vec![old],
                    },
                    &self.items,
                );
            } else {
                p += 1;
            }
        }
        for s in &mut self.index {
            if *s >= end {
                *s = *s - removed + added.len();
            }
        }
        for (k, value) in added.iter().enumerate() {
            let source_index = from + k;
            let q = if self.live() {
                self.insertion_point(value, source_index)?
            } else {
                self.items.len()
            };
            self.index.insert(q, source_index);
            self.items.insert(q, value.clone());
            self.builder.push(Edit::Add { from: q, to: q + 1 }, &self.items);
        }
        Ok(())
    }
}
