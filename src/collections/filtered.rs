use std::{
    cell::{Cell, RefCell},
    fmt::{self, Debug},
    mem::{replace, take},
    rc::{Rc, Weak},
};

use derive_ex::Ex;

use crate::{
    collections::weak_listener,
    listener::{ListListener, ListListeners},
    utils::{apply_old_to_new, invert, is_sorted},
    ChangeBuilder, Edit, Error, ListChangeListener, ListenerKey, Matcher, Mode, ObservableList,
    Result, SourceIndexed, Subscription, VecChange, VecChanges,
};

#[cfg(test)]
mod tests;

/// View of the elements of a source list that satisfy a [`Matcher`], in source order.
///
/// In [`Mode::Live`] membership follows every source change. In [`Mode::Batch`] source
/// insertions are mirrored untested until [`filter`](Self::filter) is called.
#[derive(Ex)]
#[derive_ex(Clone(bound()))]
pub struct FilteredVec<T: 'static>(Rc<RawFilteredVec<T>>);

impl<T: Clone + 'static> FilteredVec<T> {
    pub fn new(source: impl ObservableList<T> + 'static, matcher: Matcher<T>) -> Self {
        Self::with_mode(source, matcher, Mode::Live)
    }

    /// In [`Mode::Batch`] the view starts out mirroring the whole source.
    pub fn with_mode(
        source: impl ObservableList<T> + 'static,
        matcher: Matcher<T>,
        mode: Mode,
    ) -> Self {
        let source: Rc<dyn ObservableList<T>> = Rc::new(source);
        let mut index = Vec::new();
        let mut items = Vec::new();
        for (i, value) in source.to_vec().into_iter().enumerate() {
            if mode == Mode::Batch || matcher.matches(&value) {
                index.push(i);
                items.push(value);
            }
        }
        let raw = Rc::new(RawFilteredVec {
            source,
            data: RefCell::new(FilterData {
                matcher,
                mode,
                index,
                items,
                builder: ChangeBuilder::new(),
            }),
            listeners: Rc::new(ListListeners::new()),
            dispatching: Cell::new(0),
        });
        raw.source.add_weak_listener(weak_listener(&raw));
        Self(raw)
    }

    pub fn mode(&self) -> Mode {
        self.0.data.borrow().mode
    }

    /// Fails with [`Error::IllegalState`] while this view is notifying its listeners.
    ///
    /// Switching from [`Mode::Batch`] to [`Mode::Live`] runs [`filter`](Self::filter).
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        if self.0.dispatching.get() > 0 {
            return Err(Error::IllegalState(
                "mode cannot change while the view is notifying",
            ));
        }
        let old = replace(&mut self.0.data.borrow_mut().mode, mode);
        tracing::debug!(%old, %mode, "filtered view mode changed");
        if old == Mode::Batch && mode == Mode::Live {
            self.filter();
        }
        Ok(())
    }

    pub fn matcher(&self) -> Matcher<T> {
        self.0.data.borrow().matcher.clone()
    }

    /// In [`Mode::Live`] the view is rebuilt at once and reported as one replacement.
    /// In [`Mode::Batch`] the matcher takes effect at the next [`filter`](Self::filter).
    pub fn set_matcher(&self, matcher: Matcher<T>) {
        let live = {
            let mut data = self.0.data.borrow_mut();
            data.matcher = matcher;
            data.mode == Mode::Live
        };
        if live {
            let values = self.0.source.to_vec();
            self.0.transaction(|data| data.rebuild(values));
        }
    }

    /// Re-tests every source element and reports the minimal insertions and removals.
    pub fn filter(&self) {
        let values = self.0.source.to_vec();
        tracing::debug!(len = values.len(), "re-filtering view");
        self.0.transaction(|data| data.refilter(&values));
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

impl<T: Clone + 'static> ObservableList<T> for FilteredVec<T> {
    fn len(&self) -> usize {
        FilteredVec::len(self)
    }
    fn get(&self, index: usize) -> Option<T> {
        FilteredVec::get(self, index)
    }
    fn to_vec(&self) -> Vec<T> {
        FilteredVec::to_vec(self)
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

impl<T: Clone + 'static> SourceIndexed<T> for FilteredVec<T> {
    fn direct_source(&self) -> Rc<dyn ObservableList<T>> {
        self.0.source.clone()
    }
    fn source_index(&self, index: usize) -> usize {
        self.0.data.borrow().index[index]
    }
}

impl<T: Clone + Debug + 'static> Debug for FilteredVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.data.borrow().items.iter()).finish()
    }
}

struct RawFilteredVec<T: 'static> {
    source: Rc<dyn ObservableList<T>>,
    data: RefCell<FilterData<T>>,
    listeners: Rc<ListListeners<T>>,
    dispatching: Cell<usize>,
}

impl<T: Clone + 'static> RawFilteredVec<T> {
    fn transaction(&self, f: impl FnOnce(&mut FilterData<T>)) {
        let changes = {
            let mut data = self.data.borrow_mut();
            data.builder.open();
            f(&mut data);
            let data = &mut *data;
            data.builder.finish(&data.items)
        };
        if let Some(mut changes) = changes {
            self.dispatching.set(self.dispatching.get() + 1);
            self.listeners.notify(&mut changes);
            self.dispatching.set(self.dispatching.get() - 1);
        }
    }
}

impl<T: Clone + 'static> ListChangeListener<T> for RawFilteredVec<T> {
    fn on_changed(&self, changes: &mut VecChanges<T>) {
        self.transaction(|data| {
            for c in changes.segments() {
                data.apply(c);
            }
        });
    }
}

struct FilterData<T> {
    matcher: Matcher<T>,
    mode: Mode,
    index: Vec<usize>,
    items: Vec<T>,
    builder: ChangeBuilder<T>,
}

impl<T: Clone + 'static> FilterData<T> {
    fn live(&self) -> bool {
        self.mode == Mode::Live
    }

    /// Applies one source segment. Segments arrive in order, so indices left of
    /// `c.from()` are already final.
    fn apply(&mut self, c: &VecChange<T>) {
        if let Some(permutation) = c.permutation_table() {
            self.permute_source(c.from(), permutation);
        } else if c.was_updated() {
            for (k, value) in c.added().iter().enumerate() {
                self.update_source(c.from() + k, value);
            }
        } else {
            self.replace_source(c.from(), c.removed().len(), c.added());
        }
    }

    fn replace_source(&mut self, from: usize, removed: usize, added: &[T]) {
        let start = self.index.partition_point(|&s| s < from);
        let end = self.index.partition_point(|&s| s < from + removed);
        if start < end {
            self.index.drain(start..end);
            let removed = self.items.drain(start..end).collect();
            self.builder.push(
                Edit::Remove {
                    index: start,
                    removed,
                },
                &self.items,
            );
        }
        for s in &mut self.index[start..] {
            *s = *s - removed + added.len();
        }
        let live = self.live();
        let (index, items): (Vec<usize>, Vec<T>) = added
            .iter()
            .enumerate()
            .filter(|(_, value)| !live || self.matcher.matches(value))
            .map(|(k, value)| (from + k, value.clone()))
            .unzip();
        let to = start + items.len();
        self.index.splice(start..start, index);
        self.items.splice(start..start, items);
        self.builder.push(Edit::Add { from: start, to }, &self.items);
    }

    fn update_source(&mut self, source_index: usize, value: &T) {
        let live = self.live();
        let keep = !live || self.matcher.matches(value);
        match (self.index.binary_search(&source_index), keep) {
            (Ok(p), true) => {
                self.items[p] = value.clone();
                self.builder.push(Edit::Update { index: p }, &self.items);
            }
            (Ok(p), false) => {
                self.index.remove(p);
                let old = self.items.remove(p);
                self.builder.push(
                    Edit::Remove {
                        index: p,
                        removed: vec![old],
                    },
                    &self.items,
                );
            }
            (Err(p), true) if live => {
                self.index.insert(p, source_index);
                self.items.insert(p, value.clone());
                self.builder.push(Edit::Add { from: p, to: p + 1 }, &self.items);
            }
            _ => {}
        }
    }

    fn permute_source(&mut self, from: usize, permutation: &[usize]) {
        let start = self.index.partition_point(|&s| s < from);
        let end = self.index.partition_point(|&s| s < from + permutation.len());
        let block = &mut self.index[start..end];
        for s in block.iter_mut() {
            *s = permutation[*s - from];
        }
        let mut new_to_old: Vec<usize> = (0..block.len()).collect();
        new_to_old.sort_by_key(|&k| block[k]);
        if is_sorted(&new_to_old) {
            return;
        }
        let old_to_new = invert(&new_to_old);
        apply_old_to_new(block, &old_to_new);
        apply_old_to_new(&mut self.items[start..end], &old_to_new);
        self.builder.push(
            Edit::Permutation {
                from: start,
                to: end,
                permutation: old_to_new.iter().map(|&n| start + n).collect(),
            },
            &self.items,
        );
    }

    fn refilter(&mut self, values: &[T]) {
        let mut v = 0;
        for (i, value) in values.iter().enumerate() {
            let present = self.index.get(v) == Some(&i);
            match (present, self.matcher.matches(value)) {
                (true, true) => v += 1,
                (true, false) => {
                    self.index.remove(v);
                    let old = self.items.remove(v);
                    self.builder.push(
                        Edit::Remove {
                            index: v,
                            removed: vec![old],
                        },
                        &self.items,
                    );
                }
                (false, true) => {
                    self.index.insert(v, i);
                    self.items.insert(v, value.clone());
                    self.builder.push(Edit::Add { from: v, to: v + 1 }, &self.items);
                    v += 1;
                }
                (false, false) => {}
            }
        }
    }

    fn rebuild(&mut self, values: Vec<T>) {
        let removed = take(&mut self.items);
        self.index.clear();
        for (i, value) in values.into_iter().enumerate() {
            if self.matcher.matches(&value) {
                self.index.push(i);
                self.items.push(value);
            }
        }
        self.builder.push(Edit::Remove { index: 0, removed }, &self.items);
        let to = self.items.len();
        self.builder.push(Edit::Add { from: 0, to }, &self.items);
    }
}
