use std::{cmp::Ordering, rc::Rc};

use derive_ex::Ex;
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::{Error, ObservableList, Result};

#[cfg(test)]
mod tests;

/// A derived view that can map its indices back to its source.
///
/// Chains of views are walked through [`ObservableList::as_source_indexed`].
pub trait SourceIndexed<T: Clone + 'static> {
    /// The list this view observes.
    fn direct_source(&self) -> Rc<dyn ObservableList<T>>;

    /// Index in [`direct_source`](Self::direct_source) of the element at `index` in this view.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    fn source_index(&self, index: usize) -> usize;

    /// The first list in the chain that is not itself a view.
    fn bottom_most_source(&self) -> Rc<dyn ObservableList<T>> {
        let mut source = self.direct_source();
        loop {
            let next = match source.as_source_indexed() {
                Some(view) => view.direct_source(),
                None => return source,
            };
            source = next;
        }
    }

    /// Index in [`bottom_most_source`](Self::bottom_most_source) of the element at `index`.
    fn bottom_most_source_index(&self, index: usize) -> usize {
        let mut index = self.source_index(index);
        let mut source = self.direct_source();
        loop {
            let next = match source.as_source_indexed() {
                Some(view) => {
                    index = view.source_index(index);
                    view.direct_source()
                }
                None => return index,
            };
            source = next;
        }
    }
}

/// When a derived view applies its rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, FromStr, Serialize, Deserialize,
)]
#[display(style = "UPPERCASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Every source change is re-derived immediately.
    #[default]
    Live,
    /// Source changes are mirrored as-is until the view is re-derived explicitly.
    Batch,
}

/// Membership predicate of a [`FilteredVec`](crate::FilteredVec).
#[derive(Ex)]
#[derive_ex(Clone(bound()))]
pub struct Matcher<T>(Rc<dyn Fn(&T) -> bool>);

impl<T: 'static> Matcher<T> {
    pub fn new(f: impl Fn(&T) -> bool + 'static) -> Self {
        Self(Rc::new(f))
    }
    pub fn all() -> Self {
        Self::new(|_| true)
    }
    pub fn matches(&self, value: &T) -> bool {
        (self.0)(value)
    }
}

/// Ordering of a [`SortedVec`](crate::SortedVec). Comparisons may fail.
#[derive(Ex)]
#[derive_ex(Clone(bound()))]
pub struct Comparator<T>(Rc<dyn Fn(&T, &T) -> Result<Ordering>>);

impl<T: 'static> Comparator<T> {
    pub fn new(f: impl Fn(&T, &T) -> Ordering + 'static) -> Self {
        Self(Rc::new(move |a, b| Ok(f(a, b))))
    }
    pub fn by_key<K: Ord>(key: impl Fn(&T) -> K + 'static) -> Self {
        Self::new(move |a, b| key(a).cmp(&key(b)))
    }

    /// Ordering by [`PartialOrd`]; incomparable pairs fail with [`Error::Incomparable`].
    pub fn natural() -> Self
    where
        T: PartialOrd,
    {
        Self(Rc::new(|a: &T, b: &T| {
            a.partial_cmp(b).ok_or(Error::Incomparable)
        }))
    }
    pub fn reversed(&self) -> Self {
        let f = self.0.clone();
        Self(Rc::new(move |a, b| f(b, a)))
    }
    pub fn compare(&self, a: &T, b: &T) -> Result<Ordering> {
        (self.0)(a, b)
    }
}
