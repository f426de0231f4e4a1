use std::ops::Range;

use crate::{utils::apply_permutation, Error, Result};

mod builder;

pub use builder::ChangeBuilder;

#[cfg(test)]
mod tests;

/// One primitive mutation, described after it has been applied to the backing sequence.
///
/// Indices refer to the sequence state immediately before the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit<T> {
    /// Elements were inserted at `from..to`.
    Add { from: usize, to: usize },
    /// `removed` was taken out starting at `index`.
    Remove { index: usize, removed: Vec<T> },
    /// `removed` was taken out starting at `from` and `from..to` was inserted in its place.
    Replace {
        from: usize,
        to: usize,
        removed: Vec<T>,
    },
    /// The element formerly at `i` moved to `permutation[i - from]`.
    Permutation {
        from: usize,
        to: usize,
        permutation: Vec<usize>,
    },
    /// The element at `index` changed in place.
    Update { index: usize },
}

/// One coalesced unit of a finished transaction, in the final index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VecChange<T> {
    from: usize,
    to: usize,
    removed: Vec<T>,
    added: Vec<T>,
    permutation: Vec<usize>,
    updated: bool,
}

impl<T> VecChange<T> {
    pub(crate) fn replace(from: usize, removed: Vec<T>, added: Vec<T>) -> Self {
        Self {
            from,
            to: from + added.len(),
            removed,
            added,
            permutation: Vec::new(),
            updated: false,
        }
    }
    pub(crate) fn permutation(from: usize, permutation: Vec<usize>) -> Self {
        Self {
            from,
            to: from + permutation.len(),
            removed: Vec::new(),
            added: Vec::new(),
            permutation,
            updated: false,
        }
    }
    pub(crate) fn update(from: usize, values: Vec<T>) -> Self {
        Self {
            from,
            to: from + values.len(),
            removed: Vec::new(),
            added: values,
            permutation: Vec::new(),
            updated: true,
        }
    }

    pub fn from(&self) -> usize {
        self.from
    }
    pub fn to(&self) -> usize {
        self.to
    }
    pub fn range(&self) -> Range<usize> {
        self.from..self.to
    }

    /// Elements removed from the pre-transaction sequence, in their original order.
    pub fn removed(&self) -> &[T] {
        &self.removed
    }

    /// Values now at `from..to`.
    ///
    /// Empty for permutations. For updates these are the values after the update.
    pub fn added(&self) -> &[T] {
        &self.added
    }

    /// The permutation table in absolute indices, if this is a permutation.
    pub fn permutation_table(&self) -> Option<&[usize]> {
        if self.permutation.is_empty() {
            None
        } else {
            Some(&self.permutation)
        }
    }

    /// New index of the element that was at `old_index` before the permutation.
    ///
    /// # Panics
    ///
    /// Panics if this is not a permutation or `old_index` is outside `from..to`.
    pub fn new_index(&self, old_index: usize) -> usize {
        assert!(self.was_permutated(), "not a permutation");
        assert!(self.range().contains(&old_index), "index out of bounds");
        self.permutation[old_index - self.from]
    }

    pub fn was_added(&self) -> bool {
        !self.was_permutated() && !self.updated && self.to > self.from
    }
    pub fn was_removed(&self) -> bool {
        !self.removed.is_empty()
    }
    pub fn was_replaced(&self) -> bool {
        self.was_added() && self.was_removed()
    }
    pub fn was_permutated(&self) -> bool {
        !self.permutation.is_empty()
    }
    pub fn was_updated(&self) -> bool {
        self.updated
    }
}

/// Restartable cursor over the segments of one finished transaction.
///
/// Valid only during the listener callback that received it.
#[derive(Debug, Clone)]
pub struct VecChanges<T> {
    segments: Vec<VecChange<T>>,
    next: usize,
    current: Option<usize>,
}

impl<T> VecChanges<T> {
    pub(crate) fn new(segments: Vec<VecChange<T>>) -> Self {
        Self {
            segments,
            next: 0,
            current: None,
        }
    }

    /// Advances to the next segment. Returns `false` once exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.next < self.segments.len() {
            self.current = Some(self.next);
            self.next += 1;
            true
        } else {
            self.current = None;
            false
        }
    }

    /// Rewinds to before the first segment.
    pub fn reset(&mut self) {
        self.next = 0;
        self.current = None;
    }

    pub fn current(&self) -> Result<&VecChange<T>> {
        match self.current {
            Some(index) => Ok(&self.segments[index]),
            None => Err(Error::IllegalState(
                "cursor is not positioned on a change; call next() first",
            )),
        }
    }

    pub fn from(&self) -> Result<usize> {
        Ok(self.current()?.from())
    }
    pub fn to(&self) -> Result<usize> {
        Ok(self.current()?.to())
    }
    pub fn removed(&self) -> Result<&[T]> {
        Ok(self.current()?.removed())
    }
    pub fn added(&self) -> Result<&[T]> {
        Ok(self.current()?.added())
    }

    /// New index of the element that was at `old_index`.
    ///
    /// Fails with [`Error::IllegalState`] if the current segment is not a permutation.
    pub fn permutation(&self, old_index: usize) -> Result<usize> {
        let c = self.current()?;
        if !c.was_permutated() {
            return Err(Error::IllegalState("current change is not a permutation"));
        }
        Ok(c.new_index(old_index))
    }
    pub fn was_added(&self) -> Result<bool> {
        Ok(self.current()?.was_added())
    }
    pub fn was_removed(&self) -> Result<bool> {
        Ok(self.current()?.was_removed())
    }
    pub fn was_replaced(&self) -> Result<bool> {
        Ok(self.current()?.was_replaced())
    }
    pub fn was_permutated(&self) -> Result<bool> {
        Ok(self.current()?.was_permutated())
    }
    pub fn was_updated(&self) -> Result<bool> {
        Ok(self.current()?.was_updated())
    }

    /// All segments, ordered by `from`.
    pub fn segments(&self) -> &[VecChange<T>] {
        &self.segments
    }

    /// Replays this transaction on a copy of the pre-transaction sequence.
    pub fn apply_to(&self, items: &mut Vec<T>)
    where
        T: Clone,
    {
        for c in &self.segments {
            if let Some(permutation) = c.permutation_table() {
                apply_permutation(items, c.from, permutation);
            } else if c.updated {
                items[c.range()].clone_from_slice(&c.added);
            } else {
                items.splice(c.from..c.from + c.removed.len(), c.added.iter().cloned());
            }
        }
    }
}
