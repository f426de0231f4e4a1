use std::{cmp::min, mem::take, ops::Range};

use crate::{utils::moved_range, Error, Result};

use super::{Edit, VecChange, VecChanges};


/// Accumulates the edits of one transaction and reduces them to [`VecChanges`].
///
/// Every `next_*` call must follow the mutation it describes; the builder trusts that the
/// reported edits match what was done to the backing sequence.
///
/// Internally the pending state is a sorted list of disjoint, non-adjacent segments in the
/// current index space. Elements outside every segment are untouched originals, so the
/// segments alone describe the diff against the pre-transaction sequence.
pub struct ChangeBuilder<T> {
    is_open: bool,
    segments: Vec<Pending<T>>,
    updates: Vec<usize>,
    permutation: Option<PendingPermutation<T>>,
}

struct Pending<T> {
    from: usize,
    to: usize,
    removed: Vec<T>,
}

/// Net reordering of a transaction that has no insertions or removals yet.
struct PendingPermutation<T> {
    from: usize,
    old_to_new: Vec<usize>,
    originals: Vec<T>,
}
impl<T> PendingPermutation<T> {
    fn range(&self) -> Range<usize> {
        self.from..self.from + self.old_to_new.len()
    }
    fn new_index(&self, index: usize) -> usize {
        if self.range().contains(&index) {
            self.old_to_new[index - self.from]
        } else {
            index
        }
    }
    fn into_replace(self) -> Pending<T> {
        Pending {
            from: self.from,
            to: self.range().end,
            removed: self.originals,
        }
    }
}

impl<T> Default for ChangeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChangeBuilder<T> {
    pub fn new() -> Self {
        Self {
            is_open: false,
            segments: Vec::new(),
            updates: Vec::new(),
            permutation: None,
        }
    }
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Opens a transaction.
    pub fn begin_change(&mut self) -> Result<()> {
        if self.is_open {
            return Err(Error::IllegalState("a change is already in progress"));
        }
        self.open();
        Ok(())
    }
    pub(crate) fn open(&mut self) {
        self.is_open = true;
        self.segments.clear();
        self.updates.clear();
        self.permutation = None;
    }
    fn check_open(&self) -> Result<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(Error::IllegalState("no change in progress; call begin_change() first"))
        }
    }

    pub fn next_add(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_open()?;
        self.flush_permutation();
        self.add(from, to);
        Ok(())
    }
    pub fn next_remove(&mut self, index: usize, removed: Vec<T>) -> Result<()> {
        self.check_open()?;
        self.flush_permutation();
        self.remove(index, removed);
        Ok(())
    }
    pub fn next_remove_one(&mut self, index: usize, removed: T) -> Result<()> {
        self.next_remove(index, vec![removed])
    }
    pub fn next_replace(&mut self, from: usize, to: usize, removed: Vec<T>) -> Result<()> {
        self.check_open()?;
        self.flush_permutation();
        self.remove(from, removed);
        self.add(from, to);
        Ok(())
    }
    pub fn next_set(&mut self, index: usize, old: T) -> Result<()> {
        self.next_replace(index, index + 1, vec![old])
    }
    pub fn next_update(&mut self, index: usize) -> Result<()> {
        self.check_open()?;
        self.updates.push(index);
        Ok(())
    }

    /// Records a feed of [`Edit`] values. `items` is the backing sequence after the edit.
    pub fn record(&mut self, edit: Edit<T>, items: &[T]) -> Result<()>
    where
        T: Clone,
    {
        self.check_open()?;
        self.push(edit, items);
        Ok(())
    }

    /// Same as [`record`](Self::record) for callers that own the open transaction.
    pub(crate) fn push(&mut self, edit: Edit<T>, items: &[T])
    where
        T: Clone,
    {
        debug_assert!(self.is_open);
        match edit {
            Edit::Add { from, to } => {
                self.flush_permutation();
                self.add(from, to);
            }
            Edit::Remove { index, removed } => {
                self.flush_permutation();
                self.remove(index, removed);
            }
            Edit::Replace { from, to, removed } => {
                self.flush_permutation();
                self.remove(from, removed);
                self.add(from, to);
            }
            Edit::Permutation {
                from,
                to,
                permutation,
            } => self.permute(from, to, &permutation, items),
            Edit::Update { index } => self.updates.push(index),
        }
    }

    fn add(&mut self, from: usize, to: usize) {
        let n = to - from;
        if n == 0 {
            return;
        }
        for u in &mut self.updates {
            if *u >= from {
                *u += n;
            }
        }
        let index = self.segments.partition_point(|s| s.to < from);
        match self.segments.get_mut(index) {
            Some(s) if s.from <= from => s.to += n,
            _ => self.segments.insert(
                index,
                Pending {
                    from,
                    to,
                    removed: Vec::new(),
                },
            ),
        }
        for s in &mut self.segments[index + 1..] {
            s.from += n;
            s.to += n;
        }
    }

    /// `removed` holds every element taken out of `index..index + removed.len()`,
    /// including elements that were added earlier in this transaction.
    fn remove(&mut self, index: usize, removed: Vec<T>) {
        let n = removed.len();
        if n == 0 {
            return;
        }
        let end = index + n;
        self.updates.retain(|u| !(index..end).contains(u));
        for u in &mut self.updates {
            if *u >= end {
                *u -= n;
            }
        }

        let first = self.segments.partition_point(|s| s.to < index);
        let last = self.segments.partition_point(|s| s.from <= end);
        let from = if first < last {
            min(index, self.segments[first].from)
        } else {
            index
        };
        let mut values = removed.into_iter();
        let mut merged = Vec::new();
        let mut kept = 0;
        let mut pos = index;
        for s in self.segments.drain(first..last) {
            if s.from > pos {
                merged.extend(values.by_ref().take(s.from - pos));
                pos = s.from;
            }
            merged.extend(s.removed);
            let inside = min(s.to, end).saturating_sub(s.from.max(index));
            values.by_ref().take(inside).for_each(drop);
            kept += s.to - s.from - inside;
            pos = pos.max(min(s.to, end));
        }
        merged.extend(values);

        for s in &mut self.segments[first..] {
            s.from -= n;
            s.to -= n;
        }
        if kept > 0 || !merged.is_empty() {
            self.segments.insert(
                first,
                Pending {
                    from,
                    to: from + kept,
                    removed: merged,
                },
            );
        }
    }

    /// Records a reordering of `from..to`. `permutation[i - from]` is the new index of the
    /// element formerly at `i`; `items` is the backing sequence after the reordering.
    ///
    /// A permutation over content that already has pending insertions or removals is
    /// re-expressed as a replace of the moved range.
    pub fn next_permutation(
        &mut self,
        from: usize,
        to: usize,
        permutation: &[usize],
        items: &[T],
    ) -> Result<()>
    where
        T: Clone,
    {
        self.check_open()?;
        self.permute(from, to, permutation, items);
        Ok(())
    }
    fn permute(&mut self, from: usize, to: usize, permutation: &[usize], items: &[T])
    where
        T: Clone,
    {
        debug_assert_eq!(permutation.len(), to - from);
        let moved = moved_range(from, permutation);
        if moved.is_empty() {
            return;
        }
        let after = |i: usize| {
            if (from..to).contains(&i) {
                permutation[i - from]
            } else {
                i
            }
        };
        if !self.segments.is_empty() {
            let removed = moved.clone().map(|i| items[after(i)].clone()).collect();
            self.remove(moved.start, removed);
            self.add(moved.start, moved.end);
            return;
        }
        for u in &mut self.updates {
            *u = after(*u);
        }

        let prev = self.permutation.take();
        let hull = match &prev {
            Some(p) => min(p.from, moved.start)..moved.end.max(p.range().end),
            None => moved,
        };
        let mut old_to_new = Vec::with_capacity(hull.len());
        let mut originals = Vec::with_capacity(hull.len());
        for i in hull.clone() {
            match &prev {
                Some(p) if p.range().contains(&i) => {
                    old_to_new.push(after(p.new_index(i)));
                    originals.push(p.originals[i - p.from].clone());
                }
                _ => {
                    old_to_new.push(after(i));
                    originals.push(items[after(i)].clone());
                }
            }
        }
        let net = moved_range(hull.start, &old_to_new);
        if !net.is_empty() {
            let skip = net.start - hull.start;
            self.permutation = Some(PendingPermutation {
                from: net.start,
                old_to_new: old_to_new.drain(skip..skip + net.len()).collect(),
                originals: originals.drain(skip..skip + net.len()).collect(),
            });
        }
    }

    fn flush_permutation(&mut self) {
        if let Some(p) = self.permutation.take() {
            self.segments.push(p.into_replace());
        }
    }

    /// Closes the transaction. `items` is the backing sequence in its final state.
    ///
    /// Returns `Ok(None)` when the transaction has no net change.
    pub fn end_change(&mut self, items: &[T]) -> Result<Option<VecChanges<T>>>
    where
        T: Clone,
    {
        self.check_open()?;
        Ok(self.finish(items))
    }

    pub(crate) fn finish(&mut self, items: &[T]) -> Option<VecChanges<T>>
    where
        T: Clone,
    {
        self.is_open = false;
        let mut updates = take(&mut self.updates);
        updates.sort_unstable();
        updates.dedup();

        let mut out = Vec::new();
        if let Some(p) = self.permutation.take() {
            if updates.iter().any(|u| p.range().contains(u)) {
                self.segments.push(p.into_replace());
            } else {
                out.push(VecChange::permutation(p.from, p.old_to_new));
            }
        }

        // A run never crosses a pure removal; one starting at a removal point is folded into it.
        let mut runs: Vec<Range<usize>> = Vec::new();
        for u in updates {
            let index = self.segments.partition_point(|s| s.to <= u);
            if let Some(s) = self.segments.get(index) {
                if s.from <= u && u < s.to {
                    continue;
                }
            }
            let at_removal = self.segments.binary_search_by_key(&u, |s| s.from).is_ok();
            match runs.last_mut() {
                Some(run) if run.end == u && !at_removal => run.end += 1,
                _ => runs.push(u..u + 1),
            }
        }
        for run in runs {
            let index = self.segments.partition_point(|s| s.from < run.start);
            match self.segments.get_mut(index) {
                Some(s) if s.from == run.start && s.to == s.from => {
                    s.to = run.end;
                    s.removed.extend(items[run].iter().cloned());
                }
                _ => out.push(VecChange::update(run.start, items[run].to_vec())),
            }
        }
        for s in self.segments.drain(..) {
            if s.from == s.to && s.removed.is_empty() {
                continue;
            }
            out.push(VecChange::replace(
                s.from,
                s.removed,
                items[s.from..s.to].to_vec(),
            ));
        }
        out.sort_by_key(|c| c.from());
        tracing::trace!(segments = out.len(), "list change committed");
        if out.is_empty() {
            None
        } else {
            Some(VecChanges::new(out))
        }
    }

    /// Drops everything recorded since the transaction was opened.
    pub(crate) fn discard(&mut self) {
        self.is_open = false;
        self.segments.clear();
        self.updates.clear();
        self.permutation = None;
    }
}
