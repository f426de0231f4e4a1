use std::{
    cmp::{min, Ordering},
    ops::{Bound, Range, RangeBounds},
};


/// Converts a `new index -> old index` table into `old index -> new index`.
pub(crate) fn invert(new_to_old: &[usize]) -> Vec<usize> {
    let mut old_to_new = vec![usize::MAX; new_to_old.len()];
    for (new_index, &old_index) in new_to_old.iter().enumerate() {
        old_to_new[old_index] = new_index;
    }
    old_to_new
}

/// Moves `items[i]` to `items[old_to_new[i]]` for every `i`.
pub(crate) fn apply_old_to_new<T>(items: &mut [T], old_to_new: &[usize]) {
    let mut old_to_new = old_to_new.to_vec();
    for old in 0..items.len() {
        loop {
            let new = old_to_new[old];
            if old == new {
                break;
            }
            items.swap(old, new);
            old_to_new.swap(old, new);
        }
    }
}

/// Applies a permutation given in absolute indices over `items[from..from + permutation.len()]`.
pub(crate) fn apply_permutation<T>(items: &mut [T], from: usize, permutation: &[usize]) {
    let relative: Vec<usize> = permutation.iter().map(|&i| i - from).collect();
    apply_old_to_new(&mut items[from..from + permutation.len()], &relative);
}

/// Smallest range outside of which `permutation` (absolute, starting at `from`) is the identity.
pub(crate) fn moved_range(from: usize, permutation: &[usize]) -> Range<usize> {
    let is_moved = |(k, &new): (usize, &usize)| from + k != new;
    let Some(first) = permutation.iter().enumerate().position(is_moved) else {
        return from..from;
    };
    let last = permutation.iter().enumerate().rposition(is_moved).unwrap_or(first);
    from + first..from + last + 1
}

pub(crate) fn is_sorted(items: &[usize]) -> bool {
    items.windows(2).all(|w| w[0] <= w[1])
}

/// Stable merge sort with a comparison that may fail.
///
/// Stops at the first failed comparison. `items` is left in an unspecified order in that case.
pub(crate) fn try_sort_by<T: Copy, E>(
    items: &mut [T],
    mut compare: impl FnMut(&T, &T) -> Result<Ordering, E>,
) -> Result<(), E> {
    let len = items.len();
    let mut buf = items.to_vec();
    let mut width = 1;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = min(start + width, len);
            let end = min(start + 2 * width, len);
            let (mut i, mut j, mut k) = (start, mid, start);
            while i < mid && j < end {
                if compare(&items[j], &items[i])? == Ordering::Less {
                    buf[k] = items[j];
                    j += 1;
                } else {
                    buf[k] = items[i];
                    i += 1;
                }
                k += 1;
            }
            buf[k..k + (mid - i)].copy_from_slice(&items[i..mid]);
            k += mid - i;
            buf[k..k + (end - j)].copy_from_slice(&items[j..end]);
            start = end;
        }
        items.copy_from_slice(&buf);
        width *= 2;
    }
    Ok(())
}

pub(crate) fn to_range(range: impl RangeBounds<usize>, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&n) => n,
        Bound::Excluded(&n) => n + 1,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&n) => n + 1,
        Bound::Excluded(&n) => n,
        Bound::Unbounded => len,
    };
    assert!(start <= end, "range start is greater than range end");
    assert!(end <= len, "range end out of bounds");
    start..end
}
