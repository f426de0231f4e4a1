use std::{fmt::Debug, rc::Rc};

use assert_call::call;

use crate::{ObservableList, Subscription, VecChange, VecChanges};

pub(crate) fn describe<T: Debug>(c: &VecChange<T>) -> String {
    if let Some(p) = c.permutation_table() {
        format!("perm {}..{} {:?}", c.from(), c.to(), p)
    } else if c.was_updated() {
        format!("update {}..{} {:?}", c.from(), c.to(), c.added())
    } else {
        format!(
            "replace {}..{} {:?} -> {:?}",
            c.from(),
            c.to(),
            c.removed(),
            c.added()
        )
    }
}

/// Records every segment delivered to `list`'s listeners with `call!`.
pub(crate) fn record_changes<T: Clone + Debug + 'static>(
    list: &impl ObservableList<T>,
) -> Subscription {
    list.subscribe(Rc::new(|c: &mut VecChanges<T>| {
        while c.next() {
            if let Ok(change) = c.current() {
                call!("{}", describe(change));
            }
        }
    }))
}
