use assert_call::{call, CallRecorder};

use super::*;
use crate::{test_utils::record_changes, StateVec};

fn even() -> Matcher<i32> {
    Matcher::new(|v: &i32| v % 2 == 0)
}

#[test]
fn live_view_tracks_source() {
    let mut cr = CallRecorder::new();
    let source = StateVec::from(vec![1, 2, 3, 4, 5, 6]);
    let view = FilteredVec::new(source.clone(), even());
    assert_eq!(view.to_vec(), vec![2, 4, 6]);
    let _s = record_changes(&view);

    source.push(8);
    cr.verify("replace 3..4 [] -> [8]");
    source.push(7);
    cr.verify(());
    source.remove(1);
    cr.verify("replace 0..0 [2] -> []");
    source.set(0, 10);
    cr.verify("replace 0..1 [] -> [10]");

    assert_eq!(view.to_vec(), vec![10, 4, 6, 8]);
    let indices: Vec<_> = (0..view.len()).map(|i| view.source_index(i)).collect();
    assert_eq!(indices, vec![0, 2, 4, 5]);
}

#[test]
fn one_source_transaction_is_one_view_notification() {
    let mut cr = CallRecorder::new();
    let source = StateVec::from(vec![1, 2, 3]);
    let view = FilteredVec::new(source.clone(), even());
    let _s = record_changes(&view);
    {
        let mut items = source.borrow_mut();
        items.insert(0, 0);
        items.push(4);
        items.remove(2);
    }
    cr.verify("replace 0..2 [2] -> [0, 4]");
    assert_eq!(view.to_vec(), vec![0, 4]);
}

#[test]
fn update_next_to_removal_in_one_transaction() {
    let mut cr = CallRecorder::new();
    let source = StateVec::from(vec![0, 2, 4]);
    let view = FilteredVec::new(source.clone(), even());
    let _s = record_changes(&view);
    {
        let mut items = source.borrow_mut();
        items.remove(1);
        items.update_with(0, |v| *v = 10);
        items.update_with(1, |v| *v = 20);
    }
    cr.verify(["update 0..1 [10]", "replace 1..2 [2, 4] -> [20]"]);
    assert_eq!(source.to_vec(), vec![10, 20]);
    assert_eq!(view.to_vec(), vec![10, 20]);
}

#[test]
fn updates_change_membership() {
    let mut cr = CallRecorder::new();
    let source = StateVec::from(vec![1, 2, 3]);
    let view = FilteredVec::new(source.clone(), even());
    let _s = record_changes(&view);

    source.update_with(0, |v| *v = 4);
    cr.verify("replace 0..1 [] -> [4]");
    source.update_with(1, |v| *v = 6);
    cr.verify("update 1..2 [6]");
    source.update_with(1, |v| *v = 5);
    cr.verify("replace 1..1 [6] -> []");
    assert_eq!(view.to_vec(), vec![4]);
}

#[test]
fn source_permutation_reorders_view() {
    let mut cr = CallRecorder::new();
    let source = StateVec::from(vec![1, 2, 3, 4]);
    let view = FilteredVec::new(source.clone(), even());
    let _s = record_changes(&view);

    source.reverse();
    cr.verify("perm 0..2 [1, 0]");
    assert_eq!(view.to_vec(), vec![4, 2]);
    assert_eq!(view.source_index(0), 0);
    assert_eq!(view.source_index(1), 2);

    source.swap(1, 3);
    cr.verify(());
}

#[test]
fn set_matcher_live_replaces_content() {
    let mut cr = CallRecorder::new();
    let source = StateVec::from(vec![1, 2, 3, 4]);
    let view = FilteredVec::new(source, even());
    let _s = record_changes(&view);

    view.set_matcher(Matcher::new(|v: &i32| v % 2 == 1));
    cr.verify("replace 0..2 [2, 4] -> [1, 3]");
    assert_eq!(view.to_vec(), vec![1, 3]);
}

#[test]
fn batch_mirrors_until_filter() {
    let mut cr = CallRecorder::new();
    let source = StateVec::from(vec![1, 2, 3, 4]);
    let view = FilteredVec::with_mode(source.clone(), even(), Mode::Batch);
    assert_eq!(view.to_vec(), vec![1, 2, 3, 4]);
    let _s = record_changes(&view);

    source.push(5);
    cr.verify("replace 4..5 [] -> [5]");

    view.filter();
    cr.verify([
        "replace 0..0 [1] -> []",
        "replace 1..1 [3] -> []",
        "replace 2..2 [5] -> []",
    ]);
    assert_eq!(view.to_vec(), vec![2, 4]);

    view.set_matcher(Matcher::all());
    cr.verify(());
    view.filter();
    cr.verify([
        "replace 0..1 [] -> [1]",
        "replace 2..3 [] -> [3]",
        "replace 4..5 [] -> [5]",
    ]);
}

#[test]
fn batch_update_does_not_retest() {
    let source = StateVec::from(vec![1, 2]);
    let view = FilteredVec::with_mode(source.clone(), even(), Mode::Batch);
    view.filter();
    source.update_with(1, |v| *v = 3);
    source.update_with(0, |v| *v = 8);
    assert_eq!(view.to_vec(), vec![3]);
    view.filter();
    assert_eq!(view.to_vec(), vec![8]);
}

#[test]
fn switching_to_live_filters() {
    let mut cr = CallRecorder::new();
    let source = StateVec::from(vec![1, 2]);
    let view = FilteredVec::with_mode(source, even(), Mode::Batch);
    let _s = record_changes(&view);
    view.set_mode(Mode::Live).unwrap();
    cr.verify("replace 0..0 [1] -> []");
    assert_eq!(view.mode(), Mode::Live);
    view.set_mode(Mode::Batch).unwrap();
    cr.verify(());
}

#[test]
fn mode_change_while_notifying_is_illegal() {
    let mut cr = CallRecorder::new();
    let source = StateVec::from(vec![2]);
    let view = FilteredVec::new(source.clone(), even());
    let v = view.clone();
    let _s = view.subscribe(Rc::new(move |_: &mut VecChanges<i32>| {
        call!(
            "{}",
            matches!(v.set_mode(Mode::Batch), Err(Error::IllegalState(_)))
        );
    }));
    source.push(4);
    cr.verify("true");
    assert_eq!(view.mode(), Mode::Live);
}

#[test]
fn dropped_view_stops_observing() {
    let mut cr = CallRecorder::new();
    let source = StateVec::from(vec![2]);
    let view = FilteredVec::new(source.clone(), even());
    let _s = record_changes(&view);
    drop(view);
    source.push(4);
    cr.verify(());
    assert_eq!(source.to_vec(), vec![2, 4]);
}

#[test]
fn chained_views() {
    let source = StateVec::from((0..10).collect::<Vec<i32>>());
    let evens = FilteredVec::new(source.clone(), even());
    let big = FilteredVec::new(evens.clone(), Matcher::new(|v: &i32| *v > 4));
    assert_eq!(big.to_vec(), vec![6, 8]);
    assert_eq!(big.source_index(0), 3);
    assert_eq!(big.bottom_most_source_index(0), 6);
    assert_eq!(big.bottom_most_source().to_vec(), source.to_vec());
    assert_eq!(big.direct_source().to_vec(), evens.to_vec());

    source.push(12);
    assert_eq!(big.to_vec(), vec![6, 8, 12]);
    assert_eq!(big.bottom_most_source_index(2), 10);
}
