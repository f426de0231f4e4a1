use super::*;

fn sample() -> VecChanges<&'static str> {
    VecChanges::new(vec![
        VecChange::replace(0, vec![], vec!["x"]),
        VecChange::permutation(2, vec![3, 2]),
        VecChange::update(5, vec!["u"]),
    ])
}

#[test]
fn cursor_requires_next() {
    let c = sample();
    assert!(matches!(c.current(), Err(Error::IllegalState(_))));
    assert!(matches!(c.from(), Err(Error::IllegalState(_))));
    assert!(matches!(c.was_added(), Err(Error::IllegalState(_))));
}

#[test]
fn cursor_walks_all_segments() {
    let mut c = sample();
    assert!(c.next());
    assert_eq!(c.from(), Ok(0));
    assert_eq!(c.to(), Ok(1));
    assert_eq!(c.added(), Ok(&["x"][..]));
    assert_eq!(c.was_added(), Ok(true));
    assert_eq!(c.was_removed(), Ok(false));

    assert!(c.next());
    assert_eq!(c.was_permutated(), Ok(true));
    assert_eq!(c.permutation(2), Ok(3));
    assert_eq!(c.permutation(3), Ok(2));
    assert_eq!(c.was_added(), Ok(false));

    assert!(c.next());
    assert_eq!(c.was_updated(), Ok(true));
    assert_eq!(c.was_added(), Ok(false));
    assert!(matches!(c.permutation(5), Err(Error::IllegalState(_))));

    assert!(!c.next());
    assert!(c.current().is_err());
}

#[test]
fn cursor_reset() {
    let mut c = sample();
    while c.next() {}
    c.reset();
    assert!(c.current().is_err());
    assert!(c.next());
    assert_eq!(c.from(), Ok(0));
}

#[test]
fn replace_flags() {
    let c = VecChange::replace(1, vec![1, 2], vec![3]);
    assert!(c.was_added());
    assert!(c.was_removed());
    assert!(c.was_replaced());
    assert!(!c.was_permutated());
    assert_eq!(c.range(), 1..2);

    let removal = VecChange::replace(4, vec![1], Vec::<i32>::new());
    assert!(!removal.was_added());
    assert!(removal.was_removed());
    assert!(!removal.was_replaced());
    assert_eq!(removal.range(), 4..4);
}

#[test]
#[should_panic(expected = "not a permutation")]
fn new_index_on_replace_panics() {
    VecChange::replace(0, vec![], vec![1]).new_index(0);
}

#[test]
fn apply_to_replays() {
    let mut items = vec!["a", "b", "c", "d", "e", "f"];
    let c = VecChanges::new(vec![
        VecChange::replace(0, vec!["a"], vec!["x"]),
        VecChange::permutation(2, vec![3, 2]),
        VecChange::update(5, vec!["u"]),
    ]);
    c.apply_to(&mut items);
    assert_eq!(items, vec!["x", "b", "d", "c", "e", "u"]);
}
