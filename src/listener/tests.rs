use super::*;
use crate::change::VecChange;
use assert_call::{call, CallRecorder};

fn changes() -> VecChanges<i32> {
    VecChanges::new(vec![VecChange::replace(0, vec![], vec![1])])
}

#[test]
fn dispatch_in_registration_order() {
    let mut cr = CallRecorder::new();
    let listeners = ListListeners::<i32>::new();
    listeners.add(ListListener::Change(Rc::new(|_: &mut VecChanges<i32>| {
        call!("a")
    })));
    listeners.add(ListListener::Invalidation(Rc::new(|| call!("b"))));
    listeners.add(ListListener::Change(Rc::new(|_: &mut VecChanges<i32>| {
        call!("c")
    })));
    listeners.notify(&mut changes());
    cr.verify(["a", "b", "c"]);
}

#[test]
fn same_listener_twice_is_called_twice() {
    let mut cr = CallRecorder::new();
    let listeners = ListListeners::<i32>::new();
    let l: Rc<dyn ListChangeListener<i32>> = Rc::new(|_: &mut VecChanges<i32>| call!("l"));
    listeners.add(ListListener::Change(l.clone()));
    listeners.add(ListListener::Change(l));
    listeners.notify(&mut changes());
    cr.verify(["l", "l"]);
}

#[test]
fn remove_is_idempotent() {
    let mut cr = CallRecorder::new();
    let listeners = ListListeners::<i32>::new();
    let key = listeners.add(ListListener::Invalidation(Rc::new(|| call!("x"))));
    assert!(listeners.remove(key));
    assert!(!listeners.remove(key));
    listeners.notify(&mut changes());
    cr.verify(());
}

#[test]
fn stale_key_does_not_remove_new_entry() {
    let mut set = ListenerSet::new();
    let k0 = set.insert("a");
    set.remove(k0);
    let k1 = set.insert("b");
    assert!(!set.remove(k0));
    assert_eq!(set.len(), 1);
    assert!(set.remove(k1));
    assert!(set.is_empty());
}

#[test]
fn cursor_is_rewound_for_each_listener() {
    let mut cr = CallRecorder::new();
    let listeners = ListListeners::<i32>::new();
    for name in ["a", "b"] {
        listeners.add(ListListener::Change(Rc::new(
            move |c: &mut VecChanges<i32>| {
                while c.next() {
                    call!("{name}:{}", c.from().unwrap());
                }
            },
        )));
    }
    listeners.notify(&mut changes());
    cr.verify(["a:0", "b:0"]);
}

#[test]
fn dead_weak_listener_unregisters() {
    let mut cr = CallRecorder::new();
    let listeners = ListListeners::<i32>::new();
    let l: Rc<dyn ListChangeListener<i32>> = Rc::new(|_: &mut VecChanges<i32>| call!("weak"));
    listeners.add(ListListener::Weak(Rc::downgrade(&l)));
    listeners.notify(&mut changes());
    cr.verify("weak");

    drop(l);
    listeners.notify(&mut changes());
    cr.verify(());
    assert!(listeners.is_empty());
}

#[test]
fn listener_removed_during_dispatch_still_sees_current_round() {
    let mut cr = CallRecorder::new();
    let listeners = Rc::new(ListListeners::<i32>::new());
    let second = Rc::new(std::cell::Cell::new(None));
    listeners.add(ListListener::Invalidation(Rc::new({
        let listeners = listeners.clone();
        let second = second.clone();
        move || {
            call!("first");
            if let Some(key) = second.take() {
                listeners.remove(key);
            }
        }
    })));
    second.set(Some(
        listeners.add(ListListener::Invalidation(Rc::new(|| call!("second")))),
    ));
    listeners.notify(&mut changes());
    cr.verify(["first", "second"]);
    listeners.notify(&mut changes());
    cr.verify("first");
}
