use crate::{Arena, SharedList, Value, ValueKind};

fn push_n(arena: &mut Arena, n: u32) -> SharedList {
    let mut list = SharedList::new(arena, ValueKind::Number);
    for i in 0..n {
        list = list.push(arena, &Value::Number(f64::from(i))).unwrap();
    }
    list
}

#[test]
fn empty_list() {
    let arena = Arena::new();
    let list = SharedList::new(&arena, ValueKind::Number);
    assert!(list.is_empty());
    assert_eq!(list.get(&arena, 0).unwrap(), None);
}

/// get(push(h, v), size(h)) = v and size grows by one.
#[test]
fn push_then_get() {
    let mut arena = Arena::new();
    let list = SharedList::new(&arena, ValueKind::Str);
    let next = list.push(&mut arena, &Value::from("x")).unwrap();
    assert_eq!(next.len(), list.len() + 1);
    assert_eq!(next.get(&arena, list.len()).unwrap(), Some(Value::from("x")));
}

#[test]
fn tail_only_contents() {
    let mut arena = Arena::new();
    let list = push_n(&mut arena, 20);
    for i in 0..20 {
        assert_eq!(list.get(&arena, i).unwrap(), Some(Value::Number(i as f64)));
    }
    assert_eq!(list.get(&arena, 20).unwrap(), None);
}

/// Crossing the 32-element boundary spills the tail into the trie.
#[test]
fn spill_preserves_contents() {
    let mut arena = Arena::new();
    let list = push_n(&mut arena, 33);
    for i in 0..33 {
        assert_eq!(list.get(&arena, i).unwrap(), Some(Value::Number(i as f64)));
    }
}

/// Deep enough to grow the root a level (32 * 32 < 1100).
#[test]
fn deep_trie_contents() {
    let mut arena = Arena::new();
    let list = push_n(&mut arena, 1100);
    for i in (0..1100).step_by(97) {
        assert_eq!(list.get(&arena, i).unwrap(), Some(Value::Number(i as f64)));
    }
    assert_eq!(list.get(&arena, 1099).unwrap(), Some(Value::Number(1099.0)));
    assert_eq!(list.get(&arena, 1100).unwrap(), None);
}

/// set(h, i, v).get(i) = v and set preserves size.
#[test]
fn set_replaces_one_slot() {
    let mut arena = Arena::new();
    let list = push_n(&mut arena, 100);
    let updated = list.set(&mut arena, 40, &Value::Number(-1.0)).unwrap();
    assert_eq!(updated.len(), list.len());
    assert_eq!(updated.get(&arena, 40).unwrap(), Some(Value::Number(-1.0)));
    assert_eq!(updated.get(&arena, 41).unwrap(), Some(Value::Number(41.0)));
    // The old version is untouched.
    assert_eq!(list.get(&arena, 40).unwrap(), Some(Value::Number(40.0)));
}

#[test]
fn set_out_of_range_is_noop() {
    let mut arena = Arena::new();
    let list = push_n(&mut arena, 5);
    let same = list.set(&mut arena, 5, &Value::Number(9.0)).unwrap();
    assert_eq!(same.to_vec(&arena).unwrap(), list.to_vec(&arena).unwrap());
}

#[test]
fn pop_walks_back_through_spill() {
    let mut arena = Arena::new();
    let mut list = push_n(&mut arena, 70);
    for expected_len in (0..70).rev() {
        list = list.pop(&mut arena).unwrap();
        assert_eq!(list.len(), expected_len);
        if expected_len > 0 {
            let last = expected_len - 1;
            assert_eq!(list.get(&arena, last).unwrap(), Some(Value::Number(last as f64)));
        }
    }
    assert!(list.is_empty());
    let same = list.pop(&mut arena).unwrap();
    assert!(same.is_empty());
}

#[test]
fn pop_then_push_again() {
    let mut arena = Arena::new();
    let list = push_n(&mut arena, 33);
    let list = list.pop(&mut arena).unwrap();
    let list = list.push(&mut arena, &Value::Number(99.0)).unwrap();
    assert_eq!(list.len(), 33);
    assert_eq!(list.get(&arena, 32).unwrap(), Some(Value::Number(99.0)));
    assert_eq!(list.get(&arena, 31).unwrap(), Some(Value::Number(31.0)));
}

#[test]
fn for_each_in_index_order() {
    let mut arena = Arena::new();
    let list = push_n(&mut arena, 75);
    let mut seen = Vec::new();
    list.for_each(&arena, |i, v| seen.push((i, v))).unwrap();
    assert_eq!(seen.len(), 75);
    for (i, (idx, v)) in seen.iter().enumerate() {
        assert_eq!(*idx, i);
        assert_eq!(*v, Value::Number(i as f64));
    }
}

#[test]
fn string_elements_round_trip() {
    let mut arena = Arena::new();
    let mut list = SharedList::new(&arena, ValueKind::Str);
    for i in 0..40 {
        list = list.push(&mut arena, &Value::from(format!("item-{i}"))).unwrap();
    }
    assert_eq!(list.get(&arena, 39).unwrap(), Some(Value::from("item-39")));
    assert_eq!(list.get(&arena, 0).unwrap(), Some(Value::from("item-0")));
}
