use crate::{Arena, SharedList, SharedMap, SharedStack, Value, ValueKind};

#[test]
fn reset_moves_cursor_back_and_bumps_generation() {
    let mut arena = Arena::new();
    let start = arena.heap_start();
    let gen0 = arena.generation();
    let _ = SharedMap::new(&arena, ValueKind::Str)
        .insert(&mut arena, "k", &Value::from("v"))
        .unwrap();
    assert!(arena.heap_end() > start);

    arena.reset();
    assert_eq!(arena.heap_end(), start);
    assert_eq!(arena.generation(), gen0 + 1);
}

/// Stale reads return absent instead of corrupt data.
#[test]
fn stale_map_reads_are_absent() {
    let mut arena = Arena::new();
    let map = SharedMap::new(&arena, ValueKind::Str)
        .insert(&mut arena, "k", &Value::from("v"))
        .unwrap();
    arena.reset();

    assert_eq!(map.get(&arena, "k").unwrap(), None);
    assert!(!map.contains_key(&arena, "k"));
    assert!(map.keys(&arena).is_empty());
    let mut visited = 0;
    map.for_each(&arena, |_, _| visited += 1).unwrap();
    assert_eq!(visited, 0);
}

/// Stale writes land on a fresh empty structure of the same type.
#[test]
fn stale_map_write_starts_over() {
    let mut arena = Arena::new();
    let map = SharedMap::new(&arena, ValueKind::Str)
        .insert(&mut arena, "old", &Value::from("1"))
        .unwrap()
        .insert(&mut arena, "older", &Value::from("2"))
        .unwrap();
    arena.reset();

    let fresh = map.insert(&mut arena, "new", &Value::from("3")).unwrap();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh.get(&arena, "new").unwrap(), Some(Value::from("3")));
    assert_eq!(fresh.get(&arena, "old").unwrap(), None);
}

#[test]
fn stale_list_reads_and_writes() {
    let mut arena = Arena::new();
    let list = SharedList::new(&arena, ValueKind::Number)
        .push(&mut arena, &Value::Number(1.0))
        .unwrap();
    arena.reset();

    assert_eq!(list.get(&arena, 0).unwrap(), None);
    let fresh = list.push(&mut arena, &Value::Number(2.0)).unwrap();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh.get(&arena, 0).unwrap(), Some(Value::Number(2.0)));
}

#[test]
fn stale_stack_write_starts_over() {
    let mut arena = Arena::new();
    let stack = SharedStack::new(&arena, ValueKind::Str)
        .push(&mut arena, &Value::from("a"))
        .unwrap();
    arena.reset();
    let fresh = stack.push(&mut arena, &Value::from("b")).unwrap();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh.peek(), Some(&Value::from("b")));
}

#[test]
fn current_handles_unaffected_by_stale_ones() {
    let mut arena = Arena::new();
    let old = SharedMap::new(&arena, ValueKind::Str)
        .insert(&mut arena, "a", &Value::from("1"))
        .unwrap();
    arena.reset();
    let current = SharedMap::new(&arena, ValueKind::Str)
        .insert(&mut arena, "b", &Value::from("2"))
        .unwrap();

    // Stale reads don't disturb the new generation.
    assert_eq!(old.get(&arena, "a").unwrap(), None);
    assert_eq!(current.get(&arena, "b").unwrap(), Some(Value::from("2")));
    assert_eq!(current.len(), 1);
}

#[test]
fn generations_wrap_without_panicking() {
    let mut arena = Arena::new();
    for _ in 0..5 {
        arena.reset();
    }
    let map = SharedMap::new(&arena, ValueKind::Str)
        .insert(&mut arena, "k", &Value::from("v"))
        .unwrap();
    assert_eq!(map.get(&arena, "k").unwrap(), Some(Value::from("v")));
}
