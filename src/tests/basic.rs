use crate::{Arena, SharedMap, SharedSet, Value, ValueKind};

fn string_map(arena: &Arena) -> SharedMap {
    SharedMap::new(arena, ValueKind::Str)
}

#[test]
fn empty_map() {
    let arena = Arena::new();
    let map = string_map(&arena);
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());
    assert_eq!(map.get(&arena, "missing").unwrap(), None);
}

#[test]
fn insert_and_get() {
    let mut arena = Arena::new();
    let map = string_map(&arena);
    let map = map.insert(&mut arena, "key", &Value::from("100")).unwrap();
    assert_eq!(map.get(&arena, "key").unwrap(), Some(Value::from("100")));
    assert_eq!(map.len(), 1);
}

#[test]
fn overwrite_value() {
    let mut arena = Arena::new();
    let map = string_map(&arena);
    let map = map.insert(&mut arena, "k", &Value::from("1")).unwrap();
    let map = map.insert(&mut arena, "k", &Value::from("2")).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&arena, "k").unwrap(), Some(Value::from("2")));
}

/// E1: set/get/has/delete on a string map.
#[test]
fn set_get_has_delete() {
    let mut arena = Arena::new();
    let map = string_map(&arena);
    let map = map.insert(&mut arena, "alpha", &Value::from("A")).unwrap();
    let map = map.insert(&mut arena, "beta", &Value::from("B")).unwrap();
    let map = map.insert(&mut arena, "alpha", &Value::from("A2")).unwrap();

    assert_eq!(map.get(&arena, "alpha").unwrap(), Some(Value::from("A2")));
    assert!(map.contains_key(&arena, "beta"));
    assert_eq!(map.len(), 2);

    let map = map.remove(&mut arena, "beta").unwrap();
    assert!(!map.contains_key(&arena, "beta"));
    assert_eq!(map.len(), 1);
}

#[test]
fn insert_multiple() {
    let mut arena = Arena::new();
    let mut map = SharedMap::new(&arena, ValueKind::Number);
    for i in 0..100_u32 {
        map = map
            .insert(&mut arena, i.to_le_bytes(), &Value::Number(f64::from(i) * 10.0))
            .unwrap();
    }
    assert_eq!(map.len(), 100);
    for i in 0..100_u32 {
        assert_eq!(
            map.get(&arena, i.to_le_bytes()).unwrap(),
            Some(Value::Number(f64::from(i) * 10.0))
        );
    }
}

#[test]
fn remove_missing_keeps_handle() {
    let mut arena = Arena::new();
    let map = string_map(&arena);
    let map = map.insert(&mut arena, "a", &Value::from("1")).unwrap();
    let before = arena.heap_end();
    let same = map.remove(&mut arena, "z").unwrap();
    assert_eq!(same.len(), 1);
    // Not-found removal must not reallocate the path.
    assert_eq!(arena.heap_end(), before);
}

#[test]
fn remove_all() {
    let mut arena = Arena::new();
    let map = string_map(&arena);
    let map = map.insert(&mut arena, "a", &Value::from("1")).unwrap();
    let map = map.insert(&mut arena, "b", &Value::from("2")).unwrap();
    let map = map.insert(&mut arena, "c", &Value::from("3")).unwrap();
    let map = map.remove(&mut arena, "a").unwrap();
    let map = map.remove(&mut arena, "b").unwrap();
    let map = map.remove(&mut arena, "c").unwrap();
    assert!(map.is_empty());
    assert_eq!(map.get(&arena, "a").unwrap(), None);
}

#[test]
fn insert_many_commits_one_version() {
    let mut arena = Arena::new();
    let map = string_map(&arena);
    let entries = vec![
        ("a", Value::from("1")),
        ("b", Value::from("2")),
        ("a", Value::from("3")),
    ];
    let map = map.insert_many(&mut arena, entries).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&arena, "a").unwrap(), Some(Value::from("3")));
}

#[test]
fn get_many_in_order() {
    let mut arena = Arena::new();
    let map = string_map(&arena);
    let map = map.insert(&mut arena, "x", &Value::from("1")).unwrap();
    let got = map.get_many(&arena, ["x", "y"]).unwrap();
    assert_eq!(got, vec![Some(Value::from("1")), None]);
}

#[test]
fn remove_many() {
    let mut arena = Arena::new();
    let map = string_map(&arena);
    let map = map
        .insert_many(
            &mut arena,
            [("a", Value::from("1")), ("b", Value::from("2")), ("c", Value::from("3"))],
        )
        .unwrap();
    let map = map.remove_many(&mut arena, ["a", "c", "zzz"]).unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.contains_key(&arena, "b"));
}

/// Iteration count equals size.
#[test]
fn for_each_visits_every_entry() {
    let mut arena = Arena::new();
    let mut map = string_map(&arena);
    for i in 0..50 {
        map = map.insert(&mut arena, format!("key-{i}"), &Value::from("v")).unwrap();
    }
    let mut count = 0;
    map.for_each(&arena, |_, _| count += 1).unwrap();
    assert_eq!(count, map.len());
}

#[test]
fn batched_cursor_drains() {
    let mut arena = Arena::new();
    let mut map = string_map(&arena);
    for i in 0..40 {
        map = map.insert(&mut arena, format!("key-{i}"), &Value::from("v")).unwrap();
    }
    let mut cursor = crate::hamt::Cursor::new(&arena, map.root());
    let mut leaves = Vec::new();
    let mut total = 0;
    loop {
        let n = cursor.next_leaves(&arena, 16, &mut leaves);
        if n == 0 {
            break;
        }
        assert!(n <= 16);
        total += n;
    }
    assert_eq!(total, 40);
    assert_eq!(leaves.len(), 40);
}

#[test]
fn set_insert_contains() {
    let mut arena = Arena::new();
    let set = SharedSet::new(&arena, ValueKind::Str);
    let set = set.insert(&mut arena, &Value::from("admin")).unwrap();
    let set = set.insert(&mut arena, &Value::from("active")).unwrap();
    let set = set.insert(&mut arena, &Value::from("admin")).unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.contains(&arena, &Value::from("admin")).unwrap());
    assert!(!set.contains(&arena, &Value::from("ghost")).unwrap());
}

#[test]
fn set_remove() {
    let mut arena = Arena::new();
    let set = SharedSet::new(&arena, ValueKind::Str);
    let set = set.insert(&mut arena, &Value::from("a")).unwrap();
    let set = set.insert(&mut arena, &Value::from("b")).unwrap();
    let set = set.remove(&mut arena, &Value::from("a")).unwrap();
    assert_eq!(set.len(), 1);
    assert!(!set.contains(&arena, &Value::from("a")).unwrap());
    let mut elems = set.elements(&arena).unwrap();
    elems.sort_by_key(|v| format!("{v:?}"));
    assert_eq!(elems, vec![Value::from("b")]);
}

#[test]
fn value_kinds_round_trip() {
    let mut arena = Arena::new();
    let numbers = SharedMap::new(&arena, ValueKind::Number);
    let numbers = numbers.insert(&mut arena, "pi", &Value::Number(3.25)).unwrap();
    assert_eq!(numbers.get(&arena, "pi").unwrap(), Some(Value::Number(3.25)));

    let flags = SharedMap::new(&arena, ValueKind::Bool);
    let flags = flags.insert(&mut arena, "on", &Value::Bool(true)).unwrap();
    assert_eq!(flags.get(&arena, "on").unwrap(), Some(Value::Bool(true)));

    let objects = SharedMap::new(&arena, ValueKind::Object);
    let payload = serde_json::json!({"name": "worker", "retries": 3});
    let objects = objects.insert(&mut arena, "job", &Value::Object(payload.clone())).unwrap();
    assert_eq!(objects.get(&arena, "job").unwrap(), Some(Value::Object(payload)));
}
