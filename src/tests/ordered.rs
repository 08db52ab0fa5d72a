use crate::{Arena, SharedOrderedMap, SharedOrderedSet, Value, ValueKind};

fn keys_of(arena: &Arena, map: &SharedOrderedMap) -> Vec<String> {
    map.keys(arena)
        .into_iter()
        .map(|k| String::from_utf8(k).unwrap())
        .collect()
}

/// E3: iteration follows insertion order, and an update keeps position.
#[test]
fn insertion_order_and_update_in_place() {
    let mut arena = Arena::new();
    let map = SharedOrderedMap::new(&arena, ValueKind::Str)
        .set(&mut arena, "c", &Value::from("C"))
        .unwrap()
        .set(&mut arena, "a", &Value::from("A"))
        .unwrap()
        .set(&mut arena, "b", &Value::from("B"))
        .unwrap();
    assert_eq!(keys_of(&arena, &map), ["c", "a", "b"]);

    let map = map.set(&mut arena, "a", &Value::from("A2")).unwrap();
    assert_eq!(keys_of(&arena, &map), ["c", "a", "b"]);
    assert_eq!(map.get(&arena, "a").unwrap(), Some(Value::from("A2")));
    assert_eq!(map.len(), 3);
}

#[test]
fn delete_preserves_remaining_order() {
    let mut arena = Arena::new();
    let map = SharedOrderedMap::new(&arena, ValueKind::Str)
        .set(&mut arena, "one", &Value::from("1"))
        .unwrap()
        .set(&mut arena, "two", &Value::from("2"))
        .unwrap()
        .set(&mut arena, "three", &Value::from("3"))
        .unwrap();

    let map = map.delete(&mut arena, "two").unwrap();
    assert_eq!(keys_of(&arena, &map), ["one", "three"]);
    assert_eq!(map.len(), 2);
    assert!(!map.has(&arena, "two"));
}

#[test]
fn delete_head_and_tail() {
    let mut arena = Arena::new();
    let map = SharedOrderedMap::new(&arena, ValueKind::Str)
        .set(&mut arena, "h", &Value::from("1"))
        .unwrap()
        .set(&mut arena, "m", &Value::from("2"))
        .unwrap()
        .set(&mut arena, "t", &Value::from("3"))
        .unwrap();

    let map = map.delete(&mut arena, "h").unwrap();
    assert_eq!(keys_of(&arena, &map), ["m", "t"]);
    let map = map.delete(&mut arena, "t").unwrap();
    assert_eq!(keys_of(&arena, &map), ["m"]);
    let map = map.delete(&mut arena, "m").unwrap();
    assert!(map.is_empty());
    assert_eq!(keys_of(&arena, &map), Vec::<String>::new());
}

#[test]
fn update_at_head_and_tail_keeps_thread() {
    let mut arena = Arena::new();
    let map = SharedOrderedMap::new(&arena, ValueKind::Str)
        .set(&mut arena, "first", &Value::from("1"))
        .unwrap()
        .set(&mut arena, "last", &Value::from("2"))
        .unwrap();

    let map = map.set(&mut arena, "first", &Value::from("1b")).unwrap();
    let map = map.set(&mut arena, "last", &Value::from("2b")).unwrap();
    assert_eq!(keys_of(&arena, &map), ["first", "last"]);
    assert_eq!(map.get(&arena, "first").unwrap(), Some(Value::from("1b")));
    assert_eq!(map.get(&arena, "last").unwrap(), Some(Value::from("2b")));
}

/// Lookups on an old handle survive writes on a newer one: the trie
/// side is path-copied.
#[test]
fn old_handle_lookups_survive() {
    let mut arena = Arena::new();
    let v1 = SharedOrderedMap::new(&arena, ValueKind::Str)
        .set(&mut arena, "k", &Value::from("old"))
        .unwrap();
    let v2 = v1.set(&mut arena, "k", &Value::from("new")).unwrap();
    let v3 = v2.delete(&mut arena, "k").unwrap();

    assert_eq!(v1.get(&arena, "k").unwrap(), Some(Value::from("old")));
    assert_eq!(v2.get(&arena, "k").unwrap(), Some(Value::from("new")));
    assert_eq!(v3.get(&arena, "k").unwrap(), None);
}

/// Iteration on an old handle is frozen too: an interior replace and an
/// interior delete on derived versions leave the old thread untouched.
#[test]
fn old_handle_iteration_survives_interior_writes() {
    let mut arena = Arena::new();
    let v1 = SharedOrderedMap::new(&arena, ValueKind::Str)
        .set(&mut arena, "a", &Value::from("1"))
        .unwrap()
        .set(&mut arena, "b", &Value::from("2"))
        .unwrap()
        .set(&mut arena, "c", &Value::from("3"))
        .unwrap();

    let v2 = v1.set(&mut arena, "b", &Value::from("2x")).unwrap();
    let v3 = v2.delete(&mut arena, "b").unwrap();

    assert_eq!(keys_of(&arena, &v1), ["a", "b", "c"]);
    assert_eq!(v1.keys(&arena).len(), v1.len());
    assert_eq!(v1.get(&arena, "b").unwrap(), Some(Value::from("2")));
    let mut v1_values = Vec::new();
    v1.for_each(&arena, |_, v| v1_values.push(v)).unwrap();
    assert_eq!(v1_values, vec![Value::from("1"), Value::from("2"), Value::from("3")]);

    // The replaced version is equally frozen against the later delete.
    assert_eq!(keys_of(&arena, &v2), ["a", "b", "c"]);
    assert_eq!(v2.keys(&arena).len(), v2.len());
    assert_eq!(v2.get(&arena, "b").unwrap(), Some(Value::from("2x")));

    assert_eq!(keys_of(&arena, &v3), ["a", "c"]);
    assert_eq!(v3.len(), 2);
}

/// Two appends branching from one version do not reroute each other's
/// thread.
#[test]
fn sibling_appends_stay_independent() {
    let mut arena = Arena::new();
    let base = SharedOrderedMap::new(&arena, ValueKind::Str)
        .set(&mut arena, "a", &Value::from("1"))
        .unwrap()
        .set(&mut arena, "b", &Value::from("2"))
        .unwrap();

    let with_c = base.set(&mut arena, "c", &Value::from("3")).unwrap();
    let with_d = base.set(&mut arena, "d", &Value::from("4")).unwrap();

    assert_eq!(keys_of(&arena, &with_c), ["a", "b", "c"]);
    assert_eq!(keys_of(&arena, &with_d), ["a", "b", "d"]);
    assert_eq!(keys_of(&arena, &base), ["a", "b"]);
}

#[test]
fn many_entries_keep_order() {
    let mut arena = Arena::new();
    let mut map = SharedOrderedMap::new(&arena, ValueKind::Number);
    for i in 0..200 {
        map = map
            .set(&mut arena, format!("key-{i}"), &Value::Number(f64::from(i)))
            .unwrap();
    }
    let expected: Vec<String> = (0..200).map(|i| format!("key-{i}")).collect();
    assert_eq!(keys_of(&arena, &map), expected);
}

#[test]
fn ordered_set_keeps_first_position() {
    let mut arena = Arena::new();
    let set = SharedOrderedSet::new(&arena, ValueKind::Str)
        .insert(&mut arena, &Value::from("b"))
        .unwrap()
        .insert(&mut arena, &Value::from("a"))
        .unwrap()
        .insert(&mut arena, &Value::from("b"))
        .unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(
        set.elements(&arena).unwrap(),
        vec![Value::from("b"), Value::from("a")]
    );
}
