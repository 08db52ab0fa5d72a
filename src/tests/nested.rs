use crate::envelope::Envelope;
use crate::{AnyHandle, Arena, Error, SharedMap, SharedSet, StructureKind, Value, ValueKind};

fn nested_map(arena: &Arena) -> SharedMap {
    SharedMap::new(
        arena,
        ValueKind::Nested(StructureKind::SharedSet, Box::new(ValueKind::Str)),
    )
}

/// E8: a set stored inside a map survives the round trip, and a newer
/// version of the set does not disturb the stored one.
#[test]
fn set_inside_map() {
    let mut arena = Arena::new();
    let users = SharedSet::new(&arena, ValueKind::Str)
        .insert(&mut arena, &Value::from("admin"))
        .unwrap()
        .insert(&mut arena, &Value::from("active"))
        .unwrap();

    let map = nested_map(&arena)
        .insert(&mut arena, "users", &Value::Nested(users.to_envelope()))
        .unwrap();

    let Some(Value::Nested(env)) = map.get(&arena, "users").unwrap() else {
        panic!("expected a nested envelope");
    };
    assert_eq!(env.kind, StructureKind::SharedSet);
    let restored = SharedSet::from_envelope(&arena, &env);
    assert_eq!(restored.len(), 2);
    assert!(restored.contains(&arena, &Value::from("admin")).unwrap());

    // Grow a new version of the inner set; the stored one is frozen.
    let bigger = users.insert(&mut arena, &Value::from("extra")).unwrap();
    assert_eq!(bigger.len(), 3);
    let Some(Value::Nested(env)) = map.get(&arena, "users").unwrap() else {
        panic!("expected a nested envelope");
    };
    let stored = SharedSet::from_envelope(&arena, &env);
    assert_eq!(stored.len(), 2);
    assert!(!stored.contains(&arena, &Value::from("extra")).unwrap());
}

#[test]
fn envelope_wire_shape() {
    let arena = Arena::new();
    let set = SharedSet::new(&arena, ValueKind::Str);
    let bytes = set.to_envelope().to_json_bytes().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["__t"], "SharedSet");
    assert_eq!(json["__i"], "string");
    assert!(json["__d"].is_object());
}

#[test]
fn value_kind_tags_round_trip() {
    for (kind, tag) in [
        (ValueKind::Number, "number"),
        (ValueKind::Bool, "boolean"),
        (ValueKind::Str, "string"),
        (ValueKind::Object, "object"),
        (
            ValueKind::Nested(StructureKind::SharedList, Box::new(ValueKind::Number)),
            "SharedList<number>",
        ),
        (
            ValueKind::Nested(
                StructureKind::SharedMap,
                Box::new(ValueKind::Nested(StructureKind::SharedSet, Box::new(ValueKind::Str))),
            ),
            "SharedMap<SharedSet<string>>",
        ),
    ] {
        assert_eq!(kind.to_string(), tag);
        assert_eq!(tag.parse::<ValueKind>().unwrap(), kind);
    }
}

/// Decoding an unregistered tag fails with the registry error.
#[test]
fn unknown_structure_kind_surfaces() {
    let bytes = br#"{"__t": "SharedFrobnicator", "__i": "string", "__d": {}}"#;
    match Envelope::from_json_bytes(bytes) {
        Err(Error::UnknownStructureKind(tag)) => assert_eq!(tag, "SharedFrobnicator"),
        other => panic!("expected UnknownStructureKind, got {other:?}"),
    }
}

#[test]
fn unknown_inner_kind_surfaces() {
    let bytes = br#"{"__t": "SharedMap", "__i": "gibberish", "__d": {}}"#;
    assert!(matches!(
        Envelope::from_json_bytes(bytes),
        Err(Error::UnknownStructureKind(_))
    ));
}

#[test]
fn malformed_envelope_surfaces() {
    assert!(matches!(
        Envelope::from_json_bytes(b"not json at all"),
        Err(Error::Envelope(_))
    ));
}

/// A nested value whose tag is unknown surfaces through map reads.
#[test]
fn bad_nested_value_fails_on_read() {
    let mut arena = Arena::new();
    // Store the bad envelope bytes as a plain string, then re-tag the
    // handle so reads decode them as a nested structure.
    let map = SharedMap::new(&arena, ValueKind::Str)
        .insert(
            &mut arena,
            "users",
            &Value::from(r#"{"__t": "Mystery", "__i": "string", "__d": {}}"#),
        )
        .unwrap();
    let rebadged = SharedMap::from_envelope(&arena, &Envelope {
        inner: ValueKind::Nested(StructureKind::SharedSet, Box::new(ValueKind::Str)),
        ..map.to_envelope()
    });
    assert!(matches!(
        rebadged.get(&arena, "users"),
        Err(Error::UnknownStructureKind(_))
    ));
}

#[test]
fn any_handle_envelope_round_trip() {
    let mut arena = Arena::new();
    let map = SharedMap::new(&arena, ValueKind::Str)
        .insert(&mut arena, "k", &Value::from("v"))
        .unwrap();
    let handle = AnyHandle::Map(map);
    let env = handle.to_envelope();
    let decoded = AnyHandle::from_envelope(&arena, &env).unwrap();
    assert_eq!(decoded.kind(), StructureKind::SharedMap);
    let AnyHandle::Map(m) = decoded else { panic!("wrong kind") };
    assert_eq!(m.get(&arena, "k").unwrap(), Some(Value::from("v")));
}
