use crate::{Arena, SharedList, SharedMap, Value, ValueKind};

/// Deterministic pseudo-random stream; keeps the workload reproducible
/// without pulling a generator into the dev graph.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        self.0 >> 33
    }
}

#[test]
fn map_against_btreemap_model() {
    let mut arena = Arena::new();
    let mut map = SharedMap::new(&arena, ValueKind::Str);
    let mut model = std::collections::BTreeMap::new();
    let mut rng = Lcg(0x5EED);

    for _ in 0..3_000 {
        let k = format!("key-{}", rng.next() % 400);
        match rng.next() % 4 {
            0 => {
                map = map.remove(&mut arena, &k).unwrap();
                model.remove(k.as_bytes());
            }
            _ => {
                let v = format!("v{}", rng.next() % 1000);
                map = map.insert(&mut arena, &k, &Value::from(v.as_str())).unwrap();
                model.insert(k.clone().into_bytes(), v);
            }
        }
    }

    assert_eq!(map.len(), model.len());
    for (k, v) in &model {
        assert_eq!(map.get(&arena, k).unwrap(), Some(Value::from(v.as_str())));
    }
    let mut visited = 0;
    map.for_each(&arena, |k, v| {
        assert_eq!(model.get(k).map(|s| Value::from(s.as_str())), Some(v));
        visited += 1;
    })
    .unwrap();
    assert_eq!(visited, model.len());
}

#[test]
fn vector_against_vec_model() {
    let mut arena = Arena::new();
    let mut list = SharedList::new(&arena, ValueKind::Number);
    let mut model: Vec<f64> = Vec::new();
    let mut rng = Lcg(0xF00D);

    for _ in 0..2_000 {
        match rng.next() % 5 {
            0 if !model.is_empty() => {
                list = list.pop(&mut arena).unwrap();
                model.pop();
            }
            1 if !model.is_empty() => {
                let i = (rng.next() as usize) % model.len();
                let v = rng.next() as f64;
                list = list.set(&mut arena, i, &Value::Number(v)).unwrap();
                model[i] = v;
            }
            _ => {
                let v = rng.next() as f64;
                list = list.push(&mut arena, &Value::Number(v)).unwrap();
                model.push(v);
            }
        }
    }

    assert_eq!(list.len(), model.len());
    for (i, &v) in model.iter().enumerate() {
        assert_eq!(list.get(&arena, i).unwrap(), Some(Value::Number(v)), "index {i}");
    }
}

/// Heavy churn on one arena stays under the growth limit and every
/// surviving version still reads correctly.
#[test]
fn version_chain_stays_readable() {
    let mut arena = Arena::new();
    let mut versions = vec![SharedMap::new(&arena, ValueKind::Str)];
    for i in 0..200 {
        let next = versions
            .last()
            .unwrap()
            .insert(&mut arena, format!("k{i}"), &Value::from(format!("v{i}")))
            .unwrap();
        versions.push(next);
    }
    for (i, version) in versions.iter().enumerate() {
        assert_eq!(version.len(), i);
        if i > 0 {
            let last = i - 1;
            assert_eq!(
                version.get(&arena, format!("k{last}")).unwrap(),
                Some(Value::from(format!("v{last}")))
            );
        }
        assert_eq!(version.get(&arena, format!("k{i}")).unwrap(), None);
    }
}

#[test]
fn out_of_memory_surfaces() {
    // Limit small enough that the heap cannot grow even one page.
    let mut arena = Arena::with_limit(64 * 1024);
    let mut map = SharedMap::new(&arena, ValueKind::Str);
    let mut failed = false;
    for i in 0..100_000 {
        match map.insert(&mut arena, format!("key-{i}"), &Value::from("x".repeat(64))) {
            Ok(next) => map = next,
            Err(crate::Error::OutOfMemory { .. }) => {
                failed = true;
                break;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert!(failed, "expected the growth limit to bite");
}

#[test]
fn payload_too_large_surfaces() {
    let mut arena = Arena::new();
    let map = SharedMap::new(&arena, ValueKind::Str);
    let giant = "x".repeat(5000);
    assert!(matches!(
        map.insert(&mut arena, "k", &Value::from(giant.as_str())),
        Err(crate::Error::PayloadTooLarge { .. })
    ));
    assert!(matches!(
        map.insert(&mut arena, "k".repeat(5000), &Value::from("v")),
        Err(crate::Error::PayloadTooLarge { .. })
    ));
}
