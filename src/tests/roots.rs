use crate::{Arena, FixedClass, RootSlots, SharedPriorityQueue, Value, ValueKind};

#[test]
fn register_until_exhausted() {
    let arena = Arena::new();
    let mut slots = RootSlots::new(2);
    let a = slots.register_root(&arena, 100, None);
    let b = slots.register_root(&arena, 200, None);
    let c = slots.register_root(&arena, 300, None);
    assert!(a.is_some());
    assert!(b.is_some());
    assert!(c.is_none());
}

#[test]
fn unregister_frees_the_slot() {
    let mut arena = Arena::new();
    let mut slots = RootSlots::new(1);
    let slot = slots.register_root(&arena, 100, None).unwrap();
    assert!(slots.register_root(&arena, 200, None).is_none());
    slots.unregister_root(&mut arena, slot);
    assert!(slots.register_root(&arena, 200, None).is_some());
}

/// Releasing a fixed-class root returns its node to the free list; the
/// next allocation of that class reuses it instead of bumping.
#[test]
fn release_recycles_fixed_nodes() {
    let mut arena = Arena::new();
    let mut slots = RootSlots::new(8);

    let q = SharedPriorityQueue::new(&arena, ValueKind::Number, false)
        .enqueue(&mut arena, 1.0, &Value::Number(1.0))
        .unwrap();
    let env = q.to_envelope();
    let slot = slots.register_root(&arena, env.data.root, Some(FixedClass::LeftistNode)).unwrap();

    slots.unregister_root(&mut arena, slot);
    assert_ne!(arena.free_list(FixedClass::LeftistNode), 0);

    let before = arena.heap_end();
    let _ = SharedPriorityQueue::new(&arena, ValueKind::Number, false)
        .enqueue(&mut arena, 2.0, &Value::Number(2.0))
        .unwrap();
    assert_eq!(arena.heap_end(), before);
}

/// update_root parks the old root on the pending list; it drains at the
/// ops threshold.
#[test]
fn pending_releases_drain_at_threshold() {
    let mut arena = Arena::new();
    let mut slots = RootSlots::with_thresholds(8, 3, u32::MAX);

    let mut q = SharedPriorityQueue::new(&arena, ValueKind::Number, false);
    let mut roots = Vec::new();
    for i in 0..4 {
        q = q.enqueue(&mut arena, f64::from(i), &Value::Number(f64::from(i))).unwrap();
        roots.push(q.to_envelope().data.root);
    }

    let slot = slots.register_root(&arena, roots[0], Some(FixedClass::LeftistNode)).unwrap();
    slots.update_root(&mut arena, slot, roots[1]);
    assert_eq!(slots.pending_len(), 1);
    slots.update_root(&mut arena, slot, roots[2]);
    assert_eq!(slots.pending_len(), 2);
    slots.update_root(&mut arena, slot, roots[3]);
    // Threshold of 3 reached: drained.
    assert_eq!(slots.pending_len(), 0);
    assert_ne!(arena.free_list(FixedClass::LeftistNode), 0);
}

#[test]
fn explicit_drain() {
    let mut arena = Arena::new();
    let mut slots = RootSlots::with_thresholds(8, 1000, u32::MAX);
    let slot = slots.register_root(&arena, 100, Some(FixedClass::RbNode)).unwrap();
    slots.update_root(&mut arena, slot, 200);
    assert_eq!(slots.pending_len(), 1);
    slots.drain(&mut arena);
    assert_eq!(slots.pending_len(), 0);
}

/// A reset between register and release is detected: the stale entry is
/// dropped instead of poisoning the new generation's free list.
#[test]
fn stale_release_is_dropped() {
    let mut arena = Arena::new();
    let mut slots = RootSlots::new(8);
    let slot = slots.register_root(&arena, 100, Some(FixedClass::RbNode)).unwrap();

    arena.reset();
    slots.unregister_root(&mut arena, slot);
    assert_eq!(arena.free_list(FixedClass::RbNode), 0);
}

#[test]
fn unregister_twice_is_harmless() {
    let mut arena = Arena::new();
    let mut slots = RootSlots::new(4);
    let slot = slots.register_root(&arena, 100, None).unwrap();
    slots.unregister_root(&mut arena, slot);
    slots.unregister_root(&mut arena, slot);
}
