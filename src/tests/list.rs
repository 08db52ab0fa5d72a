use crate::{Arena, SharedDoublyLinkedList, SharedLinkedList, SharedQueue, SharedStack, Value, ValueKind};

fn nums(values: &[f64]) -> Vec<Value> {
    values.iter().map(|&v| Value::Number(v)).collect()
}

/// E6: bidirectional access and end trimming.
#[test]
fn doubly_linked_bidirectional() {
    let mut arena = Arena::new();
    let mut list = SharedDoublyLinkedList::new(&arena, ValueKind::Number);
    for i in 1..=10 {
        list = list.append(&mut arena, &Value::Number(f64::from(i))).unwrap();
    }
    assert_eq!(list.get(&arena, 0).unwrap(), Some(Value::Number(1.0)));
    assert_eq!(list.get(&arena, 9).unwrap(), Some(Value::Number(10.0)));
    assert_eq!(list.get_reverse(&arena, 0).unwrap(), Some(Value::Number(10.0)));

    let list = list
        .remove_first(&mut arena)
        .unwrap()
        .remove_last(&mut arena)
        .unwrap()
        .remove_first(&mut arena)
        .unwrap()
        .remove_last(&mut arena)
        .unwrap();
    assert_eq!(
        list.to_vec(&arena).unwrap(),
        nums(&[3.0, 4.0, 5.0, 6.0, 7.0, 8.0])
    );
}

#[test]
fn forward_and_reverse_agree() {
    let mut arena = Arena::new();
    let mut list = SharedDoublyLinkedList::new(&arena, ValueKind::Number);
    for i in 0..7 {
        list = list.prepend(&mut arena, &Value::Number(f64::from(i))).unwrap();
    }
    let mut forward = Vec::new();
    list.for_each(&arena, |_, v| forward.push(v)).unwrap();
    let mut reverse = Vec::new();
    list.for_each_reverse(&arena, |_, v| reverse.push(v)).unwrap();
    reverse.reverse();
    assert_eq!(forward, reverse);
    assert_eq!(forward.len(), list.len());
}

#[test]
fn insert_before_and_after() {
    let mut arena = Arena::new();
    let list = SharedDoublyLinkedList::new(&arena, ValueKind::Number)
        .append(&mut arena, &Value::Number(1.0))
        .unwrap()
        .append(&mut arena, &Value::Number(3.0))
        .unwrap();
    let list = list.insert_before(&mut arena, 1, &Value::Number(2.0)).unwrap();
    let list = list.insert_after(&mut arena, 2, &Value::Number(4.0)).unwrap();
    assert_eq!(list.to_vec(&arena).unwrap(), nums(&[1.0, 2.0, 3.0, 4.0]));

    // Out-of-range writes are no-ops.
    let same = list.insert_before(&mut arena, 99, &Value::Number(9.0)).unwrap();
    assert_eq!(same.to_vec(&arena).unwrap(), nums(&[1.0, 2.0, 3.0, 4.0]));
}

#[test]
fn remove_at_interior() {
    let mut arena = Arena::new();
    let mut list = SharedDoublyLinkedList::new(&arena, ValueKind::Number);
    for i in 0..5 {
        list = list.append(&mut arena, &Value::Number(f64::from(i))).unwrap();
    }
    let list = list.remove_at(&mut arena, 2).unwrap();
    assert_eq!(list.to_vec(&arena).unwrap(), nums(&[0.0, 1.0, 3.0, 4.0]));
    // Removed node goes back to the free list and gets reused.
    let before = arena.heap_end();
    let list = list.append(&mut arena, &Value::Number(9.0)).unwrap();
    assert_eq!(arena.heap_end(), before);
    assert_eq!(list.len(), 5);
}

#[test]
fn empty_removals_are_noops() {
    let mut arena = Arena::new();
    let list = SharedDoublyLinkedList::new(&arena, ValueKind::Number);
    let list = list.remove_first(&mut arena).unwrap();
    let list = list.remove_last(&mut arena).unwrap();
    assert!(list.is_empty());
}

#[test]
fn linked_list_push_pop() {
    let mut arena = Arena::new();
    let list = SharedLinkedList::new(&arena, ValueKind::Str)
        .push_back(&mut arena, &Value::from("a"))
        .unwrap()
        .push_back(&mut arena, &Value::from("b"))
        .unwrap()
        .push_front(&mut arena, &Value::from("z"))
        .unwrap();
    assert_eq!(
        list.to_vec(&arena).unwrap(),
        vec![Value::from("z"), Value::from("a"), Value::from("b")]
    );
    let list = list.pop_front(&mut arena).unwrap();
    assert_eq!(list.get(&arena, 0).unwrap(), Some(Value::from("a")));
    assert_eq!(list.len(), 2);
}

#[test]
fn stack_lifo_with_peek_cache() {
    let mut arena = Arena::new();
    let stack = SharedStack::new(&arena, ValueKind::Str);
    assert_eq!(stack.peek(), None);

    let stack = stack.push(&mut arena, &Value::from("bottom")).unwrap();
    let stack = stack.push(&mut arena, &Value::from("top")).unwrap();
    assert_eq!(stack.peek(), Some(&Value::from("top")));
    assert_eq!(stack.len(), 2);

    let popped = stack.pop(&mut arena).unwrap();
    assert_eq!(popped.peek(), Some(&Value::from("bottom")));
    // The pre-pop handle is untouched.
    assert_eq!(stack.peek(), Some(&Value::from("top")));
    assert_eq!(stack.to_vec(&arena).unwrap(), vec![Value::from("top"), Value::from("bottom")]);
}

#[test]
fn stack_pop_empty_is_noop() {
    let mut arena = Arena::new();
    let stack = SharedStack::new(&arena, ValueKind::Str);
    let same = stack.pop(&mut arena).unwrap();
    assert!(same.is_empty());
}

/// Stack versions share structure: older handles keep their elements.
#[test]
fn stack_versions_share_tail() {
    let mut arena = Arena::new();
    let v1 = SharedStack::new(&arena, ValueKind::Number)
        .push(&mut arena, &Value::Number(1.0))
        .unwrap();
    let v2 = v1.push(&mut arena, &Value::Number(2.0)).unwrap();
    let v3 = v1.push(&mut arena, &Value::Number(3.0)).unwrap();

    assert_eq!(v1.to_vec(&arena).unwrap(), nums(&[1.0]));
    assert_eq!(v2.to_vec(&arena).unwrap(), nums(&[2.0, 1.0]));
    assert_eq!(v3.to_vec(&arena).unwrap(), nums(&[3.0, 1.0]));
}

#[test]
fn queue_fifo() {
    let mut arena = Arena::new();
    let q = SharedQueue::new(&arena, ValueKind::Str)
        .enqueue(&mut arena, &Value::from("first"))
        .unwrap()
        .enqueue(&mut arena, &Value::from("second"))
        .unwrap()
        .enqueue(&mut arena, &Value::from("third"))
        .unwrap();
    assert_eq!(q.peek(&arena).unwrap(), Some(Value::from("first")));

    let q = q.dequeue(&mut arena).unwrap();
    assert_eq!(q.peek(&arena).unwrap(), Some(Value::from("second")));
    assert_eq!(q.len(), 2);

    let q = q.dequeue(&mut arena).unwrap().dequeue(&mut arena).unwrap();
    assert!(q.is_empty());
    let q = q.dequeue(&mut arena).unwrap();
    assert!(q.is_empty());
}

/// Older queue handles stop at their recorded size, so later enqueues
/// stay invisible to them.
#[test]
fn queue_old_handles_bounded_by_size() {
    let mut arena = Arena::new();
    let v1 = SharedQueue::new(&arena, ValueKind::Number)
        .enqueue(&mut arena, &Value::Number(1.0))
        .unwrap();
    let v2 = v1.enqueue(&mut arena, &Value::Number(2.0)).unwrap();
    assert_eq!(v1.to_vec(&arena).unwrap(), nums(&[1.0]));
    assert_eq!(v2.to_vec(&arena).unwrap(), nums(&[1.0, 2.0]));
}
