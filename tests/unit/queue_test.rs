//! Tests for the pending-task queue

use prometheus_task_scheduler::core::{Priority, QueuedTask, SchedulerError, TaskOptions, Work};
use prometheus_task_scheduler::infra::PriorityQueue;

fn task(priority: Priority) -> QueuedTask<u32> {
    QueuedTask::new(
        Work::once(async { Ok(0) }),
        TaskOptions::new().with_priority(priority),
        None,
    )
}

#[test]
fn test_pop_order_by_priority_then_fifo() {
    let mut queue = PriorityQueue::new(10);
    let low = task(Priority::Low);
    let first_high = task(Priority::High);
    let second_high = task(Priority::High);
    let critical = task(Priority::Critical);
    let expected = [critical.id(), first_high.id(), second_high.id(), low.id()];

    for t in [low, first_high, second_high, critical] {
        queue.push(t).unwrap();
    }

    let popped: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|t| t.id()).collect();
    assert_eq!(popped, expected);
    assert!(queue.is_empty());
}

#[test]
fn test_capacity_enforced_on_push() {
    let mut queue = PriorityQueue::new(2);
    queue.push(task(Priority::Low)).unwrap();
    queue.push(task(Priority::Low)).unwrap();

    let err = queue.push(task(Priority::Critical)).unwrap_err();
    assert!(matches!(err, SchedulerError::QueueFull { capacity: 2 }));
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.capacity(), 2);
}

#[test]
fn test_front_lane_wins_and_ignores_capacity() {
    let mut queue = PriorityQueue::new(1);
    queue.push(task(Priority::Critical)).unwrap();

    let retried = task(Priority::Low);
    let retried_id = retried.id();
    queue.push_front(retried);

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pop().map(|t| t.id()), Some(retried_id));
    assert_eq!(queue.pop().map(|t| t.priority()), Some(Priority::Critical));
}

#[test]
fn test_remove_and_drain() {
    let mut queue = PriorityQueue::new(10);
    let a = task(Priority::Medium);
    let b = task(Priority::High);
    let (a_id, b_id) = (a.id(), b.id());
    queue.push(a).unwrap();
    queue.push(b).unwrap();
    queue.push(task(Priority::Low)).unwrap();

    assert!(queue.contains(a_id));
    assert_eq!(queue.remove(a_id).map(|t| t.id()), Some(a_id));
    assert!(!queue.contains(a_id));
    assert!(queue.remove(a_id).is_none());

    let drained = queue.drain();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].id(), b_id);
    assert!(queue.is_empty());
}

