use super::*;
use std::{sync::Arc, thread, time::Instant};

#[test]
fn fifo_order_is_preserved() {
    let q = TaskQueue::new();
    for i in 0..5 {
        q.push(i).unwrap();
    }
    assert_eq!(q.try_pop(), Some(0));
    assert_eq!(q.pop(), Some(1));
    assert_eq!(q.pop_timeout(Duration::from_millis(1)), Pop::Item(2));
    assert_eq!(q.len(), 2);
}

#[test]
fn bounded_try_push_reports_full() {
    let q = TaskQueue::with_capacity(Some(2));
    assert!(q.try_push(1).is_ok());
    assert!(q.try_push(2).is_ok());
    assert_eq!(q.try_push(3), Err(3));
    assert_eq!(q.try_pop(), Some(1));
    assert!(q.try_push(3).is_ok());
}

#[test]
fn blocking_push_waits_for_space() {
    let q = Arc::new(TaskQueue::with_capacity(Some(1)));
    q.push(1).unwrap();
    let producer = {
        let q = Arc::clone(&q);
        thread::spawn(move || q.push(2))
    };
    thread::sleep(Duration::from_millis(20));
    assert_eq!(q.pop(), Some(1));
    producer.join().unwrap().unwrap();
    assert_eq!(q.pop(), Some(2));
}

#[test]
fn pop_timeout_expires_on_empty_queue() {
    let q: TaskQueue<u32> = TaskQueue::new();
    let start = Instant::now();
    assert_eq!(q.pop_timeout(Duration::from_millis(10)), Pop::Timeout);
    assert!(start.elapsed() >= Duration::from_millis(10));
}

#[test]
fn done_wakes_blocked_pop_and_refuses_pushes() {
    let q: Arc<TaskQueue<u32>> = Arc::new(TaskQueue::new());
    let waiter = {
        let q = Arc::clone(&q);
        thread::spawn(move || q.pop())
    };
    thread::sleep(Duration::from_millis(20));
    q.done();
    assert_eq!(waiter.join().unwrap(), None);
    assert!(q.is_done());
    assert_eq!(q.push(7), Err(7));
    assert_eq!(q.try_push(8), Err(8));
    assert_eq!(q.pop_timeout(Duration::from_secs(5)), Pop::Closed);
}

#[test]
fn queued_items_survive_done() {
    let q = TaskQueue::new();
    q.push("a").unwrap();
    q.push("b").unwrap();
    q.done();
    assert_eq!(q.pop(), Some("a"));
    assert_eq!(q.pop_timeout(Duration::from_millis(1)), Pop::Item("b"));
    assert_eq!(q.pop(), None);
    assert!(q.is_empty());
}

#[test]
fn nudge_interrupts_wait_pop_once() {
    let q: Arc<TaskQueue<u32>> = Arc::new(TaskQueue::new());
    let waiter = {
        let q = Arc::clone(&q);
        thread::spawn(move || q.wait_pop())
    };
    thread::sleep(Duration::from_millis(20));
    q.nudge();
    assert_eq!(waiter.join().unwrap(), Pop::Woken);

    // A nudge with no waiter is kept, then consumed.
    q.nudge();
    assert_eq!(q.wait_pop(), Pop::Woken);
    q.push(3).unwrap();
    assert_eq!(q.wait_pop(), Pop::Item(3));
    q.done();
    assert_eq!(q.wait_pop(), Pop::Closed);
}

#[test]
fn queued_items_win_over_a_pending_nudge() {
    let q = TaskQueue::new();
    q.nudge();
    q.push("a").unwrap();
    assert_eq!(q.wait_pop(), Pop::Item("a"));
    assert_eq!(q.wait_pop(), Pop::Woken);
}
