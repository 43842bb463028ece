use crypto_crawler::pipeline::MovingAverageTracker;

#[test]
fn mean_before_window_fills() {
    let mut tracker = MovingAverageTracker::new(4);
    for value in [10.0, 20.0, 30.0] {
        tracker.add_value(value);
    }

    assert_eq!(tracker.average(), Some(20.0));
    assert!(!tracker.is_ready());
}

#[test]
fn oldest_value_is_evicted_after_capacity() {
    let mut tracker = MovingAverageTracker::new(3);
    for value in [1.0, 2.0, 3.0, 4.0] {
        tracker.add_value(value);
    }

    assert!(tracker.is_ready());
    assert_eq!(tracker.len(), 3);
    assert_eq!(tracker.values().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
    assert_eq!(tracker.average(), Some(3.0));
}

#[test]
fn empty_window_has_no_average() {
    let tracker = MovingAverageTracker::new(10);
    assert_eq!(tracker.average(), None);
    assert!(tracker.is_empty());
}

#[test]
fn zero_capacity_behaves_as_one() {
    let mut tracker = MovingAverageTracker::new(0);
    tracker.add_value(5.0);
    tracker.add_value(7.0);

    assert_eq!(tracker.capacity(), 1);
    assert_eq!(tracker.average(), Some(7.0));
    assert!(tracker.is_ready());
}
