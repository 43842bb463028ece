//! Fixed-window moving average

use std::collections::VecDeque;

/// Sliding window over the most recent values
///
/// The mean is reported as soon as one value is held; [`is_ready`] only says
/// whether the window is full.
///
/// [`is_ready`]: MovingAverageTracker::is_ready
#[derive(Debug, Clone)]
pub struct MovingAverageTracker {
    capacity: usize,
    values: VecDeque<f64>,
}

impl MovingAverageTracker {
    /// Create a tracker holding at most `capacity` values (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Append a value, evicting the oldest ones beyond capacity
    pub fn add_value(&mut self, value: f64) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// Arithmetic mean of the held values, `None` when empty
    pub fn average(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Whether the window has filled up
    pub fn is_ready(&self) -> bool {
        self.values.len() >= self.capacity
    }

    /// Window capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value has been added yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Held values, oldest first
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}
