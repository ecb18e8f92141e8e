//! Bounded rolling window of fee samples

use std::collections::VecDeque;
use rust_decimal::Decimal;
use crate::types::FeeSample;

pub struct FeeHistory {
    window: VecDeque<FeeSample>,
    capacity: usize,
}

impl FeeHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        FeeHistory {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest once the window is full.
    pub fn push(&mut self, sample: FeeSample) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&FeeSample> {
        self.window.back()
    }

    /// Base fees in arrival order.
    pub fn base_fees(&self) -> Vec<Decimal> {
        self.window.iter().map(|s| s.base_fee).collect()
    }
}
