//! Proptest strategies for ticket sales.

use proptest::prelude::*;

/// A capacity between 1 and `max`.
pub fn capacity(max: u64) -> impl Strategy<Value = u64> {
    1..=max
}

/// A sequence of order sizes, each between 1 and `max_per_order`.
pub fn orders(max_per_order: u32, max_orders: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1..=max_per_order, 0..=max_orders)
}
