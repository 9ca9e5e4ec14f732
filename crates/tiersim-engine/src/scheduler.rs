//! Future event list
//!
//! Min-heap of timed events. Events sharing a timestamp are released in the
//! order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tiersim_core::{LifecycleEvent, Scheduler, TaskProperty};

/// Anything the simulator can find at the head of the queue
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// A generated task reaches its arrival time
    Arrival(TaskProperty),
    /// Lifecycle transition scheduled by the coordinator
    Lifecycle(LifecycleEvent),
}

/// Timed event wrapper for priority queue ordering
#[derive(Debug, Clone)]
struct TimedEvent {
    time: f64,
    seq: u64,
    event: SimEvent,
}

// Priority queue orders by time (earliest first), then by insertion
impl Ord for TimedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse comparison for min-heap (BinaryHeap is max-heap by default)
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for TimedEvent {}

impl PartialEq for TimedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

/// Simulation clock plus pending events
#[derive(Debug, Default)]
pub struct EventQueue {
    now: f64,
    next_seq: u64,
    heap: BinaryHeap<TimedEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event at an absolute time
    ///
    /// Times earlier than the clock are clamped to the clock.
    pub fn push_at(&mut self, time: f64, event: SimEvent) {
        let time = time.max(self.now);
        self.heap.push(TimedEvent {
            time,
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
    }

    /// Pop the next event and advance the clock to it
    pub fn pop(&mut self) -> Option<(f64, SimEvent)> {
        let timed = self.heap.pop()?;
        self.now = timed.time;
        Some((timed.time, timed.event))
    }

    /// Time of the next event without consuming it
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|timed| timed.time)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Scheduler for EventQueue {
    fn now(&self) -> f64 {
        self.now
    }

    fn schedule(&mut self, delay: f64, event: LifecycleEvent) {
        debug_assert!(delay >= 0.0, "negative delay {delay}");
        self.push_at(self.now + delay.max(0.0), SimEvent::Lifecycle(event));
    }
}
