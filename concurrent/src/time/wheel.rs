use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;

/// An entry in the timer wheel.
///
/// `TimerEntry` represents a scheduled wake-up at a specific deadline.
/// Entries are ordered by deadline, then by registration sequence, so
/// timers sharing a deadline fire in the order they were registered.
struct TimerEntry<T> {
    /// The time at which the timer should fire.
    deadline: Instant,

    /// Registration order within the wheel.
    seq: u64,

    /// Cancellation flag shared with the timer.
    cancelled: Arc<AtomicBool>,

    /// What to fire.
    payload: T,
}

impl<T> Eq for TimerEntry<T> {}

impl<T> PartialEq for TimerEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<T> Ord for TimerEntry<T> {
    /// Orders timer entries by `(deadline, seq)`.
    ///
    /// The comparison is **reversed** so that a `BinaryHeap<TimerEntry>`
    /// behaves as a min-heap, where the earliest deadline is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for TimerEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// How an entry left the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expiry {
    /// The deadline passed.
    Fired,

    /// The timer was cancelled before its deadline.
    Cancelled,
}

/// Ordered set of pending deadlines owned by one scheduler.
pub(crate) struct TimerWheel<T> {
    heap: BinaryHeap<TimerEntry<T>>,
    next_seq: u64,
}

impl<T> TimerWheel<T> {
    /// Creates an empty wheel.
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Schedules `payload` to fire at `deadline`.
    pub(crate) fn insert(&mut self, deadline: Instant, cancelled: Arc<AtomicBool>, payload: T) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.heap.push(TimerEntry {
            deadline,
            seq,
            cancelled,
            payload,
        });
    }

    /// Removes every entry that is due at `now` or cancelled and sitting at
    /// the head of the wheel, in firing order.
    pub(crate) fn pop_expired(&mut self, now: Instant) -> Vec<(T, Expiry)> {
        let mut expired = Vec::new();

        while let Some(head) = self.heap.peek() {
            let expiry = if head.cancelled.load(AtomicOrdering::Acquire) {
                Expiry::Cancelled
            } else if head.deadline <= now {
                Expiry::Fired
            } else {
                break;
            };

            if let Some(entry) = self.heap.pop() {
                expired.push((entry.payload, expiry));
            }
        }

        expired
    }

    /// Deadline of the entry at the head of the wheel.
    ///
    /// Cancelled heads are only removed by [`pop_expired`](Self::pop_expired),
    /// which the scheduler calls right before asking for the next deadline.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|head| head.deadline)
    }

    /// Removes every entry regardless of its deadline.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        self.heap.drain().map(|entry| entry.payload).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Expiry, TimerWheel};

    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    fn flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn fires_in_deadline_order() {
        let now = Instant::now();
        let mut wheel = TimerWheel::new();

        wheel.insert(now + Duration::from_millis(30), flag(), "c");
        wheel.insert(now + Duration::from_millis(10), flag(), "a");
        wheel.insert(now + Duration::from_millis(20), flag(), "b");

        let fired: Vec<_> = wheel
            .pop_expired(now + Duration::from_millis(30))
            .into_iter()
            .map(|(payload, _)| payload)
            .collect();

        assert_eq!(fired, vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_deadlines_fire_in_registration_order() {
        let deadline = Instant::now();
        let mut wheel = TimerWheel::new();

        for i in 0..5 {
            wheel.insert(deadline, flag(), i);
        }

        let fired: Vec<_> = wheel
            .pop_expired(deadline)
            .into_iter()
            .map(|(payload, _)| payload)
            .collect();

        assert_eq!(fired, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn future_deadlines_stay_queued() {
        let now = Instant::now();
        let mut wheel = TimerWheel::new();

        wheel.insert(now + Duration::from_secs(60), flag(), ());

        assert!(wheel.pop_expired(now).is_empty());
        assert_eq!(wheel.next_deadline(), Some(now + Duration::from_secs(60)));
    }

    #[test]
    fn cancelled_head_is_skipped() {
        let now = Instant::now();
        let mut wheel = TimerWheel::new();

        let cancelled = flag();
        wheel.insert(now + Duration::from_millis(5), cancelled.clone(), "early");
        wheel.insert(now + Duration::from_millis(50), flag(), "late");

        cancelled.store(true, Ordering::Release);

        assert_eq!(
            wheel.pop_expired(now + Duration::from_millis(10)),
            vec![("early", Expiry::Cancelled)]
        );
        assert_eq!(wheel.next_deadline(), Some(now + Duration::from_millis(50)));
    }

    #[test]
    fn cancelled_entries_are_reported() {
        let now = Instant::now();
        let mut wheel = TimerWheel::new();

        let cancelled = flag();
        wheel.insert(now + Duration::from_secs(60), cancelled.clone(), "gone");
        cancelled.store(true, Ordering::Release);

        assert_eq!(wheel.pop_expired(now), vec![("gone", Expiry::Cancelled)]);
        assert_eq!(wheel.next_deadline(), None);
    }
}
