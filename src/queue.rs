use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::mem;

use tokio::time::Instant;

/// A scheduled payload waiting for its deadline.
#[derive(Debug)]
pub(crate) struct Entry<T> {
    pub(crate) deadline: Instant,
    pub(crate) sequence: u64,
    pub(crate) payload: T,
}

impl<T> Entry<T> {
    fn key(&self) -> (Instant, u64) {
        (self.deadline, self.sequence)
    }
}

// Ordering never looks at the payload. Reversed so that `BinaryHeap`,
// a max-heap, keeps the earliest (deadline, sequence) at the top.
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for Entry<T> {}

/// Min-heap of pending entries ordered by deadline, ties broken by
/// insertion order.
///
/// The sequence counter survives [`DeadlineQueue::clear`], so entries
/// pushed after a clear still order after everything pushed before it.
#[derive(Debug)]
pub(crate) struct DeadlineQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    next_sequence: u64,
}

impl<T> Default for DeadlineQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DeadlineQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Adds a payload due at `deadline` and returns its sequence number.
    pub(crate) fn push(&mut self, deadline: Instant, payload: T) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.heap.push(Entry {
            deadline,
            sequence,
            payload,
        });
        sequence
    }

    pub(crate) fn peek_min(&self) -> Option<&Entry<T>> {
        self.heap.peek()
    }

    pub(crate) fn pop_min(&mut self) -> Option<Entry<T>> {
        self.heap.pop()
    }

    /// Pops every entry whose deadline is at or before `now`, earliest first.
    pub(crate) fn drain_due(&mut self, now: Instant) -> Vec<Entry<T>> {
        let mut due = Vec::new();
        while self.peek_min().is_some_and(|entry| entry.deadline <= now) {
            if let Some(entry) = self.pop_min() {
                due.push(entry);
            }
        }
        due
    }

    /// Drops every pending entry along with the backing storage.
    pub(crate) fn clear(&mut self) {
        drop(mem::take(&mut self.heap));
    }

    #[cfg(test)]
    fn as_slice(&self) -> &[Entry<T>] {
        self.heap.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn assert_heap_invariant<T>(queue: &DeadlineQueue<T>) {
        let entries = queue.as_slice();
        for child in 1..entries.len() {
            let parent = (child - 1) / 2;
            assert!(
                entries[parent].key() <= entries[child].key(),
                "entry {} orders before its parent {}",
                child,
                parent
            );
        }
    }

    #[test]
    fn test_empty_queue() {
        let mut queue: DeadlineQueue<u32> = DeadlineQueue::new();
        assert_eq!(queue.len(), 0);
        assert!(queue.peek_min().is_none());
        assert!(queue.pop_min().is_none());
        assert!(queue.drain_due(Instant::now()).is_empty());
    }

    #[test]
    fn test_pops_in_deadline_order() {
        let base = Instant::now();
        let mut queue = DeadlineQueue::new();
        for (offset, payload) in [(300, "c"), (100, "a"), (500, "e"), (200, "b"), (400, "d")] {
            queue.push(base + Duration::from_millis(offset), payload);
        }

        assert_eq!(queue.len(), 5);
        assert_eq!(queue.peek_min().map(|e| e.payload), Some("a"));

        let order: Vec<_> = std::iter::from_fn(|| queue.pop_min().map(|e| e.payload)).collect();
        assert_eq!(order, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_equal_deadlines_keep_insertion_order() {
        let deadline = Instant::now() + Duration::from_millis(100);
        let mut queue = DeadlineQueue::new();
        for payload in 0..32 {
            queue.push(deadline, payload);
        }

        let order: Vec<_> = queue.drain_due(deadline).into_iter().map(|e| e.payload).collect();
        assert_eq!(order, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_heap_invariant_under_mixed_operations() {
        let base = Instant::now();
        let mut queue = DeadlineQueue::new();
        // Deterministic pseudo-random offsets with plenty of collisions.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for round in 0..500u32 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            queue.push(base + Duration::from_millis(seed % 64), round);
            if round % 3 == 0 {
                queue.pop_min();
            }
            assert_heap_invariant(&queue);
        }

        let mut previous = None;
        while let Some(entry) = queue.pop_min() {
            if let Some(previous) = previous {
                assert!(previous < entry.key());
            }
            previous = Some(entry.key());
            assert_heap_invariant(&queue);
        }
    }

    #[test]
    fn test_drain_due_stops_at_future_entries() {
        let base = Instant::now();
        let mut queue = DeadlineQueue::new();
        queue.push(base + Duration::from_millis(200), 2);
        queue.push(base + Duration::from_millis(50), 1);
        queue.push(base + Duration::from_millis(125), 3);

        let due: Vec<_> = queue
            .drain_due(base + Duration::from_millis(125))
            .into_iter()
            .map(|e| e.payload)
            .collect();
        assert_eq!(due, vec![1, 3]);
        assert_eq!(
            queue.peek_min().map(|e| e.deadline),
            Some(base + Duration::from_millis(200))
        );
    }

    #[test]
    fn test_clear_keeps_sequence_running() {
        let deadline = Instant::now();
        let mut queue = DeadlineQueue::new();
        assert_eq!(queue.push(deadline, ()), 0);
        assert_eq!(queue.push(deadline, ()), 1);

        queue.clear();
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.push(deadline, ()), 2);
    }
}
