//! Bounded history of the most recent output lines.

use std::collections::VecDeque;

/// Default number of trailing lines kept for diagnostics.
pub const DEFAULT_TAIL_CAPACITY: usize = 10;

/// Fixed-capacity FIFO of the most recently observed output lines.
///
/// Older lines are evicted strictly oldest-first as new ones arrive, so the
/// buffer always holds the last `capacity` lines in their original relative
/// order. Each execution owns exactly one buffer; it is never shared across
/// invocations.
#[derive(Debug, Clone)]
pub struct TailBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl TailBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, evicting the oldest entry when the buffer is full.
    ///
    /// A zero-capacity buffer stores nothing.
    pub fn push(&mut self, line: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Consume the buffer, yielding its lines oldest to newest.
    pub fn into_lines(self) -> Vec<String> {
        self.lines.into()
    }
}

impl Default for TailBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_TAIL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_everything_under_capacity() {
        let mut tail = TailBuffer::new(5);
        tail.push("a");
        tail.push("b");
        tail.push("c");
        assert_eq!(tail.len(), 3);
        assert_eq!(tail.capacity(), 5);
        assert_eq!(tail.into_lines(), vec!["a", "b", "c"]);
    }

    #[test]
    fn evicts_oldest_first_at_capacity() {
        let mut tail = TailBuffer::new(10);
        for i in 1..=15 {
            tail.push(format!("line {i}"));
        }
        assert_eq!(tail.len(), 10);
        let expected: Vec<String> = (6..=15).map(|i| format!("line {i}")).collect();
        assert_eq!(tail.into_lines(), expected);
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut tail = TailBuffer::new(0);
        tail.push("a");
        tail.push("b");
        assert!(tail.is_empty());
        assert_eq!(tail.into_lines(), Vec::<String>::new());
    }

    #[test]
    fn iter_preserves_insertion_order() {
        let mut tail = TailBuffer::new(2);
        tail.push("a");
        tail.push("b");
        tail.push("c");
        let seen: Vec<&str> = tail.iter().collect();
        assert_eq!(seen, vec!["b", "c"]);
    }
}
