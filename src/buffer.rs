//! Per-scope storage for failed checks.

use crate::record::FailureRecord;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Ordered store of pending [`FailureRecord`]s for one test unit.
///
/// A buffer belongs to exactly one wrapper invocation. Helper threads of that
/// unit may append to it; concurrent test units each get their own.
#[derive(Debug, Default)]
pub struct AssumptionBuffer {
    records: Mutex<Vec<FailureRecord>>,
}

impl AssumptionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record after every record already held.
    pub fn append(&self, record: FailureRecord) {
        self.lock().push(record);
    }

    /// Take every held record in insertion order, leaving the buffer empty.
    pub fn drain(&self) -> Vec<FailureRecord> {
        mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Poisoning is ignored: a push either completed or never happened.
    fn lock(&self) -> MutexGuard<'_, Vec<FailureRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordLocation;

    fn record(line: u32) -> FailureRecord {
        FailureRecord::new(RecordLocation::new("src/lib.rs", line), format!("check {}", line))
    }

    #[test]
    fn test_drain_preserves_insertion_order() {
        let buffer = AssumptionBuffer::new();
        buffer.append(record(3));
        buffer.append(record(1));
        buffer.append(record(2));

        let lines: Vec<u32> = buffer.drain().iter().map(|r| r.location().line).collect();
        assert_eq!(lines, vec![3, 1, 2]);
    }

    #[test]
    fn test_drain_twice_is_empty() {
        let buffer = AssumptionBuffer::new();
        buffer.append(record(1));

        assert_eq!(buffer.drain().len(), 1);
        assert!(buffer.drain().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_empty_buffer() {
        let buffer = AssumptionBuffer::new();
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn test_append_from_scoped_threads() {
        let buffer = AssumptionBuffer::new();
        std::thread::scope(|scope| {
            for line in 1..=4 {
                let buffer = &buffer;
                scope.spawn(move || buffer.append(record(line)));
            }
        });

        let mut lines: Vec<u32> = buffer.drain().iter().map(|r| r.location().line).collect();
        lines.sort_unstable();
        assert_eq!(lines, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_append_after_drain() {
        let buffer = AssumptionBuffer::new();
        buffer.append(record(1));
        buffer.drain();
        buffer.append(record(7));

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.drain()[0].context(), "check 7");
    }
}
