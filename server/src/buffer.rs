//! Fixed-capacity ring queue with drop-oldest overflow.
//!
//! Under sustained overload the newest item always wins a slot: pushing into
//! a full buffer evicts the oldest element instead of refusing the new one.

use std::num::NonZeroUsize;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("buffer is empty")]
    Empty,
    #[error("index {index} out of range for buffer of length {len}")]
    OutOfRange { index: usize, len: usize },
}

/// Circular FIFO sized once at construction.
///
/// Logical index `i` lives in slot `(start + i) % capacity`. Only the element
/// entering or leaving is ever moved.
#[derive(Debug)]
pub struct Buffer<T> {
    slots: Vec<Option<T>>,
    start: usize,
    len: usize,
}

impl<T> Buffer<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let mut slots = Vec::with_capacity(capacity.get());
        slots.resize_with(capacity.get(), || None);
        Self {
            slots,
            start: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Appends `item`, overwriting the oldest element when full.
    ///
    /// Returns the evicted element, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            let oldest = self.slots[self.start].take();
            self.advance();
            self.len -= 1;
            oldest
        } else {
            None
        };

        let slot = self.slot(self.len);
        self.slots[slot] = Some(item);
        self.len += 1;
        evicted
    }

    /// Removes and returns the oldest element.
    pub fn pop(&mut self) -> Result<T, BufferError> {
        if self.len == 0 {
            return Err(BufferError::Empty);
        }

        let item = self.slots[self.start].take().ok_or(BufferError::Empty)?;
        self.advance();
        self.len -= 1;
        Ok(item)
    }

    /// Element at logical position `index`, oldest first.
    pub fn get(&self, index: usize) -> Result<&T, BufferError> {
        if index >= self.len {
            return Err(BufferError::OutOfRange {
                index,
                len: self.len,
            });
        }
        self.slots[self.slot(index)]
            .as_ref()
            .ok_or(BufferError::OutOfRange {
                index,
                len: self.len,
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |i| self.slots[self.slot(i)].as_ref())
    }

    fn slot(&self, index: usize) -> usize {
        (self.start + index) % self.capacity()
    }

    fn advance(&mut self) {
        self.start = (self.start + 1) % self.capacity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(capacity: usize) -> Buffer<i32> {
        Buffer::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_buffer_creation() {
        let buffer = buffer(4);
        assert_eq!(buffer.size(), 0);
        assert_eq!(buffer.capacity(), 4);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
    }

    #[test]
    fn test_push_and_pop_in_order() {
        let mut buffer = buffer(4);
        buffer.push(42);
        buffer.push(1);
        assert_eq!(buffer.size(), 2);

        assert_eq!(buffer.pop(), Ok(42));
        assert_eq!(buffer.size(), 1);
        assert_eq!(buffer.pop(), Ok(1));
        assert_eq!(buffer.size(), 0);
    }

    #[test]
    fn test_pop_after_single_push() {
        let mut buffer = buffer(1);
        assert_eq!(buffer.push(7), None);
        assert_eq!(buffer.pop(), Ok(7));
    }

    #[test]
    fn test_pop_on_empty_fails() {
        let mut buffer = buffer(4);
        assert_eq!(buffer.pop(), Err(BufferError::Empty));

        buffer.push(0);
        buffer.pop().unwrap();
        assert_eq!(buffer.pop(), Err(BufferError::Empty));
    }

    #[test]
    fn test_overflow_keeps_newest() {
        let mut buffer = buffer(4);
        for i in 0..4 {
            assert_eq!(buffer.push(i), None);
        }
        assert_eq!(buffer.push(4), Some(0));
        assert_eq!(buffer.push(5), Some(1));

        assert_eq!(buffer.size(), 4);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
        assert_eq!(buffer.pop(), Ok(2));
    }

    #[test]
    fn test_get_bounds() {
        let mut buffer = buffer(4);
        for index in 0..5 {
            assert!(buffer.get(index).is_err());
        }

        buffer.push(10);
        assert_eq!(buffer.get(0), Ok(&10));
        assert_eq!(
            buffer.get(1),
            Err(BufferError::OutOfRange { index: 1, len: 1 })
        );

        for i in 11..15 {
            buffer.push(i);
        }
        assert_eq!(buffer.get(0), Ok(&11));
        assert_eq!(buffer.get(3), Ok(&14));
        assert!(buffer.get(4).is_err());
    }

    #[test]
    fn test_wraps_around_repeatedly() {
        let mut buffer = buffer(3);
        for round in 0..10 {
            buffer.push(round * 2);
            buffer.push(round * 2 + 1);
            assert_eq!(buffer.pop(), Ok(round * 2));
            assert_eq!(buffer.pop(), Ok(round * 2 + 1));
            assert!(buffer.is_empty());
        }
    }

    #[test]
    fn test_matches_bounded_deque_model() {
        use rand::Rng;
        use std::collections::VecDeque;

        let mut rng = rand::thread_rng();
        for capacity in [1, 2, 7, 64] {
            let mut buffer = buffer(capacity);
            let mut model = VecDeque::new();

            for step in 0..5_000 {
                if rng.gen_bool(0.6) {
                    let evicted = buffer.push(step);
                    model.push_back(step);
                    let expected = if model.len() > capacity {
                        model.pop_front()
                    } else {
                        None
                    };
                    assert_eq!(evicted, expected);
                } else {
                    assert_eq!(buffer.pop().ok(), model.pop_front());
                }

                assert_eq!(buffer.size(), model.len());
                assert_eq!(buffer.is_full(), model.len() == capacity);
                if !model.is_empty() {
                    let index = rng.gen_range(0..model.len());
                    assert_eq!(buffer.get(index), Ok(&model[index]));
                }
            }

            assert!(buffer.iter().eq(model.iter()));
        }
    }
}
