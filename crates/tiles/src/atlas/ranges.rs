use std::ops::Range;

/// First fit allocation of element ranges inside a fixed capacity buffer.
#[derive(Clone, Debug)]
pub(crate) struct RangeAllocator {
    capacity: u32,
    /// Sorted, non adjacent free ranges.
    free: Vec<Range<u32>>,
}

impl RangeAllocator {
    pub(crate) fn new(capacity: u32) -> Self {
        Self {
            capacity,
            free: if capacity > 0 { vec![0..capacity] } else { Vec::new() },
        }
    }

    /// An allocator whose first `reserved` elements are already taken.
    pub(crate) fn with_reserved(capacity: u32, reserved: u32) -> (Self, Range<u32>) {
        let reserved = reserved.min(capacity);
        let allocator = Self {
            capacity,
            free: if reserved < capacity { vec![reserved..capacity] } else { Vec::new() },
        };

        (allocator, 0..reserved)
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.capacity == 0 || self.free == [0..self.capacity]
    }

    pub(crate) fn allocate(&mut self, len: u32) -> Option<Range<u32>> {
        if len == 0 {
            return Some(0..0);
        }

        let position = self.free.iter().position(|range| range.len() as u32 >= len)?;
        let range = &mut self.free[position];
        let allocated = range.start..range.start + len;

        range.start += len;
        if range.is_empty() {
            self.free.remove(position);
        }

        Some(allocated)
    }

    pub(crate) fn free(&mut self, range: Range<u32>) {
        if range.is_empty() {
            return;
        }

        let position = self.free.partition_point(|free| free.start < range.start);
        self.free.insert(position, range);

        // merge with the following and then the preceding range
        if position + 1 < self.free.len() && self.free[position].end == self.free[position + 1].start {
            let next = self.free.remove(position + 1);
            self.free[position].end = next.end;
        }
        if position > 0 && self.free[position - 1].end == self.free[position].start {
            let current = self.free.remove(position);
            self.free[position - 1].end = current.end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit_reuses_freed_ranges() {
        let mut allocator = RangeAllocator::new(10);

        let a = allocator.allocate(4).unwrap();
        let b = allocator.allocate(4).unwrap();
        assert_eq!(a, 0..4);
        assert_eq!(b, 4..8);
        assert!(allocator.allocate(3).is_none());

        allocator.free(a);
        assert_eq!(allocator.allocate(3).unwrap(), 0..3);
    }

    #[test]
    fn freeing_everything_merges_back() {
        let mut allocator = RangeAllocator::new(12);
        let ranges: Vec<_> = (0..4).map(|_| allocator.allocate(3).unwrap()).collect();
        assert!(!allocator.is_empty());

        for range in [1, 3, 0, 2].map(|i| ranges[i].clone()) {
            allocator.free(range);
        }

        assert!(allocator.is_empty());
        assert_eq!(allocator.allocate(12).unwrap(), 0..12);
    }
}
