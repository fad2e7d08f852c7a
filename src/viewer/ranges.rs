//! Bookkeeping of which message index ranges have already been fetched.

/// Half-open index interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LoadedSegment {
    pub start: usize,
    pub end: usize,
}

impl LoadedSegment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True if `[start, end)` shares at least one index with this segment.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && self.end > start
    }
}

/// A sorted set of disjoint, non-touching segments.
#[derive(Debug, Clone, Default)]
pub struct LoadedRanges {
    segments: Vec<LoadedSegment>,
}

impl LoadedRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `[start, end)` as loaded, merging it with any segment it
    /// overlaps or touches. Empty intervals are ignored.
    pub fn add_segment(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        self.segments.push(LoadedSegment { start, end });
        self.segments.sort_by_key(|s| s.start);

        let mut merged: Vec<LoadedSegment> = Vec::with_capacity(self.segments.len());
        let mut current = self.segments[0];
        for next in &self.segments[1..] {
            if next.start <= current.end {
                current.end = current.end.max(next.end);
            } else {
                merged.push(current);
                current = *next;
            }
        }
        merged.push(current);
        self.segments = merged;
    }

    /// True if any loaded segment overlaps `[start, end)`.
    pub fn is_range_loaded(&self, start: usize, end: usize) -> bool {
        self.segments.iter().any(|s| s.overlaps(start, end))
    }

    pub fn segments(&self) -> &[LoadedSegment] {
        &self.segments
    }

    /// Number of indices covered.
    pub fn loaded_count(&self) -> usize {
        self.segments.iter().map(LoadedSegment::len).sum()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Split `[0, total)` into `buckets` slices of `ceil(total / buckets)`
    /// indices and report which ones contain anything loaded.
    ///
    /// Trailing buckets past `total` are reported unloaded.
    pub fn coverage(&self, buckets: usize, total: usize) -> Vec<bool> {
        if buckets == 0 {
            return Vec::new();
        }
        if total == 0 {
            return vec![false; buckets];
        }
        let size = total.div_ceil(buckets);
        (0..buckets)
            .map(|b| {
                let start = b * size;
                let end = ((b + 1) * size).min(total);
                start < end && self.is_range_loaded(start, end)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(r: &LoadedRanges) -> Vec<(usize, usize)> {
        r.segments().iter().map(|s| (s.start, s.end)).collect()
    }

    #[test]
    fn test_adjacent_segments_merge() {
        let mut r = LoadedRanges::new();
        r.add_segment(0, 5);
        r.add_segment(5, 10);
        assert_eq!(spans(&r), vec![(0, 10)]);
    }

    #[test]
    fn test_insert_twice_is_idempotent() {
        let mut once = LoadedRanges::new();
        once.add_segment(3, 8);
        let mut twice = once.clone();
        twice.add_segment(3, 8);
        assert_eq!(spans(&once), spans(&twice));
    }

    #[test]
    fn test_out_of_order_and_bridging() {
        let mut r = LoadedRanges::new();
        r.add_segment(20, 30);
        r.add_segment(0, 5);
        r.add_segment(40, 50);
        assert_eq!(spans(&r), vec![(0, 5), (20, 30), (40, 50)]);
        r.add_segment(4, 45);
        assert_eq!(spans(&r), vec![(0, 50)]);
        assert_eq!(r.loaded_count(), 50);
    }

    #[test]
    fn test_empty_interval_ignored() {
        let mut r = LoadedRanges::new();
        r.add_segment(5, 5);
        r.add_segment(9, 2);
        assert!(r.segments().is_empty());
    }

    #[test]
    fn test_is_range_loaded_uses_overlap() {
        let mut r = LoadedRanges::new();
        r.add_segment(10, 20);
        assert!(r.is_range_loaded(15, 25));
        assert!(r.is_range_loaded(0, 11));
        assert!(!r.is_range_loaded(20, 30));
        assert!(!r.is_range_loaded(0, 10));
    }

    #[test]
    fn test_coverage_buckets() {
        let mut r = LoadedRanges::new();
        r.add_segment(0, 10);
        r.add_segment(95, 100);
        let bar = r.coverage(10, 100);
        assert_eq!(
            bar,
            vec![true, false, false, false, false, false, false, false, false, true]
        );
        assert_eq!(r.coverage(4, 0), vec![false; 4]);
        assert!(r.coverage(0, 100).is_empty());
        // More buckets than records: the tail is empty.
        assert_eq!(r.coverage(5, 3), vec![true, true, true, false, false]);
    }
}
