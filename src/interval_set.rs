//! Closed integer intervals and a sorted, merged set of them. `BitSet` and
//! `IntervalSet` are named in SPEC_FULL.md sec 1 as building blocks taken as
//! given elsewhere; `IntervalSet` is small enough that, like the teacher's
//! own `interval_set` module, it is easiest to carry in-crate rather than
//! reach for an external interval-tree crate for a handful of operations.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval {
    pub a: isize,
    pub b: isize,
}

/// Sentinel for "no interval" (mirrors the teacher's `interval_set::INVALID`).
pub const INVALID: Interval = Interval { a: -1, b: -2 };

impl Interval {
    pub fn new(a: isize, b: isize) -> Self {
        Interval { a, b }
    }

    pub fn len(&self) -> isize {
        if self.b < self.a {
            0
        } else {
            self.b - self.a + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.b < self.a
    }

    pub fn contains(&self, x: isize) -> bool {
        x >= self.a && x <= self.b
    }

    fn adjacent_or_overlapping(&self, other: &Interval) -> bool {
        self.a <= other.b + 1 && other.a <= self.b + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        IntervalSet { intervals: Vec::new() }
    }

    pub fn of(a: isize, b: isize) -> Self {
        let mut s = IntervalSet::new();
        s.add_range(a, b);
        s
    }

    pub fn of_single(v: isize) -> Self {
        IntervalSet::of(v, v)
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Insert `[a, b]`, merging with adjacent/overlapping existing intervals
    /// and keeping the vector sorted -- the same running-merge strategy a
    /// grammar-compiled `IntervalSet.add` uses.
    pub fn add_range(&mut self, a: isize, b: isize) {
        if b < a {
            return;
        }
        let new = Interval::new(a, b);
        let pos = self.intervals.partition_point(|iv| iv.b + 1 < new.a);
        let mut merged = new;
        let mut end = pos;
        while end < self.intervals.len() && self.intervals[end].adjacent_or_overlapping(&merged) {
            merged.a = merged.a.min(self.intervals[end].a);
            merged.b = merged.b.max(self.intervals[end].b);
            end += 1;
        }
        self.intervals.splice(pos..end, std::iter::once(merged));
    }

    pub fn add_single(&mut self, v: isize) {
        self.add_range(v, v);
    }

    pub fn add_set(&mut self, other: &IntervalSet) {
        for iv in &other.intervals {
            self.add_range(iv.a, iv.b);
        }
    }

    pub fn contains(&self, v: isize) -> bool {
        self.intervals
            .binary_search_by(|iv| {
                if v < iv.a {
                    std::cmp::Ordering::Greater
                } else if v > iv.b {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn complement(&self, min: isize, max: isize) -> IntervalSet {
        let mut compl = IntervalSet::new();
        let mut cursor = min;
        for iv in &self.intervals {
            if iv.a > cursor {
                compl.add_range(cursor, iv.a - 1);
            }
            cursor = iv.b + 1;
        }
        if cursor <= max {
            compl.add_range(cursor, max);
        }
        compl
    }

    pub fn or(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = self.clone();
        result.add_set(other);
        result
    }

    pub fn size(&self) -> isize {
        self.intervals.iter().map(Interval::len).sum()
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }
        let parts: Vec<String> = self
            .intervals
            .iter()
            .map(|iv| if iv.a == iv.b { iv.a.to_string() } else { format!("{}..{}", iv.a, iv.b) })
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_adjacent_and_overlapping_ranges() {
        let mut s = IntervalSet::new();
        s.add_range(1, 3);
        s.add_range(5, 7);
        s.add_range(4, 4);
        assert_eq!(s.intervals(), &[Interval::new(1, 7)]);
    }

    #[test]
    fn complement_fills_gaps() {
        let mut s = IntervalSet::new();
        s.add_range(2, 4);
        s.add_range(8, 9);
        let c = s.complement(0, 10);
        assert_eq!(c.intervals(), &[Interval::new(0, 1), Interval::new(5, 7), Interval::new(10, 10)]);
    }
}
