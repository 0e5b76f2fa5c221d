//! Interval intersection.

use prchurn_core::Interval;

/// Intersect two interval sequences with a two-pointer sweep.
///
/// Both inputs must be sorted ascending by start and internally
/// non-overlapping; [`coalesce`] produces such a sequence from anything.
/// The output is sorted and non-overlapping.
///
/// # Examples
///
/// ```
/// use prchurn_core::Interval;
/// use prchurn_gitpulse::overlap::intersect;
///
/// let a = [Interval::new(2, 2)];
/// let b = [Interval::new(1, 3)];
/// assert_eq!(intersect(&a, &b), vec![Interval::new(2, 2)]);
/// ```
pub fn intersect(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut i = 0;
    let mut j = 0;
    let mut overlap = Vec::new();

    while i < a.len() && j < b.len() {
        let (x, y) = (a[i], b[j]);

        if x.start() > y.end() {
            //     x---
            // y---
            j += 1;
        } else if x.end() < y.start() {
            // x---
            //     y---
            i += 1;
        } else if x.start() >= y.start() {
            if x.end() >= y.end() {
                //  x----
                // y---
                overlap.push(Interval::new(x.start(), y.end()));
                j += 1;
            } else {
                //  x--
                // y-----
                overlap.push(x);
                i += 1;
            }
        } else if x.end() <= y.end() {
            // x---
            //  y---
            overlap.push(Interval::new(y.start(), x.end()));
            i += 1;
        } else {
            // x-----
            //  y--
            overlap.push(y);
            j += 1;
        }
    }

    overlap
}

/// Sort intervals and merge any that overlap or touch.
///
/// # Examples
///
/// ```
/// use prchurn_core::Interval;
/// use prchurn_gitpulse::overlap::coalesce;
///
/// let merged = coalesce(&[Interval::new(5, 8), Interval::new(1, 3), Interval::new(2, 4)]);
/// assert_eq!(merged, vec![Interval::new(1, 8)]);
/// ```
pub fn coalesce(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for next in sorted {
        match merged.last_mut() {
            Some(last) if u64::from(next.start()) <= u64::from(last.end()) + 1 => {
                if next.end() > last.end() {
                    *last = Interval::new(last.start(), next.end());
                }
            }
            _ => merged.push(next),
        }
    }
    merged
}

/// Line positions covered by `intervals`, counting overlaps repeatedly.
pub fn total_lines(intervals: &[Interval]) -> u64 {
    intervals.iter().map(Interval::len).sum()
}
