//! A set of 32-bit integers represented as a sorted list of disjoint,
//! non-adjacent inclusive ranges, optionally negated (complemented against
//! the `[0, u32::MAX]` universe). This is the alphabet representation used
//! by every IntFA edge.

use std::fmt;

/// An inclusive range `[lo, hi]`.
pub type Range = (u32, u32);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct IntSet {
  /// Sorted, pairwise-disjoint, non-adjacent ranges.
  ranges: Vec<Range>,
  negated: bool,
}

impl IntSet {
  pub fn empty() -> Self {
    Self { ranges: Vec::new(), negated: false }
  }

  pub fn universe() -> Self {
    Self { ranges: Vec::new(), negated: true }
  }

  pub fn from_range(lo: u32, hi: u32) -> Self {
    assert!(lo <= hi, "empty range passed to IntSet::from_range");
    Self { ranges: vec![(lo, hi)], negated: false }
  }

  pub fn single(value: u32) -> Self {
    Self::from_range(value, value)
  }

  /// Builds a normalized set from a collection of (possibly overlapping or
  /// adjacent) ranges.
  pub fn from_ranges(ranges: impl IntoIterator<Item = Range>) -> Self {
    let mut ranges: Vec<Range> = ranges.into_iter().collect();
    normalize(&mut ranges);
    Self { ranges, negated: false }
  }

  pub fn is_negated(&self) -> bool {
    self.negated
  }

  pub fn is_empty(&self) -> bool {
    !self.negated && self.ranges.is_empty()
  }

  /// The ranges actually covered by this set, resolving negation against
  /// the `[0, u32::MAX]` universe on demand.
  pub fn materialize(&self) -> Vec<Range> {
    if !self.negated {
      return self.ranges.clone();
    }
    let mut out = Vec::new();
    let mut cursor: u64 = 0;
    for &(lo, hi) in &self.ranges {
      if (lo as u64) > cursor {
        out.push((cursor as u32, lo - 1));
      }
      cursor = hi as u64 + 1;
    }
    if cursor <= u32::MAX as u64 {
      out.push((cursor as u32, u32::MAX));
    }
    out
  }

  pub fn contains(&self, value: u32) -> bool {
    let hit = self.ranges.binary_search_by(|&(lo, hi)| {
      if value < lo {
        std::cmp::Ordering::Greater
      } else if value > hi {
        std::cmp::Ordering::Less
      } else {
        std::cmp::Ordering::Equal
      }
    });
    hit.is_ok() != self.negated
  }

  /// Returns the union of `self` and `other`. Negation is resolved by
  /// materializing both sides first; the result is always non-negated.
  pub fn union(&self, other: &IntSet) -> IntSet {
    let mut ranges = self.materialize();
    ranges.extend(other.materialize());
    IntSet::from_ranges(ranges)
  }

  /// Toggles negation without touching the underlying ranges — the
  /// complement is materialized lazily by callers of [`Self::contains`] /
  /// [`Self::materialize`].
  pub fn invert(&self) -> IntSet {
    Self { ranges: self.ranges.clone(), negated: !self.negated }
  }

  /// Returns an arbitrary element of the set, used by GLA path extension
  /// and Hopcroft's worklist to pick a representative symbol for a block.
  pub fn sample_element(&self) -> Option<u32> {
    if !self.negated {
      self.ranges.first().map(|&(lo, _)| lo)
    } else {
      // First value not covered by any of our excluded ranges.
      let mut candidate = 0u32;
      for &(lo, hi) in &self.ranges {
        if candidate < lo {
          return Some(candidate);
        }
        if hi == u32::MAX {
          return None;
        }
        candidate = hi + 1;
      }
      Some(candidate)
    }
  }

  pub fn ranges(&self) -> &[Range] {
    &self.ranges
  }
}

impl fmt::Display for IntSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.negated {
      f.write_str("^")?;
    }
    let parts: Vec<String> =
      self.ranges.iter().map(|&(lo, hi)| if lo == hi { format!("{lo}") } else { format!("{lo}-{hi}") }).collect();
    write!(f, "[{}]", parts.join(","))
  }
}

fn normalize(ranges: &mut Vec<Range>) {
  ranges.retain(|&(lo, hi)| lo <= hi);
  ranges.sort_unstable();
  let mut merged: Vec<Range> = Vec::with_capacity(ranges.len());
  for &(lo, hi) in ranges.iter() {
    if let Some(last) = merged.last_mut() {
      // Adjacent or overlapping: hi+1 == lo would panic on overflow at
      // u32::MAX, so compare via u64.
      if (lo as u64) <= (last.1 as u64) + 1 {
        last.1 = last.1.max(hi);
        continue;
      }
    }
    merged.push((lo, hi));
  }
  *ranges = merged;
}

/// Partitions the integer space into classes such that every returned
/// `IntSet` is either wholly contained in, or wholly disjoint from, every
/// set in `sets`. Classes with empty membership (not covered by any input
/// set) are omitted, since no caller needs an explicit "none of the above"
/// alphabet class.
pub fn equivalence_classes(sets: &[IntSet]) -> Vec<IntSet> {
  if sets.is_empty() {
    return Vec::new();
  }

  let materialized: Vec<Vec<Range>> = sets.iter().map(|s| s.materialize()).collect();

  let mut cuts: Vec<u64> = Vec::new();
  for ranges in &materialized {
    for &(lo, hi) in ranges {
      cuts.push(lo as u64);
      cuts.push(hi as u64 + 1);
    }
  }
  cuts.sort_unstable();
  cuts.dedup();

  let contains_at = |set_ranges: &[Range], point: u64| -> bool {
    if point > u32::MAX as u64 {
      return false;
    }
    let point = point as u32;
    set_ranges.binary_search_by(|&(lo, hi)| {
      if point < lo {
        std::cmp::Ordering::Greater
      } else if point > hi {
        std::cmp::Ordering::Less
      } else {
        std::cmp::Ordering::Equal
      }
    }).is_ok()
  };

  let mut classes: Vec<IntSet> = Vec::new();
  let mut run_start: Option<u64> = None;
  let mut run_end: u64 = 0;
  let mut run_membership: Vec<bool> = Vec::new();

  for window in cuts.windows(2) {
    let (start, end) = (window[0], window[1]);
    if start >= end {
      continue;
    }
    let membership: Vec<bool> = materialized.iter().map(|r| contains_at(r, start)).collect();
    let any = membership.iter().any(|b| *b);

    let continues_run = run_start.is_some() && membership == run_membership && run_end == start;

    if !any {
      if let Some(s) = run_start.take() {
        classes.push(IntSet::from_range(s as u32, (run_end - 1).min(u32::MAX as u64) as u32));
      }
      run_membership.clear();
      continue;
    }

    if continues_run {
      run_end = end;
    } else {
      if let Some(s) = run_start.take() {
        classes.push(IntSet::from_range(s as u32, (run_end - 1).min(u32::MAX as u64) as u32));
      }
      run_start = Some(start);
      run_end = end;
      run_membership = membership;
    }
  }
  if let Some(s) = run_start.take() {
    classes.push(IntSet::from_range(s as u32, (run_end - 1).min(u32::MAX as u64) as u32));
  }

  classes
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invert_round_trips_membership() {
    let s = IntSet::from_ranges([(5, 10), (20, 25)]);
    let inv = s.invert();
    for i in 0..40 {
      assert_eq!(inv.contains(i), !s.contains(i));
      assert_eq!(inv.invert().contains(i), s.contains(i));
    }
  }

  #[test]
  fn normalize_merges_overlap_and_adjacency() {
    let s = IntSet::from_ranges([(1, 3), (4, 6), (10, 12), (11, 20)]);
    assert_eq!(s.ranges(), &[(1, 6), (10, 20)]);
  }

  #[test]
  fn equivalence_classes_are_contained_or_disjoint() {
    let a = IntSet::from_ranges([(0, 10)]);
    let b = IntSet::from_ranges([(5, 15)]);
    let c = IntSet::from_ranges([(20, 30)]);
    let classes = equivalence_classes(&[a.clone(), b.clone(), c.clone()]);
    for class in &classes {
      for original in [&a, &b, &c] {
        let class_ranges = class.materialize();
        let orig_ranges = original.materialize();
        let contained = class_ranges.iter().all(|&(lo, hi)| (lo..=hi).all(|v| original.contains(v)));
        let disjoint = class_ranges.iter().all(|&(lo, hi)| (lo..=hi).all(|v| !original.contains(v)));
        assert!(contained || disjoint, "class {class} neither contained in nor disjoint from {orig_ranges:?}");
      }
    }
  }
}
