//! # Position Mapping
//!
//! Every step produces a [`StepMap`] describing which ranges of the old
//! document it replaced and how large the replacements are. A [`Mapping`]
//! chains step maps so positions can be carried across many steps.
//!
//! ## Bias
//!
//! `assoc` decides where a position ends up when content is inserted right
//! at it, or when it sits on the edge of a deleted range. A negative value
//! keeps it with the content before, a positive value with the content after.
//!
//! ## Mirrors
//!
//! When a mapping contains a step and later its inverse (as happens when
//! unconfirmed steps are undone, remote steps applied, and the local steps
//! mapped back on top), the pair can be marked as mirrors. A position deleted
//! by the first and restored by the second then maps back to its original
//! offset instead of collapsing onto the deletion boundary.

use serde::{Deserialize, Serialize};

const LOWER16: usize = 0xffff;
const FACTOR16: usize = 1 << 16;

fn make_recover(index: usize, offset: usize) -> usize {
    index + offset * FACTOR16
}

fn recover_index(value: usize) -> usize {
    value & LOWER16
}

fn recover_offset(value: usize) -> usize {
    value / FACTOR16
}

/// The outcome of mapping a single position, with deletion information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    del_before: bool,
    del_after: bool,
    del_across: bool,
    del_side: bool,
    pub(crate) recover: Option<usize>,
}

impl MapResult {
    fn unchanged(pos: usize) -> Self {
        MapResult {
            pos,
            del_before: false,
            del_after: false,
            del_across: false,
            del_side: false,
            recover: None,
        }
    }

    /// The content on the side the position is associated with was deleted.
    pub fn deleted(&self) -> bool {
        self.del_side
    }

    /// The token before the position was deleted.
    pub fn deleted_before(&self) -> bool {
        self.del_before || self.del_across
    }

    /// The token after the position was deleted.
    pub fn deleted_after(&self) -> bool {
        self.del_after || self.del_across
    }

    /// The position lies strictly inside a deleted range.
    pub fn deleted_across(&self) -> bool {
        self.del_across
    }

    fn merge_deletions(&mut self, other: &MapResult) {
        self.del_before |= other.del_before;
        self.del_after |= other.del_after;
        self.del_across |= other.del_across;
        self.del_side |= other.del_side;
    }
}

/// Anything positions can be mapped through.
pub trait Mappable {
    fn map(&self, pos: usize, assoc: i32) -> usize;
    fn map_result(&self, pos: usize, assoc: i32) -> MapResult;
}

/// A replaced range: `start` in old coordinates, the old size and the new size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRange {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

/// The position map of one step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepMap {
    ranges: Vec<MapRange>,
    inverted: bool,
}

impl StepMap {
    pub fn new(ranges: Vec<MapRange>) -> Self {
        StepMap {
            ranges,
            inverted: false,
        }
    }

    /// A map for a single replaced range. Ranges that change nothing are dropped.
    pub fn single(start: usize, old_size: usize, new_size: usize) -> Self {
        if old_size == 0 && new_size == 0 {
            return StepMap::empty();
        }
        StepMap::new(vec![MapRange {
            start,
            old_size,
            new_size,
        }])
    }

    pub fn empty() -> Self {
        StepMap::default()
    }

    /// A map that shifts every position by `n`.
    pub fn offset(n: isize) -> Self {
        if n == 0 {
            StepMap::empty()
        } else if n < 0 {
            StepMap::single(0, n.unsigned_abs(), 0)
        } else {
            StepMap::single(0, 0, n as usize)
        }
    }

    pub fn ranges(&self) -> &[MapRange] {
        &self.ranges
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    fn sizes(&self, range: &MapRange) -> (usize, usize) {
        if self.inverted {
            (range.new_size, range.old_size)
        } else {
            (range.old_size, range.new_size)
        }
    }

    /// The map that undoes this one.
    pub fn invert(&self) -> StepMap {
        StepMap {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }

    /// Recover a position deleted by this map from its recovery value.
    pub(crate) fn recover(&self, value: usize) -> usize {
        let index = recover_index(value);
        let mut diff: isize = 0;
        if !self.inverted {
            for range in &self.ranges[..index] {
                diff += range.new_size as isize - range.old_size as isize;
            }
        }
        (self.ranges[index].start as isize + diff) as usize + recover_offset(value)
    }

    fn map_inner(&self, pos: usize, assoc: i32) -> MapResult {
        let mut diff: isize = 0;
        for (i, range) in self.ranges.iter().enumerate() {
            let start = if self.inverted {
                (range.start as isize - diff) as usize
            } else {
                range.start
            };
            if start > pos {
                break;
            }
            let (old_size, new_size) = self.sizes(range);
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let base = (start as isize + diff) as usize;
                let result = if side < 0 { base } else { base + new_size };
                let sticks_to = if assoc < 0 { start } else { end };
                let recover = if pos == sticks_to {
                    None
                } else {
                    Some(make_recover(i, pos - start))
                };
                return MapResult {
                    pos: result,
                    del_after: pos == start && old_size > 0,
                    del_before: pos == end && pos != start,
                    del_across: pos != start && pos != end,
                    del_side: if assoc < 0 { pos != start } else { pos != end },
                    recover,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult::unchanged((pos as isize + diff) as usize)
    }

    /// Whether the range identified by `recover` touches `pos`.
    pub fn touches(&self, pos: usize, recover: usize) -> bool {
        let index = recover_index(recover);
        let mut diff: isize = 0;
        for (i, range) in self.ranges.iter().enumerate() {
            let start = if self.inverted {
                (range.start as isize - diff) as usize
            } else {
                range.start
            };
            if start > pos {
                break;
            }
            let (old_size, new_size) = self.sizes(range);
            if pos <= start + old_size && i == index {
                return true;
            }
            diff += new_size as isize - old_size as isize;
        }
        false
    }

    /// Call `f(old_start, old_end, new_start, new_end)` for each changed range.
    pub fn for_each<F: FnMut(usize, usize, usize, usize)>(&self, mut f: F) {
        let mut diff: isize = 0;
        for range in &self.ranges {
            let (old_size, new_size) = self.sizes(range);
            let old_start = if self.inverted {
                (range.start as isize - diff) as usize
            } else {
                range.start
            };
            let new_start = if self.inverted {
                range.start
            } else {
                (range.start as isize + diff) as usize
            };
            f(old_start, old_start + old_size, new_start, new_start + new_size);
            diff += new_size as isize - old_size as isize;
        }
    }
}

impl Mappable for StepMap {
    fn map(&self, pos: usize, assoc: i32) -> usize {
        self.map_inner(pos, assoc).pos
    }

    fn map_result(&self, pos: usize, assoc: i32) -> MapResult {
        self.map_inner(pos, assoc)
    }
}

/// A pipeline of step maps, optionally with mirror pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
    mirror: Vec<(usize, usize)>,
    from: usize,
    to: usize,
}

impl Mapping {
    pub fn new() -> Self {
        Mapping::default()
    }

    pub fn from_maps(maps: Vec<StepMap>) -> Self {
        let to = maps.len();
        Mapping {
            maps,
            mirror: Vec::new(),
            from: 0,
            to,
        }
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// A mapping over the maps in `from..to` only.
    pub fn slice(&self, from: usize, to: usize) -> Mapping {
        Mapping {
            maps: self.maps.clone(),
            mirror: self.mirror.clone(),
            from,
            to: to.min(self.maps.len()),
        }
    }

    /// A mapping over the maps from `from` to the end.
    pub fn slice_from(&self, from: usize) -> Mapping {
        self.slice(from, self.maps.len())
    }

    /// Append a map. When `mirrors` is given, the new map is recorded as the
    /// mirror image of the map at that index.
    pub fn append_map(&mut self, map: StepMap, mirrors: Option<usize>) {
        self.maps.push(map);
        self.to = self.maps.len();
        if let Some(m) = mirrors {
            self.set_mirror(self.maps.len() - 1, m);
        }
    }

    /// Append every map of `other`, keeping its mirror pairs.
    pub fn append_mapping(&mut self, other: &Mapping) {
        let start_size = self.maps.len();
        for (i, map) in other.maps.iter().enumerate() {
            let mirror = other.get_mirror(i).filter(|&m| m < i).map(|m| start_size + m);
            self.append_map(map.clone(), mirror);
        }
    }

    /// Append the inverse of every map of `other`, last first.
    pub fn append_mapping_inverted(&mut self, other: &Mapping) {
        let total = self.maps.len() + other.maps.len();
        for i in (0..other.maps.len()).rev() {
            let mirror = other.get_mirror(i).filter(|&m| m > i).map(|m| total - m - 1);
            self.append_map(other.maps[i].invert(), mirror);
        }
    }

    /// Drop the first `n` maps. Mirror pairs involving a dropped map are
    /// discarded.
    pub fn drop_front(&mut self, n: usize) {
        let n = n.min(self.maps.len());
        self.maps.drain(..n);
        self.mirror = self
            .mirror
            .iter()
            .filter(|&&(a, b)| a >= n && b >= n)
            .map(|&(a, b)| (a - n, b - n))
            .collect();
        self.from = self.from.saturating_sub(n);
        self.to = self.to.saturating_sub(n);
    }

    pub fn invert(&self) -> Mapping {
        let mut inverse = Mapping::new();
        inverse.append_mapping_inverted(self);
        inverse
    }

    /// The index of the map mirroring map `n`, if any.
    pub fn get_mirror(&self, n: usize) -> Option<usize> {
        self.mirror.iter().find_map(|&(a, b)| {
            if a == n {
                Some(b)
            } else if b == n {
                Some(a)
            } else {
                None
            }
        })
    }

    pub fn set_mirror(&mut self, n: usize, m: usize) {
        self.mirror.push((n, m));
    }

    fn map_inner(&self, mut pos: usize, assoc: i32) -> MapResult {
        let mut acc = MapResult::unchanged(pos);
        let mut i = self.from;
        while i < self.to {
            let result = self.maps[i].map_result(pos, assoc);
            if let Some(recover) = result.recover {
                if let Some(corr) = self.get_mirror(i) {
                    if corr > i && corr < self.to {
                        pos = self.maps[corr].recover(recover);
                        i = corr + 1;
                        continue;
                    }
                }
            }
            acc.merge_deletions(&result);
            pos = result.pos;
            i += 1;
        }
        acc.pos = pos;
        acc.recover = None;
        acc
    }
}

impl Mappable for Mapping {
    fn map(&self, pos: usize, assoc: i32) -> usize {
        self.map_inner(pos, assoc).pos
    }

    fn map_result(&self, pos: usize, assoc: i32) -> MapResult {
        self.map_inner(pos, assoc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_bias() {
        let map = StepMap::single(2, 0, 3);
        assert_eq!(map.map(1, 1), 1);
        assert_eq!(map.map(2, -1), 2);
        assert_eq!(map.map(2, 1), 5);
        assert_eq!(map.map(4, 1), 7);
    }

    #[test]
    fn test_deletion_reports() {
        let map = StepMap::single(2, 4, 0);
        let inside = map.map_result(4, 1);
        assert_eq!(inside.pos, 2);
        assert!(inside.deleted() && inside.deleted_across());

        let at_start = map.map_result(2, 1);
        assert_eq!(at_start.pos, 2);
        assert!(at_start.deleted_after() && !at_start.deleted_across());
        assert!(at_start.deleted());
        assert!(!map.map_result(2, -1).deleted());

        let at_end = map.map_result(6, -1);
        assert_eq!(at_end.pos, 2);
        assert!(at_end.deleted_before());
        assert_eq!(map.map(8, 1), 4);
    }

    #[test]
    fn test_inverted_map_restores_outside_positions() {
        let map = StepMap::new(vec![
            MapRange { start: 2, old_size: 4, new_size: 1 },
            MapRange { start: 10, old_size: 0, new_size: 2 },
        ]);
        let inverse = map.invert();
        for pos in [0, 1, 2, 6, 7, 9, 10, 14] {
            assert_eq!(inverse.map(map.map(pos, -1), -1), pos, "pos {}", pos);
        }
    }

    #[test]
    fn test_for_each_ranges() {
        let map = StepMap::new(vec![
            MapRange { start: 1, old_size: 2, new_size: 0 },
            MapRange { start: 5, old_size: 1, new_size: 3 },
        ]);
        let mut seen = Vec::new();
        map.for_each(|a, b, c, d| seen.push((a, b, c, d)));
        assert_eq!(seen, vec![(1, 3, 1, 1), (5, 6, 3, 6)]);

        let mut seen = Vec::new();
        map.invert().for_each(|a, b, c, d| seen.push((a, b, c, d)));
        assert_eq!(seen, vec![(1, 1, 1, 3), (3, 6, 5, 6)]);
    }

    #[test]
    fn test_mapping_composes() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::single(0, 0, 2), None);
        mapping.append_map(StepMap::single(5, 3, 0), None);
        assert_eq!(mapping.map(1, 1), 3);
        assert_eq!(mapping.map(4, 1), 5);
        assert_eq!(mapping.map(10, 1), 9);
        assert_eq!(mapping.invert().map(9, 1), 10);
    }

    #[test]
    fn test_mirror_recovers_deleted_position() {
        let del = StepMap::single(2, 4, 0);
        let mut mapping = Mapping::new();
        mapping.append_map(del.clone(), None);
        mapping.append_map(StepMap::single(0, 0, 1), None);
        mapping.append_map(del.invert(), None);
        // Without the mirror the position collapses onto the deletion.
        assert_eq!(mapping.map(4, 1), 7);

        let mut mirrored = Mapping::new();
        mirrored.append_map(del.clone(), None);
        mirrored.append_map(del.invert(), Some(0));
        assert_eq!(mirrored.map(4, 1), 4);
        assert_eq!(mirrored.map(3, -1), 3);
    }

    #[test]
    fn test_drop_front_keeps_later_mirrors() {
        let del = StepMap::single(2, 4, 0);
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::single(0, 0, 1), None);
        mapping.append_map(del.clone(), None);
        mapping.append_map(del.invert(), Some(1));
        mapping.drop_front(1);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get_mirror(0), Some(1));
        assert_eq!(mapping.map(4, 1), 4);
    }

    #[test]
    fn test_slice_limits_maps() {
        let mapping = Mapping::from_maps(vec![StepMap::single(0, 0, 1), StepMap::single(0, 0, 1)]);
        assert_eq!(mapping.map(0, 1), 2);
        assert_eq!(mapping.slice_from(1).map(0, 1), 1);
        assert_eq!(mapping.slice(0, 0).map(0, 1), 0);
    }

    #[test]
    fn test_offset_map() {
        assert_eq!(StepMap::offset(3).map(0, 1), 3);
        assert_eq!(StepMap::offset(-2).map(5, 1), 3);
        assert_eq!(StepMap::offset(0), StepMap::empty());
    }
}
