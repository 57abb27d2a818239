//! # Ranges and Selections
//!
//! Callers hand in [`RawRange`]s: unordered, possibly out of bounds, possibly
//! using the `-1` "through the end" sentinel. [`normalize_range`] is the one
//! place that turns them into canonical [`Range`]s:
//!
//! - `0 <= start <= end <= ceiling`
//! - `collapsed` iff `start == end`
//! - a collapsed range has direction `none`
//! - ordered ends are `forward`, swapped ends are `backward`
//!
//! where the ceiling is the last position, or the one before it when only
//! positions that can be read as atoms are wanted.

use serde::{Deserialize, Serialize};

use super::iterator::PositionIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    #[default]
    None,
}

/// The `end` of a raw range.
///
/// On the wire this is a number, `-1` meaning [`RangeEnd::ToEnd`], or
/// `null`/absent meaning [`RangeEnd::Unset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<i64>", into = "Option<i64>")]
pub enum RangeEnd {
    Offset(i64),
    /// Through the end of the document
    ToEnd,
    /// Not given: the range collapses onto its start
    #[default]
    Unset,
}

impl From<Option<i64>> for RangeEnd {
    fn from(value: Option<i64>) -> Self {
        match value {
            Some(-1) => RangeEnd::ToEnd,
            Some(offset) => RangeEnd::Offset(offset),
            None => RangeEnd::Unset,
        }
    }
}

impl From<RangeEnd> for Option<i64> {
    fn from(value: RangeEnd) -> Self {
        match value {
            RangeEnd::Offset(offset) => Some(offset),
            RangeEnd::ToEnd => Some(-1),
            RangeEnd::Unset => None,
        }
    }
}

/// A range as submitted by a caller. Only [`normalize_range`] output is
/// canonical.
///
/// The direction of the normalized range comes from the order of the ends
/// alone: a backward range is submitted with `start` after `end`. An explicit
/// `direction` is accepted on the wire but does not override that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRange {
    pub start: i64,
    #[serde(default)]
    pub end: RangeEnd,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl RawRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: RangeEnd::from(Some(end)),
            direction: None,
        }
    }

    /// A caret at `start`.
    pub fn caret(start: i64) -> Self {
        Self {
            start,
            end: RangeEnd::Unset,
            direction: None,
        }
    }

    /// From `start` through the end of the document.
    pub fn to_end(start: i64) -> Self {
        Self {
            start,
            end: RangeEnd::ToEnd,
            direction: None,
        }
    }

    /// Whether the range extends backward, from `start` down to `end`.
    pub fn is_backward(&self) -> bool {
        match self.end {
            RangeEnd::Offset(end) if end != self.start => end < self.start,
            _ => self.direction == Some(Direction::Backward),
        }
    }
}

/// A canonical range over caret positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
    pub direction: Direction,
    pub collapsed: bool,
    /// Nesting level of the start position, top level being 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

impl Range {
    /// A collapsed range without depth information.
    pub fn caret(position: usize) -> Self {
        Self {
            start: position,
            end: position,
            direction: Direction::None,
            collapsed: true,
            depth: None,
        }
    }

    /// The moving end of the range.
    pub fn focus(&self) -> usize {
        match self.direction {
            Direction::Backward => self.start,
            Direction::Forward | Direction::None => self.end,
        }
    }
}

/// A backward range swaps its ends, so normalizing it again gives it back.
impl From<Range> for RawRange {
    fn from(range: Range) -> Self {
        let (start, end) = match range.direction {
            Direction::Backward => (range.end, range.start),
            Direction::Forward | Direction::None => (range.start, range.end),
        };
        Self {
            start: start as i64,
            end: RangeEnd::Offset(end as i64),
            direction: Some(range.direction),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeOptions {
    /// Exclude the last position, which is a valid caret target but does
    /// not correspond to an atom that can be read.
    pub accessible_atoms_only: bool,
}

/// Canonicalize `raw` against the positions of the current tree.
///
/// Never fails: out-of-range values are clamped.
pub fn normalize_range(iter: &PositionIterator<'_>, raw: RawRange, options: NormalizeOptions) -> Range {
    let last = iter.last_position();
    let ceiling = if options.accessible_atoms_only {
        last.saturating_sub(1)
    } else {
        last
    };
    let clamp = |value: i64| -> usize { usize::try_from(value).unwrap_or(0).min(ceiling) };

    let start = clamp(raw.start);
    if usize::try_from(raw.start).map_or(true, |s| s != start) {
        log::trace!("range start {} clamped to {start}", raw.start);
    }
    let end = match raw.end {
        RangeEnd::ToEnd => ceiling,
        RangeEnd::Unset => start,
        RangeEnd::Offset(end) => clamp(end),
    };

    let (start, end, direction) = if start < end {
        (start, end, Direction::Forward)
    } else {
        (end, start, Direction::Backward)
    };
    let collapsed = start == end;

    Range {
        start,
        end,
        direction: if collapsed { Direction::None } else { direction },
        collapsed,
        depth: iter.depth(start).map(|depth| depth.saturating_sub(1)),
    }
}

/// The current selection: one or more ranges, never zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selection {
    ranges: Vec<Range>,
}

impl Selection {
    pub fn new(range: Range) -> Self {
        Self {
            ranges: vec![range],
        }
    }

    /// `None` if `ranges` is empty.
    pub fn from_ranges(ranges: Vec<Range>) -> Option<Self> {
        if ranges.is_empty() {
            None
        } else {
            Some(Self { ranges })
        }
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn first(&self) -> &Range {
        &self.ranges[0]
    }

    pub fn last(&self) -> &Range {
        &self.ranges[self.ranges.len() - 1]
    }

    pub fn is_discontinuous(&self) -> bool {
        self.ranges.len() > 1
    }

    /// A single collapsed range, i.e. a plain caret.
    pub fn is_collapsed(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].collapsed
    }

    /// The caret position: the start of the last range if it was extended
    /// backward, otherwise the end of the first range.
    pub fn position(&self) -> usize {
        let last = self.last();
        if last.direction == Direction::Backward {
            last.start
        } else {
            self.first().end
        }
    }

    /// The smallest range covering every range of the selection.
    pub fn span(&self) -> Range {
        let start = self.ranges.iter().map(|r| r.start).min().unwrap_or(0);
        let end = self.ranges.iter().map(|r| r.end).max().unwrap_or(start);
        let collapsed = start == end;
        Range {
            start,
            end,
            direction: if collapsed { Direction::None } else { Direction::Forward },
            collapsed,
            depth: self.first().depth,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(Range::caret(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, AtomTree, Branch};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// A flat document with `n` atoms, so `last_position == n`.
    fn flat(n: usize) -> AtomTree {
        let mut tree = AtomTree::new();
        let root = tree.root();
        for _ in 0..n {
            tree.append_child(root, Branch::Body, Atom::literal("x"));
        }
        tree
    }

    fn norm(tree: &AtomTree, raw: RawRange, accessible: bool) -> Range {
        let iter = PositionIterator::new(tree);
        normalize_range(
            &iter,
            raw,
            NormalizeOptions {
                accessible_atoms_only: accessible,
            },
        )
    }

    #[test]
    fn inverted_range_is_swapped_and_backward() {
        let tree = flat(10);
        let range = norm(&tree, RawRange::new(7, 3), false);
        assert_eq!(range.start, 3);
        assert_eq!(range.end, 7);
        assert_eq!(range.direction, Direction::Backward);
        assert!(!range.collapsed);
        assert_eq!(range.depth, Some(0));
    }

    #[test]
    fn ordered_range_is_forward() {
        let tree = flat(10);
        let range = norm(&tree, RawRange::new(2, 5), false);
        assert_eq!((range.start, range.end, range.direction), (2, 5, Direction::Forward));
    }

    #[test]
    fn explicit_direction_does_not_override_order() {
        let tree = flat(10);
        let raw = RawRange {
            direction: Some(Direction::Backward),
            ..RawRange::new(3, 7)
        };
        let range = norm(&tree, raw, false);
        assert_eq!((range.start, range.end, range.direction), (3, 7, Direction::Forward));
    }

    #[test]
    fn backward_range_survives_conversion_to_raw() {
        let tree = flat(10);
        let range = norm(&tree, RawRange::new(7, 3), false);
        let raw = RawRange::from(range);
        assert_eq!((raw.start, raw.end), (7, RangeEnd::Offset(3)));
        assert!(raw.is_backward());
        assert_eq!(norm(&tree, raw, false), range);
    }

    #[rstest]
    #[case(RawRange::new(7, 3), true)]
    #[case(RawRange::new(3, 7), false)]
    #[case(RawRange::caret(3), false)]
    #[case(RawRange::to_end(3), false)]
    #[case(RawRange { direction: Some(Direction::Backward), ..RawRange::caret(3) }, true)]
    fn raw_range_backwardness(#[case] raw: RawRange, #[case] backward: bool) {
        assert_eq!(raw.is_backward(), backward);
    }

    #[rstest]
    #[case(false, 10)]
    #[case(true, 9)]
    fn to_end_resolves_to_ceiling(#[case] accessible: bool, #[case] ceiling: usize) {
        let tree = flat(10);
        let range = norm(&tree, RawRange::new(0, -1), accessible);
        assert_eq!(range.end, ceiling);
    }

    #[test]
    fn unset_end_collapses_onto_start() {
        let tree = flat(10);
        let range = norm(&tree, RawRange::caret(4), false);
        assert_eq!(range, Range { depth: Some(0), ..Range::caret(4) });
    }

    #[test]
    fn out_of_bounds_values_are_clamped() {
        let tree = flat(3);
        let range = norm(&tree, RawRange::new(-5, 99), false);
        assert_eq!((range.start, range.end), (0, 3));

        let range = norm(&tree, RawRange::new(42, 50), false);
        assert!(range.collapsed);
        assert_eq!(range.start, 3);
    }

    #[test]
    fn accessible_ceiling_saturates_on_empty_document() {
        let tree = AtomTree::new();
        let range = norm(&tree, RawRange::new(0, -1), true);
        assert_eq!((range.start, range.end), (0, 0));
        assert_eq!(range.direction, Direction::None);
    }

    #[test]
    fn normalized_ranges_satisfy_invariants() {
        let tree = flat(6);
        let ends = [RangeEnd::ToEnd, RangeEnd::Unset, RangeEnd::Offset(-3), RangeEnd::Offset(2), RangeEnd::Offset(9)];
        for accessible in [false, true] {
            let ceiling = if accessible { 5 } else { 6 };
            for start in -2..9 {
                for end in ends {
                    let raw = RawRange { start, end, direction: None };
                    let range = norm(&tree, raw, accessible);
                    assert!(range.start <= range.end && range.end <= ceiling, "{raw:?} -> {range:?}");
                    assert_eq!(range.collapsed, range.start == range.end);
                    if range.collapsed {
                        assert_eq!(range.direction, Direction::None);
                    }
                }
            }
        }
    }

    #[test]
    fn depth_counts_nesting_below_top_level() {
        let mut tree = AtomTree::new();
        let root = tree.root();
        let x = tree.append_child(root, Branch::Body, Atom::literal("x"));
        tree.append_child(x, Branch::Superscript, Atom::literal("2"));
        let range = norm(&tree, RawRange::caret(2), false);
        assert_eq!(range.depth, Some(1));
    }

    #[test]
    fn raw_range_wire_shape() {
        let raw: RawRange = serde_json::from_str(r#"{"start": 7, "end": -1}"#).unwrap();
        assert_eq!(raw.end, RangeEnd::ToEnd);

        let raw: RawRange = serde_json::from_str(r#"{"start": 7}"#).unwrap();
        assert_eq!(raw.end, RangeEnd::Unset);

        // Direction is read but the ends decide
        let raw: RawRange = serde_json::from_str(r#"{"start": 1, "end": 4, "direction": "backward"}"#).unwrap();
        assert_eq!(raw.end, RangeEnd::Offset(4));
        assert_eq!(raw.direction, Some(Direction::Backward));
        assert_eq!(norm(&flat(10), raw, false).direction, Direction::Forward);

        let json = serde_json::to_string(&Range::caret(2)).unwrap();
        assert_eq!(json, r#"{"start":2,"end":2,"direction":"none","collapsed":true}"#);
    }

    #[test]
    fn selection_position_follows_direction() {
        let forward = Range {
            start: 1,
            end: 4,
            direction: Direction::Forward,
            collapsed: false,
            depth: None,
        };
        let backward = Range {
            direction: Direction::Backward,
            ..forward
        };
        assert_eq!(Selection::new(forward).position(), 4);
        assert_eq!(Selection::new(backward).position(), 1);
        assert_eq!(Selection::from_ranges(vec![]), None);
    }

    #[test]
    fn selection_span_covers_all_ranges() {
        let a = Range { start: 5, end: 6, direction: Direction::Forward, collapsed: false, depth: Some(0) };
        let b = Range { start: 1, end: 2, direction: Direction::Forward, collapsed: false, depth: Some(0) };
        let selection = Selection::from_ranges(vec![a, b]).unwrap();
        assert!(selection.is_discontinuous());
        let span = selection.span();
        assert_eq!((span.start, span.end), (1, 6));
        assert!(!selection.is_collapsed());
    }
}
