//! Range and prefix engines plus the pagination primitives they share.
//!
//! Both engines walk the trie depth first with an explicit stack, visiting a
//! node's own value before its children and children in ascending label
//! order. Results therefore come out in ascending key order, which is what
//! makes a truncated page reproducible: re-running with `offset` set to the
//! last key of a page yields the next one.

use std::collections::BTreeMap;

use crate::node::{NodeArena, NodeId};
use crate::tracing_helpers::debug_log;

// =============================================================================
// Pagination primitives
// =============================================================================

/// Pagination settings for [`range_page`](crate::ByteTrie::range_page) and
/// [`prefix_page`](crate::ByteTrie::prefix_page).
///
/// `limit` caps the number of entries returned (`None` = unlimited).
/// `offset` is an exclusive lower bound: only keys strictly greater than it
/// are returned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Page<'a> {
    /// Maximum number of entries to return.
    pub limit: Option<usize>,
    /// Exclusive lower bound, typically the last key of the previous page.
    pub offset: Option<&'a [u8]>,
}

impl<'a> Page<'a> {
    /// No limit, no offset.
    pub const fn all() -> Self {
        Self {
            limit: None,
            offset: None,
        }
    }

    /// At most `limit` entries.
    pub const fn first(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }

    /// Negative limits mean unlimited.
    pub fn from_signed(limit: isize) -> Self {
        Self {
            limit: usize::try_from(limit).ok(),
            offset: None,
        }
    }

    /// Resume strictly after `key`.
    pub const fn after(self, key: &'a [u8]) -> Self {
        Self {
            limit: self.limit,
            offset: Some(key),
        }
    }
}

/// Exclusive offset comparator.
///
/// True iff `key` sorts strictly after `offset` in byte-lexicographic order.
/// A proper prefix sorts before its extensions, so `is_after(b"ab", Some(b"a"))`
/// holds and `is_after(b"a", Some(b"ab"))` does not. `None` admits every key.
pub fn is_after(key: &[u8], offset: Option<&[u8]>) -> bool {
    offset.map_or(true, |offset| key > offset)
}

/// Result budget shared by every step of one query.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Budget {
    remaining: Option<usize>,
}

impl Budget {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self { remaining: limit }
    }

    #[inline]
    pub(crate) fn is_spent(&self) -> bool {
        self.remaining == Some(0)
    }

    #[inline]
    pub(crate) fn spend(&mut self) {
        if let Some(n) = self.remaining.as_mut() {
            *n = n.saturating_sub(1);
        }
    }
}

// =============================================================================
// Bound cursors
// =============================================================================

/// Position of the current path relative to one bound.
///
/// `Pinned(rest)`: the path equals the bound's leading bytes; `rest` is what
/// is left of the bound. `Open`: the path has left the bound behind, so every
/// descendant is on the admitted side of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cursor<'q> {
    Pinned(&'q [u8]),
    Open,
}

impl<'q> Cursor<'q> {
    fn from_bound(bound: Option<&'q [u8]>) -> Self {
        bound.map_or(Cursor::Open, Cursor::Pinned)
    }

    #[inline]
    fn is_open(self) -> bool {
        self == Cursor::Open
    }

    /// The path equals the bound exactly.
    #[inline]
    fn is_exhausted(self) -> bool {
        self == Cursor::Pinned(&[])
    }

    /// Step across `label` with this cursor tracking a lower bound.
    ///
    /// `None` means the child and its whole subtree sort below the bound.
    /// An exhausted lower bound opens on any further byte.
    #[inline]
    fn step_lower(self, label: u8) -> Option<Self> {
        match self {
            Cursor::Open => Some(Cursor::Open),
            Cursor::Pinned(rest) => match rest.split_first() {
                None => Some(Cursor::Open),
                Some((&b, tail)) if label == b => Some(Cursor::Pinned(tail)),
                Some((&b, _)) if label > b => Some(Cursor::Open),
                Some(_) => None,
            },
        }
    }

    /// Step across `label` with this cursor tracking an upper bound.
    ///
    /// `None` means the child and its whole subtree sort above the bound.
    /// An exhausted upper bound rejects every further byte.
    #[inline]
    fn step_upper(self, label: u8) -> Option<Self> {
        match self {
            Cursor::Open => Some(Cursor::Open),
            Cursor::Pinned(rest) => match rest.split_first() {
                None => None,
                Some((&b, tail)) if label == b => Some(Cursor::Pinned(tail)),
                Some((&b, _)) if label < b => Some(Cursor::Open),
                Some(_) => None,
            },
        }
    }
}

// =============================================================================
// Shared collector
// =============================================================================

struct Collector<'t, 'q, V> {
    out: BTreeMap<Vec<u8>, &'t V>,
    budget: Budget,
    offset: Option<&'q [u8]>,
}

impl<'t, 'q, V> Collector<'t, 'q, V> {
    fn new(page: Page<'q>) -> Self {
        Self {
            out: BTreeMap::new(),
            budget: Budget::new(page.limit),
            offset: page.offset,
        }
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.budget.is_spent()
    }

    /// Add `key` if it lies past the offset and the budget allows.
    ///
    /// `after` is the offset cursor at `key`; it answers the same question as
    /// [`is_after`] without rescanning the key.
    fn offer(&mut self, key: &[u8], value: &'t V, after: Cursor<'_>) {
        debug_assert_eq!(after.is_open(), is_after(key, self.offset));
        if self.budget.is_spent() || !after.is_open() {
            return;
        }
        self.out.insert(key.to_vec(), value);
        self.budget.spend();
    }

    fn finish(self) -> BTreeMap<Vec<u8>, &'t V> {
        self.out
    }
}

/// Collect every value in the subtree at `from`, whose key is `key`.
///
/// Only the offset and the budget can exclude entries here. `key` is used as
/// scratch space and holds an arbitrary descendant path on return.
fn collect_subtree<'t, V>(
    arena: &'t NodeArena<V>,
    from: NodeId,
    key: &mut Vec<u8>,
    after: Cursor<'_>,
    sink: &mut Collector<'t, '_, V>,
) {
    let base = key.len();
    let mut stack = vec![(from, base, after)];

    while let Some((id, depth, after)) = stack.pop() {
        if sink.is_full() {
            return;
        }

        let node = arena.node(id);
        if depth > base {
            key.truncate(depth - 1);
            key.push(node.label());
        }

        if let Some(value) = node.value() {
            sink.offer(key, value, after);
        }

        for &(label, child) in node.children().iter().rev() {
            if let Some(after) = after.step_lower(label) {
                stack.push((child, depth + 1, after));
            }
        }
    }
}

// =============================================================================
// Range engine
// =============================================================================

#[derive(Clone, Copy)]
struct RangeFrame<'q> {
    node: NodeId,
    /// Key length at `node`.
    depth: usize,
    lower: Cursor<'q>,
    upper: Cursor<'q>,
    after: Cursor<'q>,
}

/// Every stored key in `[start, end]`, paginated by `page`.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "trace",
        skip_all,
        fields(start_len = start.len(), end_len = end.len(), limit = ?page.limit)
    )
)]
pub(crate) fn range<'t, V>(
    arena: &'t NodeArena<V>,
    start: &[u8],
    end: &[u8],
    page: Page<'_>,
) -> BTreeMap<Vec<u8>, &'t V> {
    let mut sink = Collector::new(page);
    let mut key = Vec::new();
    let mut stack = vec![RangeFrame {
        node: NodeId::ROOT,
        depth: 0,
        lower: Cursor::Pinned(start),
        upper: Cursor::Pinned(end),
        after: Cursor::from_bound(page.offset),
    }];

    while let Some(frame) = stack.pop() {
        if sink.is_full() {
            break;
        }

        let node = arena.node(frame.node);
        if frame.depth > 0 {
            key.truncate(frame.depth - 1);
            key.push(node.label());
        }

        // Strictly inside on both sides: nothing below can fall out of range.
        if frame.lower.is_open() && frame.upper.is_open() {
            collect_subtree(arena, frame.node, &mut key, frame.after, &mut sink);
            continue;
        }

        // Every reached path is a prefix of `end` or already below it, so the
        // upper side always admits the node itself.
        if frame.lower.is_open() || frame.lower.is_exhausted() {
            if let Some(value) = node.value() {
                sink.offer(&key, value, frame.after);
            }
        }

        for &(label, child) in node.children().iter().rev() {
            let (Some(lower), Some(upper), Some(after)) = (
                frame.lower.step_lower(label),
                frame.upper.step_upper(label),
                frame.after.step_lower(label),
            ) else {
                continue;
            };
            stack.push(RangeFrame {
                node: child,
                depth: frame.depth + 1,
                lower,
                upper,
                after,
            });
        }
    }

    let out = sink.finish();
    debug_log!(results = out.len(), "range query finished");
    out
}

// =============================================================================
// Prefix engine
// =============================================================================

/// Every stored key starting with `prefix`, paginated by `page`.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "trace",
        skip_all,
        fields(prefix_len = prefix.len(), limit = ?page.limit)
    )
)]
pub(crate) fn prefix<'t, V>(
    arena: &'t NodeArena<V>,
    prefix: &[u8],
    page: Page<'_>,
) -> BTreeMap<Vec<u8>, &'t V> {
    let mut sink = Collector::new(page);
    let mut after = Cursor::from_bound(page.offset);
    let mut id = NodeId::ROOT;

    for &label in prefix {
        let Some(child) = arena.child(id, label) else {
            return sink.finish();
        };
        // The whole prefix sorts below the offset.
        let Some(next) = after.step_lower(label) else {
            return sink.finish();
        };
        id = child;
        after = next;
    }

    let mut key = prefix.to_vec();
    collect_subtree(arena, id, &mut key, after, &mut sink);

    let out = sink.finish();
    debug_log!(results = out.len(), "prefix query finished");
    out
}
