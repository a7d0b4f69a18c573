//! # byte-trie
//!
//! An in-memory ordered map keyed by byte strings, stored as a trie with one
//! byte per edge. Besides point lookups it answers inclusive range queries
//! and prefix queries, both with cursor-style pagination: a result limit and
//! an exclusive offset key to resume after.
//!
//! ## Example
//!
//! ```rust
//! use byte_trie::{ByteTrie, Page};
//!
//! let mut trie: ByteTrie<&str> = ByteTrie::new();
//! trie.insert(b"test1", "Hello");
//! trie.insert(b"test2", "World");
//!
//! assert_eq!(trie.lookup(b"test1"), Some(&"Hello"));
//! assert_eq!(trie.range(b"test1", b"test2").len(), 2);
//! assert!(trie.range(b"test1", b"test").is_empty());
//!
//! // Page through a prefix one entry at a time.
//! let first = trie.prefix_page(b"test", Page::first(1));
//! let (last, _) = first.last_key_value().unwrap();
//! let second = trie.prefix_page(b"test", Page::first(1).after(last));
//! assert_eq!(second.keys().next().map(Vec::as_slice), Some(&b"test2"[..]));
//! ```
//!
//! Writes take `&mut self` and reads take `&self`, so sharing a trie between
//! threads needs the usual external synchronisation for writers.

#![forbid(unsafe_code)]

mod node;
mod query;
mod tracing_helpers;

use std::collections::BTreeMap;

use node::{NodeArena, NodeId};

pub use query::{is_after, Page};

/// Configuration for a [`ByteTrie`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of nodes to reserve space for up front.
    pub initial_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
        }
    }
}

/// An ordered byte-keyed map stored as a trie.
///
/// Keys are arbitrary byte strings, including the empty string. Keys are
/// never removed; inserting an existing key replaces its value.
pub struct ByteTrie<V> {
    nodes: NodeArena<V>,
    /// Number of stored values.
    count: usize,
}

impl<V> ByteTrie<V> {
    /// Create an empty trie with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty trie with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            nodes: NodeArena::with_capacity(config.initial_capacity),
            count: 0,
        }
    }

    /// Number of stored keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of nodes below the root, i.e. distinct byte paths created by
    /// inserts, whether or not a value ends there.
    #[inline]
    pub fn count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Approximate heap bytes held by the trie structure.
    pub fn memory_usage(&self) -> usize {
        self.nodes.memory_usage()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    /// Insert `value` at `key`, returning the value it replaced.
    pub fn insert(&mut self, key: &[u8], value: V) -> Option<V> {
        let id = key
            .iter()
            .fold(NodeId::ROOT, |id, &label| self.nodes.child_or_insert(id, label));
        let old = self.nodes.set_value(id, value);
        if old.is_none() {
            self.count += 1;
        }
        old
    }

    /// Value stored at exactly `key`.
    pub fn lookup(&self, key: &[u8]) -> Option<&V> {
        self.nodes
            .descend(key)
            .and_then(|id| self.nodes.node(id).value())
    }

    /// Alias for [`lookup`](Self::lookup).
    #[inline]
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        self.lookup(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.lookup(key).is_some()
    }

    /// All entries with `start <= key <= end`.
    ///
    /// An inverted range (`start > end`) is empty.
    pub fn range(&self, start: &[u8], end: &[u8]) -> BTreeMap<Vec<u8>, &V> {
        self.range_page(start, end, Page::all())
    }

    /// The first `limit` entries of [`range`](Self::range) in key order.
    /// A negative `limit` means unlimited.
    pub fn range_n(&self, start: &[u8], end: &[u8], limit: isize) -> BTreeMap<Vec<u8>, &V> {
        self.range_page(start, end, Page::from_signed(limit))
    }

    /// Like [`range_n`](Self::range_n), but only keys strictly after `offset`.
    pub fn offset_range_n(
        &self,
        offset: &[u8],
        start: &[u8],
        end: &[u8],
        limit: isize,
    ) -> BTreeMap<Vec<u8>, &V> {
        self.range_page(start, end, Page::from_signed(limit).after(offset))
    }

    /// Range query with explicit pagination.
    pub fn range_page(&self, start: &[u8], end: &[u8], page: Page<'_>) -> BTreeMap<Vec<u8>, &V> {
        query::range(&self.nodes, start, end, page)
    }

    /// All entries whose key starts with `prefix`, including `prefix` itself.
    pub fn prefix(&self, prefix: &[u8]) -> BTreeMap<Vec<u8>, &V> {
        self.prefix_page(prefix, Page::all())
    }

    /// The first `limit` entries of [`prefix`](Self::prefix) in key order.
    /// A negative `limit` means unlimited.
    pub fn prefix_n(&self, prefix: &[u8], limit: isize) -> BTreeMap<Vec<u8>, &V> {
        self.prefix_page(prefix, Page::from_signed(limit))
    }

    /// Like [`prefix_n`](Self::prefix_n), but only keys strictly after `offset`.
    pub fn offset_prefix_n(
        &self,
        offset: &[u8],
        prefix: &[u8],
        limit: isize,
    ) -> BTreeMap<Vec<u8>, &V> {
        self.prefix_page(prefix, Page::from_signed(limit).after(offset))
    }

    /// Prefix query with explicit pagination.
    pub fn prefix_page(&self, prefix: &[u8], page: Page<'_>) -> BTreeMap<Vec<u8>, &V> {
        query::prefix(&self.nodes, prefix, page)
    }

    /// Iterate all entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            trie: self,
            key: Vec::new(),
            stack: vec![(NodeId::ROOT, 0)],
        }
    }
}

impl<V> Default for ByteTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for ByteTrie<V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            count: self.count,
        }
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for ByteTrie<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, V> IntoIterator for &'a ByteTrie<V> {
    type Item = (Vec<u8>, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: AsRef<[u8]>, V> FromIterator<(K, V)> for ByteTrie<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut trie = Self::new();
        trie.extend(iter);
        trie
    }
}

impl<K: AsRef<[u8]>, V> Extend<(K, V)> for ByteTrie<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k.as_ref(), v);
        }
    }
}

/// Ordered iterator over a [`ByteTrie`], created by [`ByteTrie::iter`].
pub struct Iter<'a, V> {
    trie: &'a ByteTrie<V>,
    key: Vec<u8>,
    /// Pending nodes with the key length at each.
    stack: Vec<(NodeId, usize)>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let trie: &'a ByteTrie<V> = self.trie;
        while let Some((id, depth)) = self.stack.pop() {
            let node = trie.nodes.node(id);
            if depth > 0 {
                self.key.truncate(depth - 1);
                self.key.push(node.label());
            }

            for &(_, child) in node.children().iter().rev() {
                self.stack.push((child, depth + 1));
            }

            if let Some(value) = node.value() {
                return Some((self.key.clone(), value));
            }
        }
        None
    }
}


#[cfg(test)]
mod proptests;
