use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Recursive node count below `id`.
fn subtree_count<V>(t: &ByteTrie<V>, id: NodeId) -> usize {
    t.nodes
        .node(id)
        .children()
        .iter()
        .map(|&(_, child)| 1 + subtree_count(t, child))
        .sum()
}

fn validate_trie<V>(t: &ByteTrie<V>) {
    let mut stack = vec![NodeId::ROOT];
    let mut values = 0usize;

    while let Some(id) = stack.pop() {
        let node = t.nodes.node(id);
        if node.value().is_some() {
            values += 1;
        }

        let children = node.children();
        assert!(children.len() <= 256, "too many children: {}", children.len());
        assert!(
            children.windows(2).all(|w| w[0].0 < w[1].0),
            "children must be strictly ascending by label"
        );
        for &(label, child) in children {
            let c = t.nodes.node(child);
            assert_eq!(c.label(), label, "child label must match its edge");
            assert_eq!(c.parent(), Some(id), "parent handle must point back");
            stack.push(child);
        }
    }

    assert_eq!(t.nodes.node(NodeId::ROOT).parent(), None);
    assert_eq!(values, t.len(), "reachable value count must match len");
    assert_eq!(
        subtree_count(t, NodeId::ROOT),
        t.count(),
        "count must equal the recursive node count"
    );
}

/// Distinct non-empty prefixes of every key: one trie node each.
fn model_count(m: &BTreeMap<Vec<u8>, u64>) -> usize {
    let mut paths: BTreeSet<&[u8]> = BTreeSet::new();
    for k in m.keys() {
        for i in 1..=k.len() {
            paths.insert(&k[..i]);
        }
    }
    paths.len()
}

fn model_range(
    m: &BTreeMap<Vec<u8>, u64>,
    start: &[u8],
    end: &[u8],
    page: Page<'_>,
) -> Vec<(Vec<u8>, u64)> {
    m.iter()
        .filter(|(k, _)| k.as_slice() >= start && k.as_slice() <= end)
        .filter(|(k, _)| is_after(k, page.offset))
        .take(page.limit.unwrap_or(usize::MAX))
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

fn model_prefix(m: &BTreeMap<Vec<u8>, u64>, prefix: &[u8], page: Page<'_>) -> Vec<(Vec<u8>, u64)> {
    m.iter()
        .filter(|(k, _)| k.starts_with(prefix))
        .filter(|(k, _)| is_after(k, page.offset))
        .take(page.limit.unwrap_or(usize::MAX))
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

fn flatten(got: BTreeMap<Vec<u8>, &u64>) -> Vec<(Vec<u8>, u64)> {
    got.into_iter().map(|(k, v)| (k, *v)).collect()
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, u64),
    Lookup(Vec<u8>),
    Range {
        start: Vec<u8>,
        end: Vec<u8>,
        limit: Option<usize>,
        offset: Option<Vec<u8>>,
    },
    Prefix {
        prefix: Vec<u8>,
        limit: Option<usize>,
        offset: Option<Vec<u8>>,
    },
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    // A small alphabet including both extreme bytes, so that keys share
    // prefixes and bounds land on stored keys often.
    let byte = prop::sample::select(vec![0x00u8, 0x01, b'a', b'b', b'c', 0xfe, 0xff]);
    prop::collection::vec(byte, 0..=6)
}

fn limit_strategy() -> impl Strategy<Value = Option<usize>> {
    prop::option::of(0usize..8)
}

fn offset_strategy() -> impl Strategy<Value = Option<Vec<u8>>> {
    prop::option::of(key_strategy())
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        50 => (key_strategy(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        15 => key_strategy().prop_map(Op::Lookup),
        20 => (key_strategy(), key_strategy(), limit_strategy(), offset_strategy())
            .prop_map(|(start, end, limit, offset)| Op::Range { start, end, limit, offset }),
        15 => (key_strategy(), limit_strategy(), offset_strategy())
            .prop_map(|(prefix, limit, offset)| Op::Prefix { prefix, limit, offset }),
    ];
    prop::collection::vec(op, 0..=400)
}

fn page_of<'a>(limit: Option<usize>, offset: &'a Option<Vec<u8>>) -> Page<'a> {
    Page {
        limit,
        offset: offset.as_deref(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t: ByteTrie<u64> = ByteTrie::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = t.insert(&key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Lookup(key) => {
                    prop_assert_eq!(t.lookup(&key).copied(), m.get(&key).copied());
                }
                Op::Range { start, end, limit, offset } => {
                    let page = page_of(limit, &offset);
                    let got = flatten(t.range_page(&start, &end, page));
                    prop_assert_eq!(got, model_range(&m, &start, &end, page));
                }
                Op::Prefix { prefix, limit, offset } => {
                    let page = page_of(limit, &offset);
                    let got = flatten(t.prefix_page(&prefix, page));
                    prop_assert_eq!(got, model_prefix(&m, &prefix, page));
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        validate_trie(&t);
        prop_assert_eq!(t.count(), model_count(&m));
        let got: Vec<(Vec<u8>, u64)> = t.iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_paging_covers_range(
        keys in prop::collection::btree_set(key_strategy(), 0..64),
        start in key_strategy(),
        end in key_strategy(),
        page_size in 1usize..5,
    ) {
        let t: ByteTrie<u64> = keys.iter().enumerate().map(|(i, k)| (k.clone(), i as u64)).collect();
        let full = t.range(&start, &end);

        let mut paged: Vec<Vec<u8>> = Vec::new();
        let mut offset: Option<Vec<u8>> = None;
        loop {
            let page = t.range_page(&start, &end, page_of(Some(page_size), &offset));
            prop_assert!(page.len() <= page_size);
            if let Some(off) = &offset {
                prop_assert!(page.keys().all(|k| k > off));
            }
            let Some((last, _)) = page.last_key_value() else {
                break;
            };
            let last = last.clone();
            paged.extend(page.into_keys());
            offset = Some(last);
        }

        let expected: Vec<Vec<u8>> = full.into_keys().collect();
        prop_assert_eq!(paged, expected);
    }

    #[test]
    fn prop_limit_is_min(
        keys in prop::collection::btree_set(key_strategy(), 0..64),
        prefix in prop::collection::vec(prop::sample::select(vec![b'a', b'b']), 0..=2),
        n in 0isize..10,
    ) {
        let t: ByteTrie<u64> = keys.iter().map(|k| (k.clone(), 0)).collect();
        let all = t.prefix(&prefix).len();
        prop_assert_eq!(t.prefix_n(&prefix, n).len(), all.min(n as usize));
        prop_assert_eq!(t.prefix_n(&prefix, -1).len(), all);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<Vec<u8>> = vec![
        b"a".to_vec(),
        b"b".to_vec(),
        b"c".to_vec(),
        b"aa".to_vec(),
        b"ab".to_vec(),
        b"ba".to_vec(),
    ];

    for_each_permutation(&keys, |perm| {
        let mut t: ByteTrie<u64> = ByteTrie::new();
        for k in &perm {
            t.insert(k, k.len() as u64);
        }

        validate_trie(&t);
        assert_eq!(t.count(), 6);

        // Truncated pages depend only on key order, never on insertion order.
        let page: Vec<Vec<u8>> = t.range_n(b"a", b"c", 3).into_keys().collect();
        assert_eq!(page, vec![b"a".to_vec(), b"aa".to_vec(), b"ab".to_vec()]);

        let next: Vec<Vec<u8>> = t.offset_range_n(b"ab", b"a", b"c", 3).into_keys().collect();
        assert_eq!(next, vec![b"b".to_vec(), b"ba".to_vec(), b"c".to_vec()]);

        let prefix: Vec<Vec<u8>> = t.prefix_n(b"b", 1).into_keys().collect();
        assert_eq!(prefix, vec![b"b".to_vec()]);
    });
}
