use super::*;

use crate::rbtree::{black_height, RbNodes};
use crate::tree::NodeId;
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

/// Check ordering, links, colours and layer disjointness of the whole tree.
pub(crate) fn validate_tree(t: &BinarySearchTree) {
    let Some(root) = t.root else {
        assert_eq!(t.len(), 0, "empty tree must have no nodes");
        return;
    };

    assert!(!t.nodes.is_red(root), "root must be black");
    assert_eq!(t.nodes.parent(root), None, "root must have no parent");
    black_height(&t.nodes, Some(root));

    let mut reachable = 0usize;
    let mut stack: Vec<NodeId> = vec![root];
    while let Some(id) = stack.pop() {
        reachable += 1;
        let node = t.nodes.get(id);

        let layer = node.value();
        assert!(
            layer.additions().is_disjoint(layer.deletions()),
            "additions and deletions overlap"
        );

        for child in [t.nodes.left(id), t.nodes.right(id)].into_iter().flatten() {
            assert_eq!(
                t.nodes.parent(child),
                Some(id),
                "child's parent link must point back"
            );
            stack.push(child);
        }
    }
    assert_eq!(reachable, t.len(), "every node must be reachable from root");

    let flat = t.flatten_in_order();
    for pair in flat.windows(2) {
        assert!(
            pair[0].key() < pair[1].key(),
            "keys must be strictly increasing"
        );
    }
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    // Small alphabet so keys collide and exercise the merge path.
    prop::collection::vec(0u8..4, 0..=6)
}

fn ids_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..32, 0..=6)
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 3)]
    Insert(
        #[proptest(strategy = "key_strategy()")] Vec<u8>,
        #[proptest(strategy = "ids_strategy()")] Vec<u64>,
        #[proptest(strategy = "ids_strategy()")] Vec<u64>,
    ),
    Get(#[proptest(strategy = "key_strategy()")] Vec<u8>),
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=500)) {
        let mut t = BinarySearchTree::new();
        let mut m: BTreeMap<Vec<u8>, BitmapLayer> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, adds, dels) => {
                    t.insert(&key, &adds, &dels);
                    m.entry(key)
                        .or_default()
                        .merge(&BitmapLayer::from_lists(&adds, &dels));
                }
                Op::Get(key) => {
                    let got_t = t.get(&key).ok().cloned();
                    let got_m = m.get(&key).cloned();
                    prop_assert_eq!(got_t, got_m);
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        validate_tree(&t);
        let got: Vec<(Vec<u8>, BitmapLayer)> = t
            .flatten_in_order()
            .into_iter()
            .map(|n| (n.key().to_vec(), n.value().clone()))
            .collect();
        let expected: Vec<(Vec<u8>, BitmapLayer)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_invariants_after_every_insert(keys in prop::collection::vec(any::<Vec<u8>>(), 0..=100)) {
        let mut t = BinarySearchTree::new();
        for key in &keys {
            t.insert(key, &[1], &[]);
            validate_tree(&t);
        }
    }

    #[test]
    fn prop_single_key_disjoint(batches in prop::collection::vec((ids_strategy(), ids_strategy()), 1..=50)) {
        let mut t = BinarySearchTree::new();
        for (adds, dels) in &batches {
            t.insert(b"k", adds, dels);
            let layer = t.get(b"k").unwrap();
            prop_assert!(layer.additions().is_disjoint(layer.deletions()));
            // The latest batch always wins for the ids it names.
            for id in adds.iter().filter(|id| !dels.contains(id)) {
                prop_assert!(layer.additions().contains(*id));
            }
            for id in dels {
                prop_assert!(layer.deletions().contains(*id));
            }
        }
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
        b"".to_vec(),
        b"a".to_vec(),
        b"b".to_vec(),
        b"c".to_vec(),
        b"aa".to_vec(),
        b"a\x00".to_vec(),
        b"ba".to_vec(),
    ];

    for_each_permutation(&keys, |perm| {
        let mut t = BinarySearchTree::new();
        for (i, k) in perm.iter().enumerate() {
            t.insert(k, &[i as u64], &[]);
            validate_tree(&t);
        }

        let mut sorted = keys.clone();
        sorted.sort();
        let got: Vec<Vec<u8>> = t.iter().map(|n| n.key().to_vec()).collect();
        assert_eq!(got, sorted);
    });
}

#[test]
fn sizes_zero_one_two_hundred() {
    for n in [0u32, 1, 2, 100] {
        let mut t = BinarySearchTree::new();
        for i in 0..n {
            t.insert(format!("key{i:05}").as_bytes(), &[u64::from(i)], &[]);
        }
        validate_tree(&t);
        assert_eq!(t.len(), n as usize);
    }
}
