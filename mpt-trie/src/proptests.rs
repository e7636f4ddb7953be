use crate::proof::{verify_proof, ProofStore};
use crate::trie::Trie;

use alloy_primitives::keccak256;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    // Short keys over a small alphabet so paths share prefixes and every node
    // kind shows up.
    prop::collection::vec(prop_oneof![Just(0x00u8), Just(0x01), Just(0x10), Just(0x11), any::<u8>()], 0..=6)
}

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    // Non-empty, since put rejects empty values.
    // Up to 40 bytes so some leaves are embedded and some hashed.
    prop::collection::vec(any::<u8>(), 1..=40)
}

fn entries_strategy() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    prop::collection::vec((key_strategy(), value_strategy()), 1..=48)
}

fn build(entries: &[(Vec<u8>, Vec<u8>)]) -> Trie {
    let mut trie = Trie::new();
    for (key, value) in entries {
        trie.put(key, value.clone()).unwrap();
    }
    trie
}

fn last_writes(entries: &[(Vec<u8>, Vec<u8>)]) -> BTreeMap<Vec<u8>, Vec<u8>> {
    entries.iter().cloned().collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_get_returns_last_write(entries in entries_strategy()) {
        let trie = build(&entries);
        for (key, value) in last_writes(&entries) {
            prop_assert_eq!(trie.get(&key), Some(value.as_slice()));
        }
    }

    #[test]
    fn prop_root_independent_of_order(entries in entries_strategy(), rotate in 0usize..48) {
        let map = last_writes(&entries);
        let forward: Vec<_> = map.clone().into_iter().collect();

        let mut reversed = forward.clone();
        reversed.reverse();

        let mut rotated = forward.clone();
        let shift = rotate % rotated.len();
        rotated.rotate_left(shift);

        let root = build(&forward).hash();
        prop_assert_eq!(build(&reversed).hash(), root);
        prop_assert_eq!(build(&rotated).hash(), root);
        // overwrites in between do not leave a trace
        prop_assert_eq!(build(&entries).hash(), root);
    }

    #[test]
    fn prop_proofs_verify(entries in entries_strategy()) {
        let trie = build(&entries);
        let root = trie.hash();
        for (key, value) in last_writes(&entries) {
            let proof = trie.prove(&key).unwrap();
            prop_assert_eq!(verify_proof(root, &key, &proof).unwrap(), value.clone());

            let trace = trie.create_proof(&key).unwrap();
            prop_assert_eq!(verify_proof(root, &key, &trace.to_proof_db()).unwrap(), value);
        }
    }

    #[test]
    fn prop_absent_keys(entries in entries_strategy(), probe in key_strategy()) {
        let map = last_writes(&entries);
        prop_assume!(!map.contains_key(&probe));

        let trie = build(&entries);
        prop_assert_eq!(trie.get(&probe), None);

        let err = trie.prove(&probe).unwrap_err();
        prop_assert!(err.is_absent(), "unexpected error kind: {}", err.kind());

        // a proof for some present key never vouches for the absent one
        let (present, _) = map.iter().next().unwrap();
        let proof = trie.prove(present).unwrap();
        prop_assert!(verify_proof(trie.hash(), &probe, &proof).is_err());
    }

    #[test]
    fn prop_tampered_proof_rejected(entries in entries_strategy(), pick in any::<prop::sample::Index>(), bit in 0u8..8) {
        let trie = build(&entries);
        let root = trie.hash();
        let (key, _) = last_writes(&entries).into_iter().next().unwrap();
        let proof = trie.prove(&key).unwrap();

        let nodes = proof.serialize();
        let node = &nodes[pick.index(nodes.len())];
        let mut tampered_node = node.clone();
        let at = pick.index(tampered_node.len());
        tampered_node[at] ^= 1 << bit;

        let mut tampered = proof.clone();
        tampered.put(keccak256(node), tampered_node);
        prop_assert!(verify_proof(root, &key, &tampered).is_err());
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
    let entries: Vec<(&[u8], &[u8])> = vec![
        (&b""[..], &b"root"[..]),
        (&b"a"[..], &b"1"[..]),
        (&b"b"[..], &b"2"[..]),
        (&b"aa"[..], &b"3"[..]),
        (&b"ab"[..], &b"4"[..]),
        (&b"abc"[..], &b"a value long enough to be referenced by hash"[..]),
    ];

    let mut expected = None;
    for_each_permutation(&entries, |perm| {
        let mut trie = Trie::new();
        trie.put_all(perm).unwrap();
        let root = trie.hash();

        if let Some(first) = expected {
            assert_eq!(root, first, "root depends on insertion order");
        } else {
            expected = Some(root);
        }

        for (key, value) in &entries {
            assert_eq!(trie.get(key), Some(*value));
            let proof = trie.prove(key).unwrap();
            assert_eq!(verify_proof(root, key, &proof).unwrap(), value.to_vec());
        }
    });
}
