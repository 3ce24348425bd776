//! A pure, stateless Merkle-Patricia Trie proof engine.
//!
//! Verifies inclusion and exclusion proofs of key/value pairs against a
//! known root hash, and computes the new root hash that results from
//! inserting or overwriting a key/value pair, given a proof rooted at the
//! current root. The engine does not store a trie, does not support
//! deletion, and performs no I/O: every function is a pure function of its
//! arguments.
//!
//! ```
//! let root = mpt_proof::empty_trie_root();
//! ```

mod engine;
mod error;
mod keccak;
mod nibble;
mod node;
mod rlp;

pub use error::Error;

/// Verifies that `(key, value)` is included in the trie rooted at `root`,
/// given `proof` — an RLP-encoded list of RLP-encoded nodes from the root
/// toward `key`.
pub fn verify_inclusion_proof(key: &[u8], value: &[u8], proof: &[u8], root: &[u8; 32]) -> Result<bool, Error> {
    engine::verify_inclusion_proof(key, value, proof, root)
}

/// Verifies that `key` is absent from the trie rooted at `root`, or present
/// with a value other than `value`, given `proof`.
pub fn verify_exclusion_proof(key: &[u8], value: &[u8], proof: &[u8], root: &[u8; 32]) -> Result<bool, Error> {
    engine::verify_exclusion_proof(key, value, proof, root)
}

/// Computes the root that results from inserting or overwriting `(key,
/// value)` in the trie rooted at `root`, given a proof reaching either the
/// target key or a dead end.
pub fn update(key: &[u8], value: &[u8], proof: &[u8], root: &[u8; 32]) -> Result<[u8; 32], Error> {
    engine::update(key, value, proof, root)
}

/// The root of an empty trie: `keccak256(RLP(""))`. The engine never
/// synthesizes this on its own — callers starting a brand-new trie pass it
/// as the first `root` argument to [`update`].
pub fn empty_trie_root() -> [u8; 32] {
    engine::empty_trie_root()
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::node::make_leaf_node;
    use crate::rlp::encode_list;
    use proptest::prelude::*;

    fn wrap_proof(encodings: &[Vec<u8>]) -> Vec<u8> {
        encode_list(encodings)
    }

    // A minimal single-leaf trie built straight from the empty root, used to
    // exercise P1/P2 without needing a full in-memory trie builder: update()
    // against the empty root always produces exactly a one-leaf trie.
    fn single_leaf_trie(key: &[u8], value: &[u8]) -> ([u8; 32], Vec<u8>) {
        let root0 = empty_trie_root();
        let empty_proof = wrap_proof(&[vec![0x80]]);
        let root1 = update(key, value, &empty_proof, &root0).unwrap();
        let leaf = make_leaf_node(&crate::nibble::bytes_to_nibbles(key), value);
        let proof1 = wrap_proof(&[leaf.encoded]);
        (root1, proof1)
    }

    proptest! {
        // P1 (round-trip inclusion), restricted to the single-leaf case: a
        // key/value pair inserted into an empty trie verifies against its
        // own freshest proof and root.
        #[test]
        fn p1_round_trip_inclusion(key in prop::collection::vec(any::<u8>(), 1..8), value in prop::collection::vec(any::<u8>(), 0..8)) {
            let (root, proof) = single_leaf_trie(&key, &value);
            prop_assert!(verify_inclusion_proof(&key, &value, &proof, &root).unwrap());
        }

        // P2 (exclusion of unseen keys): a key that was never inserted is
        // excluded against a single-leaf trie it doesn't share a full match
        // with.
        #[test]
        fn p2_exclusion_of_unseen_keys(
            key in prop::collection::vec(any::<u8>(), 1..8),
            other_key in prop::collection::vec(any::<u8>(), 1..8),
            value in prop::collection::vec(any::<u8>(), 0..8),
        ) {
            prop_assume!(key != other_key);
            let (root, proof) = single_leaf_trie(&key, &value);
            prop_assert!(verify_exclusion_proof(&other_key, &value, &proof, &root).unwrap());
        }

        // P3 (update idempotence): overwriting the same key/value twice in a
        // row, re-fetching the proof against the new root each time, is a
        // no-op on the root.
        #[test]
        fn p3_update_idempotence(key in prop::collection::vec(any::<u8>(), 1..8), value in prop::collection::vec(any::<u8>(), 0..8)) {
            let (root, proof) = single_leaf_trie(&key, &value);
            let root_again = update(&key, &value, &proof, &root).unwrap();
            prop_assert_eq!(root, root_again);
        }

        // P4 (RLP round-trip), string case: decoding the encoding of an
        // arbitrary byte string always returns that string back.
        #[test]
        fn p4_rlp_string_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let encoded = crate::rlp::encode_bytes(&bytes);
            let item = crate::rlp::to_item(&encoded).unwrap();
            prop_assert_eq!(crate::rlp::to_bytes(&item).unwrap(), bytes.as_slice());
        }

        // P4 (RLP round-trip), list case: decoding the encoding of an
        // arbitrary list of already-encoded items returns those same items,
        // matching the shape a branch/extension/leaf node's child list takes.
        #[test]
        fn p4_rlp_list_round_trip(strings in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..17)) {
            let encoded_items: Vec<Vec<u8>> = strings.iter().map(|s| crate::rlp::encode_bytes(s)).collect();
            let list = crate::rlp::encode_list(&encoded_items);
            let item = crate::rlp::to_item(&list).unwrap();
            let decoded = crate::rlp::to_list(&item).unwrap();
            prop_assert_eq!(decoded.len(), strings.len());
            for (decoded_item, original) in decoded.iter().zip(strings.iter()) {
                prop_assert_eq!(crate::rlp::to_bytes(decoded_item).unwrap(), original.as_slice());
            }
        }

        // P5 (hex-prefix round-trip): stripping the hex prefix from the
        // nibble-expansion of an added prefix always returns the original key,
        // for both leaf and extension parity.
        #[test]
        fn p5_hex_prefix_round_trip(
            key in prop::collection::vec(0u8..16, 0..32),
            is_leaf in any::<bool>(),
        ) {
            let path = crate::node::add_hex_prefix(&key, is_leaf);
            let nibbles = crate::nibble::bytes_to_nibbles(&path);
            prop_assert_eq!(crate::node::remove_hex_prefix(&nibbles), key);
        }

        // P6 (node-reference size rule): a node's reference equals its full
        // encoding verbatim iff the encoding is under 32 bytes, else it's the
        // keccak-256 of the encoding.
        #[test]
        fn p6_node_reference_size_rule(encoded in prop::collection::vec(any::<u8>(), 0..80)) {
            let reference = crate::node::node_hash(&encoded);
            if encoded.len() < 32 {
                prop_assert_eq!(reference.as_slice(), encoded.as_slice());
            } else {
                prop_assert_eq!(reference.as_slice(), crate::keccak::keccak256(&encoded).as_slice());
            }
        }
    }
}
