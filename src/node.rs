//! Trie node model: classify decoded RLP items as branch/extension/leaf,
//! extract path/key/value, compute node references, and construct new nodes.
//!
//! A node is kept as its canonical `encoded` bytes only; `decoded` (the parsed
//! list of child items) is derived on demand rather than stored alongside it.
//! Node encodings here are always small (well under a kilobyte), so
//! re-parsing is cheap and this sidesteps a self-referential struct that
//! would otherwise be needed to hold both the owned buffer and items
//! borrowing from it.

use arrayvec::ArrayVec;

use crate::error::Error;
use crate::keccak::keccak256;
use crate::nibble::{bytes_to_nibbles, nibbles_to_bytes};
use crate::rlp::{self, RlpItem};

/// The canonical RLP encoding of the empty byte string — used both as the
/// "no node here" sentinel a proof may carry and as the branch-node filler
/// for unoccupied child slots.
const EMPTY_STRING_RLP: u8 = 0x80;

/// A node reference never exceeds a 1-byte RLP string header plus a 32-byte
/// hash.
const MAX_REF_LEN: usize = 33;

/// A node reference as it is found in a parent's child slot, or as produced
/// for a freshly built child: either a short node encoding inlined verbatim,
/// or a 32-byte keccak hash.
pub type NodeRef = ArrayVec<u8, MAX_REF_LEN>;

/// Builds a node reference from raw bytes, rejecting anything that can't
/// possibly be a valid reference (longer than a 1-byte header plus a 32-byte
/// hash). Callers that already know their input is bounded (a hash, or an
/// encoding already checked to be short) may still fail here if that
/// assumption was wrong — this is the only place that knowledge is checked.
pub(crate) fn to_node_ref(bytes: &[u8]) -> Result<NodeRef, Error> {
    let mut out = NodeRef::new();
    out.try_extend_from_slice(bytes).map_err(|_| Error::MalformedProof)?;
    Ok(out)
}

/// A trie node's classification, derived from its decoded item count and,
/// for 2-item nodes, the first nibble of its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// The RLP empty string standing in for an absent subtree.
    Empty,
    /// 17 decoded items: 16 child slots plus a value slot.
    Branch,
    /// 2 decoded items, path prefix nibble 0 or 1.
    Extension,
    /// 2 decoded items, path prefix nibble 2 or 3.
    Leaf,
}

/// A trie node, represented by its canonical RLP encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieNode {
    pub encoded: Vec<u8>,
}

impl TrieNode {
    /// Wraps an already-encoded node, validating its top-level shape (2 or 17
    /// decoded items, or the empty-string sentinel).
    pub fn from_encoded(encoded: Vec<u8>) -> Result<Self, Error> {
        let node = Self { encoded };
        if node.is_empty() {
            return Ok(node);
        }
        let decoded = node.decoded()?;
        if decoded.len() != 2 && decoded.len() != 17 {
            return Err(Error::MalformedProof);
        }
        Ok(node)
    }

    fn decoded(&self) -> Result<Vec<RlpItem<'_>>, Error> {
        let item = rlp::to_item(&self.encoded)?;
        Ok(rlp::to_list(&item)?)
    }

    /// True if this node is the empty-string sentinel for an absent subtree.
    pub fn is_empty(&self) -> bool {
        self.encoded.as_slice() == [EMPTY_STRING_RLP]
    }

    pub fn node_type(&self) -> Result<NodeType, Error> {
        if self.is_empty() {
            return Ok(NodeType::Empty);
        }
        let decoded = self.decoded()?;
        match decoded.len() {
            17 => Ok(NodeType::Branch),
            2 => {
                let path = rlp::to_bytes(&decoded[0])?;
                let prefix = path.first().map(|b| b >> 4).ok_or(Error::InvalidNodePrefix)?;
                match prefix {
                    0 | 1 => Ok(NodeType::Extension),
                    2 | 3 => Ok(NodeType::Leaf),
                    _ => Err(Error::InvalidNodePrefix),
                }
            }
            _ => Err(Error::MalformedProof),
        }
    }

    /// The nibble-expanded hex-prefix path of a leaf/extension node.
    pub fn path(&self) -> Result<Vec<u8>, Error> {
        let decoded = self.decoded()?;
        let path_bytes = rlp::to_bytes(&decoded[0])?;
        Ok(bytes_to_nibbles(path_bytes))
    }

    /// The key of a leaf/extension node: its path with the hex prefix removed.
    pub fn key(&self) -> Result<Vec<u8>, Error> {
        Ok(remove_hex_prefix(&self.path()?))
    }

    /// The value of a leaf node, or the value slot of a branch node.
    pub fn value(&self) -> Result<Vec<u8>, Error> {
        let decoded = self.decoded()?;
        let last = decoded.last().ok_or(Error::MalformedProof)?;
        Ok(rlp::to_bytes(last)?.to_vec())
    }

    /// The reference stored in branch child slot `index` (0..=15), ready to
    /// walk into: either a 32-byte hash or an inlined child encoding.
    pub fn branch_child_ref(&self, index: u8) -> Result<NodeRef, Error> {
        let decoded = self.decoded()?;
        if decoded.len() != 17 {
            return Err(Error::MalformedProof);
        }
        node_id(&decoded[index as usize])
    }

    /// The reference an extension node holds to its single child.
    pub fn extension_child_ref(&self) -> Result<NodeRef, Error> {
        let decoded = self.decoded()?;
        if decoded.len() != 2 {
            return Err(Error::MalformedProof);
        }
        node_id(&decoded[1])
    }
}

/// A child's node reference: the full RLP encoding if it is under 32 bytes on
/// the wire (inlined), else the raw 32-byte hash (the string payload, with
/// its own length header stripped).
fn node_id(item: &RlpItem<'_>) -> Result<NodeRef, Error> {
    let wire = rlp::to_rlp_bytes(item);
    if wire.len() < 32 {
        to_node_ref(wire)
    } else {
        let hash = rlp::to_bytes(item)?;
        if hash.len() != 32 {
            return Err(Error::MalformedProof);
        }
        to_node_ref(&hash)
    }
}

/// A just-built node's reference, as it should be embedded into its parent:
/// the full encoding verbatim if under 32 bytes, else its keccak-256 hash.
pub fn node_hash(encoded: &[u8]) -> NodeRef {
    if encoded.len() < 32 {
        to_node_ref(encoded).expect("encodings under 32 bytes always fit a node reference")
    } else {
        to_node_ref(&keccak256(encoded)).expect("a keccak-256 digest is always exactly 32 bytes")
    }
}

/// Embeds a node reference (as produced by [`node_hash`]) into a parent's RLP
/// item list: a short reference is already a complete RLP item and is
/// inserted verbatim; a 32-byte hash needs wrapping as an RLP string.
fn encode_ref(reference: &[u8]) -> Vec<u8> {
    if reference.len() < 32 {
        reference.to_vec()
    } else {
        rlp::encode_bytes(reference)
    }
}

/// Builds a hex-prefix-encoded path: prefix nibble 2 (leaf) or 0 (extension)
/// when `key` has even length, 3 or 1 plus no pad nibble when odd.
pub fn add_hex_prefix(key: &[u8], is_leaf: bool) -> Vec<u8> {
    let odd = key.len() % 2 == 1;
    let prefix = match (is_leaf, odd) {
        (false, false) => 0,
        (false, true) => 1,
        (true, false) => 2,
        (true, true) => 3,
    };
    let mut nibbles = Vec::with_capacity(key.len() + 2);
    nibbles.push(prefix);
    if !odd {
        nibbles.push(0);
    }
    nibbles.extend_from_slice(key);
    nibbles_to_bytes(&nibbles)
}

/// Strips the hex-prefix nibble (and pad nibble, if present) from an already
/// nibble-expanded path.
pub fn remove_hex_prefix(path: &[u8]) -> Vec<u8> {
    let first = path.first().copied().unwrap_or(0);
    debug_assert!(matches!(first, 0 | 1 | 2 | 3), "path must carry a valid hex-prefix nibble");
    let drop = if first == 0 || first == 2 { 2 } else { 1 };
    path.get(drop..).map(<[u8]>::to_vec).unwrap_or_default()
}

/// Builds a leaf node for `key` (nibbles, unprefixed) and `value`.
pub fn make_leaf_node(key: &[u8], value: &[u8]) -> TrieNode {
    let path = add_hex_prefix(key, true);
    let encoded = rlp::encode_list(&[rlp::encode_bytes(&path), rlp::encode_bytes(value)]);
    TrieNode { encoded }
}

/// Builds an extension node for `key` (nibbles, unprefixed) pointing at
/// `child_ref` (as produced by [`node_hash`]).
pub fn make_extension_node(key: &[u8], child_ref: &[u8]) -> TrieNode {
    let path = add_hex_prefix(key, false);
    let encoded = rlp::encode_list(&[rlp::encode_bytes(&path), encode_ref(child_ref)]);
    TrieNode { encoded }
}

/// Builds a branch node with all 17 slots empty.
pub fn make_empty_branch_node() -> TrieNode {
    let empty_slot = vec![EMPTY_STRING_RLP];
    let items: Vec<Vec<u8>> = core::iter::repeat(empty_slot).take(17).collect();
    TrieNode { encoded: rlp::encode_list(&items) }
}

/// Returns a copy of `branch` with its value slot (index 16) set to `value`.
pub fn edit_branch_value(branch: &TrieNode, value: &[u8]) -> Result<TrieNode, Error> {
    edit_branch_slot(branch, 16, &rlp::encode_bytes(value))
}

/// Returns a copy of `branch` with child slot `index` set to `child_ref` (as
/// produced by [`node_hash`]).
pub fn edit_branch_index(branch: &TrieNode, index: u8, child_ref: &[u8]) -> Result<TrieNode, Error> {
    edit_branch_slot(branch, index, &encode_ref(child_ref))
}

fn edit_branch_slot(branch: &TrieNode, slot: u8, new_item: &[u8]) -> Result<TrieNode, Error> {
    let decoded = branch.decoded()?;
    if decoded.len() != 17 {
        return Err(Error::MalformedProof);
    }
    let mut items: Vec<Vec<u8>> = decoded.iter().map(|item| rlp::to_rlp_bytes(item).to_vec()).collect();
    items[slot as usize] = new_item.to_vec();
    Ok(TrieNode { encoded: rlp::encode_list(&items) })
}

/// Decodes the outer RLP list of a proof into its constituent nodes.
pub fn parse_proof(rlp_proof: &[u8]) -> Result<Vec<TrieNode>, Error> {
    let top = rlp::to_item(rlp_proof)?;
    let items = rlp::to_list(&top)?;
    items
        .into_iter()
        .map(|item| TrieNode::from_encoded(rlp::to_rlp_bytes(&item).to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keccak::keccak256;

    #[test]
    fn hex_prefix_round_trip() {
        for (key, is_leaf) in [
            (vec![0xA, 0x7, 0x1, 0x1, 0x3, 0x5, 0x5], true),
            (vec![0xA, 0x7, 0x1, 0x1, 0x3, 0x5], true),
            (vec![], false),
            (vec![0x1], true),
        ] {
            let path = add_hex_prefix(&key, is_leaf);
            let nibbles = bytes_to_nibbles(&path);
            assert_eq!(remove_hex_prefix(&nibbles), key);
        }
    }

    #[test]
    fn leaf_node_shape() {
        let node = make_leaf_node(&[0xA, 0x7], b"hello");
        assert_eq!(node.node_type().unwrap(), NodeType::Leaf);
        assert_eq!(node.key().unwrap(), vec![0xA, 0x7]);
        assert_eq!(node.value().unwrap(), b"hello".to_vec());
    }

    #[test]
    fn empty_branch_edit_round_trip() {
        let branch = make_empty_branch_node();
        assert_eq!(branch.node_type().unwrap(), NodeType::Branch);
        let with_value = edit_branch_value(&branch, b"v").unwrap();
        assert_eq!(with_value.value().unwrap(), b"v".to_vec());

        let child = make_leaf_node(&[0x1], b"child");
        let reference = node_hash(&child.encoded);
        let with_child = edit_branch_index(&branch, 3, &reference).unwrap();
        assert_eq!(with_child.branch_child_ref(3).unwrap(), reference);
        // Untouched slots stay empty.
        assert_eq!(with_child.branch_child_ref(0).unwrap().as_slice(), [EMPTY_STRING_RLP]);
    }

    #[test]
    fn node_hash_size_rule() {
        let small = make_leaf_node(&[0x1], b"x");
        assert!(small.encoded.len() < 32);
        assert_eq!(node_hash(&small.encoded).as_slice(), small.encoded.as_slice());

        let big = make_leaf_node(&[0x1; 40], &[0xAB; 40]);
        assert!(big.encoded.len() >= 32);
        assert_eq!(node_hash(&big.encoded).as_slice(), keccak256(&big.encoded).as_slice());
    }

    #[test]
    fn oversized_child_reference_is_rejected() {
        // A branch child slot whose string payload is well-formed RLP but
        // isn't a canonical 32-byte hash (here, 40 bytes) must be reported as
        // a malformed proof, not accepted or allowed to panic.
        let bogus_hash = rlp::encode_bytes(&[0xAB; 40]);
        let mut slots: Vec<Vec<u8>> = core::iter::repeat(vec![EMPTY_STRING_RLP]).take(17).collect();
        slots[0] = bogus_hash;
        let branch = TrieNode { encoded: rlp::encode_list(&slots) };
        assert!(matches!(branch.branch_child_ref(0), Err(Error::MalformedProof)));
    }

    #[test]
    fn empty_sentinel_is_recognized() {
        let node = TrieNode::from_encoded(vec![EMPTY_STRING_RLP]).unwrap();
        assert!(node.is_empty());
        assert_eq!(node.node_type().unwrap(), NodeType::Empty);
    }
}
