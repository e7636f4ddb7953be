//! # MPT Node Types
//!
//! The MPT has three populated node types plus the empty sentinel:
//! 1. Leaf - stores a value at the end of a key
//! 2. Extension - shares a common prefix path
//! 3. Branch - 16-way branch point + optional value
//!
//! Children are owned directly by their parent. References to them are only
//! materialized while encoding, bottom-up: a child whose encoding is shorter
//! than a hash is embedded in the parent, anything longer is referenced by
//! its Keccak-256 digest.

use alloy_primitives::{b256, keccak256, B256};
use alloy_rlp::Encodable;

use crate::nibbles::Nibbles;
use crate::raw::RawNode;

/// Digest length, and the encoded size from which a child is hashed
/// instead of embedded
pub const HASH_LEN: usize = 32;

/// Number of child slots in a branch node
pub const BRANCH_WIDTH: usize = 16;

/// Empty trie root hash (keccak256(RLP("")))
pub const EMPTY_ROOT: B256 = b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// How a parent refers to a child in its encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    /// Raw value of a child encoding to fewer than 32 bytes
    Inline(RawNode),
    /// Digest of a child encoding to 32 bytes or more
    Hash(B256),
}

impl NodeRef {
    /// Get hash if this is a hash reference
    pub fn as_hash(&self) -> Option<B256> {
        match self {
            NodeRef::Hash(h) => Some(*h),
            NodeRef::Inline(_) => None,
        }
    }

    /// The item placed in the parent's list
    pub fn into_raw(self) -> RawNode {
        match self {
            NodeRef::Inline(raw) => raw,
            NodeRef::Hash(hash) => RawNode::Bytes(hash.to_vec()),
        }
    }
}

/// MPT node types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Node {
    /// Empty node (null)
    #[default]
    Empty,

    /// Leaf node: [encoded_path, value]
    /// The path is the remaining key nibbles
    Leaf { path: Nibbles, value: Vec<u8> },

    /// Extension node: [encoded_path, child]
    /// The path is never empty
    Extension { path: Nibbles, next: Box<Node> },

    /// Branch node: [child0, child1, ..., child15, value]
    /// Unset slots hold `Node::Empty`
    Branch {
        children: Box<[Node; BRANCH_WIDTH]>,
        value: Option<Vec<u8>>,
    },
}

impl Node {
    /// Create empty branch node
    pub fn empty_branch() -> Self {
        Node::Branch {
            children: Box::new(std::array::from_fn(|_| Node::Empty)),
            value: None,
        }
    }

    /// Create leaf node
    pub fn leaf(path: Nibbles, value: Vec<u8>) -> Self {
        Node::Leaf { path, value }
    }

    /// Create extension node
    pub fn extension(path: Nibbles, next: Node) -> Self {
        debug_assert!(!path.is_empty(), "extension path must not be empty");
        Node::Extension { path, next: Box::new(next) }
    }

    /// Check if node is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    /// Short name of the variant, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Empty => "empty",
            Node::Leaf { .. } => "leaf",
            Node::Extension { .. } => "extension",
            Node::Branch { .. } => "branch",
        }
    }

    /// Structural value handed to the canonical encoding
    pub fn raw(&self) -> RawNode {
        match self {
            Node::Empty => RawNode::empty(),

            Node::Leaf { path, value } => RawNode::List(vec![
                RawNode::Bytes(path.to_hex_prefix(true)),
                RawNode::Bytes(value.clone()),
            ]),

            Node::Extension { path, next } => RawNode::List(vec![
                RawNode::Bytes(path.to_hex_prefix(false)),
                next.reference().into_raw(),
            ]),

            Node::Branch { children, value } => {
                let mut items = Vec::with_capacity(BRANCH_WIDTH + 1);
                for child in children.iter() {
                    items.push(child.reference().into_raw());
                }
                items.push(RawNode::Bytes(value.clone().unwrap_or_default()));
                RawNode::List(items)
            }
        }
    }

    /// Reference a parent uses for this node.
    ///
    /// Each call encodes the subtree once, children first.
    pub fn reference(&self) -> NodeRef {
        let raw = self.raw();
        if raw.length() >= HASH_LEN {
            NodeRef::Hash(keccak256(raw.encode_to_vec()))
        } else {
            NodeRef::Inline(raw)
        }
    }

    /// RLP encoding of this node
    pub fn serialize(&self) -> Vec<u8> {
        self.raw().encode_to_vec()
    }

    /// Keccak-256 of the encoding; `EMPTY_ROOT` for the empty node
    pub fn hash(&self) -> B256 {
        if self.is_empty() {
            return EMPTY_ROOT;
        }
        keccak256(self.serialize())
    }
}
