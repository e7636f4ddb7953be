//! # Patricia Trie
//!
//! The main trie data structure with get, put and root hash.
//!
//! The trie owns its whole node tree. `put` descends through `&mut Node`
//! slots; when a slot has to be restructured its owned pieces are moved out
//! with `std::mem::take` and the rebuilt subtree is written back into the
//! same slot.

use alloy_primitives::B256;
use mpt_error::{Error, Result};
use tracing::trace;

use crate::nibbles::Nibbles;
use crate::node::{Node, BRANCH_WIDTH};

/// Merkle Patricia Trie
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trie {
    /// Root node
    root: Node,
}

/// Successful end of a lookup walk
pub(crate) struct Found<'a> {
    pub value: &'a [u8],
    /// Whether the walk ended at a leaf (otherwise at a branch value)
    pub at_leaf: bool,
}

/// Why a lookup walk stopped without a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Miss {
    EmptyNode,
    KeyNotFound,
    NoValue,
}

impl Miss {
    pub fn into_error(self) -> Error {
        match self {
            Miss::EmptyNode => Error::empty_node(),
            Miss::KeyNotFound => Error::key_not_found(),
            Miss::NoValue => Error::no_value(),
        }
    }
}

impl Trie {
    /// Create new empty trie
    pub fn new() -> Self {
        Trie { root: Node::Empty }
    }

    /// Root hash; `EMPTY_ROOT` for an empty trie
    pub fn hash(&self) -> B256 {
        self.root.hash()
    }

    /// Check if trie is empty
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Root node
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Get value for key
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.walk(key, |_| {}).ok().map(|found| found.value)
    }

    /// Check if a value is stored under key
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Insert key-value pair, overwriting any previous value for key.
    ///
    /// Empty values are rejected with `MalformedInput`: a branch encodes an
    /// empty value the same as no value.
    pub fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<()> {
        if value.is_empty() {
            return Err(Error::malformed("empty value")
                .with_operation("trie::put")
                .with_context("key", hex::encode(key)));
        }

        let nibbles = Nibbles::from_bytes(key);
        insert_at(&mut self.root, nibbles.as_slice(), value)
            .map_err(|err| err.with_operation("trie::put").with_context("key", hex::encode(key)))
    }

    /// Insert every pair in order
    pub fn put_all<I, K, V>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: Into<Vec<u8>>,
    {
        for (key, value) in entries {
            self.put(key.as_ref(), value.into())?;
        }
        Ok(())
    }

    /// Walk the lookup path for key, calling `visit` on every populated node
    /// on the way, the terminal one included.
    pub(crate) fn walk<'a>(
        &'a self,
        key: &[u8],
        mut visit: impl FnMut(&'a Node),
    ) -> std::result::Result<Found<'a>, Miss> {
        let nibbles = Nibbles::from_bytes(key);
        let mut remaining = nibbles.as_slice();
        let mut node = &self.root;

        loop {
            if !node.is_empty() {
                visit(node);
            }

            match node {
                Node::Empty => return Err(Miss::EmptyNode),

                Node::Leaf { path, value } => {
                    let matched = path.common_prefix_len(remaining);
                    if matched != path.len() || matched != remaining.len() {
                        return Err(Miss::KeyNotFound);
                    }
                    return Ok(Found { value, at_leaf: true });
                }

                Node::Branch { children, value } => {
                    let Some((&nibble, rest)) = remaining.split_first() else {
                        return match value {
                            Some(value) => Ok(Found { value, at_leaf: false }),
                            None => Err(Miss::NoValue),
                        };
                    };
                    remaining = rest;
                    node = &children[nibble as usize];
                }

                Node::Extension { path, next } => {
                    let matched = path.common_prefix_len(remaining);
                    if matched < path.len() {
                        return Err(Miss::KeyNotFound);
                    }
                    remaining = &remaining[matched..];
                    node = &**next;
                }
            }
        }
    }
}

/// Insert below `slot`, which sits where `nibbles` is the rest of the key
fn insert_at(slot: &mut Node, nibbles: &[u8], value: Vec<u8>) -> Result<()> {
    match slot {
        Node::Empty => {
            *slot = Node::leaf(Nibbles::from_slice(nibbles), value);
        }

        Node::Leaf { path, value: existing } => {
            let matched = path.common_prefix_len(nibbles);

            // exact key: overwrite in place
            if matched == path.len() && matched == nibbles.len() {
                *existing = value;
                return Ok(());
            }

            let leaf_path = std::mem::take(path);
            let leaf_value = std::mem::take(existing);
            *slot = split_leaf(leaf_path, leaf_value, nibbles, matched, value);
        }

        Node::Branch { children, value: branch_value } => match nibbles.split_first() {
            None => *branch_value = Some(value),
            Some((&nibble, rest)) => return insert_at(&mut children[nibble as usize], rest, value),
        },

        Node::Extension { path, next } => {
            let matched = path.common_prefix_len(nibbles);

            if matched == path.len() {
                return insert_at(next, &nibbles[matched..], value);
            }
            if matched > nibbles.len() {
                return Err(Error::invariant("shared prefix longer than the remaining key")
                    .with_operation("trie::split_extension")
                    .with_context("matched", matched.to_string())
                    .with_context("remaining", nibbles.len().to_string()));
            }

            let ext_path = std::mem::take(path);
            let ext_next = std::mem::take(next.as_mut());
            *slot = split_extension(ext_path, ext_next, nibbles, matched, value);
        }
    }

    Ok(())
}

/// Replace a leaf whose path shares only `matched` nibbles with the new key
fn split_leaf(leaf_path: Nibbles, leaf_value: Vec<u8>, nibbles: &[u8], matched: usize, value: Vec<u8>) -> Node {
    trace!(
        target: "trie::put",
        matched,
        leaf = leaf_path.len(),
        key = nibbles.len(),
        "splitting leaf"
    );

    let path = leaf_path.as_slice();
    let mut children: [Node; BRANCH_WIDTH] = std::array::from_fn(|_| Node::Empty);
    let mut branch_value = None;

    // old key ends at the new branch
    if matched == path.len() {
        branch_value = Some(leaf_value);
    } else {
        children[path[matched] as usize] = Node::leaf(Nibbles::from_slice(&path[matched + 1..]), leaf_value);
    }

    // new key ends at the new branch
    if matched == nibbles.len() {
        branch_value = Some(value);
    } else {
        children[nibbles[matched] as usize] = Node::leaf(Nibbles::from_slice(&nibbles[matched + 1..]), value);
    }

    wrap_branch(&path[..matched], children, branch_value)
}

/// Replace an extension whose path diverges from the new key after `matched` nibbles
fn split_extension(ext_path: Nibbles, ext_next: Node, nibbles: &[u8], matched: usize, value: Vec<u8>) -> Node {
    trace!(
        target: "trie::put",
        matched,
        extension = ext_path.len(),
        key = nibbles.len(),
        "splitting extension"
    );

    let path = ext_path.as_slice();
    let mut children: [Node; BRANCH_WIDTH] = std::array::from_fn(|_| Node::Empty);
    let mut branch_value = None;

    // the diverging nibble moves into the slot, the rest stays an extension
    let tail = &path[matched + 1..];
    children[path[matched] as usize] = if tail.is_empty() {
        ext_next
    } else {
        Node::extension(Nibbles::from_slice(tail), ext_next)
    };

    if matched < nibbles.len() {
        children[nibbles[matched] as usize] = Node::leaf(Nibbles::from_slice(&nibbles[matched + 1..]), value);
    } else {
        branch_value = Some(value);
    }

    wrap_branch(&path[..matched], children, branch_value)
}

/// Build the branch and put it behind an extension for a non-empty shared prefix
fn wrap_branch(shared: &[u8], children: [Node; BRANCH_WIDTH], value: Option<Vec<u8>>) -> Node {
    let branch = Node::Branch { children: Box::new(children), value };
    if shared.is_empty() {
        branch
    } else {
        Node::extension(Nibbles::from_slice(shared), branch)
    }
}
