//! # Merkle Proofs
//!
//! Generate and verify proofs of inclusion for keys in the trie.
//!
//! Two proof shapes are produced from the same lookup walk:
//! - [`TraceProof`]: the encodings of the visited nodes, root first.
//! - [`ProofDb`]: a hash-addressed preimage store. Verification starts from a
//!   root hash and only ever looks nodes up by digest, so the store needs no
//!   ordering.

use std::collections::HashMap;

use alloy_primitives::{keccak256, Bytes, B256};
use mpt_error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::nibbles::{hex_prefix, Nibbles};
use crate::node::HASH_LEN;
use crate::raw::RawNode;
use crate::trie::Trie;

/// Capability surface of a proof preimage store
pub trait ProofStore {
    /// Store a node encoding under its hash
    fn put(&mut self, hash: B256, node: Vec<u8>);

    /// Remove the entry for hash
    fn delete(&mut self, hash: &B256);

    /// Check if hash has an entry
    fn has(&self, hash: &B256) -> bool;

    /// Get the node encoding stored under hash
    fn get(&self, hash: &B256) -> Option<&[u8]>;

    /// All stored encodings, for sending a proof as a flat list
    fn serialize(&self) -> Vec<Vec<u8>>;
}

/// In-memory proof store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofDb {
    nodes: HashMap<B256, Vec<u8>>,
}

impl ProofDb {
    pub fn new() -> Self {
        ProofDb { nodes: HashMap::new() }
    }

    /// Rebuild a store from a flat list of node encodings, keying each by
    /// its Keccak-256 hash
    pub fn from_nodes<I>(nodes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Vec<u8>>,
    {
        let mut db = ProofDb::new();
        for node in nodes {
            let node = node.into();
            db.put(keccak256(&node), node);
        }
        db
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl ProofStore for ProofDb {
    fn put(&mut self, hash: B256, node: Vec<u8>) {
        trace!(target: "trie::proof", %hash, len = node.len(), "storing proof node");
        self.nodes.insert(hash, node);
    }

    fn delete(&mut self, hash: &B256) {
        self.nodes.remove(hash);
    }

    fn has(&self, hash: &B256) -> bool {
        self.nodes.contains_key(hash)
    }

    fn get(&self, hash: &B256) -> Option<&[u8]> {
        self.nodes.get(hash).map(Vec::as_slice)
    }

    fn serialize(&self) -> Vec<Vec<u8>> {
        let mut entries: Vec<_> = self.nodes.iter().collect();
        entries.sort_by_key(|(hash, _)| **hash);
        entries.into_iter().map(|(_, node)| node.clone()).collect()
    }
}

/// Encodings of the nodes on a lookup path, root first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceProof {
    /// Serialized nodes in visiting order
    pub nodes: Vec<Bytes>,
    /// Hex-prefix encoding of the full key path. Informational only: it uses
    /// the leaf flag when the walk ended at a leaf and the extension flag when
    /// it ended at a branch value.
    pub key_path: Bytes,
}

impl TraceProof {
    /// Hash-address the traced nodes so the trace can be checked with
    /// [`verify_proof`]
    pub fn to_proof_db(&self) -> ProofDb {
        ProofDb::from_nodes(self.nodes.iter().map(|node| node.to_vec()))
    }
}

impl Trie {
    /// Collect the encodings of every node on the lookup path for key.
    ///
    /// Fails like a lookup of an absent key: `EmptyNodeEncountered`,
    /// `KeyNotFound` or `NodeHasNoValue`.
    pub fn create_proof(&self, key: &[u8]) -> Result<TraceProof> {
        let mut nodes = Vec::new();
        let found = self
            .walk(key, |node| nodes.push(Bytes::from(node.serialize())))
            .map_err(|miss| {
                miss.into_error()
                    .with_operation("trie::create_proof")
                    .with_context("key", hex::encode(key))
            })?;

        let key_path = hex_prefix(Nibbles::from_bytes(key).as_slice(), found.at_leaf);
        Ok(TraceProof { nodes, key_path: key_path.into() })
    }

    /// Build a hash-addressed proof for key
    pub fn prove(&self, key: &[u8]) -> Result<ProofDb> {
        let mut proof = ProofDb::new();
        self.walk(key, |node| {
            let encoded = node.serialize();
            proof.put(keccak256(&encoded), encoded);
        })
        .map_err(|miss| {
            miss.into_error()
                .with_operation("trie::prove")
                .with_context("key", hex::encode(key))
        })?;
        Ok(proof)
    }
}

/// Verify that `proof` maps key to a value under `root` and return the value.
///
/// Only the store is consulted; every preimage is re-hashed before use. Any
/// missing node, hash mismatch, malformed node or divergence from the key
/// fails with `ProofVerificationFailure`.
pub fn verify_proof<S>(root: B256, key: &[u8], proof: &S) -> Result<Vec<u8>>
where
    S: ProofStore + ?Sized,
{
    let nibbles = Nibbles::from_bytes(key);
    let mut remaining = nibbles.as_slice();
    let mut node = resolve(proof, root)?;

    // every non-terminal node consumes at least one nibble
    for depth in 0..=nibbles.len() {
        let fail = |reason: &str| verification_failed(reason, key, depth);

        let items = node.as_list().ok_or_else(|| fail("node is not a list"))?;
        let child = match items.len() {
            2 => {
                let encoded_path = items[0].as_bytes().ok_or_else(|| fail("node path is not a string"))?;
                let (path, is_leaf) = Nibbles::from_hex_prefix(encoded_path)
                    .map_err(|err| err.with_kind(ErrorKind::ProofVerificationFailure))?;
                let matched = path.common_prefix_len(remaining);

                if is_leaf {
                    if matched != path.len() || matched != remaining.len() {
                        return Err(fail("leaf path diverges from key"));
                    }
                    let value = items[1].as_bytes().ok_or_else(|| fail("leaf value is not a string"))?;
                    return Ok(value.to_vec());
                }

                if path.is_empty() {
                    return Err(fail("extension with empty path"));
                }
                if matched < path.len() {
                    return Err(fail("extension path diverges from key"));
                }
                remaining = &remaining[matched..];
                &items[1]
            }

            17 => match remaining.split_first() {
                None => {
                    let value = items[16].as_bytes().ok_or_else(|| fail("branch value is not a string"))?;
                    if value.is_empty() {
                        return Err(fail("branch has no value"));
                    }
                    return Ok(value.to_vec());
                }
                Some((&nibble, rest)) => {
                    remaining = rest;
                    &items[nibble as usize]
                }
            },

            _ => return Err(fail("unexpected node arity").with_context("items", items.len().to_string())),
        };

        let next = match child {
            RawNode::List(_) => embedded(proof, child).map_err(|err| {
                err.with_context("key", hex::encode(key)).with_context("depth", depth.to_string())
            })?,
            RawNode::Bytes(reference) if reference.is_empty() => return Err(fail("empty child slot")),
            RawNode::Bytes(reference) if reference.len() == HASH_LEN => resolve(proof, B256::from_slice(reference))?,
            RawNode::Bytes(_) => return Err(fail("invalid child reference")),
        };
        node = next;
    }

    Err(verification_failed("proof does not terminate within the key length", key, nibbles.len()))
}

/// Take an embedded child as is, unless the store also carries an entry
/// under its hash that disagrees with it
fn embedded<S>(proof: &S, child: &RawNode) -> Result<RawNode>
where
    S: ProofStore + ?Sized,
{
    let encoded = child.encode_to_vec();
    let hash = keccak256(&encoded);
    match proof.get(&hash) {
        Some(stored) if stored != encoded.as_slice() => {
            debug!(target: "trie::proof", %hash, "embedded node differs from its proof entry");
            Err(Error::proof_failed("embedded node does not match its proof entry")
                .with_operation("proof::verify_proof")
                .with_context("hash", hash.to_string()))
        }
        _ => Ok(child.clone()),
    }
}

/// Fetch a preimage, check it against its hash and decode it
fn resolve<S>(proof: &S, hash: B256) -> Result<RawNode>
where
    S: ProofStore + ?Sized,
{
    let Some(encoded) = proof.get(&hash) else {
        debug!(target: "trie::proof", %hash, "missing proof node");
        return Err(Error::proof_failed("missing proof node")
            .with_operation("proof::verify_proof")
            .with_context("hash", hash.to_string()));
    };

    let actual = keccak256(encoded);
    if actual != hash {
        debug!(target: "trie::proof", expected = %hash, %actual, "proof node hash mismatch");
        return Err(Error::proof_failed("proof node does not match its hash")
            .with_operation("proof::verify_proof")
            .with_context("expected", hash.to_string())
            .with_context("actual", actual.to_string()));
    }

    RawNode::decode(encoded).map_err(|err| {
        err.with_kind(ErrorKind::ProofVerificationFailure)
            .with_operation("proof::verify_proof")
            .with_context("hash", hash.to_string())
    })
}

fn verification_failed(reason: &str, key: &[u8], depth: usize) -> Error {
    debug!(target: "trie::proof", depth, reason, "proof verification failed");
    Error::proof_failed(reason)
        .with_operation("proof::verify_proof")
        .with_context("key", hex::encode(key))
        .with_context("depth", depth.to_string())
}
