//! # Merkle Patricia Trie
//!
//! In-memory implementation of Ethereum's Modified Merkle Patricia Trie.
//!
//! Key features:
//! - Byte-string keys, split into nibbles and stored along compressed paths
//! - A root hash committing to the entire key-value set
//! - Proofs of inclusion that verify against nothing but the root hash
//!
//! ## Usage
//!
//! ```rust
//! use mpt_trie::{verify_proof, Trie};
//!
//! let mut trie = Trie::new();
//! trie.put(b"dog", b"puppy".to_vec())?;
//! trie.put(b"doge", b"coin".to_vec())?;
//!
//! let root = trie.hash();
//! let proof = trie.prove(b"doge")?;
//! assert_eq!(verify_proof(root, b"doge", &proof)?, b"coin".to_vec());
//! # Ok::<(), mpt_trie::Error>(())
//! ```

pub mod nibbles;
pub mod node;
pub mod proof;
pub mod raw;
pub mod trie;

#[cfg(test)]
mod proptests;

pub use mpt_error::{Error, ErrorKind, Result};
pub use nibbles::Nibbles;
pub use node::{Node, NodeRef, EMPTY_ROOT};
pub use proof::{verify_proof, ProofDb, ProofStore, TraceProof};
pub use raw::RawNode;
pub use trie::Trie;
