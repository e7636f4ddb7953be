//! Error kinds for trie operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to tell a missing key apart from a corrupt
/// proof or a bug in the trie itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // Lookup outcomes
    // =========================================================================
    /// Traversal reached an unset slot where continuation was required
    EmptyNodeEncountered,

    /// A leaf or extension path mismatched the queried key
    KeyNotFound,

    /// The key ends at a branch that carries no value
    NodeHasNoValue,

    // =========================================================================
    // Input errors
    // =========================================================================
    /// A nibble path was built from bytes of the wrong arity or range
    MalformedInput,

    /// Canonical (RLP) encoding or decoding of a node failed
    EncodingFailure,

    // =========================================================================
    // Proof errors
    // =========================================================================
    /// Missing preimage, undecodable node or path divergence while verifying
    ProofVerificationFailure,

    // =========================================================================
    // Bugs
    // =========================================================================
    /// The trie reached a state its construction rules forbid
    InvariantViolation,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::EmptyNodeEncountered => "EmptyNodeEncountered",
            ErrorKind::KeyNotFound => "KeyNotFound",
            ErrorKind::NodeHasNoValue => "NodeHasNoValue",

            ErrorKind::MalformedInput => "MalformedInput",
            ErrorKind::EncodingFailure => "EncodingFailure",

            ErrorKind::ProofVerificationFailure => "ProofVerificationFailure",

            ErrorKind::InvariantViolation => "InvariantViolation",
        }
    }

    /// Check if this kind only reports that a key is absent
    pub fn is_absent(&self) -> bool {
        matches!(
            self,
            ErrorKind::EmptyNodeEncountered | ErrorKind::KeyNotFound | ErrorKind::NodeHasNoValue
        )
    }

    /// Check if this kind points at a bug rather than bad input
    pub fn is_defect(&self) -> bool {
        matches!(self, ErrorKind::EncodingFailure | ErrorKind::InvariantViolation)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
