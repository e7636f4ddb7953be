//! The main Error type for mpt

use crate::ErrorKind;
use std::fmt;

/// The unified error type for all trie operations.
///
/// This error type provides:
/// - `kind`: What type of error occurred
/// - `message`: Human-readable description
/// - `operation`: What operation caused the error
/// - `context`: Key-value pairs for debugging
/// - `source`: The underlying error (if any)
///
/// # Example
///
/// ```rust
/// use mpt_error::{Error, ErrorKind};
///
/// let err = Error::new(ErrorKind::ProofVerificationFailure, "missing preimage")
///     .with_operation("proof::verify_proof")
///     .with_context("hash", "0x56e8...b421");
///
/// assert_eq!(err.kind(), ErrorKind::ProofVerificationFailure);
/// assert!(!err.is_absent());
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the operation that caused this error
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Get the context key-value pairs
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Get the source error (if any)
    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Set the operation that caused this error.
    ///
    /// If an operation was already set, the previous one is moved to context
    /// as "called" to preserve the call chain.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    /// Re-tag the error with another kind, keeping message, context and source.
    ///
    /// Used when a lower layer's failure changes meaning one level up, e.g. an
    /// RLP decode error inside proof verification.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        if self.kind != kind {
            self.context.push(("was", self.kind.to_string()));
            self.kind = kind;
        }
        self
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Check if this error only reports an absent key
    pub fn is_absent(&self) -> bool {
        self.kind.is_absent()
    }

    /// Check if this error points at a bug
    pub fn is_defect(&self) -> bool {
        self.kind.is_defect()
    }
}

// =============================================================================
// Display - compact, single-line format for logs
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.operation.is_empty() {
            write!(f, " at {}", self.operation)?;
        }

        if !self.context.is_empty() {
            write!(f, ", context {{ ")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} at {}", self.kind, self.operation)?;

        if !self.message.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Message: {}", self.message)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "    Source: {:?}", source)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    /// Create an EmptyNodeEncountered error
    pub fn empty_node() -> Self {
        Self::new(ErrorKind::EmptyNodeEncountered, "reached an empty node")
    }

    /// Create a KeyNotFound error
    pub fn key_not_found() -> Self {
        Self::new(ErrorKind::KeyNotFound, "key not found")
    }

    /// Create a NodeHasNoValue error
    pub fn no_value() -> Self {
        Self::new(ErrorKind::NodeHasNoValue, "node has no value")
    }

    /// Create a MalformedInput error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput, message)
    }

    /// Create an EncodingFailure error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EncodingFailure, message)
    }

    /// Create an InvariantViolation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation, message)
    }

    /// Create a ProofVerificationFailure error
    pub fn proof_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProofVerificationFailure, message)
    }
}
