//! # mpt-error
//!
//! Unified error handling for the mpt workspace.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what went wrong (e.g. KeyNotFound, InvariantViolation)
//! - **Classification**: `is_absent()` separates ordinary lookup misses from
//!   `is_defect()` bugs that must be surfaced
//! - **Error Context**: Operation name plus key/value pairs for locating the cause
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use mpt_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::KeyNotFound, "extension path diverged")
//!         .with_operation("trie::create_proof")
//!         .with_context("depth", "3"))
//! }
//!
//! assert!(example().unwrap_err().is_absent());
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, mpt_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context

mod error;
mod kind;

pub use error::Error;
pub use kind::ErrorKind;

/// Result type alias using the mpt Error
pub type Result<T> = std::result::Result<T, Error>;
