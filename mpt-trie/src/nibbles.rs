//! # Nibbles
//!
//! Keys in the MPT are represented as nibbles (half-bytes / 4 bits).
//! This allows branching on 16 possible values at each node.

use mpt_error::{Error, Result};
use std::fmt;

/// A sequence of nibbles (4-bit values)
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Nibbles {
    /// The nibble data, one nibble per byte
    data: Vec<u8>,
}

impl Nibbles {
    /// Create empty nibbles
    pub fn new() -> Self {
        Nibbles { data: Vec::new() }
    }

    /// Create from bytes (each byte becomes 2 nibbles)
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = Vec::with_capacity(bytes.len() * 2);
        for byte in bytes {
            data.push(byte >> 4); // High nibble
            data.push(byte & 0x0f); // Low nibble
        }
        Nibbles { data }
    }

    /// Create from bytes that each already hold one nibble.
    ///
    /// Fails if any byte is outside `0..16`.
    pub fn from_nibble_bytes(nibbles: Vec<u8>) -> Result<Self> {
        if let Some(pos) = nibbles.iter().position(|n| *n > 0x0f) {
            return Err(Error::malformed("nibble out of range")
                .with_operation("nibbles::from_nibble_bytes")
                .with_context("index", pos.to_string())
                .with_context("byte", format!("{:#04x}", nibbles[pos])));
        }
        Ok(Nibbles { data: nibbles })
    }

    /// Create from a nibble slice produced by trie traversal
    pub(crate) fn from_slice(nibbles: &[u8]) -> Self {
        debug_assert!(nibbles.iter().all(|n| *n < 16));
        Nibbles { data: nibbles.to_vec() }
    }

    /// Decode hex prefix encoded data into `(path, is_leaf)`.
    ///
    /// The first nibble carries the flags: bit 0 = odd length, bit 1 = leaf.
    pub fn from_hex_prefix(encoded: &[u8]) -> Result<(Self, bool)> {
        let Some(&first) = encoded.first() else {
            return Err(Error::malformed("empty hex-prefix path").with_operation("nibbles::from_hex_prefix"));
        };

        let flag = first >> 4;
        if flag > 3 {
            return Err(Error::malformed("invalid hex-prefix flag")
                .with_operation("nibbles::from_hex_prefix")
                .with_context("flag", flag.to_string()));
        }
        let is_leaf = flag & 2 == 2;
        let odd = flag & 1 == 1;

        let mut data = Vec::with_capacity(encoded.len() * 2);
        if odd {
            // First byte contains a nibble
            data.push(first & 0x0f);
        } else if first & 0x0f != 0 {
            return Err(Error::malformed("non-zero hex-prefix padding")
                .with_operation("nibbles::from_hex_prefix")
                .with_context("first", format!("{:#04x}", first)));
        }

        for byte in &encoded[1..] {
            data.push(byte >> 4);
            data.push(byte & 0x0f);
        }

        Ok((Nibbles { data }, is_leaf))
    }

    /// Encode to hex prefix format
    pub fn to_hex_prefix(&self, is_leaf: bool) -> Vec<u8> {
        hex_prefix(&self.data, is_leaf)
    }

    /// Convert back to bytes (each 2 nibbles -> 1 byte)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.data.len() % 2 != 0 {
            return Err(Error::malformed("cannot pack an odd number of nibbles")
                .with_operation("nibbles::to_bytes")
                .with_context("len", self.data.len().to_string()));
        }

        Ok(self.data.chunks(2).map(|chunk| chunk[0] << 4 | chunk[1]).collect())
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get nibble at index
    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    /// Find common prefix length with a nibble slice
    pub fn common_prefix_len(&self, other: &[u8]) -> usize {
        common_prefix_len(&self.data, other)
    }

    /// Get as slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Length of the shared prefix of two nibble slices
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Hex-prefix encode a nibble slice.
///
/// Flag nibble is `2 * is_leaf + (len % 2)`; an even path gets a zero
/// padding nibble after the flag so the result always packs into bytes.
pub fn hex_prefix(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let prefix = if is_leaf { 2 } else { 0 };
    let mut encoded = Vec::with_capacity(nibbles.len() / 2 + 1);

    let rest = if nibbles.len() % 2 == 1 {
        // First byte: flag | first nibble
        encoded.push((prefix + 1) << 4 | nibbles[0]);
        &nibbles[1..]
    } else {
        encoded.push(prefix << 4);
        nibbles
    };

    for chunk in rest.chunks(2) {
        encoded.push(chunk[0] << 4 | chunk[1]);
    }

    encoded
}

impl fmt::Debug for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nibbles(")?;
        for n in &self.data {
            write!(f, "{:x}", n)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in &self.data {
            write!(f, "{:x}", n)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpt_error::ErrorKind;

    #[test]
    fn test_from_bytes() {
        let nibbles = Nibbles::from_bytes(&[0xab, 0xcd]);
        assert_eq!(nibbles.len(), 4);
        assert_eq!(nibbles.get(0), Some(0xa));
        assert_eq!(nibbles.get(1), Some(0xb));
        assert_eq!(nibbles.get(2), Some(0xc));
        assert_eq!(nibbles.get(3), Some(0xd));
    }

    #[test]
    fn test_from_nibble_bytes() {
        let nibbles = Nibbles::from_nibble_bytes(vec![0x1, 0xf, 0x0]).unwrap();
        assert_eq!(nibbles.as_slice(), &[0x1, 0xf, 0x0]);

        let err = Nibbles::from_nibble_bytes(vec![0x1, 0x10]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert_eq!(err.context()[0], ("index", "1".to_string()));
    }

    #[test]
    fn test_to_bytes() {
        let nibbles = Nibbles::from_slice(&[0xa, 0xb, 0xc, 0xd]);
        assert_eq!(nibbles.to_bytes().unwrap(), vec![0xab, 0xcd]);

        let odd = Nibbles::from_slice(&[0xa, 0xb, 0xc]);
        assert_eq!(odd.to_bytes().unwrap_err().kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn test_hex_prefix_leaf_odd() {
        let nibbles = Nibbles::from_slice(&[1, 2, 3]);
        let encoded = nibbles.to_hex_prefix(true);
        // Odd leaf: prefix = 3, first byte = 0x31
        assert_eq!(encoded, vec![0x31, 0x23]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_leaf_even() {
        let nibbles = Nibbles::from_slice(&[1, 2, 3, 4]);
        let encoded = nibbles.to_hex_prefix(true);
        // Even leaf: prefix = 2, first byte = 0x20
        assert_eq!(encoded, vec![0x20, 0x12, 0x34]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_extension_odd() {
        let nibbles = Nibbles::from_slice(&[1, 2, 3]);
        let encoded = nibbles.to_hex_prefix(false);
        // Odd extension: prefix = 1, first byte = 0x11
        assert_eq!(encoded, vec![0x11, 0x23]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(!is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_extension_even() {
        let nibbles = Nibbles::from_slice(&[1, 2, 3, 4]);
        let encoded = nibbles.to_hex_prefix(false);
        // Even extension: prefix = 0, first byte = 0x00
        assert_eq!(encoded, vec![0x00, 0x12, 0x34]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(!is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_empty_path() {
        assert_eq!(hex_prefix(&[], true), vec![0x20]);
        assert_eq!(hex_prefix(&[], false), vec![0x00]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&[0x20]).unwrap();
        assert!(is_leaf);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_hex_prefix_rejects_garbage() {
        assert!(Nibbles::from_hex_prefix(&[]).is_err());
        // flag nibble 4 is not a valid flag
        assert!(Nibbles::from_hex_prefix(&[0x40, 0x12]).is_err());
        // even form must pad with a zero nibble
        assert!(Nibbles::from_hex_prefix(&[0x25, 0x12]).is_err());
    }

    #[test]
    fn test_common_prefix() {
        let a = Nibbles::from_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(a.common_prefix_len(&[1, 2, 3, 6, 7]), 3);
        assert_eq!(a.common_prefix_len(&[1, 2]), 2);
        assert_eq!(a.common_prefix_len(&[]), 0);
        assert_eq!(common_prefix_len(&[9], &[1]), 0);
    }

    #[test]
    fn test_display() {
        let nibbles = Nibbles::from_bytes(b"do");
        assert_eq!(nibbles.to_string(), "646f");
        assert_eq!(format!("{:?}", nibbles), "Nibbles(646f)");
    }
}
