//! # Raw node values
//!
//! The structural value a node hands to the canonical encoding: a byte string
//! or a list of raw values. Leaf and extension nodes are 2-item lists, branch
//! nodes 17-item lists, and small children are embedded as nested lists.

use alloy_rlp::{BufMut, Encodable, Header};
use mpt_error::{Error, Result};

/// Deepest list nesting accepted when decoding. Real nodes stay far below
/// this since every embedded child is shorter than a hash.
const MAX_NESTING: usize = 32;

/// A byte string or a list, the shape RLP encodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawNode {
    /// RLP string
    Bytes(Vec<u8>),
    /// RLP list
    List(Vec<RawNode>),
}

impl RawNode {
    /// The empty byte string, used for unset branch slots and values
    pub fn empty() -> Self {
        RawNode::Bytes(Vec::new())
    }

    /// Get the byte string, if this is one
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RawNode::Bytes(bytes) => Some(bytes),
            RawNode::List(_) => None,
        }
    }

    /// Get the list items, if this is a list
    pub fn as_list(&self) -> Option<&[RawNode]> {
        match self {
            RawNode::List(items) => Some(items),
            RawNode::Bytes(_) => None,
        }
    }

    /// RLP encode into a fresh buffer
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        self.encode(&mut out);
        out
    }

    /// Decode exactly one RLP item spanning all of `data`
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let node = decode_item(&mut buf, 0)?;
        if !buf.is_empty() {
            return Err(Error::encoding("trailing bytes after node")
                .with_operation("raw::decode")
                .with_context("trailing", buf.len().to_string()));
        }
        Ok(node)
    }

    fn payload_length(items: &[RawNode]) -> usize {
        items.iter().map(Encodable::length).sum()
    }
}

impl Encodable for RawNode {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            RawNode::Bytes(bytes) => bytes.as_slice().encode(out),
            RawNode::List(items) => {
                Header { list: true, payload_length: Self::payload_length(items) }.encode(out);
                for item in items {
                    item.encode(out);
                }
            }
        }
    }

    fn length(&self) -> usize {
        match self {
            RawNode::Bytes(bytes) => bytes.as_slice().length(),
            RawNode::List(items) => {
                let payload_length = Self::payload_length(items);
                Header { list: true, payload_length }.length() + payload_length
            }
        }
    }
}

fn decode_item(buf: &mut &[u8], depth: usize) -> Result<RawNode> {
    if depth > MAX_NESTING {
        return Err(Error::encoding("list nesting too deep").with_operation("raw::decode"));
    }

    let header = Header::decode(buf)
        .map_err(|err| Error::encoding("invalid RLP header").with_operation("raw::decode").set_source(err))?;
    if buf.len() < header.payload_length {
        return Err(Error::encoding("RLP payload shorter than its header")
            .with_operation("raw::decode")
            .with_context("expected", header.payload_length.to_string())
            .with_context("actual", buf.len().to_string()));
    }

    let (payload, rest) = buf.split_at(header.payload_length);
    *buf = rest;

    if !header.list {
        return Ok(RawNode::Bytes(payload.to_vec()));
    }

    let mut payload = payload;
    let mut items = Vec::new();
    while !payload.is_empty() {
        items.push(decode_item(&mut payload, depth + 1)?);
    }
    Ok(RawNode::List(items))
}
