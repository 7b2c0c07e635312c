// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use cid::Cid;
use ipldstore_blockstore::{multicodec, Blockstore};
use libipld::Ipld;

use crate::{from_slice, to_vec, Error};

/// A block's decoded form: opaque bytes under the `raw` codec, or a
/// dag-cbor node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Raw(Vec<u8>),
    Node(Ipld),
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Raw(bytes)
    }
}

impl From<Ipld> for Value {
    fn from(node: Ipld) -> Self {
        Value::Node(node)
    }
}

/// Wrapper for a blockstore to insert and retrieve decoded values with
/// codec dispatch on the CID.
pub trait ValueStore: Blockstore {
    /// Decode the block behind `cid` as a dag-cbor node.
    fn get_cbor(&self, cid: &Cid) -> Result<Ipld, Error> {
        let bytes = self.get_raw(cid)?;
        from_slice(&bytes)
    }

    /// Encode a node as dag-cbor and insert it.
    fn put_cbor(&self, node: &Ipld) -> Result<Cid, Error> {
        let bytes = to_vec(node)?;
        Ok(self.put_raw(&bytes, multicodec::DAG_CBOR)?)
    }

    /// Fetch a block and decode it according to its CID's codec.
    fn get_value(&self, cid: &Cid) -> Result<Value, Error> {
        match cid.codec() {
            multicodec::RAW => Ok(Value::Raw(self.get_raw(cid)?)),
            multicodec::DAG_CBOR => Ok(Value::Node(self.get_cbor(cid)?)),
            other => Err(ipldstore_blockstore::Error::UnsupportedCodec(other).into()),
        }
    }

    /// Insert a value under the codec matching its form.
    fn put_value(&self, value: &Value) -> Result<Cid, Error> {
        match value {
            Value::Raw(bytes) => Ok(self.put_raw(bytes, multicodec::RAW)?),
            Value::Node(node) => self.put_cbor(node),
        }
    }
}

impl<B: Blockstore> ValueStore for B {}
