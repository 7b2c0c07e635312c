// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

mod cbor_store;
pub mod json;

use libipld::cbor::DagCborCodec;
use libipld::codec::Codec;

pub use cbor_store::{Value, ValueStore};
pub use libipld::Ipld;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Encoding(String),
    #[error(transparent)]
    Blockstore(#[from] ipldstore_blockstore::Error),
}

/// Encode a value as deterministic DAG-CBOR: shortest-form integers,
/// length-first map key ordering, links under tag 42.
pub fn to_vec(node: &Ipld) -> Result<Vec<u8>, Error> {
    DagCborCodec
        .encode(node)
        .map_err(|e| Error::Encoding(e.to_string()))
}

/// Decode DAG-CBOR bytes into a value. The only tag accepted is 42.
pub fn from_slice(bytes: &[u8]) -> Result<Ipld, Error> {
    DagCborCodec
        .decode(bytes)
        .map_err(|e| Error::Encoding(e.to_string()))
}
