// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

//! Multicodec codes used across the store, as per the
//! [code table](https://github.com/multiformats/multicodec/blob/master/table.csv).

/// Opaque binary payload.
pub const RAW: u64 = 0x55;
/// Structured payload carrying CID links under CBOR tag 42.
pub const DAG_CBOR: u64 = 0x71;
/// Protobuf-framed UnixFS payload; accepted on import only.
pub const DAG_PB: u64 = 0x70;
/// sha2-256 multihash code.
pub const SHA2_256: u64 = 0x12;

/// Canonical name of a content codec, as understood by the IPFS HTTP API.
pub fn name(code: u64) -> Option<&'static str> {
    match code {
        RAW => Some("raw"),
        DAG_CBOR => Some("dag-cbor"),
        DAG_PB => Some("dag-pb"),
        _ => None,
    }
}
