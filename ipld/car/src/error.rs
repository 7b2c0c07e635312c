// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use cid::Cid;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed CAR: {0}")]
    Malformed(String),
    #[error("corrupt CAR: block {0} could not be verified")]
    Corrupt(Cid),
    #[error("unsupported multihash code 0x{0:x}")]
    UnsupportedHash(u64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Cid(#[from] cid::Error),
    #[error(transparent)]
    Encoding(#[from] ipldstore_encoding::Error),
    #[error(transparent)]
    Blockstore(#[from] ipldstore_blockstore::Error),
}
