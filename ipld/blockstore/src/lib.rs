// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

mod memory;
pub mod multicodec;
mod remote;

use cid::Cid;

pub use memory::MemoryBlockstore;
pub use remote::{IpfsBlockstore, DEFAULT_HOST};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("block {0} not found")]
    NotFound(Cid),
    #[error("unsupported codec 0x{0:x}")]
    UnsupportedCodec(u64),
    #[error(transparent)]
    Cid(#[from] cid::Error),
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote store sent an invalid response: {0}")]
    InvalidResponse(String),
}

/// A store of content-addressed blocks.
///
/// Blocks are append-only: once a CID has been handed out, the bytes behind
/// it never change. Reads do not re-verify hashes; callers importing
/// untrusted data are expected to verify at the import boundary.
pub trait Blockstore {
    /// Get bytes from the store by CID, failing if the block is unknown.
    fn get_raw(&self, cid: &Cid) -> Result<Vec<u8>, Error>;

    /// Digest `block` with the store's default multihash, insert it under
    /// the resulting CIDv1 and return that CID. Idempotent: equal bytes
    /// yield equal CIDs.
    fn put_raw(&self, block: &[u8], codec: u64) -> Result<Cid, Error>;

    /// Check whether the store holds a block for this CID.
    fn has(&self, cid: &Cid) -> Result<bool, Error> {
        match self.get_raw(cid) {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Rewrite a CID into the form this store keys blocks under.
    fn normalize_cid(&self, cid: Cid) -> Result<Cid, Error> {
        Ok(cid)
    }
}

impl<B: Blockstore> Blockstore for &B {
    fn get_raw(&self, cid: &Cid) -> Result<Vec<u8>, Error> {
        (*self).get_raw(cid)
    }

    fn put_raw(&self, block: &[u8], codec: u64) -> Result<Cid, Error> {
        (*self).put_raw(block, codec)
    }

    fn has(&self, cid: &Cid) -> Result<bool, Error> {
        (*self).has(cid)
    }

    fn normalize_cid(&self, cid: Cid) -> Result<Cid, Error> {
        (*self).normalize_cid(cid)
    }
}
