// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use std::cell::RefCell;
use std::collections::HashMap;

use cid::Cid;
use multihash::{Code, MultihashDigest};

use super::{Blockstore, Error};

/// An in-memory blockstore keyed by CIDv1.
///
/// CIDv0 keys are upgraded to their CIDv1 form on every access, so blocks
/// imported from v0-addressed sources remain reachable through either form.
#[derive(Debug, Clone)]
pub struct MemoryBlockstore {
    blocks: RefCell<HashMap<Cid, Vec<u8>>>,
    mh_code: Code,
}

impl Default for MemoryBlockstore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlockstore {
    pub fn new() -> Self {
        Self::with_hash(Code::Sha2_256)
    }

    /// A store digesting new blocks with the given multihash function.
    pub fn with_hash(mh_code: Code) -> Self {
        Self {
            blocks: RefCell::new(HashMap::new()),
            mh_code,
        }
    }

    /// Number of blocks currently held.
    pub fn len(&self) -> usize {
        self.blocks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.borrow().is_empty()
    }
}

impl Blockstore for MemoryBlockstore {
    fn get_raw(&self, cid: &Cid) -> Result<Vec<u8>, Error> {
        let k = self.normalize_cid(*cid)?;
        self.blocks
            .borrow()
            .get(&k)
            .cloned()
            .ok_or(Error::NotFound(*cid))
    }

    fn put_raw(&self, block: &[u8], codec: u64) -> Result<Cid, Error> {
        let mh = self.mh_code.digest(block);
        let k = Cid::new_v1(codec, mh);
        self.blocks.borrow_mut().insert(k, block.into());
        Ok(k)
    }

    fn has(&self, cid: &Cid) -> Result<bool, Error> {
        let k = self.normalize_cid(*cid)?;
        Ok(self.blocks.borrow().contains_key(&k))
    }

    fn normalize_cid(&self, cid: Cid) -> Result<Cid, Error> {
        Ok(cid.into_v1()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::multicodec;

    use super::*;

    #[test]
    fn put_then_get() {
        let bs = MemoryBlockstore::default();
        let k = bs.put_raw(b"foobar", multicodec::RAW).unwrap();
        assert_eq!(bs.get_raw(&k).unwrap(), b"foobar");
        assert!(bs.has(&k).unwrap());
        assert_eq!(bs.len(), 1);
    }

    #[test]
    fn put_is_deterministic() {
        let bs = MemoryBlockstore::default();
        let k1 = bs.put_raw(b"foobar", multicodec::RAW).unwrap();
        let k2 = bs.put_raw(b"foobar", multicodec::RAW).unwrap();
        assert_eq!(k1, k2);
        assert_eq!(bs.len(), 1);
    }

    #[test]
    fn missing_block_is_not_found() {
        let bs = MemoryBlockstore::default();
        let k = Cid::new_v1(multicodec::RAW, Code::Sha2_256.digest(b"absent"));
        assert!(!bs.has(&k).unwrap());
        assert!(matches!(bs.get_raw(&k), Err(Error::NotFound(c)) if c == k));
    }

    #[test]
    fn chunk_cid_text() {
        // A 5-byte zarr chunk stored raw under sha2-256 has a fixed base32
        // CIDv1 text form.
        let bs = MemoryBlockstore::default();
        let k = bs
            .put_raw(&[0x00, 0x01, 0x02, 0x03, 0x04], multicodec::RAW)
            .unwrap();
        assert_eq!(
            k.to_string(),
            "bafkreiaixnpf23vkyecj5xqispjq5ubcwgsntnnurw2bjby7khe4wnjihu"
        );
    }

    #[test]
    fn v0_lookup_is_normalized() {
        let bs = MemoryBlockstore::default();
        let digest = Code::Sha2_256.digest(b"node");
        let v1 = bs.put_raw(b"node", multicodec::DAG_PB).unwrap();
        let v0 = Cid::new_v0(digest).unwrap();
        assert_eq!(bs.normalize_cid(v0).unwrap(), v1);
        assert!(bs.has(&v0).unwrap());
        assert_eq!(bs.get_raw(&v0).unwrap(), b"node");
    }
}
