// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use cid::Cid;
use multihash::{Code, MultihashDigest};

use super::error::Error;

/// IPLD Block
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub cid: Cid,
    pub data: Vec<u8>,
}

impl From<Block> for (Cid, Vec<u8>) {
    fn from(block: Block) -> Self {
        (block.cid, block.data)
    }
}

impl From<(Cid, Vec<u8>)> for Block {
    fn from((cid, data): (Cid, Vec<u8>)) -> Self {
        Block { cid, data }
    }
}

impl Block {
    /// Recompute the digest with the CID's own hash function and compare
    /// it against the CID.
    pub fn validate(&self) -> Result<(), Error> {
        let code = self.cid.hash().code();
        let code = Code::try_from(code).map_err(|_| Error::UnsupportedHash(code))?;
        if code.digest(&self.data).digest() != self.cid.hash().digest() {
            return Err(Error::Corrupt(self.cid));
        }
        Ok(())
    }
}

#[test]
fn test_validate() {
    let data: Vec<u8> = "foobar".into();
    // Valid v0 CID
    {
        let cid = Cid::new_v0(Code::Sha2_256.digest(&data)).unwrap();
        let block = Block {
            cid,
            data: data.clone(),
        };
        block.validate().unwrap();
    }

    // Valid v1 CID
    {
        let cid = Cid::new_v1(0x55, Code::Sha2_256.digest(&data));
        let block = Block {
            cid,
            data: data.clone(),
        };
        block.validate().unwrap();
    }

    // Invalid v0 CID
    {
        let cid = Cid::new_v0(Code::Sha2_256.digest(&data)).unwrap();
        let invalid_data: Vec<u8> = "different".into();
        let block = Block {
            cid,
            data: invalid_data,
        };
        assert!(matches!(block.validate(), Err(Error::Corrupt(c)) if c == cid));
    }

    // Invalid v1 CID
    {
        let cid = Cid::new_v1(0x55, Code::Sha2_256.digest(&data));
        let invalid_data: Vec<u8> = "different".into();
        let block = Block {
            cid,
            data: invalid_data,
        };
        assert!(matches!(block.validate(), Err(Error::Corrupt(c)) if c == cid));
    }
}
