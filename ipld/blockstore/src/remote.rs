// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use cid::Cid;
use log::debug;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;

use super::{multicodec, Blockstore, Error};

/// API endpoint of a locally running IPFS daemon.
pub const DEFAULT_HOST: &str = "http://127.0.0.1:5001";

/// A blockstore backed by the HTTP API of a remote IPFS node.
///
/// Block bytes are shipped to `dag/put` (the node digests them and replies
/// with the CID) and fetched back through `block/get`. Every call is a
/// synchronous round-trip; any non-2xx status is fatal.
#[derive(Debug, Clone)]
pub struct IpfsBlockstore {
    host: String,
    mh_name: String,
    client: Client,
}

impl Default for IpfsBlockstore {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}

impl IpfsBlockstore {
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_hash(host, "sha2-256")
    }

    /// A store asking the remote node to digest blocks with the given
    /// multihash function, by name.
    pub fn with_hash(host: impl Into<String>, mh_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            mh_name: mh_name.into(),
            client: Client::new(),
        }
    }
}

impl Blockstore for IpfsBlockstore {
    fn get_raw(&self, cid: &Cid) -> Result<Vec<u8>, Error> {
        let text = cid.to_string();
        debug!("block/get {}", text);
        let res = self
            .client
            .post(format!("{}/api/v0/block/get", self.host))
            .query(&[("arg", text.as_str())])
            .send()?
            .error_for_status()?;
        Ok(res.bytes()?.to_vec())
    }

    fn put_raw(&self, block: &[u8], codec: u64) -> Result<Cid, Error> {
        let codec_name = multicodec::name(codec).ok_or(Error::UnsupportedCodec(codec))?;
        debug!("dag/put {} bytes as {}", block.len(), codec_name);
        let form = Form::new().part("data", Part::bytes(block.to_vec()).file_name("data"));
        let res = self
            .client
            .post(format!("{}/api/v0/dag/put", self.host))
            .query(&[
                ("store-codec", codec_name),
                ("input-codec", codec_name),
                ("hash", self.mh_name.as_str()),
            ])
            .multipart(form)
            .send()?
            .error_for_status()?;
        let reply: serde_json::Value = res.json()?;
        let text = reply["Cid"]["/"]
            .as_str()
            .ok_or_else(|| Error::InvalidResponse("dag/put reply carries no CID".into()))?;
        Ok(Cid::try_from(text)?)
    }
}
