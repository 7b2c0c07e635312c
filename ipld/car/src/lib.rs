// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

mod block;
mod error;
mod util;

use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Write};

use cid::Cid;
use ipldstore_blockstore::{multicodec, Blockstore};
use ipldstore_encoding::{from_slice, to_vec, Ipld};
use log::debug;

pub use block::Block;
pub use error::Error;
use util::{ld_read, ld_write, read_node, varint_len};

/// CAR file header
#[derive(Debug, Clone, PartialEq)]
pub struct CarHeader {
    pub roots: Vec<Cid>,
    pub version: u64,
}

impl CarHeader {
    /// Creates a new CAR file header
    pub fn new(roots: Vec<Cid>, version: u64) -> Self {
        Self { roots, version }
    }

    /// Writes the header as a length-delimited dag-cbor map.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<u64, Error> {
        let mut map = BTreeMap::new();
        map.insert("version".to_string(), Ipld::Integer(self.version as i128));
        map.insert(
            "roots".to_string(),
            Ipld::List(self.roots.iter().copied().map(Ipld::Link).collect()),
        );
        let bytes = to_vec(&Ipld::Map(map))?;
        ld_write(writer, &bytes)
    }

    /// Reads a length-delimited dag-cbor header and picks it apart.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let buf =
            ld_read(reader)?.ok_or_else(|| Error::Malformed("missing header".to_string()))?;
        Self::decode(&buf)
    }

    fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let node = from_slice(bytes).map_err(|e| Error::Malformed(e.to_string()))?;
        let Ipld::Map(map) = node else {
            return Err(Error::Malformed("header is not a map".to_string()));
        };
        match map.get("version") {
            Some(Ipld::Integer(1)) => {}
            Some(_) => return Err(Error::Malformed("CAR is not version 1".to_string())),
            None => return Err(Error::Malformed("header has no version".to_string())),
        }
        let Some(Ipld::List(roots)) = map.get("roots") else {
            return Err(Error::Malformed("header has no roots".to_string()));
        };
        let roots = roots
            .iter()
            .map(|root| match root {
                Ipld::Link(cid) => Ok(*cid),
                _ => Err(Error::Malformed("roots must be CIDs".to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { roots, version: 1 })
    }
}

impl From<Vec<Cid>> for CarHeader {
    fn from(roots: Vec<Cid>) -> Self {
        Self { roots, version: 1 }
    }
}

/// Byte range a block's payload occupies in the stream it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLocation {
    pub payload_offset: u64,
    pub payload_size: u64,
}

/// Reads CAR v1 streams block by block, verifying every block against its
/// CID.
pub struct CarReader<R> {
    reader: R,
    pub header: CarHeader,
    position: u64,
}

impl<R> CarReader<R>
where
    R: Read,
{
    /// Parses the header, leaving the reader at the first block.
    pub fn new(mut reader: R) -> Result<Self, Error> {
        let buf = ld_read(&mut reader)?
            .ok_or_else(|| Error::Malformed("missing header".to_string()))?;
        let header = CarHeader::decode(&buf)?;
        let position = varint_len(buf.len() as u64) + buf.len() as u64;
        Ok(CarReader {
            reader,
            header,
            position,
        })
    }

    /// Returns the next block in the stream, or `None` once it is
    /// exhausted.
    pub fn next_block(&mut self) -> Result<Option<Block>, Error> {
        Ok(self.next_block_located()?.map(|(block, _)| block))
    }

    /// Like [`CarReader::next_block`], but also reports where the block's
    /// payload sits in the stream.
    pub fn next_block_located(&mut self) -> Result<Option<(Block, BlockLocation)>, Error> {
        let Some((cid, data)) = read_node(&mut self.reader)? else {
            return Ok(None);
        };
        let cid_len = cid.to_bytes().len() as u64;
        let frame_len = cid_len + data.len() as u64;
        let location = BlockLocation {
            payload_offset: self.position + varint_len(frame_len) + cid_len,
            payload_size: data.len() as u64,
        };
        self.position += varint_len(frame_len) + frame_len;
        let block = Block { cid, data };
        block.validate()?;
        Ok(Some((block, location)))
    }
}

/// Loads a CAR stream into a blockstore, returning the roots declared by
/// its header, normalized to the store's keying.
pub fn load_car<B, R>(store: &B, reader: R) -> Result<Vec<Cid>, Error>
where
    B: Blockstore,
    R: Read,
{
    let mut reader = CarReader::new(reader)?;
    let mut blocks = 0usize;
    while let Some(block) = reader.next_block()? {
        store.put_raw(&block.data, block.cid.codec())?;
        blocks += 1;
    }
    debug!("imported {} blocks from a CAR stream", blocks);
    reader
        .header
        .roots
        .into_iter()
        .map(|root| Ok(store.normalize_cid(root)?))
        .collect()
}

/// Writes the DAG reachable from `root` as a single-rooted CAR v1 stream,
/// returning the number of bytes written.
///
/// Blocks are emitted in depth-first pre-order; a shared sub-DAG is
/// emitted the first time it is reached.
pub fn export_car<B, W>(store: &B, root: Cid, writer: &mut W) -> Result<u64, Error>
where
    B: Blockstore,
    W: Write,
{
    let header = CarHeader::from(vec![root]);
    let mut written = header.write(writer)?;
    let mut seen = HashSet::new();
    written += write_dag(store, root, writer, &mut seen)?;
    debug!("exported {} blocks, {} bytes", seen.len(), written);
    Ok(written)
}

fn write_dag<B, W>(
    store: &B,
    root: Cid,
    writer: &mut W,
    seen: &mut HashSet<Cid>,
) -> Result<u64, Error>
where
    B: Blockstore,
    W: Write,
{
    if !seen.insert(root) {
        return Ok(0);
    }
    let data = store.get_raw(&root)?;
    let links = if root.codec() == multicodec::DAG_CBOR {
        let node = from_slice(&data)?;
        let mut links = Vec::new();
        node.references(&mut links);
        links
    } else {
        Vec::new()
    };
    let mut written = ld_write(writer, &[root.to_bytes(), data].concat())?;
    for link in links {
        written += write_dag(store, link, writer, seen)?;
    }
    Ok(written)
}
