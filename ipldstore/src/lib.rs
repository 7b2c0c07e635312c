// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

//! A mutable, hierarchical key-value mapping layered over a
//! content-addressed blockstore.
//!
//! Keys are `/`-separated paths. Values whose final path segment carries a
//! known zarr metadata suffix are parsed as JSON and embedded inline in the
//! tree; everything else is stored as its own raw block and referenced by
//! CID. [`IpldStore::freeze`] materialises the whole tree as a single
//! dag-cbor root block, which is what [`IpldStore::to_car`] exports and
//! [`IpldStore::import_car`] restores.

mod reference_fs;
mod tree;

use std::io::{Read, Write};

use cid::Cid;
use ipldstore_blockstore::multicodec;
use ipldstore_car::{export_car, load_car};
use ipldstore_encoding::json;
use log::debug;

pub use ipldstore_blockstore::{Blockstore, IpfsBlockstore, MemoryBlockstore, DEFAULT_HOST};
pub use ipldstore_encoding::{Ipld, Value, ValueStore};
pub use reference_fs::{car_file_to_reference_fs, car_to_reference_fs};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("CAR must have a single root, the given CAR has {0} roots")]
    MultiRoot(usize),
    #[error("inline value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Car(#[from] ipldstore_car::Error),
    #[error(transparent)]
    Encoding(#[from] ipldstore_encoding::Error),
    #[error(transparent)]
    Blockstore(#[from] ipldstore_blockstore::Error),
}

/// Key suffixes whose JSON payloads are embedded directly in the frozen
/// tree instead of being stored as separate raw blocks.
pub const INLINE_SUFFIXES: [&str; 4] = [".zarray", ".zgroup", ".zmetadata", ".zattrs"];

pub(crate) fn is_inline_segment(segment: &str) -> bool {
    INLINE_SUFFIXES.contains(&segment)
}

/// A path-keyed mapping rooted in a content-addressed store.
///
/// The mapping is single-writer and mutates freely until [`freeze`]
/// produces a root CID; any later mutation drops the cached root and the
/// next freeze yields a new one. Frozen snapshots are never rewritten.
///
/// [`freeze`]: IpldStore::freeze
#[derive(Debug)]
pub struct IpldStore<S = MemoryBlockstore> {
    tree: tree::Branch,
    store: S,
    sep: char,
    root: Option<Cid>,
}

impl IpldStore<MemoryBlockstore> {
    /// An empty mapping over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryBlockstore::new())
    }

    /// A mapping restored from a single-rooted CAR stream.
    pub fn from_car<R: Read>(reader: R) -> Result<Self, Error> {
        let mut mapping = Self::new();
        mapping.import_car(reader)?;
        Ok(mapping)
    }
}

impl Default for IpldStore<MemoryBlockstore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Blockstore> IpldStore<S> {
    /// An empty mapping over the given store.
    pub fn with_store(store: S) -> Self {
        Self::with_separator(store, '/')
    }

    pub fn with_separator(store: S, sep: char) -> Self {
        Self {
            tree: tree::Branch::new(),
            store,
            sep,
            root: None,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The root CID of the last [`IpldStore::freeze`], if the tree has not
    /// been mutated since.
    pub fn root(&self) -> Option<Cid> {
        self.root
    }

    /// Look a key up and return its payload bytes: re-serialised JSON for
    /// inline leaves, the referenced block for external ones.
    pub fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        let parts: Vec<&str> = key.split(self.sep).collect();
        let node =
            tree::get(&self.tree, &parts).ok_or_else(|| Error::NotFound(key.to_string()))?;
        if is_inline_segment(parts.last().copied().unwrap_or_default()) {
            match node {
                tree::Node::Inline(value) => Ok(serde_json::to_vec(&json::to_json(value)?)?),
                _ => Err(Error::InvalidInput(format!(
                    "key {key} does not hold an inline value"
                ))),
            }
        } else {
            match node {
                tree::Node::Link(cid) => Ok(self.store.get_raw(cid)?),
                tree::Node::Branch(_) => Err(Error::NotFound(key.to_string())),
                tree::Node::Inline(_) => Err(Error::InvalidInput(format!(
                    "key {key} does not reference a stored block"
                ))),
            }
        }
    }

    /// Bind a key: JSON-decode and embed the payload if the final segment
    /// has an inline suffix, otherwise store it as a raw block.
    /// Intermediate groups appear on demand.
    pub fn set(&mut self, key: &str, value: &[u8]) -> Result<(), Error> {
        let parts: Vec<&str> = key.split(self.sep).collect();
        let node = if is_inline_segment(parts.last().copied().unwrap_or_default()) {
            let doc = serde_json::from_slice(value)?;
            tree::Node::Inline(json::from_json(doc))
        } else {
            tree::Node::Link(self.store.put_raw(value, multicodec::RAW)?)
        };
        tree::insert(&mut self.tree, &parts, node)?;
        self.root = None;
        Ok(())
    }

    /// Unbind a key, folding away any group this leaves empty.
    pub fn delete(&mut self, key: &str) -> Result<(), Error> {
        let parts: Vec<&str> = key.split(self.sep).collect();
        tree::remove(&mut self.tree, &parts).ok_or_else(|| Error::NotFound(key.to_string()))?;
        self.root = None;
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        let parts: Vec<&str> = key.split(self.sep).collect();
        match tree::get(&self.tree, &parts) {
            None => false,
            Some(tree::Node::Branch(_)) => {
                is_inline_segment(parts.last().copied().unwrap_or_default())
            }
            Some(_) => true,
        }
    }

    /// All leaf paths, depth-first pre-order, siblings in insertion order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        tree::collect_keys(&self.tree, "", self.sep, &mut keys);
        keys
    }

    /// Number of leaf paths.
    pub fn len(&self) -> usize {
        tree::count(&self.tree)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialise the current tree as a single dag-cbor block and return
    /// its CID. Idempotent until the next mutation.
    pub fn freeze(&mut self) -> Result<Cid, Error> {
        if let Some(root) = self.root {
            return Ok(root);
        }
        let root = self.store.put_cbor(&tree::to_ipld(&self.tree))?;
        debug!("froze mapping as {}", root);
        self.root = Some(root);
        Ok(root)
    }

    /// Drop every binding and the cached root.
    pub fn clear(&mut self) {
        self.tree = tree::Branch::new();
        self.root = None;
    }

    /// Freeze and export the reachable DAG as a CAR v1 stream, returning
    /// the number of bytes written.
    pub fn to_car<W: Write>(&mut self, writer: &mut W) -> Result<u64, Error> {
        let root = self.freeze()?;
        Ok(export_car(&self.store, root, writer)?)
    }

    /// Freeze and export the reachable DAG as in-memory CAR bytes.
    pub fn to_car_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        self.to_car(&mut buf)?;
        Ok(buf)
    }

    /// Import a single-rooted CAR stream into the backing store and adopt
    /// its root as the current tree.
    pub fn import_car<R: Read>(&mut self, reader: R) -> Result<(), Error> {
        let roots = load_car(&self.store, reader)?;
        if roots.len() != 1 {
            return Err(Error::MultiRoot(roots.len()));
        }
        self.set_root(roots[0])
    }

    /// Adopt a frozen root already present in the backing store, replacing
    /// the current tree with its decoded mapping.
    pub fn set_root(&mut self, root: Cid) -> Result<(), Error> {
        match self.store.get_value(&root)? {
            Value::Node(Ipld::Map(map)) => {
                self.tree = tree::from_ipld(map);
                self.root = Some(root);
                Ok(())
            }
            _ => Err(Error::InvalidInput(format!(
                "root {root} does not decode to a mapping"
            ))),
        }
    }
}
