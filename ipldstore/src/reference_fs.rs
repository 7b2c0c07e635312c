// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

//! Kerchunk-style reference export.
//!
//! A frozen mapping inside a CAR file can be consumed without an IPLD
//! stack at all: external leaves become `[template, offset, size]` byte
//! ranges pointing straight into the CAR, inline leaves are re-serialised
//! JSON. The resulting document is what a reference filesystem reader
//! expects next to the archive.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use cid::Cid;
use ipldstore_blockstore::multicodec;
use ipldstore_car::{BlockLocation, CarReader};
use ipldstore_encoding::{from_slice, json, Ipld};
use serde_json::{Map, Value};

use crate::{is_inline_segment, Error};

/// Build the reference map for a single-rooted CAR stream. `stream_name`
/// is the template placeholder substituted for the archive itself, e.g.
/// `{{a}}`.
pub fn car_to_reference_fs<R: Read>(
    reader: R,
    stream_name: &str,
) -> Result<Map<String, Value>, Error> {
    let mut reader = CarReader::new(reader)?;
    if reader.header.roots.len() != 1 {
        return Err(Error::MultiRoot(reader.header.roots.len()));
    }
    let root = reader.header.roots[0];

    let mut locations: HashMap<Cid, BlockLocation> = HashMap::new();
    let mut cbor_blocks: HashMap<Cid, Vec<u8>> = HashMap::new();
    while let Some((block, location)) = reader.next_block_located()? {
        locations.insert(block.cid, location);
        if block.cid.codec() == multicodec::DAG_CBOR {
            cbor_blocks.insert(block.cid, block.data);
        }
    }

    let tree = cbor_blocks
        .get(&root)
        .ok_or_else(|| Error::InvalidInput(format!("root {root} is not part of the CAR")))?;
    let Ipld::Map(tree) = from_slice(tree)? else {
        return Err(Error::InvalidInput(format!(
            "root {root} does not decode to a mapping"
        )));
    };

    let mut refs = Map::new();
    collect_refs(&tree, "", stream_name, &locations, &mut refs)?;
    Ok(refs)
}

/// Read a CAR file and wrap its reference map in a reference-filesystem
/// document pointing back at the file.
pub fn car_file_to_reference_fs(path: impl AsRef<Path>) -> Result<Value, Error> {
    let path = path.as_ref();
    let refs = car_to_reference_fs(BufReader::new(File::open(path)?), "{{a}}")?;
    Ok(serde_json::json!({
        "version": 1,
        "templates": {"a": path.display().to_string()},
        "refs": refs,
    }))
}

fn collect_refs(
    tree: &BTreeMap<String, Ipld>,
    prefix: &str,
    stream_name: &str,
    locations: &HashMap<Cid, BlockLocation>,
    refs: &mut Map<String, Value>,
) -> Result<(), Error> {
    for (segment, value) in tree {
        let path = if prefix.is_empty() {
            segment.clone()
        } else {
            format!("{prefix}/{segment}")
        };
        if is_inline_segment(segment) {
            refs.insert(path, Value::String(serde_json::to_string(&json::to_json(value)?)?));
        } else if let Ipld::Map(nested) = value {
            collect_refs(nested, &path, stream_name, locations, refs)?;
        } else if let Ipld::Link(cid) = value {
            let location = locations.get(cid).ok_or_else(|| {
                Error::InvalidInput(format!("block {cid} is referenced but not in the CAR"))
            })?;
            refs.insert(
                path,
                serde_json::json!([stream_name, location.payload_offset, location.payload_size]),
            );
        } else {
            refs.insert(path, Value::String(serde_json::to_string(&json::to_json(value)?)?));
        }
    }
    Ok(())
}
