// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
use std::io::Cursor;

use cid::Cid;
use ipldstore::{car_to_reference_fs, Error, IpldStore};
use ipldstore_blockstore::{multicodec, Blockstore};
use ipldstore_car::CarHeader;
use ipldstore_encoding::{to_vec, Ipld, Value, ValueStore};
use libipld::multihash::{Code, MultihashDigest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn basic_mapping_properties() {
    let mut s = IpldStore::new();
    s.set("a", b"b").unwrap();
    assert_eq!(s.get("a").unwrap(), b"b");
    assert!(s.contains("a"));
    assert_eq!(s.len(), 1);
    s.delete("a").unwrap();
    assert_eq!(s.len(), 0);
    assert!(s.is_empty());
    assert!(matches!(s.get("a"), Err(Error::NotFound(_))));
    assert!(matches!(s.delete("a"), Err(Error::NotFound(_))));
}

#[test]
fn store_hierarchy() {
    let mut s = IpldStore::new();
    s.set("a/b", b"c").unwrap();
    let root = s.freeze().unwrap();

    // the frozen root is a dag-cbor mapping nesting "a" -> {"b": link}
    let Value::Node(Ipld::Map(map)) = s.store().get_value(&root).unwrap() else {
        panic!("root must decode to a mapping");
    };
    let Some(Ipld::Map(a)) = map.get("a") else {
        panic!("'a' must be a sub-mapping");
    };
    assert!(matches!(a.get("b"), Some(Ipld::Link(_))));

    assert_eq!(s.get("a/b").unwrap(), b"c");
    assert!(!s.contains("a"));
}

#[test]
fn iterate_store_hierarchy() {
    let mut s = IpldStore::new();
    s.set(".zgroup", br#"{"test": 123}"#).unwrap();
    s.set("a/b", b"c").unwrap();
    s.set("d", b"e").unwrap();

    let mut keys = s.keys();
    keys.sort();
    assert_eq!(keys, [".zgroup", "a/b", "d"]);
    assert_eq!(s.len(), 3);
}

#[test]
fn inline_values_survive_a_json_roundtrip() {
    let mut s = IpldStore::new();
    let doc = br#"{"a": [1, 2], "b": null, "name": "t", "f": 0.5}"#;
    s.set(".zattrs", doc).unwrap();
    let out = s.get(".zattrs").unwrap();
    let expected: serde_json::Value = serde_json::from_slice(doc).unwrap();
    let actual: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn invalid_inline_json_is_rejected() {
    let mut s = IpldStore::new();
    assert!(matches!(s.set(".zattrs", b"not json"), Err(Error::Json(_))));
    assert_eq!(s.len(), 0);
}

#[test]
fn freeze_is_idempotent_and_invalidated_by_mutation() {
    let mut s = IpldStore::new();
    s.set("a", b"1").unwrap();
    let f1 = s.freeze().unwrap();
    let blocks = s.store().len();
    assert_eq!(s.freeze().unwrap(), f1);
    assert_eq!(s.store().len(), blocks);
    assert_eq!(s.root(), Some(f1));

    s.set("b", b"2").unwrap();
    assert_eq!(s.root(), None);
    let f2 = s.freeze().unwrap();
    assert_ne!(f1, f2);

    // deleting the addition restores the earlier tree, and with it the CID
    s.delete("b").unwrap();
    assert_eq!(s.freeze().unwrap(), f1);
}

#[test]
fn deleting_the_last_leaf_prunes_ancestors() {
    let mut s = IpldStore::new();
    s.set("a/b/c", b"1").unwrap();
    s.set("a/b/d", b"2").unwrap();
    s.delete("a/b/c").unwrap();
    assert_eq!(s.keys(), ["a/b/d"]);
    s.delete("a/b/d").unwrap();
    assert!(s.is_empty());
    assert!(s.keys().is_empty());
    assert!(!s.contains("a"));
}

#[test]
fn roundtrip_over_car() {
    let mut s = IpldStore::new();
    s.set(".zgroup", br#"{"zarr_format": 2}"#).unwrap();
    s.set(
        "data/.zarray",
        br#"{"chunks": [1, 1], "dtype": "|u1", "shape": [3, 3], "zarr_format": 2}"#,
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    for i in 0..3 {
        for j in 0..3 {
            let chunk: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
            s.set(&format!("data/{i}.{j}"), &chunk).unwrap();
        }
    }

    let car = s.to_car_bytes().unwrap();
    let s2 = IpldStore::from_car(Cursor::new(&car)).unwrap();

    assert_eq!(s2.root(), Some(s.freeze().unwrap()));
    let mut keys = s.keys();
    keys.sort();
    let mut keys2 = s2.keys();
    keys2.sort();
    assert_eq!(keys, keys2);
    for key in &keys {
        assert_eq!(s2.get(key).unwrap(), s.get(key).unwrap(), "key {key}");
    }
}

fn append_block(car: &mut Vec<u8>, cid: &Cid, data: &[u8]) {
    let cid_bytes = cid.to_bytes();
    car.push((cid_bytes.len() + data.len()) as u8);
    car.extend_from_slice(&cid_bytes);
    car.extend_from_slice(data);
}

#[test]
fn multi_root_car_is_rejected() {
    // well-formed blocks, but the header declares two roots
    let data = to_vec(&Ipld::Map(Default::default())).unwrap();
    let cid = Cid::new_v1(multicodec::DAG_CBOR, Code::Sha2_256.digest(&data));
    let mut car = Vec::new();
    CarHeader::new(vec![cid, cid], 1).write(&mut car).unwrap();
    append_block(&mut car, &cid, &data);

    let mut s = IpldStore::new();
    assert!(matches!(
        s.import_car(Cursor::new(car)),
        Err(Error::MultiRoot(2))
    ));
}

#[test]
fn zero_root_car_is_rejected() {
    let mut car = Vec::new();
    CarHeader::new(Vec::new(), 1).write(&mut car).unwrap();

    let mut s = IpldStore::new();
    assert!(matches!(
        s.import_car(Cursor::new(car)),
        Err(Error::MultiRoot(0))
    ));
}

#[test]
fn set_root_requires_a_stored_mapping() {
    let mut s = IpldStore::new();

    let missing = Cid::new_v1(multicodec::DAG_CBOR, Code::Sha2_256.digest(b"nowhere"));
    assert!(matches!(
        s.set_root(missing),
        Err(Error::Blockstore(ipldstore_blockstore::Error::NotFound(_)))
    ));

    let raw = s.store().put_raw(b"bytes", multicodec::RAW).unwrap();
    assert!(matches!(s.set_root(raw), Err(Error::InvalidInput(_))));
}

#[test]
fn clear_drops_bindings_and_root() {
    let mut s = IpldStore::new();
    s.set("a", b"1").unwrap();
    s.freeze().unwrap();
    s.clear();
    assert!(s.is_empty());
    assert_eq!(s.root(), None);
}

#[test]
fn reference_fs_points_into_the_car() {
    let mut s = IpldStore::new();
    s.set(".zgroup", br#"{"zarr_format": 2}"#).unwrap();
    s.set("var/.zarray", br#"{"shape": [5]}"#).unwrap();
    s.set("var/0", b"chunk-bytes").unwrap();
    let car = s.to_car_bytes().unwrap();

    let refs = car_to_reference_fs(Cursor::new(&car), "{{a}}").unwrap();

    let doc: serde_json::Value =
        serde_json::from_str(refs[".zgroup"].as_str().unwrap()).unwrap();
    assert_eq!(doc, serde_json::json!({"zarr_format": 2}));
    assert!(refs.contains_key("var/.zarray"));

    let range = refs["var/0"].as_array().unwrap();
    assert_eq!(range[0], "{{a}}");
    let start = range[1].as_u64().unwrap() as usize;
    let size = range[2].as_u64().unwrap() as usize;
    assert_eq!(&car[start..start + size], b"chunk-bytes");
}
