// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

//! Conversions between JSON documents and the IPLD data model, used for
//! metadata payloads that live inline in a dag-cbor tree.

use libipld::Ipld;
use serde_json::Value;

use crate::Error;

/// Lift a JSON document into the IPLD data model. Whole numbers become
/// integers, everything else a JSON number can hold becomes a float.
pub fn from_json(value: Value) -> Ipld {
    match value {
        Value::Null => Ipld::Null,
        Value::Bool(b) => Ipld::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ipld::Integer(i.into())
            } else if let Some(u) = n.as_u64() {
                Ipld::Integer(u.into())
            } else {
                Ipld::Float(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => Ipld::String(s),
        Value::Array(items) => Ipld::List(items.into_iter().map(from_json).collect()),
        Value::Object(map) => Ipld::Map(
            map.into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect(),
        ),
    }
}

/// Lower an IPLD value back into JSON. Bytes and links have no JSON form
/// and fail, as do non-finite floats and out-of-range integers.
pub fn to_json(node: &Ipld) -> Result<Value, Error> {
    Ok(match node {
        Ipld::Null => Value::Null,
        Ipld::Bool(b) => Value::Bool(*b),
        Ipld::Integer(i) => {
            if let Ok(n) = i64::try_from(*i) {
                Value::Number(n.into())
            } else if let Ok(n) = u64::try_from(*i) {
                Value::Number(n.into())
            } else {
                return Err(Error::Encoding(format!(
                    "integer {} does not fit a JSON number",
                    i
                )));
            }
        }
        Ipld::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| Error::Encoding(format!("{} has no JSON form", f)))?,
        Ipld::String(s) => Value::String(s.clone()),
        Ipld::List(items) => Value::Array(items.iter().map(to_json).collect::<Result<_, _>>()?),
        Ipld::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v)?)))
                .collect::<Result<_, Error>>()?,
        ),
        Ipld::Bytes(_) | Ipld::Link(_) => {
            return Err(Error::Encoding(
                "bytes and links have no JSON form".into(),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use libipld::ipld;

    use super::*;

    #[test]
    fn document_roundtrip() {
        let doc: Value = serde_json::from_str(
            r#"{"zarr_format": 2, "shape": [5], "fill_value": null, "order": "C", "f": 1.5}"#,
        )
        .unwrap();
        let node = from_json(doc.clone());
        assert_eq!(to_json(&node).unwrap(), doc);
    }

    #[test]
    fn whole_numbers_become_integers() {
        assert_eq!(from_json(serde_json::json!(123)), ipld!(123));
        assert_eq!(from_json(serde_json::json!(-7)), ipld!(-7));
        assert_eq!(from_json(serde_json::json!(1.5)), ipld!(1.5));
    }

    #[test]
    fn links_have_no_json_form() {
        let node = Ipld::Bytes(vec![1, 2, 3]);
        assert!(to_json(&node).is_err());
    }
}
