// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT

//! The mutable path tree behind the mapping.
//!
//! The public key surface is flat path strings, but the tree is kept
//! nested so that CBOR encoding shares path prefixes and group-level
//! deletes fold away emptied branches.

use std::collections::BTreeMap;

use cid::Cid;
use indexmap::IndexMap;
use ipldstore_encoding::Ipld;

use crate::{is_inline_segment, Error};

/// One node of the mutable path tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    /// Nested sub-mapping, in insertion order.
    Branch(Branch),
    /// External leaf, stored in the blockstore.
    Link(Cid),
    /// Inline leaf, embedded in the frozen tree.
    Inline(Ipld),
}

pub(crate) type Branch = IndexMap<String, Node>;

pub(crate) fn insert(branch: &mut Branch, path: &[&str], node: Node) -> Result<(), Error> {
    match path {
        [] => Err(Error::InvalidInput("empty key".to_string())),
        [leaf] => {
            branch.insert((*leaf).to_string(), node);
            Ok(())
        }
        [head, rest @ ..] => {
            let child = branch
                .entry((*head).to_string())
                .or_insert_with(|| Node::Branch(Branch::new()));
            match child {
                Node::Branch(children) => insert(children, rest, node),
                _ => Err(Error::InvalidInput(format!(
                    "key segment '{head}' is already a leaf"
                ))),
            }
        }
    }
}

pub(crate) fn get<'a>(branch: &'a Branch, path: &[&str]) -> Option<&'a Node> {
    match path {
        [] => None,
        [leaf] => branch.get(*leaf),
        [head, rest @ ..] => match branch.get(*head)? {
            Node::Branch(children) => get(children, rest),
            _ => None,
        },
    }
}

/// Removes the node at `path`, folding away any branch this leaves empty.
pub(crate) fn remove(branch: &mut Branch, path: &[&str]) -> Option<Node> {
    match path {
        [] => None,
        [leaf] => branch.shift_remove(*leaf),
        [head, rest @ ..] => {
            let Node::Branch(children) = branch.get_mut(*head)? else {
                return None;
            };
            let removed = remove(children, rest)?;
            if children.is_empty() {
                branch.shift_remove(*head);
            }
            Some(removed)
        }
    }
}

/// Depth-first pre-order walk yielding joined leaf paths. A segment with
/// an inline suffix terminates descent regardless of what sits below it.
pub(crate) fn collect_keys(branch: &Branch, prefix: &str, sep: char, keys: &mut Vec<String>) {
    for (segment, node) in branch {
        let path = if prefix.is_empty() {
            segment.clone()
        } else {
            format!("{prefix}{sep}{segment}")
        };
        if is_inline_segment(segment) {
            keys.push(path);
            continue;
        }
        match node {
            Node::Branch(children) => collect_keys(children, &path, sep, keys),
            _ => keys.push(path),
        }
    }
}

/// Number of leaf paths [`collect_keys`] would yield.
pub(crate) fn count(branch: &Branch) -> usize {
    branch
        .iter()
        .map(|(segment, node)| match node {
            Node::Branch(children) if !is_inline_segment(segment) => count(children),
            _ => 1,
        })
        .sum()
}

pub(crate) fn to_ipld(branch: &Branch) -> Ipld {
    Ipld::Map(
        branch
            .iter()
            .map(|(segment, node)| {
                let value = match node {
                    Node::Branch(children) => to_ipld(children),
                    Node::Link(cid) => Ipld::Link(*cid),
                    Node::Inline(value) => value.clone(),
                };
                (segment.clone(), value)
            })
            .collect(),
    )
}

/// Rebuilds a tree from a decoded root mapping. Sub-mappings become
/// branches and links become external leaves, except under an inline
/// suffix, where the value is carried verbatim.
pub(crate) fn from_ipld(map: BTreeMap<String, Ipld>) -> Branch {
    map.into_iter()
        .map(|(segment, value)| {
            let node = if is_inline_segment(&segment) {
                Node::Inline(value)
            } else {
                match value {
                    Ipld::Map(children) => Node::Branch(from_ipld(children)),
                    Ipld::Link(cid) => Node::Link(cid),
                    other => Node::Inline(other),
                }
            };
            (segment, node)
        })
        .collect()
}
