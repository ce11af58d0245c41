//! Content fingerprints for source documents.
//!
//! ## Canonical form
//!
//! A document is written as compact JSON with object keys in byte order, so
//! two documents with the same field values hash the same no matter how the
//! server ordered its keys. The bytes are hashed with SHA-256 and hex encoded.
//!
//! ## Cycles
//!
//! A pass fingerprints the raw `serde_json::Value` capture, which owns its
//! children and so is always acyclic: [`fingerprint`] only ever takes the
//! strict path. `$ref` pointers are hashed as the strings they are.
//!
//! The writer is generic over [`DocTree`] so a tree whose child slots can
//! point back at an ancestor (an arena with resolved `$ref` edges, say) is
//! handled too. The strict writer fails on a node that is already on the
//! current path; [`fingerprint_tree`] then falls back to the tolerant writer,
//! which emits [`CIRCULAR_SENTINEL`] in its place. Path membership is tracked
//! by node identity, never by value, so equal-but-distinct subtrees are
//! written out in full.

use std::collections::HashSet;

use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

use specsync_core::Fingerprint;

use crate::SyncError;

/// Token written in place of a node that is already on the current path.
pub const CIRCULAR_SENTINEL: &str = "[Circular]";

// ---------------------------------------------------------------------------
// Tree abstraction
// ---------------------------------------------------------------------------

/// One node, as seen by the canonical writer.
pub enum NodeView<'a, N> {
    Null,
    Bool(bool),
    Number(&'a Number),
    String(&'a str),
    Array(Vec<N>),
    /// Entries must already be sorted by key.
    Object(Vec<(&'a str, N)>),
}

/// A document whose nodes carry a stable identity.
pub trait DocTree {
    type Node<'a>: Copy
    where
        Self: 'a;

    fn root(&self) -> Self::Node<'_>;

    /// Identity of `node`; equal only for the very same node.
    fn node_id(&self, node: Self::Node<'_>) -> usize;

    fn view<'a>(&'a self, node: Self::Node<'a>) -> NodeView<'a, Self::Node<'a>>;
}

impl DocTree for Value {
    type Node<'a> = &'a Value
    where
        Self: 'a;

    fn root(&self) -> &Value {
        self
    }

    fn node_id(&self, node: &Value) -> usize {
        node as *const Value as usize
    }

    fn view<'a>(&'a self, node: &'a Value) -> NodeView<'a, &'a Value> {
        match node {
            Value::Null => NodeView::Null,
            Value::Bool(b) => NodeView::Bool(*b),
            Value::Number(n) => NodeView::Number(n),
            Value::String(s) => NodeView::String(s),
            Value::Array(items) => NodeView::Array(items.iter().collect()),
            Value::Object(map) => {
                let mut entries: Vec<(&str, &Value)> =
                    map.iter().map(|(k, v)| (k.as_str(), v)).collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                NodeView::Object(entries)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fingerprinting
// ---------------------------------------------------------------------------

/// Fingerprint a raw JSON document.
pub fn fingerprint(document: &Value) -> Fingerprint {
    fingerprint_tree(document)
}

/// Fingerprint the current raw capture, failing when nothing was captured.
pub fn fingerprint_capture(capture: Option<&Value>) -> Result<Fingerprint, SyncError> {
    capture.map(fingerprint).ok_or(SyncError::NoCapture)
}

/// Fingerprint any [`DocTree`]. Never fails: a cycle switches to the
/// tolerant writer.
pub fn fingerprint_tree<T: DocTree + ?Sized>(tree: &T) -> Fingerprint {
    let bytes = match canonical_bytes(tree, CyclePolicy::Fail) {
        Ok(bytes) => bytes,
        Err(CycleDetected) => {
            tracing::debug!("cyclic document, using tolerant serializer");
            tolerant_bytes(tree)
        }
    };
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Fingerprint(hex::encode(hasher.finalize()))
}

/// Strict canonical form; `None` if the tree contains a cycle.
pub fn strict_bytes<T: DocTree + ?Sized>(tree: &T) -> Option<Vec<u8>> {
    canonical_bytes(tree, CyclePolicy::Fail).ok()
}

/// Cycle-tolerant canonical form.
pub fn tolerant_bytes<T: DocTree + ?Sized>(tree: &T) -> Vec<u8> {
    match canonical_bytes(tree, CyclePolicy::Sentinel) {
        Ok(bytes) => bytes,
        // The sentinel policy never reports a cycle.
        Err(CycleDetected) => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Canonical writer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclePolicy {
    Fail,
    Sentinel,
}

#[derive(Debug)]
struct CycleDetected;

fn canonical_bytes<T: DocTree + ?Sized>(
    tree: &T,
    policy: CyclePolicy,
) -> Result<Vec<u8>, CycleDetected> {
    let mut out = Vec::new();
    let mut on_path = HashSet::new();
    write_node(tree, tree.root(), policy, &mut on_path, &mut out)?;
    Ok(out)
}

fn write_node<'a, T: DocTree + ?Sized>(
    tree: &'a T,
    node: T::Node<'a>,
    policy: CyclePolicy,
    on_path: &mut HashSet<usize>,
    out: &mut Vec<u8>,
) -> Result<(), CycleDetected> {
    match tree.view(node) {
        NodeView::Null => out.extend_from_slice(b"null"),
        NodeView::Bool(b) => out.extend_from_slice(if b { "true" } else { "false" }.as_bytes()),
        NodeView::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        NodeView::String(s) => write_str(s, out),
        NodeView::Array(items) => {
            let id = tree.node_id(node);
            if !enter(id, policy, on_path, out)? {
                return Ok(());
            }
            out.push(b'[');
            for (i, item) in items.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_node(tree, item, policy, on_path, out)?;
            }
            out.push(b']');
            on_path.remove(&id);
        }
        NodeView::Object(entries) => {
            let id = tree.node_id(node);
            if !enter(id, policy, on_path, out)? {
                return Ok(());
            }
            out.push(b'{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_str(key, out);
                out.push(b':');
                write_node(tree, value, policy, on_path, out)?;
            }
            out.push(b'}');
            on_path.remove(&id);
        }
    }
    Ok(())
}

/// Mark a container as on-path. `Ok(false)` means the sentinel was written.
fn enter(
    id: usize,
    policy: CyclePolicy,
    on_path: &mut HashSet<usize>,
    out: &mut Vec<u8>,
) -> Result<bool, CycleDetected> {
    if on_path.insert(id) {
        return Ok(true);
    }
    match policy {
        CyclePolicy::Fail => Err(CycleDetected),
        CyclePolicy::Sentinel => {
            write_str(CIRCULAR_SENTINEL, out);
            Ok(false)
        }
    }
}

/// JSON string escaping, byte-compatible with `serde_json`'s compact output.
fn write_str(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for ch in s.chars() {
        match ch {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            '\u{08}' => out.extend_from_slice(b"\\b"),
            '\u{0c}' => out.extend_from_slice(b"\\f"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}
