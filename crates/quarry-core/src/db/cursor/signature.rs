//! Deterministic query-shape hashing for continuation tokens.
#![expect(clippy::cast_possible_truncation)]

use crate::db::{
    identity::Identifier,
    index::{
        Scope,
        key::{KEY_FORMAT_VERSION, encode_value_component},
    },
    query::{OrderField, Predicate, Query},
    value::Value,
};
use sha2::{Digest, Sha256};
use std::{fmt, ops::Bound};

///
/// QuerySignature
///
/// SHA-256 of everything that shapes the iterator tree: application, scope,
/// predicate, ordering, static id and key format version. Page size is
/// excluded so it may change between pages.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct QuerySignature([u8; 32]);

impl QuerySignature {
    #[must_use]
    pub fn for_query(query: &Query) -> Self {
        let mut hasher = Sha256::new();

        write_tag(&mut hasher, KEY_FORMAT_VERSION);
        write_str(&mut hasher, &query.app);
        hash_scope(&mut hasher, &query.scope);

        match &query.predicate {
            Some(predicate) => hash_predicate(&mut hasher, predicate),
            None => write_tag(&mut hasher, 0x00),
        }

        write_u32(&mut hasher, query.order.len() as u32);
        for field in &query.order {
            hash_order(&mut hasher, field);
        }

        match query.static_id {
            Some(id) => {
                write_tag(&mut hasher, 0x01);
                write_identifier(&mut hasher, id);
            }
            None => write_tag(&mut hasher, 0x00),
        }

        Self(hasher.finalize().into())
    }

    pub(crate) const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub(crate) const fn into_bytes(self) -> [u8; 32] {
        self.0
    }

    #[must_use]
    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

fn hash_scope(hasher: &mut Sha256, scope: &Scope) {
    match scope {
        Scope::Collection(name) => {
            write_tag(hasher, 0x01);
            write_str(hasher, name);
        }
        Scope::Connection { source, kind } => {
            write_tag(hasher, 0x02);
            write_identifier(hasher, *source);
            write_str(hasher, kind);
        }
    }
}

fn hash_predicate(hasher: &mut Sha256, predicate: &Predicate) {
    match predicate {
        Predicate::Equals { property, value } => {
            write_tag(hasher, 0x10);
            write_str(hasher, property);
            write_value(hasher, value);
        }
        Predicate::Range {
            property,
            lower,
            upper,
        } => {
            write_tag(hasher, 0x11);
            write_str(hasher, property);
            write_bound(hasher, lower);
            write_bound(hasher, upper);
        }
        Predicate::Contains { property, keyword } => {
            write_tag(hasher, 0x12);
            write_str(hasher, property);
            write_str(hasher, keyword);
        }
        Predicate::Not(inner) => {
            write_tag(hasher, 0x20);
            hash_predicate(hasher, inner);
        }
        Predicate::And(children) => {
            write_tag(hasher, 0x21);
            write_u32(hasher, children.len() as u32);
            for child in children {
                hash_predicate(hasher, child);
            }
        }
        Predicate::Or(children) => {
            write_tag(hasher, 0x22);
            write_u32(hasher, children.len() as u32);
            for child in children {
                hash_predicate(hasher, child);
            }
        }
    }
}

fn hash_order(hasher: &mut Sha256, field: &OrderField) {
    write_str(hasher, &field.property);
    write_tag(hasher, u8::from(field.direction.is_reversed()));
}

fn write_bound(hasher: &mut Sha256, bound: &Bound<Value>) {
    match bound {
        Bound::Included(value) => {
            write_tag(hasher, 0x01);
            write_value(hasher, value);
        }
        Bound::Excluded(value) => {
            write_tag(hasher, 0x02);
            write_value(hasher, value);
        }
        Bound::Unbounded => write_tag(hasher, 0x00),
    }
}

// Values hash through their index encoding, so `Alice` and `alice` (which
// match the same rows) share a signature.
fn write_value(hasher: &mut Sha256, value: &Value) {
    match encode_value_component(value) {
        Ok(bytes) => write_bytes(hasher, &bytes),
        Err(_) => write_tag(hasher, 0xFF),
    }
}

fn write_identifier(hasher: &mut Sha256, id: Identifier) {
    hasher.update(id.to_bytes());
}

fn write_tag(hasher: &mut Sha256, tag: u8) {
    hasher.update([tag]);
}

fn write_u32(hasher: &mut Sha256, value: u32) {
    hasher.update(value.to_be_bytes());
}

fn write_str(hasher: &mut Sha256, value: &str) {
    write_bytes(hasher, value.as_bytes());
}

fn write_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    write_u32(hasher, bytes.len() as u32);
    hasher.update(bytes);
}

///
/// TESTS
///
