use crate::{
    db::value::{Value, ValueTag},
    error::InternalError,
};
use thiserror::Error as ThisError;

/// Version of the composite key byte layout. Bumping it invalidates every
/// outstanding continuation cursor through the query signature.
pub const KEY_FORMAT_VERSION: u8 = 1;

const TEXT_ESCAPE: u8 = 0xFF;
const TEXT_TERMINATOR: [u8; 2] = [0x00, 0x00];

///
/// OrderedValueEncodeError
///
/// Canonical index-encoding failures for one `Value` component.
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum OrderedValueEncodeError {
    #[error("NaN float values are not indexable")]
    NanNotIndexable,
}

impl From<OrderedValueEncodeError> for InternalError {
    fn from(err: OrderedValueEncodeError) -> Self {
        Self::query_unsupported(format!(
            "index value is not canonically order-encodable: {err}"
        ))
    }
}

///
/// EncodedValue
///
/// Cached canonical index-component bytes for one logical `Value`.
/// Keeps value and bytes together so planning does not re-encode literals.
///

#[derive(Clone, Debug, PartialEq)]
pub struct EncodedValue {
    raw: Value,
    encoded: Vec<u8>,
}

impl EncodedValue {
    /// Encode a value once into canonical index-component bytes.
    pub fn try_new(raw: Value) -> Result<Self, OrderedValueEncodeError> {
        let encoded = encode_value_component(&raw)?;

        Ok(Self { raw, encoded })
    }

    /// Encode a borrowed value by cloning it into this cached wrapper.
    pub fn try_from_ref(raw: &Value) -> Result<Self, OrderedValueEncodeError> {
        Self::try_new(raw.clone())
    }

    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.raw
    }

    #[must_use]
    pub const fn encoded(&self) -> &[u8] {
        self.encoded.as_slice()
    }

    #[must_use]
    pub const fn tag(&self) -> ValueTag {
        self.raw.tag()
    }
}

/// Encode one value component so lexicographic byte order matches value
/// order within a kind, and tag order across kinds.
///
/// Text is lowercased first: string indexes are case-insensitive.
pub fn encode_value_component(value: &Value) -> Result<Vec<u8>, OrderedValueEncodeError> {
    let mut out = Vec::with_capacity(9);
    out.push(value.tag().to_u8());

    match value {
        Value::Bool(v) => out.push(u8::from(*v)),
        Value::Int(v) => out.extend_from_slice(&ordered_i64_bytes(*v)),
        Value::Float(v) => {
            if v.is_nan() {
                return Err(OrderedValueEncodeError::NanNotIndexable);
            }
            out.extend_from_slice(&ordered_f64_bytes(*v));
        }
        Value::Text(v) => push_terminated_bytes(&mut out, v.to_lowercase().as_bytes()),
        Value::Id(v) => out.extend_from_slice(&v.to_bytes()),
    }

    Ok(out)
}

/// Encode a property name as a prefix-free text component.
#[must_use]
pub fn encode_name_component(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() + 3);
    out.push(ValueTag::Text.to_u8());
    push_terminated_bytes(&mut out, name.as_bytes());

    out
}

/// Split the leading value component off `bytes`, returning the component
/// and the remainder. `None` when the bytes do not start with a complete
/// component.
#[must_use]
pub fn split_value_component(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let tag = ValueTag::from_u8(*bytes.first()?)?;
    let len = match tag {
        ValueTag::Bool => 2,
        ValueTag::Int | ValueTag::Float => 9,
        ValueTag::Id => 17,
        ValueTag::Text => 1 + terminated_len(&bytes[1..])?,
    };

    (bytes.len() >= len).then(|| bytes.split_at(len))
}

// Length of one escaped, terminated byte string including its terminator.
fn terminated_len(bytes: &[u8]) -> Option<usize> {
    let mut idx = 0;
    while idx + 1 < bytes.len() {
        match (bytes[idx], bytes[idx + 1]) {
            (0, 0) => return Some(idx + 2),
            (0, TEXT_ESCAPE) => idx += 2,
            (0, _) => return None,
            _ => idx += 1,
        }
    }

    None
}

fn push_terminated_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        if byte == 0 {
            out.extend_from_slice(&[0, TEXT_ESCAPE]);
        } else {
            out.push(byte);
        }
    }

    out.extend_from_slice(&TEXT_TERMINATOR);
}

const fn ordered_i64_bytes(value: i64) -> [u8; 8] {
    let biased = value.cast_unsigned() ^ (1u64 << 63);
    biased.to_be_bytes()
}

const fn ordered_f64_bytes(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let ordered = if bits & 0x8000_0000_0000_0000 == 0 {
        bits ^ 0x8000_0000_0000_0000
    } else {
        !bits
    };

    ordered.to_be_bytes()
}

///
/// TESTS
///
