//! Value-range lowering to raw composite-column bounds.

use crate::{
    db::{
        identity::IDENTIFIER_LEN,
        index::key::EncodedValue,
        value::{Value, ValueTag},
    },
    error::InternalError,
};
use std::ops::Bound;

///
/// ComponentRange
///
/// Typed value range over one property index.
/// A bounded side fixes the value kind; the unbounded side then stays within
/// that kind, so `x > 5` never matches text or floats.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ComponentRange {
    lower: Bound<EncodedValue>,
    upper: Bound<EncodedValue>,
    tag: Option<ValueTag>,
}

impl ComponentRange {
    /// Encode both bounds, rejecting mixed kinds and unindexable values.
    pub fn try_new(lower: &Bound<Value>, upper: &Bound<Value>) -> Result<Self, InternalError> {
        let lower = encode_bound(lower)?;
        let upper = encode_bound(upper)?;

        let lower_tag = bound_tag(&lower);
        let upper_tag = bound_tag(&upper);
        let tag = match (lower_tag, upper_tag) {
            (Some(lo), Some(hi)) if lo != hi => {
                return Err(InternalError::query_unsupported(format!(
                    "range bounds mix value kinds: {} and {}",
                    lo.label(),
                    hi.label()
                )));
            }
            (lo, hi) => lo.or(hi),
        };

        Ok(Self { lower, upper, tag })
    }

    #[must_use]
    pub const fn lower(&self) -> &Bound<EncodedValue> {
        &self.lower
    }

    #[must_use]
    pub const fn upper(&self) -> &Bound<EncodedValue> {
        &self.upper
    }

    /// Raw bounds over `value component ++ owner` columns.
    #[must_use]
    pub fn raw_bounds(&self) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
        let lower = match &self.lower {
            Bound::Included(v) => Bound::Included(v.encoded().to_vec()),
            Bound::Excluded(v) => Bound::Excluded(padded(v.encoded(), 0xFF)),
            Bound::Unbounded => self
                .tag
                .map_or(Bound::Unbounded, |tag| Bound::Included(vec![tag.to_u8()])),
        };
        let upper = match &self.upper {
            Bound::Included(v) => Bound::Included(padded(v.encoded(), 0xFF)),
            Bound::Excluded(v) => Bound::Excluded(v.encoded().to_vec()),
            Bound::Unbounded => self.tag.map_or(Bound::Unbounded, |tag| {
                Bound::Excluded(vec![tag.to_u8().saturating_add(1)])
            }),
        };

        (lower, upper)
    }

    /// Whether one encoded value component falls inside this range.
    #[must_use]
    pub fn contains_component(&self, component: &[u8]) -> bool {
        if let Some(tag) = self.tag
            && component.first() != Some(&tag.to_u8())
        {
            return false;
        }

        let lower_ok = match &self.lower {
            Bound::Included(v) => component >= v.encoded(),
            Bound::Excluded(v) => component > v.encoded(),
            Bound::Unbounded => true,
        };
        let upper_ok = match &self.upper {
            Bound::Included(v) => component <= v.encoded(),
            Bound::Excluded(v) => component < v.encoded(),
            Bound::Unbounded => true,
        };

        lower_ok && upper_ok
    }
}

/// Raw bounds covering every column of one exact value.
#[must_use]
pub fn point_bounds(component: &[u8]) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    (
        Bound::Included(component.to_vec()),
        Bound::Included(padded(component, 0xFF)),
    )
}

fn encode_bound(bound: &Bound<Value>) -> Result<Bound<EncodedValue>, InternalError> {
    Ok(match bound {
        Bound::Included(v) => Bound::Included(EncodedValue::try_from_ref(v)?),
        Bound::Excluded(v) => Bound::Excluded(EncodedValue::try_from_ref(v)?),
        Bound::Unbounded => Bound::Unbounded,
    })
}

const fn bound_tag(bound: &Bound<EncodedValue>) -> Option<ValueTag> {
    match bound {
        Bound::Included(v) | Bound::Excluded(v) => Some(v.tag()),
        Bound::Unbounded => None,
    }
}

fn padded(component: &[u8], fill: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(component.len() + IDENTIFIER_LEN);
    out.extend_from_slice(component);
    out.extend_from_slice(&[fill; IDENTIFIER_LEN]);

    out
}

///
/// TESTS
///
