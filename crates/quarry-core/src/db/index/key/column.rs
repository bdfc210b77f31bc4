use crate::{
    db::identity::{IDENTIFIER_LEN, Identifier},
    error::InternalError,
};

/// Property-row cell value written when the owner holds more than one value
/// for that property. Single-valued cells are empty.
pub(crate) const MULTI_VALUED_CELL: [u8; 1] = [0x01];

/// Bare owner column used by collection and connection rows.
#[must_use]
pub fn owner_column(owner: Identifier) -> Vec<u8> {
    owner.to_bytes().to_vec()
}

///
/// IndexColumn
///
/// Composite property-index column: `value component ++ owner`.
/// The owner is always the trailing [`IDENTIFIER_LEN`] bytes, so all
/// columns for one value are contiguous and ordered by owner.
///

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct IndexColumn<'a> {
    component: &'a [u8],
    owner: Identifier,
}

impl<'a> IndexColumn<'a> {
    /// Split a stored column into its value component and owner.
    pub fn decode(raw: &'a [u8]) -> Result<Self, InternalError> {
        let Some(split) = raw.len().checked_sub(IDENTIFIER_LEN).filter(|len| *len > 0) else {
            return Err(InternalError::index_corruption(format!(
                "index column too short: {} bytes (need more than {IDENTIFIER_LEN})",
                raw.len()
            )));
        };
        let (component, owner) = raw.split_at(split);
        let owner = Identifier::try_from_slice(owner).ok_or_else(|| {
            InternalError::index_corruption("index column owner suffix is not an identifier")
        })?;

        Ok(Self { component, owner })
    }

    /// Build the raw column for one encoded value and owner.
    #[must_use]
    pub fn encode(component: &[u8], owner: Identifier) -> Vec<u8> {
        let mut out = Vec::with_capacity(component.len() + IDENTIFIER_LEN);
        out.extend_from_slice(component);
        out.extend_from_slice(&owner.to_bytes());

        out
    }

    #[must_use]
    pub const fn component(&self) -> &'a [u8] {
        self.component
    }

    #[must_use]
    pub const fn owner(&self) -> Identifier {
        self.owner
    }
}

/// Decode the owner of a bare owner column.
pub(crate) fn decode_owner_column(raw: &[u8]) -> Result<Identifier, InternalError> {
    Identifier::try_from_slice(raw).ok_or_else(|| {
        InternalError::index_corruption(format!(
            "owner column must be {IDENTIFIER_LEN} bytes, found {}",
            raw.len()
        ))
    })
}

///
/// TESTS
///
