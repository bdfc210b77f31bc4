//! Text framing of continuation tokens: a versioned CBOR envelope handed to
//! callers as lowercase hex.

use crate::{
    db::cursor::NodePath,
    error::InternalError,
    serialize::{deserialize_bounded, serialize},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

pub(super) const TOKEN_VERSION: u8 = 1;

///
/// TokenWireError
///
/// Failures turning a cursor string back into resume state.
///

#[derive(Debug, ThisError)]
pub enum TokenWireError {
    #[error("cursor is empty")]
    Empty,

    #[error("cursor is {len} hex chars, over the limit of {max}")]
    TooLong { len: usize, max: usize },

    #[error("cursor is not hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid cursor payload: {0}")]
    Payload(String),

    #[error("unsupported cursor version: {0}")]
    Version(u8),

    #[error("cursor was issued for a different query (expected {expected}, found {found})")]
    SignatureMismatch { expected: String, found: String },
}

impl From<TokenWireError> for InternalError {
    fn from(err: TokenWireError) -> Self {
        Self::malformed_cursor(err.to_string())
    }
}

///
/// TokenWire
///

#[derive(Debug, Deserialize, Serialize)]
pub(super) struct TokenWire {
    pub(super) version: u8,
    #[serde(with = "serde_bytes")]
    pub(super) signature: Vec<u8>,
    pub(super) state: StateWire,
}

#[derive(Debug, Deserialize, Serialize)]
pub(super) enum StateWire {
    Resume {
        #[serde(with = "serde_bytes")]
        boundary: Vec<u8>,
        positions: Vec<PositionWire>,
    },
    Exhausted,
}

#[derive(Debug, Deserialize, Serialize)]
pub(super) struct PositionWire {
    pub(super) path: NodePath,
    #[serde(with = "serde_bytes")]
    pub(super) position: Vec<u8>,
}

impl TokenWire {
    pub(super) fn to_text(&self) -> Result<String, InternalError> {
        Ok(hex::encode(serialize(self)?))
    }

    /// Parse caller text of at most `max_len` hex characters. Surrounding
    /// whitespace is ignored and hex case is not significant. The payload
    /// may not decode to more bytes than the text could carry.
    pub(super) fn from_text(text: &str, max_len: usize) -> Result<Self, TokenWireError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TokenWireError::Empty);
        }
        if text.len() > max_len {
            return Err(TokenWireError::TooLong {
                len: text.len(),
                max: max_len,
            });
        }

        let bytes = hex::decode(text)?;
        let wire: Self = deserialize_bounded(&bytes, max_len / 2)
            .map_err(|err| TokenWireError::Payload(err.to_string()))?;
        if wire.version != TOKEN_VERSION {
            return Err(TokenWireError::Version(wire.version));
        }

        Ok(wire)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 512;

    fn resume_text() -> String {
        TokenWire {
            version: TOKEN_VERSION,
            signature: vec![7; 32],
            state: StateWire::Resume {
                boundary: vec![0xab; 16],
                positions: vec![PositionWire {
                    path: NodePath::root().child(2),
                    position: vec![0x0a, 0xff],
                }],
            },
        }
        .to_text()
        .expect("token renders")
    }

    fn boundary(wire: &TokenWire) -> &[u8] {
        match &wire.state {
            StateWire::Resume { boundary, .. } => boundary,
            StateWire::Exhausted => &[],
        }
    }

    #[test]
    fn rendered_tokens_are_lowercase_hex() {
        let text = resume_text();

        assert!(text.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        assert!(text.contains("abab"));
    }

    #[test]
    fn case_and_surrounding_whitespace_do_not_matter() {
        let text = resume_text();
        let shouted = format!(" \n{}\t", text.to_uppercase());

        let wire = TokenWire::from_text(&shouted, MAX).expect("uppercase token parses");
        assert_eq!(wire.signature, vec![7; 32]);
        assert_eq!(boundary(&wire), &[0xab; 16]);
    }

    #[test]
    fn blank_and_oversized_text_is_rejected_before_decoding() {
        assert!(matches!(
            TokenWire::from_text(" \t ", MAX),
            Err(TokenWireError::Empty)
        ));

        let text = resume_text();
        let limit = text.len() - 2;
        match TokenWire::from_text(&text, limit) {
            Err(TokenWireError::TooLong { len, max }) => {
                assert_eq!(len, text.len());
                assert_eq!(max, limit);
            }
            other => panic!("expected an oversized rejection, got {other:?}"),
        }
    }

    #[test]
    fn damaged_hex_reports_the_defect() {
        let text = resume_text();

        assert!(matches!(
            TokenWire::from_text(&text[..text.len() - 1], MAX),
            Err(TokenWireError::Hex(hex::FromHexError::OddLength))
        ));

        let mut bad = text.into_bytes();
        bad[3] = b'g';
        let bad = String::from_utf8(bad).expect("ascii");
        assert!(matches!(
            TokenWire::from_text(&bad, MAX),
            Err(TokenWireError::Hex(hex::FromHexError::InvalidHexCharacter {
                c: 'g',
                index: 3
            }))
        ));
    }

    #[test]
    fn foreign_versions_are_rejected() {
        let text = TokenWire {
            version: TOKEN_VERSION + 1,
            signature: vec![7; 32],
            state: StateWire::Exhausted,
        }
        .to_text()
        .expect("token renders");

        assert!(matches!(
            TokenWire::from_text(&text, MAX),
            Err(TokenWireError::Version(v)) if v == TOKEN_VERSION + 1
        ));
    }
}
