use crate::{
    db::cursor::{
        CursorCache, QuerySignature,
        wire::{PositionWire, StateWire, TOKEN_VERSION, TokenWire, TokenWireError},
    },
    error::InternalError,
};

const SIGNATURE_LEN: usize = 32;

///
/// TokenState
///
/// Where the next page starts: after `boundary` with per-node positions, or
/// nowhere because the previous page ended the stream.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TokenState {
    Resume {
        boundary: Vec<u8>,
        positions: CursorCache,
    },
    Exhausted,
}

///
/// ContinuationToken
///
/// Opaque cursor payload bound to one query signature.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContinuationToken {
    signature: QuerySignature,
    state: TokenState,
}

impl ContinuationToken {
    #[must_use]
    pub const fn resume(
        signature: QuerySignature,
        boundary: Vec<u8>,
        positions: CursorCache,
    ) -> Self {
        Self {
            signature,
            state: TokenState::Resume {
                boundary,
                positions,
            },
        }
    }

    #[must_use]
    pub const fn exhausted(signature: QuerySignature) -> Self {
        Self {
            signature,
            state: TokenState::Exhausted,
        }
    }

    #[must_use]
    pub const fn signature(&self) -> QuerySignature {
        self.signature
    }

    #[must_use]
    pub const fn state(&self) -> &TokenState {
        &self.state
    }

    #[must_use]
    pub fn into_state(self) -> TokenState {
        self.state
    }

    /// Render the token as the hex string handed to callers.
    pub fn encode(&self) -> Result<String, InternalError> {
        let state = match &self.state {
            TokenState::Resume {
                boundary,
                positions,
            } => StateWire::Resume {
                boundary: boundary.clone(),
                positions: positions
                    .iter()
                    .map(|(path, position)| PositionWire {
                        path: path.clone(),
                        position: position.to_vec(),
                    })
                    .collect(),
            },
            TokenState::Exhausted => StateWire::Exhausted,
        };

        TokenWire {
            version: TOKEN_VERSION,
            signature: self.signature.into_bytes().to_vec(),
            state,
        }
        .to_text()
    }

    /// Parse a cursor string and check it belongs to `expected`.
    pub fn decode(
        token: &str,
        expected: QuerySignature,
        max_hex_len: usize,
    ) -> Result<Self, TokenWireError> {
        let wire = TokenWire::from_text(token, max_hex_len)?;

        let signature: [u8; SIGNATURE_LEN] = wire.signature.as_slice().try_into().map_err(|_| {
            TokenWireError::Payload(format!(
                "signature must be {SIGNATURE_LEN} bytes, found {}",
                wire.signature.len()
            ))
        })?;
        let signature = QuerySignature::from_bytes(signature);
        if signature != expected {
            return Err(TokenWireError::SignatureMismatch {
                expected: expected.as_hex(),
                found: signature.as_hex(),
            });
        }

        let state = match wire.state {
            StateWire::Resume {
                boundary,
                positions,
            } => {
                if boundary.is_empty() {
                    return Err(TokenWireError::Payload(
                        "resume cursor has an empty boundary".to_string(),
                    ));
                }
                TokenState::Resume {
                    boundary,
                    positions: positions
                        .into_iter()
                        .map(|entry| (entry.path, entry.position))
                        .collect(),
                }
            }
            StateWire::Exhausted => TokenState::Exhausted,
        };

        Ok(Self { signature, state })
    }
}

///
/// TESTS
///
