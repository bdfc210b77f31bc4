use serde::{Deserialize, Serialize};

///
/// Direction
///
/// Canonical traversal direction shared by planning, scanners, combinators
/// and continuation tokens.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn is_reversed(self) -> bool {
        matches!(self, Self::Desc)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}
