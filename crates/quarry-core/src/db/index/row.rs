use crate::db::identity::Identifier;
use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// ApplicationId
///
/// Tenant identifier. Every row key is scoped by it.
///

#[derive(
    Clone, Debug, Deref, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct ApplicationId(String);

impl ApplicationId {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl From<&str> for ApplicationId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

///
/// Scope
///
/// Entity set a query runs over: one collection, or the targets of one
/// source entity's connections of one kind.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Scope {
    Collection(String),
    Connection { source: Identifier, kind: String },
}

impl Scope {
    /// Collection scope; names are case-insensitive.
    #[must_use]
    pub fn collection(name: &str) -> Self {
        Self::Collection(name.to_lowercase())
    }

    /// Connection scope; kinds are case-insensitive.
    #[must_use]
    pub fn connection(source: Identifier, kind: &str) -> Self {
        Self::Connection {
            source,
            kind: kind.to_lowercase(),
        }
    }

    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection(name) => write!(f, "{name}"),
            Self::Connection { source, kind } => write!(f, "{source}/{kind}"),
        }
    }
}

///
/// RowKind
///
/// Which index a row holds within one scope.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum RowKind {
    /// Scope membership; columns are bare owners.
    All,

    /// Property index; columns are `value ++ owner`.
    Property(String),

    /// Keyword index over tokenized text; columns are `token ++ owner`.
    Keyword(String),
}

///
/// IndexRowKey
///
/// Multi-tenant row key of one index row in the column store.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum IndexRowKey {
    Index {
        app: ApplicationId,
        scope: Scope,
        kind: RowKind,
    },

    /// Reverse lookup of one owner's indexed values; columns are
    /// `text(property) ++ value`.
    EntityEntries {
        app: ApplicationId,
        owner: Identifier,
    },
}

impl IndexRowKey {
    #[must_use]
    pub fn members(app: &ApplicationId, scope: &Scope) -> Self {
        Self::Index {
            app: app.clone(),
            scope: scope.clone(),
            kind: RowKind::All,
        }
    }

    #[must_use]
    pub fn property(app: &ApplicationId, scope: &Scope, property: &str) -> Self {
        Self::Index {
            app: app.clone(),
            scope: scope.clone(),
            kind: RowKind::Property(property.to_lowercase()),
        }
    }

    #[must_use]
    pub fn keyword(app: &ApplicationId, scope: &Scope, property: &str) -> Self {
        Self::Index {
            app: app.clone(),
            scope: scope.clone(),
            kind: RowKind::Keyword(property.to_lowercase()),
        }
    }

    #[must_use]
    pub fn entity_entries(app: &ApplicationId, owner: Identifier) -> Self {
        Self::EntityEntries {
            app: app.clone(),
            owner,
        }
    }
}

impl fmt::Display for IndexRowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index { app, scope, kind } => match kind {
                RowKind::All => write!(f, "{app}/{scope}/*"),
                RowKind::Property(name) => write!(f, "{app}/{scope}/{name}"),
                RowKind::Keyword(name) => write!(f, "{app}/{scope}/{name}~"),
            },
            Self::EntityEntries { app, owner } => write!(f, "{app}/entries/{owner}"),
        }
    }
}

///
/// TESTS
///
