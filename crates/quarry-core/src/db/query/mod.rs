mod predicate;

pub use predicate::{IDENTIFIER_PROPERTY, Predicate};

use crate::db::{
    direction::Direction,
    identity::Identifier,
    index::{ApplicationId, Scope},
};

///
/// OrderField
///
/// One ordering term: a property and its direction.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderField {
    pub property: String,
    pub direction: Direction,
}

impl OrderField {
    #[must_use]
    pub fn new(property: &str, direction: Direction) -> Self {
        Self {
            property: property.to_lowercase(),
            direction,
        }
    }

    /// Whether this term orders by the entity identifier itself.
    #[must_use]
    pub fn is_identifier(&self) -> bool {
        self.property == IDENTIFIER_PROPERTY
    }
}

///
/// Query
///
/// One page request: what to match, how to order it, how much to return,
/// and where the previous page stopped.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub app: ApplicationId,
    pub scope: Scope,
    pub predicate: Option<Predicate>,
    pub order: Vec<OrderField>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub static_id: Option<Identifier>,
}

impl Query {
    #[must_use]
    pub fn new(app: ApplicationId, scope: Scope) -> Self {
        Self {
            app,
            scope,
            predicate: None,
            order: Vec::new(),
            limit: None,
            cursor: None,
            static_id: None,
        }
    }

    #[must_use]
    pub fn collection(app: impl Into<ApplicationId>, name: &str) -> Self {
        Self::new(app.into(), Scope::collection(name))
    }

    #[must_use]
    pub fn connection(app: impl Into<ApplicationId>, source: Identifier, kind: &str) -> Self {
        Self::new(app.into(), Scope::connection(source, kind))
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn order_by(mut self, property: &str) -> Self {
        self.order.push(OrderField::new(property, Direction::Asc));
        self
    }

    #[must_use]
    pub fn order_by_desc(mut self, property: &str) -> Self {
        self.order.push(OrderField::new(property, Direction::Desc));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after the page that issued `cursor`.
    #[must_use]
    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Resolve to one known identifier instead of scanning.
    #[must_use]
    pub const fn static_id(mut self, id: Identifier) -> Self {
        self.static_id = Some(id);
        self
    }
}

///
/// Connection
///
/// One `(source, target)` pair returned by a connection query.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Connection {
    pub source: Identifier,
    pub target: Identifier,
}

///
/// Page
///
/// One page of ordered identifiers and the cursor for the next page.
/// Once `exhausted` is set, `cursor` is the terminal token: resuming with it
/// returns an empty page.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page {
    pub ids: Vec<Identifier>,
    pub connections: Vec<Connection>,
    pub cursor: String,
    pub exhausted: bool,
}

impl Page {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
