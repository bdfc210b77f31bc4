pub mod cursor;
pub mod direction;
pub mod executor;
pub mod identity;
pub mod index;
pub mod query;
pub mod store;
pub mod value;

pub use direction::Direction;
pub use executor::LoadExecutor;
pub use identity::Identifier;
pub use query::{Connection, OrderField, Page, Predicate, Query};
pub use value::Value;
