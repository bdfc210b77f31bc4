pub(crate) mod envelope;
pub(crate) mod key;
mod range;
mod row;
mod writer;

pub use range::{ComponentRange, point_bounds};
pub use row::{ApplicationId, IndexRowKey, RowKind, Scope};
pub use writer::{IndexWriter, keyword_tokens};
