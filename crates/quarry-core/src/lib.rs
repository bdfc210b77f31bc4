//! Query evaluation over wide-column secondary indexes: index scans,
//! set-algebra combinators, ordered traversal and resumable cursor
//! pagination.

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod obs;
pub mod serialize;

///
/// Prelude
///
/// Vocabulary for building and running queries.
///

pub mod prelude {
    pub use crate::{
        config::EngineConfig,
        db::{
            Direction, Identifier, LoadExecutor, Page, Predicate, Query, Value,
            index::{ApplicationId, IndexWriter, Scope},
            store::{ColumnStore, MemoryColumnStore},
        },
        error::{ErrorClass, InternalError},
    };
}
