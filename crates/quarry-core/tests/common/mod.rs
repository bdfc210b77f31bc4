#![allow(dead_code)]

use quarry_core::prelude::*;
use std::str::FromStr;
use tracing::Level;

pub const APP: &str = "app";
pub const COLLECTION: &str = "items";

// Install a test writer once per binary; LOG_LEVEL overrides the default.
pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| Level::from_str(&level).ok())
        .unwrap_or(Level::INFO);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init();
}

pub const fn id(n: u128) -> Identifier {
    Identifier::from_u128(n)
}

pub fn ids(page: &Page) -> Vec<u128> {
    page.ids.iter().map(|id| id.as_u128()).collect()
}

///
/// TestDb
///

pub struct TestDb {
    pub store: MemoryColumnStore,
    pub app: ApplicationId,
}

impl TestDb {
    pub fn new() -> Self {
        init_tracing();

        Self {
            store: MemoryColumnStore::new(),
            app: ApplicationId::new(APP),
        }
    }

    pub fn index(&self, owner: u128, properties: &[(&str, Value)]) {
        IndexWriter::new(&self.store)
            .index_entity(&self.app, COLLECTION, id(owner), properties)
            .expect("entity should index");
    }

    pub fn unindex(&self, owner: u128) {
        IndexWriter::new(&self.store)
            .unindex_entity(&self.app, COLLECTION, id(owner))
            .expect("entity should unindex");
    }

    pub fn connect(&self, source: u128, kind: &str, target: u128, properties: &[(&str, Value)]) {
        IndexWriter::new(&self.store)
            .connect(&self.app, id(source), kind, id(target), properties)
            .expect("connection should index");
    }

    pub fn executor(&self) -> LoadExecutor<'_> {
        LoadExecutor::new(&self.store, EngineConfig::default())
    }

    pub fn query(&self) -> Query {
        Query::collection(APP, COLLECTION)
    }

    pub fn page(&self, query: &Query) -> Page {
        self.executor().execute(query).expect("query should execute")
    }

    pub fn all(&self, query: &Query) -> Vec<u128> {
        self.executor()
            .collect_all(query)
            .expect("query should execute")
            .into_iter()
            .map(Identifier::as_u128)
            .collect()
    }
}
