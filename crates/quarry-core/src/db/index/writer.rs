use crate::{
    db::{
        direction::Direction,
        identity::Identifier,
        index::{
            ApplicationId, IndexRowKey, Scope,
            envelope::KeyEnvelope,
            key::{
                IndexColumn, MULTI_VALUED_CELL, encode_name_component, encode_value_component,
                owner_column,
            },
        },
        store::{ColumnStore, ColumnWriter, read_envelope},
        value::Value,
    },
    error::InternalError,
    serialize::{deserialize_bounded, serialize},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    ops::Bound,
};

const MAX_ENTRY_VALUE_BYTES: usize = 64 * 1024;

// Entity-entries cells read per round trip when unindexing.
const ENTRY_PAGE: usize = 256;

///
/// IndexWriter
///
/// Index maintenance over one column store.
/// Writes membership, property, keyword and entity-entries rows for an
/// entity; the entry rows let `unindex_entity` remove exactly what was
/// written.
///

pub struct IndexWriter<'s, S: ?Sized> {
    store: &'s S,
}

impl<'s, S> IndexWriter<'s, S>
where
    S: ColumnStore + ColumnWriter + ?Sized,
{
    pub const fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Index one entity of a collection. Repeated property names make the
    /// property multi-valued.
    pub fn index_entity(
        &self,
        app: &ApplicationId,
        collection: &str,
        owner: Identifier,
        properties: &[(&str, Value)],
    ) -> Result<(), InternalError> {
        let scope = Scope::collection(collection);
        let encoded = encode_properties(properties)?;

        self.store
            .put(&IndexRowKey::members(app, &scope), owner_column(owner), Vec::new())?;
        self.write_property_rows(app, &scope, owner, &encoded)?;

        let entries = IndexRowKey::entity_entries(app, owner);
        for (name, value, component) in &encoded {
            let mut column = encode_name_component(name);
            column.extend_from_slice(component);
            self.store.put(&entries, column, serialize(value)?)?;
        }

        Ok(())
    }

    /// Remove everything `index_entity` wrote for `owner`.
    pub fn unindex_entity(
        &self,
        app: &ApplicationId,
        collection: &str,
        owner: Identifier,
    ) -> Result<(), InternalError> {
        let scope = Scope::collection(collection);
        let properties = self.indexed_properties(app, owner)?;
        let borrowed: Vec<(&str, Value)> = properties
            .iter()
            .map(|(name, value)| (name.as_str(), value.clone()))
            .collect();
        let encoded = encode_properties(&borrowed)?;

        for (name, value, component) in &encoded {
            self.delete_property_rows(app, &scope, owner, name, value, component)?;

            let mut column = encode_name_component(name);
            column.extend_from_slice(component);
            self.store
                .delete(&IndexRowKey::entity_entries(app, owner), &column)?;
        }

        self.store
            .delete(&IndexRowKey::members(app, &scope), &owner_column(owner))
    }

    /// Connect `source` to `target` under `kind`, indexing `properties` of
    /// the target within the connection scope.
    pub fn connect(
        &self,
        app: &ApplicationId,
        source: Identifier,
        kind: &str,
        target: Identifier,
        properties: &[(&str, Value)],
    ) -> Result<(), InternalError> {
        let scope = Scope::connection(source, kind);
        let encoded = encode_properties(properties)?;

        self.store
            .put(&IndexRowKey::members(app, &scope), owner_column(target), Vec::new())?;

        self.write_property_rows(app, &scope, target, &encoded)
    }

    /// Remove one connection and its scoped property rows.
    pub fn disconnect(
        &self,
        app: &ApplicationId,
        source: Identifier,
        kind: &str,
        target: Identifier,
        properties: &[(&str, Value)],
    ) -> Result<(), InternalError> {
        let scope = Scope::connection(source, kind);

        for (name, value, component) in &encode_properties(properties)? {
            self.delete_property_rows(app, &scope, target, name, value, component)?;
        }

        self.store
            .delete(&IndexRowKey::members(app, &scope), &owner_column(target))
    }

    // Read back every `(property, value)` pair recorded for one owner.
    fn indexed_properties(
        &self,
        app: &ApplicationId,
        owner: Identifier,
    ) -> Result<Vec<(String, Value)>, InternalError> {
        let cells = read_envelope(
            self.store,
            &IndexRowKey::entity_entries(app, owner),
            KeyEnvelope::new(Direction::Asc, Bound::Unbounded, Bound::Unbounded),
            ENTRY_PAGE,
        )?;

        cells
            .into_iter()
            .map(|cell| {
                let name = decode_name_component(&cell.column)?;
                let value = deserialize_bounded(&cell.value, MAX_ENTRY_VALUE_BYTES)?;
                Ok((name, value))
            })
            .collect()
    }

    fn delete_property_rows(
        &self,
        app: &ApplicationId,
        scope: &Scope,
        owner: Identifier,
        name: &str,
        value: &Value,
        component: &[u8],
    ) -> Result<(), InternalError> {
        self.store.delete(
            &IndexRowKey::property(app, scope, name),
            &IndexColumn::encode(component, owner),
        )?;
        for token in keyword_tokens(value) {
            let token = encode_value_component(&Value::Text(token))?;
            self.store.delete(
                &IndexRowKey::keyword(app, scope, name),
                &IndexColumn::encode(&token, owner),
            )?;
        }

        Ok(())
    }

    fn write_property_rows(
        &self,
        app: &ApplicationId,
        scope: &Scope,
        owner: Identifier,
        encoded: &[(String, Value, Vec<u8>)],
    ) -> Result<(), InternalError> {
        let mut distinct: BTreeMap<&str, BTreeSet<&[u8]>> = BTreeMap::new();
        for (name, _, component) in encoded {
            distinct.entry(name).or_default().insert(component);
        }

        for (name, value, component) in encoded {
            let cell = if distinct.get(name.as_str()).is_some_and(|set| set.len() > 1) {
                MULTI_VALUED_CELL.to_vec()
            } else {
                Vec::new()
            };
            self.store.put(
                &IndexRowKey::property(app, scope, name),
                IndexColumn::encode(component, owner),
                cell,
            )?;

            for token in keyword_tokens(value) {
                let token = encode_value_component(&Value::Text(token))?;
                self.store.put(
                    &IndexRowKey::keyword(app, scope, name),
                    IndexColumn::encode(&token, owner),
                    Vec::new(),
                )?;
            }
        }

        Ok(())
    }
}

/// Lowercased keyword tokens of a text value, split on anything that is
/// not alphanumeric. Non-text values have no keywords.
#[must_use]
pub fn keyword_tokens(value: &Value) -> BTreeSet<String> {
    let Value::Text(text) = value else {
        return BTreeSet::new();
    };

    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn encode_properties(
    properties: &[(&str, Value)],
) -> Result<Vec<(String, Value, Vec<u8>)>, InternalError> {
    properties
        .iter()
        .map(|(name, value)| {
            let component = encode_value_component(value)?;
            Ok((name.to_lowercase(), value.clone(), component))
        })
        .collect()
}

// Recover the property name from an entity-entries column.
fn decode_name_component(column: &[u8]) -> Result<String, InternalError> {
    let corrupt = || InternalError::index_corruption("entity entry column has no property name");

    let body = column.get(1..).ok_or_else(corrupt)?;
    let mut name = Vec::new();
    let mut idx = 0;
    while idx + 1 < body.len() {
        match (body[idx], body[idx + 1]) {
            (0, 0) => {
                return String::from_utf8(name).map_err(|_| {
                    InternalError::index_corruption("entity entry property name is not utf-8")
                });
            }
            (0, _) => {
                name.push(0);
                idx += 2;
            }
            (byte, _) => {
                name.push(byte);
                idx += 1;
            }
        }
    }

    Err(corrupt())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryColumnStore;

    fn app() -> ApplicationId {
        ApplicationId::from("acme")
    }

    #[test]
    fn keyword_tokens_split_and_lowercase() {
        let tokens = keyword_tokens(&Value::text("Red-Hat, red  BLUE"));

        assert_eq!(
            tokens.into_iter().collect::<Vec<_>>(),
            vec!["blue".to_string(), "hat".to_string(), "red".to_string()]
        );
        assert!(keyword_tokens(&Value::Int(3)).is_empty());
    }

    #[test]
    fn index_then_unindex_leaves_no_rows() {
        let store = MemoryColumnStore::new();
        let writer = IndexWriter::new(&store);
        let owner = Identifier::from_u128(7);
        let scope = Scope::collection("items");

        writer
            .index_entity(
                &app(),
                "Items",
                owner,
                &[
                    ("title", Value::text("Big Box")),
                    ("tag", Value::Int(1)),
                    ("tag", Value::Int(2)),
                ],
            )
            .expect("index");

        assert_eq!(store.row_len(&IndexRowKey::members(&app(), &scope)).expect("len"), 1);
        assert_eq!(store.row_len(&IndexRowKey::property(&app(), &scope, "tag")).expect("len"), 2);
        assert_eq!(store.row_len(&IndexRowKey::keyword(&app(), &scope, "title")).expect("len"), 2);
        assert_eq!(store.row_len(&IndexRowKey::entity_entries(&app(), owner)).expect("len"), 3);

        writer.unindex_entity(&app(), "items", owner).expect("unindex");

        for row in [
            IndexRowKey::members(&app(), &scope),
            IndexRowKey::property(&app(), &scope, "tag"),
            IndexRowKey::property(&app(), &scope, "title"),
            IndexRowKey::keyword(&app(), &scope, "title"),
            IndexRowKey::entity_entries(&app(), owner),
        ] {
            assert_eq!(store.row_len(&row).expect("len"), 0, "{row}");
        }
    }

    #[test]
    fn property_cells_mark_owners_with_several_values() {
        let store = MemoryColumnStore::new();
        let writer = IndexWriter::new(&store);
        let owner = Identifier::from_u128(4);
        let scope = Scope::collection("items");

        writer
            .index_entity(
                &app(),
                "items",
                owner,
                &[
                    ("tag", Value::Int(1)),
                    ("tag", Value::Int(2)),
                    ("size", Value::Int(3)),
                    ("size", Value::Int(3)),
                ],
            )
            .expect("index");

        let cell = |property: &str, value: Value| {
            let component = encode_value_component(&value).expect("encodes");
            store
                .get(
                    &IndexRowKey::property(&app(), &scope, property),
                    &IndexColumn::encode(&component, owner),
                )
                .expect("read")
                .expect("cell exists")
        };

        assert_eq!(cell("tag", Value::Int(1)), MULTI_VALUED_CELL.to_vec());
        assert_eq!(cell("tag", Value::Int(2)), MULTI_VALUED_CELL.to_vec());
        assert!(cell("size", Value::Int(3)).is_empty());
    }

    #[test]
    fn connect_writes_connection_scoped_rows() {
        let store = MemoryColumnStore::new();
        let writer = IndexWriter::new(&store);
        let source = Identifier::from_u128(1);
        let target = Identifier::from_u128(2);
        let scope = Scope::connection(source, "likes");

        writer
            .connect(&app(), source, "Likes", target, &[("rank", Value::Int(5))])
            .expect("connect");
        assert_eq!(store.row_len(&IndexRowKey::members(&app(), &scope)).expect("len"), 1);
        assert_eq!(store.row_len(&IndexRowKey::property(&app(), &scope, "rank")).expect("len"), 1);

        writer
            .disconnect(&app(), source, "likes", target, &[("rank", Value::Int(5))])
            .expect("disconnect");
        assert_eq!(store.row_len(&IndexRowKey::members(&app(), &scope)).expect("len"), 0);
    }

    #[test]
    fn nan_values_are_rejected_before_any_write() {
        let store = MemoryColumnStore::new();
        let writer = IndexWriter::new(&store);

        writer
            .index_entity(
                &app(),
                "items",
                Identifier::from_u128(1),
                &[("x", Value::Float(f64::NAN))],
            )
            .expect_err("nan");
        assert_eq!(
            store
                .row_len(&IndexRowKey::members(&app(), &Scope::collection("items")))
                .expect("len"),
            0
        );
    }

    #[test]
    fn property_names_round_trip_through_entry_columns() {
        let mut column = encode_name_component("a\u{0}b");
        column.extend_from_slice(&[0x20, 1, 2]);

        assert_eq!(decode_name_component(&column).expect("decodes"), "a\u{0}b");
        decode_name_component(&[0x40, b'x']).expect_err("unterminated");
    }
}
