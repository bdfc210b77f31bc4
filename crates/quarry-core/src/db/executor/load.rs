use crate::{
    config::EngineConfig,
    db::{
        cursor::{ContinuationToken, CursorCache, NodePath, QuerySignature, TokenState},
        executor::{
            iter::{ResultIterator, ScanColumn, ScanContext},
            plan::plan_query,
        },
        identity::Identifier,
        index::Scope,
        query::{Connection, Page, Query},
        store::ColumnStore,
    },
    error::InternalError,
    obs::sink::{MetricsEvent, record},
};
use tracing::{debug, info_span, warn};

///
/// LoadExecutor
///
/// Page-at-a-time query evaluation over one column store.
/// Each call builds a fresh iterator tree, drains it to the page limit and
/// issues the continuation token for the next page.
///

pub struct LoadExecutor<'s> {
    store: &'s dyn ColumnStore,
    config: EngineConfig,
}

impl<'s> LoadExecutor<'s> {
    #[must_use]
    pub const fn new(store: &'s dyn ColumnStore, config: EngineConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one page of `query`.
    ///
    /// A cursor that does not decode, or that was issued for a different
    /// query shape, is rejected; it never restarts the query. Store failures
    /// leave the caller's cursor valid for a retry.
    pub fn execute(&self, query: &Query) -> Result<Page, InternalError> {
        let scope = query.scope.to_string();
        let span = info_span!("query", app = %query.app, scope = %scope);
        let _enter = span.enter();

        record(&MetricsEvent::QueryStart {
            scope: scope.clone(),
        });

        let signature = QuerySignature::for_query(query);
        let limit = self.config.effective_limit(query.limit);

        let (boundary, positions) = match self.resume_state(query, signature)? {
            Some(TokenState::Resume {
                boundary,
                positions,
            }) => (Some(boundary), positions),
            Some(TokenState::Exhausted) => {
                debug!("cursor marks an exhausted stream");
                return finish_page(
                    query,
                    &scope,
                    Vec::new(),
                    ContinuationToken::exhausted(signature),
                );
            }
            None => (None, CursorCache::new()),
        };

        let batch_size = self.config.scan_batch_size(limit);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let ctx = ScanContext {
            store: self.store,
            app: &query.app,
            scope: &query.scope,
            batch_size,
            window: limit.saturating_add(1),
        };
        let mut root = plan_query(ctx, query, &positions)?;
        let comparator = root.comparator();

        let mut taken: Vec<ScanColumn> = Vec::new();
        let mut more = false;

        'drain: while taken.len() < limit {
            let Some(batch) = root.next_batch()? else {
                break;
            };
            let fresh = batch.into_columns().into_iter().filter(|column| {
                boundary
                    .as_deref()
                    .is_none_or(|boundary| comparator.advances(boundary, column.sort_key()))
            });

            for column in fresh {
                if taken.len() == limit {
                    more = true;
                    break 'drain;
                }
                taken.push(column);
            }
        }
        if !more && taken.len() == limit {
            more = root.has_next()?;
        }

        let token = match taken.last() {
            Some(last) if more => {
                let mut cache = CursorCache::new();
                root.finalize_cursor(&mut cache, &NodePath::root(), last);
                ContinuationToken::resume(signature, last.sort_key().to_vec(), cache)
            }
            _ => ContinuationToken::exhausted(signature),
        };

        finish_page(query, &scope, taken, token)
    }

    /// Follow cursors until the stream is exhausted and return every id.
    pub fn collect_all(&self, query: &Query) -> Result<Vec<Identifier>, InternalError> {
        let mut query = query.clone();
        let mut ids = Vec::new();

        loop {
            let page = self.execute(&query)?;
            ids.extend(page.ids);
            if page.exhausted {
                return Ok(ids);
            }
            query.cursor = Some(page.cursor);
        }
    }

    // Decode the query's cursor, if any. Rejections are logged and counted.
    fn resume_state(
        &self,
        query: &Query,
        signature: QuerySignature,
    ) -> Result<Option<TokenState>, InternalError> {
        let Some(cursor) = query.cursor.as_deref() else {
            return Ok(None);
        };

        match ContinuationToken::decode(cursor, signature, self.config.max_cursor_hex_len) {
            Ok(token) => Ok(Some(token.into_state())),
            Err(err) => {
                warn!(error = %err, "rejected continuation cursor");
                record(&MetricsEvent::CursorRejected);
                Err(err.into())
            }
        }
    }
}

fn finish_page(
    query: &Query,
    scope: &str,
    taken: Vec<ScanColumn>,
    token: ContinuationToken,
) -> Result<Page, InternalError> {
    let exhausted = matches!(token.state(), TokenState::Exhausted);
    let ids: Vec<Identifier> = taken.iter().map(ScanColumn::owner).collect();
    let connections = match &query.scope {
        Scope::Connection { source, .. } => ids
            .iter()
            .map(|target| Connection {
                source: *source,
                target: *target,
            })
            .collect(),
        Scope::Collection(_) => Vec::new(),
    };

    record(&MetricsEvent::QueryFinish {
        scope: scope.to_string(),
        ids_returned: u64::try_from(ids.len()).unwrap_or(u64::MAX),
        exhausted,
    });
    debug!(ids = ids.len(), exhausted, "query page complete");

    Ok(Page {
        ids,
        connections,
        cursor: token.encode()?,
        exhausted,
    })
}
