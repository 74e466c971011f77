//! Query engine - resolution, fail-soft fetch, and weighted blending.
//!
//! ```text
//! DataSource ──resolve──► ResolvedQuery { params, tags, revalidate }
//!     │                        │
//!     │ mode != mixed          └──► Retriever ──► ResultSet (or empty on error)
//!     │
//!     └ mode == mixed ──► draw counts ──► N sub-queries (concurrent)
//!                              └──► concat ─► dedup ─► sort ─► truncate
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use pagecraft_core::{DataSource, SortField, WeightedSource};
use tracing::{debug, warn};

use crate::dates::{resolve_range, Clock, SystemClock};
use crate::error::{QueryError, QueryResult};
use crate::item::ResultSet;
use crate::params::QueryParams;
use crate::retriever::{sort_items, Retriever};
use crate::tags::{cache_tags, revalidate_secs};

/// A data source turned into a wire query plus cache metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    /// Parameters sent to the backend.
    pub params: QueryParams,
    /// Invalidation tags.
    pub tags: Vec<String>,
    /// Advisory staleness budget in seconds.
    pub revalidate_secs: u64,
}

/// Resolves and executes data sources against a [`Retriever`].
#[derive(Clone)]
pub struct QueryEngine {
    retriever: Arc<dyn Retriever>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("now", &self.clock.now_secs())
            .finish_non_exhaustive()
    }
}

impl QueryEngine {
    /// Engine on the wall clock.
    #[must_use]
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self::with_clock(retriever, Arc::new(SystemClock))
    }

    /// Engine with an explicit clock.
    #[must_use]
    pub fn with_clock(retriever: Arc<dyn Retriever>, clock: Arc<dyn Clock>) -> Self {
        Self { retriever, clock }
    }

    /// Resolve a source into wire parameters, tags, and revalidation budget.
    #[must_use]
    pub fn resolve(&self, source: &DataSource) -> ResolvedQuery {
        let range = resolve_range(source.date_range.as_ref(), self.clock.now_secs());
        ResolvedQuery {
            params: QueryParams::new(source, range),
            tags: cache_tags(source),
            revalidate_secs: revalidate_secs(source.mode),
        }
    }

    /// Fetch any source, never failing. Errors degrade to an empty result.
    pub async fn fetch(&self, source: &DataSource) -> ResultSet {
        let result = if source.is_mixed() {
            self.try_fetch_mixed(source).await
        } else {
            self.try_fetch_single(source).await
        };
        result.unwrap_or_else(|e| {
            warn!(mode = %source.mode, "Query failed, serving empty result: {e}");
            ResultSet::empty()
        })
    }

    /// Fetch a non-mixed source, never failing.
    pub async fn fetch_single(&self, source: &DataSource) -> ResultSet {
        self.try_fetch_single(source).await.unwrap_or_else(|e| {
            warn!(mode = %source.mode, "Query failed, serving empty result: {e}");
            ResultSet::empty()
        })
    }

    /// Fetch a non-mixed source, reporting retrieval failures.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Retrieve`] if the backend call fails.
    pub async fn try_fetch_single(&self, source: &DataSource) -> QueryResult<ResultSet> {
        let query = self.resolve(source);
        debug!(query = %query.params.to_query_string(), "Fetching");
        Ok(self.retriever.retrieve(&query.params).await?)
    }

    /// Fetch a mixed source, never failing.
    pub async fn fetch_mixed(&self, source: &DataSource) -> ResultSet {
        self.try_fetch_mixed(source).await.unwrap_or_else(|e| {
            warn!("Blend failed, serving empty result: {e}");
            ResultSet::empty()
        })
    }

    /// Blend weighted inputs into one result.
    ///
    /// Each input draws `ceil(limit * weight / total_weight)` items and
    /// inherits the parent's exclusions, filters, date range and sort. Inputs
    /// are fetched concurrently; a failing input contributes nothing. The
    /// combined list is deduplicated (first occurrence wins), stably sorted by
    /// views or publish time, and cut to `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyBlend`] if no input has positive weight.
    pub async fn try_fetch_mixed(&self, source: &DataSource) -> QueryResult<ResultSet> {
        let counts = draw_counts(source.limit, &source.sources).ok_or(QueryError::EmptyBlend)?;

        let inputs: Vec<DataSource> = source
            .sources
            .iter()
            .zip(&counts)
            .filter(|(_, count)| **count > 0)
            .map(|(input, count)| sub_source(source, input, *count))
            .collect();
        debug!(inputs = inputs.len(), counts = ?counts, "Blending");

        let results = join_all(inputs.iter().map(|input| self.fetch_single(input))).await;

        let mut seen = HashSet::new();
        let mut items: Vec<_> = results
            .into_iter()
            .flat_map(|set| set.items)
            .filter(|item| seen.insert(item.id.clone()))
            .collect();

        let field = if source.sort_by == SortField::Views {
            SortField::Views
        } else {
            SortField::PublishedAt
        };
        sort_items(&mut items, field, source.sort_order);

        let before = items.len();
        let limit = usize::try_from(source.limit).unwrap_or(usize::MAX);
        items.truncate(limit);
        Ok(ResultSet {
            items,
            total: before as u64,
            has_more: before > limit,
        })
    }
}

/// Per-input draw counts: `ceil(limit * w_i / Σw)`.
///
/// Returns `None` when the weights sum to zero (or there are no inputs).
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn draw_counts(limit: u32, sources: &[WeightedSource]) -> Option<Vec<u32>> {
    let total: f64 = sources.iter().map(WeightedSource::effective_weight).sum();
    if total <= 0.0 {
        return None;
    }
    Some(
        sources
            .iter()
            .map(|source| {
                let share = f64::from(limit) * source.effective_weight() / total;
                // Round off float noise so exact shares don't ceil up
                let share = (share * 1e9).round() / 1e9;
                share.ceil().min(f64::from(u32::MAX)) as u32
            })
            .collect(),
    )
}

fn sub_source(parent: &DataSource, input: &WeightedSource, limit: u32) -> DataSource {
    DataSource {
        mode: input.mode,
        selectors: input.selectors.clone(),
        limit,
        offset: 0,
        sort_by: parent.sort_by,
        sort_order: parent.sort_order,
        exclude_ids: parent.exclude_ids.clone(),
        exclude_from_other: false,
        date_range: parent.date_range.clone(),
        filters: parent.filters.clone(),
        sources: Vec::new(),
    }
}
