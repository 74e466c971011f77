//! Cross-block prefetch with page-wide deduplication.
//!
//! Bindings run strictly in the order given, one at a time. Items returned by
//! earlier bindings are excluded from later bindings that opted in with
//! `excludeFromOther`, so those blocks never repeat each other's content.

use std::collections::{BTreeSet, HashMap, HashSet};

use pagecraft_core::{BlockId, DataBinding};
use tracing::debug;

use crate::engine::QueryEngine;
use crate::item::ResultSet;

/// Page-level cache metadata for a set of bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Union of every binding's invalidation tags.
    pub tags: BTreeSet<String>,
    /// Shortest staleness budget among the bindings, if any.
    pub revalidate_secs: Option<u64>,
}

/// Runs every data-bound block of a page through the query engine.
#[derive(Debug, Clone)]
pub struct PrefetchCoordinator {
    engine: QueryEngine,
}

impl PrefetchCoordinator {
    /// Create a coordinator over an engine.
    #[must_use]
    pub const fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }

    /// The underlying engine.
    #[must_use]
    pub const fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Resolve every binding, in order, threading displayed ids forward.
    ///
    /// A binding with `exclude_from_other` has every id shown so far added to
    /// its exclusions before it runs. Every binding's results, opted in or
    /// not, count as shown for the bindings after it. Failures yield an empty
    /// result for that block only.
    pub async fn prefetch_all(&self, bindings: &[DataBinding]) -> HashMap<BlockId, ResultSet> {
        let mut results = HashMap::with_capacity(bindings.len());
        let mut displayed: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (position, binding) in bindings.iter().enumerate() {
            let mut source = binding.data_source.clone();
            if source.exclude_from_other {
                source.exclude(&displayed);
            }
            let set = self.engine.fetch(&source).await;
            debug!(
                block = %binding.block_id,
                position,
                mode = %source.mode,
                items = set.len(),
                excluded = source.exclude_ids.len(),
                "Prefetched block"
            );
            for id in set.ids() {
                if seen.insert(id.clone()) {
                    displayed.push(id.clone());
                }
            }
            results.insert(binding.block_id.clone(), set);
        }
        results
    }

    /// Cache tags and revalidation budget covering every binding.
    #[must_use]
    pub fn cache_policy(&self, bindings: &[DataBinding]) -> CachePolicy {
        bindings
            .iter()
            .map(|binding| self.engine.resolve(&binding.data_source))
            .fold(CachePolicy::default(), |mut policy, query| {
                policy.tags.extend(query.tags);
                policy.revalidate_secs = Some(
                    policy
                        .revalidate_secs
                        .map_or(query.revalidate_secs, |r| r.min(query.revalidate_secs)),
                );
                policy
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::FixedClock;
    use crate::item::ContentItem;
    use crate::retriever::InMemoryRetriever;
    use pagecraft_core::{DataSource, DataSourceMode};
    use std::sync::Arc;

    fn corpus() -> Vec<ContentItem> {
        (1..=6)
            .map(|n| {
                ContentItem::new(format!("a{n}"), format!("Article {n}"))
                    .published(format!("2024-03-{:02}T00:00:00Z", 10 - n))
                    .with_views(n * 10)
            })
            .collect()
    }

    fn coordinator() -> (PrefetchCoordinator, Arc<InMemoryRetriever>) {
        let backend = Arc::new(InMemoryRetriever::new(corpus()));
        let engine = QueryEngine::with_clock(backend.clone(), Arc::new(FixedClock(0)));
        (PrefetchCoordinator::new(engine), backend)
    }

    fn bind(id: &str, source: DataSource) -> DataBinding {
        DataBinding {
            block_id: BlockId::new(id),
            data_source: source,
        }
    }

    fn ids(results: &HashMap<BlockId, ResultSet>, block: &str) -> Vec<String> {
        results[&BlockId::new(block)].ids().cloned().collect()
    }

    #[tokio::test]
    async fn test_opted_in_blocks_do_not_repeat() {
        let (coordinator, backend) = coordinator();
        let bindings = vec![
            bind("hero", DataSource::latest(2).excluding_others()),
            bind("grid", DataSource::latest(3).excluding_others()),
        ];
        let results = coordinator.prefetch_all(&bindings).await;
        assert_eq!(ids(&results, "hero"), vec!["a1", "a2"]);
        assert_eq!(ids(&results, "grid"), vec!["a3", "a4", "a5"]);

        let requests = backend.requests();
        assert!(requests[0].exclude_ids.is_empty());
        assert_eq!(requests[1].exclude_ids, vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn test_opted_out_blocks_may_repeat_but_still_claim() {
        let (coordinator, _) = coordinator();
        let bindings = vec![
            bind("hero", DataSource::latest(2)),
            bind("related", DataSource::latest(2)),
            bind("grid", DataSource::latest(2).excluding_others()),
        ];
        let results = coordinator.prefetch_all(&bindings).await;
        assert_eq!(ids(&results, "hero"), ids(&results, "related"));
        assert_eq!(ids(&results, "grid"), vec!["a3", "a4"]);
    }

    #[tokio::test]
    async fn test_own_exclusions_are_kept() {
        let (coordinator, backend) = coordinator();
        let mut grid = DataSource::latest(1).excluding_others();
        grid.exclude_ids = vec!["a2".into()];
        let bindings = vec![bind("hero", DataSource::latest(1)), bind("grid", grid)];
        let results = coordinator.prefetch_all(&bindings).await;
        assert_eq!(ids(&results, "grid"), vec!["a3"]);
        assert_eq!(backend.requests()[1].exclude_ids, vec!["a2", "a1"]);
    }

    #[test]
    fn test_cache_policy_unions_tags_and_takes_shortest_budget() {
        let (coordinator, _) = coordinator();
        let bindings = vec![
            bind("ticker", DataSource::new(DataSourceMode::Breaking)),
            bind("politics", DataSource::categories(["politics"])),
        ];
        let policy = coordinator.cache_policy(&bindings);
        assert_eq!(policy.revalidate_secs, Some(30));
        assert!(policy.tags.contains("breaking"));
        assert!(policy.tags.contains("category:politics"));
        assert!(policy.tags.contains("articles"));
        assert_eq!(coordinator.cache_policy(&[]), CachePolicy::default());
    }
}
