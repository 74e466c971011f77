//! The retrieval boundary and an in-memory backend.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pagecraft_core::{DataSourceMode, SortField, SortOrder};
use serde::Deserialize;

use crate::dates::parse_rfc3339;
use crate::error::RetrieveError;
use crate::item::{ContentItem, RawResponse, ResultSet};
use crate::params::QueryParams;

/// A content backend that answers wire queries.
///
/// Implementations report failures as errors; the query engine decides how to
/// degrade.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Run one query.
    async fn retrieve(&self, params: &QueryParams) -> Result<ResultSet, RetrieveError>;
}

#[async_trait]
impl<R: Retriever + ?Sized> Retriever for Arc<R> {
    async fn retrieve(&self, params: &QueryParams) -> Result<ResultSet, RetrieveError> {
        (**self).retrieve(params).await
    }
}

/// Backend over a fixed corpus held in memory.
///
/// Applies selectors, exclusions, filters, date bounds, sort and paging the
/// way a content API would. Every query it receives is recorded.
#[derive(Debug, Default)]
pub struct InMemoryRetriever {
    corpus: Vec<ContentItem>,
    requests: Mutex<Vec<QueryParams>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Corpus {
    List(Vec<ContentItem>),
    Wrapped(RawResponse),
}

impl InMemoryRetriever {
    /// Serve the given items.
    #[must_use]
    pub fn new(corpus: Vec<ContentItem>) -> Self {
        Self {
            corpus,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Load a corpus from JSON: a bare item array or an `{items | data}` payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is neither shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let items = match serde_json::from_str::<Corpus>(json)? {
            Corpus::List(items) => items,
            Corpus::Wrapped(raw) => ResultSet::from(raw).items,
        };
        Ok(Self::new(items))
    }

    /// Number of items in the corpus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    /// Whether the corpus is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    /// Every query received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<QueryParams> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Answer a query synchronously.
    #[must_use]
    pub fn query(&self, params: &QueryParams) -> ResultSet {
        let excluded: HashSet<&str> = params.exclude_ids.iter().map(String::as_str).collect();
        let from = params.date_from.as_deref().and_then(parse_rfc3339);
        let to = params.date_to.as_deref().and_then(parse_rfc3339);

        let mut matched: Vec<&ContentItem> = if params.mode == DataSourceMode::Manual {
            params
                .article_ids
                .iter()
                .filter_map(|id| self.corpus.iter().find(|item| &item.id == id))
                .collect()
        } else {
            let anchors = self.related_anchors(params);
            self.corpus
                .iter()
                .filter(|item| selects(params, item, anchors.as_ref()))
                .collect()
        };

        matched.retain(|item| {
            !excluded.contains(item.id.as_str())
                && passes_filters(params, item)
                && within(item.published_secs(), from, to)
        });

        match params.mode {
            DataSourceMode::Manual => {}
            DataSourceMode::Trending => sort_items(&mut matched, SortField::Views, SortOrder::Desc),
            _ => sort_items(&mut matched, params.sort_by, params.sort_order),
        }

        let total = matched.len();
        let offset = usize::try_from(params.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(params.limit).unwrap_or(usize::MAX);
        let items: Vec<ContentItem> = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        let has_more = offset.saturating_add(items.len()) < total;
        ResultSet {
            items,
            total: total as u64,
            has_more,
        }
    }

    /// Categories and tags of the anchor articles for `related` queries.
    fn related_anchors(&self, params: &QueryParams) -> Option<(HashSet<String>, HashSet<String>)> {
        if params.mode != DataSourceMode::Related {
            return None;
        }
        let anchors = self
            .corpus
            .iter()
            .filter(|item| params.article_ids.contains(&item.id));
        let mut categories = HashSet::new();
        let mut tags = HashSet::new();
        for anchor in anchors {
            categories.extend(anchor.category_ids.iter().cloned());
            tags.extend(anchor.tag_ids.iter().cloned());
        }
        Some((categories, tags))
    }
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn retrieve(&self, params: &QueryParams) -> Result<ResultSet, RetrieveError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(params.clone());
        }
        Ok(self.query(params))
    }
}

fn intersects(wanted: &[String], have: &[String]) -> bool {
    wanted.iter().any(|id| have.contains(id))
}

fn selects(
    params: &QueryParams,
    item: &ContentItem,
    anchors: Option<&(HashSet<String>, HashSet<String>)>,
) -> bool {
    match params.mode {
        DataSourceMode::Latest | DataSourceMode::Mixed | DataSourceMode::Trending => true,
        DataSourceMode::Category | DataSourceMode::Categories => {
            intersects(&params.category_ids, &item.category_ids)
        }
        DataSourceMode::Tag | DataSourceMode::Tags => intersects(&params.tag_ids, &item.tag_ids),
        DataSourceMode::Author | DataSourceMode::Authors => {
            intersects(&params.author_ids, &item.author_ids)
        }
        DataSourceMode::Featured => item.flag("featured") == Some(true),
        DataSourceMode::Breaking => item.flag("breaking") == Some(true),
        DataSourceMode::Related => {
            !params.article_ids.contains(&item.id)
                && anchors.is_some_and(|(categories, tags)| {
                    item.category_ids.iter().any(|c| categories.contains(c))
                        || item.tag_ids.iter().any(|t| tags.contains(t))
                })
        }
        DataSourceMode::Manual => params.article_ids.contains(&item.id),
    }
}

fn passes_filters(params: &QueryParams, item: &ContentItem) -> bool {
    let flag_ok = |wanted: Option<bool>, key: &str| {
        wanted.map_or(true, |w| item.flag(key).unwrap_or(false) == w)
    };
    let reading_time = item.number("readingTime");
    flag_ok(params.has_image, "hasImage")
        && flag_ok(params.has_video, "hasVideo")
        && flag_ok(params.is_premium, "isPremium")
        && params
            .min_reading_time
            .map_or(true, |min| reading_time.is_some_and(|t| t >= u64::from(min)))
        && params
            .max_reading_time
            .map_or(true, |max| reading_time.is_some_and(|t| t <= u64::from(max)))
        && params
            .language
            .as_deref()
            .map_or(true, |lang| item.text("language") == Some(lang))
        && params
            .status
            .as_deref()
            .map_or(true, |status| item.text("status").unwrap_or("published") == status)
}

fn within(at: Option<i64>, from: Option<i64>, to: Option<i64>) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    at.is_some_and(|t| from.map_or(true, |f| t >= f) && to.map_or(true, |u| t <= u))
}

/// Stable sort by a field.
pub(crate) fn sort_items<T: std::borrow::Borrow<ContentItem>>(
    items: &mut [T],
    field: SortField,
    order: SortOrder,
) {
    items.sort_by(|a, b| {
        let ordering = compare(a.borrow(), b.borrow(), field);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn compare(a: &ContentItem, b: &ContentItem, field: SortField) -> Ordering {
    match field {
        SortField::PublishedAt => a.published_secs().cmp(&b.published_secs()),
        SortField::UpdatedAt => a.updated_secs().cmp(&b.updated_secs()),
        SortField::Views => a.views.cmp(&b.views),
        SortField::Comments => a.comments.cmp(&b.comments),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    }
}
