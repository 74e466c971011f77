//! Wire query parameters.
//!
//! A [`QueryParams`] is the flat form of a data source that goes to the
//! retrieval backend. Lists are comma-joined; unset values are omitted.

use pagecraft_core::{DataSource, DataSourceMode, SortField, SortOrder};
use serde::{Deserialize, Serialize};

use crate::dates::ResolvedRange;

/// Flat query parameters for one retrieval call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    /// Selection mode.
    pub mode: DataSourceMode,
    /// Category selector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_ids: Vec<String>,
    /// Tag selector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<String>,
    /// Author selector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author_ids: Vec<String>,
    /// Article selector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub article_ids: Vec<String>,
    /// Maximum items.
    pub limit: u32,
    /// Items to skip.
    pub offset: u32,
    /// Sort field.
    pub sort_by: SortField,
    /// Sort direction.
    pub sort_order: SortOrder,
    /// Ids to leave out.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_ids: Vec<String>,
    /// Lower publish-date bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    /// Upper publish-date bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    /// Lead image filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_image: Option<bool>,
    /// Video filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_video: Option<bool>,
    /// Minimum reading time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reading_time: Option<u32>,
    /// Maximum reading time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reading_time: Option<u32>,
    /// Premium filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    /// Language filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Editorial status filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl QueryParams {
    /// Flatten a data source with already-resolved date bounds.
    #[must_use]
    pub fn new(source: &DataSource, range: ResolvedRange) -> Self {
        let filters = &source.filters;
        Self {
            mode: source.mode,
            category_ids: source.selectors.category_ids.clone(),
            tag_ids: source.selectors.tag_ids.clone(),
            author_ids: source.selectors.author_ids.clone(),
            article_ids: source.selectors.article_ids.clone(),
            limit: source.limit,
            offset: source.offset,
            sort_by: source.sort_by,
            sort_order: source.sort_order,
            exclude_ids: source.exclude_ids.clone(),
            date_from: range.from,
            date_to: range.to,
            has_image: filters.has_image,
            has_video: filters.has_video,
            min_reading_time: filters.min_reading_time,
            max_reading_time: filters.max_reading_time,
            is_premium: filters.is_premium,
            language: filters.language.clone(),
            status: filters.status.map(|s| s.as_str().to_string()),
        }
    }

    /// Key/value pairs in a stable order, lists comma-joined, unset values
    /// omitted.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("mode", self.mode.as_str().to_string())];
        let lists = [
            ("categoryIds", &self.category_ids),
            ("tagIds", &self.tag_ids),
            ("authorIds", &self.author_ids),
            ("articleIds", &self.article_ids),
        ];
        pairs.extend(
            lists
                .into_iter()
                .filter(|(_, ids)| !ids.is_empty())
                .map(|(key, ids)| (key, ids.join(","))),
        );
        pairs.push(("limit", self.limit.to_string()));
        pairs.push(("offset", self.offset.to_string()));
        pairs.push(("sortBy", self.sort_by.as_str().to_string()));
        pairs.push(("sortOrder", self.sort_order.as_str().to_string()));
        if !self.exclude_ids.is_empty() {
            pairs.push(("excludeIds", self.exclude_ids.join(",")));
        }

        let optional = [
            ("dateFrom", self.date_from.clone()),
            ("dateTo", self.date_to.clone()),
            ("hasImage", self.has_image.map(|v| v.to_string())),
            ("hasVideo", self.has_video.map(|v| v.to_string())),
            ("minReadingTime", self.min_reading_time.map(|v| v.to_string())),
            ("maxReadingTime", self.max_reading_time.map(|v| v.to_string())),
            ("isPremium", self.is_premium.map(|v| v.to_string())),
            ("language", self.language.clone()),
            ("status", self.status.clone()),
        ];
        pairs.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.map(|v| (key, v))),
        );
        pairs
    }

    /// URL-encoded query string, without a leading `?`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_pairs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft_core::{ContentStatus, DatePreset, DateRange};

    #[test]
    fn test_minimal_source_pairs() {
        let params = QueryParams::new(&DataSource::latest(5), ResolvedRange::default());
        assert_eq!(
            params.to_query_string(),
            "mode=latest&limit=5&offset=0&sortBy=publishedAt&sortOrder=desc"
        );
    }

    #[test]
    fn test_lists_are_comma_joined() {
        let mut source = DataSource::categories(["politics", "world"]);
        source.exclude_ids = vec!["a1".into(), "a2".into()];
        let params = QueryParams::new(&source, ResolvedRange::default());
        let pairs = params.to_pairs();
        assert!(pairs.contains(&("categoryIds", "politics,world".to_string())));
        assert!(pairs.contains(&("excludeIds", "a1,a2".to_string())));
        assert!(params
            .to_query_string()
            .contains("categoryIds=politics%2Cworld"));
    }

    #[test]
    fn test_filters_and_dates_are_emitted() {
        let mut source = DataSource::latest(3).with_date_range(DateRange::preset(DatePreset::Today));
        source.filters.has_image = Some(true);
        source.filters.status = Some(ContentStatus::Published);
        source.filters.language = Some("en".into());
        let range = ResolvedRange {
            from: Some("2024-03-15T00:00:00Z".into()),
            to: Some("2024-03-15T10:00:00Z".into()),
        };
        let pairs = QueryParams::new(&source, range).to_pairs();
        assert!(pairs.contains(&("dateFrom", "2024-03-15T00:00:00Z".to_string())));
        assert!(pairs.contains(&("hasImage", "true".to_string())));
        assert!(pairs.contains(&("status", "published".to_string())));
        assert!(pairs.contains(&("language", "en".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "hasVideo"));
    }
}
