//! Data-source descriptors - what content a block should display.
//!
//! These are declarative: nothing here talks to a backend. The query crate
//! turns a [`DataSource`] into wire parameters and executes it.

use serde::{Deserialize, Serialize};

/// Content selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceMode {
    /// Newest content site-wide.
    #[default]
    Latest,
    /// A single category.
    Category,
    /// Any of several categories.
    Categories,
    /// A single tag.
    Tag,
    /// Any of several tags.
    Tags,
    /// A single author.
    Author,
    /// Any of several authors.
    Authors,
    /// Hand-picked articles.
    Manual,
    /// Most viewed recently.
    Trending,
    /// Editor-flagged featured content.
    Featured,
    /// Breaking news.
    Breaking,
    /// Related to the article being rendered.
    Related,
    /// Weighted blend of sub-sources.
    Mixed,
}

impl DataSourceMode {
    /// Wire name of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Category => "category",
            Self::Categories => "categories",
            Self::Tag => "tag",
            Self::Tags => "tags",
            Self::Author => "author",
            Self::Authors => "authors",
            Self::Manual => "manual",
            Self::Trending => "trending",
            Self::Featured => "featured",
            Self::Breaking => "breaking",
            Self::Related => "related",
            Self::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for DataSourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field to order results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// Publish timestamp.
    #[default]
    PublishedAt,
    /// Last update timestamp.
    UpdatedAt,
    /// View count.
    Views,
    /// Comment count.
    Comments,
    /// Title, alphabetically.
    Title,
}

impl SortField {
    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PublishedAt => "publishedAt",
            Self::UpdatedAt => "updatedAt",
            Self::Views => "views",
            Self::Comments => "comments",
            Self::Title => "title",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Largest / newest first.
    #[default]
    Desc,
    /// Smallest / oldest first.
    Asc,
}

impl SortOrder {
    /// Wire name of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desc => "desc",
            Self::Asc => "asc",
        }
    }
}

/// Named relative date ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    /// Midnight to now.
    Today,
    /// Previous midnight to midnight.
    Yesterday,
    /// Most recent Sunday to now.
    ThisWeek,
    /// First of the month to now.
    ThisMonth,
    /// January 1st to now.
    ThisYear,
}

/// Publish-date window for a query.
///
/// Explicit bounds win over the preset. Neither means unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Explicit lower bound (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Explicit upper bound (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Relative window, used when no explicit bound is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<DatePreset>,
}

impl DateRange {
    /// A range from a preset.
    #[must_use]
    pub const fn preset(preset: DatePreset) -> Self {
        Self {
            from: None,
            to: None,
            preset: Some(preset),
        }
    }

    /// Whether either explicit bound is set.
    #[must_use]
    pub const fn is_explicit(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }
}

/// Editorial status filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    /// Live content.
    Published,
    /// Scheduled for later.
    Scheduled,
    /// Not yet published.
    Draft,
}

impl ContentStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Scheduled => "scheduled",
            Self::Draft => "draft",
        }
    }
}

/// Content filters. Unset fields do not constrain the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    /// Only items with a lead image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_image: Option<bool>,
    /// Only items with a video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_video: Option<bool>,
    /// Minimum reading time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reading_time: Option<u32>,
    /// Maximum reading time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reading_time: Option<u32>,
    /// Only premium (or only free) items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    /// Content language code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Editorial status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
}

/// Selector ids, shared by top-level sources and mixed sub-sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selectors {
    /// Category ids for `category` / `categories`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_ids: Vec<String>,
    /// Tag ids for `tag` / `tags`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<String>,
    /// Author ids for `author` / `authors`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author_ids: Vec<String>,
    /// Article ids for `manual`, or the anchor article for `related`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub article_ids: Vec<String>,
}

/// One weighted input of a mixed source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedSource {
    /// Selection mode of this input.
    pub mode: DataSourceMode,
    /// Selector ids for the mode.
    #[serde(flatten)]
    pub selectors: Selectors,
    /// Relative weight; defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl WeightedSource {
    /// Create an input with weight 1.
    #[must_use]
    pub fn new(mode: DataSourceMode, selectors: Selectors) -> Self {
        Self {
            mode,
            selectors,
            weight: None,
        }
    }

    /// Set the weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Effective weight; non-positive and non-finite weights count as 0.
    #[must_use]
    pub fn effective_weight(&self) -> f64 {
        match self.weight {
            None => 1.0,
            Some(w) if w.is_finite() && w > 0.0 => w,
            Some(_) => 0.0,
        }
    }
}

/// Declarative content query attached to a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    /// Selection mode.
    pub mode: DataSourceMode,
    /// Selector ids for the mode.
    #[serde(flatten)]
    pub selectors: Selectors,
    /// Maximum number of items.
    #[serde(default = "DataSource::default_limit")]
    pub limit: u32,
    /// Number of items to skip.
    #[serde(default)]
    pub offset: u32,
    /// Sort field.
    #[serde(default)]
    pub sort_by: SortField,
    /// Sort direction.
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Item ids that must not be returned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_ids: Vec<String>,
    /// Skip items already shown by earlier blocks on the page.
    #[serde(default)]
    pub exclude_from_other: bool,
    /// Publish-date window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    /// Content filters.
    #[serde(default)]
    pub filters: Filters,
    /// Weighted inputs; only meaningful when `mode` is `mixed`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<WeightedSource>,
}

impl DataSource {
    /// Default item limit.
    pub const DEFAULT_LIMIT: u32 = 10;

    const fn default_limit() -> u32 {
        Self::DEFAULT_LIMIT
    }

    /// Create a source with default paging and sort.
    #[must_use]
    pub fn new(mode: DataSourceMode) -> Self {
        Self {
            mode,
            selectors: Selectors::default(),
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            exclude_ids: Vec::new(),
            exclude_from_other: false,
            date_range: None,
            filters: Filters::default(),
            sources: Vec::new(),
        }
    }

    /// Newest content.
    #[must_use]
    pub fn latest(limit: u32) -> Self {
        Self::new(DataSourceMode::Latest).with_limit(limit)
    }

    /// Content from the given categories.
    #[must_use]
    pub fn categories<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let category_ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        let mode = if category_ids.len() == 1 {
            DataSourceMode::Category
        } else {
            DataSourceMode::Categories
        };
        let mut source = Self::new(mode);
        source.selectors.category_ids = category_ids;
        source
    }

    /// Hand-picked articles, in the given order.
    #[must_use]
    pub fn manual<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut source = Self::new(DataSourceMode::Manual);
        source.selectors.article_ids = ids.into_iter().map(Into::into).collect();
        source
    }

    /// A weighted blend of inputs.
    #[must_use]
    pub fn mixed(sources: Vec<WeightedSource>) -> Self {
        Self {
            sources,
            ..Self::new(DataSourceMode::Mixed)
        }
    }

    /// Set the limit.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the sort.
    #[must_use]
    pub fn sorted_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.sort_order = order;
        self
    }

    /// Opt in to page-wide deduplication.
    #[must_use]
    pub fn excluding_others(mut self) -> Self {
        self.exclude_from_other = true;
        self
    }

    /// Set the date range.
    #[must_use]
    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Whether this source blends sub-sources.
    #[must_use]
    pub fn is_mixed(&self) -> bool {
        self.mode == DataSourceMode::Mixed
    }

    /// Add ids to the exclude list, skipping ones already present.
    pub fn exclude<'a, I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for id in ids {
            if !self.exclude_ids.contains(id) {
                self.exclude_ids.push(id.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_from_minimal_json() {
        let source: DataSource =
            serde_json::from_value(json!({"mode": "latest"})).expect("source");
        assert_eq!(source.limit, DataSource::DEFAULT_LIMIT);
        assert_eq!(source.offset, 0);
        assert_eq!(source.sort_by, SortField::PublishedAt);
        assert_eq!(source.sort_order, SortOrder::Desc);
        assert!(!source.exclude_from_other);
    }

    #[test]
    fn test_selectors_are_flat_on_the_wire() {
        let source: DataSource = serde_json::from_value(json!({
            "mode": "categories",
            "categoryIds": ["c1", "c2"],
            "dateRange": {"preset": "this_week"},
            "excludeFromOther": true
        }))
        .expect("source");
        assert_eq!(source.selectors.category_ids, vec!["c1", "c2"]);
        assert_eq!(
            source.date_range,
            Some(DateRange::preset(DatePreset::ThisWeek))
        );
        assert!(source.exclude_from_other);
    }

    #[test]
    fn test_mixed_sources_parse_weights() {
        let source: DataSource = serde_json::from_value(json!({
            "mode": "mixed",
            "limit": 8,
            "sources": [
                {"mode": "category", "categoryIds": ["news"], "weight": 2},
                {"mode": "trending"}
            ]
        }))
        .expect("source");
        assert!(source.is_mixed());
        assert_eq!(source.sources.len(), 2);
        assert!((source.sources[0].effective_weight() - 2.0).abs() < f64::EPSILON);
        assert!((source.sources[1].effective_weight() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_negative_weight_counts_as_zero() {
        let source = WeightedSource::new(DataSourceMode::Latest, Selectors::default())
            .with_weight(-3.0);
        assert!(source.effective_weight().abs() < f64::EPSILON);
    }

    #[test]
    fn test_exclude_skips_duplicates() {
        let mut source = DataSource::latest(5);
        source.exclude_ids.push("a".to_string());
        source.exclude(&["a".to_string(), "b".to_string()]);
        assert_eq!(source.exclude_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_categories_picks_singular_mode() {
        assert_eq!(
            DataSource::categories(["c1"]).mode,
            DataSourceMode::Category
        );
        assert_eq!(
            DataSource::categories(["c1", "c2"]).mode,
            DataSourceMode::Categories
        );
    }
}
