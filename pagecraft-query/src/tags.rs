//! Cache-invalidation tags and revalidation budgets per data source.

use pagecraft_core::{DataSource, DataSourceMode, Selectors};

/// Tag attached to every content query.
pub const ARTICLES_TAG: &str = "articles";

/// Invalidation tags for a source.
///
/// Always starts with [`ARTICLES_TAG`]. Selector modes add one tag per id,
/// source-wide modes add a fixed tag, and a mixed source carries the tags of
/// every input. Duplicates are dropped, first occurrence wins.
#[must_use]
pub fn cache_tags(source: &DataSource) -> Vec<String> {
    let mut tags = vec![ARTICLES_TAG.to_string()];
    if source.is_mixed() {
        for input in &source.sources {
            mode_tags(input.mode, &input.selectors, &mut tags);
        }
    } else {
        mode_tags(source.mode, &source.selectors, &mut tags);
    }
    tags
}

fn mode_tags(mode: DataSourceMode, selectors: &Selectors, tags: &mut Vec<String>) {
    let (prefix, ids) = match mode {
        DataSourceMode::Category | DataSourceMode::Categories => {
            ("category", &selectors.category_ids)
        }
        DataSourceMode::Tag | DataSourceMode::Tags => ("tag", &selectors.tag_ids),
        DataSourceMode::Author | DataSourceMode::Authors => ("author", &selectors.author_ids),
        DataSourceMode::Manual => ("article", &selectors.article_ids),
        DataSourceMode::Breaking => return push_unique(tags, "breaking".to_string()),
        DataSourceMode::Trending => return push_unique(tags, "trending".to_string()),
        DataSourceMode::Featured => return push_unique(tags, "featured".to_string()),
        DataSourceMode::Latest | DataSourceMode::Related | DataSourceMode::Mixed => return,
    };
    for id in ids {
        push_unique(tags, format!("{prefix}:{id}"));
    }
}

fn push_unique(tags: &mut Vec<String>, tag: String) {
    if !tags.contains(&tag) {
        tags.push(tag);
    }
}

/// Advisory staleness budget in seconds for a mode.
#[must_use]
pub const fn revalidate_secs(mode: DataSourceMode) -> u64 {
    match mode {
        DataSourceMode::Breaking => 30,
        DataSourceMode::Trending | DataSourceMode::Latest => 60,
        DataSourceMode::Featured | DataSourceMode::Mixed => 120,
        DataSourceMode::Category
        | DataSourceMode::Categories
        | DataSourceMode::Tag
        | DataSourceMode::Tags => 180,
        DataSourceMode::Author
        | DataSourceMode::Authors
        | DataSourceMode::Manual
        | DataSourceMode::Related => 300,
    }
}
