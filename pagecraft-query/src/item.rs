//! Content items and result sets returned by retrieval.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::dates::parse_rfc3339;

/// One content item as returned by the backend.
///
/// Only the fields the engine sorts or filters on are typed; everything else
/// is kept in `extra` and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// Item identity. Numeric ids are accepted and stringified.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Headline.
    #[serde(default)]
    pub title: String,
    /// Publish timestamp (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// Last update timestamp (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// View count.
    #[serde(default)]
    pub views: u64,
    /// Comment count.
    #[serde(default)]
    pub comments: u64,
    /// Categories the item is filed under.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_ids: Vec<String>,
    /// Tags on the item.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_ids: Vec<String>,
    /// Authors of the item.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author_ids: Vec<String>,
    /// Everything else the backend sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentItem {
    /// Create an item with just an id and title.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the publish timestamp.
    #[must_use]
    pub fn published(mut self, at: impl Into<String>) -> Self {
        self.published_at = Some(at.into());
        self
    }

    /// Set the view count.
    #[must_use]
    pub fn with_views(mut self, views: u64) -> Self {
        self.views = views;
        self
    }

    /// Publish time as Unix seconds, if present and parseable.
    #[must_use]
    pub fn published_secs(&self) -> Option<i64> {
        self.published_at.as_deref().and_then(parse_rfc3339)
    }

    /// Update time as Unix seconds, falling back to the publish time.
    #[must_use]
    pub fn updated_secs(&self) -> Option<i64> {
        self.updated_at
            .as_deref()
            .and_then(parse_rfc3339)
            .or_else(|| self.published_secs())
    }

    /// A boolean flag from the untyped fields.
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(Value::as_bool)
    }

    /// A numeric field from the untyped fields.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(Value::as_u64)
    }

    /// A string field from the untyped fields.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Canonical result of one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet {
    /// Items in display order.
    pub items: Vec<ContentItem>,
    /// Total matches known to the backend.
    pub total: u64,
    /// Whether more items exist beyond this page.
    pub has_more: bool,
}

impl ResultSet {
    /// The fail-soft result: nothing, and nothing more.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Item ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.items.iter().map(|item| &item.id)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Backend payload before normalization.
///
/// Accepts the item list under either `items` or `data`, preferring `items`
/// when both are present; `total` defaults to the item count and `hasMore`
/// to `false`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResponse {
    #[serde(default)]
    items: Option<Vec<ContentItem>>,
    #[serde(default)]
    data: Option<Vec<ContentItem>>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    has_more: Option<bool>,
}

impl From<RawResponse> for ResultSet {
    fn from(raw: RawResponse) -> Self {
        let items = raw.items.or(raw.data).unwrap_or_default();
        let count = items.len() as u64;
        Self {
            total: raw.total.unwrap_or(count),
            has_more: raw.has_more.unwrap_or(false),
            items,
        }
    }
}

impl ResultSet {
    /// Parse and normalize a backend payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a recognizable result shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawResponse>(json).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_items_alias() {
        let set = ResultSet::from_json(
            &json!({"items": [{"id": "a", "title": "A"}], "total": 40, "hasMore": true}).to_string(),
        )
        .expect("parse");
        assert_eq!(set.len(), 1);
        assert_eq!(set.total, 40);
        assert!(set.has_more);
    }

    #[test]
    fn test_data_alias_with_defaults() {
        let set = ResultSet::from_json(
            &json!({"data": [{"id": 7}, {"id": "b", "views": 3}]}).to_string(),
        )
        .expect("parse");
        let ids: Vec<_> = set.ids().cloned().collect();
        assert_eq!(ids, vec!["7", "b"]);
        assert_eq!(set.total, 2);
        assert!(!set.has_more);
    }

    #[test]
    fn test_items_win_over_data() {
        let set = ResultSet::from_json(
            &json!({
                "items": [{"id": "from-items"}],
                "data": [{"id": "from-data"}, {"id": "other"}],
            })
            .to_string(),
        )
        .expect("both keys are accepted");
        let ids: Vec<_> = set.ids().cloned().collect();
        assert_eq!(ids, vec!["from-items"]);
        assert_eq!(set.total, 1);
    }

    #[test]
    fn test_unknown_item_fields_pass_through() {
        let set = ResultSet::from_json(
            &json!({"items": [{"id": "a", "hasImage": true, "slug": "hello"}]}).to_string(),
        )
        .expect("parse");
        let item = &set.items[0];
        assert_eq!(item.flag("hasImage"), Some(true));
        assert_eq!(item.text("slug"), Some("hello"));
    }

    #[test]
    fn test_missing_list_is_empty() {
        let set = ResultSet::from_json("{}").expect("parse");
        assert_eq!(set, ResultSet::empty());
    }

    #[test]
    fn test_bad_id_rejected() {
        assert!(ResultSet::from_json(&json!({"items": [{"id": null}]}).to_string()).is_err());
    }
}
