//! Responsive values - settings that vary by viewport class.
//!
//! A responsive value is either a plain `T` or a record keyed by viewport:
//!
//! ```text
//! 3                                    -> 3 everywhere
//! {"desktop": 4, "mobile": 1}          -> desktop 4, tablet 4, mobile 1
//! {"desktop": 4, "tablet": 2}          -> desktop 4, tablet 2, mobile 2
//! ```
//!
//! `desktop` is mandatory on every record. A record without it fails to
//! deserialize rather than falling back at resolution time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Viewport classes a page is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    /// Wide screens.
    #[default]
    Desktop,
    /// Medium screens.
    Tablet,
    /// Narrow screens.
    Mobile,
}

impl Viewport {
    /// All viewport classes, widest first.
    pub const ALL: [Self; 3] = [Self::Desktop, Self::Tablet, Self::Mobile];

    /// Key used for this viewport inside a responsive record.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
        }
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "tablet" => Ok(Self::Tablet),
            "mobile" => Ok(Self::Mobile),
            other => Err(format!("unknown viewport: {other}")),
        }
    }
}

/// A value that is either fixed or varies per viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Responsive<T> {
    /// Per-viewport values with `desktop` as the mandatory base.
    PerViewport {
        /// Value for desktop, and the last fallback for the others.
        desktop: T,
        /// Value for tablet; falls back to `desktop`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tablet: Option<T>,
        /// Value for mobile; falls back to `tablet`, then `desktop`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mobile: Option<T>,
    },
    /// The same value on every viewport.
    Fixed(T),
}

impl<T> Responsive<T> {
    /// Create a fixed value.
    pub const fn fixed(value: T) -> Self {
        Self::Fixed(value)
    }

    /// Create a per-viewport value.
    pub const fn per_viewport(desktop: T, tablet: Option<T>, mobile: Option<T>) -> Self {
        Self::PerViewport {
            desktop,
            tablet,
            mobile,
        }
    }

    /// Resolve to the concrete value for `viewport`.
    #[must_use]
    pub fn at(&self, viewport: Viewport) -> &T {
        match self {
            Self::Fixed(value) => value,
            Self::PerViewport {
                desktop,
                tablet,
                mobile,
            } => match viewport {
                Viewport::Desktop => desktop,
                Viewport::Tablet => tablet.as_ref().unwrap_or(desktop),
                Viewport::Mobile => mobile.as_ref().or(tablet.as_ref()).unwrap_or(desktop),
            },
        }
    }

    /// Whether the value differs by viewport.
    #[must_use]
    pub const fn is_responsive(&self) -> bool {
        matches!(self, Self::PerViewport { .. })
    }
}

impl<T: Clone> Responsive<T> {
    /// Collapse into a fixed value for `viewport`.
    ///
    /// Resolving an already fixed value returns it unchanged.
    #[must_use]
    pub fn resolved(&self, viewport: Viewport) -> Self {
        Self::Fixed(self.at(viewport).clone())
    }
}

impl<T: Default> Default for Responsive<T> {
    fn default() -> Self {
        Self::Fixed(T::default())
    }
}

impl<T> From<T> for Responsive<T> {
    fn from(value: T) -> Self {
        Self::Fixed(value)
    }
}

/// Whether a JSON object is a responsive record.
///
/// A record has a `desktop` key and no keys besides the three viewport names.
#[must_use]
pub fn is_responsive_record(map: &Map<String, Value>) -> bool {
    map.contains_key("desktop")
        && map
            .keys()
            .all(|k| matches!(k.as_str(), "desktop" | "tablet" | "mobile"))
}

/// Resolve a single JSON value for `viewport`.
///
/// Non-record values are returned unchanged.
#[must_use]
pub fn resolve_value(value: &Value, viewport: Viewport) -> Value {
    match value {
        Value::Object(map) if is_responsive_record(map) => {
            let pick = |key: &str| map.get(key).filter(|v| !v.is_null());
            let chosen = match viewport {
                Viewport::Desktop => pick("desktop"),
                Viewport::Tablet => pick("tablet").or_else(|| pick("desktop")),
                Viewport::Mobile => pick("mobile")
                    .or_else(|| pick("tablet"))
                    .or_else(|| pick("desktop")),
            };
            chosen.cloned().unwrap_or(Value::Null)
        }
        other => other.clone(),
    }
}

/// Collapse every responsive record inside a JSON tree for `viewport`.
#[must_use]
pub fn resolve_tree(value: &Value, viewport: Viewport) -> Value {
    match value {
        Value::Object(map) if is_responsive_record(map) => {
            resolve_tree(&resolve_value(value, viewport), viewport)
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_tree(v, viewport)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_tree(item, viewport))
                .collect(),
        ),
        other => other.clone(),
    }
}
