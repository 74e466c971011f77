//! Block configuration - the fully merged settings a renderer consumes.
//!
//! A variant supplies a complete [`BlockConfig`]; blocks only carry a
//! [`ConfigPatch`](crate::merge::ConfigPatch) of overrides. Responsive fields
//! are resolved per viewport at render time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::block::BlockType;
use crate::responsive::Responsive;

/// Which parts of a content card are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)] // independent toggles
pub struct DisplayConfig {
    /// Lead image.
    pub show_image: bool,
    /// Headline.
    pub show_title: bool,
    /// Summary text.
    pub show_excerpt: bool,
    /// Category label.
    pub show_category: bool,
    /// Author byline.
    pub show_author: bool,
    /// Publish date.
    pub show_date: bool,
    /// Estimated reading time.
    pub show_reading_time: bool,
    /// View counter.
    pub show_views: bool,
    /// Comment counter.
    pub show_comments: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_image: true,
            show_title: true,
            show_excerpt: true,
            show_category: true,
            show_author: false,
            show_date: true,
            show_reading_time: false,
            show_views: false,
            show_comments: false,
        }
    }
}

/// Image object-fit modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    /// Fill and crop.
    #[default]
    Cover,
    /// Letterbox.
    Contain,
    /// Stretch.
    Fill,
}

/// Where the image sits relative to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePosition {
    /// Above the text.
    #[default]
    Top,
    /// Left of the text.
    Left,
    /// Right of the text.
    Right,
    /// Behind the text.
    Background,
}

/// Transform applied to the image on hover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HoverTransform {
    /// No change.
    #[default]
    None,
    /// Slight zoom.
    ZoomIn,
    /// Slight zoom out.
    ZoomOut,
    /// Brighten.
    Brighten,
    /// Desaturate to grayscale.
    Grayscale,
}

/// Image presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageConfig {
    /// Aspect ratio such as `16/9`.
    pub aspect_ratio: Responsive<String>,
    /// Placement relative to text.
    pub position: ImagePosition,
    /// Object fit.
    pub fit: ImageFit,
    /// Defer loading until near the viewport.
    pub lazy: bool,
    /// Hover effect.
    pub hover: HoverTransform,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: Responsive::fixed("16/9".to_string()),
            position: ImagePosition::default(),
            fit: ImageFit::default(),
            lazy: true,
            hover: HoverTransform::default(),
        }
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Start edge.
    #[default]
    Left,
    /// Centered.
    Center,
    /// End edge.
    Right,
}

/// Typography of a content card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextConfig {
    /// Headline size token (`sm`, `md`, `lg`, `xl`, ...).
    pub title_size: Responsive<String>,
    /// Excerpt size token.
    pub excerpt_size: Responsive<String>,
    /// Maximum headline lines.
    pub title_lines: Option<u8>,
    /// Maximum excerpt lines.
    pub excerpt_lines: Option<u8>,
    /// Headline font weight.
    pub title_weight: u16,
    /// Alignment.
    pub align: TextAlign,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            title_size: Responsive::per_viewport("lg".to_string(), None, Some("md".to_string())),
            excerpt_size: Responsive::fixed("sm".to_string()),
            title_lines: Some(3),
            excerpt_lines: Some(2),
            title_weight: 700,
            align: TextAlign::default(),
        }
    }
}

/// Responsive column grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridConfig {
    /// Column count.
    pub columns: Responsive<u8>,
    /// Gap between cells in pixels.
    pub gap: Responsive<u16>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: Responsive::per_viewport(3, Some(2), Some(1)),
            gap: Responsive::per_viewport(24, None, Some(16)),
        }
    }
}

/// Card surface styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStyle {
    /// No surface.
    #[default]
    Flat,
    /// Outlined.
    Bordered,
    /// Raised with shadow.
    Elevated,
    /// Text over image.
    Overlay,
}

/// Shadow depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shadow {
    /// No shadow.
    #[default]
    None,
    /// Small.
    Sm,
    /// Medium.
    Md,
    /// Large.
    Lg,
}

/// Card hover effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardHover {
    /// No effect.
    #[default]
    None,
    /// Move up slightly.
    Lift,
    /// Increase shadow.
    Shadow,
    /// Highlight border.
    Border,
}

/// Card surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardConfig {
    /// Surface style.
    pub style: CardStyle,
    /// Shadow depth.
    pub shadow: Shadow,
    /// Corner radius in pixels.
    pub radius: u16,
    /// Hover effect.
    pub hover: CardHover,
    /// Inner padding in pixels.
    pub padding: Responsive<u16>,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            style: CardStyle::default(),
            shadow: Shadow::default(),
            radius: 8,
            hover: CardHover::default(),
            padding: Responsive::per_viewport(16, None, Some(12)),
        }
    }
}

/// Background fill for a block or section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Background {
    /// Transparent.
    #[default]
    None,
    /// Solid color.
    Color {
        /// CSS color.
        color: String,
    },
    /// Linear gradient.
    Gradient {
        /// Start color.
        from: String,
        /// End color.
        to: String,
        /// Angle in degrees.
        #[serde(default)]
        angle: u16,
    },
    /// Background image.
    Image {
        /// Image URL.
        url: String,
        /// Optional overlay color.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overlay: Option<String>,
    },
}

/// Outer and inner spacing in pixels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpacingConfig {
    /// Inner padding.
    pub padding: Responsive<u16>,
    /// Outer margin.
    pub margin: Responsive<u16>,
}

/// Border drawn around a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderConfig {
    /// Width in pixels.
    pub width: u16,
    /// CSS color.
    pub color: String,
    /// Line style (`solid`, `dashed`, ...).
    #[serde(default = "BorderConfig::default_style")]
    pub style: String,
}

impl BorderConfig {
    fn default_style() -> String {
        "solid".to_string()
    }
}

/// Entrance animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationConfig {
    /// Animation name (`fade`, `slide-up`, ...).
    pub kind: String,
    /// Duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u32,
    /// Delay in milliseconds.
    #[serde(default)]
    pub delay_ms: u32,
}

/// Who sees a block and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisibilityConfig {
    /// Shown on desktop.
    pub desktop: bool,
    /// Shown on tablet.
    pub tablet: bool,
    /// Shown on mobile.
    pub mobile: bool,
    /// Only shown to signed-in readers.
    pub require_login: bool,
    /// Hidden before this instant (RFC 3339).
    pub start_at: Option<String>,
    /// Hidden after this instant (RFC 3339).
    pub end_at: Option<String>,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            tablet: true,
            mobile: true,
            require_login: false,
            start_at: None,
            end_at: None,
        }
    }
}

impl VisibilityConfig {
    /// Whether the block shows on `viewport`.
    #[must_use]
    pub const fn shows_on(&self, viewport: crate::Viewport) -> bool {
        match viewport {
            crate::Viewport::Desktop => self.desktop,
            crate::Viewport::Tablet => self.tablet,
            crate::Viewport::Mobile => self.mobile,
        }
    }
}

/// The complete set of knobs for a block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockConfig {
    /// Visible card parts.
    pub display: DisplayConfig,
    /// Image presentation.
    pub image: ImageConfig,
    /// Typography.
    pub text: TextConfig,
    /// Column grid.
    pub grid: GridConfig,
    /// Card surface.
    pub card: CardConfig,
    /// Background fill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    /// Spacing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<SpacingConfig>,
    /// Border.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<BorderConfig>,
    /// Entrance animation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationConfig>,
    /// Visibility rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<VisibilityConfig>,
    /// Variant-specific settings, see [`CustomConfig`].
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
}

impl BlockConfig {
    /// Typed view of the `custom` bag for a block type.
    #[must_use]
    pub fn custom_for(&self, block_type: BlockType) -> CustomConfig {
        CustomConfig::from_parts(block_type, &self.custom)
    }
}

/// Scroll direction of a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickerDirection {
    /// Right to left.
    #[default]
    Left,
    /// Left to right.
    Right,
}

/// Settings for `breaking-ticker`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickerSettings {
    /// Pixels per second.
    pub speed: u32,
    /// Stop scrolling on hover.
    pub pause_on_hover: bool,
    /// Scroll direction.
    pub direction: TickerDirection,
    /// Label shown before the items.
    pub label: String,
}

impl Default for TickerSettings {
    fn default() -> Self {
        Self {
            speed: 50,
            pause_on_hover: true,
            direction: TickerDirection::default(),
            label: "Breaking".to_string(),
        }
    }
}

/// Settings for sliders and carousels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CarouselSettings {
    /// Advance automatically.
    pub autoplay: bool,
    /// Milliseconds between slides.
    pub interval_ms: u32,
    /// Show navigation arrows.
    pub show_arrows: bool,
    /// Show position dots.
    pub show_dots: bool,
    /// Wrap around at the end.
    pub looped: bool,
}

impl Default for CarouselSettings {
    fn default() -> Self {
        Self {
            autoplay: true,
            interval_ms: 5000,
            show_arrows: true,
            show_dots: true,
            looped: true,
        }
    }
}

/// Settings for `ad-unit`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdSettings {
    /// Ad server slot id.
    pub slot: String,
    /// Creative sizes such as `300x250`.
    pub sizes: Vec<String>,
    /// Label shown above the creative.
    pub label: Option<String>,
}

/// Settings for `newsletter`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsletterSettings {
    /// Mailing list id.
    pub list_id: String,
    /// Heading.
    pub title: String,
    /// Submit button label.
    pub button_label: String,
}

/// Settings for `html-embed`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbedSettings {
    /// Raw markup.
    pub html: String,
    /// Render inside a sandboxed frame.
    pub sandboxed: bool,
}

/// Typed `custom` settings, keyed by block type.
///
/// Types without a typed shape, and shapes that fail to parse, fall back to
/// [`CustomConfig::Generic`].
#[derive(Debug, Clone, PartialEq)]
pub enum CustomConfig {
    /// `breaking-ticker`.
    Ticker(TickerSettings),
    /// `hero-slider`, `article-carousel`, `card-slider`.
    Carousel(CarouselSettings),
    /// `ad-unit`.
    Ad(AdSettings),
    /// `newsletter`.
    Newsletter(NewsletterSettings),
    /// `html-embed`.
    Embed(EmbedSettings),
    /// Everything else.
    Generic(Map<String, Value>),
}

impl CustomConfig {
    /// Interpret a raw `custom` bag for `block_type`.
    #[must_use]
    pub fn from_parts(block_type: BlockType, raw: &Map<String, Value>) -> Self {
        fn typed<T: serde::de::DeserializeOwned>(raw: &Map<String, Value>) -> Option<T> {
            serde_json::from_value(Value::Object(raw.clone())).ok()
        }

        let parsed = match block_type {
            BlockType::BreakingTicker => typed(raw).map(Self::Ticker),
            BlockType::HeroSlider | BlockType::ArticleCarousel | BlockType::CardSlider => {
                typed(raw).map(Self::Carousel)
            }
            BlockType::AdUnit => typed(raw).map(Self::Ad),
            BlockType::Newsletter => typed(raw).map(Self::Newsletter),
            BlockType::HtmlEmbed => typed(raw).map(Self::Embed),
            _ => None,
        };
        parsed.unwrap_or_else(|| Self::Generic(raw.clone()))
    }

    /// Back to the raw `custom` bag.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        let value = match self {
            Self::Ticker(s) => serde_json::to_value(s),
            Self::Carousel(s) => serde_json::to_value(s),
            Self::Ad(s) => serde_json::to_value(s),
            Self::Newsletter(s) => serde_json::to_value(s),
            Self::Embed(s) => serde_json::to_value(s),
            Self::Generic(map) => return map,
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
