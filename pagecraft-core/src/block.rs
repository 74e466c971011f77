//! Blocks - the content units placed inside sections.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datasource::DataSource;
use crate::merge::{merge_patches, ConfigPatch};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh unique id.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!(concat!($prefix, "-{}"), Uuid::new_v4().simple()))
            }

            /// Wrap an existing id string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a template.
    TemplateId,
    "tpl"
);
string_id!(
    /// Identifier of a section, unique within its template.
    SectionId,
    "section"
);
string_id!(
    /// Identifier of a block, unique within its template.
    BlockId,
    "block"
);

macro_rules! block_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Kinds of block a section can hold.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum BlockType {
            $(
                #[doc = concat!("`", $name, "`")]
                #[serde(rename = $name)]
                $variant,
            )+
            /// A type this build does not know; see [`Block::type_name`].
            #[serde(rename = "unknown", other)]
            Unknown,
        }

        impl BlockType {
            /// Every known block type.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire name of the block type.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                    Self::Unknown => "unknown",
                }
            }
        }

        impl std::str::FromStr for BlockType {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(format!("unknown block type: {other}")),
                }
            }
        }
    };
}

block_types! {
    ArticleGrid => "article-grid",
    ArticleList => "article-list",
    ArticleCarousel => "article-carousel",
    BigHero => "big-hero",
    HeroSlider => "hero-slider",
    HeroSplit => "hero-split",
    FeaturedGrid => "featured-grid",
    Mosaic => "mosaic",
    Magazine => "magazine",
    HeadlineList => "headline-list",
    CompactList => "compact-list",
    NumberedList => "numbered-list",
    Timeline => "timeline",
    BreakingTicker => "breaking-ticker",
    TrendingList => "trending-list",
    MostRead => "most-read",
    CategoryTabs => "category-tabs",
    CategoryShowcase => "category-showcase",
    RelatedArticles => "related-articles",
    OpinionColumn => "opinion-column",
    AuthorBox => "author-box",
    LiveBlog => "live-blog",
    VideoGallery => "video-gallery",
    VideoPlayer => "video-player",
    PhotoGallery => "photo-gallery",
    PodcastPlayer => "podcast-player",
    CardSlider => "card-slider",
    TagCloud => "tag-cloud",
    AdUnit => "ad-unit",
    Newsletter => "newsletter",
    SocialFollow => "social-follow",
    Poll => "poll",
    Quote => "quote",
    TextBlock => "text-block",
    HtmlEmbed => "html-embed",
    Weather => "weather",
    SearchBox => "search-box",
    Breadcrumb => "breadcrumb",
    Spacer => "spacer",
    Divider => "divider",
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit placement of a block inside its section's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridArea {
    /// First column (1-based).
    pub column_start: u16,
    /// Number of columns spanned.
    #[serde(default = "GridArea::default_span")]
    pub column_span: u16,
    /// First row (1-based).
    pub row_start: u16,
    /// Number of rows spanned.
    #[serde(default = "GridArea::default_span")]
    pub row_span: u16,
}

impl GridArea {
    const fn default_span() -> u16 {
        1
    }
}

/// A block placed in a section or region.
///
/// Blocks whose `type` this build does not recognise load as
/// [`BlockType::Unknown`] and keep their wire name, so they survive a
/// load/save cycle untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireBlock", into = "WireBlock")]
pub struct Block {
    /// Unique identifier.
    pub id: BlockId,
    /// Block type.
    pub block_type: BlockType,
    /// Wire name of an unrecognised type.
    pub unknown_type: Option<String>,
    /// Variant of the block type; selects the default config.
    pub variant: String,
    /// Instance overrides layered over the variant default config.
    pub config: ConfigPatch,
    /// Content query, for data-bound blocks.
    pub data_source: Option<DataSource>,
    /// Grid placement inside the section.
    pub grid_area: Option<GridArea>,
}

/// Serialized form of [`Block`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlock {
    id: BlockId,
    #[serde(rename = "type")]
    block_type: String,
    variant: String,
    #[serde(default)]
    config: ConfigPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_source: Option<DataSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grid_area: Option<GridArea>,
}

impl From<WireBlock> for Block {
    fn from(wire: WireBlock) -> Self {
        let (block_type, unknown_type) = match wire.block_type.parse() {
            Ok(block_type) => (block_type, None),
            Err(_) => (BlockType::Unknown, Some(wire.block_type)),
        };
        Self {
            id: wire.id,
            block_type,
            unknown_type,
            variant: wire.variant,
            config: wire.config,
            data_source: wire.data_source,
            grid_area: wire.grid_area,
        }
    }
}

impl From<Block> for WireBlock {
    fn from(block: Block) -> Self {
        let block_type = block.type_name().to_string();
        Self {
            id: block.id,
            block_type,
            variant: block.variant,
            config: block.config,
            data_source: block.data_source,
            grid_area: block.grid_area,
        }
    }
}

impl Block {
    /// Create a block with a fresh id and no overrides.
    #[must_use]
    pub fn new(block_type: BlockType, variant: impl Into<String>) -> Self {
        Self {
            id: BlockId::generate(),
            block_type,
            unknown_type: None,
            variant: variant.into(),
            config: ConfigPatch::new(),
            data_source: None,
            grid_area: None,
        }
    }

    /// Wire name of the block's type, including unrecognised ones.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match &self.unknown_type {
            Some(name) => name,
            None => self.block_type.as_str(),
        }
    }

    /// Set the instance overrides.
    #[must_use]
    pub fn with_config(mut self, config: ConfigPatch) -> Self {
        self.config = config;
        self
    }

    /// Attach a data source.
    #[must_use]
    pub fn with_data_source(mut self, data_source: DataSource) -> Self {
        self.data_source = Some(data_source);
        self
    }

    /// Set the grid placement.
    #[must_use]
    pub fn with_grid_area(mut self, area: GridArea) -> Self {
        self.grid_area = Some(area);
        self
    }

    /// Copy of this block under a fresh id.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            id: BlockId::generate(),
            ..self.clone()
        }
    }

    /// Apply an update. Config changes deep-merge into the existing overrides.
    pub fn apply(&mut self, update: BlockUpdate) {
        if let Some(variant) = update.variant {
            self.variant = variant;
        }
        if let Some(config) = update.config {
            self.config = merge_patches(&self.config, &config);
        }
        if let Some(data_source) = update.data_source {
            self.data_source = data_source;
        }
        if let Some(grid_area) = update.grid_area {
            self.grid_area = grid_area;
        }
    }
}

/// Partial update for a block. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockUpdate {
    /// New variant.
    #[serde(default)]
    pub variant: Option<String>,
    /// Overrides to deep-merge into the block config.
    #[serde(default)]
    pub config: Option<ConfigPatch>,
    /// Replace (`Some(Some)`) or detach (`Some(None)`) the data source.
    #[serde(default)]
    pub data_source: Option<Option<DataSource>>,
    /// Replace or clear the grid placement.
    #[serde(default)]
    pub grid_area: Option<Option<GridArea>>,
}
