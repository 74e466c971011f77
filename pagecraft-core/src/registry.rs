//! Block registry - the static catalog of block types and their variants.
//!
//! The registry is built once, then shared read-only (usually behind an
//! `Arc`) by the edit session and the render path. It is the only place that
//! knows which variants exist for a type, what their default configs are, and
//! whether a type needs a data source.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::block::{Block, BlockType};
use crate::config::BlockConfig;
use crate::datasource::{DataSource, DataSourceMode};
use crate::error::{CoreError, CoreResult};
use crate::merge::{merge_patches, merge_typed, ConfigPatch};
use crate::responsive::{resolve_tree, Viewport};
use crate::template::Template;

/// A named preset of default configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDefinition {
    /// Variant id, unique within its block type.
    pub id: String,
    /// Editor-facing name.
    pub name: String,
    /// Complete default config.
    pub default_config: BlockConfig,
}

impl VariantDefinition {
    /// A variant with the stock config.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default_config: BlockConfig::default(),
        }
    }

    /// A variant whose default config is the stock config plus `patch`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `patch` does not fit the config shape.
    pub fn with_patch(
        id: impl Into<String>,
        name: impl Into<String>,
        patch: &ConfigPatch,
    ) -> CoreResult<Self> {
        Ok(Self {
            id: id.into(),
            name: name.into(),
            default_config: merge_typed(&BlockConfig::default(), patch)?,
        })
    }
}

/// Catalog entry for a block type.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDefinition {
    /// The block type.
    pub block_type: BlockType,
    /// Editor-facing name.
    pub name: String,
    /// Variant used when none is specified.
    pub default_variant: String,
    /// All legal variants; includes the default.
    pub variants: Vec<VariantDefinition>,
    /// Whether blocks of this type must carry a data source.
    pub requires_data_source: bool,
    /// Source attached to new blocks of this type.
    pub default_data_source: Option<DataSource>,
}

impl BlockDefinition {
    /// A definition whose only variant is `default`.
    #[must_use]
    pub fn new(block_type: BlockType, name: impl Into<String>) -> Self {
        Self {
            block_type,
            name: name.into(),
            default_variant: "default".to_string(),
            variants: vec![VariantDefinition::new("default", "Default")],
            requires_data_source: false,
            default_data_source: None,
        }
    }

    /// Replace the variant list; the first variant becomes the default.
    #[must_use]
    pub fn with_variants(mut self, variants: Vec<VariantDefinition>) -> Self {
        if let Some(first) = variants.first() {
            self.default_variant = first.id.clone();
        }
        self.variants = variants;
        self
    }

    /// Require a data source, attaching `source` to new blocks.
    #[must_use]
    pub fn with_data_source(mut self, source: DataSource) -> Self {
        self.requires_data_source = true;
        self.default_data_source = Some(source);
        self
    }

    /// Look up a variant.
    #[must_use]
    pub fn variant(&self, id: &str) -> Option<&VariantDefinition> {
        self.variants.iter().find(|v| v.id == id)
    }
}

/// Immutable catalog of block types.
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    definitions: HashMap<BlockType, BlockDefinition>,
}

/// Builder for [`BlockRegistry`].
#[derive(Debug, Default)]
pub struct BlockRegistryBuilder {
    definitions: HashMap<BlockType, BlockDefinition>,
}

impl BlockRegistryBuilder {
    /// Register a definition, replacing any earlier one for the same type.
    #[must_use]
    pub fn register(mut self, definition: BlockDefinition) -> Self {
        self.definitions.insert(definition.block_type, definition);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> BlockRegistry {
        BlockRegistry {
            definitions: self.definitions,
        }
    }
}

impl BlockRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> BlockRegistryBuilder {
        BlockRegistryBuilder::default()
    }

    /// Representative catalog covering every block type.
    ///
    /// Listing types get grid/list variants and a `latest` source; a few
    /// types get specialised sources (ticker → breaking, most-read →
    /// trending). Static widgets get a single `default` variant.
    #[must_use]
    pub fn standard() -> Self {
        let mut builder = Self::builder();
        for &block_type in BlockType::ALL {
            builder = builder.register(standard_definition(block_type));
        }
        builder.build()
    }

    /// Look up a block type.
    #[must_use]
    pub fn definition(&self, block_type: BlockType) -> Option<&BlockDefinition> {
        self.definitions.get(&block_type)
    }

    /// Default variant id for a type.
    #[must_use]
    pub fn default_variant(&self, block_type: BlockType) -> Option<&str> {
        self.definition(block_type)
            .map(|d| d.default_variant.as_str())
    }

    /// Legal variant ids for a type.
    #[must_use]
    pub fn variant_ids(&self, block_type: BlockType) -> Vec<&str> {
        self.definition(block_type)
            .map(|d| d.variants.iter().map(|v| v.id.as_str()).collect())
            .unwrap_or_default()
    }

    /// Whether `variant` is registered for `block_type`.
    #[must_use]
    pub fn is_valid_variant(&self, block_type: BlockType, variant: &str) -> bool {
        self.definition(block_type)
            .is_some_and(|d| d.variant(variant).is_some())
    }

    /// Whether blocks of this type need a data source.
    #[must_use]
    pub fn requires_data_source(&self, block_type: BlockType) -> bool {
        self.definition(block_type)
            .is_some_and(|d| d.requires_data_source)
    }

    /// Default config of a variant.
    #[must_use]
    pub fn variant_config(&self, block_type: BlockType, variant: &str) -> Option<&BlockConfig> {
        self.definition(block_type)
            .and_then(|d| d.variant(variant))
            .map(|v| &v.default_config)
    }

    /// Build a new block of `block_type`.
    ///
    /// Uses the default variant when `variant` is `None`, and attaches the
    /// type's default data source when it needs one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownBlockType`] or [`CoreError::UnknownVariant`].
    pub fn create_block(&self, block_type: BlockType, variant: Option<&str>) -> CoreResult<Block> {
        let definition = self
            .definition(block_type)
            .ok_or(CoreError::UnknownBlockType(block_type))?;
        let variant = variant.unwrap_or(&definition.default_variant);
        if definition.variant(variant).is_none() {
            return Err(CoreError::UnknownVariant {
                block_type,
                variant: variant.to_string(),
            });
        }
        let mut block = Block::new(block_type, variant);
        if definition.requires_data_source {
            block.data_source = Some(
                definition
                    .default_data_source
                    .clone()
                    .unwrap_or_else(|| DataSource::new(DataSourceMode::Latest)),
            );
        }
        Ok(block)
    }

    /// Variant default config merged with the block's overrides.
    ///
    /// Blocks of an unrecognised type get the stock config.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownVariant`] for an unregistered variant, or
    /// [`CoreError::InvalidConfig`] if the overrides don't fit the config shape.
    pub fn merged_config(&self, block: &Block) -> CoreResult<BlockConfig> {
        if block.block_type == BlockType::Unknown {
            return Ok(BlockConfig::default());
        }
        let base = self
            .variant_config(block.block_type, &block.variant)
            .ok_or_else(|| CoreError::UnknownVariant {
                block_type: block.block_type,
                variant: block.variant.clone(),
            })?;
        merge_typed(base, &block.config)
    }

    /// Merged config of a block, flattened for one viewport.
    ///
    /// Every responsive record in the merged tree is collapsed to its value
    /// for `viewport`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::merged_config`].
    pub fn resolve_config(&self, block: &Block, viewport: Viewport) -> CoreResult<Value> {
        let merged = self.merged_config(block)?;
        Ok(resolve_tree(&serde_json::to_value(merged)?, viewport))
    }

    /// Merge a template-wide patch under the block's own overrides.
    ///
    /// # Errors
    ///
    /// Same as [`Self::merged_config`].
    pub fn merged_config_with(
        &self,
        block: &Block,
        inherited: &ConfigPatch,
    ) -> CoreResult<BlockConfig> {
        if block.block_type == BlockType::Unknown {
            return Ok(BlockConfig::default());
        }
        let base = self
            .variant_config(block.block_type, &block.variant)
            .ok_or_else(|| CoreError::UnknownVariant {
                block_type: block.block_type,
                variant: block.variant.clone(),
            })?;
        merge_typed(base, &merge_patches(inherited, &block.config))
    }

    /// Check a block against the catalog.
    ///
    /// # Errors
    ///
    /// Returns the first contract violation found.
    pub fn validate_block(&self, block: &Block) -> CoreResult<()> {
        if block.block_type == BlockType::Unknown {
            warn!(
                block = %block.id,
                block_type = block.type_name(),
                "Skipping unrecognised block type"
            );
            return Ok(());
        }
        let definition = self
            .definition(block.block_type)
            .ok_or(CoreError::UnknownBlockType(block.block_type))?;
        if definition.variant(&block.variant).is_none() {
            return Err(CoreError::UnknownVariant {
                block_type: block.block_type,
                variant: block.variant.clone(),
            });
        }
        if definition.requires_data_source && block.data_source.is_none() {
            return Err(CoreError::MissingDataSource(block.id.to_string()));
        }
        Ok(())
    }

    /// Check every block of a template and id uniqueness.
    ///
    /// # Errors
    ///
    /// Returns the first contract violation found.
    pub fn validate_template(&self, template: &Template) -> CoreResult<()> {
        template.check_unique_ids()?;
        for block in template.all_blocks() {
            self.validate_block(block)?;
        }
        Ok(())
    }
}

fn patch(value: Value) -> ConfigPatch {
    match value {
        Value::Object(map) => map,
        _ => ConfigPatch::new(),
    }
}

fn variant(id: &str, name: &str, overrides: Value) -> VariantDefinition {
    let definition = VariantDefinition::with_patch(id, name, &patch(overrides));
    debug_assert!(
        definition.is_ok(),
        "built-in variant {id} does not fit the config shape: {definition:?}"
    );
    definition.unwrap_or_else(|_| VariantDefinition::new(id, name))
}

fn listing_variants() -> Vec<VariantDefinition> {
    vec![
        variant("grid-3", "Grid, 3 columns", serde_json::json!({})),
        variant(
            "grid-4",
            "Grid, 4 columns",
            serde_json::json!({"grid": {"columns": {"desktop": 4, "tablet": 2, "mobile": 1}}}),
        ),
        variant(
            "list",
            "List with thumbnails",
            serde_json::json!({
                "grid": {"columns": 1},
                "image": {"position": "left", "aspectRatio": "4/3"}
            }),
        ),
        variant(
            "overlay",
            "Text over image",
            serde_json::json!({
                "card": {"style": "overlay"},
                "image": {"position": "background"},
                "display": {"showExcerpt": false}
            }),
        ),
    ]
}

fn standard_definition(block_type: BlockType) -> BlockDefinition {
    use BlockType as T;

    let name = block_type.as_str().replace('-', " ");
    let definition = BlockDefinition::new(block_type, name);
    match block_type {
        T::ArticleGrid
        | T::ArticleList
        | T::FeaturedGrid
        | T::Mosaic
        | T::Magazine
        | T::CategoryShowcase
        | T::CategoryTabs
        | T::OpinionColumn
        | T::PhotoGallery
        | T::VideoGallery => definition
            .with_variants(listing_variants())
            .with_data_source(DataSource::latest(6)),
        T::ArticleCarousel | T::CardSlider | T::HeroSlider => definition
            .with_variants(vec![
                variant("slider", "Slider", serde_json::json!({"custom": {"autoplay": true}})),
                variant("peek", "Peek next slide", serde_json::json!({"custom": {"autoplay": false}})),
            ])
            .with_data_source(DataSource::new(DataSourceMode::Featured).with_limit(5)),
        T::BigHero | T::HeroSplit => definition
            .with_variants(vec![
                variant(
                    "full",
                    "Full bleed",
                    serde_json::json!({"grid": {"columns": 1}, "text": {"titleSize": {"desktop": "3xl", "mobile": "xl"}}}),
                ),
                variant("split", "Image and text side by side", serde_json::json!({"image": {"position": "left"}})),
            ])
            .with_data_source(DataSource::new(DataSourceMode::Featured).with_limit(1)),
        T::HeadlineList | T::CompactList | T::NumberedList | T::Timeline | T::LiveBlog => definition
            .with_variants(vec![variant(
                "compact",
                "Compact",
                serde_json::json!({"grid": {"columns": 1}, "display": {"showImage": false, "showExcerpt": false}}),
            )])
            .with_data_source(DataSource::latest(8)),
        T::BreakingTicker => definition
            .with_variants(vec![variant(
                "scroll",
                "Scrolling",
                serde_json::json!({"custom": {"speed": 50, "pauseOnHover": true}}),
            )])
            .with_data_source(DataSource::new(DataSourceMode::Breaking).with_limit(5)),
        T::TrendingList | T::MostRead => definition
            .with_variants(vec![variant(
                "numbered",
                "Numbered",
                serde_json::json!({"grid": {"columns": 1}, "display": {"showViews": true}}),
            )])
            .with_data_source(DataSource::new(DataSourceMode::Trending).with_limit(5)),
        T::RelatedArticles => definition
            .with_variants(listing_variants())
            .with_data_source(DataSource::new(DataSourceMode::Related).with_limit(4)),
        T::AuthorBox => definition.with_data_source(DataSource::new(DataSourceMode::Author).with_limit(3)),
        T::VideoPlayer | T::PodcastPlayer => definition.with_data_source(DataSource::latest(1)),
        T::TagCloud
        | T::AdUnit
        | T::Newsletter
        | T::SocialFollow
        | T::Poll
        | T::Quote
        | T::TextBlock
        | T::HtmlEmbed
        | T::Weather
        | T::SearchBox
        | T::Breadcrumb
        | T::Spacer
        | T::Divider
        | T::Unknown => definition,
    }
}
