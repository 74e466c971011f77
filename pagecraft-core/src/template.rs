//! Templates - the root page document and its sections.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockId, SectionId, TemplateId};
use crate::config::Background;
use crate::datasource::DataSource;
use crate::error::{CoreError, CoreResult};
use crate::responsive::Responsive;

/// Page kind a template is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Front page.
    Home,
    /// Category listing.
    Category,
    /// Single article.
    Article,
    /// Static page.
    #[default]
    Page,
    /// Tag listing.
    Tag,
    /// Author profile.
    Author,
    /// Search results.
    Search,
    /// Multimedia hub.
    Video,
}

/// Overall page layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    /// No sidebars, edge to edge.
    #[default]
    FullWidth,
    /// Centered fixed-width column.
    Boxed,
    /// Sidebar on the left.
    SidebarLeft,
    /// Sidebar on the right.
    SidebarRight,
    /// Sidebars on both sides.
    TwoSidebars,
}

/// Layout descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Layout kind.
    #[serde(rename = "type", default)]
    pub kind: LayoutKind,
    /// Sidebar width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidebar_width: Option<u16>,
}

/// An optional page area outside the section flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Region {
    /// Whether the region renders.
    pub enabled: bool,
    /// Blocks inside the region.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl Region {
    /// An enabled region with the given blocks.
    #[must_use]
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            enabled: true,
            blocks,
        }
    }
}

/// Named regions of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegionName {
    /// Page header.
    Header,
    /// Breaking news strip under the header.
    BreakingNews,
    /// Above the section flow.
    BeforeContent,
    /// Below the section flow.
    AfterContent,
    /// Left sidebar.
    SidebarLeft,
    /// Right sidebar.
    SidebarRight,
    /// Page footer.
    Footer,
}

/// All regions of a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Regions {
    /// Page header.
    pub header: Region,
    /// Breaking news strip.
    pub breaking_news: Region,
    /// Above the section flow.
    pub before_content: Region,
    /// Below the section flow.
    pub after_content: Region,
    /// Left sidebar.
    pub sidebar_left: Region,
    /// Right sidebar.
    pub sidebar_right: Region,
    /// Page footer.
    pub footer: Region,
}

impl Regions {
    /// Region names in page order around the section flow.
    pub const BEFORE_SECTIONS: [RegionName; 3] = [
        RegionName::Header,
        RegionName::BreakingNews,
        RegionName::BeforeContent,
    ];

    /// Region names in page order after the section flow.
    pub const AFTER_SECTIONS: [RegionName; 4] = [
        RegionName::AfterContent,
        RegionName::SidebarLeft,
        RegionName::SidebarRight,
        RegionName::Footer,
    ];

    /// Borrow a region by name.
    #[must_use]
    pub const fn get(&self, name: RegionName) -> &Region {
        match name {
            RegionName::Header => &self.header,
            RegionName::BreakingNews => &self.breaking_news,
            RegionName::BeforeContent => &self.before_content,
            RegionName::AfterContent => &self.after_content,
            RegionName::SidebarLeft => &self.sidebar_left,
            RegionName::SidebarRight => &self.sidebar_right,
            RegionName::Footer => &self.footer,
        }
    }

    /// Every region with its name, in page order, enabled or not.
    pub fn iter(&self) -> impl Iterator<Item = (RegionName, &Region)> {
        Self::BEFORE_SECTIONS
            .into_iter()
            .chain(Self::AFTER_SECTIONS)
            .map(move |name| (name, self.get(name)))
    }

    /// Mutably borrow a region by name.
    pub fn get_mut(&mut self, name: RegionName) -> &mut Region {
        match name {
            RegionName::Header => &mut self.header,
            RegionName::BreakingNews => &mut self.breaking_news,
            RegionName::BeforeContent => &mut self.before_content,
            RegionName::AfterContent => &mut self.after_content,
            RegionName::SidebarLeft => &mut self.sidebar_left,
            RegionName::SidebarRight => &mut self.sidebar_right,
            RegionName::Footer => &mut self.footer,
        }
    }
}

/// Page-wide feature toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)] // independent toggles
pub struct TemplateSettings {
    /// Show the breaking news strip.
    pub show_breaking_news: bool,
    /// Load more sections while scrolling.
    pub infinite_scroll: bool,
    /// Pin the header while scrolling.
    pub sticky_header: bool,
    /// Show a back-to-top button.
    pub back_to_top: bool,
    /// Insert ads between sections.
    pub ads_enabled: bool,
    /// Page background color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            show_breaking_news: true,
            infinite_scroll: false,
            sticky_header: true,
            back_to_top: true,
            ads_enabled: true,
            background_color: None,
        }
    }
}

/// Section header styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderStyle {
    /// Plain title.
    #[default]
    Simple,
    /// Title with a rule below.
    Underline,
    /// Title on a colored band.
    Boxed,
    /// Title with a side accent bar.
    Accent,
    /// Centered title between rules.
    Centered,
}

/// "Show more" link in a section header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowMoreLink {
    /// Link text.
    pub label: String,
    /// Target URL.
    pub url: String,
}

/// Header shown above a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionHeader {
    /// Whether the header renders.
    #[serde(default)]
    pub enabled: bool,
    /// Title text.
    #[serde(default)]
    pub title: String,
    /// Visual style.
    #[serde(default)]
    pub style: HeaderStyle,
    /// Optional "show more" link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_more: Option<ShowMoreLink>,
}

/// Container width classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerWidth {
    /// Narrow reading column.
    Narrow,
    /// Site default width.
    #[default]
    Default,
    /// Wider than default.
    Wide,
    /// Edge to edge.
    Full,
}

/// Column grid of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionGrid {
    /// Column count.
    pub columns: Responsive<u8>,
    /// Gap between cells in pixels.
    pub gap: Responsive<u16>,
}

impl Default for SectionGrid {
    fn default() -> Self {
        Self {
            columns: Responsive::per_viewport(12, Some(6), Some(1)),
            gap: Responsive::per_viewport(24, None, Some(16)),
        }
    }
}

/// An ordered container of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Unique identifier.
    pub id: SectionId,
    /// Internal name.
    #[serde(default)]
    pub name: String,
    /// Editor-facing label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Header above the blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<SectionHeader>,
    /// Container width.
    #[serde(default)]
    pub container: ContainerWidth,
    /// Column grid.
    #[serde(default)]
    pub grid: SectionGrid,
    /// Background fill.
    #[serde(default)]
    pub background: Background,
    /// Inner padding in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<Responsive<u16>>,
    /// Outer margin in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<Responsive<u16>>,
    /// Position inside the template. Always equals the list index.
    #[serde(default)]
    pub order: usize,
    /// Blocks in display order.
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Section {
    /// Create an empty section with the structural defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SectionId::generate(),
            name: name.into(),
            display_name: None,
            header: None,
            container: ContainerWidth::default(),
            grid: SectionGrid::default(),
            background: Background::default(),
            padding: Some(Responsive::per_viewport(32, None, Some(16))),
            margin: None,
            order: 0,
            blocks: Vec::new(),
        }
    }

    /// Set the header.
    #[must_use]
    pub fn with_header(mut self, header: SectionHeader) -> Self {
        self.header = Some(header);
        self
    }

    /// Append a block.
    #[must_use]
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Index of a block in this section.
    #[must_use]
    pub fn block_index(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    /// Copy of this section with fresh ids for itself and every block.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            id: SectionId::generate(),
            blocks: self.blocks.iter().map(Block::duplicate).collect(),
            ..self.clone()
        }
    }

    /// Apply an update. `None` fields are left alone.
    pub fn apply(&mut self, update: SectionUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(display_name) = update.display_name {
            self.display_name = display_name;
        }
        if let Some(header) = update.header {
            self.header = header;
        }
        if let Some(container) = update.container {
            self.container = container;
        }
        if let Some(grid) = update.grid {
            self.grid = grid;
        }
        if let Some(background) = update.background {
            self.background = background;
        }
        if let Some(padding) = update.padding {
            self.padding = padding;
        }
        if let Some(margin) = update.margin {
            self.margin = margin;
        }
    }
}

/// Partial update for a section. Blocks and order are not updatable here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionUpdate {
    /// New name.
    pub name: Option<String>,
    /// New editor label.
    pub display_name: Option<Option<String>>,
    /// New header.
    pub header: Option<Option<SectionHeader>>,
    /// New container width.
    pub container: Option<ContainerWidth>,
    /// New grid.
    pub grid: Option<SectionGrid>,
    /// New background.
    pub background: Option<Background>,
    /// New padding.
    pub padding: Option<Option<Responsive<u16>>>,
    /// New margin.
    pub margin: Option<Option<Responsive<u16>>>,
}

/// Partial update for template-level fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateUpdate {
    /// New internal name.
    pub name: Option<String>,
    /// New editor label.
    pub display_name: Option<String>,
    /// New page kind.
    pub kind: Option<TemplateKind>,
    /// New layout.
    pub layout: Option<Layout>,
    /// New settings.
    pub settings: Option<TemplateSettings>,
    /// Regions to replace wholesale.
    pub regions: Vec<(RegionName, Region)>,
    /// Regions to enable or disable, keeping their blocks.
    pub region_toggles: Vec<(RegionName, bool)>,
}

/// A data-bound block and its query, as handed to the prefetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBinding {
    /// Block the results are for.
    pub block_id: BlockId,
    /// Query to run.
    pub data_source: DataSource,
}

/// Root page document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Unique identifier.
    pub id: TemplateId,
    /// Internal name.
    pub name: String,
    /// Editor-facing label.
    #[serde(default)]
    pub display_name: String,
    /// Page kind.
    #[serde(rename = "type", default)]
    pub kind: TemplateKind,
    /// Free-text version; not enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Layout descriptor.
    #[serde(default)]
    pub layout: Layout,
    /// Areas outside the section flow.
    #[serde(default)]
    pub regions: Regions,
    /// Sections in display order.
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Feature toggles.
    #[serde(default)]
    pub settings: TemplateSettings,
}

impl Template {
    /// Create an empty template.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TemplateKind) -> Self {
        let name = name.into();
        Self {
            id: TemplateId::generate(),
            display_name: name.clone(),
            name,
            kind,
            version: Some("1".to_string()),
            layout: Layout::default(),
            regions: Regions::default(),
            sections: Vec::new(),
            settings: TemplateSettings::default(),
        }
    }

    /// Append a section, keeping `order` in sync.
    #[must_use]
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self.renumber_sections();
        self
    }

    /// Reassign every section's `order` to its index.
    pub fn renumber_sections(&mut self) {
        for (index, section) in self.sections.iter_mut().enumerate() {
            section.order = index;
        }
    }

    /// Whether every section's `order` equals its index.
    #[must_use]
    pub fn orders_consistent(&self) -> bool {
        self.sections
            .iter()
            .enumerate()
            .all(|(index, section)| section.order == index)
    }

    /// Index of a section.
    #[must_use]
    pub fn section_index(&self, id: &SectionId) -> Option<usize> {
        self.sections.iter().position(|s| &s.id == id)
    }

    /// Borrow a section.
    #[must_use]
    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| &s.id == id)
    }

    /// Mutably borrow a section.
    pub fn section_mut(&mut self, id: &SectionId) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| &s.id == id)
    }

    /// Find which section holds a block.
    #[must_use]
    pub fn locate_block(&self, id: &BlockId) -> Option<(usize, usize)> {
        self.sections.iter().enumerate().find_map(|(si, section)| {
            section.block_index(id).map(|bi| (si, bi))
        })
    }

    /// Borrow a block anywhere in the section flow.
    #[must_use]
    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.locate_block(id)
            .map(|(si, bi)| &self.sections[si].blocks[bi])
    }

    /// Every block in page order: leading regions, sections, trailing regions.
    pub fn blocks_in_page_order(&self) -> impl Iterator<Item = &Block> {
        let before = Regions::BEFORE_SECTIONS
            .into_iter()
            .map(move |name| self.regions.get(name))
            .filter(|region| region.enabled)
            .flat_map(|region| region.blocks.iter());
        let sections = self.sections.iter().flat_map(|s| s.blocks.iter());
        let after = Regions::AFTER_SECTIONS
            .into_iter()
            .map(move |name| self.regions.get(name))
            .filter(|region| region.enabled)
            .flat_map(|region| region.blocks.iter());
        before.chain(sections).chain(after)
    }

    /// Every block in the document, including disabled regions.
    pub fn all_blocks(&self) -> impl Iterator<Item = &Block> {
        self.sections
            .iter()
            .flat_map(|s| s.blocks.iter())
            .chain(self.regions.iter().flat_map(|(_, region)| region.blocks.iter()))
    }

    /// Whether any section or region, enabled or not, holds a block with `id`.
    #[must_use]
    pub fn contains_block_id(&self, id: &BlockId) -> bool {
        self.all_blocks().any(|b| &b.id == id)
    }

    /// Point-in-time copy of every data-bound block's query, in page order.
    ///
    /// Page order is the dedup priority: earlier blocks claim content first.
    #[must_use]
    pub fn data_bindings(&self) -> Vec<DataBinding> {
        self.blocks_in_page_order()
            .filter_map(|block| {
                block.data_source.as_ref().map(|source| DataBinding {
                    block_id: block.id.clone(),
                    data_source: source.clone(),
                })
            })
            .collect()
    }

    /// Check that no section or block id is used twice.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateId`] with the first repeated id.
    pub fn check_unique_ids(&self) -> CoreResult<()> {
        let mut seen = HashSet::new();
        let section_ids = self.sections.iter().map(|s| s.id.as_str());
        let block_ids = self.all_blocks().map(|b| b.id.as_str());
        for id in section_ids.chain(block_ids) {
            if !seen.insert(id) {
                return Err(CoreError::DuplicateId(id.to_string()));
            }
        }
        Ok(())
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(CoreError::Serialization)
    }

    /// Deserialize from JSON. Unknown fields are ignored and `order` is
    /// renumbered from list position.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the template shape.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let mut template: Self = serde_json::from_str(json).map_err(CoreError::Serialization)?;
        template.renumber_sections();
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;
    use serde_json::json;

    fn bound(limit: u32) -> Block {
        Block::new(BlockType::ArticleGrid, "grid-3").with_data_source(DataSource::latest(limit))
    }

    #[test]
    fn test_with_section_renumbers() {
        let template = Template::new("home", TemplateKind::Home)
            .with_section(Section::new("a"))
            .with_section(Section::new("b"));
        assert_eq!(template.sections[1].order, 1);
        assert!(template.orders_consistent());
    }

    #[test]
    fn test_from_json_tolerates_unknown_fields_and_fixes_order() {
        let json = json!({
            "id": "t1",
            "name": "home",
            "type": "home",
            "someFutureField": {"x": 1},
            "sections": [
                {"id": "s1", "order": 7, "blocks": []},
                {"id": "s2", "order": 3, "blocks": []}
            ]
        });
        let template = Template::from_json(&json.to_string()).expect("template");
        assert_eq!(template.sections[0].order, 0);
        assert_eq!(template.sections[1].order, 1);
        assert_eq!(template.kind, TemplateKind::Home);
    }

    #[test]
    fn test_from_json_keeps_blocks_of_future_types() {
        let json = json!({
            "id": "t1",
            "name": "home",
            "sections": [{
                "id": "s1",
                "blocks": [
                    {"id": "b1", "type": "article-grid", "variant": "grid-3", "dataSource": {"mode": "latest"}},
                    {"id": "b2", "type": "shoppable-video", "variant": "tall", "config": {"custom": {"sku": "x"}}}
                ]
            }]
        });
        let template = Template::from_json(&json.to_string()).expect("template");
        let future = &template.sections[0].blocks[1];
        assert_eq!(future.block_type, BlockType::Unknown);
        assert_eq!(future.type_name(), "shoppable-video");
        assert!(crate::BlockRegistry::standard()
            .validate_template(&template)
            .is_ok());

        let saved: serde_json::Value =
            serde_json::from_str(&template.to_json().expect("serialize")).expect("json");
        assert_eq!(saved["sections"][0]["blocks"][1]["type"], json!("shoppable-video"));
        assert_eq!(saved["sections"][0]["blocks"][1]["config"]["custom"]["sku"], json!("x"));
    }

    #[test]
    fn test_data_bindings_follow_page_order() {
        let header_block = bound(1);
        let first = bound(2);
        let second = bound(3);
        let footer_block = bound(4);
        let unbound = Block::new(BlockType::Spacer, "default");

        let mut template = Template::new("home", TemplateKind::Home)
            .with_section(Section::new("a").with_block(first.clone()).with_block(unbound))
            .with_section(Section::new("b").with_block(second.clone()));
        template.regions.footer = Region::with_blocks(vec![footer_block.clone()]);
        template.regions.header = Region::with_blocks(vec![header_block.clone()]);

        let ids: Vec<_> = template
            .data_bindings()
            .into_iter()
            .map(|b| b.block_id)
            .collect();
        assert_eq!(
            ids,
            vec![header_block.id, first.id, second.id, footer_block.id]
        );
    }

    #[test]
    fn test_disabled_region_blocks_are_not_bound() {
        let mut template = Template::new("home", TemplateKind::Home);
        template.regions.sidebar_right = Region {
            enabled: false,
            blocks: vec![bound(5)],
        };
        assert!(template.data_bindings().is_empty());
    }

    #[test]
    fn test_duplicate_ids_detected() {
        let block = bound(1);
        let template = Template::new("home", TemplateKind::Home)
            .with_section(Section::new("a").with_block(block.clone()))
            .with_section(Section::new("b").with_block(block));
        assert!(matches!(
            template.check_unique_ids(),
            Err(CoreError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_section_duplicate_regenerates_all_ids() {
        let section = Section::new("a").with_block(bound(1)).with_block(bound(2));
        let copy = section.duplicate();
        assert_ne!(copy.id, section.id);
        for (original, duplicated) in section.blocks.iter().zip(&copy.blocks) {
            assert_ne!(original.id, duplicated.id);
            assert_eq!(original.data_source, duplicated.data_source);
        }
    }

    #[test]
    fn test_json_round_trip_preserves_document() {
        let template = Template::new("home", TemplateKind::Home)
            .with_section(Section::new("a").with_block(bound(6)));
        let json = template.to_json().expect("serialize");
        let restored = Template::from_json(&json).expect("deserialize");
        assert_eq!(restored, template);
    }
}
