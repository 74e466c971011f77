//! Edit session - the mutable editing state around a live template.
//!
//! All document changes go through the mutation methods here. Each one either
//! fully applies (and pushes exactly one history snapshot) or, when it refers
//! to an id that no longer exists, does nothing and returns `false`/`None`.
//! Selection, hover, drag, and view changes never touch history.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::block::{Block, BlockId, BlockType, BlockUpdate, SectionId};
use crate::history::{now_ms, History, DEFAULT_CAPACITY};
use crate::merge::ConfigPatch;
use crate::registry::BlockRegistry;
use crate::responsive::Viewport;
use crate::template::{DataBinding, Section, SectionUpdate, Template, TemplateKind, TemplateUpdate};

/// Current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Selection {
    /// Nothing selected.
    #[default]
    None,
    /// A whole section.
    Section {
        /// Selected section.
        section_id: SectionId,
    },
    /// A block and the section holding it.
    Block {
        /// Parent section.
        section_id: SectionId,
        /// Selected block.
        block_id: BlockId,
    },
}

impl Selection {
    /// Whether the selection refers to `section_id` or one of its blocks.
    #[must_use]
    pub fn touches_section(&self, id: &SectionId) -> bool {
        match self {
            Self::None => false,
            Self::Section { section_id } | Self::Block { section_id, .. } => section_id == id,
        }
    }

    /// Whether the selection is exactly `block_id`.
    #[must_use]
    pub fn is_block(&self, id: &BlockId) -> bool {
        matches!(self, Self::Block { block_id, .. } if block_id == id)
    }
}

/// Element under the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoverTarget {
    /// A section.
    Section(SectionId),
    /// A block.
    Block(BlockId),
}

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragItem {
    /// An existing section.
    Section {
        /// Dragged section.
        section_id: SectionId,
    },
    /// An existing block.
    Block {
        /// Section it is dragged from.
        section_id: SectionId,
        /// Dragged block.
        block_id: BlockId,
    },
    /// A new block from the palette.
    NewBlock {
        /// Type to create.
        block_type: BlockType,
        /// Variant; the registry default when `None`.
        variant: Option<String>,
    },
}

/// Where a drag would land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// A slot in the section list.
    SectionSlot {
        /// Position in the section list.
        index: usize,
    },
    /// A slot in a section's block list.
    BlockSlot {
        /// Destination section.
        section_id: SectionId,
        /// Position in the destination block list.
        index: usize,
    },
}

/// Transient drag-and-drop state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    /// Item being dragged.
    pub item: DragItem,
    /// Current drop target, if over one.
    pub target: Option<DropTarget>,
}

/// Display-only editor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    /// Viewport class being previewed.
    pub viewport: Viewport,
    /// Zoom in percent.
    pub zoom: u16,
    /// Hide editor chrome.
    pub preview: bool,
    /// Show the layout grid overlay.
    pub show_grid: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            viewport: Viewport::Desktop,
            zoom: 100,
            preview: false,
            show_grid: false,
        }
    }
}

/// Session tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum undo snapshots.
    pub history_capacity: usize,
    /// Lowest zoom in percent.
    pub min_zoom: u16,
    /// Highest zoom in percent.
    pub max_zoom: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            min_zoom: 25,
            max_zoom: 200,
        }
    }
}

/// An error the UI should show until dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionError {
    /// Identifier for dismissal.
    pub id: u64,
    /// Message text.
    pub message: String,
    /// When it was raised (ms since epoch).
    pub timestamp: u64,
}

/// Notification sent after each structural mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    /// Action label recorded in history.
    pub label: String,
    /// History length after the push.
    pub history_len: usize,
    /// History cursor after the push.
    pub cursor: usize,
}

/// Callback type for mutation notifications.
pub type OnChangeCallback = Box<dyn Fn(&MutationEvent, &Template) + Send + Sync>;

/// How to build a block for [`EditSession::add_block`].
#[derive(Debug, Clone, PartialEq)]
pub enum NewBlock {
    /// Insert this exact block.
    Explicit(Block),
    /// Create from the registry, optionally with overrides.
    FromType {
        /// Block type.
        block_type: BlockType,
        /// Variant; the registry default when `None`.
        variant: Option<String>,
        /// Initial instance overrides.
        config: Option<ConfigPatch>,
    },
}

impl NewBlock {
    /// Create by type with the default variant.
    #[must_use]
    pub const fn of_type(block_type: BlockType) -> Self {
        Self::FromType {
            block_type,
            variant: None,
            config: None,
        }
    }
}

/// Live editing state for one template.
pub struct EditSession {
    template: Template,
    pristine: Template,
    selection: Selection,
    hover: Option<HoverTarget>,
    drag: Option<DragState>,
    view: ViewState,
    dirty: bool,
    saving: bool,
    loading: bool,
    history: History,
    errors: Vec<SessionError>,
    next_error_id: u64,
    registry: Arc<BlockRegistry>,
    config: SessionConfig,
    on_change: Option<OnChangeCallback>,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("template", &self.template.id)
            .field("selection", &self.selection)
            .field("drag", &self.drag)
            .field("view", &self.view)
            .field("dirty", &self.dirty)
            .field("history_len", &self.history.len())
            .field("history_cursor", &self.history.cursor())
            .finish_non_exhaustive()
    }
}

impl EditSession {
    /// Open a session on `template` with default settings.
    #[must_use]
    pub fn new(template: Template, registry: Arc<BlockRegistry>) -> Self {
        Self::with_config(template, registry, SessionConfig::default())
    }

    /// Open a session with explicit settings.
    #[must_use]
    pub fn with_config(
        mut template: Template,
        registry: Arc<BlockRegistry>,
        config: SessionConfig,
    ) -> Self {
        template.renumber_sections();
        let mut history = History::with_capacity(config.history_capacity);
        history.reset("Initial state", &template);
        Self {
            pristine: template.clone(),
            template,
            selection: Selection::None,
            hover: None,
            drag: None,
            view: ViewState::default(),
            dirty: false,
            saving: false,
            loading: false,
            history,
            errors: Vec::new(),
            next_error_id: 1,
            registry,
            config,
            on_change: None,
        }
    }

    /// Set the mutation notification callback.
    pub fn set_on_change<F>(&mut self, callback: F)
    where
        F: Fn(&MutationEvent, &Template) + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(callback));
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The live document.
    #[must_use]
    pub const fn template(&self) -> &Template {
        &self.template
    }

    /// The last loaded or saved document.
    #[must_use]
    pub const fn pristine(&self) -> &Template {
        &self.pristine
    }

    /// The block registry.
    #[must_use]
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Current hover target.
    #[must_use]
    pub const fn hover(&self) -> Option<&HoverTarget> {
        self.hover.as_ref()
    }

    /// Current drag, if any.
    #[must_use]
    pub const fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Display state.
    #[must_use]
    pub const fn view(&self) -> &ViewState {
        &self.view
    }

    /// Undo history.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Whether anything changed since the last load or save.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the live document differs structurally from the pristine one.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.template != self.pristine
    }

    /// Whether a save is in flight.
    #[must_use]
    pub const fn is_saving(&self) -> bool {
        self.saving
    }

    /// Whether a load is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Errors waiting to be shown.
    #[must_use]
    pub fn errors(&self) -> &[SessionError] {
        &self.errors
    }

    /// Whether [`Self::undo`] would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether [`Self::redo`] would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Point-in-time copy of the document's data bindings for prefetching.
    #[must_use]
    pub fn data_bindings(&self) -> Vec<DataBinding> {
        self.template.data_bindings()
    }

    fn commit(&mut self, label: impl Into<String>) {
        let label = label.into();
        self.history.push(label.clone(), &self.template);
        self.dirty = true;
        debug!(
            action = %label,
            history_len = self.history.len(),
            cursor = self.history.cursor(),
            "Mutation applied"
        );
        if let Some(ref callback) = self.on_change {
            let event = MutationEvent {
                label,
                history_len: self.history.len(),
                cursor: self.history.cursor(),
            };
            callback(&event, &self.template);
        }
    }

    // ------------------------------------------------------------------
    // Template
    // ------------------------------------------------------------------

    /// Update template-level fields. An empty update records nothing.
    pub fn update_template(&mut self, update: TemplateUpdate) -> bool {
        if update == TemplateUpdate::default() {
            return false;
        }
        let t = &mut self.template;
        if let Some(name) = update.name {
            t.name = name;
        }
        if let Some(display_name) = update.display_name {
            t.display_name = display_name;
        }
        if let Some(kind) = update.kind {
            t.kind = kind;
        }
        if let Some(layout) = update.layout {
            t.layout = layout;
        }
        if let Some(settings) = update.settings {
            t.settings = settings;
        }
        for (name, mut region) in update.regions {
            t.regions.get_mut(name).blocks.clear();
            let mut incoming = HashSet::new();
            for block in &mut region.blocks {
                if t.contains_block_id(&block.id) || !incoming.insert(block.id.clone()) {
                    *block = block.duplicate();
                    incoming.insert(block.id.clone());
                }
            }
            *t.regions.get_mut(name) = region;
        }
        for (name, enabled) in update.region_toggles {
            t.regions.get_mut(name).enabled = enabled;
        }
        debug_assert!(self.template.check_unique_ids().is_ok());
        self.commit("Update template");
        true
    }

    // ------------------------------------------------------------------
    // Sections
    // ------------------------------------------------------------------

    /// Append a section with the structural defaults.
    pub fn add_section(&mut self) -> SectionId {
        let name = format!("Section {}", self.template.sections.len() + 1);
        self.insert_section(Section::new(name), None)
    }

    /// Insert a section at `index` (appended when `None` or past the end).
    ///
    /// Ids that already exist in the document are regenerated.
    pub fn insert_section(&mut self, mut section: Section, index: Option<usize>) -> SectionId {
        if self.collides(&section) {
            section = section.duplicate();
        }
        let id = section.id.clone();
        let len = self.template.sections.len();
        let index = index.map_or(len, |i| i.min(len));
        self.template.sections.insert(index, section);
        self.template.renumber_sections();
        self.commit("Add section");
        id
    }

    fn collides(&self, section: &Section) -> bool {
        let mut incoming = HashSet::new();
        self.template.section(&section.id).is_some()
            || section.blocks.iter().any(|b| {
                self.template.contains_block_id(&b.id) || !incoming.insert(&b.id)
            })
    }

    /// Update a section's settings.
    pub fn update_section(&mut self, section_id: &SectionId, update: SectionUpdate) -> bool {
        let Some(section) = self.template.section_mut(section_id) else {
            return false;
        };
        section.apply(update);
        self.commit("Update section");
        true
    }

    /// Delete a section and its blocks.
    pub fn delete_section(&mut self, section_id: &SectionId) -> bool {
        let Some(index) = self.template.section_index(section_id) else {
            return false;
        };
        let removed = self.template.sections.remove(index);
        self.template.renumber_sections();
        if self.selection.touches_section(section_id) {
            self.selection = Selection::None;
        }
        self.clear_hover_for(&removed);
        self.commit("Delete section");
        true
    }

    /// Move a section to `to_index` (clamped to the end).
    ///
    /// Moving a section onto its own position records nothing.
    pub fn move_section(&mut self, section_id: &SectionId, to_index: usize) -> bool {
        let Some(from) = self.template.section_index(section_id) else {
            return false;
        };
        let to = to_index.min(self.template.sections.len() - 1);
        if from == to {
            return false;
        }
        let section = self.template.sections.remove(from);
        self.template.sections.insert(to, section);
        self.template.renumber_sections();
        self.commit("Move section");
        true
    }

    /// Insert a copy of a section right after it, with fresh ids throughout.
    pub fn duplicate_section(&mut self, section_id: &SectionId) -> Option<SectionId> {
        let index = self.template.section_index(section_id)?;
        let mut copy = self.template.sections[index].duplicate();
        if let Some(display_name) = copy.display_name.as_mut() {
            display_name.push_str(" (copy)");
        }
        let id = copy.id.clone();
        self.template.sections.insert(index + 1, copy);
        self.template.renumber_sections();
        self.commit("Duplicate section");
        Some(id)
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    /// Add a block to a section at `index` (appended when `None`).
    ///
    /// Returns `None` if the section is gone or the registry rejects the
    /// type/variant.
    pub fn add_block(
        &mut self,
        section_id: &SectionId,
        new_block: NewBlock,
        index: Option<usize>,
    ) -> Option<BlockId> {
        self.template.section(section_id)?;
        let block = match new_block {
            NewBlock::Explicit(block) => {
                if self.template.contains_block_id(&block.id) {
                    block.duplicate()
                } else {
                    block
                }
            }
            NewBlock::FromType {
                block_type,
                variant,
                config,
            } => match self.registry.create_block(block_type, variant.as_deref()) {
                Ok(block) => match config {
                    Some(config) => block.with_config(config),
                    None => block,
                },
                Err(e) => {
                    warn!("Cannot add block: {e}");
                    return None;
                }
            },
        };
        let id = block.id.clone();
        let section = self.template.section_mut(section_id)?;
        let len = section.blocks.len();
        section.blocks.insert(index.map_or(len, |i| i.min(len)), block);
        self.commit("Add block");
        Some(id)
    }

    /// Update a block. Config changes deep-merge into its overrides.
    pub fn update_block(
        &mut self,
        section_id: &SectionId,
        block_id: &BlockId,
        update: BlockUpdate,
    ) -> bool {
        let Some(block) = self
            .template
            .section_mut(section_id)
            .and_then(|s| s.blocks.iter_mut().find(|b| &b.id == block_id))
        else {
            return false;
        };
        block.apply(update);
        self.commit("Update block");
        true
    }

    /// Delete a block.
    pub fn delete_block(&mut self, section_id: &SectionId, block_id: &BlockId) -> bool {
        let Some(section) = self.template.section_mut(section_id) else {
            return false;
        };
        let Some(index) = section.block_index(block_id) else {
            return false;
        };
        section.blocks.remove(index);
        if self.selection.is_block(block_id) {
            self.selection = Selection::None;
        }
        if self.hover == Some(HoverTarget::Block(block_id.clone())) {
            self.hover = None;
        }
        self.commit("Delete block");
        true
    }

    /// Move a block within or across sections.
    ///
    /// `to_index` is the position in the destination list after the block has
    /// been taken out, clamped to the end. A move that lands on the block's
    /// current position records nothing.
    pub fn move_block(
        &mut self,
        block_id: &BlockId,
        from_section: &SectionId,
        to_section: &SectionId,
        to_index: usize,
    ) -> bool {
        let (Some(from), Some(to)) = (
            self.template.section_index(from_section),
            self.template.section_index(to_section),
        ) else {
            return false;
        };
        let Some(block_index) = self.template.sections[from].block_index(block_id) else {
            return false;
        };
        if from == to {
            let last = self.template.sections[from].blocks.len() - 1;
            if to_index.min(last) == block_index {
                return false;
            }
        }
        let block = self.template.sections[from].blocks.remove(block_index);
        let dest = &mut self.template.sections[to].blocks;
        let index = to_index.min(dest.len());
        dest.insert(index, block);
        if self.selection.is_block(block_id) {
            self.selection = Selection::Block {
                section_id: to_section.clone(),
                block_id: block_id.clone(),
            };
        }
        self.commit("Move block");
        true
    }

    /// Insert a copy of a block right after it, under a fresh id.
    pub fn duplicate_block(
        &mut self,
        section_id: &SectionId,
        block_id: &BlockId,
    ) -> Option<BlockId> {
        let section = self.template.section_mut(section_id)?;
        let index = section.block_index(block_id)?;
        let copy = section.blocks[index].duplicate();
        let id = copy.id.clone();
        section.blocks.insert(index + 1, copy);
        self.commit("Duplicate block");
        Some(id)
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Restore the previous snapshot. No-op at the start of history.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(template) => {
                self.restore(template);
                true
            }
            None => false,
        }
    }

    /// Restore the next snapshot. No-op at the end of history.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(template) => {
                self.restore(template);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, template: Template) {
        self.template = template;
        self.dirty = true;
        self.drop_stale_references();
        debug!(cursor = self.history.cursor(), "History restored");
    }

    fn drop_stale_references(&mut self) {
        let selection_alive = match &self.selection {
            Selection::None => true,
            Selection::Section { section_id } => self.template.section(section_id).is_some(),
            Selection::Block {
                section_id,
                block_id,
            } => self
                .template
                .section(section_id)
                .is_some_and(|s| s.block_index(block_id).is_some()),
        };
        if !selection_alive {
            self.selection = Selection::None;
        }
        let hover_alive = match &self.hover {
            None => true,
            Some(HoverTarget::Section(id)) => self.template.section(id).is_some(),
            Some(HoverTarget::Block(id)) => self.template.locate_block(id).is_some(),
        };
        if !hover_alive {
            self.hover = None;
        }
    }

    fn clear_hover_for(&mut self, removed: &Section) {
        let hit = match &self.hover {
            Some(HoverTarget::Section(id)) => id == &removed.id,
            Some(HoverTarget::Block(id)) => removed.block_index(id).is_some(),
            None => false,
        };
        if hit {
            self.hover = None;
        }
    }

    // ------------------------------------------------------------------
    // Selection and hover
    // ------------------------------------------------------------------

    /// Select a section. Ignored if it does not exist.
    pub fn select_section(&mut self, section_id: &SectionId) -> bool {
        if self.template.section(section_id).is_none() {
            return false;
        }
        self.selection = Selection::Section {
            section_id: section_id.clone(),
        };
        true
    }

    /// Select a block in a section. Ignored if it does not exist there.
    pub fn select_block(&mut self, section_id: &SectionId, block_id: &BlockId) -> bool {
        let exists = self
            .template
            .section(section_id)
            .is_some_and(|s| s.block_index(block_id).is_some());
        if !exists {
            return false;
        }
        self.selection = Selection::Block {
            section_id: section_id.clone(),
            block_id: block_id.clone(),
        };
        true
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selection = Selection::None;
    }

    /// Set or clear the hover target.
    pub fn set_hover(&mut self, target: Option<HoverTarget>) {
        self.hover = target;
    }

    // ------------------------------------------------------------------
    // Drag and drop
    // ------------------------------------------------------------------

    /// Begin dragging an item, replacing any drag in progress.
    pub fn start_drag(&mut self, item: DragItem) {
        self.drag = Some(DragState { item, target: None });
    }

    /// Update the drop target under the pointer. Ignored when not dragging.
    pub fn set_drop_target(&mut self, target: Option<DropTarget>) {
        if let Some(drag) = self.drag.as_mut() {
            drag.target = target;
        }
    }

    /// Abandon the drag without changing the document.
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    /// Finish the drag, applying the drop if the target fits the item.
    ///
    /// Sections drop onto section slots, blocks onto block slots. Any other
    /// combination, a missing target, or a stale id ends the drag with no
    /// change.
    pub fn end_drag(&mut self) -> bool {
        let Some(DragState { item, target }) = self.drag.take() else {
            return false;
        };
        let Some(target) = target else {
            return false;
        };
        match (item, target) {
            (DragItem::Section { section_id }, DropTarget::SectionSlot { index }) => {
                self.move_section(&section_id, index)
            }
            (
                DragItem::Block {
                    section_id,
                    block_id,
                },
                DropTarget::BlockSlot {
                    section_id: to_section,
                    index,
                },
            ) => self.move_block(&block_id, &section_id, &to_section, index),
            (
                DragItem::NewBlock {
                    block_type,
                    variant,
                },
                DropTarget::BlockSlot { section_id, index },
            ) => self
                .add_block(
                    &section_id,
                    NewBlock::FromType {
                        block_type,
                        variant,
                        config: None,
                    },
                    Some(index),
                )
                .is_some(),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    /// Switch the previewed viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.view.viewport = viewport;
    }

    /// Set the zoom, clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: u16) {
        self.view.zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
    }

    /// Toggle preview mode.
    pub fn toggle_preview(&mut self) {
        self.view.preview = !self.view.preview;
    }

    /// Show or hide the grid overlay.
    pub fn set_show_grid(&mut self, show: bool) {
        self.view.show_grid = show;
    }

    // ------------------------------------------------------------------
    // Load / save boundary
    // ------------------------------------------------------------------

    /// Mark a load as in flight.
    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    /// Replace the document, mark it clean, and make it the new baseline.
    pub fn load_template(&mut self, mut template: Template) {
        template.renumber_sections();
        info!(template = %template.id, "Template loaded");
        self.history.reset("Load template", &template);
        self.pristine = template.clone();
        self.template = template;
        self.selection = Selection::None;
        self.hover = None;
        self.drag = None;
        self.dirty = false;
        self.loading = false;
    }

    /// Record a failed load.
    pub fn fail_load(&mut self, message: impl Into<String>) -> u64 {
        self.loading = false;
        self.push_error(message)
    }

    /// Start over with an empty template.
    pub fn new_template(&mut self, name: impl Into<String>, kind: TemplateKind) {
        self.load_template(Template::new(name, kind));
    }

    /// Mark a save as in flight.
    pub fn begin_save(&mut self) {
        self.saving = true;
    }

    /// Complete a save. Success makes the current document the baseline;
    /// failure keeps it dirty and records an error.
    pub fn finish_save(&mut self, result: Result<(), String>) {
        self.saving = false;
        match result {
            Ok(()) => self.mark_saved(),
            Err(message) => {
                warn!("Save failed: {message}");
                self.push_error(format!("Save failed: {message}"));
            }
        }
    }

    /// Make the current document the clean baseline.
    pub fn mark_saved(&mut self) {
        self.pristine = self.template.clone();
        self.dirty = false;
        info!(template = %self.template.id, "Template saved");
    }

    /// Add an error for the UI, returning its id.
    pub fn push_error(&mut self, message: impl Into<String>) -> u64 {
        let id = self.next_error_id;
        self.next_error_id += 1;
        self.errors.push(SessionError {
            id,
            message: message.into(),
            timestamp: now_ms(),
        });
        id
    }

    /// Remove one error.
    pub fn dismiss_error(&mut self, id: u64) -> bool {
        let before = self.errors.len();
        self.errors.retain(|e| e.id != id);
        self.errors.len() != before
    }

    /// Remove every error.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::DataSource;
    use crate::template::{Region, RegionName};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session() -> EditSession {
        EditSession::new(
            Template::new("home", TemplateKind::Home),
            Arc::new(BlockRegistry::standard()),
        )
    }

    fn session_with_blocks() -> (EditSession, SectionId, Vec<BlockId>) {
        let mut s = session();
        let section = s.add_section();
        let blocks = (0..3)
            .map(|_| {
                s.add_block(&section, NewBlock::of_type(BlockType::ArticleGrid), None)
                    .expect("block")
            })
            .collect();
        (s, section, blocks)
    }

    #[test]
    fn test_new_session_is_clean_with_one_snapshot() {
        let s = session();
        assert!(!s.is_dirty());
        assert_eq!(s.history().len(), 1);
        assert!(!s.can_undo());
        assert!(!s.can_redo());
    }

    #[test]
    fn test_add_section_appends_and_records() {
        let mut s = session();
        let a = s.add_section();
        let b = s.add_section();
        assert_eq!(s.template().sections[1].id, b);
        assert_eq!(s.template().sections[0].id, a);
        assert!(s.template().orders_consistent());
        assert_eq!(s.history().len(), 3);
        assert!(s.is_dirty());
    }

    #[test]
    fn test_stale_references_are_silent_noops() {
        let mut s = session();
        let ghost_section = SectionId::new("ghost");
        let ghost_block = BlockId::new("ghost");
        assert!(!s.update_section(&ghost_section, SectionUpdate::default()));
        assert!(!s.delete_section(&ghost_section));
        assert!(!s.move_section(&ghost_section, 0));
        assert!(s.duplicate_section(&ghost_section).is_none());
        assert!(s
            .add_block(&ghost_section, NewBlock::of_type(BlockType::Poll), None)
            .is_none());
        assert!(!s.delete_block(&ghost_section, &ghost_block));
        assert!(!s.update_block(&ghost_section, &ghost_block, BlockUpdate::default()));
        assert!(!s.move_block(&ghost_block, &ghost_section, &ghost_section, 0));
        assert!(s.duplicate_block(&ghost_section, &ghost_block).is_none());
        assert_eq!(s.history().len(), 1);
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_delete_selected_section_clears_selection() {
        let (mut s, section, blocks) = session_with_blocks();
        assert!(s.select_block(&section, &blocks[1]));
        assert!(s.delete_section(&section));
        assert_eq!(s.selection(), &Selection::None);
        assert!(s.template().sections.is_empty());
    }

    #[test]
    fn test_delete_selected_block_clears_selection() {
        let (mut s, section, blocks) = session_with_blocks();
        s.select_block(&section, &blocks[0]);
        s.delete_block(&section, &blocks[1]);
        assert!(s.selection().is_block(&blocks[0]));
        s.delete_block(&section, &blocks[0]);
        assert_eq!(s.selection(), &Selection::None);
    }

    #[test]
    fn test_move_section_renumbers() {
        let mut s = session();
        let a = s.add_section();
        let _b = s.add_section();
        let c = s.add_section();
        assert!(s.move_section(&c, 0));
        assert_eq!(s.template().sections[0].id, c);
        assert_eq!(s.template().sections[1].id, a);
        assert!(s.template().orders_consistent());
        assert!(!s.move_section(&c, 0));
    }

    #[test]
    fn test_move_block_across_sections_updates_selection() {
        let (mut s, first, blocks) = session_with_blocks();
        let second = s.add_section();
        s.select_block(&first, &blocks[2]);
        assert!(s.move_block(&blocks[2], &first, &second, 0));
        assert_eq!(s.template().sections[0].blocks.len(), 2);
        assert_eq!(s.template().sections[1].blocks[0].id, blocks[2]);
        assert_eq!(
            s.selection(),
            &Selection::Block {
                section_id: second,
                block_id: blocks[2].clone()
            }
        );
    }

    #[test]
    fn test_move_block_within_section() {
        let (mut s, section, blocks) = session_with_blocks();
        assert!(s.move_block(&blocks[0], &section, &section, 2));
        let order: Vec<_> = s.template().sections[0]
            .blocks
            .iter()
            .map(|b| b.id.clone())
            .collect();
        assert_eq!(order, vec![blocks[1].clone(), blocks[2].clone(), blocks[0].clone()]);
        assert!(!s.move_block(&blocks[0], &section, &section, 99));
    }

    #[test]
    fn test_duplicate_section_uses_fresh_ids() {
        let (mut s, section, blocks) = session_with_blocks();
        let copy = s.duplicate_section(&section).expect("copy");
        assert_ne!(copy, section);
        assert_eq!(s.template().sections[1].id, copy);
        for block in &s.template().sections[1].blocks {
            assert!(!blocks.contains(&block.id));
        }
        assert!(s.template().check_unique_ids().is_ok());
        assert!(s.template().orders_consistent());
    }

    #[test]
    fn test_duplicate_block_inserts_after_source() {
        let (mut s, section, blocks) = session_with_blocks();
        let copy = s.duplicate_block(&section, &blocks[0]).expect("copy");
        assert_eq!(s.template().sections[0].blocks[1].id, copy);
        assert!(s.template().check_unique_ids().is_ok());
    }

    #[test]
    fn test_add_block_rejected_by_registry_records_nothing() {
        let mut s = session();
        let section = s.add_section();
        let len = s.history().len();
        let result = s.add_block(
            &section,
            NewBlock::FromType {
                block_type: BlockType::ArticleGrid,
                variant: Some("missing".to_string()),
                config: None,
            },
            None,
        );
        assert!(result.is_none());
        assert_eq!(s.history().len(), len);
    }

    #[test]
    fn test_add_explicit_block_with_existing_id_is_reidentified() {
        let (mut s, section, blocks) = session_with_blocks();
        let existing = s.template().sections[0].blocks[0].clone();
        let added = s
            .add_block(&section, NewBlock::Explicit(existing), None)
            .expect("added");
        assert!(!blocks.contains(&added));
        assert!(s.template().check_unique_ids().is_ok());
    }

    #[test]
    fn test_undo_redo_restores_documents() {
        let mut s = session();
        let d0 = s.template().clone();
        s.add_section();
        let d1 = s.template().clone();

        assert!(s.undo());
        assert_eq!(s.template(), &d0);
        assert!(!s.undo());
        assert!(s.redo());
        assert_eq!(s.template(), &d1);
        assert!(!s.redo());
    }

    #[test]
    fn test_undo_clears_selection_of_vanished_section() {
        let mut s = session();
        let section = s.add_section();
        s.select_section(&section);
        s.undo();
        assert_eq!(s.selection(), &Selection::None);
    }

    #[test]
    fn test_new_edit_after_undo_truncates_future() {
        let mut s = session();
        s.add_section();
        s.add_section();
        s.undo();
        s.update_template(TemplateUpdate {
            name: Some("renamed".into()),
            ..TemplateUpdate::default()
        });
        let labels: Vec<_> = s.history().labels().collect();
        assert_eq!(labels, vec!["Initial state", "Add section", "Update template"]);
        assert!(!s.can_redo());
    }

    #[test]
    fn test_history_capacity_from_config() {
        let mut s = EditSession::with_config(
            Template::new("home", TemplateKind::Home),
            Arc::new(BlockRegistry::standard()),
            SessionConfig {
                history_capacity: 5,
                ..SessionConfig::default()
            },
        );
        for _ in 0..10 {
            s.add_section();
        }
        assert_eq!(s.history().len(), 5);
        assert_eq!(s.history().cursor(), 4);
    }

    #[test]
    fn test_drag_section_to_slot() {
        let mut s = session();
        let a = s.add_section();
        let b = s.add_section();
        s.start_drag(DragItem::Section {
            section_id: b.clone(),
        });
        s.set_drop_target(Some(DropTarget::SectionSlot { index: 0 }));
        assert!(s.end_drag());
        assert_eq!(s.template().sections[0].id, b);
        assert_eq!(s.template().sections[1].id, a);
        assert!(s.drag().is_none());
    }

    #[test]
    fn test_drag_new_block_from_palette() {
        let mut s = session();
        let section = s.add_section();
        s.start_drag(DragItem::NewBlock {
            block_type: BlockType::BreakingTicker,
            variant: None,
        });
        s.set_drop_target(Some(DropTarget::BlockSlot {
            section_id: section,
            index: 0,
        }));
        assert!(s.end_drag());
        let block = &s.template().sections[0].blocks[0];
        assert_eq!(block.block_type, BlockType::BreakingTicker);
        assert!(block.data_source.is_some());
    }

    #[test]
    fn test_mismatched_drop_does_nothing() {
        let mut s = session();
        let section = s.add_section();
        let len = s.history().len();
        s.start_drag(DragItem::Section {
            section_id: section.clone(),
        });
        s.set_drop_target(Some(DropTarget::BlockSlot {
            section_id: section,
            index: 0,
        }));
        assert!(!s.end_drag());
        assert_eq!(s.history().len(), len);
        assert!(s.drag().is_none());
    }

    #[test]
    fn test_drop_without_target_or_drag() {
        let mut s = session();
        assert!(!s.end_drag());
        s.start_drag(DragItem::NewBlock {
            block_type: BlockType::Spacer,
            variant: None,
        });
        assert!(!s.end_drag());
    }

    #[test]
    fn test_view_changes_skip_history() {
        let mut s = session();
        s.set_viewport(Viewport::Mobile);
        s.set_zoom(500);
        s.toggle_preview();
        assert_eq!(s.view().zoom, 200);
        assert_eq!(s.view().viewport, Viewport::Mobile);
        assert!(s.view().preview);
        assert_eq!(s.history().len(), 1);
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_save_lifecycle() {
        let mut s = session();
        s.add_section();
        assert!(s.has_unsaved_changes());

        s.begin_save();
        assert!(s.is_saving());
        s.finish_save(Err("disk full".to_string()));
        assert!(!s.is_saving());
        assert!(s.is_dirty());
        assert_eq!(s.errors().len(), 1);

        s.begin_save();
        s.finish_save(Ok(()));
        assert!(!s.is_dirty());
        assert!(!s.has_unsaved_changes());

        let id = s.errors()[0].id;
        assert!(s.dismiss_error(id));
        assert!(s.errors().is_empty());
    }

    #[test]
    fn test_load_template_resets_state() {
        let mut s = session();
        let section = s.add_section();
        s.select_section(&section);
        let replacement = Template::new("article", TemplateKind::Article);
        s.load_template(replacement.clone());
        assert_eq!(s.template(), &replacement);
        assert_eq!(s.pristine(), &replacement);
        assert!(!s.is_dirty());
        assert_eq!(s.selection(), &Selection::None);
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn test_on_change_fires_per_mutation() {
        let mut s = session();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        s.set_on_change(move |event, _template| {
            assert!(!event.label.is_empty());
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let section = s.add_section();
        s.select_section(&section);
        s.delete_section(&section);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_update_block_merges_config_and_swaps_source() {
        let (mut s, section, blocks) = session_with_blocks();
        let patch = serde_json::json!({"display": {"showAuthor": true}});
        assert!(s.update_block(
            &section,
            &blocks[0],
            BlockUpdate {
                config: patch.as_object().cloned(),
                data_source: Some(Some(DataSource::manual(["a1"]))),
                ..BlockUpdate::default()
            }
        ));
        let block = &s.template().sections[0].blocks[0];
        assert_eq!(block.config["display"]["showAuthor"], serde_json::json!(true));
        assert_eq!(
            block.data_source.as_ref().map(|d| d.selectors.article_ids.clone()),
            Some(vec!["a1".to_string()])
        );
    }

    #[test]
    fn test_bindings_are_a_point_in_time_copy() {
        let (mut s, section, blocks) = session_with_blocks();
        let bindings = s.data_bindings();
        s.delete_block(&section, &blocks[0]);
        assert_eq!(bindings.len(), 3);
        assert_eq!(s.data_bindings().len(), 2);
    }

    #[test]
    fn test_visibility_updates_accumulate() {
        let (mut s, section, blocks) = session_with_blocks();
        for patch in [
            serde_json::json!({"visibility": {"requireLogin": true, "endAt": "2024-12-31T00:00:00Z"}}),
            serde_json::json!({"visibility": {"desktop": false}}),
        ] {
            assert!(s.update_block(
                &section,
                &blocks[0],
                BlockUpdate {
                    config: patch.as_object().cloned(),
                    ..BlockUpdate::default()
                }
            ));
        }
        let block = &s.template().sections[0].blocks[0];
        assert_eq!(
            block.config["visibility"],
            serde_json::json!({"requireLogin": true, "endAt": "2024-12-31T00:00:00Z", "desktop": false})
        );
        let merged = s.registry().merged_config(block).expect("merged");
        let visibility = merged.visibility.expect("visibility");
        assert!(visibility.require_login);
        assert!(!visibility.desktop);
        assert!(visibility.mobile);
    }

    #[test]
    fn test_block_ids_in_disabled_regions_are_taken() {
        let mut s = session();
        let section = s.add_section();
        let spacer = s
            .registry()
            .create_block(BlockType::Spacer, None)
            .expect("spacer");
        assert!(s.update_template(TemplateUpdate {
            regions: vec![(RegionName::Footer, Region::with_blocks(vec![spacer.clone()]))],
            region_toggles: vec![(RegionName::Footer, false)],
            ..TemplateUpdate::default()
        }));

        let added = s
            .add_block(&section, NewBlock::Explicit(spacer.clone()), None)
            .expect("added");
        assert_ne!(added, spacer.id);
        assert!(s.template().check_unique_ids().is_ok());

        let copy = Section::new("Copy").with_block(spacer.clone());
        s.insert_section(copy, None);
        assert!(s.template().check_unique_ids().is_ok());
    }

    #[test]
    fn test_region_replacement_reidents_taken_ids() {
        let (mut s, _, blocks) = session_with_blocks();
        let taken = s.template().sections[0].blocks[0].clone();
        assert_eq!(taken.id, blocks[0]);
        assert!(s.update_template(TemplateUpdate {
            regions: vec![
                (RegionName::Header, Region::with_blocks(vec![taken.clone(), taken.clone()])),
                (RegionName::Footer, Region::with_blocks(vec![taken.clone()])),
            ],
            ..TemplateUpdate::default()
        }));
        assert!(s.template().check_unique_ids().is_ok());
        assert_eq!(s.template().regions.header.blocks.len(), 2);
        assert_eq!(s.template().sections[0].blocks[0].id, blocks[0]);

        // Replacing a region with its own blocks keeps their ids
        let header = s.template().regions.header.blocks.clone();
        assert!(s.update_template(TemplateUpdate {
            regions: vec![(RegionName::Header, Region::with_blocks(header.clone()))],
            ..TemplateUpdate::default()
        }));
        assert_eq!(s.template().regions.header.blocks, header);
    }
}
