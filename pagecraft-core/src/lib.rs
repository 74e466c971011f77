//! # Pagecraft Core
//!
//! Document model and editing engine for visually composed page templates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                pagecraft-core               │
//! ├─────────────────────────────────────────────┤
//! │  Document        │  Configuration           │
//! │  - Template      │  - Responsive values     │
//! │  - Sections      │  - Deep merge            │
//! │  - Blocks        │  - Block registry        │
//! │  - Data sources  │  - Typed block config    │
//! ├─────────────────────────────────────────────┤
//! │  Edit Session                               │
//! │  - Selection / hover / drag                 │
//! │  - Bounded undo history                     │
//! │  - Load / save boundary                     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Query execution lives in `pagecraft-query`; it consumes the
//! [`DataBinding`]s a [`Template`] hands out.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod config;
pub mod datasource;
pub mod error;
pub mod history;
pub mod merge;
pub mod registry;
pub mod responsive;
pub mod session;
pub mod template;

pub use block::{Block, BlockId, BlockType, BlockUpdate, GridArea, SectionId, TemplateId};
pub use config::{BlockConfig, CustomConfig, VisibilityConfig};
pub use datasource::{
    ContentStatus, DataSource, DataSourceMode, DatePreset, DateRange, Filters, Selectors,
    SortField, SortOrder, WeightedSource,
};
pub use error::{CoreError, CoreResult};
pub use history::{History, Snapshot};
pub use merge::{merge_patches, merge_typed, merge_values, ConfigPatch};
pub use registry::{BlockDefinition, BlockRegistry, VariantDefinition};
pub use responsive::{resolve_tree, resolve_value, Responsive, Viewport};
pub use session::{
    DragItem, DropTarget, EditSession, HoverTarget, MutationEvent, NewBlock, Selection,
    SessionConfig, SessionError, ViewState,
};
pub use template::{
    DataBinding, Region, RegionName, Section, SectionUpdate, Template, TemplateKind,
    TemplateUpdate,
};

/// Pagecraft core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
