//! Error types for template operations.

use thiserror::Error;

use crate::block::BlockType;

/// Result type for template operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while building, validating, or (de)serializing templates.
///
/// Stale references during editing are deliberately absent from this list:
/// session mutations that target a missing section or block are no-ops.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The block type has no definition in the registry.
    #[error("Block type not registered: {0}")]
    UnknownBlockType(BlockType),

    /// The variant is not one of the variants registered for the block type.
    #[error("Variant '{variant}' is not registered for block type {block_type}")]
    UnknownVariant {
        /// Block type the variant was requested for.
        block_type: BlockType,
        /// The rejected variant id.
        variant: String,
    },

    /// The block type declares that it needs a data source but none is attached.
    #[error("Block {0} requires a data source")]
    MissingDataSource(String),

    /// An id appears more than once within a single template.
    #[error("Duplicate id in template: {0}")]
    DuplicateId(String),

    /// A config value has the wrong shape after merging.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Template serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
