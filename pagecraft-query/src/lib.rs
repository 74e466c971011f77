//! # Pagecraft Query
//!
//! Turns block data sources into backend queries and executes them for a
//! whole page at once.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               pagecraft-query               │
//! ├─────────────────────────────────────────────┤
//! │  Prefetch Coordinator                       │
//! │  - Page order, sequential                   │
//! │  - Displayed-id threading                   │
//! ├─────────────────────────────────────────────┤
//! │  Query Engine    │  Resolution              │
//! │  - Fail-soft     │  - Date presets          │
//! │  - Mixed blend   │  - Wire params           │
//! │                  │  - Cache tags            │
//! ├─────────────────────────────────────────────┤
//! │  Retriever: HTTP (reqwest) │ In-memory      │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dates;
pub mod engine;
pub mod error;
pub mod http;
pub mod item;
pub mod params;
pub mod prefetch;
pub mod retriever;
pub mod tags;

pub use dates::{Clock, FixedClock, ResolvedRange, SystemClock};
pub use engine::{draw_counts, QueryEngine, ResolvedQuery};
pub use error::{QueryError, QueryResult, RetrieveError};
pub use http::{HttpRetriever, HttpRetrieverConfig, RetryConfig};
pub use item::{ContentItem, ResultSet};
pub use params::QueryParams;
pub use prefetch::{CachePolicy, PrefetchCoordinator};
pub use retriever::{InMemoryRetriever, Retriever};
pub use tags::{cache_tags, revalidate_secs};
