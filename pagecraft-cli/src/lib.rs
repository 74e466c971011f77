//! # Pagecraft CLI
//!
//! Command-line front end for Pagecraft template documents.
//!
//! ## Usage
//!
//! ```bash
//! pagecraft validate home.json
//! pagecraft resolve home.json --viewport mobile
//! pagecraft queries home.json --now 2024-03-15T10:00:00Z
//! pagecraft prefetch home.json --fixture articles.json
//! pagecraft prefetch home.json --endpoint https://cms.example.com/api/content
//! ```
//!
//! Every command prints a JSON document on stdout. Logs go to stderr.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pagecraft_core::{BlockRegistry, Template, Viewport};
use pagecraft_query::{
    Clock, FixedClock, HttpRetriever, HttpRetrieverConfig, InMemoryRetriever, PrefetchCoordinator,
    QueryEngine, Retriever, RetryConfig, SystemClock,
};
use serde_json::{json, Map, Value};
use tracing::info;

/// Command-line arguments for pagecraft.
#[derive(Debug, Clone, Parser)]
#[command(name = "pagecraft")]
#[command(about = "Validate, resolve and prefetch Pagecraft page templates")]
#[command(version)]
pub struct CliArgs {
    /// What to do.
    #[command(subcommand)]
    pub command: Command,

    /// Content API endpoint for prefetching
    #[arg(long, global = true, env = "PAGECRAFT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// JSON file of content items to serve instead of a live endpoint
    #[arg(long, global = true, env = "PAGECRAFT_FIXTURE")]
    pub fixture: Option<PathBuf>,

    /// Viewport class to resolve configs for
    #[arg(long, global = true, env = "PAGECRAFT_VIEWPORT", default_value = "desktop")]
    pub viewport: Viewport,

    /// Fixed "now" (RFC 3339) for date presets
    #[arg(long, global = true, env = "PAGECRAFT_NOW")]
    pub now: Option<String>,

    /// Attempts per backend request
    #[arg(long, global = true, env = "PAGECRAFT_RETRIES", default_value = "3")]
    pub retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "PAGECRAFT_TIMEOUT_SECS", default_value = "10")]
    pub timeout_secs: u64,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check a template against the block catalog
    Validate {
        /// Template JSON file
        template: PathBuf,
    },
    /// Print every block's config resolved for the viewport
    Resolve {
        /// Template JSON file
        template: PathBuf,
    },
    /// Print the backend query and cache metadata of every data-bound block
    Queries {
        /// Template JSON file
        template: PathBuf,
    },
    /// Fetch content for every data-bound block, deduplicated across the page
    Prefetch {
        /// Template JSON file
        template: PathBuf,
    },
}

impl Command {
    /// Template file the command operates on.
    #[must_use]
    pub fn template_path(&self) -> &Path {
        match self {
            Self::Validate { template }
            | Self::Resolve { template }
            | Self::Queries { template }
            | Self::Prefetch { template } => template,
        }
    }
}

/// Runtime configuration derived from the command line.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Content API endpoint.
    pub endpoint: Option<String>,
    /// Fixture corpus file.
    pub fixture: Option<PathBuf>,
    /// Viewport for config resolution.
    pub viewport: Viewport,
    /// Fixed "now", if any.
    pub now: Option<String>,
    /// Retry policy for the HTTP retriever.
    pub retry: RetryConfig,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            endpoint: args.endpoint.clone(),
            fixture: args.fixture.clone(),
            viewport: args.viewport,
            now: args.now.clone(),
            retry: RetryConfig {
                max_attempts: args.retries.max(1),
                ..RetryConfig::default()
            },
            timeout: Duration::from_secs(args.timeout_secs),
        }
    }
}

impl CliConfig {
    /// Clock for date presets.
    ///
    /// # Errors
    ///
    /// Returns an error if the fixed timestamp does not parse.
    pub fn clock(&self) -> anyhow::Result<Arc<dyn Clock>> {
        match &self.now {
            Some(now) => {
                let clock = FixedClock::at(now)
                    .with_context(|| format!("invalid --now timestamp: {now}"))?;
                Ok(Arc::new(clock))
            }
            None => Ok(Arc::new(SystemClock)),
        }
    }

    /// Backend selected by the flags. A fixture wins over an endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if neither is set, the fixture cannot be read, or the
    /// endpoint is invalid.
    pub fn retriever(&self) -> anyhow::Result<Arc<dyn Retriever>> {
        if let Some(path) = &self.fixture {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read fixture {}", path.display()))?;
            let retriever = InMemoryRetriever::from_json(&json)
                .with_context(|| format!("failed to parse fixture {}", path.display()))?;
            info!(items = retriever.len(), "Serving fixture corpus");
            return Ok(Arc::new(retriever));
        }
        if let Some(endpoint) = &self.endpoint {
            let config = HttpRetrieverConfig::new(endpoint.clone())
                .with_retry(self.retry.clone())
                .with_timeout(self.timeout);
            let retriever = HttpRetriever::new(config).context("failed to build HTTP retriever")?;
            info!(endpoint = %endpoint, "Using content API");
            return Ok(Arc::new(retriever));
        }
        bail!("no content backend: pass --fixture or --endpoint")
    }

    /// Query engine over the selected backend and clock.
    ///
    /// # Errors
    ///
    /// See [`Self::retriever`] and [`Self::clock`].
    pub fn engine(&self) -> anyhow::Result<QueryEngine> {
        Ok(QueryEngine::with_clock(self.retriever()?, self.clock()?))
    }
}

/// Read and parse a template document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a template.
pub fn load_template(path: &Path) -> anyhow::Result<Template> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read template {}", path.display()))?;
    let template = Template::from_json(&json)
        .with_context(|| format!("failed to parse template {}", path.display()))?;
    info!(template = %template.id, sections = template.sections.len(), "Template loaded");
    Ok(template)
}

/// Validate a template against the catalog and summarize it.
///
/// # Errors
///
/// Returns the first contract violation found.
pub fn validate(template: &Template, registry: &BlockRegistry) -> anyhow::Result<Value> {
    registry
        .validate_template(template)
        .with_context(|| format!("template {} is invalid", template.id))?;
    Ok(json!({
        "template": template.id,
        "valid": true,
        "sections": template.sections.len(),
        "blocks": template.blocks_in_page_order().count(),
        "dataBindings": template.data_bindings().len(),
    }))
}

/// Resolved config of every block, in page order, keyed by block id.
///
/// # Errors
///
/// Returns an error if a block's variant is unknown or its overrides do not
/// fit the config shape.
pub fn resolve_configs(
    template: &Template,
    registry: &BlockRegistry,
    viewport: Viewport,
) -> anyhow::Result<Value> {
    let mut blocks = Map::new();
    for block in template.blocks_in_page_order() {
        let config = registry
            .resolve_config(block, viewport)
            .with_context(|| format!("cannot resolve block {}", block.id))?;
        blocks.insert(
            block.id.to_string(),
            json!({
                "type": block.type_name(),
                "variant": block.variant,
                "config": config,
            }),
        );
    }
    Ok(json!({ "viewport": viewport, "blocks": blocks }))
}

/// Wire query and cache metadata of every data-bound block.
#[must_use]
pub fn describe_queries(template: &Template, coordinator: &PrefetchCoordinator) -> Value {
    let bindings = template.data_bindings();
    let mut blocks = Map::new();
    for binding in &bindings {
        let query = coordinator.engine().resolve(&binding.data_source);
        blocks.insert(
            binding.block_id.to_string(),
            json!({
                "mode": binding.data_source.mode,
                "query": query.params.to_query_string(),
                "tags": query.tags,
                "revalidateSecs": query.revalidate_secs,
            }),
        );
    }
    let policy = coordinator.cache_policy(&bindings);
    json!({
        "blocks": blocks,
        "page": {
            "tags": policy.tags,
            "revalidateSecs": policy.revalidate_secs,
        },
    })
}

/// Fetch every data-bound block and return results keyed by block id.
pub async fn prefetch(template: &Template, coordinator: &PrefetchCoordinator) -> Value {
    let bindings = template.data_bindings();
    let mut results = coordinator.prefetch_all(&bindings).await;
    let mut blocks = Map::new();
    for binding in &bindings {
        if let Some(set) = results.remove(&binding.block_id) {
            blocks.insert(binding.block_id.to_string(), json!(set));
        }
    }
    json!({ "blocks": blocks })
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns an error if the template cannot be loaded, fails validation, or
/// the backend cannot be configured.
pub async fn run(args: &CliArgs) -> anyhow::Result<Value> {
    let config = CliConfig::from(args);
    let registry = BlockRegistry::standard();
    let template = load_template(args.command.template_path())?;

    match &args.command {
        Command::Validate { .. } => validate(&template, &registry),
        Command::Resolve { .. } => resolve_configs(&template, &registry, config.viewport),
        Command::Queries { .. } => {
            // Resolution needs no backend; an empty corpus stands in
            let engine = QueryEngine::with_clock(
                Arc::new(InMemoryRetriever::default()),
                config.clock()?,
            );
            Ok(describe_queries(&template, &PrefetchCoordinator::new(engine)))
        }
        Command::Prefetch { .. } => {
            let coordinator = PrefetchCoordinator::new(config.engine()?);
            Ok(prefetch(&template, &coordinator).await)
        }
    }
}
