//! CLI Command Tests
//!
//! Drives each subcommand against template and fixture files on disk.

use std::path::{Path, PathBuf};

use clap::Parser;
use pagecraft_cli::{run, CliArgs};
use pagecraft_core::{Block, BlockType, DataSource, Section, Template, TemplateKind};
use serde_json::json;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write file");
    path
}

fn front_page() -> (Template, String, String) {
    let hero = Block::new(BlockType::HeadlineList, "compact")
        .with_data_source(DataSource::latest(2).excluding_others());
    let grid = Block::new(BlockType::ArticleGrid, "grid-3")
        .with_data_source(DataSource::latest(3).excluding_others());
    let (hero_id, grid_id) = (hero.id.to_string(), grid.id.to_string());
    let template = Template::new("front", TemplateKind::Home)
        .with_section(Section::new("Top").with_block(hero).with_block(grid));
    (template, hero_id, grid_id)
}

fn fixture() -> String {
    let items: Vec<_> = (0..8)
        .map(|n| {
            json!({
                "id": format!("a{n}"),
                "title": format!("Article {n}"),
                "publishedAt": format!("2024-03-{:02}T00:00:00Z", 20 - n),
            })
        })
        .collect();
    json!({ "items": items }).to_string()
}

fn args(parts: &[&str]) -> CliArgs {
    CliArgs::parse_from(std::iter::once("pagecraft").chain(parts.iter().copied()))
}

#[tokio::test]
async fn test_validate_summarizes_template() {
    let dir = TempDir::new().expect("tempdir");
    let (template, _, _) = front_page();
    let path = write(dir.path(), "front.json", &template.to_json().expect("json"));

    let output = run(&args(&["validate", path.to_str().expect("utf8")]))
        .await
        .expect("validate");
    assert_eq!(output["valid"], json!(true));
    assert_eq!(output["sections"], json!(1));
    assert_eq!(output["blocks"], json!(2));
    assert_eq!(output["dataBindings"], json!(2));
}

#[tokio::test]
async fn test_unknown_variant_fails_validation() {
    let dir = TempDir::new().expect("tempdir");
    let template = Template::new("broken", TemplateKind::Home).with_section(
        Section::new("Top").with_block(Block::new(BlockType::ArticleGrid, "no-such-variant")),
    );
    let path = write(dir.path(), "broken.json", &template.to_json().expect("json"));

    let result = run(&args(&["validate", path.to_str().expect("utf8")])).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_missing_template_reports_path() {
    let result = run(&args(&["validate", "/definitely/not/here.json"])).await;
    let message = format!("{:#}", result.expect_err("missing file"));
    assert!(message.contains("/definitely/not/here.json"));
}

#[tokio::test]
async fn test_resolve_emits_every_block_for_viewport() {
    let dir = TempDir::new().expect("tempdir");
    let (template, hero, grid) = front_page();
    let path = write(dir.path(), "front.json", &template.to_json().expect("json"));

    let output = run(&args(&[
        "resolve",
        path.to_str().expect("utf8"),
        "--viewport",
        "mobile",
    ]))
    .await
    .expect("resolve");
    assert_eq!(output["viewport"], json!("mobile"));
    assert!(output["blocks"][&hero]["config"].is_object());
    assert_eq!(output["blocks"][&grid]["variant"], json!("grid-3"));
}

#[tokio::test]
async fn test_queries_needs_no_backend() {
    let dir = TempDir::new().expect("tempdir");
    let (template, hero, _) = front_page();
    let path = write(dir.path(), "front.json", &template.to_json().expect("json"));

    let output = run(&args(&[
        "queries",
        path.to_str().expect("utf8"),
        "--now",
        "2024-03-15T10:00:00Z",
    ]))
    .await
    .expect("queries");
    let query = output["blocks"][&hero]["query"].as_str().expect("query string");
    assert!(query.starts_with("mode=latest&limit=2"));
    assert_eq!(output["page"]["revalidateSecs"], json!(60));
}

#[tokio::test]
async fn test_prefetch_from_fixture_deduplicates() {
    let dir = TempDir::new().expect("tempdir");
    let (template, hero, grid) = front_page();
    let path = write(dir.path(), "front.json", &template.to_json().expect("json"));
    let corpus = write(dir.path(), "corpus.json", &fixture());

    let output = run(&args(&[
        "prefetch",
        path.to_str().expect("utf8"),
        "--fixture",
        corpus.to_str().expect("utf8"),
    ]))
    .await
    .expect("prefetch");

    let ids = |block: &str| -> Vec<String> {
        output["blocks"][block]["items"]
            .as_array()
            .expect("items")
            .iter()
            .map(|item| item["id"].as_str().expect("id").to_string())
            .collect()
    };
    assert_eq!(ids(&hero), vec!["a0", "a1"]);
    assert_eq!(ids(&grid), vec!["a2", "a3", "a4"]);
}

#[tokio::test]
async fn test_prefetch_without_backend_fails() {
    let dir = TempDir::new().expect("tempdir");
    let (template, _, _) = front_page();
    let path = write(dir.path(), "front.json", &template.to_json().expect("json"));

    let mut parsed = args(&["prefetch", path.to_str().expect("utf8")]);
    parsed.endpoint = None;
    parsed.fixture = None;
    assert!(run(&parsed).await.is_err());
}
