//! End-to-end renders through the development pipeline.

use std::sync::Arc;

use axum::http::StatusCode;
use render_pipeline::config::{PipelineConfig, RuntimeMode, TrailingSlash};
use render_pipeline::loader::ComponentInstance;
use render_pipeline::pipeline::{App, ContainerPipeline, DevPipeline, Pipeline};
use render_pipeline::routing::{RouteEntry, RouteTable, RouteType};
use serde_json::json;

mod common;
use common::{dev_app, get, server_config, MemoryCompiler};

#[tokio::test]
async fn test_unmatched_path_renders_404() {
    let compiler = Arc::new(MemoryCompiler::new().page("index.html", "<p>home</p>"));
    let (app, _) = dev_app(server_config(), compiler);

    let response = get(&app, "/missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.body_text().contains("404: Not Found"));
}

#[tokio::test]
async fn test_dynamic_route_params() {
    let compiler = Arc::new(
        MemoryCompiler::new()
            .page("index.html", "<p>home</p>")
            .page("blog/[id].html", "<p>post [id]</p>"),
    );
    let (app, _) = dev_app(server_config(), compiler);

    let response = get(&app, "/blog/7").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.body_text().contains("<p>post 7</p>"));
}

#[tokio::test]
async fn test_equal_priority_uses_declaration_order() {
    let compiler = Arc::new(
        MemoryCompiler::new()
            .page("[a].html", "<p>first [a]</p>")
            .page("[b].html", "<p>second [b]</p>"),
    );
    let (app, _) = dev_app(server_config(), compiler);

    let response = get(&app, "/x").await;
    assert!(response.body_text().contains("<p>first x</p>"));
}

#[tokio::test]
async fn test_declared_first_wins_for_same_shape() {
    let pipeline = ContainerPipeline::new(Arc::new(server_config()), RuntimeMode::Production);
    pipeline.insert_route("/blog/[slug]", ComponentInstance::html("slug"));
    pipeline.insert_route("/blog/[id]", ComponentInstance::html("id"));
    let app = App::new(Arc::new(pipeline));

    let response = get(&app, "/blog/42").await;
    assert_eq!(response.body_text(), "slug");
}

#[tokio::test]
async fn test_static_route_beats_dynamic() {
    let compiler = Arc::new(
        MemoryCompiler::new()
            .page("blog/[id].html", "<p>post [id]</p>")
            .page("blog/latest.html", "<p>latest</p>"),
    );
    let (app, _) = dev_app(server_config(), compiler);

    assert!(get(&app, "/blog/latest").await.body_text().contains("<p>latest</p>"));
    assert!(get(&app, "/blog/older").await.body_text().contains("<p>post older</p>"));
}

#[tokio::test]
async fn test_second_request_hits_component_cache() {
    let compiler = Arc::new(MemoryCompiler::new().page("index.html", "<p>home</p>"));
    let (app, _) = dev_app(server_config(), compiler.clone());

    get(&app, "/").await;
    get(&app, "/").await;
    assert_eq!(compiler.compile_count(), 1);
}

#[tokio::test]
async fn test_invalidate_forces_recompile() {
    let compiler = Arc::new(MemoryCompiler::new().page("index.html", "<p>home</p>"));
    let (app, pipeline) = dev_app(server_config(), compiler.clone());

    get(&app, "/").await;
    pipeline.invalidate(std::path::Path::new("/pages/index.html"));
    get(&app, "/").await;
    assert_eq!(compiler.compile_count(), 2);
}

#[tokio::test]
async fn test_static_paths_supply_props() {
    let compiler = Arc::new(MemoryCompiler::new().dynamic_page(
        "blog/[id].html",
        "<h1>(title)</h1>",
        json!([{ "params": { "id": "1" }, "props": { "title": "Hello" } }]),
    ));
    let (app, _) = dev_app(PipelineConfig::default(), compiler);

    let found = get(&app, "/blog/1").await;
    assert_eq!(found.status(), StatusCode::OK);
    assert!(found.body_text().contains("<h1>Hello</h1>"));

    let missing = get(&app, "/blog/2").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_prerendered_dynamic_route_without_paths_is_500() {
    let compiler = Arc::new(MemoryCompiler::new().page("blog/[id].html", "<p>[id]</p>"));
    let (app, _) = dev_app(PipelineConfig::default(), compiler);

    let response = get(&app, "/blog/1").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body_text().contains("GetStaticPathsRequired"));
}

#[tokio::test]
async fn test_custom_404_page() {
    let compiler = Arc::new(
        MemoryCompiler::new()
            .page("index.html", "<p>home</p>")
            .page("404.html", "<p>custom missing</p>"),
    );
    let (app, _) = dev_app(server_config(), compiler);

    let response = get(&app, "/nowhere").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.body_text().contains("<p>custom missing</p>"));
}

#[tokio::test]
async fn test_route_swap_keeps_in_flight_generation() {
    let compiler = Arc::new(MemoryCompiler::new().page("index.html", "<p>home</p>"));
    let (app, pipeline) = dev_app(server_config(), compiler.clone());

    let before = pipeline.core().generation();
    let number = pipeline.set_routes(common::table(&["index.html", "about.html"], false));
    assert_eq!(number, before.number() + 1);
    assert_eq!(before.table().len(), 1);
    assert_eq!(pipeline.core().generation().table().len(), 2);

    // The new table routes /about, but its source is missing: 404, not an error.
    let response = get(&app, "/about").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_urls_do_not_grow_props_cache() {
    let pipeline = Arc::new(ContainerPipeline::new(Arc::new(server_config()), RuntimeMode::Production));
    pipeline.insert_route("/", ComponentInstance::html("home"));
    pipeline.insert_route("/404", ComponentInstance::html("lost"));
    let app = App::new(pipeline.clone());

    for i in 0..200 {
        let response = get(&app, &format!("/missing-{i}")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body_text(), "lost");
    }
    assert_eq!(pipeline.core().generation().route_cache().props_len(), 0);
}

#[tokio::test]
async fn test_dev_client_only_in_full_pages() {
    let compiler = Arc::new(
        MemoryCompiler::new()
            .page("index.html", "<html><head></head><body>home</body></html>")
            .page("card.html", "<div>card</div>"),
    );
    let entries = [
        RouteEntry::new("index.html", false),
        RouteEntry::new("card.html", false).with_route_type(RouteType::Fragment),
    ];
    let table = RouteTable::from_entries(&entries, TrailingSlash::Ignore);
    let pipeline = DevPipeline::new(Arc::new(server_config()), table, compiler, common::ROOT);
    let app = App::new(Arc::new(pipeline));

    let page = get(&app, "/").await.body_text();
    assert!(page.contains("<script src=\"/@hmr/client\" type=\"module\"></script>"));
    assert!(page.contains("dev-toolbar/entrypoint.js"));
    assert!(page.ends_with("</head><body>home</body></html>"));

    let card = get(&app, "/card").await.body_text();
    assert_eq!(card, "<div>card</div>");
}
