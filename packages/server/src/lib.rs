#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the event map.
//!
//! Starts the refresh scheduler in-process and serves the newest snapshot
//! of every enabled domain as JSON or CSV. Handlers only read the snapshot
//! board, so requests never wait on a running cycle.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, Scope, middleware, web};
use event_map_event_models::Domain;
use event_map_geography::Gazetteer;
use event_map_refresh::{RefreshConfig, Runtime, SnapshotBoard};

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Newest snapshot per domain.
    pub board: Arc<SnapshotBoard>,
    /// Location table used for resolution.
    pub gazetteer: Arc<Gazetteer>,
    /// Domains being refreshed.
    pub domains: Vec<Domain>,
}

/// The `/api` routes.
#[must_use]
pub fn api_scope() -> Scope {
    web::scope("/api")
        .route("/health", web::get().to(handlers::health))
        .route("/categories", web::get().to(handlers::categories))
        .route("/gazetteer", web::get().to(handlers::gazetteer))
        .route("/snapshots", web::get().to(handlers::snapshots))
        .route("/snapshots/{domain}", web::get().to(handlers::snapshot))
        .route(
            "/snapshots/{domain}/export.csv",
            web::get().to(handlers::export_csv),
        )
}

/// Starts the event map API server.
///
/// Loads the refresh configuration (embedded defaults plus environment
/// overrides), starts the scheduler, and serves the API until the server
/// shuts down. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// * If the configuration, gazetteer, or a domain table is invalid
/// * If the HTTP server fails to bind or encounters a runtime error
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = RefreshConfig::resolve(None).map_err(std::io::Error::other)?;
    let runtime = Runtime::build(config).map_err(std::io::Error::other)?;

    log::info!("Starting refresh scheduler...");
    let scheduler = runtime.start();

    let state = web::Data::new(AppState {
        board: Arc::clone(runtime.board()),
        gazetteer: Arc::clone(&runtime.gazetteer),
        domains: runtime.config.domains.clone(),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(api_scope())
    })
    .bind((bind_addr, port))?
    .run()
    .await;

    scheduler.stop();
    result
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::Utc;
    use event_map_analytics::{DomainConfig, DomainPipeline, parse_window};
    use event_map_geography::Resolver;
    use event_map_source::fallback::fallback_batch;
    use serde_json::Value;

    use super::*;

    fn state() -> web::Data<AppState> {
        let gazetteer = Arc::new(Gazetteer::turkey());
        let resolver = Arc::new(Resolver::with_default_threshold(Arc::clone(&gazetteer)));
        let pipeline = DomainPipeline::new(&DomainConfig::builtin(Domain::Hazard), resolver);

        let now = Utc::now();
        let snapshot = pipeline.run(
            fallback_batch(Domain::Hazard, now),
            &parse_window("24h").unwrap(),
            3,
            now,
        );

        let board = Arc::new(SnapshotBoard::new());
        board.publish(snapshot);

        web::Data::new(AppState {
            board,
            gazetteer,
            domains: vec![Domain::Hazard, Domain::Lightning],
        })
    }

    macro_rules! app {
        () => {
            test::init_service(App::new().app_data(state()).service(api_scope())).await
        };
    }

    #[actix_web::test]
    async fn health_lists_ready_domains() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["readyDomains"], serde_json::json!(["hazard"]));
    }

    #[actix_web::test]
    async fn categories_cover_every_domain() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/categories").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let nodes = body.as_array().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1]["name"], "sustainability");
        assert_eq!(
            nodes[1]["tiers"],
            serde_json::json!(["poor", "fair", "good", "excellent"])
        );
    }

    #[actix_web::test]
    async fn gazetteer_filters_by_region() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/gazetteer?region=marmara")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 11);
        assert!(entries.iter().all(|e| e["region"] == "Marmara"));
    }

    #[actix_web::test]
    async fn snapshot_is_sorted_and_limited() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/snapshots/hazard?sort=count&limit=2")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["domain"], "hazard");
        assert_eq!(body["sequence"], 3);
        assert_eq!(body["sort"], "count");

        let items = body["items"].as_array().unwrap();
        assert!(items.len() <= 2);
        assert!(body["total"].as_u64().unwrap() >= items.len() as u64);
        if let [first, second] = items.as_slice() {
            assert!(first["count"].as_u64() >= second["count"].as_u64());
        }
    }

    #[actix_web::test]
    async fn snapshot_errors() {
        let app = app!();
        for (uri, status) in [
            ("/api/snapshots/weather", StatusCode::NOT_FOUND),
            ("/api/snapshots/hazard?sort=loudest", StatusCode::BAD_REQUEST),
            ("/api/snapshots/lightning", StatusCode::SERVICE_UNAVAILABLE),
            ("/api/snapshots/sustainability", StatusCode::NOT_FOUND),
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), status, "{uri}");
        }
    }

    #[actix_web::test]
    async fn exports_csv() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/snapshots/hazard/export.csv?sort=severity")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "text/csv; charset=utf-8"
        );
        let body = test::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.starts_with("timestamp,location,category,tier,count"));
    }

    #[actix_web::test]
    async fn lists_snapshot_summaries() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/snapshots").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let summaries = body.as_array().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0]["origin"], "fallback");
        assert!(summaries[0].get("items").is_none());
    }
}
