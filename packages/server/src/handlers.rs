//! HTTP handler functions for the event map API.

use actix_web::{HttpResponse, web};
use event_map_analytics::config::tier_family;
use event_map_analytics::{sort_buckets, to_csv_string};
use event_map_analytics_models::SortKey;
use event_map_event_models::Domain;
use event_map_geography_models::LocationEntry;
use event_map_refresh::SharedSnapshot;
use event_map_server_models::{
    ApiDomainNode, ApiError, ApiHealth, ApiSnapshot, ApiSnapshotSummary, GazetteerQueryParams,
    SnapshotQueryParams,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        ready_domains: state
            .board
            .all_latest()
            .iter()
            .map(|snapshot| snapshot.domain)
            .collect(),
    })
}

/// `GET /api/categories`
///
/// Returns every domain with its categories and tier scale.
pub async fn categories() -> HttpResponse {
    let tree: Vec<ApiDomainNode> = Domain::all()
        .iter()
        .map(|domain| ApiDomainNode::new(*domain, tier_family(*domain).tiers()))
        .collect();

    HttpResponse::Ok().json(tree)
}

/// `GET /api/gazetteer`
pub async fn gazetteer(
    state: web::Data<AppState>,
    params: web::Query<GazetteerQueryParams>,
) -> HttpResponse {
    let entries: Vec<&LocationEntry> = state
        .gazetteer
        .entries()
        .iter()
        .filter(|entry| {
            params
                .region
                .as_deref()
                .is_none_or(|region| entry.region.eq_ignore_ascii_case(region.trim()))
        })
        .collect();

    HttpResponse::Ok().json(entries)
}

/// `GET /api/snapshots`
///
/// Lists the header of every published snapshot.
pub async fn snapshots(state: web::Data<AppState>) -> HttpResponse {
    let summaries: Vec<ApiSnapshotSummary> = state
        .board
        .all_latest()
        .iter()
        .map(|snapshot| ApiSnapshotSummary::from(snapshot.as_ref()))
        .collect();

    HttpResponse::Ok().json(summaries)
}

/// `GET /api/snapshots/{domain}`
///
/// Returns the newest snapshot for a domain, re-sorted and truncated per
/// the query.
pub async fn snapshot(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<SnapshotQueryParams>,
) -> HttpResponse {
    let (snapshot, sort) = match lookup(&state, &path, &params) {
        Ok(found) => found,
        Err(response) => return response,
    };

    let mut items = snapshot.items.clone();
    sort_buckets(&mut items, sort);
    let total = items.len();
    if let Some(limit) = params.limit {
        items.truncate(limit);
    }

    HttpResponse::Ok().json(ApiSnapshot {
        summary: ApiSnapshotSummary::from(snapshot.as_ref()),
        sort,
        total,
        items,
    })
}

/// `GET /api/snapshots/{domain}/export.csv`
pub async fn export_csv(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<SnapshotQueryParams>,
) -> HttpResponse {
    let (snapshot, sort) = match lookup(&state, &path, &params) {
        Ok(found) => found,
        Err(response) => return response,
    };

    let mut items = snapshot.items.clone();
    sort_buckets(&mut items, sort);
    if let Some(limit) = params.limit {
        items.truncate(limit);
    }

    match to_csv_string(&items) {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .body(csv),
        Err(e) => {
            log::error!("Failed to export {} snapshot: {e}", snapshot.domain);
            HttpResponse::InternalServerError().json(ApiError::new("Failed to export snapshot"))
        }
    }
}

/// Resolves the path domain and sort parameter to the domain's newest
/// snapshot, or the error response to send instead.
fn lookup(
    state: &AppState,
    domain: &str,
    params: &SnapshotQueryParams,
) -> Result<(SharedSnapshot, SortKey), HttpResponse> {
    let domain = domain
        .parse::<Domain>()
        .ok()
        .filter(|domain| state.domains.contains(domain))
        .ok_or_else(|| {
            HttpResponse::NotFound().json(ApiError::new(format!("Unknown domain: {domain}")))
        })?;

    let sort = match params.sort.as_deref() {
        None => SortKey::default(),
        Some(name) => name.trim().parse::<SortKey>().map_err(|_| {
            HttpResponse::BadRequest().json(ApiError::new(format!("Unknown sort key: {name}")))
        })?,
    };

    let snapshot = state.board.latest(domain).ok_or_else(|| {
        HttpResponse::ServiceUnavailable().json(ApiError::new(format!(
            "No snapshot for {domain} yet"
        )))
    })?;

    Ok((snapshot, sort))
}
