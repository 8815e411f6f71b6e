//! `GET /` map page.
//!
//! The page is rendered on the server: each panel is a form that submits
//! back to `/` with `registry`, `key`, `lat`, `lon` and `token`, and the
//! submitted panel is answered in the same response. Panel queries pass
//! the same token checks as `/api/v2/query`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Query},
    response::Html,
};
use context_client::{
    render_panels, ClientError, ClientResult, QueryOutcome, QueryResponse, QuerySession,
    QueryTicket,
};
use context_common::{OutputFormat, Registry, RegistryIndex};
use geometry::Point;
use serde::Deserialize;
use tracing::debug;

use crate::auth::authorize;
use crate::config::MapSettings;
use crate::error::ApiError;
use crate::state::AppState;

const PAGE_STYLE: &str = "body{font-family:sans-serif;margin:0}\
header{background:#2c3e50;color:#fff;padding:.5em 1em}\
nav a{margin-right:1em}nav a.active{font-weight:bold}\
#map{height:240px;background:#dde6ee;padding:1em}\
.panel{display:none;padding:1em}.panel.active{display:block}\
table{border-collapse:collapse;margin:1em 0}td{padding:2px 8px}\
caption{font-weight:bold;text-align:left}.error{color:#a00}\
.url-query{font-family:monospace;word-break:break-all}";

#[derive(Debug, Default, Deserialize)]
pub struct MapParams {
    pub registry: Option<String>,
    pub key: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub token: Option<String>,
}

/// GET /
pub async fn map_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<MapParams>,
) -> Result<Html<String>, ApiError> {
    let index = state.store.registry_index().await?;

    let registry = params
        .registry
        .as_deref()
        .and_then(|r| r.parse::<Registry>().ok())
        .unwrap_or(Registry::Service);

    let mut session = QuerySession::new();
    if let Some(token) = params.token {
        session = session.with_token(token);
    }
    session.select_tab(registry);
    // An untouched select submits its first option
    let key = params
        .key
        .filter(|k| !k.is_empty())
        .or_else(|| index.entries(registry).first().map(|e| e.key.clone()));
    if let Some(key) = key {
        session.select_key(registry, key);
    }

    if let (Some(lat), Some(lon)) = (params.lat, params.lon) {
        session.set_coord_box(registry, &lat, &lon);
        if let Some(ticket) = session.fetch_button() {
            let outcome = panel_query(&state, &ticket).await;
            session.complete(&ticket, outcome);
        } else {
            debug!(lat = %lat, lon = %lon, "Map form without a usable point or key");
        }
    }

    Ok(Html(render_page(&state.config.map, &index, &session)))
}

/// Answer a panel fetch in-process, as the API would answer its URL.
async fn panel_query(state: &AppState, ticket: &QueryTicket) -> ClientResult<QueryOutcome> {
    let request = &ticket.request;
    let url = request.url(&state.config.base_url)?;
    let start = Instant::now();

    authorize(
        &state.store,
        state.config.enable_api_token,
        request.token.as_deref(),
    )
    .await
    .map_err(|e| status_error(e.into()))?;

    let point = Point::wgs84(request.lon, request.lat);
    let output = state
        .worker
        .retrieve_all(
            request.registry,
            &request.key,
            &point,
            state.config.default_tolerance,
            OutputFormat::Json,
        )
        .await
        .map_err(|e| status_error(e.into()))?;

    let value = serde_json::to_value(output.result())?;
    Ok(QueryOutcome {
        url,
        response: QueryResponse::from_value(value)?,
        elapsed_ms: start.elapsed().as_millis(),
    })
}

/// The failure the panel would have shown for the same API response.
fn status_error(err: ApiError) -> ClientError {
    ClientError::Status {
        status: err.status().as_u16(),
        body: err.error.to_string(),
    }
}

fn tabs(active: Option<Registry>) -> String {
    Registry::ALL
        .iter()
        .map(|registry| {
            let class = if active == Some(*registry) {
                " class=\"active\""
            } else {
                ""
            };
            format!(
                "<a href=\"/?registry={}\"{}>{}</a>",
                registry.as_str(),
                class,
                registry.label()
            )
        })
        .collect()
}

pub fn render_page(map: &MapSettings, index: &RegistryIndex, session: &QuerySession) -> String {
    let marker = match session.marker() {
        Some((lat, lon)) => format!(" data-marker-lat=\"{}\" data-marker-lon=\"{}\"", lat, lon),
        None => String::new(),
    };

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>GeoContext</title>\
         <style>{style}</style></head><body>\
         <header><h1>GeoContext</h1><nav>{tabs}</nav></header>\
         <div id=\"map\" data-center-lon=\"{lon}\" data-center-lat=\"{lat}\" data-zoom=\"{zoom}\"{marker}>\
         Centre {lat}, {lon}</div>\
         {panels}\
         </body></html>\n",
        style = PAGE_STYLE,
        tabs = tabs(session.active_tab()),
        lon = map.center_lon,
        lat = map.center_lat,
        zoom = map.zoom,
        marker = marker,
        panels = render_panels(index, session),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_common::RegistryEntry;

    #[test]
    fn test_render_page_defaults() {
        let index = RegistryIndex {
            services: vec![RegistryEntry::new("altitude", "Altitude")],
            ..Default::default()
        };
        let mut session = QuerySession::new();
        session.select_tab(Registry::Group);

        let html = render_page(&MapSettings::default(), &index, &session);
        assert!(html.contains("data-center-lon=\"23.55\""));
        assert!(html.contains("data-center-lat=\"-30.55\""));
        assert!(html.contains("<a href=\"/?registry=group\" class=\"active\">Group</a>"));
        assert!(html.contains("id=\"service-select\""));
        assert!(html.contains("<option value=\"altitude\">Altitude</option>"));
        assert!(!html.contains("data-marker-lat"));
    }
}
