//! Interactive query state for the map page.
//!
//! A session owns the active registry tab, the marker position and the
//! coordinate boxes of every panel. Each fetch is stamped with a
//! generation; a response is applied only when its generation is still
//! the latest, so a slow answer never overwrites a newer one.

use std::collections::HashMap;

use context_common::Registry;

use crate::chart::Chart;
use crate::error::ClientResult;
use crate::fetch::QueryOutcome;
use crate::format::{format_click_coord, format_coord, parse_leading_float};
use crate::query::QueryRequest;
use crate::table::render_html;

/// Chart size used in panels.
const CHART_WIDTH: u32 = 600;
const CHART_HEIGHT: u32 = 320;

/// A fetch in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTicket {
    pub generation: u64,
    pub request: QueryRequest,
}

/// What a panel shows after a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelContent {
    Loaded {
        url: String,
        elapsed_ms: u128,
        table_html: String,
        /// SVG chart, or why there is none.
        chart: Result<String, String>,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer fetch started after this one; the response was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct QuerySession {
    active: Option<Registry>,
    selected: HashMap<Registry, String>,
    coord_boxes: HashMap<Registry, (String, String)>,
    marker: Option<(f64, f64)>,
    generation: u64,
    in_flight: bool,
    token: Option<String>,
    panels: HashMap<Registry, PanelContent>,
}

impl Default for QuerySession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuerySession {
    pub fn new() -> Self {
        let coord_boxes = Registry::ALL
            .iter()
            .map(|r| (*r, ("0.0000".to_string(), "0.0000".to_string())))
            .collect();
        Self {
            active: None,
            selected: HashMap::new(),
            coord_boxes,
            marker: None,
            generation: 0,
            in_flight: false,
            token: None,
            panels: HashMap::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn select_tab(&mut self, registry: Registry) {
        self.active = Some(registry);
    }

    pub fn active_tab(&self) -> Option<Registry> {
        self.active
    }

    pub fn select_key(&mut self, registry: Registry, key: impl Into<String>) {
        self.selected.insert(registry, key.into());
    }

    pub fn selected_key(&self, registry: Registry) -> Option<&str> {
        self.selected.get(&registry).map(String::as_str)
    }

    /// `(lat, lon)` box contents of a panel.
    pub fn coord_box(&self, registry: Registry) -> (&str, &str) {
        self.coord_boxes
            .get(&registry)
            .map(|(lat, lon)| (lat.as_str(), lon.as_str()))
            .unwrap_or(("", ""))
    }

    /// Edit one panel's boxes, as typing into them does.
    pub fn set_coord_box(&mut self, registry: Registry, lat: &str, lon: &str) {
        self.coord_boxes
            .insert(registry, (lat.to_string(), lon.to_string()));
    }

    pub fn marker(&self) -> Option<(f64, f64)> {
        self.marker
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the fetch control is disabled.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn panel(&self, registry: Registry) -> Option<&PanelContent> {
        self.panels.get(&registry)
    }

    /// Map click: query the active tab's selected key at the clicked point.
    ///
    /// Nothing happens until a tab is open and has a key selected.
    pub fn map_click(&mut self, lat: f64, lon: f64) -> Option<QueryTicket> {
        let lat = parse_leading_float(&format_click_coord(lat))?;
        let lon = parse_leading_float(&format_click_coord(lon))?;
        self.fetch_active(lat, lon)
    }

    /// Fetch button: query at the active panel's coordinate boxes.
    pub fn fetch_button(&mut self) -> Option<QueryTicket> {
        let registry = self.active?;
        let (lat, lon) = self.coord_box(registry);
        let lat = parse_leading_float(lat)?;
        let lon = parse_leading_float(lon)?;
        self.fetch_active(lat, lon)
    }

    fn fetch_active(&mut self, lat: f64, lon: f64) -> Option<QueryTicket> {
        let registry = self.active?;
        let key = self.selected_key(registry)?.to_string();
        Some(self.begin(registry, key, lat, lon))
    }

    /// Start a fetch: every panel's boxes follow the point, the marker moves
    /// and the generation advances.
    pub fn begin(&mut self, registry: Registry, key: String, lat: f64, lon: f64) -> QueryTicket {
        let (lat_text, lon_text) = (format_coord(lat), format_coord(lon));
        for registry in Registry::ALL {
            self.coord_boxes
                .insert(registry, (lat_text.clone(), lon_text.clone()));
        }
        self.marker = Some((lat, lon));
        self.generation += 1;
        self.in_flight = true;

        let mut request = QueryRequest::new(registry, key, lat, lon);
        request.token = self.token.clone();
        QueryTicket {
            generation: self.generation,
            request,
        }
    }

    /// Apply a finished fetch unless a newer one has started since.
    pub fn complete(&mut self, ticket: &QueryTicket, outcome: ClientResult<QueryOutcome>) -> Completion {
        if ticket.generation != self.generation {
            return Completion::Stale;
        }
        self.in_flight = false;

        let registry = ticket.request.registry;
        let content = match outcome {
            Ok(outcome) => PanelContent::Loaded {
                url: outcome.url.to_string(),
                elapsed_ms: outcome.elapsed_ms,
                table_html: render_html(registry, &outcome.response),
                chart: Chart::from_response(&outcome.response)
                    .map(|chart| chart.to_svg(CHART_WIDTH, CHART_HEIGHT))
                    .map_err(|e| e.to_string()),
            },
            Err(e) => PanelContent::Failed(e.to_string()),
        };
        self.panels.insert(registry, content);
        Completion::Applied
    }
}
