//! Registry panels of the map page.

use context_common::{Registry, RegistryEntry, RegistryIndex};

use crate::format::escape_html;
use crate::session::{PanelContent, QuerySession};

fn options(entries: &[RegistryEntry], selected: Option<&str>) -> String {
    entries
        .iter()
        .map(|entry| {
            let marker = if selected == Some(entry.key.as_str()) {
                " selected"
            } else {
                ""
            };
            format!(
                "<option value=\"{}\"{}>{}</option>",
                escape_html(&entry.key),
                marker,
                escape_html(&entry.name)
            )
        })
        .collect()
}

fn results(content: Option<&PanelContent>) -> (String, String, String) {
    match content {
        None => Default::default(),
        Some(PanelContent::Loaded {
            url,
            elapsed_ms,
            table_html,
            chart,
        }) => {
            let chart = match chart {
                Ok(svg) => format!("<div class=\"chart\">{}</div>", svg),
                Err(message) => format!("<div class=\"error\">{}</div>", escape_html(message)),
            };
            (
                format!("<h5>Results</h5> Request time:  {}ms", elapsed_ms),
                format!("{}{}", table_html, chart),
                format!("<h5>Geocontext API query</h5>{}", escape_html(url)),
            )
        }
        Some(PanelContent::Failed(message)) => (
            String::new(),
            format!("<div class=\"error\">{}</div>", escape_html(message)),
            String::new(),
        ),
    }
}

/// One panel: coordinate boxes, fetch button, key select, then the timer,
/// result table and query URL areas.
pub fn render_panel(registry: Registry, entries: &[RegistryEntry], session: &QuerySession) -> String {
    let id = registry.as_str();
    let (lat, lon) = session.coord_box(registry);
    let (timer, table, url) = results(session.panel(registry));
    let active = if session.active_tab() == Some(registry) {
        " active"
    } else {
        ""
    };

    format!(
        "<div class=\"panel{active}\" id=\"{id}-panel\">\
         <h2>{label}s</h2>\
         <form method=\"get\" action=\"/\">\
         <input type=\"hidden\" name=\"registry\" value=\"{id}\"/>\
         <label>Latitude: </label><input class=\"input-field\" type=\"number\" step=\"0.0001\" name=\"lat\" id=\"{id}-lat-box\" value=\"{lat}\"/>\
         <label>Longitude: </label><input class=\"input-field\" type=\"number\" step=\"0.0001\" name=\"lon\" id=\"{id}-lon-box\" value=\"{lon}\"/>\
         <label>Token: </label><input class=\"input-field\" type=\"text\" name=\"token\" id=\"{id}-token-box\" value=\"{token}\"/>\
         <button class=\"fetch-button\" type=\"submit\" id=\"{id}-button\">Fetch</button>\
         <div><label> {label}s: </label><select class=\"select-dropdown\" name=\"key\" id=\"{id}-select\">{options}</select></div>\
         </form>\
         <div id=\"{id}-timer\">{timer}</div>\
         <div class=\"result-table\" id=\"{id}-table\">{table}</div>\
         <div class=\"url-query\" id=\"{id}-url\">{url}</div>\
         </div>",
        active = active,
        id = id,
        label = registry.label(),
        lat = escape_html(lat),
        lon = escape_html(lon),
        token = escape_html(session.token().unwrap_or_default()),
        options = options(entries, session.selected_key(registry)),
        timer = timer,
        table = table,
        url = url,
    )
}

/// Service, group and collection panels in that order.
pub fn render_panels(index: &RegistryIndex, session: &QuerySession) -> String {
    Registry::ALL
        .iter()
        .map(|registry| render_panel(*registry, index.entries(*registry), session))
        .collect()
}
