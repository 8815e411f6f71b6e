//! Result tables, as HTML for the map page and report, or as text for the terminal.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use context_common::Registry;

use crate::format::{escape_html, round_any, sort_by_month};
use crate::response::{QueryResponse, ResponseBody, ServiceRow};

/// Service rows in display order: month-suffixed keys by calendar month.
fn ordered(services: &[ServiceRow]) -> Vec<&ServiceRow> {
    let mut rows: Vec<&ServiceRow> = services.iter().collect();
    sort_by_month(&mut rows, |row| row.key.as_str());
    rows
}

fn html_table(caption: &str, rows: impl IntoIterator<Item = (String, String)>) -> String {
    let mut html = format!("<table border='1'><caption>{}</caption>", escape_html(caption));
    for (name, value) in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_html(&name),
            escape_html(&value)
        ));
    }
    html.push_str("</table>");
    html
}

fn service_cells(services: &[ServiceRow]) -> Vec<(String, String)> {
    ordered(services)
        .into_iter()
        .map(|s| (s.name.clone(), round_any(&s.value)))
        .collect()
}

/// Details table followed by one table per group, or one `Service values` table.
pub fn render_html(registry: Registry, response: &QueryResponse) -> String {
    let details = response
        .details
        .iter()
        .map(|(name, value)| (name.clone(), round_any(value)));
    let mut html = html_table(&format!("{} details", registry.label()), details);

    match &response.body {
        ResponseBody::Details => {}
        ResponseBody::Groups(groups) => {
            for group in groups {
                html.push_str("<div>");
                html.push_str(&html_table(
                    &format!("{} group service values", group.name),
                    service_cells(&group.services),
                ));
                html.push_str("</div>");
            }
        }
        ResponseBody::Services(services) => {
            html.push_str("<div>");
            html.push_str(&html_table("Service values", service_cells(services)));
            html.push_str("</div>");
        }
    }
    html
}

fn text_table(caption: &str, rows: impl IntoIterator<Item = (String, String)>) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![caption.to_string()]);
    for (name, value) in rows {
        table.add_row(vec![name, value]);
    }
    table.to_string()
}

/// Same tables as [`render_html`], drawn for a terminal.
pub fn render_text(registry: Registry, response: &QueryResponse) -> String {
    let details = response
        .details
        .iter()
        .map(|(name, value)| (name.clone(), round_any(value)));
    let mut tables = vec![text_table(&format!("{} details", registry.label()), details)];

    match &response.body {
        ResponseBody::Details => {}
        ResponseBody::Groups(groups) => {
            for group in groups {
                tables.push(text_table(
                    &format!("{} group service values", group.name),
                    service_cells(&group.services),
                ));
            }
        }
        ResponseBody::Services(services) => {
            tables.push(text_table("Service values", service_cells(services)));
        }
    }
    tables.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group_response() -> QueryResponse {
        QueryResponse::from_value(json!({
            "key": "rainfall",
            "name": "Rainfall",
            "group_type": "graph",
            "services": [
                {"key": "rainfall_march", "name": "Rainfall March", "value": "48"},
                {"key": "rainfall_january", "name": "Rainfall January", "value": "61.2"},
                {"key": "rainfall_february", "name": "Rainfall February", "value": "55.75"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_html_group_registry() {
        let html = render_html(Registry::Group, &group_response());
        assert!(html.starts_with("<table border='1'><caption>Group details</caption>"));
        assert!(html.contains("<tr><td>key</td><td>rainfall</td></tr>"));
        assert!(html.contains("<caption>Service values</caption>"));

        let january = html.find("Rainfall January").unwrap();
        let february = html.find("Rainfall February").unwrap();
        let march = html.find("Rainfall March").unwrap();
        assert!(january < february && february < march);
        assert!(html.contains("<td>61.20</td>"));
        assert!(!html.contains("services"));
    }

    #[test]
    fn test_html_collection_registry() {
        let response = QueryResponse::from_value(json!({
            "key": "sample_collection",
            "name": "Sample <Collection>",
            "groups": [
                {"key": "terrain", "name": "Terrain", "group_type": "text",
                 "services": [{"key": "altitude", "name": "Altitude", "value": "1225.5"}]},
                {"key": "rainfall", "name": "Rainfall", "group_type": "graph",
                 "services": [{"key": "rainfall_january", "name": "Rainfall January", "value": null}]}
            ]
        }))
        .unwrap();
        let html = render_html(Registry::Collection, &response);
        assert!(html.contains("<caption>Collection details</caption>"));
        assert!(html.contains("Sample &lt;Collection&gt;"));
        assert!(html.contains("<caption>Terrain group service values</caption>"));
        assert!(html.contains("<caption>Rainfall group service values</caption>"));
        assert!(html.contains("<td>1225.50</td>"));
        assert!(html.contains("<td>null</td>"));
        assert!(html.find("Terrain group").unwrap() < html.find("Rainfall group").unwrap());
    }

    #[test]
    fn test_html_service_registry() {
        let response = QueryResponse::from_value(json!({
            "key": "land_cover",
            "name": "Land Cover",
            "value": "Grassland"
        }))
        .unwrap();
        let html = render_html(Registry::Service, &response);
        assert!(html.contains("<td>value</td><td>Grassland</td>"));
        assert!(!html.contains("<div>"));
    }

    #[test]
    fn test_text_tables() {
        let text = render_text(Registry::Group, &group_response());
        assert!(text.contains("Group details"));
        assert!(text.contains("Service values"));
        assert!(text.contains("55.75"));
        assert!(text.find("Rainfall January").unwrap() < text.find("Rainfall March").unwrap());
    }
}
