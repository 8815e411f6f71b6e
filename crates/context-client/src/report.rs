//! Standalone HTML report of one query.

use context_common::Registry;

use crate::chart::Chart;
use crate::fetch::QueryOutcome;
use crate::format::escape_html;
use crate::table::render_html;

const REPORT_STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;margin:1em 0}\
td{padding:2px 8px}caption{font-weight:bold;text-align:left}\
.error{color:#a00}.url-query{font-family:monospace;word-break:break-all}";

pub fn render_report(registry: Registry, outcome: &QueryOutcome) -> String {
    let chart = match Chart::from_response(&outcome.response) {
        Ok(chart) => chart.to_svg(800, 360),
        Err(e) => format!("<div class=\"error\">{}</div>", escape_html(&e.to_string())),
    };

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>GeoContext {label} query</title>\
         <style>{style}</style></head><body>\
         <h1>GeoContext {label} query</h1>\
         <div class=\"url-query\"><h5>Geocontext API query</h5>{url}</div>\
         <div class=\"timer\"><h5>Results</h5> Request time:  {elapsed}ms</div>\
         <div class=\"result-table\">{table}</div>\
         <div class=\"chart\">{chart}</div>\
         </body></html>\n",
        label = registry.label(),
        style = REPORT_STYLE,
        url = escape_html(outcome.url.as_str()),
        elapsed = outcome.elapsed_ms,
        table = render_html(registry, &outcome.response),
        chart = chart,
    )
}
