//! Client side of the GeoContext API.
//!
//! Builds query URLs, fetches and models responses, and renders them as
//! tables (HTML or terminal), spline charts (SVG) and the registry panels
//! of the map page. [`QuerySession`] holds the interactive state of that
//! page.

pub mod chart;
pub mod error;
pub mod fetch;
pub mod format;
pub mod panels;
pub mod query;
pub mod report;
pub mod response;
pub mod session;
pub mod table;

pub use chart::{Chart, ChartPoint, Series};
pub use error::{ClientError, ClientResult};
pub use fetch::{ContextClient, QueryOutcome};
pub use panels::{render_panel, render_panels};
pub use query::QueryRequest;
pub use report::render_report;
pub use response::{GroupRow, QueryResponse, ResponseBody, ServiceRow};
pub use session::{Completion, PanelContent, QuerySession, QueryTicket};
pub use table::{render_html, render_text};
