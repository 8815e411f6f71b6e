//! In-process HTTP server standing in for WMS/WFS/ArcREST/GeoNames upstreams.
//!
//! Routes are matched on path and, optionally, on one query parameter
//! (case-insensitive name). Every request is recorded for assertions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use tokio::task::JoinHandle;

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockRoute {
    pub path: String,
    pub param: Option<(String, String)>,
    pub status: u16,
    pub content_type: String,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockRoute {
    pub fn json(path: &str, body: Value) -> Self {
        Self {
            path: path.to_string(),
            param: None,
            status: 200,
            content_type: "application/json".to_string(),
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn text(path: &str, content_type: &str, body: &str) -> Self {
        Self {
            path: path.to_string(),
            param: None,
            status: 200,
            content_type: content_type.to_string(),
            body: body.to_string(),
            delay: None,
        }
    }

    /// Only match when query parameter `name` equals `value`.
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.param = Some((name.to_string(), value.to_string()));
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn matches(&self, path: &str, query: &[(String, String)]) -> bool {
        if self.path != path {
            return false;
        }
        match &self.param {
            None => true,
            Some((name, value)) => query
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case(name) && v == value),
        }
    }
}

/// A request received by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl RecordedRequest {
    /// Query parameter by case-insensitive name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

struct MockState {
    routes: Vec<MockRoute>,
    requests: Mutex<Vec<RecordedRequest>>,
}

async fn respond(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    let path = uri.path().to_string();
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(RecordedRequest {
            path: path.clone(),
            query: query.clone(),
        });
    }

    let Some(route) = state.routes.iter().find(|r| r.matches(&path, &query)) else {
        return (StatusCode::NOT_FOUND, "no mock route").into_response();
    };

    if let Some(delay) = route.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(route.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, route.content_type.clone())],
        route.body.clone(),
    )
        .into_response()
}

/// Running mock server; shut down on drop.
pub struct MockUpstream {
    base_url: String,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockUpstream {
    /// Bind to an ephemeral port on 127.0.0.1 and serve `routes`.
    pub async fn start(routes: Vec<MockRoute>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock upstream");
        let addr = listener
            .local_addr()
            .expect("Mock upstream has no local address");

        let state = Arc::new(MockState {
            routes,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(respond).with_state(state.clone());

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of requests received on `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn raw_get(base_url: &str, path_and_query: &str) -> String {
        let addr = base_url.trim_start_matches("http://");
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            path_and_query, addr
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_routes_match_on_param() {
        let mock = MockUpstream::start(vec![
            MockRoute::json("/wfs", json!({"month": "january"})).with_param("TYPENAME", "jan"),
            MockRoute::json("/wfs", json!({"month": "february"})).with_param("TYPENAME", "feb"),
        ])
        .await;

        let response = raw_get(mock.base_url(), "/wfs?typename=feb").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("february"));

        let response = raw_get(mock.base_url(), "/other").await;
        assert!(response.starts_with("HTTP/1.1 404"));

        assert_eq!(mock.hits("/wfs"), 1);
        assert_eq!(mock.requests()[0].param("TYPENAME"), Some("feb"));
    }
}
