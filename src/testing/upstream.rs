//! Throwaway HTTP server standing in for a third party application
//!
//! Routes answer with canned responses and every request is recorded, so
//! adapter tests can check the exact wire shape of upstream calls.
//! Must be started from an actix runtime (`#[actix_web::test]`).

use actix_web::http::{Method, StatusCode};
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use std::collections::HashMap;
use std::sync::Mutex;

/// Canned upstream answer
#[derive(Clone, Debug)]
pub struct StubResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StubResponse {
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    #[must_use]
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Request as received by the stub
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    /// First value of a header, matched case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

struct StubState {
    routes: HashMap<(Method, String), StubResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

async fn respond(req: HttpRequest, body: web::Bytes, state: web::Data<StubState>) -> HttpResponse {
    let recorded = RecordedRequest {
        method: req.method().to_string(),
        path: req.path().to_string(),
        headers: req
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    state.requests.lock().unwrap().push(recorded);

    let Some(stub) = state
        .routes
        .get(&(req.method().clone(), req.path().to_string()))
    else {
        return HttpResponse::NotFound().body("no stub");
    };

    let status = StatusCode::from_u16(stub.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);
    for (name, value) in &stub.headers {
        builder.append_header((name.as_str(), value.as_str()));
    }
    builder.body(stub.body.clone())
}

/// Running stub server, stopped with the test runtime
///
/// # Panics
///
/// Accessors panic if the request log lock is poisoned.
pub struct StubUpstream {
    base_url: String,
    state: web::Data<StubState>,
}

impl StubUpstream {
    /// Start a stub answering `routes` on an ephemeral local port
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound
    pub fn start(routes: Vec<(Method, &str, StubResponse)>) -> std::io::Result<Self> {
        let state = web::Data::new(StubState {
            routes: routes
                .into_iter()
                .map(|(method, path, response)| ((method, path.to_string()), response))
                .collect(),
            requests: Mutex::new(Vec::new()),
        });

        let server_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(server_state.clone())
                .default_service(web::to(respond))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))?;

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every request received so far, oldest first
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Requests received for `path`
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

