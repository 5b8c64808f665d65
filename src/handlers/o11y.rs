use crate::cache::{CacheStore, MetricStore};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::utils::responses::ResponseBuilder;
use crate::SERVICE_NAME;
use actix_web::{web, HttpResponse};
use std::fmt::Write as _;

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// `GET /health`
pub async fn health(lifecycle: web::Data<Lifecycle>) -> HttpResponse {
    match lifecycle.state() {
        LifecycleState::Ready => ResponseBuilder::text(HttpResponse::Ok(), "OK"),
        LifecycleState::Starting => {
            ResponseBuilder::text(HttpResponse::ServiceUnavailable(), "Service is starting")
        }
        LifecycleState::Draining | LifecycleState::Stopped => {
            ResponseBuilder::text(HttpResponse::ServiceUnavailable(), "Service is shutting down")
        }
    }
}

/// `GET /metrics`
pub async fn metrics(store: web::Data<MetricStore>, lifecycle: web::Data<Lifecycle>) -> HttpResponse {
    let mut body = store
        .metrics()
        .snapshot()
        .render(SERVICE_NAME, store.backend());
    body.push_str(&render_lifecycle(lifecycle.state()));

    HttpResponse::Ok()
        .content_type(METRICS_CONTENT_TYPE)
        .body(body)
}

fn render_lifecycle(current: LifecycleState) -> String {
    let mut out = String::new();
    out.push_str("# HELP lifecycle_state Current process lifecycle state\n");
    out.push_str("# TYPE lifecycle_state gauge\n");
    for state in [
        LifecycleState::Starting,
        LifecycleState::Ready,
        LifecycleState::Draining,
        LifecycleState::Stopped,
    ] {
        let _ = writeln!(
            out,
            "lifecycle_state{{service=\"{SERVICE_NAME}\",state=\"{state}\"}} {}",
            u8::from(state == current)
        );
    }
    out
}
