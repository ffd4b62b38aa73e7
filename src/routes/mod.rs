//! Route definitions for the PermitWatch analytics API.

pub mod dashboard;
pub mod distributions;
pub mod exports;
pub mod health;

use axum::http::{HeaderValue, Method, Request};
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::AppState;

/// Tags every request with a random `x-request-id` unless the caller sent one.
#[derive(Debug, Clone, Copy, Default)]
struct RequestUuid;

impl MakeRequestId for RequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_headers(Any);
    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            tracing::warn!(frontend_url, error = %e, "Invalid FRONTEND_URL, allowing any origin");
            cors.allow_origin(Any)
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let dashboard_routes = Router::new()
        .route("/dashboards/registry", get(dashboard::registry))
        .route("/dashboards/compliance", get(dashboard::compliance))
        .route("/dashboards/revenue", get(dashboard::revenue))
        .route("/dashboards/executive", get(dashboard::executive));

    let report_routes = Router::new()
        .route(
            "/distributions/{table}/{field}",
            get(distributions::distribution),
        )
        .route("/exports/{table}/trend.csv", get(exports::trend_csv));

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(RequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.frontend_url));

    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest("/api/v1", dashboard_routes.merge(report_routes))
        .layer(middleware)
        .with_state(state)
}
