use crate::api::AppState;
use crate::config::Config;
use crate::storage::Storage;
use axum::{
    Router,
    extract::{Extension, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{any, get},
};
use opentelemetry::{global, propagation::Extractor};
use recipebook_utils::version_info::{RuntimeEnv, format_version_for_runtime_env};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod model;
pub mod query;
pub mod shopping_list;
pub mod storage;
pub mod telemetry;

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl<'a> Extractor for HeaderExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Builds the application router over `storage`.
///
/// `config` is installed as a request extension for the auth extractors and
/// the health check.
pub fn routes<S: Storage>(storage: S, config: Config) -> Router {
    let state = AppState::new(storage, config.page_settings());

    Router::new()
        .route("/is-health", get(health_check::<S>))
        .nest("/api", api::routes::<S>())
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let parent_context = global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                });

                let span = tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?request.headers().get(axum::http::header::USER_AGENT),
                    otp_trace_id = tracing::field::Empty,
                );

                span.set_parent(parent_context);

                span
            }),
        )
        .layer(Extension(config))
        .with_state(state)
}

async fn health_check<S: Storage>(
    State(state): State<AppState<S>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse {
    let mut response = if state.storage.is_connected().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::BAD_GATEWAY, "502").into_response()
    };

    if let Ok(value) = HeaderValue::from_str(&config.environment().to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-service-env"), value);
    }

    let runtime_env: RuntimeEnv = config.environment().into();
    if let Ok(value) = HeaderValue::from_str(&format_version_for_runtime_env(runtime_env)) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-service-version"), value);
    }

    response
}

async fn catch_all() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockStorage;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    fn app(connected: bool) -> Router {
        let storage = MockStorage::new();
        storage.set_connected(connected);
        routes(storage, Config::new_for_test())
    }

    #[tokio::test]
    async fn test_health_check_connected() {
        let response = app(true)
            .oneshot(
                Request::builder()
                    .uri("/is-health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_check_disconnected() {
        let response = app(false)
            .oneshot(
                Request::builder()
                    .uri("/is-health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_health_check_includes_headers() {
        let response = app(true)
            .oneshot(
                Request::builder()
                    .uri("/is-health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let env_header = response
            .headers()
            .get("x-service-env")
            .and_then(|v| v.to_str().ok());
        assert_eq!(env_header, Some("local"));

        let version_header = response
            .headers()
            .get("x-service-version")
            .and_then(|v| v.to_str().ok());
        let expected_version = format_version_for_runtime_env(RuntimeEnv::Local);
        assert_eq!(version_header, Some(expected_version.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = app(true)
            .oneshot(
                Request::builder()
                    .uri("/v1/contents")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let response = app(true)
            .oneshot(
                Request::builder()
                    .uri("/api/recipes/download_shopping_cart")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
