use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use log::{info, warn};
use tower_http::cors::{Any, CorsLayer};

use super::{assignments, participants, session};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_allowed_origin);

    Router::new()
        .route("/health", get(index))
        .route("/register", post(session::register))
        .route("/login", post(session::login))
        .route("/logout", post(session::logout))
        .route("/participants", get(participants::list))
        .route("/participants/:name", delete(participants::remove))
        .route("/assignments", get(assignments::list))
        .route("/assignments/generate", post(assignments::generate))
        .route("/assignments/status", get(assignments::status))
        .route("/assignments/me", get(assignments::me))
        .route("/assignments/:participant", get(assignments::lookup))
        .route("/reset", post(assignments::reset))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(log_requests))
}

pub async fn index() -> &'static str {
    "ok"
}

fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if allowed_origin.trim() == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(allowed_origin.trim()) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!(
                "event=cors_config module=server status=rejected origin={}",
                allowed_origin
            );
            layer
        }
    }
}

/// Logs method, route template, status and latency of every request.
async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();

    let path = match req.extensions().get::<MatchedPath>() {
        Some(matched_path) => matched_path.as_str().to_owned(),
        None => req.uri().path().to_owned(),
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    info!(
        "event=http_request module=server method={} path={} status={} duration_ms={}",
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::Settings;

    #[tokio::test]
    async fn index() {
        let conn = santa_core::db::open_db_in_memory().unwrap();
        let app = router(AppState::new(conn, Settings::default()));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let conn = santa_core::db::open_db_in_memory().unwrap();
        let settings = Settings {
            cors_allowed_origin: "https://santa.example".to_owned(),
            ..Settings::default()
        };
        let app = router(AppState::new(conn, settings));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/login")
                    .header(header::ORIGIN, "https://santa.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "https://santa.example"
        );
    }
}
