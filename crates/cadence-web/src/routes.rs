//! Liveness routes.

use axum::{Router, response::Json, routing::get};
use serde_json::json;

/// Build the liveness router.
pub fn liveness_router() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "cadence scheduler is running." }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    async fn get_json(path: &str) -> (StatusCode, serde_json::Value) {
        let router = liveness_router();
        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap();

        (status, body)
    }

    #[tokio::test]
    async fn root_reports_the_scheduler_is_running() {
        let (status, body) = get_json("/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "message": "cadence scheduler is running." })
        );
    }

    #[tokio::test]
    async fn health_reports_ok_and_version() {
        let (status, body) = get_json("/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let router = liveness_router();
        let response = router
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
