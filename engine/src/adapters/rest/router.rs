//! REST API router configuration

use super::handlers::{
    get_project, manager_status, project_log, project_status, register_project, remove_project,
    server_status, start_project, stop_project, AppState,
};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the REST API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(server_status))
        .route("/manager/status", get(manager_status))
        // Project catalog
        .route("/manager/project", post(register_project))
        .route(
            "/manager/project/:name",
            get(get_project).delete(remove_project),
        )
        // Runtime
        .route("/manager/project/:name/status", get(project_status))
        .route("/manager/project/:name/log", get(project_log))
        .route("/manager/project/:name/start", post(start_project))
        .route("/manager/project/:name/stop", post(stop_project))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rest::handlers::{Envelope, RegisterResponse};
    use crate::application::Application;
    use crate::domain::services::runtime_state_store::test_support::MockExecutor;
    use crate::domain::services::SupervisorConfig;
    use crate::domain::RuntimeState;
    use crate::infrastructure::InMemoryStateStore;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde::de::DeserializeOwned;
    use std::path::Path;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(dir: &Path) -> Router {
        let config = SupervisorConfig {
            log_dir: dir.join("logs"),
            ..SupervisorConfig::default()
        };
        let application = Application::new(
            Arc::new(InMemoryStateStore::new()),
            Arc::new(MockExecutor::new()),
            config,
        );
        build_router(Arc::new(application))
    }

    fn sample_project(root: &Path) -> String {
        let dir = root.join("sample");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            r#"{"name":"sample","main":"index.js"}"#,
        )
        .unwrap();
        dir.display().to_string()
    }

    async fn call<T: DeserializeOwned>(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Envelope<T>) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_server_status() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(dir.path());

        let (status, body) = call::<()>(&router, Method::GET, "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert_eq!(body.message, "Server is available");
    }

    #[tokio::test]
    async fn test_register_status_start_stop() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(dir.path());
        let working_dir = sample_project(dir.path());

        let (status, body) = call::<RegisterResponse>(
            &router,
            Method::POST,
            "/manager/project",
            Some(serde_json::json!({ "working_dir": working_dir })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap().name, "sample");

        let (status, body) =
            call::<RuntimeState>(&router, Method::GET, "/manager/project/sample/status", None)
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap().pid, 0);

        let (status, body) = call::<RuntimeState>(
            &router,
            Method::POST,
            "/manager/project/sample/start?clusterProcesses=abc",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(body.data.unwrap().pid, 0);

        let (status, body) = call::<RuntimeState>(
            &router,
            Method::POST,
            "/manager/project/sample/start",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(!body.success);

        let (status, _) =
            call::<()>(&router, Method::POST, "/manager/project/sample/stop", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(dir.path());

        let (status, body) = call::<()>(
            &router,
            Method::POST,
            "/manager/project",
            Some(serde_json::json!({ "working_dir": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "working_dir is empty");

        let missing = dir.path().join("missing").display().to_string();
        let (status, _) = call::<()>(
            &router,
            Method::POST,
            "/manager/project",
            Some(serde_json::json!({ "working_dir": missing })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(dir.path());

        for (method, uri) in [
            (Method::GET, "/manager/project/ghost"),
            (Method::DELETE, "/manager/project/ghost"),
            (Method::GET, "/manager/project/ghost/status"),
            (Method::GET, "/manager/project/ghost/log?lines=5"),
            (Method::POST, "/manager/project/ghost/start"),
            (Method::POST, "/manager/project/ghost/stop"),
        ] {
            let (status, body) = call::<()>(&router, method, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert!(!body.success);
        }
    }

    #[tokio::test]
    async fn test_manager_status_lists_projects() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(dir.path());
        let working_dir = sample_project(dir.path());
        call::<RegisterResponse>(
            &router,
            Method::POST,
            "/manager/project",
            Some(serde_json::json!({ "working_dir": working_dir })),
        )
        .await;

        let (status, body) = call::<std::collections::BTreeMap<String, RuntimeState>>(
            &router,
            Method::GET,
            "/manager/status",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let states = body.data.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states["sample"].pid, 0);
    }
}
