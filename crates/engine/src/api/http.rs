//! HTTP routes.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tower_http::compression::{
    predicate::{DefaultPredicate, Predicate, SizeAbove},
    CompressionLayer,
};

use comfydeck_domain::{tags::DEFAULT_LIMIT, GenerationSettings, PromptId};

use crate::app::App;
use crate::infrastructure::images::PreviewError;
use crate::stores::SessionSnapshot;
use crate::use_cases::generation::{CancelOutcome, GenerateError, GenerateOutcome};
use crate::use_cases::settings::SettingsError;

/// Responses smaller than this are sent uncompressed.
pub const GZIP_MIN_SIZE: u16 = 1000;

/// Routes bound to `app`, gzip-compressed when the client accepts it.
pub fn router(app: Arc<App>) -> Router {
    let compression = CompressionLayer::new()
        .gzip(true)
        .compress_when(DefaultPredicate::new().and(SizeAbove::new(GZIP_MIN_SIZE)));

    routes().with_state(app).layer(compression)
}

/// Create all HTTP routes. Anything that is not an API route is served from
/// the built frontend.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/api/comfyui_endpoint", get(comfyui_endpoint))
        .route("/api/workflows", get(list_workflows))
        .route("/api/object_info", get(object_info))
        .route("/api/get_image", get(get_image))
        .route("/api/session", get(get_session))
        .route("/api/session/workflow", post(set_workflow))
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/settings/reset", post(reset_settings))
        .route("/api/generate", post(generate))
        .route("/api/cancel", post(cancel))
        .route("/api/tags", get(search_tags))
        .fallback(serve_static)
}

// =============================================================================
// Backend info
// =============================================================================

async fn comfyui_endpoint(State(app): State<Arc<App>>) -> Json<Value> {
    Json(json!({ "endpoint": app.comfy.endpoint() }))
}

async fn list_workflows(State(app): State<Arc<App>>) -> Json<Vec<String>> {
    Json(app.use_cases.workflow.list.execute().await)
}

async fn object_info(State(app): State<Arc<App>>) -> Result<Json<Value>, ApiError> {
    let manifest = app.comfy.object_info().await.map_err(|e| {
        tracing::error!(error = %e, "Error getting object info");
        ApiError::Internal("Failed to get object info".to_string())
    })?;
    Ok(Json(manifest))
}

#[derive(Debug, Deserialize)]
struct ImageQuery {
    filename: String,
    #[serde(rename = "type", default)]
    kind: String,
}

async fn get_image(
    State(app): State<Arc<App>>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, ApiError> {
    let path = app
        .web
        .previews
        .preview(&query.filename, &query.kind)
        .await
        .map_err(|e| match e {
            PreviewError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        })?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to read image: {e}")))?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

// =============================================================================
// Session
// =============================================================================

async fn get_session(State(app): State<Arc<App>>) -> Json<SessionSnapshot> {
    Json(app.session.snapshot().await)
}

#[derive(Debug, Deserialize)]
struct SetWorkflowRequest {
    name: String,
}

async fn set_workflow(
    State(app): State<Arc<App>>,
    Json(request): Json<SetWorkflowRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    app.use_cases
        .workflow
        .load
        .execute(&request.name)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                ApiError::NotFound
            } else {
                ApiError::Internal(e.to_string())
            }
        })?;
    Ok(Json(app.session.snapshot().await))
}

// =============================================================================
// Settings
// =============================================================================

async fn get_settings(State(app): State<Arc<App>>) -> Json<GenerationSettings> {
    Json(app.use_cases.settings.get().await)
}

async fn update_settings(
    State(app): State<Arc<App>>,
    Json(patch): Json<Map<String, Value>>,
) -> Result<Json<GenerationSettings>, ApiError> {
    let updated = app.use_cases.settings.update(patch).await?;
    Ok(Json(updated))
}

async fn reset_settings(State(app): State<Arc<App>>) -> Result<Json<GenerationSettings>, ApiError> {
    let settings = app.use_cases.settings.reset().await?;
    Ok(Json(settings))
}

// =============================================================================
// Generation
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    prompt_ids: Vec<PromptId>,
}

async fn generate(State(app): State<Arc<App>>) -> Result<Json<GenerateResponse>, ApiError> {
    match app.use_cases.generation.generate.start().await {
        Ok(GenerateOutcome::Submitted { prompt_ids }) => Ok(Json(GenerateResponse { prompt_ids })),
        Ok(GenerateOutcome::AlreadyRunning) => {
            Err(ApiError::Conflict("Generation already in progress".to_string()))
        }
        Ok(GenerateOutcome::NoWorkflow) => {
            Err(ApiError::BadRequest("No workflow loaded".to_string()))
        }
        Err(e @ GenerateError::Submission { .. }) => Err(ApiError::BadGateway(e.to_string())),
    }
}

async fn cancel(State(app): State<Arc<App>>) -> Json<CancelOutcome> {
    Json(app.use_cases.generation.cancel.execute().await)
}

// =============================================================================
// Tags
// =============================================================================

#[derive(Debug, Deserialize)]
struct TagQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

async fn search_tags(State(app): State<Arc<App>>, Query(query): Query<TagQuery>) -> Json<Vec<String>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Json(
        app.web
            .tags
            .search(&query.q, limit)
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

// =============================================================================
// Static files
// =============================================================================

async fn serve_static(State(app): State<Arc<App>>, uri: Uri) -> Result<Response, ApiError> {
    let path = static_path(&app.web.dist_dir, uri.path()).ok_or(ApiError::NotFound)?;

    // Directories and unreadable entries are reported as missing
    let bytes = tokio::fs::read(&path).await.map_err(|_| ApiError::NotFound)?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes).into_response())
}

/// Map a request path onto the frontend root. `None` if it would leave it.
fn static_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    let relative = if relative.is_empty() { "index.html" } else { relative };

    let relative = Path::new(relative);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("yaml") | Some("yml") => "application/yaml; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        _ => "text/plain",
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    Conflict(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<SettingsError> for ApiError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::Invalid(e) => ApiError::BadRequest(e.to_string()),
            SettingsError::Repo(e) => ApiError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use comfydeck_domain::{TagIndex, WorkflowConfig, WorkflowGraph, WorkflowNode};

    use crate::app::WebAssets;
    use crate::infrastructure::images::ImagePreviews;
    use crate::infrastructure::ports::{
        ComfyError, MockComfyApiPort, MockRandomPort, MockSettingsRepo, MockWorkflowRepo, RepoError,
    };

    struct TestApp {
        router: Router,
        app: Arc<App>,
        _dist: tempfile::TempDir,
    }

    fn test_app(
        comfy: MockComfyApiPort,
        workflows: MockWorkflowRepo,
        settings: MockSettingsRepo,
        random: MockRandomPort,
    ) -> TestApp {
        let dist = tempfile::tempdir().expect("tempdir");
        std::fs::write(dist.path().join("index.html"), "<html>panel</html>").unwrap();
        std::fs::create_dir(dist.path().join("workflow")).unwrap();
        std::fs::write(dist.path().join("workflow").join("a_config.yaml"), "output_node_id: 9").unwrap();

        let app = Arc::new(App::new(
            Arc::new(comfy),
            Arc::new(workflows),
            Arc::new(settings),
            Arc::new(random),
            Duration::ZERO,
            WebAssets {
                dist_dir: dist.path().to_path_buf(),
                previews: ImagePreviews::default(),
                tags: TagIndex::from_csv("1girl,1\nsolo,2\nsolo_focus,3\n"),
            },
        ));
        TestApp {
            router: router(app.clone()),
            app,
            _dist: dist,
        }
    }

    fn default_app(comfy: MockComfyApiPort) -> TestApp {
        test_app(
            comfy,
            MockWorkflowRepo::new(),
            MockSettingsRepo::new(),
            MockRandomPort::new(),
        )
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn endpoint_route_reports_backend_url() {
        let mut comfy = MockComfyApiPort::new();
        comfy.expect_endpoint().return_const("http://127.0.0.1:8188".to_string());
        let t = default_app(comfy);

        let (status, body) = send(&t.router, Method::GET, "/api/comfyui_endpoint", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!({"endpoint": "http://127.0.0.1:8188"}));
    }

    #[tokio::test]
    async fn workflows_route_lists_templates() {
        let mut workflows = MockWorkflowRepo::new();
        workflows
            .expect_list()
            .returning(|| Ok(vec!["alpha".to_string(), "beta".to_string()]));
        let t = test_app(
            MockComfyApiPort::new(),
            workflows,
            MockSettingsRepo::new(),
            MockRandomPort::new(),
        );

        let (status, body) = send(&t.router, Method::GET, "/api/workflows", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!(["alpha", "beta"]));
    }

    #[tokio::test]
    async fn large_object_info_is_gzipped_when_accepted() {
        let mut comfy = MockComfyApiPort::new();
        comfy.expect_object_info().returning(|| {
            let names: Vec<String> = (0..200).map(|i| format!("model_{i:03}.safetensors")).collect();
            Ok(json!({
                "D2 Checkpoint Loader": { "input": { "required": { "ckpt_name": [names] } } }
            }))
        });
        let t = default_app(comfy);

        let request = Request::builder()
            .uri("/api/object_info")
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap();
        let response = t.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");

        let request = Request::builder()
            .uri("/api/object_info")
            .body(Body::empty())
            .unwrap();
        let response = t.router.clone().oneshot(request).await.unwrap();
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    }

    #[tokio::test]
    async fn small_responses_are_not_compressed() {
        let mut comfy = MockComfyApiPort::new();
        comfy.expect_endpoint().return_const("http://127.0.0.1:8188".to_string());
        let t = default_app(comfy);

        let request = Request::builder()
            .uri("/api/comfyui_endpoint")
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap();
        let response = t.router.clone().oneshot(request).await.unwrap();
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
    }

    #[tokio::test]
    async fn object_info_failure_is_500_with_error() {
        let mut comfy = MockComfyApiPort::new();
        comfy
            .expect_object_info()
            .returning(|| Err(ComfyError::request("/object_info", "connection refused")));
        let t = default_app(comfy);

        let (status, body) = send(&t.router, Method::GET, "/api/object_info", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(&body)["error"], "Failed to get object info");
    }

    #[tokio::test]
    async fn static_files_are_served_with_content_type() {
        let t = default_app(MockComfyApiPort::new());

        let response = t
            .router
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );

        let response = t
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/workflow/a_config.yaml")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/yaml; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn missing_and_escaping_paths_are_404() {
        let t = default_app(MockComfyApiPort::new());

        let (status, _) = send(&t.router, Method::GET, "/nope.js", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&t.router, Method::GET, "/../Cargo.toml", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&t.router, Method::GET, "/workflow/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn content_types_fall_back_to_plain_text() {
        assert_eq!(content_type_for(Path::new("a.js")), "application/javascript; charset=utf-8");
        assert_eq!(content_type_for(Path::new("a.yml")), "application/yaml; charset=utf-8");
        assert_eq!(content_type_for(Path::new("a.txt")), "text/plain");
        assert_eq!(content_type_for(Path::new("LICENSE")), "text/plain");
    }

    #[test]
    fn static_path_rejects_parent_components() {
        let root = Path::new("/srv/dist");
        assert_eq!(static_path(root, "/"), Some(root.join("index.html")));
        assert_eq!(static_path(root, "/assets/app.js"), Some(root.join("assets/app.js")));
        assert_eq!(static_path(root, "/assets/../../etc/passwd"), None);
    }

    #[tokio::test]
    async fn generate_without_workflow_is_400() {
        let t = default_app(MockComfyApiPort::new());

        let (status, _) = send(&t.router, Method::POST, "/api/generate", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_while_running_is_409() {
        let t = default_app(MockComfyApiPort::new());
        let _held = t.app.session.try_begin().expect("slot");

        let (status, _) = send(&t.router, Method::POST, "/api/generate", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn generate_submission_failure_is_502() {
        let mut comfy = MockComfyApiPort::new();
        comfy
            .expect_submit_prompt()
            .returning(|_| Err(ComfyError::request("/prompt", "connection refused")));
        let mut random = MockRandomPort::new();
        random.expect_gen_range().returning(|_, _| 7);
        let t = test_app(comfy, MockWorkflowRepo::new(), MockSettingsRepo::new(), random);
        {
            let mut state = t.app.session.lock().await;
            state.graph = Some(WorkflowGraph::new().with_node("3", WorkflowNode::new("KSampler")));
            state.config = Some(WorkflowConfig::new("9"));
        }

        let (status, body) = send(&t.router, Method::POST, "/api/generate", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(json_body(&body)["error"]
            .as_str()
            .unwrap_or_default()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn generate_returns_submitted_ids() {
        let mut comfy = MockComfyApiPort::new();
        comfy
            .expect_submit_prompt()
            .returning(|_| Ok(Some(PromptId::new("abc"))));
        comfy.expect_endpoint().return_const("http://comfy:8188".to_string());
        comfy.expect_history().returning(|_| Ok(None));
        let mut random = MockRandomPort::new();
        random.expect_gen_range().returning(|_, _| 7);
        let t = test_app(comfy, MockWorkflowRepo::new(), MockSettingsRepo::new(), random);
        {
            let mut state = t.app.session.lock().await;
            state.graph = Some(WorkflowGraph::new().with_node("3", WorkflowNode::new("KSampler")));
            state.config = Some(WorkflowConfig::new("9"));
        }

        let (status, body) = send(&t.router, Method::POST, "/api/generate", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!({"promptIds": ["abc"]}));
        assert!(t.app.session.is_generating());

        // stop the background poller
        t.app.session.lock().await.pending.clear();
    }

    #[tokio::test]
    async fn settings_round_trip_over_http() {
        let mut settings = MockSettingsRepo::new();
        settings.expect_save().returning(|_| Ok(()));
        let t = test_app(
            MockComfyApiPort::new(),
            MockWorkflowRepo::new(),
            settings,
            MockRandomPort::new(),
        );

        let (status, body) = send(
            &t.router,
            Method::PUT,
            "/api/settings",
            Some(json!({"positive": "a cat", "steps": 28})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["positive"], "a cat");

        let (_, body) = send(&t.router, Method::GET, "/api/settings", None).await;
        let settings = json_body(&body);
        assert_eq!(settings["steps"], 28);
        assert_eq!(settings["batchCount"], 1);

        let (status, _) = send(
            &t.router,
            Method::PUT,
            "/api/settings",
            Some(json!({"seed": "not a number"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_workflow_is_404() {
        let mut workflows = MockWorkflowRepo::new();
        workflows
            .expect_load_graph()
            .returning(|name| Err(RepoError::not_found("Workflow", name)));
        let t = test_app(
            MockComfyApiPort::new(),
            workflows,
            MockSettingsRepo::new(),
            MockRandomPort::new(),
        );

        let (status, _) = send(
            &t.router,
            Method::POST,
            "/api/session/workflow",
            Some(json!({"name": "ghost"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cancel_reports_outcome() {
        let mut comfy = MockComfyApiPort::new();
        comfy.expect_queue().returning(|| {
            Ok(serde_json::from_value(json!({"queue_running": [[0, "run"]], "queue_pending": []})).unwrap())
        });
        comfy.expect_clear_queue().returning(|| Ok(()));
        let t = default_app(comfy);

        let (status, body) = send(&t.router, Method::POST, "/api/cancel", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body)["running"], "run");
    }

    #[tokio::test]
    async fn tags_route_searches_index() {
        let t = default_app(MockComfyApiPort::new());

        let (_, body) = send(&t.router, Method::GET, "/api/tags?q=SOL&limit=1", None).await;
        assert_eq!(json_body(&body), json!(["solo"]));
        let (_, body) = send(&t.router, Method::GET, "/api/tags?q=s", None).await;
        assert_eq!(json_body(&body), json!([]));
    }

    #[tokio::test]
    async fn get_image_without_folder_config_is_500() {
        let t = default_app(MockComfyApiPort::new());

        let (status, _) = send(&t.router, Method::GET, "/api/get_image?filename=a.png&type=output", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn session_route_reports_state() {
        let t = default_app(MockComfyApiPort::new());
        t.app.session.lock().await.workflow_name = Some("alpha".to_string());

        let (status, body) = send(&t.router, Method::GET, "/api/session", None).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["workflowName"], "alpha");
        assert_eq!(body["queueCount"], 0);
        assert_eq!(body["isGenerating"], false);
    }
}
