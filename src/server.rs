//! Plain-text lookup over HTTP.
//!
//! `GET /<root>?word=<w>[&endpoint=<e>]` answers with the raw-text form of
//! the definition. Providers are blocking, so each request runs its whole
//! provider lifecycle on the blocking pool.
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info, warn};

use crate::config::{DictConfig, ServerConfig};
use crate::dict::{DictError, DictRegistry, WordItem};

type SharedState = Arc<AppState>;

pub struct AppState {
    pub registry: DictRegistry,
    pub dict: DictConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupParams {
    word: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(word: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("word not found: {word}"),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<DictError> for ApiError {
    fn from(err: DictError) -> Self {
        match err {
            DictError::InvalidEndpoint(_) => Self::bad_request(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, format!("{}\n", self.message)).into_response()
    }
}

/// Router serving lookups under `/<root>`.
pub fn build_router(state: SharedState, root: &str) -> Router {
    let path = format!("/{}", root.trim_matches('/'));
    Router::new().route(&path, get(lookup)).with_state(state)
}

async fn lookup(
    State(state): State<SharedState>,
    Query(params): Query<LookupParams>,
) -> Result<String, ApiError> {
    let word = params.word.as_deref().map(str::trim).unwrap_or_default().to_string();
    if word.is_empty() {
        return Err(ApiError::bad_request("query parameter `word` is required"));
    }
    let endpoint = params
        .endpoint
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| state.dict.endpoint.clone());
    debug!("http lookup: {word:?} via {endpoint}");

    let task_state = Arc::clone(&state);
    let task_word = word.clone();
    let item: WordItem = tokio::task::spawn_blocking(move || {
        let dict = task_state
            .registry
            .create_by_name(&endpoint, &task_state.dict)?;
        dict.search(&task_word)
    })
    .await
    .map_err(|e| ApiError::internal(format!("lookup task failed: {e}")))?
    .map_err(|e| {
        warn!("lookup {word:?} failed: {e}");
        ApiError::from(e)
    })?;

    if !item.is_found() {
        return Err(ApiError::not_found(&item.word));
    }
    Ok(item.raw_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Bind `0.0.0.0:<port>` and serve until Ctrl-C / SIGTERM.
pub async fn serve(server: &ServerConfig, dict: DictConfig, registry: DictRegistry) -> Result<()> {
    let state = Arc::new(AppState { registry, dict });
    let router = build_router(state, &server.root);

    let addr = SocketAddr::from(([0, 0, 0, 0], server.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Serving lookups on http://{addr}/{}", server.root.trim_matches('/'));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;
    info!("HTTP server exited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::{Dict, Endpoint, WordDefine};
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;

    struct StubDict;

    impl Dict for StubDict {
        fn search(&self, word: &str) -> Result<WordItem, DictError> {
            match word {
                "bing" => Ok(WordItem::new(
                    word,
                    vec![WordDefine {
                        phonetics: vec!["[bɪŋ]".into()],
                        definition: "++++Bing (n.)\n----heap or pile\nplain line".into(),
                    }],
                )),
                "boom" => Err(DictError::unexpected(Endpoint::Youdao, "upstream exploded")),
                _ => Ok(WordItem::not_found(word)),
            }
        }
    }

    fn stub_factory(_: &DictConfig) -> Result<Box<dyn Dict>, DictError> {
        Ok(Box::new(StubDict))
    }

    fn test_router() -> Router {
        let mut registry = DictRegistry::new();
        registry.register(Endpoint::Youdao, stub_factory);
        let state = Arc::new(AppState {
            registry,
            dict: DictConfig::default(),
        });
        build_router(state, "/dict/")
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        let response = test_router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn lookup_returns_raw_text() {
        let (status, text) = get("/dict?word=bing").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "bing\n[bɪŋ]\nBing (n.)\nheap or pile\nplain line\n");
        assert!(!text.contains("++++"));
        assert!(!text.contains('\u{1b}'));
    }

    #[tokio::test]
    async fn lookup_explicit_endpoint() {
        let (status, _) = get("/dict?word=bing&endpoint=youdao").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn lookup_not_found() {
        let (status, text) = get("/dict?word=qwxz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(text.contains("qwxz"));
    }

    #[tokio::test]
    async fn lookup_bad_requests() {
        assert_eq!(get("/dict").await.0, StatusCode::BAD_REQUEST);
        assert_eq!(get("/dict?word=%20%20").await.0, StatusCode::BAD_REQUEST);
        assert_eq!(
            get("/dict?word=bing&endpoint=bing").await.0,
            StatusCode::BAD_REQUEST
        );
        // Known identifier but not registered in this router
        assert_eq!(
            get("/dict?word=bing&endpoint=ecdict").await.0,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn lookup_provider_failure() {
        let (status, text) = get("/dict?word=boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text.contains("upstream exploded"));
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        assert_eq!(get("/other?word=bing").await.0, StatusCode::NOT_FOUND);
    }
}
