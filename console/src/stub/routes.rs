use crate::api::{CONFIG_PATH, LOGOUT_PATH, ME_PATH, MeResponse, ServerConfig, User};
use crate::session::SESSION_TIMEOUT_HEADER;
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Response, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use tokio::task::JoinHandle;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared state of the stub controller
#[derive(Clone)]
pub struct StubState {
    inner: Arc<StubInner>,
}

struct StubInner {
    logged_in: AtomicBool,
    session_timeout: AtomicU64,
    /// Non-zero forces the config endpoint to fail with this status
    config_failure: AtomicU16,
    requests: AtomicU64,
    config: ServerConfig,
    user: User,
}

impl StubState {
    pub fn new(session_timeout: u64) -> Self {
        Self {
            inner: Arc::new(StubInner {
                logged_in: AtomicBool::new(true),
                session_timeout: AtomicU64::new(session_timeout),
                config_failure: AtomicU16::new(0),
                requests: AtomicU64::new(0),
                config: ServerConfig {
                    version: Some(env!("CARGO_PKG_VERSION").to_string()),
                    ansible_version: Some("2.9.10".to_string()),
                    ..Default::default()
                },
                user: User {
                    id: 1,
                    username: "admin".to_string(),
                    is_superuser: true,
                    ..Default::default()
                },
            }),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.logged_in.load(Ordering::SeqCst)
    }

    pub fn log_in(&self) {
        self.inner.logged_in.store(true, Ordering::SeqCst);
    }

    pub fn log_out(&self) {
        self.inner.logged_in.store(false, Ordering::SeqCst);
    }

    pub fn session_timeout(&self) -> u64 {
        self.inner.session_timeout.load(Ordering::SeqCst)
    }

    pub fn set_session_timeout(&self, secs: u64) {
        self.inner.session_timeout.store(secs, Ordering::SeqCst);
    }

    /// Make the config endpoint answer with `status`; `None` restores it
    pub fn fail_config_with(&self, status: Option<StatusCode>) {
        let code = status.map(|s| s.as_u16()).unwrap_or(0);
        self.inner.config_failure.store(code, Ordering::SeqCst);
    }

    /// Requests served so far
    pub fn requests(&self) -> u64 {
        self.inner.requests.load(Ordering::SeqCst)
    }

    fn record_request(&self) {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
    }
}

fn unauthorized() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Authentication credentials were not provided." })),
    )
        .into_response()
}

async fn read_config(State(state): State<StubState>) -> axum::response::Response {
    state.record_request();
    if !state.is_logged_in() {
        return unauthorized();
    }

    let failure = state.inner.config_failure.load(Ordering::SeqCst);
    if failure != 0 {
        let status = StatusCode::from_u16(failure).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(json!({ "detail": "Configuration unavailable" }))).into_response();
    }

    Json(state.inner.config.clone()).into_response()
}

async fn read_me(State(state): State<StubState>) -> axum::response::Response {
    state.record_request();
    if !state.is_logged_in() {
        return unauthorized();
    }

    Json(MeResponse {
        count: 1,
        results: vec![state.inner.user.clone()],
    })
    .into_response()
}

async fn logout(State(state): State<StubState>) -> StatusCode {
    state.record_request();
    state.log_out();
    info!("Stub controller session logged out");
    StatusCode::OK
}

/// Build the stub controller router
pub fn stub_routes(state: StubState) -> Router {
    let header_state = state.clone();
    let stamp_timeout = SetResponseHeaderLayer::overriding(
        HeaderName::from_static(SESSION_TIMEOUT_HEADER),
        move |response: &Response<Body>| {
            if response.status() == StatusCode::UNAUTHORIZED || !header_state.is_logged_in() {
                return None;
            }
            Some(HeaderValue::from(header_state.session_timeout()))
        },
    );

    Router::new()
        .route(CONFIG_PATH, get(read_config))
        .route(ME_PATH, get(read_me))
        .route(LOGOUT_PATH, get(logout))
        .with_state(state)
        .layer(stamp_timeout)
        .layer(TraceLayer::new_for_http())
}

/// Bind the stub controller and serve it in the background
pub async fn serve(
    addr: SocketAddr,
    state: StubState,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("Stub controller listening on {}", local_addr);

    let app = stub_routes(state);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Stub controller stopped: {}", e);
        }
    });

    Ok((local_addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tower::util::ServiceExt;

    async fn get_path(app: Router, path: &str) -> Response<Body> {
        app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_authenticated_responses_carry_timeout() {
        let state = StubState::new(1800);
        let response = get_path(stub_routes(state.clone()), ME_PATH).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(SESSION_TIMEOUT_HEADER).unwrap(),
            "1800"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let me: MeResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(me.results[0].username, "admin");
        assert_eq!(state.requests(), 1);
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let state = StubState::new(1800);

        let response = get_path(stub_routes(state.clone()), LOGOUT_PATH).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SESSION_TIMEOUT_HEADER).is_none());
        assert!(!state.is_logged_in());

        let response = get_path(stub_routes(state.clone()), CONFIG_PATH).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(SESSION_TIMEOUT_HEADER).is_none());

        state.log_in();
        let response = get_path(stub_routes(state), CONFIG_PATH).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_config_failure_injection() {
        let state = StubState::new(60);
        state.fail_config_with(Some(StatusCode::SERVICE_UNAVAILABLE));

        let response = get_path(stub_routes(state.clone()), CONFIG_PATH).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.fail_config_with(None);
        let response = get_path(stub_routes(state), CONFIG_PATH).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
