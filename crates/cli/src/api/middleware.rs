//! Authentication and metrics middleware for the admin API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use xseed_core::{AuthRequest, Identity};

use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Tracks HTTP request duration, count, and in-flight gauge for every
/// admin API request.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION.with_label_values(&[&method, &path, &status]).observe(duration);
    HTTP_REQUESTS_TOTAL.with_label_values(&[&method, &path, &status]).inc();

    response
}

/// Validates requests against `AppState`'s configured authenticator,
/// inserting the resolved [`Identity`] into request extensions on success.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authenticator = state.authenticator();

    if authenticator.method_name() == "none" {
        let mut request = request;
        request.extensions_mut().insert(Identity::anonymous());
        return Ok(next.run(request).await);
    }

    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    let source_ip = request
        .extensions()
        .get::<std::net::SocketAddr>()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));

    let auth_request = AuthRequest { headers, source_ip };

    match authenticator.authenticate(&auth_request).await {
        Ok(identity) => {
            let mut request = request;
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(xseed_core::AuthError::NotAuthenticated) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["not_authenticated"]).inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(xseed_core::AuthError::InvalidCredentials(_)) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["invalid_credentials"]).inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(_) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["internal_error"]).inc();
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Extracts the authenticated user id from request extensions, falling
/// back to "anonymous" if auth middleware didn't run.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let user_id = parts
            .extensions
            .get::<Identity>()
            .map(|id| id.user_id.clone())
            .unwrap_or_else(|| "anonymous".to_string());
        std::future::ready(Ok(AuthUser(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request},
        middleware,
        routing::get,
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;
    use xseed_core::{
        ApiKeyAuthenticator, Authenticator, Config, Database, NoneAuthenticator, RssCursorStore,
        Scheduler, SettingsStore, SqliteDecisionStore, SqliteIndexerStore, StubClient,
        TorznabClient,
    };

    use crate::state::AppState;

    async fn dummy_handler() -> &'static str {
        "OK"
    }

    fn test_state(authenticator: Arc<dyn Authenticator>) -> Arc<AppState> {
        let db = Database::open_in_memory().unwrap();
        Arc::new(AppState::new(
            Config::default(),
            authenticator,
            db.clone(),
            SettingsStore::new(db.clone()),
            Arc::new(SqliteIndexerStore::new(db.clone())),
            Arc::new(SqliteDecisionStore::new(db.clone())),
            Arc::new(RssCursorStore::new(db)),
            Arc::new(TorznabClient::new(
                std::time::Duration::from_secs(30),
                std::time::Duration::from_secs(30),
            )),
            Arc::new(StubClient::new()),
            None,
            Arc::new(Scheduler::new(
                std::time::Duration::from_secs(86_400),
                std::time::Duration::from_secs(600),
            )),
        ))
    }

    #[tokio::test]
    async fn none_auth_allows_all() {
        let state = test_state(Arc::new(NoneAuthenticator::new()));

        let app = Router::new()
            .route("/test", get(dummy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_key_auth_valid() {
        let state = test_state(Arc::new(ApiKeyAuthenticator::new("secret-key".to_string())));

        let app = Router::new()
            .route("/test", get(dummy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer secret-key")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_key_auth_invalid() {
        let state = test_state(Arc::new(ApiKeyAuthenticator::new("secret-key".to_string())));

        let app = Router::new()
            .route("/test", get(dummy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer wrong-key")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_key_auth_missing() {
        let state = test_state(Arc::new(ApiKeyAuthenticator::new("secret-key".to_string())));

        let app = Router::new()
            .route("/test", get(dummy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_user_extractor_reads_identity() {
        async fn user_handler(AuthUser(user_id): AuthUser) -> String {
            user_id
        }

        let state = test_state(Arc::new(NoneAuthenticator::new()));

        let app = Router::new()
            .route("/test", get(user_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
