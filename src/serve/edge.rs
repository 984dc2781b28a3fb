//! Basic-auth filter in front of every served route. This is the real access
//! boundary: the secret lives only on the server.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info, Instrument};

use crate::config::DashboardConfig;
use crate::telemetry;
use crate::telemetry::ops::serve::Phase as ServePhase;

const EXEMPT_PATHS: [&str; 1] = ["/favicon.ico"];

#[derive(Debug, Clone)]
pub struct EdgeGate {
    secret: Option<String>,
    realm: String,
}

impl EdgeGate {
    /// An empty secret counts as unset.
    pub fn new(secret: Option<String>, realm: impl Into<String>) -> Self {
        Self { secret: secret.filter(|s| !s.is_empty()), realm: realm.into() }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.edge_password.clone(), config.realm.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Checks the password half of `Basic <base64(user:password)>`; the user
    /// name is ignored.
    pub fn admits(&self, authorization: Option<&str>) -> bool {
        let (Some(secret), Some(header)) = (self.secret.as_deref(), authorization) else {
            return false;
        };
        let encoded = header.split(' ').nth(1).unwrap_or("");
        let Ok(decoded) = STANDARD.decode(encoded) else {
            return false;
        };
        let decoded = String::from_utf8_lossy(&decoded);
        let password = decoded.split(':').skip(1).collect::<Vec<_>>().join(":");
        password == secret
    }

    pub fn challenge(&self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(WWW_AUTHENTICATE, format!("Basic realm=\"{}\"", quote_realm(&self.realm)))],
            "Authentication required",
        )
            .into_response()
    }
}

/// Escapes the realm for a quoted-string; control characters are dropped.
fn quote_realm(realm: &str) -> String {
    let mut out = String::with_capacity(realm.len());
    for ch in realm.chars().filter(|c| !c.is_control()) {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path)
}

pub async fn require_credentials(State(gate): State<Arc<EdgeGate>>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = telemetry::serve().span(&ServePhase::Request);

    async move {
        if !is_exempt(&path) {
            let header = request.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
            if !gate.admits(header) {
                debug!(method = %method, path = %path, "credentials missing or wrong");
                return gate.challenge();
            }
        }
        // passed through untouched
        let response = next.run(request).await;
        info!(method = %method, path = %path, status = response.status().as_u16(), "request");
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
    }

    #[test]
    fn admits_matching_password_any_user() {
        let gate = EdgeGate::new(Some("s3cret".into()), "Ops");
        assert!(gate.admits(Some(&basic("ops", "s3cret"))));
        assert!(gate.admits(Some(&basic("", "s3cret"))));
        assert!(!gate.admits(Some(&basic("ops", "wrong"))));
        assert!(!gate.admits(None));
        assert!(!gate.admits(Some("Basic !!notbase64!!")));
        assert!(!gate.admits(Some("Basic")));
    }

    #[test]
    fn password_may_contain_colons() {
        let gate = EdgeGate::new(Some("a:b:c".into()), "Ops");
        assert!(gate.admits(Some(&basic("ops", "a:b:c"))));
    }

    #[test]
    fn unset_or_empty_secret_rejects_everything() {
        for gate in [EdgeGate::new(None, "Ops"), EdgeGate::new(Some(String::new()), "Ops")] {
            assert!(!gate.is_configured());
            assert!(!gate.admits(Some(&basic("ops", ""))));
            assert!(!gate.admits(Some("Basic b3Bz")));
        }
    }

    #[test]
    fn realm_is_quoted_safely() {
        assert_eq!(quote_realm("Ops"), "Ops");
        assert_eq!(quote_realm("Ops \"North\""), "Ops \\\"North\\\"");
        assert_eq!(quote_realm("a\\b\r\nc"), "a\\\\bc");
    }

    #[tokio::test]
    async fn challenge_survives_quotes_in_realm() {
        let base = spawn(EdgeGate::new(Some("s3cret".into()), "Ops \"North\"")).await;
        let res = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(res.status().as_u16(), 401);
        assert_eq!(
            res.headers().get("www-authenticate").unwrap().to_str().unwrap(),
            "Basic realm=\"Ops \\\"North\\\"\""
        );
    }

    async fn spawn(gate: EdgeGate) -> String {
        let app = Router::new()
            .route("/", get(|| async { "inner" }))
            .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
            .layer(from_fn_with_state(Arc::new(gate), require_credentials));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn rejects_with_realm_challenge() {
        let base = spawn(EdgeGate::new(Some("s3cret".into()), "Ops Realm")).await;
        let client = reqwest::Client::new();

        let res = client.get(format!("{base}/")).send().await.unwrap();
        assert_eq!(res.status().as_u16(), 401);
        assert_eq!(
            res.headers().get("www-authenticate").unwrap().to_str().unwrap(),
            "Basic realm=\"Ops Realm\""
        );
        assert_eq!(res.text().await.unwrap(), "Authentication required");

        let res = client.get(format!("{base}/")).basic_auth("ops", Some("nope")).send().await.unwrap();
        assert_eq!(res.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn passes_matching_requests_through() {
        let base = spawn(EdgeGate::new(Some("s3cret".into()), "Ops")).await;
        let res = reqwest::Client::new()
            .get(format!("{base}/"))
            .basic_auth("anyone", Some("s3cret"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.text().await.unwrap(), "inner");
    }

    #[tokio::test]
    async fn favicon_skips_the_gate() {
        let base = spawn(EdgeGate::new(Some("s3cret".into()), "Ops")).await;
        let res = reqwest::get(format!("{base}/favicon.ico")).await.unwrap();
        assert_eq!(res.status().as_u16(), 204);
    }
}
