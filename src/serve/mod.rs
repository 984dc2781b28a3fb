use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Args;
use reqwest::Client;
use tracing::Instrument;

use crate::config::DashboardConfig;
use crate::snapshot::{self, SnapshotSource};
use crate::telemetry;
use crate::telemetry::ops::serve::Phase as ServePhase;
use crate::view::html::render_page;
use crate::view::{RenderContext, RenderOutcome};

pub mod edge;

use edge::EdgeGate;

/// `opsdash serve`
#[derive(Args, Debug)]
pub struct ServeCmd {
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,
    /// Snapshot file path or http(s) URL (overrides OPSDASH_DATA_URL)
    #[arg(long)]
    source: Option<String>,
}

#[derive(Clone)]
struct AppState {
    config: Arc<DashboardConfig>,
    client: Client,
    source: Arc<SnapshotSource>,
}

/// Every route, including the raw snapshot, sits behind the edge gate.
pub fn router(config: DashboardConfig, client: Client) -> Router {
    let gate = Arc::new(EdgeGate::from_config(&config));
    let state = AppState {
        source: Arc::new(SnapshotSource::parse(&config.source)),
        config: Arc::new(config),
        client,
    };
    Router::new()
        .route("/", get(dashboard_page))
        .route("/api/view", get(dashboard_view))
        .route("/operations-data.json", get(raw_snapshot))
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }))
        .layer(from_fn_with_state(gate, edge::require_credentials))
        .with_state(state)
}

async fn current_outcome(state: &AppState) -> RenderOutcome {
    let loaded = snapshot::load(&state.client, &state.source).await;
    if let Err(err) = &loaded {
        telemetry::serve().error_kv("snapshot load failed", [("error", err.to_string())]);
    }
    RenderOutcome::from_load(loaded, &state.config, &RenderContext::current())
}

async fn dashboard_page(State(state): State<AppState>) -> Html<String> {
    Html(render_page(&current_outcome(&state).await))
}

async fn dashboard_view(State(state): State<AppState>) -> Json<RenderOutcome> {
    Json(current_outcome(&state).await)
}

async fn raw_snapshot(State(state): State<AppState>) -> Response {
    match snapshot::fetch_bytes(&state.client, &state.source).await {
        Ok(bytes) => ([(CONTENT_TYPE, "application/json")], bytes).into_response(),
        Err(err) => {
            telemetry::serve().error_kv("snapshot fetch failed", [("error", err.to_string())]);
            (StatusCode::BAD_GATEWAY, err.user_message()).into_response()
        }
    }
}

pub async fn run(config: &DashboardConfig, args: ServeCmd) -> Result<()> {
    let log = telemetry::serve();
    let config = config.clone().with_source(args.source);
    let root = log.root_span_kv([("bind", args.bind.clone()), ("source", config.source.clone())]);

    if !EdgeGate::from_config(&config).is_configured() {
        log.warn("OPS_DASHBOARD_PASSWORD is not set; every request will be refused");
    }
    let client = snapshot::build_client(config.fetch_timeout).context("build http client")?;
    let app = router(config, client);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .instrument(log.span_kv(&ServePhase::Bind, [("addr", args.bind.clone())]))
        .await
        .with_context(|| format!("bind {}", args.bind))?;
    let addr = listener.local_addr().context("read bound address")?;
    log.info(format!("🌐 Serving dashboard on http://{addr}"));

    axum::serve(listener, app)
        .into_future()
        .instrument(root)
        .await
        .context("server exited")?;
    Ok(())
}
