use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::Instrument;

use crate::auth::{AuthGate, FileSession};
use crate::config::DashboardConfig;
use crate::format::PLACEHOLDER;
use crate::gate::ensure_unlocked;
use crate::output::config::{OutputConfig, OutputFormat};
use crate::output::types::Meta;
use crate::output::Emitter;
use crate::snapshot::{self, SnapshotSource};
use crate::telemetry::{self};
use crate::telemetry::ops::render::Phase as RenderPhase;
use crate::view::{RenderContext, RenderOutcome};

/// `opsdash render`
#[derive(Args, Debug)]
pub struct RenderCmd {
    /// Snapshot file path or http(s) URL (overrides OPSDASH_DATA_URL)
    #[arg(long)]
    source: Option<String>,
    /// Password to submit when the session is locked; prompts on stdin when omitted
    #[arg(long)]
    password: Option<String>,
    /// Write the output to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

pub async fn run(config: &DashboardConfig, args: RenderCmd) -> Result<()> {
    let log = telemetry::render();
    let config = config.clone().with_source(args.source);
    let root = log.root_span_kv([
        ("source", config.source.clone()),
        ("out", format!("{:?}", args.out)),
        ("json", telemetry::config::json_mode().to_string()),
    ]);
    let _g = root.enter();

    // nothing is loaded until the gate is open
    {
        let _s = log.span(&RenderPhase::Gate).entered();
        let mut gate = AuthGate::new(&config, FileSession::new(&config.session_file));
        ensure_unlocked(&mut gate, args.password, &log)?;
    }

    let started = Instant::now();
    let source = SnapshotSource::parse(&config.source);
    let client = snapshot::build_client(config.fetch_timeout).context("build http client")?;
    let loaded = snapshot::load(&client, &source)
        .instrument(log.span_kv(&RenderPhase::Load, [("source", source.to_string())]))
        .await;
    if let Err(err) = &loaded {
        let kind = if err.is_parse() { "parse" } else { "load" };
        log.error_kv("snapshot load failed", [("kind", kind.to_string()), ("error", err.to_string())]);
    }

    let outcome = {
        let _s = log.span(&RenderPhase::Derive).entered();
        RenderOutcome::from_load(loaded, &config, &RenderContext::current())
    };
    if let RenderOutcome::Ready(view) = &outcome {
        let unavailable = view.cards.iter().filter(|c| c.value == PLACEHOLDER).count();
        log.summary(view.cards.len(), unavailable, view.tasks.len(), view.stale_banner.is_some());
        if view.stale_banner.is_some() {
            log.warn("snapshot is older than the freshness threshold");
        }
    }

    {
        let _s = log.span(&RenderPhase::Present).entered();
        let emitter = Emitter::from_config(OutputConfig::resolve(args.format, telemetry::config::json_mode()));
        let meta = Meta { duration_ms: Some(started.elapsed().as_millis()), source: Some(source.to_string()) };
        match &args.out {
            Some(path) => {
                let mut file = std::fs::File::create(path)
                    .with_context(|| format!("create {}", path.display()))?;
                emitter.emit_to(&outcome, Some(meta), &mut file)?;
                log.info(format!("📝 Wrote {}", path.display()));
            }
            None => emitter.emit(&outcome, Some(meta))?,
        }
    }

    if let RenderOutcome::Failed(err) = &outcome {
        bail!("{}", err.message);
    }
    Ok(())
}
