//! Snapshot -> display records. Nothing here touches a display surface; `html`
//! and the output presenters consume the records built here.

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::derive::{derive, Delta, DerivedMetrics};
use crate::format::{
    format_long_date, format_optional, format_percent, format_short_date, format_signed_delta,
    format_signed_percent, PLACEHOLDER,
};
use crate::snapshot::{
    Metrics, MetricsSnapshot, SnapshotError, ACTIVE_STUDENTS, CHILDREN_ENROLLED, CLASSES_RUNNING,
    LEADS_WON_30D, LEADS_WON_7D, LF_MEMBERS, LF_TRIALS,
};
use crate::staleness::is_stale;
use crate::tasks::{task_rows, TaskRow};

pub mod html;

const PREV_TERM_FALLBACK: &str = "previous term";

/// Wall clock and zone a render pass is evaluated against.
#[derive(Clone, Debug)]
pub struct RenderContext {
    pub now: DateTime<Utc>,
    pub today: String,
    offset: Option<FixedOffset>,
}

impl RenderContext {
    pub fn current() -> Self {
        let now = Utc::now();
        let today = now.with_timezone(&Local).format("%Y-%m-%d").to_string();
        Self { now, today, offset: None }
    }

    /// Pinned clock and zone, for reproducible output.
    #[cfg(test)]
    pub fn fixed(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let today = now.with_timezone(&offset).format("%Y-%m-%d").to_string();
        Self { now, today, offset: Some(offset) }
    }

    fn stamp(&self, dt: DateTime<Utc>) -> String {
        match self.offset {
            Some(offset) => format_long_date(&dt.with_timezone(&offset)),
            None => format_long_date(&dt.with_timezone(&Local)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    Ready(DashboardView),
    Failed(ErrorView),
}

impl RenderOutcome {
    /// Load failures replace the whole dashboard with one error indicator.
    pub fn from_load(
        loaded: Result<MetricsSnapshot, SnapshotError>,
        config: &DashboardConfig,
        ctx: &RenderContext,
    ) -> Self {
        match loaded {
            Ok(snapshot) => RenderOutcome::Ready(build_view(&snapshot, config, ctx)),
            Err(err) => RenderOutcome::Failed(ErrorView { message: err.user_message() }),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, RenderOutcome::Ready(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorView {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub header: Header,
    pub stale_banner: Option<StaleBanner>,
    pub cards: Vec<KpiCard>,
    pub breakdown: Vec<BreakdownRow>,
    pub chart: ChartData,
    pub tasks: Vec<TaskRow>,
}

#[cfg(test)]
impl DashboardView {
    pub fn card(&self, id: &str) -> Option<&KpiCard> {
        self.cards.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Header {
    pub updated: String,
    pub dsp_sync: String,
    pub term: Option<String>,
    pub prev_term: Option<String>,
}

/// Shown while the snapshot is older than the threshold; carries the generation time.
#[derive(Debug, Clone, Serialize)]
pub struct StaleBanner {
    pub generated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KpiCard {
    pub id: &'static str,
    pub label: &'static str,
    pub value: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakdownRow {
    pub metric: String,
    pub value: String,
    pub source: String,
}

/// Input for the chart widget: labels plus one series per dataset.
#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub labels: Vec<&'static str>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: &'static str,
    pub data: Vec<Option<f64>>,
    pub background_color: Vec<&'static str>,
}

pub fn build_view(snapshot: &MetricsSnapshot, config: &DashboardConfig, ctx: &RenderContext) -> DashboardView {
    let derived = derive(&snapshot.metrics);
    let generated_at = snapshot.generated_at();
    let stamp = generated_at.map(|t| ctx.stamp(t)).unwrap_or_else(|| PLACEHOLDER.to_string());
    let prev_label = snapshot
        .meta
        .prev_term
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(PREV_TERM_FALLBACK);

    DashboardView {
        header: Header {
            updated: format!("Updated: {stamp}"),
            dsp_sync: format!("DSP sync: {}", format_short_date(snapshot.meta.dsp_last_sync.as_deref())),
            term: snapshot.meta.term.clone().filter(|s| !s.is_empty()),
            prev_term: snapshot.meta.prev_term.clone().filter(|s| !s.is_empty()),
        },
        stale_banner: is_stale(generated_at, ctx.now, config.stale_threshold)
            .then(|| StaleBanner { generated: stamp.clone() }),
        cards: cards(&snapshot.metrics, &derived, prev_label),
        breakdown: breakdown(snapshot, &derived, prev_label),
        chart: chart(&snapshot.metrics),
        tasks: task_rows(&snapshot.tasks, &ctx.today),
    }
}

fn cards(metrics: &Metrics, derived: &DerivedMetrics, prev_label: &str) -> Vec<KpiCard> {
    let raw = |id: &'static str, label: &'static str| KpiCard {
        id,
        label,
        value: format_optional(metrics.number(id)),
        detail: None,
    };
    vec![
        raw(LEADS_WON_7D, "Leads Won (7 days)"),
        raw(LEADS_WON_30D, "Leads Won (30 days)"),
        KpiCard {
            detail: Some(format!(
                "{} vs term start \u{b7} {} vs {} end",
                delta_count(derived.enrolled_vs_term_start),
                delta_count(derived.enrolled_vs_prev_term_end),
                prev_label
            )),
            ..raw(CHILDREN_ENROLLED, "Children Enrolled")
        },
        raw(CLASSES_RUNNING, "Classes Running"),
        raw(LF_MEMBERS, "LF Active Members"),
        raw(LF_TRIALS, "LF Active Trials"),
        KpiCard {
            id: "trial_conversion",
            label: "LF Trial Conversion",
            value: optional_percent(derived.trial_conversion),
            detail: None,
        },
        KpiCard {
            detail: Some(format!("{} vs {}", describe_delta(derived.term_delta), prev_label)),
            ..raw(ACTIVE_STUDENTS, "Active Students")
        },
        KpiCard {
            id: "retention",
            label: "Retention",
            value: optional_percent(derived.retention),
            detail: Some(format!("returning from {prev_label}")),
        },
        KpiCard {
            id: "churn",
            label: "Churned Students",
            value: format_optional(derived.churn),
            detail: None,
        },
    ]
}

fn breakdown(snapshot: &MetricsSnapshot, derived: &DerivedMetrics, prev_label: &str) -> Vec<BreakdownRow> {
    let metrics = &snapshot.metrics;
    let row = |metric: &str, value: String, source: &str| BreakdownRow {
        metric: metric.to_string(),
        value,
        source: source.to_string(),
    };
    let synced = format_short_date(snapshot.meta.dsp_last_sync.as_deref());
    vec![
        row("Leads Won (7 days)", format_optional(metrics.number(LEADS_WON_7D)), "GHL Pipeline 1"),
        row("Leads Won (30 days)", format_optional(metrics.number(LEADS_WON_30D)), "GHL Pipeline 1"),
        row(
            "Children Enrolled",
            format_optional(metrics.number(CHILDREN_ENROLLED)),
            &format!("DSP via Airtable (synced {synced})"),
        ),
        row("Enrolment vs Term Start", delta_count(derived.enrolled_vs_term_start), "Calculated: enrolled - term start"),
        row(
            &format!("Enrolment vs {prev_label} End"),
            delta_count(derived.enrolled_vs_prev_term_end),
            "Calculated: enrolled - previous term end",
        ),
        row("Classes Running", format_optional(metrics.number(CLASSES_RUNNING)), "DSP via Airtable"),
        row("LF Active Members", format_optional(metrics.number(LF_MEMBERS)), "Airtable CONTACTS"),
        row("LF Active Trials", format_optional(metrics.number(LF_TRIALS)), "Airtable CONTACTS"),
        row(
            "LF Trial Conversion",
            optional_percent(derived.trial_conversion),
            "Calculated: members / (members + trials)",
        ),
        row("Active Students", format_optional(metrics.number(ACTIVE_STUDENTS)), "DSP via Airtable"),
        row(
            &format!("Change vs {prev_label}"),
            describe_delta(derived.term_delta),
            "Calculated: current - previous term",
        ),
        row("Retention", optional_percent(derived.retention), "Calculated: returning / previous term"),
        row("Churned Students", format_optional(derived.churn), "Calculated: previous term - returning"),
    ]
}

fn chart(metrics: &Metrics) -> ChartData {
    ChartData {
        labels: vec!["Leads (7d)", "Leads (30d)", "Children", "Classes", "LF Members", "LF Trials"],
        datasets: vec![ChartDataset {
            label: "Current Count",
            data: [LEADS_WON_7D, LEADS_WON_30D, CHILDREN_ENROLLED, CLASSES_RUNNING, LF_MEMBERS, LF_TRIALS]
                .iter()
                .map(|name| metrics.number(name))
                .collect(),
            background_color: vec!["#3b82f6", "#60a5fa", "#8b5cf6", "#a78bfa", "#10b981", "#34d399"],
        }],
    }
}

fn optional_percent(v: Option<f64>) -> String {
    v.map(format_percent).unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn delta_count(delta: Option<Delta>) -> String {
    delta.map(|d| format_signed_delta(d.absolute)).unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// `+10 (+11%)`, or just the count when the baseline was zero.
fn describe_delta(delta: Option<Delta>) -> String {
    match delta {
        Some(Delta { absolute, ratio: Some(ratio), .. }) => {
            format!("{} ({})", format_signed_delta(absolute), format_signed_percent(ratio))
        }
        Some(Delta { absolute, ratio: None, .. }) => format_signed_delta(absolute),
        None => PLACEHOLDER.to_string(),
    }
}
