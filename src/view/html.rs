//! Writes a render outcome onto a static HTML page. Every piece of snapshot text
//! passes through `escape_html` before it lands in markup.

use std::fmt::Write as _;

use super::{DashboardView, ErrorView, RenderOutcome};

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn render_page(outcome: &RenderOutcome) -> String {
    let mut body = String::new();
    match outcome {
        RenderOutcome::Ready(view) => render_dashboard(&mut body, view),
        RenderOutcome::Failed(err) => render_error(&mut body, err),
    }
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Operations Dashboard</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

fn render_error(out: &mut String, err: &ErrorView) {
    let _ = writeln!(
        out,
        "<main class=\"kpi-grid\"><div class=\"kpi-error\" role=\"alert\">Error: {}</div></main>",
        escape_html(&err.message)
    );
}

fn render_dashboard(out: &mut String, view: &DashboardView) {
    let h = &view.header;
    let _ = writeln!(out, "<header>");
    if let Some(term) = &h.term {
        let _ = writeln!(out, "<span id=\"term-badge\">{}</span>", escape_html(term));
    }
    let _ = writeln!(out, "<span id=\"last-updated\">{}</span>", escape_html(&h.updated));
    let _ = writeln!(out, "<span id=\"dsp-sync\">{}</span>", escape_html(&h.dsp_sync));
    let _ = writeln!(out, "</header>");

    if let Some(banner) = &view.stale_banner {
        let _ = writeln!(
            out,
            "<div id=\"stale-banner\" role=\"status\">Data may be out of date. \
             Last generated <span id=\"stale-time\">{}</span>.</div>",
            escape_html(&banner.generated)
        );
    }

    let _ = writeln!(out, "<main class=\"kpi-grid\">");
    for card in &view.cards {
        let _ = write!(
            out,
            "<div class=\"kpi-card\" id=\"{}\"><h3>{}</h3><p class=\"kpi-value\">{}</p>",
            escape_html(&card.id.replace('_', "-")),
            escape_html(card.label),
            escape_html(&card.value)
        );
        if let Some(detail) = &card.detail {
            let _ = write!(out, "<p class=\"kpi-detail\">{}</p>", escape_html(detail));
        }
        let _ = writeln!(out, "</div>");
    }
    let _ = writeln!(out, "</main>");

    let _ = writeln!(
        out,
        "<table id=\"breakdown\"><thead><tr><th>Metric</th><th>Value</th><th>Source</th></tr></thead>\
         <tbody id=\"breakdown-body\">"
    );
    for row in &view.breakdown {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td class=\"value-cell\">{}</td><td>{}</td></tr>",
            escape_html(&row.metric),
            escape_html(&row.value),
            escape_html(&row.source)
        );
    }
    let _ = writeln!(out, "</tbody></table>");

    // the chart widget reads its series from the data attribute
    let series = serde_json::to_string(&view.chart).unwrap_or_else(|_| "{}".to_string());
    let _ = writeln!(out, "<canvas id=\"metrics-chart\" data-series=\"{}\"></canvas>", escape_html(&series));

    let _ = writeln!(out, "<ul id=\"task-list\">");
    for task in &view.tasks {
        let class = if task.overdue { "task overdue" } else { "task" };
        let _ = write!(
            out,
            "<li class=\"{} status-{}\"><span class=\"task-text\">{}</span>",
            class,
            escape_html(&task.status),
            escape_html(&task.text)
        );
        if let Some(due) = &task.due {
            let _ = write!(out, " <span class=\"task-due\">Due {}</span>", escape_html(due));
        }
        if task.overdue {
            let _ = write!(out, " <span class=\"task-overdue\">Overdue</span>");
        }
        let _ = writeln!(out, "</li>");
    }
    let _ = writeln!(out, "</ul>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::view::{build_view, RenderContext};
    use chrono::{FixedOffset, TimeZone, Utc};
    use serde_json::json;

    fn ctx() -> RenderContext {
        RenderContext::fixed(
            Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn task_text_is_never_live_markup() {
        let snapshot = serde_json::from_value(json!({
            "generated_at": "2026-10-19T06:30:00Z",
            "tasks": [{"text": "<script>alert(1)</script>", "status": "pending<img>"}]
        }))
        .unwrap();
        let page = render_page(&RenderOutcome::Ready(build_view(&snapshot, &DashboardConfig::default(), &ctx())));
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!page.contains("<img>"));
    }

    #[test]
    fn stale_banner_only_when_stale() {
        let fresh = serde_json::from_value(json!({"generated_at": "2026-10-19T06:30:00Z"})).unwrap();
        let page = render_page(&RenderOutcome::Ready(build_view(&fresh, &DashboardConfig::default(), &ctx())));
        assert!(!page.contains("stale-banner"));

        let stale = serde_json::from_value(json!({"generated_at": "2026-10-01T06:30:00Z"})).unwrap();
        let page = render_page(&RenderOutcome::Ready(build_view(&stale, &DashboardConfig::default(), &ctx())));
        assert!(page.contains("<span id=\"stale-time\">1 Oct 2026 at 06:30</span>"));
    }

    #[test]
    fn failure_page_has_only_the_error_indicator() {
        let page = render_page(&RenderOutcome::Failed(ErrorView { message: "Failed to load data (500)".into() }));
        assert!(page.contains("Error: Failed to load data (500)"));
        assert!(!page.contains("kpi-card"));
        assert!(!page.contains("breakdown"));
        assert!(!page.contains("task-list"));
    }
}
