use std::io::{self, Write};

use crate::format::PLACEHOLDER;
use crate::view::html::render_page;
use crate::view::{DashboardView, RenderOutcome};

use super::config::{OutputConfig, OutputFormat};
use super::types::{Envelope, Meta};

pub trait Presenter: Send + Sync {
    fn emit(&self, outcome: &RenderOutcome, meta: Option<Meta>, w: &mut dyn Write) -> io::Result<()>;
}

pub struct JsonPresenter { pub pretty: bool }
impl Presenter for JsonPresenter {
    fn emit(&self, outcome: &RenderOutcome, meta: Option<Meta>, w: &mut dyn Write) -> io::Result<()> {
        let env = Envelope::result("render", outcome.is_ready(), outcome, meta).map_err(to_io)?;
        if self.pretty { serde_json::to_writer_pretty(&mut *w, &env).map_err(to_io)? } else { serde_json::to_writer(&mut *w, &env).map_err(to_io)? }
        writeln!(w)
    }
}

pub struct TextPresenter;
impl Presenter for TextPresenter {
    fn emit(&self, outcome: &RenderOutcome, _meta: Option<Meta>, w: &mut dyn Write) -> io::Result<()> {
        match outcome {
            RenderOutcome::Failed(err) => writeln!(w, "Error: {}", err.message),
            RenderOutcome::Ready(view) => write_text(view, w),
        }
    }
}

pub struct HtmlPresenter;
impl Presenter for HtmlPresenter {
    fn emit(&self, outcome: &RenderOutcome, _meta: Option<Meta>, w: &mut dyn Write) -> io::Result<()> {
        w.write_all(render_page(outcome).as_bytes())
    }
}

fn write_text(view: &DashboardView, w: &mut dyn Write) -> io::Result<()> {
    let h = &view.header;
    match &h.term {
        Some(term) => writeln!(w, "[{}]  {}  |  {}", term, h.updated, h.dsp_sync)?,
        None => writeln!(w, "{}  |  {}", h.updated, h.dsp_sync)?,
    }
    if let Some(banner) = &view.stale_banner {
        writeln!(w, "!! Data may be out of date. Last generated {}", banner.generated)?;
    }
    writeln!(w)?;
    for card in &view.cards {
        match &card.detail {
            Some(detail) => writeln!(w, "{:<22} {:>8}   {}", card.label, card.value, detail)?,
            None => writeln!(w, "{:<22} {:>8}", card.label, card.value)?,
        }
    }
    writeln!(w)?;
    writeln!(w, "Breakdown")?;
    for row in &view.breakdown {
        writeln!(w, "  {:<32} {:>12}  {}", row.metric, row.value, row.source)?;
    }
    if let Some(series) = view.chart.datasets.first() {
        writeln!(w)?;
        writeln!(w, "{}", series.label)?;
        for (label, value) in view.chart.labels.iter().zip(&series.data) {
            let shown = value.map(|v| v.to_string()).unwrap_or_else(|| PLACEHOLDER.to_string());
            writeln!(w, "  {:<12} {}", label, shown)?;
        }
    }
    writeln!(w)?;
    writeln!(w, "Tasks")?;
    if view.tasks.is_empty() {
        writeln!(w, "  (none)")?;
    }
    for task in &view.tasks {
        let mut line = format!("  [{}] {}", task.status, task.text);
        if let Some(due) = &task.due {
            line.push_str(&format!("  (due {due})"));
        }
        if task.overdue {
            line.push_str("  OVERDUE");
        }
        writeln!(w, "{line}")?;
    }
    Ok(())
}

pub struct Emitter {
    presenter: Box<dyn Presenter>,
}

impl Emitter {
    pub fn from_config(cfg: OutputConfig) -> Self {
        let presenter: Box<dyn Presenter> = match cfg.format {
            OutputFormat::Json => Box::new(JsonPresenter { pretty: cfg.pretty }),
            OutputFormat::Html => Box::new(HtmlPresenter),
            OutputFormat::Text => Box::new(TextPresenter),
        };
        Emitter { presenter }
    }

    pub fn emit_to(&self, outcome: &RenderOutcome, meta: Option<Meta>, w: &mut dyn Write) -> io::Result<()> {
        self.presenter.emit(outcome, meta, w)?;
        w.flush()
    }

    pub fn emit(&self, outcome: &RenderOutcome, meta: Option<Meta>) -> io::Result<()> {
        let mut out = io::stdout();
        self.emit_to(outcome, meta, &mut out)
    }
}

fn to_io(e: serde_json::Error) -> io::Error { io::Error::new(io::ErrorKind::Other, e) }
