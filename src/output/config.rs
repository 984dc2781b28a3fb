use std::env;

use clap::ValueEnum;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl OutputConfig {
    pub fn from_env() -> Self {
        let format = match env::var("OPSDASH_OUTPUT_FORMAT").ok().as_deref() {
            Some("json") => OutputFormat::Json,
            Some("html") => OutputFormat::Html,
            _ => OutputFormat::Text,
        };
        let pretty = match env::var("OPSDASH_OUTPUT_PRETTY").ok().as_deref() {
            Some(v) if v.eq_ignore_ascii_case("1") || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes") => true,
            _ => false,
        };
        OutputConfig { format, pretty }
    }

    /// `--format` beats `--json`, which beats the environment.
    pub fn resolve(format: Option<OutputFormat>, json: bool) -> Self {
        let mut cfg = Self::from_env();
        if json {
            cfg.format = OutputFormat::Json;
        }
        if let Some(f) = format {
            cfg.format = f;
        }
        cfg
    }
}
