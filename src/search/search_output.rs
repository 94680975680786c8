use anyhow::{Context, Result};
use colored::*;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::models::MatchResult;
use crate::search::search_runner::SearchEvent;

/// How search events are rendered on the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Color,
    Plain,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "color" => Ok(OutputFormat::Color),
            "plain" => Ok(OutputFormat::Plain),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Invalid output format: {other}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Color => "color",
            OutputFormat::Plain => "plain",
            OutputFormat::Json => "json",
        };
        write!(f, "{name}")
    }
}

/// Writes one event. Paths under `base` are shown relative to it.
///
/// Text formats skip progress events; JSON writes every event as one line.
pub fn write_event<W: Write>(
    out: &mut W,
    event: &SearchEvent,
    format: OutputFormat,
    base: Option<&Path>,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let line = serde_json::to_string(event).context("Failed to serialize event")?;
            writeln!(out, "{line}")?;
        }
        OutputFormat::Color | OutputFormat::Plain => {
            let color = format == OutputFormat::Color
                && atty::is(atty::Stream::Stdout)
                && colored::control::SHOULD_COLORIZE.should_colorize();
            write_text_event(out, event, color, base)?;
        }
    }
    Ok(())
}

fn write_text_event<W: Write>(
    out: &mut W,
    event: &SearchEvent,
    color: bool,
    base: Option<&Path>,
) -> Result<()> {
    match event {
        SearchEvent::Progress { .. } => {}
        SearchEvent::Match(m) => {
            writeln!(out, "{}", format_match(m, color, base))?;
        }
        SearchEvent::FileError { path, message } => {
            let path = display_path(path, base);
            if color {
                writeln!(out, "{} {}: {}", "Error".red().bold(), path.as_str().blue(), message)?;
            } else {
                writeln!(out, "Error {path}: {message}")?;
            }
        }
        SearchEvent::Finished(summary) => {
            let message = summary.message();
            if color {
                writeln!(out, "{}", message.as_str().green().bold())?;
            } else {
                writeln!(out, "{message}")?;
            }
        }
    }
    Ok(())
}

/// `path:line: snippet` for line matches, `path: snippet` for documents.
/// First occurrences get a red line number when colored.
pub fn format_match(m: &MatchResult, color: bool, base: Option<&Path>) -> String {
    let path = display_path(&m.source, base);

    if !color {
        return if m.position > 0 {
            format!("{}:{}: {}", path, m.position, m.snippet)
        } else {
            format!("{}: {}", path, m.snippet)
        };
    }

    if m.position > 0 {
        let line_number = if m.is_first_occurrence {
            m.position.to_string().as_str().red().bold()
        } else {
            m.position.to_string().as_str().normal()
        };
        format!("{}:{}: {}", path.as_str().blue(), line_number, m.snippet)
    } else {
        format!("{}: {}", path.as_str().blue(), m.snippet)
    }
}

/// Shows `path` relative to `base` when it lives underneath it.
pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    base.and_then(|base| path.strip_prefix(base).ok())
        .filter(|relative| !relative.as_os_str().is_empty())
        .unwrap_or(path)
        .display()
        .to_string()
}
