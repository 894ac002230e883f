use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunReport};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct HumanOutput;

impl HumanOutput {
    pub fn print_report(report: &RunReport, dry_run: bool) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(
            stdout,
            "planned {} tiles: {} ready, {} pending, {} failed",
            report.planned,
            report.ready.len(),
            report.pending.len(),
            report.failed.len()
        )?;
        if !report.skipped.is_empty() {
            writeln!(stdout, "skipped (outside grid): {}", report.skipped.join(" "))?;
        }
        for failure in &report.failed {
            writeln!(stdout, "  {}: {}", failure.tile, failure.message)?;
        }
        if report.fetch.is_empty() {
            writeln!(stdout, "nothing to fetch")?;
        } else {
            writeln!(stdout, "{} sheets to fetch", report.fetch.len())?;
        }
        if dry_run {
            writeln!(stdout, "dry run: no scripts written")?;
        }
        Ok(())
    }
}
