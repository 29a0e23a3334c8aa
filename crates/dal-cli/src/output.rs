//! Output formatting for CLI

use crate::commands::{EventRecord, SimulationReport, ValidationSummary};
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Clock")]
    clock: String,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&EventRecord> for EventRow {
    fn from(record: &EventRecord) -> Self {
        Self {
            clock: format!("{:.2}s", record.clock),
            event: record.event.clone(),
            source: record.source.clone(),
            position: format!("{:.2}", record.position),
            detail: record.detail.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct Field {
    #[tabled(rename = "Field")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn to_json<T: Serialize>(data: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

fn report_summary(report: &SimulationReport, out: &mut String) -> std::fmt::Result {
    writeln!(out, "\nSummary:")?;
    writeln!(
        out,
        "  Started: {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        out,
        "  Simulated: {:.2}s{}",
        report.elapsed,
        if report.truncated { " (stopped at limit)" } else { "" }
    )?;
    writeln!(out, "  Ads started: {}", report.ads_started)?;
    writeln!(out, "  Ads skipped: {}", report.ads_skipped)?;
    write!(
        out,
        "  Final: {} @ {:.2}s",
        report.final_source, report.final_position
    )
}

/// Render a simulation report
pub fn format_report(report: &SimulationReport, format: &str) -> anyhow::Result<String> {
    let mut out = String::new();

    match OutputFormat::from(format) {
        OutputFormat::Json => return to_json(report),
        OutputFormat::Table => {
            let rows: Vec<EventRow> = report.events.iter().map(EventRow::from).collect();
            writeln!(out, "{}", Table::new(rows))?;
        }
        OutputFormat::Text => {
            writeln!(out, "Event log:")?;
            for record in &report.events {
                write!(
                    out,
                    "  [{:>8.2}s] {:<18} {} @ {:.2}",
                    record.clock, record.event, record.source, record.position
                )?;
                if let Some(detail) = &record.detail {
                    write!(out, "  {}", detail)?;
                }
                writeln!(out)?;
            }
        }
    }

    report_summary(report, &mut out)?;
    Ok(out)
}

/// Render a validation summary
pub fn format_summary(summary: &ValidationSummary, format: &str) -> anyhow::Result<String> {
    let mid_rolls: Vec<String> = summary.mid_rolls.iter().map(|t| format!("{}s", t)).collect();
    let fields = vec![
        Field {
            name: "Source",
            value: summary.source.clone().unwrap_or_else(|| "(none)".into()),
        },
        Field {
            name: "Pre-rolls",
            value: summary.pre_rolls.to_string(),
        },
        Field {
            name: "Mid-rolls",
            value: format!("{} [{}]", mid_rolls.len(), mid_rolls.join(", ")),
        },
        Field {
            name: "Post-rolls",
            value: summary.post_rolls.to_string(),
        },
        Field {
            name: "Plugins",
            value: summary.plugins.join(", "),
        },
        Field {
            name: "Media durations",
            value: summary.media.to_string(),
        },
    ];

    match OutputFormat::from(format) {
        OutputFormat::Json => to_json(summary),
        OutputFormat::Table => Ok(Table::new(fields).to_string()),
        OutputFormat::Text => {
            let mut out = String::from("Configuration OK");
            for field in fields {
                write!(out, "\n  {}: {}", field.name, field.value)?;
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ValidationSummary {
        ValidationSummary {
            source: Some("content.mp4".into()),
            pre_rolls: 1,
            mid_rolls: vec![30.0, 60.0],
            post_rolls: 0,
            plugins: vec!["ads".into(), "loop".into()],
            media: 2,
        }
    }

    fn report() -> SimulationReport {
        SimulationReport {
            started_at: chrono::Utc::now(),
            events: vec![EventRecord {
                clock: 0.0,
                event: "adstart".into(),
                source: "pre1.mp4".into(),
                position: 0.0,
                detail: Some("pre1.mp4 (pre-roll)".into()),
            }],
            elapsed: 12.5,
            final_source: "content.mp4".into(),
            final_position: 2.5,
            ads_started: 1,
            ads_skipped: 0,
            truncated: false,
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("yaml"), OutputFormat::Text);
    }

    #[test]
    fn test_summary_text() {
        let text = format_summary(&summary(), "text").unwrap();
        assert!(text.starts_with("Configuration OK"));
        assert!(text.contains("Mid-rolls: 2 [30s, 60s]"));
        assert!(text.contains("Plugins: ads, loop"));
    }

    #[test]
    fn test_summary_json() {
        let json = format_summary(&summary(), "json").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pre_rolls"], 1);
        assert_eq!(value["source"], "content.mp4");
    }

    #[test]
    fn test_report_formats() {
        let text = format_report(&report(), "text").unwrap();
        assert!(text.contains("adstart"));
        assert!(text.contains("Final: content.mp4 @ 2.50s"));

        let table = format_report(&report(), "table").unwrap();
        assert!(table.contains("pre1.mp4 (pre-roll)"));
        assert!(table.contains("Ads started: 1"));
    }
}
