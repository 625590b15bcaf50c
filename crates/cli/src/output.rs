// Output formatting for CLI

use anyhow::Result;
use imdbench_core::FinalReport;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s {
            "text" => OutputFormat::Text,
            "yaml" => OutputFormat::Yaml,
            _ => OutputFormat::Json,
        }
    }

    /// Render a value in this format; text falls back to JSON
    pub fn render_value<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(match self {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json | OutputFormat::Text => serde_json::to_string(value)?,
        })
    }

    /// Render the benchmark report
    pub fn render_report(&self, report: &FinalReport) -> Result<String> {
        match self {
            OutputFormat::Text => Ok(report_text(report)),
            _ => self.render_value(report),
        }
    }
}

/// Format a simple key-value pair for text output
pub fn field(label: &str, value: &str) -> String {
    format!("{:<14} {}", format!("{}:", label), value)
}

fn report_text(report: &FinalReport) -> String {
    let mut lines = vec![
        field("Queries", &report.queries.to_string()),
        field("Duration", &format!("{:.2}s", report.duration)),
        field("QPS", &format!("{:.2}", report.qps())),
        field("Min latency", &format!("{:.3}ms", report.min_latency_ms())),
        field("Max latency", &format!("{:.3}ms", report.max_latency_ms())),
        field("Samples", &report.samples.len().to_string()),
    ];
    for (i, sample) in report.samples.iter().enumerate() {
        lines.push(format!("  [{}] {}", i, truncate(sample, 120)));
    }
    lines.join("\n")
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> FinalReport {
        FinalReport {
            queries: 200,
            min_latency: 150,
            max_latency: 4_000,
            latency_counts: vec![0, 200],
            duration: 2.0,
            samples: vec!["{\"id\":1}".to_string()],
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!(OutputFormat::from_str("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("yaml"), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_str("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("bogus"), OutputFormat::Json);
    }

    #[test]
    fn test_json_uses_report_labels() {
        let rendered = OutputFormat::Json.render_report(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["nqueries"], 200);
        assert_eq!(value["latency_stats"], serde_json::json!([0, 200]));
        assert_eq!(value["samples"][0], "{\"id\":1}");
        assert!(!rendered.contains('\n'));
    }

    #[test]
    fn test_yaml_report() {
        let rendered = OutputFormat::Yaml.render_report(&report()).unwrap();
        assert!(rendered.contains("nqueries: 200"));
        assert!(rendered.contains("min_latency: 150"));
    }

    #[test]
    fn test_text_report() {
        let rendered = OutputFormat::Text.render_report(&report()).unwrap();
        assert!(rendered.contains("Queries:       200"));
        assert!(rendered.contains("QPS:           100.00"));
        assert!(rendered.contains("Min latency:   1.500ms"));
        assert!(rendered.contains("Max latency:   40.000ms"));
        assert!(rendered.contains("[0] {\"id\":1}"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
