use std::fmt::Write as FmtWrite;
use std::path::PathBuf;

use console::style;
use serde::Serialize;

use crate::models::{Config, OutputFormat, RunStats};
use crate::services::embedding::LocalModelSpec;

pub trait Formatter {
    fn format_build_report(&self, report: &BuildReport) -> String;
    fn format_models(&self, models: &[LocalModelSpec], current: &str) -> String;
    fn format_config(&self, config: &Config) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

/// What a `build` run did, printed whether or not it succeeded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub stats: RunStats,
    pub success: bool,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PathBuf>,
    /// Only rendered as JSON; other formats print errors separately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuildReport {
    fn title(&self) -> &'static str {
        match (self.success, self.dry_run) {
            (false, _) => "Build Failed",
            (true, true) => "Dry Run Complete",
            (true, false) => "Knowledge Base Built",
        }
    }

    fn provider(&self) -> String {
        self.stats
            .embedding_provider
            .map(|p| p.to_string())
            .unwrap_or_else(|| "none".to_string())
    }
}

fn duration_secs(stats: &RunStats) -> f64 {
    stats.duration_ms as f64 / 1000.0
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_build_report(&self, report: &BuildReport) -> String {
        let stats = &report.stats;
        let mut output = String::new();
        let title = report.title();
        let heading = if report.success {
            style(title).green().bold()
        } else {
            style(title).red().bold()
        };
        writeln!(output, "{}", heading).unwrap();
        writeln!(output, "{}", "-".repeat(title.len())).unwrap();
        writeln!(output, "Files scanned:    {}", stats.files_scanned).unwrap();
        writeln!(output, "Files processed:  {}", stats.files_processed).unwrap();
        writeln!(output, "Chunks created:   {}", stats.chunks_created).unwrap();
        writeln!(output, "Chunks embedded:  {}", stats.chunks_embedded).unwrap();
        writeln!(output, "Errors:           {}", stats.errors).unwrap();
        writeln!(output, "Provider:         {}", report.provider()).unwrap();
        writeln!(output, "Duration:         {:.2}s", duration_secs(stats)).unwrap();
        if let Some(ref path) = report.output {
            writeln!(output, "Output:           {}", path.display()).unwrap();
        }
        if let Some(ref path) = report.summary {
            writeln!(output, "Summary:          {}", path.display()).unwrap();
        }
        output
    }

    fn format_models(&self, models: &[LocalModelSpec], current: &str) -> String {
        let mut output = String::new();
        writeln!(output, "Local Embedding Models").unwrap();
        writeln!(output, "----------------------").unwrap();
        for model in models {
            let marker = if model.name == current { "*" } else { " " };
            writeln!(
                output,
                "{} {:<40} {:>4} dims  ~{} MB",
                marker, model.name, model.dimensions, model.size_mb
            )
            .unwrap();
            writeln!(output, "  {}", style(model.description).dim()).unwrap();
        }
        output
    }

    fn format_config(&self, config: &Config) -> String {
        serde_yaml::to_string(config).unwrap_or_else(|e| format!("Error: {}\n", e))
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_build_report(&self, report: &BuildReport) -> String {
        self.render(report)
    }

    fn format_models(&self, models: &[LocalModelSpec], current: &str) -> String {
        let models: Vec<serde_json::Value> = models
            .iter()
            .map(|m| {
                serde_json::json!({
                    "name": m.name,
                    "dimensions": m.dimensions,
                    "max_length": m.max_length,
                    "size_mb": m.size_mb,
                    "description": m.description,
                    "current": m.name == current,
                })
            })
            .collect();
        self.render(&serde_json::json!({ "models": models }))
    }

    fn format_config(&self, config: &Config) -> String {
        self.render(config)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_build_report(&self, report: &BuildReport) -> String {
        let stats = &report.stats;
        let mut output = String::new();
        writeln!(output, "## {}\n", report.title()).unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Files scanned | {} |", stats.files_scanned).unwrap();
        writeln!(output, "| Files processed | {} |", stats.files_processed).unwrap();
        writeln!(output, "| Chunks created | {} |", stats.chunks_created).unwrap();
        writeln!(output, "| Chunks embedded | {} |", stats.chunks_embedded).unwrap();
        writeln!(output, "| Errors | {} |", stats.errors).unwrap();
        writeln!(output, "| Provider | {} |", report.provider()).unwrap();
        writeln!(output, "| Duration | {:.2}s |", duration_secs(stats)).unwrap();
        if let Some(ref path) = report.output {
            writeln!(output, "\n**Output:** `{}`", path.display()).unwrap();
        }
        if let Some(ref path) = report.summary {
            writeln!(output, "\n**Summary:** `{}`", path.display()).unwrap();
        }
        output
    }

    fn format_models(&self, models: &[LocalModelSpec], current: &str) -> String {
        let mut output = String::new();
        writeln!(output, "## Local Embedding Models\n").unwrap();
        writeln!(output, "| Model | Dimensions | Size | Description |").unwrap();
        writeln!(output, "|-------|------------|------|-------------|").unwrap();
        for model in models {
            let name = if model.name == current {
                format!("**{}**", model.name)
            } else {
                model.name.to_string()
            };
            writeln!(
                output,
                "| {} | {} | ~{} MB | {} |",
                name, model.dimensions, model.size_mb, model.description
            )
            .unwrap();
        }
        output
    }

    fn format_config(&self, config: &Config) -> String {
        let yaml = serde_yaml::to_string(config).unwrap_or_else(|e| format!("# error: {}\n", e));
        format!("## Configuration\n\n```yaml\n{}```\n", yaml)
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use crate::services::embedding::LOCAL_MODELS;

    fn report() -> BuildReport {
        BuildReport {
            stats: RunStats {
                files_scanned: 12,
                files_processed: 11,
                chunks_created: 40,
                chunks_embedded: 40,
                errors: 1,
                embedding_provider: Some(Provider::Local),
                duration_ms: 2500,
            },
            success: true,
            dry_run: false,
            output: Some(PathBuf::from("output/knowledge_base.json")),
            summary: None,
            error: None,
        }
    }

    #[test]
    fn test_text_build_report() {
        let output = TextFormatter.format_build_report(&report());
        assert!(output.contains("Knowledge Base Built"));
        assert!(output.contains("Chunks created:   40"));
        assert!(output.contains("Errors:           1"));
        assert!(output.contains("Provider:         local"));
        assert!(output.contains("Duration:         2.50s"));
        assert!(output.contains("output/knowledge_base.json"));
    }

    #[test]
    fn test_failed_report_shows_stats_and_error() {
        let mut report = report();
        report.success = false;
        report.output = None;
        report.error = Some("embedding timeout".to_string());

        let text = TextFormatter.format_build_report(&report);
        assert!(text.contains("Build Failed"));
        assert!(text.contains("Files processed:  11"));
        assert!(!text.contains("embedding timeout"));

        let md = MarkdownFormatter.format_build_report(&report);
        assert!(md.starts_with("## Build Failed"));
        assert!(md.contains("| Errors | 1 |"));

        let json = JsonFormatter::new(false).format_build_report(&report);
        assert!(json.contains("embedding timeout"));
    }

    #[test]
    fn test_json_build_report() {
        let output = JsonFormatter::new(false).format_build_report(&report());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["stats"]["chunks_created"], 40);
        assert_eq!(value["stats"]["embedding_provider"], "local");
        assert_eq!(value["success"], true);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_models_mark_current() {
        let output = MarkdownFormatter.format_models(LOCAL_MODELS, "all-mpnet-base-v2");
        assert!(output.contains("| **all-mpnet-base-v2** | 768 |"));

        let json = JsonFormatter::new(true).format_models(LOCAL_MODELS, "all-MiniLM-L6-v2");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["models"][0]["current"], true);
        assert_eq!(value["models"][1]["current"], false);
    }

    #[test]
    fn test_markdown_config_block() {
        let output = MarkdownFormatter.format_config(&Config::default());
        assert!(output.starts_with("## Configuration\n\n```yaml\n"));
        assert!(output.contains("chunk_size: 1500"));
    }

    #[test]
    fn test_json_message_and_error() {
        let formatter = JsonFormatter::new(false);
        assert_eq!(formatter.format_message("done"), r#"{"message":"done"}"#);
        assert_eq!(formatter.format_error("bad"), r#"{"error":"bad"}"#);
    }
}
