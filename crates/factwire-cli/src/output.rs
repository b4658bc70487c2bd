//! Output formatting for the CLI.

use crate::commands::{ExtractReport, FingerprintReport, PlanReport};
use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use factwire_domain::ProcessingStatus;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Characters of a fact shown in table output
const FACT_PREVIEW_CHARS: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the result of an extract run.
    pub fn format_extract_report(&self, report: &ExtractReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Quiet => Ok(report
                .documents
                .iter()
                .map(|d| format!("{} {}", d.document_id, d.status))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => Ok(self.extract_table(report)),
        }
    }

    fn extract_table(&self, report: &ExtractReport) -> String {
        let dedup = &report.dedup;
        let mut out = self.info(&format!(
            "{} document(s) in, {} kept ({} duplicate URL, {} near-duplicate, {} empty, {} without URL)",
            dedup.input,
            dedup.kept,
            dedup.duplicate_url,
            dedup.near_duplicate,
            dedup.empty_content,
            dedup.missing_url
        ));
        out.push('\n');

        if report.documents.is_empty() {
            out.push_str(&self.colorize("No documents to extract.", "yellow"));
            return out;
        }

        let mut builder = Builder::default();
        builder.push_record(["ID", "Title", "Status", "Attempts", "Items", "Error"]);
        for document in &report.documents {
            builder.push_record([
                document.document_id.to_string()[..8].to_string(),
                document.title.clone(),
                self.status(document.status),
                document.attempts.to_string(),
                document.items.len().to_string(),
                document.last_error.clone().unwrap_or_default(),
            ]);
        }
        out.push_str(&self.table(builder));

        let items: Vec<_> = report.documents.iter().flat_map(|d| d.items.iter()).collect();
        if !items.is_empty() {
            let mut builder = Builder::default();
            builder.push_record(["Fact", "Region", "Layer", "Confidence", "Relevance"]);
            for item in items {
                builder.push_record([
                    preview(&item.fact),
                    item.region.to_string(),
                    item.layer.to_string(),
                    format!("{:.2}", item.confidence),
                    format!("{:.2}", item.finance_relevance),
                ]);
            }
            out.push('\n');
            out.push_str(&self.table(builder));
        }

        out
    }

    /// Format a chunk plan.
    pub fn format_plan(&self, report: &PlanReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Quiet => Ok(report.plan.len().to_string()),
            OutputFormat::Table => {
                let mut out = self.info(&format!(
                    "{} chars, ~{} tokens ({}), budget {} tokens per chunk",
                    report.document_length,
                    report.estimated_tokens,
                    report.language,
                    report.token_budget
                ));
                out.push('\n');

                if let Some(degraded) = report.plan.degraded() {
                    out.push_str(&self.warning(&format!(
                        "Degraded with {}: {} of {} chunks kept, {} dropped",
                        degraded.strategy,
                        degraded.selected_chunks,
                        degraded.total_chunks,
                        degraded.dropped_chunks
                    )));
                    out.push('\n');
                }

                let mut builder = Builder::default();
                builder.push_record(["#", "Chars", "Tokens", "Overlap", "Start"]);
                for (index, chunk) in report.plan.chunks().iter().enumerate() {
                    let label = if chunk.synthetic {
                        format!("{}*", index + 1)
                    } else {
                        (index + 1).to_string()
                    };
                    builder.push_record([
                        label,
                        chunk.text.chars().count().to_string(),
                        chunk.estimated_tokens.to_string(),
                        chunk.overlap_chars.to_string(),
                        preview(&chunk.text),
                    ]);
                }
                out.push_str(&self.table(builder));
                Ok(out)
            }
        }
    }

    /// Format fingerprints and their comparison.
    pub fn format_fingerprints(&self, report: &FingerprintReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Quiet => Ok(match report.second {
                Some(second) => format!("{}\n{}", report.first, second),
                None => report.first.to_string(),
            }),
            OutputFormat::Table => {
                let mut out = format!("First:  {:#018x} ({})", report.first, report.first);
                if let (Some(second), Some(distance), Some(duplicate)) =
                    (report.second, report.distance, report.duplicate)
                {
                    out.push_str(&format!("\nSecond: {:#018x} ({})\n", second, second));
                    let verdict = format!(
                        "Hamming distance {} (threshold {})",
                        distance, report.threshold
                    );
                    out.push_str(&if duplicate {
                        self.warning(&format!("Near-duplicates: {}", verdict))
                    } else {
                        self.success(&format!("Distinct: {}", verdict))
                    });
                }
                Ok(out)
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn status(&self, status: ProcessingStatus) -> String {
        let color = match status {
            ProcessingStatus::Done => "green",
            ProcessingStatus::Partial => "yellow",
            ProcessingStatus::Failed => "red",
            _ => "",
        };
        self.colorize(status.as_str(), color)
    }

    fn table(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// First characters of `text` on one line
fn preview(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let flat = flat.trim();
    if flat.chars().count() <= FACT_PREVIEW_CHARS {
        return flat.to_string();
    }
    let cut: String = flat.chars().take(FACT_PREVIEW_CHARS).collect();
    format!("{}…", cut)
}
