// Run summary generation and formatting

use crate::dispatch::{DomainReport, DomainStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub store_path: String,
    pub reports: Vec<DomainReport>,
    pub new_products: usize,
    pub total_products: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_warning: Option<String>,
}

impl RunSummary {
    pub fn completed_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status == DomainStatus::Completed)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.status != DomainStatus::Completed)
            .count()
    }
}

pub fn generate_text_summary(summary: &RunSummary) -> String {
    let mut report = String::new();

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Run ID:          {}\n", summary.run_id));
    report.push_str(&format!(
        "  Started:         {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    let duration = summary.finished_at - summary.started_at;
    report.push_str(&format!(
        "  Duration:        {}s\n",
        duration.num_seconds()
    ));
    report.push_str(&format!(
        "  Domains crawled: {} ({} failed)\n",
        summary.reports.len(),
        summary.failed_count()
    ));
    report.push_str(&format!("  New products:    {}\n", summary.new_products));
    report.push_str(&format!(
        "  Total in store:  {} ({})\n",
        summary.total_products, summary.store_path
    ));

    if let Some(ref warning) = summary.store_warning {
        report.push_str(&format!("\n  [!] {}\n", warning));
    }

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    for domain in &summary.reports {
        let status_str = match domain.status {
            DomainStatus::Completed => "\x1b[32mok\x1b[0m",
            DomainStatus::Failed => "\x1b[31mfailed\x1b[0m",
            DomainStatus::Cancelled => "\x1b[33mcancelled\x1b[0m",
        };

        report.push_str(&format!("## {} [{}]\n", domain.domain, status_str));
        report.push_str(&format!(
            "  {} product URL(s) from {} sitemap(s), {} page URL(s) inspected\n",
            domain.products_found, domain.sitemaps_visited, domain.pages_seen
        ));

        if let Some(ref reason) = domain.infrastructure_error {
            report.push_str(&format!("  [!] {}\n", reason));
        }

        for failure in &domain.failures {
            report.push_str(&format!(
                "  [!] {} ({} attempt(s)): {}\n",
                failure.url, failure.attempts, failure.error
            ));
        }

        for cycle in &domain.skipped_cycles {
            report.push_str(&format!("  [~] cyclic sitemap reference skipped: {}\n", cycle));
        }

        report.push('\n');
    }

    report
}

pub fn generate_json_summary(summary: &RunSummary) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Shopmap",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": Utc::now().to_rfc3339(),
                "format": "json"
            },
            "run": {
                "id": summary.run_id,
                "started_at": summary.started_at.to_rfc3339(),
                "finished_at": summary.finished_at.to_rfc3339(),
                "store_path": summary.store_path,
                "store_warning": summary.store_warning,
            },
            "totals": {
                "domains": summary.reports.len(),
                "domains_failed": summary.failed_count(),
                "new_products": summary.new_products,
                "total_products": summary.total_products,
            },
            "domains": summary.reports,
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
