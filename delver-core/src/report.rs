// Human-readable and JSON renderings of a finished scan

use crate::scan::{ScanReport, ScanState, StatsSnapshot};

const RULE: &str = "═══════════════════════════════════════════════════════════════════════════════\n";

/// The six counters, one per line, or a note that nothing was sent.
pub fn render_summary(stats: &StatsSnapshot) -> String {
    if stats.requests == 0 {
        return "No requests were issued.".to_string();
    }

    [
        format!("Total requests: {}", stats.requests),
        format!("Valid hits: {}", stats.valid),
        format!("Protected hits: {}", stats.protected),
        format!("Redirects skipped: {}", stats.redirect),
        format!("Soft 404 filtered: {}", stats.soft_404),
        format!("Processing errors: {}", stats.errors),
    ]
    .join("\n")
}

/// Full text report: target, outcome, WAF findings and the counter summary.
pub fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();

    out.push('\n');
    out.push_str(RULE);
    out.push_str("                            SCAN SUMMARY\n");
    out.push_str(RULE);
    out.push('\n');

    out.push_str(&format!("Target: {}\n", report.target));
    out.push_str(&format!("Max depth: {}\n", report.max_depth));
    let state = match report.state {
        ScanState::Completed => "completed",
        ScanState::Aborted => "interrupted (partial results preserved)",
        ScanState::Idle | ScanState::BaselineEstablished | ScanState::Scanning => "incomplete",
    };
    out.push_str(&format!("State: {}\n", state));
    out.push_str(&format!(
        "Soft-404 baseline: {}\n",
        if report.baseline_established {
            "established"
        } else {
            "unavailable (detection disabled)"
        }
    ));

    if report.waf_detections.is_empty() {
        out.push_str("WAF: none detected\n");
    } else {
        let names: Vec<&str> = report
            .waf_detections
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        out.push_str(&format!("WAF: {}\n", names.join(", ")));
    }

    let elapsed = report.finished_at - report.started_at;
    out.push_str(&format!(
        "Duration: {:.1}s\n\n",
        elapsed.num_milliseconds() as f64 / 1000.0
    ));

    out.push_str(&render_summary(&report.stats));
    out.push_str("\n\n");
    out.push_str(&format!("Output: {}\n", report.output_dir.display()));
    out.push_str(RULE);

    out
}

pub fn render_json(report: &ScanReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
