// Plain-text summaries for the terminal

use linkharvest_scanner::{ProbeReport, TraversalResult};
use std::collections::BTreeMap;
use url::Url;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Summary of a collection run followed by the links grouped by host.
pub fn generate_collect_report(result: &TraversalResult, list_links: bool) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n# Summary:\n");
    report.push_str(&format!("  Pages visited: {}\n", result.pages_visited));
    report.push_str(&format!("  Listing links: {}\n", result.links.len()));
    report.push_str(&format!("  Stopped: {}\n", result.stop_reason));
    if !result.captured_pages.is_empty() {
        report.push_str(&format!(
            "  Captured pages: {}\n",
            result.captured_pages.len()
        ));
    }
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    if !list_links {
        return report;
    }

    let mut by_host: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for link in &result.links {
        if let Ok(url) = Url::parse(link)
            && let Some(host) = url.host_str()
        {
            by_host.entry(host.to_string()).or_default().push(link);
        }
    }

    for (host, links) in &by_host {
        report.push_str(&format!("## {}\n", host));
        report.push_str(&format!("  {} listings\n\n", links.len()));
        for link in links {
            report.push_str(&format!("  {}\n", extract_url_path(link)));
        }
        report.push('\n');
    }

    report
}

pub fn generate_probe_report(probe: &ProbeReport) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n# Probe:\n");
    report.push_str(&format!("  URL: {}\n", probe.url));
    report.push_str(&format!("  HTTP status: {}\n", probe.status_code));
    report.push_str(&format!("  Body length: {} bytes\n", probe.body_length));
    report.push_str(&format!("  Listing links: {}\n", probe.link_count));
    report.push_str(&format!(
        "  Consent wall suspected: {}\n",
        if probe.consent_wall { "yes" } else { "no" }
    ));
    report.push('\n');
    report.push_str(RULE);
    report.push('\n');
    report
}
