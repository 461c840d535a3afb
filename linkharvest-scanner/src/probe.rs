use crate::error::{Result, ScanError};
use crate::extract::extract_listing_links;
use crate::result::ProbeReport;
use crate::traversal::Collector;
use tracing::info;
use url::Url;

/// Words a cookie/privacy interstitial talks about.
const CONSENT_TERMS: [&str; 5] = ["cookie", "consent", "einwilligung", "datenschutz", "zustimm"];

/// Markers of the button that dismisses such an interstitial.
const ACCEPT_MARKERS: [&str; 5] = [
    "akzeptieren",
    "accept",
    "zustimmen",
    "einverstanden",
    "gdpr-banner-accept",
];

/// Heuristic: the page both talks about consent and offers an accept control.
pub fn looks_like_consent_wall(html: &str) -> bool {
    let body = html.to_lowercase();
    CONSENT_TERMS.iter().any(|term| body.contains(term))
        && ACCEPT_MARKERS.iter().any(|marker| body.contains(marker))
}

impl Collector {
    /// Fetch `url` once and report what a traversal would see there.
    /// Never paginates.
    pub async fn probe(&self, url: &str) -> Result<ProbeReport> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = self.client.get(parsed.clone()).send().await?;
        let status_code = response.status().as_u16();
        let body = response.text().await?;

        let report = ProbeReport {
            url: parsed.to_string(),
            status_code,
            body_length: body.len(),
            link_count: extract_listing_links(&parsed, &body).len(),
            consent_wall: looks_like_consent_wall(&body),
        };
        info!(
            "Probe {}: HTTP {}, {} bytes, {} link(s), consent wall: {}",
            report.url, report.status_code, report.body_length, report.link_count, report.consent_wall
        );
        Ok(report)
    }
}
