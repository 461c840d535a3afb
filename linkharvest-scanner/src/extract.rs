use crate::json_blobs::scan_embedded_state;
use crate::normalize::normalize_url;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// `/s-anzeige/<anything but quotes>/<id>` followed by a path, query or
/// fragment boundary, or the end of the text.
pub static LISTING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)/s-anzeige/[^"']*?/(\d+)(?:[/?#]|$)"#).unwrap()
});

/// A listing URL together with the numeric id it was recognised by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Discovery {
    pub url: String,
    pub id: String,
}

/// How a pass builds its URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Keeps the href found in the page.
    Anchor,
    /// Rebuilds the canonical `/s-anzeige/x/{id}` shape from a bare id.
    Synthesized,
}

type Pass = fn(&Url, &str) -> Vec<Discovery>;

const PASSES: [(&str, Origin, Pass); 3] = [
    ("anchors", Origin::Anchor, scan_anchors),
    ("raw-text", Origin::Synthesized, scan_raw_text),
    ("embedded-state", Origin::Synthesized, scan_embedded_state),
];

/// Path used when only the listing id is known.
pub fn synthesized_href(id: &str) -> String {
    format!("/s-anzeige/x/{}", id)
}

/// Id of the first listing path in `text`, if any.
pub fn listing_id(text: &str) -> Option<&str> {
    LISTING_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Every listing id in `text` as a synthesized, normalized URL.
pub(crate) fn discoveries_from_text(page_url: &Url, text: &str) -> Vec<Discovery> {
    LISTING_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|id| {
            normalize_url(page_url, &synthesized_href(id.as_str())).map(|url| Discovery {
                url,
                id: id.as_str().to_string(),
            })
        })
        .collect()
}

/// Hyperlinks whose href points at a listing.
pub fn scan_anchors(page_url: &Url, html: &str) -> Vec<Discovery> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]").unwrap();

    document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| {
            let id = listing_id(href)?;
            let url = normalize_url(page_url, href)?;
            Some(Discovery {
                url,
                id: id.to_string(),
            })
        })
        .collect()
}

/// Listing ids anywhere in the markup: data attributes, inline scripts,
/// hrefs the anchor pass could not see.
pub fn scan_raw_text(page_url: &Url, html: &str) -> Vec<Discovery> {
    discoveries_from_text(page_url, html)
}

/// All listing URLs on one page.
///
/// Anchor hits keep their own path. Ids recovered only from raw text or
/// embedded state are added as `/s-anzeige/x/{id}`, unless an anchor on
/// the same page already produced that id.
pub fn extract_listing_links(page_url: &Url, html: &str) -> BTreeSet<String> {
    let mut links = BTreeSet::new();
    let mut anchored_ids = HashSet::new();

    for (name, origin, pass) in PASSES {
        let found = pass(page_url, html);
        debug!("{} pass found {} candidate(s) on {}", name, found.len(), page_url);

        for discovery in found {
            match origin {
                Origin::Anchor => {
                    anchored_ids.insert(discovery.id);
                    links.insert(discovery.url);
                }
                Origin::Synthesized => {
                    if !anchored_ids.contains(&discovery.id) {
                        links.insert(discovery.url);
                    }
                }
            }
        }
    }

    links
}
