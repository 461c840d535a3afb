//! Listing ids hidden in client-side hydration state.
//!
//! Script payloads are parsed as JSON and serialized again before the
//! listing pattern runs over them, so escaped paths (`\/s-anzeige\/...`)
//! become visible. Every parse is best-effort.

use crate::error::{Result, ScanError};
use crate::extract::{Discovery, discoveries_from_text};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::trace;
use url::Url;

const JSON_SCRIPT_TYPES: [&str; 2] = ["application/json", "application/ld+json"];

/// Globals that client frameworks assign their state to.
const STATE_MARKERS: [&str; 3] = ["__NEXT_DATA__", "__INITIAL_STATE__", "__PRELOADED_STATE__"];

const MIN_CANDIDATE_CHARS: usize = 10;

static JSON_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\{.*\}|\[.*\])").unwrap());

fn parse_blob(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| ScanError::ParseError(e.to_string()))
}

fn has_state_marker(text: &str) -> bool {
    STATE_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Widest `{...}` / `[...]` spans of an untyped script.
fn json_candidates(text: &str) -> impl Iterator<Item = &str> {
    JSON_CANDIDATE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|candidate| candidate.chars().count() >= MIN_CANDIDATE_CHARS)
}

/// Parsed JSON values found in one script body. Failed parses are dropped.
fn script_blobs(script_type: &str, text: &str) -> Vec<Value> {
    let attempts: Vec<Result<Value>> = if JSON_SCRIPT_TYPES.contains(&script_type) {
        vec![parse_blob(text)]
    } else if has_state_marker(text) {
        json_candidates(text).map(parse_blob).collect()
    } else {
        Vec::new()
    };

    attempts
        .into_iter()
        .filter_map(|attempt| {
            attempt
                .inspect_err(|e| trace!("Skipping script payload: {}", e))
                .ok()
        })
        .collect()
}

/// Listing ids in JSON script payloads, as synthesized listing URLs.
pub fn scan_embedded_state(page_url: &Url, html: &str) -> Vec<Discovery> {
    let document = Html::parse_document(html);
    let script_selector = Selector::parse("script").unwrap();
    let mut found = Vec::new();

    for script in document.select(&script_selector) {
        let text: String = script.text().collect();
        if text.trim().is_empty() {
            continue;
        }

        let script_type = script
            .value()
            .attr("type")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        for blob in script_blobs(&script_type, &text) {
            let Ok(serialized) = serde_json::to_string(&blob) else {
                continue;
            };
            found.extend(discoveries_from_text(page_url, &serialized));
        }
    }

    found
}
