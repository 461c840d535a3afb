use crate::normalize::{query_param, with_query_param};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

pub const PAGE_PARAM: &str = "page";

/// Labels of "next page" controls.
const NEXT_VOCABULARY: [&str; 3] = ["nächste", "weiter", "next"];

static PAGE_QUERY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[?&]page=\d+").unwrap());

/// How the traversal finds the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaginationMode {
    /// Count `?page=N` upwards until a page brings nothing new.
    #[default]
    ForcedQuery,
    /// Follow `rel=next` links, "next" buttons and `page=` links.
    Affordance,
}

/// The URL the traversal starts from.
pub fn first_page_url(seed: &Url, mode: PaginationMode) -> Url {
    match mode {
        PaginationMode::ForcedQuery => with_query_param(seed, PAGE_PARAM, "1"),
        PaginationMode::Affordance => seed.clone(),
    }
}

/// `current` with its `page` parameter incremented. A missing or
/// non-numeric parameter counts as page 1.
pub fn next_forced_url(current: &Url) -> Url {
    let page = query_param(current, PAGE_PARAM)
        .and_then(|p| p.trim().parse::<u64>().ok())
        .unwrap_or(1);

    with_query_param(current, PAGE_PARAM, &(page + 1).to_string())
}

fn resolve(current: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    current.join(href).ok().map(|u| u.to_string())
}

fn declares_next(element: &ElementRef) -> bool {
    element
        .value()
        .attr("rel")
        .map(|rel| rel.split_whitespace().any(|t| t.eq_ignore_ascii_case("next")))
        .unwrap_or(false)
}

fn label_of(element: &ElementRef) -> String {
    let label = match element.value().attr("aria-label") {
        Some(aria) if !aria.trim().is_empty() => aria.to_string(),
        _ => element.text().collect::<String>(),
    };
    label.trim().to_lowercase()
}

/// Locate the next page in `html`, trying in order: a declared `rel=next`
/// relation, a control labelled "next", then any link carrying `page=<n>`.
pub fn find_next_page(current: &Url, html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let rel_selector = Selector::parse("link[rel][href], a[rel][href]").unwrap();
    if let Some(next) = document
        .select(&rel_selector)
        .filter(declares_next)
        .find_map(|el| resolve(current, el.value().attr("href")?))
    {
        return Some(next);
    }

    let control_selector = Selector::parse("a, button").unwrap();
    if let Some(next) = document
        .select(&control_selector)
        .filter(|el| {
            let label = label_of(el);
            NEXT_VOCABULARY.iter().any(|word| label.contains(word))
        })
        .find_map(|el| resolve(current, el.value().attr("href")?))
    {
        return Some(next);
    }

    let link_selector = Selector::parse("a[href]").unwrap();
    document
        .select(&link_selector)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| PAGE_QUERY.is_match(href))
        .find_map(|href| resolve(current, href))
}
