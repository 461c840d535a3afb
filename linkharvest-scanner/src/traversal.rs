use crate::config::CollectorConfig;
use crate::error::{Result, ScanError};
use crate::extract::extract_listing_links;
use crate::paginate::{PaginationMode, find_next_page, first_page_url, next_forced_url};
use crate::result::{CapturedPage, PageReport, StopReason, TraversalResult};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

pub type PageCallback = Arc<dyn Fn(&PageReport) + Send + Sync>;

/// Drives one dealer-page traversal: fetch, extract, decide, repeat.
///
/// Each `Collector` owns its own HTTP client. Run concurrent traversals
/// with separate collectors.
pub struct Collector {
    pub(crate) client: Client,
    config: CollectorConfig,
    page_callback: Option<PageCallback>,
}

/// Two URLs that only differ by fragment address the same document.
fn same_resource(a: &Url, b: &Url) -> bool {
    let (mut a, mut b) = (a.clone(), b.clone());
    a.set_fragment(None);
    b.set_fragment(None);
    a == b
}

/// Cursor of a running traversal.
struct PageState {
    current: Url,
    pages_visited: usize,
    seen: BTreeSet<String>,
    captured: Vec<CapturedPage>,
}

impl PageState {
    fn new(start: Url) -> Self {
        Self {
            current: start,
            pages_visited: 0,
            seen: BTreeSet::new(),
            captured: Vec::new(),
        }
    }

    /// Merge one page's links and return how many were not seen before.
    fn merge(&mut self, found: BTreeSet<String>) -> usize {
        let before = self.seen.len();
        self.seen.extend(found);
        self.seen.len() - before
    }

    fn finish(self, stop_reason: StopReason) -> TraversalResult {
        TraversalResult {
            links: self.seen.into_iter().collect(),
            pages_visited: self.pages_visited,
            stop_reason,
            captured_pages: self.captured,
        }
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| ScanError::InvalidHeader(name.to_string()))
}

pub(crate) fn default_headers(config: &CollectorConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, header_value("User-Agent", &config.user_agent)?);
    headers.insert(header::ACCEPT, header_value("Accept", &config.accept)?);
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header_value("Accept-Language", &config.accept_language)?,
    );
    if !config.referer.is_empty() {
        headers.insert(header::REFERER, header_value("Referer", &config.referer)?);
    }
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    if let Some(cookie) = &config.cookie {
        headers.insert(header::COOKIE, header_value("Cookie", cookie)?);
    }
    Ok(headers)
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Result<Self> {
        let client = Client::builder()
            .default_headers(default_headers(&config)?)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            page_callback: None,
        })
    }

    pub fn with_page_callback(mut self, callback: PageCallback) -> Self {
        self.page_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect every listing link reachable from `seed` by pagination.
    ///
    /// Only an unparsable seed is an error. Fetch failures and
    /// cancellation end the run with the links gathered so far.
    pub async fn collect(&self, seed: &str, cancel: &CancellationToken) -> Result<TraversalResult> {
        let seed = Url::parse(seed.trim())
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", seed, e)))?;

        let mode = self.config.pagination;
        let mut state = PageState::new(first_page_url(&seed, mode));
        info!("Starting traversal of {} ({:?} pagination)", state.current, mode);

        let stop_reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            state.pages_visited += 1;
            debug!("Fetching page {}: {}", state.pages_visited, state.current);

            let html = match self.fetch(&state.current).await {
                Ok(html) => html,
                Err(reason) => {
                    warn!("Stopping at {}: {}", state.current, reason);
                    break reason;
                }
            };

            if self.config.capture_html {
                state.captured.push(CapturedPage {
                    index: state.pages_visited,
                    url: state.current.to_string(),
                    html: html.clone(),
                });
            }

            let found = extract_listing_links(&state.current, &html);
            let found_count = found.len();
            let new_links = state.merge(found);

            info!(
                "Page {}: {} new link(s), {} total",
                state.pages_visited,
                new_links,
                state.seen.len()
            );
            if let Some(ref callback) = self.page_callback {
                callback(&PageReport {
                    page: state.pages_visited,
                    url: state.current.to_string(),
                    found: found_count,
                    new_links,
                    total: state.seen.len(),
                });
            }

            if self.config.page_cap_reached(state.pages_visited) {
                break StopReason::MaxPagesReached;
            }

            let next = match mode {
                PaginationMode::ForcedQuery => Some(next_forced_url(&state.current)),
                PaginationMode::Affordance => {
                    find_next_page(&state.current, &html).and_then(|next| Url::parse(&next).ok())
                }
            };
            let Some(next) = next.filter(|next| !same_resource(next, &state.current)) else {
                break StopReason::NoNextPage;
            };

            if mode == PaginationMode::ForcedQuery && new_links == 0 {
                break StopReason::NoNewLinks;
            }

            debug!("Next page: {}", next);
            if !self.config.delay.is_zero() {
                let interrupted = tokio::select! {
                    _ = cancel.cancelled() => true,
                    _ = tokio::time::sleep(self.config.delay) => false,
                };
                if interrupted {
                    break StopReason::Cancelled;
                }
            }

            state.current = next;
        };

        info!(
            "Traversal finished after {} page(s): {} ({} links)",
            state.pages_visited,
            stop_reason,
            state.seen.len()
        );
        Ok(state.finish(stop_reason))
    }

    /// Single GET attempt. Failures come back as the reason to stop.
    async fn fetch(&self, url: &Url) -> std::result::Result<String, StopReason> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| StopReason::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(StopReason::HttpStatus(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| StopReason::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    fn listing_page(ids: &[u32]) -> String {
        let mut html = String::from("<html><body><ul>");
        for id in ids {
            html.push_str(&format!(
                r#"<li><a href="/s-anzeige/felgen-satz/{}?reason=dealer">Ad {}</a></li>"#,
                id, id
            ));
        }
        html.push_str("</ul></body></html>");
        html
    }

    fn html_response(body: String) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html; charset=utf-8")
            .set_body_string(body)
    }

    async fn mount_page(server: &MockServer, page: &str, body: String) {
        Mock::given(method("GET"))
            .and(path("/pro/dealer"))
            .and(query_param("page", page))
            .respond_with(html_response(body))
            .mount(server)
            .await;
    }

    fn config(mode: PaginationMode) -> CollectorConfig {
        CollectorConfig::default()
            .with_delay(Duration::ZERO)
            .with_pagination(mode)
    }

    fn assert_sorted_unique(links: &[String]) {
        assert!(links.windows(2).all(|w| w[0] < w[1]), "not strictly sorted: {:?}", links);
    }

    /// Page 1 brings five listings, page 2 repeats them.
    #[tokio::test]
    async fn test_forced_pagination_stops_on_no_new_links() {
        let server = MockServer::start().await;
        mount_page(&server, "1", listing_page(&[11, 12, 13, 14, 15])).await;
        mount_page(&server, "2", listing_page(&[15, 14, 13, 12, 11])).await;

        let collector = Collector::new(config(PaginationMode::ForcedQuery)).unwrap();
        let result = collector
            .collect(&format!("{}/pro/dealer", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.pages_visited, 2);
        assert_eq!(result.stop_reason, StopReason::NoNewLinks);
        assert_eq!(result.stop_reason.to_string(), "no new links");
        assert_eq!(result.links.len(), 5);
        assert_sorted_unique(&result.links);
        assert!(
            result
                .links
                .contains(&format!("{}/s-anzeige/felgen-satz/11", server.uri()))
        );
    }

    #[tokio::test]
    async fn test_forced_pagination_walks_until_pages_repeat() {
        let server = MockServer::start().await;
        mount_page(&server, "1", listing_page(&[1, 2])).await;
        mount_page(&server, "2", listing_page(&[3, 4])).await;
        mount_page(&server, "3", listing_page(&[5])).await;
        mount_page(&server, "4", listing_page(&[])).await;

        let collector = Collector::new(config(PaginationMode::ForcedQuery)).unwrap();
        let result = collector
            .collect(&format!("{}/pro/dealer?page=7", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.pages_visited, 4);
        assert_eq!(result.stop_reason, StopReason::NoNewLinks);
        assert_eq!(result.links.len(), 5);
        assert_sorted_unique(&result.links);
    }

    #[tokio::test]
    async fn test_affordance_without_next_stops_after_one_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pro/dealer"))
            .respond_with(html_response(listing_page(&[1, 2, 3])))
            .mount(&server)
            .await;

        let collector = Collector::new(config(PaginationMode::Affordance)).unwrap();
        let result = collector
            .collect(&format!("{}/pro/dealer", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.pages_visited, 1);
        assert_eq!(result.stop_reason, StopReason::NoNextPage);
        assert_eq!(result.stop_reason.to_string(), "no next page found");
        assert_eq!(result.links.len(), 3);
    }

    #[tokio::test]
    async fn test_affordance_follows_rel_next() {
        let server = MockServer::start().await;
        let first = format!(
            r#"<html><head><link rel="next" href="/pro/dealer/seite-2"></head><body>{}</body></html>"#,
            listing_page(&[1, 2])
        );
        Mock::given(method("GET"))
            .and(path("/pro/dealer"))
            .respond_with(html_response(first))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pro/dealer/seite-2"))
            .respond_with(html_response(listing_page(&[2, 3])))
            .mount(&server)
            .await;

        let collector = Collector::new(config(PaginationMode::Affordance)).unwrap();
        let result = collector
            .collect(&format!("{}/pro/dealer", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.pages_visited, 2);
        assert_eq!(result.stop_reason, StopReason::NoNextPage);
        assert_eq!(result.links.len(), 3);
    }

    #[tokio::test]
    async fn test_affordance_self_loop_is_guarded() {
        let server = MockServer::start().await;
        let body = format!(
            r#"<html><body>{}<a href="/pro/dealer">Weiter</a></body></html>"#,
            listing_page(&[9])
        );
        Mock::given(method("GET"))
            .and(path("/pro/dealer"))
            .respond_with(html_response(body))
            .expect(1)
            .mount(&server)
            .await;

        let collector = Collector::new(config(PaginationMode::Affordance)).unwrap();
        let result = collector
            .collect(&format!("{}/pro/dealer", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.pages_visited, 1);
        assert_eq!(result.stop_reason, StopReason::NoNextPage);
    }

    #[tokio::test]
    async fn test_affordance_fragment_only_next_is_a_self_loop() {
        let server = MockServer::start().await;
        let body = format!(
            r##"<html><body>{}<a href="#" aria-label="Weiter">›</a></body></html>"##,
            listing_page(&[9])
        );
        Mock::given(method("GET"))
            .and(path("/pro/dealer"))
            .respond_with(html_response(body))
            .expect(1)
            .mount(&server)
            .await;

        let collector = Collector::new(config(PaginationMode::Affordance).with_capture_html(true))
            .unwrap();
        let result = collector
            .collect(&format!("{}/pro/dealer", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.pages_visited, 1);
        assert_eq!(result.captured_pages.len(), 1);
        assert_eq!(result.stop_reason, StopReason::NoNextPage);
    }

    #[test]
    fn test_same_resource_ignores_fragment() {
        let page = Url::parse("https://example.test/pro/dealer?page=2").unwrap();
        let anchored = Url::parse("https://example.test/pro/dealer?page=2#").unwrap();
        let other = Url::parse("https://example.test/pro/dealer?page=3#top").unwrap();
        assert!(same_resource(&page, &anchored));
        assert!(!same_resource(&page, &other));
    }

    #[tokio::test]
    async fn test_http_error_keeps_partial_results() {
        let server = MockServer::start().await;
        mount_page(&server, "1", listing_page(&[1, 2])).await;
        Mock::given(method("GET"))
            .and(path("/pro/dealer"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let collector = Collector::new(config(PaginationMode::ForcedQuery)).unwrap();
        let result = collector
            .collect(&format!("{}/pro/dealer", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.stop_reason, StopReason::HttpStatus(503));
        assert_eq!(result.pages_visited, 2);
        assert_eq!(result.links.len(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_is_reported_not_raised() {
        let collector = Collector::new(
            config(PaginationMode::ForcedQuery).with_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        let result = collector
            .collect("http://127.0.0.1:1/pro/dealer", &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(result.stop_reason, StopReason::Transport(_)));
        assert!(result.links.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_seed_is_an_error() {
        let collector = Collector::new(CollectorConfig::default()).unwrap();
        let result = collector.collect("not a url", &CancellationToken::new()).await;
        assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_max_pages_caps_traversal() {
        let server = MockServer::start().await;
        mount_page(&server, "1", listing_page(&[1])).await;
        mount_page(&server, "2", listing_page(&[2])).await;
        mount_page(&server, "3", listing_page(&[3])).await;

        let collector =
            Collector::new(config(PaginationMode::ForcedQuery).with_max_pages(2)).unwrap();
        let result = collector
            .collect(&format!("{}/pro/dealer", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.pages_visited, 2);
        assert_eq!(result.stop_reason, StopReason::MaxPagesReached);
        assert_eq!(result.links.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_fetches_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(html_response(listing_page(&[1])))
            .expect(0)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let collector = Collector::new(config(PaginationMode::ForcedQuery)).unwrap();
        let result = collector
            .collect(&format!("{}/pro/dealer", server.uri()), &cancel)
            .await
            .unwrap();

        assert_eq!(result.pages_visited, 0);
        assert_eq!(result.stop_reason, StopReason::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_delay() {
        let server = MockServer::start().await;
        mount_page(&server, "1", listing_page(&[1, 2])).await;
        mount_page(&server, "2", listing_page(&[3])).await;

        let cancel = CancellationToken::new();
        let cancel_from_callback = cancel.clone();
        let collector = Collector::new(
            config(PaginationMode::ForcedQuery).with_delay(Duration::from_secs(30)),
        )
        .unwrap()
        .with_page_callback(Arc::new(move |_report: &PageReport| {
            cancel_from_callback.cancel();
        }));

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            collector.collect(&format!("{}/pro/dealer", server.uri()), &cancel),
        )
        .await
        .expect("cancellation should cut the delay short")
        .unwrap();

        assert_eq!(result.pages_visited, 1);
        assert_eq!(result.stop_reason, StopReason::Cancelled);
        assert_eq!(result.links.len(), 2);
    }

    #[tokio::test]
    async fn test_capture_html_and_page_reports() {
        let server = MockServer::start().await;
        mount_page(&server, "1", listing_page(&[1, 2])).await;
        mount_page(&server, "2", listing_page(&[2])).await;

        let reports = Arc::new(AtomicUsize::new(0));
        let reports_clone = reports.clone();
        let collector =
            Collector::new(config(PaginationMode::ForcedQuery).with_capture_html(true))
                .unwrap()
                .with_page_callback(Arc::new(move |report: &PageReport| {
                    assert_eq!(report.page, reports_clone.fetch_add(1, Ordering::SeqCst) + 1);
                }));

        let result = collector
            .collect(&format!("{}/pro/dealer", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reports.load(Ordering::SeqCst), 2);
        assert_eq!(result.captured_pages.len(), 2);
        assert_eq!(result.captured_pages[0].index, 1);
        assert_eq!(result.captured_pages[1].file_name(), "page_002.html");
        assert!(result.captured_pages[0].html.contains("/s-anzeige/felgen-satz/1?"));
        assert!(result.captured_pages[1].url.ends_with("page=2"));
    }

    #[tokio::test]
    async fn test_configured_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pro/dealer"))
            .and(header("cookie", "session=abc"))
            .and(header("user-agent", "linkharvest-test"))
            .and(header("accept-language", "de-DE"))
            .respond_with(html_response(listing_page(&[4])))
            .mount(&server)
            .await;

        let collector = Collector::new(
            config(PaginationMode::Affordance)
                .with_cookie("session=abc")
                .with_user_agent("linkharvest-test")
                .with_accept_language("de-DE"),
        )
        .unwrap();
        let result = collector
            .collect(&format!("{}/pro/dealer", server.uri()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.stop_reason, StopReason::NoNextPage);
        assert_eq!(result.links.len(), 1);
    }
}
