use crate::paginate::PaginationMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "de-DE,de;q=0.9,en-US;q=0.8,en;q=0.7";
pub const DEFAULT_REFERER: &str = "https://www.kleinanzeigen.de/";
pub const DEFAULT_DELAY: Duration = Duration::from_millis(800);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything one traversal needs to know. Built once, never mutated
/// while a traversal runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub referer: String,
    /// Raw `Cookie` header, sent verbatim.
    pub cookie: Option<String>,
    /// Pause between two page fetches.
    pub delay: Duration,
    /// Page cap; 0 means unbounded.
    pub max_pages: usize,
    pub pagination: PaginationMode,
    pub capture_html: bool,
    pub timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            cookie: None,
            delay: DEFAULT_DELAY,
            max_pages: 0,
            pagination: PaginationMode::ForcedQuery,
            capture_html: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CollectorConfig {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    pub fn with_accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.accept_language = accept_language.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    /// Blank cookie strings are treated as "no cookie".
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        let cookie = cookie.into();
        let cookie = cookie.trim();
        self.cookie = (!cookie.is_empty()).then(|| cookie.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationMode) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_capture_html(mut self, capture_html: bool) -> Self {
        self.capture_html = capture_html;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn page_cap_reached(&self, pages_visited: usize) -> bool {
        self.max_pages > 0 && pages_visited >= self.max_pages
    }
}
