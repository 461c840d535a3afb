use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a traversal stopped. Every variant still carries the links
/// collected up to that point in [`TraversalResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    MaxPagesReached,
    NoNewLinks,
    NoNextPage,
    HttpStatus(u16),
    Transport(String),
    Cancelled,
}

impl StopReason {
    /// True when the run ended because a fetch failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::HttpStatus(_) | StopReason::Transport(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxPagesReached => write!(f, "max pages reached"),
            StopReason::NoNewLinks => write!(f, "no new links"),
            StopReason::NoNextPage => write!(f, "no next page found"),
            StopReason::HttpStatus(code) => write!(f, "HTTP error {}", code),
            StopReason::Transport(msg) => write!(f, "transport error: {}", msg),
            StopReason::Cancelled => write!(f, "cancelled by user"),
        }
    }
}

/// Raw HTML of one visited page, kept for debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedPage {
    /// 1-based page index in visit order.
    pub index: usize,
    pub url: String,
    pub html: String,
}

impl CapturedPage {
    pub fn file_name(&self) -> String {
        format!("page_{:03}.html", self.index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalResult {
    /// Sorted, duplicate-free listing URLs.
    pub links: Vec<String>,
    pub pages_visited: usize,
    pub stop_reason: StopReason,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captured_pages: Vec<CapturedPage>,
}

/// Progress event emitted once per fetched page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    pub page: usize,
    pub url: String,
    pub found: usize,
    pub new_links: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub url: String,
    pub status_code: u16,
    pub body_length: usize,
    pub link_count: usize,
    pub consent_wall: bool,
}
