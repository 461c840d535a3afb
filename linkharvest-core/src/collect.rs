use indicatif::{ProgressBar, ProgressStyle};
use linkharvest_scanner::{
    CancellationToken, Collector, CollectorConfig, PageCallback, PageReport, TraversalResult,
};
use std::sync::Arc;

/// Options for configuring a collection run
pub struct CollectOptions {
    pub seed: String,
    pub config: CollectorConfig,
    pub show_progress_bars: bool,
}

/// Callback for reporting collection progress
pub type CollectProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for reporting individual pages as they come in
pub type CollectPageCallback = Arc<dyn Fn(PageReport) + Send + Sync>;

/// Human-readable one-liner for a fetched page.
pub fn describe_page(report: &PageReport) -> String {
    format!(
        "Page {}: {} new link(s), {} total ({})",
        report.page, report.new_links, report.total, report.url
    )
}

/// Execute a collection run with the given options
/// Returns the traversal result, including partial results on fetch failure
pub async fn execute_collect(
    options: CollectOptions,
    progress_callback: Option<CollectProgressCallback>,
    page_callback: Option<CollectPageCallback>,
    cancel: CancellationToken,
) -> Result<TraversalResult, String> {
    let CollectOptions {
        seed,
        config,
        show_progress_bars,
    } = options;

    // Spinner for overall progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .map_err(|e| e.to_string())?,
        );
        pb.set_message(format!("Fetching {}", seed));
        Some(Arc::new(pb))
    } else {
        None
    };

    let pb_clone = progress_bar.clone();
    let progress_clone = progress_callback.clone();
    let internal_page_callback: PageCallback = Arc::new(move |report: &PageReport| {
        let line = describe_page(report);
        if let Some(ref pb) = pb_clone {
            pb.set_message(format!(
                "Page {} done, {} links so far",
                report.page, report.total
            ));
            pb.tick();
        }
        if let Some(ref callback) = progress_clone {
            callback(line);
        }
        if let Some(ref callback) = page_callback {
            callback(report.clone());
        }
    });

    let collector = Collector::new(config)
        .map_err(|e| e.to_string())?
        .with_page_callback(internal_page_callback);

    let result = collector.collect(&seed, &cancel).await;

    if let Some(ref pb) = progress_bar {
        match &result {
            Ok(result) => pb.finish_with_message(format!(
                "Collection finished: {} links from {} page(s)",
                result.links.len(),
                result.pages_visited
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    let result = result.map_err(|e| e.to_string())?;
    if let Some(ref callback) = progress_callback
        && result.stop_reason.is_failure()
    {
        callback(format!("[!] Stopped early: {}", result.stop_reason));
    }

    Ok(result)
}
