use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use linkharvest_core::collect::{CollectOptions, execute_collect};
use linkharvest_core::export::{ExportFormat, write_exports};
use linkharvest_core::report::{generate_collect_report, generate_probe_report};
use linkharvest_scanner::{CancellationToken, Collector, CollectorConfig, PaginationMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

const MAX_DELAY_SECS: f64 = 10.0;

/// Log to stderr, filtered by `RUST_LOG` (default: warnings only).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parse an inter-page delay given in (fractional) seconds.
pub fn parse_delay(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;

    if !(0.0..=MAX_DELAY_SECS).contains(&secs) {
        return Err(format!("delay must be between 0 and {} seconds", MAX_DELAY_SECS));
    }

    Ok(Duration::from_secs_f64(secs))
}

/// Map format names to export formats; no names means every format.
pub fn parse_formats(names: &[String]) -> Result<Vec<ExportFormat>, String> {
    if names.is_empty() {
        return Ok(ExportFormat::ALL.to_vec());
    }

    let mut formats = Vec::new();
    for name in names {
        let format =
            ExportFormat::from_str(name).ok_or_else(|| format!("Unknown export format '{}'", name))?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

/// Expand `~` in the output directory.
pub fn resolve_output_dir(dir: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(dir).as_ref())
}

fn string_arg(args: &ArgMatches, id: &str) -> String {
    args.get_one::<String>(id).cloned().unwrap_or_default()
}

/// Build the request part of the configuration, shared by `collect` and `probe`.
pub fn request_config(args: &ArgMatches) -> CollectorConfig {
    let mut config = CollectorConfig::default()
        .with_user_agent(string_arg(args, "user-agent"))
        .with_accept(string_arg(args, "accept"))
        .with_accept_language(string_arg(args, "accept-language"))
        .with_referer(string_arg(args, "referer"));

    if let Some(cookie) = args.get_one::<String>("cookie") {
        config = config.with_cookie(cookie.as_str());
    }
    config
}

/// Full traversal configuration from the `collect` arguments.
pub fn collect_config(args: &ArgMatches) -> CollectorConfig {
    let pagination = if args.get_flag("follow-next") {
        PaginationMode::Affordance
    } else {
        PaginationMode::ForcedQuery
    };

    request_config(args)
        .with_delay(
            args.get_one::<Duration>("delay")
                .copied()
                .unwrap_or(linkharvest_scanner::config::DEFAULT_DELAY),
        )
        .with_max_pages(args.get_one::<usize>("max-pages").copied().unwrap_or(0))
        .with_pagination(pagination)
        .with_capture_html(args.get_flag("capture-html"))
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{} Stopping after the current page...", "→".yellow().bold());
            cancel_on_signal.cancel();
        }
    });
    cancel
}

async fn run_collect(args: &ArgMatches) -> anyhow::Result<()> {
    let url = args
        .get_one::<Url>("URL")
        .ok_or_else(|| anyhow!("A dealer URL is required"))?;
    let config = collect_config(args);
    let formats = parse_formats(
        &args
            .get_many::<String>("format")
            .map(|values| values.cloned().collect::<Vec<_>>())
            .unwrap_or_default(),
    )
    .map_err(|e| anyhow!(e))?;
    let output_dir = resolve_output_dir(&string_arg(args, "output"));
    let quiet = args.get_flag("quiet");

    if !quiet {
        println!("{} Collecting from {}", "→".blue(), url.as_str().bright_white());
        let mode = match config.pagination {
            PaginationMode::ForcedQuery => "forced ?page=N",
            PaginationMode::Affordance => "follow next links",
        };
        println!("{} Pagination: {}", "→".blue(), mode);
        if config.max_pages > 0 {
            println!("{} Max pages: {}", "→".blue(), config.max_pages);
        }
        println!();
    }

    let options = CollectOptions {
        seed: url.as_str().to_string(),
        config,
        show_progress_bars: !quiet,
    };
    let progress_callback = Arc::new(|msg: String| {
        tracing::info!("{}", msg);
    });

    let result = execute_collect(options, Some(progress_callback), None, cancel_on_ctrl_c())
        .await
        .map_err(|e| anyhow!(e))?;

    print!("{}", generate_collect_report(&result, args.get_flag("print")));

    if result.links.is_empty() {
        println!("{} No listing links found", "⚠".yellow().bold());
    }

    let written = write_exports(&output_dir, &result, &formats)
        .with_context(|| format!("Failed to write exports to {}", output_dir.display()))?;
    for path in written {
        println!("{} {}", "✓".green().bold(), path.display().to_string().bright_white());
    }

    Ok(())
}

pub async fn handle_collect(args: &ArgMatches) {
    if let Err(e) = run_collect(args).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_probe(args: &ArgMatches) -> anyhow::Result<()> {
    let url = args
        .get_one::<Url>("URL")
        .ok_or_else(|| anyhow!("A URL is required"))?;

    let collector = Collector::new(request_config(args))?;
    let report = collector
        .probe(url.as_str())
        .await
        .with_context(|| format!("Probe of {} failed", url))?;

    print!("{}", generate_probe_report(&report));
    if report.consent_wall {
        println!(
            "{} The page looks like a consent wall; try passing --cookie",
            "⚠".yellow().bold()
        );
    }
    Ok(())
}

pub async fn handle_probe(args: &ArgMatches) {
    if let Err(e) = run_probe(args).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}
