use crate::CLAP_STYLING;
use clap::{arg, command};
use linkharvest_scanner::config::{
    DEFAULT_ACCEPT, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_REFERER, DEFAULT_USER_AGENT,
};
use url::Url;

/// Header flags shared by `collect` and `probe`.
fn request_args() -> Vec<clap::Arg> {
    vec![
        arg!(--"user-agent" <UA>)
            .required(false)
            .help("User-Agent header")
            .default_value(DEFAULT_USER_AGENT),
        arg!(--"accept" <ACCEPT>)
            .required(false)
            .help("Accept header")
            .default_value(DEFAULT_ACCEPT),
        arg!(--"accept-language" <LANG>)
            .required(false)
            .help("Accept-Language header")
            .default_value(DEFAULT_ACCEPT_LANGUAGE),
        arg!(--"referer" <URL>)
            .required(false)
            .help("Referer header (empty to omit)")
            .default_value(DEFAULT_REFERER),
        arg!(--"cookie" <COOKIE>)
            .required(false)
            .help("Raw Cookie header, sent verbatim with every request"),
    ]
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkharvest")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkharvest")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            command!("collect")
                .about(
                    "Collect every listing link from a dealer page, following its pagination, \
                and export the result.",
                )
                .arg(
                    arg!(<URL>)
                        .help("The dealer page to start from")
                        .value_parser(clap::value_parser!(Url)),
                )
                .args(request_args())
                .arg(
                    arg!(--"delay" <SECONDS>)
                        .required(false)
                        .help("Pause between page fetches, in seconds (0-10)")
                        .value_parser(crate::handlers::parse_delay)
                        .default_value("0.8"),
                )
                .arg(
                    arg!(--"max-pages" <N>)
                        .required(false)
                        .help("Stop after this many pages (0 = until the end)")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("0"),
                )
                .arg(
                    arg!(--"follow-next")
                        .required(false)
                        .help("Follow rel=next links and 'next' buttons instead of counting ?page=N")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"capture-html")
                        .required(false)
                        .help("Keep the raw HTML of every visited page in a debug archive")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Directory to write exports into")
                        .default_value("."),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Export format, repeatable: csv, txt, json, xlsx (default: all)")
                        .value_parser(["csv", "txt", "json", "xlsx"])
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"print")
                        .required(false)
                        .help("List the collected links in the terminal report")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("probe")
                .about(
                    "Fetch a single page and report status, size, link count and whether it \
                looks like a cookie-consent wall.",
                )
                .arg(
                    arg!(<URL>)
                        .help("The page to probe")
                        .value_parser(clap::value_parser!(Url)),
                )
                .args(request_args()),
        )
}
