use linkharvest::commands::command_argument_builder;
use linkharvest::handlers::{handle_collect, handle_probe, init_tracing};
use linkharvest_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_tracing();

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        Some(("collect", primary_command)) => handle_collect(primary_command).await,
        Some(("probe", primary_command)) => handle_probe(primary_command).await,
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
