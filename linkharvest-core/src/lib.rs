pub mod collect;
pub mod error;
pub mod export;
pub mod report;

use colored::Colorize;

pub use error::ExportError;

pub fn print_banner() {
    println!(
        "{} {}",
        "linkharvest".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    println!("{}", "Collects every listing link from a dealer page.".bright_black());
    println!();
}
