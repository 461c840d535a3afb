// Export sinks for collected listing links

use crate::error::{ExportError, Result};
use linkharvest_scanner::{CapturedPage, TraversalResult};
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const LINKS_FILE_STEM: &str = "listing_links";
pub const DEBUG_ARCHIVE_NAME: &str = "html_debug_pages.zip";
pub const SHEET_NAME: &str = "links";
const URL_COLUMN: &str = "url";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Text,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Csv,
        ExportFormat::Text,
        ExportFormat::Json,
        ExportFormat::Xlsx,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "txt" | "text" => Some(ExportFormat::Text),
            "json" => Some(ExportFormat::Json),
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", LINKS_FILE_STEM, self.extension())
    }
}

#[derive(Debug, Serialize)]
struct LinkRecord<'a> {
    url: &'a str,
}

fn records(links: &[String]) -> impl Iterator<Item = LinkRecord<'_>> {
    links.iter().map(|url| LinkRecord { url })
}

/// One `url` column with a header row.
pub fn links_to_csv(links: &[String]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record([URL_COLUMN])?;
    for record in records(links) {
        writer.write_record([record.url])?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

/// Newline-delimited, without a trailing newline.
pub fn links_to_text(links: &[String]) -> Vec<u8> {
    links.join("\n").into_bytes()
}

/// Pretty-printed array of `{"url": ...}` records.
pub fn links_to_json(links: &[String]) -> Result<Vec<u8>> {
    let records: Vec<LinkRecord> = records(links).collect();
    Ok(serde_json::to_vec_pretty(&records)?)
}

fn write_zip<'a>(entries: impl IntoIterator<Item = (String, &'a [u8])>) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, content) in entries {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        writer.start_file(name, options)?;
        writer.write_all(content)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// A workbook with a single sheet named `links` holding the `url` column.
pub fn links_to_xlsx(links: &[String]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    sheet.write_string(0, 0, URL_COLUMN)?;
    for (row, url) in (1u32..).zip(links) {
        sheet.write_string(row, 0, url)?;
    }
    Ok(workbook.save_to_buffer()?)
}

/// Deflated archive with one `page_NNN.html` entry per captured page.
pub fn debug_archive(pages: &[CapturedPage]) -> Result<Vec<u8>> {
    write_zip(
        pages
            .iter()
            .map(|page| (page.file_name(), page.html.as_bytes())),
    )
}

pub fn render(format: ExportFormat, links: &[String]) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => links_to_csv(links),
        ExportFormat::Text => Ok(links_to_text(links)),
        ExportFormat::Json => links_to_json(links),
        ExportFormat::Xlsx => links_to_xlsx(links),
    }
}

/// Write the requested exports into `dir` and return the written paths.
///
/// Link files are only written when at least one link was collected, the
/// debug archive only when pages were captured.
pub fn write_exports(
    dir: &Path,
    result: &TraversalResult,
    formats: &[ExportFormat],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    if !result.links.is_empty() {
        for format in formats {
            let path = dir.join(format.file_name());
            fs::write(&path, render(*format, &result.links)?)?;
            info!("Wrote {} link(s) to {}", result.links.len(), path.display());
            written.push(path);
        }
    }

    if !result.captured_pages.is_empty() {
        let path = dir.join(DEBUG_ARCHIVE_NAME);
        fs::write(&path, debug_archive(&result.captured_pages)?)?;
        info!(
            "Wrote {} captured page(s) to {}",
            result.captured_pages.len(),
            path.display()
        );
        written.push(path);
    }

    Ok(written)
}
