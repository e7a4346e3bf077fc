//! Reading pin tables from `.csv` files and `.zip` archives of them.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use kipart_symbol::{KipartError, Row};

/// Rows read from one CSV document.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    /// File or archive member the rows came from.
    pub name: String,
    pub rows: Vec<Row>,
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Read every pin table in `path`.
pub fn read_sources(path: &Path) -> Result<Vec<Source>> {
    match extension(path).as_deref() {
        Some("csv") => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(vec![Source {
                name: path.display().to_string(),
                rows: parse_csv(&text)?,
            }])
        }
        Some("zip") => read_zip(path),
        _ => Err(KipartError::UnsupportedFileExtension(path.display().to_string()).into()),
    }
}

fn read_zip(path: &Path) -> Result<Vec<Source>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read zip archive {}", path.display()))?;

    let mut sources = Vec::new();
    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        if extension(Path::new(&name)).as_deref() != Some("csv") {
            log::debug!("skipping {name} in {}", path.display());
            continue;
        }
        let mut text = String::new();
        member
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to read {name} from {}", path.display()))?;
        sources.push(Source {
            rows: parse_csv(&text).with_context(|| format!("Failed to parse {name}"))?,
            name,
        });
    }

    if sources.is_empty() {
        anyhow::bail!("No .csv files found in {}", path.display());
    }
    Ok(sources)
}

/// The CSV reader drops empty lines, but they separate parts. Turn each one
/// that is not inside a quoted field into a lone comma.
fn mark_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quotes = false;
    for line in text.lines() {
        if !in_quotes && line.trim().is_empty() {
            out.push(',');
        } else {
            out.push_str(line);
        }
        out.push('\n');
        let quotes = line.chars().filter(|&c| c == '"').count();
        if quotes % 2 == 1 {
            in_quotes = !in_quotes;
        }
    }
    out
}

/// Parse CSV text into rows of trimmed cells. Rows may differ in length.
pub fn parse_csv(text: &str) -> Result<Vec<Row>> {
    let text = mark_blank_lines(text.trim_start_matches('\u{feff}'));
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// All rows of all sources, with a blank row between sources.
pub fn join_sources(sources: &[Source]) -> Vec<Row> {
    let mut rows = Vec::new();
    for source in sources {
        if !rows.is_empty() {
            rows.push(Vec::new());
        }
        rows.extend(source.rows.iter().cloned());
    }
    rows
}
