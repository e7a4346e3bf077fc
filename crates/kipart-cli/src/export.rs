use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use kipart_symbol::{library_to_rows, Row, SymbolLib};

use crate::ui::{icons, Style, StyledText};

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "kilib2csv", version)]
#[command(about = "Convert KiCad symbol libraries into CSV pin tables", long_about = None)]
pub struct Kilib2CsvArgs {
    /// Symbol libraries to convert (.kicad_sym)
    #[arg(value_name = "INPUTS", required = true, value_hint = clap::ValueHint::FilePath)]
    pub inputs: Vec<PathBuf>,

    /// Output CSV file. Only valid with a single input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Allow overwriting an existing CSV file
    #[arg(short = 'w', long)]
    pub overwrite: bool,
}

pub fn execute(args: Kilib2CsvArgs) -> Result<()> {
    if args.output.is_some() && args.inputs.len() > 1 {
        anyhow::bail!("--output can only be used with a single input file");
    }

    let mut has_errors = false;
    for input in &args.inputs {
        let file_name = input.display().to_string();
        match export_file(input, args.output.as_deref(), args.overwrite) {
            Ok(output) => println!(
                "{} {} → {}",
                icons::success(),
                file_name.with_style(Style::Green).bold(),
                output.display()
            ),
            Err(err) => {
                eprintln!(
                    "{} {}: {err:#}",
                    icons::error(),
                    file_name.with_style(Style::Red).bold()
                );
                has_errors = true;
            }
        }
    }

    if has_errors {
        anyhow::bail!("Errors occurred while processing the input files");
    }
    Ok(())
}

fn export_file(input: &Path, output: Option<&Path>, overwrite: bool) -> Result<PathBuf> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("csv"));
    if output.exists() && !overwrite {
        anyhow::bail!(
            "Output file {} already exists. Use -w to replace it.",
            output.display()
        );
    }

    let lib = SymbolLib::from_file(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let rows = library_to_rows(&lib)?;
    write_csv(&output, &rows)?;
    log::debug!("wrote {} rows to {}", rows.len(), output.display());
    Ok(output)
}

/// Write rows of differing lengths as CSV.
pub fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        if row.is_empty() {
            writer.write_record([""])?;
        } else {
            writer.write_record(row)?;
        }
    }
    writer.flush()?;
    Ok(())
}
