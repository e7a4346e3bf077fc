use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use kipart_symbol::library::LIBRARY_EXTENSION;
use kipart_symbol::{
    merge_libraries, rows_to_library, Diagnostics, PinStyle, PinType, Side, SortBy, SymbolLib,
    SymbolOptions,
};

use crate::config::Config;
use crate::input::{join_sources, read_sources};
use crate::ui::{self, icons, Style, StyledText};

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "kipart", version)]
#[command(about = "Convert CSV pin tables into KiCad symbol libraries", long_about = None)]
pub struct KipartArgs {
    /// Pin tables to convert (.csv, or .zip archives of .csv files)
    #[arg(value_name = "INPUTS", required = true, value_hint = clap::ValueHint::FilePath)]
    pub inputs: Vec<PathBuf>,

    /// Output library (.kicad_sym). Defaults to the input name with a
    /// .kicad_sym extension.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Allow changes to an existing library; same-named symbols are replaced
    #[arg(short = 'w', long)]
    pub overwrite: bool,

    /// Merge symbols into an existing library (implies --overwrite)
    #[arg(short = 'a', long, visible_short_alias = 'm', visible_alias = "merge")]
    pub append: bool,

    /// Order of pins along each side: row, num or name
    #[arg(short, long, value_name = "ORDER")]
    pub sort: Option<SortBy>,

    /// Reverse the pin order
    #[arg(short, long)]
    pub reverse: bool,

    /// Side for pins that do not name one
    #[arg(long)]
    pub side: Option<Side>,

    /// Electrical type for pins that do not name one
    #[arg(long = "type", value_name = "TYPE")]
    pub pin_type: Option<PinType>,

    /// Graphic style for pins that do not name one
    #[arg(long)]
    pub style: Option<PinStyle>,

    /// Position of the pins along each side (0 = start, 0.5 = centred, 1 = end)
    #[arg(long)]
    pub push: Option<f64>,

    /// Split pin names into alternate functions at this delimiter
    #[arg(long, value_name = "DELIMITER")]
    pub alt_delimiter: Option<String>,

    /// Bundle same-named power and no-connect pins into one pin
    #[arg(short, long)]
    pub bundle: bool,

    /// Tuck left and right pins under the top and bottom rows
    #[arg(long)]
    pub scrunch: bool,

    /// Number pins counter-clockwise around the symbol
    #[arg(long)]
    pub ccw: bool,

    /// Fail a file on any malformed row instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Read default options from this file instead of ./kipart.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Resolve options: flags over config file over built-in defaults.
pub fn symbol_options(args: &KipartArgs, config: &Config) -> Result<SymbolOptions> {
    let mut options = SymbolOptions::default();
    config.defaults.apply(&mut options)?;

    if let Some(sort) = args.sort {
        options.sort_by = sort;
    }
    if let Some(side) = args.side {
        options.defaults.side = side;
    }
    if let Some(pin_type) = args.pin_type {
        options.defaults.pin_type = pin_type;
    }
    if let Some(style) = args.style {
        options.defaults.style = style;
    }
    if let Some(push) = args.push {
        options.push = push;
    }
    if let Some(delimiter) = &args.alt_delimiter {
        options.alt_delimiter = Some(delimiter.clone());
    }
    options.reverse |= args.reverse;
    options.bundle |= args.bundle;
    options.scrunch |= args.scrunch;
    options.ccw |= args.ccw;

    if !(0.0..=1.0).contains(&options.push) {
        anyhow::bail!(
            "--push value must be between 0.0 and 1.0 inclusive, got {}",
            options.push
        );
    }
    Ok(options)
}

fn check_library_path(path: &Path) -> Result<()> {
    if path.extension().and_then(|e| e.to_str()) != Some(LIBRARY_EXTENSION) {
        anyhow::bail!(
            "Output file {} must have a .{LIBRARY_EXTENSION} extension",
            path.display()
        );
    }
    Ok(())
}

pub fn execute(mut args: KipartArgs) -> Result<()> {
    let config = Config::discover(args.config.as_deref())?;
    let options = symbol_options(&args, &config)?;

    // Merging always allows changes to the output.
    if args.append {
        args.overwrite = true;
        if args.output.is_none() {
            args.output = args
                .inputs
                .first()
                .map(|input| input.with_extension(LIBRARY_EXTENSION));
        }
    }

    if let Some(output) = &args.output {
        check_library_path(output)?;
        if output.exists() && !args.overwrite {
            anyhow::bail!(
                "Output file {} already exists. Use -w to allow changes to it.",
                output.display()
            );
        }
    }

    let mut overwrite = args.overwrite;
    let mut has_errors = false;
    for input in &args.inputs {
        let file_name = input.display().to_string();
        match convert(input, args.output.as_deref(), overwrite, &options, args.strict) {
            Ok((output, count)) => {
                let verb = if args.append { "merged into" } else { "→" };
                println!(
                    "{} {} {verb} {} ({count} symbols)",
                    icons::success(),
                    file_name.with_style(Style::Green).bold(),
                    output.display()
                );
                // Later inputs sharing the output are merged into it.
                if args.output.is_some() {
                    overwrite = true;
                }
            }
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

/// Convert one input file. Returns the library written and how many symbols
/// came from this input.
fn convert(
    input: &Path,
    output: Option<&Path>,
    overwrite: bool,
    options: &SymbolOptions,
    strict: bool,
) -> Result<(PathBuf, usize)> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension(LIBRARY_EXTENSION));
    if output.exists() && !overwrite {
        anyhow::bail!(
            "Output file {} already exists and overwriting has not been enabled",
            output.display()
        );
    }

    let sources = read_sources(input)?;
    let rows = join_sources(&sources);
    let mut diagnostics = if strict {
        Diagnostics::strict()
    } else {
        Diagnostics::new()
    };
    let built = rows_to_library(&rows, options, &mut diagnostics);
    ui::report(&diagnostics);
    let mut lib = built.context("No symbols could be built")?;
    if strict && diagnostics.has_errors() {
        anyhow::bail!("Rejected in strict mode");
    }
    let count = lib.len();

    if output.exists() {
        match SymbolLib::from_file(&output) {
            Ok(existing) => lib = merge_libraries(&existing, &lib, true)?,
            Err(err) => {
                log::warn!("could not merge into {}: {err}", output.display());
                eprintln!(
                    "{} Could not merge with existing library {} ({err}); replacing it",
                    icons::warning(),
                    output.display().to_string().with_style(Style::Yellow)
                );
            }
        }
    }

    lib.write(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok((output, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Defaults;

    fn args(extra: &[&str]) -> KipartArgs {
        let mut argv = vec!["kipart"];
        argv.extend_from_slice(extra);
        argv.push("parts.csv");
        KipartArgs::parse_from(argv)
    }

    #[test]
    fn flags_parse() {
        let a = args(&["-s", "num", "-r", "--type", "pwr", "--side", "t", "-b", "-m"]);
        assert_eq!(a.sort, Some(SortBy::Num));
        assert!(a.reverse && a.bundle && a.append);
        assert_eq!(a.pin_type, Some(PinType::PowerIn));
        assert_eq!(a.side, Some(Side::Top));
        assert!(KipartArgs::try_parse_from(["kipart", "--type", "bogus", "x.csv"]).is_err());
        assert!(KipartArgs::try_parse_from(["kipart"]).is_err());
    }

    #[test]
    fn flags_win_over_config() {
        let config = Config {
            defaults: Defaults {
                sort: Some("name".into()),
                side: Some("right".into()),
                scrunch: Some(true),
                ..Defaults::default()
            },
        };
        let options = symbol_options(&args(&["-s", "num"]), &config).unwrap();
        assert_eq!(options.sort_by, SortBy::Num);
        assert_eq!(options.defaults.side, Side::Right);
        assert!(options.scrunch);
        assert_eq!(options.push, 0.5);
    }

    #[test]
    fn push_is_range_checked() {
        assert!(symbol_options(&args(&["--push", "1.5"]), &Config::default()).is_err());
        assert!(symbol_options(&args(&["--push", "1"]), &Config::default()).is_ok());
    }

    #[test]
    fn output_must_be_a_symbol_library() {
        assert!(check_library_path(Path::new("out.kicad_sym")).is_ok());
        assert!(check_library_path(Path::new("out.lib")).is_err());
    }
}
