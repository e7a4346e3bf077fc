//! Spreadsheet-style rows in and out.
//!
//! A part is a block of rows separated from the next by a blank row:
//!
//! ```text
//! LM358
//! Reference:, U
//! Footprint:, Package_SO:SOIC-8
//! pin, name, type, side
//! 1, OUT_A, output, right
//! 2, IN-_A, input, left
//! ```

use kipart_sexpr::Sexpr;

use crate::builder::Symbol;
use crate::compare::is_hidden;
use crate::diagnostics::Diagnostics;
use crate::error::{KipartError, Result};
use crate::library::{symbol_name, SymbolLib};
use crate::part::{canonical_property_name, Part};
use crate::pin::{parse_yes_no, PinOverrides, PinRecord, Side};
use crate::SymbolOptions;

pub type Row = Vec<String>;

pub const PIN_COLUMNS: [&str; 7] = ["pin", "name", "type", "side", "unit", "style", "hidden"];
const REQUIRED_COLUMNS: [&str; 2] = ["pin", "name"];

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Cells of a row without trailing empty cells.
fn trimmed(row: &[String]) -> &[String] {
    let len = row
        .iter()
        .rposition(|cell| !cell.trim().is_empty())
        .map_or(0, |i| i + 1);
    &row[..len]
}

/// Split rows into per-part blocks at blank rows.
pub fn split_parts(rows: &[Row]) -> Vec<&[Row]> {
    rows.split(|row| is_blank(row))
        .filter(|block| !block.is_empty())
        .collect()
}

#[derive(Debug, Default)]
struct ColumnMap {
    pin: usize,
    name: usize,
    unit: Option<usize>,
    side: Option<usize>,
    pin_type: Option<usize>,
    style: Option<usize>,
    hidden: Option<usize>,
}

impl ColumnMap {
    fn from_header(part: &str, header: &[String]) -> Result<Self> {
        let labels: Vec<String> = trimmed(header)
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect();
        if let Some(unknown) = labels.iter().find(|l| !PIN_COLUMNS.contains(&l.as_str())) {
            return Err(KipartError::UnknownColumn {
                part: part.to_string(),
                column: unknown.clone(),
            });
        }
        let find = |column: &str| labels.iter().position(|l| l == column);
        for required in REQUIRED_COLUMNS {
            if find(required).is_none() {
                return Err(KipartError::MissingColumn {
                    part: part.to_string(),
                    column: required.to_string(),
                });
            }
        }
        Ok(ColumnMap {
            pin: find("pin").unwrap_or_default(),
            name: find("name").unwrap_or_default(),
            unit: find("unit"),
            side: find("side"),
            pin_type: find("type"),
            style: find("style"),
            hidden: find("hidden"),
        })
    }
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(|c| c.trim()).unwrap_or_default()
}

fn optional_cell(row: &[String], column: Option<usize>) -> Option<&str> {
    column.map(|c| cell(row, c)).filter(|c| !c.is_empty())
}

/// Parse the cell of an optional column, leaving the default when it is empty.
fn parse_cell<T>(
    row: &[String],
    column: Option<usize>,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<Option<T>> {
    optional_cell(row, column).map(parse).transpose()
}

/// Skip a bad row with a warning, or fail in strict mode.
fn recover(part: &str, err: KipartError, diagnostics: &mut Diagnostics) -> Result<()> {
    if diagnostics.is_strict() {
        return Err(err);
    }
    diagnostics.warn_once(part, format!("{err}; row skipped"));
    Ok(())
}

/// Read one part block: name row, `Label:` property rows, header, pins.
pub fn parse_part(
    block: &[Row],
    options: &SymbolOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Part> {
    let name = block
        .first()
        .and_then(|row| row.first())
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if name.is_empty() {
        return Err(KipartError::InvalidPartName(name));
    }
    let mut part = Part::new(&name);

    let mut rest = &block[1..];
    while let Some(row) = rest.first() {
        let cells = trimmed(row);
        let label = cells.first().map(|c| c.trim()).unwrap_or_default();
        if cells.len() > 2 || !label.ends_with(':') {
            break;
        }
        let label = &label[..label.len() - 1];
        let canonical =
            canonical_property_name(label).ok_or_else(|| KipartError::InvalidProperty {
                part: name.clone(),
                label: label.to_string(),
            })?;
        // An empty value leaves the default in place.
        let value = cell(cells, 1);
        if !value.is_empty() {
            part.properties.set(canonical, value);
        }
        rest = &rest[1..];
    }

    let Some((header, pin_rows)) = rest.split_first() else {
        return Err(KipartError::MissingColumn {
            part: name,
            column: "pin".to_string(),
        });
    };
    let columns = ColumnMap::from_header(&name, header)?;
    // Rows are numbered from 1 at the part name.
    let first_row = block.len() - pin_rows.len() + 1;

    for (index, row) in pin_rows.iter().enumerate() {
        let row_number = first_row + index;
        let number = cell(row, columns.pin);
        if number.is_empty() {
            let err = KipartError::MissingPinNumber {
                part: name.clone(),
                row: row_number,
            };
            recover(&name, err, diagnostics)?;
            continue;
        }
        match read_overrides(row, &columns) {
            Ok(overrides) => {
                let pin = PinRecord::new(number, cell(row, columns.name), index, &options.defaults)
                    .with_overrides(overrides);
                part.pins.push(pin);
            }
            Err(err) => {
                let err = KipartError::malformed(&name, row_number, err.to_string());
                recover(&name, err, diagnostics)?;
            }
        }
    }

    if part.pins.iter().all(|p| p.real_number().is_empty()) {
        return Err(KipartError::NoPins(name));
    }
    Ok(part)
}

fn read_overrides(row: &[String], columns: &ColumnMap) -> Result<PinOverrides> {
    Ok(PinOverrides {
        unit: optional_cell(row, columns.unit).map(str::to_string),
        side: parse_cell(row, columns.side, str::parse)?,
        pin_type: parse_cell(row, columns.pin_type, str::parse)?,
        style: parse_cell(row, columns.style, str::parse)?,
        hidden: parse_cell(row, columns.hidden, parse_yes_no)?,
    })
}

/// Build a library from every part found in `rows`.
///
/// A part that cannot be read or built is reported as an error diagnostic
/// and skipped; the library fails only if no part survives. A part name seen
/// again replaces the earlier part with a warning.
pub fn rows_to_library(
    rows: &[Row],
    options: &SymbolOptions,
    diagnostics: &mut Diagnostics,
) -> Result<SymbolLib> {
    let mut lib = SymbolLib::new();
    for block in split_parts(rows) {
        let origin = block
            .first()
            .and_then(|row| row.first())
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| "<unnamed>".to_string());
        let built = parse_part(block, options, diagnostics)
            .and_then(|part| Symbol::build(&part, options, diagnostics));
        match built {
            Ok(symbol) => {
                if lib.push(&symbol).is_some() {
                    diagnostics.warn_once(
                        &origin,
                        "part defined more than once; the later definition replaces the earlier one",
                    );
                }
            }
            Err(err) => diagnostics.error(&origin, err.to_string()),
        }
    }
    if lib.is_empty() {
        return Err(KipartError::NoSymbols);
    }
    Ok(lib)
}

/// Unit number encoded in a unit id `<part>_<unit>_<variant>`.
fn unit_number(symbol: &str, unit_id: &str) -> Option<String> {
    let rest = unit_id.strip_prefix(symbol)?.strip_prefix('_')?;
    let (unit, _variant) = rest.split_once('_')?;
    Some(unit.to_string())
}

fn pin_row(pin: &Sexpr, unit: &str) -> Result<Row> {
    let at = pin.find_child("at");
    let angle = at
        .and_then(|at| at.atom_at(3))
        .unwrap_or("0")
        .parse::<f64>()
        .ok()
        .and_then(Side::from_angle);
    let Some(side) = angle else {
        let raw = at.map(Sexpr::to_compact_string).unwrap_or_default();
        return Err(KipartError::invalid_value("pin orientation", raw));
    };

    let name_and_number_hidden = ["name", "number"].iter().all(|tag| {
        pin.find_child(tag)
            .and_then(|n| n.find_child("effects"))
            .is_some_and(is_hidden)
    });
    let hidden = is_hidden(pin) || name_and_number_hidden;

    Ok(vec![
        pin.child_value("number").unwrap_or_default().to_string(),
        pin.child_value("name").unwrap_or_default().to_string(),
        pin.atom_at(1).unwrap_or_default().to_string(),
        side.to_string(),
        unit.to_string(),
        pin.atom_at(2).unwrap_or_default().to_string(),
        if hidden { "yes" } else { "no" }.to_string(),
    ])
}

/// Rows describing one `(symbol ...)` tree, readable by [`parse_part`].
pub fn symbol_to_rows(symbol: &Sexpr) -> Result<Vec<Row>> {
    let name = symbol_name(symbol)
        .ok_or_else(|| KipartError::invalid_value("symbol", symbol.to_compact_string()))?;

    let mut rows = vec![vec![name.to_string(), String::new()]];
    for property in symbol.find_children("property") {
        let key = property.atom_at(1).unwrap_or_default();
        let value = property.atom_at(2).unwrap_or_default();
        rows.push(vec![format!("{key}:"), value.to_string()]);
    }
    rows.push(PIN_COLUMNS.iter().map(|c| c.to_string()).collect());

    for (index, unit) in symbol.find_children("symbol").enumerate() {
        let unit_id = unit.atom_at(1).unwrap_or_default();
        let unit_label = unit_number(name, unit_id).unwrap_or_else(|| (index + 1).to_string());
        for pin in unit.find_children("pin") {
            rows.push(pin_row(pin, &unit_label)?);
        }
    }
    Ok(rows)
}

/// Rows for a whole library: symbols sorted by name, separated by blank rows.
pub fn library_to_rows(lib: &SymbolLib) -> Result<Vec<Row>> {
    let mut symbols: Vec<&Sexpr> = lib.symbols().iter().collect();
    symbols.sort_by_key(|s| symbol_name(*s).unwrap_or_default());

    let mut rows = Vec::new();
    for (i, symbol) in symbols.into_iter().enumerate() {
        if i > 0 {
            rows.push(Vec::new());
        }
        rows.extend(symbol_to_rows(symbol)?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::{PinStyle, PinType};

    fn rows(text: &str) -> Vec<Row> {
        text.lines()
            .map(|line| line.split(',').map(|c| c.trim().to_string()).collect())
            .collect()
    }

    #[test]
    fn blocks_split_on_blank_rows() {
        let input = rows("A\npin,name\n1,X\n,,\n\nB\npin,name\n2,Y");
        let blocks = split_parts(&input);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1][0][0], "B");
    }

    #[test]
    fn reads_properties_and_pins() {
        let input = rows(
            "LM358,\nref:,IC\nFP:,SOIC-8\npin,name,type,side,style,unit,hidden,\n1,OUT,out,r,,A,\n2,IN,,,~,,yes",
        );
        let part = parse_part(&input, &SymbolOptions::default(), &mut Diagnostics::new()).unwrap();
        assert_eq!(part.name, "LM358");
        assert_eq!(part.reference(), "IC");
        assert_eq!(part.properties.get("Footprint"), Some("SOIC-8"));
        assert_eq!(part.pins.len(), 2);

        let out = &part.pins[0];
        assert_eq!((out.pin_type, out.side, out.unit.as_str()), (PinType::Output, Side::Right, "A"));
        let inp = &part.pins[1];
        assert_eq!(inp.pin_type, PinType::Passive);
        assert_eq!(inp.side, Side::Left);
        assert_eq!(inp.style, PinStyle::Inverted);
        assert_eq!(inp.unit, "1");
        assert!(inp.hidden);
    }

    #[test]
    fn empty_property_values_keep_defaults() {
        let input = rows("X\nref:,\nval:,\ndatasheet:,http://x\npin,name\n1,A");
        let part = parse_part(&input, &SymbolOptions::default(), &mut Diagnostics::new()).unwrap();
        assert_eq!(part.reference(), "U");
        assert_eq!(part.properties.get("Value"), None);
        assert_eq!(part.properties.get("Datasheet"), Some("http://x"));

        let symbol = Symbol::build(&part, &SymbolOptions::default(), &mut Diagnostics::new()).unwrap();
        assert_eq!(symbol.properties.get("Reference"), Some("U"));
        assert_eq!(symbol.properties.get("Value"), Some("X"));
    }

    #[test]
    fn header_problems() {
        let opts = SymbolOptions::default();
        let err = parse_part(&rows("X\npin,label\n1,A"), &opts, &mut Diagnostics::new());
        assert!(matches!(err, Err(KipartError::UnknownColumn { column, .. }) if column == "label"));
        let err = parse_part(&rows("X\npin,type\n1,in"), &opts, &mut Diagnostics::new());
        assert!(matches!(err, Err(KipartError::MissingColumn { column, .. }) if column == "name"));
        let err = parse_part(&rows("X\ncolour:,red\npin,name\n1,A"), &opts, &mut Diagnostics::new());
        assert!(matches!(err, Err(KipartError::InvalidProperty { .. })));
        let err = parse_part(&rows("X\nref:,U"), &opts, &mut Diagnostics::new());
        assert!(matches!(err, Err(KipartError::MissingColumn { .. })));
    }

    #[test]
    fn bad_rows_are_skipped_with_a_warning() {
        let input = rows("X\npin,name,type\n1,A,in\n,B,in\n3,C,bogus\n4,D,");
        let mut diags = Diagnostics::new();
        let part = parse_part(&input, &SymbolOptions::default(), &mut diags).unwrap();
        let numbers: Vec<&str> = part.pins.iter().map(|p| p.number.as_str()).collect();
        assert_eq!(numbers, ["1", "4"]);
        assert_eq!(diags.iter().count(), 2);
        assert!(!diags.has_errors());
    }

    #[test]
    fn strict_mode_fails_on_bad_rows() {
        let input = rows("X\npin,name\n,B\n2,C");
        let err = parse_part(&input, &SymbolOptions::default(), &mut Diagnostics::strict());
        assert!(matches!(err, Err(KipartError::MissingPinNumber { row: 3, .. })));
    }

    #[test]
    fn spacers_only_part() {
        let err = parse_part(&rows("X\npin,name\n**,\n*,"), &SymbolOptions::default(), &mut Diagnostics::new());
        assert!(matches!(err, Err(KipartError::NoPins(_))));
    }

    #[test]
    fn library_skips_broken_parts() {
        let input = rows("A\npin,name\n1,X\n\nB\npin,bogus\n1,Y");
        let mut diags = Diagnostics::new();
        let lib = rows_to_library(&input, &SymbolOptions::default(), &mut diags).unwrap();
        assert_eq!(lib.symbol_names().collect::<Vec<_>>(), ["A"]);
        assert!(diags.has_errors());

        let err = rows_to_library(&rows("B\npin,bogus\n1,Y"), &SymbolOptions::default(), &mut Diagnostics::new());
        assert!(matches!(err, Err(KipartError::NoSymbols)));
    }

    #[test]
    fn symbol_back_to_rows() {
        let input = rows("U1\npin,name,type,side,unit\n1,A,in,left,1\n2,B,out,top,2\n3,C,pwr,bottom,2");
        let lib = rows_to_library(&input, &SymbolOptions::default(), &mut Diagnostics::new()).unwrap();
        let out = library_to_rows(&lib).unwrap();
        assert_eq!(out[0], ["U1", ""]);
        assert_eq!(out[1], ["Reference:", "U"]);
        let header = out.iter().position(|r| r[0] == "pin").unwrap();
        assert_eq!(header, 9);
        assert_eq!(out[header + 1], ["1", "A", "input", "left", "1", "line", "no"]);
        assert_eq!(out[header + 2], ["2", "B", "output", "top", "2", "line", "no"]);
        assert_eq!(out[header + 3], ["3", "C", "power_in", "bottom", "2", "line", "no"]);
    }

    #[test]
    fn unit_numbers_from_ids() {
        assert_eq!(unit_number("U1", "U1_3_1"), Some("3".to_string()));
        assert_eq!(unit_number("U1_A", "U1_A_2_1"), Some("2".to_string()));
        assert_eq!(unit_number("U1", "OTHER_1_1"), None);
    }
}
