//! Generate KiCad schematic symbols from pin tables and compare symbol
//! libraries structurally.
//!
//! The pipeline is: rows → [`Part`] (pin records) → grouping and ordering →
//! geometry → [`Symbol`] → `(symbol ...)` tree inside a [`SymbolLib`].

pub mod builder;
pub mod compare;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod group;
pub mod library;
pub mod merge;
pub mod part;
pub mod pin;
pub mod rows;
pub mod sort;

use serde::{Deserialize, Serialize};

pub use builder::{PlacedPin, Symbol, Unit};
pub use compare::{libraries_equal, symbols_equal, trees_equal};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{KipartError, Result};
pub use library::SymbolLib;
pub use merge::merge_libraries;
pub use part::{Part, Properties};
pub use pin::{PinDefaults, PinRecord, PinStyle, PinType, Side};
pub use rows::{library_to_rows, parse_part, rows_to_library, symbol_to_rows, Row};
pub use sort::{MixedKey, SortBy};

/// Default position of pin runs along their side: centred.
pub const DEFAULT_PUSH: f64 = 0.5;

/// Knobs for turning pin records into a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolOptions {
    pub sort_by: SortBy,
    pub reverse: bool,
    /// Side, type and style of pins that do not set their own.
    #[serde(flatten)]
    pub defaults: PinDefaults,
    /// Where each side's pins sit along it: 0 at the start, 1 at the end.
    pub push: f64,
    /// Merge same-named power and no-connect pins into one visible pin.
    pub bundle: bool,
    /// Tuck the left/right columns under the top/bottom rows.
    pub scrunch: bool,
    /// Number right and top pins counter-clockwise.
    pub ccw: bool,
    /// Splits `A/B/C` into a primary name and alternate functions.
    pub alt_delimiter: Option<String>,
}

impl Default for SymbolOptions {
    fn default() -> Self {
        SymbolOptions {
            sort_by: SortBy::Row,
            reverse: false,
            defaults: PinDefaults::default(),
            push: DEFAULT_PUSH,
            bundle: false,
            scrunch: false,
            ccw: false,
            alt_delimiter: None,
        }
    }
}

/// Build one symbol and wrap it in a fresh library.
pub fn part_to_library(part: &Part, options: &SymbolOptions) -> Result<SymbolLib> {
    let mut diagnostics = Diagnostics::new();
    let symbol = Symbol::build(part, options, &mut diagnostics)?;
    let mut lib = SymbolLib::new();
    lib.push(&symbol);
    Ok(lib)
}
