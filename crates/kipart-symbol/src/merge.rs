use std::collections::HashSet;

use itertools::Itertools;

use crate::error::{KipartError, Result};
use crate::library::{symbol_name, SymbolLib};

/// Union the symbols of two libraries.
///
/// The result keeps `base`'s header. A symbol present in both libraries is a
/// [`KipartError::DuplicateSymbolConflict`] unless `allow_overwrite` is set,
/// in which case the version from `incoming` wins. Symbols of `base` keep
/// their order and come first, followed by the symbols of `incoming`.
pub fn merge_libraries(
    base: &SymbolLib,
    incoming: &SymbolLib,
    allow_overwrite: bool,
) -> Result<SymbolLib> {
    let incoming_names: HashSet<&str> = incoming.symbol_names().collect();
    let conflicts: Vec<String> = base
        .symbol_names()
        .filter(|name| incoming_names.contains(name))
        .unique()
        .sorted()
        .map(str::to_string)
        .collect();

    if !conflicts.is_empty() {
        if !allow_overwrite {
            return Err(KipartError::DuplicateSymbolConflict(conflicts));
        }
        log::debug!("replacing symbols: {}", conflicts.join(", "));
    }

    let mut merged = base.empty_like();
    for symbol in base.symbols() {
        let replaced = symbol_name(symbol).is_some_and(|name| incoming_names.contains(name));
        if !replaced {
            merged.push_tree(symbol.clone());
        }
    }
    for symbol in incoming.symbols() {
        merged.push_tree(symbol.clone());
    }
    Ok(merged)
}
