#![allow(dead_code)]

use kipart_sexpr::Sexpr;
use kipart_symbol::{Diagnostics, Part, PinDefaults, PinRecord, PinType, Side, Symbol, SymbolLib, SymbolOptions};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn pin(number: &str, name: &str, pin_type: PinType, side: Side) -> PinRecord {
    PinRecord::new(number, name, 0, &PinDefaults::default())
        .with_type(pin_type)
        .with_side(side)
}

/// Give pins consecutive row indices in the order they are listed.
pub fn part(name: &str, pins: Vec<PinRecord>) -> Part {
    let pins = pins
        .into_iter()
        .enumerate()
        .map(|(i, mut p)| {
            p.row_index = i;
            p
        })
        .collect();
    Part::new(name).with_pins(pins)
}

pub fn build(part: &Part, options: &SymbolOptions) -> Symbol {
    init_logging();
    let mut diagnostics = Diagnostics::new();
    Symbol::build(part, options, &mut diagnostics).unwrap()
}

pub fn library(symbols: &[Symbol]) -> SymbolLib {
    let mut lib = SymbolLib::new();
    for symbol in symbols {
        lib.push(symbol);
    }
    lib
}

/// Rows from comma-separated lines, cells trimmed.
pub fn rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.split(',').map(|c| c.trim().to_string()).collect())
        .collect()
}

/// Reverse the order of everything after the name in symbols and units.
pub fn shuffle(tree: &Sexpr) -> Sexpr {
    match tree {
        Sexpr::List(items) if tree.is_tagged("kicad_symbol_lib") || tree.is_tagged("symbol") => {
            let keep = if tree.is_tagged("symbol") { 2 } else { 1 };
            let (head, tail) = items.split_at(keep.min(items.len()));
            let mut out = head.to_vec();
            out.extend(tail.iter().rev().map(shuffle));
            Sexpr::List(out)
        }
        other => other.clone(),
    }
}

/// Every pin connection point and body corner, as raw atoms.
pub fn grid_coordinates(tree: &Sexpr) -> Vec<String> {
    let mut out = Vec::new();
    collect_coordinates(tree, &mut out);
    out
}

fn collect_coordinates(tree: &Sexpr, out: &mut Vec<String>) {
    let take_xy = |node: Option<&Sexpr>, out: &mut Vec<String>| {
        if let Some(node) = node {
            out.extend(node.atom_at(1).map(str::to_string));
            out.extend(node.atom_at(2).map(str::to_string));
        }
    };
    if tree.is_tagged("pin") {
        take_xy(tree.find_child("at"), out);
    } else if tree.is_tagged("rectangle") {
        take_xy(tree.find_child("start"), out);
        take_xy(tree.find_child("end"), out);
    }
    for child in tree.children() {
        collect_coordinates(child, out);
    }
}

/// True if `mm` is a whole number of 1.27 mm grid steps.
pub fn on_grid(mm: &str) -> bool {
    let Ok(value) = mm.parse::<f64>() else {
        return false;
    };
    let hundredths = value * 100.0;
    let rounded = hundredths.round();
    (hundredths - rounded).abs() < 1e-6 && (rounded as i64) % 127 == 0
}
