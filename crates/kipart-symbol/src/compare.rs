//! Order-independent comparison of symbol and library trees.
//!
//! Two trees are equal when they describe the same symbols, even if
//! properties, units, pins or graphic items appear in a different order or
//! numbers are written differently (`2.54` vs `2.540`). Comparisons never
//! fail; any shape mismatch simply makes them unequal.

use std::collections::{BTreeMap, BTreeSet};

use kipart_sexpr::Sexpr;

use crate::library::LIBRARY_TAG;

/// Compare two trees, dispatching on the root tag.
pub fn trees_equal(a: &Sexpr, b: &Sexpr) -> bool {
    match (a.tag(), b.tag()) {
        (Some(LIBRARY_TAG), Some(LIBRARY_TAG)) => libraries_equal(a, b),
        (Some("symbol"), Some("symbol")) => symbols_equal(a, b),
        _ => nodes_equal(a, b),
    }
}

/// Atoms are equal if their text matches or both are the same number.
/// Quoting is ignored.
pub fn atoms_equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Exact structural comparison, atoms compared by value.
fn nodes_equal(a: &Sexpr, b: &Sexpr) -> bool {
    match (a.as_atom(), b.as_atom()) {
        (Some(x), Some(y)) => atoms_equal(x, y),
        (None, None) => match (a.as_list(), b.as_list()) {
            (Some(xs), Some(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| nodes_equal(x, y))
            }
            _ => false,
        },
        _ => false,
    }
}

/// Canonical text of an atom for use as a map key.
fn atom_key(atom: &str) -> String {
    match atom.parse::<f64>() {
        Ok(n) if n == 0.0 => "0".to_string(),
        Ok(n) => n.to_string(),
        Err(_) => atom.to_string(),
    }
}

/// Pair up items of `a` and `b` by key and compare the pairs. Items sharing
/// a key, and items without one, are matched as a multiset.
fn match_by_key<'a, K, F, C>(a: &[&'a Sexpr], b: &[&'a Sexpr], key: F, cmp: C) -> bool
where
    K: Ord,
    F: Fn(&'a Sexpr) -> Option<K>,
    C: Fn(&Sexpr, &Sexpr) -> bool,
{
    if a.len() != b.len() {
        return false;
    }
    let group = |items: &[&'a Sexpr]| {
        let mut groups: BTreeMap<Option<K>, Vec<&'a Sexpr>> = BTreeMap::new();
        for &item in items {
            groups.entry(key(item)).or_default().push(item);
        }
        groups
    };
    let (a, b) = (group(a), group(b));
    a.len() == b.len()
        && a.iter()
            .all(|(k, xs)| b.get(k).is_some_and(|ys| same_multiset(xs, ys, &cmp)))
}

/// Every item of `xs` pairs with a distinct equal item of `ys`.
fn same_multiset<C>(xs: &[&Sexpr], ys: &[&Sexpr], cmp: &C) -> bool
where
    C: Fn(&Sexpr, &Sexpr) -> bool,
{
    if xs.len() != ys.len() {
        return false;
    }
    let mut unmatched: Vec<&Sexpr> = ys.to_vec();
    xs.iter().all(|x| match unmatched.iter().position(|y| cmp(*x, *y)) {
        Some(index) => {
            unmatched.swap_remove(index);
            true
        }
        None => false,
    })
}

/// Compare two `(kicad_symbol_lib ...)` trees: versions as integers, symbols
/// by name.
pub fn libraries_equal(a: &Sexpr, b: &Sexpr) -> bool {
    if !a.is_tagged(LIBRARY_TAG) || !b.is_tagged(LIBRARY_TAG) {
        return false;
    }
    let version = |t: &Sexpr| t.child_value("version").and_then(|v| v.parse::<i64>().ok());
    match (version(a), version(b)) {
        (Some(x), Some(y)) if x == y => {}
        _ => return false,
    }

    let a_symbols: Vec<&Sexpr> = a.find_children("symbol").collect();
    let b_symbols: Vec<&Sexpr> = b.find_children("symbol").collect();
    let equal = match_by_key(
        &a_symbols,
        &b_symbols,
        |s| s.atom_at(1).map(str::to_string),
        symbols_equal,
    );
    if !equal {
        log::debug!("libraries differ in their symbols");
    }
    equal
}

/// Compare two `(symbol ...)` trees.
pub fn symbols_equal(a: &Sexpr, b: &Sexpr) -> bool {
    if !a.is_tagged("symbol") || !b.is_tagged("symbol") {
        return false;
    }
    let (Some(name_a), Some(name_b)) = (a.atom_at(1), b.atom_at(1)) else {
        return false;
    };
    if name_a != name_b {
        return false;
    }

    let body_a = a.children().get(1..).unwrap_or_default();
    let body_b = b.children().get(1..).unwrap_or_default();

    let key = |node: &Sexpr| node.atom_at(1).map(str::to_string);
    if !match_by_key(
        &tagged(body_a, "property"),
        &tagged(body_b, "property"),
        key,
        properties_equal,
    ) {
        log::debug!("symbol {name_a}: properties differ");
        return false;
    }
    if !match_by_key(&tagged(body_a, "symbol"), &tagged(body_b, "symbol"), key, units_equal) {
        log::debug!("symbol {name_a}: units differ");
        return false;
    }
    if bare_atoms(body_a) != bare_atoms(body_b) || attribute_map(body_a) != attribute_map(body_b) {
        log::debug!("symbol {name_a}: attributes differ");
        return false;
    }
    true
}

fn tagged<'a>(items: &'a [Sexpr], tag: &str) -> Vec<&'a Sexpr> {
    items.iter().filter(|c| c.is_tagged(tag)).collect()
}

fn bare_atoms(items: &[Sexpr]) -> Vec<String> {
    let mut atoms: Vec<String> = items
        .iter()
        .filter_map(Sexpr::as_atom)
        .map(atom_key)
        .collect();
    atoms.sort();
    atoms
}

/// Direct children other than properties and units, keyed by tag.
fn attribute_map(items: &[Sexpr]) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in items {
        match item.tag() {
            Some("property") | Some("symbol") | None => {}
            Some(tag) => map
                .entry(tag.to_string())
                .or_default()
                .push(canonical(item)),
        }
    }
    map
}

/// Compact form with numbers normalized, so `(at 2.540 0)` and `(at 2.54 0)`
/// produce the same text.
fn canonical(node: &Sexpr) -> String {
    match node {
        Sexpr::List(items) => {
            let inner: Vec<String> = items.iter().map(canonical).collect();
            format!("({})", inner.join(" "))
        }
        atom => atom.as_atom().map(atom_key).unwrap_or_default(),
    }
}

/// Effects of a property reduced to what affects its appearance.
#[derive(Debug, PartialEq)]
struct Effects {
    font: Vec<String>,
    justify: BTreeSet<String>,
    hidden: bool,
}

/// True for `(hide yes)`, a bare `(hide)` or an old-style bare `hide` flag.
pub(crate) fn is_hidden(node: &Sexpr) -> bool {
    node.children().iter().any(|c| match c {
        Sexpr::List(_) if c.is_tagged("hide") => {
            c.atom_at(1).map_or(true, |v| v.eq_ignore_ascii_case("yes"))
        }
        Sexpr::Symbol(s) => s == "hide",
        _ => false,
    })
}

fn effects(property: &Sexpr) -> Effects {
    let effects = property.find_child("effects");
    let font = effects
        .and_then(|e| e.find_child("font"))
        .map(|f| {
            let mut parts: Vec<String> = f.children().iter().map(canonical).collect();
            parts.sort();
            parts
        })
        .unwrap_or_default();
    let justify = effects
        .and_then(|e| e.find_child("justify"))
        .map(|j| j.children().iter().filter_map(Sexpr::as_atom).map(str::to_string).collect())
        .unwrap_or_default();
    let hidden = is_hidden(property) || effects.is_some_and(is_hidden);
    Effects {
        font,
        justify,
        hidden,
    }
}

/// Properties match on value and effects; placement is ignored.
fn properties_equal(a: &Sexpr, b: &Sexpr) -> bool {
    optional_atoms_equal(a.atom_at(2), b.atom_at(2)) && effects(a) == effects(b)
}

/// Compare two unit trees (`(symbol "X_1_1" ...)`).
fn units_equal(a: &Sexpr, b: &Sexpr) -> bool {
    if a.atom_at(1) != b.atom_at(1) {
        return false;
    }

    let graphics = |u: &Sexpr| {
        let mut items: Vec<String> = u
            .children()
            .iter()
            .skip(1)
            .filter(|c| !c.is_tagged("pin") && !c.is_tagged("text"))
            .map(canonical)
            .collect();
        items.sort();
        items
    };
    if graphics(a) != graphics(b) {
        return false;
    }

    let pins_a: Vec<&Sexpr> = a.find_children("pin").collect();
    let pins_b: Vec<&Sexpr> = b.find_children("pin").collect();
    match_by_key(&pins_a, &pins_b, |p| p.child_value("number").map(str::to_string), pins_equal)
        && stacks(&pins_a) == stacks(&pins_b)
}

fn optional_atoms_equal(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => atoms_equal(x, y),
        (None, None) => true,
        _ => false,
    }
}

fn alternates(pin: &Sexpr) -> BTreeSet<Vec<String>> {
    pin.find_children("alternate")
        .map(|alt| {
            alt.children()
                .iter()
                .filter_map(Sexpr::as_atom)
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// Pins matched by number compare on everything but their visibility, which
/// is checked per stack in [`stacks`].
fn pins_equal(a: &Sexpr, b: &Sexpr) -> bool {
    fn at(pin: &Sexpr, index: usize) -> Option<&str> {
        pin.find_child("at").and_then(|at| at.atom_at(index))
    }
    optional_atoms_equal(a.atom_at(1), b.atom_at(1))
        && optional_atoms_equal(a.atom_at(2), b.atom_at(2))
        && a.child_value("name") == b.child_value("name")
        && (1..=3).all(|i| optional_atoms_equal(at(a, i), at(b, i)))
        && optional_atoms_equal(a.child_value("length"), b.child_value("length"))
        && alternates(a) == alternates(b)
}

/// Pins drawn on the same spot with the same name form a stack. Each stack
/// is reduced to its pin numbers and how many of them are visible, so which
/// number of a bundle happens to be the visible one does not matter.
fn stacks(pins: &[&Sexpr]) -> BTreeMap<String, (Vec<String>, usize)> {
    let mut groups: BTreeMap<String, (Vec<String>, usize)> = BTreeMap::new();
    for pin in pins {
        let position = pin.find_child("at").map(canonical).unwrap_or_default();
        let name = pin.child_value("name").unwrap_or_default();
        let entry = groups.entry(format!("{position}\u{0}{name}")).or_default();
        if let Some(number) = pin.child_value("number") {
            entry.0.push(number.to_string());
        }
        if !is_hidden(pin) {
            entry.1 += 1;
        }
    }
    for (numbers, _) in groups.values_mut() {
        numbers.sort();
    }
    groups
}
