use std::fs;
use std::path::Path;
use std::str::FromStr;

use kipart_sexpr::{format_sexpr, parse, Sexpr};

use crate::builder::Symbol;
use crate::error::{KipartError, Result};

pub const LIBRARY_TAG: &str = "kicad_symbol_lib";
pub const LIBRARY_EXTENSION: &str = "kicad_sym";
pub const DEFAULT_VERSION: u64 = 20241209;
pub const DEFAULT_GENERATOR: &str = "kicad_symbol_editor";
pub const DEFAULT_GENERATOR_VERSION: &str = "8.0";

/// A `(kicad_symbol_lib ...)` file: a header and its symbol trees.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolLib {
    pub version: u64,
    pub generator: Option<String>,
    pub generator_version: Option<String>,
    symbols: Vec<Sexpr>,
}

impl Default for SymbolLib {
    fn default() -> Self {
        SymbolLib {
            version: DEFAULT_VERSION,
            generator: Some(DEFAULT_GENERATOR.to_string()),
            generator_version: Some(DEFAULT_GENERATOR_VERSION.to_string()),
            symbols: Vec::new(),
        }
    }
}

impl SymbolLib {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same header as `self`, no symbols.
    pub fn empty_like(&self) -> Self {
        SymbolLib {
            symbols: Vec::new(),
            ..self.clone()
        }
    }

    pub fn from_sexpr(tree: &Sexpr) -> Result<Self> {
        if !tree.is_tagged(LIBRARY_TAG) {
            let found = tree.tag().unwrap_or("<atom>");
            return Err(KipartError::NotALibrary(format!(
                "expected ({LIBRARY_TAG} ...), found ({found} ...)"
            )));
        }
        let version = tree
            .child_value("version")
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| KipartError::NotALibrary("missing or invalid version".into()))?;

        Ok(SymbolLib {
            version,
            generator: tree.child_value("generator").map(str::to_string),
            generator_version: tree.child_value("generator_version").map(str::to_string),
            symbols: tree.find_children("symbol").cloned().collect(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(LIBRARY_EXTENSION) => {}
            _ => {
                return Err(KipartError::UnsupportedFileExtension(
                    path.display().to_string(),
                ))
            }
        }
        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn to_sexpr(&self) -> Sexpr {
        let mut items = vec![Sexpr::node(
            "version",
            vec![Sexpr::atom(self.version.to_string())],
        )];
        if let Some(generator) = &self.generator {
            items.push(Sexpr::node("generator", vec![Sexpr::string(generator)]));
        }
        if let Some(generator_version) = &self.generator_version {
            items.push(Sexpr::node(
                "generator_version",
                vec![Sexpr::string(generator_version)],
            ));
        }
        items.extend(self.symbols.iter().cloned());
        Sexpr::node(LIBRARY_TAG, items)
    }

    /// Text of the library file, newline-terminated.
    pub fn to_text(&self) -> String {
        let mut text = format_sexpr(&self.to_sexpr(), 0);
        text.push('\n');
        text
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_text())?;
        log::debug!("wrote {} symbol(s) to {}", self.symbols.len(), path.display());
        Ok(())
    }

    pub fn symbols(&self) -> &[Sexpr] {
        &self.symbols
    }

    pub fn symbol(&self, name: &str) -> Option<&Sexpr> {
        self.symbols.iter().find(|s| symbol_name(s) == Some(name))
    }

    pub fn symbol_names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().filter_map(symbol_name)
    }

    pub fn push(&mut self, symbol: &Symbol) -> Option<Sexpr> {
        self.push_tree(symbol.to_sexpr())
    }

    /// Add a symbol tree. Names stay unique: a symbol with the same name is
    /// replaced in place and returned.
    pub fn push_tree(&mut self, tree: Sexpr) -> Option<Sexpr> {
        let existing = symbol_name(&tree)
            .and_then(|name| self.symbols.iter().position(|s| symbol_name(s) == Some(name)));
        match existing {
            Some(index) => Some(std::mem::replace(&mut self.symbols[index], tree)),
            None => {
                self.symbols.push(tree);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl FromStr for SymbolLib {
    type Err = KipartError;

    fn from_str(content: &str) -> Result<Self> {
        let tree = parse(content)?;
        Self::from_sexpr(&tree)
    }
}

/// Name of a `(symbol "NAME" ...)` tree.
pub fn symbol_name(tree: &Sexpr) -> Option<&str> {
    if tree.is_tagged("symbol") {
        tree.atom_at(1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIB: &str = r#"
        (kicad_symbol_lib (version 20231120) (generator "kicad_symbol_editor") (generator_version "8.0")
          (symbol "A" (property "Reference" "U"))
          (symbol "B" (property "Reference" "J")))
    "#;

    #[test]
    fn reads_header_and_symbols() {
        let lib: SymbolLib = LIB.parse().unwrap();
        assert_eq!(lib.version, 20231120);
        assert_eq!(lib.generator.as_deref(), Some("kicad_symbol_editor"));
        assert_eq!(lib.symbol_names().collect::<Vec<_>>(), ["A", "B"]);
        assert!(lib.symbol("B").is_some());
        assert!(lib.symbol("C").is_none());
    }

    #[test]
    fn rejects_other_trees() {
        let err = "(kicad_sch (version 1))".parse::<SymbolLib>().unwrap_err();
        assert!(matches!(err, KipartError::NotALibrary(_)));
        let err = "(kicad_symbol_lib (generator x))".parse::<SymbolLib>().unwrap_err();
        assert!(matches!(err, KipartError::NotALibrary(_)));
        let err = "(kicad_symbol_lib".parse::<SymbolLib>().unwrap_err();
        assert!(matches!(err, KipartError::Parse(_)));
    }

    #[test]
    fn empty_library_text() {
        let text = SymbolLib::new().to_text();
        assert!(text.ends_with(")\n"));
        insta::assert_snapshot!(text.trim_end(), @r#"
        (kicad_symbol_lib
          (version 20241209)
          (generator "kicad_symbol_editor")
          (generator_version "8.0")
        )
        "#);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parts.kicad_sym");
        let lib: SymbolLib = LIB.parse().unwrap();
        lib.write(&path).unwrap();
        let reread = SymbolLib::from_file(&path).unwrap();
        assert_eq!(reread, lib);
    }

    #[test]
    fn wrong_extension() {
        let err = SymbolLib::from_file(Path::new("parts.lib")).unwrap_err();
        assert!(matches!(err, KipartError::UnsupportedFileExtension(_)));
    }
}
