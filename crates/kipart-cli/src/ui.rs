use colored::{ColoredString, Colorize};

use kipart_symbol::{Diagnostic, Diagnostics, Severity};

/// Styles used for file names in status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Green,
    Yellow,
    Red,
}

/// Extension trait for applying consistent styles to text
pub trait StyledText {
    fn with_style(self, style: Style) -> ColoredString;
}

impl<T: AsRef<str>> StyledText for T {
    fn with_style(self, style: Style) -> ColoredString {
        let text = self.as_ref();
        match style {
            Style::Green => text.green(),
            Style::Yellow => text.yellow(),
            Style::Red => text.red(),
        }
    }
}

/// Common status icons
pub mod icons {
    use colored::Colorize;

    pub fn success() -> String {
        "✓".green().to_string()
    }

    pub fn error() -> String {
        "✗".red().to_string()
    }

    pub fn warning() -> String {
        "!".yellow().to_string()
    }
}

fn icon(diagnostic: &Diagnostic) -> String {
    match diagnostic.severity {
        Severity::Warning => icons::warning(),
        Severity::Error => icons::error(),
    }
}

/// Print every collected diagnostic to stderr.
pub fn report(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("{} {diagnostic}", icon(diagnostic));
    }
}
