//! A small S-expression reader and writer for KiCad symbol libraries.
//!
//! Atoms keep their exact text: numbers are stored as unquoted symbols so a
//! value written as `2.54` is read back as `2.54`, never re-rendered through a
//! float. Lists are plain vectors whose first element is, by convention, the
//! tag of the node (`symbol`, `pin`, `at`, ...).

use std::fmt;

/// An S-expression value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sexpr {
    /// A symbol - unquoted identifier or number
    Symbol(String),
    /// A string - quoted text
    String(String),
    /// A list of S-expressions
    List(Vec<Sexpr>),
}

impl Sexpr {
    /// Create a symbol (unquoted atom)
    pub fn symbol(s: impl Into<String>) -> Self {
        Sexpr::Symbol(s.into())
    }

    /// Create a string (quoted atom)
    pub fn string(s: impl Into<String>) -> Self {
        Sexpr::String(s.into())
    }

    /// Create an atom. This creates a symbol.
    pub fn atom(s: impl Into<String>) -> Self {
        Sexpr::Symbol(s.into())
    }

    /// Create a list from a vector of S-expressions
    pub fn list(items: Vec<Sexpr>) -> Self {
        Sexpr::List(items)
    }

    /// Create a tagged list: `(tag child...)`
    pub fn node(tag: &str, children: Vec<Sexpr>) -> Self {
        let mut items = Vec::with_capacity(children.len() + 1);
        items.push(Sexpr::symbol(tag));
        items.extend(children);
        Sexpr::List(items)
    }

    /// Check if this is an atom (symbol or string)
    pub fn is_atom(&self) -> bool {
        self.as_atom().is_some()
    }

    /// Get the atom value if this is an atom (symbol or string)
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexpr::Symbol(s) | Sexpr::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the list items if this is a list
    pub fn as_list(&self) -> Option<&[Sexpr]> {
        match self {
            Sexpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// The tag of a list node, i.e. its leading symbol.
    pub fn tag(&self) -> Option<&str> {
        match self.as_list()?.first()? {
            Sexpr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// True if this is a list whose tag is `tag`.
    pub fn is_tagged(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    /// Everything after the tag. Atoms have no children.
    pub fn children(&self) -> &[Sexpr] {
        match self.as_list() {
            Some(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    /// The `index`-th element of a list, counting the tag as element 0.
    pub fn item(&self, index: usize) -> Option<&Sexpr> {
        self.as_list()?.get(index)
    }

    /// Atom text of the `index`-th element (tag is element 0).
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.item(index)?.as_atom()
    }

    /// First direct child list tagged `tag`.
    pub fn find_child(&self, tag: &str) -> Option<&Sexpr> {
        self.children().iter().find(|c| c.is_tagged(tag))
    }

    /// All direct child lists tagged `tag`, in order.
    pub fn find_children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Sexpr> + 'a {
        self.children().iter().filter(move |c| c.is_tagged(tag))
    }

    /// First direct child tagged `tag` whose element at `key_index` is the
    /// atom `key`. `(property "Reference" "U")` is found with
    /// `find_by_key("property", 1, "Reference")`.
    pub fn find_by_key<'a>(&'a self, tag: &'a str, key_index: usize, key: &str) -> Option<&'a Sexpr> {
        self.find_children(tag)
            .find(|c| c.atom_at(key_index) == Some(key))
    }

    /// Atom value of the first child tagged `tag`: `(version 20241209)` → `20241209`.
    pub fn child_value(&self, tag: &str) -> Option<&str> {
        self.find_child(tag)?.atom_at(1)
    }

    /// Single-line rendering with no indentation. Two trees with the same
    /// compact form are identical including atom quoting.
    pub fn to_compact_string(&self) -> String {
        let mut out = String::new();
        write_compact(self, &mut out);
        out
    }
}

fn write_compact(sexpr: &Sexpr, out: &mut String) {
    match sexpr {
        Sexpr::Symbol(s) => out.push_str(&format_symbol(s)),
        Sexpr::String(s) => {
            out.push('"');
            out.push_str(&escape_string(s));
            out.push('"');
        }
        Sexpr::List(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_compact(item, out);
            }
            out.push(')');
        }
    }
}

/// Parser for S-expressions
pub struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            chars: input.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Parse the input and return the S-expression
    pub fn parse(&mut self) -> Result<Sexpr, ParseError> {
        self.skip_whitespace();
        if self.is_at_end() {
            return Err(ParseError::UnexpectedEof);
        }

        if self.peek_char() == Some('(') {
            self.parse_list()
        } else {
            self.parse_atom()
        }
    }

    /// Parse multiple S-expressions from the input
    pub fn parse_all(&mut self) -> Result<Vec<Sexpr>, ParseError> {
        let mut results = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            results.push(self.parse()?);
        }

        Ok(results)
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.current_pos
    }

    fn parse_list(&mut self) -> Result<Sexpr, ParseError> {
        let start_pos = self.current_pos;
        self.expect('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                return Err(ParseError::UnclosedList(start_pos));
            }

            if self.peek_char() == Some(')') {
                self.advance();
                break;
            }

            items.push(self.parse()?);

            if items.len() % 1000 == 0 {
                log::trace!(
                    "Parsed {} items in list at position {start_pos}",
                    items.len()
                );
            }
        }

        Ok(Sexpr::List(items))
    }

    fn parse_atom(&mut self) -> Result<Sexpr, ParseError> {
        self.skip_whitespace();

        if self.peek_char() == Some('"') {
            return self.parse_string();
        }

        let start = self.current_pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.advance();
        }

        if self.current_pos == start {
            return Err(ParseError::EmptyAtom(start));
        }

        Ok(Sexpr::Symbol(
            self.input[start..self.current_pos].to_string(),
        ))
    }

    fn parse_string(&mut self) -> Result<Sexpr, ParseError> {
        let start_pos = self.current_pos;
        self.expect('"')?;
        let mut result = String::new();

        loop {
            match self.peek_char() {
                None => return Err(ParseError::UnterminatedString(start_pos)),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek_char() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(ch) => ch,
                        None => return Err(ParseError::UnterminatedString(start_pos)),
                    };
                    result.push(escaped);
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Ok(Sexpr::String(result))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == ';' {
                // Comment runs to end of line
                while let Some(ch) = self.peek_char() {
                    self.advance();
                    if ch == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos + ch.len_utf8();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        match self.peek_char() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError::UnexpectedChar {
                found: ch,
                expected,
                at: self.current_pos,
            }),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}

/// Parse a string holding exactly one S-expression.
pub fn parse(input: &str) -> Result<Sexpr, ParseError> {
    log::trace!("Parsing S-expression from {} bytes of input", input.len());
    let mut parser = Parser::new(input);
    let result = parser.parse().and_then(|sexpr| {
        parser.skip_whitespace();
        if parser.is_at_end() {
            Ok(sexpr)
        } else {
            Err(ParseError::TrailingInput(parser.position()))
        }
    });
    if let Err(e) = &result {
        log::trace!("Failed to parse S-expression: {e:?}");
    }
    result
}

/// Parse a string into multiple S-expressions
pub fn parse_all(input: &str) -> Result<Vec<Sexpr>, ParseError> {
    log::trace!(
        "Parsing multiple S-expressions from {} bytes of input",
        input.len()
    );
    let result = Parser::new(input).parse_all();
    match &result {
        Ok(exprs) => log::trace!("Successfully parsed {} S-expressions", exprs.len()),
        Err(e) => log::trace!("Failed to parse S-expressions: {e:?}"),
    }
    result
}

/// Errors that can occur during parsing. Positions are byte offsets.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedEof,
    UnexpectedChar {
        found: char,
        expected: char,
        at: usize,
    },
    UnclosedList(usize),
    UnterminatedString(usize),
    EmptyAtom(usize),
    TrailingInput(usize),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedEof => write!(f, "Unexpected end of input"),
            ParseError::UnexpectedChar {
                found,
                expected,
                at,
            } => {
                write!(f, "Expected '{expected}', found '{found}' at byte {at}")
            }
            ParseError::UnclosedList(at) => write!(f, "Unclosed list starting at byte {at}"),
            ParseError::UnterminatedString(at) => {
                write!(f, "Unterminated string starting at byte {at}")
            }
            ParseError::EmptyAtom(at) => write!(f, "Empty atom at byte {at}"),
            ParseError::TrailingInput(at) => {
                write!(f, "Unexpected input after expression at byte {at}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Format an S-expression with proper indentation
pub fn format_sexpr(sexpr: &Sexpr, indent_level: usize) -> String {
    format_sexpr_inner(sexpr, indent_level, true)
}

fn format_sexpr_inner(sexpr: &Sexpr, indent_level: usize, add_indent: bool) -> String {
    let indent = if add_indent {
        "  ".repeat(indent_level)
    } else {
        String::new()
    };

    match sexpr {
        Sexpr::Symbol(s) => format!("{indent}{}", format_symbol(s)),
        Sexpr::String(s) => format!("{}\"{}\"", indent, escape_string(s)),
        Sexpr::List(items) => {
            if items.is_empty() {
                return format!("{indent}()");
            }

            if is_simple_list(items) {
                return format!("{indent}{}", sexpr.to_compact_string());
            }

            let mut result = format!("{indent}(");

            // Tag and leading atoms stay on the opening line: (pin input line
            let inline = items.iter().take_while(|item| item.is_atom()).count();
            for (i, item) in items.iter().take(inline.max(1)).enumerate() {
                if i > 0 {
                    result.push(' ');
                }
                result.push_str(&format_sexpr_inner(item, 0, false));
            }

            for item in items.iter().skip(inline.max(1)) {
                result.push('\n');
                result.push_str(&format_sexpr_inner(item, indent_level + 1, true));
            }

            result.push('\n');
            result.push_str(&indent);
            result.push(')');
            result
        }
    }
}

fn format_symbol(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, '(' | ')' | '"' | ';'));
    if needs_quotes {
        format!("\"{}\"", escape_string(s))
    } else {
        s.to_string()
    }
}

fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ => result.push(ch),
        }
    }
    result
}

fn is_simple_list(items: &[Sexpr]) -> bool {
    if let Some(Sexpr::Symbol(first)) = items.first() {
        match first.as_str() {
            "at" | "xy" | "start" | "end" | "mid" | "size" | "length" | "width" | "type"
            | "version" | "generator" | "generator_version" | "exclude_from_sim" | "in_bom"
            | "on_board" | "embedded_fonts" | "hide" | "alternate" | "pin_names"
            | "pin_numbers" => return true,
            "color" if items.len() == 5 => return true,
            "font" if items.len() == 2 => return true,
            "justify" if items.len() <= 3 => return true,
            "stroke" | "fill" => {
                return items[1..]
                    .iter()
                    .all(|item| item.children().iter().all(Sexpr::is_atom))
            }
            _ => {}
        }
    }

    // Otherwise, simple if very short and all atoms
    items.len() <= 3 && items.iter().all(Sexpr::is_atom)
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_sexpr(self, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_atom() {
        assert_eq!(parse("hello").unwrap(), Sexpr::Symbol("hello".to_string()));
        assert_eq!(parse("123").unwrap(), Sexpr::Symbol("123".to_string()));
        assert_eq!(parse("-2.54").unwrap(), Sexpr::Symbol("-2.54".to_string()));
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(
            parse("\"hello world\"").unwrap(),
            Sexpr::String("hello world".to_string())
        );
        assert_eq!(
            parse("\"with\\\"quotes\\\"\"").unwrap(),
            Sexpr::String("with\"quotes\"".to_string())
        );
        assert_eq!(parse("\"\"").unwrap(), Sexpr::String(String::new()));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse("()").unwrap(), Sexpr::List(vec![]));
        assert_eq!(
            parse("(a b c)").unwrap(),
            Sexpr::List(vec![
                Sexpr::Symbol("a".to_string()),
                Sexpr::Symbol("b".to_string()),
                Sexpr::Symbol("c".to_string()),
            ])
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("(a (b c)"), Err(ParseError::UnclosedList(0)));
        assert_eq!(parse("\"open"), Err(ParseError::UnterminatedString(0)));
        assert_eq!(parse(""), Err(ParseError::UnexpectedEof));
        assert_eq!(parse("(a) (b)"), Err(ParseError::TrailingInput(4)));
    }

    #[test]
    fn test_parse_with_comments() {
        let input = r#"
        ; leading comment
        (test ; inline comment
          value)
        "#;
        assert_eq!(
            parse(input).unwrap(),
            Sexpr::node("test", vec![Sexpr::symbol("value")])
        );
    }

    #[test]
    fn test_parse_all() {
        let exprs = parse_all("(a) (b 1) c").unwrap();
        assert_eq!(exprs.len(), 3);
        assert_eq!(exprs[2], Sexpr::symbol("c"));
    }

    #[test]
    fn test_accessors() {
        let pin = parse(
            r#"(pin power_in line (at -7.62 2.54 0) (length 5.08) (name "VCC") (number "1") (number "2"))"#,
        )
        .unwrap();

        assert_eq!(pin.tag(), Some("pin"));
        assert_eq!(pin.atom_at(1), Some("power_in"));
        assert_eq!(pin.children().len(), 7);
        assert_eq!(pin.child_value("length"), Some("5.08"));
        assert_eq!(pin.find_child("at").and_then(|at| at.atom_at(3)), Some("0"));
        assert_eq!(pin.find_children("number").count(), 2);
        assert!(pin.find_by_key("number", 1, "2").is_some());
        assert!(pin.find_by_key("number", 1, "3").is_none());
        assert!(pin.find_child("hide").is_none());

        let atom = Sexpr::symbol("x");
        assert_eq!(atom.tag(), None);
        assert!(atom.children().is_empty());
    }

    #[test]
    fn test_format_simple() {
        let sexpr = Sexpr::node("at", vec![Sexpr::atom("10"), Sexpr::atom("20")]);
        assert_eq!(format_sexpr(&sexpr, 0), "(at 10 20)");
    }

    #[test]
    fn test_format_keeps_leading_atoms_inline() {
        let pin = parse(r#"(pin input line (at 0 0 0) (name "A" (effects (font (size 1.27 1.27)))))"#)
            .unwrap();
        insta::assert_snapshot!(format_sexpr(&pin, 0), @r#"
        (pin input line
          (at 0 0 0)
          (name "A"
            (effects
              (font (size 1.27 1.27))
            )
          )
        )
        "#);
    }

    #[test]
    fn test_symbols_needing_quotes_survive() {
        let sexpr = Sexpr::node("value", vec![Sexpr::symbol("has space"), Sexpr::symbol("")]);
        let reparsed = parse(&sexpr.to_compact_string()).unwrap();
        assert_eq!(reparsed.atom_at(1), Some("has space"));
        assert_eq!(reparsed.atom_at(2), Some(""));
    }

    #[test]
    fn test_roundtrip() {
        let inputs = vec![
            "(simple list)",
            "(nested (list with) (multiple levels))",
            r#"(with "quoted string" and atoms)"#,
            "(pin passive line (at 0 0 0) (length 2.54) (name \"1\") (number \"1\"))",
            r#"(symbol "résistance" "日本語" (property "Value" "a\"b\\c"))"#,
        ];

        for input in inputs {
            let parsed = parse(input).unwrap();
            let formatted = format_sexpr(&parsed, 0);
            let reparsed = parse(&formatted).unwrap();
            assert_eq!(parsed, reparsed, "Roundtrip failed for: {input}");
        }
    }
}
