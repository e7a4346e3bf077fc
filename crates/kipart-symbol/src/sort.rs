//! Natural ordering of pin numbers and names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KipartError;

/// Token that always sorts after everything else.
pub const WILDCARD: &str = "*";

/// One run of a mixed identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPart {
    Text(String),
    Number(u128),
}

/// Sort key that orders `A1 < A10 < B2`.
///
/// An identifier is split into alternating letter runs and digit runs, digit
/// runs comparing as integers. Identifiers that start with a digit get an
/// empty leading letter run so they line up with (and sort before) ones that
/// start with a letter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MixedKey {
    Parts(Vec<KeyPart>),
    Wildcard,
}

impl MixedKey {
    pub fn new(s: &str) -> Self {
        if s == WILDCARD {
            return MixedKey::Wildcard;
        }

        let mut parts = Vec::new();
        if s.starts_with(|c: char| c.is_ascii_digit()) {
            parts.push(KeyPart::Text(String::new()));
        }

        let mut run = String::new();
        let mut in_digits = false;
        for c in s.chars() {
            let digit = c.is_ascii_digit();
            if digit != in_digits && !run.is_empty() {
                match finish_run(&run, in_digits) {
                    Some(part) => parts.push(part),
                    None => return MixedKey::Parts(vec![KeyPart::Text(s.to_string())]),
                }
                run.clear();
            }
            in_digits = digit;
            run.push(c);
        }
        if !run.is_empty() {
            match finish_run(&run, in_digits) {
                Some(part) => parts.push(part),
                None => return MixedKey::Parts(vec![KeyPart::Text(s.to_string())]),
            }
        }

        if parts.is_empty() {
            parts.push(KeyPart::Text(String::new()));
        }
        MixedKey::Parts(parts)
    }
}

fn finish_run(run: &str, digits: bool) -> Option<KeyPart> {
    if digits {
        run.parse::<u128>().ok().map(KeyPart::Number)
    } else {
        Some(KeyPart::Text(run.to_string()))
    }
}

/// Which attribute orders the pins along a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Input order.
    #[default]
    Row,
    /// Pin number, naturally ordered.
    Num,
    /// Pin name, naturally ordered.
    Name,
}

impl FromStr for SortBy {
    type Err = KipartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "row" => Ok(SortBy::Row),
            "num" => Ok(SortBy::Num),
            "name" => Ok(SortBy::Name),
            _ => Err(KipartError::invalid_value("sort key", s.trim())),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortBy::Row => "row",
            SortBy::Num => "num",
            SortBy::Name => "name",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> MixedKey {
        MixedKey::new(s)
    }

    #[test]
    fn natural_order() {
        assert!(key("10") < key("A1"));
        assert!(key("A1") < key("A10"));
        assert!(key("A10") < key("B2"));
        assert!(key("2") < key("10"));
        assert!(key("AB") < key("AB1"));
    }

    #[test]
    fn wildcard_sorts_last() {
        assert!(key("ZZZ999") < key(WILDCARD));
        assert!(key("") < key(WILDCARD));
        assert_eq!(key(WILDCARD), MixedKey::Wildcard);
    }

    #[test]
    fn split_runs() {
        assert_eq!(
            key("A12B"),
            MixedKey::Parts(vec![
                KeyPart::Text("A".into()),
                KeyPart::Number(12),
                KeyPart::Text("B".into()),
            ])
        );
        assert_eq!(
            key("7"),
            MixedKey::Parts(vec![KeyPart::Text(String::new()), KeyPart::Number(7)])
        );
        assert_eq!(key(""), MixedKey::Parts(vec![KeyPart::Text(String::new())]));
    }

    #[test]
    fn oversized_number_falls_back_to_text() {
        let huge = "P".to_string() + &"9".repeat(60);
        assert_eq!(key(&huge), MixedKey::Parts(vec![KeyPart::Text(huge.clone())]));
    }

    #[test]
    fn sort_by_parses() {
        assert_eq!("NUM".parse::<SortBy>().unwrap(), SortBy::Num);
        assert!("size".parse::<SortBy>().is_err());
    }
}
