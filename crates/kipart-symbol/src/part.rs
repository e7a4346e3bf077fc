use serde::Serialize;

use crate::pin::PinRecord;

pub const REFERENCE: &str = "Reference";
pub const VALUE: &str = "Value";

/// Properties every generated symbol carries, in emission order.
pub const STANDARD_PROPERTIES: [&str; 8] = [
    REFERENCE,
    VALUE,
    "Footprint",
    "Datasheet",
    "Description",
    "ki_keywords",
    "ki_locked",
    "ki_fp_filters",
];

/// Map a user-facing property label (`ref`, `fp`, `keywords`, ...) to the
/// name KiCad uses. Labels are matched case-insensitively.
pub fn canonical_property_name(label: &str) -> Option<&'static str> {
    let name = match label.trim().to_lowercase().as_str() {
        "reference" | "ref" => REFERENCE,
        "value" | "val" => VALUE,
        "footprint" | "fp" => "Footprint",
        "datasheet" => "Datasheet",
        "description" | "desc" => "Description",
        "ki_keywords" | "keywords" => "ki_keywords",
        "ki_locked" | "locked" => "ki_locked",
        "ki_fp_filters" | "filters" | "fp_filters" => "ki_fp_filters",
        _ => return None,
    };
    Some(name)
}

/// Ordered property list with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Properties(Vec<(String, String)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing an existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything a reader hands over for one part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Part {
    pub name: String,
    pub properties: Properties,
    pub pins: Vec<PinRecord>,
}

impl Part {
    pub fn new(name: impl Into<String>) -> Self {
        Part {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the reference designator prefix (`U`, `IC`, ...).
    pub fn with_reference(mut self, prefix: impl Into<String>) -> Self {
        self.properties.set(REFERENCE, prefix);
        self
    }

    pub fn with_pins(mut self, pins: Vec<PinRecord>) -> Self {
        self.pins = pins;
        self
    }

    pub fn reference(&self) -> &str {
        self.properties.get(REFERENCE).unwrap_or("U")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut props = Properties::new();
        props.set("Reference", "U");
        props.set("Footprint", "QFN-32");
        props.set("Reference", "IC");
        assert_eq!(
            props.iter().collect::<Vec<_>>(),
            [("Reference", "IC"), ("Footprint", "QFN-32")]
        );
    }

    #[test]
    fn label_aliases() {
        assert_eq!(canonical_property_name("REF"), Some("Reference"));
        assert_eq!(canonical_property_name(" fp_filters "), Some("ki_fp_filters"));
        assert_eq!(canonical_property_name("colour"), None);
    }

    #[test]
    fn reference_defaults_to_u() {
        assert_eq!(Part::new("X").reference(), "U");
        assert_eq!(Part::new("X").with_reference("J").reference(), "J");
    }
}
