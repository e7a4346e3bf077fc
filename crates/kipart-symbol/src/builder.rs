//! Turns a part's pins into a placed symbol and its `(symbol ...)` tree.

use std::collections::HashSet;

use kipart_sexpr::Sexpr;

use crate::diagnostics::Diagnostics;
use crate::error::{KipartError, Result};
use crate::geometry::{
    self, format_mm, grid_to_mm, pin_angle, Point, Rect, UnitGeometry, FONT_SIZE, GRID,
    STROKE_WIDTH,
};
use crate::group::{group_pins, PinGroup};
use crate::part::{Part, Properties, REFERENCE, STANDARD_PROPERTIES, VALUE};
use crate::pin::{PinStyle, PinType, Side};
use crate::SymbolOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Justify {
    Left,
    Right,
}

impl Justify {
    fn as_str(self) -> &'static str {
        match self {
            Justify::Left => "left",
            Justify::Right => "right",
        }
    }
}

/// Where and how a property is drawn relative to the symbol's top-left corner.
#[derive(Debug, Clone, Copy)]
struct PropertyPlacement {
    dx: f64,
    dy: f64,
    justify: Justify,
    hidden: bool,
}

fn property_placement(name: &str) -> PropertyPlacement {
    let (dy, justify, hidden) = match name {
        REFERENCE => (2.5 * GRID, Justify::Right, false),
        VALUE => (0.5 * GRID, Justify::Right, false),
        "Footprint" | "Datasheet" => (0.0, Justify::Right, true),
        _ => (0.0, Justify::Left, true),
    };
    PropertyPlacement {
        dx: 0.0,
        dy,
        justify,
        hidden,
    }
}

/// A pin (or bundle of pins) at its final position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedPin {
    pub numbers: Vec<String>,
    pub name: String,
    pub alternates: Vec<String>,
    pub pin_type: PinType,
    pub style: PinStyle,
    pub hidden: bool,
    pub side: Side,
    pub at: Point,
    pub length: i64,
}

impl PlacedPin {
    fn new(group: &PinGroup, side: Side, at: Point, length: i64, alt: Option<&str>) -> Self {
        let (name, alternates) = match alt {
            Some(delim) if !delim.is_empty() => {
                let mut names = group.name.split(delim).map(str::to_string);
                let primary = names.next().unwrap_or_default();
                (primary, names.collect())
            }
            _ => (group.name.clone(), Vec::new()),
        };
        PlacedPin {
            numbers: group.numbers.clone(),
            name,
            alternates,
            pin_type: group.pin_type,
            style: group.style,
            hidden: group.hidden,
            side,
            at,
            length,
        }
    }

    /// One `(pin ...)` per number. Every pin after the first of a bundle is
    /// hidden and stacked on the same spot.
    pub fn to_sexprs(&self) -> Vec<Sexpr> {
        self.numbers
            .iter()
            .enumerate()
            .map(|(i, number)| self.pin_sexpr(number, i > 0 || self.hidden))
            .collect()
    }

    fn pin_sexpr(&self, number: &str, hide: bool) -> Sexpr {
        let mut items = vec![
            Sexpr::atom(self.pin_type.as_str()),
            Sexpr::atom(self.style.as_str()),
            Sexpr::node(
                "at",
                vec![
                    Sexpr::atom(format_mm(grid_to_mm(self.at.x))),
                    Sexpr::atom(format_mm(grid_to_mm(self.at.y))),
                    Sexpr::atom(pin_angle(self.side).to_string()),
                ],
            ),
            Sexpr::node("length", vec![Sexpr::atom(format_mm(grid_to_mm(self.length)))]),
        ];
        if hide {
            items.push(Sexpr::node("hide", vec![Sexpr::atom("yes")]));
        }
        items.push(Sexpr::node(
            "name",
            vec![Sexpr::string(&self.name), font_effects()],
        ));
        items.push(Sexpr::node(
            "number",
            vec![Sexpr::string(number), font_effects()],
        ));
        for alternate in &self.alternates {
            items.push(Sexpr::node(
                "alternate",
                vec![
                    Sexpr::string(alternate),
                    Sexpr::atom(self.pin_type.as_str()),
                    Sexpr::atom(self.style.as_str()),
                ],
            ));
        }
        Sexpr::node("pin", items)
    }
}

fn font_size() -> Sexpr {
    let size = format_mm(FONT_SIZE);
    Sexpr::node(
        "font",
        vec![Sexpr::node("size", vec![Sexpr::atom(&size), Sexpr::atom(&size)])],
    )
}

fn font_effects() -> Sexpr {
    Sexpr::node("effects", vec![font_size()])
}

fn yes_no(flag: bool) -> Sexpr {
    Sexpr::atom(if flag { "yes" } else { "no" })
}

/// One unit of a symbol: `<part>_<unit>_1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: String,
    pub body: Rect,
    pub pins: Vec<PlacedPin>,
}

impl Unit {
    pub fn to_sexpr(&self) -> Sexpr {
        let rect = Sexpr::node(
            "rectangle",
            vec![
                point_node("start", self.body.start),
                point_node("end", self.body.end),
                Sexpr::node(
                    "stroke",
                    vec![
                        Sexpr::node("width", vec![Sexpr::atom(format_mm(STROKE_WIDTH))]),
                        Sexpr::node("type", vec![Sexpr::atom("solid")]),
                    ],
                ),
                Sexpr::node("fill", vec![Sexpr::node("type", vec![Sexpr::atom("background")])]),
            ],
        );
        let mut items = vec![Sexpr::string(&self.id), rect];
        items.extend(self.pins.iter().flat_map(PlacedPin::to_sexprs));
        Sexpr::node("symbol", items)
    }
}

fn point_node(tag: &str, p: Point) -> Sexpr {
    Sexpr::node(
        tag,
        vec![
            Sexpr::atom(format_mm(grid_to_mm(p.x))),
            Sexpr::atom(format_mm(grid_to_mm(p.y))),
        ],
    )
}

/// A finished symbol, ready to be written into a library.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub properties: Properties,
    pub units: Vec<Unit>,
    /// Corner the properties are anchored to, in mm.
    anchor: (f64, f64),
}

impl Symbol {
    /// Group, lay out and place the pins of `part`.
    pub fn build(part: &Part, options: &SymbolOptions, diagnostics: &mut Diagnostics) -> Result<Self> {
        let name = part.name.trim();
        if name.is_empty() {
            return Err(KipartError::InvalidPartName(part.name.clone()));
        }
        if part.pins.iter().all(|p| p.real_number().is_empty()) {
            return Err(KipartError::NoPins(name.to_string()));
        }
        check_duplicate_numbers(part, diagnostics);

        let pin_length = geometry::pin_length(&part.pins);
        let alt = options.alt_delimiter.as_deref();
        let mut units = Vec::new();
        let mut corners = Vec::new();
        for (index, unit_pins) in group_pins(&part.pins, options).iter().enumerate() {
            let geo = UnitGeometry::layout(unit_pins, pin_length, options);
            corners.push(geo.top_left());

            let mut pins = Vec::new();
            for side in Side::ALL {
                for (slot, at) in unit_pins.side(side).iter().zip(geo.positions(side)) {
                    if let Some(group) = slot.pin() {
                        pins.push(PlacedPin::new(group, side, *at, pin_length, alt));
                    }
                }
            }
            units.push(Unit {
                id: format!("{}_{}_1", name, index + 1),
                body: geo.body,
                pins,
            });
        }

        let anchor_x = corners.iter().map(|c| c.x).min().unwrap_or_default();
        let anchor_y = corners.iter().map(|c| c.y).max().unwrap_or_default();

        let mut properties = Properties::new();
        properties.set(REFERENCE, part.reference());
        properties.set(VALUE, name);
        for standard in &STANDARD_PROPERTIES[2..] {
            properties.set(*standard, "");
        }
        for (key, value) in part.properties.iter() {
            properties.set(key, value);
        }

        log::debug!(
            "built symbol {name} with {} unit(s), pin length {pin_length}",
            units.len()
        );
        Ok(Symbol {
            name: name.to_string(),
            properties,
            units,
            anchor: (grid_to_mm(anchor_x), grid_to_mm(anchor_y)),
        })
    }

    pub fn to_sexpr(&self) -> Sexpr {
        let mut items = vec![
            Sexpr::string(&self.name),
            Sexpr::node("exclude_from_sim", vec![yes_no(false)]),
            Sexpr::node("in_bom", vec![yes_no(true)]),
            Sexpr::node("on_board", vec![yes_no(true)]),
        ];
        for (key, value) in self.properties.iter() {
            items.push(self.property_sexpr(key, value));
        }
        items.extend(self.units.iter().map(Unit::to_sexpr));
        items.push(Sexpr::node("embedded_fonts", vec![yes_no(false)]));
        Sexpr::node("symbol", items)
    }

    fn property_sexpr(&self, key: &str, value: &str) -> Sexpr {
        let placement = property_placement(key);
        let (x, y) = self.anchor;
        Sexpr::node(
            "property",
            vec![
                Sexpr::string(key),
                Sexpr::string(value),
                Sexpr::node(
                    "at",
                    vec![
                        Sexpr::atom(format_mm(x + placement.dx)),
                        Sexpr::atom(format_mm(y + placement.dy)),
                        Sexpr::atom("0"),
                    ],
                ),
                Sexpr::node(
                    "effects",
                    vec![
                        font_size(),
                        Sexpr::node("justify", vec![Sexpr::atom(placement.justify.as_str())]),
                        Sexpr::node("hide", vec![yes_no(placement.hidden)]),
                    ],
                ),
            ],
        )
    }

    /// All placed pins of every unit.
    pub fn pins(&self) -> impl Iterator<Item = &PlacedPin> {
        self.units.iter().flat_map(|u| u.pins.iter())
    }
}

fn check_duplicate_numbers(part: &Part, diagnostics: &mut Diagnostics) {
    let mut seen = HashSet::new();
    for pin in &part.pins {
        let number = pin.real_number();
        if !number.is_empty() && !seen.insert((pin.unit.as_str(), number)) {
            diagnostics.warn_once(
                &part.name,
                format!("pin number {number} appears more than once in unit {}", pin.unit),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::{PinDefaults, PinRecord};
    use kipart_sexpr::format_sexpr;

    fn pin(number: &str, name: &str) -> PinRecord {
        PinRecord::new(number, name, 0, &PinDefaults::default())
    }

    fn build(part: &Part, options: &SymbolOptions) -> Symbol {
        Symbol::build(part, options, &mut Diagnostics::new()).unwrap()
    }

    #[test]
    fn blank_name_is_rejected() {
        let part = Part::new("  ").with_pins(vec![pin("1", "A")]);
        let err = Symbol::build(&part, &SymbolOptions::default(), &mut Diagnostics::new());
        assert!(matches!(err, Err(KipartError::InvalidPartName(_))));
    }

    #[test]
    fn spacers_only_is_rejected() {
        let part = Part::new("X").with_pins(vec![pin("**", "")]);
        let err = Symbol::build(&part, &SymbolOptions::default(), &mut Diagnostics::new());
        assert!(matches!(err, Err(KipartError::NoPins(name)) if name == "X"));
    }

    #[test]
    fn default_properties() {
        let symbol = build(&Part::new("LM358").with_pins(vec![pin("1", "OUT")]), &SymbolOptions::default());
        assert_eq!(symbol.properties.get("Reference"), Some("U"));
        assert_eq!(symbol.properties.get("Value"), Some("LM358"));
        assert_eq!(symbol.properties.len(), STANDARD_PROPERTIES.len());
        let names: Vec<&str> = symbol.properties.iter().map(|(k, _)| k).collect();
        assert_eq!(names, STANDARD_PROPERTIES);
    }

    #[test]
    fn bundle_emits_hidden_stack() {
        let power = |n: &str| pin(n, "GND").with_type(PinType::PowerIn);
        let part = Part::new("X").with_pins(vec![power("1"), power("2"), power("3")]);
        let options = SymbolOptions {
            bundle: true,
            ..Default::default()
        };
        let symbol = build(&part, &options);
        let placed: Vec<&PlacedPin> = symbol.pins().collect();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].name, "GND[3]");

        let pins = placed[0].to_sexprs();
        assert_eq!(pins.len(), 3);
        let hidden: Vec<bool> = pins.iter().map(|p| p.find_child("hide").is_some()).collect();
        assert_eq!(hidden, [false, true, true]);
        let ats: Vec<String> = pins
            .iter()
            .map(|p| p.find_child("at").unwrap().to_compact_string())
            .collect();
        assert!(ats.iter().all(|a| *a == ats[0]));
    }

    #[test]
    fn alternates_are_split() {
        let part = Part::new("MCU").with_pins(vec![pin("1", "PA1/TIM2_CH2/ADC1")]);
        let options = SymbolOptions {
            alt_delimiter: Some("/".into()),
            ..Default::default()
        };
        let symbol = build(&part, &options);
        let placed = symbol.pins().next().unwrap();
        assert_eq!(placed.name, "PA1");
        assert_eq!(placed.alternates, ["TIM2_CH2", "ADC1"]);
    }

    #[test]
    fn duplicate_numbers_warn() {
        let part = Part::new("X").with_pins(vec![pin("1", "A"), pin("1", "B")]);
        let mut diags = Diagnostics::new();
        Symbol::build(&part, &SymbolOptions::default(), &mut diags).unwrap();
        assert_eq!(diags.iter().count(), 1);
    }

    #[test]
    fn single_pin_symbol_text() {
        let part = Part::new("R").with_reference("R").with_pins(vec![pin("1", "A")]);
        let tree = build(&part, &SymbolOptions::default()).units[0].to_sexpr();
        insta::assert_snapshot!(format_sexpr(&tree, 0), @r#"
        (symbol "R_1_1"
          (rectangle
            (start -3.81 -2.54)
            (end 3.81 2.54)
            (stroke (width 0.254) (type solid))
            (fill (type background))
          )
          (pin passive line
            (at -8.89 0 0)
            (length 5.08)
            (name "A"
              (effects
                (font (size 1.27 1.27))
              )
            )
            (number "1"
              (effects
                (font (size 1.27 1.27))
              )
            )
          )
        )
        "#);
    }
}
