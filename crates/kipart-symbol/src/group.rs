//! Grouping pins into units and sides, expanding spacers, bundling and ordering.

use std::collections::HashMap;

use itertools::Itertools;

use crate::pin::{PinRecord, PinStyle, PinType, Side};
use crate::sort::{MixedKey, SortBy};
use crate::SymbolOptions;

/// A pin ready for placement. Bundles carry more than one number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinGroup {
    pub numbers: Vec<String>,
    pub name: String,
    pub pin_type: PinType,
    pub style: PinStyle,
    pub hidden: bool,
}

impl PinGroup {
    fn from_record(pin: &PinRecord, number: &str) -> Self {
        PinGroup {
            numbers: vec![number.to_string()],
            name: pin.name.clone(),
            pin_type: pin.pin_type,
            style: pin.style,
            hidden: pin.hidden,
        }
    }

    pub fn first_number(&self) -> &str {
        self.numbers.first().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKind {
    /// Occupies a position on the side but draws nothing.
    Spacer,
    Pin(PinGroup),
}

/// One position along a side of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub row_index: usize,
    pub kind: SlotKind,
}

impl Slot {
    pub fn is_spacer(&self) -> bool {
        matches!(self.kind, SlotKind::Spacer)
    }

    pub fn pin(&self) -> Option<&PinGroup> {
        match &self.kind {
            SlotKind::Pin(pin) => Some(pin),
            SlotKind::Spacer => None,
        }
    }

    fn sort_key(&self, sort_by: SortBy) -> (MixedKey, usize) {
        match (&self.kind, sort_by) {
            (_, SortBy::Row) => (MixedKey::Parts(Vec::new()), self.row_index),
            (SlotKind::Spacer, _) => (MixedKey::Wildcard, 0),
            (SlotKind::Pin(pin), SortBy::Num) => (MixedKey::new(pin.first_number()), 0),
            (SlotKind::Pin(pin), SortBy::Name) => (MixedKey::new(&pin.name), 0),
        }
    }
}

/// Pins of one unit, split by side and ordered for placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPins {
    pub name: String,
    sides: [Vec<Slot>; 4],
}

impl UnitPins {
    pub fn side(&self, side: Side) -> &[Slot] {
        &self.sides[side.index()]
    }

    /// Every placed pin of the unit, side by side.
    pub fn pins(&self) -> impl Iterator<Item = &PinGroup> {
        self.sides.iter().flatten().filter_map(Slot::pin)
    }
}

/// Expand leading spacer markers of each pin number.
///
/// `**1` becomes two spacers followed by pin `1`; `***` becomes three
/// spacers and no pin. Row indices are renumbered so the result is
/// contiguous.
pub fn expand_spacers(pins: &[PinRecord]) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(pins.len());
    for pin in pins {
        for _ in 0..pin.spacer_count() {
            slots.push(Slot {
                row_index: slots.len(),
                kind: SlotKind::Spacer,
            });
        }
        let number = pin.real_number();
        if !number.is_empty() {
            slots.push(Slot {
                row_index: slots.len(),
                kind: SlotKind::Pin(PinGroup::from_record(pin, number)),
            });
        }
    }
    slots
}

/// Collapse same-named power and no-connect pins into bundles.
///
/// A name group is bundled only if every member has the same bundle-eligible
/// type. The bundle takes the place of the group's first member.
pub fn bundle_slots(slots: Vec<Slot>) -> Vec<Slot> {
    let mut members: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, slot) in slots.iter().enumerate() {
        if let Some(pin) = slot.pin() {
            members.entry(pin.name.clone()).or_default().push(i);
        }
    }

    let qualifies = |indices: &[usize]| {
        let types: Vec<PinType> = indices
            .iter()
            .filter_map(|&i| slots[i].pin().map(|p| p.pin_type))
            .unique()
            .collect();
        types.len() == 1 && types[0].is_bundle_eligible()
    };

    let mut bundles: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut absorbed = vec![false; slots.len()];
    for indices in members.values() {
        if indices.len() > 1 && qualifies(indices) {
            for &i in &indices[1..] {
                absorbed[i] = true;
            }
            bundles.insert(indices[0], indices.clone());
        }
    }

    let mut result = Vec::with_capacity(slots.len());
    for (i, slot) in slots.iter().enumerate() {
        if absorbed[i] {
            continue;
        }
        match (bundles.get(&i), slot.pin()) {
            (Some(indices), Some(first)) => {
                let numbers: Vec<String> = indices
                    .iter()
                    .filter_map(|&j| slots[j].pin())
                    .flat_map(|p| p.numbers.iter().cloned())
                    .collect();
                log::debug!("bundling {} pins named {:?}", numbers.len(), first.name);
                let name = format!("{}[{}]", first.name, numbers.len());
                result.push(Slot {
                    row_index: slot.row_index,
                    kind: SlotKind::Pin(PinGroup {
                        numbers,
                        name,
                        ..first.clone()
                    }),
                });
            }
            _ => result.push(slot.clone()),
        }
    }
    result
}

/// Stable sort of the slots along one side.
pub fn sort_slots(slots: &mut [Slot], sort_by: SortBy, reverse: bool) {
    if reverse {
        slots.sort_by_cached_key(|s| std::cmp::Reverse(s.sort_key(sort_by)));
    } else {
        slots.sort_by_cached_key(|s| s.sort_key(sort_by));
    }
}

/// Split a part's pins into units (in order of first appearance) and sides,
/// then expand, bundle and sort each side.
pub fn group_pins(pins: &[PinRecord], options: &SymbolOptions) -> Vec<UnitPins> {
    let unit_names: Vec<&str> = pins.iter().map(|p| p.unit.as_str()).unique().collect();

    unit_names
        .into_iter()
        .map(|unit| {
            let sides = Side::ALL.map(|side| {
                let side_pins: Vec<PinRecord> = pins
                    .iter()
                    .filter(|p| p.unit == unit && p.side == side)
                    .cloned()
                    .collect();
                let mut slots = expand_spacers(&side_pins);
                if options.bundle {
                    slots = bundle_slots(slots);
                }
                sort_slots(&mut slots, options.sort_by, options.reverse);
                slots
            });
            UnitPins {
                name: unit.to_string(),
                sides,
            }
        })
        .collect()
}
