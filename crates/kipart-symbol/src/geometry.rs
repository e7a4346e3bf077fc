//! Body and pin geometry.
//!
//! All positions are computed as whole multiples of the schematic grid and
//! only converted to millimetres when written out, so every pin endpoint,
//! pin length and body corner is exactly on grid.

use crate::group::{Slot, UnitPins};
use crate::pin::{PinRecord, Side};
use crate::SymbolOptions;

/// Schematic grid pitch in mm.
pub const GRID: f64 = 1.27;
/// Font size of pin names, numbers and properties in mm.
pub const FONT_SIZE: f64 = 1.27;
/// Average character width as a fraction of the font size.
pub const CHAR_WIDTH: f64 = 0.9;
/// Gap between the body edge and a pin name, in mm.
pub const PIN_NAME_OFFSET: f64 = 0.85;
pub const STROKE_WIDTH: f64 = 0.254;

/// Grid units occupied by each pin along a side.
pub const PIN_PITCH: i64 = 2;
pub const MIN_PIN_LENGTH: i64 = 4;
const SIDE_CLEARANCE: i64 = 1;
const LR_SEPARATION: i64 = 2;
const TB_SEPARATION: i64 = 2;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snap {
    Up,
    Down,
    Nearest,
}

/// Convert a length in mm to a whole number of grid units.
pub fn to_grid(mm: f64, snap: Snap) -> i64 {
    let units = mm / GRID;
    let snapped = match snap {
        Snap::Up => (units - EPSILON).ceil(),
        Snap::Down => (units + EPSILON).floor(),
        Snap::Nearest => units.round_ties_even(),
    };
    snapped as i64
}

pub fn grid_to_mm(units: i64) -> f64 {
    units as f64 * GRID
}

/// Render a millimetre value without float noise: `3.8100000000000005` → `3.81`.
pub fn format_mm(mm: f64) -> String {
    let s = format!("{mm:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Width of a label in mm. With an alternate delimiter the widest of the
/// alternatives counts.
pub fn text_width(text: &str, alt_delimiter: Option<&str>) -> f64 {
    let chars = match alt_delimiter {
        Some(delim) if !delim.is_empty() => text
            .split(delim)
            .map(|alt| alt.chars().count())
            .max()
            .unwrap_or(0),
        _ => text.chars().count(),
    };
    chars as f64 * CHAR_WIDTH * FONT_SIZE
}

/// A point in grid units, y pointing up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Point { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Lower-left corner.
    pub start: Point,
    /// Upper-right corner.
    pub end: Point,
}

/// Angle of the `at` clause for pins on `side`. The pin runs from its
/// connection point toward the body.
pub fn pin_angle(side: Side) -> u16 {
    match side {
        Side::Left => 0,
        Side::Right => 180,
        Side::Top => 270,
        Side::Bottom => 90,
    }
}

/// Pin length shared by every unit of a part: long enough for the widest
/// pin number plus two characters of padding.
pub fn pin_length(pins: &[PinRecord]) -> i64 {
    let widest = pins
        .iter()
        .map(|p| text_width(&format!("{}  ", p.real_number()), None))
        .fold(grid_to_mm(MIN_PIN_LENGTH), f64::max);
    to_grid(widest, Snap::Up)
}

/// Space taken by the pins of one side before it is turned to face its edge.
#[derive(Debug, Clone, Copy, Default)]
struct SideExtent {
    /// Widest pin label plus offset, in mm.
    label_width: f64,
    /// Length of the pin run, in grid units.
    run: i64,
}

fn side_extent(slots: &[Slot], alt_delimiter: Option<&str>) -> SideExtent {
    let label_width = slots
        .iter()
        .filter_map(Slot::pin)
        .map(|pin| text_width(&pin.name, alt_delimiter) + PIN_NAME_OFFSET)
        .fold(0.0, f64::max);
    SideExtent {
        label_width,
        run: slots.len() as i64 * PIN_PITCH,
    }
}

/// Computed layout of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitGeometry {
    pub width: i64,
    pub height: i64,
    pub body: Rect,
    pub pin_length: i64,
    positions: [Vec<Point>; 4],
}

impl UnitGeometry {
    /// Connection point of every slot on `side`, spacers included.
    pub fn positions(&self, side: Side) -> &[Point] {
        &self.positions[side.index()]
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.body.start.x, self.body.end.y)
    }

    /// Lay out one unit. Left/right pin columns sit beside the top/bottom
    /// rows; with `scrunch` they are tucked underneath them instead, which
    /// narrows the body at the cost of height.
    pub fn layout(unit: &UnitPins, pin_length: i64, options: &SymbolOptions) -> Self {
        let alt = options.alt_delimiter.as_deref();
        let [left, right, top, bottom] = Side::ALL.map(|side| side_extent(unit.side(side), alt));
        let clearance = grid_to_mm(SIDE_CLEARANCE);

        let lr_height = left.run.max(right.run);
        let lr_width = to_grid(left.label_width.max(right.label_width).max(clearance), Snap::Up);
        // Top and bottom labels stand upright, so their width is a height.
        let tb_height = to_grid(top.label_width.max(bottom.label_width).max(clearance), Snap::Up);
        let tb_width = top.run.max(bottom.run);

        let (width, height) = if options.scrunch {
            let width = (tb_width + 2 * SIDE_CLEARANCE)
                .max(LR_SEPARATION)
                .max(2 * lr_width);
            (width, 2 * tb_height + lr_height + 2 * SIDE_CLEARANCE)
        } else {
            (
                2 * lr_width.max(SIDE_CLEARANCE) + tb_width.max(LR_SEPARATION),
                2 * tb_height.max(SIDE_CLEARANCE) + lr_height.max(TB_SEPARATION),
            )
        };

        let x0 = half(-width);
        let y0 = half(-height);
        let x1 = half(width);
        let y1 = half(height);
        log::debug!(
            "unit {}: body {}x{} grid, lr {}x{}, tb {}x{}",
            unit.name,
            width,
            height,
            lr_width,
            lr_height,
            tb_width,
            tb_height
        );

        let offset = |span: i64, count: usize| -> i64 {
            (options.push * (span - count as i64 * PIN_PITCH) as f64).round_ties_even() as i64
        };
        let half_pitch = PIN_PITCH / 2;

        let positions = Side::ALL.map(|side| {
            let count = unit.side(side).len();
            let (start, step) = match side {
                Side::Left => {
                    let ctr = offset(lr_height, count);
                    (
                        Point::new(x0 - pin_length, y0 + tb_height + lr_height - ctr - half_pitch),
                        Point::new(0, -PIN_PITCH),
                    )
                }
                Side::Right => {
                    let ctr = offset(lr_height, count);
                    if options.ccw {
                        (
                            Point::new(x1 + pin_length, y0 + tb_height + ctr + half_pitch),
                            Point::new(0, PIN_PITCH),
                        )
                    } else {
                        (
                            Point::new(
                                x1 + pin_length,
                                y0 + tb_height + lr_height - ctr - half_pitch,
                            ),
                            Point::new(0, -PIN_PITCH),
                        )
                    }
                }
                Side::Top => {
                    let y = y1 + pin_length;
                    match (options.scrunch, options.ccw) {
                        (true, true) => {
                            let ctr = offset(width, count);
                            (
                                Point::new(x0 + width - ctr - half_pitch, y),
                                Point::new(-PIN_PITCH, 0),
                            )
                        }
                        (false, true) => {
                            let ctr = offset(tb_width, count);
                            (
                                Point::new(x0 + lr_width + tb_width - ctr - half_pitch, y),
                                Point::new(-PIN_PITCH, 0),
                            )
                        }
                        (true, false) => {
                            let ctr = offset(width, count);
                            (Point::new(x0 + ctr + half_pitch, y), Point::new(PIN_PITCH, 0))
                        }
                        (false, false) => {
                            let ctr = offset(tb_width, count);
                            (
                                Point::new(x0 + lr_width + ctr + half_pitch, y),
                                Point::new(PIN_PITCH, 0),
                            )
                        }
                    }
                }
                Side::Bottom => {
                    let y = -y1 - pin_length;
                    if options.scrunch {
                        let ctr = offset(width, count);
                        (Point::new(x0 + ctr + half_pitch, y), Point::new(PIN_PITCH, 0))
                    } else {
                        let ctr = offset(tb_width, count);
                        (
                            Point::new(x0 + lr_width + ctr + half_pitch, y),
                            Point::new(PIN_PITCH, 0),
                        )
                    }
                }
            };
            (0..count as i64)
                .map(|i| Point::new(start.x + i * step.x, start.y + i * step.y))
                .collect()
        });

        UnitGeometry {
            width,
            height,
            body: Rect {
                start: Point::new(x0, y0),
                end: Point::new(x1, y1),
            },
            pin_length,
            positions,
        }
    }
}

/// `n / 2` rounded half to even.
fn half(n: i64) -> i64 {
    (n as f64 / 2.0).round_ties_even() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::group_pins;
    use crate::pin::{PinDefaults, PinRecord};

    fn pins_on(side: Side, count: usize) -> Vec<PinRecord> {
        (1..=count)
            .map(|n| {
                PinRecord::new(n.to_string(), format!("P{n}"), n, &PinDefaults::default())
                    .with_side(side)
            })
            .collect()
    }

    #[test]
    fn grid_snapping() {
        assert_eq!(to_grid(1.27, Snap::Up), 1);
        assert_eq!(to_grid(1.28, Snap::Up), 2);
        assert_eq!(to_grid(2.53, Snap::Down), 1);
        assert_eq!(to_grid(0.5 * GRID, Snap::Nearest), 0);
        assert_eq!(to_grid(0.6 * GRID, Snap::Nearest), 1);
        assert_eq!(to_grid(grid_to_mm(4), Snap::Up), 4);
    }

    #[test]
    fn mm_formatting() {
        assert_eq!(format_mm(grid_to_mm(3)), "3.81");
        assert_eq!(format_mm(grid_to_mm(-5)), "-6.35");
        assert_eq!(format_mm(grid_to_mm(0)), "0");
        assert_eq!(format_mm(2.5 * GRID), "3.175");
        assert_eq!(format_mm(-0.00001), "0");
    }

    #[test]
    fn text_width_uses_longest_alternate() {
        assert!((text_width("ABCD", None) - 4.0 * 0.9 * 1.27).abs() < 1e-9);
        assert_eq!(
            text_width("PA1/TIM2_CH1/X", Some("/")),
            text_width("TIM2_CH1", None)
        );
    }

    #[test]
    fn pin_length_has_a_floor() {
        assert_eq!(pin_length(&pins_on(Side::Left, 3)), MIN_PIN_LENGTH);
        let long = vec![PinRecord::new("AB1234", "X", 0, &PinDefaults::default())];
        // 8 characters * 0.9 = 7.2 grid units
        assert_eq!(pin_length(&long), 8);
    }

    #[test]
    fn left_column_runs_top_down() {
        let pins = pins_on(Side::Left, 3);
        let options = SymbolOptions::default();
        let units = group_pins(&pins, &options);
        let geo = UnitGeometry::layout(&units[0], 4, &options);

        // "P3" + offset fits in 3 grid units, one clearance above and below.
        assert_eq!((geo.width, geo.height), (2 * 3 + 2, 2 + 6));
        assert_eq!(geo.body.start, Point::new(-4, -4));
        assert_eq!(geo.body.end, Point::new(4, 4));
        let ys: Vec<i64> = geo.positions(Side::Left).iter().map(|p| p.y).collect();
        assert_eq!(ys, [2, 0, -2]);
        assert!(geo.positions(Side::Left).iter().all(|p| p.x == -8));
    }

    #[test]
    fn ccw_reverses_right_side() {
        let pins = pins_on(Side::Right, 2);
        let options = SymbolOptions {
            ccw: true,
            ..Default::default()
        };
        let units = group_pins(&pins, &options);
        let geo = UnitGeometry::layout(&units[0], 4, &options);
        let ys: Vec<i64> = geo.positions(Side::Right).iter().map(|p| p.y).collect();
        assert!(ys[0] < ys[1]);
    }

    #[test]
    fn scrunch_trades_width_for_height() {
        let mut pins = pins_on(Side::Left, 8);
        pins.extend(pins_on(Side::Top, 12).into_iter().map(|p| PinRecord {
            number: format!("T{}", p.number),
            ..p
        }));
        let normal = SymbolOptions::default();
        let scrunched = SymbolOptions {
            scrunch: true,
            ..Default::default()
        };
        let units = group_pins(&pins, &normal);
        let a = UnitGeometry::layout(&units[0], 4, &normal);
        let b = UnitGeometry::layout(&units[0], 4, &scrunched);
        assert!(b.width <= a.width);
        assert!(b.height >= a.height);
    }

    #[test]
    fn angles_face_the_body() {
        assert_eq!(pin_angle(Side::Left), 0);
        assert_eq!(pin_angle(Side::Right), 180);
        assert_eq!(pin_angle(Side::Top), 270);
        assert_eq!(pin_angle(Side::Bottom), 90);
    }
}
