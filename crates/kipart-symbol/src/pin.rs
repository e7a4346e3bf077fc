use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KipartError;

/// Leading character(s) of a pin number that mark an empty slot.
pub const SPACER_MARKER: char = '*';

/// Electrical type of a pin, written as the first atom of `(pin TYPE STYLE ..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinType {
    Input,
    Output,
    Bidirectional,
    TriState,
    #[default]
    Passive,
    Free,
    Unspecified,
    PowerIn,
    PowerOut,
    OpenCollector,
    OpenEmitter,
    NoConnect,
}

impl PinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinType::Input => "input",
            PinType::Output => "output",
            PinType::Bidirectional => "bidirectional",
            PinType::TriState => "tri_state",
            PinType::Passive => "passive",
            PinType::Free => "free",
            PinType::Unspecified => "unspecified",
            PinType::PowerIn => "power_in",
            PinType::PowerOut => "power_out",
            PinType::OpenCollector => "open_collector",
            PinType::OpenEmitter => "open_emitter",
            PinType::NoConnect => "no_connect",
        }
    }

    /// Power, ground and no-connect pins may be stacked into one bundle.
    pub fn is_bundle_eligible(&self) -> bool {
        matches!(
            self,
            PinType::PowerIn | PinType::PowerOut | PinType::NoConnect
        )
    }
}

impl FromStr for PinType {
    type Err = KipartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        let pin_type = match value.as_str() {
            "input" | "inp" | "in" | "clk" => PinType::Input,
            "output" | "out" | "outp" => PinType::Output,
            "bidirectional" | "bidir" | "bi" | "inout" | "io" | "iop" => PinType::Bidirectional,
            "tri_state" | "tri-state" | "tri" | "tristate" => PinType::TriState,
            "passive" | "pass" => PinType::Passive,
            "free" => PinType::Free,
            "unspecified" | "un" | "analog" => PinType::Unspecified,
            "power_in" | "pwr_in" | "pwrin" | "power" | "pwr" | "ground" | "gnd" => {
                PinType::PowerIn
            }
            "power_out" | "pwr_out" | "pwrout" | "pwr_o" => PinType::PowerOut,
            "open_collector" | "opencollector" | "open_coll" | "opencoll" | "oc" => {
                PinType::OpenCollector
            }
            "open_emitter" | "openemitter" | "open_emit" | "openemit" | "oe" => {
                PinType::OpenEmitter
            }
            "no_connect" | "noconnect" | "no_conn" | "noconn" | "nc" => PinType::NoConnect,
            _ => return Err(KipartError::invalid_value("pin type", s.trim())),
        };
        Ok(pin_type)
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graphic style of a pin, the second atom of `(pin TYPE STYLE ..)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStyle {
    #[default]
    Line,
    Inverted,
    Clock,
    InvertedClock,
    InputLow,
    ClockLow,
    OutputLow,
    EdgeClockHigh,
    NonLogic,
}

impl PinStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinStyle::Line => "line",
            PinStyle::Inverted => "inverted",
            PinStyle::Clock => "clock",
            PinStyle::InvertedClock => "inverted_clock",
            PinStyle::InputLow => "input_low",
            PinStyle::ClockLow => "clock_low",
            PinStyle::OutputLow => "output_low",
            PinStyle::EdgeClockHigh => "edge_clock_high",
            PinStyle::NonLogic => "non_logic",
        }
    }
}

impl FromStr for PinStyle {
    type Err = KipartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        let style = match value.as_str() {
            "line" | "" => PinStyle::Line,
            "inverted" | "inv" | "~" | "#" => PinStyle::Inverted,
            "clock" | "clk" | "rising_clk" => PinStyle::Clock,
            "inverted_clock" | "inv_clk" | "clk_b" | "clk_n" | "~clk" | "#clk" => {
                PinStyle::InvertedClock
            }
            "input_low" | "inp_low" | "in_lw" | "in_b" | "in_n" | "~in" | "#in" => {
                PinStyle::InputLow
            }
            "clock_low" | "clk_low" | "clk_lw" => PinStyle::ClockLow,
            "output_low" | "outp_low" | "out_lw" | "out_b" | "out_n" | "~out" | "#out" => {
                PinStyle::OutputLow
            }
            "edge_clock_high" => PinStyle::EdgeClockHigh,
            "non_logic" | "nl" | "analog" => PinStyle::NonLogic,
            _ => return Err(KipartError::invalid_value("pin style", s.trim())),
        };
        Ok(style)
    }
}

impl fmt::Display for PinStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the body a pin is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];

    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
            Side::Top => 2,
            Side::Bottom => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Top => "top",
            Side::Bottom => "bottom",
        }
    }

    /// Side a pin sits on, given the angle of its `at` clause.
    pub fn from_angle(angle: f64) -> Option<Side> {
        let angle = angle.rem_euclid(360.0).round() as i64;
        match angle {
            0 => Some(Side::Left),
            90 => Some(Side::Bottom),
            180 => Some(Side::Right),
            270 => Some(Side::Top),
            _ => None,
        }
    }
}

impl FromStr for Side {
    type Err = KipartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" | "l" => Ok(Side::Left),
            "right" | "r" => Ok(Side::Right),
            "top" | "t" => Ok(Side::Top),
            "bottom" | "b" => Ok(Side::Bottom),
            _ => Err(KipartError::invalid_value("side", s.trim())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a yes/no/true/false style cell.
pub fn parse_yes_no(s: &str) -> Result<bool, KipartError> {
    match s.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" => Ok(true),
        "no" | "n" | "false" | "f" | "0" => Ok(false),
        _ => Err(KipartError::invalid_value("yes/no", s.trim())),
    }
}

/// Attribute values applied to every pin that does not set its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PinDefaults {
    pub side: Side,
    pub pin_type: PinType,
    pub style: PinStyle,
}

/// One pin as delivered by a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinRecord {
    /// Pin number, possibly prefixed with spacer markers.
    pub number: String,
    pub name: String,
    pub pin_type: PinType,
    pub style: PinStyle,
    pub side: Side,
    pub unit: String,
    pub hidden: bool,
    pub row_index: usize,
}

impl PinRecord {
    pub fn new(
        number: impl Into<String>,
        name: impl Into<String>,
        row_index: usize,
        defaults: &PinDefaults,
    ) -> Self {
        PinRecord {
            number: number.into(),
            name: name.into(),
            pin_type: defaults.pin_type,
            style: defaults.style,
            side: defaults.side,
            unit: "1".to_string(),
            hidden: false,
            row_index,
        }
    }

    /// Apply whatever attributes a row set explicitly.
    pub fn with_overrides(mut self, overrides: PinOverrides) -> Self {
        if let Some(unit) = overrides.unit {
            self.unit = unit;
        }
        if let Some(side) = overrides.side {
            self.side = side;
        }
        if let Some(pin_type) = overrides.pin_type {
            self.pin_type = pin_type;
        }
        if let Some(style) = overrides.style {
            self.style = style;
        }
        if let Some(hidden) = overrides.hidden {
            self.hidden = hidden;
        }
        self
    }

    pub fn with_type(mut self, pin_type: PinType) -> Self {
        self.pin_type = pin_type;
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Number of spacer markers in front of the pin number.
    pub fn spacer_count(&self) -> usize {
        self.number
            .chars()
            .take_while(|&c| c == SPACER_MARKER)
            .count()
    }

    /// Pin number with spacer markers removed.
    pub fn real_number(&self) -> &str {
        self.number.trim_start_matches(SPACER_MARKER)
    }
}

/// Explicitly set attributes of one input row. Unset fields keep the
/// defaults the record was created with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinOverrides {
    pub unit: Option<String>,
    pub side: Option<Side>,
    pub pin_type: Option<PinType>,
    pub style: Option<PinStyle>,
    pub hidden: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_aliases() {
        assert_eq!("GND".parse::<PinType>().unwrap(), PinType::PowerIn);
        assert_eq!(" io ".parse::<PinType>().unwrap(), PinType::Bidirectional);
        assert_eq!("oe".parse::<PinType>().unwrap(), PinType::OpenEmitter);
        assert_eq!("NC".parse::<PinType>().unwrap(), PinType::NoConnect);
        assert!("sideways".parse::<PinType>().is_err());
    }

    #[test]
    fn style_aliases() {
        assert_eq!("".parse::<PinStyle>().unwrap(), PinStyle::Line);
        assert_eq!("~".parse::<PinStyle>().unwrap(), PinStyle::Inverted);
        assert_eq!("#clk".parse::<PinStyle>().unwrap(), PinStyle::InvertedClock);
        assert_eq!("clk_low".parse::<PinStyle>().unwrap(), PinStyle::ClockLow);
    }

    #[test]
    fn sides_and_angles() {
        assert_eq!("B".parse::<Side>().unwrap(), Side::Bottom);
        assert_eq!(Side::from_angle(180.0), Some(Side::Right));
        assert_eq!(Side::from_angle(-90.0), Some(Side::Top));
        assert_eq!(Side::from_angle(45.0), None);
    }

    #[test]
    fn yes_no() {
        assert!(parse_yes_no("Y").unwrap());
        assert!(!parse_yes_no("0").unwrap());
        assert!(parse_yes_no("maybe").is_err());
    }

    #[test]
    fn overrides_only_touch_set_fields() {
        let defaults = PinDefaults {
            side: Side::Right,
            ..Default::default()
        };
        let pin = PinRecord::new("**7", "CLK", 3, &defaults).with_overrides(PinOverrides {
            pin_type: Some(PinType::Input),
            ..Default::default()
        });
        assert_eq!(pin.side, Side::Right);
        assert_eq!(pin.pin_type, PinType::Input);
        assert_eq!(pin.unit, "1");
        assert_eq!(pin.spacer_count(), 2);
        assert_eq!(pin.real_number(), "7");
    }
}
