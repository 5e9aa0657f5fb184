//! Closed grading enumerations (color, clarity, cut)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Field, ValidationError};

/// Color grade, D (colorless) through M (faint)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
}

impl Color {
    pub const ALL: [Color; 10] = [
        Color::D,
        Color::E,
        Color::F,
        Color::G,
        Color::H,
        Color::I,
        Color::J,
        Color::K,
        Color::L,
        Color::M,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::D => "D",
            Color::E => "E",
            Color::F => "F",
            Color::G => "G",
            Color::H => "H",
            Color::I => "I",
            Color::J => "J",
            Color::K => "K",
            Color::L => "L",
            Color::M => "M",
        }
    }
}

impl FromStr for Color {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Color::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::new(Field::Color, format!("unknown color grade '{}'", s)))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clarity grade, flawless through slightly included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Clarity {
    #[serde(rename = "FL")]
    Fl,
    #[serde(rename = "IF")]
    If,
    #[serde(rename = "VVS1")]
    Vvs1,
    #[serde(rename = "VVS2")]
    Vvs2,
    #[serde(rename = "VS1")]
    Vs1,
    #[serde(rename = "VS2")]
    Vs2,
    #[serde(rename = "SI1")]
    Si1,
    #[serde(rename = "SI2")]
    Si2,
}

impl Clarity {
    pub const ALL: [Clarity; 8] = [
        Clarity::Fl,
        Clarity::If,
        Clarity::Vvs1,
        Clarity::Vvs2,
        Clarity::Vs1,
        Clarity::Vs2,
        Clarity::Si1,
        Clarity::Si2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Clarity::Fl => "FL",
            Clarity::If => "IF",
            Clarity::Vvs1 => "VVS1",
            Clarity::Vvs2 => "VVS2",
            Clarity::Vs1 => "VS1",
            Clarity::Vs2 => "VS2",
            Clarity::Si1 => "SI1",
            Clarity::Si2 => "SI2",
        }
    }
}

impl FromStr for Clarity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Clarity::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                ValidationError::new(Field::Clarity, format!("unknown clarity grade '{}'", s))
            })
    }
}

impl fmt::Display for Clarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cut grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Cut {
    Excellent,
    #[serde(rename = "Very Good")]
    VeryGood,
    Good,
    Fair,
    Poor,
}

impl Cut {
    pub const ALL: [Cut; 5] = [Cut::Excellent, Cut::VeryGood, Cut::Good, Cut::Fair, Cut::Poor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cut::Excellent => "Excellent",
            Cut::VeryGood => "Very Good",
            Cut::Good => "Good",
            Cut::Fair => "Fair",
            Cut::Poor => "Poor",
        }
    }
}

impl FromStr for Cut {
    type Err = ValidationError;

    /// Accepts "Very Good", "VeryGood", "very-good" and "very_good" alike
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squash = |v: &str| -> String {
            v.chars()
                .filter(|c| !matches!(c, ' ' | '-' | '_'))
                .collect::<String>()
                .to_ascii_lowercase()
        };
        let wanted = squash(s);
        Cut::ALL
            .iter()
            .copied()
            .find(|c| squash(c.as_str()) == wanted)
            .ok_or_else(|| ValidationError::new(Field::Cut, format!("unknown cut grade '{}'", s)))
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerations_are_closed() {
        assert_eq!(Color::ALL.len(), 10);
        assert_eq!(Clarity::ALL.len(), 8);
        assert_eq!(Cut::ALL.len(), 5);
    }

    #[test]
    fn test_color_parse() {
        assert_eq!("D".parse::<Color>().unwrap(), Color::D);
        assert_eq!("m".parse::<Color>().unwrap(), Color::M);
        let err = "Z".parse::<Color>().unwrap_err();
        assert_eq!(err.field, Field::Color);
    }

    #[test]
    fn test_clarity_parse() {
        assert_eq!("VVS1".parse::<Clarity>().unwrap(), Clarity::Vvs1);
        let err = "I3".parse::<Clarity>().unwrap_err();
        assert_eq!(err.field, Field::Clarity);
    }

    #[test]
    fn test_cut_parse_spellings() {
        for spelling in ["Very Good", "VeryGood", "very-good", "VERY_GOOD"] {
            assert_eq!(spelling.parse::<Cut>().unwrap(), Cut::VeryGood);
        }
        assert_eq!("Excellent".parse::<Cut>().unwrap(), Cut::Excellent);
        assert_eq!("Ideal".parse::<Cut>().unwrap_err().field, Field::Cut);
    }

    #[test]
    fn test_serde_uses_trade_names() {
        assert_eq!(serde_json::to_string(&Clarity::Vvs1).unwrap(), "\"VVS1\"");
        assert_eq!(serde_json::to_string(&Cut::VeryGood).unwrap(), "\"Very Good\"");
    }
}
