//! Experimental conditions: information levels, dropout levels, pairings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Detailed (`high_info`) vs. sparse/degraded (`low_info`) input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InfoLevel {
    #[serde(rename = "high_info")]
    High,
    #[serde(rename = "low_info")]
    Low,
}

impl InfoLevel {
    pub const ALL: [InfoLevel; 2] = [InfoLevel::High, InfoLevel::Low];

    /// Directory name used throughout the layout.
    pub fn dir_name(self) -> &'static str {
        match self {
            InfoLevel::High => "high_info",
            InfoLevel::Low => "low_info",
        }
    }

    fn code(self) -> &'static str {
        match self {
            InfoLevel::High => "High",
            InfoLevel::Low => "Low",
        }
    }
}

impl fmt::Display for InfoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for InfoLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high_info" | "high" => Ok(InfoLevel::High),
            "low_info" | "low" => Ok(InfoLevel::Low),
            other => Err(format!("unknown info level: {other}")),
        }
    }
}

/// Percentage of pixels zeroed in degraded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DropoutLevel(pub u8);

impl DropoutLevel {
    /// Pristine images, used as the zero point in rescue analyses.
    pub const PRISTINE: DropoutLevel = DropoutLevel(0);

    /// Directory / CSV name, e.g. `dropout_25`.
    pub fn dir_name(self) -> String {
        format!("dropout_{}", self.0)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Fraction of pixels zeroed, in `[0, 1]`.
    pub fn probability(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for DropoutLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dropout_{}", self.0)
    }
}

impl FromStr for DropoutLevel {
    type Err = String;

    /// Accepts `dropout_25` or a bare `25`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("dropout_").unwrap_or(s);
        let pct: u8 = digits
            .parse()
            .map_err(|_| format!("invalid dropout level: {s}"))?;
        if pct > 100 {
            return Err(format!("dropout level above 100%: {s}"));
        }
        Ok(DropoutLevel(pct))
    }
}

/// An image info level paired with a text info level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pairing {
    pub image: InfoLevel,
    pub text: InfoLevel,
}

impl Pairing {
    pub const fn new(image: InfoLevel, text: InfoLevel) -> Self {
        Self { image, text }
    }

    /// The four pairings of the reference experiments, in their run order.
    pub const fn defaults() -> [Pairing; 4] {
        [
            Pairing::new(InfoLevel::Low, InfoLevel::High),
            Pairing::new(InfoLevel::High, InfoLevel::Low),
            Pairing::new(InfoLevel::Low, InfoLevel::Low),
            Pairing::new(InfoLevel::High, InfoLevel::High),
        ]
    }

    /// Folder name under a combined-embeddings root, e.g. `low_info_img__high_info_text`.
    pub fn folder_name(&self) -> String {
        format!("{}_img__{}_text", self.image.dir_name(), self.text.dir_name())
    }

    /// Short code used in result CSVs, e.g. `LowImg-HighText`.
    pub fn code(&self) -> String {
        format!("{}Img-{}Text", self.image.code(), self.text.code())
    }

    /// Human-readable label, e.g. `Degraded Image + Detailed Text`.
    ///
    /// The clean image side is always written `High-Quality Image`. Some
    /// older comparison tables call it `Detailed Image`; [`Pairing::from_label`]
    /// reads both spellings.
    pub fn label(&self) -> String {
        let image = match self.image {
            InfoLevel::High => "High-Quality Image",
            InfoLevel::Low => "Degraded Image",
        };
        let text = match self.text {
            InfoLevel::High => "Detailed Text",
            InfoLevel::Low => "Sparse Text",
        };
        format!("{image} + {text}")
    }

    /// Parse a label written by [`Pairing::label`], also accepting
    /// `Detailed Image` for the clean image side.
    pub fn from_label(s: &str) -> Option<Self> {
        let (img, txt) = s.split_once(" + ")?;
        let image = match img.trim() {
            "High-Quality Image" | "Detailed Image" => InfoLevel::High,
            "Degraded Image" => InfoLevel::Low,
            _ => return None,
        };
        let text = match txt.trim() {
            "Detailed Text" => InfoLevel::High,
            "Sparse Text" => InfoLevel::Low,
            _ => return None,
        };
        Some(Self::new(image, text))
    }

    /// Parse a representation code (`LowImg-HighText`), folder name or label.
    pub fn parse(s: &str) -> Option<Self> {
        if s.contains(" + ") {
            return Self::from_label(s);
        }
        if let Some((img, txt)) = s.split_once('-') {
            let image = match img {
                "HighImg" => InfoLevel::High,
                "LowImg" => InfoLevel::Low,
                _ => return None,
            };
            let text = match txt {
                "HighText" => InfoLevel::High,
                "LowText" => InfoLevel::Low,
                _ => return None,
            };
            return Some(Self::new(image, text));
        }
        let (img, txt) = s.split_once("_img__")?;
        let txt = txt.strip_suffix("_text")?;
        Some(Self::new(img.parse().ok()?, txt.parse().ok()?))
    }
}

impl fmt::Display for Pairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl TryFrom<String> for Pairing {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Pairing::parse(&value).ok_or_else(|| format!("unknown representation: {value}"))
    }
}

impl From<Pairing> for String {
    fn from(p: Pairing) -> Self {
        p.code()
    }
}

/// Folder name for a mixing weight, e.g. `alpha_0.25`.
pub fn alpha_dir_name(alpha: f32) -> String {
    format!("alpha_{alpha:.2}")
}

/// Human label for a representation code, falling back to the code itself.
pub fn representation_label(code: &str) -> String {
    Pairing::parse(code)
        .map(|p| p.label())
        .unwrap_or_else(|| code.to_string())
}
