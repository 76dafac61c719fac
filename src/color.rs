use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque RGB colour as used by the story composers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor([u8; 3]);

impl HexColor {
    pub const WHITE: HexColor = HexColor([0xFF, 0xFF, 0xFF]);
    pub const BLACK: HexColor = HexColor([0x00, 0x00, 0x00]);

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        HexColor([r, g, b])
    }

    /// Accepts `#RRGGBB` or `RRGGBB`, any case, surrounding whitespace ignored.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 {
            return None;
        }
        let mut rgb = [0u8; 3];
        hex::decode_to_slice(digits, &mut rgb).ok()?;
        Some(HexColor(rgb))
    }
}

impl std::fmt::Display for HexColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", hex::encode_upper(self.0))
    }
}

impl std::str::FromStr for HexColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HexColor::parse(s).ok_or_else(|| format!("'{s}' is not a #RRGGBB colour"))
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_forms() {
        assert_eq!(HexColor::parse("#FFFFFF"), Some(HexColor::WHITE));
        assert_eq!(HexColor::parse("000000"), Some(HexColor::BLACK));
        assert_eq!(HexColor::parse("  #1a2B3c "), Some(HexColor::new(0x1A, 0x2B, 0x3C)));
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(HexColor::parse("#FFF"), None);
        assert_eq!(HexColor::parse("#GG0000"), None);
        assert_eq!(HexColor::parse("#FF00FF00"), None);
        assert_eq!(HexColor::parse(""), None);
    }

    #[test]
    fn renders_canonical_upper_case() {
        assert_eq!(HexColor::new(0xab, 0x01, 0xff).to_string(), "#AB01FF");
        assert_eq!(serde_json::to_string(&HexColor::WHITE).unwrap(), "\"#FFFFFF\"");
    }
}
