use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

const KIB: u64 = 1 << 10;
const MIB: u64 = 1 << 20;
const GIB: u64 = 1 << 30;
const TIB: u64 = 1 << 40;
const PIB: u64 = 1 << 50;

/// Binary units used when rendering a byte count, largest first.
const BINARY_UNITS: [(u64, &str); 5] = [
    (PIB, "PiB"),
    (TIB, "TiB"),
    (GIB, "GiB"),
    (MIB, "MiB"),
    (KIB, "KiB"),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ByteCountParseError {
    #[error("empty byte count")]
    Empty,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("byte count '{0}' is too large")]
    Overflow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteCount(pub u64);

impl From<u64> for ByteCount {
    fn from(x: u64) -> Self {
        ByteCount(x)
    }
}

impl ByteCount {
    pub fn bytes(self) -> u64 {
        self.0
    }

    pub fn kib(n: u64) -> Self {
        ByteCount(n * KIB)
    }

    pub fn mib(n: u64) -> Self {
        ByteCount(n * MIB)
    }

    pub fn gib(n: u64) -> Self {
        ByteCount(n * GIB)
    }

    pub fn tib(n: u64) -> Self {
        ByteCount(n * TIB)
    }

    /// Renders the count with the largest binary unit that divides it
    /// exactly, e.g. "10 GiB". Falls back to plain bytes.
    pub fn to_human_readable(&self) -> String {
        if self.0 == 0 {
            return "0".to_owned();
        }

        BINARY_UNITS
            .iter()
            .find(|(factor, _)| self.0 % factor == 0)
            .map(|(factor, unit)| format!("{} {unit}", self.0 / factor))
            .unwrap_or_else(|| self.0.to_string())
    }

    /// Parses "1024", "512 MiB", "1G", "2 GB" or "1.5 GiB".
    ///
    /// Single letters and the "iB" suffixes are binary units, "B" suffixed
    /// units (KB, MB...) are decimal. Units are case insensitive.
    pub fn from_human_readable(s: &str) -> Result<Self, ByteCountParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ByteCountParseError::Empty);
        }

        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let unit = unit.trim();

        let multiplier = unit_multiplier(unit)
            .ok_or_else(|| ByteCountParseError::UnknownUnit(unit.to_owned()))?;

        let (whole, fraction) = match number.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (number, ""),
        };

        if whole.is_empty() || fraction.contains('.') {
            return Err(ByteCountParseError::InvalidNumber(number.to_owned()));
        }

        let whole: u128 = whole
            .parse()
            .map_err(|_| ByteCountParseError::InvalidNumber(number.to_owned()))?;

        let mut total = whole * multiplier as u128;
        if !fraction.is_empty() {
            let digits: u128 = fraction
                .parse()
                .map_err(|_| ByteCountParseError::InvalidNumber(number.to_owned()))?;
            let scale = 10u128
                .checked_pow(fraction.len() as u32)
                .ok_or_else(|| ByteCountParseError::InvalidNumber(number.to_owned()))?;
            total += digits * multiplier as u128 / scale;
        }

        u64::try_from(total)
            .map(ByteCount)
            .map_err(|_| ByteCountParseError::Overflow(s.to_owned()))
    }
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kib" => KIB,
        "m" | "mib" => MIB,
        "g" | "gib" => GIB,
        "t" | "tib" => TIB,
        "p" | "pib" => PIB,
        "kb" => 1_000,
        "mb" => 1_000_000,
        "gb" => 1_000_000_000,
        "tb" => 1_000_000_000_000,
        "pb" => 1_000_000_000_000_000,
        _ => return None,
    };
    Some(multiplier)
}

impl Display for ByteCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}

impl FromStr for ByteCount {
    type Err = ByteCountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_human_readable(s)
    }
}

impl<'de> Deserialize<'de> for ByteCount {
    fn deserialize<D>(deserializer: D) -> Result<ByteCount, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Counts come either as plain integers or as strings with a unit.
        let value = serde_json::Value::deserialize(deserializer)?;

        match value {
            serde_json::Value::String(s) => ByteCount::from_str(s.as_str())
                .map_err(|e| serde::de::Error::custom(format!("invalid byte count: {e}"))),
            serde_json::Value::Number(n) => n.as_u64().map(ByteCount).ok_or_else(|| {
                serde::de::Error::custom("invalid byte count, expected unsigned integer")
            }),
            _ => Err(serde::de::Error::custom("invalid byte count")),
        }
    }
}

impl Serialize for ByteCount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string() {
        assert_eq!(ByteCount::from_str("1").unwrap(), ByteCount(1));
        assert_eq!(ByteCount::from_str("20K").unwrap(), ByteCount(20 * KIB));
        assert_eq!(ByteCount::from_str("30 MiB").unwrap(), ByteCount(30 * MIB));
        assert_eq!(ByteCount::from_str("40GiB").unwrap(), ByteCount(40 * GIB));
        assert_eq!(ByteCount::from_str("50 t").unwrap(), ByteCount(50 * TIB));
        assert_eq!(ByteCount::from_str("2 GB").unwrap(), ByteCount(2_000_000_000));
        assert_eq!(ByteCount::from_str("1.5 GiB").unwrap(), ByteCount(GIB + GIB / 2));
        assert_eq!(ByteCount::from_str("0.5K").unwrap(), ByteCount(512));
        assert_eq!(ByteCount::from_str("100 B").unwrap(), ByteCount(100));

        // Allowed spacing
        assert_eq!(ByteCount::from_str(" 1024 ").unwrap(), ByteCount(1024));
        assert_eq!(ByteCount::from_str(" 300 KiB ").unwrap(), ByteCount(300 * KIB));

        // Invalid numbers
        assert_eq!(
            ByteCount::from_str("1..0"),
            Err(ByteCountParseError::InvalidNumber("1..0".into()))
        );
        assert_eq!(
            ByteCount::from_str(".5G"),
            Err(ByteCountParseError::InvalidNumber(".5".into()))
        );

        // Invalid units
        assert_eq!(
            ByteCount::from_str("1 X"),
            Err(ByteCountParseError::UnknownUnit("X".into()))
        );
        assert!(ByteCount::from_str("1 0K").is_err());
        assert!(ByteCount::from_str("X10K").is_err());
        assert_eq!(ByteCount::from_str("  "), Err(ByteCountParseError::Empty));

        // Out of range
        assert!(matches!(
            ByteCount::from_str("100000 PiB"),
            Err(ByteCountParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_to_human_readable() {
        assert_eq!(ByteCount(0).to_string(), "0");
        assert_eq!(ByteCount(1).to_string(), "1");
        assert_eq!(ByteCount(1023).to_string(), "1023");
        assert_eq!(ByteCount(1024).to_string(), "1 KiB");
        assert_eq!(ByteCount(1025).to_string(), "1025");
        assert_eq!(ByteCount::mib(1).to_string(), "1 MiB");
        assert_eq!(ByteCount(MIB + KIB).to_string(), "1025 KiB");
        assert_eq!(ByteCount::gib(20).to_string(), "20 GiB");
        assert_eq!(ByteCount::tib(3).to_string(), "3 TiB");
        assert_eq!(ByteCount(2_000_000_000).to_string(), "1953125 KiB");
    }

    #[test]
    fn test_human_readable_parses_back() {
        for count in [
            ByteCount(0),
            ByteCount(1025),
            ByteCount::kib(3),
            ByteCount::gib(10),
            ByteCount::tib(1),
        ] {
            assert_eq!(
                ByteCount::from_str(&count.to_human_readable()).unwrap(),
                count
            );
        }
    }

    #[test]
    fn test_serde() {
        #[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
        struct TestStruct {
            size: ByteCount,
        }

        let parsed: TestStruct = serde_json::from_str(r#"{"size": "1 GiB"}"#).unwrap();
        assert_eq!(parsed.size, ByteCount::gib(1));

        let parsed: TestStruct = serde_json::from_str(r#"{"size": 4096}"#).unwrap();
        assert_eq!(parsed.size, ByteCount(4096));

        let parsed: TestStruct = serde_yaml::from_str("size: 2G").unwrap();
        assert_eq!(parsed.size, ByteCount::gib(2));

        assert!(serde_json::from_str::<TestStruct>(r#"{"size": -1}"#).is_err());
        assert!(serde_json::from_str::<TestStruct>(r#"{"size": true}"#).is_err());
        assert!(serde_json::from_str::<TestStruct>(r#"{"size": "lots"}"#).is_err());

        assert_eq!(
            serde_json::to_string(&TestStruct {
                size: ByteCount::mib(1)
            })
            .unwrap(),
            r#"{"size":1048576}"#
        );
    }
}
