//! Core value types shared by documents, edges and the ledger wire format

use crate::error::{DocGraphError, DocGraphResult};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

const NAME_CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";

fn name_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some((c - b'a') as u64 + 6),
        b'1'..=b'5' => Some((c - b'1') as u64 + 1),
        b'.' => Some(0),
        _ => None,
    }
}

/// Short symbolic identifier (account, action and edge names)
///
/// Up to 13 characters from `.12345a-z`; the 13th character is limited to
/// `.12345a-j` because it only has four bits in the packed `u64` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    pub const MAX_LEN: usize = 13;

    pub fn new(name: impl Into<String>) -> DocGraphResult<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Name(name))
    }

    /// Literal names known to be valid
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(Self::validate(name).is_ok());
        Name(name.to_string())
    }

    fn validate(name: &str) -> DocGraphResult<()> {
        if name.len() > Self::MAX_LEN {
            return Err(DocGraphError::InvalidName(format!(
                "{} is longer than {} characters",
                name,
                Self::MAX_LEN
            )));
        }
        if name.ends_with('.') {
            return Err(DocGraphError::InvalidName(format!("{} ends with '.'", name)));
        }
        for (i, c) in name.bytes().enumerate() {
            let symbol = name_symbol(c).ok_or_else(|| {
                DocGraphError::InvalidName(format!("{} contains '{}'", name, c as char))
            })?;
            if i == 12 && symbol > 0x0f {
                return Err(DocGraphError::InvalidName(format!(
                    "{} has an invalid 13th character",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Packed form used by the binary encoding
    pub fn to_u64(&self) -> u64 {
        let bytes = self.0.as_bytes();
        let mut value = 0u64;
        for i in 0..Self::MAX_LEN {
            let symbol = bytes.get(i).and_then(|c| name_symbol(*c)).unwrap_or(0);
            if i < 12 {
                value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
            } else {
                value |= symbol & 0x0f;
            }
        }
        value
    }

    pub fn from_u64(value: u64) -> Self {
        let mut chars = [b'.'; 13];
        let mut tmp = value;
        for i in 0..Self::MAX_LEN {
            let mask = if i == 0 { 0x0f } else { 0x1f };
            chars[12 - i] = NAME_CHARMAP[(tmp & mask) as usize];
            tmp >>= if i == 0 { 4 } else { 5 };
        }
        let text = String::from_utf8_lossy(&chars);
        Name(text.trim_end_matches('.').to_string())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Name {
    type Err = DocGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::new(s)
    }
}

impl TryFrom<String> for Name {
    type Error = DocGraphError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Name::new(s)
    }
}

impl TryFrom<&str> for Name {
    type Error = DocGraphError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Name::new(s)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

/// 32-byte digest; the identity of a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum256([u8; 32]);

impl Checksum256 {
    pub fn new(bytes: [u8; 32]) -> Self {
        Checksum256(bytes)
    }

    /// SHA-256 of arbitrary bytes
    pub fn digest(data: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data.as_ref());
        Checksum256(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Checksum256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Checksum256 {
    type Err = DocGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| DocGraphError::InvalidHash(format!("{}: {}", s, e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DocGraphError::InvalidHash(format!("{} is not 32 bytes", s)))?;
        Ok(Checksum256(bytes))
    }
}

impl TryFrom<String> for Checksum256 {
    type Error = DocGraphError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Checksum256> for String {
    fn from(hash: Checksum256) -> Self {
        hash.to_string()
    }
}

impl From<[u8; 32]> for Checksum256 {
    fn from(bytes: [u8; 32]) -> Self {
        Checksum256(bytes)
    }
}

/// Asset symbol: decimal precision plus an uppercase code of up to 7 letters
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Symbol {
    precision: u8,
    code: String,
}

impl Symbol {
    pub const MAX_PRECISION: u8 = 18;

    pub fn new(precision: u8, code: impl Into<String>) -> DocGraphResult<Self> {
        let code = code.into();
        if precision > Self::MAX_PRECISION {
            return Err(DocGraphError::InvalidAsset(format!(
                "precision {} exceeds {}",
                precision,
                Self::MAX_PRECISION
            )));
        }
        if code.is_empty() || code.len() > 7 || !code.bytes().all(|c| c.is_ascii_uppercase()) {
            return Err(DocGraphError::InvalidAsset(format!("invalid symbol code {:?}", code)));
        }
        Ok(Symbol { precision, code })
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn to_u64(&self) -> u64 {
        let mut value = self.precision as u64;
        for (i, c) in self.code.bytes().enumerate() {
            value |= (c as u64) << (8 * (i + 1));
        }
        value
    }

    pub fn from_u64(value: u64) -> DocGraphResult<Self> {
        let precision = (value & 0xff) as u8;
        let mut code = String::new();
        let mut tmp = value >> 8;
        while tmp & 0xff != 0 {
            code.push((tmp & 0xff) as u8 as char);
            tmp >>= 8;
        }
        Symbol::new(precision, code)
    }
}

/// Fixed-point quantity with a symbol, e.g. `1.0000 HYPHA`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Asset { amount, symbol }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.symbol.precision as u32;
        let unit = 10i128.pow(precision);
        let amount = self.amount as i128;
        let sign = if amount < 0 { "-" } else { "" };
        let whole = amount.abs() / unit;
        let fraction = amount.abs() % unit;
        if precision == 0 {
            write!(f, "{}{} {}", sign, whole, self.symbol.code)
        } else {
            write!(
                f,
                "{}{}.{:0width$} {}",
                sign,
                whole,
                fraction,
                self.symbol.code,
                width = precision as usize
            )
        }
    }
}

impl FromStr for Asset {
    type Err = DocGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DocGraphError::InvalidAsset(s.to_string());
        let (quantity, code) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let (negative, digits) = match quantity.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, quantity),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() || !whole.bytes().chain(fraction.bytes()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let precision = u8::try_from(fraction.len()).map_err(|_| invalid())?;
        let symbol = Symbol::new(precision, code.trim())?;
        let amount: i128 = format!("{}{}", whole, fraction).parse().map_err(|_| invalid())?;
        let amount = if negative { -amount } else { amount };
        let amount = i64::try_from(amount).map_err(|_| invalid())?;
        Ok(Asset { amount, symbol })
    }
}

impl Serialize for Asset {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Point in time, microseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimePoint(i64);

impl TimePoint {
    const FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S%.3f";

    pub fn from_micros(micros: i64) -> Self {
        TimePoint(micros)
    }

    pub fn now() -> Self {
        TimePoint(chrono::Utc::now().timestamp_micros())
    }

    pub fn as_micros(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::from_timestamp_micros(self.0) {
            Some(dt) => write!(f, "{}", dt.naive_utc().format(Self::FORMAT)),
            None => write!(f, "<time_point out of range: {}>", self.0),
        }
    }
}

impl FromStr for TimePoint {
    type Err = DocGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().trim_end_matches('Z');
        let parsed = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
            .map_err(|e| DocGraphError::InvalidTimestamp(format!("{}: {}", s, e)))?;
        Ok(TimePoint(parsed.and_utc().timestamp_micros()))
    }
}

impl Serialize for TimePoint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimePoint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Ledger rows may render 64-bit integers either as numbers or as strings
pub(crate) fn deserialize_u64<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert!(Name::new("badge").is_ok());
        assert!(Name::new("").is_ok());
        assert!(Name::new("abcdefghijkl1").is_ok());
        assert!(Name::new("abcdefghijklmn").is_err()); // 14 chars
        assert!(Name::new("abcdefghijklz").is_err()); // 13th char out of range
        assert!(Name::new("Badge").is_err());
        assert!(Name::new("edge9").is_err());
        assert!(Name::new("edge.").is_err());
    }

    #[test]
    fn test_name_packing() {
        for text in ["eosio", "edge1", "dao.hypha", "a", "zzzzzzzzzzzzj", ""] {
            let name = Name::new(text).unwrap();
            assert_eq!(Name::from_u64(name.to_u64()), name);
        }
        // well-known value of "eosio"
        assert_eq!(Name::new("eosio").unwrap().to_u64(), 6138663577826885632);
    }

    #[test]
    fn test_checksum_hex() {
        let hash = Checksum256::digest(b"hello");
        let text = hash.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text, text.to_lowercase());
        assert_eq!(text.parse::<Checksum256>().unwrap(), hash);
        assert!("abcd".parse::<Checksum256>().is_err());
        assert!("zz".repeat(32).parse::<Checksum256>().is_err());
    }

    #[test]
    fn test_asset_display_and_parse() {
        let asset: Asset = "1.0000 HYPHA".parse().unwrap();
        assert_eq!(asset.amount, 10000);
        assert_eq!(asset.symbol.precision(), 4);
        assert_eq!(asset.to_string(), "1.0000 HYPHA");

        let negative: Asset = "-0.05 USD".parse().unwrap();
        assert_eq!(negative.amount, -5);
        assert_eq!(negative.to_string(), "-0.05 USD");

        let whole: Asset = "42 SEEDS".parse().unwrap();
        assert_eq!(whole.symbol.precision(), 0);
        assert_eq!(whole.to_string(), "42 SEEDS");

        assert!("1.0 hypha".parse::<Asset>().is_err());
        assert!("1.0".parse::<Asset>().is_err());
        assert!("x.0 ABC".parse::<Asset>().is_err());
    }

    #[test]
    fn test_symbol_packing() {
        let symbol = Symbol::new(4, "HYPHA").unwrap();
        assert_eq!(Symbol::from_u64(symbol.to_u64()).unwrap(), symbol);
        // 4,EOS is a well-known packed symbol
        assert_eq!(Symbol::new(4, "EOS").unwrap().to_u64(), 1397703940);
    }

    #[test]
    fn test_time_point_format() {
        let tp: TimePoint = "2020-10-16T12:30:45.500".parse().unwrap();
        assert_eq!(tp.to_string(), "2020-10-16T12:30:45.500");
        let plain: TimePoint = "2020-10-16T12:30:45".parse().unwrap();
        assert_eq!(plain.to_string(), "2020-10-16T12:30:45.000");
        assert_eq!(TimePoint::default().to_string(), "1970-01-01T00:00:00.000");
        assert!("yesterday".parse::<TimePoint>().is_err());
    }
}
