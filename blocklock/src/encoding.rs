//! Text projections used at serialization boundaries.
//!
//! Big integers cross as decimal strings so no precision is lost to consumers with
//! fixed-width numbers, and byte strings cross as `0x`-prefixed hex.

use primitive_types::U256;
use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use serde_with::{DeserializeAs, SerializeAs};

pub(crate) struct Decimal;

impl SerializeAs<U256> for Decimal {
    fn serialize_as<S: Serializer>(source: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(source)
    }
}

impl<'de> DeserializeAs<'de, U256> for Decimal {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_decimal(&s).map_err(D::Error::custom)
    }
}

pub(crate) struct PrefixedHex;

impl SerializeAs<Vec<u8>> for PrefixedHex {
    fn serialize_as<S: Serializer>(source: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_prefixed_hex(source))
    }
}

impl<'de> DeserializeAs<'de, Vec<u8>> for PrefixedHex {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        from_prefixed_hex(&s).ok_or_else(|| D::Error::custom(format!("{s:?} is not 0x hex")))
    }
}

/// Parse unsigned decimal text, surrounding whitespace allowed.
///
/// `U256::from_dec_str` reads empty text as zero, so emptiness is checked first.
pub(crate) fn parse_decimal(s: &str) -> Result<U256, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty decimal value".to_string());
    }
    if s.starts_with('-') {
        return Err(format!("{s} is negative"));
    }
    U256::from_dec_str(s).map_err(|e| format!("{s:?}: {e:?}"))
}

pub(crate) fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub(crate) fn from_prefixed_hex(s: &str) -> Option<Vec<u8>> {
    hex::decode(s.strip_prefix("0x")?).ok()
}

/// `0x` followed by hex digits only, any length.
pub(crate) fn is_hex_string(s: &str) -> bool {
    s.strip_prefix("0x")
        .is_some_and(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
}
