//! Decryption conditions and their canonical JSON encoding.

use std::fmt;
use std::str::FromStr;

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DeserializeFromStr, SerializeDisplay};

use crate::encoding::{is_hex_string, Decimal, PrefixedHex};
use crate::error::{BlocklockError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// ABI description of a contract parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamType {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ParamType>>,
}

impl ParamType {
    pub fn new<K: Into<String>>(kind: K) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            components: None,
        }
    }

    pub fn named<N: Into<String>>(mut self, name: N) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Contract field a condition reads.
///
/// Always encoded as a string: a signature as is, a [`ParamType`] as its compact JSON.
#[derive(Clone, Debug, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum Field {
    Signature(String),
    Param(ParamType),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Signature(signature) => f.write_str(signature),
            Field::Param(param) => {
                f.write_str(&serde_json::to_string(param).map_err(|_| fmt::Error)?)
            }
        }
    }
}

impl FromStr for Field {
    type Err = BlocklockError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim_start().starts_with('{') {
            serde_json::from_str(s)
                .map(Field::Param)
                .map_err(|e| BlocklockError::invalid(format!("condition field {s:?}: {e}")))
        } else {
            Ok(Field::Signature(s.to_string()))
        }
    }
}

impl From<&str> for Field {
    fn from(signature: &str) -> Self {
        Field::Signature(signature.to_string())
    }
}

impl From<String> for Field {
    fn from(signature: String) -> Self {
        Field::Signature(signature)
    }
}

impl From<ParamType> for Field {
    fn from(param: ParamType) -> Self {
        Field::Param(param)
    }
}

/// Logical tree of conditions under which a ciphertext may be decrypted.
///
/// Integers are encoded as decimal strings and byte values as `0x` hex.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConditionExpression {
    /// Chain `chain_id` has reached `chain_height`.
    #[serde(rename = "time")]
    Time {
        #[serde(rename = "chainHeight")]
        #[serde_as(as = "Decimal")]
        chain_height: U256,
        #[serde(rename = "chainID")]
        #[serde_as(as = "Decimal")]
        chain_id: U256,
    },
    /// `field` of the contract at `address` compares to the ABI-encoded `value`.
    #[serde(rename = "contract_param")]
    ContractField {
        address: String,
        field: Field,
        operator: Operator,
        #[serde_as(as = "PrefixedHex")]
        value: Vec<u8>,
    },
    #[serde(rename = "and")]
    And {
        left: Box<ConditionExpression>,
        right: Box<ConditionExpression>,
    },
    #[serde(rename = "or")]
    Or {
        left: Box<ConditionExpression>,
        right: Box<ConditionExpression>,
    },
}

impl ConditionExpression {
    pub fn time(chain_height: U256, chain_id: U256) -> Self {
        Self::Time {
            chain_height,
            chain_id,
        }
    }

    pub fn contract_field<A: Into<String>, F: Into<Field>>(
        address: A,
        field: F,
        operator: Operator,
        value: Vec<u8>,
    ) -> Self {
        Self::ContractField {
            address: address.into(),
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn and(left: Self, right: Self) -> Self {
        Self::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Self, right: Self) -> Self {
        Self::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Time { .. } => Ok(()),
            Self::ContractField { address, .. } if !is_hex_string(address) => Err(
                BlocklockError::invalid(format!("condition address {address:?} must be a hex value")),
            ),
            Self::ContractField { .. } => Ok(()),
            Self::And { left, right } | Self::Or { left, right } => {
                left.validate()?;
                right.validate()
            }
        }
    }
}

/// Encode conditions to their canonical JSON text.
///
/// Every address is checked before anything is serialized.
pub fn encode_conditions(conditions: &ConditionExpression) -> Result<String> {
    conditions.validate()?;
    serde_json::to_string(conditions)
        .map_err(|e| BlocklockError::invalid(format!("conditions: {e}")))
}

pub fn decode_conditions(json: &str) -> Result<ConditionExpression> {
    let conditions: ConditionExpression = serde_json::from_str(json)
        .map_err(|e| BlocklockError::invalid(format!("conditions: {e}")))?;
    conditions.validate()?;
    Ok(conditions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abi_encoded_one() -> Vec<u8> {
        let mut word = vec![0u8; 32];
        word[31] = 1;
        word
    }

    fn conditions() -> ConditionExpression {
        ConditionExpression::and(
            ConditionExpression::time(U256::from(1), U256::from(1337)),
            ConditionExpression::contract_field(
                "0x43d9c5f314D241fBD7f4bEfd351Bcb28811e6F07",
                "count(uint256)",
                Operator::Gte,
                abi_encoded_one(),
            ),
        )
    }

    #[test]
    fn test_encode_integers_as_strings() {
        let expected = format!(
            concat!(
                r#"{{"type":"and","left":{{"type":"time","chainHeight":"1","chainID":"1337"}},"#,
                r#""right":{{"type":"contract_param","address":"0x43d9c5f314D241fBD7f4bEfd351Bcb28811e6F07","#,
                r#""field":"count(uint256)","operator":"gte","value":"0x{}01"}}}}"#
            ),
            "00".repeat(31)
        );
        assert_eq!(encode_conditions(&conditions()).unwrap(), expected);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let first = encode_conditions(&conditions()).unwrap();
        let second = encode_conditions(&conditions().clone()).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_encode_keeps_large_integers() {
        let c = ConditionExpression::time(U256::MAX, U256::from(u64::MAX) + 1);
        let json = encode_conditions(&c).unwrap();
        assert!(json.contains(&format!("\"chainHeight\":\"{}\"", U256::MAX)));
        assert!(json.contains("\"chainID\":\"18446744073709551616\""));
    }

    #[test]
    fn test_encode_rejects_non_hex_address() {
        let nested = ConditionExpression::or(
            ConditionExpression::time(U256::from(1), U256::from(1)),
            ConditionExpression::and(
                ConditionExpression::time(U256::from(2), U256::from(1)),
                ConditionExpression::contract_field("vitalik.eth", "count(uint256)", Operator::Eq, vec![]),
            ),
        );
        assert!(matches!(
            encode_conditions(&nested),
            Err(BlocklockError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_encode_param_type_field() {
        let c = ConditionExpression::contract_field(
            "0x43d9c5f314D241fBD7f4bEfd351Bcb28811e6F07",
            ParamType::new("uint256").named("count"),
            Operator::Lt,
            vec![0x10],
        );
        let json = encode_conditions(&c).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"type":"contract_param","address":"0x43d9c5f314D241fBD7f4bEfd351Bcb28811e6F07","#,
                r#""field":"{\"type\":\"uint256\",\"name\":\"count\"}","operator":"lt","value":"0x10"}"#
            )
        );
        assert_eq!(decode_conditions(&json).unwrap(), c);
    }

    #[test]
    fn test_decode_rejects_blank_integers() {
        assert!(matches!(
            decode_conditions(r#"{"type":"time","chainHeight":"","chainID":"1"}"#),
            Err(BlocklockError::InvalidArgument(_))
        ));
        assert!(decode_conditions(r#"{"type":"time","chainHeight":"5","chainID":"  "}"#).is_err());
    }

    #[test]
    fn test_decode_conditions() {
        let json = encode_conditions(&conditions()).unwrap();
        assert_eq!(decode_conditions(&json).unwrap(), conditions());
        assert!(decode_conditions(r#"{"type":"time","chainHeight":1,"chainID":"1"}"#).is_err());
        assert!(decode_conditions(
            r#"{"type":"contract_param","address":"nope","field":"f","operator":"lt","value":"0x"}"#
        )
        .is_err());
    }
}
