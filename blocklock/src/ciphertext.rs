use ark_bn254::{Fq, Fq2, G2Affine};
use ark_ff::{BigInt, PrimeField};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::encoding::{Decimal, PrefixedHex};
use crate::error::{BlocklockError, Result};

/// Blocklock ciphertext as produced by the identity encryption primitive.
#[derive(Clone, Debug, PartialEq)]
pub struct Ciphertext {
    pub u: G2Affine,
    pub v: Vec<u8>,
    pub w: Vec<u8>,
}

/// G2 point as laid out in the contract: each coordinate is `[c0, c1]`.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct G2Point {
    #[serde_as(as = "[Decimal; 2]")]
    pub x: [U256; 2],
    #[serde_as(as = "[Decimal; 2]")]
    pub y: [U256; 2],
}

/// Ciphertext struct accepted by `requestBlocklock` and carried by the contract events.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidityCiphertext {
    pub u: G2Point,
    #[serde_as(as = "PrefixedHex")]
    pub v: Vec<u8>,
    #[serde_as(as = "PrefixedHex")]
    pub w: Vec<u8>,
}

impl From<&Ciphertext> for SolidityCiphertext {
    fn from(ct: &Ciphertext) -> Self {
        // The point at infinity has zero coordinates, which is also how the contract encodes it.
        let u = G2Point {
            x: [fq_to_u256(ct.u.x.c0), fq_to_u256(ct.u.x.c1)],
            y: [fq_to_u256(ct.u.y.c0), fq_to_u256(ct.u.y.c1)],
        };
        Self {
            u,
            v: ct.v.clone(),
            w: ct.w.clone(),
        }
    }
}

impl TryFrom<&SolidityCiphertext> for Ciphertext {
    type Error = BlocklockError;

    fn try_from(ct: &SolidityCiphertext) -> Result<Self> {
        Ok(Self {
            u: g2_from_point(&ct.u)?,
            v: ct.v.clone(),
            w: ct.w.clone(),
        })
    }
}

/// Map a ciphertext onto its on-chain struct.
pub fn encode_ciphertext(ct: &Ciphertext) -> SolidityCiphertext {
    ct.into()
}

/// Map an on-chain struct back onto a ciphertext, validating the G2 point.
pub fn decode_ciphertext(ct: &SolidityCiphertext) -> Result<Ciphertext> {
    ct.try_into()
}

fn fq_to_u256(f: Fq) -> U256 {
    // both are four little-endian u64 limbs
    U256(f.into_bigint().0)
}

fn fq_from_u256(n: U256, name: &str) -> Result<Fq> {
    Fq::from_bigint(BigInt::new(n.0)).ok_or_else(|| {
        BlocklockError::invalid(format!("ciphertext {name} = {n} is not a BN254 field element"))
    })
}

fn g2_from_point(p: &G2Point) -> Result<G2Affine> {
    if p.x.iter().chain(p.y.iter()).all(|c| c.is_zero()) {
        return Ok(G2Affine::identity());
    }
    let x = Fq2::new(fq_from_u256(p.x[0], "u.x[0]")?, fq_from_u256(p.x[1], "u.x[1]")?);
    let y = Fq2::new(fq_from_u256(p.y[0], "u.y[0]")?, fq_from_u256(p.y[1], "u.y[1]")?);
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(BlocklockError::invalid("ciphertext u is not a point of BN254 G2"));
    }
    Ok(point)
}
