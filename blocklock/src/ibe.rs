//! Seam to the identity-based encryption primitive.
//!
//! Blocklock encrypts on BN254 towards an identity hashed to G1, with the network public
//! key on G2. The pairing arithmetic itself is provided by an [`IdentityEncryption`]
//! implementation; this module only fixes the parameters it must be run with.

use ark_bn254::G2Affine;
use ark_serialize::CanonicalDeserialize;

use crate::ciphertext::Ciphertext;
use crate::error::{BlocklockError, Result};
use crate::identity::Identity;

/// Public key of the threshold network, a point on BN254 G2.
pub type PublicKey = G2Affine;

pub const H1_G1_DST: &[u8] = b"BLOCKLOCK_BN254G1_XMD:KECCAK-256_SVDW_RO_H1_";
pub const H2_DST: &[u8] = b"BLOCKLOCK_BN254_XMD:KECCAK-256_H2_";
pub const H3_DST: &[u8] = b"BLOCKLOCK_BN254_XMD:KECCAK-256_H3_";
pub const H4_DST: &[u8] = b"BLOCKLOCK_BN254_XMD:KECCAK-256_H4_";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashFunction {
    Keccak256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpandFn {
    Xmd,
    Xof,
}

/// Domain separation tags of the four hash functions of the scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dsts {
    pub h1_g1: &'static [u8],
    pub h2: &'static [u8],
    pub h3: &'static [u8],
    pub h4: &'static [u8],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IbeOpts {
    pub hash: HashFunction,
    /// Security level in bits.
    pub k: u16,
    pub expand_fn: ExpandFn,
    pub dsts: Dsts,
}

pub const BLOCKLOCK_IBE_OPTS: IbeOpts = IbeOpts {
    hash: HashFunction::Keccak256,
    k: 128,
    expand_fn: ExpandFn::Xmd,
    dsts: Dsts {
        h1_g1: H1_G1_DST,
        h2: H2_DST,
        h3: H3_DST,
        h4: H4_DST,
    },
};

impl Default for IbeOpts {
    fn default() -> Self {
        BLOCKLOCK_IBE_OPTS
    }
}

/// Identity-based encryption primitive.
///
/// Errors are opaque to this crate and surface as [`BlocklockError::ExternalCrypto`].
pub trait IdentityEncryption {
    fn encrypt(
        &self,
        message: &[u8],
        identity: &Identity,
        public_key: &PublicKey,
        opts: &IbeOpts,
    ) -> anyhow::Result<Ciphertext>;

    /// `key` is the decryption key released on chain for the ciphertext's identity.
    fn decrypt(&self, ciphertext: &Ciphertext, key: &[u8], opts: &IbeOpts)
        -> anyhow::Result<Vec<u8>>;
}

/// Parse a compressed G2 public key.
pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
    G2Affine::deserialize_compressed(bytes)
        .map_err(|e| BlocklockError::invalid(format!("public key: {e}")))
}
